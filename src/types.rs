// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core gateway types.
//!
//! [`Chain`] enumerates the blockchains the gateway knows about, each with a
//! stable numeric id and a short code. [`ChainBlock`] is the read-only block
//! record received from upstreams and consumed by the head broadcast path.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use thiserror::Error;
use time::OffsetDateTime;

/// Block identifier (hash) as reported by an upstream.
pub type BlockHash = [u8; 32];

/// Blockchains the gateway can serve.
///
/// The numeric ids are part of the outbound wire protocol and must never be
/// reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum Chain {
    Ethereum = 100,
    EthereumClassic = 101,
    TestnetMorden = 10001,
    TestnetKovan = 10002,
}

/// Error for unknown chain ids or codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("unknown chain id {0}")]
    UnknownId(u32),
    #[error("unknown chain code {0:?}")]
    UnknownCode(String),
}

impl Chain {
    /// All statically known chains, in id order.
    pub const ALL: [Chain; 4] = [
        Chain::Ethereum,
        Chain::EthereumClassic,
        Chain::TestnetMorden,
        Chain::TestnetKovan,
    ];

    /// Stable numeric id used on the wire.
    #[must_use]
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Short chain code used in configuration and logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::EthereumClassic => "ETC",
            Chain::TestnetMorden => "MORDEN",
            Chain::TestnetKovan => "KOVAN",
        }
    }

    /// Looks a chain up by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownId`] if no known chain has this id.
    pub const fn from_id(id: u32) -> Result<Self, ChainError> {
        match id {
            100 => Ok(Chain::Ethereum),
            101 => Ok(Chain::EthereumClassic),
            10001 => Ok(Chain::TestnetMorden),
            10002 => Ok(Chain::TestnetKovan),
            other => Err(ChainError::UnknownId(other)),
        }
    }

    /// Looks a chain up by its code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::UnknownCode`] if the code is not recognized.
    pub fn from_code(code: &str) -> Result<Self, ChainError> {
        match code.to_ascii_uppercase().as_str() {
            "ETH" | "ETHEREUM" => Ok(Chain::Ethereum),
            "ETC" | "ETHEREUM_CLASSIC" => Ok(Chain::EthereumClassic),
            "MORDEN" => Ok(Chain::TestnetMorden),
            "KOVAN" => Ok(Chain::TestnetKovan),
            _ => Err(ChainError::UnknownCode(code.to_owned())),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Chain {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

/// One block as reported by an upstream node.
///
/// Only the fields needed to build outbound head notifications are kept.
/// The cumulative weight is the chain's total difficulty (or equivalent)
/// up to and including this block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainBlock {
    pub chain: Chain,
    pub height: u64,
    pub timestamp: OffsetDateTime,
    pub total_weight: U256,
    pub hash: BlockHash,
}

impl ChainBlock {
    /// Block hash as lowercase hex, without any `0x` prefix.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Block timestamp as milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_millis(&self) -> u64 {
        let millis = self.timestamp.unix_timestamp_nanos() / 1_000_000;
        u64::try_from(millis).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn chain_ids_roundtrip() {
        for chain in Chain::ALL {
            assert_eq!(Chain::from_id(chain.id()), Ok(chain));
            assert_eq!(Chain::from_code(chain.code()), Ok(chain));
            assert_eq!(chain.code().parse::<Chain>(), Ok(chain));
        }
        assert_eq!(Chain::from_id(42), Err(ChainError::UnknownId(42)));
        assert!(Chain::from_code("DOGE").is_err());
    }

    #[test]
    fn chain_codes_are_case_insensitive() {
        assert_eq!(Chain::from_code("eth"), Ok(Chain::Ethereum));
        assert_eq!(Chain::from_code("morden"), Ok(Chain::TestnetMorden));
    }

    #[test]
    fn block_hash_hex_has_no_prefix() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        hash[31] = 0x01;
        let block = ChainBlock {
            chain: Chain::Ethereum,
            height: 100,
            timestamp: datetime!(2021-07-20 02:08:00.123 UTC),
            total_weight: U256::from(1_000_000u64),
            hash,
        };
        let hex = block.hash_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab"));
        assert!(hex.ends_with("01"));
        assert_eq!(hex, hex.to_lowercase());
    }

    #[test]
    fn timestamp_millis_matches_epoch() {
        let block = ChainBlock {
            chain: Chain::Ethereum,
            height: 1,
            timestamp: datetime!(2021-07-20 02:08:00.123 UTC),
            total_weight: U256::ZERO,
            hash: [0; 32],
        };
        assert_eq!(block.timestamp_millis(), 1_626_746_880_123);
    }
}
