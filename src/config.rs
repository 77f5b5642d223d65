// Copyright (c) Chaingate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gateway configuration.
//!
//! Upstreams are declared in a TOML file: which chain each one serves, its
//! endpoints, and per-upstream options. Options resolve in three layers,
//! most specific wins: upstream options over per-chain defaults over
//! built-in defaults.
//!
//! ```toml
//! version = "v1"
//!
//! [[default-options]]
//! chains = ["ETH"]
//! options = { min-peers = 2, max-lag = 1 }
//!
//! [[upstreams]]
//! id = "local-eth"
//! chain = "ETH"
//! provider = "geth"
//! endpoints = [{ type = "ws", url = "ws://127.0.0.1:8546" }]
//! options = { quorum = 2 }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{Chain, ChainError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file")]
    Io(#[from] std::io::Error),
    #[error("malformed config")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    UnknownChain(#[from] ChainError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-upstream tuning knobs. All fields optional so that layers can be
/// merged; [`Options::defaults`] fills every field.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// Exclude this upstream while it reports itself as syncing.
    pub disable_syncing: Option<bool>,
    /// Minimum peer count for the upstream to be considered connected.
    pub min_peers: Option<u32>,
    /// How many upstreams must answer before a call resolves.
    pub quorum: Option<u32>,
    /// Maximum acceptable lag, in blocks, for lag-aware quorums.
    pub max_lag: Option<u64>,
}

impl Options {
    /// Built-in defaults, applied after all configured layers.
    #[must_use]
    pub const fn defaults() -> Self {
        Self {
            disable_syncing: Some(true),
            min_peers: Some(1),
            quorum: Some(1),
            max_lag: Some(0),
        }
    }

    /// Merges two layers; fields set on `self` win over `additional`.
    #[must_use]
    pub fn merge(&self, additional: &Options) -> Options {
        Options {
            disable_syncing: self.disable_syncing.or(additional.disable_syncing),
            min_peers: self.min_peers.or(additional.min_peers),
            quorum: self.quorum.or(additional.quorum),
            max_lag: self.max_lag.or(additional.max_lag),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_peers == Some(0) {
            return Err(ConfigError::Invalid("min-peers must be at least 1".into()));
        }
        if self.quorum == Some(0) {
            return Err(ConfigError::Invalid("quorum must be at least 1".into()));
        }
        Ok(())
    }
}

/// Default options applying to all upstreams of the listed chains.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DefaultOptions {
    pub chains: Vec<String>,
    pub options: Options,
}

/// Kind of upstream endpoint.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointType {
    JsonRpc,
    Ws,
    Grpc,
}

/// One network endpoint of an upstream node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub kind: EndpointType,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One configured upstream node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct UpstreamConfig {
    pub id: String,
    pub chain: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub options: Option<Options>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl UpstreamConfig {
    /// The chain this upstream serves.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownChain`] for an unrecognized code.
    pub fn chain(&self) -> Result<Chain, ConfigError> {
        Ok(Chain::from_code(&self.chain)?)
    }
}

/// Root gateway configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: String,
    #[serde(default)]
    pub default_options: Vec<DefaultOptions>,
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,
}

const fn default_true() -> bool {
    true
}

impl GatewayConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed TOML, unknown chain codes, or
    /// out-of-range option values.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or fails
    /// [`Self::parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Fully resolved options for one upstream: its own options over its
    /// chain's defaults over the built-in defaults. Every field is set on
    /// the result.
    #[must_use]
    pub fn options_for(&self, upstream: &UpstreamConfig) -> Options {
        let mut options = upstream.options.clone().unwrap_or_default();
        for defaults in &self.default_options {
            let applies = defaults
                .chains
                .iter()
                .any(|code| code.eq_ignore_ascii_case(&upstream.chain));
            if applies {
                options = options.merge(&defaults.options);
            }
        }
        options.merge(&Options::defaults())
    }

    /// Enabled upstreams serving `chain`.
    pub fn upstreams_for(&self, chain: Chain) -> impl Iterator<Item = &UpstreamConfig> {
        self.upstreams
            .iter()
            .filter(move |u| u.enabled && u.chain().is_ok_and(|c| c == chain))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::Invalid("version must not be empty".into()));
        }
        for defaults in &self.default_options {
            for code in &defaults.chains {
                Chain::from_code(code)?;
            }
            defaults.options.validate()?;
        }
        for upstream in &self.upstreams {
            if upstream.id.is_empty() {
                return Err(ConfigError::Invalid("upstream id must not be empty".into()));
            }
            upstream.chain()?;
            if let Some(options) = &upstream.options {
                options.validate()?;
            }
        }
        Ok(())
    }
}
