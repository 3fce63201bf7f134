//! Deployment configuration.
//!
//! Loaded from a `Saltcake.toml` file merged with `SALTCAKE_`-prefixed
//! environment variables (`SALTCAKE_RPC_URL`, `SALTCAKE_BROADCAST`, ...).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::{Address, B256, Bytes, U256};
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    deployment::Artifact,
    oracle::{DEFAULT_FACTORY, DEFAULT_RECEIPT_TIMEOUT, RpcOracleConfig},
};

/// The default name for the saltcake configuration file.
pub const SALTCAKE_CONF_FILENAME: &str = "Saltcake.toml";

/// Prefix of environment variables overriding the configuration file.
pub const ENV_PREFIX: &str = "SALTCAKE_";

fn default_factory() -> Address {
    DEFAULT_FACTORY
}

fn default_receipt_timeout_secs() -> u64 {
    DEFAULT_RECEIPT_TIMEOUT.as_secs()
}

/// Top-level deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the target chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,
    /// CREATE2 factory used to derive addresses and deploy.
    #[serde(default = "default_factory")]
    pub factory: Address,
    /// Node-managed account sending deployment transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    /// Whether to actually send deployment transactions.
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// Artifacts to deploy, in deployment order.
    #[serde(default)]
    pub artifacts: Vec<ArtifactConfig>,

    /// Directory relative artifact paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            factory: DEFAULT_FACTORY,
            sender: None,
            broadcast: false,
            receipt_timeout_secs: default_receipt_timeout_secs(),
            artifacts: Vec::new(),
            root: PathBuf::from("."),
        }
    }
}

/// One artifact entry of the configuration.
///
/// Exactly one of `init_code` and `artifact` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub name: String,
    #[serde(default)]
    pub salt: B256,
    /// Hex-encoded init code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_code: Option<Bytes>,
    /// Path to a compiler output JSON file carrying the init code as `bytecode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(default)]
    pub constructor_args: Bytes,
    #[serde(default)]
    pub value: U256,
}

impl DeployConfig {
    /// Load the configuration from a file, or from `Saltcake.toml` in a directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file or directory not found: {}",
                path.display()
            );
        }

        let config_path = if path.is_dir() {
            path.join(SALTCAKE_CONF_FILENAME)
        } else {
            path.to_path_buf()
        };

        let mut config: Self = Figment::new()
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        tracing::info!(
            path = %config_path.display(),
            artifacts = config.artifacts.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Settings for an RPC oracle; fails if the endpoint or sender is missing.
    pub fn rpc_oracle_config(&self) -> Result<RpcOracleConfig> {
        let url = self
            .rpc_url
            .clone()
            .context("No RPC URL configured (set `rpc_url` or SALTCAKE_RPC_URL)")?;
        let sender = self
            .sender
            .context("No sender configured (set `sender` or SALTCAKE_SENDER)")?;

        Ok(RpcOracleConfig {
            url,
            factory: self.factory,
            sender,
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
        })
    }

    /// Resolve every configured artifact, loading init code from disk where needed.
    pub fn load_artifacts(&self) -> Result<Vec<Artifact>> {
        self.artifacts
            .iter()
            .map(|entry| {
                entry
                    .to_artifact(&self.root)
                    .with_context(|| format!("Invalid artifact `{}`", entry.name))
            })
            .collect()
    }
}

impl ArtifactConfig {
    pub fn to_artifact(&self, root: &Path) -> Result<Artifact> {
        let init_code = match (&self.init_code, &self.artifact) {
            (Some(code), None) => code.clone(),
            (None, Some(path)) => load_bytecode(&root.join(path))?,
            (Some(_), Some(_)) => anyhow::bail!("Both `init_code` and `artifact` are set"),
            (None, None) => anyhow::bail!("One of `init_code` or `artifact` is required"),
        };

        Ok(Artifact::new(self.name.clone(), init_code)
            .salt(self.salt)
            .constructor_args(self.constructor_args.clone())
            .value(self.value))
    }
}

/// Read init code from a compiler output JSON file.
///
/// Accepts `"bytecode": "0x..."` and `"bytecode": { "object": "0x..." }`.
pub fn load_bytecode(path: &Path) -> Result<Bytes> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    let json: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

    let bytecode = match &json["bytecode"] {
        Value::String(code) => code.as_str(),
        Value::Object(object) => object
            .get("object")
            .and_then(Value::as_str)
            .context("`bytecode.object` is missing or not a string")?,
        _ => anyhow::bail!("No `bytecode` in artifact {}", path.display()),
    };

    let bytes = hex::decode(bytecode.trim_start_matches("0x"))
        .with_context(|| format!("Invalid hex bytecode in {}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("Empty bytecode in {}", path.display());
    }

    Ok(bytes.into())
}
