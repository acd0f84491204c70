//! Configuration file model.
//!
//! Loaded from `~/.credvault/config.toml` (overridable with `--config`).

use crate::constants;
use crate::core::codec;
use crate::core::vault::VaultSettings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsSection,
    #[serde(default)]
    pub vault: VaultSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsSection {
    /// Shared-config profile to load credentials from.
    #[serde(default)]
    pub profile: Option<String>,
    /// KMS key id for SecureString parameters; the account default key
    /// is used when unset.
    #[serde(default)]
    pub kms_id: Option<String>,
    /// Root parameter path all vault keys live under.
    #[serde(default)]
    pub param_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSection {
    #[serde(default)]
    pub obfuscation_key: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            obfuscation_key: String::new(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    constants::DEFAULT_MAX_CONCURRENT_REQUESTS
}

/// Default config file location: `~/.credvault/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home
        .join(constants::CONFIG_DIR)
        .join(constants::CONFIG_FILE))
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "config file not found: {} (create it with [aws] param_path and [vault] obfuscation_key)",
                path.display()
            );
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let path = self.aws.param_path.trim();
        if path.is_empty() {
            bail!("aws.param_path is required in the config file");
        }
        if !path.starts_with('/') {
            bail!("aws.param_path must be an absolute path: {}", path);
        }
        if path.len() > 1 && path.ends_with('/') {
            bail!("aws.param_path must not end with '/': {}", path);
        }
        if !codec::is_valid_key(&self.vault.obfuscation_key) {
            bail!(
                "vault.obfuscation_key is required and must use only [a-zA-Z0-9-_]"
            );
        }
        Ok(())
    }

    /// Construction parameters for the storage engine.
    pub fn vault_settings(&self) -> VaultSettings {
        VaultSettings {
            path: self.aws.param_path.trim().trim_end_matches('/').to_string(),
            encryption_key: self.aws.kms_id.clone().filter(|id| !id.is_empty()),
            obfuscation_key: self.vault.obfuscation_key.clone(),
            max_concurrent_requests: self.vault.max_concurrent_requests,
        }
    }
}
