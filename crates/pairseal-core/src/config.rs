use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SealError, SealResult};

/// Top-level configuration (loaded from pairseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PairsealConfig {
    pub keys: KeysConfig,
    pub engine: EngineConfig,
}

/// Where and how key material is persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Directory holding the `{id}_{kind}.key` blobs (default: ~/.local/share/pairseal/keys)
    pub dir: PathBuf,
    /// Unix permissions of newly created key blobs (default: 0o400)
    pub file_mode: u32,
    /// Age after which the salt is reported as stale (default: 2 days)
    pub salt_max_age_days: u64,
}

/// Engine behaviour switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject envelopes whose length field disagrees with their byte count
    pub strict_length: bool,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~/.local/share/pairseal/keys"),
            file_mode: 0o400,
            salt_max_age_days: 2,
        }
    }
}

impl KeysConfig {
    /// Key directory with a leading `~/` expanded against `$HOME`.
    ///
    /// Fails with [`SealError::Config`] if the path needs `$HOME` and it is
    /// unset or empty.
    pub fn resolved_dir(&self) -> SealResult<PathBuf> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from);
        expand_tilde(&self.dir, home.as_deref())
    }

    pub fn salt_max_age(&self) -> Duration {
        Duration::from_secs(self.salt_max_age_days.saturating_mul(24 * 60 * 60))
    }
}

impl PairsealConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> SealResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SealError::Config(format!("reading {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded pairseal config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> SealResult<Self> {
        toml::from_str(content).map_err(|e| SealError::Config(format!("parsing config: {e}")))
    }
}

fn expand_tilde(path: &Path, home: Option<&Path>) -> SealResult<PathBuf> {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => home.map(|h| h.join(rest)).ok_or_else(|| {
            SealError::Config(format!("cannot expand {}: HOME is not set", path.display()))
        }),
        None => Ok(path.to_path_buf()),
    }
}
