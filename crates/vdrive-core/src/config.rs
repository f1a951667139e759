use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DriveError, DriveResult};

/// Top-level client configuration (loaded from vdrive.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VdriveConfig {
    pub api: ApiConfig,
    pub crypto: CryptoConfig,
    pub verifier: VerifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the drive API
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://drive-api.localhost/".into(),
            timeout_secs: 30,
            log_level: "info".into(),
            log_format: "text".into(),
        }
    }
}

/// Client-side encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Max decrypted content keys cached per user (default: 32)
    pub key_cache_capacity: usize,
    /// Node-key chain depth limit (default: 64)
    pub max_chain_depth: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_cache_capacity: 32,
            max_chain_depth: 64,
        }
    }
}

/// Block-verification scratch area configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Scratch directory for decrypted verification data
    /// (default: the system temp dir)
    pub temp_dir: Option<PathBuf>,
}

impl VerifierConfig {
    /// Resolve the scratch root, falling back to the system temp dir.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl VdriveConfig {
    /// Load configuration from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> DriveResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg = toml::from_str(&raw)
            .map_err(|e| DriveError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }
}
