//! Configuration management for CadForge

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};
use crate::types::DerivedArtifactPolicy;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["cadforge.toml"];

const MIB: u64 = 1024 * 1024;

/// Tunables for one upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Accepted upload extensions, with leading dot.
    pub allowed_extensions: Vec<String>,
    /// Inclusive upload size limit.
    pub max_size_bytes: u64,
    /// Mock scanner policy: content below this size passes.
    pub scan_safe_below_bytes: u64,
    /// Simulated scanner latency.
    pub scan_latency_ms: u64,
    /// Simulated conversion latency.
    pub convert_latency_ms: u64,
    /// Upload progress simulation: tick interval and tick count.
    pub upload_tick_ms: u64,
    pub upload_ticks: u32,
    /// Contour extraction endpoint.
    pub contour_endpoint: String,
    /// Bounded timeout for the contour network call.
    pub request_timeout_secs: u64,
    /// Where a successful conversion lands.
    pub conversion_policy: DerivedArtifactPolicy,
    /// Where a successful contour extraction lands.
    pub contour_policy: DerivedArtifactPolicy,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".dwg".to_string()],
            max_size_bytes: 50 * MIB,
            scan_safe_below_bytes: 10 * MIB,
            scan_latency_ms: 1000,
            convert_latency_ms: 2000,
            upload_tick_ms: 200,
            upload_ticks: 10,
            contour_endpoint: "http://localhost:8000/api/contour".to_string(),
            request_timeout_secs: 30,
            conversion_policy: DerivedArtifactPolicy::InPlace,
            contour_policy: DerivedArtifactPolicy::Sibling,
        }
    }
}

impl ForgeConfig {
    /// Find a configuration file in a directory
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ForgeError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ForgeConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a directory, falling back to defaults when no file exists
    pub fn load_from_directory(dir: &Path) -> Result<Self> {
        match Self::find_config_file(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.allowed_extensions.is_empty() {
            return Err(ForgeError::Config(
                "allowed_extensions must not be empty".to_string(),
            ));
        }
        if self.max_size_bytes == 0 {
            return Err(ForgeError::Config(
                "max_size_bytes must be positive".to_string(),
            ));
        }
        if self.upload_ticks == 0 {
            return Err(ForgeError::Config(
                "upload_ticks must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scan_latency(&self) -> Duration {
        Duration::from_millis(self.scan_latency_ms)
    }

    pub fn convert_latency(&self) -> Duration {
        Duration::from_millis(self.convert_latency_ms)
    }

    pub fn upload_tick(&self) -> Duration {
        Duration::from_millis(self.upload_tick_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = ForgeConfig::default();
        assert_eq!(config.allowed_extensions, vec![".dwg".to_string()]);
        assert_eq!(config.max_size_bytes, 50 * MIB);
        assert_eq!(config.scan_safe_below_bytes, 10 * MIB);
        assert_eq!(config.scan_latency_ms, 1000);
        assert_eq!(config.convert_latency_ms, 2000);
        assert_eq!(config.conversion_policy, DerivedArtifactPolicy::InPlace);
        assert_eq!(config.contour_policy, DerivedArtifactPolicy::Sibling);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: ForgeConfig = toml::from_str(
            r#"
            max_size_bytes = 1048576
            contour_endpoint = "http://forge.example.com/api/contour"
            contour_policy = "inplace"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_size_bytes, 1024 * 1024);
        assert_eq!(config.contour_endpoint, "http://forge.example.com/api/contour");
        assert_eq!(config.contour_policy, DerivedArtifactPolicy::InPlace);
        // Untouched fields keep their defaults
        assert_eq!(config.scan_latency_ms, 1000);
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let config = ForgeConfig {
            allowed_extensions: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
