//! Service configuration
//!
//! Loaded from a TOML or JSON file, then overridden by `DARC_*`
//! environment variables, then validated.

use darc_core::{
    DarcError, KeyPair, RandomSource, Result, SecretKey, SignatureScheme,
    DEFAULT_MAX_REFERENCE_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upper bound accepted for `max_reference_depth`.
pub const MAX_REFERENCE_DEPTH_LIMIT: usize = 64;

/// Configuration of an `AuthenticationService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How many cross-record references a resolution may follow
    pub max_reference_depth: usize,
    /// File holding the hex-encoded server key seed
    pub server_key_path: Option<PathBuf>,
    /// Create the key file when `server_key_path` does not exist yet
    pub persist_generated_key: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            server_key_path: None,
            persist_generated_key: false,
        }
    }
}

impl ServiceConfig {
    /// Load from a `.toml` or `.json` file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DarcError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| DarcError::config(format!("Invalid TOML: {}", e))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| DarcError::config(format!("Invalid JSON: {}", e))),
            _ => Err(DarcError::config("Unsupported file format")),
        }
    }

    /// Apply `DARC_MAX_REFERENCE_DEPTH`, `DARC_SERVER_KEY_PATH` and
    /// `DARC_PERSIST_GENERATED_KEY`
    pub fn merge_with_env(&mut self) -> Result<()> {
        if let Ok(depth) = std::env::var("DARC_MAX_REFERENCE_DEPTH") {
            self.max_reference_depth = depth
                .parse()
                .map_err(|_| DarcError::config("Invalid number in DARC_MAX_REFERENCE_DEPTH"))?;
        }
        if let Ok(path) = std::env::var("DARC_SERVER_KEY_PATH") {
            self.server_key_path = Some(PathBuf::from(path));
        }
        if let Ok(persist) = std::env::var("DARC_PERSIST_GENERATED_KEY") {
            self.persist_generated_key = persist
                .parse()
                .map_err(|_| DarcError::config("Invalid boolean in DARC_PERSIST_GENERATED_KEY"))?;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_reference_depth == 0 {
            return Err(DarcError::config("max_reference_depth must be at least 1"));
        }
        if self.max_reference_depth > MAX_REFERENCE_DEPTH_LIMIT {
            return Err(DarcError::config(format!(
                "max_reference_depth must not exceed {}",
                MAX_REFERENCE_DEPTH_LIMIT
            )));
        }
        Ok(())
    }

    /// Load the server key, generating one when no key file is configured
    /// (or when the configured file is missing and persisting is enabled).
    pub fn load_server_key(
        &self,
        scheme: &dyn SignatureScheme,
        random: &dyn RandomSource,
    ) -> Result<KeyPair> {
        let Some(path) = &self.server_key_path else {
            return Ok(KeyPair::generate(scheme, random));
        };

        if !path.exists() && self.persist_generated_key {
            let pair = KeyPair::generate(scheme, random);
            fs::write(path, hex::encode(pair.secret().expose())).map_err(|e| {
                DarcError::config(format!("Failed to write {}: {}", path.display(), e))
            })?;
            info!(path = %path.display(), public_key = %pair.public(), "Generated server key");
            return Ok(pair);
        }

        let encoded = fs::read_to_string(path).map_err(|e| {
            DarcError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(KeyPair::from_secret(scheme, SecretKey::from_hex(&encoded)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darc_core::{Ed25519Scheme, OsRandom};
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_reference_depth, DEFAULT_MAX_REFERENCE_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_depth_bounds() {
        let mut config = ServiceConfig::default();
        config.max_reference_depth = 0;
        assert!(config.validate().is_err());
        config.max_reference_depth = MAX_REFERENCE_DEPTH_LIMIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("darc.toml");
        fs::write(&toml_path, "max_reference_depth = 4\n").unwrap();
        let config = ServiceConfig::load_from_file(&toml_path).unwrap();
        assert_eq!(config.max_reference_depth, 4);
        assert_eq!(config.server_key_path, None);

        let json_path = dir.path().join("darc.json");
        fs::write(&json_path, r#"{"persist_generated_key": true}"#).unwrap();
        let config = ServiceConfig::load_from_file(&json_path).unwrap();
        assert!(config.persist_generated_key);
        assert_eq!(config.max_reference_depth, DEFAULT_MAX_REFERENCE_DEPTH);

        let yaml_path = dir.path().join("darc.yaml");
        fs::write(&yaml_path, "x: 1").unwrap();
        assert!(ServiceConfig::load_from_file(&yaml_path).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("DARC_MAX_REFERENCE_DEPTH", "7");
        std::env::set_var("DARC_SERVER_KEY_PATH", "/tmp/darc-test.key");
        let mut config = ServiceConfig::default();
        let result = config.merge_with_env();
        std::env::remove_var("DARC_MAX_REFERENCE_DEPTH");
        std::env::remove_var("DARC_SERVER_KEY_PATH");

        result.unwrap();
        assert_eq!(config.max_reference_depth, 7);
        assert_eq!(
            config.server_key_path,
            Some(PathBuf::from("/tmp/darc-test.key"))
        );
    }

    #[test]
    #[serial]
    fn test_env_rejects_garbage() {
        std::env::set_var("DARC_MAX_REFERENCE_DEPTH", "deep");
        let result = ServiceConfig::default().merge_with_env();
        std::env::remove_var("DARC_MAX_REFERENCE_DEPTH");
        assert!(matches!(result, Err(DarcError::Config { .. })));
    }

    #[test]
    fn test_server_key_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            server_key_path: Some(dir.path().join("server.key")),
            persist_generated_key: true,
            ..ServiceConfig::default()
        };
        let first = config.load_server_key(&Ed25519Scheme, &OsRandom).unwrap();
        let second = config.load_server_key(&Ed25519Scheme, &OsRandom).unwrap();
        assert_eq!(first.public(), second.public());
    }

    #[test]
    fn test_missing_key_file_without_persist_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            server_key_path: Some(dir.path().join("absent.key")),
            ..ServiceConfig::default()
        };
        assert!(config.load_server_key(&Ed25519Scheme, &OsRandom).is_err());
    }
}
