//! TOML-based challenge configuration.
//!
//! One explicit value constructed at startup and passed into the service --
//! never a process-wide singleton. Stored at `<data dir>/config.toml`;
//! missing files and missing keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Reflection/report generator endpoint settings.
///
/// The API key is resolved from the environment variable named by
/// `api_key_env`, keeping secrets out of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl GeneratorConfig {
    /// Resolve the API key, if the environment provides one.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Challenge-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default = "default_challenge_id")]
    pub challenge_id: i64,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: i64,
    /// Proof-registry contract the submit hint points at.
    #[serde(default = "default_contract")]
    pub proof_registry_address: String,
    /// Badge contract milestone mints target.
    #[serde(default = "default_contract")]
    pub badge_contract_address: String,
    /// Upper bound on one generator call, seconds.
    #[serde(default = "default_reflection_timeout_secs")]
    pub reflection_timeout_secs: u64,
    #[serde(default)]
    pub generator: Option<GeneratorConfig>,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            challenge_id: default_challenge_id(),
            default_timezone: default_timezone(),
            chain_id: default_chain_id(),
            proof_registry_address: default_contract(),
            badge_contract_address: default_contract(),
            reflection_timeout_secs: default_reflection_timeout_secs(),
            generator: None,
        }
    }
}

impl ChallengeConfig {
    /// Load from `<dir>/config.toml`, defaulting when the file is absent.
    ///
    /// # Errors
    /// Returns an error for unreadable or malformed files; a missing file
    /// is not an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map_err(|e| CoreError::InvalidArgument(format!("config {}: {e}", path.display())))
    }

    /// Persist to `<dir>/config.toml`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Internal(format!("config serialize: {e}")))?;
        std::fs::write(dir.join("config.toml"), raw)?;
        Ok(())
    }

    /// Timeout applied around every generator call.
    pub fn reflection_timeout(&self) -> Duration {
        Duration::from_secs(self.reflection_timeout_secs)
    }
}

fn default_challenge_id() -> i64 {
    1
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_chain_id() -> i64 {
    11155111 // Sepolia
}

fn default_contract() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_reflection_timeout_secs() -> u64 {
    12
}

fn default_api_key_env() -> String {
    "ALIVE_GENERATOR_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ChallengeConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.challenge_id, 1);
        assert_eq!(cfg.default_timezone, "UTC");
        assert!(cfg.generator.is_none());
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ChallengeConfig::default();
        cfg.challenge_id = 7;
        cfg.generator = Some(GeneratorConfig {
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            model: "example-chat".to_string(),
            api_key_env: "EXAMPLE_KEY".to_string(),
        });
        cfg.save(dir.path()).unwrap();

        let loaded = ChallengeConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.challenge_id, 7);
        assert_eq!(loaded.generator.unwrap().model, "example-chat");
    }

    #[test]
    fn partial_files_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "challenge_id = 3\n").unwrap();
        let cfg = ChallengeConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.challenge_id, 3);
        assert_eq!(cfg.chain_id, 11155111);
    }
}
