//! TOML configuration schema for the agent runtime.
//!
//! All fields have `#[serde(default)]` so a partially-filled `config.toml`
//! works correctly. Missing sections fall back to their `Default` impl.
//!
//! Example `~/.agentcore/config.toml`:
//! ```toml
//! [model]
//! main = "anthropic/claude-sonnet-4-20250514"
//! summarizer = "anthropic/claude-haiku-4-20250514"
//! worker = "anthropic/claude-haiku-4-20250514"
//!
//! [context]
//! max_tokens = 128000
//! compaction_threshold = 0.8
//!
//! [agent]
//! enable_code_execution = false
//! code_timeout_seconds = 30
//! max_turns = 200
//!
//! [tournament]
//! default_stages = [4, 2, 1]
//! default_debate_rounds = 1
//!
//! [sandbox]
//! root = "/home/user/.agentcore/sandbox"
//! ```

mod schema;

pub use schema::{
    AgentRunConfig, ContextConfig, ModelConfig, RuntimeConfig, SandboxConfig, TournamentConfig,
};

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// section (or the whole file) that is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let config: RuntimeConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants that `serde`'s per-field defaults
    /// cannot express (e.g. monotonic tournament stage widths).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.1..=0.99).contains(&self.context.compaction_threshold) {
            return Err(ConfigError::Invalid(format!(
                "context.compaction_threshold must be in [0.1, 0.99], got {}",
                self.context.compaction_threshold
            )));
        }
        let stages = &self.tournament.default_stages;
        if stages.iter().any(|&n| n == 0) {
            return Err(ConfigError::Invalid(
                "tournament.default_stages entries must be >= 1".to_string(),
            ));
        }
        if !stages.windows(2).all(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(format!(
                "tournament.default_stages must be non-increasing, got {:?}",
                stages
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_default() {
        let cfg = RuntimeConfig::load("/tmp/__agentcore_no_such_config__.toml").unwrap();
        assert_eq!(cfg.context.max_tokens, ContextConfig::default().max_tokens);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context]\nmax_tokens = 2048\n").unwrap();

        let cfg = RuntimeConfig::load(&path).unwrap();
        assert_eq!(cfg.context.max_tokens, 2048);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.model.main, ModelConfig::default().main);
    }

    #[test]
    fn rejects_non_increasing_stages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tournament]\ndefault_stages = [2, 3]\n").unwrap();

        let err = RuntimeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context]\ncompaction_threshold = 1.5\n").unwrap();

        let err = RuntimeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
