use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

// Import logging macros
use crate::auto_tagger::DEFAULT_BULK_THRESHOLD;
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Location of the seed snapshot loaded at startup
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub seed_path: PathBuf,
}

/// Tunables shared by the similarity, auto-tagging and retest engines
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub min_similarity_score: u32,
    pub similar_top_n: usize,
    pub retest_default_selection: usize,
    pub retest_similar_per_question: usize,
    pub auto_tag_bulk_threshold: u8,
    pub retest_rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_similarity_score: 30,
            similar_top_n: 5,
            retest_default_selection: 5,
            retest_similar_per_question: 3,
            auto_tag_bulk_threshold: DEFAULT_BULK_THRESHOLD,
            retest_rng_seed: None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            data: DataConfig::from_env()?,
            engine: EngineConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    fn log_configuration_summary(&self) {
        info!(
            seed_path = %self.data.seed_path.display(),
            min_similarity_score = self.engine.min_similarity_score,
            similar_top_n = self.engine.similar_top_n,
            auto_tag_bulk_threshold = self.engine.auto_tag_bulk_threshold,
            retest_rng_seeded = self.engine.retest_rng_seed.is_some(),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.engine.similar_top_n == 0 {
            return Err(anyhow!("SIMILAR_TOP_N must be at least 1"));
        }

        if self.engine.min_similarity_score > 100 {
            return Err(anyhow!(
                "MIN_SIMILARITY_SCORE must be within 0-100, got {}",
                self.engine.min_similarity_score
            ));
        }

        if self.engine.auto_tag_bulk_threshold > 100 {
            return Err(anyhow!(
                "AUTO_TAG_BULK_THRESHOLD must be within 0-100, got {}",
                self.engine.auto_tag_bulk_threshold
            ));
        }

        if self.engine.retest_default_selection == 0 {
            warn!("RETEST_DEFAULT_SELECTION is 0 - retest analysis will pre-select nothing");
        }

        // The level may be a full filter directive; only bare levels are checked
        let level = self.logging.level.to_lowercase();
        if !level.contains('=')
            && !level.contains(',')
            && !["trace", "debug", "info", "warn", "error"].contains(&level.as_str())
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DataConfig {
    fn from_env() -> Result<Self> {
        let seed_path = env::var("SEED_DATA_PATH")
            .unwrap_or_else(|_| "data/seed.json".to_string());

        Ok(DataConfig {
            seed_path: PathBuf::from(seed_path),
        })
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self> {
        let defaults = EngineConfig::default();

        let retest_rng_seed = match env::var("RETEST_RNG_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| anyhow!("Invalid RETEST_RNG_SEED value: '{}'", raw))?,
            ),
            Err(_) => None,
        };

        Ok(EngineConfig {
            min_similarity_score: parse_var("MIN_SIMILARITY_SCORE", defaults.min_similarity_score)?,
            similar_top_n: parse_var("SIMILAR_TOP_N", defaults.similar_top_n)?,
            retest_default_selection: parse_var(
                "RETEST_DEFAULT_SELECTION",
                defaults.retest_default_selection,
            )?,
            retest_similar_per_question: parse_var(
                "RETEST_SIMILAR_PER_QUESTION",
                defaults.retest_similar_per_question,
            )?,
            auto_tag_bulk_threshold: parse_var(
                "AUTO_TAG_BULK_THRESHOLD",
                defaults.auto_tag_bulk_threshold,
            )?,
            retest_rng_seed,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl LoggingConfig {
    /// Logging settings alone, so the subscriber can be installed before the
    /// rest of the configuration is loaded and logged.
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,worksheet_engine=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY")
            .unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_data_config_defaults() {
        unsafe { env::remove_var("SEED_DATA_PATH"); }

        let config = DataConfig::from_env().unwrap();
        assert_eq!(config.seed_path, PathBuf::from("data/seed.json"));
    }

    #[test]
    fn test_server_config_from_env() {
        unsafe {
            env::remove_var("PORT");
            env::remove_var("HOST");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");

        unsafe { env::set_var("PORT", "not-a-number"); }
        let result = ServerConfig::from_env();
        assert!(result.is_err());

        unsafe { env::remove_var("PORT"); }
    }

    #[test]
    fn test_parse_var_fallback_and_errors() {
        unsafe { env::remove_var("WORKSHEET_TEST_UNSET_VAR"); }
        assert_eq!(parse_var("WORKSHEET_TEST_UNSET_VAR", 7usize).unwrap(), 7);

        unsafe { env::set_var("WORKSHEET_TEST_NUMERIC_VAR", " 42 "); }
        assert_eq!(parse_var("WORKSHEET_TEST_NUMERIC_VAR", 0u32).unwrap(), 42);

        unsafe { env::set_var("WORKSHEET_TEST_NUMERIC_VAR", "many"); }
        assert!(parse_var("WORKSHEET_TEST_NUMERIC_VAR", 0u32).is_err());

        unsafe { env::remove_var("WORKSHEET_TEST_NUMERIC_VAR"); }
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            data: DataConfig {
                seed_path: PathBuf::from("data/seed.json"),
            },
            engine: EngineConfig::default(),
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        };

        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.engine.similar_top_n = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.engine.auto_tag_bulk_threshold = 101;
        assert!(invalid_config.validate().is_err());
    }
}
