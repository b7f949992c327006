use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNetshConfig {
    #[serde(default)]
    pub helpers: RawHelpersConfig,

    #[serde(default)]
    pub logging: RawLoggingConfig,
}

/// Helper settings as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHelpersConfig {
    /// Persisted helper list
    pub store_path: Option<PathBuf>,

    /// Load persisted helpers before running a command
    pub auto_load: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLoggingConfig {
    pub level: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetshConfig {
    #[serde(default)]
    pub helpers: HelpersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpersConfig {
    /// Persisted helper list
    pub store_path: PathBuf,

    /// Load persisted helpers before running a command
    pub auto_load: bool,
}

impl Default for HelpersConfig {
    fn default() -> Self {
        Self {
            store_path: netsh_paths::helper_store_path(),
            auto_load: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter used unless `--verbose` is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = NetshConfig::default();
        assert!(config.helpers.auto_load);
        assert!(config.helpers.store_path.ends_with("helpers.toml"));
        assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[helpers]
auto_load = false
"#;
        let raw: RawNetshConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.helpers.auto_load, Some(false));
        assert!(raw.helpers.store_path.is_none());
        assert!(raw.logging.level.is_none());
    }

    #[test]
    fn test_final_config_serializes_sections() {
        let config = NetshConfig {
            helpers: HelpersConfig {
                store_path: PathBuf::from("/etc/netsh/helpers.toml"),
                auto_load: false,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
            },
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[helpers]"));
        assert!(toml_str.contains("store_path = \"/etc/netsh/helpers.toml\""));
        assert!(toml_str.contains("auto_load = false"));
        assert!(toml_str.contains("level = \"warn\""));
    }
}
