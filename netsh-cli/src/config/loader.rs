use super::types::{
    DEFAULT_LOG_LEVEL, HelpersConfig, LoggingConfig, NetshConfig, RawHelpersConfig,
    RawLoggingConfig, RawNetshConfig,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<NetshConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge config files in order, later files overriding earlier ones.
    /// Missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<NetshConfig> {
        let mut raw = RawNetshConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                tracing::debug!(path = %path.display(), "Config layer loaded");
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(Self::finalize(raw))
    }

    /// Get user config path (`~/.config/netsh/config.toml`)
    pub fn user_config_path() -> PathBuf {
        netsh_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with NETSH_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("NETSH_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".netsh/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<Option<RawNetshConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawNetshConfig, overlay: RawNetshConfig) -> RawNetshConfig {
        RawNetshConfig {
            helpers: RawHelpersConfig {
                store_path: overlay.helpers.store_path.or(base.helpers.store_path),
                auto_load: overlay.helpers.auto_load.or(base.helpers.auto_load),
            },
            logging: RawLoggingConfig {
                level: overlay.logging.level.or(base.logging.level),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawNetshConfig) -> NetshConfig {
        NetshConfig {
            helpers: HelpersConfig {
                store_path: raw
                    .helpers
                    .store_path
                    .unwrap_or_else(netsh_paths::helper_store_path),
                auto_load: raw.helpers.auto_load.unwrap_or(true),
            },
            logging: LoggingConfig {
                level: raw
                    .logging
                    .level
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_files_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(&[
            temp_dir.path().join("user.toml"),
            temp_dir.path().join("project.toml"),
        ])
        .unwrap();

        assert!(config.helpers.auto_load);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.helpers.store_path, netsh_paths::helper_store_path());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");

        std::fs::write(
            &user,
            "[helpers]\nstore_path = \"/home/me/helpers.toml\"\nauto_load = false\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        std::fs::write(&project, "[logging]\nlevel = \"trace\"\n").unwrap();

        let config = ConfigLoader::load_layers(&[user, project]).unwrap();

        assert_eq!(
            config.helpers.store_path,
            PathBuf::from("/home/me/helpers.toml")
        );
        assert!(!config.helpers.auto_load);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");
        std::fs::write(&path, "this is not valid toml {{{{").unwrap();

        assert!(ConfigLoader::load_layers(&[path]).is_err());
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawNetshConfig {
            helpers: RawHelpersConfig {
                store_path: Some(PathBuf::from("/base/helpers.toml")),
                auto_load: Some(false),
            },
            logging: RawLoggingConfig {
                level: Some("debug".to_string()),
            },
        };

        let merged = ConfigLoader::merge_raw(base, RawNetshConfig::default());

        assert_eq!(
            merged.helpers.store_path,
            Some(PathBuf::from("/base/helpers.toml"))
        );
        assert_eq!(merged.helpers.auto_load, Some(false));
        assert_eq!(merged.logging.level, Some("debug".to_string()));
    }

    #[test]
    fn test_user_config_path() {
        let path = ConfigLoader::user_config_path();
        assert!(path.ends_with("netsh/config.toml"));
    }
}
