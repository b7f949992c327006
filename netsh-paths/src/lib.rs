//! XDG Base Directory paths for netsh.
//!
//! The helper store and config files live under XDG paths on every
//! platform, the same way other CLI tools lay out their state.

use std::path::PathBuf;

/// Get the netsh config directory.
///
/// Returns `$XDG_CONFIG_HOME/netsh` if set, otherwise `~/.config/netsh`.
/// The persisted helper list and `config.toml` are stored here.
///
/// # Examples
///
/// ```
/// use netsh_paths::config_dir;
///
/// let store = config_dir().join("helpers.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("netsh")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/netsh")
    } else {
        PathBuf::from(".config/netsh")
    }
}

/// Get the netsh data directory.
///
/// Returns `$XDG_DATA_HOME/netsh` if set, otherwise `~/.local/share/netsh`.
/// Helper libraries installed by `netsh helper add` usually live here.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("netsh")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/netsh")
    } else {
        PathBuf::from(".local/share/netsh")
    }
}

/// Default location of the persisted helper list.
pub fn helper_store_path() -> PathBuf {
    config_dir().join("helpers.toml")
}
