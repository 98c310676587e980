//! Configuration loading and resolution.

use std::path::PathBuf;

use picto::Settings;

/// File name looked up in the working directory and under `~/.picto/`.
pub const CONFIG_FILE_NAME: &str = "picto.toml";

/// Resolve the settings file path: explicit flag, then `PICTO_CONFIG`, then
/// `./picto.toml`, then `~/.picto/picto.toml`. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("PICTO_CONFIG") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = home_dir().join(".picto").join(CONFIG_FILE_NAME);
    home_config.exists().then_some(home_config)
}

/// Load settings from the resolved file (if any) with environment overrides.
pub fn load_settings(explicit: Option<&str>) -> anyhow::Result<Settings> {
    let path = resolve_config_path(explicit);
    if let Some(p) = &path {
        tracing::info!("Using settings from {}", p.display());
    }
    Ok(Settings::load(path.as_deref())?)
}

pub(crate) fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_config_path(Some("/etc/picto/custom.toml"));
        assert_eq!(path, Some(PathBuf::from("/etc/picto/custom.toml")));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(load_settings(Some("/nonexistent/picto.toml")).is_err());
    }
}
