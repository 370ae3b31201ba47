//! Configuration resolution for the livewatch CLI.
//!
//! Lookup order: `--config <path>`, then `livewatch.toml` in the platform
//! config directory, then built-in defaults. `--api` is applied last.

use anyhow::{Context, Result};
use livewatch_client::LiveConfig;
use std::path::{Path, PathBuf};

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "livewatch.toml";

/// Load the effective configuration.
pub fn load(explicit: Option<&Path>, api: Option<&str>) -> Result<LiveConfig> {
    let mut config = match resolve_path(explicit, default_config_dir().as_deref()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            LiveConfig::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => LiveConfig::default(),
    };

    if let Some(api) = api {
        config.api.base_url = api.to_string();
        config.validate().context("Invalid --api value")?;
    }

    Ok(config)
}

/// Pick the config file to read, if any.
///
/// An explicit path is always returned (a missing file is then an error);
/// the default location is only used when the file exists.
pub fn resolve_path(explicit: Option<&Path>, config_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = config_dir?.join(CONFIG_FILE);
    candidate.exists().then_some(candidate)
}

/// Platform config directory for livewatch.
fn default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "ydun", "livewatch").map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let explicit = Path::new("/etc/livewatch/custom.toml");

        let resolved = resolve_path(Some(explicit), Some(dir.path()));

        assert_eq!(resolved.as_deref(), Some(explicit));
    }

    #[test]
    fn default_location_used_when_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "").unwrap();

        assert_eq!(resolve_path(None, Some(dir.path())), Some(path));
    }

    #[test]
    fn missing_default_falls_back_to_builtin() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_path(None, Some(dir.path())), None);
        assert_eq!(resolve_path(None, None), None);
    }

    #[test]
    fn load_applies_api_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lw.toml");
        std::fs::write(&path, "[api]\nbase_url = \"http://from-file/api\"\n[sync]\npage_size = 25\n")
            .unwrap();

        let config = load(Some(&path), Some("http://from-flag/api")).unwrap();

        assert_eq!(config.api.base_url, "http://from-flag/api");
        assert_eq!(config.sync.page_size, 25);
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let result = load(Some(&dir.path().join("absent.toml")), None);
        assert!(result.is_err());
    }

    #[test]
    fn load_rejects_empty_api_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lw.toml");
        std::fs::write(&path, "").unwrap();

        assert!(load(Some(&path), Some("  ")).is_err());
    }
}
