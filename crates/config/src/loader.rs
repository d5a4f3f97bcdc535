use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::PushmillConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["pushmill.toml", "pushmill.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PushmillConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./pushmill.{toml,json}` (project-local)
/// 2. `~/.config/pushmill/pushmill.{toml,json}` (user-global)
///
/// Returns `PushmillConfig::default()` if no config file is found.
pub fn discover_and_load() -> PushmillConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PushmillConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/pushmill/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "pushmill") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/pushmill/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pushmill").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PushmillConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushmill.toml");
        std::fs::write(
            &path,
            r#"
            [api]
            base_url = "https://api.staging.pushmill.io"

            [enrich]
            download_timeout_secs = 10
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api.base_url, "https://api.staging.pushmill.io");
        assert_eq!(config.enrich.download_timeout_secs, 10);
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushmill.json");
        std::fs::write(&path, r#"{"api": {"key": "pk_test"}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api.key.as_deref(), Some("pk_test"));
    }

    #[test]
    fn unsupported_extension_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pushmill.ini");
        std::fs::write(&path, "api=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_config(Path::new("/nonexistent/pushmill.toml")).is_err());
    }
}
