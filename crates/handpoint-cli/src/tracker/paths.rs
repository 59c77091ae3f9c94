//! Config file resolution and loading.
//!
//! Priority for the config file:
//! 1. `--config <FILE>` (explicit, must exist)
//! 2. `HANDPOINT_CONFIG` (must exist, ignored when empty)
//! 3. `XDG_CONFIG_HOME/handpoint/{profile}.json`
//! 4. `{platform config dir}/handpoint/{profile}.json`
//!
//! Profile support via `HANDPOINT_PROFILE` env var (default: "default").
//! A missing profile file is not an error; the built-in defaults apply.

use std::env;
use std::path::{Path, PathBuf};

use handpoint_core::config::TrackerConfig;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_ENV: &str = "HANDPOINT_CONFIG";
pub const PROFILE_ENV: &str = "HANDPOINT_PROFILE";

/// Failure to turn a config file into a [`TrackerConfig`].
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config file {path:?} does not exist")]
    NotFound { path: PathBuf },
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path:?} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A resolved config file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    /// Named by the user, so it has to exist.
    pub required: bool,
}

/// Get current profile name from env or default.
pub fn get_profile() -> String {
    env::var(PROFILE_ENV).unwrap_or_else(|_| "default".to_string())
}

/// Validate a profile name to prevent path traversal.
///
/// Profile names must be non-empty, contain only alphanumeric characters,
/// hyphens and underscores, and not start with a hyphen. Anything else falls
/// back to "default".
pub(crate) fn sanitize_profile_name(name: &str) -> String {
    let is_valid = !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if is_valid {
        name.to_string()
    } else {
        tracing::warn!(
            "Invalid profile name '{}', using 'default'. Names must contain only alphanumeric, hyphen, underscore.",
            name
        );
        "default".to_string()
    }
}

/// Directory holding profile files.
///
/// `XDG_CONFIG_HOME/handpoint` when set and non-empty, otherwise the platform
/// config directory. `None` if neither is known.
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var("XDG_CONFIG_HOME") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir).join("handpoint"));
        }
    }
    dirs::config_dir().map(|dir| dir.join("handpoint"))
}

/// Resolve which config file applies.
pub fn resolve_config_location(explicit: Option<&Path>) -> Option<ConfigLocation> {
    if let Some(path) = explicit {
        return Some(ConfigLocation {
            path: path.to_path_buf(),
            required: true,
        });
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(ConfigLocation {
                path: PathBuf::from(path),
                required: true,
            });
        }
    }

    let profile = sanitize_profile_name(&get_profile());
    get_config_dir().map(|dir| ConfigLocation {
        path: dir.join(format!("{}.json", profile)),
        required: false,
    })
}

/// Parse a config file. Unspecified fields keep their defaults.
pub fn read_config(path: &Path) -> Result<TrackerConfig, ConfigFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigFileError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the effective config file, returning the path it came from.
///
/// Falls back to defaults when no optional profile file exists.
pub fn load_config(
    explicit: Option<&Path>,
) -> Result<(TrackerConfig, Option<PathBuf>), ConfigFileError> {
    let Some(location) = resolve_config_location(explicit) else {
        return Ok((TrackerConfig::default(), None));
    };

    if !location.required && !location.path.exists() {
        debug!(path = ?location.path, "No profile config, using defaults");
        return Ok((TrackerConfig::default(), None));
    }

    let config = read_config(&location.path)?;
    debug!(path = ?location.path, "Loaded config file");
    Ok((config, Some(location.path)))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    // Env var manipulation is not thread-safe, so these tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    // Saves and restores env vars; holds the mutex for the test's duration.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), std::env::var(name).ok()))
                .collect();
            Self { vars, _lock: lock }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                // SAFETY: We hold ENV_MUTEX, so no other test thread is modifying env vars
                unsafe {
                    match value {
                        Some(v) => std::env::set_var(name, v),
                        None => std::env::remove_var(name),
                    }
                }
            }
        }
    }

    const ALL_VARS: &[&str] = &[CONFIG_ENV, PROFILE_ENV, "XDG_CONFIG_HOME"];

    #[test]
    fn test_get_profile_default() {
        let _guard = EnvGuard::new(ALL_VARS);
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe { std::env::remove_var(PROFILE_ENV) };

        assert_eq!(get_profile(), "default");
    }

    #[test]
    fn test_explicit_path_wins() {
        let _guard = EnvGuard::new(ALL_VARS);
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe { std::env::set_var(CONFIG_ENV, "/from/env.json") };

        let location = resolve_config_location(Some(Path::new("/explicit.json"))).unwrap();
        assert_eq!(location.path, PathBuf::from("/explicit.json"));
        assert!(location.required);
    }

    #[test]
    fn test_env_path_used_when_no_flag() {
        let _guard = EnvGuard::new(ALL_VARS);
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe { std::env::set_var(CONFIG_ENV, "/from/env.json") };

        let location = resolve_config_location(None).unwrap();
        assert_eq!(location.path, PathBuf::from("/from/env.json"));
        assert!(location.required);
    }

    #[test]
    fn test_empty_env_falls_through_to_profile() {
        let _guard = EnvGuard::new(ALL_VARS);
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe {
            std::env::set_var(CONFIG_ENV, "");
            std::env::set_var("XDG_CONFIG_HOME", "/home/u/.config");
            std::env::set_var(PROFILE_ENV, "kiosk");
        }

        let location = resolve_config_location(None).unwrap();
        assert_eq!(
            location.path,
            PathBuf::from("/home/u/.config/handpoint/kiosk.json")
        );
        assert!(!location.required);
    }

    #[test]
    fn test_profile_path_is_sanitized() {
        let _guard = EnvGuard::new(ALL_VARS);
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe {
            std::env::remove_var(CONFIG_ENV);
            std::env::set_var("XDG_CONFIG_HOME", "/cfg");
            std::env::set_var(PROFILE_ENV, "../../etc/passwd");
        }

        let location = resolve_config_location(None).unwrap();
        assert_eq!(location.path, PathBuf::from("/cfg/handpoint/default.json"));
    }

    #[test]
    fn test_sanitize_valid_names() {
        assert_eq!(sanitize_profile_name("default"), "default");
        assert_eq!(sanitize_profile_name("kiosk-2"), "kiosk-2");
        assert_eq!(sanitize_profile_name("_lab"), "_lab");
    }

    #[test]
    fn test_sanitize_rejects_unsafe_names() {
        assert_eq!(sanitize_profile_name(""), "default");
        assert_eq!(sanitize_profile_name(".."), "default");
        assert_eq!(sanitize_profile_name("a/b"), "default");
        assert_eq!(sanitize_profile_name("-x"), "default");
        assert_eq!(sanitize_profile_name("name\0"), "default");
        assert_eq!(sanitize_profile_name("$(whoami)"), "default");
    }

    #[test]
    fn test_load_missing_profile_uses_defaults() {
        let _guard = EnvGuard::new(ALL_VARS);
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe {
            std::env::remove_var(CONFIG_ENV);
            std::env::remove_var(PROFILE_ENV);
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let (config, source) = load_config(None).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert!(source.is_none());
    }

    #[test]
    fn test_load_profile_file() {
        let _guard = EnvGuard::new(ALL_VARS);
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("handpoint")).unwrap();
        let file = dir.path().join("handpoint").join("default.json");
        std::fs::write(&file, r#"{ "hoverDelayMs": 750, "sensitivityX": 1.5 }"#).unwrap();
        // SAFETY: We hold ENV_MUTEX via _guard
        unsafe {
            std::env::remove_var(CONFIG_ENV);
            std::env::remove_var(PROFILE_ENV);
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }

        let (config, source) = load_config(None).unwrap();
        assert_eq!(config.hover_delay_ms, 750);
        assert_eq!(config.sensitivity_x, 1.5);
        assert_eq!(config.sensitivity_y, 1.0);
        assert_eq!(source, Some(file));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let _guard = EnvGuard::new(ALL_VARS);
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");

        let err = load_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigFileError::NotFound { .. }));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, "{ hoverDelayMs: ").unwrap();

        let err = read_config(&file).unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse { .. }));
        assert!(err.to_string().contains("not valid JSON"));
    }
}
