//! Client configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use coursekit_core::auth::AuthContext;

use crate::http::HttpBackend;

pub const API_URL_ENV: &str = "COURSEKIT_API_URL";
pub const TOKEN_ENV: &str = "COURSEKIT_TOKEN";

/// Where and how to reach the REST backend.
///
/// Note: Custom Debug impl masks the token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token from a previous login.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            timeout_secs: None,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

/// Top-level coursekit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursekitConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Where rendered answer sheets are written when no path is given.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./coursekit-reports")
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `coursekit.toml` in the current directory
/// 2. `~/.config/coursekit/config.toml`
///
/// Environment variable overrides: `COURSEKIT_API_URL`, `COURSEKIT_TOKEN`.
pub fn load_config() -> Result<CoursekitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<CoursekitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => default_config_path(),
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CoursekitConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CoursekitConfig::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        config.backend.api_url = url;
    }
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        config.backend.token = Some(token);
    }

    config.backend.api_url = resolve_env_vars(&config.backend.api_url);
    config.backend.token = config
        .backend
        .token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.trim().is_empty());

    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("coursekit.toml");
    if local.exists() {
        return Some(local);
    }
    let global = global_config_dir()?.join("config.toml");
    global.exists().then_some(global)
}

/// `~/.config/coursekit`, where `login` stores its token.
pub fn global_config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("coursekit"))
}

/// Build an HTTP backend from configuration.
pub fn connect(config: &BackendConfig) -> Result<HttpBackend> {
    let auth = config
        .token
        .as_deref()
        .map(AuthContext::new)
        .unwrap_or_default();
    HttpBackend::new(&config.api_url, auth, config.timeout_secs)
        .with_context(|| format!("failed to set up client for {}", config.api_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_COURSEKIT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_COURSEKIT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_COURSEKIT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no_close_${brace"), "no_close_${brace");
        std::env::remove_var("_COURSEKIT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = CoursekitConfig::default();
        assert_eq!(config.backend.api_url, "http://localhost:3000");
        assert!(config.backend.token.is_none());
        assert!(config.backend.timeout_secs.is_none());
    }

    #[test]
    fn parse_backend_config() {
        let toml_str = r#"
output_dir = "reports"

[backend]
api_url = "https://portal.example.com/api"
token = "abc.def.ghi"
timeout_secs = 30
"#;
        let config: CoursekitConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.api_url, "https://portal.example.com/api");
        assert_eq!(config.backend.timeout_secs, Some(30));
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn debug_masks_token() {
        let config = BackendConfig {
            token: Some("secret-token".into()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coursekit.toml");
        std::fs::write(&path, "[backend]\napi_url = \"http://127.0.0.1:9\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var(API_URL_ENV).is_err() {
            assert_eq!(config.backend.api_url, "http://127.0.0.1:9");
        }
    }
}
