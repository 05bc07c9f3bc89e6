use serde::{Deserialize, Serialize};

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_PATH_VAR: &str = "NOTE_BOARD_CONFIG";
const CONFIG_FILE: &str = "config.yaml";
const EXAMPLE_CONFIG_FILE: &str = "config.example.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Largest image body accepted by the upload route
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Http,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Identity used by the memory backend
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_media_prefix")]
    pub media_prefix: String,
    #[serde(default = "default_signed_url_ttl", with = "humantime_serde")]
    pub signed_url_ttl: Duration,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

const fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_user() -> String {
    "local".to_string()
}

fn default_media_prefix() -> String {
    "media".to_string()
}

const fn default_signed_url_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl BackendConfig {
    /// Memory backend for `user` with every optional setting at its default.
    pub fn memory(user: &str) -> Self {
        Self {
            kind: BackendKind::Memory,
            base_url: String::new(),
            api_token: None,
            user: user.to_string(),
            media_prefix: default_media_prefix(),
            signed_url_ttl: default_signed_url_ttl(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn parse_kind(value: &str) -> Result<BackendKind, String> {
    match value {
        "http" => Ok(BackendKind::Http),
        "memory" => Ok(BackendKind::Memory),
        other => Err(format!("unknown backend kind '{other}'")),
    }
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let port = env::var("NOTE_BOARD_PORT")
        .map_err(|_| "NOTE_BOARD_PORT environment variable is required")?
        .parse::<u16>()
        .map_err(|e| format!("Failed to parse NOTE_BOARD_PORT: {e}"))?;

    let kind = parse_kind(
        &env::var("BACKEND_KIND").map_err(|_| "BACKEND_KIND environment variable is required")?,
    )?;

    let base_url = match kind {
        BackendKind::Http => env::var("BACKEND_BASE_URL")
            .map_err(|_| "BACKEND_BASE_URL environment variable is required for http backend")?,
        BackendKind::Memory => String::new(),
    };

    let user = env::var("BACKEND_USER").unwrap_or_else(|_| default_user());
    let backend = BackendConfig {
        kind,
        base_url,
        api_token: env::var("BACKEND_API_TOKEN").ok(),
        ..BackendConfig::memory(&user)
    };

    let max_upload_bytes = match env::var("NOTE_BOARD_MAX_UPLOAD_BYTES") {
        Ok(value) => value
            .parse::<usize>()
            .map_err(|e| format!("Failed to parse NOTE_BOARD_MAX_UPLOAD_BYTES: {e}"))?,
        Err(_) => default_max_upload_bytes(),
    };

    Ok(Config {
        port,
        max_upload_bytes,
        backend,
    })
}

/// Files to try, in order: the one named by `NOTE_BOARD_CONFIG`, then
/// `config.yaml`, then `config.example.yaml`. Each path appears once.
fn candidate_paths(explicit: Option<String>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let defaults = [CONFIG_FILE, EXAMPLE_CONFIG_FILE].map(PathBuf::from);

    for path in explicit.map(PathBuf::from).into_iter().chain(defaults) {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    paths
}

/// Parses the first existing file among `paths`.
fn read_first(paths: &[PathBuf]) -> Result<Option<(&Path, Config)>, Box<dyn std::error::Error>> {
    let Some(path) = paths.iter().find(|path| path.exists()) else {
        return Ok(None);
    };

    let contents = fs::read_to_string(path)?;
    let cfg = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Invalid config in '{}': {e}", path.display()))?;

    Ok(Some((path.as_path(), cfg)))
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let paths = candidate_paths(env::var(CONFIG_PATH_VAR).ok());

    if let Some((path, cfg)) = read_first(&paths)? {
        if path.ends_with(EXAMPLE_CONFIG_FILE) {
            tracing::warn!(
                "Using example settings from '{}', provide a real {} before deploying",
                path.display(),
                CONFIG_FILE
            );
        } else {
            tracing::info!("Read config from '{}'", path.display());
        }
        return Ok(cfg);
    }

    tracing::info!("No config file present, reading settings from the environment");
    load_from_env().map_err(|e| {
        let tried: Vec<String> = paths.iter().map(|path| path.display().to_string()).collect();
        Box::<dyn std::error::Error>::from(format!(
            "No usable configuration: none of [{}] exists and the environment is incomplete ({e})",
            tried.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_yaml() {
        let yaml = r"
port: 8000
backend:
  kind: http
  base_url: http://localhost:9000
  api_token: secret
  media_prefix: uploads
  signed_url_ttl: 5m
  request_timeout: 10s
";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(cfg.backend.kind, BackendKind::Http);
        assert_eq!(cfg.backend.api_token.as_deref(), Some("secret"));
        assert_eq!(cfg.backend.media_prefix, "uploads");
        assert_eq!(cfg.backend.signed_url_ttl, Duration::from_secs(300));
        assert_eq!(cfg.backend.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn memory_backend_fills_defaults() {
        let yaml = "port: 8080\nbackend:\n  kind: memory\n  user: u1\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(cfg.backend.kind, BackendKind::Memory);
        assert_eq!(cfg.backend.user, "u1");
        assert_eq!(cfg.backend.media_prefix, "media");
        assert_eq!(cfg.backend.signed_url_ttl, Duration::from_secs(900));
        assert!(cfg.backend.api_token.is_none());
    }

    #[test]
    fn explicit_config_path_is_tried_first_and_once() {
        assert_eq!(
            candidate_paths(Some("/etc/note-board.yaml".to_string())),
            [
                PathBuf::from("/etc/note-board.yaml"),
                PathBuf::from(CONFIG_FILE),
                PathBuf::from(EXAMPLE_CONFIG_FILE)
            ]
        );
        assert_eq!(
            candidate_paths(Some(CONFIG_FILE.to_string())),
            [PathBuf::from(CONFIG_FILE), PathBuf::from(EXAMPLE_CONFIG_FILE)]
        );
        assert_eq!(candidate_paths(None).len(), 2);
    }

    #[test]
    fn first_existing_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("missing.yaml");
        let real = dir.path().join(CONFIG_FILE);
        let example = dir.path().join(EXAMPLE_CONFIG_FILE);
        fs::write(&real, "port: 8001\nbackend:\n  kind: memory\n").unwrap();
        fs::write(&example, "port: 8002\nbackend:\n  kind: memory\n").unwrap();
        let paths = [explicit, real.clone(), example.clone()];

        let (path, cfg) = read_first(&paths).unwrap().unwrap();
        assert_eq!(path, real.as_path());
        assert_eq!(cfg.port, 8001);

        fs::remove_file(&real).unwrap();
        let (path, cfg) = read_first(&paths).unwrap().unwrap();
        assert_eq!(path, example.as_path());
        assert_eq!(cfg.port, 8002);

        fs::remove_file(&example).unwrap();
        assert!(read_first(&paths).unwrap().is_none());
    }

    #[test]
    fn broken_file_is_an_error_not_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join(CONFIG_FILE);
        fs::write(&broken, "port: [not a number").unwrap();

        assert!(read_first(&[broken]).is_err());
    }

    #[test]
    fn rejects_unknown_backend_kind() {
        assert!(parse_kind("ftp").is_err());
        assert_eq!(parse_kind("memory"), Ok(BackendKind::Memory));
    }
}
