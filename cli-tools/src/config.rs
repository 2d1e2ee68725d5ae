use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/api";

/// Optional settings from `<config dir>/equipment-viz/config.toml`
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct ClientConfig {
    pub server_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
}

/// Values given on the command line or through the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub session_file: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub download_dir: PathBuf,
    /// `None` means the platform default location
    pub session_file: Option<PathBuf>,
}

fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "equipment-viz", "equipment-viz")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn load_config() -> ClientConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => ClientConfig::default(),
    }
}

pub fn load_config_from(path: &Path) -> ClientConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                ClientConfig::default()
            }
        },
        Err(_) => ClientConfig::default(),
    }
}

fn default_download_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl ClientConfig {
    /// Command line and environment win over the file, the file over defaults
    pub fn resolve(self, overrides: Overrides) -> Settings {
        Settings {
            server_url: overrides
                .server_url
                .or(self.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            download_dir: overrides
                .download_dir
                .or(self.download_dir)
                .unwrap_or_else(default_download_dir),
            session_file: overrides.session_file.or(self.session_file),
        }
    }
}
