use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::directory::MemoryDirectory;
use common::reconcile::{ReconcilerConfig, DEFAULT_BATCH_SIZE};
use common::target::{MemoryState, MemoryTarget};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "grantsync";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Built-in role definitions the default directory knows about
const BUILTIN_ROLES: [(&str, &str); 6] = [
    ("8e3af657-a8ff-443c-a75c-2fe8c4bcb635", "Owner"),
    ("b24988ac-6180-42a0-ab88-20f7382dd24c", "Contributor"),
    ("acdd72a7-3385-48ef-bd42-f606fba81ae7", "Reader"),
    ("b7e6dc6d-f1e8-4753-8033-0f276bb0955b", "Storage Blob Data Owner"),
    ("ba92f5b4-2d11-453d-a403-e96b0029c9fe", "Storage Blob Data Contributor"),
    ("2a2b9908-6ea1-4ae2-8e65-a410df84e7d1", "Storage Blob Data Reader"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-call bound on target requests, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_secs: None,
        }
    }
}

impl From<&ReconcileSection> for ReconcilerConfig {
    fn from(section: &ReconcileSection) -> Self {
        ReconcilerConfig {
            batch_size: section.batch_size.max(1),
            timeout: section.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write a daily rolling log file here as well as to stderr
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Used as the full name of imported subscription-level grants
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub reconcile: ReconcileSection,
    #[serde(default)]
    pub directory: MemoryDirectory,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        let directory = BUILTIN_ROLES
            .iter()
            .fold(MemoryDirectory::new(), |directory, (id, name)| {
                directory.with_role(id, name)
            });

        Self {
            log_level: default_log_level(),
            log_dir: None,
            subscription_id: String::new(),
            reconcile: ReconcileSection::default(),
            directory,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the grantsync directory (~/.grantsync)
    pub app_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Get the grantsync directory path (custom or default ~/.grantsync)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&app_dir)?;
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }

    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            app_dir,
            config_path,
            config,
        })
    }
}

/// Load a target snapshot; a missing file is an empty target.
pub fn load_target(path: &Path) -> Result<MemoryTarget, StateError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no target state yet, starting empty");
        return Ok(MemoryTarget::new());
    }

    let state: MemoryState = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(MemoryTarget::from_state(state))
}

pub fn save_target(path: &Path, target: &MemoryTarget) -> Result<(), StateError> {
    fs::write(path, serde_json::to_string_pretty(&target.to_state())?)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("grantsync directory not initialized. Run 'grantsync init' first")]
    NotInitialized,

    #[error("grantsync directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
