use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_BACKEND_BASE: &str = "http://localhost:8000";
pub const DEFAULT_GREETING: &str = "Hi! Where would you like to go, or what weather should I check?";

/// Settings stored in `config.json`. Every field is optional; missing
/// values fall back to command-line flags, then defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub backend_base: Option<String>,
    pub greeting: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_base: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved settings the client runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_base: String,
    pub greeting: String,
    pub timeout: Option<Duration>,
    pub log_file: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location; a missing file or config
    /// directory yields defaults
    pub fn load() -> Result<Self> {
        match Self::get_config_path() {
            Ok(config_path) => Self::load_from(&config_path),
            Err(_) => Ok(Self::new()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Merge with overrides. Precedence: overrides, then this file, then defaults.
    pub fn resolve(self, overrides: Overrides) -> Result<Settings> {
        let backend_base = overrides
            .backend_base
            .or(self.backend_base)
            .unwrap_or_else(|| DEFAULT_BACKEND_BASE.to_string());
        let backend_base = backend_base.trim().trim_end_matches('/').to_string();
        if !(backend_base.starts_with("http://") || backend_base.starts_with("https://")) {
            return Err(anyhow!("backend base must be an http(s) URL, got {:?}", backend_base));
        }

        let timeout = match overrides.timeout_secs.or(self.timeout_secs) {
            Some(0) => return Err(anyhow!("timeout must be at least one second")),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let log_file = match overrides.log_file.or(self.log_file) {
            Some(path) => path,
            None => Self::default_log_path(),
        };

        Ok(Settings {
            backend_base,
            greeting: self.greeting.unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            timeout,
            log_file,
        })
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tripchat").join("config.json"))
    }

    fn default_log_path() -> PathBuf {
        let dir = dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(std::env::temp_dir);
        dir.join("tripchat").join("tripchat.log")
    }
}
