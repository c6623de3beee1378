use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OracleConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub vector: VectorConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// How to launch and talk to the external vector-search subprocess.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VectorConfig {
    /// When false the engine runs lexical-only and never spawns the subprocess.
    pub enabled: bool,
    pub command: String,
    /// Arguments passed before `--data-dir <data_dir>`.
    pub args: Vec<String>,
    pub data_dir: String,
    pub collection: String,
    pub call_timeout_ms: u64,
    pub close_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub max_offset: usize,
    /// Exponential decay applied to |rank| when normalizing lexical scores.
    pub lexical_decay: f64,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    /// Multiplier applied to documents found by both legs.
    pub hybrid_boost: f64,
    pub leg_timeout_ms: u64,
    /// Content longer than this is truncated in results. 0 disables truncation.
    pub max_content_chars: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            vector: VectorConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 47778,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_oracle_dir()
            .join("oracle.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        let data_dir = default_oracle_dir()
            .join("chroma")
            .to_string_lossy()
            .into_owned();
        Self {
            enabled: true,
            command: "uvx".into(),
            args: vec![
                "chroma-mcp".into(),
                "--client-type".into(),
                "persistent".into(),
            ],
            data_dir,
            collection: "oracle_knowledge".into(),
            call_timeout_ms: 30_000,
            close_timeout_ms: 5_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            max_offset: 10_000,
            lexical_decay: 0.3,
            lexical_weight: 0.5,
            semantic_weight: 0.5,
            hybrid_boost: 1.1,
            leg_timeout_ms: 10_000,
            max_content_chars: 1_000,
        }
    }
}

impl VectorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Full argument list for the subprocess, data directory last.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--data-dir".into());
        args.push(expand_tilde(&self.data_dir).to_string_lossy().into_owned());
        args
    }
}

impl RetrievalConfig {
    pub fn leg_timeout(&self) -> Duration {
        Duration::from_millis(self.leg_timeout_ms)
    }
}

/// Returns `~/.oracle/`, or `./.oracle` when no home directory is known.
pub fn default_oracle_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".oracle")
}

/// Returns the default config file path: `~/.oracle/config.toml`
pub fn default_config_path() -> PathBuf {
    default_oracle_dir().join("config.toml")
}

impl OracleConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            OracleConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (ORACLE_DB, ORACLE_LOG_LEVEL, ORACLE_VECTOR_DIR, ORACLE_COLLECTION).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORACLE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ORACLE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ORACLE_VECTOR_DIR") {
            self.vector.data_dir = val;
        }
        if let Ok(val) = std::env::var("ORACLE_COLLECTION") {
            self.vector.collection = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
