use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// `RAG_BACKEND` named a backend that does not exist.
    #[error("Unknown answering backend `{0}` (expected `process` or `mock`)")]
    UnknownBackend(String),
}

/// Runtime configuration for the question answering service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which answering backend serves queries.
    pub backend: BackendKind,
    /// Interpreter used to launch the external answering engine.
    pub runtime: String,
    /// Working directory of the answering engine.
    pub engine_dir: PathBuf,
    /// Hard deadline applied to every query.
    pub query_timeout_ms: u64,
    /// Deadline applied to the startup probe.
    pub probe_timeout_ms: u64,
    /// Optional cap on concurrently running backend processes.
    pub max_concurrent_queries: Option<usize>,
    /// Number of chunks in the knowledge corpus, reported by stats.
    pub total_chunks: u64,
    /// Categories of the knowledge corpus, reported by stats.
    pub categories: Vec<String>,
    /// Optional JSON-lines file receiving query history.
    pub query_log_file: Option<PathBuf>,
    /// Optional HTTP endpoint receiving query history.
    pub query_log_url: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported answering backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Spawn the external engine once per query.
    Process,
    /// Built-in keyword matcher, no external dependencies.
    Mock,
}

/// Corpus categories reported when `RAG_CATEGORIES` is unset.
pub const DEFAULT_CATEGORIES: [&str; 8] = [
    "speed_limits",
    "licensing",
    "safety",
    "traffic_rules",
    "insurance",
    "emergency",
    "highway_driving",
    "general",
];

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
/// Upper bound accepted for any configured timeout (one day).
pub const MAX_TIMEOUT_MS: u64 = 86_400_000;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            backend: load_env_optional("RAG_BACKEND")
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or(BackendKind::Process),
            runtime: load_env_optional("RAG_RUNTIME").unwrap_or_else(|| "python3".into()),
            engine_dir: load_env_optional("RAG_ENGINE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("backend")),
            query_timeout_ms: parse_timeout("RAG_QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS)?,
            probe_timeout_ms: parse_timeout("RAG_PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS)?,
            max_concurrent_queries: parse_optional::<usize>("RAG_MAX_CONCURRENT_QUERIES")?
                .filter(|limit| *limit > 0),
            total_chunks: parse_optional("RAG_TOTAL_CHUNKS")?.unwrap_or(0),
            categories: load_env_optional("RAG_CATEGORIES")
                .map(|value| parse_categories(&value))
                .unwrap_or_else(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()),
            query_log_file: load_env_optional("QUERY_LOG_FILE").map(PathBuf::from),
            query_log_url: load_env_optional("QUERY_LOG_URL"),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Per-query deadline as a [`Duration`].
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Startup probe deadline as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Emit the effective configuration at debug level. Call once tracing is installed.
    pub fn log_summary(&self) {
        tracing::debug!(
            backend = ?self.backend,
            runtime = %self.runtime,
            engine_dir = %self.engine_dir.display(),
            query_timeout_ms = self.query_timeout_ms,
            max_concurrent_queries = ?self.max_concurrent_queries,
            server_port = ?self.server_port,
            "Loaded configuration"
        );
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_timeout(key: &str, default_ms: u64) -> Result<u64, ConfigError> {
    parse_optional(key)?
        .map(|value| check_timeout(key, value))
        .transpose()
        .map(|value| value.unwrap_or(default_ms))
}

fn check_timeout(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be between 1 and {MAX_TIMEOUT_MS} (got {value})"
        )));
    }
    Ok(value)
}

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::UnknownBackend(s.trim().to_string())),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    CONFIG.set(config).expect("Failed to set config");
}
