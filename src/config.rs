use crate::error::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder key accepted by the quote provider for its demo symbols.
pub const DEFAULT_API_KEY: &str = "demo";
pub const DEFAULT_API_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_PROJECTS_FILE: &str = "projects.txt";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Runtime configuration for the server
///
/// Everything the stores and handlers need is passed in from here at
/// construction time; nothing reads the environment after start-up.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// Newline-delimited file backing the project list
    pub projects_file: PathBuf,

    /// Key sent to the quote provider as `apikey`
    pub api_key: String,

    /// Scheme and host of the quote provider, without a trailing slash
    pub api_base_url: String,

    /// Request timeout for quote lookups; `None` keeps the client default
    pub api_timeout: Option<Duration>,

    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000))),
            projects_file: PathBuf::from(DEFAULT_PROJECTS_FILE),
            api_key: DEFAULT_API_KEY.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_timeout: None,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment
    ///
    /// Unset variables fall back to the defaults; set but unparseable ones are
    /// an error. An unset or blank `ALPHA_VANTAGE_API_KEY` uses the `demo` key.
    ///
    /// # Errors
    /// * `ConfigError::InvalidVar` if the address or timeout cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(addr) = lookup("MINIDESK_ADDR") {
            config.bind_addr = parse_addr("MINIDESK_ADDR", &addr)?;
        }
        if let Some(path) = lookup("MINIDESK_PROJECTS_FILE") {
            config.projects_file = PathBuf::from(path);
        }
        if let Some(key) = lookup("ALPHA_VANTAGE_API_KEY") {
            if !key.trim().is_empty() {
                config.api_key = key.trim().to_string();
            }
        }
        if let Some(url) = lookup("MINIDESK_STOCK_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("MINIDESK_STOCK_TIMEOUT_SECS") {
            let parsed = secs
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidVar {
                    var: "MINIDESK_STOCK_TIMEOUT_SECS",
                    value: secs.clone(),
                    reason: e.to_string(),
                })?;
            config.api_timeout = Some(Duration::from_secs(parsed));
        }
        if let Some(dir) = lookup("MINIDESK_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Override the bind address, e.g. from a command line argument
    pub fn with_bind_addr(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_addr = parse_addr("bind address", addr)?;
        Ok(self)
    }

    /// Whether the provider's shared placeholder key is in use
    pub fn uses_demo_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

/// Load `KEY=value` lines from `path` into the process environment
///
/// Variables already set are left alone. Returns the path that was read, or
/// `None` when the file does not exist.
pub fn load_env_file(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(Some(path.to_path_buf())),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn parse_addr(var: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidVar {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
