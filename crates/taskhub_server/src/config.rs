//! Server configuration read from `TASKHUB_*` environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "taskhub.sqlite3";
pub const DEFAULT_STORAGE_DIR: &str = "storage/profile_pictures";
pub const DEFAULT_VERIFIER_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const DEFAULT_VERIFIER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub log_level: String,
    /// Absolute.
    pub log_dir: PathBuf,
    pub verifier_url: String,
    /// Expected `aud` claim; unchecked when absent.
    pub verifier_audience: Option<String>,
    pub verifier_timeout: Duration,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Reads the process environment.
    ///
    /// Numeric values that do not parse fall back to their defaults; an
    /// unparseable bind address is an error.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let text = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_text = text("TASKHUB_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text
            .parse::<SocketAddr>()
            .map_err(|err| format!("invalid TASKHUB_BIND `{bind_text}`: {err}"))?;

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let log_dir = text("TASKHUB_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        Ok(Self {
            bind,
            db_path: text("TASKHUB_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            storage_dir: text("TASKHUB_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            log_level: text("TASKHUB_LOG_LEVEL")
                .unwrap_or_else(|| taskhub_core::default_log_level().to_string()),
            log_dir: absolutize(&cwd, log_dir),
            verifier_url: text("TASKHUB_VERIFIER_URL")
                .unwrap_or_else(|| DEFAULT_VERIFIER_URL.to_string()),
            verifier_audience: text("TASKHUB_VERIFIER_AUDIENCE"),
            verifier_timeout: Duration::from_millis(parse_or(
                text("TASKHUB_VERIFIER_TIMEOUT_MS"),
                DEFAULT_VERIFIER_TIMEOUT_MS,
            )),
            max_body_bytes: parse_or(text("TASKHUB_MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
