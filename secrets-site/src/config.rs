use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::serve_files::sanitize_relative_path;

const SECRET_KEY_VAR: &str = "SECRET_KEY";
const COOKIE_SECURE_VAR: &str = "SECRETS_COOKIE_SECURE";

#[derive(Debug, Parser)]
#[command(
    name = "secrets-site",
    version,
    about = "Members-only site with registration, login and a gated download"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Path of the downloadable file, relative to the static directory.
    #[arg(long, value_name = "PATH")]
    pub download_file: Option<String>,

    /// Session lifetime, e.g. `24h` or `30m`.
    #[arg(long, value_name = "DURATION")]
    pub session_ttl: Option<String>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "FILE", default_value = ".env")]
    pub env_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub static_dir: PathBuf,
    pub download_file: PathBuf,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub secret_key: SecretKey,
}

/// Cookie signing secret. Never printed.
#[derive(Clone)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("environment variable {key} must be set to a non-empty value")]
    MissingSecret { key: String },
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("invalid session ttl {value:?}: {source}")]
    InvalidDuration {
        value: String,
        source: humantime::DurationError,
    },
    #[error("session ttl must be at least one second")]
    ZeroDuration,
    #[error("download file {path:?} must be a relative path inside the static directory")]
    InvalidDownloadPath { path: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    database: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    download_file: Option<String>,
    session_ttl: Option<String>,
}

impl AppConfig {
    /// Load `.env` (if present), then merge CLI flags over the TOML file over
    /// defaults. The secret key only ever comes from the environment.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        load_env_file(&cli.env_file);
        let from_file = read_file_config(cli.config.as_deref())?;

        let bind = cli
            .bind
            .or(from_file.bind)
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 5000)));
        let database = cli
            .database
            .or(from_file.database)
            .unwrap_or_else(|| PathBuf::from("users.db"));
        let static_dir = cli
            .static_dir
            .or(from_file.static_dir)
            .unwrap_or_else(|| PathBuf::from("static"));

        let raw_download = cli
            .download_file
            .or(from_file.download_file)
            .unwrap_or_else(|| String::from("files/cheat_sheet.pdf"));
        let download_file = sanitize_relative_path(&raw_download)
            .map_err(|_| ConfigError::InvalidDownloadPath { path: raw_download })?;

        let raw_ttl = cli
            .session_ttl
            .or(from_file.session_ttl)
            .unwrap_or_else(|| String::from("24h"));
        let session_ttl = parse_ttl(&raw_ttl)?;

        let secret_key = read_secret_key()?;
        let cookie_secure = read_env_bool(COOKIE_SECURE_VAR)?.unwrap_or(false);

        Ok(Self {
            bind,
            database,
            static_dir,
            download_file,
            session_ttl,
            cookie_secure,
            secret_key,
        })
    }
}

fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(
            path = %path.display(),
            error = %err,
            "failed to load environment file"
        ),
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let ttl = humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigError::InvalidDuration {
            value: String::from(raw),
            source,
        }
    })?;
    if ttl.as_secs() == 0 {
        return Err(ConfigError::ZeroDuration);
    }
    Ok(ttl)
}

fn read_secret_key() -> Result<SecretKey, ConfigError> {
    match std::env::var(SECRET_KEY_VAR) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretKey::new(value)),
        _ => Err(ConfigError::MissingSecret {
            key: String::from(SECRET_KEY_VAR),
        }),
    }
}

fn read_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_bool_value(key, &value).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from("<non-unicode>"),
        }),
    }
}

fn parse_bool_value(key: &str, raw: &str) -> Result<bool, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvBool {
            key: String::from(key),
            value: String::from(raw),
        }),
    }
}
