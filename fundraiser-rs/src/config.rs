use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::password::HasherConfig;

const SESSION_SECRET_ENV: &str = "FUNDRAISER_SESSION_SECRET";
const COOKIE_SECURE_ENV: &str = "FUNDRAISER_COOKIE_SECURE";

#[derive(Debug, Parser)]
#[command(
    name = "fundraiser-rs",
    version,
    about = "Charity fundraising web service"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// Directory holding the data snapshot. Omit to keep data in memory only.
    #[arg(long, short = 'd', value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub data_dir: Option<PathBuf>,
    /// Base64 signing secret for session cookies.
    pub session_secret: Option<String>,
    pub cookie_secure: bool,
    pub password_hash: HasherConfig,
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
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("env var {key} is not valid unicode")]
    NonUnicodeEnv { key: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    data_dir: Option<PathBuf>,
    session_secret: Option<String>,
    cookie_secure: Option<bool>,
    #[serde(default)]
    password_hash: HasherConfig,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;

        let bind = cli
            .bind
            .or(from_file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));
        let data_dir = cli.data_dir.or(from_file.data_dir);
        let session_secret = read_env_string(SESSION_SECRET_ENV)?
            .or(from_file.session_secret)
            .filter(|secret| !secret.trim().is_empty());
        let cookie_secure = read_env_bool(COOKIE_SECURE_ENV)?
            .or(from_file.cookie_secure)
            .unwrap_or(false);

        Ok(Self {
            bind,
            data_dir,
            session_secret,
            cookie_secure,
            password_hash: from_file.password_hash,
        })
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

    parse_file_config(path, &raw)
}

fn parse_file_config(path: &Path, raw: &str) -> Result<FileConfig, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicodeEnv {
            key: String::from(key),
        }),
    }
}

fn read_env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    read_env_string(key)?
        .map(|value| parse_bool_value(key, &value))
        .transpose()
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
