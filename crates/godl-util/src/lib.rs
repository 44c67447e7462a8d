use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BASE_URL: &str = "https://go.dev/dl";
pub const DEFAULT_INSTALL_ROOT: &str = "/usr/local";
pub const DEFAULT_INSTALL_DIR: &str = "go";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const BASE_URL_ENV: &str = "GODL_BASE_URL";
pub const INSTALL_ROOT_ENV: &str = "GODL_INSTALL_ROOT";
pub const INSTALL_DIR_ENV: &str = "GODL_INSTALL_DIR";
pub const OS_ENV: &str = "GODL_OS";
pub const ARCH_ENV: &str = "GODL_ARCH";
pub const TIMEOUT_ENV: &str = "GODL_TIMEOUT_SECS";
pub const INCLUDE_ALL_ENV: &str = "GODL_INCLUDE_ALL";
pub const DATA_DIR_ENV: &str = "GODL_DATA_DIR";

pub fn env_or(key: &str, default: &str) -> String {
    env_value(key).unwrap_or_else(|| default.to_string())
}

/// Non-empty, trimmed value of an environment variable.
pub fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn env_flag(key: &str) -> Option<bool> {
    env_value(key).and_then(|value| parse_flag(&value))
}

pub fn env_u64(key: &str) -> Option<u64> {
    env_value(key).and_then(|value| value.parse().ok())
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn default_base_url() -> String {
    env_or(BASE_URL_ENV, DEFAULT_BASE_URL)
}

pub fn default_install_root() -> String {
    env_or(INSTALL_ROOT_ENV, DEFAULT_INSTALL_ROOT)
}

pub fn default_install_dir() -> String {
    env_or(INSTALL_DIR_ENV, DEFAULT_INSTALL_DIR)
}

pub fn default_timeout_secs() -> u64 {
    env_u64(TIMEOUT_ENV).unwrap_or(DEFAULT_TIMEOUT_SECS)
}

pub fn data_dir() -> PathBuf {
    if let Some(dir) = env_value(DATA_DIR_ENV) {
        return expand_user(&dir);
    }
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/godl")
    } else {
        PathBuf::from("/tmp/godl")
    }
}

pub fn state_dir() -> PathBuf {
    data_dir().join("state")
}

pub fn state_file_path(file_name: &str) -> PathBuf {
    state_dir().join(file_name)
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let rest = path.strip_prefix("~/").unwrap_or("");
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn env_filter() -> Result<EnvFilter, Box<dyn std::error::Error>> {
    Ok(EnvFilter::from_default_env().add_directive("info".parse()?))
}

/// Logs to stderr. For processes that do not own the terminal.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// Logs to a daily rolling file under `dir`. The returned guard must be held
/// until exit or buffered lines are lost.
pub fn init_file_tracing(
    dir: &Path,
    file_prefix: &str,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
