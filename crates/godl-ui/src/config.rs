use std::{fs, io, path::PathBuf, time::Duration};

use godl_toolchain::Platform;
use godl_util::{
    default_base_url, default_install_dir, default_install_root, default_timeout_secs, env_flag,
    env_value, state_file_path, write_json_atomic, ARCH_ENV, BASE_URL_ENV, INCLUDE_ALL_ENV,
    INSTALL_DIR_ENV, INSTALL_ROOT_ENV, OS_ENV, TIMEOUT_ENV,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

const UI_CONFIG_FILE: &str = "ui-config.json";
const DEFAULT_COMPLETION_DWELL_MS: u64 = 750;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) base_url: String,
    pub(crate) install_root: String,
    pub(crate) install_dir: String,
    /// Empty means the running platform.
    pub(crate) os: String,
    pub(crate) arch: String,
    pub(crate) request_timeout_secs: u64,
    pub(crate) include_all: bool,
    pub(crate) completion_dwell_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            install_root: default_install_root(),
            install_dir: default_install_dir(),
            os: env_value(OS_ENV).unwrap_or_default(),
            arch: env_value(ARCH_ENV).unwrap_or_default(),
            request_timeout_secs: default_timeout_secs(),
            include_all: env_flag(INCLUDE_ALL_ENV).unwrap_or(false),
            completion_dwell_ms: DEFAULT_COMPLETION_DWELL_MS,
        }
    }
}

impl AppConfig {
    pub(crate) fn load() -> Self {
        let mut cfg = AppConfig::default();
        let path = ui_config_path();
        match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<AppConfig>(&data) {
                Ok(file_cfg) => cfg.merge_file(file_cfg, |key| env_value(key).is_some()),
                Err(err) => warn!("Failed to parse {}: {err}", path.display()),
            },
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}", path.display());
                }
            }
        }
        cfg
    }

    pub(crate) fn save(&self) -> io::Result<PathBuf> {
        let path = ui_config_path();
        write_json_atomic(&path, self)?;
        Ok(path)
    }

    /// Takes values from the config file unless the matching environment
    /// variable is set.
    fn merge_file(&mut self, file_cfg: AppConfig, env_is_set: impl Fn(&str) -> bool) {
        if !env_is_set(BASE_URL_ENV) && !file_cfg.base_url.is_empty() {
            self.base_url = file_cfg.base_url;
        }
        if !env_is_set(INSTALL_ROOT_ENV) && !file_cfg.install_root.is_empty() {
            self.install_root = file_cfg.install_root;
        }
        if !env_is_set(INSTALL_DIR_ENV) && !file_cfg.install_dir.is_empty() {
            self.install_dir = file_cfg.install_dir;
        }
        if !env_is_set(OS_ENV) && !file_cfg.os.is_empty() {
            self.os = file_cfg.os;
        }
        if !env_is_set(ARCH_ENV) && !file_cfg.arch.is_empty() {
            self.arch = file_cfg.arch;
        }
        if !env_is_set(TIMEOUT_ENV) && file_cfg.request_timeout_secs > 0 {
            self.request_timeout_secs = file_cfg.request_timeout_secs;
        }
        if !env_is_set(INCLUDE_ALL_ENV) {
            self.include_all = file_cfg.include_all;
        }
        self.completion_dwell_ms = file_cfg.completion_dwell_ms;
    }

    pub(crate) fn platform(&self) -> Platform {
        Platform::with_overrides(Some(self.os.clone()), Some(self.arch.clone()))
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub(crate) fn completion_dwell(&self) -> Duration {
        Duration::from_millis(self.completion_dwell_ms)
    }
}

fn ui_config_path() -> PathBuf {
    state_file_path(UI_CONFIG_FILE)
}
