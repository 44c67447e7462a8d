use serde::{Deserialize, Serialize};

use crate::catalog::{arch_is, os_is, File};

/// Operating system and architecture in the catalog's vocabulary
/// (`linux`/`darwin`/`windows`, `amd64`/`arm64`/...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn detect() -> Self {
        Self::new(
            catalog_os(std::env::consts::OS),
            catalog_arch(std::env::consts::ARCH),
        )
    }

    /// Detected platform with either half replaced when an override is set.
    pub fn with_overrides(os: Option<String>, arch: Option<String>) -> Self {
        let detected = Self::detect();
        Self {
            os: os.filter(|v| !v.trim().is_empty()).unwrap_or(detected.os),
            arch: arch.filter(|v| !v.trim().is_empty()).unwrap_or(detected.arch),
        }
    }

    pub fn predicates(&self) -> [Box<dyn Fn(&File) -> bool + '_>; 2] {
        [Box::new(os_is(&self.os)), Box::new(arch_is(&self.arch))]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

pub fn catalog_os(os: &str) -> String {
    match os {
        "macos" => "darwin".into(),
        other => other.into(),
    }
}

pub fn catalog_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64".into(),
        "aarch64" => "arm64".into(),
        "x86" => "386".into(),
        "arm" => "armv6l".into(),
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le".into(),
        "powerpc64" => "ppc64".into(),
        "loongarch64" => "loong64".into(),
        other => other.into(),
    }
}
