//! Release catalog as served by the download index, plus the ordering and
//! file-selection rules applied to it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::platform::Platform;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub version: String,
    pub stable: bool,
    pub files: Vec<File>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub filename: String,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub sha256: String,
    pub size: u64,
    pub kind: String,
}

/// A rule over file attributes. Selection requires every predicate to hold.
pub type Predicate<'a> = &'a dyn Fn(&File) -> bool;

/// First file, in catalog order, satisfying every predicate.
pub fn select_file<'a>(files: &'a [File], predicates: &[Predicate<'_>]) -> Option<&'a File> {
    files
        .iter()
        .find(|file| predicates.iter().all(|predicate| predicate(file)))
}

pub fn os_is(os: &str) -> impl Fn(&File) -> bool + '_ {
    move |file| file.os == os
}

pub fn arch_is(arch: &str) -> impl Fn(&File) -> bool + '_ {
    move |file| file.arch == arch
}

pub fn kind_is(kind: &str) -> impl Fn(&File) -> bool + '_ {
    move |file| file.kind == kind
}

impl Release {
    pub fn select_file(&self, predicates: &[Predicate<'_>]) -> Option<&File> {
        select_file(&self.files, predicates)
    }

    pub fn file_for(&self, platform: &Platform) -> Result<&File> {
        let os = os_is(&platform.os);
        let arch = arch_is(&platform.arch);
        self.select_file(&[&os, &arch])
            .ok_or_else(|| Error::NoMatchingArtifact {
                version: self.version.clone(),
                os: platform.os.clone(),
                arch: platform.arch.clone(),
            })
    }

    pub fn label(&self) -> String {
        if self.stable {
            self.version.clone()
        } else {
            format!("{} (unstable)", self.version)
        }
    }
}

pub fn find_release<'a>(releases: &'a [Release], version: &str) -> Option<&'a Release> {
    releases.iter().find(|release| release.version == version)
}

/// Newest first. Ties keep their catalog order.
pub fn sort_descending(releases: &mut [Release]) {
    releases.sort_by(|a, b| compare_versions(&b.version, &a.version));
}

/// Orders release identifiers such as `go1.20.2`, `1.21rc1` or `go1.9beta2`.
///
/// Numeric components compare as numbers with missing trailing components
/// read as zero. On the last component a `beta<N>` or `rc<N>` suffix sorts
/// before the final release (beta < rc < final). When everything else ties
/// the identifier with fewer written components is the older one. Anything
/// that does not parse sorts below every parsable identifier and falls back
/// to plain string order among its peers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (ParsedVersion::parse(a), ParsedVersion::parse(b)) {
        (Some(left), Some(right)) => left.cmp_to(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedVersion {
    numbers: Vec<u64>,
    pre: Option<(u8, u64)>,
}

impl ParsedVersion {
    fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix("go").unwrap_or(trimmed);
        if trimmed.is_empty() {
            return None;
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        let mut numbers = Vec::with_capacity(parts.len());
        let mut pre = None;
        for (idx, part) in parts.iter().enumerate() {
            let digits = part
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(part.len());
            if digits == 0 {
                return None;
            }
            numbers.push(part[..digits].parse().ok()?);
            let suffix = &part[digits..];
            if !suffix.is_empty() {
                if idx + 1 != parts.len() {
                    return None;
                }
                pre = Some(parse_pre_release(suffix)?);
            }
        }
        Some(Self { numbers, pre })
    }

    fn cmp_to(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for idx in 0..len {
            let left = self.numbers.get(idx).copied().unwrap_or(0);
            let right = other.numbers.get(idx).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        let pre = match (self.pre, other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(left), Some(right)) => left.cmp(&right),
        };
        pre.then(self.numbers.len().cmp(&other.numbers.len()))
    }
}

fn parse_pre_release(suffix: &str) -> Option<(u8, u64)> {
    for (rank, tag) in ["beta", "rc"].iter().enumerate() {
        if let Some(number) = suffix.strip_prefix(tag) {
            return number.parse().ok().map(|n| (rank as u8, n));
        }
    }
    None
}
