//! Replaces an install directory with the contents of a gzip-compressed tar
//! archive.

use std::{
    fs::{self, OpenOptions},
    io::{self, Read, Seek, SeekFrom},
    path::{Component, Path, PathBuf},
};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::{debug, info};

use crate::error::{Error, IoContext, Result};
use crate::transfer::fraction;

/// Where an archive is unpacked (`root`) and which directory under it is
/// wiped first (`root/dir_name`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Installer {
    pub root: PathBuf,
    pub dir_name: String,
}

impl Installer {
    pub fn new(root: impl Into<PathBuf>, dir_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dir_name: dir_name.into(),
        }
    }

    pub fn target(&self) -> PathBuf {
        self.root.join(&self.dir_name)
    }

    /// Counts the regular files in `source`, rewinds it, deletes
    /// [`Installer::target`] and extracts every entry under `root`.
    ///
    /// `on_progress` receives `files written / files in archive` after each
    /// regular file. There is no rollback: once the old directory is gone a
    /// failure leaves whatever was extracted so far.
    pub fn install<R, F>(&self, source: &mut R, mut on_progress: F) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(f64),
    {
        let total = count_regular_files(&mut *source)?;
        source
            .seek(SeekFrom::Start(0))
            .context(|| "failed to rewind archive".into())?;
        debug!("Archive holds {total} regular files");

        let target = self.target();
        remove_dir_if_present(&target)?;
        fs::create_dir_all(&self.root)
            .context(|| format!("failed to create {}", self.root.display()))?;

        info!("Extracting {total} files into {}", self.root.display());
        let mut archive = Archive::new(GzDecoder::new(&mut *source));
        let entries = archive
            .entries()
            .context(|| "failed to read archive".into())?;

        let mut written = 0u64;
        for entry in entries {
            let mut entry = entry.context(|| "failed to read archive entry".into())?;
            let rel = entry
                .path()
                .context(|| "failed to read archive entry path".into())?
                .into_owned();
            let dest = safe_join(&self.root, &rel)?;

            match entry.header().entry_type() {
                EntryType::Directory => {
                    fs::create_dir_all(&dest)
                        .context(|| format!("failed to create {}", dest.display()))?;
                }
                kind if kind.is_file() => {
                    let mode = entry.header().mode().ok();
                    write_file(&mut entry, &dest, mode)?;
                    written += 1;
                    on_progress(fraction(written, total));
                }
                other => {
                    debug!("Skipping {} ({other:?})", rel.display());
                }
            }
        }

        if total == 0 {
            on_progress(1.0);
        }
        info!("Installed into {}", target.display());
        Ok(())
    }
}

/// First pass: regular files only, directories excluded.
fn count_regular_files<R: Read>(source: R) -> Result<u64> {
    let mut archive = Archive::new(GzDecoder::new(source));
    let mut count = 0u64;
    for entry in archive
        .entries()
        .context(|| "failed to read archive".into())?
    {
        let entry = entry.context(|| "failed to scan archive".into())?;
        if entry.header().entry_type().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!("Removed previous install {}", dir.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::io(format!("failed to remove {}", dir.display()), err)),
    }
}

fn safe_join(root: &Path, rel: &Path) -> Result<PathBuf> {
    let mut out = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafeEntryPath {
                    path: rel.to_path_buf(),
                })
            }
        }
    }
    Ok(out)
}

fn write_file<R: Read>(entry: &mut R, dest: &Path, mode: Option<u32>) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    let mut file = options
        .open(dest)
        .context(|| format!("failed to create {}", dest.display()))?;
    io::copy(entry, &mut file).context(|| format!("failed to write {}", dest.display()))?;

    if let Some(mode) = mode {
        set_mode(dest, mode).context(|| format!("failed to set mode on {}", dest.display()))?;
    }
    Ok(())
}

// Applied after writing: open() would only set the mode on new files, and
// filtered by the umask.
#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
