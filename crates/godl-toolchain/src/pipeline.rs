//! Download-then-install chain run by a background worker.

use std::{
    io::{Seek, SeekFrom},
    path::PathBuf,
};

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cancel::cancel_requested;
use crate::catalog::File;
use crate::client::ReleaseClient;
use crate::error::{Error, IoContext, Result};
use crate::extract::Installer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Extracting,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineEvent {
    Stage(Stage),
    Progress(f64),
}

/// Receives stage changes and progress fractions from the worker. Progress
/// does not say which stage produced it; the last `Stage` event does.
pub trait Observer: Clone + Send + Sync + 'static {
    fn notify(&self, event: PipelineEvent);
}

impl Observer for mpsc::UnboundedSender<PipelineEvent> {
    fn notify(&self, event: PipelineEvent) {
        let _ = self.send(event);
    }
}

/// Downloads `file` to a fresh temporary file, then installs it with
/// `installer`. Returns the installed directory.
///
/// The temporary file is removed after a successful install only; on failure
/// it stays behind, possibly truncated.
pub async fn download_and_install<O: Observer>(
    client: &ReleaseClient,
    file: &File,
    installer: &Installer,
    cancel_rx: Option<&watch::Receiver<bool>>,
    observer: O,
) -> Result<PathBuf> {
    let tmp_path = temp_download_path(file);
    let mut out = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .await
        .context(|| format!("failed to create {}", tmp_path.display()))?;

    observer.notify(PipelineEvent::Stage(Stage::Downloading));
    let progress = observer.clone();
    client
        .download(file, &mut out, cancel_rx, move |fraction| {
            progress.notify(PipelineEvent::Progress(fraction))
        })
        .await?;

    if cancel_requested(cancel_rx) {
        return Err(Error::Cancelled);
    }

    let mut archive = out.into_std().await;
    observer.notify(PipelineEvent::Stage(Stage::Extracting));
    let task_installer = installer.clone();
    let progress = observer.clone();
    tokio::task::spawn_blocking(move || {
        archive
            .seek(SeekFrom::Start(0))
            .context(|| "failed to rewind download".into())?;
        task_installer.install(&mut archive, |fraction| {
            progress.notify(PipelineEvent::Progress(fraction))
        })
    })
    .await
    .map_err(|err| Error::io("install task failed", std::io::Error::other(err)))??;

    if let Err(err) = tokio::fs::remove_file(&tmp_path).await {
        warn!("Failed to remove {}: {err}", tmp_path.display());
    }
    let target = installer.target();
    info!("Installed {} into {}", file.version, target.display());
    Ok(target)
}

fn temp_download_path(file: &File) -> PathBuf {
    let name = file.filename.rsplit('/').next().unwrap_or_default();
    let name = if name.is_empty() { "download" } else { name };
    std::env::temp_dir().join(format!("godl-{}-{}", Uuid::new_v4(), name))
}
