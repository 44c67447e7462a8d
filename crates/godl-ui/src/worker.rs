use std::sync::Arc;

use godl_toolchain::{download_and_install, Installer, ReleaseClient};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::commands::{AppEvent, UiCommand};
use crate::ui_events::UiEventSender;

/// Runs commands from the interface on the background runtime and reports
/// back through the event queue.
pub(crate) struct Worker {
    pub(crate) client: ReleaseClient,
    pub(crate) installer: Installer,
    pub(crate) cancel_rx: watch::Receiver<bool>,
    pub(crate) ui_events: UiEventSender,
}

impl Worker {
    pub(crate) async fn run(self, mut cmd_rx: mpsc::Receiver<UiCommand>) {
        let worker = Arc::new(self);
        while let Some(cmd) = cmd_rx.recv().await {
            info!("Worker received {}", cmd.name());
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.handle_command(cmd).await });
        }
    }

    async fn handle_command(&self, cmd: UiCommand) {
        let cmd_name = cmd.name();
        let event = match cmd {
            UiCommand::FetchCatalog => match self.client.fetch_catalog(Some(&self.cancel_rx)).await
            {
                Ok(releases) => AppEvent::CatalogLoaded(releases),
                Err(err) => AppEvent::Failed(err),
            },
            UiCommand::Install { version, file } => {
                info!("Installing {version} from {}", self.client.file_url(&file));
                match download_and_install(
                    &self.client,
                    &file,
                    &self.installer,
                    Some(&self.cancel_rx),
                    self.ui_events.clone(),
                )
                .await
                {
                    Ok(path) => AppEvent::Installed(path),
                    Err(err) => AppEvent::Failed(err),
                }
            }
        };
        if let AppEvent::Failed(err) = &event {
            warn!("{cmd_name} failed: {err}");
        }
        self.ui_events.send(event);
    }
}
