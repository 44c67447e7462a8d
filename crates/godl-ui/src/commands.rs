use std::path::PathBuf;

use godl_toolchain::{Error, File, Release, Stage};

/// Work requested from the background runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum UiCommand {
    FetchCatalog,
    Install { version: String, file: File },
}

impl UiCommand {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            UiCommand::FetchCatalog => "fetch_catalog",
            UiCommand::Install { .. } => "install",
        }
    }
}

/// Results posted back to the interface loop.
#[derive(Debug)]
pub(crate) enum AppEvent {
    CatalogLoaded(Vec<Release>),
    Stage(Stage),
    Progress(f64),
    Installed(PathBuf),
    Failed(Error),
}

impl AppEvent {
    pub(crate) fn is_progress(&self) -> bool {
        matches!(self, AppEvent::Progress(_))
    }
}
