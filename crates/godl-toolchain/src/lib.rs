//! Release catalog, artifact selection, download and install engine for Go
//! toolchains published on a `go.dev/dl`-style index.

pub mod cancel;
pub mod catalog;
pub mod client;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod platform;
pub mod transfer;

pub use catalog::{compare_versions, find_release, select_file, sort_descending, File, Release};
pub use client::ReleaseClient;
pub use error::{Error, ErrorKind, Result};
pub use extract::Installer;
pub use pipeline::{download_and_install, Observer, PipelineEvent, Stage};
pub use platform::Platform;
