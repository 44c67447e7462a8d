use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure kinds surfaced by every stage of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    RemoteUnavailable,
    TransportFailure,
    MalformedCatalog,
    NoMatchingArtifact,
    UnknownLength,
    IoFailure,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{url} answered with status {status}")]
    RemoteUnavailable { url: String, status: u16 },

    #[error("request failed: {0}")]
    TransportFailure(#[source] reqwest::Error),

    #[error("release catalog is not valid JSON: {0}")]
    MalformedCatalog(#[source] serde_json::Error),

    #[error("did not find a file for {version} matching {os}/{arch}")]
    NoMatchingArtifact {
        version: String,
        os: String,
        arch: String,
    },

    #[error("unable to calculate progress: {url} did not declare a content length")]
    UnknownLength { url: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("archive entry {} escapes the destination", path.display())]
    UnsafeEntryPath { path: PathBuf },

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RemoteUnavailable { .. } => ErrorKind::RemoteUnavailable,
            Error::TransportFailure(_) => ErrorKind::TransportFailure,
            Error::MalformedCatalog(_) => ErrorKind::MalformedCatalog,
            Error::NoMatchingArtifact { .. } => ErrorKind::NoMatchingArtifact,
            Error::UnknownLength { .. } => ErrorKind::UnknownLength,
            Error::Io { .. } | Error::UnsafeEntryPath { .. } => ErrorKind::IoFailure,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Attaches a context line to an `io::Result`, the way every disk touch in
/// this crate reports failures.
pub(crate) trait IoContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| Error::io(context(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_paths_are_io_failures() {
        let err = Error::UnsafeEntryPath {
            path: PathBuf::from("../etc/passwd"),
        };
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().contains("../etc/passwd"));
    }

    #[test]
    fn io_context_is_rendered_first() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = res.context(|| "failed to remove /usr/local/go".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.to_string(), "failed to remove /usr/local/go: denied");
    }
}
