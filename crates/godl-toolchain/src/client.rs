use std::{future::Future, io, time::Duration};

use futures_util::TryStreamExt;
use reqwest::{Client, Response};
use tokio::{io::AsyncWrite, sync::watch};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::cancel::cancelled;
use crate::catalog::{File, Release};
use crate::error::{Error, Result};
use crate::transfer::copy_with_progress;

/// Read-only client for a download index such as `https://go.dev/dl`.
#[derive(Clone, Debug)]
pub struct ReleaseClient {
    base_url: String,
    include_all: bool,
    timeout: Duration,
    http: Client,
}

impl ReleaseClient {
    /// `timeout` bounds connecting and the whole catalog request. Archive
    /// downloads are only bounded by the connect timeout and cancellation.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("godl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .build()
            .map_err(Error::TransportFailure)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            include_all: false,
            timeout,
            http,
        })
    }

    /// Also list archived and unstable releases.
    pub fn include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn catalog_url(&self) -> String {
        if self.include_all {
            format!("{}/?mode=json&include=all", self.base_url)
        } else {
            format!("{}/?mode=json", self.base_url)
        }
    }

    pub fn file_url(&self, file: &File) -> String {
        format!("{}/{}", self.base_url, file.filename)
    }

    /// Releases in the order the index returned them.
    pub async fn fetch_catalog(
        &self,
        cancel_rx: Option<&watch::Receiver<bool>>,
    ) -> Result<Vec<Release>> {
        let url = self.catalog_url();
        info!("Fetching release catalog {url}");

        let resp = self.get(&url, Some(self.timeout), cancel_rx).await?;
        let body = with_cancel(cancel_rx, resp.bytes())
            .await?
            .map_err(Error::TransportFailure)?;
        let releases: Vec<Release> =
            serde_json::from_slice(&body).map_err(Error::MalformedCatalog)?;

        debug!("Catalog lists {} releases", releases.len());
        Ok(releases)
    }

    /// Streams `file` from the index into `sink`.
    ///
    /// Fails with `UnknownLength` before writing anything when the response
    /// does not declare a non-zero length. The sink is left as-is on any
    /// failure; its contents must then be treated as incomplete.
    pub async fn download<W, F>(
        &self,
        file: &File,
        sink: &mut W,
        cancel_rx: Option<&watch::Receiver<bool>>,
        on_progress: F,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
        F: FnMut(f64),
    {
        let url = self.file_url(file);
        info!("Downloading {url}");

        let resp = self.get(&url, None, cancel_rx).await?;
        let total = match resp.content_length() {
            Some(len) if len > 0 => len,
            _ => return Err(Error::UnknownLength { url }),
        };

        let body = StreamReader::new(resp.bytes_stream().map_err(io::Error::other));
        tokio::pin!(body);
        let written =
            copy_with_progress(&url, &mut body, total, sink, cancel_rx, on_progress).await?;
        info!("Downloaded {written} bytes from {url}");
        Ok(written)
    }

    async fn get(
        &self,
        url: &str,
        timeout: Option<Duration>,
        cancel_rx: Option<&watch::Receiver<bool>>,
    ) -> Result<Response> {
        let mut req = self.http.get(url);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        let resp = with_cancel(cancel_rx, req.send())
            .await?
            .map_err(Error::TransportFailure)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

async fn with_cancel<T>(
    cancel_rx: Option<&watch::Receiver<bool>>,
    fut: impl Future<Output = T>,
) -> Result<T> {
    match cancel_rx.cloned() {
        Some(mut rx) => tokio::select! {
            biased;
            _ = cancelled(&mut rx) => Err(Error::Cancelled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}
