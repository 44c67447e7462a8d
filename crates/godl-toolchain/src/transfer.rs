//! Streams a byte source into a sink through a fixed-size buffer, reporting
//! the fraction of the declared length written so far.

use std::io;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::watch,
};

use crate::cancel::cancelled;
use crate::error::{Error, IoContext, Result};

pub const CHUNK_SIZE: usize = 32 * 1024;

/// Copies `reader` into `sink` until end of stream and returns the number of
/// bytes written.
///
/// `total` is the length declared by the source and must be non-zero.
/// `on_progress` fires after every chunk that reached the sink. A stream that
/// ends before `total` bytes is an error, so a short body never passes as a
/// complete download.
pub async fn copy_with_progress<R, W, F>(
    source: &str,
    reader: &mut R,
    total: u64,
    sink: &mut W,
    cancel_rx: Option<&watch::Receiver<bool>>,
    mut on_progress: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(f64),
{
    if total == 0 {
        return Err(Error::UnknownLength {
            url: source.to_string(),
        });
    }

    let mut cancel_rx = cancel_rx.cloned();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let read = match cancel_rx.as_mut() {
            Some(rx) => tokio::select! {
                biased;
                _ = cancelled(rx) => return Err(Error::Cancelled),
                read = reader.read(&mut buf) => read,
            },
            None => reader.read(&mut buf).await,
        }
        .context(|| format!("failed to read {source}"))?;

        if read == 0 {
            break;
        }

        sink.write_all(&buf[..read])
            .await
            .context(|| format!("failed to write {source}"))?;
        written += read as u64;
        on_progress(fraction(written, total));
    }

    sink.flush()
        .await
        .context(|| format!("failed to flush {source}"))?;

    if written < total {
        return Err(Error::io(
            format!("failed to read {source}"),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended after {written} of {total} bytes"),
            ),
        ));
    }
    Ok(written)
}

pub(crate) fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use tokio::io::ReadBuf;

    use super::*;
    use crate::error::ErrorKind;

    const TEXT: &[u8] = b"The quick brown fox jumps over the lazy dog";

    #[tokio::test]
    async fn copies_all_bytes_and_ends_at_one() {
        let payload: Vec<u8> = (0..(CHUNK_SIZE * 2 + 123)).map(|i| i as u8).collect();
        let mut reader = payload.as_slice();
        let mut sink = Vec::new();
        let mut seen = Vec::new();

        let n = copy_with_progress(
            "test",
            &mut reader,
            payload.len() as u64,
            &mut sink,
            None,
            |f| seen.push(f),
        )
        .await
        .unwrap();

        assert_eq!(n, payload.len() as u64);
        assert_eq!(sink, payload);
        assert!(seen.len() >= 3);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn zero_length_fails_before_touching_the_sink() {
        let mut reader = TEXT;
        let mut sink = Vec::new();
        let err = copy_with_progress("test", &mut reader, 0, &mut sink, None, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownLength);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn short_stream_is_an_error() {
        let mut reader = TEXT;
        let mut sink = Vec::new();
        let err = copy_with_progress(
            "test",
            &mut reader,
            TEXT.len() as u64 + 10,
            &mut sink,
            None,
            |_| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[tokio::test]
    async fn cancelled_before_start_writes_nothing() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut reader = TEXT;
        let mut sink = Vec::new();
        let err = copy_with_progress(
            "test",
            &mut reader,
            TEXT.len() as u64,
            &mut sink,
            Some(&rx),
            |_| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(sink.is_empty());
    }

    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    #[tokio::test]
    async fn write_failure_aborts_without_progress() {
        let mut reader = TEXT;
        let mut sink = FailingWriter;
        let mut calls = 0;
        let err = copy_with_progress(
            "test",
            &mut reader,
            TEXT.len() as u64,
            &mut sink,
            None,
            |_| calls += 1,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().contains("disk full"));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let mut reader = FailingReader;
        let mut sink = Vec::new();
        let err = copy_with_progress("test", &mut reader, 10, &mut sink, None, |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(fraction(5, 10), 0.5);
        assert_eq!(fraction(12, 10), 1.0);
        assert_eq!(fraction(0, 0), 1.0);
    }
}
