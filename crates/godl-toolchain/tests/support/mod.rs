#![allow(dead_code)]

use std::{collections::HashMap, io::Write, sync::Arc};

use flate2::{write::GzEncoder, Compression};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

pub const CATALOG_JSON: &str = r#"[{"version":"go1.20.2","stable":true,"files":[{"filename":"go1.20.2.linux-amd64.tar.gz","os":"linux","arch":"amd64","version":"go1.20.2","sha256":"4eaea32f59cde4dc635fbc42161031d13e1c780b87097f4b4234cfce671f1768","size":100107955,"kind":"archive"}]},{"version":"go1.19.7","stable":true,"files":[{"filename":"go1.19.7.linux-amd64.tar.gz","os":"linux","arch":"amd64","version":"go1.19.7","sha256":"7a75720c9b066ae1750f6bcc7052aba70fa3813f4223199ee2a2315fd3eb533d","size":149010475,"kind":"archive"}]}]"#;

/// How a canned route answers.
#[derive(Clone)]
pub enum Reply {
    Body { status: u16, body: Vec<u8> },
    /// Body terminated by closing the connection, no `Content-Length`.
    Unsized { body: Vec<u8> },
    /// Accepts the request and never answers.
    Hang,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Reply::Body {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Reply::Body {
            status,
            body: body.into(),
        }
    }
}

/// Minimal HTTP/1.1 responder on an ephemeral port. Routes match the request
/// target exactly (path plus query); anything else gets a 404. Returns the
/// base URL.
pub async fn serve(routes: Vec<(&str, Reply)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<String, Reply>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, reply)| (path.to_string(), reply))
            .collect(),
    );

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let _ = answer(stream, &routes).await;
            });
        }
    });

    format!("http://{addr}")
}

/// A port nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn answer(mut stream: TcpStream, routes: &HashMap<String, Reply>) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&head);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let reply = routes
        .get(&target)
        .cloned()
        .unwrap_or_else(|| Reply::status(404, "not found"));

    match reply {
        Reply::Body { status, body } => {
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason(status),
                body.len()
            );
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(&body).await?;
        }
        Reply::Unsized { body } => {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                .await?;
            stream.write_all(&body).await?;
        }
        Reply::Hang => {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }
    stream.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8], u32),
}

/// Builds a `.tar.gz` in memory.
pub fn tar_gz(entries: &[Entry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for entry in entries {
        match entry {
            Entry::Dir(path) => {
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
            Entry::File(path, data, mode) => {
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(*mode);
                header.set_size(data.len() as u64);
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
        }
    }
    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap()
}

/// A `.tar.gz` holding one regular file whose name is written verbatim,
/// bypassing the builder's path validation.
pub fn tar_gz_raw_name(name: &str, data: &[u8]) -> Vec<u8> {
    let mut header = tar::Header::new_old();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(data.len() as u64);
    header.set_cksum();

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    builder.append(&header, data).unwrap();
    let mut encoder = builder.into_inner().unwrap();
    encoder.flush().unwrap();
    encoder.finish().unwrap()
}
