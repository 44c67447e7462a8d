mod support;

use std::{fs, time::Duration};

use godl_toolchain::{
    download_and_install, sort_descending, ErrorKind, Installer, PipelineEvent, Platform,
    ReleaseClient, Stage,
};
use support::{serve, tar_gz, Entry, Reply};
use tokio::sync::mpsc;

const CATALOG: &str = r#"[
  {"version":"go1.19.7","stable":true,"files":[
    {"filename":"go1.19.7.linux-amd64.tar.gz","os":"linux","arch":"amd64","kind":"archive"}]},
  {"version":"go1.20.2","stable":true,"files":[
    {"filename":"go1.20.2.src.tar.gz","os":"","arch":"","kind":"source"},
    {"filename":"go1.20.2.linux-amd64.tar.gz","os":"linux","arch":"amd64","kind":"archive"}]}
]"#;

fn drain(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn installs_the_newest_release_for_the_platform() {
    let archive = tar_gz(&[
        Entry::Dir("go/"),
        Entry::File("go/VERSION", b"go1.20.2\n", 0o644),
        Entry::File("go/bin/go", b"binary", 0o755),
    ]);
    let base = serve(vec![
        ("/?mode=json", Reply::ok(CATALOG)),
        ("/go1.20.2.linux-amd64.tar.gz", Reply::ok(archive)),
    ])
    .await;
    let client = ReleaseClient::new(&base, Duration::from_secs(5)).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let installer = Installer::new(tmp.path(), "go");

    let mut releases = client.fetch_catalog(None).await.unwrap();
    sort_descending(&mut releases);
    let file = releases[0]
        .file_for(&Platform::new("linux", "amd64"))
        .unwrap()
        .clone();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let target = download_and_install(&client, &file, &installer, None, tx)
        .await
        .unwrap();

    assert_eq!(target, tmp.path().join("go"));
    assert_eq!(
        fs::read_to_string(target.join("VERSION")).unwrap(),
        "go1.20.2\n"
    );

    let events = drain(&mut rx);
    assert_eq!(
        events.first(),
        Some(&PipelineEvent::Stage(Stage::Downloading))
    );
    let extracting = events
        .iter()
        .position(|e| *e == PipelineEvent::Stage(Stage::Extracting))
        .unwrap();
    assert!(events[1..extracting]
        .iter()
        .all(|e| matches!(e, PipelineEvent::Progress(_))));
    assert_eq!(events[extracting - 1], PipelineEvent::Progress(1.0));
    assert_eq!(events[extracting + 1..].len(), 2);
    assert_eq!(events.last(), Some(&PipelineEvent::Progress(1.0)));
}

#[tokio::test]
async fn unknown_length_never_touches_the_install() {
    let base = serve(vec![(
        "/go1.20.2.linux-amd64.tar.gz",
        Reply::Unsized {
            body: b"whatever".to_vec(),
        },
    )])
    .await;
    let client = ReleaseClient::new(&base, Duration::from_secs(5)).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let old = tmp.path().join("go/VERSION");
    fs::create_dir_all(old.parent().unwrap()).unwrap();
    fs::write(&old, b"go1.19.7\n").unwrap();

    let file = godl_toolchain::File {
        filename: "go1.20.2.linux-amd64.tar.gz".into(),
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let err = download_and_install(
        &client,
        &file,
        &Installer::new(tmp.path(), "go"),
        None,
        tx,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownLength);
    assert_eq!(fs::read_to_string(&old).unwrap(), "go1.19.7\n");
    let events = drain(&mut rx);
    assert!(!events.contains(&PipelineEvent::Stage(Stage::Extracting)));
}

#[tokio::test]
async fn cancelled_download_skips_extraction() {
    let base = serve(vec![("/go.tar.gz", Reply::Hang)]).await;
    let client = ReleaseClient::new(&base, Duration::from_secs(5)).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let file = godl_toolchain::File {
        filename: "go.tar.gz".into(),
        ..Default::default()
    };
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(true);
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let err = download_and_install(
        &client,
        &file,
        &Installer::new(tmp.path(), "go"),
        Some(&cancel_rx),
        tx,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(!tmp.path().join("go").exists());
    let events = drain(&mut rx);
    assert!(!events.contains(&PipelineEvent::Stage(Stage::Extracting)));
}
