use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use godl_toolchain::{
    download_and_install, find_release, sort_descending, Installer, Observer, PipelineEvent,
    Platform, Release, ReleaseClient,
};
use godl_util::{
    default_base_url, default_install_dir, default_install_root, default_timeout_secs, env_flag,
    env_value, expand_user, init_tracing, ARCH_ENV, INCLUDE_ALL_ENV, OS_ENV,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "godl", version, about = "List and install Go releases")]
struct Cli {
    #[command(flatten)]
    opts: SharedOpts,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct SharedOpts {
    #[arg(long, global = true, default_value_t = default_base_url())]
    base_url: String,
    #[arg(long, global = true, default_value_t = default_install_root())]
    install_root: String,
    #[arg(long, global = true, default_value_t = default_install_dir())]
    install_dir: String,
    /// Defaults to the running platform.
    #[arg(long, global = true)]
    os: Option<String>,
    #[arg(long, global = true)]
    arch: Option<String>,
    #[arg(long, global = true, default_value_t = default_timeout_secs())]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Cmd {
    /// List releases, newest first
    List {
        /// Include archived and unstable releases
        #[arg(long)]
        all: bool,
        /// Print the sorted catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download a release and install it, replacing the previous install
    Install {
        version: String,
        #[arg(long)]
        all: bool,
    },
}

impl SharedOpts {
    fn client(&self, all: bool) -> Result<ReleaseClient, godl_toolchain::Error> {
        let include_all = all || env_flag(INCLUDE_ALL_ENV).unwrap_or(false);
        Ok(
            ReleaseClient::new(&self.base_url, Duration::from_secs(self.timeout_secs.max(1)))?
                .include_all(include_all),
        )
    }

    fn platform(&self) -> Platform {
        Platform::with_overrides(
            self.os.clone().or_else(|| env_value(OS_ENV)),
            self.arch.clone().or_else(|| env_value(ARCH_ENV)),
        )
    }

    fn installer(&self) -> Installer {
        Installer::new(expand_user(&self.install_root), self.install_dir.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;
    let cli = Cli::parse();
    let platform = cli.opts.platform();

    match cli.cmd {
        Cmd::List { all, json } => {
            let client = cli.opts.client(all)?;
            let mut releases = client.fetch_catalog(None).await?;
            sort_descending(&mut releases);

            if json {
                println!("{}", serde_json::to_string_pretty(&releases)?);
            } else {
                for release in &releases {
                    println!("{}", list_row(release, &platform));
                }
            }
        }
        Cmd::Install { version, all } => {
            let client = cli.opts.client(all)?;
            let mut releases = client.fetch_catalog(None).await?;
            sort_descending(&mut releases);
            let release = find_release(&releases, &version)
                .ok_or_else(|| format!("unknown release {version}"))?;
            let file = release.file_for(&platform)?;
            info!("Installing {} ({}) for {platform}", release.version, file.filename);

            let installer = cli.opts.installer();
            let target =
                download_and_install(&client, file, &installer, None, LogReporter::default())
                    .await?;
            println!("{}", target.display());
        }
    }

    Ok(())
}

fn list_row(release: &Release, platform: &Platform) -> String {
    let stability = if release.stable { "stable" } else { "unstable" };
    let filename = release
        .file_for(platform)
        .map(|file| file.filename.as_str())
        .unwrap_or("-");
    format!("{}\t{stability}\t{filename}", release.version)
}

/// Logs pipeline stages and every 10% of progress within a stage.
#[derive(Clone, Default)]
struct LogReporter {
    step: Arc<AtomicU8>,
}

impl LogReporter {
    /// The new 10% step reached by `fraction`, if any.
    fn crossed_step(&self, fraction: f64) -> Option<u8> {
        let step = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u8;
        let previous = self.step.fetch_max(step, Ordering::Relaxed);
        (step > previous).then_some(step)
    }
}

impl Observer for LogReporter {
    fn notify(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Stage(stage) => {
                self.step.store(0, Ordering::Relaxed);
                info!("{stage:?}");
            }
            PipelineEvent::Progress(fraction) => {
                if let Some(step) = self.crossed_step(fraction) {
                    info!("{}%", u32::from(step) * 10);
                }
            }
        }
    }
}
