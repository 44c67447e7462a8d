mod app;
mod commands;
mod config;
mod ui_events;
mod view;
mod worker;

use std::{
    error::Error,
    io::{self, Stdout},
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use godl_toolchain::{Installer, ReleaseClient};
use godl_util::{expand_user, init_file_tracing, logs_dir};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use app::{App, Command, KeyInput, State};
use commands::UiCommand;
use config::AppConfig;
use ui_events::{UiEventQueue, DEFAULT_EVENT_QUEUE_SIZE};
use worker::Worker;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Parser, Debug)]
#[command(name = "godl-ui", version, about = "Pick a Go release and install it")]
struct Args {
    /// Download index to read releases from.
    #[arg(long)]
    base_url: Option<String>,
    /// Directory the archive is unpacked into.
    #[arg(long)]
    install_root: Option<String>,
    /// Directory under the install root that is replaced.
    #[arg(long)]
    install_dir: Option<String>,
    #[arg(long)]
    os: Option<String>,
    #[arg(long)]
    arch: Option<String>,
    /// Also list archived and unstable releases.
    #[arg(long)]
    all: bool,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Persist the effective settings before starting.
    #[arg(long)]
    save_config: bool,
}

impl Args {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            cfg.base_url = base_url.clone();
        }
        if let Some(install_root) = &self.install_root {
            cfg.install_root = install_root.clone();
        }
        if let Some(install_dir) = &self.install_dir {
            cfg.install_dir = install_dir.clone();
        }
        if let Some(os) = &self.os {
            cfg.os = os.clone();
        }
        if let Some(arch) = &self.arch {
            cfg.arch = arch.clone();
        }
        if self.all {
            cfg.include_all = true;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.request_timeout_secs = secs;
        }
    }
}

fn main() {
    let args = Args::parse();
    let code = match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("godl-ui: {err}");
            1
        }
    };
    std::process::exit(code);
}

fn run(args: Args) -> Result<i32, Box<dyn Error>> {
    let _log_guard = init_file_tracing(&logs_dir(), "godl-ui.log")?;

    let mut cfg = AppConfig::load();
    args.apply(&mut cfg);
    if args.save_config {
        let path = cfg.save()?;
        info!("Saved settings to {}", path.display());
    }

    let platform = cfg.platform();
    let client = ReleaseClient::new(&cfg.base_url, cfg.request_timeout())?
        .include_all(cfg.include_all);
    let installer = Installer::new(expand_user(&cfg.install_root), cfg.install_dir.clone());
    info!(
        "Starting: index {}, target {}, platform {platform}",
        client.base_url(),
        installer.target().display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let (cmd_tx, cmd_rx) = mpsc::channel::<UiCommand>(16);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (event_queue, mut notify_rx) = UiEventQueue::new(DEFAULT_EVENT_QUEUE_SIZE);

    let worker = Worker {
        client,
        installer,
        cancel_rx,
        ui_events: event_queue.sender(),
    };
    // Never joined; quitting leaves it to process exit.
    thread::spawn(move || runtime.block_on(worker.run(cmd_rx)));
    dispatch(&cmd_tx, UiCommand::FetchCatalog);

    let mut app = App::new(platform, cfg.completion_dwell());
    let mut terminal = setup_terminal()?;
    let result = event_loop(
        &mut terminal,
        &mut app,
        &event_queue,
        &mut notify_rx,
        &cmd_tx,
        &cancel_tx,
    );
    restore_terminal(&mut terminal)?;
    result?;

    if let (State::Error { .. }, Some(line)) = (app.state(), app.status_line()) {
        eprintln!("{line}");
    }
    info!("Exiting with {}", app.exit_code());
    Ok(app.exit_code())
}

fn event_loop(
    terminal: &mut Tui,
    app: &mut App,
    event_queue: &UiEventQueue,
    notify_rx: &mut mpsc::Receiver<()>,
    cmd_tx: &mpsc::Sender<UiCommand>,
    cancel_tx: &watch::Sender<bool>,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| view::draw(frame, app))?;
        if app.finished() {
            return Ok(());
        }

        if notify_rx.try_recv().is_ok() {
            for ev in event_queue.drain() {
                app.handle_event(ev);
            }
        }

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(input) = key_input(key) {
                        match app.handle_key(input) {
                            Some(Command::Run(cmd)) => dispatch(cmd_tx, cmd),
                            Some(Command::Quit) => {
                                let _ = cancel_tx.send(true);
                            }
                            None => {}
                        }
                    }
                }
            }
        }

        app.tick(Instant::now());
    }
}

fn dispatch(cmd_tx: &mpsc::Sender<UiCommand>, cmd: UiCommand) {
    if let Err(err) = cmd_tx.try_send(cmd) {
        warn!("Failed to queue command: {err}");
    }
}

fn key_input(key: KeyEvent) -> Option<KeyInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(KeyInput::Interrupt),
            _ => None,
        };
    }
    Some(match key.code {
        KeyCode::Up => KeyInput::Up,
        KeyCode::Down => KeyInput::Down,
        KeyCode::Home => KeyInput::Home,
        KeyCode::End => KeyInput::End,
        KeyCode::PageUp => KeyInput::PageUp,
        KeyCode::PageDown => KeyInput::PageDown,
        KeyCode::Enter => KeyInput::Enter,
        KeyCode::Esc => KeyInput::Esc,
        KeyCode::Char(c) => KeyInput::Char(c),
        _ => return None,
    })
}

fn setup_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
