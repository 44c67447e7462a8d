//! Interface state machine. Holds no terminal or I/O handles; the main loop
//! feeds it keys, worker events and clock ticks and acts on what it returns.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use godl_toolchain::{sort_descending, Platform, Release, Stage};
use tracing::{info, warn};

use crate::commands::{AppEvent, UiCommand};

const PAGE_STEP: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum State {
    Loading,
    Choosing,
    Downloading,
    Extracting,
    Completed { path: PathBuf },
    Error { message: String },
    Quitting,
}

impl State {
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Completed { .. } | State::Error { .. } | State::Quitting
        )
    }
}

/// Keys the interface reacts to, already decoded from the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeyInput {
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Esc,
    Interrupt,
    Char(char),
}

/// Side effects the main loop must carry out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Run(UiCommand),
    /// Cancel outstanding work and leave.
    Quit,
}

pub(crate) struct App {
    state: State,
    platform: Platform,
    releases: Vec<Release>,
    cursor: usize,
    choice: String,
    progress: f64,
    dwell: Duration,
    completed_at: Option<Instant>,
    dismissed: bool,
}

impl App {
    pub(crate) fn new(platform: Platform, dwell: Duration) -> Self {
        Self {
            state: State::Loading,
            platform,
            releases: Vec::new(),
            cursor: 0,
            choice: String::new(),
            progress: 0.0,
            dwell,
            completed_at: None,
            dismissed: false,
        }
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub(crate) fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn choice(&self) -> &str {
        &self.choice
    }

    pub(crate) fn progress(&self) -> f64 {
        self.progress
    }

    pub(crate) fn platform(&self) -> &Platform {
        &self.platform
    }

    pub(crate) fn handle_key(&mut self, key: KeyInput) -> Option<Command> {
        if self.state.is_terminal() {
            self.dismissed = true;
            return None;
        }

        match (key, &self.state) {
            (KeyInput::Interrupt, _) => Some(self.quit()),
            (KeyInput::Esc | KeyInput::Char('q'), State::Loading | State::Choosing) => {
                Some(self.quit())
            }
            (_, State::Choosing) => self.handle_choosing_key(key),
            _ => None,
        }
    }

    fn handle_choosing_key(&mut self, key: KeyInput) -> Option<Command> {
        let last = self.releases.len().saturating_sub(1);
        match key {
            KeyInput::Up | KeyInput::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyInput::Down | KeyInput::Char('j') => self.cursor = (self.cursor + 1).min(last),
            KeyInput::Home | KeyInput::Char('g') => self.cursor = 0,
            KeyInput::End | KeyInput::Char('G') => self.cursor = last,
            KeyInput::PageUp => self.cursor = self.cursor.saturating_sub(PAGE_STEP),
            KeyInput::PageDown => self.cursor = (self.cursor + PAGE_STEP).min(last),
            KeyInput::Enter => return self.confirm(),
            _ => {}
        }
        None
    }

    fn confirm(&mut self) -> Option<Command> {
        let release = self.releases.get(self.cursor)?;
        self.choice = release.version.clone();
        match release.file_for(&self.platform) {
            Ok(file) => {
                info!("Selected {} ({})", release.version, file.filename);
                let command = UiCommand::Install {
                    version: release.version.clone(),
                    file: file.clone(),
                };
                self.progress = 0.0;
                self.state = State::Downloading;
                Some(Command::Run(command))
            }
            Err(err) => {
                self.fail(err.to_string());
                None
            }
        }
    }

    fn quit(&mut self) -> Command {
        info!("Interrupted in {:?}", self.state);
        self.state = State::Quitting;
        Command::Quit
    }

    fn fail(&mut self, message: String) {
        warn!("Failed: {message}");
        self.state = State::Error { message };
    }

    pub(crate) fn handle_event(&mut self, event: AppEvent) {
        if self.state.is_terminal() {
            return;
        }

        match event {
            AppEvent::CatalogLoaded(mut releases) => {
                if self.state != State::Loading {
                    return;
                }
                sort_descending(&mut releases);
                info!("Loaded {} releases", releases.len());
                self.releases = releases;
                self.cursor = 0;
                self.state = State::Choosing;
            }
            AppEvent::Stage(stage) => {
                if !matches!(self.state, State::Downloading | State::Extracting) {
                    return;
                }
                self.progress = 0.0;
                self.state = match stage {
                    Stage::Downloading => State::Downloading,
                    Stage::Extracting => State::Extracting,
                };
            }
            AppEvent::Progress(fraction) => {
                self.progress = fraction.clamp(0.0, 1.0);
            }
            AppEvent::Installed(path) => {
                if self.state != State::Extracting {
                    return;
                }
                info!("Installed {} into {}", self.choice, path.display());
                self.progress = 1.0;
                self.state = State::Completed { path };
            }
            AppEvent::Failed(err) => self.fail(err.to_string()),
        }
    }

    /// Advances timers. Starts the completion dwell on the first tick after
    /// completion.
    pub(crate) fn tick(&mut self, now: Instant) {
        if matches!(self.state, State::Completed { .. }) && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        if let Some(at) = self.completed_at {
            if now.saturating_duration_since(at) >= self.dwell {
                self.dismissed = true;
            }
        }
    }

    /// Whether the main loop should stop.
    pub(crate) fn finished(&self) -> bool {
        match self.state {
            State::Completed { .. } => self.dismissed,
            State::Error { .. } | State::Quitting => true,
            _ => false,
        }
    }

    pub(crate) fn exit_code(&self) -> i32 {
        match self.state {
            State::Completed { .. } => 0,
            State::Quitting => 130,
            _ => 1,
        }
    }

    /// Final line shown in the terminal and echoed after it is restored.
    pub(crate) fn status_line(&self) -> Option<String> {
        match &self.state {
            State::Completed { path } => {
                Some(format!("Installed {} into {}", self.choice, path.display()))
            }
            State::Error { message } => Some(format!("something went wrong: {message}")),
            State::Quitting => Some("exiting..".into()),
            _ => None,
        }
    }
}
