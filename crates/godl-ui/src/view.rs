use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, State};

const LIST_TITLE: &str = "What version of Go do you want to install?";
const HELP: &str = "↑/k up • ↓/j down • enter install • q quit";

pub(crate) fn draw(frame: &mut Frame, app: &App) {
    let area = inset(frame.size());
    match app.state() {
        State::Loading => draw_status(
            frame,
            area,
            &format!("Fetching releases for {}...", app.platform()),
        ),
        State::Choosing => draw_list(frame, area, app),
        State::Downloading => draw_progress(frame, area, "Downloading", app),
        State::Extracting => draw_progress(frame, area, "Extracting", app),
        State::Completed { .. } => {
            let rows = split(area, [2, 2]);
            draw_gauge(frame, rows[0], app.progress());
            draw_status(frame, rows[1], &app.status_line().unwrap_or_default());
        }
        State::Error { .. } | State::Quitting => {
            draw_status(frame, area, &app.status_line().unwrap_or_default())
        }
    }
}

fn inset(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(2),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(4),
        height: area.height.saturating_sub(2),
    }
}

fn split<const N: usize>(area: Rect, heights: [u16; N]) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(heights.map(Constraint::Length))
        .split(area)
}

fn draw_list(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(LIST_TITLE)).style(Style::default().add_modifier(Modifier::BOLD)),
        rows[0],
    );

    let items: Vec<ListItem> = app
        .releases()
        .iter()
        .enumerate()
        .map(|(idx, release)| ListItem::new(format!("{}. {}", idx + 1, release.label())))
        .collect();
    let list = List::new(items)
        .highlight_style(Style::default().fg(Color::Blue))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !app.releases().is_empty() {
        state.select(Some(app.cursor()));
    }
    frame.render_stateful_widget(list, rows[1], &mut state);

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn draw_progress(frame: &mut Frame, area: Rect, label: &str, app: &App) {
    let rows = split(area, [2, 1]);
    draw_status(frame, rows[0], &format!("{label}: {}", app.choice()));
    draw_gauge(frame, rows[1], app.progress());
}

fn draw_gauge(frame: &mut Frame, area: Rect, progress: f64) {
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Blue))
        .ratio(progress.clamp(0.0, 1.0));
    frame.render_widget(gauge, area);
}

fn draw_status(frame: &mut Frame, area: Rect, text: &str) {
    frame.render_widget(Paragraph::new(text.to_string()).wrap(Wrap { trim: true }), area);
}
