use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::path::{Path, PathBuf};

use crate::export;
use crate::models::{non_empty, CandidateRecord};
use crate::presenter::ResultPresenter;
use crate::render;

/// How the browser was left.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseOutcome {
    Quit,
    /// Expand the network around this supervisor.
    Network(CandidateRecord),
}

struct AppState<'p> {
    presenter: &'p mut ResultPresenter,
    heading: String,
    export_dir: PathBuf,
    selected: usize,
    scroll_offset: u16,
    editing_text: bool,
    status: Option<String>,
}

impl<'p> AppState<'p> {
    fn new(presenter: &'p mut ResultPresenter, heading: &str, export_dir: &Path) -> Self {
        Self {
            presenter,
            heading: heading.to_string(),
            export_dir: export_dir.to_path_buf(),
            selected: 0,
            scroll_offset: 0,
            editing_text: false,
            status: None,
        }
    }

    fn visible_len(&self) -> usize {
        self.presenter.filtered_view().len()
    }

    fn current(&self) -> Option<&CandidateRecord> {
        self.presenter.filtered_view().get(self.selected).copied()
    }

    fn next(&mut self) {
        let len = self.visible_len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn filters_changed(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn export(&mut self) {
        let view = self.presenter.filtered_view();
        self.status = Some(match export::export_summary(&view, &self.export_dir) {
            Ok(summary) => summary,
            Err(e) => format!("Export failed: {:#}", e),
        });
    }

    fn handle_key(&mut self, code: KeyCode) -> Option<BrowseOutcome> {
        if self.editing_text {
            match code {
                KeyCode::Enter | KeyCode::Esc => self.editing_text = false,
                KeyCode::Backspace => {
                    self.presenter.filters_mut().text.pop();
                    self.filters_changed();
                }
                KeyCode::Char(c) => {
                    self.presenter.filters_mut().text.push(c);
                    self.filters_changed();
                }
                _ => {}
            }
            return None;
        }

        self.status = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(BrowseOutcome::Quit),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Char('/') => self.editing_text = true,
            KeyCode::Char('h') => {
                let filters = self.presenter.filters_mut();
                filters.hiring = filters.hiring.next();
                self.filters_changed();
            }
            KeyCode::Char('c') => {
                let next = self
                    .presenter
                    .filters()
                    .country
                    .cycle(self.presenter.available_countries());
                self.presenter.filters_mut().country = next;
                self.filters_changed();
            }
            KeyCode::Char('i') => {
                let next = self
                    .presenter
                    .filters()
                    .institution
                    .cycle(self.presenter.available_institutions());
                self.presenter.filters_mut().institution = next;
                self.filters_changed();
            }
            KeyCode::Char('x') => {
                self.presenter.reset_filters();
                self.filters_changed();
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('n') => {
                if let Some(record) = self.current() {
                    return Some(BrowseOutcome::Network(record.clone()));
                }
            }
            _ => {}
        }
        None
    }
}

pub fn run_browse(
    presenter: &mut ResultPresenter,
    heading: &str,
    export_dir: &Path,
) -> Result<BrowseOutcome> {
    if presenter.bundle().is_empty() {
        println!("{}", render::NO_RESULTS);
        return Ok(BrowseOutcome::Quit);
    }

    let mut state = AppState::new(presenter, heading, export_dir);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    if let Some(status) = &state.status {
        println!("{}", status);
    }
    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<BrowseOutcome> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(if state.visible_len() == 0 {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(outcome) = state.handle_key(key.code) {
                return Ok(outcome);
            }
        }
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Filter bar
    let filter_bar = Paragraph::new(filter_bar_text(state)).style(Style::default().fg(Color::Cyan));
    frame.render_widget(filter_bar, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(rows[1]);

    // Left panel: supervisor list
    let view = state.presenter.filtered_view();
    let items: Vec<ListItem> = view
        .iter()
        .map(|record| {
            let marker = if record.is_hiring() { "+" } else { " " };
            let name = if record.name.chars().count() > 28 {
                format!("{}...", record.name.chars().take(25).collect::<String>())
            } else {
                record.name.clone()
            };
            ListItem::new(format!("{} {} | {}", marker, name, record.university))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Supervisors ({}/{}) ",
            view.len(),
            state.presenter.bundle().candidates.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: supervisor detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer: status or help
    let footer = match (&state.status, state.editing_text) {
        (Some(status), _) => status.clone(),
        (None, true) => " type to filter by name/department  Enter/Esc:done".to_string(),
        (None, false) => {
            " j/k:navigate  J/K:scroll  /:search h:hiring c:country i:school x:reset  e:export n:network  q:quit"
                .to_string()
        }
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn filter_bar_text(state: &AppState) -> String {
    let filters = state.presenter.filters();
    let text_cursor = if state.editing_text { "_" } else { "" };
    let mut bar = format!(
        " {} | search: {}{}  hiring: {}  country: {}  school: {}",
        state.heading, filters.text, text_cursor, filters.hiring, filters.country, filters.institution
    );
    if !filters.is_default() {
        bar.push_str("  (x: clear)");
    }
    bar
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(record) = state.current() else {
        return Text::raw("No supervisors match the current filters (x to reset)");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        record.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if let Some(title) = non_empty(&record.title) {
        lines.push(Line::from(title.to_string()));
    }
    lines.push(Line::from(render::institution_line(record)));
    lines.push(Line::from(render::department_label(record).to_string()));
    lines.push(Line::from(""));

    let hiring_style = if record.is_hiring() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut badges = vec![Span::styled(
        format!("[{}]", render::hiring_label(record)),
        hiring_style,
    )];
    if record.has_scholarship() {
        badges.push(Span::raw(" "));
        badges.push(Span::styled(
            "[Scholarship Avail.]",
            Style::default().fg(Color::Magenta),
        ));
    }
    lines.push(Line::from(badges));
    lines.push(Line::from(""));

    // Fit
    lines.push(Line::from(Span::styled(
        "FIT",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in textwrap::fill(&record.match_reason, 70).lines() {
        lines.push(Line::from(format!("  {}", line)));
    }
    lines.push(Line::from(""));

    if let Some(hook) = render::hook_paper_line(record) {
        lines.push(Line::from(Span::styled(hook, Style::default().fg(Color::Yellow))));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        render::keywords_label(record),
        Style::default().fg(Color::Cyan),
    )));
    lines.push(Line::from(format!("Profile: {}", render::profile_label(record))));

    let citations = &state.presenter.bundle().citations;
    if !citations.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Verified Sources ({})", citations.len()),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for citation in citations {
            lines.push(Line::from(format!("  {} <{}>", citation.title, citation.uri)));
        }
        lines.push(Line::from(Span::styled(
            render::SOURCES_DISCLAIMER,
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}
