use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table};

use olive_terminal::club_session::ClubSessionHandle;
use olive_terminal::config::Config;
use olive_terminal::fake_feed::FakeFeed;
use olive_terminal::feed_api::{HttpFeed, LiveFeed};
use olive_terminal::model::{Competition, RunnerResult, cet_seconds_of_day};
use olive_terminal::persist::Preferences;
use olive_terminal::projection::{ClassView, ClubPicker, ClubView};
use olive_terminal::provider::spawn_provider;
use olive_terminal::state::{AppState, Delta, ProviderCommand, Screen, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    config: Config,
    feed: Arc<dyn LiveFeed>,
    delta_tx: mpsc::Sender<Delta>,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    prefs: Preferences,
    club_session: Option<ClubSessionHandle>,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Tab => self.switch_screen(self.state.screen.next()),
            KeyCode::BackTab => self.switch_screen(self.state.screen.prev()),
            KeyCode::F(1) => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::F(2) => self.state.cycle_sort(),
            KeyCode::F(5) => self.refresh_now(),
            _ if self.state.screen == Screen::ClubResults => self.on_club_key(key),
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('r') => self.refresh_now(),
            KeyCode::Enter if self.state.screen == Screen::Competitions => {
                self.select_competition_under_cursor()
            }
            KeyCode::Char('h') | KeyCode::Left if self.state.screen == Screen::ClassResults => {
                self.cycle_class(false)
            }
            KeyCode::Char('l') | KeyCode::Right if self.state.screen == Screen::ClassResults => {
                self.cycle_class(true)
            }
            _ => {}
        }
    }

    /// The club screen is a text field: printable keys edit the filter.
    fn on_club_key(&mut self, key: KeyEvent) {
        let mut filter = self.state.club_filter.clone();
        match key.code {
            KeyCode::Char(c) => filter.push(c),
            KeyCode::Backspace => {
                filter.pop();
            }
            KeyCode::Esc => filter.clear(),
            KeyCode::Down | KeyCode::Up if self.state.club_picker() == ClubPicker::List => {
                let forward = key.code == KeyCode::Down;
                match self.state.cycle_club(forward) {
                    Some(club) => filter = club.to_string(),
                    None => return,
                }
            }
            KeyCode::Down | KeyCode::PageDown => {
                self.state.select_next();
                return;
            }
            KeyCode::Up | KeyCode::PageUp => {
                self.state.select_prev();
                return;
            }
            _ => return,
        }
        self.set_club_filter(filter);
    }

    fn set_club_filter(&mut self, filter: String) {
        self.state.club_filter = filter;
        if let Some(session) = self.club_session.as_mut() {
            session.input(&self.state.club_filter);
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.state.screen = screen;
        self.state.help_overlay = false;
        if screen == Screen::ClubResults {
            self.ensure_club_session();
        }
    }

    fn ensure_club_session(&mut self) {
        let Some(competition) = self.state.selected_competition.clone() else {
            return;
        };
        if self
            .club_session
            .as_ref()
            .is_some_and(|s| s.competition_id() == competition.id)
        {
            return;
        }
        let mut session = ClubSessionHandle::new(
            competition,
            Arc::clone(&self.feed),
            self.delta_tx.clone(),
            self.config.clone(),
        );
        session.input(&self.state.club_filter);
        self.club_session = Some(session);
    }

    fn select_competition_under_cursor(&mut self) {
        let Some(competition) = self.state.competition_under_cursor().cloned() else {
            return;
        };
        self.select_competition(competition);
        self.state.screen = Screen::ClassResults;
    }

    fn select_competition(&mut self, competition: Competition) {
        if self.state.selected_competition_id() == Some(competition.id) {
            return;
        }
        if let Some(mut previous) = self.club_session.take() {
            previous.shutdown();
        }
        self.state
            .push_log(format!("[INFO] Selected {} ({})", competition.name, competition.date));
        if self.prefs.set_competition(competition.id) {
            self.save_prefs();
        }
        self.state.begin_competition(competition.clone());
        if self
            .cmd_tx
            .send(ProviderCommand::SelectCompetition(competition))
            .is_err()
        {
            self.state.push_log("[WARN] Provider unavailable");
        }
    }

    fn cycle_class(&mut self, forward: bool) {
        let Some(class_name) = self.state.cycle_class(forward).map(str::to_string) else {
            return;
        };
        let _ = self.cmd_tx.send(ProviderCommand::SelectClass(class_name));
    }

    fn refresh_now(&mut self) {
        match self.state.screen {
            Screen::Competitions => {
                let _ = self.cmd_tx.send(ProviderCommand::LoadCompetitions);
            }
            Screen::ClassResults => {
                let _ = self.cmd_tx.send(ProviderCommand::RefreshClass);
            }
            Screen::ClubResults => {
                if let Some(session) = self.club_session.as_ref() {
                    session.request_refresh();
                }
            }
        }
    }

    fn on_delta(&mut self, delta: Delta) {
        let restore = matches!(delta, Delta::SetCompetitions(_));
        let current = delta
            .competition_id()
            .is_none_or(|id| self.state.selected_competition_id() == Some(id));
        if current && self.prefs.absorb(&delta) {
            self.save_prefs();
        }
        apply_delta(&mut self.state, delta);
        if restore {
            self.restore_competition();
        }
    }

    /// Reopens the remembered competition once the list arrives.
    fn restore_competition(&mut self) {
        if self.state.selected_competition.is_some() {
            return;
        }
        let Some(id) = self.prefs.competition_id else {
            return;
        };
        let Some(idx) = self.state.competitions.iter().position(|c| c.id == id) else {
            return;
        };
        self.state.competition_cursor = idx;
        let competition = self.state.competitions[idx].clone();
        self.select_competition(competition);
    }

    fn save_prefs(&mut self) {
        if let Err(err) = self.prefs.save() {
            self.state
                .push_log(format!("[WARN] Preferences not saved: {err:#}"));
        }
    }
}

fn main() -> io::Result<()> {
    let config = Config::load();
    let prefs = Preferences::load();

    let feed: Arc<dyn LiveFeed> = if config.offline {
        Arc::new(FakeFeed::new())
    } else {
        match HttpFeed::new(&config) {
            Ok(feed) => Arc::new(feed),
            Err(err) => {
                eprintln!("error: {err:#}");
                return Ok(());
            }
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let class_preference = Some(prefs.class_name.clone()).filter(|name| !name.is_empty());
    spawn_provider(
        Arc::clone(&feed),
        tx.clone(),
        cmd_rx,
        config.clone(),
        class_preference,
    );

    let mut state = AppState::new(config.locale);
    state.club_filter = prefs.club_filter.clone();
    if config.offline {
        state.push_log("[INFO] Offline mode: demo competition");
    }
    let mut app = App {
        state,
        should_quit: false,
        config,
        feed,
        delta_tx: tx,
        cmd_tx,
        prefs,
        club_session: None,
    };
    let res = run_app(&mut terminal, &mut app, rx);

    if let Some(mut session) = app.club_session.take() {
        session.shutdown();
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            app.on_delta(delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);
    render_refresh_gauge(frame, chunks[1], &app.state);

    match app.state.screen {
        Screen::Competitions => render_competitions(frame, chunks[2], &app.state),
        Screen::ClassResults => render_class(frame, chunks[2], &app.state),
        Screen::ClubResults => render_club(frame, chunks[2], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let competition = state
        .selected_competition
        .as_ref()
        .map(|c| format!("{} · {}", c.name, c.date))
        .unwrap_or_else(|| "no competition".to_string());
    let tabs = [Screen::Competitions, Screen::ClassResults, Screen::ClubResults]
        .into_iter()
        .map(|s| {
            if s == state.screen {
                format!("[{}]", s.title())
            } else {
                s.title().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let refreshed = state
        .last_refresh
        .map(|t| format!(" | updated {}", t.format("%H:%M:%S")))
        .unwrap_or_default();
    format!("O LIVE | {tabs} | {competition}{refreshed}")
}

fn footer_text(state: &AppState) -> String {
    let keys = match state.screen {
        Screen::Competitions => "Tab Screen | j/k Move | Enter Open | r/F5 Reload | ? Help | q Quit",
        Screen::ClassResults => {
            "Tab Screen | h/l Class | j/k Scroll | r/F5 Refresh | ? Help | q Quit"
        }
        Screen::ClubResults => {
            "Tab Screen | type to filter | Esc Clear | F2 Sort | F5 Refresh | F1 Help | Ctrl-C Quit"
        }
    };
    let last_log = state.logs.back().map(String::as_str).unwrap_or("");
    format!("{keys}\n{last_log}")
}

fn render_refresh_gauge(frame: &mut Frame, area: Rect, state: &AppState) {
    let progress = match state.screen {
        Screen::Competitions => 0.0,
        Screen::ClassResults => state.class_refresh_progress,
        Screen::ClubResults => state.club_refresh_progress,
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(f64::from(progress.clamp(0.0, 1.0)))
        .label("");
    frame.render_widget(gauge, area);
}

fn render_competitions(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.competitions.is_empty() {
        let msg = if state.competitions_loading {
            "Loading competitions..."
        } else {
            "No competitions"
        };
        frame.render_widget(Paragraph::new(msg), area);
        return;
    }
    let visible = area.height.saturating_sub(1) as usize;
    let (start, end) = visible_range(state.competition_cursor, state.competitions.len(), visible);
    let rows = state.competitions[start..end]
        .iter()
        .enumerate()
        .map(|(offset, c)| {
            let idx = start + offset;
            let mut style = Style::default();
            if idx == state.competition_cursor {
                style = style.bg(Color::DarkGray);
            }
            if state.selected_competition_id() == Some(c.id) {
                style = style.add_modifier(Modifier::BOLD);
            }
            let today = if c.is_today() { "LIVE" } else { "" };
            Row::new(vec![
                Cell::from(c.date.to_string()),
                Cell::from(c.name.clone()),
                Cell::from(c.organizer.clone()),
                Cell::from(today),
            ])
            .style(style)
        });
    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Min(20),
            Constraint::Length(24),
            Constraint::Length(5),
        ],
    )
    .header(
        Row::new(vec!["Date", "Competition", "Organizer", ""])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(table, area);
}

fn render_class(frame: &mut Frame, area: Rect, state: &AppState) {
    let results = match state.class_view() {
        ClassView::NoCompetitionSelected => {
            frame.render_widget(Paragraph::new("Select a competition first"), area);
            return;
        }
        ClassView::NoClassSelected => {
            frame.render_widget(Paragraph::new("No class selected"), area);
            return;
        }
        ClassView::Loading => {
            frame.render_widget(Paragraph::new("Loading results..."), area);
            return;
        }
        ClassView::Empty => {
            frame.render_widget(Paragraph::new("No results yet"), area);
            return;
        }
        ClassView::Ready(results) => results,
    };
    let title = format!("{} ({})", results.class_name, results.results.len());
    let offset = state
        .selected_competition
        .as_ref()
        .map(|c| c.time_offset_hours)
        .unwrap_or(0);
    let now_cet = cet_seconds_of_day(Utc::now());
    let rows = results
        .results
        .iter()
        .skip(state.class_scroll)
        .map(|r| {
            let splits = r
                .splits(&results.split_controls)
                .iter()
                .map(|s| format!("{} {}", s.label, s.time.trim()))
                .collect::<Vec<_>>()
                .join("  ");
            Row::new(vec![
                Cell::from(r.place_text(state.locale)),
                Cell::from(r.display_name()),
                Cell::from(r.club_name.clone()),
                Cell::from(result_cell(r, state, offset, now_cet)),
                Cell::from(r.time_behind_text()),
                Cell::from(splits),
            ])
        });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(24),
            Constraint::Length(22),
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["#", "Name", "Club", "Result", "Behind", "Splits"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(title).borders(Borders::TOP));
    frame.render_widget(table, area);
}

fn render_club(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let picker = match state.club_picker() {
        ClubPicker::List => "↑/↓ pick club",
        ClubPicker::Search => "search",
    };
    let sort = if state.show_sort_control() {
        format!(" | sort {}", state.sort.label())
    } else {
        String::new()
    };
    let input = Paragraph::new(format!(
        "Club: {}▏ ({picker}, {} matched){sort}",
        state.club_filter,
        state.selected_clubs.len()
    ))
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(input, sections[0]);

    let results = match state.club_view() {
        ClubView::NoCompetitionSelected => {
            frame.render_widget(Paragraph::new("Select a competition first"), sections[1]);
            return;
        }
        ClubView::LoadingClubList => {
            frame.render_widget(Paragraph::new("Loading club list..."), sections[1]);
            return;
        }
        ClubView::LoadingResults => {
            frame.render_widget(Paragraph::new("Loading results..."), sections[1]);
            return;
        }
        ClubView::EmptyNoClubEntered(count) => {
            let msg = format!("Type a club name ({count} clubs)");
            frame.render_widget(Paragraph::new(msg), sections[1]);
            return;
        }
        ClubView::EmptyNoMatch => {
            frame.render_widget(Paragraph::new("No results for this club"), sections[1]);
            return;
        }
        ClubView::ResultsReady(results) => results,
    };

    let offset = state
        .selected_competition
        .as_ref()
        .map(|c| c.time_offset_hours)
        .unwrap_or(0);
    let now_cet = cet_seconds_of_day(Utc::now());
    let rows = results.iter().skip(state.club_scroll).map(|r| {
        let class = r
            .class_name
            .clone()
            .or_else(|| state.class_of_runner(&r.display_name()).map(str::to_string))
            .unwrap_or_default();
        Row::new(vec![
            Cell::from(r.place_text(state.locale)),
            Cell::from(r.display_name()),
            Cell::from(class),
            Cell::from(r.club_name.clone()),
            Cell::from(result_cell(r, state, offset, now_cet)),
            Cell::from(r.time_behind_text()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(24),
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(16),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["#", "Name", "Class", "Club", "Result", "Behind"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(table, sections[1]);
}

/// Runners still out show their start time, or running time once started.
fn result_cell(r: &RunnerResult, state: &AppState, offset_hours: i64, now_cet: i64) -> String {
    if r.is_running_today(true) {
        let running = r.elapsed_since_start(offset_hours, now_cet);
        if running.is_empty() {
            return r.start_time_text().trim().to_string();
        }
        return running;
    }
    r.result_text(state.locale).trim().to_string()
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "O Live Terminal - Help",
        "",
        "Global:",
        "  Tab / S-Tab  Next / previous screen",
        "  F1 / ?       Toggle help",
        "  F2           Cycle club sort (abc / 123 / Team)",
        "  F5 / r       Refresh now",
        "  q / Ctrl-C   Quit",
        "",
        "Competitions:",
        "  j/k or ↑/↓   Move",
        "  Enter        Open competition",
        "",
        "Class:",
        "  h/l or ←/→   Previous / next class",
        "",
        "Club:",
        "  type         Filter clubs (substring, any case)",
        "  Esc          Clear filter",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
