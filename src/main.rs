mod app;
mod config;
mod error;
mod event;
mod session;
mod sets;
mod speech;
mod store;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Terminal;

use app::{card_key, App, AppScreen};
use config::Config;
use event::{AppEvent, EventHandler};
use session::matching::MatchPhase;
use session::result::format_mm_ss;
use session::{Level, Mode};
use sets::SetCatalog;
use speech::backend::{CommandBackend, CuePlayer, NullBackend, SpeechBackend};
use speech::sequencer::Sequencer;
use store::json_store::JsonStore;
use ui::components::card_grid::{CardGrid, CardState, CardView};
use ui::components::modal::ModalView;
use ui::layout::centered_rect;

#[derive(Parser)]
#[command(name = "vocadr", version, about = "Terminal vocabulary drill with spoken cues")]
struct Cli {
    #[arg(short, long, help = "Question set id")]
    set: Option<String>,

    #[arg(short, long, help = "Game mode (quiz, matching)")]
    mode: Option<String>,

    #[arg(short, long, help = "Difficulty (easy, normal, hard)")]
    level: Option<String>,

    #[arg(short, long, help = "Voice name for the speech backend")]
    voice: Option<String>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "List available question sets and exit")]
    list_sets: bool,

    #[cfg(feature = "network")]
    #[arg(
        long,
        value_name = "URL",
        help = "Download a question set into the sets directory and exit"
    )]
    fetch: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(voice) = cli.voice {
        config.voice = voice;
    }
    if let Some(level) = cli.level {
        if Level::from_name(&level).is_none() {
            anyhow::bail!("unknown level '{level}' (expected easy, normal or hard)");
        }
        config.level = level;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    let catalog = SetCatalog::new(Some(PathBuf::from(&config.sets_dir)));
    if cli.list_sets {
        for id in catalog.available() {
            println!("{id}");
        }
        return Ok(());
    }
    #[cfg(feature = "network")]
    if let Some(url) = cli.fetch {
        let id = catalog.fetch(&url)?;
        println!("fetched question set '{id}'");
        return Ok(());
    }

    let backend: Arc<dyn SpeechBackend> = match CommandBackend::detect() {
        Some(backend) => Arc::new(backend),
        None => Arc::new(NullBackend),
    };

    let events = EventHandler::new(Duration::from_millis(100));
    let done_tx = events.sender();
    let sequencer = Sequencer::new(Arc::clone(&backend), move |generation| {
        let _ = done_tx.send(AppEvent::SpeechDone(generation));
    });

    let sounds_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocadr")
        .join("sounds");
    let cues = CuePlayer::new(sounds_dir);

    let mut app = App::new(config, JsonStore::new().ok(), backend, sequencer, cues);
    if let Some(set) = cli.set
        && !app.setup.select_set(&set)
    {
        anyhow::bail!("unknown question set '{set}' (try --list-sets)");
    }
    if let Some(mode) = cli.mode {
        match Mode::from_name(&mode) {
            Some(mode) => app.setup.mode = mode,
            None => anyhow::bail!("unknown mode '{mode}' (expected quiz or matching)"),
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize(_, _) => {}
            AppEvent::SpeechDone(generation) => app.on_speech_done(generation),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // An open modal captures everything.
    if app.modal.is_some() {
        match key.code {
            KeyCode::Enter => app.modal_confirm(),
            KeyCode::Esc => app.modal_dismiss(),
            _ => {}
        }
        return;
    }

    match app.screen {
        AppScreen::Setup => handle_setup_key(app, key),
        AppScreen::Quiz => handle_quiz_key(app, key),
        AppScreen::Matching => handle_matching_key(app, key),
        AppScreen::Result => handle_result_key(app, key),
        AppScreen::History => handle_history_key(app, key),
    }
}

fn handle_setup_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.setup.prev_field(),
        KeyCode::Down | KeyCode::Char('j') => app.setup.next_field(),
        KeyCode::Right | KeyCode::Char('l') => app.setup.cycle_value(true),
        KeyCode::Left | KeyCode::Char('h') => app.setup.cycle_value(false),
        KeyCode::Enter => app.start_session(),
        KeyCode::Char('c') => {
            if app.has_saved_progress {
                app.resume_saved();
            }
        }
        KeyCode::Char('s') => app.show_history(),
        _ => {}
    }
}

fn handle_quiz_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.request_interrupt_quiz(),
        KeyCode::Char('o') => app.quiz_answer(true),
        KeyCode::Char('x') => app.quiz_answer(false),
        KeyCode::Char('r') => app.repeat_cue(),
        _ => {}
    }
}

fn handle_matching_key(app: &mut App, key: KeyEvent) {
    let in_ready = app
        .matching
        .as_ref()
        .is_some_and(|v| v.session.phase() == MatchPhase::Ready);

    match key.code {
        KeyCode::Esc => {
            if in_ready {
                // Nothing running yet; no confirmation needed.
                app.quit_matching();
            } else {
                app.request_quit_matching();
            }
        }
        KeyCode::Enter | KeyCode::Char(' ') => app.matching_begin(Instant::now()),
        KeyCode::Char('r') => app.repeat_cue(),
        KeyCode::Char(ch) => app.matching_select(ch, Instant::now()),
        _ => {}
    }
}

fn handle_result_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') => app.save_result(),
        KeyCode::Char('h') => app.show_history(),
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => app.back_to_setup(),
        _ => {}
    }
}

fn handle_history_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.back_to_setup(),
        _ => {}
    }
}

// --- rendering ----------------------------------------------------------

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Setup => render_setup(frame, app),
        AppScreen::Quiz => render_quiz(frame, app),
        AppScreen::Matching => render_matching(frame, app),
        AppScreen::Result => render_result(frame, app),
        AppScreen::History => render_history(frame, app),
    }

    if let Some(ref modal) = app.modal {
        let view = ModalView::new(&modal.message, modal.offer_cancel, &app.theme);
        frame.render_widget(&view, area);
    }
}

fn chrome(frame: &mut ratatui::Frame, app: &App, title: &str, footer_text: &str) -> ratatui::layout::Rect {
    let area = frame.area();
    let colors = &app.theme.colors;

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " vocadr ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            title.to_string(),
            Style::default().fg(colors.dim()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, layout[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        footer_text.to_string(),
        Style::default().fg(colors.dim()),
    )));
    frame.render_widget(footer, layout[2]);

    layout[1]
}

fn render_setup(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let resume_hint = if app.has_saved_progress {
        "  [c] Continue saved session"
    } else {
        ""
    };
    let footer = format!(" [Enter] Start{resume_hint}  [s] History  [q] Quit ");
    let main = chrome(frame, app, " vocabulary drill", &footer);

    let boxed = centered_rect(60, 70, main);
    let block = Block::bordered()
        .title(" New session ")
        .border_style(Style::default().fg(colors.border()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(boxed);
    frame.render_widget(block, boxed);

    let fields: Vec<(&str, String)> = vec![
        (
            "Question set",
            app.setup
                .selected_set()
                .unwrap_or("(no sets found)")
                .to_string(),
        ),
        ("Mode", app.setup.mode.as_str().to_string()),
        ("Level", app.setup.level.as_str().to_string()),
        (
            "Voice",
            app.setup
                .selected_voice()
                .unwrap_or("(no voices available)")
                .to_string(),
        ),
    ];

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(fields.len() as u16 * 2),
            Constraint::Min(0),
        ])
        .split(inner);

    let hint = Paragraph::new(Line::from(Span::styled(
        "  Arrows to navigate and change, Enter to start",
        Style::default().fg(colors.dim()),
    )));
    frame.render_widget(hint, layout[0]);

    let field_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            fields
                .iter()
                .map(|_| Constraint::Length(2))
                .collect::<Vec<_>>(),
        )
        .split(layout[1]);

    for (i, (label, value)) in fields.iter().enumerate() {
        let selected = i == app.setup.selected_field;
        let indicator = if selected { " > " } else { "   " };

        let label_style = Style::default()
            .fg(if selected { colors.accent() } else { colors.fg() })
            .add_modifier(if selected {
                Modifier::BOLD
            } else {
                Modifier::empty()
            });
        let value_style = Style::default().fg(if selected {
            colors.fg()
        } else {
            colors.dim()
        });

        let line = Line::from(vec![
            Span::styled(format!("{indicator}{label}: "), label_style),
            Span::styled(format!("< {value} >"), value_style),
        ]);
        frame.render_widget(Paragraph::new(line), field_layout[i]);
    }
}

fn render_quiz(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let Some(ref quiz) = app.quiz else {
        return;
    };

    let title = format!(
        " question {}/{}  level {}",
        quiz.index() + 1,
        quiz.total(),
        quiz.level().as_str()
    );
    let main = chrome(
        frame,
        app,
        &title,
        " [o] Correct  [x] Missed  [r] Repeat  [Esc] Stop ",
    );

    let Some(question) = quiz.current() else {
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(main);

    // The reading is visible from the start; the voice reads the prompt
    // first and the reading after the level delay.
    let reading = Paragraph::new(Line::from(Span::styled(
        question.reading.clone(),
        Style::default()
            .fg(colors.fg())
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(reading, layout[1]);

    let status = if app.speaking { "♪" } else { " " };
    let speaking = Paragraph::new(Line::from(Span::styled(
        status,
        Style::default().fg(colors.accent()),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(speaking, layout[2]);
}

fn render_matching(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let Some(ref view) = app.matching else {
        return;
    };

    let now = Instant::now();
    let timer = format_mm_ss(view.session.elapsed(now).as_millis() as u64);
    let title = format!("  {timer}  {} left", view.session.remaining());

    let footer = match view.session.phase() {
        MatchPhase::Ready => " [Enter] Start  [Esc] Back ",
        _ => " [key] Pick card  [r] Repeat  [Esc] Quit ",
    };
    let main = chrome(frame, app, &title, footer);

    let cards: Vec<CardView> = view
        .session
        .display_order()
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let state = if view.highlight.as_deref() == Some(question.id.as_str()) {
                CardState::Highlight
            } else if view
                .shake
                .as_ref()
                .is_some_and(|(id, _)| id == &question.id)
            {
                CardState::Shake
            } else if view.session.is_cleared(&question.id) {
                CardState::Cleared
            } else {
                CardState::Idle
            };
            CardView {
                key: card_key(index).unwrap_or('?'),
                label: question.reading.clone(),
                state,
            }
        })
        .collect();

    let grid_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(main);

    if view.session.phase() == MatchPhase::Ready {
        let prompt = Paragraph::new(Line::from(Span::styled(
            " Listen to each cue and press the matching card's key.",
            Style::default().fg(colors.dim()),
        )));
        frame.render_widget(prompt, grid_area[0]);
    } else if app.speaking {
        let speaking = Paragraph::new(Line::from(Span::styled(
            " ♪",
            Style::default().fg(colors.accent()),
        )));
        frame.render_widget(speaking, grid_area[0]);
    }

    let grid = CardGrid::new(&cards, &app.theme);
    frame.render_widget(&grid, grid_area[1]);
}

fn render_result(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let Some(ref result) = app.last_result else {
        return;
    };

    let saved = if app.result_saved { " (saved)" } else { "" };
    let footer = format!(" [s] Save record{saved}  [h] History  [Esc] Menu ");
    let main = chrome(frame, app, " session complete", &footer);

    let boxed = centered_rect(70, 80, main);
    let block = Block::bordered()
        .title(format!(" {} ({}) ", result.grade_set, result.mode))
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(boxed);
    frame.render_widget(block, boxed);

    let mut lines: Vec<Line> = vec![Line::from("")];

    match (result.score, result.time_ms) {
        (Some(score), _) => {
            lines.push(
                Line::from(Span::styled(
                    format!("Score: {score}%"),
                    Style::default()
                        .fg(colors.success())
                        .add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
            );
            if !result.missed.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Missed:",
                    Style::default().fg(colors.error()),
                )));
                for question in &result.missed {
                    lines.push(Line::from(Span::styled(
                        format!("  {}  {}", question.prompt, question.reading),
                        Style::default().fg(colors.fg()),
                    )));
                }
            }
        }
        (None, Some(ms)) => {
            lines.push(
                Line::from(Span::styled(
                    format!("Time: {}", format_mm_ss(ms)),
                    Style::default()
                        .fg(colors.success())
                        .add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center),
            );
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Best times:",
                Style::default().fg(colors.accent()),
            )));
            for (rank, entry) in app.result_board(5).iter().enumerate() {
                lines.push(Line::from(Span::styled(
                    format!(
                        "  {}. {}  {}  {}",
                        rank + 1,
                        entry.outcome_label(),
                        entry.date,
                        entry.grade_set
                    ),
                    Style::default().fg(colors.fg()),
                )));
            }
        }
        (None, None) => {}
    }

    let body = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(body, inner);
}

fn render_history(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let main = chrome(frame, app, " history", " [Esc] Back ");

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main);

    let mut best: Vec<Line> = vec![Line::from(Span::styled(
        " Best times",
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD),
    ))];
    let top = app.history.top_by_time(10);
    if top.is_empty() {
        best.push(Line::from(Span::styled(
            "  no records yet",
            Style::default().fg(colors.dim()),
        )));
    }
    for (rank, entry) in top.iter().enumerate() {
        best.push(Line::from(Span::styled(
            format!(
                " {:>2}. {}  {}  {}",
                rank + 1,
                entry.outcome_label(),
                entry.date,
                entry.grade_set
            ),
            Style::default().fg(colors.fg()),
        )));
    }
    frame.render_widget(Paragraph::new(best), layout[0]);

    let mut recent: Vec<Line> = vec![Line::from(Span::styled(
        " Recent sessions",
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD),
    ))];
    let listing = app.history.recent_first();
    if listing.is_empty() {
        recent.push(Line::from(Span::styled(
            "  no records yet",
            Style::default().fg(colors.dim()),
        )));
    }
    for entry in listing.iter().take(20) {
        recent.push(Line::from(Span::styled(
            format!(
                " {}  {}  {}  {}",
                entry.date,
                entry.grade_set,
                entry.mode,
                entry.outcome_label()
            ),
            Style::default().fg(colors.fg()),
        )));
    }
    frame.render_widget(Paragraph::new(recent), layout[1]);
}
