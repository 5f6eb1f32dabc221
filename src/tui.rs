use std::io;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::catalog::CatalogClient;
use crate::download::FileFetcher;
use crate::session::{PhaseKind, Session, SessionInput};

const SEARCH_PLACEHOLDER: &str = "Dune Frank Herbert";

/// Runs the terminal event loop until the session requests exit.
///
/// One loop iteration draws the current phase, waits up to the tick interval
/// for a key, then ticks the session exactly once, which is where pending
/// completion signals are consumed.
pub fn run<C, F>(session: &mut Session<C, F>) -> miette::Result<()>
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    let mut stdout = io::stdout();
    enable_raw_mode().into_diagnostic()?;
    stdout.execute(EnterAlternateScreen).into_diagnostic()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).into_diagnostic()?;
    terminal.clear().into_diagnostic()?;

    loop {
        terminal
            .draw(|frame| draw_ui(frame, session))
            .into_diagnostic()?;

        if event::poll(Duration::from_millis(120)).into_diagnostic()? {
            if let Event::Key(key) = event::read().into_diagnostic()? {
                if let Some(input) = map_key(key) {
                    session.handle(input);
                }
            }
        }
        session.on_tick();

        if session.should_quit() {
            break;
        }
    }

    disable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
    Ok(())
}

fn map_key(key: KeyEvent) -> Option<SessionInput> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(SessionInput::Quit);
    }
    match key.code {
        KeyCode::Esc => Some(SessionInput::Cancel),
        KeyCode::Enter => Some(SessionInput::Enter),
        KeyCode::Backspace => Some(SessionInput::Backspace),
        KeyCode::Up => Some(SessionInput::Up),
        KeyCode::Down => Some(SessionInput::Down),
        KeyCode::Char(ch) => Some(SessionInput::Char(ch)),
        _ => None,
    }
}

fn draw_ui<C, F>(frame: &mut ratatui::Frame, session: &Session<C, F>)
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    match session.phase() {
        PhaseKind::Start => draw_prompt(
            frame,
            session,
            "Enter a search term for a novel (title, author or both)",
            Some(SEARCH_PLACEHOLDER),
        ),
        PhaseKind::Loading => draw_spinner_line(frame, session, "Loading books..."),
        PhaseKind::ListView => draw_list(frame, session),
        PhaseKind::Confirmation => {
            draw_prompt(frame, session, "Please confirm the download path", None)
        }
        PhaseKind::Downloading => {
            let message = format!("Downloading {}...", session.term());
            draw_spinner_line(frame, session, &message);
        }
        PhaseKind::Done => {
            let done = Paragraph::new("✔ Download done!")
                .style(Style::default().fg(Color::Green));
            frame.render_widget(done, frame.area());
        }
    }
}

fn draw_prompt<C, F>(
    frame: &mut ratatui::Frame,
    session: &Session<C, F>,
    title: &str,
    placeholder: Option<&str>,
) where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let heading = Paragraph::new(title.to_string())
        .style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(heading, chunks[0]);

    let value = if session.input().is_empty() {
        match placeholder {
            Some(hint) => Span::styled(hint.to_string(), Style::default().fg(Color::DarkGray)),
            None => Span::raw(""),
        }
    } else {
        Span::raw(session.input().to_string())
    };
    let input_line = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan)),
        value,
    ]));
    frame.render_widget(input_line, chunks[1]);
    set_input_cursor(frame, chunks[1], session.input());

    draw_notice(frame, session, chunks[2]);
}

fn draw_spinner_line<C, F>(frame: &mut ratatui::Frame, session: &Session<C, F>, message: &str)
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    let line = Line::from(vec![
        Span::styled(
            session.spinner_frame(),
            Style::default().fg(Color::Indexed(229)),
        ),
        Span::raw(" "),
        Span::raw(message.to_string()),
    ]);
    frame.render_widget(Paragraph::new(line), frame.area());
}

fn draw_list<C, F>(frame: &mut ratatui::Frame, session: &Session<C, F>)
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let rows: Vec<Row> = session
        .listings()
        .iter()
        .map(|listing| {
            Row::new(vec![
                Cell::from(listing.author.clone()),
                Cell::from(listing.title.clone()),
                Cell::from(listing.size_label.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(75),
            Constraint::Length(25),
        ],
    )
    .header(
        Row::new(vec!["Author", "Title", "Size"])
            .style(Style::default().add_modifier(Modifier::BOLD))
            .bottom_margin(1),
    )
    .row_highlight_style(
        Style::default()
            .fg(Color::Indexed(229))
            .bg(Color::Indexed(57))
            .add_modifier(Modifier::BOLD),
    )
    .block(Block::default().borders(Borders::ALL).title("Results"));

    let mut state = TableState::default();
    state.select(Some(session.cursor()));
    frame.render_stateful_widget(table, chunks[0], &mut state);

    let help = Paragraph::new("↑/↓ move · enter select · esc back · ctrl+c quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);

    draw_notice(frame, session, chunks[2]);
}

fn draw_notice<C, F>(frame: &mut ratatui::Frame, session: &Session<C, F>, area: Rect)
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    if let Some(notice) = session.notice() {
        let line = Paragraph::new(notice.to_string()).style(Style::default().fg(Color::Red));
        frame.render_widget(line, area);
    }
}

fn set_input_cursor(frame: &mut ratatui::Frame, area: Rect, input: &str) {
    frame.set_cursor_position(input_cursor_position(area, input));
}

/// Cursor cell for the prompt line: the `"> "` prefix plus one column per
/// character of input, clamped to the last column of the line. Columns are
/// characters, not bytes, and the clamp happens before narrowing to `u16`.
fn input_cursor_position(area: Rect, input: &str) -> (u16, u16) {
    let column = 2usize.saturating_add(input.chars().count());
    let column = column.min(area.width.saturating_sub(1) as usize) as u16;
    (area.x.saturating_add(column), area.y)
}
