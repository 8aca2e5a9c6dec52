mod client;
mod config;
mod controller;
mod error;
mod input;
mod render;
mod time;

use anyhow::Result;
use client::StreamClient;
use config::Config;
use controller::{ChatController, LiveTicket};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use error::StreamError;
use streambot_shared::ChatOptions;
use input::InputControl;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Results of a spawned request, fed back into the UI loop.
#[derive(Debug)]
enum AppEvent {
    Chunk { ticket: LiveTicket, text: String },
    Finished { ticket: LiveTicket, result: Result<(), StreamError> },
}

struct App {
    chat: ChatController,
    input: InputControl,
    /// Wrapped rows scrolled up from the bottom of the chat pane.
    scroll: usize,
}

impl App {
    fn new(options: ChatOptions) -> Self {
        Self {
            chat: ChatController::new(options),
            input: InputControl::new(),
            scroll: 0,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging to file instead of terminal to avoid corrupting TUI
    let log_file = std::fs::File::create(&config.log_file).ok();
    if let Some(file) = log_file {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(file)
            .with_ansi(false)
            .init();
    }

    let client = StreamClient::new(&config.base_url, config.request_timeout())?;
    info!("Streaming from {}", client.endpoint());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.chat_options());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        while let Ok(event) = event::read() {
            if ui_tx.send(event).is_err() {
                break;
            }
        }
    });

    let res = run_app(&mut terminal, &mut app, client, event_tx, &mut event_rx, &mut ui_rx).await;

    // Dropping the input control aborts anything still in flight.
    drop(app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    client: StreamClient,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ui_rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut *app))?;

        tokio::select! {
            Some(event) = ui_rx.recv() => {
                let Event::Key(key) = event else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let streaming = app.chat.is_streaming();
                let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                match key.code {
                    KeyCode::Char('q') if ctrl => return Ok(()),
                    KeyCode::Char('l') if ctrl => {
                        if app.chat.clear() {
                            app.scroll = 0;
                        }
                    }
                    KeyCode::Char(c) => app.input.push(c, streaming),
                    KeyCode::Backspace => app.input.backspace(streaming),
                    KeyCode::Enter => submit(app, &client, &event_tx),
                    KeyCode::Esc => stop_stream(app),
                    // `ui` clamps the offset to what is actually scrollable.
                    KeyCode::Up => app.scroll = app.scroll.saturating_add(1),
                    KeyCode::Down => app.scroll = app.scroll.saturating_sub(1),
                    KeyCode::PageUp => app.scroll = app.scroll.saturating_add(10),
                    KeyCode::PageDown => app.scroll = app.scroll.saturating_sub(10),
                    _ => {}
                }
            }
            Some(event) = event_rx.recv() => handle_app_event(app, event),
        }
    }
}

fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Chunk { ticket, text } => {
            app.chat.apply_chunk(ticket, &text);
        }
        AppEvent::Finished { ticket, result } => {
            if app.chat.finish(ticket, result) {
                app.input.settle();
            }
        }
    }
}

fn stop_stream(app: &mut App) {
    if app.input.stop() {
        app.chat.request_stop();
    }
}

fn submit(app: &mut App, client: &StreamClient, event_tx: &mpsc::UnboundedSender<AppEvent>) {
    let Some(submission) = app.input.submit(app.chat.is_streaming()) else {
        return;
    };
    let Some(dispatch) = app.chat.send(&submission.text) else {
        return;
    };
    app.scroll = 0;

    let client = client.clone();
    let tx = event_tx.clone();
    let ticket = dispatch.ticket;
    let cancel = submission.cancel;
    tokio::spawn(async move {
        let result = client
            .stream_chat(&dispatch.request, &cancel, |text| {
                let _ = tx.send(AppEvent::Chunk {
                    ticket,
                    text: text.to_string(),
                });
            })
            .await;
        if let Err(e) = &result {
            debug!("Stream settled with error: {}", e);
        }
        let _ = tx.send(AppEvent::Finished { ticket, result });
    });
}

fn ui(f: &mut Frame, app: &mut App) {
    let has_error = app.chat.error().is_some();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(u16::from(has_error)),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    let (status_text, status_color) = if app.chat.is_stopping() {
        ("● Stopping...", Color::Yellow)
    } else if app.chat.is_streaming() {
        ("● Streaming", Color::Cyan)
    } else {
        ("● Ready", Color::Green)
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("Streaming Bot  ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]));
    f.render_widget(header, chunks[0]);

    if let Some(message) = app.chat.error() {
        let banner = Paragraph::new(message).style(Style::default().fg(Color::Red));
        f.render_widget(banner, chunks[1]);
    }

    let chat_block = Block::default().borders(Borders::ALL).title("Chat");
    let inner = chat_block.inner(chunks[2]);
    f.render_widget(chat_block, chunks[2]);

    let blocks = render::render_messages(app.chat.messages());
    let chat = Paragraph::new(render::chat_lines(&blocks)).wrap(Wrap { trim: false });

    // Follow the bottom unless the user scrolled up.
    let total = chat.line_count(inner.width);
    let max_scroll = total.saturating_sub(usize::from(inner.height));
    app.scroll = app.scroll.min(max_scroll);
    let top = u16::try_from(max_scroll - app.scroll).unwrap_or(u16::MAX);
    f.render_widget(chat.scroll((top, 0)), inner);

    let hint = if app.chat.is_streaming() {
        "Esc to stop"
    } else {
        "Enter to send, Ctrl-L clear, Ctrl-Q quit"
    };
    let input = Paragraph::new(app.input.draft())
        .style(if app.chat.is_streaming() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        })
        .block(Block::default().borders(Borders::ALL).title(format!("Input ({hint})")))
        .wrap(Wrap { trim: true });

    f.render_widget(input, chunks[3]);
}
