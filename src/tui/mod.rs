//! Terminal UI: ranked model table, info panel and log panel.
//!
//! [`run`] owns the terminal and the outcome receiver. Each loop iteration
//! draws, then handles exactly one key press or measurement outcome.

pub mod app;
pub mod event_handler;
pub mod log_layer;
pub mod ui;
pub mod widgets;

pub use app::{App, LogBuffer, LogEntry};
pub use event_handler::handle_key_event;
pub use log_layer::TuiLogLayer;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use futures::StreamExt;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::orchestrator::MeasurementOutcome;

/// Redraw interval so new log lines show up without input
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Run the TUI until the user quits
pub async fn run(mut app: App, mut outcomes: UnboundedReceiver<MeasurementOutcome>) -> Result<()> {
    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &mut outcomes).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    outcomes: &mut UnboundedReceiver<MeasurementOutcome>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => handle_key_event(app, key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
            Some(outcome) = outcomes.recv() => {
                app.apply(outcome);
            }
            _ = tick.tick() => {}
        }
    }

    // Pending measurements are abandoned
    Ok(())
}
