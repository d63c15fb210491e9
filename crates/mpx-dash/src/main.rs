mod config;
mod keymap;
mod state;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
        EventStream, KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use mpx_core::{HttpSnapshotSource, SnapshotSource};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config(config::Args::parse())?;
    init_logging();
    info!(
        "dashboard_start: status={} period_ms={}",
        config.endpoints.status,
        config.poller.period.as_millis()
    );

    let source: Arc<dyn SnapshotSource> = Arc::new(
        HttpSnapshotSource::new(config.endpoints.clone(), config.timeout)
            .context("failed to build http client")?,
    );
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let mut app = state::App::new(config, Arc::clone(&source), completion_tx);

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, source, completion_rx).await;
    app.poller.shutdown();
    restore_terminal(&mut terminal)?;

    if let Err(err) = result {
        eprintln!("mpx-dash: {err}");
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config::log_stdout_enabled() {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut state::App,
    source: Arc<dyn SnapshotSource>,
    mut completion_rx: mpsc::UnboundedReceiver<mpx_core::FetchCompletion>,
) -> Result<()> {
    let (version_tx, mut version_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = version_tx.send(source.fetch_version().await);
    });

    let mut events = EventStream::new();
    let mut refresh_ticker = tokio::time::interval(app.poller.period());
    refresh_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    app.poller.request_refresh();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        tokio::select! {
            _ = refresh_ticker.tick() => {
                app.poller.tick();
            }
            Some(completion) = completion_rx.recv() => {
                app.apply_completion(completion);
            }
            Some(version) = version_rx.recv() => {
                app.apply_version(version);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => handle_event(event, app),
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                }
            }
        }

        if app.should_quit() {
            break;
        }
    }

    info!("dashboard_exit");
    Ok(())
}

fn handle_event(event: Event, app: &mut state::App) {
    match event {
        Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
            app.handle_key(key);
        }
        Event::Mouse(mouse) => app.handle_mouse(mouse),
        Event::FocusGained => app.on_focus(true),
        Event::FocusLost => app.on_focus(false),
        _ => {}
    }
}
