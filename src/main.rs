use xow::api::http::HttpApi;
use xow::api::DashboardApi;
use xow::app::{AppConfig, AppState};
use xow::cli::{self, Cli};
use xow::events::{AppEvent, EventHandler};
use xow::live::ws::StompTransport;
use xow::live::{LiveChannel, PushTransport};
use xow::runtime::Runtime;
use xow::selection::{FileStateStore, SelectionState, STATE_FILE_NAME};
use xow::tui;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const TICK_RATE: Duration = Duration::from_millis(100);

fn setup_verbose_logging() -> Result<()> {
    let state_dir = cli::state_dir();
    std::fs::create_dir_all(&state_dir)
        .map_err(|e| eyre!("Failed to create log directory {state_dir:?}: {e}"))?;
    let log_path = state_dir.join("debug.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| eyre!("Failed to open log file {log_path:?}: {e}"))?;
    tracing_subscriber::fmt()
        .with_writer(file)
        .with_ansi(false)
        .init();
    tracing::info!(
        "xow v{} starting with verbose logging",
        env!("CARGO_PKG_VERSION")
    );
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    if let Err(e) = cli::validate_server(&args.server) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    let server = Url::parse(&args.server)?;

    if args.verbose {
        setup_verbose_logging()?;
    }

    let api: Arc<dyn DashboardApi> = Arc::new(HttpApi::new(server.clone())?);
    let transport: Arc<dyn PushTransport> = Arc::new(StompTransport::from_server(&server)?);

    let state_file = args
        .state_file
        .clone()
        .unwrap_or_else(|| cli::state_dir().join(STATE_FILE_NAME));
    tracing::debug!(path = ?state_file, "using state file");
    let selection = SelectionState::new(Box::new(FileStateStore::new(state_file)));

    let config = AppConfig {
        server: args.server.trim_end_matches('/').to_string(),
        page_size: args.page_size,
        reconnect_delay: args.reconnect_delay(),
        version_string: format!(
            "xow v{}+{}",
            env!("CARGO_PKG_VERSION"),
            env!("BUILD_NUMBER")
        ),
    };
    let mut state = AppState::new(config, selection);
    state.desktop_notify = !args.no_notify;

    // Setup terminal with panic hook before anything can panic on a task
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to disable raw mode during panic: {e}");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, SetTitle("")) {
            eprintln!("Failed to leave alternate screen during panic: {e}");
        }
        original_hook(panic_info);
    }));

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        SetTitle(format!("xow {}", state.config.server))
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let events = EventHandler::new(TICK_RATE);
    let tx = events.sender();

    let channel_handle = tokio::spawn(
        LiveChannel::new(transport, tx.clone(), args.reconnect_delay()).run(),
    );
    let runtime = Runtime::new(api, tx);

    let result = run_app(&mut terminal, &mut state, events, &runtime, &channel_handle).await;
    channel_handle.abort();

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, SetTitle(""))?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    mut events: EventHandler,
    runtime: &Runtime,
    channel_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    runtime.execute_all(state.start(now_millis()));
    let mut channel_reported = false;

    loop {
        terminal.draw(|f| tui::render::render(f, state))?;

        let Some(event) = events.next().await else {
            break;
        };
        if matches!(event, AppEvent::Tick) && channel_handle.is_finished() && !channel_reported {
            channel_reported = true;
            tracing::error!("live channel task stopped");
            state.notify(
                xow::app::NotificationLevel::Error,
                "Live updates stopped unexpectedly. Restart to reconnect.".to_string(),
            );
        }
        let commands = state.handle(event, now_millis());
        runtime.execute_all(commands);

        if state.should_quit {
            break;
        }
    }

    events.stop();
    Ok(())
}
