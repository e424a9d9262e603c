//! UIDAI Dashboard CLI
//!
//! Terminal front end for the UIDAI analytics backend:
//! - Interactive dashboard with state filter and assistant chat
//! - One-shot health check, dashboard print and questions
//! - Default config generation
//!
//! # Configuration
//!
//! Settings come from `--config`, the default config locations, then
//! `UIDAI_*` environment variables. `RUST_LOG` overrides the log level.
//! The interactive dashboard owns the terminal, so it logs to a file;
//! every other command logs to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers};
use futures_util::StreamExt;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uidai_dashboard::api::{ApiClient, Backend};
use uidai_dashboard::app::{App, KeyEvent};
use uidai_dashboard::charts::ChartRegistry;
use uidai_dashboard::chat::{ChatEvent, ChatSession, Language, SendOutcome};
use uidai_dashboard::config::{generate_default_config, Config, LoadedConfig, LoggingConfig};
use uidai_dashboard::dashboard::ViewUpdate;
use uidai_dashboard::terminal::{
    self, ChatPane, Command, InputAction, InputLine, Screen, TuiChartSurface,
};

/// Redraw interval for notice expiry and the typing indicator
const TICK: Duration = Duration::from_millis(250);

/// Size of one-shot dashboard prints
const PRINT_WIDTH: u16 = 140;
const PRINT_HEIGHT: u16 = 56;

#[derive(Parser)]
#[command(name = "uidai-dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "UIDAI enrollment analytics dashboard and assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend URL (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Run,

    /// Check backend health
    Status,

    /// Load and print the dashboard once
    Dashboard {
        /// Restrict crisis districts to one state
        #[arg(short, long)]
        state: Option<String>,
    },

    /// Ask the assistant a single question
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
        /// Reply language (en, hi, te)
        #[arg(short, long)]
        lang: Option<Language>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let mut loaded = match &cli.config {
        Some(path) => LoadedConfig {
            config: Config::load_with_env(path)
                .with_context(|| format!("loading config from {:?}", path))?,
            source: Some(path.clone()),
            rejected: Vec::new(),
        },
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        loaded.config.api.base_url = url;
    }

    init_tracing(&loaded.config.logging, matches!(command, Commands::Run))?;
    install_panic_hook();
    loaded.report();

    let config = loaded.config;
    tracing::debug!(backend = %config.api.base_url, "Configuration loaded");

    match command {
        Commands::Run => run(config).await,
        Commands::Status => status(config).await,
        Commands::Dashboard { state } => dashboard_once(config, state).await,
        Commands::Ask { question, lang } => ask_once(config, question.join(" "), lang).await,
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &content)?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
            Ok(())
        }
    }
}

/// Install the subscriber. The interactive dashboard writes to the log
/// file; everything else writes to stderr.
fn init_tracing(logging: &LoggingConfig, interactive: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("uidai_dashboard={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);
    let json = logging.format == "json";

    if interactive {
        let path = logging.file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {:?}", parent))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {:?}", path))?;
        let writer = Mutex::new(file);

        if json {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
        }
    } else if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

/// Panics in detached tasks never reach a caller; log them
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Unhandled panic");
        previous(info);
    }));
}

fn new_app(config: Config) -> anyhow::Result<(App, Arc<TuiChartSurface>)> {
    let api = Arc::new(ApiClient::from_config(&config.api)?);
    let surface = Arc::new(TuiChartSurface::new());
    Ok((App::new(config, api, surface.clone()), surface))
}

/// Width of the attached terminal, for one-shot prints
fn print_width() -> u16 {
    crossterm::terminal::size()
        .map(|(width, _)| width)
        .unwrap_or(PRINT_WIDTH)
}

async fn status(config: Config) -> anyhow::Result<()> {
    let api = ApiClient::from_config(&config.api)?;

    match api.check_health().await {
        Ok(health) => {
            println!("UIDAI Dashboard v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Backend:   {}", api.base_url());
            println!("Status:    {}", health.status);
            println!("Database:  {}", if health.database { "✓" } else { "✗" });
            println!("Assistant: {}", if health.langchain { "✓" } else { "✗" });
            if !health.is_healthy() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Cannot connect to backend at {}", api.base_url());
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn dashboard_once(config: Config, state: Option<String>) -> anyhow::Result<()> {
    let (mut app, surface) = new_app(config)?;
    let started = app.start().await;

    if let Some(dashboard) = app.dashboard() {
        if state.is_some() {
            dashboard.apply_filter(state).await;
        }
    }

    let screen = Screen::capture(&app).await;
    let text = terminal::render_to_string(print_width(), PRINT_HEIGHT, |frame| {
        terminal::draw_screen(frame, &screen, &surface)
    })?;
    print!("{}", text);

    app.shutdown().await;
    if started.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

async fn ask_once(config: Config, question: String, lang: Option<Language>) -> anyhow::Result<()> {
    let api = Arc::new(ApiClient::from_config(&config.api)?);
    let surface = Arc::new(TuiChartSurface::new());
    let charts = ChartRegistry::shared(surface.clone());
    let chat = ChatSession::new(
        api,
        charts.clone(),
        lang.unwrap_or(config.ui.default_language),
        Duration::from_millis(config.ui.toast_ttl_ms),
    );

    let outcome = chat.send_message(&question).await;
    if outcome == SendOutcome::Ignored {
        anyhow::bail!("question is empty");
    }

    let pane = ChatPane {
        messages: chat.messages().await,
        typing: false,
        language: chat.language().await,
    };
    // The pane is printed in one go, so its chart is mounted now
    if let Some(slot) = pane.latest_chart() {
        if let Err(e) = chat.bind_chart(&slot.panel_id).await {
            tracing::warn!(error = %e, "Chart not shown");
        }
    }

    let width = print_width();
    let lines = terminal::transcript_lines(&pane.messages, false);
    let chart_rows = if pane.latest_chart().is_some() { 10 } else { 0 };
    let height = terminal::wrapped_height(&lines, width.saturating_sub(2))
        .saturating_add(chart_rows + 7);
    let text = terminal::render_to_string(width, height, |frame| {
        let area = frame.area();
        terminal::draw_chat(frame, area, &pane, &surface)
    })?;
    print!("{}", text);

    charts.lock().await.destroy_all();
    if outcome == SendOutcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}

/// State of the interactive screen that lives outside the app
#[derive(Default)]
struct Ui {
    input: InputLine,
    status: Option<String>,
    show_help: bool,
}

enum Flow {
    Continue,
    Quit,
    /// The bootstrap ran again; subscriptions must be renewed
    Restarted,
}

/// Next broadcast value. Never resolves without a live sender.
async fn next_update<T: Clone>(rx: &mut Option<broadcast::Receiver<T>>) -> Option<T> {
    let Some(receiver) = rx else {
        return std::future::pending().await;
    };
    match receiver.recv().await {
        Ok(value) => Some(value),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "Screen lagged behind updates");
            None
        }
        Err(broadcast::error::RecvError::Closed) => {
            *rx = None;
            None
        }
    }
}

fn subscriptions(
    app: &App,
) -> (
    Option<broadcast::Receiver<ChatEvent>>,
    Option<broadcast::Receiver<ViewUpdate>>,
) {
    (
        app.chat().map(|chat| chat.subscribe()),
        app.dashboard().map(|dashboard| dashboard.subscribe()),
    )
}

async fn run(config: Config) -> anyhow::Result<()> {
    let (mut app, surface) = new_app(config)?;
    let mut tui = ratatui::try_init().context("initializing terminal")?;

    let result = event_loop(&mut tui, &mut app, &surface).await;

    app.shutdown().await;
    ratatui::try_restore().context("restoring terminal")?;
    result
}

async fn event_loop(
    tui: &mut DefaultTerminal,
    app: &mut App,
    surface: &TuiChartSurface,
) -> anyhow::Result<()> {
    let mut ui = Ui::default();
    draw(tui, app, surface, &ui).await?;
    // The error view is drawn on failure; nothing else to do here
    let _ = app.start().await;

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);
    let (mut chat_events, mut view_updates) = subscriptions(app);

    loop {
        draw(tui, app, surface, &ui).await?;

        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match event? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match handle_key(tui, app, surface, &mut ui, key).await? {
                            Flow::Continue => {}
                            Flow::Quit => break,
                            Flow::Restarted => {
                                (chat_events, view_updates) = subscriptions(app);
                            }
                        }
                    }
                    Event::Resize(width, height) => {
                        tracing::debug!(width, height, "Terminal resized");
                        app.on_resize();
                    }
                    _ => {}
                }
            }
            _ = next_update(&mut chat_events) => {}
            _ = next_update(&mut view_updates) => {}
            _ = tick.tick() => {}
        }
    }
    Ok(())
}

/// Draw a frame, then bind the chat chart it put on screen
async fn draw(
    tui: &mut DefaultTerminal,
    app: &App,
    surface: &TuiChartSurface,
    ui: &Ui,
) -> anyhow::Result<()> {
    let mut screen = Screen::capture(app).await;
    screen.input = ui.input.text().to_string();
    screen.status = ui.status.clone();
    screen.show_help = ui.show_help;

    tui.draw(|frame| terminal::draw_screen(frame, &screen, surface))?;

    let unbound = screen
        .mounted_chart()
        .filter(|panel_id| surface.chart(panel_id).is_none());
    if let (Some(panel_id), Some(chat)) = (unbound, app.chat()) {
        match chat.bind_chart(panel_id).await {
            Ok(()) => {
                tui.draw(|frame| terminal::draw_screen(frame, &screen, surface))?;
            }
            Err(e) => tracing::warn!(error = %e, panel_id, "Chat chart not bound"),
        }
    }
    Ok(())
}

async fn handle_key(
    tui: &mut DefaultTerminal,
    app: &mut App,
    surface: &TuiChartSurface,
    ui: &mut Ui,
    key: TermKeyEvent,
) -> anyhow::Result<Flow> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    ui.show_help = false;

    // Ctrl/Cmd+K and Escape on an open chat belong to the app
    if app.handle_key(KeyEvent::from(&key)).await {
        return Ok(Flow::Continue);
    }

    match key.code {
        KeyCode::Char('c') if ctrl => return Ok(Flow::Quit),
        KeyCode::Char('r') if ctrl => {
            return execute(tui, app, surface, ui, Command::Refresh).await;
        }
        _ => {}
    }

    match ui.input.handle_key(&key) {
        InputAction::Submit(line) => {
            let chat_open = match app.chat() {
                Some(chat) => chat.is_open().await,
                None => false,
            };
            ui.status = None;
            execute(tui, app, surface, ui, Command::parse(&line, chat_open)).await
        }
        InputAction::Cancelled => {
            ui.status = None;
            Ok(Flow::Continue)
        }
        InputAction::Edited | InputAction::Ignored => Ok(Flow::Continue),
    }
}

async fn execute(
    tui: &mut DefaultTerminal,
    app: &mut App,
    surface: &TuiChartSurface,
    ui: &mut Ui,
    command: Command,
) -> anyhow::Result<Flow> {
    match command {
        Command::Empty => {}
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => ui.show_help = true,
        Command::Invalid(message) => ui.status = Some(message),
        Command::Retry if !app.is_initialized() => {
            app.retry().await.ok();
            draw(tui, app, surface, ui).await?;
            return Ok(Flow::Restarted);
        }
        _ if !app.is_initialized() => {
            ui.status = Some("Not connected. Type 'retry' or 'quit'.".to_string());
        }
        Command::Retry => ui.status = Some("Already connected".to_string()),
        Command::Refresh => {
            if let Some(dashboard) = app.dashboard() {
                tokio::spawn(async move { dashboard.refresh().await });
            }
        }
        Command::Filter(state) => {
            if let Some(dashboard) = app.dashboard() {
                dashboard.apply_filter(state).await;
            }
        }
        Command::Ask(question) => {
            if let Some(chat) = app.chat() {
                chat.open().await;
                tokio::spawn(async move { chat.send_message(&question).await });
            }
        }
        Command::Quick(index) => {
            if let Some(chat) = app.chat() {
                chat.open().await;
                tokio::spawn(async move { chat.send_quick_question(index).await });
            }
        }
        Command::Language(language) => {
            if let Some(chat) = app.chat() {
                chat.set_language(language).await;
                ui.status = Some(format!("Replies in {}", language));
            }
        }
        Command::ToggleChat => {
            if let Some(chat) = app.chat() {
                chat.toggle().await;
            }
        }
        Command::CloseChat => {
            if let Some(chat) = app.chat() {
                chat.close().await;
            }
        }
        Command::ClearChat => {
            if let Some(chat) = app.chat() {
                chat.clear_history().await;
            }
        }
        Command::Export(path) => {
            if let Some(dashboard) = app.dashboard() {
                let json = dashboard.export_json().await?;
                ui.status = Some(match std::fs::write(&path, json) {
                    Ok(()) => format!("Exported to {}", path.display()),
                    Err(e) => {
                        tracing::error!(error = %e, path = %path.display(), "Export failed");
                        format!("Export failed: {}", e)
                    }
                });
            }
        }
    }
    Ok(Flow::Continue)
}
