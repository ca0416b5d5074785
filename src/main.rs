//! Main entry point for the podcast-tracker terminal client.

use chrono::{Local, Utc};
use clap::Parser;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, info, warn};
use podcast_tracker::api::{ApiClient, EpisodeService};
use podcast_tracker::card::export_page;
use podcast_tracker::config::Config;
use podcast_tracker::controller::{EpisodeListController, ListView};
use podcast_tracker::opener::open_link;
use podcast_tracker::tui::{Action, App, draw, poll_event};
use podcast_tracker::types::Id;
use ratatui::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long a notification toast stays on screen.
const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// Command-line arguments for the podcast-tracker application.
#[derive(Parser, Debug)]
#[command(
    name = "podcast-tracker",
    version,
    about = "Terminal client for a Podcast Tracker server",
    long_about = "Browse pending podcast episodes, mark them as listened and refresh feeds \
                  on a Podcast Tracker server."
)]
struct Args {
    /// Server base URL (overrides config)
    #[arg(short, long)]
    server: Option<String>,

    /// Start filtered to this podcast id
    #[arg(short, long)]
    podcast: Option<String>,

    /// Page to open first
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Write the page as HTML to this file and exit instead of starting the UI
    #[arg(short, long, value_name = "FILE")]
    export_html: Option<PathBuf>,

    /// Log verbosity level: 0=error, 1=warn, 2=info, 3=debug, 4=trace
    #[arg(short, long, default_value_t = 1)]
    log: u8,
}

/// Log file used while the terminal is in raw mode.
fn log_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("podcast-tracker").join("podcast-tracker.log"))
}

fn init_logging(level: u8, to_file: bool) {
    let log_level = match level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level).format_target(false);

    let file = if to_file {
        log_file_path().and_then(|path| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).ok()?;
            }
            OpenOptions::new().create(true).append(true).open(path).ok()
        })
    } else {
        None
    };

    match file {
        Some(file) => {
            builder
                .format_timestamp_secs()
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.format_timestamp(None);
        }
    }
    builder.init();

    debug!("Log level set to {:?}", log_level);
}

/// Initialize the terminal for TUI rendering.
fn init_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logging(args.log, args.export_html.is_none());

    match Config::create_default_if_missing() {
        Ok(path) => debug!("Config file: {}", path.display()),
        Err(e) => warn!("Could not write default config: {}", e),
    }

    // Load config
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config: {}. Using defaults.", e);
        Config::new()
    });

    let server_url = args
        .server
        .clone()
        .unwrap_or_else(|| config.server_url.clone());

    let client = match ApiClient::new(&server_url, config.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using server {}", client.base_url());

    let service: Arc<dyn EpisodeService> = Arc::new(client);
    let podcast_filter = args.podcast.as_deref().map(Id::from);
    let controller = EpisodeListController::new(service).with_filter(podcast_filter);

    if let Some(path) = &args.export_html {
        return run_export(controller, args.page, path).await;
    }

    let mut terminal = init_terminal()?;
    let mut app = App::new(controller, config.keybindings.clone(), server_url);

    let result = run_app(&mut terminal, &mut app, &config, args.page).await;

    restore_terminal()?;

    result
}

/// Load one page and write it as HTML.
async fn run_export(
    mut controller: EpisodeListController,
    page: u32,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.load_podcasts().await;
    controller.load_episodes(page).await;

    if *controller.view() == ListView::Idle {
        eprintln!("Error: could not load episodes from the server");
        std::process::exit(1);
    }

    export_page(&controller, path, &Utc::now(), &Local)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Main event loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    config: &Config,
    start_page: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let request = app.controller.request_podcasts();
    app.controller.spawn(request, tx.clone());
    let request = app.controller.request_episodes(start_page);
    app.controller.spawn(request, tx.clone());

    let auto_refresh = config.auto_refresh();
    let opener = config.opener.as_deref();
    let export_path = PathBuf::from(&config.export_path);
    let mut last_reload = Instant::now();

    loop {
        while let Ok(outcome) = rx.try_recv() {
            if let Some(next) = app.controller.apply(outcome) {
                app.controller.spawn(next, tx.clone());
            }
        }
        app.sync_selection();
        app.controller
            .tick_notifications(Instant::now(), NOTIFICATION_TTL);

        if last_reload.elapsed() >= auto_refresh {
            debug!("Periodic reload of page {}", app.controller.current_page());
            let request = app.controller.request_reload();
            app.controller.spawn(request, tx.clone());
            last_reload = Instant::now();
        }

        terminal.draw(|f| draw(f, app))?;

        let Some(Event::Key(key)) = poll_event(Duration::from_millis(100))? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_input(key) {
            Action::None | Action::Quit => {}
            Action::NextPage => {
                if let Some(request) = app.controller.request_next_page() {
                    app.controller.spawn(request, tx.clone());
                }
            }
            Action::PreviousPage => {
                if let Some(request) = app.controller.request_previous_page() {
                    app.controller.spawn(request, tx.clone());
                }
            }
            Action::SelectFilter(podcast_filter) => {
                let request = app.controller.request_filter_change(podcast_filter);
                app.controller.spawn(request, tx.clone());
            }
            Action::MarkListened(episode_id) => {
                let request = app.controller.request_mark_listened(episode_id);
                app.controller.spawn(request, tx.clone());
            }
            Action::Refresh => {
                if let Some(request) = app.controller.request_refresh() {
                    app.controller.spawn(request, tx.clone());
                }
            }
            Action::ShowDetails(episode_id) => {
                let request = app.controller.request_details(episode_id);
                app.controller.spawn(request, tx.clone());
            }
            Action::OpenLink(url) => match open_link(&url, opener) {
                Ok(()) => app.set_status(&format!("Opened {}", url)),
                Err(e) => {
                    warn!("Failed to open {}: {}", url, e);
                    app.set_status(&format!("Could not open link: {}", e));
                }
            },
            Action::Export => match export_page(&app.controller, &export_path, &Utc::now(), &Local)
            {
                Ok(()) => app.set_status(&format!("Exported to {}", export_path.display())),
                Err(e) => {
                    error!("Export failed: {}", e);
                    app.set_status(&format!("Export failed: {}", e));
                }
            },
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
