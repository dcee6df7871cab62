use anyhow::{bail, Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pictab::app::{self, App, UiEvent};
use pictab::command::{Command, CommandExecutor, CommandQueue, CommandSender, CommandSource, WindowActivator};
use pictab::config::Config;
use pictab::decoder::FsImageDecoder;
use pictab::error::QueueError;
use pictab::instance::{InstanceCoordinator, Role};
use pictab::paths::normalize_path;
use pictab::session::{FileSessionStore, SessionStore};
use pictab::state::{AppState, StateChangeEvent, StateStore};
use ratatui::prelude::*;
use std::fs::OpenOptions;
use std::io::{stdout, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

const USAGE: &str = "\
Usage: pictab [OPTIONS] [FILES]...

Opens each image in a tab. If pictab is already running for this user, the
files are handed to that instance instead.

Options:
      --clear-session  Forget the saved tabs and window state
  -h, --help           Print this help";

struct Args {
    files: Vec<PathBuf>,
    clear_session: bool,
}

/// `None` when only help was requested
fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        files: Vec::new(),
        clear_session: false,
    };
    let mut only_files = false;

    for arg in std::env::args_os().skip(1) {
        if !only_files {
            match arg.to_str() {
                Some("-h") | Some("--help") => {
                    println!("{USAGE}");
                    return Ok(None);
                }
                Some("--clear-session") => {
                    args.clear_session = true;
                    continue;
                }
                Some("--") => {
                    only_files = true;
                    continue;
                }
                Some(flag) if flag.starts_with("--") => bail!("unknown option {flag}\n\n{USAGE}"),
                _ => {}
            }
        }
        // Relative to this process; the primary may run elsewhere
        args.files.push(normalize_path(PathBuf::from(arg)));
    }
    Ok(Some(args))
}

/// Log to `{temp_dir}/pictab.log`; the terminal belongs to the UI
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("pictab=info"));
    let path = std::env::temp_dir().join("pictab.log");
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:?}");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let Some(args) = parse_args()? else {
        return Ok(ExitCode::SUCCESS);
    };
    let config = Config::load();

    let store = StateStore::with_state(
        AppState::default().with_zoom_step(config.viewer.default_zoom_step),
    );
    let session_path = config
        .session
        .session_path()
        .context("no data directory for the session file")?;
    let sessions = Arc::new(FileSessionStore::new(session_path));

    let (ui_tx, ui_rx) = mpsc::channel();
    let activator: WindowActivator = {
        let tx = ui_tx.clone();
        Arc::new(move || {
            let _ = tx.send(UiEvent::Activate);
        })
    };
    let executor = CommandExecutor::new(store.clone(), Arc::new(FsImageDecoder), sessions.clone())
        .with_activator(activator)
        .with_decode_max_width(config.viewer.decode_max_width());
    let queue = CommandQueue::new(executor);

    // Forwarded launches: open their files, then bring this window forward
    let forwarded = queue.sender();
    let forward_args: Vec<String> = args
        .files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let coordinator = InstanceCoordinator::from_config(&config.instance);
    let role = coordinator
        .acquire(&forward_args, move |paths| {
            forwarded.enqueue(Command::open_files(paths, CommandSource::ExternalRequest));
            forwarded.enqueue(Command::ActivateWindow);
        })
        .await;

    let primary = match role {
        Role::Primary(primary) => primary,
        Role::Secondary { delivered } => {
            for notice in secondary_notices(delivered, args.clear_session) {
                eprintln!("{notice}");
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    if args.clear_session {
        sessions.clear()?;
        log::info!("cleared saved session at {}", sessions.path().display());
    }

    let subscription = app::forward_state_changes(&store, ui_tx);
    queue.start()?;
    if config.session.restore_on_startup {
        queue.enqueue(Command::RestoreSession);
    }
    if !args.files.is_empty() {
        queue.enqueue(Command::open_files(args.files, CommandSource::UserAction));
    }

    if stdout().is_terminal() {
        run_tui(queue.sender(), ui_rx, store.state(), config.viewer.show_preview).await?;
    } else {
        drop(ui_rx);
        run_headless(&store).await?;
    }
    store.unsubscribe(subscription);

    if config.session.save_on_exit {
        queue.enqueue(Command::SaveSession);
    }
    match tokio::time::timeout(config.session.save_timeout(), queue.flush()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("could not drain commands before exit: {e}"),
        Err(_) => log::warn!("pending commands did not finish within {:?}", config.session.save_timeout()),
    }

    let code = match queue.shutdown(config.instance.stop_timeout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ QueueError::ShutdownTimedOut(_)) => {
            log::warn!("{e}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    };
    primary.shutdown().await;
    Ok(code)
}

/// What a launch that found another instance running should tell the user
fn secondary_notices(delivered: bool, clear_session: bool) -> Vec<&'static str> {
    let mut notices = Vec::new();
    if !delivered {
        notices.push("pictab is already running but did not respond; files were not opened");
    }
    if clear_session {
        notices.push("pictab is already running; --clear-session only applies when starting a new instance");
    }
    notices
}

async fn run_tui(
    commands: CommandSender,
    events: mpsc::Receiver<UiEvent>,
    initial: AppState,
    show_preview: bool,
) -> Result<()> {
    // crossterm polling blocks, so the UI gets its own thread
    let ui = tokio::task::spawn_blocking(move || -> Result<()> {
        enable_raw_mode()?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(out);
        let mut terminal = Terminal::new(backend)?;

        let mut app = App::new(commands, events, initial, show_preview);
        let result = app.run(&mut terminal);

        restore_terminal();
        terminal.show_cursor()?;
        result
    });

    match ui.await {
        Ok(result) => result,
        Err(e) => {
            restore_terminal();
            bail!("UI thread failed: {e}")
        }
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// No terminal: log changes until interrupted
async fn run_headless(store: &StateStore) -> Result<()> {
    log::info!("stdout is not a terminal; running headless until Ctrl+C");
    let subscription = store.subscribe(|event: &StateChangeEvent| {
        let state = &event.next;
        log::info!(
            "{} tabs open, selected {:?}{}",
            state.tab_count(),
            state.selected_path(),
            if event.is_session_restore { " (restored)" } else { "" }
        );
    });
    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    store.unsubscribe(subscription);
    Ok(())
}
