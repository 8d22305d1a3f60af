mod commands;
mod console;
pub mod engine;
pub mod error;
pub mod foreground;
pub mod input;
pub mod regions;
pub mod settings;
pub mod timer;
mod utils;

use std::{fs, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use commands::Command;
use console::Console;
use engine::{ClickEngine, EngineEvent, EventSink, SessionHistory, TallyStore};
use foreground::{ForegroundClassifier, SystemProbe};
use input::{ClickHook, SyntheticClickHook};
use regions::RegionStore;
use settings::{SettingsStore, LAST_SESSION_FILE, REGIONS_FILE, SETTINGS_FILE, TALLY_FILE};
use timer::CountdownTimer;

pub use commands::{parse_duration, CommandError};

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("clicktally starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve()) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

/// Click source for this build: the global OS hook, or hand-fed clicks from the console.
fn select_hook() -> (Arc<dyn ClickHook>, Option<Arc<SyntheticClickHook>>) {
    #[cfg(feature = "os-hook")]
    {
        (Arc::new(input::RdevClickHook::new()), None)
    }

    #[cfg(not(feature = "os-hook"))]
    {
        let hook = Arc::new(SyntheticClickHook::new());
        (hook.clone(), Some(hook))
    }
}

async fn serve() -> Result<()> {
    let data_dir = settings::resolve_data_dir()?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);

    let regions = RegionStore::new();
    let regions_path = data_dir.join(REGIONS_FILE);
    if regions_path.exists() {
        // A bad file leaves an empty store; the user can redefine regions.
        if let Err(err) = regions.load(&regions_path) {
            warn!("Starting without saved regions: {}", err);
        }
    }

    let (events, mut event_rx) = EventSink::channel();
    let (hook, synthetic) = select_hook();
    let classifier = ForegroundClassifier::new(Arc::new(SystemProbe::new()));
    let engine = ClickEngine::new(
        regions,
        classifier,
        hook.clone(),
        settings.browser_filter(),
        events.clone(),
    )
    .with_history(SessionHistory::new(data_dir.join(LAST_SESSION_FILE)))
    .with_tally(TallyStore::new(data_dir.join(TALLY_FILE)));

    if let Some(name) = engine.restore_last_region().await {
        info!("Restored active region '{}'", name);
    }
    if let Some(count) = engine.restore_tally().await {
        info!("Restored tally of {} clicks", count);
    }

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let console = Console::new(
        engine,
        CountdownTimer::new(events),
        settings,
        regions_path,
        synthetic,
    );
    info!("Ready ({} input hook); type 'help' for commands", hook.name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(err) => {
                println!("error: {}", err);
                continue;
            }
        };
        match console.execute(command).await {
            Ok(reply) if reply.is_empty() => {}
            Ok(reply) => println!("{}", reply),
            Err(err) => println!("error: {:#}", err),
        }
    }

    console.timer().cancel().await;
    console.engine().shutdown().await;
    drop(console);

    // Let already emitted events reach stdout before exiting.
    let _ = tokio::time::timeout(Duration::from_millis(200), printer).await;
    info!("clicktally shutting down");
    Ok(())
}

fn print_event(event: &EngineEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(err) => warn!("Failed to serialize event: {}", err),
    }
}
