//! Cadence - queue & shuffle playback from the terminal

mod engine;
mod repl;

use anyhow::Context;
use cadence_playback::{
    AlwaysGranted, Collaborators, Command, ControllerConfig, ControllerEvent, EngineEvent,
    JsonFileSettings, MemoryCatalog, PlaybackController, PlaybackService, TrackCatalog,
};
use clap::Parser;
use engine::{SimulatedEngine, Ticker};
use repl::Action;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence queue and shuffle playback controller", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// JSON library file
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Size of the generated library when no library file is given
    #[arg(short, long, default_value_t = 200, conflicts_with = "library")]
    tracks: u64,

    /// File holding playback state between sessions
    #[arg(short, long, default_value = "cadence-state.json")]
    state: PathBuf,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_playback=info,cadence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ControllerConfig::load(cli.config.as_deref())?;
    let catalog = match &cli.library {
        Some(path) => MemoryCatalog::from_json_file(path)
            .with_context(|| format!("loading library {}", path.display()))?,
        None => MemoryCatalog::synthetic(cli.tracks),
    };
    let settings = JsonFileSettings::open(&cli.state)
        .with_context(|| format!("opening state file {}", cli.state.display()))?;

    tracing::info!(tracks = catalog.len(), state = %cli.state.display(), "Starting Cadence");

    let engine = SimulatedEngine::new(&catalog);
    let controller = PlaybackController::new(
        config,
        Collaborators {
            catalog: Box::new(catalog.clone()),
            engine: Box::new(engine.clone()),
            focus: Box::new(AlwaysGranted),
            settings: Box::new(settings),
        },
    );

    let mut service = PlaybackService::start(controller)?;
    let mut ticker = Ticker::spawn(engine.clone(), service.sender())?;

    let events = service.events();
    let json = cli.json;
    let printer = thread::Builder::new()
        .name("cadence-events".to_string())
        .spawn(move || {
            for event in events.iter() {
                print_event(&event, json);
            }
        })?;

    println!("{}", repl::HELP);
    run_repl(&service, &engine, &catalog)?;

    ticker.stop();
    service.shutdown();
    drop(service);
    if printer.join().is_err() {
        tracing::warn!("Event printer panicked");
    }

    Ok(())
}

/// Read commands until `quit` or end of input
fn run_repl(
    service: &PlaybackService,
    engine: &SimulatedEngine,
    catalog: &MemoryCatalog,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    prompt()?;

    for line in stdin.lock().lines() {
        match repl::parse(&line?) {
            Ok(Action::Send(commands)) => {
                for command in commands {
                    service.send_command(command)?;
                }
            }
            Ok(Action::Gapless) => {
                if engine.advance_to_prefetched() {
                    service.send_command(Command::Engine(EngineEvent::AdvancedToPrefetched))?;
                } else {
                    println!("nothing prefetched");
                }
            }
            Ok(Action::ShowQueue) => show_queue(service, engine, catalog),
            Ok(Action::Help) => println!("{}", repl::HELP),
            Ok(Action::Quit) => break,
            Ok(Action::Nothing) => {}
            Err(e) => println!("error: {:#}", e),
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

fn show_queue(service: &PlaybackService, engine: &SimulatedEngine, catalog: &MemoryCatalog) {
    let (queue, position, next, modes, state, position_ms) = service.with_controller(|c| {
        (
            c.get_queue().to_vec(),
            c.get_queue_position(),
            c.get_next_position(),
            c.get_modes(),
            c.get_state(),
            c.get_position(),
        )
    });

    println!(
        "{:?} at {}s, shuffle {:?}, repeat {:?}, volume {:.2}",
        state,
        position_ms / 1000,
        modes.shuffle,
        modes.repeat,
        engine.volume()
    );
    if queue.is_empty() {
        println!("  (queue empty)");
    }
    for (index, track) in queue.iter().enumerate() {
        let marker = if Some(index) == position {
            '>'
        } else if Some(index) == next {
            '+'
        } else {
            ' '
        };
        let title = catalog
            .resolve(*track)
            .map(|m| format!("{} - {}", m.artist, m.title))
            .unwrap_or_else(|_| "(unknown)".to_string());
        println!("{} {:3} {:>6} {}", marker, index, track.to_string(), title);
    }
}

fn print_event(event: &ControllerEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
        }
        return;
    }

    match event {
        ControllerEvent::QueueChanged => println!("* queue changed"),
        ControllerEvent::TrackChanged { track: Some(track) } => println!("* now playing {}", track),
        ControllerEvent::TrackChanged { track: None } => println!("* no track"),
        ControllerEvent::PlaybackStateChanged { state } => println!("* {:?}", state),
        ControllerEvent::PositionChanged { position_ms } => {
            println!("* position {}s", position_ms / 1000);
        }
        ControllerEvent::RepeatModeChanged(mode) => println!("* repeat {:?}", mode),
        ControllerEvent::ShuffleModeChanged(mode) => println!("* shuffle {:?}", mode),
    }
}
