//! fencehp CLI
//!
//! Usage:
//!   fencehp --simulate                       # Simulated box, keys on stdin
//!   fencehp --replay capture.log             # Replay a capture in real time
//!   fencehp --replay capture.log --instant   # Replay as fast as possible
//!   fencehp --serve                          # HTTP + WebSocket API
//!   fencehp --replay capture.log --json      # JSON event output

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use log::{info, warn};
use tokio::sync::mpsc;

use fencehp::core::{
    event_channel, run_server, AppState, Clock, Controller, EventReceiver, ManualClock,
    MonitorConfig, ReplayConnector, SimulatedConnector, SimulatedInputs, SourceConnector,
    SourceError, SystemClock,
};
use fencehp::types::{Event, Scoreboard, Settings, SettingsError};
use fencehp::{READ_TIMEOUT_MS, RECONNECT_INTERVAL_MS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "fencehp",
    version = VERSION,
    about = "HP scoring for a two-channel fencing scoring box",
    long_about = "fencehp turns the scoring box's report stream into per-fencer states\n\
                  and plays them as an HP game.\n\n\
                  Damage:\n  \
                  confirmed hit       - one-time damage to the opponent\n  \
                  confirmed self-hit  - one-time damage to yourself\n  \
                  held hit            - continuous damage after the grace delay\n\n\
                  Sources:\n  \
                  --replay FILE  Capture log (raw dump or @ms lines)\n  \
                  --simulate     Simulated box (default): l/r/c/u + Enter, q quits"
)]
struct Args {
    /// Replay a capture log
    #[arg(short, long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Replay on a virtual clock, as fast as possible
    #[arg(long, requires = "replay")]
    instant: bool,

    /// Simulated scoring box driven from stdin
    #[arg(long, conflicts_with = "replay")]
    simulate: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Load settings from a JSON file
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Write the effective settings to a JSON file
    #[arg(long, value_name = "FILE")]
    save_settings: Option<PathBuf>,

    /// One-time damage on a hit
    #[arg(long)]
    hit_damage: Option<String>,

    /// One-time damage on a self-hit
    #[arg(long)]
    self_hit_damage: Option<String>,

    /// Continuous damage (HP per millisecond)
    #[arg(long)]
    damage_per_ms: Option<String>,

    /// Starting HP
    #[arg(long)]
    max_hp: Option<String>,

    /// Debounce window in seconds
    #[arg(long)]
    debounce: Option<String>,

    /// Grace delay before continuous damage, in seconds
    #[arg(long)]
    grace_delay: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Read timeout per poll (ms)
    #[arg(long, default_value_t = READ_TIMEOUT_MS)]
    read_timeout_ms: u64,

    /// Delay between reconnect attempts (ms)
    #[arg(long, default_value_t = RECONNECT_INTERVAL_MS)]
    retry_ms: u64,

    /// Stop after this many failed reconnect attempts
    #[arg(long)]
    max_reconnects: Option<u32>,
}

/// Frame source chosen on the command line
struct SourceSetup {
    connector: Arc<dyn SourceConnector>,
    clock: Arc<dyn Clock>,
    inputs: Option<Arc<SimulatedInputs>>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let settings = match resolve_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Settings error: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(ref path) = args.save_settings {
        if let Err(e) = settings.save(path) {
            eprintln!("Could not save settings: {}", e);
            std::process::exit(1);
        }
        info!("settings saved to {}", path.display());
    }

    let source = match build_source(&args) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Source error: {}", e);
            std::process::exit(1);
        }
    };

    let config = MonitorConfig {
        read_timeout: Duration::from_millis(args.read_timeout_ms),
        retry_interval: Duration::from_millis(args.retry_ms),
        max_reconnect_attempts: args.max_reconnects,
        ..MonitorConfig::default()
    };

    let (tx, rx) = event_channel();
    let mut controller = Controller::new(settings, source.connector, source.clock, tx).with_config(config);
    if let Err(e) = controller.start() {
        eprintln!("Could not start monitoring: {}", e);
        std::process::exit(1);
    }

    let (quit_tx, quit_rx) = mpsc::unbounded_channel();
    if let Some(inputs) = source.inputs {
        spawn_key_reader(inputs, quit_tx);
    }

    if args.serve {
        run_serve(&args, controller, rx).await;
    } else {
        run_console(&args, controller, rx, quit_rx, settings).await;
    }
}

/// Settings file (or defaults) with command-line overrides on top
fn resolve_settings(args: &Args) -> Result<Settings, SettingsError> {
    let base = match args.settings {
        Some(ref path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let mut input = base.to_input();
    let overrides = [
        (&args.hit_damage, &mut input.hit_damage),
        (&args.self_hit_damage, &mut input.self_hit_damage),
        (&args.damage_per_ms, &mut input.damage_per_ms),
        (&args.max_hp, &mut input.max_hp),
        (&args.debounce, &mut input.debounce_secs),
        (&args.grace_delay, &mut input.grace_delay_secs),
    ];
    for (value, field) in overrides {
        if let Some(value) = value {
            *field = value.clone();
        }
    }
    input.parse()
}

fn build_source(args: &Args) -> Result<SourceSetup, SourceError> {
    if let Some(ref path) = args.replay {
        let clock: Arc<dyn Clock> = if args.instant {
            Arc::new(ManualClock::new())
        } else {
            Arc::new(SystemClock)
        };
        let connector = ReplayConnector::from_file(path, Arc::clone(&clock))?;
        info!("replaying {} frames from {}", connector.frame_count(), path.display());
        return Ok(SourceSetup {
            connector: Arc::new(connector),
            clock,
            inputs: None,
        });
    }

    if !args.simulate {
        info!("no source given, using the simulated box");
    }
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let inputs = SimulatedInputs::new();
    Ok(SourceSetup {
        connector: Arc::new(SimulatedConnector::new(Arc::clone(&inputs), Arc::clone(&clock))),
        clock,
        inputs: Some(inputs),
    })
}

/// Read simulated key presses from stdin on a plain thread
fn spawn_key_reader(inputs: Arc<SimulatedInputs>, quit: mpsc::UnboundedSender<()>) {
    println!("Keys: l = left lunge, r = right lunge, c = blade contact, u = unplug, q = quit (then Enter)");
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for key in line.trim().chars() {
                match key.to_ascii_lowercase() {
                    'l' => info!("left pressed: {}", inputs.toggle_left()),
                    'r' => info!("right pressed: {}", inputs.toggle_right()),
                    'c' => info!("blade contact: {}", inputs.toggle_contact()),
                    'u' => info!("unplugged: {}", inputs.toggle_unplugged()),
                    'q' => {
                        let _ = quit.send(());
                        return;
                    }
                    other => warn!("unknown key '{}'", other),
                }
            }
        }
        let _ = quit.send(());
    });
}

/// Print events until the session stops
async fn run_console(
    args: &Args,
    mut controller: Controller,
    mut rx: EventReceiver,
    mut quit: mpsc::UnboundedReceiver<()>,
    settings: Settings,
) {
    print_header(args.no_color);
    let mut board = Scoreboard::new(&settings);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                board.apply(&event);
                print_event(&event, args);
                if event.is_terminal() {
                    break;
                }
            }
            Some(()) = quit.recv() => {
                tokio::task::block_in_place(|| controller.shutdown());
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                tokio::task::block_in_place(|| controller.shutdown());
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string(&board).unwrap_or_default());
    } else if args.no_color {
        println!("{}", board.to_parseable_string());
    } else {
        println!("{}", board.to_terminal_string());
    }
}

fn print_event(event: &Event, args: &Args) {
    if args.json {
        println!("{}", serde_json::to_string(event).unwrap_or_default());
    } else if args.no_color {
        println!("{}", event.to_parseable_string());
    } else {
        println!("{}", event.to_terminal_string());
    }
}

fn print_header(no_color: bool) {
    let title = format!("fencehp v{} - HP fencing", VERSION);
    if no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "========================================".bold());
        println!("  {}", title.bold());
        println!("{}", "========================================".bold());
    }
    println!();
}

/// Run the API server
async fn run_serve(args: &Args, controller: Controller, rx: EventReceiver) {
    println!();
    println!("fencehp API server v{}", VERSION);
    println!();

    let state = AppState::start(controller, rx);
    tokio::select! {
        result = run_server(&args.addr, Arc::clone(&state)) => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
                tokio::task::block_in_place(|| state.shutdown());
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
        }
    }
    tokio::task::block_in_place(|| state.shutdown());
}
