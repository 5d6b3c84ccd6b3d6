#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for the slot reel engine.
//!
//! The runner loads settings, builds the world and a game controller, then
//! advances a fixed simulated clock until the requested number of spin cycles
//! completed. Area events are logged through `tracing`; set `RUST_LOG` to see
//! per-reel detail.

mod settings;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use slot_reels_core::{
    Command, DirectionMode, Event, ReelingMode, ResultGrid, ResultSource, SymbolId,
};
use slot_reels_system_controller::{Config as ControllerConfig, Controller, Phase};
use slot_reels_system_results::{MockResults, ScriptedResults};
use slot_reels_world::{self as world, query, SymbolTable, World};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use settings::Settings;

/// Command-line arguments accepted by the runner.
#[derive(Debug, Parser)]
#[command(name = "slot-reels", about = "Runs slot reel spin cycles on a simulated clock")]
struct Args {
    /// Optional TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reeling mode, overriding the settings file.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Spin direction applied before the first cycle.
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,
    /// Number of spin cycles to run.
    #[arg(long, default_value_t = 3)]
    spins: u32,
    /// Seed for symbol and result randomness.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Length of one simulated frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// JSON file of result grids replayed in order instead of the mock results.
    #[arg(long)]
    results: Option<PathBuf>,
    /// Symbol cleared after every cycle in tumbling mode.
    #[arg(long)]
    clear_symbol: Option<u32>,
    /// Simulated time after which the run is abandoned.
    #[arg(long, default_value_t = 300)]
    max_seconds: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Regular,
    Tumbling,
}

impl From<ModeArg> for ReelingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Regular => Self::Regular,
            ModeArg::Tumbling => Self::Tumbling,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
    UpDown,
}

impl From<DirectionArg> for DirectionMode {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Up => Self::Up,
            DirectionArg::Down => Self::Down,
            DirectionArg::UpDown => Self::UpDown,
        }
    }
}

/// Result source selected on the command line.
#[derive(Debug)]
enum Results {
    Mock(MockResults),
    Scripted(ScriptedResults),
}

impl ResultSource for Results {
    fn next_result(&mut self) -> Option<ResultGrid> {
        match self {
            Self::Mock(source) => source.next_result(),
            Self::Scripted(source) => source.next_result(),
        }
    }
}

/// Simulated clock shared by every loop of the run.
struct Clock {
    tick: Duration,
    elapsed: Duration,
    limit: Duration,
}

impl Clock {
    fn tick(&mut self, world: &mut World, controller: &mut Controller<Results>) -> Result<()> {
        if self.elapsed >= self.limit {
            bail!(
                "simulation exceeded {:?} (phase {:?})",
                self.limit,
                controller.phase()
            );
        }
        self.elapsed += self.tick;
        let mut events = Vec::new();
        world::apply(world, Command::Tick { dt: self.tick }, &mut events);
        process_controller(world, controller, events);
        Ok(())
    }
}

/// Entry point for the slot reels command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        settings.reels.mode = mode.into();
    }

    let config = settings
        .reel_configuration()
        .validate()
        .context("invalid reel configuration")?;
    let tumbling = config.reeling_mode() == ReelingMode::Tumbling;
    let symbols = SymbolTable::load(&settings.assets).context("failed to load symbol images")?;
    info!(
        reels = config.reel_count(),
        rows = config.slots_per_reel(),
        symbols = symbols.len(),
        mode = ?config.reeling_mode(),
        "reel area ready"
    );

    let results = match &args.results {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read results from {}", path.display()))?;
            Results::Scripted(
                ScriptedResults::from_json(&raw)
                    .with_context(|| format!("invalid results in {}", path.display()))?,
            )
        }
        None => Results::Mock(MockResults::new(args.seed)),
    };

    let mut world = World::new(config, symbols, args.seed)?;
    let mut controller = Controller::new(
        ControllerConfig::new(Duration::from_millis(settings.game.auto_stop_ms)),
        results,
    );
    let mut clock = Clock {
        tick: Duration::from_millis(args.tick_ms.max(1)),
        elapsed: Duration::ZERO,
        limit: Duration::from_secs(args.max_seconds),
    };

    if tumbling {
        while !query::is_settled(&world) {
            clock.tick(&mut world, &mut controller)?;
        }
    }

    if let Some(direction) = args.direction {
        send(
            &mut world,
            &mut controller,
            Command::SetDirection {
                mode: direction.into(),
            },
        );
    }

    for cycle in 1..=args.spins {
        let mut commands = Vec::new();
        if !controller.press_spin(&mut commands) {
            bail!("spin button disabled before cycle {cycle}");
        }
        for command in commands {
            send(&mut world, &mut controller, command);
        }
        while controller.phase() != Phase::Ready {
            clock.tick(&mut world, &mut controller)?;
        }
        print_grid(&world, cycle);

        match args.clear_symbol {
            Some(symbol) if tumbling => {
                send(
                    &mut world,
                    &mut controller,
                    Command::ClearSymbol {
                        symbol: SymbolId::new(symbol),
                    },
                );
                while !query::is_settled(&world) {
                    clock.tick(&mut world, &mut controller)?;
                }
                print_grid(&world, cycle);
            }
            Some(_) => warn!("--clear-symbol only applies in tumbling mode"),
            None => {}
        }
    }

    info!(
        cycles = controller.completed_cycles(),
        simulated = ?query::now(&world),
        "run finished"
    );
    Ok(())
}

fn send(world: &mut World, controller: &mut Controller<Results>, command: Command) {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    process_controller(world, controller, events);
}

/// Feeds events to the controller and applies its commands until it goes quiet.
fn process_controller(
    world: &mut World,
    controller: &mut Controller<Results>,
    pending_events: Vec<Event>,
) {
    let mut events = pending_events;
    loop {
        events.iter().for_each(log_event);

        let mut commands = Vec::new();
        controller.handle(&events, &mut commands);
        if commands.is_empty() {
            break;
        }

        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::AllStartedSpinning
        | Event::AllStartedStoppingWithResult
        | Event::AllStoppedSpinning
        | Event::AllStoppedWithResult
        | Event::AllWinLinesShown
        | Event::AllSymbolsDropped => info!(?event, "area"),
        Event::WinLineCompleted { line } => info!(line = line.get(), "win line shown"),
        Event::SymbolsCleared { reel, rows } => {
            info!(reel = reel.get(), rows = ?rows, "symbols cleared");
        }
        Event::ResultRejected { reason } => warn!(%reason, "result rejected"),
        Event::ClearRejected { reel, reason } => warn!(?reel, %reason, "clear rejected"),
        Event::DirectionChangeRejected { reason } => warn!(%reason, "direction change rejected"),
        _ => debug!(?event, "reel"),
    }
}

fn print_grid(world: &World, cycle: u32) {
    let table = query::symbol_table(world);
    let name = |symbol: Option<SymbolId>| {
        symbol
            .and_then(|symbol| table.get(symbol))
            .map_or("-", |image| image.key())
    };
    let grid = query::visible_grid(world);
    let rows = grid.first().map_or(0, Vec::len);

    println!("cycle {cycle}:");
    for row in 0..rows {
        let line: Vec<&str> = grid
            .iter()
            .map(|column| name(column.get(row).copied().flatten()))
            .collect();
        println!("  {}", line.join(" | "));
    }
}
