#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative reel area state for the slot reel engine.
//!
//! The world owns every reel, the shared animation clock and the fan-in
//! counters that aggregate per-reel completions. It is mutated exclusively
//! through [`apply`] and observed through the [`query`] module.

mod area;
mod barrier;
mod easing;
mod reel;
mod slot;
mod symbols;
mod timeline;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use slot_reels_core::{Command, ConfigError, Event, ReelConfiguration};

use crate::{
    area::ReelArea,
    timeline::{Fired, Timeline},
};

pub use symbols::{ImageHandle, SymbolTable, SymbolTableError, TextureSource, SYMBOL_CATEGORY};

/// Shared collaborators handed to reels while they run.
pub(crate) struct Services<'a> {
    pub(crate) config: &'a ReelConfiguration,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) timeline: &'a mut Timeline,
}

/// Represents the authoritative reel area state.
#[derive(Debug)]
pub struct World {
    config: ReelConfiguration,
    symbols: SymbolTable,
    timeline: Timeline,
    rng: ChaCha8Rng,
    area: ReelArea,
}

impl World {
    /// Creates the reel area described by `config`.
    ///
    /// Symbols are resolved before any reel exists, so every slot starts with
    /// a valid symbol drawn from `seed`. Tumbling areas begin their initial
    /// drop with the first applied command.
    pub fn new(
        config: ReelConfiguration,
        symbols: SymbolTable,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut timeline = Timeline::new();
        let area = ReelArea::new(&mut Services {
            config: &config,
            symbols: &symbols,
            rng: &mut rng,
            timeline: &mut timeline,
        });

        Ok(Self {
            config,
            symbols,
            timeline,
            rng,
            area,
        })
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    let World {
        config,
        symbols,
        timeline,
        rng,
        area,
    } = world;
    let mut services = Services {
        config,
        symbols,
        rng,
        timeline,
    };

    let mut until = services.timeline.now();
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            until = until.saturating_add(dt);
        }
        Command::StartSpinning => area.start_spinning(&mut services),
        Command::StopSpinning => area.stop_spinning(),
        Command::StopWithResult { grid } => {
            area.stop_with_result(grid, &mut services, out_events);
        }
        Command::ShowWinLines { lines } => area.show_win_lines(lines, &mut services, out_events),
        Command::SetDirection { mode } => area.set_direction(mode, out_events),
        Command::ClearSymbol { symbol } => area.clear_symbol(symbol, &mut services, out_events),
        Command::ClearPositions { reel, rows } => {
            area.clear_positions(reel, &rows, &mut services, out_events);
        }
    }

    // Every timer and tween end up to `until` fires at its own instant, so the
    // outcome is the same however the caller splits time into ticks.
    while let Some(fired) = services.timeline.next_event(until) {
        match fired {
            Fired::Timer(action) => area.dispatch(action, &mut services, out_events),
            Fired::Tween { last, then } => {
                area.apply_sample(last);
                if let Some(action) = then {
                    area.dispatch(action, &mut services, out_events);
                }
            }
        }
    }
    services.timeline.finish(until);

    area.scroll(&services);
    for sample in services.timeline.samples() {
        area.apply_sample(sample);
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec2;
    use slot_reels_core::{
        GridRow, ReelConfiguration, ReelId, ResultGrid, SlotId, SpinDirection, SymbolId,
    };

    use super::{SymbolTable, World};
    use crate::reel::{Reel, SpinState};

    /// Provides read-only access to the immutable configuration.
    #[must_use]
    pub fn configuration(world: &World) -> &ReelConfiguration {
        &world.config
    }

    /// Provides read-only access to the symbol table shared by every reel.
    #[must_use]
    pub fn symbol_table(world: &World) -> &SymbolTable {
        &world.symbols
    }

    /// Current time of the animation clock.
    #[must_use]
    pub fn now(world: &World) -> Duration {
        world.timeline.now()
    }

    /// Result of the cycle in progress, until its win lines are fully shown.
    #[must_use]
    pub fn active_result(world: &World) -> Option<&ResultGrid> {
        world.area.active_result()
    }

    /// Arrivals recorded by the stopped-spinning fan-in in the current cycle.
    ///
    /// Zero whenever no reel of the cycle has stopped yet and again right
    /// after every reel stopped.
    #[must_use]
    pub fn stopped_fan_in(world: &World) -> usize {
        world.area.stopped_arrivals()
    }

    /// Reports whether every reel rests and no timer or animation is pending.
    #[must_use]
    pub fn is_settled(world: &World) -> bool {
        world.timeline.pending() == 0
            && world
                .area
                .reels()
                .iter()
                .all(|reel| reel.state() == SpinState::Idle && reel.is_tumble_settled())
    }

    /// Captures a snapshot of a single reel.
    #[must_use]
    pub fn reel(world: &World, id: ReelId) -> Option<ReelSnapshot> {
        world
            .area
            .reel(id)
            .map(|reel| snapshot(reel, world.config.slot_width()))
    }

    /// Captures a read-only view of every reel, ordered by column.
    #[must_use]
    pub fn reel_view(world: &World) -> ReelView {
        let width = world.config.slot_width();
        ReelView {
            snapshots: world
                .area
                .reels()
                .iter()
                .map(|reel| snapshot(reel, width))
                .collect(),
        }
    }

    /// Symbols resting in the rows of a reel, top to bottom.
    ///
    /// Rows without an occupant (mid-tumble) are reported as `None`.
    #[must_use]
    pub fn visible_column(world: &World, id: ReelId) -> Vec<Option<SymbolId>> {
        let Some(reel) = world.area.reel(id) else {
            return Vec::new();
        };
        (1..=reel.rows())
            .map(|row| reel.symbol_at(GridRow::new(row)))
            .collect()
    }

    /// Visible columns of every reel, ordered by column.
    #[must_use]
    pub fn visible_grid(world: &World) -> Vec<Vec<Option<SymbolId>>> {
        world
            .area
            .reels()
            .iter()
            .map(|reel| visible_column(world, reel.id()))
            .collect()
    }

    fn snapshot(reel: &Reel, slot_width: f32) -> ReelSnapshot {
        let x = reel.id().get() as f32 * slot_width;
        let height = reel.slot_height();
        ReelSnapshot {
            id: reel.id(),
            phase: match reel.state() {
                SpinState::Idle => ReelPhase::Idle,
                SpinState::Spinning { .. } => ReelPhase::Spinning,
                SpinState::Stopping { .. } => ReelPhase::Stopping,
            },
            direction: reel.direction(),
            offset: reel.offset(),
            boundaries: reel.boundaries(),
            tumble_settled: reel.is_tumble_settled(),
            slots: reel
                .slots()
                .iter()
                .map(|slot| SlotSnapshot {
                    id: slot.id,
                    symbol: slot.symbol,
                    lane: slot.lane,
                    grid_position: slot.grid_position(reel.rows()),
                    position: Vec2::new(x, slot.y(height, reel.offset())),
                    scale: slot.scale,
                    alpha: slot.alpha,
                })
                .collect(),
        }
    }

    /// Read-only snapshot describing every reel.
    #[derive(Clone, Debug)]
    pub struct ReelView {
        snapshots: Vec<ReelSnapshot>,
    }

    impl ReelView {
        /// Iterator over the captured reel snapshots in column order.
        pub fn iter(&self) -> impl Iterator<Item = &ReelSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<ReelSnapshot> {
            self.snapshots
        }
    }

    /// Lifecycle phase of a reel.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ReelPhase {
        /// Resting on grid alignment.
        Idle,
        /// Accelerating or scrolling at nominal speed.
        Spinning,
        /// Overshooting and settling onto grid alignment.
        Stopping,
    }

    /// Immutable representation of a single reel.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ReelSnapshot {
        /// Identifier of the reel.
        pub id: ReelId,
        /// Lifecycle phase of the reel.
        pub phase: ReelPhase,
        /// Direction the reel scrolls in.
        pub direction: SpinDirection,
        /// Vertical offset of the whole column.
        pub offset: f32,
        /// Boundary-crossing events fired since the reel was built.
        pub boundaries: u64,
        /// Indicates whether no tumble is running and every row is filled.
        pub tumble_settled: bool,
        /// Slots of the column in construction order.
        pub slots: Vec<SlotSnapshot>,
    }

    /// Immutable representation of a single slot.
    #[derive(Clone, Debug, PartialEq)]
    pub struct SlotSnapshot {
        /// Identifier of the slot within its reel.
        pub id: SlotId,
        /// Symbol currently shown.
        pub symbol: SymbolId,
        /// Zero-based resting lane; outside the grid while in flight.
        pub lane: i32,
        /// Row the slot rests in, or `None` while in flight.
        pub grid_position: Option<GridRow>,
        /// Top-left corner of the slot in area coordinates.
        pub position: Vec2,
        /// Current scale.
        pub scale: Vec2,
        /// Current opacity.
        pub alpha: f32,
    }
}
