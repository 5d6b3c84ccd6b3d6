#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the slot reel engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative reel world, and pure systems. Controllers submit [`Command`]
//! values describing desired transitions, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible reel area mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the shared animation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Starts every reel in a staggered cascade.
    StartSpinning,
    /// Requests every spinning reel to halt at its next boundary without a result.
    StopSpinning,
    /// Supplies the result every reel should settle on.
    StopWithResult {
        /// Final symbols per reel together with the winning lines.
        grid: ResultGrid,
    },
    /// Reveals the provided win lines one after another.
    ShowWinLines {
        /// Lines to highlight, in reveal order.
        lines: Vec<GridRow>,
    },
    /// Assigns spin directions to all reels.
    SetDirection {
        /// Direction assignment broadcast to the reels.
        mode: DirectionMode,
    },
    /// Clears every settled slot showing the provided symbol (tumbling mode).
    ClearSymbol {
        /// Symbol identifier to clear.
        symbol: SymbolId,
    },
    /// Clears the provided rows of a single reel (tumbling mode).
    ClearPositions {
        /// Reel whose rows are cleared.
        reel: ReelId,
        /// Rows to clear; rows without an occupant are ignored.
        rows: Vec<GridRow>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the animation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// A reel left the idle state and began its ease-in.
    ReelStartedSpinning {
        /// Reel that started.
        reel: ReelId,
    },
    /// The start call of the last reel has been issued.
    AllStartedSpinning,
    /// A scheduled result delivery reached its reel.
    ResultDelivered {
        /// Reel that received its result column.
        reel: ReelId,
    },
    /// A result reached a reel that was not spinning and was dropped.
    ReelResultDiscarded {
        /// Reel that discarded the result.
        reel: ReelId,
    },
    /// Every scheduled result delivery of the current cycle fired.
    AllStartedStoppingWithResult,
    /// A reel entered its overshoot-and-settle sequence.
    ReelStopping {
        /// Reel that is stopping.
        reel: ReelId,
    },
    /// A reel settled on grid alignment and returned to idle.
    ReelStoppedSpinning {
        /// Reel that stopped.
        reel: ReelId,
    },
    /// Every reel stopped.
    AllStoppedSpinning,
    /// Every reel stopped while a result was active.
    AllStoppedWithResult,
    /// Reports that a result grid failed validation.
    ResultRejected {
        /// Specific reason the grid was rejected.
        reason: ResultError,
    },
    /// All highlighted slots of one reel finished animating for a line.
    WinLineShown {
        /// Reel that finished its highlight.
        reel: ReelId,
        /// Line that was highlighted.
        line: GridRow,
    },
    /// Every reel finished highlighting a line.
    WinLineCompleted {
        /// Line that completed across the area.
        line: GridRow,
    },
    /// Every requested line has been shown.
    AllWinLinesShown,
    /// A reel finished its initial symbol drop.
    SymbolsDropFinished {
        /// Reel whose slots settled.
        reel: ReelId,
    },
    /// Every reel finished its initial symbol drop.
    AllSymbolsDropped,
    /// A reel finished the clear-out animation of the listed rows.
    SymbolsCleared {
        /// Reel whose rows were cleared.
        reel: ReelId,
        /// Rows that were vacated.
        rows: Vec<GridRow>,
    },
    /// A reel finished compaction and refilled every row.
    TumbleSettled {
        /// Reel that settled.
        reel: ReelId,
    },
    /// Reports that a clear request was rejected.
    ClearRejected {
        /// Reel targeted by the request, if a single reel was addressed.
        reel: Option<ReelId>,
        /// Specific reason the clear failed.
        reason: ClearError,
    },
    /// A reel adopted a new spin direction.
    DirectionChanged {
        /// Reel whose direction changed.
        reel: ReelId,
        /// Direction now in effect.
        direction: SpinDirection,
    },
    /// Reports that a direction change was rejected.
    DirectionChangeRejected {
        /// Specific reason the change failed.
        reason: DirectionChangeError,
    },
}

/// Unique identifier assigned to a reel; equal to its zero-based column index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReelId(u32);

impl ReelId {
    /// Creates a new reel identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Column index of the reel within the area.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a slot within its reel. Slots are recycled, never recreated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    /// Creates a new slot identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a symbol in the symbol table. Identifiers start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Creates a new symbol identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One-based row of the visible grid, counted from the top. Win lines are rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridRow(u32);

impl GridRow {
    /// Creates a new row from its one-based number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// One-based row number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Converts a zero-based lane into the row it represents.
    #[must_use]
    pub fn from_lane(lane: i32, rows: u32) -> Option<Self> {
        let lane = u32::try_from(lane).ok()?;
        (lane < rows).then(|| Self(lane + 1))
    }

    /// Zero-based lane of the row.
    #[must_use]
    pub const fn lane(&self) -> i32 {
        self.0 as i32 - 1
    }
}

/// Direction a reel scrolls while spinning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinDirection {
    /// Symbols travel toward the top of the area.
    Up,
    /// Symbols travel toward the bottom of the area.
    Down,
}

impl SpinDirection {
    /// Sign applied to vertical travel: `-1.0` upwards, `1.0` downwards.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Up => -1.0,
            Self::Down => 1.0,
        }
    }
}

/// Direction assignment broadcast to the whole area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionMode {
    /// Every reel scrolls up.
    Up,
    /// Every reel scrolls down.
    Down,
    /// Even reels scroll up, odd reels scroll down.
    UpDown,
}

impl DirectionMode {
    /// Resolves the direction a particular reel adopts under this mode.
    #[must_use]
    pub const fn direction_for(self, reel: ReelId) -> SpinDirection {
        match self {
            Self::Up => SpinDirection::Up,
            Self::Down => SpinDirection::Down,
            Self::UpDown => {
                if reel.get() % 2 == 0 {
                    SpinDirection::Up
                } else {
                    SpinDirection::Down
                }
            }
        }
    }
}

/// How reels present their symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReelingMode {
    /// Classic spinning columns.
    #[default]
    Regular,
    /// Symbols drop into place and cascade after clears.
    Tumbling,
}

/// Immutable description of the reel area, supplied once at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReelConfiguration {
    reel_count: u32,
    slots_per_reel: u32,
    slot_width: f32,
    slot_height: f32,
    spin_speed: f32,
    stop_delay: Duration,
    stop_interval: Duration,
    start_interval: Duration,
    drop_interval: Duration,
    win_line_interval: Duration,
    reeling_mode: ReelingMode,
}

impl Default for ReelConfiguration {
    fn default() -> Self {
        Self {
            reel_count: 6,
            slots_per_reel: 4,
            slot_width: 133.0,
            slot_height: 100.0,
            spin_speed: 3.0,
            stop_delay: Duration::from_millis(40),
            stop_interval: Duration::from_millis(40),
            start_interval: Duration::from_millis(40),
            drop_interval: Duration::from_millis(40),
            win_line_interval: Duration::from_millis(900),
            reeling_mode: ReelingMode::Regular,
        }
    }
}

impl ReelConfiguration {
    /// Overrides the number of reels.
    #[must_use]
    pub fn with_reel_count(mut self, reel_count: u32) -> Self {
        self.reel_count = reel_count;
        self
    }

    /// Overrides the number of visible rows per reel.
    #[must_use]
    pub fn with_slots_per_reel(mut self, slots_per_reel: u32) -> Self {
        self.slots_per_reel = slots_per_reel;
        self
    }

    /// Overrides the slot dimensions in world units.
    #[must_use]
    pub fn with_slot_size(mut self, width: f32, height: f32) -> Self {
        self.slot_width = width;
        self.slot_height = height;
        self
    }

    /// Overrides the spin speed, in full reel rotations per second.
    #[must_use]
    pub fn with_spin_speed(mut self, spin_speed: f32) -> Self {
        self.spin_speed = spin_speed;
        self
    }

    /// Overrides the delay before the first reel receives its result.
    #[must_use]
    pub fn with_stop_delay(mut self, stop_delay: Duration) -> Self {
        self.stop_delay = stop_delay;
        self
    }

    /// Overrides the delay between successive result deliveries.
    #[must_use]
    pub fn with_stop_interval(mut self, stop_interval: Duration) -> Self {
        self.stop_interval = stop_interval;
        self
    }

    /// Overrides the delay between successive reel starts.
    #[must_use]
    pub fn with_start_interval(mut self, start_interval: Duration) -> Self {
        self.start_interval = start_interval;
        self
    }

    /// Overrides the delay between successive reel drops in tumbling mode.
    #[must_use]
    pub fn with_drop_interval(mut self, drop_interval: Duration) -> Self {
        self.drop_interval = drop_interval;
        self
    }

    /// Overrides the delay between successive win line reveals.
    #[must_use]
    pub fn with_win_line_interval(mut self, win_line_interval: Duration) -> Self {
        self.win_line_interval = win_line_interval;
        self
    }

    /// Overrides the reeling mode.
    #[must_use]
    pub fn with_reeling_mode(mut self, reeling_mode: ReelingMode) -> Self {
        self.reeling_mode = reeling_mode;
        self
    }

    /// Checks the configuration for values the engine cannot honour.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.reel_count == 0 {
            return Err(ConfigError::NoReels);
        }
        if self.slots_per_reel == 0 {
            return Err(ConfigError::NoSlots);
        }
        let valid_size = |value: f32| value.is_finite() && value > 0.0;
        if !valid_size(self.slot_width) || !valid_size(self.slot_height) {
            return Err(ConfigError::InvalidSlotSize {
                width: self.slot_width,
                height: self.slot_height,
            });
        }
        if !valid_size(self.spin_speed) {
            return Err(ConfigError::InvalidSpinSpeed(self.spin_speed));
        }

        let last = self.reel_count - 1;
        let last_start = self.start_interval.saturating_mul(last);
        let last_delivery = self
            .stop_delay
            .saturating_add(self.stop_interval.saturating_mul(last));
        if last_start > last_delivery {
            return Err(ConfigError::StaggerOverlap {
                last_start,
                last_delivery,
            });
        }

        Ok(self)
    }

    /// Number of reels in the area.
    #[must_use]
    pub const fn reel_count(&self) -> u32 {
        self.reel_count
    }

    /// Number of visible rows per reel.
    #[must_use]
    pub const fn slots_per_reel(&self) -> u32 {
        self.slots_per_reel
    }

    /// Width of a slot in world units.
    #[must_use]
    pub const fn slot_width(&self) -> f32 {
        self.slot_width
    }

    /// Height of a slot in world units.
    #[must_use]
    pub const fn slot_height(&self) -> f32 {
        self.slot_height
    }

    /// Spin speed in full reel rotations per second.
    #[must_use]
    pub const fn spin_speed(&self) -> f32 {
        self.spin_speed
    }

    /// Delay before the first reel receives its result.
    #[must_use]
    pub const fn stop_delay(&self) -> Duration {
        self.stop_delay
    }

    /// Delay between successive result deliveries.
    #[must_use]
    pub const fn stop_interval(&self) -> Duration {
        self.stop_interval
    }

    /// Delay between successive reel starts.
    #[must_use]
    pub const fn start_interval(&self) -> Duration {
        self.start_interval
    }

    /// Delay between successive reel drops in tumbling mode.
    #[must_use]
    pub const fn drop_interval(&self) -> Duration {
        self.drop_interval
    }

    /// Delay between successive win line reveals.
    #[must_use]
    pub const fn win_line_interval(&self) -> Duration {
        self.win_line_interval
    }

    /// Reeling mode of the area.
    #[must_use]
    pub const fn reeling_mode(&self) -> ReelingMode {
        self.reeling_mode
    }

    /// Height of the visible area of a reel.
    #[must_use]
    pub fn area_height(&self) -> f32 {
        self.slots_per_reel as f32 * self.slot_height
    }

    /// Time a spinning column needs to travel one slot height.
    ///
    /// A reel of `slots_per_reel` rows completes `spin_speed` full rotations
    /// per second, so one slot passes every `1 / (rows * speed)` seconds.
    #[must_use]
    pub fn slot_travel(&self) -> Duration {
        let per_second = f64::from(self.slots_per_reel) * f64::from(self.spin_speed);
        if per_second <= 0.0 || !per_second.is_finite() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(1.0 / per_second)
    }
}

/// Reasons a [`ReelConfiguration`] fails validation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The area must contain at least one reel.
    #[error("reel count must be at least 1")]
    NoReels,
    /// Every reel must show at least one row.
    #[error("slots per reel must be at least 1")]
    NoSlots,
    /// Slot dimensions must be positive and finite.
    #[error("slot size {width}x{height} must be positive and finite")]
    InvalidSlotSize {
        /// Configured slot width.
        width: f32,
        /// Configured slot height.
        height: f32,
    },
    /// Spin speed must be positive and finite.
    #[error("spin speed {0} must be positive and finite")]
    InvalidSpinSpeed(f32),
    /// The last reel would receive its result before it starts.
    #[error("last reel starts at {last_start:?} but its result arrives at {last_delivery:?}")]
    StaggerOverlap {
        /// Start offset of the last reel.
        last_start: Duration,
        /// Result delivery offset of the last reel.
        last_delivery: Duration,
    },
}

/// Externally supplied outcome of one spin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGrid {
    reel_results: Vec<Vec<SymbolId>>,
    #[serde(default)]
    win_lines: Vec<GridRow>,
}

impl ResultGrid {
    /// Creates a grid from per-reel columns (top to bottom) and winning lines.
    #[must_use]
    pub fn new(reel_results: Vec<Vec<SymbolId>>, win_lines: Vec<GridRow>) -> Self {
        Self {
            reel_results,
            win_lines,
        }
    }

    /// Creates a grid from raw numeric identifiers.
    #[must_use]
    pub fn from_raw(reel_results: &[&[u32]], win_lines: &[u32]) -> Self {
        Self {
            reel_results: reel_results
                .iter()
                .map(|column| column.iter().copied().map(SymbolId::new).collect())
                .collect(),
            win_lines: win_lines.iter().copied().map(GridRow::new).collect(),
        }
    }

    /// Columns of final symbols, one per reel, listed top to bottom.
    #[must_use]
    pub fn reel_results(&self) -> &[Vec<SymbolId>] {
        &self.reel_results
    }

    /// Final column of a single reel.
    #[must_use]
    pub fn column(&self, reel: ReelId) -> Option<&[SymbolId]> {
        self.reel_results.get(reel.index()).map(Vec::as_slice)
    }

    /// Winning lines in reveal order.
    #[must_use]
    pub fn win_lines(&self) -> &[GridRow] {
        &self.win_lines
    }
}

/// Reasons a [`ResultGrid`] may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ResultError {
    /// The grid does not provide exactly one column per reel.
    #[error("expected {expected} reel columns, got {actual}")]
    ReelCountMismatch {
        /// Configured reel count.
        expected: u32,
        /// Columns present in the grid.
        actual: u32,
    },
    /// A column does not match the number of rows per reel.
    #[error("reel {reel:?} column has {actual} symbols, expected {expected}")]
    ColumnLengthMismatch {
        /// Reel whose column is malformed.
        reel: ReelId,
        /// Configured rows per reel.
        expected: u32,
        /// Symbols present in the column.
        actual: u32,
    },
    /// A column references a symbol missing from the symbol table.
    #[error("reel {reel:?} references unknown symbol {symbol:?}")]
    UnknownSymbol {
        /// Reel whose column is malformed.
        reel: ReelId,
        /// Unknown symbol identifier.
        symbol: SymbolId,
    },
    /// A win line lies outside the visible rows.
    #[error("win line {line:?} is outside the visible rows")]
    LineOutOfRange {
        /// Offending line.
        line: GridRow,
    },
}

/// Reasons a direction change may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum DirectionChangeError {
    /// At least one reel is spinning, stopping, or tumbling.
    #[error("reels are in motion")]
    ReelsInMotion,
}

/// Reasons a clear request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ClearError {
    /// Clearing is only available in tumbling mode.
    #[error("clearing requires tumbling mode")]
    RegularMode,
    /// No reel with the provided identifier exists.
    #[error("no such reel")]
    UnknownReel,
    /// The reel is spinning or a previous tumble has not settled.
    #[error("reel is busy")]
    ReelBusy,
    /// A requested row lies outside the visible rows.
    #[error("row {0:?} is outside the visible rows")]
    RowOutOfRange(GridRow),
}

/// Supplies result grids to a controller, one per spin.
pub trait ResultSource {
    /// Produces the result of the next spin, or `None` once exhausted.
    fn next_result(&mut self) -> Option<ResultGrid>;
}
