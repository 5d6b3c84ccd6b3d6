//! Reel column: spin and stop state machine plus tumble compaction.

use std::{
    collections::{BTreeMap, VecDeque},
    mem,
    time::Duration,
};

use slot_reels_core::{ClearError, GridRow, ReelId, SlotId, SpinDirection, SymbolId};
use tracing::{debug, trace, warn};

use crate::{
    barrier::Barrier,
    easing::Easing,
    slot::SymbolSlot,
    timeline::{Action, Channel, ReelAction, Tween},
    Services,
};

const EASE_IN_SLOTS: u32 = 2;
const BACKOUT_SLOTS: u32 = 4;
const DROP_STAGGER: Duration = Duration::from_millis(50);
const FILL_STAGGER: Duration = Duration::from_millis(80);

/// Notifications a reel raises for the area to aggregate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReelSignal {
    StartedSpinning,
    Stopping,
    StoppedSpinning,
    WinLineShown { line: GridRow, round: u32 },
    DropFinished,
    Cleared(Vec<GridRow>),
    TumbleSettled,
    DirectionChanged(SpinDirection),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ScrollPhase {
    EaseIn,
    Steady { since: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SpinState {
    Idle,
    Spinning {
        phase: ScrollPhase,
        pending_stop: bool,
    },
    Stopping {
        backout_started: bool,
    },
}

#[derive(Clone, Debug)]
enum Tumble {
    Parked,
    Dropping(Barrier<()>),
    Settled,
    Clearing {
        barrier: Barrier<()>,
        cleared: Vec<usize>,
        rows: Vec<GridRow>,
    },
    Shifting(Barrier<()>),
    Filling(Barrier<()>),
}

/// Lane a slot rests in when the column is aligned, by position in the column.
fn resting_lane(index: usize, direction: SpinDirection) -> i32 {
    match direction {
        SpinDirection::Down => index as i32 - 1,
        SpinDirection::Up => index as i32,
    }
}

/// Lane of the spare slot hiding the seam on the entering side.
fn spare_lane(direction: SpinDirection, rows: u32) -> i32 {
    match direction {
        SpinDirection::Down => -1,
        SpinDirection::Up => rows as i32,
    }
}

#[derive(Debug)]
pub(crate) struct Reel {
    id: ReelId,
    rows: u32,
    slot_height: f32,
    direction: SpinDirection,
    state: SpinState,
    queue: Option<VecDeque<SymbolId>>,
    offset: f32,
    boundaries: u64,
    slots: Vec<SymbolSlot>,
    highlights: BTreeMap<(u32, GridRow), Barrier<()>>,
    tumble: Tumble,
}

impl Reel {
    /// Builds a reel with `rows + 1` slots carrying random symbols.
    ///
    /// Parked reels keep every slot off-grid until [`Reel::drop_symbols`] runs.
    pub(crate) fn new(id: ReelId, parked: bool, services: &mut Services<'_>) -> Self {
        let rows = services.config.slots_per_reel();
        let direction = SpinDirection::Down;
        let slots = (0..=rows as usize)
            .map(|index| {
                let lane = if parked {
                    spare_lane(direction, rows)
                } else {
                    resting_lane(index, direction)
                };
                let symbol = services.symbols.random(services.rng);
                SymbolSlot::new(SlotId::new(index as u32), symbol, lane)
            })
            .collect();

        Self {
            id,
            rows,
            slot_height: services.config.slot_height(),
            direction,
            state: SpinState::Idle,
            queue: None,
            offset: 0.0,
            boundaries: 0,
            slots,
            highlights: BTreeMap::new(),
            tumble: if parked { Tumble::Parked } else { Tumble::Settled },
        }
    }

    pub(crate) fn id(&self) -> ReelId {
        self.id
    }

    pub(crate) fn direction(&self) -> SpinDirection {
        self.direction
    }

    pub(crate) fn state(&self) -> SpinState {
        self.state
    }

    pub(crate) fn offset(&self) -> f32 {
        self.offset
    }

    pub(crate) fn boundaries(&self) -> u64 {
        self.boundaries
    }

    pub(crate) fn slots(&self) -> &[SymbolSlot] {
        &self.slots
    }

    pub(crate) fn rows(&self) -> u32 {
        self.rows
    }

    pub(crate) fn slot_height(&self) -> f32 {
        self.slot_height
    }

    pub(crate) fn is_tumble_settled(&self) -> bool {
        matches!(self.tumble, Tumble::Settled)
    }

    /// Reports whether the reel is in motion or a tumble is running.
    pub(crate) fn is_busy(&self) -> bool {
        self.state != SpinState::Idle
            || !matches!(self.tumble, Tumble::Settled | Tumble::Parked)
    }

    pub(crate) fn can_start(&self) -> bool {
        self.state == SpinState::Idle && self.is_tumble_settled()
    }

    fn sign(&self) -> f32 {
        self.direction.sign()
    }

    fn lane_step(&self) -> i32 {
        match self.direction {
            SpinDirection::Down => 1,
            SpinDirection::Up => -1,
        }
    }

    fn occupant(&self, lane: i32) -> Option<usize> {
        self.slots.iter().position(|slot| slot.lane == lane)
    }

    /// Symbol resting in `row`, if a slot occupies it.
    pub(crate) fn symbol_at(&self, row: GridRow) -> Option<SymbolId> {
        self.occupant(row.lane()).map(|index| self.slots[index].symbol)
    }

    /// Rows whose resting slot currently shows `symbol`.
    pub(crate) fn rows_showing(&self, symbol: SymbolId) -> Vec<GridRow> {
        let mut rows: Vec<GridRow> = self
            .slots
            .iter()
            .filter(|slot| slot.symbol == symbol)
            .filter_map(|slot| slot.grid_position(self.rows))
            .collect();
        rows.sort();
        rows
    }

    pub(crate) fn start_spinning(
        &mut self,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        if !self.can_start() {
            debug!(reel = self.id.get(), state = ?self.state, "start ignored while reel is busy");
            return;
        }

        self.queue = None;
        self.offset = 0.0;
        self.state = SpinState::Spinning {
            phase: ScrollPhase::EaseIn,
            pending_stop: false,
        };
        let travel = services.config.slot_travel();
        services.timeline.animate(
            Tween::new(
                Channel::ReelOffset(self.id),
                0.0,
                self.sign() * self.slot_height,
                travel.saturating_mul(EASE_IN_SLOTS),
            )
            .easing(Easing::QuadIn)
            .then(Action::Reel(self.id, ReelAction::EaseInFinished)),
        );
        debug!(reel = self.id.get(), direction = ?self.direction, "reel started spinning");
        signals.push(ReelSignal::StartedSpinning);
    }

    /// Requests a stop at the next boundary crossing.
    pub(crate) fn stop_spinning(&mut self) {
        match &mut self.state {
            SpinState::Spinning { pending_stop, .. } => *pending_stop = true,
            state => {
                debug!(reel = self.id.get(), ?state, "stop ignored while reel is not spinning");
            }
        }
    }

    /// Queues the final column. Returns `false` when the reel is not spinning
    /// and the column was discarded.
    pub(crate) fn stop_with_result(&mut self, column: &[SymbolId]) -> bool {
        if !matches!(self.state, SpinState::Spinning { .. }) {
            debug!(reel = self.id.get(), state = ?self.state, "result discarded");
            return false;
        }
        self.queue = Some(column.iter().copied().collect());
        true
    }

    /// Keeps the column offset in step with the steady scroll.
    ///
    /// Boundary crossings are timeline events of their own, so the number of
    /// recycles never depends on how time was split into frames.
    pub(crate) fn scroll(&mut self, services: &Services<'_>) {
        let SpinState::Spinning {
            phase: ScrollPhase::Steady { since },
            ..
        } = self.state
        else {
            return;
        };
        let travel = services.config.slot_travel();
        if travel.is_zero() {
            return;
        }

        let elapsed = services.timeline.now().saturating_sub(since);
        let progress = (elapsed.as_secs_f64() / travel.as_secs_f64()).min(1.0);
        self.offset = self.sign() * self.slot_height * progress as f32;
    }

    /// Moves every slot one lane along the spin direction, recycling the slot
    /// that left the visible area onto the entering side.
    ///
    /// Returns `true` when this boundary consumed the last queued symbol.
    fn loop_reel(&mut self, services: &mut Services<'_>) -> bool {
        self.boundaries = self.boundaries.wrapping_add(1);
        let rows = self.rows as i32;
        let step = self.lane_step();
        let spare = spare_lane(self.direction, self.rows);

        let mut drained = false;
        for index in 0..self.slots.len() {
            let lane = self.slots[index].lane + step;
            let left = match self.direction {
                SpinDirection::Down => lane >= rows,
                SpinDirection::Up => lane < 0,
            };
            if left {
                let (symbol, last) = self.next_symbol(services);
                drained |= last;
                let slot = &mut self.slots[index];
                slot.lane = spare;
                slot.symbol = symbol;
                trace!(
                    reel = self.id.get(),
                    slot = slot.id.get(),
                    symbol = symbol.get(),
                    "slot recycled"
                );
            } else {
                self.slots[index].lane = lane;
            }
        }
        drained
    }

    fn next_symbol(&mut self, services: &mut Services<'_>) -> (SymbolId, bool) {
        if let Some(queue) = self.queue.as_mut() {
            let next = match self.direction {
                SpinDirection::Down => queue.pop_back(),
                SpinDirection::Up => queue.pop_front(),
            };
            if let Some(symbol) = next {
                return (symbol, queue.is_empty());
            }
        }
        (services.symbols.random(services.rng), false)
    }

    fn shift_lanes(&mut self, delta: i32) {
        for slot in &mut self.slots {
            slot.lane += delta;
        }
    }

    fn begin_stopping(&mut self, services: &mut Services<'_>, signals: &mut Vec<ReelSignal>) {
        match self.state {
            SpinState::Spinning { .. } => {}
            SpinState::Stopping { .. } => {
                debug!(reel = self.id.get(), "stop sequence already running");
                return;
            }
            SpinState::Idle => return,
        }

        self.state = SpinState::Stopping {
            backout_started: false,
        };
        let backout = services.config.slot_travel().saturating_mul(BACKOUT_SLOTS);
        services.timeline.animate(
            Tween::new(
                Channel::ReelOffset(self.id),
                self.offset,
                self.sign() * self.slot_height,
                backout,
            )
            .easing(Easing::BackOut)
            .then(Action::Reel(self.id, ReelAction::BackoutFinished)),
        );
        services.timeline.schedule(
            backout.mul_f64(f64::from(Easing::BackOut.first_arrival())),
            Action::Reel(self.id, ReelAction::BackoutCrossed),
        );
        debug!(reel = self.id.get(), "reel stopping");
        signals.push(ReelSignal::Stopping);
    }

    /// One extra recycle as the overshooting column passes a full slot, then
    /// the lanes step back so every slot stays where it is drawn.
    ///
    /// This fires when the overshoot first reaches one slot height on its way
    /// out, not when the column swings back through it. At that instant the
    /// leaving slot sits exactly one row past the visible area, so swapping
    /// its symbol is never seen.
    fn cross_backout(&mut self, services: &mut Services<'_>) {
        let _ = self.loop_reel(services);
        self.shift_lanes(-self.lane_step());
        self.state = SpinState::Stopping {
            backout_started: true,
        };
    }

    pub(crate) fn set_offset(&mut self, value: f32) {
        self.offset = value;
    }

    pub(crate) fn on_action(
        &mut self,
        action: ReelAction,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        match action {
            ReelAction::EaseInFinished => self.ease_in_finished(services, signals),
            ReelAction::Boundary => self.boundary(services, signals),
            ReelAction::BackoutCrossed => {
                if self.state == (SpinState::Stopping { backout_started: false }) {
                    self.cross_backout(services);
                }
            }
            ReelAction::BackoutFinished => self.backout_finished(services, signals),
            ReelAction::HighlightFinished { line, round } => {
                self.highlight_finished(line, round, signals);
            }
            ReelAction::SlotLanded(index) => {
                if let Some(slot) = self.slots.get(index) {
                    slot.shake(self.id, index, self.slot_height, services.timeline);
                }
            }
            ReelAction::SlotShaken(index) => self.slot_shaken(index, signals),
            ReelAction::SlotCleared(index) => self.slot_cleared(index, services, signals),
            ReelAction::SlotShifted(index) => self.slot_shifted(index, services, signals),
            ReelAction::SlotFilled(index) => self.slot_filled(index, signals),
        }
    }

    fn ease_in_finished(&mut self, services: &mut Services<'_>, signals: &mut Vec<ReelSignal>) {
        let SpinState::Spinning {
            phase: ScrollPhase::EaseIn,
            pending_stop,
        } = self.state
        else {
            return;
        };

        let drained = self.loop_reel(services);
        self.continue_scroll(pending_stop || drained, services, signals);
    }

    fn boundary(&mut self, services: &mut Services<'_>, signals: &mut Vec<ReelSignal>) {
        let SpinState::Spinning {
            phase: ScrollPhase::Steady { .. },
            pending_stop,
        } = self.state
        else {
            return;
        };

        let drained = self.loop_reel(services);
        self.continue_scroll(pending_stop || drained, services, signals);
    }

    /// Realigns the column on a boundary, then either stops or waits for the
    /// next one a full slot travel later.
    fn continue_scroll(
        &mut self,
        pending_stop: bool,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        self.offset = 0.0;
        self.state = SpinState::Spinning {
            phase: ScrollPhase::Steady {
                since: services.timeline.now(),
            },
            pending_stop,
        };
        if pending_stop {
            self.begin_stopping(services, signals);
            return;
        }

        let travel = services.config.slot_travel();
        if !travel.is_zero() {
            services
                .timeline
                .schedule(travel, Action::Reel(self.id, ReelAction::Boundary));
        }
    }

    fn backout_finished(&mut self, services: &mut Services<'_>, signals: &mut Vec<ReelSignal>) {
        let SpinState::Stopping { backout_started } = self.state else {
            return;
        };
        if !backout_started {
            self.cross_backout(services);
        }

        self.shift_lanes(self.lane_step());
        self.offset = 0.0;
        self.queue = None;
        self.state = SpinState::Idle;
        debug!(reel = self.id.get(), "reel stopped spinning");
        signals.push(ReelSignal::StoppedSpinning);
    }

    /// Re-derives the resting lane of the spare slot for the new direction.
    pub(crate) fn set_direction(
        &mut self,
        direction: SpinDirection,
        signals: &mut Vec<ReelSignal>,
    ) {
        self.direction = direction;
        let rows = self.rows;
        let spare = spare_lane(direction, rows);
        for slot in &mut self.slots {
            if slot.grid_position(rows).is_none() {
                slot.lane = spare;
            }
        }
        signals.push(ReelSignal::DirectionChanged(direction));
    }

    /// Highlights every slot resting on `line` for reveal `round`.
    pub(crate) fn show_win_line(
        &mut self,
        line: GridRow,
        round: u32,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        let matched: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.grid_position(self.rows) == Some(line))
            .map(|(index, _)| index)
            .collect();
        if matched.is_empty() {
            signals.push(ReelSignal::WinLineShown { line, round });
            return;
        }

        for &index in &matched {
            self.slots[index].highlight(self.id, index, line, round, services.timeline);
        }
        let _ = self
            .highlights
            .insert((round, line), Barrier::new(matched.len(), ()));
    }

    fn highlight_finished(&mut self, line: GridRow, round: u32, signals: &mut Vec<ReelSignal>) {
        let Some(barrier) = self.highlights.get_mut(&(round, line)) else {
            return;
        };
        if barrier.arrive().is_some() {
            let _ = self.highlights.remove(&(round, line));
            signals.push(ReelSignal::WinLineShown { line, round });
        }
    }

    /// Initial fill: every slot but the spare drops into its row, bottom row first.
    pub(crate) fn drop_symbols(&mut self, services: &mut Services<'_>) {
        if !matches!(self.tumble, Tumble::Parked) {
            debug!(reel = self.id.get(), "drop ignored; reel already filled");
            return;
        }

        let rows = self.rows;
        let from = -services.config.area_height();
        let dropping: Vec<(usize, i32)> = (0..self.slots.len())
            .map(|index| (index, resting_lane(index, self.direction)))
            .filter(|&(_, lane)| GridRow::from_lane(lane, rows).is_some())
            .collect();

        self.tumble = Tumble::Dropping(Barrier::new(dropping.len(), ()));
        for (index, lane) in dropping {
            let delay = DROP_STAGGER.saturating_mul((rows as i32 - 1 - lane) as u32);
            let slot = &mut self.slots[index];
            slot.lane = lane;
            slot.drop_in(self.id, index, from, delay, services.timeline);
        }
    }

    fn slot_shaken(&mut self, index: usize, signals: &mut Vec<ReelSignal>) {
        trace!(reel = self.id.get(), slot = index, "slot landed");
        let Tumble::Dropping(barrier) = &mut self.tumble else {
            return;
        };
        if barrier.arrive().is_some() {
            self.tumble = Tumble::Settled;
            debug!(reel = self.id.get(), "symbols dropped");
            signals.push(ReelSignal::DropFinished);
        }
    }

    /// Plays the clear-out animation on every slot resting in `rows`.
    pub(crate) fn clear_positions(
        &mut self,
        rows: &[GridRow],
        services: &mut Services<'_>,
    ) -> Result<(), ClearError> {
        if !self.can_start() {
            return Err(ClearError::ReelBusy);
        }
        if let Some(row) = rows
            .iter()
            .find(|row| row.get() == 0 || row.get() > self.rows)
        {
            return Err(ClearError::RowOutOfRange(*row));
        }

        let mut rows = rows.to_vec();
        rows.sort();
        rows.dedup();
        let cleared: Vec<usize> = rows
            .iter()
            .filter_map(|row| self.occupant(row.lane()))
            .collect();
        if cleared.is_empty() {
            debug!(reel = self.id.get(), "nothing to clear");
            return Ok(());
        }

        for &index in &cleared {
            self.slots[index].clear_out(self.id, index, services.timeline);
        }
        self.tumble = Tumble::Clearing {
            barrier: Barrier::new(cleared.len(), ()),
            cleared,
            rows,
        };
        Ok(())
    }

    fn slot_cleared(
        &mut self,
        index: usize,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        trace!(reel = self.id.get(), slot = index, "slot faded out");
        let Tumble::Clearing { barrier, .. } = &mut self.tumble else {
            return;
        };
        if barrier.arrive().is_none() {
            return;
        }
        let Tumble::Clearing { cleared, rows, .. } = mem::replace(&mut self.tumble, Tumble::Settled)
        else {
            return;
        };

        let spare = spare_lane(self.direction, self.rows);
        for &index in &cleared {
            let symbol = services.symbols.random(services.rng);
            self.slots[index].send_in_flight(spare, symbol);
        }
        debug!(reel = self.id.get(), rows = rows.len(), "symbols cleared");
        signals.push(ReelSignal::Cleared(rows));
        self.shift_symbols_down(cleared.len(), services, signals);
    }

    /// Compacts survivors towards the bottom, then fills the top rows.
    ///
    /// Rows are scanned bottom to top; each survivor moves down by the number
    /// of gaps found beneath it, so survivors keep their relative order.
    fn shift_symbols_down(
        &mut self,
        count: usize,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        let mut gaps = 0;
        let mut shifting = Vec::new();
        for lane in (0..self.rows as i32).rev() {
            match self.occupant(lane) {
                None => gaps += 1,
                Some(index) if gaps > 0 => shifting.push((index, gaps)),
                Some(_) => {}
            }
        }
        if gaps != count {
            warn!(reel = self.id.get(), gaps, count, "gap count differs from cleared slots");
        }

        if shifting.is_empty() {
            self.fill_gaps(services, signals);
            return;
        }

        self.tumble = Tumble::Shifting(Barrier::new(shifting.len(), ()));
        for (index, rows) in shifting {
            self.slots[index].shift_down(
                self.id,
                index,
                rows as i32,
                self.slot_height,
                services.timeline,
            );
        }
    }

    fn slot_shifted(
        &mut self,
        index: usize,
        services: &mut Services<'_>,
        signals: &mut Vec<ReelSignal>,
    ) {
        trace!(reel = self.id.get(), slot = index, "slot shifted");
        let Tumble::Shifting(barrier) = &mut self.tumble else {
            return;
        };
        if barrier.arrive().is_some() {
            self.fill_gaps(services, signals);
        }
    }

    /// Assigns free rows, top to bottom, to in-flight slots in column order.
    fn fill_gaps(&mut self, services: &mut Services<'_>, signals: &mut Vec<ReelSignal>) {
        let rows = self.rows;
        let free: Vec<i32> = (0..rows as i32)
            .filter(|&lane| self.occupant(lane).is_none())
            .collect();
        let pool: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.grid_position(rows).is_none())
            .map(|(index, _)| index)
            .collect();
        if pool.len() < free.len() {
            warn!(
                reel = self.id.get(),
                free = free.len(),
                available = pool.len(),
                "not enough in-flight slots to fill every row"
            );
        }

        let assignments: Vec<(usize, i32)> = pool.into_iter().zip(free).collect();
        if assignments.is_empty() {
            self.settle(signals);
            return;
        }

        self.tumble = Tumble::Filling(Barrier::new(assignments.len(), ()));
        for (order, (index, lane)) in assignments.into_iter().enumerate() {
            let delay = FILL_STAGGER.saturating_mul(order as u32);
            self.slots[index].fill(
                self.id,
                index,
                lane,
                self.slot_height,
                delay,
                services.timeline,
            );
        }
    }

    fn slot_filled(&mut self, index: usize, signals: &mut Vec<ReelSignal>) {
        trace!(reel = self.id.get(), slot = index, "slot filled");
        let Tumble::Filling(barrier) = &mut self.tumble else {
            return;
        };
        if barrier.arrive().is_some() {
            self.settle(signals);
        }
    }

    fn settle(&mut self, signals: &mut Vec<ReelSignal>) {
        self.tumble = Tumble::Settled;
        debug!(reel = self.id.get(), "tumble settled");
        signals.push(ReelSignal::TumbleSettled);
    }

    pub(crate) fn set_slot_motion(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.motion = value;
        }
    }

    pub(crate) fn set_slot_scale(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.scale = glam::Vec2::splat(value);
        }
    }

    pub(crate) fn set_slot_alpha(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.alpha = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        symbols::ImageHandle,
        timeline::{Fired, Timeline},
        SymbolTable,
    };
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use slot_reels_core::ReelConfiguration;

    struct Fixture {
        config: ReelConfiguration,
        symbols: SymbolTable,
        rng: ChaCha8Rng,
        timeline: Timeline,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: ReelConfiguration::default(),
                symbols: SymbolTable::from_images(
                    ["a", "b", "c", "d", "e"].into_iter().map(ImageHandle::new),
                )
                .expect("symbols"),
                rng: ChaCha8Rng::seed_from_u64(11),
                timeline: Timeline::new(),
            }
        }

        fn services(&mut self) -> Services<'_> {
            Services {
                config: &self.config,
                symbols: &self.symbols,
                rng: &mut self.rng,
                timeline: &mut self.timeline,
            }
        }
    }

    fn steady_reel(fixture: &mut Fixture, direction: SpinDirection) -> Reel {
        let mut signals = Vec::new();
        let mut reel = Reel::new(ReelId::new(0), false, &mut fixture.services());
        reel.set_direction(direction, &mut signals);
        reel.continue_scroll(false, &mut fixture.services(), &mut signals);
        reel
    }

    /// Runs the reel's timers and tweens for `dt`, the way the world does.
    fn run(
        reel: &mut Reel,
        fixture: &mut Fixture,
        dt: Duration,
        signals: &mut Vec<ReelSignal>,
    ) {
        let until = fixture.timeline.now() + dt;
        while let Some(fired) = fixture.timeline.next_event(until) {
            let action = match fired {
                Fired::Timer(action) => Some(action),
                Fired::Tween { last, then } => {
                    if let Channel::ReelOffset(_) = last.channel {
                        reel.set_offset(last.value);
                    }
                    then
                }
            };
            if let Some(Action::Reel(_, action)) = action {
                reel.on_action(action, &mut fixture.services(), signals);
            }
        }
        fixture.timeline.finish(until);
        reel.scroll(&fixture.services());
    }

    fn lanes(reel: &Reel) -> Vec<i32> {
        let mut lanes: Vec<i32> = reel.slots.iter().map(|slot| slot.lane).collect();
        lanes.sort_unstable();
        lanes
    }

    /// Starts a fresh reel and feeds it `frames`, returning its boundary count.
    fn boundaries_after(frames: impl IntoIterator<Item = Duration>) -> u64 {
        let mut fixture = Fixture::new();
        let mut signals = Vec::new();
        let mut reel = Reel::new(ReelId::new(0), false, &mut fixture.services());
        reel.start_spinning(&mut fixture.services(), &mut signals);
        for dt in frames {
            run(&mut reel, &mut fixture, dt, &mut signals);
        }
        assert_eq!(signals, vec![ReelSignal::StartedSpinning]);
        reel.boundaries()
    }

    #[test]
    fn boundary_count_is_independent_of_frame_partition() {
        let total = Duration::from_millis(950);
        let travel = Fixture::new().config.slot_travel();
        let after_ease_in = total - travel * EASE_IN_SLOTS;
        let expected = 1 + (after_ease_in.as_nanos() / travel.as_nanos()) as u64;

        assert_eq!(boundaries_after([total]), expected);
        assert_eq!(
            boundaries_after((0..950).map(|_| Duration::from_millis(1))),
            expected
        );
        let uneven = [7, 130, 3, 410, 1, 399].map(Duration::from_millis);
        assert_eq!(uneven.iter().sum::<Duration>(), total);
        assert_eq!(boundaries_after(uneven), expected);
    }

    #[test]
    fn steady_offset_tracks_the_clock_between_boundaries() {
        let mut fixture = Fixture::new();
        let mut signals = Vec::new();
        let mut reel = steady_reel(&mut fixture, SpinDirection::Down);
        let travel = fixture.config.slot_travel();

        run(&mut reel, &mut fixture, travel / 4, &mut signals);
        assert_eq!(reel.boundaries(), 0);
        assert_relative_eq!(reel.offset(), reel.slot_height() / 4.0, epsilon = 1e-2);

        run(&mut reel, &mut fixture, travel - travel / 4, &mut signals);
        assert_eq!(reel.boundaries(), 1);
        assert_eq!(reel.offset(), 0.0);
    }

    #[test]
    fn recycling_keeps_lanes_contiguous() {
        let mut signals = Vec::new();

        let mut fixture = Fixture::new();
        let mut down = steady_reel(&mut fixture, SpinDirection::Down);
        run(&mut down, &mut fixture, Duration::from_millis(500), &mut signals);
        assert!(down.boundaries() > 0);
        assert_eq!(lanes(&down), vec![-1, 0, 1, 2, 3]);

        let mut fixture = Fixture::new();
        let mut up = steady_reel(&mut fixture, SpinDirection::Up);
        run(&mut up, &mut fixture, Duration::from_millis(500), &mut signals);
        assert!(up.boundaries() > 0);
        assert_eq!(lanes(&up), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn queued_column_is_consumed_from_the_entering_end() {
        let mut fixture = Fixture::new();
        let mut signals = Vec::new();
        let mut reel = steady_reel(&mut fixture, SpinDirection::Down);
        let column = [1, 2, 3, 4].map(SymbolId::new);
        assert!(reel.stop_with_result(&column));

        let travel = fixture.config.slot_travel();
        for _ in 0..3 {
            run(&mut reel, &mut fixture, travel, &mut signals);
        }
        assert!(signals.is_empty());
        run(&mut reel, &mut fixture, travel, &mut signals);
        assert_eq!(signals, vec![ReelSignal::Stopping]);
        assert_eq!(
            reel.state(),
            SpinState::Stopping {
                backout_started: false
            }
        );
        assert_eq!(reel.boundaries(), 4);

        run(&mut reel, &mut fixture, travel * BACKOUT_SLOTS, &mut signals);
        assert_eq!(
            signals,
            vec![ReelSignal::Stopping, ReelSignal::StoppedSpinning]
        );
        // The overshoot recycles exactly one more slot.
        assert_eq!(reel.boundaries(), 5);
        assert_eq!(reel.offset(), 0.0);
        let shown: Vec<Option<SymbolId>> =
            (1..=4).map(|row| reel.symbol_at(GridRow::new(row))).collect();
        assert_eq!(shown, column.map(Some).to_vec());
    }

    #[test]
    fn backout_recycles_when_the_overshoot_first_reaches_a_slot() {
        let mut fixture = Fixture::new();
        let mut signals = Vec::new();
        let mut reel = steady_reel(&mut fixture, SpinDirection::Down);
        reel.stop_spinning();

        let travel = fixture.config.slot_travel();
        run(&mut reel, &mut fixture, travel, &mut signals);
        assert_eq!(signals, vec![ReelSignal::Stopping]);

        let backout = travel * BACKOUT_SLOTS;
        let crossing = backout.mul_f64(f64::from(Easing::BackOut.first_arrival()));
        run(&mut reel, &mut fixture, crossing - Duration::from_millis(1), &mut signals);
        assert_eq!(reel.boundaries(), 1);
        assert!(reel.offset() < reel.slot_height());

        run(&mut reel, &mut fixture, Duration::from_millis(1), &mut signals);
        assert_eq!(reel.boundaries(), 2);
        assert_eq!(
            reel.state(),
            SpinState::Stopping {
                backout_started: true
            }
        );

        // Further stop requests while the column settles change nothing.
        reel.stop_spinning();
        run(&mut reel, &mut fixture, backout, &mut signals);
        assert_eq!(reel.boundaries(), 2);
        assert_eq!(
            signals,
            vec![ReelSignal::Stopping, ReelSignal::StoppedSpinning]
        );
        assert_eq!(lanes(&reel), vec![-1, 0, 1, 2, 3]);
    }

    #[test]
    fn stop_request_is_absorbed_when_idle() {
        let mut fixture = Fixture::new();
        let mut reel = Reel::new(ReelId::new(0), false, &mut fixture.services());
        reel.stop_spinning();
        assert_eq!(reel.state(), SpinState::Idle);
        assert!(!reel.stop_with_result(&[SymbolId::new(1)]));
    }

    #[test]
    fn parked_reel_cannot_start() {
        let mut fixture = Fixture::new();
        let mut signals = Vec::new();
        let mut reel = Reel::new(ReelId::new(0), true, &mut fixture.services());
        assert!(reel.slots().iter().all(|slot| slot.grid_position(4).is_none()));
        reel.start_spinning(&mut fixture.services(), &mut signals);
        assert!(signals.is_empty());
        assert_eq!(reel.state(), SpinState::Idle);
    }
}
