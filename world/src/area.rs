//! Cross-reel orchestration: staggered scheduling and fan-in of reel signals.

use std::collections::{BTreeMap, BTreeSet};

use slot_reels_core::{
    ClearError, DirectionChangeError, DirectionMode, Event, GridRow, ReelId, ReelingMode,
    ResultError, ResultGrid, SymbolId,
};
use tracing::{debug, warn};

use crate::{
    barrier::Barrier,
    reel::{Reel, ReelSignal},
    timeline::{Action, Channel, Sample},
    Services,
};

/// Owns the reels and every fan-in counter aggregated across them.
#[derive(Debug)]
pub(crate) struct ReelArea {
    reels: Vec<Reel>,
    started_stopping: Barrier<Event>,
    stopped: Barrier<Event>,
    dropped: Barrier<Event>,
    line_barriers: BTreeMap<GridRow, Barrier<Event>>,
    requested_lines: BTreeSet<GridRow>,
    lines_shown: BTreeSet<GridRow>,
    reveal_round: u32,
    result_displayed: bool,
    active_result: Option<ResultGrid>,
}

impl ReelArea {
    /// Builds every reel. Tumbling areas schedule the initial drop right away.
    pub(crate) fn new(services: &mut Services<'_>) -> Self {
        let count = services.config.reel_count();
        let tumbling = services.config.reeling_mode() == ReelingMode::Tumbling;
        let reels: Vec<Reel> = (0..count)
            .map(|index| Reel::new(ReelId::new(index), tumbling, services))
            .collect();

        if tumbling {
            let interval = services.config.drop_interval();
            for reel in &reels {
                services.timeline.schedule(
                    interval.saturating_mul(reel.id().get()),
                    Action::DropReel(reel.id()),
                );
            }
        }

        let expected = reels.len();
        Self {
            reels,
            started_stopping: Barrier::new(expected, Event::AllStartedStoppingWithResult),
            stopped: Barrier::new(expected, Event::AllStoppedSpinning),
            dropped: Barrier::new(expected, Event::AllSymbolsDropped),
            line_barriers: BTreeMap::new(),
            requested_lines: BTreeSet::new(),
            lines_shown: BTreeSet::new(),
            reveal_round: 0,
            result_displayed: false,
            active_result: None,
        }
    }

    pub(crate) fn reels(&self) -> &[Reel] {
        &self.reels
    }

    pub(crate) fn reel(&self, id: ReelId) -> Option<&Reel> {
        self.reels.get(id.index())
    }

    pub(crate) fn active_result(&self) -> Option<&ResultGrid> {
        self.active_result.as_ref()
    }

    /// Arrivals recorded by the stopped fan-in in the current cycle.
    pub(crate) fn stopped_arrivals(&self) -> usize {
        self.stopped.arrived()
    }

    fn any_busy(&self) -> bool {
        self.reels.iter().any(Reel::is_busy)
    }

    pub(crate) fn start_spinning(&mut self, services: &mut Services<'_>) {
        if self.reels.iter().any(|reel| !reel.can_start()) {
            debug!("start ignored while reels are busy");
            return;
        }

        self.stopped.reset();
        self.started_stopping.reset();
        self.result_displayed = false;
        self.active_result = None;
        let interval = services.config.start_interval();
        for reel in &self.reels {
            services.timeline.schedule(
                interval.saturating_mul(reel.id().get()),
                Action::StartReel(reel.id()),
            );
        }
    }

    pub(crate) fn stop_spinning(&mut self) {
        for reel in &mut self.reels {
            reel.stop_spinning();
        }
    }

    pub(crate) fn stop_with_result(
        &mut self,
        grid: ResultGrid,
        services: &mut Services<'_>,
        out: &mut Vec<Event>,
    ) {
        if let Err(reason) = validate_result(&grid, services) {
            warn!(%reason, "result rejected");
            out.push(Event::ResultRejected { reason });
            return;
        }

        self.active_result = Some(grid);
        let delay = services.config.stop_delay();
        let interval = services.config.stop_interval();
        for reel in &self.reels {
            services.timeline.schedule(
                delay.saturating_add(interval.saturating_mul(reel.id().get())),
                Action::DeliverResult(reel.id()),
            );
        }
    }

    pub(crate) fn show_win_lines(
        &mut self,
        lines: Vec<GridRow>,
        services: &mut Services<'_>,
        out: &mut Vec<Event>,
    ) {
        let mut seen = BTreeSet::new();
        let ordered: Vec<GridRow> = lines
            .into_iter()
            .filter(|line| seen.insert(*line))
            .collect();

        // Highlights still running from an earlier request keep their old round
        // and are ignored when they finish.
        self.reveal_round = self.reveal_round.wrapping_add(1);
        self.requested_lines = seen;
        self.lines_shown.clear();
        self.line_barriers.clear();
        self.result_displayed = false;

        if ordered.is_empty() {
            self.finish_reveal(out);
            return;
        }

        let interval = services.config.win_line_interval();
        let round = self.reveal_round;
        for (order, line) in ordered.into_iter().enumerate() {
            services.timeline.schedule(
                interval.saturating_mul(order as u32),
                Action::RevealLine { line, round },
            );
        }
    }

    fn finish_reveal(&mut self, out: &mut Vec<Event>) {
        self.lines_shown.clear();
        self.result_displayed = true;
        self.active_result = None;
        debug!("all win lines shown");
        out.push(Event::AllWinLinesShown);
    }

    pub(crate) fn set_direction(&mut self, mode: DirectionMode, out: &mut Vec<Event>) {
        if self.any_busy() {
            debug!(?mode, "direction change rejected while reels are in motion");
            out.push(Event::DirectionChangeRejected {
                reason: DirectionChangeError::ReelsInMotion,
            });
            return;
        }

        for index in 0..self.reels.len() {
            let mut signals = Vec::new();
            let reel = &mut self.reels[index];
            reel.set_direction(mode.direction_for(reel.id()), &mut signals);
            let id = reel.id();
            self.route(id, signals, out);
        }
    }

    /// Clears every resting slot showing `symbol`, batched per reel.
    pub(crate) fn clear_symbol(
        &mut self,
        symbol: SymbolId,
        services: &mut Services<'_>,
        out: &mut Vec<Event>,
    ) {
        if services.config.reeling_mode() != ReelingMode::Tumbling {
            out.push(Event::ClearRejected {
                reel: None,
                reason: ClearError::RegularMode,
            });
            return;
        }

        for reel in &mut self.reels {
            let rows = reel.rows_showing(symbol);
            if rows.is_empty() {
                continue;
            }
            if let Err(reason) = reel.clear_positions(&rows, services) {
                debug!(reel = reel.id().get(), %reason, "clear rejected");
                out.push(Event::ClearRejected {
                    reel: Some(reel.id()),
                    reason,
                });
            }
        }
    }

    pub(crate) fn clear_positions(
        &mut self,
        reel: ReelId,
        rows: &[GridRow],
        services: &mut Services<'_>,
        out: &mut Vec<Event>,
    ) {
        let result = if services.config.reeling_mode() != ReelingMode::Tumbling {
            Err(ClearError::RegularMode)
        } else {
            match self.reels.get_mut(reel.index()) {
                Some(target) => target.clear_positions(rows, services),
                None => Err(ClearError::UnknownReel),
            }
        };

        if let Err(reason) = result {
            debug!(reel = reel.get(), %reason, "clear rejected");
            out.push(Event::ClearRejected {
                reel: Some(reel),
                reason,
            });
        }
    }

    /// Applies one tween sample to the channel it animates.
    pub(crate) fn apply_sample(&mut self, sample: Sample) {
        match sample.channel {
            Channel::ReelOffset(id) => {
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.set_offset(sample.value);
                }
            }
            Channel::SlotMotion(id, index) => {
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.set_slot_motion(index, sample.value);
                }
            }
            Channel::SlotScale(id, index) => {
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.set_slot_scale(index, sample.value);
                }
            }
            Channel::SlotAlpha(id, index) => {
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.set_slot_alpha(index, sample.value);
                }
            }
        }
    }

    /// Brings the offset of every steadily scrolling reel up to the clock.
    pub(crate) fn scroll(&mut self, services: &Services<'_>) {
        for reel in &mut self.reels {
            reel.scroll(services);
        }
    }

    /// Resumes the work a timer or tween completion was waiting for.
    pub(crate) fn dispatch(
        &mut self,
        action: Action,
        services: &mut Services<'_>,
        out: &mut Vec<Event>,
    ) {
        match action {
            Action::StartReel(id) => {
                let mut signals = Vec::new();
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.start_spinning(services, &mut signals);
                }
                self.route(id, signals, out);
                if id.index() + 1 == self.reels.len() {
                    debug!("all reels started");
                    out.push(Event::AllStartedSpinning);
                }
            }
            Action::DeliverResult(id) => {
                let column = self
                    .active_result
                    .as_ref()
                    .and_then(|grid| grid.column(id))
                    .map(<[SymbolId]>::to_vec);
                let delivered = match (self.reels.get_mut(id.index()), column) {
                    (Some(reel), Some(column)) => reel.stop_with_result(&column),
                    _ => false,
                };
                out.push(if delivered {
                    Event::ResultDelivered { reel: id }
                } else {
                    Event::ReelResultDiscarded { reel: id }
                });
                if let Some(event) = self.started_stopping.arrive() {
                    out.push(event);
                }
            }
            Action::RevealLine { round, .. } if round != self.reveal_round => {
                debug!(round, "stale win line reveal dropped");
            }
            Action::RevealLine { line, round } => {
                let _ = self
                    .line_barriers
                    .insert(line, Barrier::new(self.reels.len(), Event::WinLineCompleted { line }));
                for index in 0..self.reels.len() {
                    let mut signals = Vec::new();
                    self.reels[index].show_win_line(line, round, services, &mut signals);
                    let id = self.reels[index].id();
                    self.route(id, signals, out);
                }
            }
            Action::DropReel(id) => {
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.drop_symbols(services);
                }
            }
            Action::Reel(id, reel_action) => {
                let mut signals = Vec::new();
                if let Some(reel) = self.reels.get_mut(id.index()) {
                    reel.on_action(reel_action, services, &mut signals);
                }
                self.route(id, signals, out);
            }
        }
    }

    /// Translates reel signals into events and feeds the area's fan-ins.
    fn route(&mut self, reel: ReelId, signals: Vec<ReelSignal>, out: &mut Vec<Event>) {
        for signal in signals {
            match signal {
                ReelSignal::StartedSpinning => out.push(Event::ReelStartedSpinning { reel }),
                ReelSignal::Stopping => out.push(Event::ReelStopping { reel }),
                ReelSignal::StoppedSpinning => {
                    out.push(Event::ReelStoppedSpinning { reel });
                    if let Some(event) = self.stopped.arrive() {
                        out.push(event);
                        if self.active_result.is_some() {
                            out.push(Event::AllStoppedWithResult);
                        }
                    }
                }
                ReelSignal::WinLineShown { round, .. } if round != self.reveal_round => {}
                ReelSignal::WinLineShown { line, .. } => {
                    out.push(Event::WinLineShown { reel, line });
                    self.line_shown(line, out);
                }
                ReelSignal::DropFinished => {
                    out.push(Event::SymbolsDropFinished { reel });
                    if let Some(event) = self.dropped.arrive() {
                        out.push(event);
                    }
                }
                ReelSignal::Cleared(rows) => out.push(Event::SymbolsCleared { reel, rows }),
                ReelSignal::TumbleSettled => out.push(Event::TumbleSettled { reel }),
                ReelSignal::DirectionChanged(direction) => {
                    out.push(Event::DirectionChanged { reel, direction });
                }
            }
        }
    }

    fn line_shown(&mut self, line: GridRow, out: &mut Vec<Event>) {
        if self.result_displayed || !self.requested_lines.contains(&line) {
            return;
        }
        let Some(barrier) = self.line_barriers.get_mut(&line) else {
            return;
        };
        let Some(event) = barrier.arrive() else {
            return;
        };

        let _ = self.line_barriers.remove(&line);
        out.push(event);
        if self.lines_shown.insert(line) && self.lines_shown.len() == self.requested_lines.len() {
            self.finish_reveal(out);
        }
    }
}

fn validate_result(grid: &ResultGrid, services: &Services<'_>) -> Result<(), ResultError> {
    let config = services.config;
    let columns = grid.reel_results();
    if columns.len() != config.reel_count() as usize {
        return Err(ResultError::ReelCountMismatch {
            expected: config.reel_count(),
            actual: columns.len() as u32,
        });
    }

    for (index, column) in columns.iter().enumerate() {
        let reel = ReelId::new(index as u32);
        if column.len() != config.slots_per_reel() as usize {
            return Err(ResultError::ColumnLengthMismatch {
                reel,
                expected: config.slots_per_reel(),
                actual: column.len() as u32,
            });
        }
        if let Some(symbol) = column
            .iter()
            .copied()
            .find(|symbol| !services.symbols.contains(*symbol))
        {
            return Err(ResultError::UnknownSymbol { reel, symbol });
        }
    }

    if let Some(line) = grid
        .win_lines()
        .iter()
        .copied()
        .find(|line| line.get() == 0 || line.get() > config.slots_per_reel())
    {
        return Err(ResultError::LineOutOfRange { line });
    }

    Ok(())
}
