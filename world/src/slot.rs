//! Single symbol slot of a reel and the animations it plays.

use std::time::Duration;

use glam::Vec2;
use slot_reels_core::{GridRow, ReelId, SlotId, SymbolId};

use crate::{
    easing::Easing,
    timeline::{Action, Channel, ReelAction, Timeline, Tween},
};

const HIGHLIGHT_LEG: Duration = Duration::from_millis(250);
const HIGHLIGHT_SCALE: f32 = 1.1;
const HIGHLIGHT_ALPHA: f32 = 0.65;

const DROP_DURATION: Duration = Duration::from_millis(400);
const SHAKE_LEG: Duration = Duration::from_millis(60);
const SHAKE_AMPLITUDE: f32 = 0.08;

const CLEAR_DURATION: Duration = Duration::from_millis(300);
const CLEARED_SCALE: f32 = 0.5;

const SHIFT_DURATION: Duration = Duration::from_millis(250);
const FILL_DURATION: Duration = Duration::from_millis(400);

/// Slot of a reel column.
///
/// The resting lane is zero-based from the top of the visible area; lanes
/// outside `0..rows` mean the slot is in flight and holds no grid position.
/// `motion` displaces the slot from its lane while it animates.
#[derive(Clone, Debug)]
pub(crate) struct SymbolSlot {
    pub(crate) id: SlotId,
    pub(crate) symbol: SymbolId,
    pub(crate) lane: i32,
    pub(crate) motion: f32,
    pub(crate) scale: Vec2,
    pub(crate) alpha: f32,
}

impl SymbolSlot {
    pub(crate) fn new(id: SlotId, symbol: SymbolId, lane: i32) -> Self {
        Self {
            id,
            symbol,
            lane,
            motion: 0.0,
            scale: Vec2::ONE,
            alpha: 1.0,
        }
    }

    pub(crate) fn grid_position(&self, rows: u32) -> Option<GridRow> {
        GridRow::from_lane(self.lane, rows)
    }

    /// Vertical position of the slot's top edge within its reel.
    pub(crate) fn y(&self, slot_height: f32, column_offset: f32) -> f32 {
        self.lane as f32 * slot_height + self.motion + column_offset
    }

    /// Parks the slot off-grid with a fresh symbol and restored visuals.
    pub(crate) fn send_in_flight(&mut self, lane: i32, symbol: SymbolId) {
        self.lane = lane;
        self.symbol = symbol;
        self.motion = 0.0;
        self.scale = Vec2::ONE;
        self.alpha = 1.0;
    }

    /// Pulses scale and alpha, resuming the reel once the alpha pulse ends.
    pub(crate) fn highlight(
        &self,
        reel: ReelId,
        index: usize,
        line: GridRow,
        round: u32,
        timeline: &mut Timeline,
    ) {
        timeline.animate(
            Tween::new(Channel::SlotScale(reel, index), 1.0, HIGHLIGHT_SCALE, HIGHLIGHT_LEG)
                .easing(Easing::QuadInOut)
                .yoyo(2),
        );
        timeline.animate(
            Tween::new(Channel::SlotAlpha(reel, index), 1.0, HIGHLIGHT_ALPHA, HIGHLIGHT_LEG)
                .easing(Easing::QuadInOut)
                .yoyo(4)
                .then(Action::Reel(reel, ReelAction::HighlightFinished { line, round })),
        );
    }

    /// Drops the slot from `from` above its lane after `delay`.
    pub(crate) fn drop_in(
        &mut self,
        reel: ReelId,
        index: usize,
        from: f32,
        delay: Duration,
        timeline: &mut Timeline,
    ) {
        self.motion = from;
        timeline.animate(
            Tween::new(Channel::SlotMotion(reel, index), from, 0.0, DROP_DURATION)
                .easing(Easing::QuadIn)
                .delay(delay)
                .then(Action::Reel(reel, ReelAction::SlotLanded(index))),
        );
    }

    /// Short bounce played once a dropped slot landed.
    pub(crate) fn shake(
        &self,
        reel: ReelId,
        index: usize,
        slot_height: f32,
        timeline: &mut Timeline,
    ) {
        timeline.animate(
            Tween::new(
                Channel::SlotMotion(reel, index),
                0.0,
                -SHAKE_AMPLITUDE * slot_height,
                SHAKE_LEG,
            )
            .easing(Easing::QuadOut)
            .yoyo(2)
            .then(Action::Reel(reel, ReelAction::SlotShaken(index))),
        );
    }

    pub(crate) fn clear_out(&self, reel: ReelId, index: usize, timeline: &mut Timeline) {
        timeline.animate(
            Tween::new(Channel::SlotScale(reel, index), 1.0, CLEARED_SCALE, CLEAR_DURATION)
                .easing(Easing::QuadIn),
        );
        timeline.animate(
            Tween::new(Channel::SlotAlpha(reel, index), 1.0, 0.0, CLEAR_DURATION)
                .easing(Easing::QuadIn)
                .then(Action::Reel(reel, ReelAction::SlotCleared(index))),
        );
    }

    /// Moves the slot `rows` lanes down while keeping it visually in place,
    /// then lets it fall into the new lane.
    pub(crate) fn shift_down(
        &mut self,
        reel: ReelId,
        index: usize,
        rows: i32,
        slot_height: f32,
        timeline: &mut Timeline,
    ) {
        self.lane += rows;
        self.motion = -(rows as f32) * slot_height;
        timeline.animate(
            Tween::new(Channel::SlotMotion(reel, index), self.motion, 0.0, SHIFT_DURATION)
                .easing(Easing::QuadIn)
                .then(Action::Reel(reel, ReelAction::SlotShifted(index))),
        );
    }

    /// Assigns the slot to `lane` and drops it in from just above the area.
    pub(crate) fn fill(
        &mut self,
        reel: ReelId,
        index: usize,
        lane: i32,
        slot_height: f32,
        delay: Duration,
        timeline: &mut Timeline,
    ) {
        self.lane = lane;
        self.motion = -((lane + 1) as f32) * slot_height;
        timeline.animate(
            Tween::new(Channel::SlotMotion(reel, index), self.motion, 0.0, FILL_DURATION)
                .easing(Easing::QuadIn)
                .delay(delay)
                .then(Action::Reel(reel, ReelAction::SlotFilled(index))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(lane: i32) -> SymbolSlot {
        SymbolSlot::new(SlotId::new(0), SymbolId::new(1), lane)
    }

    #[test]
    fn lanes_outside_the_grid_are_in_flight() {
        assert_eq!(slot(-1).grid_position(4), None);
        assert_eq!(slot(4).grid_position(4), None);
        assert_eq!(slot(0).grid_position(4), Some(GridRow::new(1)));
    }

    #[test]
    fn shift_keeps_slot_visually_in_place() {
        let mut timeline = Timeline::new();
        let mut shifted = slot(1);
        let before = shifted.y(100.0, 0.0);
        shifted.shift_down(ReelId::new(0), 0, 2, 100.0, &mut timeline);
        assert_eq!(shifted.lane, 3);
        assert_eq!(shifted.y(100.0, 0.0), before);
        assert_eq!(timeline.pending(), 1);
    }

    #[test]
    fn fill_starts_above_the_area() {
        let mut timeline = Timeline::new();
        let mut filled = slot(-1);
        filled.fill(ReelId::new(0), 0, 2, 100.0, Duration::ZERO, &mut timeline);
        assert_eq!(filled.grid_position(4), Some(GridRow::new(3)));
        assert_eq!(filled.y(100.0, 0.0), -100.0);
    }
}
