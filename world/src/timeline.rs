//! Cooperative scheduler driving every delayed call and animation.
//!
//! The timeline owns the animation clock. Deferred calls and tween ends are
//! discrete occurrences taken one at a time in `(time, insertion)` order, with
//! the clock set to the exact instant of each. Completion and timer
//! notifications are the only points at which reel logic resumes, so no two
//! pieces of reel logic ever interleave and nothing depends on frame size.

use std::time::Duration;

use slot_reels_core::{GridRow, ReelId};

use crate::easing::Easing;

/// Deferred work resumed by the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Staggered start of a single reel.
    StartReel(ReelId),
    /// Staggered delivery of a reel's result column.
    DeliverResult(ReelId),
    /// Reveal of one win line across the area, tagged with its request.
    RevealLine { line: GridRow, round: u32 },
    /// Staggered initial drop of a reel in tumbling mode.
    DropReel(ReelId),
    /// Notification addressed to a single reel.
    Reel(ReelId, ReelAction),
}

/// Notification addressed to a single reel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReelAction {
    EaseInFinished,
    /// The steady scroll travelled one more slot height.
    Boundary,
    /// The backout overshoot first reached one slot height.
    BackoutCrossed,
    BackoutFinished,
    HighlightFinished { line: GridRow, round: u32 },
    SlotLanded(usize),
    SlotShaken(usize),
    SlotCleared(usize),
    SlotShifted(usize),
    SlotFilled(usize),
}

/// Animated property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Channel {
    /// Vertical offset of a whole reel column.
    ReelOffset(ReelId),
    /// Vertical displacement of a slot from its resting lane.
    SlotMotion(ReelId, usize),
    /// Uniform scale of a slot.
    SlotScale(ReelId, usize),
    /// Opacity of a slot.
    SlotAlpha(ReelId, usize),
}

/// Value produced for a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Sample {
    pub(crate) channel: Channel,
    pub(crate) value: f32,
}

/// Single occurrence taken off the timeline, at its exact time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Fired {
    /// A deferred call came due.
    Timer(Action),
    /// A tween reached its end; `last` carries its exact final value.
    Tween { last: Sample, then: Option<Action> },
}

/// Run-to-completion animation of one channel.
#[derive(Clone, Debug)]
pub(crate) struct Tween {
    channel: Channel,
    from: f32,
    to: f32,
    leg: Duration,
    legs: u32,
    yoyo: bool,
    easing: Easing,
    delay: Duration,
    start: Duration,
    sequence: u64,
    on_complete: Option<Action>,
}

impl Tween {
    /// Animates `channel` from `from` to `to` over a single leg.
    pub(crate) fn new(channel: Channel, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            channel,
            from,
            to,
            leg: duration,
            legs: 1,
            yoyo: false,
            easing: Easing::Linear,
            delay: Duration::ZERO,
            start: Duration::ZERO,
            sequence: 0,
            on_complete: None,
        }
    }

    pub(crate) fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Holds the starting value for `delay` before animating.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Plays `legs` legs, alternating direction after each one.
    pub(crate) fn yoyo(mut self, legs: u32) -> Self {
        self.legs = legs.max(1);
        self.yoyo = true;
        self
    }

    /// Resumes `action` once the tween finished.
    pub(crate) fn then(mut self, action: Action) -> Self {
        self.on_complete = Some(action);
        self
    }

    fn end(&self) -> Duration {
        self.start
            .saturating_add(self.delay)
            .saturating_add(self.leg.saturating_mul(self.legs))
    }

    fn final_value(&self) -> f32 {
        if self.yoyo && self.legs % 2 == 0 {
            self.from
        } else {
            self.to
        }
    }

    fn sample_at(&self, now: Duration) -> f32 {
        if now >= self.end() || self.leg.is_zero() {
            return self.final_value();
        }

        let active = now.saturating_sub(self.start).saturating_sub(self.delay);
        let leg_nanos = self.leg.as_nanos();
        let leg_index = active.as_nanos() / leg_nanos;
        let within = active.as_nanos() - leg_index * leg_nanos;
        let t = (within as f64 / leg_nanos as f64) as f32;
        let reversed = self.yoyo && leg_index % 2 == 1;
        let progress = if reversed {
            self.easing.apply(1.0 - t)
        } else {
            self.easing.apply(t)
        };
        self.from + (self.to - self.from) * progress
    }
}

#[derive(Clone, Debug)]
struct Timer {
    due: Duration,
    sequence: u64,
    action: Action,
}

/// Shared animation clock with its pending timers and running tweens.
///
/// Timers and tween ends share one insertion counter, so two occurrences at
/// the same instant fire in the order they were registered.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    now: Duration,
    sequence: u64,
    timers: Vec<Timer>,
    tweens: Vec<Tween>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current time of the animation clock.
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers and tweens still pending.
    pub(crate) fn pending(&self) -> usize {
        self.timers.len() + self.tweens.len()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Resumes `action` once `delay` elapsed.
    pub(crate) fn schedule(&mut self, delay: Duration, action: Action) {
        let sequence = self.next_sequence();
        self.timers.push(Timer {
            due: self.now.saturating_add(delay),
            sequence,
            action,
        });
    }

    /// Starts a tween at the current time.
    pub(crate) fn animate(&mut self, mut tween: Tween) {
        tween.start = self.now;
        tween.sequence = self.next_sequence();
        self.tweens.push(tween);
    }

    /// Takes the earliest timer or tween end due no later than `until`.
    ///
    /// The clock moves to the exact time of the occurrence, so work resumed
    /// from it schedules relative to that instant rather than to the end of
    /// the frame. Returns `None` once nothing is due before `until`.
    pub(crate) fn next_event(&mut self, until: Duration) -> Option<Fired> {
        let timer = self
            .timers
            .iter()
            .enumerate()
            .min_by_key(|(_, timer)| (timer.due, timer.sequence))
            .map(|(index, timer)| (timer.due, timer.sequence, index));
        let tween = self
            .tweens
            .iter()
            .enumerate()
            .min_by_key(|(_, tween)| (tween.end(), tween.sequence))
            .map(|(index, tween)| (tween.end(), tween.sequence, index));

        let take_timer = match (timer, tween) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((due, seq, _)), Some((end, tween_seq, _))) => (due, seq) < (end, tween_seq),
        };

        if take_timer {
            let (due, _, index) = timer?;
            if due > until {
                return None;
            }
            self.now = self.now.max(due);
            let timer = self.timers.remove(index);
            Some(Fired::Timer(timer.action))
        } else {
            let (end, _, index) = tween?;
            if end > until {
                return None;
            }
            self.now = self.now.max(end);
            let tween = self.tweens.remove(index);
            Some(Fired::Tween {
                last: Sample {
                    channel: tween.channel,
                    value: tween.final_value(),
                },
                then: tween.on_complete,
            })
        }
    }

    /// Moves the clock to `until` once every occurrence before it fired.
    pub(crate) fn finish(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Current value of every running tween, in start order.
    pub(crate) fn samples(&self) -> Vec<Sample> {
        self.tweens
            .iter()
            .map(|tween| Sample {
                channel: tween.channel,
                value: tween.sample_at(self.now),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reel() -> ReelId {
        ReelId::new(0)
    }

    /// Advances the clock by `dt`, collecting everything that fired.
    fn advance(timeline: &mut Timeline, dt: Duration) -> Vec<Fired> {
        let until = timeline.now() + dt;
        let mut fired = Vec::new();
        while let Some(next) = timeline.next_event(until) {
            fired.push(next);
        }
        timeline.finish(until);
        fired
    }

    #[test]
    fn timers_fire_in_due_then_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::from_millis(20), Action::StartReel(ReelId::new(2)));
        timeline.schedule(Duration::from_millis(10), Action::StartReel(ReelId::new(1)));
        timeline.schedule(Duration::from_millis(10), Action::StartReel(ReelId::new(3)));

        assert!(advance(&mut timeline, Duration::from_millis(5)).is_empty());
        assert_eq!(
            advance(&mut timeline, Duration::from_millis(20)),
            vec![
                Fired::Timer(Action::StartReel(ReelId::new(1))),
                Fired::Timer(Action::StartReel(ReelId::new(3))),
                Fired::Timer(Action::StartReel(ReelId::new(2))),
            ]
        );
        assert_eq!(timeline.pending(), 0);
        assert_eq!(timeline.now(), Duration::from_millis(25));
    }

    #[test]
    fn zero_delay_timer_is_due_immediately() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::ZERO, Action::DropReel(reel()));
        assert_eq!(
            timeline.next_event(timeline.now()),
            Some(Fired::Timer(Action::DropReel(reel())))
        );
    }

    #[test]
    fn clock_stops_at_each_occurrence() {
        let mut timeline = Timeline::new();
        timeline.schedule(Duration::from_millis(30), Action::DropReel(reel()));

        let fired = timeline.next_event(Duration::from_millis(100));
        assert_eq!(fired, Some(Fired::Timer(Action::DropReel(reel()))));
        assert_eq!(timeline.now(), Duration::from_millis(30));

        // Work resumed at 30 ms schedules from there, not from the frame end.
        timeline.schedule(Duration::from_millis(30), Action::StartReel(reel()));
        let fired = timeline.next_event(Duration::from_millis(100));
        assert_eq!(fired, Some(Fired::Timer(Action::StartReel(reel()))));
        assert_eq!(timeline.now(), Duration::from_millis(60));

        assert_eq!(timeline.next_event(Duration::from_millis(100)), None);
        timeline.finish(Duration::from_millis(100));
        assert_eq!(timeline.now(), Duration::from_millis(100));
    }

    #[test]
    fn timer_and_tween_end_at_same_instant_keep_registration_order() {
        let mut timeline = Timeline::new();
        let channel = Channel::ReelOffset(reel());
        let done = Action::Reel(reel(), ReelAction::EaseInFinished);
        timeline.animate(Tween::new(channel, 0.0, 1.0, Duration::from_millis(10)).then(done));
        timeline.schedule(Duration::from_millis(10), Action::DropReel(reel()));

        let fired = advance(&mut timeline, Duration::from_millis(10));
        assert_eq!(
            fired,
            vec![
                Fired::Tween {
                    last: Sample {
                        channel,
                        value: 1.0
                    },
                    then: Some(done),
                },
                Fired::Timer(Action::DropReel(reel())),
            ]
        );
    }

    #[test]
    fn tween_reports_completion_once_with_exact_final_value() {
        let mut timeline = Timeline::new();
        let channel = Channel::ReelOffset(reel());
        let done = Action::Reel(reel(), ReelAction::BackoutFinished);
        timeline.animate(
            Tween::new(channel, 33.3, 100.0, Duration::from_millis(100))
                .easing(Easing::BackOut)
                .then(done),
        );

        assert!(advance(&mut timeline, Duration::from_millis(60)).is_empty());
        let samples = timeline.samples();
        assert!(samples[0].value > 100.0, "back-out overshoots");

        let fired = advance(&mut timeline, Duration::from_millis(60));
        assert_eq!(
            fired,
            vec![Fired::Tween {
                last: Sample {
                    channel,
                    value: 100.0
                },
                then: Some(done),
            }]
        );
        assert!(timeline.samples().is_empty());

        assert!(advance(&mut timeline, Duration::from_millis(60)).is_empty());
    }

    #[test]
    fn yoyo_returns_to_start_after_even_legs() {
        let mut timeline = Timeline::new();
        let channel = Channel::SlotAlpha(reel(), 0);
        timeline.animate(Tween::new(channel, 1.0, 0.65, Duration::from_millis(250)).yoyo(4));

        // End of the first leg: the pulse sits at its peak.
        let _ = advance(&mut timeline, Duration::from_millis(250));
        assert_relative_eq!(timeline.samples()[0].value, 0.65, epsilon = 1e-4);
        let _ = advance(&mut timeline, Duration::from_millis(125));
        assert_relative_eq!(timeline.samples()[0].value, 0.825, epsilon = 1e-4);

        let fired = advance(&mut timeline, Duration::from_millis(1_000));
        assert_eq!(
            fired,
            vec![Fired::Tween {
                last: Sample { channel, value: 1.0 },
                then: None,
            }]
        );
    }

    #[test]
    fn delayed_tween_holds_start_value() {
        let mut timeline = Timeline::new();
        let channel = Channel::SlotMotion(reel(), 1);
        timeline.animate(
            Tween::new(channel, -400.0, 0.0, Duration::from_millis(100))
                .delay(Duration::from_millis(50)),
        );

        let _ = advance(&mut timeline, Duration::from_millis(40));
        assert_eq!(timeline.samples()[0].value, -400.0);
        let _ = advance(&mut timeline, Duration::from_millis(60));
        assert_relative_eq!(timeline.samples()[0].value, -320.0, epsilon = 1e-3);
    }
}
