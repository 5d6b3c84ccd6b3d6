#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Game controller system that drives spin cycles from area events.
//!
//! The controller owns the spin and stop buttons. Once every reel started it
//! arms an auto-stop countdown; when the countdown elapses or the stop button is
//! pressed it draws the next result from its [`ResultSource`] and asks the area
//! to stop on it. Win lines are revealed as soon as every reel settled, and the
//! spin button is re-enabled once they have all been shown.

use std::time::Duration;

use slot_reels_core::{Command, Event, GridRow, ResultSource};
use tracing::{debug, info, warn};

const DEFAULT_AUTO_STOP: Duration = Duration::from_millis(2_000);

/// Configuration parameters required to construct the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    auto_stop: Duration,
}

impl Config {
    /// Creates a configuration with the provided auto-stop timeout.
    #[must_use]
    pub const fn new(auto_stop: Duration) -> Self {
        Self { auto_stop }
    }

    /// Time reels spin before a result is injected automatically.
    #[must_use]
    pub const fn auto_stop(&self) -> Duration {
        self.auto_stop
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_STOP)
    }
}

/// Stage of the spin cycle the controller is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the spin button.
    Ready,
    /// Spin requested; waiting for the last reel to start.
    Starting,
    /// Every reel started; the stop button and auto-stop are armed.
    Spinning,
    /// A stop has been requested; waiting for every reel to settle.
    Stopping,
    /// Win lines are being revealed.
    Revealing,
}

/// Pure system translating area events into spin-cycle commands.
#[derive(Debug)]
pub struct Controller<S> {
    auto_stop: Duration,
    source: S,
    phase: Phase,
    countdown: Option<Duration>,
    pending_lines: Option<Vec<GridRow>>,
    completed_cycles: u64,
}

impl<S: ResultSource> Controller<S> {
    /// Creates a controller drawing results from `source`.
    #[must_use]
    pub fn new(config: Config, source: S) -> Self {
        Self {
            auto_stop: config.auto_stop,
            source,
            phase: Phase::Ready,
            countdown: None,
            pending_lines: None,
            completed_cycles: 0,
        }
    }

    /// Current stage of the spin cycle.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Reports whether the spin button accepts presses.
    #[must_use]
    pub fn spin_enabled(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Reports whether the stop button accepts presses.
    #[must_use]
    pub fn stop_enabled(&self) -> bool {
        self.phase == Phase::Spinning
    }

    /// Number of spin cycles that ran to completion.
    #[must_use]
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    /// Handles a spin button press. Returns `false` when the button is disabled.
    pub fn press_spin(&mut self, out: &mut Vec<Command>) -> bool {
        if !self.spin_enabled() {
            debug!(phase = ?self.phase, "spin press ignored");
            return false;
        }
        self.phase = Phase::Starting;
        out.push(Command::StartSpinning);
        true
    }

    /// Handles a stop button press. Returns `false` when the button is disabled.
    pub fn press_stop(&mut self, out: &mut Vec<Command>) -> bool {
        if !self.stop_enabled() {
            debug!(phase = ?self.phase, "stop press ignored");
            return false;
        }
        self.request_stop(out);
        true
    }

    /// Consumes world events and emits the commands that advance the cycle.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::AllStartedSpinning if self.phase == Phase::Starting => {
                    self.phase = Phase::Spinning;
                    self.countdown = Some(self.auto_stop);
                }
                Event::TimeAdvanced { dt } if self.phase == Phase::Spinning => {
                    let Some(remaining) = self.countdown else {
                        continue;
                    };
                    let remaining = remaining.saturating_sub(*dt);
                    if remaining.is_zero() {
                        debug!("auto-stop elapsed");
                        self.request_stop(out);
                    } else {
                        self.countdown = Some(remaining);
                    }
                }
                Event::ResultRejected { reason } if self.phase == Phase::Stopping => {
                    warn!(%reason, "result rejected; stopping without it");
                    self.pending_lines = None;
                    out.push(Command::StopSpinning);
                }
                Event::AllStoppedSpinning if self.phase == Phase::Stopping => {
                    if self.pending_lines.is_none() {
                        self.finish_cycle();
                    }
                }
                Event::AllStoppedWithResult if self.phase == Phase::Stopping => {
                    let lines = self.pending_lines.take().unwrap_or_default();
                    info!(lines = lines.len(), "revealing win lines");
                    self.phase = Phase::Revealing;
                    out.push(Command::ShowWinLines { lines });
                }
                Event::AllWinLinesShown if self.phase == Phase::Revealing => {
                    self.finish_cycle();
                }
                _ => {}
            }
        }
    }

    fn request_stop(&mut self, out: &mut Vec<Command>) {
        self.countdown = None;
        self.phase = Phase::Stopping;
        match self.source.next_result() {
            Some(grid) => {
                self.pending_lines = Some(grid.win_lines().to_vec());
                out.push(Command::StopWithResult { grid });
            }
            None => {
                warn!("result source exhausted; stopping on random symbols");
                self.pending_lines = None;
                out.push(Command::StopSpinning);
            }
        }
    }

    fn finish_cycle(&mut self) {
        self.phase = Phase::Ready;
        self.completed_cycles = self.completed_cycles.saturating_add(1);
        info!(cycles = self.completed_cycles, "spin cycle finished");
    }
}
