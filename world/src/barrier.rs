/// Counts arrivals of a known number of participants.
///
/// The completion value is handed out exactly once per round: when the last
/// participant arrives the counter resets so the barrier can be reused by the
/// next cycle.
#[derive(Clone, Debug)]
pub(crate) struct Barrier<T> {
    expected: usize,
    arrived: usize,
    on_complete: T,
}

impl<T: Clone> Barrier<T> {
    pub(crate) fn new(expected: usize, on_complete: T) -> Self {
        Self {
            expected,
            arrived: 0,
            on_complete,
        }
    }

    /// Records one arrival and yields the completion value once all arrived.
    pub(crate) fn arrive(&mut self) -> Option<T> {
        self.arrived += 1;
        if self.arrived >= self.expected {
            self.arrived = 0;
            Some(self.on_complete.clone())
        } else {
            None
        }
    }

    /// Arrivals recorded in the current round.
    pub(crate) fn arrived(&self) -> usize {
        self.arrived
    }

    pub(crate) fn reset(&mut self) {
        self.arrived = 0;
    }
}
