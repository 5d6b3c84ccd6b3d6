#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Result sources standing in for a game server.
//!
//! [`MockResults`] draws uniformly from a fixed set of grids using a seeded
//! generator, so a session replays identically for the same seed.
//! [`ScriptedResults`] replays a JSON list of grids in order and then runs dry.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slot_reels_core::{ResultGrid, ResultSource};
use thiserror::Error;

const MOCK_GRIDS: [([[u32; 4]; 6], &[u32]); 5] = [
    (
        [
            [1, 1, 1, 1],
            [1, 1, 1, 1],
            [1, 1, 1, 1],
            [1, 1, 1, 1],
            [1, 1, 1, 1],
            [1, 1, 1, 1],
        ],
        &[1, 2, 3, 4],
    ),
    (
        [
            [1, 2, 3, 1],
            [1, 2, 3, 2],
            [1, 1, 3, 3],
            [1, 2, 3, 1],
            [1, 2, 3, 2],
            [1, 3, 3, 3],
        ],
        &[1, 3],
    ),
    (
        [
            [1, 2, 2, 1],
            [2, 2, 3, 2],
            [1, 3, 3, 3],
            [1, 2, 3, 1],
            [1, 2, 1, 2],
            [1, 2, 3, 3],
        ],
        &[],
    ),
    (
        [
            [1, 1, 3, 2],
            [1, 2, 3, 2],
            [1, 3, 3, 2],
            [1, 1, 3, 2],
            [1, 2, 3, 2],
            [1, 3, 3, 2],
        ],
        &[1, 3, 4],
    ),
    (
        [
            [1, 3, 1, 2],
            [2, 3, 1, 1],
            [3, 3, 1, 3],
            [1, 2, 1, 3],
            [2, 3, 1, 2],
            [3, 3, 1, 3],
        ],
        &[3],
    ),
];

/// Built-in grids for six reels of four rows using symbols 1 to 3.
#[must_use]
pub fn default_mock_grids() -> Vec<ResultGrid> {
    MOCK_GRIDS
        .iter()
        .map(|(columns, lines)| {
            let columns: Vec<&[u32]> = columns.iter().map(|column| &column[..]).collect();
            ResultGrid::from_raw(&columns, lines)
        })
        .collect()
}

/// Draws results uniformly from a fixed set of grids.
#[derive(Clone, Debug)]
pub struct MockResults {
    grids: Vec<ResultGrid>,
    rng: ChaCha8Rng,
}

impl MockResults {
    /// Creates a source over the built-in grids.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_grids(default_mock_grids(), seed)
    }

    /// Creates a source over caller-provided grids.
    #[must_use]
    pub fn with_grids(grids: Vec<ResultGrid>, seed: u64) -> Self {
        Self {
            grids,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Grids the source draws from.
    #[must_use]
    pub fn grids(&self) -> &[ResultGrid] {
        &self.grids
    }
}

impl ResultSource for MockResults {
    fn next_result(&mut self) -> Option<ResultGrid> {
        if self.grids.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.grids.len());
        self.grids.get(index).cloned()
    }
}

/// Reasons a result script cannot be loaded.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script is not a JSON array of result grids.
    #[error("invalid result script: {0}")]
    Parse(#[from] serde_json::Error),
    /// The script lists no grids.
    #[error("result script is empty")]
    Empty,
}

/// Replays a fixed list of grids in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedResults {
    grids: VecDeque<ResultGrid>,
}

impl ScriptedResults {
    /// Creates a source replaying `grids` in order.
    #[must_use]
    pub fn new(grids: impl IntoIterator<Item = ResultGrid>) -> Self {
        Self {
            grids: grids.into_iter().collect(),
        }
    }

    /// Parses a JSON array of grids such as
    /// `[{"reel_results": [[1, 2], [3, 1]], "win_lines": [2]}]`.
    pub fn from_json(source: &str) -> Result<Self, ScriptError> {
        let grids: Vec<ResultGrid> = serde_json::from_str(source)?;
        if grids.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self::new(grids))
    }

    /// Grids that have not been handed out yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.grids.len()
    }
}

impl ResultSource for ScriptedResults {
    fn next_result(&mut self) -> Option<ResultGrid> {
        self.grids.pop_front()
    }
}
