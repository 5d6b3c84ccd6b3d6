use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use slot_reels_core::{ReelConfiguration, ReelingMode};
use slot_reels_world::{ImageHandle, TextureSource, SYMBOL_CATEGORY};

/// Settings read from the optional TOML file passed with `--config`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    /// Geometry and timing of the reel area.
    pub(crate) reels: ReelSettings,
    /// Symbol images, in symbol id order.
    pub(crate) assets: AssetSettings,
    /// Controller behaviour.
    pub(crate) game: GameSettings,
}

impl Settings {
    /// Loads settings from `path`, or returns the defaults when no file was given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid settings in {}", path.display()))
    }

    /// Parses settings from TOML text.
    pub(crate) fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse settings")
    }

    /// Builds the reel configuration described by the `[reels]` table.
    pub(crate) fn reel_configuration(&self) -> ReelConfiguration {
        let reels = &self.reels;
        ReelConfiguration::default()
            .with_reel_count(reels.reel_count)
            .with_slots_per_reel(reels.slots_per_reel)
            .with_slot_size(reels.slot_width, reels.slot_height)
            .with_spin_speed(reels.spin_speed)
            .with_stop_delay(Duration::from_millis(reels.stop_delay_ms))
            .with_stop_interval(Duration::from_millis(reels.stop_interval_ms))
            .with_start_interval(Duration::from_millis(reels.start_interval_ms))
            .with_drop_interval(Duration::from_millis(reels.drop_interval_ms))
            .with_win_line_interval(Duration::from_millis(reels.win_line_interval_ms))
            .with_reeling_mode(reels.mode)
    }
}

/// `[reels]` table. Durations are in milliseconds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ReelSettings {
    pub(crate) reel_count: u32,
    pub(crate) slots_per_reel: u32,
    pub(crate) slot_width: f32,
    pub(crate) slot_height: f32,
    pub(crate) spin_speed: f32,
    pub(crate) stop_delay_ms: u64,
    pub(crate) stop_interval_ms: u64,
    pub(crate) start_interval_ms: u64,
    pub(crate) drop_interval_ms: u64,
    pub(crate) win_line_interval_ms: u64,
    pub(crate) mode: ReelingMode,
}

impl Default for ReelSettings {
    fn default() -> Self {
        Self {
            reel_count: 6,
            slots_per_reel: 4,
            slot_width: 133.0,
            slot_height: 100.0,
            spin_speed: 3.0,
            stop_delay_ms: 40,
            stop_interval_ms: 40,
            start_interval_ms: 40,
            drop_interval_ms: 40,
            win_line_interval_ms: 900,
            mode: ReelingMode::Regular,
        }
    }
}

/// `[assets]` table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AssetSettings {
    pub(crate) symbols: Vec<String>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            symbols: vec![
                "cherry.png".to_owned(),
                "plum.jpg".to_owned(),
                "orange.jpg".to_owned(),
            ],
        }
    }
}

impl TextureSource for AssetSettings {
    fn textures(&self, category: &str) -> Option<Vec<ImageHandle>> {
        (category == SYMBOL_CATEGORY)
            .then(|| self.symbols.iter().map(ImageHandle::new).collect())
    }
}

/// `[game]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameSettings {
    pub(crate) auto_stop_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self { auto_stop_ms: 2_000 }
    }
}
