//! Tunable game parameters.
//!
//! [`GameConfig::default`] is the reference configuration. The CLI can load
//! a JSON file instead; every field is optional there and falls back to the
//! reference value.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::puzzle::Tier;

/// Per-tier generation and timer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    /// Smallest accepted board, in fillable cells.
    pub min_cells: usize,
    /// Largest accepted board, in fillable cells.
    pub max_cells: usize,
    /// Turn budget a freshly generated puzzle starts with.
    pub max_turns: u32,
    /// Number of puzzles kept active at all times.
    pub active: usize,
}

/// Optional rules layered on top of the baseline game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSet {
    /// Maximum number of pieces in hand; additions beyond it are rejected.
    pub hand_limit: Option<usize>,
    /// Turns a piece survives in hand before it disappears.
    pub piece_lifetime: Option<u32>,
    /// Expired puzzles keep their placed pieces instead of refunding them.
    pub forfeit_on_expiry: bool,
    /// Tier-2 points are a par value banded by the remaining timer.
    pub par_scoring: bool,
    /// Chance that a tier-2 puzzle mandates one exact placement.
    pub required_piece_chance: f64,
    /// Undo also winds the shared clock back by one turn.
    pub undo_rewinds_clock: bool,
}

impl RuleSet {
    pub fn baseline() -> Self {
        Self {
            hand_limit: None,
            piece_lifetime: None,
            forfeit_on_expiry: false,
            par_scoring: false,
            required_piece_chance: 0.0,
            undo_rewinds_clock: true,
        }
    }

    pub fn advanced() -> Self {
        Self {
            hand_limit: Some(12),
            piece_lifetime: Some(15),
            forfeit_on_expiry: true,
            par_scoring: true,
            required_piece_chance: 0.35,
            undo_rewinds_clock: false,
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Full game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Upper bound on the random bounding box used while growing a board.
    pub dimension_limit: usize,
    /// Generation attempts before the seen-shape memory is reset.
    pub max_attempts: usize,
    /// Seen canonical keys kept in a save record.
    pub seen_key_cap: usize,
    /// Puzzle history entries kept in a save record.
    pub history_cap: usize,
    pub tier1: TierConfig,
    pub tier2: TierConfig,
    pub rules: RuleSet,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            dimension_limit: 6,
            max_attempts: 500,
            seen_key_cap: 1000,
            history_cap: 200,
            tier1: TierConfig {
                min_cells: 2,
                max_cells: 5,
                max_turns: 12,
                active: 4,
            },
            tier2: TierConfig {
                min_cells: 6,
                max_cells: 14,
                max_turns: 20,
                active: 4,
            },
            rules: RuleSet::baseline(),
        }
    }
}

impl GameConfig {
    /// Reference configuration with the advanced rules switched on.
    pub fn advanced() -> Self {
        Self {
            rules: RuleSet::advanced(),
            ..Self::default()
        }
    }

    pub fn tier(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::One => &self.tier1,
            Tier::Two => &self.tier2,
        }
    }

    /// Loads and validates a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the generator or turn clock cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension_limit < 2 {
            return Err(ConfigError::Invalid("dimensionLimit must be at least 2".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("maxAttempts must be positive".into()));
        }
        for tier in [Tier::One, Tier::Two] {
            let cfg = self.tier(tier);
            if cfg.min_cells == 0 || cfg.min_cells > cfg.max_cells {
                return Err(ConfigError::Invalid(format!(
                    "tier {} cell range [{}, {}] is empty",
                    tier.number(),
                    cfg.min_cells,
                    cfg.max_cells
                )));
            }
            if cfg.max_cells > self.dimension_limit * self.dimension_limit {
                return Err(ConfigError::Invalid(format!(
                    "tier {} maxCells {} cannot fit a {}x{} board",
                    tier.number(),
                    cfg.max_cells,
                    self.dimension_limit,
                    self.dimension_limit
                )));
            }
            if cfg.max_turns == 0 || cfg.active == 0 {
                return Err(ConfigError::Invalid(format!(
                    "tier {} needs positive maxTurns and active",
                    tier.number()
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.rules.required_piece_chance) {
            return Err(ConfigError::Invalid(
                "requiredPieceChance must be within [0, 1]".into(),
            ));
        }
        if self.rules.hand_limit == Some(0) {
            return Err(ConfigError::Invalid("handLimit must be positive".into()));
        }
        Ok(())
    }
}
