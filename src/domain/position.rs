//! Spread position state machine and leg weights.
//!
//! The position at t depends on the position at t-1 and the z-score at t, so
//! the series is produced by a single ordered scan carrying one state value.

use crate::domain::error::PairsError;
use std::fmt;

/// Fraction of capital allocated to each leg while a spread position is open.
pub const LEG_WEIGHT: f64 = 0.5;

pub const DEFAULT_ENTRY_THRESHOLD: f64 = 1.5;
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PositionState {
    #[default]
    Flat,
    /// Long the first ticker, short the second.
    LongSpread,
    /// Short the first ticker, long the second.
    ShortSpread,
}

impl PositionState {
    /// +1 long spread, -1 short spread, 0 flat.
    pub fn direction(self) -> i8 {
        match self {
            PositionState::Flat => 0,
            PositionState::LongSpread => 1,
            PositionState::ShortSpread => -1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == PositionState::Flat
    }

    pub fn weights(self) -> PairWeight {
        let dir = f64::from(self.direction());
        PairWeight {
            first: dir * LEG_WEIGHT,
            second: -dir * LEG_WEIGHT,
        }
    }

    /// Next state given the current one and the z-score observed now.
    ///
    /// Comparisons are strict: entry needs `|z| > entry` and exit needs
    /// `|z| < exit`, so `|z| == exit` keeps the position open.
    pub fn step(self, z: f64, thresholds: &Thresholds) -> PositionState {
        match self {
            PositionState::Flat => {
                if z > thresholds.entry {
                    PositionState::ShortSpread
                } else if z < -thresholds.entry {
                    PositionState::LongSpread
                } else {
                    PositionState::Flat
                }
            }
            PositionState::LongSpread | PositionState::ShortSpread => {
                if z.abs() < thresholds.exit {
                    PositionState::Flat
                } else {
                    self
                }
            }
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PositionState::Flat => "flat",
            PositionState::LongSpread => "long spread",
            PositionState::ShortSpread => "short spread",
        };
        f.write_str(label)
    }
}

/// Exposure on (first ticker, second ticker) for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PairWeight {
    pub first: f64,
    pub second: f64,
}

impl PairWeight {
    pub fn gross(&self) -> f64 {
        self.first.abs() + self.second.abs()
    }

    pub fn net(&self) -> f64 {
        self.first + self.second
    }

    /// Sum of absolute weight changes from `prev` to `self`.
    pub fn turnover_from(&self, prev: &PairWeight) -> f64 {
        (self.first - prev.first).abs() + (self.second - prev.second).abs()
    }
}

/// Entry/exit bands on the absolute z-score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    entry: f64,
    exit: f64,
}

impl Thresholds {
    /// Requires `entry > 0` and `0 <= exit < entry`.
    pub fn new(entry: f64, exit: f64) -> Result<Self, PairsError> {
        if !(entry.is_finite() && entry > 0.0) {
            return Err(PairsError::invalid(
                "signal",
                "entry_threshold",
                "entry_threshold must be positive",
            ));
        }
        if !(exit.is_finite() && exit >= 0.0 && exit < entry) {
            return Err(PairsError::invalid(
                "signal",
                "exit_threshold",
                "exit_threshold must satisfy 0 <= exit < entry",
            ));
        }
        Ok(Self { entry, exit })
    }

    pub fn entry(&self) -> f64 {
        self.entry
    }

    pub fn exit(&self) -> f64 {
        self.exit
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY_THRESHOLD,
            exit: DEFAULT_EXIT_THRESHOLD,
        }
    }
}

/// Scan z-scores in time order into a position per timestamp.
///
/// A missing z-score outputs `Flat` for that row but leaves the carried state
/// alone, so an open position resumes on the next defined z-score.
pub fn generate_positions(zscore: &[Option<f64>], thresholds: &Thresholds) -> Vec<PositionState> {
    let mut state = PositionState::Flat;
    let mut positions = Vec::with_capacity(zscore.len());

    for z in zscore {
        match z {
            None => positions.push(PositionState::Flat),
            Some(z) => {
                state = state.step(*z, thresholds);
                positions.push(state);
            }
        }
    }

    positions
}

pub fn position_weights(positions: &[PositionState]) -> Vec<PairWeight> {
    positions.iter().map(|p| p.weights()).collect()
}

/// Number of timestamps with an open spread position.
pub fn active_periods(positions: &[PositionState]) -> usize {
    positions.iter().filter(|p| !p.is_flat()).count()
}
