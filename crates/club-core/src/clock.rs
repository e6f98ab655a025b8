//! Game calendar: turns, quarters, years, and era phases.
//!
//! The linear turn counter is the source of truth. Year, quarter, phase, and
//! the annual-anchor flag are always derived from it:
//!
//! - `year = start_year + (turn - 1) / 4`
//! - `quarter = (turn - 1) % 4 + 1`
//!
//! All derivations use checked or saturating arithmetic. Conversions from a
//! turn are total; conversions from an explicit (year, quarter) pair are
//! validated and return [`ClockError`] when out of range.

use club_types::GameState;

use crate::config::GameConfig;

/// Number of quarters in one simulated year.
pub const QUARTERS_PER_YEAR: u8 = 4;

/// Errors from period/turn conversions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClockError {
    /// Quarter outside 1-4.
    #[error("invalid quarter {quarter}: must be between 1 and 4")]
    InvalidQuarter {
        /// The offending quarter.
        quarter: u8,
    },

    /// Year before the first year of the game.
    #[error("year {year} is before the start year {start_year}")]
    YearBeforeStart {
        /// The offending year.
        year: u32,
        /// First year of the game.
        start_year: u32,
    },

    /// Turn counter is zero or inconsistent with the period.
    #[error("invalid turn {turn}: {reason}")]
    InvalidTurn {
        /// The offending turn.
        turn: u32,
        /// What is inconsistent.
        reason: String,
    },

    /// Arithmetic overflow while converting.
    #[error("turn counter overflow")]
    Overflow,
}

/// A (year, quarter) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    /// Calendar year.
    pub year: u32,
    /// Quarter, 1-4.
    pub quarter: u8,
}

impl Period {
    /// The period immediately after this one.
    pub const fn next(self) -> Self {
        if self.quarter >= QUARTERS_PER_YEAR {
            Self {
                year: self.year.saturating_add(1),
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter.saturating_add(1),
            }
        }
    }

    /// Whether this is the annual anchor quarter (Q4).
    pub const fn is_annual_anchor(self) -> bool {
        self.quarter == QUARTERS_PER_YEAR
    }
}

/// Era phase metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    /// Phase number, 1-3.
    pub id: u8,
    /// First year of the phase.
    pub start_year: u32,
    /// Last year of the phase.
    pub end_year: u32,
    /// Display label.
    pub label: &'static str,
}

/// The three era phases.
pub const PHASES: [PhaseInfo; 3] = [
    PhaseInfo {
        id: 1,
        start_year: 2025,
        end_year: 2032,
        label: "Early Phase",
    },
    PhaseInfo {
        id: 2,
        start_year: 2033,
        end_year: 2041,
        label: "Middle Phase",
    },
    PhaseInfo {
        id: 3,
        start_year: 2042,
        end_year: 2050,
        label: "Late Phase",
    },
];

/// Phase number for `year`: 1 through 2032, 2 through 2041, 3 after.
pub const fn phase(year: u32) -> u8 {
    if year <= PHASES[0].end_year {
        1
    } else if year <= PHASES[1].end_year {
        2
    } else {
        3
    }
}

/// Phase metadata for `year`.
pub fn phase_info(year: u32) -> PhaseInfo {
    let id = phase(year);
    PHASES
        .iter()
        .copied()
        .find(|p| p.id == id)
        .unwrap_or(PHASES[0])
}

/// `"2025 Q1"` style label.
pub fn turn_label(period: Period) -> String {
    format!("{} Q{}", period.year, period.quarter)
}

/// `"Q1 (Jan-Mar)"` style label.
pub fn quarter_label(quarter: u8) -> String {
    match quarter {
        1 => "Q1 (Jan-Mar)".to_owned(),
        2 => "Q2 (Apr-Jun)".to_owned(),
        3 => "Q3 (Jul-Sep)".to_owned(),
        4 => "Q4 (Oct-Dec)".to_owned(),
        other => format!("Q{other}"),
    }
}

/// Calendar bounded by the configured start and end years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    start_year: u32,
    end_year: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(2025, 2050)
    }
}

impl Calendar {
    /// Create a calendar. An end year before the start year is raised to it.
    pub const fn new(start_year: u32, end_year: u32) -> Self {
        let end_year = if end_year < start_year {
            start_year
        } else {
            end_year
        };
        Self {
            start_year,
            end_year,
        }
    }

    /// Build from the `game` config section.
    pub const fn from_config(config: &GameConfig) -> Self {
        Self::new(config.start_year, config.end_year)
    }

    /// First year of the game.
    pub const fn start_year(&self) -> u32 {
        self.start_year
    }

    /// Last playable year.
    pub const fn end_year(&self) -> u32 {
        self.end_year
    }

    /// Map a turn to its period. Turn 0 is treated as turn 1.
    pub fn turn_to_period(&self, turn: u32) -> Period {
        let index = turn.saturating_sub(1);
        let per_year = u32::from(QUARTERS_PER_YEAR);
        let years = index.checked_div(per_year).unwrap_or(0);
        let offset = index.checked_rem(per_year).unwrap_or(0);
        Period {
            year: self.start_year.saturating_add(years),
            quarter: u8::try_from(offset).unwrap_or(0).saturating_add(1),
        }
    }

    /// Map a period back to its turn.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidQuarter`] or
    /// [`ClockError::YearBeforeStart`] for out-of-range input, and
    /// [`ClockError::Overflow`] if the turn does not fit in a `u32`.
    pub fn period_to_turn(&self, period: Period) -> Result<u32, ClockError> {
        if !(1..=QUARTERS_PER_YEAR).contains(&period.quarter) {
            return Err(ClockError::InvalidQuarter {
                quarter: period.quarter,
            });
        }
        let years = period
            .year
            .checked_sub(self.start_year)
            .ok_or(ClockError::YearBeforeStart {
                year: period.year,
                start_year: self.start_year,
            })?;
        years
            .checked_mul(u32::from(QUARTERS_PER_YEAR))
            .and_then(|q| q.checked_add(u32::from(period.quarter)))
            .ok_or(ClockError::Overflow)
    }

    /// Whether play has run past the end year.
    pub const fn is_complete(&self, year: u32) -> bool {
        year > self.end_year
    }

    /// Fraction of the game elapsed at `period`, in `[0, 1]`.
    pub fn progress(&self, period: Period) -> f64 {
        let years = self.end_year.saturating_sub(self.start_year).saturating_add(1);
        let total = f64::from(years.saturating_mul(u32::from(QUARTERS_PER_YEAR)));
        let elapsed = self
            .period_to_turn(period)
            .map_or(0.0, |turn| f64::from(turn.saturating_sub(1)));
        if total <= 0.0 {
            return 0.0;
        }
        (elapsed / total).clamp(0.0, 1.0)
    }

    /// Check that a (year, quarter, turn) triple is consistent.
    ///
    /// # Errors
    ///
    /// Returns a [`ClockError`] describing the first inconsistency found.
    pub fn validate_period(&self, period: Period, turn: u32) -> Result<(), ClockError> {
        if turn == 0 {
            return Err(ClockError::InvalidTurn {
                turn,
                reason: "turns start at 1".to_owned(),
            });
        }
        if period.year > self.end_year.saturating_add(1) {
            return Err(ClockError::InvalidTurn {
                turn,
                reason: format!("year {} is past the end of the game", period.year),
            });
        }
        let expected = self.period_to_turn(period)?;
        if expected != turn {
            return Err(ClockError::InvalidTurn {
                turn,
                reason: format!("{} corresponds to turn {expected}", turn_label(period)),
            });
        }
        Ok(())
    }

    /// Rewrite the derived time fields of `state` from its turn counter.
    ///
    /// Used on load so documents that carry only `turn` are completed.
    pub fn sync_period(&self, state: &mut GameState) {
        if state.turn == 0 {
            state.turn = 1;
        }
        let period = self.turn_to_period(state.turn);
        state.year = period.year;
        state.quarter = period.quarter;
        state.phase = phase(period.year);
        state.is_annual_anchor = period.is_annual_anchor();
    }

    /// Move `state` to the turn after `resolved_turn`.
    pub fn advance(&self, state: &mut GameState, resolved_turn: u32) {
        state.turn = resolved_turn.saturating_add(1);
        self.sync_period(state);
    }
}
