//! Enumeration types for the climate club.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Floor decisions
// ---------------------------------------------------------------------------

/// A member's preference for the price floor this round.
///
/// Variant order is the declaration order used by the default tie-break:
/// hold, then raise, then lower.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum FloorDecision {
    /// Keep the floor where it is.
    #[default]
    Hold,
    /// Raise the floor by one step.
    Raise,
    /// Lower the floor by one step.
    Lower,
}

impl FloorDecision {
    /// All decisions in declaration order.
    pub const ALL: [Self; 3] = [Self::Hold, Self::Raise, Self::Lower];

    /// The lowercase wire label of this decision.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Raise => "raise",
            Self::Lower => "lower",
        }
    }

    /// Whether this decision would move the floor.
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Hold)
    }

    /// Parse a wire label (case-insensitive, surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hold" => Some(Self::Hold),
            "raise" => Some(Self::Raise),
            "lower" => Some(Self::Lower),
            _ => None,
        }
    }
}

impl core::fmt::Display for FloorDecision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Coalitions
// ---------------------------------------------------------------------------

/// The kind of cooperative arrangement a coalition record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum CoalitionType {
    /// Shared monitoring, reporting and verification infrastructure.
    Mrv,
    /// A sector research and development surge.
    Rnd,
}

// ---------------------------------------------------------------------------
// Event stat operators
// ---------------------------------------------------------------------------

/// How a `stat` event operation combines its value with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatOperator {
    /// Replace the current value.
    Set,
    /// Add to the current value.
    Add,
    /// Multiply the current value.
    Multiply,
}

impl StatOperator {
    /// Parse an operator label. Unrecognized labels fall back to [`Self::Add`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "set" => Self::Set,
            "multiply" | "mul" | "times" => Self::Multiply,
            _ => Self::Add,
        }
    }

    /// Combine `current` with `value` under this operator.
    pub const fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            Self::Set => value,
            Self::Add => current + value,
            Self::Multiply => current * value,
        }
    }
}
