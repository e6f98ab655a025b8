//! Turn submission types exchanged between clients and the engine.
//!
//! A client sends a [`TurnChoice`]; the engine stamps it with the country and
//! time and stores it as a [`TurnSubmission`] until the turn resolves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::FloorDecision;
use crate::ids::CountryCode;

/// A member's recorded choice for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TurnSubmission {
    /// Submitting country.
    pub country: CountryCode,
    /// Turn the submission belongs to.
    pub turn: u32,
    /// The project this member wants funded, if any.
    #[serde(default)]
    pub chosen_project_id: Option<String>,
    /// The member's floor ballot.
    #[serde(default)]
    pub floor_decision: FloorDecision,
    /// Member-proposed reward multipliers keyed by project id.
    #[serde(default)]
    pub r_adjustments: BTreeMap<String, f64>,
    /// When the submission was received.
    pub submitted_at: DateTime<Utc>,
}

/// Client payload for a turn submission.
///
/// Missing fields take neutral defaults: no project, a `hold` ballot, and no
/// reward adjustments. An absent `turn` means "the current turn".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct TurnChoice {
    /// Turn the client believes is current.
    pub turn: Option<u32>,
    /// Preferred project id.
    pub chosen_project_id: Option<String>,
    /// Floor ballot.
    pub floor_decision: Option<FloorDecision>,
    /// Proposed reward multipliers keyed by project id.
    pub r_adjustments: BTreeMap<String, f64>,
}

/// Market indicators reported by the resolving client.
///
/// Any value left out falls back to the server's own pre-update value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct ObservedIndicators {
    /// Observed market sentiment.
    pub sentiment: Option<f64>,
    /// Observed private share of demand.
    pub private_share: Option<f64>,
    /// Observed inflation.
    pub inflation: Option<f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn empty_choice_parses_to_defaults() {
        let choice: TurnChoice = serde_json::from_str("{}").unwrap();
        assert!(choice.turn.is_none());
        assert!(choice.chosen_project_id.is_none());
        assert!(choice.floor_decision.is_none());
        assert!(choice.r_adjustments.is_empty());
    }

    #[test]
    fn choice_reads_camel_case() {
        let json = r#"{"turn": 3, "chosenProjectId": "dac", "floorDecision": "raise", "rAdjustments": {"dac": 1.2}}"#;
        let choice: TurnChoice = serde_json::from_str(json).unwrap();
        assert_eq!(choice.turn, Some(3));
        assert_eq!(choice.chosen_project_id.as_deref(), Some("dac"));
        assert_eq!(choice.floor_decision, Some(FloorDecision::Raise));
        assert!((choice.r_adjustments["dac"] - 1.2).abs() < f64::EPSILON);
    }
}
