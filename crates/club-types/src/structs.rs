//! Core entity structs for the climate club.
//!
//! Covers club members, standing votes, project offers and upgrades, random
//! events, per-turn history entries, coalition records and the coordination
//! index. Field names serialize in camelCase because these structs make up
//! the JSON state document that clients read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CoalitionType, FloorDecision};
use crate::ids::CountryCode;

// ---------------------------------------------------------------------------
// Members and votes
// ---------------------------------------------------------------------------

/// A country seated in the club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Member {
    /// Unique country code.
    pub country: CountryCode,
    /// When the country joined.
    pub joined_at: DateTime<Utc>,
    /// Normalized voting weight; all member weights sum to the member count.
    #[serde(default = "default_weight")]
    pub gdp_weight: f64,
    /// Looked-up GDP in US dollars (0 when unknown).
    #[serde(default, rename = "gdpUSD")]
    pub gdp_usd: f64,
}

impl Member {
    /// Create a member joining now with a neutral weight.
    pub fn joining(country: CountryCode) -> Self {
        Self {
            country,
            joined_at: Utc::now(),
            gdp_weight: 1.0,
            gdp_usd: 0.0,
        }
    }
}

const fn default_weight() -> f64 {
    1.0
}

/// A member's standing floor preference. Persists across turns until the
/// member overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct VoteEntry {
    /// The voting country.
    pub country: CountryCode,
    /// The preferred floor action.
    pub vote: FloorDecision,
    /// The turn the vote refers to.
    pub turn: u32,
    /// When the vote was last written.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A mitigation project offer.
///
/// Offers are immutable for the round once drawn into the state document;
/// the catalog's persistent record may still be upgraded by events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Unique project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Tonnes of CO2e mitigated if funded (never negative).
    pub co2e_mitigation: f64,
    /// Reward cost in XCR before the reward multiplier.
    pub xcr_bid: f64,
    /// Additional supply the project pushes into the market.
    pub supply_pressure: f64,
    /// Change to market sentiment when funded.
    pub sentiment_effect: f64,
    /// Insurance buffer held against reversal.
    pub insurance_buffer: f64,
    /// Co-benefits description.
    pub co_benefits: String,
    /// Monitoring standard the project reports under.
    pub mrv_standard: String,
}

/// A persistent modification to a catalog project, carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct ProjectUpgrade {
    /// Target project identifier.
    pub project_id: String,
    /// Multiplier on mitigation.
    pub mitigation_multiplier: f64,
    /// Multiplier on supply pressure.
    pub supply_multiplier: f64,
    /// Multiplier on the XCR bid.
    pub xcr_bid_multiplier: f64,
    /// Additive change to the sentiment effect.
    pub sentiment_effect_delta: f64,
    /// Additive change to the insurance buffer.
    pub insurance_buffer_delta: f64,
}

impl Default for ProjectUpgrade {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            mitigation_multiplier: 1.0,
            supply_multiplier: 1.0,
            xcr_bid_multiplier: 1.0,
            sentiment_effect_delta: 0.0,
            insurance_buffer_delta: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Modify one named numeric field of the state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatOperation {
    /// Name of the field to modify (camelCase or `snake_case`).
    #[serde(default)]
    pub target: String,
    /// `set`, `add`, or `multiply`; anything else is treated as `add`.
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Operand.
    #[serde(default)]
    pub value: f64,
}

fn default_operation() -> String {
    String::from("add")
}

/// One operation carried by a random event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum EventOperation {
    /// Modify a numeric field of the state document.
    Stat(StatOperation),
    /// Upgrade a catalog project for all future draws.
    ProjectUpgrade(ProjectUpgrade),
}

/// A random event definition from the event catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct EventDefinition {
    /// Unique event identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Whether the event justifies a floor change inside the cooldown window.
    pub justified: bool,
    /// Operations applied when the event fires.
    pub operations: Vec<EventOperation>,
}

/// Snapshot of the event that fired last turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventSnapshot {
    /// Event identifier.
    pub id: String,
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Whether the event was flagged as justifying a floor change.
    pub justified: bool,
    /// When the event fired.
    pub occurred_at: DateTime<Utc>,
}

impl EventSnapshot {
    /// Capture a snapshot of `event` occurring now.
    pub fn of(event: &EventDefinition) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            justified: event.justified,
            occurred_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One resolved turn, as recorded in the bounded history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HistoryEntry {
    /// The resolved turn.
    pub turn: u32,
    /// Year of the resolved turn.
    pub year: u32,
    /// Quarter of the resolved turn.
    pub quarter: u8,
    /// Title of the event that fired, or `none`.
    pub event: String,
    /// Funded project id, or `none`.
    pub project: String,
    /// Floor after resolution.
    pub floor: f64,
    /// Market price after resolution.
    pub market: f64,
    /// Mitigation funded this turn.
    pub mitigation: f64,
    /// XCR awarded this turn.
    pub xcr_awarded: f64,
    /// Reward multiplier applied this turn.
    pub r_multiplier: f64,
    /// Inflation after resolution.
    pub inflation: f64,
    /// Whether a floor change was rejected by forward guidance.
    pub guidance_broken: bool,
    /// Whether the floor vote cleared the supermajority threshold.
    #[serde(default)]
    pub supermajority_passed: bool,
    /// When the turn was resolved.
    pub time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Coalitions
// ---------------------------------------------------------------------------

/// A coalition record (joint MRV or R&D surge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Coalition {
    /// Record identifier, e.g. `mrv-coalition-2025` or `rnd-dac-4`.
    pub id: String,
    /// Coalition kind.
    #[serde(rename = "type")]
    pub kind: CoalitionType,
    /// Participating countries.
    pub members: Vec<CountryCode>,
    /// Turn the coalition formed.
    pub created_turn: u32,
    /// Whether the coalition is still in force.
    pub active: bool,
    /// Whether the coalition renews itself each period.
    pub auto_renew: bool,
    /// Sector, for R&D surges only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

/// Temporary bonus granted after a supermajority floor vote passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct SupermajorityDividend {
    /// Whether the dividend is currently in force.
    pub active: bool,
    /// Credibility granted at activation.
    pub credibility_boost: f64,
    /// Multiplier on intervention probability (1.0 = no effect).
    pub intervention_multiplier: f64,
    /// Milestone success bonus in percent.
    pub milestone_bonus_pct: f64,
    /// Turns until the dividend expires.
    pub turns_remaining: u32,
    /// Whether the dividend was already active when last re-armed.
    pub was_consecutive: bool,
}

impl Default for SupermajorityDividend {
    fn default() -> Self {
        Self {
            active: false,
            credibility_boost: 0.0,
            intervention_multiplier: 1.0,
            milestone_bonus_pct: 0.0,
            turns_remaining: 0,
            was_consecutive: false,
        }
    }
}

/// A coordinated sector R&D surge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct RndSurge {
    /// Surge identifier, `rnd-<sector>-<turn>`.
    pub id: String,
    /// Target sector (e.g. `dac`, `methane`, `solar`).
    pub sector: String,
    /// Participating countries.
    pub members: Vec<CountryCode>,
    /// Turn the surge started.
    pub start_turn: u32,
    /// Turns until the surge expires.
    pub turns_remaining: u32,
    /// Cost reduction in percent after solo/repeat penalties.
    pub cost_reduction_pct: f64,
    /// Whether an unexpired surge for the same sector existed at launch.
    pub was_repeated: bool,
}

/// Cumulative promised/delivered counters for one country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct ReciprocityEntry {
    /// Total promised.
    pub promised: f64,
    /// Total delivered.
    pub delivered: f64,
}

impl ReciprocityEntry {
    /// Delivered over promised; 1.0 while nothing has been promised.
    pub fn ratio(&self) -> f64 {
        if self.promised == 0.0 {
            1.0
        } else {
            self.delivered / self.promised
        }
    }
}

/// Joint MRV effects on verification and private demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct JointMrvEffects {
    /// Verification lag reduction for channel 1 (direct air capture).
    pub channel1_lag_reduction: f64,
    /// Verification lag reduction for channel 2 (nature-based).
    pub channel2_lag_reduction: f64,
    /// Verification lag reduction for channel 3 (industrial).
    pub channel3_lag_reduction: f64,
    /// Multiplier on fraud probability.
    pub fraud_multiplier: f64,
    /// Additive boost to private demand.
    pub private_demand_boost: f64,
}

// ---------------------------------------------------------------------------
// Coordination index
// ---------------------------------------------------------------------------

/// The four capped components of the coordination index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CoordinationComponents {
    /// Membership component, 0-40.
    pub coalition_size: f64,
    /// Recent supermajority frequency, 0-30.
    pub supermajority_rate: f64,
    /// Joint MRV alignment, 0 or 20.
    pub standards_alignment: f64,
    /// Reciprocity delivery ratio, 0-10.
    pub reciprocity: f64,
}

/// Market-effect multipliers derived from the coordination index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CoordinationEffects {
    /// Multiplier on private demand.
    pub private_demand_multiplier: f64,
    /// Trust premium in US dollars per tonne.
    #[serde(rename = "trustPremiumUSD")]
    pub trust_premium_usd: f64,
    /// Multiplier on market volatility.
    pub volatility_multiplier: f64,
    /// Multiplier on intervention probability.
    pub intervention_prob_multiplier: f64,
}

/// Last computed coordination index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct CoordinationIndex {
    /// Index value in `[0, 100]`.
    pub value: f64,
    /// Per-component breakdown.
    pub components: CoordinationComponents,
    /// Derived market effects.
    pub effects: CoordinationEffects,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn reciprocity_ratio_defaults_to_one() {
        let entry = ReciprocityEntry::default();
        assert!((entry.ratio() - 1.0).abs() < f64::EPSILON);
        let entry = ReciprocityEntry {
            promised: 4.0,
            delivered: 1.0,
        };
        assert!((entry.ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn event_operations_use_type_tag() {
        let json = r#"{
            "id": "ev-1",
            "title": "Heatwave",
            "justified": true,
            "operations": [
                {"type": "stat", "target": "sentiment", "value": -0.1},
                {"type": "projectUpgrade", "projectId": "dac", "xcrBidMultiplier": 0.9}
            ]
        }"#;
        let event: EventDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(event.operations.len(), 2);
        match &event.operations[0] {
            EventOperation::Stat(op) => {
                assert_eq!(op.target, "sentiment");
                assert_eq!(op.operation, "add");
            }
            other => panic!("Expected Stat, got {other:?}"),
        }
        match &event.operations[1] {
            EventOperation::ProjectUpgrade(up) => {
                assert_eq!(up.project_id, "dac");
                assert!((up.mitigation_multiplier - 1.0).abs() < f64::EPSILON);
                assert!((up.xcr_bid_multiplier - 0.9).abs() < f64::EPSILON);
            }
            other => panic!("Expected ProjectUpgrade, got {other:?}"),
        }
    }

    #[test]
    fn dividend_default_is_inert() {
        let dividend = SupermajorityDividend::default();
        assert!(!dividend.active);
        assert!((dividend.intervention_multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coalition_serializes_kind_as_type() {
        let coalition = Coalition {
            id: String::from("mrv-coalition-2025"),
            kind: CoalitionType::Mrv,
            members: Vec::new(),
            created_turn: 1,
            active: true,
            auto_renew: true,
            sector: None,
        };
        let json = serde_json::to_value(&coalition).unwrap();
        assert_eq!(json["type"], "mrv");
        assert!(json.get("sector").is_none());
    }
}
