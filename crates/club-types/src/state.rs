//! The authoritative per-game state document.
//!
//! [`GameState`] is serialized as a single camelCase JSON document. Every
//! field has a default, so a partial or legacy document deserializes by
//! filling whatever is missing from [`GameState::default`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::FloorDecision;
use crate::ids::{CountryCode, GameId};
use crate::structs::{
    Coalition, CoordinationIndex, EventSnapshot, HistoryEntry, Member, Project, ReciprocityEntry,
    RndSurge, SupermajorityDividend, VoteEntry,
};
use crate::submission::TurnSubmission;

/// Year of the first turn.
pub const DEFAULT_START_YEAR: u32 = 2025;

/// Default price floor.
pub const DEFAULT_FLOOR: f64 = 80.0;

/// Default market price.
pub const DEFAULT_MARKET: f64 = 82.0;

/// Default inflation.
pub const DEFAULT_INFLATION: f64 = 1.1;

/// Default private share of demand.
pub const DEFAULT_PRIVATE_SHARE: f64 = 0.7;

/// Default sentiment.
pub const DEFAULT_SENTIMENT: f64 = 0.2;

/// Default central-bank credibility.
pub const DEFAULT_CREDIBILITY: f64 = 1.0;

/// Default floor step applied by an honored raise or lower.
pub const DEFAULT_FLOOR_STEP: f64 = 5.0;

/// The full state of one game instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct GameState {
    /// Game instance identifier.
    pub game_id: GameId,

    // --- Time ---
    /// Linear turn counter, starting at 1.
    pub turn: u32,
    /// Calendar year of the current turn.
    pub year: u32,
    /// Quarter of the current turn (1-4).
    pub quarter: u8,
    /// Era phase of the current year (1-3).
    pub phase: u8,
    /// Whether the current turn is the annual anchor (Q4).
    pub is_annual_anchor: bool,

    // --- Market indicators ---
    /// Policy price floor.
    pub floor: f64,
    /// Market price.
    pub market: f64,
    /// Inflation.
    pub inflation: f64,
    /// Private share of demand, in `[0, 1]`.
    pub private_share: f64,
    /// Market sentiment.
    pub sentiment: f64,
    /// Central-bank credibility, in `[0, 100]`.
    pub credibility: f64,
    /// Last central-bank purchase.
    pub cqe_buy: f64,
    /// Supply entering the market this turn.
    pub incoming_supply: f64,
    /// Cumulative funded mitigation.
    pub total_mitigation: f64,
    /// Cumulative XCR awarded.
    pub cumulative_xcr: f64,
    /// Turn of the last honored floor change.
    pub last_floor_change_turn: u32,
    /// Floor step for an honored raise or lower.
    pub floor_step: f64,
    /// The event that fired on the last resolved turn.
    pub last_event: Option<EventSnapshot>,

    // --- Round content ---
    /// Project offers for the current round.
    pub projects: Vec<Project>,
    /// Resolved turns, newest first.
    pub history: Vec<HistoryEntry>,

    // --- Players ---
    /// Seated members.
    pub members: Vec<Member>,
    /// Standing floor preferences, one per member.
    pub votes: Vec<VoteEntry>,
    /// Ballots for the live turn.
    pub turn_submissions: Vec<TurnSubmission>,
    /// Proposed reward multipliers: project id to member to multiplier.
    #[serde(rename = "projectRAdjustments")]
    pub project_r_adjustments: BTreeMap<String, BTreeMap<CountryCode, f64>>,

    // --- Coalitions ---
    /// Coalition records.
    pub coalitions: Vec<Coalition>,
    /// Current supermajority dividend.
    pub supermajority_dividend: SupermajorityDividend,
    /// Whether a joint MRV agreement is in force.
    #[serde(rename = "jointMRVActive")]
    pub joint_mrv_active: bool,
    /// Joint MRV participants.
    #[serde(rename = "jointMRVMembers")]
    pub joint_mrv_members: Vec<CountryCode>,
    /// Turn the joint MRV agreement started.
    #[serde(rename = "jointMRVStartTurn")]
    pub joint_mrv_start_turn: Option<u32>,
    /// Active R&D surges.
    pub rnd_surges: Vec<RndSurge>,
    /// Reciprocity counters per country.
    pub reciprocity_escrow: BTreeMap<CountryCode, ReciprocityEntry>,
    /// Last computed coordination index.
    pub coordination_index: Option<CoordinationIndex>,

    /// Values of event stat targets the engine does not model.
    pub custom_stats: BTreeMap<String, f64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            game_id: GameId::new(),
            turn: 1,
            year: DEFAULT_START_YEAR,
            quarter: 1,
            phase: 1,
            is_annual_anchor: false,
            floor: DEFAULT_FLOOR,
            market: DEFAULT_MARKET,
            inflation: DEFAULT_INFLATION,
            private_share: DEFAULT_PRIVATE_SHARE,
            sentiment: DEFAULT_SENTIMENT,
            credibility: DEFAULT_CREDIBILITY,
            cqe_buy: 0.0,
            incoming_supply: 0.0,
            total_mitigation: 0.0,
            cumulative_xcr: 0.0,
            last_floor_change_turn: 0,
            floor_step: DEFAULT_FLOOR_STEP,
            last_event: None,
            projects: Vec::new(),
            history: Vec::new(),
            members: Vec::new(),
            votes: Vec::new(),
            turn_submissions: Vec::new(),
            project_r_adjustments: BTreeMap::new(),
            coalitions: Vec::new(),
            supermajority_dividend: SupermajorityDividend::default(),
            joint_mrv_active: false,
            joint_mrv_members: Vec::new(),
            joint_mrv_start_turn: None,
            rnd_surges: Vec::new(),
            reciprocity_escrow: BTreeMap::new(),
            coordination_index: None,
            custom_stats: BTreeMap::new(),
        }
    }
}

/// A numeric field of the state document addressable by event operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    /// `floor`
    Floor,
    /// `market`
    Market,
    /// `inflation`
    Inflation,
    /// `privateShare`
    PrivateShare,
    /// `sentiment`
    Sentiment,
    /// `credibility`
    Credibility,
    /// `cqeBuy`
    CqeBuy,
    /// `incomingSupply`
    IncomingSupply,
    /// `totalMitigation`
    TotalMitigation,
    /// `cumulativeXcr`
    CumulativeXcr,
    /// `floorStep`
    FloorStep,
}

impl StatField {
    /// Every addressable field.
    pub const ALL: [Self; 11] = [
        Self::Floor,
        Self::Market,
        Self::Inflation,
        Self::PrivateShare,
        Self::Sentiment,
        Self::Credibility,
        Self::CqeBuy,
        Self::IncomingSupply,
        Self::TotalMitigation,
        Self::CumulativeXcr,
        Self::FloorStep,
    ];

    /// camelCase document key of the field.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Market => "market",
            Self::Inflation => "inflation",
            Self::PrivateShare => "privateShare",
            Self::Sentiment => "sentiment",
            Self::Credibility => "credibility",
            Self::CqeBuy => "cqeBuy",
            Self::IncomingSupply => "incomingSupply",
            Self::TotalMitigation => "totalMitigation",
            Self::CumulativeXcr => "cumulativeXcr",
            Self::FloorStep => "floorStep",
        }
    }

    /// Resolve a target name, accepting camelCase or `snake_case`.
    pub fn parse(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "floor" => Some(Self::Floor),
            "market" => Some(Self::Market),
            "inflation" => Some(Self::Inflation),
            "privateshare" => Some(Self::PrivateShare),
            "sentiment" => Some(Self::Sentiment),
            "credibility" => Some(Self::Credibility),
            "cqebuy" => Some(Self::CqeBuy),
            "incomingsupply" => Some(Self::IncomingSupply),
            "totalmitigation" => Some(Self::TotalMitigation),
            "cumulativexcr" => Some(Self::CumulativeXcr),
            "floorstep" => Some(Self::FloorStep),
            _ => None,
        }
    }
}

impl GameState {
    /// Read a named numeric field. Unknown names read from `custom_stats`,
    /// defaulting to 0.
    pub fn stat(&self, name: &str) -> f64 {
        match StatField::parse(name) {
            Some(field) => self.stat_value(field),
            None => self.custom_stats.get(name).copied().unwrap_or(0.0),
        }
    }

    /// Write a named numeric field. Unknown names write to `custom_stats`.
    pub fn set_stat(&mut self, name: &str, value: f64) {
        match StatField::parse(name) {
            Some(field) => self.set_stat_value(field, value),
            None => {
                self.custom_stats.insert(name.to_owned(), value);
            }
        }
    }

    /// Read a modeled numeric field.
    pub const fn stat_value(&self, field: StatField) -> f64 {
        match field {
            StatField::Floor => self.floor,
            StatField::Market => self.market,
            StatField::Inflation => self.inflation,
            StatField::PrivateShare => self.private_share,
            StatField::Sentiment => self.sentiment,
            StatField::Credibility => self.credibility,
            StatField::CqeBuy => self.cqe_buy,
            StatField::IncomingSupply => self.incoming_supply,
            StatField::TotalMitigation => self.total_mitigation,
            StatField::CumulativeXcr => self.cumulative_xcr,
            StatField::FloorStep => self.floor_step,
        }
    }

    /// Write a modeled numeric field.
    pub const fn set_stat_value(&mut self, field: StatField, value: f64) {
        let slot = match field {
            StatField::Floor => &mut self.floor,
            StatField::Market => &mut self.market,
            StatField::Inflation => &mut self.inflation,
            StatField::PrivateShare => &mut self.private_share,
            StatField::Sentiment => &mut self.sentiment,
            StatField::Credibility => &mut self.credibility,
            StatField::CqeBuy => &mut self.cqe_buy,
            StatField::IncomingSupply => &mut self.incoming_supply,
            StatField::TotalMitigation => &mut self.total_mitigation,
            StatField::CumulativeXcr => &mut self.cumulative_xcr,
            StatField::FloorStep => &mut self.floor_step,
        };
        *slot = value;
    }

    /// Look up a seated member by country code.
    pub fn member(&self, country: &CountryCode) -> Option<&Member> {
        self.members.iter().find(|m| &m.country == country)
    }

    /// Whether `country` holds a seat.
    pub fn is_member(&self, country: &CountryCode) -> bool {
        self.member(country).is_some()
    }

    /// Submissions that belong to the live turn.
    pub fn current_submissions(&self) -> impl Iterator<Item = &TurnSubmission> {
        let turn = self.turn;
        self.turn_submissions.iter().filter(move |s| s.turn == turn)
    }

    /// Members that have not submitted for the live turn, in seat order.
    pub fn waiting_for(&self) -> Vec<CountryCode> {
        self.members
            .iter()
            .filter(|m| !self.current_submissions().any(|s| s.country == m.country))
            .map(|m| m.country.clone())
            .collect()
    }

    /// A member's standing floor vote, if any.
    pub fn standing_vote(&self, country: &CountryCode) -> Option<FloorDecision> {
        self.votes
            .iter()
            .find(|v| &v.country == country)
            .map(|v| v.vote)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_state_matches_documented_values() {
        let state = GameState::default();
        assert_eq!(state.turn, 1);
        assert_eq!(state.year, 2025);
        assert_eq!(state.quarter, 1);
        assert!((state.floor - 80.0).abs() < f64::EPSILON);
        assert!((state.market - 82.0).abs() < f64::EPSILON);
        assert!((state.inflation - 1.1).abs() < f64::EPSILON);
        assert!((state.private_share - 0.7).abs() < f64::EPSILON);
        assert!((state.sentiment - 0.2).abs() < f64::EPSILON);
        assert!((state.credibility - 1.0).abs() < f64::EPSILON);
        assert!((state.floor_step - 5.0).abs() < f64::EPSILON);
        assert!(state.members.is_empty());
        assert!(state.history.is_empty());
        assert!(state.projects.is_empty());
    }

    #[test]
    fn partial_document_fills_from_defaults() {
        let state: GameState = serde_json::from_str(r#"{"turn": 7, "floor": 95}"#).unwrap();
        assert_eq!(state.turn, 7);
        assert!((state.floor - 95.0).abs() < f64::EPSILON);
        assert!((state.market - 82.0).abs() < f64::EPSILON);
        assert!(!state.supermajority_dividend.active);
    }

    #[test]
    fn document_uses_wire_key_spelling() {
        let json = serde_json::to_value(GameState::default()).unwrap();
        assert!(json.get("privateShare").is_some());
        assert!(json.get("jointMRVActive").is_some());
        assert!(json.get("projectRAdjustments").is_some());
        assert!(json.get("lastFloorChangeTurn").is_some());
    }

    #[test]
    fn stat_accepts_both_spellings() {
        let mut state = GameState::default();
        state.set_stat("private_share", 0.4);
        assert!((state.stat("privateShare") - 0.4).abs() < f64::EPSILON);
        state.set_stat("cumulativeXcr", 12.0);
        assert!((state.cumulative_xcr - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_stat_goes_to_custom_stats() {
        let mut state = GameState::default();
        assert!(state.stat("tipping_points").abs() < f64::EPSILON);
        state.set_stat("tipping_points", 2.0);
        assert!((state.stat("tipping_points") - 2.0).abs() < f64::EPSILON);
        assert_eq!(state.custom_stats.len(), 1);
    }

    #[test]
    fn waiting_for_lists_members_without_ballots() {
        let mut state = GameState::default();
        let usa = CountryCode::parse("USA").unwrap();
        let chn = CountryCode::parse("CHN").unwrap();
        state.members.push(Member::joining(usa.clone()));
        state.members.push(Member::joining(chn.clone()));
        state.turn_submissions.push(TurnSubmission {
            country: usa,
            turn: 1,
            chosen_project_id: None,
            floor_decision: FloorDecision::Hold,
            r_adjustments: BTreeMap::new(),
            submitted_at: chrono::Utc::now(),
        });
        assert_eq!(state.waiting_for(), vec![chn]);
    }
}
