//! Shared type definitions for the climate club turn engine.
//!
//! This crate is the single source of truth for the JSON state document and
//! every value exchanged with clients. Types flow downstream to `TypeScript`
//! via `ts-rs` for dashboard clients.
//!
//! # Modules
//!
//! - [`ids`] -- Game identifier and validated country codes
//! - [`enums`] -- Floor decisions, coalition kinds, stat operators
//! - [`structs`] -- Members, projects, events, history, coalition records
//! - [`submission`] -- Turn submissions and observed indicators
//! - [`state`] -- The authoritative [`GameState`] document

pub mod enums;
pub mod ids;
pub mod state;
pub mod structs;
pub mod submission;

// Re-export all public types at crate root for convenience.
pub use enums::{CoalitionType, FloorDecision, StatOperator};
pub use ids::{COUNTRY_CODE_MAX_LEN, COUNTRY_CODE_MIN_LEN, CountryCode, GameId};
pub use state::{GameState, StatField};
pub use structs::{
    Coalition, CoordinationComponents, CoordinationEffects, CoordinationIndex, EventDefinition,
    EventOperation, EventSnapshot, HistoryEntry, JointMrvEffects, Member, Project,
    ProjectUpgrade, ReciprocityEntry, RndSurge, StatOperation, SupermajorityDividend, VoteEntry,
};
pub use submission::{ObservedIndicators, TurnChoice, TurnSubmission};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::GameId::export_all();
        let _ = crate::ids::CountryCode::export_all();

        // Enums
        let _ = crate::enums::FloorDecision::export_all();
        let _ = crate::enums::CoalitionType::export_all();

        // Structs
        let _ = crate::structs::Member::export_all();
        let _ = crate::structs::VoteEntry::export_all();
        let _ = crate::structs::Project::export_all();
        let _ = crate::structs::ProjectUpgrade::export_all();
        let _ = crate::structs::StatOperation::export_all();
        let _ = crate::structs::EventOperation::export_all();
        let _ = crate::structs::EventDefinition::export_all();
        let _ = crate::structs::EventSnapshot::export_all();
        let _ = crate::structs::HistoryEntry::export_all();
        let _ = crate::structs::Coalition::export_all();
        let _ = crate::structs::SupermajorityDividend::export_all();
        let _ = crate::structs::RndSurge::export_all();
        let _ = crate::structs::ReciprocityEntry::export_all();
        let _ = crate::structs::JointMrvEffects::export_all();
        let _ = crate::structs::CoordinationComponents::export_all();
        let _ = crate::structs::CoordinationEffects::export_all();
        let _ = crate::structs::CoordinationIndex::export_all();

        // Submissions and state
        let _ = crate::submission::TurnSubmission::export_all();
        let _ = crate::submission::TurnChoice::export_all();
        let _ = crate::submission::ObservedIndicators::export_all();
        let _ = crate::state::GameState::export_all();
    }
}
