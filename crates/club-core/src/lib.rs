//! Turn resolution engine for the climate club simulation.
//!
//! Member countries submit a floor ballot, a project nomination, and reward
//! proposals each quarter. Once every member has submitted (or a resolution
//! is forced), the engine closes the turn through an ordered pipeline and
//! commits the new state document atomically.
//!
//! # Modules
//!
//! - [`catalog`] -- [`CatalogStore`] port for projects and events, plus the
//!   YAML catalog loader.
//! - [`clock`] -- Turn to period mapping, phases, and calendar helpers.
//! - [`coalition`] -- Supermajority dividend, joint MRV, R&D surges, and
//!   reciprocity escrow.
//! - [`config`] -- Configuration loading from `club-config.yaml`.
//! - [`coordination`] -- The 0-100 coordination index and its effects.
//! - [`engine`] -- [`ClubEngine`], the lock-guarded facade.
//! - [`error`] -- Boundary error taxonomy.
//! - [`market`] -- Swing clamps, floor guidance, market move, capital.
//! - [`resolution`] -- The ordered turn pipeline.
//! - [`store`] -- [`StateStore`] persistence port.
//! - [`weighting`] -- GDP weights and vote aggregation.
//!
//! [`CatalogStore`]: catalog::CatalogStore
//! [`ClubEngine`]: engine::ClubEngine
//! [`StateStore`]: store::StateStore

pub mod catalog;
pub mod clock;
pub mod coalition;
pub mod config;
pub mod coordination;
pub mod engine;
pub mod error;
pub mod market;
pub mod resolution;
pub mod store;
pub mod weighting;

pub use engine::{ClubEngine, ResolveOutcome, ResolveRequest, SubmitOutcome, TurnStatus};
pub use error::ClubError;
