//! Boundary error types for the `club-core` crate.
//!
//! Only inputs crossing the engine boundary are rejected with a
//! [`ClubError`]. Degraded data inside a turn (unknown project ids, an empty
//! catalog, stale submissions) is normalized and logged, never raised.

use crate::store::StoreError;

/// Errors returned by [`ClubEngine`](crate::engine::ClubEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClubError {
    /// A country code failed validation.
    #[error("invalid country code {code:?}: {reason}")]
    InvalidCountry {
        /// The raw code as received.
        code: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A floor vote label was not `hold`, `raise`, or `lower`.
    #[error("invalid vote {value:?}: expected hold, raise, or lower")]
    InvalidVote {
        /// The raw vote as received.
        value: String,
    },

    /// An administrative floor was below the minimum.
    #[error("floor {value} is below the minimum of {min}")]
    FloorTooLow {
        /// The requested floor.
        value: f64,
        /// The configured minimum.
        min: f64,
    },

    /// A numeric input was NaN or infinite.
    #[error("{field} must be a finite number")]
    NonFiniteValue {
        /// Name of the offending field.
        field: String,
    },

    /// A coalition request could not be honored.
    #[error("invalid coalition: {reason}")]
    InvalidCoalition {
        /// Why the coalition was rejected.
        reason: String,
    },

    /// Loading or saving the state document failed.
    #[error("persistence error: {source}")]
    Persistence {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}
