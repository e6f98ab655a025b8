//! Error types for the session runner binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and session play.

/// Top-level error for the session runner.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: club_core::config::ConfigError,
    },

    /// Catalog loading failed.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: club_core::catalog::CatalogError,
    },

    /// An engine operation failed.
    #[error("engine error: {source}")]
    Club {
        /// The underlying engine error.
        #[from]
        source: club_core::ClubError,
    },

    /// A bot could not take its seat.
    #[error("bot error: {message}")]
    Bot {
        /// Description of the failure.
        message: String,
    },
}
