//! Identifier types for the climate club.
//!
//! Game instances are keyed by a UUID v7 newtype, the same way every entity
//! identifier is wrapped elsewhere in the workspace. Members are keyed by a
//! validated country code rather than a UUID because the code is the
//! natural, user-visible key of a club seat.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for a single game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameId(pub Uuid);

impl GameId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for GameId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimum length of a country code.
pub const COUNTRY_CODE_MIN_LEN: usize = 2;

/// Maximum length of a country code.
pub const COUNTRY_CODE_MAX_LEN: usize = 3;

/// An upper-case ISO-style country (or bloc) code such as `USA` or `EU`.
///
/// Construct through [`CountryCode::parse`], which trims, upper-cases, and
/// checks that the code is 2 or 3 ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct CountryCode(String);

impl CountryCode {
    /// Normalize and validate a raw country code.
    ///
    /// Returns `None` when the trimmed code is not 2-3 ASCII letters.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let len = code.len();
        if !(COUNTRY_CODE_MIN_LEN..=COUNTRY_CODE_MAX_LEN).contains(&len) {
            return None;
        }
        if !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self(code))
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CountryCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_code_is_normalized() {
        let code = CountryCode::parse("  usa ");
        assert_eq!(code.as_ref().map(CountryCode::as_str), Some("USA"));
    }

    #[test]
    fn country_code_rejects_bad_input() {
        assert!(CountryCode::parse("").is_none());
        assert!(CountryCode::parse("U").is_none());
        assert!(CountryCode::parse("USAX").is_none());
        assert!(CountryCode::parse("U2").is_none());
        assert!(CountryCode::parse("EU").is_some());
    }

    #[test]
    fn country_code_serializes_as_plain_string() {
        let code = CountryCode::parse("chn");
        let json = code.and_then(|c| serde_json::to_string(&c).ok());
        assert_eq!(json.as_deref(), Some("\"CHN\""));
    }

    #[test]
    fn game_id_display_matches_uuid() {
        let id = GameId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
