//! Identity types shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player's persistent identity (the user id issued by the auth service).
///
/// Ordering matters: in any pairing the lower id takes the left paddle.
/// Serializes as a plain number, so `PlayerId(42)` is `42` on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of one live match. Never reused within a process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Short shareable tournament code such as `"K7QX"`.
///
/// Codes are case-insensitive: construction uppercases the input so a code
/// typed as `"k7qx"` finds the same tournament.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TournamentId(String);

impl TournamentId {
    /// Creates a normalized tournament id.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TournamentId {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<TournamentId> for String {
    fn from(id: TournamentId) -> Self {
        id.0
    }
}

impl fmt::Display for TournamentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which paddle a player controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The other side of the table.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
        assert_eq!(MatchId(3).to_string(), "M-3");
    }

    #[test]
    fn test_player_id_orders_numerically() {
        assert!(PlayerId(2) < PlayerId(10));
    }

    #[test]
    fn test_tournament_id_is_uppercased() {
        assert_eq!(TournamentId::new(" k7qx ").as_str(), "K7QX");
    }

    #[test]
    fn test_tournament_id_deserialize_normalizes() {
        let id: TournamentId = serde_json::from_str("\"ab2c\"").unwrap();
        assert_eq!(id, TournamentId::new("AB2C"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"AB2C\"");
    }

    #[test]
    fn test_side_opposite_and_wire_format() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(serde_json::to_string(&Side::Right).unwrap(), "\"right\"");
    }
}
