//! Session records and join codes.

use crate::constants::{JOIN_CODE_ALPHABET, JOIN_CODE_LEN};
use crate::error::InvalidJoinCode;
use crate::ids::{PlayerId, SessionId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a session. Only the host moves it forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Players are gathering.
    #[default]
    Lobby,
    /// The match is running.
    Active,
    /// The match finished. The session can no longer be joined.
    Ended,
}

/// Six character code players type to join a session.
///
/// Codes are stored upper-case. Parsing is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JoinCode(String);

impl JoinCode {
    /// Validates user input.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidJoinCode`] unless `input` is exactly six ASCII
    /// letters or digits. Surrounding whitespace is not stripped.
    pub fn parse(input: &str) -> Result<Self, InvalidJoinCode> {
        let valid = input.len() == JOIN_CODE_LEN && input.bytes().all(|b| b.is_ascii_alphanumeric());
        if valid {
            Ok(Self(input.to_ascii_uppercase()))
        } else {
            Err(InvalidJoinCode {
                input: input.to_owned(),
            })
        }
    }

    /// Generates a random code from the unambiguous alphabet.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..JOIN_CODE_LEN)
            .map(|_| char::from(JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())]))
            .collect();
        Self(code)
    }

    /// The code as typed into the lobby screen.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JoinCode {
    type Error = InvalidJoinCode;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<JoinCode> for String {
    fn from(code: JoinCode) -> Self {
        code.0
    }
}

/// A session record as stored by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Backend id.
    pub id: SessionId,
    /// Code players join with. Unique among live sessions.
    pub join_code: JoinCode,
    /// Current phase.
    pub phase: SessionPhase,
    /// The player that owns loot and match flow.
    pub host_id: PlayerId,
    /// Maximum number of connected players.
    pub max_players: usize,
    /// Creation time, unix ms.
    pub created_at_ms: u64,
    /// After this instant the session cannot be joined, unix ms.
    pub expires_at_ms: u64,
}

impl Session {
    /// True once the TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// True while new players may join.
    #[must_use]
    pub fn is_joinable(&self, now_ms: u64) -> bool {
        !self.is_expired(now_ms) && self.phase != SessionPhase::Ended
    }

    /// True if `player` is the host.
    #[must_use]
    pub fn is_host(&self, player: &PlayerId) -> bool {
        &self.host_id == player
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn parse_rejects_wrong_length_and_symbols() {
        assert!(JoinCode::parse("ABC12").is_err());
        assert!(JoinCode::parse("ABC1234").is_err());
        assert!(JoinCode::parse("ABC-12").is_err());
        assert!(JoinCode::parse(" ABC12").is_err());
        assert!(JoinCode::parse("").is_err());
    }

    #[test]
    fn parse_normalizes_case() {
        let code = JoinCode::parse("abc123").unwrap();
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn generated_codes_are_valid_and_unambiguous() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let code = JoinCode::generate(&mut rng);
            assert_eq!(JoinCode::parse(code.as_str()).unwrap(), code);
            assert!(!code.as_str().contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn expired_or_ended_sessions_are_not_joinable() {
        let mut session = Session {
            id: SessionId::new("s"),
            join_code: JoinCode::parse("ABCDEF").unwrap(),
            phase: SessionPhase::Lobby,
            host_id: PlayerId::new("host"),
            max_players: 4,
            created_at_ms: 1_000,
            expires_at_ms: 2_000,
        };
        assert!(session.is_joinable(1_500));
        assert!(!session.is_joinable(2_000));
        session.phase = SessionPhase::Ended;
        assert!(!session.is_joinable(1_500));
    }
}
