//! Gameplay constants shared by every peer.
//!
//! Anything a designer might tune lives in [`crate::config::GameConfig`].
//! What stays here are identifiers and limits the wire format depends on.

/// Weapon id meaning "no weapon equipped". Always present in a catalog.
pub const UNARMED_WEAPON_ID: &str = "none";

/// Armor id meaning "no armor equipped". Always present in a catalog.
pub const NO_ARMOR_ID: &str = "none";

/// Health a player spawns with.
pub const MAX_HEALTH: f32 = 100.0;

/// Join codes are exactly this many characters.
pub const JOIN_CODE_LEN: usize = 6;

/// Characters join codes are generated from.
///
/// `0`, `O`, `1` and `I` are left out so codes can be read aloud.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Simulation rate the game loop is tuned for.
pub const TICK_RATE: u32 = 60;

/// Fixed timestep at [`TICK_RATE`], in seconds.
pub const TICK_DURATION_SECS: f32 = 1.0 / TICK_RATE as f32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_avoids_ambiguous_glyphs() {
        for glyph in [b'0', b'O', b'1', b'I'] {
            assert!(!JOIN_CODE_ALPHABET.contains(&glyph));
        }
        assert!(JOIN_CODE_ALPHABET.iter().all(u8::is_ascii_alphanumeric));
    }
}
