//! Room code parsing and generation.

use std::fmt;

use rand::prelude::RngExt;
use rand::rng;
use thiserror::Error;

/// Length of every room code
pub const ROOM_CODE_LENGTH: usize = 6;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRoomCode {
    #[error("room code must be exactly {ROOM_CODE_LENGTH} characters, got {0}")]
    Length(usize),
    #[error("room code may only contain letters and digits, found '{0}'")]
    Character(char),
}

/// A normalized room code: exactly six characters from `[A-Z0-9]`.
///
/// Input is trimmed and uppercased before checking, so `"ab12cd"` parses to `AB12CD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(input: &str) -> Result<Self, InvalidRoomCode> {
        let normalized = input.trim().to_uppercase();

        let length = normalized.chars().count();
        if length != ROOM_CODE_LENGTH {
            return Err(InvalidRoomCode::Length(length));
        }
        if let Some(bad) = normalized.chars().find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit())) {
            return Err(InvalidRoomCode::Character(bad));
        }

        Ok(Self(normalized))
    }

    /// A uniformly random code. Callers must handle collisions with existing rooms.
    pub fn generate() -> Self {
        let mut rng = rng();
        let code = (0..ROOM_CODE_LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = InvalidRoomCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_input_is_normalized() {
        let code = RoomCode::parse("ab12cd").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(RoomCode::parse("  xy98zq \n").unwrap().as_str(), "XY98ZQ");
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(RoomCode::parse("AB12C"), Err(InvalidRoomCode::Length(5)));
        assert_eq!(RoomCode::parse("AB12CDE"), Err(InvalidRoomCode::Length(7)));
        assert_eq!(RoomCode::parse(""), Err(InvalidRoomCode::Length(0)));
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert_eq!(RoomCode::parse("AB12C$"), Err(InvalidRoomCode::Character('$')));
        assert_eq!(RoomCode::parse("AB 2CD"), Err(InvalidRoomCode::Character(' ')));
        // Non-ASCII letters uppercase fine but are still outside the alphabet
        assert!(RoomCode::parse("ÄB12CD").is_err());
    }

    #[test]
    fn test_generated_codes_are_valid() {
        for _ in 0..100 {
            let code = RoomCode::generate();
            assert_eq!(RoomCode::parse(code.as_str()).unwrap(), code);
        }
    }
}
