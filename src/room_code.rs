//! Room code generation and parsing
//!
//! Room codes are the short identifiers a host shares with players so they
//! can join a room. They are six characters drawn from uppercase letters
//! and digits, which keeps them easy to read aloud and type.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants::room::{CODE_ALPHABET, CODE_LENGTH};

/// A code identifying a room
///
/// The code doubles as the storage key under which the room snapshot is
/// persisted. Generated codes are random and collisions are not checked.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a new random room code
    pub fn new() -> Self {
        Self(
            (0..CODE_LENGTH)
                .map(|_| char::from(CODE_ALPHABET[fastrand::usize(..CODE_ALPHABET.len())]))
                .collect(),
        )
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomCode {
    /// Creates a new random room code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while parsing a room code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The code does not have exactly six characters
    #[error("room code must be {CODE_LENGTH} characters long")]
    Length,
    /// The code contains a character outside of letters and digits
    #[error("room code contains an invalid character")]
    Character,
}

impl FromStr for RoomCode {
    type Err = ParseError;

    /// Parses a room code as typed by a user
    ///
    /// Surrounding whitespace is ignored and letters are uppercased, so
    /// `" ab12cd "` parses to `AB12CD`.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the trimmed input is not six letters or
    /// digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.chars().count() != CODE_LENGTH {
            return Err(ParseError::Length);
        }
        if !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
            return Err(ParseError::Character);
        }
        Ok(Self(code))
    }
}
