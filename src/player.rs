//! Player identities and name validation
//!
//! A player is created when someone enters the create or join flow and
//! stays the same for the rest of the session. This module also holds the
//! avatar helpers used by the welcome screen.

use std::fmt::Display;

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    constants::player::{AVATAR_BASE_URL, AVATAR_SEEDS, MAX_NAME_LENGTH},
    epoch_millis,
};

/// A unique identifier for a player
///
/// Identifiers are derived from the creation timestamp, with a short random
/// suffix so that two players created within the same millisecond differ.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a new identifier from the current time
    pub fn generate() -> Self {
        let suffix = (Uuid::new_v4().as_u64_pair().0 >> 32) as u32;
        Self(format!("player_{}_{suffix:08x}", epoch_millis()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur when validating a player name
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Inappropriate,
}

/// Validates and cleans a requested player name
///
/// # Errors
///
/// * `NameError::TooLong` - Name exceeds 30 bytes
/// * `NameError::Empty` - Name is empty after trimming whitespace
/// * `NameError::Inappropriate` - Name contains inappropriate content
pub fn clean_name(name: &str) -> Result<String, NameError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.is_inappropriate() {
        return Err(NameError::Inappropriate);
    }
    Ok(name.to_owned())
}

/// Builds the identicon URL for an avatar seed
pub fn avatar_url(seed: &str) -> String {
    format!("{AVATAR_BASE_URL}?seed={seed}")
}

/// Returns the avatar URLs offered by the avatar picker, in display order
pub fn avatar_choices() -> Vec<String> {
    AVATAR_SEEDS.iter().map(|seed| avatar_url(seed)).collect()
}

/// A participant in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier of the player
    pub id: PlayerId,
    /// Display name, unique per room ignoring case
    pub name: String,
    /// URL of the player's avatar image
    pub avatar: String,
}

impl Player {
    /// Creates a player with a fresh identifier
    ///
    /// # Errors
    ///
    /// Returns a `NameError` if the name does not pass [`clean_name`].
    pub fn new(name: &str, avatar: impl Into<String>) -> Result<Self, NameError> {
        Ok(Self {
            id: PlayerId::generate(),
            name: clean_name(name)?,
            avatar: avatar.into(),
        })
    }

    /// Creates a player whose avatar is generated from `seed`
    ///
    /// # Errors
    ///
    /// Returns a `NameError` if the name does not pass [`clean_name`].
    pub fn with_seed(name: &str, seed: &str) -> Result<Self, NameError> {
        Self::new(name, avatar_url(seed))
    }

    /// Whether this player's name collides with `name`, ignoring case
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
