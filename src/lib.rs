//! # Quizmaster
//!
//! This library provides the game logic for a multiplayer trivia quiz. A
//! host creates a room, edits its questions and shares the room code;
//! players join with the code and everyone advances through the questions
//! together until the final scoreboard.
//!
//! Sessions share rooms through a key-value [`store::Storage`] with change
//! notifications. Each accepted action is reduced into a new snapshot by
//! [`game::reduce`], written to the [`store::RoomStore`] and picked up by
//! the other sessions of the room through their [`sync::SyncListener`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod game;
pub mod leaderboard;
pub mod player;
pub mod question;
pub mod room_code;
pub mod screens;
pub mod session;
pub mod store;
pub mod sync;

pub use config::Config;
pub use game::{Command, Error, GameState, Screen};
pub use session::Session;

/// Milliseconds since the Unix epoch, zero if the clock is before it
pub(crate) fn epoch_millis() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_epoch_millis_monotonic_enough() {
        let first = epoch_millis();
        assert!(epoch_millis() >= first);
    }
}
