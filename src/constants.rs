//! Configuration constants for the quiz room system
//!
//! This module contains the limits and fixed values used throughout the
//! crate to keep rooms, questions and player identities within consistent
//! boundaries.

/// Room-level constants
pub mod room {
    /// Number of characters in a generated room code
    pub const CODE_LENGTH: usize = 6;
    /// Characters a room code is drawn from
    pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Maximum number of players allowed in a single room
    pub const MAX_PLAYER_COUNT: usize = 100;
}

/// Storage layout constants
pub mod storage {
    /// Key of the shared entry announcing that some room changed
    pub const SENTINEL_KEY: &str = "quizmaster_update";
}

/// Question constants
pub mod question {
    /// Number of answer options every question carries
    pub const OPTION_COUNT: usize = 4;
    /// Maximum length of a question text in characters
    pub const MAX_TEXT_LENGTH: usize = 200;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 100;
    /// Maximum number of questions in a room
    pub const MAX_COUNT: usize = 100;
}

/// Scoring constants
pub mod score {
    /// Points awarded for a correct answer
    pub const POINTS_PER_CORRECT: u64 = 10;
}

/// Player identity constants
pub mod player {
    /// Maximum length of a player name in bytes
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Base URL of the identicon service used for avatars
    pub const AVATAR_BASE_URL: &str = "https://api.dicebear.com/8.x/bottts-neutral/svg";
    /// Seeds offered by the avatar picker
    pub const AVATAR_SEEDS: [&str; 12] = [
        "Gizmo", "Garfield", "Precious", "Missy", "Coco", "Mimi", "Tigger", "Midnight", "Smokey",
        "Boots", "Luna", "Oreo",
    ];
}
