//! Standings and per-question statistics
//!
//! The leaderboard is computed from a snapshot: players ordered by total
//! points, ties kept in join order, along with how each question went.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    game::GameState,
    player::{Player, PlayerId},
    question::QuestionId,
};

/// Medal shown next to the top three positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Medal {
    /// First place
    Gold,
    /// Second place
    Silver,
    /// Third place
    Bronze,
}

impl Medal {
    /// The medal for a 0-indexed position, if it earns one
    pub fn for_position(position: usize) -> Option<Self> {
        match position {
            0 => Some(Self::Gold),
            1 => Some(Self::Silver),
            2 => Some(Self::Bronze),
            _ => None,
        }
    }
}

/// One row of the standings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// The player
    pub player: Player,
    /// Total points
    pub points: u64,
    /// Position in the standings (0-indexed)
    pub position: usize,
    /// Whether the player created the room
    ///
    /// This only labels the host; the scoreboard crown goes to the leader.
    pub is_host: bool,
    /// Medal for the top three
    pub medal: Option<Medal>,
}

/// Score information for a single player
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct ScoreMessage {
    /// Total points earned by the player
    pub points: u64,
    /// Current position in the leaderboard (0-indexed)
    pub position: usize,
}

/// How one question went across the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    /// The question
    pub question_id: QuestionId,
    /// Players who chose the correct option
    pub correct: usize,
    /// Players who answered at all
    pub answered: usize,
}

/// Standings computed from a snapshot
#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    standings: Vec<Standing>,
    score_and_position: HashMap<PlayerId, (u64, usize)>,
}

impl Leaderboard {
    /// Ranks the players of `state` by total points
    ///
    /// The sort is stable, so players with equal points stay in join order
    /// and the host wins ties against later joiners.
    pub fn from_state(state: &GameState) -> Self {
        let host_id = state.host().map(|host| &host.id);

        let standings = state
            .players
            .iter()
            .map(|player| (player, state.score_of(&player.id)))
            .sorted_by(|(_, a), (_, b)| b.cmp(a))
            .enumerate()
            .map(|(position, (player, points))| Standing {
                player: player.clone(),
                points,
                position,
                is_host: Some(&player.id) == host_id,
                medal: Medal::for_position(position),
            })
            .collect_vec();

        let score_and_position = standings
            .iter()
            .map(|s| (s.player.id.clone(), (s.points, s.position)))
            .collect();

        Self {
            standings,
            score_and_position,
        }
    }

    /// All standings, best first
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    /// The leading player, who wears the crown on the scoreboard
    pub fn leader(&self) -> Option<&Standing> {
        self.standings.first()
    }

    /// Score and position of a player
    pub fn score(&self, player: &PlayerId) -> Option<ScoreMessage> {
        self.score_and_position
            .get(player)
            .map(|&(points, position)| ScoreMessage { points, position })
    }
}

/// Counts correct and total answers for every question of `state`
pub fn question_stats(state: &GameState) -> Vec<QuestionStats> {
    state
        .questions
        .iter()
        .map(|question| {
            let chosen = state
                .player_answers
                .values()
                .filter_map(|answers| answers.get(&question.id))
                .collect_vec();

            QuestionStats {
                question_id: question.id.clone(),
                correct: chosen.iter().filter(|&&&a| question.is_correct(a)).count(),
                answered: chosen.len(),
            }
        })
        .collect()
}
