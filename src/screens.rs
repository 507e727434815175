//! Screen routing and view models
//!
//! Each [`Screen`] has one renderer turning a snapshot into the view model
//! of that screen. The routing table is an [`EnumMap`], so every screen has
//! exactly one renderer. Screen values that cannot be read fall back to
//! [`Screen::Welcome`] when the snapshot is deserialized, which makes the
//! welcome renderer the fallback for unknown screens.

use enum_map::{EnumMap, enum_map};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    game::{GameState, Screen},
    leaderboard::{self, Leaderboard, QuestionStats, ScoreMessage, Standing},
    player::{self, Player, PlayerId},
    question::{Question, QuestionId},
};

/// What the welcome screen offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeView {
    /// Avatar URLs to pick an identity from
    pub avatar_choices: Vec<String>,
}

/// A player in the lobby list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    /// The player
    pub player: Player,
    /// Whether the player gets the host crown
    pub is_host: bool,
    /// Whether this is the local session's player
    pub is_you: bool,
}

/// What the lobby shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    /// Code to share with other players
    pub room_code: Option<String>,
    /// Players in join order
    pub players: Vec<LobbyPlayer>,
    /// The editable question set, only shown to the host
    pub questions: Option<Vec<Question>>,
    /// Number of questions in the room
    pub question_count: usize,
    /// Whether the local session may start the game
    pub can_start: bool,
}

/// The question being played
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Question identifier, used when answering
    pub id: QuestionId,
    /// The question text
    pub text: String,
    /// Options in display order
    pub options: Vec<String>,
}

/// What the game screen shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// 1-indexed position of the question
    pub number: usize,
    /// Total number of questions
    pub count: usize,
    /// The question, absent while it is not available yet
    pub prompt: Option<Prompt>,
    /// Option chosen by the local player
    pub chosen_answer: Option<usize>,
    /// The correct option, revealed once the local player has answered
    pub correct_answer: Option<usize>,
    /// Whether the local player's answer was correct
    pub answered_correctly: Option<bool>,
    /// Whether the local session may move on to the next question
    pub can_advance: bool,
    /// Whether advancing leads to the scoreboard
    pub is_last_question: bool,
}

/// What the scoreboard shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardView {
    /// Standings, best first
    pub standings: Vec<Standing>,
    /// The leading player, shown with the crown
    pub crowned: Option<PlayerId>,
    /// Points and position of the local player
    pub your_score: Option<ScoreMessage>,
    /// How each question went across the room
    pub question_stats: Vec<QuestionStats>,
    /// Whether the local session may bring everyone back to the lobby
    pub can_return_to_lobby: bool,
}

/// The rendered view of a screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_more::From)]
pub enum ScreenView {
    /// Identity entry, room creation and joining
    Welcome(WelcomeView),
    /// Waiting room
    Lobby(LobbyView),
    /// A question being played
    Game(GameView),
    /// Final standings
    Scoreboard(ScoreboardView),
}

/// A function producing the view of one screen
pub type Renderer = fn(&GameState) -> ScreenView;

fn render_welcome(_: &GameState) -> ScreenView {
    WelcomeView {
        avatar_choices: player::avatar_choices(),
    }
    .into()
}

fn render_lobby(state: &GameState) -> ScreenView {
    let host_id = state.host().map(|host| &host.id);
    let you = state.current_user.as_ref().map(|user| &user.id);

    LobbyView {
        room_code: state.room_code.as_ref().map(ToString::to_string),
        players: state
            .players
            .iter()
            .map(|p| LobbyPlayer {
                player: p.clone(),
                is_host: Some(&p.id) == host_id,
                is_you: Some(&p.id) == you,
            })
            .collect_vec(),
        questions: state.is_host.then(|| state.questions.clone()),
        question_count: state.questions.len(),
        can_start: state.is_host && !state.questions.is_empty(),
    }
    .into()
}

fn render_game(state: &GameState) -> ScreenView {
    let question = state.current_question();
    let chosen_answer = question.zip(state.current_user.as_ref()).and_then(|(q, user)| {
        state.answer_of(&user.id, &q.id)
    });
    let correct_answer = question
        .filter(|_| chosen_answer.is_some())
        .map(|q| q.correct_answer_index);

    GameView {
        number: state.current_question_index + 1,
        count: state.questions.len(),
        prompt: question.map(|q| Prompt {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.to_vec(),
        }),
        chosen_answer,
        correct_answer,
        answered_correctly: chosen_answer
            .zip(correct_answer)
            .map(|(chosen, correct)| chosen == correct),
        can_advance: state.is_host,
        is_last_question: state.is_last_question(),
    }
    .into()
}

fn render_scoreboard(state: &GameState) -> ScreenView {
    let leaderboard = Leaderboard::from_state(state);

    ScoreboardView {
        crowned: leaderboard.leader().map(|s| s.player.id.clone()),
        your_score: state
            .current_user
            .as_ref()
            .and_then(|user| leaderboard.score(&user.id)),
        question_stats: leaderboard::question_stats(state),
        standings: leaderboard.standings().to_vec(),
        can_return_to_lobby: state.is_host,
    }
    .into()
}

/// Maps every screen to its renderer
#[derive(Debug, Clone)]
pub struct Router {
    renderers: EnumMap<Screen, Renderer>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates the router with the built-in renderers
    pub fn new() -> Self {
        Self {
            renderers: enum_map! {
                Screen::Welcome => render_welcome as Renderer,
                Screen::Lobby => render_lobby as Renderer,
                Screen::Game => render_game as Renderer,
                Screen::Scoreboard => render_scoreboard as Renderer,
            },
        }
    }

    /// Replaces the renderer of one screen
    pub fn with_renderer(mut self, screen: Screen, renderer: Renderer) -> Self {
        self.renderers[screen] = renderer;
        self
    }

    /// Renders the screen `state` is on
    pub fn render(&self, state: &GameState) -> ScreenView {
        self.renderers[state.screen](state)
    }
}
