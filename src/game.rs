//! Game state and the reducer that advances it
//!
//! A room is described by a single [`GameState`] snapshot. Every user action
//! becomes a [`Command`], and [`reduce`] turns the current snapshot and a
//! command into the next snapshot, or an [`Error`] leaving the snapshot
//! untouched. The reducer does no I/O: the session resolves room codes and
//! store lookups before building a command, and persists the result after.

use std::{collections::HashMap, fmt::Display, str::FromStr};

use enum_map::Enum;
use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::SerializeDisplay;
use thiserror::Error;
use tracing::warn;

use crate::{
    constants,
    player::{Player, PlayerId},
    question::{self, Question, QuestionError, QuestionId},
    room_code::{self, RoomCode},
};

/// The screen a session is showing
///
/// The screens follow each other linearly: welcome, lobby, game and
/// scoreboard, with the scoreboard able to return to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Enum, SerializeDisplay)]
pub enum Screen {
    /// Identity entry, room creation and joining
    #[default]
    Welcome,
    /// Waiting room where the host edits questions
    Lobby,
    /// A question is being played
    Game,
    /// Final standings
    Scoreboard,
}

impl Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Welcome => "WELCOME",
            Self::Lobby => "LOBBY",
            Self::Game => "GAME",
            Self::Scoreboard => "SCOREBOARD",
        })
    }
}

/// Error returned when parsing an unknown screen name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown screen {0:?}")]
pub struct UnknownScreen(String);

impl FromStr for Screen {
    type Err = UnknownScreen;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WELCOME" => Ok(Self::Welcome),
            "LOBBY" => Ok(Self::Lobby),
            "GAME" => Ok(Self::Game),
            "SCOREBOARD" => Ok(Self::Scoreboard),
            _ => Err(UnknownScreen(s.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for Screen {
    /// Deserializes a screen name, falling back to the welcome screen
    fn deserialize<D>(deserializer: D) -> Result<Screen, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_else(|e: UnknownScreen| {
            warn!(error = %e, "falling back to the welcome screen");
            Screen::Welcome
        }))
    }
}

/// Rules a room is played with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Rules {
    /// Points awarded for each correct answer
    #[garde(range(min = 1))]
    pub points_per_correct: u64,
    /// Maximum number of players in a room, host included
    #[garde(range(min = 1, max = constants::room::MAX_PLAYER_COUNT))]
    pub max_players: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            points_per_correct: constants::score::POINTS_PER_CORRECT,
            max_players: constants::room::MAX_PLAYER_COUNT,
        }
    }
}

/// The complete state of one session's view of a room
///
/// The snapshot is persisted wholesale under its room code. `is_host` and
/// `current_user` describe the local session and are never taken from
/// another session's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    /// The screen currently shown
    pub screen: Screen,
    /// Whether the local session created the room
    pub is_host: bool,
    /// Code of the room, present once a room is created or joined
    pub room_code: Option<RoomCode>,
    /// Players in join order; the first one is the host
    pub players: Vec<Player>,
    /// Identity of the local session
    pub current_user: Option<Player>,
    /// Questions in play order
    pub questions: Vec<Question>,
    /// Index of the question being played
    pub current_question_index: usize,
    /// Total points of each player
    pub scores: HashMap<PlayerId, u64>,
    /// Chosen option of each player for each answered question
    pub player_answers: HashMap<PlayerId, HashMap<QuestionId, usize>>,
    /// Number of persisted writes this snapshot descends from
    pub revision: u64,
}

impl GameState {
    /// The player who created the room
    pub fn host(&self) -> Option<&Player> {
        self.players.first()
    }

    /// The question being played, if any
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Whether the question being played is the last one
    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.questions.len()
    }

    /// Total points of a player, zero if unknown
    pub fn score_of(&self, player: &PlayerId) -> u64 {
        self.scores.get(player).copied().unwrap_or_default()
    }

    /// The option a player chose for a question, if answered
    pub fn answer_of(&self, player: &PlayerId, question: &QuestionId) -> Option<usize> {
        self.player_answers
            .get(player)
            .and_then(|answers| answers.get(question))
            .copied()
    }

    /// Whether any player in the room has `name`, ignoring case
    pub fn has_player_named(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.has_name(name))
    }

    /// Copies the fields shared between sessions from `remote`
    ///
    /// Players, screen, questions, question index, scores, answers and the
    /// revision are taken from `remote`; the local identity (`is_host`,
    /// `current_user`) and room code stay as they are.
    pub fn merge_shared(&mut self, remote: GameState) {
        let GameState {
            screen,
            players,
            questions,
            current_question_index,
            scores,
            player_answers,
            revision,
            is_host: _,
            room_code: _,
            current_user: _,
        } = remote;

        self.screen = screen;
        self.players = players;
        self.questions = questions;
        self.current_question_index = current_question_index;
        self.scores = scores;
        self.player_answers = player_answers;
        self.revision = revision;
    }
}

/// A state transition requested by a session
#[derive(Debug, Clone)]
pub enum Command {
    /// Open a new room with `user` as host
    CreateRoom {
        /// The host's identity
        user: Player,
        /// Code of the new room
        room_code: RoomCode,
    },
    /// Enter an existing room
    JoinRoom {
        /// The joining player's identity
        user: Player,
        /// Code the player typed
        room_code: RoomCode,
        /// The room's stored snapshot, if one was found
        existing: Option<Box<GameState>>,
    },
    /// Replace the question set
    SetQuestions(Vec<Question>),
    /// Start playing from the first question
    StartGame,
    /// Record the local player's answer to a question
    AnswerQuestion {
        /// The question answered
        question_id: QuestionId,
        /// The chosen option
        answer_index: usize,
    },
    /// Move to the next question, or to the scoreboard after the last one
    NextQuestion,
    /// Leave the room and start over
    ResetGame,
    /// Go back to the lobby keeping players and questions
    ReturnToLobby,
}

/// Reasons a command can be rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No room is stored under the requested code
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),
    /// The typed room code is malformed
    #[error("invalid room code: {0}")]
    InvalidRoomCode(#[from] room_code::ParseError),
    /// The room has left the lobby
    #[error("cannot join a game that is already in progress")]
    GameAlreadyStarted,
    /// Another player in the room already uses this name
    #[error("player {0:?} is already in the room")]
    NameTaken(String),
    /// The room has reached its player limit
    #[error("room is full")]
    RoomFull,
    /// Only the host may perform this command
    #[error("only the host can do this")]
    HostOnly,
    /// The session has no player identity
    #[error("no player identity in this session")]
    NoCurrentUser,
    /// The new question set is invalid
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
}

/// Computes the snapshot that follows `state` once `command` is applied
///
/// # Errors
///
/// * `Error::RoomNotFound` - joining a room that has no stored snapshot
/// * `Error::GameAlreadyStarted` - joining a room outside of its lobby
/// * `Error::NameTaken` - joining with a name already in the room
/// * `Error::RoomFull` - joining a room at its player limit
/// * `Error::InvalidQuestion` - setting an invalid question set
/// * `Error::NoCurrentUser` - answering without a player identity
/// * `Error::HostOnly` - advancing questions from a non-host session
pub fn reduce(state: &GameState, command: Command, rules: &Rules) -> Result<GameState, Error> {
    match command {
        Command::CreateRoom { user, room_code } => Ok(GameState {
            screen: Screen::Lobby,
            is_host: true,
            room_code: Some(room_code),
            scores: HashMap::from([(user.id.clone(), 0)]),
            players: vec![user.clone()],
            current_user: Some(user),
            questions: question::default_questions(),
            current_question_index: 0,
            player_answers: HashMap::new(),
            revision: 0,
        }),
        Command::JoinRoom {
            user,
            room_code,
            existing,
        } => {
            let Some(existing) = existing else {
                return Err(Error::RoomNotFound(room_code));
            };
            if existing.screen != Screen::Lobby {
                return Err(Error::GameAlreadyStarted);
            }
            if existing.has_player_named(&user.name) {
                return Err(Error::NameTaken(user.name));
            }
            if existing.players.len() >= rules.max_players {
                return Err(Error::RoomFull);
            }

            let mut next = *existing;
            next.scores.insert(user.id.clone(), 0);
            next.players.push(user.clone());
            next.current_user = Some(user);
            next.is_host = false;
            next.room_code = Some(room_code);
            Ok(next)
        }
        Command::SetQuestions(questions) => {
            question::validate_questions(&questions)?;
            Ok(GameState {
                questions,
                ..state.clone()
            })
        }
        Command::StartGame => Ok(GameState {
            screen: Screen::Game,
            current_question_index: 0,
            player_answers: HashMap::new(),
            scores: state.players.iter().map(|p| (p.id.clone(), 0)).collect(),
            ..state.clone()
        }),
        Command::AnswerQuestion {
            question_id,
            answer_index,
        } => {
            let Some(user) = &state.current_user else {
                return Err(Error::NoCurrentUser);
            };

            let mut next = state.clone();
            let correct = next
                .questions
                .iter()
                .find(|q| q.id == question_id)
                .is_some_and(|q| q.is_correct(answer_index));

            next.player_answers
                .entry(user.id.clone())
                .or_default()
                .insert(question_id, answer_index);

            // Answering again re-awards the points.
            if correct {
                *next.scores.entry(user.id.clone()).or_default() += rules.points_per_correct;
            }

            Ok(next)
        }
        Command::NextQuestion => {
            if !state.is_host {
                return Err(Error::HostOnly);
            }

            let mut next = state.clone();
            if next.is_last_question() {
                next.screen = Screen::Scoreboard;
            } else {
                next.current_question_index += 1;
            }
            Ok(next)
        }
        Command::ResetGame => Ok(GameState::default()),
        Command::ReturnToLobby => Ok(GameState {
            screen: Screen::Lobby,
            current_question_index: 0,
            scores: HashMap::new(),
            player_answers: HashMap::new(),
            ..state.clone()
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::question::QuestionDraft;

    fn player(name: &str) -> Player {
        Player::with_seed(name, "Luna").unwrap()
    }

    fn code() -> RoomCode {
        "ROOM42".parse().unwrap()
    }

    fn create_room(host: &Player) -> GameState {
        reduce(
            &GameState::default(),
            Command::CreateRoom {
                user: host.clone(),
                room_code: code(),
            },
            &Rules::default(),
        )
        .unwrap()
    }

    fn join(existing: &GameState, user: &Player) -> Result<GameState, Error> {
        reduce(
            &GameState::default(),
            Command::JoinRoom {
                user: user.clone(),
                room_code: code(),
                existing: Some(Box::new(existing.clone())),
            },
            &Rules::default(),
        )
    }

    fn apply(state: &GameState, command: Command) -> GameState {
        reduce(state, command, &Rules::default()).unwrap()
    }

    fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| {
                QuestionDraft {
                    text: format!("Question {i}"),
                    options: ["a", "b", "c", "d"].map(str::to_owned),
                    correct_answer_index: i % 4,
                }
                .build()
            })
            .collect()
    }

    #[test]
    fn test_create_room() {
        let host = player("Ana");
        let state = create_room(&host);

        assert_eq!(state.screen, Screen::Lobby);
        assert!(state.is_host);
        assert_eq!(state.room_code, Some(code()));
        assert_eq!(state.players, vec![host.clone()]);
        assert_eq!(state.current_user, Some(host.clone()));
        assert_eq!(state.questions, question::default_questions());
        assert_eq!(state.current_question_index, 0);
        assert_eq!(state.scores, HashMap::from([(host.id.clone(), 0)]));
        assert!(state.player_answers.is_empty());
        assert_eq!(state.host(), Some(&host));
    }

    #[test]
    fn test_join_room_appends_player() {
        let host = player("Ana");
        let guest = player("Bob");
        let room = create_room(&host);

        let joined = join(&room, &guest).unwrap();

        assert!(!joined.is_host);
        assert_eq!(joined.players, vec![host.clone(), guest.clone()]);
        assert_eq!(joined.current_user, Some(guest.clone()));
        assert_eq!(joined.score_of(&guest.id), 0);
        assert_eq!(joined.score_of(&host.id), 0);
        assert_eq!(joined.questions, room.questions);
        assert_eq!(joined.host(), Some(&host));
    }

    #[test]
    fn test_join_room_not_found() {
        let state = GameState::default();
        let result = reduce(
            &state,
            Command::JoinRoom {
                user: player("Bob"),
                room_code: code(),
                existing: None,
            },
            &Rules::default(),
        );
        assert_eq!(result, Err(Error::RoomNotFound(code())));
    }

    #[test]
    fn test_join_room_already_started() {
        let room = create_room(&player("Ana"));
        for screen in [Screen::Game, Screen::Scoreboard, Screen::Welcome] {
            let started = GameState {
                screen,
                ..room.clone()
            };
            assert_eq!(
                join(&started, &player("Bob")),
                Err(Error::GameAlreadyStarted)
            );
        }
    }

    #[test]
    fn test_join_room_name_taken_ignores_case() {
        let room = create_room(&player("Ana"));
        let room = join(&room, &player("Bob")).unwrap();

        assert_eq!(
            join(&room, &player("bob")),
            Err(Error::NameTaken("bob".to_string()))
        );
        assert_eq!(
            join(&room, &player("ANA")),
            Err(Error::NameTaken("ANA".to_string()))
        );
    }

    #[test]
    fn test_join_room_full() {
        let rules = Rules {
            max_players: 2,
            ..Rules::default()
        };
        let room = create_room(&player("Ana"));
        let room = join(&room, &player("Bob")).unwrap();
        let result = reduce(
            &GameState::default(),
            Command::JoinRoom {
                user: player("Cid"),
                room_code: code(),
                existing: Some(Box::new(room)),
            },
            &rules,
        );
        assert_eq!(result, Err(Error::RoomFull));
    }

    #[test]
    fn test_set_questions_replaces() {
        let room = create_room(&player("Ana"));
        let replacement = questions(2);
        let next = apply(&room, Command::SetQuestions(replacement.clone()));
        assert_eq!(next.questions, replacement);
        assert_eq!(next.players, room.players);
    }

    #[test]
    fn test_set_questions_rejects_invalid() {
        let room = create_room(&player("Ana"));
        let mut invalid = questions(1);
        invalid[0].correct_answer_index = 4;
        let result = reduce(&room, Command::SetQuestions(invalid), &Rules::default());
        assert!(matches!(result, Err(Error::InvalidQuestion(_))));
    }

    #[test]
    fn test_start_game_resets_scores_and_answers() {
        for player_count in 1..5 {
            for question_count in 0..4 {
                let mut room = create_room(&player("Host"));
                room.questions = questions(question_count);
                for i in 1..player_count {
                    room = join(&room, &player(&format!("P{i}"))).unwrap();
                }
                room.is_host = true;
                room.scores = room.players.iter().map(|p| (p.id.clone(), 30)).collect();
                room.player_answers.insert(
                    room.players[0].id.clone(),
                    HashMap::from([(QuestionId::from("q1"), 1)]),
                );
                room.current_question_index = 3;

                let started = apply(&room, Command::StartGame);

                assert_eq!(started.screen, Screen::Game);
                assert_eq!(started.current_question_index, 0);
                assert!(started.player_answers.is_empty());
                assert_eq!(started.scores.len(), player_count);
                assert!(started.players.iter().all(|p| started.score_of(&p.id) == 0));
                assert!(
                    started
                        .players
                        .iter()
                        .all(|p| started.scores.contains_key(&p.id))
                );
            }
        }
    }

    #[test]
    fn test_start_game_with_no_players() {
        let started = apply(&GameState::default(), Command::StartGame);
        assert_eq!(started.screen, Screen::Game);
        assert!(started.scores.is_empty());
    }

    #[test]
    fn test_answer_correct_awards_points() {
        let host = player("Ana");
        let state = apply(&create_room(&host), Command::StartGame);

        let answered = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 2,
            },
        );

        assert_eq!(answered.score_of(&host.id), 10);
        assert_eq!(answered.answer_of(&host.id, &QuestionId::from("q1")), Some(2));
    }

    #[test]
    fn test_answer_wrong_records_without_points() {
        let host = player("Ana");
        let state = apply(&create_room(&host), Command::StartGame);

        let answered = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 0,
            },
        );

        assert_eq!(answered.score_of(&host.id), 0);
        assert_eq!(answered.answer_of(&host.id, &QuestionId::from("q1")), Some(0));
    }

    #[test]
    fn test_answer_unknown_question_records_only() {
        let host = player("Ana");
        let state = apply(&create_room(&host), Command::StartGame);

        let answered = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("missing"),
                answer_index: 2,
            },
        );

        assert_eq!(answered.score_of(&host.id), 0);
        assert_eq!(
            answered.answer_of(&host.id, &QuestionId::from("missing")),
            Some(2)
        );
    }

    #[test]
    fn test_answer_twice_overwrites_and_awards_again() {
        let host = player("Ana");
        let mut state = apply(&create_room(&host), Command::StartGame);
        for _ in 0..2 {
            state = apply(
                &state,
                Command::AnswerQuestion {
                    question_id: QuestionId::from("q1"),
                    answer_index: 2,
                },
            );
        }
        assert_eq!(state.score_of(&host.id), 20);

        state = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 3,
            },
        );
        assert_eq!(state.answer_of(&host.id, &QuestionId::from("q1")), Some(3));
        assert_eq!(state.score_of(&host.id), 20);
    }

    #[test]
    fn test_answer_uses_rules_points() {
        let host = player("Ana");
        let state = apply(&create_room(&host), Command::StartGame);
        let rules = Rules {
            points_per_correct: 25,
            ..Rules::default()
        };

        let answered = reduce(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q2"),
                answer_index: 1,
            },
            &rules,
        )
        .unwrap();

        assert_eq!(answered.score_of(&host.id), 25);
    }

    #[test]
    fn test_answer_without_identity() {
        let result = reduce(
            &GameState::default(),
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 2,
            },
            &Rules::default(),
        );
        assert_eq!(result, Err(Error::NoCurrentUser));
    }

    #[test]
    fn test_next_question_advances_then_finishes() {
        for length in 1..6 {
            let mut state = apply(&create_room(&player("Ana")), Command::StartGame);
            state.questions = questions(length);

            for expected in 1..length {
                state = apply(&state, Command::NextQuestion);
                assert_eq!(state.current_question_index, expected);
                assert_eq!(state.screen, Screen::Game);
            }

            state = apply(&state, Command::NextQuestion);
            assert_eq!(state.screen, Screen::Scoreboard);
            assert_eq!(state.current_question_index, length - 1);
        }
    }

    #[test]
    fn test_next_question_host_only() {
        let room = create_room(&player("Ana"));
        let guest = apply(&join(&room, &player("Bob")).unwrap(), Command::StartGame);

        assert_eq!(
            reduce(&guest, Command::NextQuestion, &Rules::default()),
            Err(Error::HostOnly)
        );
    }

    #[test]
    fn test_reset_game() {
        let host = player("Ana");
        let mut state = apply(&create_room(&host), Command::StartGame);
        state = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 2,
            },
        );

        assert_eq!(apply(&state, Command::ResetGame), GameState::default());
    }

    #[test]
    fn test_return_to_lobby() {
        let host = player("Ana");
        let mut state = apply(&create_room(&host), Command::StartGame);
        state = apply(
            &state,
            Command::AnswerQuestion {
                question_id: QuestionId::from("q1"),
                answer_index: 2,
            },
        );
        state = apply(&state, Command::NextQuestion);

        let lobby = apply(&state, Command::ReturnToLobby);

        assert_eq!(lobby.screen, Screen::Lobby);
        assert_eq!(lobby.current_question_index, 0);
        assert!(lobby.scores.is_empty());
        assert!(lobby.player_answers.is_empty());
        assert_eq!(lobby.players, state.players);
        assert_eq!(lobby.questions, state.questions);
        assert!(lobby.is_host);
    }

    #[test]
    fn test_merge_shared_keeps_identity() {
        let host = player("Ana");
        let room = create_room(&host);
        let guest = player("Bob");
        let mut local = join(&room, &guest).unwrap();

        let mut remote = apply(&room, Command::StartGame);
        remote.revision = 4;
        local.merge_shared(remote.clone());

        assert_eq!(local.screen, Screen::Game);
        assert_eq!(local.players, remote.players);
        assert_eq!(local.scores, remote.scores);
        assert_eq!(local.revision, 4);
        assert_eq!(local.current_user, Some(guest));
        assert!(!local.is_host);
    }

    #[test]
    fn test_screen_wire_format() {
        assert_eq!(serde_json::to_string(&Screen::Lobby).unwrap(), "\"LOBBY\"");
        assert_eq!(
            serde_json::from_str::<Screen>("\"SCOREBOARD\"").unwrap(),
            Screen::Scoreboard
        );
        assert_eq!(
            serde_json::from_str::<Screen>("\"CREDITS\"").unwrap(),
            Screen::Welcome
        );
        assert!(serde_json::from_str::<Screen>("3").is_err());
    }

    #[test]
    fn test_game_state_wire_format() {
        let host = player("Ana");
        let state = create_room(&host);
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["screen"], "LOBBY");
        assert_eq!(json["roomCode"], "ROOM42");
        assert_eq!(json["isHost"], true);
        assert_eq!(json["currentQuestionIndex"], 0);
        assert_eq!(json["scores"][host.id.as_str()], 0);

        let back: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_game_state_missing_fields_default() {
        let state: GameState = serde_json::from_str(r#"{"screen":"LOBBY"}"#).unwrap();
        assert_eq!(state.screen, Screen::Lobby);
        assert_eq!(state.revision, 0);
        assert!(state.players.is_empty());
    }

    #[test]
    fn test_rules_validation() {
        assert!(Rules::default().validate().is_ok());
        let rules = Rules {
            points_per_correct: 0,
            ..Rules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::RoomNotFound(code()).to_string(),
            "room ROOM42 not found"
        );
        assert_eq!(
            Error::NameTaken("bob".to_string()).to_string(),
            "player \"bob\" is already in the room"
        );
        assert_eq!(Error::HostOnly.to_string(), "only the host can do this");
    }
}
