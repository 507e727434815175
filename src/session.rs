//! One participant's session
//!
//! A [`Session`] stands for one browser tab. It owns the local
//! [`GameState`], turns user actions into reducer commands, persists every
//! accepted change to the shared [`RoomStore`] and picks up the changes
//! made by other sessions through its [`SyncListener`].
//!
//! Actions never roll back on storage failures: the local state always
//! reflects the last accepted command, whether or not it reached storage.
//! The revision is the exception, as it counts persisted writes only.

use tracing::{debug, warn};

use crate::{
    config::Config,
    game::{self, Command, Error, GameState},
    player::Player,
    question::{self, Question, QuestionId},
    room_code::RoomCode,
    screens::{Router, ScreenView},
    store::{RoomStore, Storage},
    sync::SyncListener,
};

/// A participant's view of a room, kept in step with other sessions
#[derive(Debug)]
pub struct Session<S> {
    state: GameState,
    store: RoomStore<S>,
    listener: SyncListener,
    config: Config,
    router: Router,
}

impl<S: Storage> Session<S> {
    /// Opens a session on `storage` and starts listening for room changes
    pub fn new(storage: S, config: Config) -> Self {
        let store = RoomStore::new(storage, config.sentinel_key.clone());
        let listener = SyncListener::start(&store);
        Self {
            state: GameState::default(),
            store,
            listener,
            config,
            router: Router::new(),
        }
    }

    /// The local state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The options the session runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The room store the session persists to
    pub fn store(&self) -> &RoomStore<S> {
        &self.store
    }

    /// Renders the screen the session is on
    pub fn view(&self) -> ScreenView {
        self.router.render(&self.state)
    }

    /// Applies changes made to the room by other sessions
    ///
    /// Returns `true` if the local state changed.
    pub fn sync(&mut self) -> bool {
        self.listener.poll(&mut self.state, &self.store)
    }

    /// Stops picking up changes from other sessions
    pub fn stop_sync(&mut self) {
        self.listener.stop();
    }

    fn dispatch(&mut self, action: &'static str, command: Command) -> Result<(), Error> {
        let mut next = game::reduce(&self.state, command, &self.config.rules)?;

        // The revision only moves when the snapshot reaches storage, so
        // later writes from other sessions still compare as newer.
        if let Some(room) = &next.room_code {
            let applied = next.revision;
            next.revision = self.store.next_revision(room, applied);
            if let Err(err) = self.store.try_put(room, &next) {
                warn!(%room, error = %err, "failed to persist room; keeping local change");
                next.revision = applied;
            }
        }

        debug!(
            action,
            room = ?next.room_code.as_ref().map(RoomCode::as_str),
            screen = %next.screen,
            revision = next.revision,
            "command applied"
        );
        self.state = next;
        Ok(())
    }

    /// Opens a new room with `user` as host
    ///
    /// # Errors
    ///
    /// Creating a room is always accepted; the `Result` matches the other
    /// actions.
    pub fn create_room(&mut self, user: Player) -> Result<(), Error> {
        self.dispatch(
            "create_room",
            Command::CreateRoom {
                user,
                room_code: RoomCode::new(),
            },
        )
    }

    /// Joins the room identified by `code` as typed by the user
    ///
    /// # Errors
    ///
    /// * `Error::InvalidRoomCode` - `code` is not a well-formed room code
    /// * `Error::RoomNotFound` - no room is stored under `code`
    /// * `Error::GameAlreadyStarted` - the room has left its lobby
    /// * `Error::NameTaken` - a player in the room has the same name
    /// * `Error::RoomFull` - the room has reached its player limit
    pub fn join_room(&mut self, user: Player, code: &str) -> Result<(), Error> {
        let room_code: RoomCode = code.parse()?;
        let existing = self.store.get(&room_code).map(Box::new);
        self.dispatch(
            "join_room",
            Command::JoinRoom {
                user,
                room_code,
                existing,
            },
        )
    }

    /// Replaces the room's question set
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuestion` if the set does not validate.
    pub fn set_questions(&mut self, questions: Vec<Question>) -> Result<(), Error> {
        self.dispatch("set_questions", Command::SetQuestions(questions))
    }

    /// Adds `question`, or replaces the question with the same identifier
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuestion` if the resulting set does not
    /// validate.
    pub fn save_question(&mut self, question: Question) -> Result<(), Error> {
        let questions = question::save_question(&self.state.questions, question);
        self.set_questions(questions)
    }

    /// Removes the question identified by `id`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidQuestion` if the remaining set does not
    /// validate.
    pub fn delete_question(&mut self, id: &QuestionId) -> Result<(), Error> {
        let questions = question::delete_question(&self.state.questions, id);
        self.set_questions(questions)
    }

    /// Starts playing from the first question
    ///
    /// # Errors
    ///
    /// Starting is always accepted; the `Result` matches the other actions.
    pub fn start_game(&mut self) -> Result<(), Error> {
        self.dispatch("start_game", Command::StartGame)
    }

    /// Records the local player's answer
    ///
    /// # Errors
    ///
    /// Returns `Error::NoCurrentUser` outside of a room.
    pub fn answer_question(
        &mut self,
        question_id: QuestionId,
        answer_index: usize,
    ) -> Result<(), Error> {
        self.dispatch(
            "answer_question",
            Command::AnswerQuestion {
                question_id,
                answer_index,
            },
        )
    }

    /// Moves to the next question, or to the scoreboard after the last one
    ///
    /// # Errors
    ///
    /// Returns `Error::HostOnly` if the session is not the host's.
    pub fn next_question(&mut self) -> Result<(), Error> {
        self.dispatch("next_question", Command::NextQuestion)
    }

    /// Leaves the room and deletes it from storage
    ///
    /// # Errors
    ///
    /// Resetting is always accepted; the `Result` matches the other actions.
    pub fn reset_game(&mut self) -> Result<(), Error> {
        let room = self.state.room_code.clone();
        self.dispatch("reset_game", Command::ResetGame)?;
        if let Some(room) = room {
            self.store.remove(&room);
        }
        Ok(())
    }

    /// Brings the room back to the lobby, keeping players and questions
    ///
    /// # Errors
    ///
    /// Returning is always accepted; the `Result` matches the other actions.
    pub fn return_to_lobby(&mut self) -> Result<(), Error> {
        self.dispatch("return_to_lobby", Command::ReturnToLobby)
    }
}
