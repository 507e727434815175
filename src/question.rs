//! Questions and question-set editing
//!
//! Every question offers exactly four options, one of which is correct.
//! The host edits the question set in the lobby; the helpers here implement
//! the add, replace and delete operations the lobby offers on top of the
//! wholesale `SetQuestions` command.

use std::{collections::HashSet, fmt::Display};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    constants::question::{MAX_COUNT, MAX_OPTION_LENGTH, MAX_TEXT_LENGTH, OPTION_COUNT},
    epoch_millis,
};

/// A unique identifier for a question
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new identifier from the current time
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().as_u64_pair().1 as u32;
        Self(format!("q{}_{suffix:08x}", epoch_millis()))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type ValidationResult = garde::Result;

fn validate_not_blank(val: &str) -> ValidationResult {
    if val.trim().is_empty() {
        Err(garde::Error::new("cannot be blank"))
    } else {
        Ok(())
    }
}

fn validate_answer_index(val: usize) -> ValidationResult {
    if val < OPTION_COUNT {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "must point at one of the {OPTION_COUNT} options"
        )))
    }
}

/// A multiple choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within the room
    #[garde(skip)]
    pub id: QuestionId,
    /// The question text shown to players
    #[garde(custom(|v, _| validate_not_blank(v)), length(max = MAX_TEXT_LENGTH))]
    pub text: String,
    /// The answer options, in display order
    #[garde(inner(custom(|v, _| validate_not_blank(v)), length(max = MAX_OPTION_LENGTH)))]
    pub options: [String; OPTION_COUNT],
    /// Index into `options` of the correct answer
    #[garde(custom(|v: &usize, _| validate_answer_index(*v)))]
    pub correct_answer_index: usize,
}

impl Question {
    /// Whether `answer_index` is the correct option
    pub fn is_correct(&self, answer_index: usize) -> bool {
        self.correct_answer_index == answer_index
    }

    /// Returns a copy of this question with the draft's content
    ///
    /// The identifier is kept so that saving the result replaces this
    /// question in its set.
    pub fn edited(&self, draft: QuestionDraft) -> Self {
        draft.into_question(self.id.clone())
    }
}

/// The editable content of a question, before it has an identifier
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    /// The question text
    pub text: String,
    /// The answer options
    pub options: [String; OPTION_COUNT],
    /// Index of the correct option
    pub correct_answer_index: usize,
}

impl QuestionDraft {
    /// Turns the draft into a new question with a fresh identifier
    pub fn build(self) -> Question {
        self.into_question(QuestionId::generate())
    }

    fn into_question(self, id: QuestionId) -> Question {
        Question {
            id,
            text: self.text,
            options: self.options,
            correct_answer_index: self.correct_answer_index,
        }
    }
}

/// Errors that can occur when validating a question set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionError {
    /// A question failed field validation
    #[error("question {id} is invalid: {report}")]
    Invalid {
        /// The offending question
        id: QuestionId,
        /// Human readable validation report
        report: String,
    },
    /// Two questions share the same identifier
    #[error("question id {0} is used more than once")]
    DuplicateId(QuestionId),
    /// The set holds more questions than allowed
    #[error("a room can hold at most {MAX_COUNT} questions")]
    TooMany,
}

/// Validates a whole question set
///
/// # Errors
///
/// Returns the first problem found: too many questions, a duplicated
/// identifier, or a question failing field validation.
pub fn validate_questions(questions: &[Question]) -> Result<(), QuestionError> {
    if questions.len() > MAX_COUNT {
        return Err(QuestionError::TooMany);
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = questions.iter().find(|q| !seen.insert(&q.id)) {
        return Err(QuestionError::DuplicateId(duplicate.id.clone()));
    }

    questions.iter().try_for_each(|q| {
        q.validate().map_err(|report| QuestionError::Invalid {
            id: q.id.clone(),
            report: report.to_string(),
        })
    })
}

/// Returns the set with `question` saved into it
///
/// A question with a matching identifier is replaced in place; otherwise
/// the question is appended.
pub fn save_question(questions: &[Question], question: Question) -> Vec<Question> {
    let mut questions = questions.to_vec();
    match questions.iter().position(|q| q.id == question.id) {
        Some(index) => questions[index] = question,
        None => questions.push(question),
    }
    questions
}

/// Returns the set without the question identified by `id`
pub fn delete_question(questions: &[Question], id: &QuestionId) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| &q.id != id)
        .cloned()
        .collect_vec()
}

/// The question set every new room starts with
pub fn default_questions() -> Vec<Question> {
    fn question(id: &str, text: &str, options: [&str; OPTION_COUNT], correct: usize) -> Question {
        Question {
            id: QuestionId::from(id),
            text: text.to_owned(),
            options: options.map(str::to_owned),
            correct_answer_index: correct,
        }
    }

    vec![
        question(
            "q1",
            "What is the capital of France?",
            ["Berlin", "Madrid", "Paris", "Rome"],
            2,
        ),
        question(
            "q2",
            "Which planet is known as the Red Planet?",
            ["Earth", "Mars", "Jupiter", "Venus"],
            1,
        ),
        question(
            "q3",
            "What is the largest mammal in the world?",
            ["Elephant", "Blue Whale", "Great White Shark", "Giraffe"],
            1,
        ),
        question(
            "q4",
            "Who wrote the play \"Romeo and Juliet\"?",
            [
                "Charles Dickens",
                "William Shakespeare",
                "Mark Twain",
                "Jane Austen",
            ],
            1,
        ),
    ]
}
