//! Comprehension quiz shown after the titration.
//!
//! Answers are graded by keyword containment: the trimmed, lower-cased answer is
//! correct if it contains any of the question's keywords as a substring. This is
//! intentionally crude. Short numeric keywords such as `"20"` also match
//! unrelated answers like `"120"`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Rejection;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizBankError {
    #[error("a quiz needs at least one question")]
    Empty,

    #[error("question {index} has no usable keywords")]
    NoKeywords { index: usize },
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    prompt: String,
    hint: String,
    keywords: Vec<String>,
}

impl Question {
    /// Keywords are stored trimmed and lower-cased; blank ones are dropped.
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        hint: impl Into<String>,
        keywords: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            hint: hint.into(),
            keywords: keywords
                .into_iter()
                .map(|keyword| normalize_answer(keyword.as_ref()))
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn accepts(&self, answer: &str) -> bool {
        let normalized = normalize_answer(answer);
        self.keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()))
    }
}

/// Ordered, non-empty list of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// # Errors
    ///
    /// Returns `QuizBankError::Empty` for an empty list and
    /// `QuizBankError::NoKeywords` if a question could never be answered.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizBankError> {
        if questions.is_empty() {
            return Err(QuizBankError::Empty);
        }
        if let Some(index) = questions.iter().position(|q| q.keywords.is_empty()) {
            return Err(QuizBankError::NoKeywords { index });
        }
        Ok(Self { questions })
    }

    /// The three questions asked after the neutralization experiment.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            questions: vec![
                Question::new(
                    "The 'Fast Stream' button became disabled near 8mL. Why is it important \
                     to switch to 'Drop-wise' near the end?",
                    "What happens if you add the alkali too fast?",
                    ["overshoot", "miss", "accurate", "precision", "precise", "careful"],
                ),
                Question::new(
                    "Look at the Ion Tracker. At pH 7 (Neutral), what was the relationship \
                     between H+ and OH- ions?",
                    "Were there more of one, or were they balanced?",
                    ["equal", "same", "balanced"],
                ),
                Question::new(
                    "It took 10mL of Alkali to neutralize 10mL of Acid. If we had started \
                     with 20mL of Acid, how much Alkali would we need?",
                    "Double the acid means you need double the...",
                    ["20", "20ml", "double"],
                ),
            ],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::standard()
    }
}

#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

pub const SUCCESS_MESSAGE: &str = "Correct! Great job!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedbackKind {
    #[default]
    None,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    #[must_use]
    pub fn success() -> Self {
        Self {
            kind: FeedbackKind::Success,
            message: SUCCESS_MESSAGE.to_owned(),
        }
    }

    #[must_use]
    pub fn hint(hint: &str) -> Self {
        Self {
            kind: FeedbackKind::Error,
            message: format!("Try again. Hint: {hint}"),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.kind == FeedbackKind::None
    }
}

/// What the grader told the learner about one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub correct: bool,
    pub message: String,
}

/// Where the quiz went after the success interval ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAdvance {
    NextQuestion(usize),
    Finished,
}

//
// ─── QUIZ STATE ────────────────────────────────────────────────────────────────
//

/// Progress through the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuizState {
    question_index: usize,
    answer_text: String,
    feedback: Feedback,
    locked: bool,
}

impl QuizState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    #[must_use]
    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    /// True while success feedback is on screen; the answer is read-only then.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    #[must_use]
    pub fn is_on_last_question(&self, bank: &QuestionBank) -> bool {
        self.question_index >= bank.last_index()
    }

    /// Update the answer buffer. Ignored while locked.
    pub fn set_answer_text(&mut self, text: impl Into<String>) {
        if !self.locked {
            self.answer_text = text.into();
        }
    }

    /// Grade `text` against the current question.
    ///
    /// A correct answer locks the input until `advance` is called. A wrong answer
    /// shows the hint and clears the input so the learner can retry.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::AnswerLocked` during the success interval and
    /// `Rejection::EmptyAnswer` for blank input.
    pub fn submit_answer(
        &mut self,
        bank: &QuestionBank,
        text: &str,
    ) -> Result<GradeOutcome, Rejection> {
        if self.locked {
            return Err(Rejection::AnswerLocked);
        }
        if text.trim().is_empty() {
            return Err(Rejection::EmptyAnswer);
        }
        let Some(question) = bank.get(self.question_index) else {
            return Err(Rejection::AnswerLocked);
        };

        if question.accepts(text) {
            self.answer_text = text.to_owned();
            self.feedback = Feedback::success();
            self.locked = true;
        } else {
            self.answer_text.clear();
            self.feedback = Feedback::hint(question.hint());
        }

        Ok(GradeOutcome {
            correct: self.locked,
            message: self.feedback.message.clone(),
        })
    }

    /// Leave the success interval: move to the next question, or report that the
    /// last one has been answered.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::QuizUnfinished` unless the current question has been
    /// answered correctly.
    pub fn advance(&mut self, bank: &QuestionBank) -> Result<QuizAdvance, Rejection> {
        if !self.locked {
            return Err(Rejection::QuizUnfinished);
        }
        if self.is_on_last_question(bank) {
            return Ok(QuizAdvance::Finished);
        }
        self.question_index += 1;
        self.answer_text.clear();
        self.feedback = Feedback::default();
        self.locked = false;
        Ok(QuizAdvance::NextQuestion(self.question_index))
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
