use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tracing::{debug, info};

use lab_core::model::{
    ExperimentSession, Generation, LabSettings, LabSettingsDraft, Rejection, Stage,
    TitrantReading,
};
use lab_core::quiz::{GradeOutcome, Question, QuestionBank, QuizAdvance, QuizState};
use lab_core::titration::TitrantStep;

use super::deferred::{DeferredEffect, DeferredQueue, ScheduledEffect};
use super::view::LabSnapshot;
use crate::Clock;
use crate::error::LabError;

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Owns one learner's lab: the experiment, the quiz, and pending deferred effects.
///
/// All operations are synchronous. Actions that are not legal in the current
/// stage return `Err(Rejection)` and leave everything untouched; presentation
/// code may ignore those results. Deferred effects only run through `tick`.
pub struct LabService {
    clock: Clock,
    settings: LabSettings,
    bank: QuestionBank,
    session: ExperimentSession,
    quiz: QuizState,
    generation: Generation,
    deferred: DeferredQueue,
    shaking: bool,
    celebrating: bool,
}

impl LabService {
    #[must_use]
    pub fn new(clock: Clock, settings: LabSettings) -> Self {
        Self {
            clock,
            settings,
            bank: QuestionBank::standard(),
            session: ExperimentSession::new(),
            quiz: QuizState::new(),
            generation: Generation::default(),
            deferred: DeferredQueue::new(),
            shaking: false,
            celebrating: false,
        }
    }

    /// Build a service from unvalidated settings.
    ///
    /// # Errors
    ///
    /// Returns `LabError::Settings` if a delay is out of range.
    pub fn from_draft(clock: Clock, draft: LabSettingsDraft) -> Result<Self, LabError> {
        Ok(Self::new(clock, draft.validate()?))
    }

    /// Replace the standard questions.
    ///
    /// # Errors
    ///
    /// Returns `LabError::QuizBank` for an empty or unanswerable question list.
    pub fn with_questions(mut self, questions: Vec<Question>) -> Result<Self, LabError> {
        self.bank = QuestionBank::new(questions)?;
        Ok(self)
    }

    #[must_use]
    pub fn session(&self) -> &ExperimentSession {
        &self.session
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizState {
        &self.quiz
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn settings(&self) -> &LabSettings {
        &self.settings
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.session.stage()
    }

    #[must_use]
    pub fn is_shaking(&self) -> bool {
        self.shaking
    }

    #[must_use]
    pub fn is_celebrating(&self) -> bool {
        self.celebrating
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.bank.get(self.quiz.question_index())
    }

    /// Earliest deadline among pending deferred effects.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.deferred.next_due()
    }

    /// Time left until `deadline` according to the service clock.
    #[must_use]
    pub fn time_until(&self, deadline: DateTime<Utc>) -> Duration {
        (deadline - self.clock.now()).max(Duration::zero())
    }

    #[must_use]
    pub fn snapshot(&self) -> LabSnapshot {
        LabSnapshot::capture(self)
    }

    //
    // ─── ACTIONS ───────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns a `Rejection` when the prediction is missing or the experiment has started.
    pub fn submit_prediction(&mut self, raw: &str) -> Result<Stage, Rejection> {
        let from = self.stage();
        let result = self.session.submit_prediction(raw);
        self.log_transition("submit_prediction", from, &result);
        result
    }

    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` unless the experiment has just started.
    pub fn add_acid(&mut self) -> Result<Stage, Rejection> {
        let from = self.stage();
        let result = self.session.add_acid();
        self.log_transition("add_acid", from, &result);
        result
    }

    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` unless acid is in the beaker without indicator.
    pub fn add_indicator(&mut self) -> Result<Stage, Rejection> {
        let from = self.stage();
        let result = self.session.add_indicator();
        self.log_transition("add_indicator", from, &result);
        result
    }

    /// Deliver titrant, start the swirl, and celebrate the first neutral reading.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` for the wrong stage, a full syringe, or a fast stream
    /// inside the critical zone.
    pub fn add_titrant(&mut self, step: TitrantStep) -> Result<TitrantReading, Rejection> {
        let from = self.stage();
        let reading = match self.session.add_titrant(step) {
            Ok(reading) => reading,
            Err(rejection) => {
                debug!(stage = %from, ?step, %rejection, "titrant addition ignored");
                return Err(rejection);
            }
        };

        if from != reading.stage {
            info!(from = %from, to = %reading.stage, "stage changed");
        }
        debug!(
            volume_ml = reading.sample.volume_ml,
            ph = reading.sample.ph,
            "titrant added"
        );

        self.shaking = true;
        self.schedule(DeferredEffect::StopShake, self.settings.shake_delay());

        if reading.first_neutral {
            info!(volume_ml = reading.sample.volume_ml, "neutral point reached");
            self.celebrating = true;
            self.schedule(
                DeferredEffect::DismissCelebration,
                self.settings.celebration_delay(),
            );
        }

        Ok(reading)
    }

    /// # Errors
    ///
    /// Returns `Rejection::NotNeutralized` before neutrality or `WrongStage` outside titration.
    pub fn advance_to_quiz(&mut self) -> Result<Stage, Rejection> {
        let from = self.stage();
        let result = self.session.advance_to_quiz();
        self.log_transition("advance_to_quiz", from, &result);
        result
    }

    /// Mirror the learner's typing into the answer buffer.
    ///
    /// Ignored outside the quiz and while the input is locked.
    pub fn set_answer_text(&mut self, text: impl Into<String>) {
        if self.session.ensure_answering().is_ok() {
            self.quiz.set_answer_text(text);
        }
    }

    /// Grade an answer to the current question.
    ///
    /// A correct answer locks the input and schedules the move to the next
    /// question (or to `Completed`) after the quiz advance delay.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` outside the quiz, for blank input, or while locked.
    pub fn submit_answer(&mut self, text: &str) -> Result<GradeOutcome, Rejection> {
        let stage = self.stage();
        let result = self
            .session
            .ensure_answering()
            .and_then(|()| self.quiz.submit_answer(&self.bank, text));

        match &result {
            Ok(outcome) if outcome.correct => {
                info!(question = self.quiz.question_index(), "answer accepted");
                self.celebrating = true;
                self.schedule(
                    DeferredEffect::AdvanceQuiz,
                    self.settings.quiz_advance_delay(),
                );
            }
            Ok(_) => debug!(question = self.quiz.question_index(), "answer rejected"),
            Err(rejection) => debug!(%stage, %rejection, "answer ignored"),
        }
        result
    }

    /// Throw everything away and start a new generation.
    ///
    /// Pending deferred effects belong to the old generation and will never run.
    pub fn reset(&mut self) {
        let dropped = self.deferred.len();
        self.session.reset();
        self.quiz.reset();
        self.deferred.clear();
        self.shaking = false;
        self.celebrating = false;
        self.generation = self.generation.next();
        info!(generation = %self.generation, dropped, "lab reset");
    }

    //
    // ─── DEFERRED EFFECTS ──────────────────────────────────────────────────────
    //

    /// Run every deferred effect that is due according to the service clock.
    pub fn tick(&mut self) -> Vec<DeferredEffect> {
        let now = self.clock.now();
        self.tick_at(now)
    }

    /// Run every deferred effect due at `now`. Returns the effects that were applied.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<DeferredEffect> {
        let due = self.deferred.take_due(now, self.generation);
        if due.stale > 0 {
            debug!(stale = due.stale, "dropped deferred effects from an earlier generation");
        }
        for effect in &due.current {
            self.apply_effect(*effect);
        }
        due.current
    }

    fn apply_effect(&mut self, effect: DeferredEffect) {
        match effect {
            DeferredEffect::StopShake => self.shaking = false,
            DeferredEffect::DismissCelebration => self.celebrating = false,
            DeferredEffect::AdvanceQuiz => {
                self.celebrating = false;
                match self.quiz.advance(&self.bank) {
                    Ok(QuizAdvance::NextQuestion(index)) => {
                        debug!(question = index, "next question");
                    }
                    Ok(QuizAdvance::Finished) => {
                        let from = self.stage();
                        let result = self.session.complete_quiz(true);
                        self.log_transition("complete_quiz", from, &result);
                    }
                    Err(rejection) => debug!(%rejection, "quiz advance ignored"),
                }
            }
        }
    }

    fn schedule(&mut self, effect: DeferredEffect, delay: Duration) {
        self.deferred.schedule(ScheduledEffect {
            generation: self.generation,
            due_at: self.clock.deadline_after(delay),
            effect,
        });
    }

    fn log_transition(&self, action: &'static str, from: Stage, result: &Result<Stage, Rejection>) {
        match result {
            Ok(to) => info!(action, from = %from, to = %to, "stage changed"),
            Err(rejection) => debug!(action, stage = %from, %rejection, "action ignored"),
        }
    }
}

impl fmt::Debug for LabService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabService")
            .field("stage", &self.session.stage())
            .field("titrant_added_ml", &self.session.titrant_added_ml())
            .field("question_index", &self.quiz.question_index())
            .field("generation", &self.generation)
            .field("pending_effects", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use lab_core::quiz::FeedbackKind;
    use lab_core::time::{fixed_clock, fixed_now};

    fn service() -> LabService {
        LabService::new(fixed_clock(), LabSettings::default())
    }

    fn after(ms: i64) -> DateTime<Utc> {
        fixed_now() + Duration::milliseconds(ms)
    }

    fn titrating() -> LabService {
        let mut lab = service();
        lab.submit_prediction("10").unwrap();
        lab.add_acid().unwrap();
        lab.add_indicator().unwrap();
        lab
    }

    fn neutralized() -> LabService {
        let mut lab = titrating();
        for _ in 0..8 {
            lab.add_titrant(TitrantStep::FastStream).unwrap();
        }
        for _ in 0..20 {
            lab.add_titrant(TitrantStep::Dropwise).unwrap();
        }
        lab
    }

    #[test]
    fn titrant_addition_shakes_until_delay_elapses() {
        let mut lab = titrating();
        lab.add_titrant(TitrantStep::FastStream).unwrap();
        assert!(lab.is_shaking());

        assert!(lab.tick_at(after(499)).is_empty());
        assert!(lab.is_shaking());

        assert_eq!(lab.tick_at(after(500)), vec![DeferredEffect::StopShake]);
        assert!(!lab.is_shaking());
    }

    #[test]
    fn first_neutral_reading_celebrates_once() {
        let mut lab = neutralized();
        assert!(lab.session().neutral_reached());
        assert!(lab.is_celebrating());

        lab.tick_at(after(2_000));
        assert!(!lab.is_celebrating());

        lab.add_titrant(TitrantStep::Dropwise).unwrap();
        assert!(!lab.is_celebrating());
    }

    #[test]
    fn correct_answer_locks_then_advances_after_delay() {
        let mut lab = neutralized();
        lab.advance_to_quiz().unwrap();

        let outcome = lab.submit_answer("You might overshoot").unwrap();
        assert!(outcome.correct);
        assert!(lab.quiz().is_locked());
        assert_eq!(lab.submit_answer("careful"), Err(Rejection::AnswerLocked));

        lab.tick_at(after(2_499));
        assert_eq!(lab.quiz().question_index(), 0);

        lab.tick_at(after(2_500));
        assert_eq!(lab.quiz().question_index(), 1);
        assert!(!lab.quiz().is_locked());
        assert_eq!(lab.quiz().feedback().kind, FeedbackKind::None);
        assert!(!lab.is_celebrating());
    }

    #[test]
    fn wrong_answer_keeps_question_and_shows_hint() {
        let mut lab = neutralized();
        lab.advance_to_quiz().unwrap();
        lab.set_answer_text("faster is better");

        let outcome = lab.submit_answer("faster is better").unwrap();
        assert!(!outcome.correct);
        assert_eq!(
            outcome.message,
            "Try again. Hint: What happens if you add the alkali too fast?"
        );
        assert_eq!(lab.quiz().answer_text(), "");
        assert!(!lab.deferred.is_pending(DeferredEffect::AdvanceQuiz));
    }

    #[test]
    fn answers_outside_the_quiz_are_ignored() {
        let mut lab = titrating();
        assert!(matches!(
            lab.submit_answer("balanced"),
            Err(Rejection::WrongStage { .. })
        ));
        lab.set_answer_text("typed early");
        assert_eq!(lab.quiz().answer_text(), "");
    }

    #[test]
    fn last_correct_answer_completes_the_lab() {
        let mut lab = neutralized();
        lab.advance_to_quiz().unwrap();
        let mut now = 0;
        for answer in ["precise", "equal", "double"] {
            assert!(lab.submit_answer(answer).unwrap().correct);
            now += 2_500;
            lab.tick_at(after(now));
        }
        assert_eq!(lab.stage(), Stage::Completed);
        assert_eq!(lab.quiz().question_index(), 2);
    }

    #[test]
    fn reset_mid_delay_cancels_pending_advance() {
        let mut lab = neutralized();
        lab.advance_to_quiz().unwrap();
        lab.submit_answer("careful").unwrap();
        let before = lab.generation();

        lab.reset();
        assert_eq!(lab.generation(), before.next());
        assert!(lab.next_deadline().is_none());

        assert!(lab.tick_at(after(10_000)).is_empty());
        assert_eq!(lab.stage(), Stage::Prediction);
        assert_eq!(lab.quiz().question_index(), 0);
        assert!(!lab.is_celebrating());
        assert!(!lab.is_shaking());
    }

    #[test]
    fn reset_restores_initial_observable_state() {
        let mut lab = neutralized();
        lab.advance_to_quiz().unwrap();
        lab.reset();

        let session = lab.session();
        assert_eq!(session.stage(), Stage::Prediction);
        assert_eq!(session.titrant_added_ml(), 0.0);
        assert_eq!(session.history().len(), 1);
        assert!(!session.neutral_reached());
        assert_eq!(lab.quiz().question_index(), 0);
        assert!(lab.quiz().feedback().is_none());
    }

    #[test]
    fn invalid_settings_are_reported() {
        let draft = LabSettingsDraft {
            celebration_ms: Some(0),
            ..LabSettingsDraft::default()
        };
        let err = LabService::from_draft(fixed_clock(), draft).unwrap_err();
        assert!(matches!(err, LabError::Settings(_)));
    }

    #[test]
    fn custom_question_bank_replaces_standard_one() {
        let lab = service()
            .with_questions(vec![Question::new("Colour at pH 7?", "Think grass.", ["green"])])
            .unwrap();
        assert_eq!(lab.questions().len(), 1);
        assert_eq!(lab.current_question().unwrap().prompt(), "Colour at pH 7?");

        let err = service().with_questions(Vec::new()).unwrap_err();
        assert!(matches!(err, LabError::QuizBank(_)));
    }
}
