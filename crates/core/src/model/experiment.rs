use serde::{Deserialize, Serialize};

use crate::model::stage::{Guards, Rejection, Stage, Trigger};
use crate::titration::{
    INITIAL_PH, MAX_TITRANT_ML, TitrantStep, compute_ph, fast_stream_allowed, is_neutral, round2,
};

//
// ─── SAMPLES ───────────────────────────────────────────────────────────────────
//

/// One point on the titration curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhSample {
    pub volume_ml: f64,
    pub ph: f64,
}

impl PhSample {
    #[must_use]
    pub fn new(volume_ml: f64, ph: f64) -> Self {
        Self { volume_ml, ph }
    }

    #[must_use]
    pub fn baseline() -> Self {
        Self::new(0.0, INITIAL_PH)
    }
}

/// Result of an accepted titrant addition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitrantReading {
    pub sample: PhSample,
    pub stage: Stage,
    /// True only for the addition that first brought the solution to neutral.
    pub first_neutral: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The single live experiment for a learner.
///
/// Every operation either applies completely or returns a `Rejection` and leaves
/// the session untouched. Rejections are informational; callers are free to
/// ignore them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentSession {
    stage: Stage,
    predicted_volume_ml: Option<f64>,
    titrant_added_ml: f64,
    current_ph: f64,
    history: Vec<PhSample>,
    neutral_reached: bool,
    neutralized_at_ml: Option<f64>,
}

impl Default for ExperimentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Prediction,
            predicted_volume_ml: None,
            titrant_added_ml: 0.0,
            current_ph: INITIAL_PH,
            history: vec![PhSample::baseline()],
            neutral_reached: false,
            neutralized_at_ml: None,
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn predicted_volume_ml(&self) -> Option<f64> {
        self.predicted_volume_ml
    }

    #[must_use]
    pub fn titrant_added_ml(&self) -> f64 {
        self.titrant_added_ml
    }

    #[must_use]
    pub fn current_ph(&self) -> f64 {
        self.current_ph
    }

    /// Every accepted addition in order, starting with the `(0, 1.0)` baseline.
    #[must_use]
    pub fn history(&self) -> &[PhSample] {
        &self.history
    }

    #[must_use]
    pub fn neutral_reached(&self) -> bool {
        self.neutral_reached
    }

    /// Volume at which the solution first became neutral.
    #[must_use]
    pub fn neutralized_at_ml(&self) -> Option<f64> {
        self.neutralized_at_ml
    }

    /// Signed difference between the prediction and the measured neutralization volume.
    #[must_use]
    pub fn prediction_error_ml(&self) -> Option<f64> {
        let predicted = self.predicted_volume_ml?;
        let actual = self.neutralized_at_ml?;
        Some(round2(predicted - actual))
    }

    fn guards(&self) -> Guards {
        Guards {
            prediction_present: self.predicted_volume_ml.is_some(),
            neutral_reached: self.neutral_reached,
            last_question_answered: false,
        }
    }

    fn apply(&mut self, trigger: Trigger, guards: Guards) -> Result<Stage, Rejection> {
        let next = self.stage.transition(trigger, guards)?;
        self.stage = next;
        Ok(next)
    }

    /// Record the learner's guess and start the experiment.
    ///
    /// `raw` is the text of a numeric input. Blank, non-numeric, negative or
    /// non-finite input counts as no prediction.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` outside `Prediction` and
    /// `Rejection::MissingPrediction` when `raw` holds no usable number.
    pub fn submit_prediction(&mut self, raw: &str) -> Result<Stage, Rejection> {
        let parsed = parse_prediction(raw);
        let guards = Guards {
            prediction_present: parsed.is_some(),
            ..self.guards()
        };
        let next = self.apply(Trigger::SubmitPrediction, guards)?;
        self.predicted_volume_ml = parsed;
        Ok(next)
    }

    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` unless the experiment has just started.
    pub fn add_acid(&mut self) -> Result<Stage, Rejection> {
        self.apply(Trigger::AddAcid, self.guards())
    }

    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` unless acid is in the beaker without indicator.
    pub fn add_indicator(&mut self) -> Result<Stage, Rejection> {
        self.apply(Trigger::AddIndicator, self.guards())
    }

    /// Deliver titrant and record the new reading.
    ///
    /// The first addition after the indicator moves the experiment to `Running`.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` outside `IndicatorAdded`/`Running`,
    /// `Rejection::CapacityExceeded` if the syringe would go past `MAX_TITRANT_ML`,
    /// and `Rejection::CriticalZone` for a fast stream near the equivalence point.
    pub fn add_titrant(&mut self, step: TitrantStep) -> Result<TitrantReading, Rejection> {
        let next_stage = self.stage.transition(Trigger::AddTitrant, self.guards())?;

        let volume_ml = round2(self.titrant_added_ml + step.amount_ml());
        if volume_ml > MAX_TITRANT_ML {
            return Err(Rejection::CapacityExceeded);
        }
        if step == TitrantStep::FastStream && !fast_stream_allowed(self.titrant_added_ml) {
            return Err(Rejection::CriticalZone);
        }

        let ph = compute_ph(volume_ml);
        let sample = PhSample::new(volume_ml, ph);

        self.stage = next_stage;
        self.titrant_added_ml = volume_ml;
        self.current_ph = ph;
        self.history.push(sample);

        let first_neutral = is_neutral(ph) && !self.neutral_reached;
        if first_neutral {
            self.neutral_reached = true;
            self.neutralized_at_ml = Some(volume_ml);
        }

        Ok(TitrantReading {
            sample,
            stage: next_stage,
            first_neutral,
        })
    }

    /// # Errors
    ///
    /// Returns `Rejection::NotNeutralized` until the solution has been neutral at
    /// least once, or `Rejection::WrongStage` outside the titration stages.
    pub fn advance_to_quiz(&mut self) -> Result<Stage, Rejection> {
        self.apply(Trigger::AdvanceToQuiz, self.guards())
    }

    /// Check that the quiz is open for answers. Never changes state.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` outside `Quiz`.
    pub fn ensure_answering(&self) -> Result<(), Rejection> {
        self.stage
            .transition(Trigger::SubmitAnswer, self.guards())
            .map(|_| ())
    }

    /// Move to the terminal stage once the quiz reports its last answer.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::QuizUnfinished` if `last_question_answered` is false,
    /// or `Rejection::WrongStage` outside `Quiz`.
    pub fn complete_quiz(&mut self, last_question_answered: bool) -> Result<Stage, Rejection> {
        let guards = Guards {
            last_question_answered,
            ..self.guards()
        };
        self.apply(Trigger::CompleteQuiz, guards)
    }

    /// Start over from an empty beaker.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn parse_prediction(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn ready_session() -> ExperimentSession {
        let mut session = ExperimentSession::new();
        session.submit_prediction("10").unwrap();
        session.add_acid().unwrap();
        session.add_indicator().unwrap();
        session
    }

    fn assert_history_consistent(session: &ExperimentSession, accepted: usize) {
        assert_eq!(session.history().len(), accepted + 1);
        let last = session.history().last().unwrap();
        assert_eq!(last.volume_ml, session.titrant_added_ml());
        assert_eq!(last.ph, session.current_ph());
    }

    #[test]
    fn new_session_starts_with_baseline() {
        let session = ExperimentSession::new();
        assert_eq!(session.stage(), Stage::Prediction);
        assert_eq!(session.history(), &[PhSample::new(0.0, 1.0)]);
        assert_eq!(session.current_ph(), 1.0);
        assert!(!session.neutral_reached());
    }

    #[test]
    fn blank_or_invalid_prediction_is_ignored() {
        let mut session = ExperimentSession::new();
        for raw in ["", "   ", "ten", "-3", "NaN", "inf"] {
            assert_eq!(
                session.submit_prediction(raw),
                Err(Rejection::MissingPrediction),
                "{raw:?} should not start the experiment"
            );
        }
        assert_eq!(session.stage(), Stage::Prediction);
        assert_eq!(session.predicted_volume_ml(), None);
    }

    #[test]
    fn prediction_is_fixed_once_submitted() {
        let mut session = ExperimentSession::new();
        session.submit_prediction(" 12.5 ").unwrap();
        assert!(session.submit_prediction("3").is_err());
        assert_eq!(session.predicted_volume_ml(), Some(12.5));
    }

    #[test]
    fn titrant_before_indicator_is_ignored() {
        let mut session = ExperimentSession::new();
        assert!(matches!(
            session.add_titrant(TitrantStep::Dropwise),
            Err(Rejection::WrongStage { .. })
        ));
        session.submit_prediction("10").unwrap();
        session.add_acid().unwrap();
        assert!(session.add_titrant(TitrantStep::FastStream).is_err());
        assert_eq!(session.titrant_added_ml(), 0.0);
        assert_history_consistent(&session, 0);
    }

    #[test]
    fn first_addition_moves_to_running() {
        let mut session = ready_session();
        let reading = session.add_titrant(TitrantStep::FastStream).unwrap();
        assert_eq!(reading.stage, Stage::Running);
        assert_eq!(reading.sample, PhSample::new(1.0, compute_ph(1.0)));
        assert_eq!(session.stage(), Stage::Running);
    }

    #[test]
    fn fast_stream_is_refused_in_critical_zone() {
        let mut session = ready_session();
        for _ in 0..8 {
            session.add_titrant(TitrantStep::FastStream).unwrap();
        }
        assert_eq!(
            session.add_titrant(TitrantStep::FastStream),
            Err(Rejection::CriticalZone)
        );
        assert_eq!(session.titrant_added_ml(), 8.0);
        assert!(session.add_titrant(TitrantStep::Dropwise).is_ok());
    }

    #[test]
    fn volume_never_exceeds_capacity() {
        let mut session = ready_session();
        let mut accepted = 0;
        for _ in 0..400 {
            let step = if fast_stream_allowed(session.titrant_added_ml()) {
                TitrantStep::FastStream
            } else {
                TitrantStep::Dropwise
            };
            if session.add_titrant(step).is_ok() {
                accepted += 1;
            }
            assert!(session.titrant_added_ml() <= MAX_TITRANT_ML);
            assert_history_consistent(&session, accepted);
        }
        assert_eq!(session.titrant_added_ml(), MAX_TITRANT_ML);

        for _ in 0..5 {
            assert!(session.add_titrant(TitrantStep::FastStream).is_err());
        }
        assert_eq!(
            session.add_titrant(TitrantStep::Dropwise),
            Err(Rejection::CapacityExceeded)
        );
        assert_eq!(session.titrant_added_ml(), MAX_TITRANT_ML);
        assert_history_consistent(&session, accepted);
    }

    #[test]
    fn neutral_latches_on_first_neutral_reading() {
        let mut session = ready_session();
        for _ in 0..8 {
            session.add_titrant(TitrantStep::FastStream).unwrap();
        }
        let mut first_neutral_count = 0;
        for _ in 0..20 {
            let reading = session.add_titrant(TitrantStep::Dropwise).unwrap();
            if reading.first_neutral {
                first_neutral_count += 1;
            }
        }
        assert_eq!(session.titrant_added_ml(), 10.0);
        assert_eq!(session.current_ph(), 7.0);
        assert!(session.neutral_reached());
        assert_eq!(first_neutral_count, 1);

        for _ in 0..5 {
            let reading = session.add_titrant(TitrantStep::Dropwise).unwrap();
            assert!(!reading.first_neutral);
        }
        assert!(session.current_ph() > 7.1);
        assert!(session.neutral_reached());
        assert_eq!(session.neutralized_at_ml(), Some(10.0));
        assert_eq!(session.prediction_error_ml(), Some(0.0));
    }

    #[test]
    fn quiz_requires_neutrality() {
        let mut session = ready_session();
        assert_eq!(session.advance_to_quiz(), Err(Rejection::NotNeutralized));
        assert_eq!(session.stage(), Stage::IndicatorAdded);
    }

    #[test]
    fn reset_restores_initial_state_from_any_stage() {
        let mut session = ready_session();
        for _ in 0..3 {
            session.add_titrant(TitrantStep::FastStream).unwrap();
        }
        session.reset();
        assert_eq!(session, ExperimentSession::new());
        assert_eq!(session.titrant_added_ml(), 0.0);
        assert_eq!(session.history(), &[PhSample::baseline()]);
    }
}
