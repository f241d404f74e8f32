use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// Phase of the experiment. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Prediction,
    Started,
    AcidAdded,
    IndicatorAdded,
    Running,
    Quiz,
    Completed,
}

impl Stage {
    /// Whether titrant can be delivered in this stage.
    #[must_use]
    pub fn accepts_titrant(self) -> bool {
        matches!(self, Stage::IndicatorAdded | Stage::Running)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed)
    }

    /// Next stage for `trigger`, or the reason the trigger is not legal here.
    ///
    /// `Reset` is legal from every stage. Everything else follows a one-way table.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::WrongStage` when the trigger is not defined for this stage,
    /// or a guard-specific rejection when it is defined but the guard fails.
    pub fn transition(self, trigger: Trigger, guards: Guards) -> Result<Stage, Rejection> {
        let next = match (self, trigger) {
            (_, Trigger::Reset) => Stage::Prediction,
            (Stage::Prediction, Trigger::SubmitPrediction) => {
                if !guards.prediction_present {
                    return Err(Rejection::MissingPrediction);
                }
                Stage::Started
            }
            (Stage::Started, Trigger::AddAcid) => Stage::AcidAdded,
            (Stage::AcidAdded, Trigger::AddIndicator) => Stage::IndicatorAdded,
            (Stage::IndicatorAdded | Stage::Running, Trigger::AddTitrant) => Stage::Running,
            (Stage::IndicatorAdded | Stage::Running, Trigger::AdvanceToQuiz) => {
                if !guards.neutral_reached {
                    return Err(Rejection::NotNeutralized);
                }
                Stage::Quiz
            }
            (Stage::Quiz, Trigger::SubmitAnswer) => Stage::Quiz,
            (Stage::Quiz, Trigger::CompleteQuiz) => {
                if !guards.last_question_answered {
                    return Err(Rejection::QuizUnfinished);
                }
                Stage::Completed
            }
            (stage, trigger) => return Err(Rejection::WrongStage { stage, trigger }),
        };
        Ok(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Prediction => "prediction",
            Stage::Started => "started",
            Stage::AcidAdded => "acid-added",
            Stage::IndicatorAdded => "indicator-added",
            Stage::Running => "running",
            Stage::Quiz => "quiz",
            Stage::Completed => "completed",
        };
        f.write_str(label)
    }
}

//
// ─── TRIGGERS & GUARDS ─────────────────────────────────────────────────────────
//

/// Learner actions that may move the experiment between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    SubmitPrediction,
    AddAcid,
    AddIndicator,
    AddTitrant,
    AdvanceToQuiz,
    SubmitAnswer,
    CompleteQuiz,
    Reset,
}

/// Facts the transition table consults for guarded triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Guards {
    pub prediction_present: bool,
    pub neutral_reached: bool,
    pub last_question_answered: bool,
}

//
// ─── REJECTIONS ────────────────────────────────────────────────────────────────
//

/// Why an action was ignored. Ignored actions never change state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("{trigger:?} is not available during the {stage} stage")]
    WrongStage { stage: Stage, trigger: Trigger },

    #[error("a prediction is required before starting")]
    MissingPrediction,

    #[error("the solution has not been neutralized yet")]
    NotNeutralized,

    #[error("the quiz still has unanswered questions")]
    QuizUnfinished,

    #[error("adding titrant would exceed the syringe capacity")]
    CapacityExceeded,

    #[error("only drop-wise additions are allowed near the equivalence point")]
    CriticalZone,

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("answer input is locked")]
    AnswerLocked,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STAGES: [Stage; 7] = [
        Stage::Prediction,
        Stage::Started,
        Stage::AcidAdded,
        Stage::IndicatorAdded,
        Stage::Running,
        Stage::Quiz,
        Stage::Completed,
    ];

    fn open_guards() -> Guards {
        Guards {
            prediction_present: true,
            neutral_reached: true,
            last_question_answered: true,
        }
    }

    #[test]
    fn happy_path_walks_every_stage() {
        let g = open_guards();
        let mut stage = Stage::default();
        for (trigger, expected) in [
            (Trigger::SubmitPrediction, Stage::Started),
            (Trigger::AddAcid, Stage::AcidAdded),
            (Trigger::AddIndicator, Stage::IndicatorAdded),
            (Trigger::AddTitrant, Stage::Running),
            (Trigger::AddTitrant, Stage::Running),
            (Trigger::AdvanceToQuiz, Stage::Quiz),
            (Trigger::SubmitAnswer, Stage::Quiz),
            (Trigger::CompleteQuiz, Stage::Completed),
        ] {
            stage = stage.transition(trigger, g).unwrap();
            assert_eq!(stage, expected);
        }
        assert!(stage.is_terminal());
    }

    #[test]
    fn reset_is_legal_everywhere() {
        for stage in ALL_STAGES {
            assert_eq!(
                stage.transition(Trigger::Reset, Guards::default()),
                Ok(Stage::Prediction)
            );
        }
    }

    #[test]
    fn out_of_order_triggers_are_rejected() {
        let err = Stage::Prediction
            .transition(Trigger::AddTitrant, open_guards())
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::WrongStage {
                stage: Stage::Prediction,
                trigger: Trigger::AddTitrant
            }
        );
        assert!(Stage::Started
            .transition(Trigger::AddIndicator, open_guards())
            .is_err());
        assert!(Stage::Completed
            .transition(Trigger::AddTitrant, open_guards())
            .is_err());
        assert!(Stage::Running
            .transition(Trigger::SubmitAnswer, open_guards())
            .is_err());
    }

    #[test]
    fn guards_block_their_transitions() {
        let closed = Guards::default();
        assert_eq!(
            Stage::Prediction.transition(Trigger::SubmitPrediction, closed),
            Err(Rejection::MissingPrediction)
        );
        assert_eq!(
            Stage::Running.transition(Trigger::AdvanceToQuiz, closed),
            Err(Rejection::NotNeutralized)
        );
        assert_eq!(
            Stage::Quiz.transition(Trigger::CompleteQuiz, closed),
            Err(Rejection::QuizUnfinished)
        );
    }

    #[test]
    fn quiz_can_be_reached_straight_from_indicator_added() {
        assert_eq!(
            Stage::IndicatorAdded.transition(Trigger::AdvanceToQuiz, open_guards()),
            Ok(Stage::Quiz)
        );
    }

    #[test]
    fn stage_labels() {
        assert_eq!(Stage::AcidAdded.to_string(), "acid-added");
        assert_eq!(Stage::IndicatorAdded.to_string(), "indicator-added");
    }
}
