use serde::Serialize;

use lab_core::indicator::{LiquidColor, color_for_ph};
use lab_core::model::{PhSample, Stage};
use lab_core::quiz::Feedback;
use lab_core::titration::{
    BEAKER_CAPACITY_ML, IonTracker, MAX_TITRANT_ML, beaker_volume_ml, fast_stream_allowed,
    in_critical_zone, is_alkaline, is_neutral,
};

use super::service::LabService;

/// Everything a renderer needs to draw one frame of the lab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabSnapshot {
    pub generation: u64,
    pub stage: Stage,
    pub predicted_volume_ml: Option<f64>,
    pub titrant_added_ml: f64,
    pub current_ph: f64,
    pub liquid_color: LiquidColor,
    pub liquid_hex: &'static str,
    pub beaker_volume_ml: f64,
    /// Fill level of the beaker in `0.0..=1.0`.
    pub beaker_fill: f64,
    pub ions: IonTracker,
    pub neutral_badge: bool,
    pub alkaline_badge: bool,
    pub critical_zone_warning: bool,
    pub neutral_note: bool,
    pub fast_stream_enabled: bool,
    pub dropwise_enabled: bool,
    pub can_finish: bool,
    pub neutral_reached: bool,
    pub neutralized_at_ml: Option<f64>,
    pub prediction_error_ml: Option<f64>,
    pub history: Vec<PhSample>,
    pub quiz: Option<QuizView>,
    pub shaking: bool,
    pub celebrating: bool,
}

/// The question card shown during the quiz stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    /// 1-based, for "Question 2 of 3".
    pub number: usize,
    pub count: usize,
    pub prompt: String,
    pub answer_text: String,
    pub answer_locked: bool,
    pub feedback: Feedback,
}

impl LabSnapshot {
    pub(crate) fn capture(lab: &LabService) -> Self {
        let session = lab.session();
        let stage = session.stage();
        let volume = session.titrant_added_ml();
        let ph = session.current_ph();
        let titrating = stage.accepts_titrant();

        let beaker = match stage {
            Stage::Prediction | Stage::Started => 0.0,
            _ => beaker_volume_ml(volume),
        };
        let color = color_for_ph(ph, stage);

        let quiz = (stage == Stage::Quiz)
            .then(|| lab.current_question())
            .flatten()
            .map(|question| QuizView {
                number: lab.quiz().question_index() + 1,
                count: lab.questions().len(),
                prompt: question.prompt().to_owned(),
                answer_text: lab.quiz().answer_text().to_owned(),
                answer_locked: lab.quiz().is_locked(),
                feedback: lab.quiz().feedback().clone(),
            });

        Self {
            generation: lab.generation().value(),
            stage,
            predicted_volume_ml: session.predicted_volume_ml(),
            titrant_added_ml: volume,
            current_ph: ph,
            liquid_color: color,
            liquid_hex: color.hex(),
            beaker_volume_ml: beaker,
            beaker_fill: (beaker / BEAKER_CAPACITY_ML).clamp(0.0, 1.0),
            ions: IonTracker::from_ph(ph),
            neutral_badge: is_neutral(ph),
            alkaline_badge: is_alkaline(ph),
            critical_zone_warning: titrating && in_critical_zone(volume),
            neutral_note: titrating && session.neutral_reached() && volume < MAX_TITRANT_ML,
            fast_stream_enabled: titrating && fast_stream_allowed(volume),
            dropwise_enabled: titrating && volume < MAX_TITRANT_ML,
            can_finish: titrating && session.neutral_reached(),
            neutral_reached: session.neutral_reached(),
            neutralized_at_ml: session.neutralized_at_ml(),
            prediction_error_ml: session.prediction_error_ml(),
            history: session.history().to_vec(),
            quiz,
            shaking: lab.is_shaking(),
            celebrating: lab.is_celebrating(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage.is_terminal()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use lab_core::indicator::IndicatorBand;
    use lab_core::model::LabSettings;
    use lab_core::time::fixed_clock;
    use lab_core::titration::{IonLevel, TitrantStep};

    fn lab() -> LabService {
        LabService::new(fixed_clock(), LabSettings::default())
    }

    #[test]
    fn empty_beaker_before_acid() {
        let mut lab = lab();
        lab.submit_prediction("9").unwrap();
        let snap = lab.snapshot();
        assert_eq!(snap.stage, Stage::Started);
        assert_eq!(snap.beaker_volume_ml, 0.0);
        assert_eq!(snap.liquid_color, LiquidColor::NoLiquid);
        assert!(!snap.fast_stream_enabled);
        assert!(!snap.dropwise_enabled);
        assert!(snap.quiz.is_none());
    }

    #[test]
    fn acid_is_colorless_until_indicator() {
        let mut lab = lab();
        lab.submit_prediction("9").unwrap();
        lab.add_acid().unwrap();
        let snap = lab.snapshot();
        assert_eq!(snap.liquid_hex, "#ffffff");
        assert_eq!(snap.beaker_volume_ml, 10.0);
        assert_eq!(snap.beaker_fill, 0.2);

        lab.add_indicator().unwrap();
        let snap = lab.snapshot();
        assert_eq!(
            snap.liquid_color,
            LiquidColor::Indicator(IndicatorBand::StrongAcidRed)
        );
        assert_eq!(snap.ions.hydrogen, IonLevel::High);
        assert!(snap.fast_stream_enabled);
        assert!(snap.dropwise_enabled);
        assert!(!snap.can_finish);
    }

    #[test]
    fn critical_zone_disables_fast_stream() {
        let mut lab = lab();
        lab.submit_prediction("9").unwrap();
        lab.add_acid().unwrap();
        lab.add_indicator().unwrap();
        for _ in 0..8 {
            lab.add_titrant(TitrantStep::FastStream).unwrap();
        }
        let snap = lab.snapshot();
        assert!(snap.critical_zone_warning);
        assert!(!snap.fast_stream_enabled);
        assert!(snap.dropwise_enabled);
        assert!(snap.shaking);
        assert_eq!(snap.history.len(), 9);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snap = lab().snapshot();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["stage"], "Prediction");
        assert_eq!(json["liquid_hex"], "transparent");
        assert_eq!(json["history"][0]["ph"], 1.0);
    }
}
