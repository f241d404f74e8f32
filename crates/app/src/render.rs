use std::fmt::Write as _;

use lab_core::indicator::reference_chart;
use lab_core::model::{PhSample, TitrantReading};
use lab_core::quiz::FeedbackKind;
use lab_core::titration::IonLevel;
use services::LabSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn snapshot(self, snap: &LabSnapshot) -> Result<String, serde_json::Error> {
        match self {
            OutputFormat::Text => Ok(snapshot_text(snap)),
            OutputFormat::Json => serde_json::to_string(snap),
        }
    }
}

fn level(level: IonLevel) -> &'static str {
    match level {
        IonLevel::High => "high",
        IonLevel::Balanced => "balanced",
        IonLevel::Low => "low",
    }
}

fn toggle(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

pub fn snapshot_text(snap: &LabSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", snap.stage);
    if let Some(predicted) = snap.predicted_volume_ml {
        let _ = writeln!(out, "prediction: {predicted} mL");
    }
    let _ = writeln!(
        out,
        "beaker: {:.1} mL ({:.0}% full), colour {}",
        snap.beaker_volume_ml,
        snap.beaker_fill * 100.0,
        snap.liquid_hex
    );
    let _ = writeln!(
        out,
        "alkali added: {:.1} mL, pH {:.2}, H+ {} / OH- {}",
        snap.titrant_added_ml,
        snap.current_ph,
        level(snap.ions.hydrogen),
        level(snap.ions.hydroxide)
    );

    if snap.neutral_badge {
        out.push_str("[NEUTRAL]\n");
    }
    if snap.alkaline_badge {
        out.push_str("[ALKALINE]\n");
    }
    if snap.critical_zone_warning {
        out.push_str("Critical zone: add drop-wise only.\n");
    }
    if snap.neutral_note {
        out.push_str("Neutral reached. You can finish or keep adding alkali.\n");
    }
    if let (Some(at), Some(error)) = (snap.neutralized_at_ml, snap.prediction_error_ml) {
        let _ = writeln!(out, "neutralized at {at:.1} mL, prediction off by {error:.1} mL");
    }
    if snap.stage.accepts_titrant() {
        let _ = writeln!(
            out,
            "controls: fast {} / drop {} / finish {}",
            toggle(snap.fast_stream_enabled),
            toggle(snap.dropwise_enabled),
            toggle(snap.can_finish)
        );
    }

    if let Some(quiz) = &snap.quiz {
        let _ = writeln!(out, "Question {} of {}: {}", quiz.number, quiz.count, quiz.prompt);
        match quiz.feedback.kind {
            FeedbackKind::None => {}
            FeedbackKind::Success | FeedbackKind::Error => {
                let _ = writeln!(out, "{}", quiz.feedback.message);
            }
        }
    }
    if snap.is_complete() {
        out.push_str("Lab complete. Type `reset` to run it again.\n");
    }
    if snap.celebrating {
        out.push_str("*** well done ***\n");
    }
    out
}

pub fn reading_text(reading: &TitrantReading) -> String {
    let mut line = format!(
        "volume {:.1} mL, pH {:.2}",
        reading.sample.volume_ml, reading.sample.ph
    );
    if reading.first_neutral {
        line.push_str(" - neutral!");
    }
    line
}

pub fn chart_text() -> String {
    reference_chart()
        .iter()
        .map(|swatch| format!("pH {:>2}  {}", swatch.ph_label, swatch.band.hex()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Width of the bar drawn for pH 14.
const CURVE_WIDTH: usize = 28;

/// Titration curve as one bar per recorded sample, pH on the horizontal axis.
pub fn curve_text(history: &[PhSample]) -> String {
    history
        .iter()
        .map(|sample| {
            let ratio = (sample.ph / 14.0).clamp(0.0, 1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let len = (ratio * CURVE_WIDTH as f64).round() as usize;
            format!(
                "{:>5.1} mL  pH {:>5.2} |{}",
                sample.volume_ml,
                sample.ph,
                "#".repeat(len)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
