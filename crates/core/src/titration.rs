//! Piecewise titration curve for 10 mL of dilute HCl neutralized by dilute NaOH.
//!
//! The curve is not a chemical equilibrium model. It is a fixed interpolation
//! over six volume bands around the equivalence point, shaped to show a flat
//! acidic region, a steep jump at neutrality, and a flat alkaline tail.

use serde::{Deserialize, Serialize};

//
// ─── CONSTANTS ─────────────────────────────────────────────────────────────────
//

/// Volume of acid placed in the beaker before titration.
pub const ACID_VOLUME_ML: f64 = 10.0;

/// Titrant volume that exactly neutralizes the acid.
pub const EQUIVALENCE_POINT_ML: f64 = 10.0;

/// Titrant capacity of the syringe.
pub const MAX_TITRANT_ML: f64 = 20.0;

/// Capacity of the beaker, used for the fill level.
pub const BEAKER_CAPACITY_ML: f64 = 50.0;

/// pH of the acid before any titrant is added.
pub const INITIAL_PH: f64 = 1.0;

pub const NEUTRAL_PH: f64 = 7.0;

/// Half-width of the band around pH 7 that counts as neutral.
pub const NEUTRAL_TOLERANCE: f64 = 0.1;

/// pH above which the solution is flagged as alkaline.
pub const ALKALINE_PH: f64 = 7.1;

/// Lower bound of the zone where only drop-wise additions are accepted.
pub const CRITICAL_ZONE_START_ML: f64 = 8.0;

/// Upper bound (exclusive) of the drop-wise-only zone.
pub const CRITICAL_ZONE_END_ML: f64 = 12.0;

//
// ─── CURVE ─────────────────────────────────────────────────────────────────────
//

/// Maps cumulative titrant volume to pH.
///
/// Bands are tested in order and the first match wins. Volume exactly at the
/// equivalence point yields exactly 7.0; approaching from below tends to 6.9 and
/// leaving it starts at 7.1. The caller keeps `volume_ml` within `[0, MAX_TITRANT_ML]`.
///
/// ```
/// # use lab_core::titration::compute_ph;
/// assert_eq!(compute_ph(0.0), 1.0);
/// assert_eq!(compute_ph(10.0), 7.0);
/// ```
#[must_use]
#[allow(clippy::float_cmp)]
pub fn compute_ph(volume_ml: f64) -> f64 {
    let eq = EQUIVALENCE_POINT_ML;

    if volume_ml == 0.0 {
        return INITIAL_PH;
    }
    if volume_ml <= eq - 1.0 {
        return 1.0 + (volume_ml / (eq - 1.0)) * 1.5;
    }
    if volume_ml <= eq - 0.5 {
        return 2.5 + ((volume_ml - (eq - 1.0)) / 0.5) * 2.0;
    }
    if volume_ml < eq {
        return 4.5 + ((volume_ml - (eq - 0.5)) / 0.5) * 2.4;
    }
    if volume_ml == eq {
        return NEUTRAL_PH;
    }
    if volume_ml <= eq + 0.5 {
        return 7.1 + ((volume_ml - eq) / 0.5) * 3.4;
    }

    let alkaline_span = MAX_TITRANT_ML - (eq + 0.5);
    10.5 + ((volume_ml - (eq + 0.5)) / alkaline_span) * 3.0
}

/// Rounds to two decimal places so repeated 0.1 mL additions land on exact hundredths.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
pub fn is_neutral(ph: f64) -> bool {
    (ph - NEUTRAL_PH).abs() < NEUTRAL_TOLERANCE
}

#[must_use]
pub fn is_alkaline(ph: f64) -> bool {
    ph > ALKALINE_PH
}

#[must_use]
pub fn in_critical_zone(volume_ml: f64) -> bool {
    (CRITICAL_ZONE_START_ML..CRITICAL_ZONE_END_ML).contains(&volume_ml)
}

/// Whether a 1 mL fast stream may be added at the current volume.
#[must_use]
pub fn fast_stream_allowed(volume_ml: f64) -> bool {
    !in_critical_zone(volume_ml) && volume_ml < MAX_TITRANT_ML
}

/// Total liquid in the beaker once the acid has been poured.
#[must_use]
pub fn beaker_volume_ml(titrant_added_ml: f64) -> f64 {
    ACID_VOLUME_ML + titrant_added_ml
}

//
// ─── TITRANT STEP ──────────────────────────────────────────────────────────────
//

/// The two ways titrant can be delivered from the syringe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitrantStep {
    /// 1 mL at a time. Fast but easy to overshoot.
    FastStream,
    /// 0.1 mL at a time.
    Dropwise,
}

impl TitrantStep {
    #[must_use]
    pub fn amount_ml(self) -> f64 {
        match self {
            TitrantStep::FastStream => 1.0,
            TitrantStep::Dropwise => 0.1,
        }
    }
}

//
// ─── ION TRACKER ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IonLevel {
    High,
    Balanced,
    Low,
}

/// Relative abundance of H⁺ and OH⁻ at a given pH ("micro view").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IonTracker {
    pub hydrogen: IonLevel,
    pub hydroxide: IonLevel,
}

impl IonTracker {
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_ph(ph: f64) -> Self {
        if ph == NEUTRAL_PH {
            Self {
                hydrogen: IonLevel::Balanced,
                hydroxide: IonLevel::Balanced,
            }
        } else if ph < NEUTRAL_PH {
            Self {
                hydrogen: IonLevel::High,
                hydroxide: IonLevel::Low,
            }
        } else {
            Self {
                hydrogen: IonLevel::Low,
                hydroxide: IonLevel::High,
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
