use serde::{Deserialize, Serialize};

use crate::model::Stage;

/// Appearance of the beaker contents.
///
/// Before the acid is poured there is nothing to color, and until the universal
/// indicator is added the acid stays colorless whatever its pH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidColor {
    NoLiquid,
    Colorless,
    Indicator(IndicatorBand),
}

impl LiquidColor {
    /// CSS-style color for renderers. `NoLiquid` is fully transparent.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            LiquidColor::NoLiquid => "transparent",
            LiquidColor::Colorless => "#ffffff",
            LiquidColor::Indicator(band) => band.hex(),
        }
    }
}

/// The fourteen universal indicator bands, strongest acid first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorBand {
    StrongAcidRed,
    AcidRed,
    AcidOrange,
    WeakAcidOrange,
    AcidYellow,
    WeakAcidYellow,
    NeutralGreen,
    WeakAlkaliTeal,
    AlkaliCyan,
    AlkaliBlue,
    StrongAlkaliBlue,
    AlkaliIndigo,
    AlkaliViolet,
    StrongAlkaliPurple,
}

impl IndicatorBand {
    pub const ALL: [IndicatorBand; 14] = [
        IndicatorBand::StrongAcidRed,
        IndicatorBand::AcidRed,
        IndicatorBand::AcidOrange,
        IndicatorBand::WeakAcidOrange,
        IndicatorBand::AcidYellow,
        IndicatorBand::WeakAcidYellow,
        IndicatorBand::NeutralGreen,
        IndicatorBand::WeakAlkaliTeal,
        IndicatorBand::AlkaliCyan,
        IndicatorBand::AlkaliBlue,
        IndicatorBand::StrongAlkaliBlue,
        IndicatorBand::AlkaliIndigo,
        IndicatorBand::AlkaliViolet,
        IndicatorBand::StrongAlkaliPurple,
    ];

    /// Band for a pH value. Thresholds are checked from the acidic end; the neutral
    /// band is the closed interval 6.8..=7.2.
    #[must_use]
    pub fn for_ph(ph: f64) -> Self {
        match ph {
            p if p < 2.0 => IndicatorBand::StrongAcidRed,
            p if p < 3.0 => IndicatorBand::AcidRed,
            p if p < 4.0 => IndicatorBand::AcidOrange,
            p if p < 5.0 => IndicatorBand::WeakAcidOrange,
            p if p < 6.0 => IndicatorBand::AcidYellow,
            p if p < 6.8 => IndicatorBand::WeakAcidYellow,
            p if p <= 7.2 => IndicatorBand::NeutralGreen,
            p if p < 8.5 => IndicatorBand::WeakAlkaliTeal,
            p if p < 9.5 => IndicatorBand::AlkaliCyan,
            p if p < 10.5 => IndicatorBand::AlkaliBlue,
            p if p < 11.5 => IndicatorBand::StrongAlkaliBlue,
            p if p < 12.5 => IndicatorBand::AlkaliIndigo,
            p if p < 13.5 => IndicatorBand::AlkaliViolet,
            _ => IndicatorBand::StrongAlkaliPurple,
        }
    }

    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            IndicatorBand::StrongAcidRed => "#ef4444",
            IndicatorBand::AcidRed => "#f87171",
            IndicatorBand::AcidOrange => "#f97316",
            IndicatorBand::WeakAcidOrange => "#fb923c",
            IndicatorBand::AcidYellow => "#facc15",
            IndicatorBand::WeakAcidYellow => "#eab308",
            IndicatorBand::NeutralGreen => "#22c55e",
            IndicatorBand::WeakAlkaliTeal => "#14b8a6",
            IndicatorBand::AlkaliCyan => "#06b6d4",
            IndicatorBand::AlkaliBlue => "#3b82f6",
            IndicatorBand::StrongAlkaliBlue => "#2563eb",
            IndicatorBand::AlkaliIndigo => "#4f46e5",
            IndicatorBand::AlkaliViolet => "#7c3aed",
            IndicatorBand::StrongAlkaliPurple => "#9333ea",
        }
    }
}

/// Color of the beaker contents for the given pH at the given stage.
#[must_use]
pub fn color_for_ph(ph: f64, stage: Stage) -> LiquidColor {
    match stage {
        Stage::Prediction | Stage::Started => LiquidColor::NoLiquid,
        Stage::AcidAdded => LiquidColor::Colorless,
        _ => LiquidColor::Indicator(IndicatorBand::for_ph(ph)),
    }
}

/// One swatch of the printed reference chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartSwatch {
    pub ph_label: u8,
    pub band: IndicatorBand,
}

/// Reference chart pairing each band with the whole pH value it is labelled with.
#[must_use]
pub fn reference_chart() -> Vec<ChartSwatch> {
    IndicatorBand::ALL
        .iter()
        .zip(1_u8..)
        .map(|(band, ph_label)| ChartSwatch {
            ph_label,
            band: *band,
        })
        .collect()
}
