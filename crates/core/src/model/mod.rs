mod experiment;
mod ids;
mod lab_settings;
mod stage;

pub use experiment::{ExperimentSession, PhSample, TitrantReading};
pub use ids::Generation;
pub use lab_settings::{
    DEFAULT_CELEBRATION_MS, DEFAULT_QUIZ_ADVANCE_MS, DEFAULT_SHAKE_MS, LabSettings,
    LabSettingsDraft, MAX_DELAY_MS, SettingsError,
};
pub use stage::{Guards, Rejection, Stage, Trigger};
