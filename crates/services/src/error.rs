//! Shared error types for the services crate.

use thiserror::Error;

use lab_core::model::SettingsError;
use lab_core::quiz::QuizBankError;

/// Errors emitted while assembling a `LabService`.
///
/// Learner actions never fail; they are ignored with a `Rejection` instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LabError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    QuizBank(#[from] QuizBankError),
}
