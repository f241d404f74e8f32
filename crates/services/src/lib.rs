#![forbid(unsafe_code)]

pub mod error;
pub mod lab;

pub use lab_core::Clock;

pub use error::LabError;
pub use lab::{
    DeferredEffect, DeferredQueue, LabLoop, LabService, LabSnapshot, QuizView, ScheduledEffect,
};
