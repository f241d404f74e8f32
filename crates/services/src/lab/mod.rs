mod deferred;
mod service;
mod view;
mod workflow;

// Public API of the lab subsystem.
pub use deferred::{DeferredEffect, DeferredQueue, DueEffects, ScheduledEffect};
pub use service::LabService;
pub use view::{LabSnapshot, QuizView};
pub use workflow::LabLoop;
