use chrono::{DateTime, Utc};
use lab_core::model::Generation;

/// Presentation effects that fire some time after the action that caused them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredEffect {
    /// End the swirl animation after a titrant addition.
    StopShake,
    /// Hide the neutralization celebration.
    DismissCelebration,
    /// Leave the success interval of a correct quiz answer.
    AdvanceQuiz,
}

/// A deferred effect bound to the session generation that scheduled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEffect {
    pub generation: Generation,
    pub due_at: DateTime<Utc>,
    pub effect: DeferredEffect,
}

/// Pending deferred effects.
///
/// At most one entry per effect kind is pending: scheduling an effect again
/// supersedes the earlier entry, so a burst of additions ends the shake once,
/// after the last addition.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    pending: Vec<ScheduledEffect>,
}

/// Effects released by `DeferredQueue::take_due`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueEffects {
    pub current: Vec<DeferredEffect>,
    pub stale: usize,
}

impl DeferredQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, scheduled: ScheduledEffect) {
        self.pending.retain(|entry| entry.effect != scheduled.effect);
        self.pending.push(scheduled);
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.iter().map(|entry| entry.due_at).min()
    }

    #[must_use]
    pub fn is_pending(&self, effect: DeferredEffect) -> bool {
        self.pending.iter().any(|entry| entry.effect == effect)
    }

    /// Remove everything due at `now`, oldest deadline first.
    ///
    /// Entries from a generation other than `current` are dropped and only counted.
    pub fn take_due(&mut self, now: DateTime<Utc>, current: Generation) -> DueEffects {
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|entry| entry.due_at <= now);
        self.pending = pending;
        due.sort_by_key(|entry| entry.due_at);

        let mut released = DueEffects::default();
        for entry in due {
            if entry.generation == current {
                released.current.push(entry.effect);
            } else {
                released.stale += 1;
            }
        }
        released
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
