use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use lab_core::model::{Rejection, Stage, TitrantReading};
use lab_core::quiz::GradeOutcome;
use lab_core::titration::TitrantStep;

use super::service::LabService;
use super::view::LabSnapshot;

/// Runs a `LabService` on a Tokio runtime so deferred effects fire on their own.
///
/// One driver task sleeps until the earliest pending deadline and then ticks the
/// service. Actions that move that deadline wake the driver so it can re-plan.
/// Every action and every fired effect publishes a fresh `LabSnapshot`.
///
/// The driver only calls `LabService::tick`, so a wake-up that outlives a reset
/// finds nothing of its generation left to run. It stops when the last handle
/// is dropped.
#[derive(Clone)]
pub struct LabLoop {
    shared: Arc<Shared>,
    _driver: Arc<Driver>,
}

struct Shared {
    lab: Mutex<LabService>,
    snapshots: watch::Sender<LabSnapshot>,
    replan: Notify,
}

struct Driver(JoinHandle<()>);

impl Drop for Driver {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl LabLoop {
    /// Wrap `lab` and start its driver on `runtime`.
    ///
    /// Effects already pending in `lab` are scheduled right away.
    #[must_use]
    pub fn new(lab: LabService, runtime: Handle) -> Self {
        let (snapshots, _) = watch::channel(lab.snapshot());
        let shared = Arc::new(Shared {
            lab: Mutex::new(lab),
            snapshots,
            replan: Notify::new(),
        });
        let driver = runtime.spawn(drive(Arc::clone(&shared)));
        Self {
            shared,
            _driver: Arc::new(Driver(driver)),
        }
    }

    /// Receives a snapshot after every action and every fired deferred effect.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LabSnapshot> {
        self.shared.snapshots.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> LabSnapshot {
        self.shared.lock().snapshot()
    }

    /// # Errors
    ///
    /// See `LabService::submit_prediction`.
    pub fn submit_prediction(&self, raw: &str) -> Result<Stage, Rejection> {
        self.act(|lab| lab.submit_prediction(raw))
    }

    /// # Errors
    ///
    /// See `LabService::add_acid`.
    pub fn add_acid(&self) -> Result<Stage, Rejection> {
        self.act(LabService::add_acid)
    }

    /// # Errors
    ///
    /// See `LabService::add_indicator`.
    pub fn add_indicator(&self) -> Result<Stage, Rejection> {
        self.act(LabService::add_indicator)
    }

    /// # Errors
    ///
    /// See `LabService::add_titrant`.
    pub fn add_titrant(&self, step: TitrantStep) -> Result<TitrantReading, Rejection> {
        self.act(|lab| lab.add_titrant(step))
    }

    /// # Errors
    ///
    /// See `LabService::advance_to_quiz`.
    pub fn advance_to_quiz(&self) -> Result<Stage, Rejection> {
        self.act(LabService::advance_to_quiz)
    }

    pub fn set_answer_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.act(|lab| lab.set_answer_text(text));
    }

    /// # Errors
    ///
    /// See `LabService::submit_answer`.
    pub fn submit_answer(&self, text: &str) -> Result<GradeOutcome, Rejection> {
        self.act(|lab| lab.submit_answer(text))
    }

    pub fn reset(&self) {
        self.act(LabService::reset);
    }

    fn act<T>(&self, action: impl FnOnce(&mut LabService) -> T) -> T {
        let mut lab = self.shared.lock();
        let planned = lab.next_deadline();
        let out = action(&mut lab);
        self.shared.snapshots.send_replace(lab.snapshot());
        if lab.next_deadline() != planned {
            self.shared.replan.notify_one();
        }
        out
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LabService> {
        self.lab.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self) {
        let mut lab = self.lock();
        let applied = lab.tick();
        if !applied.is_empty() {
            debug!(?applied, "deferred effects applied");
            self.snapshots.send_replace(lab.snapshot());
        }
    }
}

async fn drive(shared: Arc<Shared>) {
    loop {
        let wait = {
            let lab = shared.lock();
            lab.next_deadline()
                .map(|deadline| lab.time_until(deadline).to_std().unwrap_or_default())
        };
        match wait {
            Some(wait) => {
                if tokio::time::timeout(wait, shared.replan.notified())
                    .await
                    .is_err()
                {
                    shared.fire();
                }
            }
            None => shared.replan.notified().await,
        }
    }
}
