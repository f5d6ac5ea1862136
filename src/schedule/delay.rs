//! Registry of pending delays keyed by dispatch id.
//!
//! At most one [`Delay`] exists per dispatch id. The registry lock
//! serializes register, re-arm, and cancel for the same dispatch; timers
//! themselves are armed through a [`DelayScheduler`] so the registry does
//! not care whether they run on tokio, a platform looper, or a test clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::models::schedule::{Delay, ScheduleRequest};
use crate::{AppError, Result};

/// A cancellable armed timer.
pub trait DelayTask: Send + Sync {
    /// Stop the timer; firing after cancellation must not happen.
    fn cancel(&self);
}

/// Arms timers that re-submit a DELAYED request when they fire.
pub trait DelayScheduler: Send + Sync {
    /// Arm a timer for `delay`.
    fn schedule(&self, delay: &Delay) -> Box<dyn DelayTask>;
}

struct PendingDelay {
    delay: Delay,
    task: Box<dyn DelayTask>,
}

/// Owns every pending delay.
pub struct DelayManager {
    scheduler: Arc<dyn DelayScheduler>,
    pending: Mutex<HashMap<String, PendingDelay>>,
}

impl DelayManager {
    /// Create an empty registry arming timers through `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn DelayScheduler>) -> Self {
        Self {
            scheduler,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Defer a brand-new request for the first time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvariantViolation` if a delay is already
    /// registered for the request's dispatch id; dispatch ids are minted
    /// fresh per trigger, so a collision means a request was replayed.
    pub fn register_and_delay(&self, request: &ScheduleRequest) -> Result<Delay> {
        let mut pending = self.lock();
        if pending.contains_key(request.dispatch_id()) {
            return Err(AppError::InvariantViolation(format!(
                "delay already registered for dispatch {}",
                request.dispatch_id()
            )));
        }
        let delay = self.arm(&mut pending, request);
        info!(
            dispatch_id = %delay.dispatch_id(),
            schedule_at = %delay.schedule_at,
            "delay registered"
        );
        Ok(delay)
    }

    /// Re-arm the delay for a request's dispatch id.
    ///
    /// Any timer already registered for the dispatch is cancelled first.
    pub fn delay(&self, request: &ScheduleRequest) -> Delay {
        let mut pending = self.lock();
        if let Some(previous) = pending.remove(request.dispatch_id()) {
            previous.task.cancel();
        }
        let delay = self.arm(&mut pending, request);
        debug!(
            dispatch_id = %delay.dispatch_id(),
            schedule_at = %delay.schedule_at,
            "delay re-armed"
        );
        delay
    }

    /// Cancel and remove the delay for a request's dispatch id.
    ///
    /// Returns `None` if nothing was registered.
    pub fn delete(&self, request: &ScheduleRequest) -> Option<Delay> {
        let removed = self.lock().remove(request.dispatch_id());
        if let Some(entry) = removed {
            entry.task.cancel();
            debug!(dispatch_id = %request.dispatch_id(), "delay deleted");
            Some(entry.delay)
        } else {
            debug!(dispatch_id = %request.dispatch_id(), "no delay to delete");
            None
        }
    }

    /// Whether a delay is registered for `dispatch_id`.
    #[must_use]
    pub fn contains(&self, dispatch_id: &str) -> bool {
        self.lock().contains_key(dispatch_id)
    }

    /// Number of pending delays.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Cancel every pending delay, returning how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingDelay> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.task.cancel();
        }
        if !drained.is_empty() {
            warn!(count = drained.len(), "cancelled pending delays");
        }
        drained.len()
    }

    fn arm(&self, pending: &mut HashMap<String, PendingDelay>, request: &ScheduleRequest) -> Delay {
        let delay = Delay::from_request(request.clone());
        let task = self.scheduler.schedule(&delay);
        pending.insert(
            delay.dispatch_id().to_owned(),
            PendingDelay {
                delay: delay.clone(),
                task,
            },
        );
        delay
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingDelay>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
