//! Triggered and delayed schedulers plus the factory selecting between them.

use std::sync::Arc;

use tracing::{debug, error};

use super::delay::DelayManager;
use super::{ScheduleAction, ScheduleResponse};
use crate::deliver::DeliverProcessor;
use crate::models::delivery::DeliverRequest;
use crate::models::schedule::{ScheduleRequest, ScheduleType};
use crate::{AppError, Result};

/// Executes a chosen [`ScheduleAction`] for one kind of request.
pub trait Scheduler: Send + Sync {
    /// Whether this scheduler handles requests of `schedule_type`.
    fn supports(&self, schedule_type: ScheduleType) -> bool;

    /// Execute `action` for `request`.
    ///
    /// # Errors
    ///
    /// Returns an error when bookkeeping invariants are broken; delivery
    /// failures are reported inside the returned response instead.
    fn schedule(
        &self,
        action: ScheduleAction,
        request: &ScheduleRequest,
    ) -> Result<ScheduleResponse>;
}

/// Handles requests created directly from a trigger.
pub struct TriggeredScheduler {
    deliver_processor: Arc<DeliverProcessor>,
    delay_manager: Arc<DelayManager>,
}

impl TriggeredScheduler {
    /// Create the scheduler.
    #[must_use]
    pub fn new(deliver_processor: Arc<DeliverProcessor>, delay_manager: Arc<DelayManager>) -> Self {
        Self {
            deliver_processor,
            delay_manager,
        }
    }
}

impl Scheduler for TriggeredScheduler {
    fn supports(&self, schedule_type: ScheduleType) -> bool {
        schedule_type == ScheduleType::Triggered
    }

    fn schedule(
        &self,
        action: ScheduleAction,
        request: &ScheduleRequest,
    ) -> Result<ScheduleResponse> {
        match action {
            ScheduleAction::Deliver => Ok(deliver(&self.deliver_processor, request)),
            ScheduleAction::Delay => {
                let delay = self.delay_manager.register_and_delay(request)?;
                Ok(ScheduleResponse::Delay(delay))
            }
            ScheduleAction::Ignore => {
                debug!(dispatch_id = %request.dispatch_id(), "triggered schedule ignored");
                Ok(ScheduleResponse::Ignore(None))
            }
        }
    }
}

/// Handles requests re-submitted by a fired delay.
pub struct DelayedScheduler {
    deliver_processor: Arc<DeliverProcessor>,
    delay_manager: Arc<DelayManager>,
}

impl DelayedScheduler {
    /// Create the scheduler.
    #[must_use]
    pub fn new(deliver_processor: Arc<DeliverProcessor>, delay_manager: Arc<DelayManager>) -> Self {
        Self {
            deliver_processor,
            delay_manager,
        }
    }
}

impl Scheduler for DelayedScheduler {
    fn supports(&self, schedule_type: ScheduleType) -> bool {
        schedule_type == ScheduleType::Delayed
    }

    fn schedule(
        &self,
        action: ScheduleAction,
        request: &ScheduleRequest,
    ) -> Result<ScheduleResponse> {
        match action {
            ScheduleAction::Deliver => {
                if self.delay_manager.delete(request).is_none() {
                    error!(
                        dispatch_id = %request.dispatch_id(),
                        "delayed request without registered delay"
                    );
                    return Err(AppError::InvariantViolation(format!(
                        "no delay registered for delayed dispatch {}",
                        request.dispatch_id()
                    )));
                }
                Ok(deliver(&self.deliver_processor, request))
            }
            ScheduleAction::Delay => Ok(ScheduleResponse::Delay(self.delay_manager.delay(request))),
            ScheduleAction::Ignore => {
                let delay = self.delay_manager.delete(request);
                debug!(dispatch_id = %request.dispatch_id(), "delayed schedule ignored");
                Ok(ScheduleResponse::Ignore(delay))
            }
        }
    }
}

fn deliver(processor: &DeliverProcessor, request: &ScheduleRequest) -> ScheduleResponse {
    let deliver_request = DeliverRequest::from_schedule_request(request);
    ScheduleResponse::Deliver(processor.process(deliver_request))
}

/// Selects the first scheduler supporting a request's type.
pub struct SchedulerFactory {
    schedulers: Vec<Arc<dyn Scheduler>>,
}

impl SchedulerFactory {
    /// Factory over `schedulers`, consulted in order.
    #[must_use]
    pub fn new(schedulers: Vec<Arc<dyn Scheduler>>) -> Self {
        Self { schedulers }
    }

    /// The triggered and delayed schedulers sharing one processor and registry.
    #[must_use]
    pub fn standard(
        deliver_processor: &Arc<DeliverProcessor>,
        delay_manager: &Arc<DelayManager>,
    ) -> Self {
        let triggered: Arc<dyn Scheduler> = Arc::new(TriggeredScheduler::new(
            Arc::clone(deliver_processor),
            Arc::clone(delay_manager),
        ));
        let delayed: Arc<dyn Scheduler> = Arc::new(DelayedScheduler::new(
            Arc::clone(deliver_processor),
            Arc::clone(delay_manager),
        ));
        Self::new(vec![triggered, delayed])
    }

    /// Scheduler for `schedule_type`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` if no scheduler supports the type.
    pub fn get(&self, schedule_type: ScheduleType) -> Result<&dyn Scheduler> {
        self.schedulers
            .iter()
            .find(|scheduler| scheduler.supports(schedule_type))
            .map(Arc::as_ref)
            .ok_or_else(|| {
                AppError::Unsupported(format!(
                    "no scheduler supports schedule type {}",
                    schedule_type.as_str()
                ))
            })
    }
}
