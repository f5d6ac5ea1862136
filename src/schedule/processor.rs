//! Entry point for every schedule request, triggered or fired.

use tracing::{error, info, info_span};

use super::determiner::ScheduleActionDeterminer;
use super::scheduler::SchedulerFactory;
use super::ScheduleResponse;
use crate::models::schedule::ScheduleRequest;
use crate::Result;

/// Determines the action for a request and runs it on the matching scheduler.
pub struct ScheduleProcessor {
    determiner: ScheduleActionDeterminer,
    schedulers: SchedulerFactory,
}

impl ScheduleProcessor {
    /// Create the processor.
    #[must_use]
    pub fn new(determiner: ScheduleActionDeterminer, schedulers: SchedulerFactory) -> Self {
        Self {
            determiner,
            schedulers,
        }
    }

    /// Process `request` to a schedule response.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unsupported` when no scheduler handles the
    /// request type and `AppError::InvariantViolation` when delay
    /// bookkeeping is inconsistent. Both are logged here.
    pub fn process(&self, request: &ScheduleRequest) -> Result<ScheduleResponse> {
        let _span = info_span!(
            "schedule",
            dispatch_id = %request.dispatch_id(),
            in_app_message_key = request.schedule.in_app_message_key,
            schedule_type = request.schedule_type.as_str(),
        )
        .entered();

        let action = self.determiner.determine(request);
        let result = self
            .schedulers
            .get(request.schedule_type)
            .and_then(|scheduler| scheduler.schedule(action, request));

        match result {
            Ok(response) => {
                if let Some(deliver) = response.deliver_response() {
                    info!(%action, code = %deliver.code(), "schedule processed");
                } else {
                    info!(%action, "schedule processed");
                }
                Ok(response)
            }
            Err(err) => {
                error!(%err, %action, "schedule processing failed");
                Err(err)
            }
        }
    }
}
