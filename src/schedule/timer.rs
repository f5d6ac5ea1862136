//! Tokio-backed delay timers and the fired-delay consumer.
//!
//! Each armed delay is a spawned task sleeping until its fire time. On fire
//! it sends a DELAYED [`ScheduleRequest`] for the same schedule into an
//! `mpsc` channel; [`spawn_delay_consumer`] reads that channel and feeds the
//! requests back into the [`ScheduleProcessor`].

use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::delay::{DelayScheduler, DelayTask};
use super::processor::ScheduleProcessor;
use crate::errors::catch_panic;
use crate::models::schedule::{Delay, ScheduleRequest};

/// Arms delays as tokio tasks on a fixed runtime.
pub struct TokioDelayScheduler {
    runtime: Handle,
    fired_tx: mpsc::Sender<ScheduleRequest>,
}

impl TokioDelayScheduler {
    /// Scheduler spawning timers on `runtime` and reporting fires to `fired_tx`.
    #[must_use]
    pub fn new(runtime: Handle, fired_tx: mpsc::Sender<ScheduleRequest>) -> Self {
        Self { runtime, fired_tx }
    }
}

struct TokioDelayTask {
    cancel: CancellationToken,
}

impl DelayTask for TokioDelayTask {
    fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl DelayScheduler for TokioDelayScheduler {
    fn schedule(&self, delay: &Delay) -> Box<dyn DelayTask> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let fired_tx = self.fired_tx.clone();
        let schedule = delay.request.schedule.clone();
        let wait = delay.remaining_from(Utc::now());
        let span = info_span!("delay_timer", dispatch_id = %schedule.dispatch_id);

        self.runtime.spawn(
            async move {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("delay timer cancelled");
                    }
                    () = tokio::time::sleep(wait) => {
                        let request = ScheduleRequest::delayed(schedule, Utc::now());
                        if fired_tx.send(request).await.is_err() {
                            warn!("delay consumer gone, dropping fired delay");
                        }
                    }
                }
            }
            .instrument(span),
        );

        Box::new(TokioDelayTask { cancel })
    }
}

/// Spawn a background task feeding fired delays to `processor`.
///
/// The task runs until the `CancellationToken` fires or the channel closes.
#[must_use]
pub fn spawn_delay_consumer(
    mut rx: mpsc::Receiver<ScheduleRequest>,
    processor: Arc<ScheduleProcessor>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let request = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("delay consumer shutting down");
                    break;
                }
                maybe_request = rx.recv() => {
                    if let Some(request) = maybe_request {
                        request
                    } else {
                        info!("fired delay channel closed");
                        break;
                    }
                }
            };

            if let Err(err) = catch_panic(|| processor.process(&request)) {
                error!(
                    %err,
                    dispatch_id = %request.dispatch_id(),
                    "fired delay processing failed"
                );
            }
        }
    })
}
