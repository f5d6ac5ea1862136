//! UI-thread dispatchers.
//!
//! [`InlineDispatcher`] runs tasks on the calling thread, which suits hosts
//! that already call in from their UI thread and tests. [`spawn_ui_loop`]
//! starts a single consumer task that runs queued work strictly in order,
//! standing in for a platform main looper.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{UiDispatcher, UiTask};
use crate::errors::catch_panic;

/// Runs every task immediately on the caller's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, task: UiTask) {
        task();
    }
}

/// Sends tasks to the loop started by [`spawn_ui_loop`].
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl UiDispatcher for ChannelDispatcher {
    fn dispatch(&self, task: UiTask) {
        if self.tx.send(task).is_err() {
            warn!("ui loop stopped, dropping task");
        }
    }
}

/// Spawn the serialized UI loop.
///
/// The loop runs until `cancel` fires or every [`ChannelDispatcher`] is
/// dropped. Tasks already queued when `cancel` fires still run. Tasks run
/// one at a time in submission order; a panicking task is logged and the
/// loop moves on.
#[must_use]
pub fn spawn_ui_loop(cancel: CancellationToken) -> (ChannelDispatcher, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<UiTask>();
    let handle = tokio::spawn(async move {
        loop {
            let task = tokio::select! {
                biased;
                maybe_task = rx.recv() => {
                    if let Some(task) = maybe_task {
                        task
                    } else {
                        debug!("ui task channel closed");
                        break;
                    }
                }
                () = cancel.cancelled() => {
                    info!("ui loop shutting down");
                    break;
                }
            };
            let outcome = catch_panic(|| {
                task();
                Ok(())
            });
            if let Err(err) = outcome {
                error!(%err, "ui task failed");
            }
        }
    });
    (ChannelDispatcher { tx }, handle)
}
