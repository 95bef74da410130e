//! Timer subsystem — one-shot, cancellable delayed bus notifications.
//!
//! The engine never sleeps.  When it needs something to happen later (the
//! deferred deactivation, the capture restart backoff) it asks the timer
//! service to emit a bus notification after a delay, and keeps the returned
//! [`ScheduleId`] so it can cancel.  The notification then re-enters the
//! supervisor like any other message.
//!
//! [`TimerHandle`] calls never wait: commands go through a bounded channel
//! with `try_send`, so scheduling from inside a bus handler cannot stall the
//! supervisor loop.

mod service;

pub use service::TimerService;

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::AppError;
use crate::supervisor::bus::BusPayload;

/// Identifier of one scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleId(pub String);

impl std::fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Command sent from a [`TimerHandle`] to the [`TimerService`] task.
#[derive(Debug)]
pub enum TimerCommand {
    Schedule {
        id: ScheduleId,
        delay: Duration,
        target_method: String,
        payload: BusPayload,
    },
    Cancel {
        id: ScheduleId,
    },
}

/// Cloneable, non-blocking client of the timer service.
#[derive(Clone)]
pub struct TimerHandle {
    cmd_tx: mpsc::Sender<TimerCommand>,
}

/// Create a handle and the receiver the service (or a test) consumes.
pub fn channel(buffer: usize) -> (TimerHandle, mpsc::Receiver<TimerCommand>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
    (TimerHandle { cmd_tx }, cmd_rx)
}

impl TimerHandle {
    /// Emit `target_method` once, after `delay`.  The notification carries
    /// [`BusPayload::Timer`] with the returned id, so the receiver can tell a
    /// stale firing from the one it is waiting for.
    pub fn schedule(&self, delay: Duration, target_method: &str) -> Result<ScheduleId, AppError> {
        let id = ScheduleId(Uuid::new_v4().to_string());
        self.cmd_tx
            .try_send(TimerCommand::Schedule {
                id: id.clone(),
                delay,
                target_method: target_method.to_string(),
                payload: BusPayload::Timer(id.clone()),
            })
            .map_err(|e| AppError::Comms(format!("timer service unavailable: {e}")))?;
        Ok(id)
    }

    /// Drop a pending notification.  Unknown or already-fired ids are ignored.
    pub fn cancel(&self, id: &ScheduleId) {
        if let Err(e) = self.cmd_tx.try_send(TimerCommand::Cancel { id: id.clone() }) {
            tracing::warn!(schedule_id = %id, error = %e, "timer cancel not delivered");
        }
    }
}
