//! Background timer task.
//!
//! Keeps a `BTreeMap<Instant, Entry>` ordered by deadline and parks on
//! `tokio::time::sleep_until` for the earliest one.  Zero polling: the task
//! wakes only when a timer fires, a command arrives, or shutdown is
//! requested.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ScheduleId, TimerCommand};
use crate::supervisor::bus::{BusHandle, BusPayload};

#[derive(Debug)]
struct Entry {
    id: ScheduleId,
    target_method: String,
    payload: BusPayload,
}

pub struct TimerService {
    bus: BusHandle,
    cmd_rx: mpsc::Receiver<TimerCommand>,
    shutdown: CancellationToken,
}

impl TimerService {
    pub fn new(
        bus: BusHandle,
        cmd_rx: mpsc::Receiver<TimerCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { bus, cmd_rx, shutdown }
    }

    /// Run until shutdown or until every [`super::TimerHandle`] is dropped.
    pub async fn run(mut self) {
        let mut queue: BTreeMap<Instant, Entry> = BTreeMap::new();
        let mut deadlines: HashMap<ScheduleId, Instant> = HashMap::new();

        info!("timer service running");

        loop {
            let next_deadline = queue.keys().next().copied();

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!(pending = queue.len(), "timer service shutting down");
                    break;
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(TimerCommand::Schedule { id, delay, target_method, payload }) => {
                            let deadline = insert_unique(
                                &mut queue,
                                Instant::now() + delay,
                                Entry { id: id.clone(), target_method, payload },
                            );
                            debug!(schedule_id = %id, ?delay, "scheduled");
                            deadlines.insert(id, deadline);
                        }
                        Some(TimerCommand::Cancel { id }) => {
                            match deadlines.remove(&id) {
                                Some(deadline) => {
                                    queue.remove(&deadline);
                                    debug!(schedule_id = %id, "cancelled");
                                }
                                None => debug!(schedule_id = %id, "cancel: not pending"),
                            }
                        }
                        None => {
                            info!("all timer handles dropped, timer service exiting");
                            break;
                        }
                    }
                }

                _ = async {
                    match next_deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                } => {
                    if let Some((_, entry)) = queue.pop_first() {
                        deadlines.remove(&entry.id);
                        debug!(schedule_id = %entry.id, target = %entry.target_method, "timer firing");
                        // Wait for bus space; a due timer is never dropped.
                        tokio::select! {
                            biased;
                            _ = self.shutdown.cancelled() => {
                                info!(schedule_id = %entry.id, "timer service shutting down with a firing in flight");
                                break;
                            }
                            sent = self.bus.publish(&entry.target_method, entry.payload) => {
                                if let Err(e) = sent {
                                    warn!(
                                        schedule_id = %entry.id,
                                        target = %entry.target_method,
                                        error = %e,
                                        "timer: failed to emit notification"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Insert, nudging the key by 1ns while it collides.  Returns the key used.
fn insert_unique(queue: &mut BTreeMap<Instant, Entry>, mut deadline: Instant, entry: Entry) -> Instant {
    while queue.contains_key(&deadline) {
        deadline += Duration::from_nanos(1);
    }
    queue.insert(deadline, entry);
    deadline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::timer::{TimerHandle, channel};
    use crate::supervisor::bus::{BusMessage, SupervisorBus};
    use tokio::time;

    fn spawn_test_timer() -> (TimerHandle, CancellationToken, mpsc::Receiver<BusMessage>) {
        let bus = SupervisorBus::new(16);
        let (handle, cmd_rx) = channel(16);
        let shutdown = CancellationToken::new();
        tokio::spawn(TimerService::new(bus.handle.clone(), cmd_rx, shutdown.clone()).run());
        (handle, shutdown, bus.rx)
    }

    fn method_of(msg: BusMessage) -> String {
        match msg {
            BusMessage::Notification { method, .. } => method,
            BusMessage::Request { .. } => panic!("expected notification"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (timers, shutdown, mut rx) = spawn_test_timer();
        timers.schedule(Duration::from_secs(2), "test/once").unwrap();

        time::sleep(Duration::from_millis(1_900)).await;
        assert!(rx.try_recv().is_err(), "fired too early");

        time::sleep(Duration::from_millis(200)).await;
        let msg = time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(method_of(msg), "test/once");

        // One-shot: nothing more arrives.
        time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());

        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (timers, shutdown, mut rx) = spawn_test_timer();
        let id = timers.schedule(Duration::from_secs(1), "test/cancelled").unwrap();
        timers.schedule(Duration::from_secs(3), "test/kept").unwrap();
        timers.cancel(&id);

        time::sleep(Duration::from_secs(4)).await;
        let msg = time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(method_of(msg), "test/kept");
        assert!(rx.try_recv().is_err());

        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn firing_waits_for_a_full_bus() {
        let bus = SupervisorBus::new(1);
        let mut rx = bus.rx;
        let (timers, cmd_rx) = channel(16);
        let shutdown = CancellationToken::new();
        tokio::spawn(TimerService::new(bus.handle.clone(), cmd_rx, shutdown.clone()).run());

        bus.handle.notify("test/filler", BusPayload::Empty).unwrap();
        timers.schedule(Duration::from_secs(2), "test/due").unwrap();

        time::sleep(Duration::from_secs(13)).await;
        assert_eq!(method_of(rx.recv().await.unwrap()), "test/filler");
        let msg = time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(method_of(msg), "test/due");

        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wins_over_blocked_firing() {
        let bus = SupervisorBus::new(1);
        let (timers, cmd_rx) = channel(16);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(TimerService::new(bus.handle.clone(), cmd_rx, shutdown.clone()).run());

        bus.handle.notify("test/filler", BusPayload::Empty).unwrap();
        timers.schedule(Duration::from_secs(1), "test/due").unwrap();
        time::sleep(Duration::from_secs(2)).await;

        shutdown.cancel();
        time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn same_deadline_entries_both_fire() {
        let (timers, shutdown, mut rx) = spawn_test_timer();
        timers.schedule(Duration::ZERO, "test/a").unwrap();
        timers.schedule(Duration::ZERO, "test/b").unwrap();

        time::sleep(Duration::from_millis(10)).await;
        let mut got = vec![
            method_of(rx.recv().await.unwrap()),
            method_of(rx.recv().await.unwrap()),
        ];
        got.sort();
        assert_eq!(got, vec!["test/a", "test/b"]);

        shutdown.cancel();
    }
}
