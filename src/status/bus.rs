//! `StatusBus` — broadcasts the latest `AgentStatus` snapshot to any number
//! of subscribers.
//!
//! Grounded in the teacher's `TokioBroadcastBus` (`event_bus/tokio_bus.rs`)
//! for the publish/subscribe shape, but built on `tokio::sync::watch` instead
//! of `broadcast`: the backpressure rule this runtime needs ("subscribers
//! may drop intermediate snapshots but must always eventually see the
//! latest") is exactly `watch`'s delivery semantics, whereas `broadcast`
//! would require subscribers to handle `Lagged` errors themselves.

use tokio::sync::watch;

use super::snapshot::AgentStatus;

pub struct StatusBus {
    sender: watch::Sender<AgentStatus>,
}

impl StatusBus {
    pub fn new(initial: AgentStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publish a new snapshot, replacing whatever the last one was.
    pub fn publish(&self, snapshot: AgentStatus) {
        // `send` only errs when every receiver has dropped; there is nothing
        // actionable to do with that from the publisher's side.
        let _ = self.sender.send(snapshot);
    }

    /// Subscribe to future snapshots. The new receiver immediately observes
    /// the current value on its first `.borrow()`/`.changed()`.
    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> AgentStatus {
        self.sender.borrow().clone()
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new(AgentStatus::initial())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::snapshot::AgentState;

    #[tokio::test]
    async fn subscriber_observes_latest_snapshot() {
        let bus = StatusBus::default();
        let mut rx = bus.subscribe();

        let mut next = AgentStatus::initial();
        next.state = AgentState::Running;
        next.loop_count = 3;
        bus.publish(next);

        rx.changed().await.unwrap();
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.state, AgentState::Running);
        assert_eq!(snapshot.loop_count, 3);
    }

    #[test]
    fn current_reflects_last_publish() {
        let bus = StatusBus::default();
        let mut next = AgentStatus::initial();
        next.loop_count = 7;
        bus.publish(next);
        assert_eq!(bus.current().loop_count, 7);
    }

    #[tokio::test]
    async fn slow_subscriber_only_sees_latest_after_multiple_publishes() {
        let bus = StatusBus::default();
        let rx = bus.subscribe();

        for i in 0..5 {
            let mut s = AgentStatus::initial();
            s.loop_count = i;
            bus.publish(s);
        }

        // A subscriber that never polled in between only ever observes the
        // latest value, never an intermediate one.
        assert_eq!(rx.borrow().loop_count, 4);
    }
}
