//! Snapshot fan-out from the tick loop to every connected observer.
//!
//! Backed by a bounded `tokio::sync::broadcast` ring: publishing never waits
//! on subscribers, and a subscriber that falls behind loses the oldest
//! snapshots first. Each snapshot supersedes the last, so skipping is safe.

use tokio::sync::broadcast;
use tracing::warn;

use crate::state::Snapshot;

#[derive(Clone)]
pub struct SnapshotBus {
    tx: broadcast::Sender<Snapshot>,
}

impl SnapshotBus {
    /// `capacity` is how many snapshots a slow observer may trail by.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many observers the snapshot was queued for. Zero is fine.
    pub fn publish(&self, snapshot: Snapshot) -> usize {
        self.tx.send(snapshot).unwrap_or(0)
    }

    /// New feeds only see snapshots published after this call.
    pub fn subscribe(&self) -> SnapshotFeed {
        SnapshotFeed {
            rx: self.tx.subscribe(),
            dropped: 0,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct SnapshotFeed {
    rx: broadcast::Receiver<Snapshot>,
    dropped: u64,
}

impl SnapshotFeed {
    /// Next retained snapshot, in tick order. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    warn!(skipped, total = self.dropped, "observer lagging, dropped snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Total snapshots skipped because this feed fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{HATCHBACK, VehicleState};

    fn snap(tick: u64) -> Snapshot {
        Snapshot::capture(tick, &VehicleState::at_rest(&HATCHBACK))
    }

    #[tokio::test]
    async fn publish_without_observers_is_fine() {
        let bus = SnapshotBus::new(4);
        assert_eq!(bus.publish(snap(1)), 0);
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_history() {
        let bus = SnapshotBus::new(4);
        bus.publish(snap(1));
        bus.publish(snap(2));

        let mut feed = bus.subscribe();
        bus.publish(snap(3));
        assert_eq!(feed.recv().await.map(|s| s.tick), Some(3));
    }

    #[tokio::test]
    async fn slow_observer_drops_oldest_and_stays_ordered() {
        let bus = SnapshotBus::new(4);
        let mut feed = bus.subscribe();

        for tick in 1..=10 {
            bus.publish(snap(tick));
        }

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(feed.recv().await.unwrap().tick);
        }
        assert_eq!(seen, [7, 8, 9, 10]);
        assert_eq!(feed.dropped(), 6);
    }

    #[tokio::test]
    async fn dropping_a_feed_removes_the_observer() {
        let bus = SnapshotBus::new(4);
        let a = bus.subscribe();
        let _b = bus.subscribe();
        assert_eq!(bus.observer_count(), 2);

        drop(a);
        assert_eq!(bus.observer_count(), 1);
        assert_eq!(bus.publish(snap(1)), 1);
    }

    #[tokio::test]
    async fn feed_ends_when_bus_is_dropped() {
        let bus = SnapshotBus::new(4);
        let mut feed = bus.subscribe();
        bus.publish(snap(1));
        drop(bus);

        assert_eq!(feed.recv().await.map(|s| s.tick), Some(1));
        assert_eq!(feed.recv().await, None);
    }
}
