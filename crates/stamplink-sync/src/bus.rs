//! Same-device publish/subscribe for ledger updates.

use stamplink_canonical::MemberId;
use stamplink_ledger::UpdatePublisher;
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of signals buffered per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Signal carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncSignal {
    /// A mutation for `member_id` was committed by some view on this device.
    LedgerUpdated {
        /// Member whose record changed.
        member_id: MemberId,
    },
}

/// In-process bus connecting every view on one device.
///
/// Attach it to a `LedgerGateway` as its publisher and hand it to each
/// reconciliation engine.
#[derive(Debug, Clone)]
pub struct SyncBus {
    sender: broadcast::Sender<SyncSignal>,
}

impl SyncBus {
    /// Creates a bus buffering `capacity` signals per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to future signals.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncSignal> {
        self.sender.subscribe()
    }

    /// Publishes a signal. Returns how many subscribers it reached.
    pub fn publish(&self, signal: SyncSignal) -> usize {
        self.sender.send(signal).unwrap_or(0)
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl UpdatePublisher for SyncBus {
    fn ledger_updated(&self, member_id: &MemberId) {
        let reached = self.publish(SyncSignal::LedgerUpdated {
            member_id: member_id.clone(),
        });
        trace!(member = %member_id, reached, "ledger update published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_the_signal() {
        let bus = SyncBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        let id = MemberId::parse("user-1").unwrap();

        bus.ledger_updated(&id);

        let expected = SyncSignal::LedgerUpdated { member_id: id };
        assert_eq!(a.recv().await.unwrap(), expected);
        assert_eq!(b.recv().await.unwrap(), expected);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = SyncBus::default();
        assert_eq!(
            bus.publish(SyncSignal::LedgerUpdated {
                member_id: MemberId::parse("user-1").unwrap()
            }),
            0
        );
    }
}
