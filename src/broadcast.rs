use crate::counters::CountersSnapshot;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum BroadcastEvent {
    Counters(CountersSnapshot),
    Error(String),
}

#[derive(Debug)]
struct Observer {
    tx: mpsc::Sender<BroadcastEvent>,
    wants_counters: bool,
}

/// Fan-out registry for live observers. Counter events go only to observers
/// that toggled them on; error events go to everyone. Delivery is
/// fire-and-forget: a full or closed observer queue never blocks the
/// pipeline or delivery to other observers.
pub struct ResultBroadcaster {
    queue_capacity: usize,
    observers: Mutex<HashMap<Uuid, Observer>>,
}

impl ResultBroadcaster {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            observers: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<BroadcastEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        if let Ok(mut observers) = self.observers.lock() {
            observers.insert(
                id,
                Observer {
                    tx,
                    wants_counters: false,
                },
            );
        }
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.remove(&id);
        }
    }

    pub fn set_wants_counters(&self, id: Uuid, wants: bool) {
        if let Ok(mut observers) = self.observers.lock() {
            if let Some(observer) = observers.get_mut(&id) {
                observer.wants_counters = wants;
            }
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|obs| obs.len()).unwrap_or(0)
    }

    pub fn publish(&self, event: &BroadcastEvent) {
        let Ok(mut observers) = self.observers.lock() else {
            return;
        };

        let mut gone = Vec::new();
        for (id, observer) in observers.iter() {
            if matches!(event, BroadcastEvent::Counters(_)) && !observer.wants_counters {
                continue;
            }
            match observer.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(observer = %id, "observer queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    gone.push(*id);
                }
            }
        }
        for id in gone {
            observers.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters_event() -> BroadcastEvent {
        BroadcastEvent::Counters(CountersSnapshot {
            below_range: 0,
            above_range: 0,
            ignored_station: 0,
            persisted: 1,
            persist_failed: 0,
            total: 1,
        })
    }

    #[tokio::test]
    async fn counters_go_only_to_opted_in_observers() {
        let broadcaster = ResultBroadcaster::new(8);
        let (on_id, mut on_rx) = broadcaster.subscribe();
        let (_off_id, mut off_rx) = broadcaster.subscribe();
        broadcaster.set_wants_counters(on_id, true);

        broadcaster.publish(&counters_event());

        assert!(matches!(
            on_rx.try_recv(),
            Ok(BroadcastEvent::Counters(_))
        ));
        assert!(off_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn errors_go_to_everyone_regardless_of_toggle() {
        let broadcaster = ResultBroadcaster::new(8);
        let (_a, mut a_rx) = broadcaster.subscribe();
        let (b, mut b_rx) = broadcaster.subscribe();
        broadcaster.set_wants_counters(b, true);

        broadcaster.publish(&BroadcastEvent::Error("stream down".to_string()));

        assert!(matches!(a_rx.try_recv(), Ok(BroadcastEvent::Error(_))));
        assert!(matches!(b_rx.try_recv(), Ok(BroadcastEvent::Error(_))));
    }

    #[tokio::test]
    async fn full_observer_does_not_block_others() {
        let broadcaster = ResultBroadcaster::new(1);
        let (slow, _slow_rx) = broadcaster.subscribe();
        let (fast, mut fast_rx) = broadcaster.subscribe();
        broadcaster.set_wants_counters(slow, true);
        broadcaster.set_wants_counters(fast, true);

        // second publish overflows the slow observer's queue
        broadcaster.publish(&counters_event());
        broadcaster.publish(&counters_event());

        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_err()); // fast queue also capacity 1
        assert_eq!(broadcaster.observer_count(), 2);
    }

    #[tokio::test]
    async fn closed_observers_are_dropped_on_publish() {
        let broadcaster = ResultBroadcaster::new(8);
        let (_id, rx) = broadcaster.subscribe();
        drop(rx);
        assert_eq!(broadcaster.observer_count(), 1);

        broadcaster.publish(&BroadcastEvent::Error("gone".to_string()));
        assert_eq!(broadcaster.observer_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_observer() {
        let broadcaster = ResultBroadcaster::new(8);
        let (id, _rx) = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 1);
        broadcaster.unsubscribe(id);
        assert_eq!(broadcaster.observer_count(), 0);
    }
}
