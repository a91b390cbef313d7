// Synchronous observer lists for history and reset notifications
use super::vehicle::HistoryEvent;

pub type HistoryListener = Box<dyn FnMut(&HistoryEvent) + Send>;
pub type ResetListener = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Dispatches every published event to all listeners of its kind, in
/// registration order, before `publish_*` returns. Nothing is buffered, so
/// late subscribers only see later events.
#[derive(Default)]
pub struct NotificationBus {
    history: Vec<(SubscriptionId, HistoryListener)>,
    reset: Vec<(SubscriptionId, ResetListener)>,
    next_id: u64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_history<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&HistoryEvent) + Send + 'static,
    {
        let id = self.next_id();
        self.history.push((id, Box::new(listener)));
        id
    }

    pub fn subscribe_reset<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut() + Send + 'static,
    {
        let id = self.next_id();
        self.reset.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener of either kind. Returns `false` if `id` is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listener_count();
        self.history.retain(|(existing, _)| *existing != id);
        self.reset.retain(|(existing, _)| *existing != id);
        self.listener_count() != before
    }

    pub fn publish_history(&mut self, event: &HistoryEvent) {
        for (_, listener) in self.history.iter_mut() {
            listener(event);
        }
    }

    pub fn publish_reset(&mut self) {
        for (_, listener) in self.reset.iter_mut() {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.history.len() + self.reset.len()
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("history_listeners", &self.history.len())
            .field("reset_listeners", &self.reset.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::{HistoryPoint, Vehicle};
    use std::sync::{Arc, Mutex};

    fn event() -> HistoryEvent {
        HistoryEvent::new(
            &Vehicle::new("Bus 1".to_string(), 0),
            HistoryPoint {
                timestamp: 100,
                speed: 25.0,
                state_of_charge: 75.0,
            },
        )
    }

    #[test]
    fn test_history_listeners_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut bus = NotificationBus::new();
        for tag in ["first", "second", "third"] {
            let calls = calls.clone();
            bus.subscribe_history(move |e| calls.lock().unwrap().push((tag, e.point.timestamp)));
        }

        bus.publish_history(&event());

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("first", 100), ("second", 100), ("third", 100)]
        );
    }

    #[test]
    fn test_reset_only_reaches_reset_listeners() {
        let history_calls = Arc::new(Mutex::new(0));
        let reset_calls = Arc::new(Mutex::new(0));
        let mut bus = NotificationBus::new();
        {
            let history_calls = history_calls.clone();
            bus.subscribe_history(move |_| *history_calls.lock().unwrap() += 1);
        }
        {
            let reset_calls = reset_calls.clone();
            bus.subscribe_reset(move || *reset_calls.lock().unwrap() += 1);
        }

        bus.publish_reset();

        assert_eq!(*history_calls.lock().unwrap(), 0);
        assert_eq!(*reset_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let calls = Arc::new(Mutex::new(0));
        let mut bus = NotificationBus::new();
        let id = {
            let calls = calls.clone();
            bus.subscribe_history(move |_| *calls.lock().unwrap() += 1)
        };

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish_history(&event());

        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(bus.listener_count(), 0);
    }
}
