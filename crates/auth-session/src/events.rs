//! Auth event bus.
//!
//! Interested surfaces (navbar, page controllers) subscribe to session
//! events instead of polling storage. Subscriptions are handle-based so a
//! surface can detach when it is torn down.

use crate::SessionState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Session lifecycle events.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// The session FSM changed state.
    StateChanged {
        state: SessionState,
        user_id: Option<String>,
        email: Option<String>,
    },
    /// A user signed in (fresh tokens issued).
    SignedIn {
        user_id: String,
        email: Option<String>,
    },
    /// The access token was replaced via refresh.
    SessionRefreshed { user_id: String },
    /// The session ended.
    SignedOut,
}

/// Handle returned by [`EventBus::subscribe`]; pass it back to
/// [`EventBus::unsubscribe`] to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Dispatches [`AuthEvent`]s to registered listeners.
///
/// Publishing the same event twice in a row delivers it once; surfaces
/// re-rendering on every redundant notification was the failure mode this
/// bus exists to remove.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    last_event: Mutex<Option<AuthEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The returned token detaches it.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionToken
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap()
            .push((id, Arc::new(listener)));
        SubscriptionToken(id)
    }

    /// Remove a listener. Returns false if the token was already detached.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let original_len = listeners.len();
        listeners.retain(|(id, _)| *id != token.0);
        listeners.len() != original_len
    }

    /// Deliver an event to all listeners, unless it repeats the previous
    /// event exactly.
    pub fn publish(&self, event: AuthEvent) {
        {
            let mut last = self.last_event.lock().unwrap();
            if last.as_ref() == Some(&event) {
                tracing::debug!(event = ?event, "Suppressing duplicate event");
                return;
            }
            *last = Some(event.clone());
        }

        // Dispatch outside the lock so a listener may subscribe or
        // unsubscribe without deadlocking.
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap();
            listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in snapshot {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counter_listener(count: Arc<AtomicUsize>) -> impl Fn(&AuthEvent) + Send + Sync {
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn listeners_receive_published_events() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(counter_listener(count.clone()));

        bus.publish(AuthEvent::SignedOut);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let token = bus.subscribe(counter_listener(count.clone()));

        bus.publish(AuthEvent::SignedOut);
        assert!(bus.unsubscribe(token));
        assert!(!bus.unsubscribe(token));

        bus.publish(AuthEvent::SignedIn {
            user_id: "user-1".to_string(),
            email: None,
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn consecutive_duplicates_are_suppressed() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(counter_listener(count.clone()));

        bus.publish(AuthEvent::SignedOut);
        bus.publish(AuthEvent::SignedOut);
        bus.publish(AuthEvent::SignedOut);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_consecutive_duplicates_are_delivered() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(counter_listener(count.clone()));

        let signed_in = AuthEvent::SignedIn {
            user_id: "user-1".to_string(),
            email: None,
        };
        bus.publish(AuthEvent::SignedOut);
        bus.publish(signed_in);
        bus.publish(AuthEvent::SignedOut);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let bus_clone = bus.clone();
        let count_clone = count.clone();
        bus.subscribe(move |_| {
            bus_clone.subscribe(counter_listener(count_clone.clone()));
        });

        bus.publish(AuthEvent::SignedOut);
        bus.publish(AuthEvent::SignedIn {
            user_id: "user-1".to_string(),
            email: None,
        });

        // The listener registered during the first publish saw the second.
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_listeners_all_fire() {
        let bus = EventBus::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        bus.subscribe(counter_listener(a.clone()));
        bus.subscribe(counter_listener(b.clone()));

        bus.publish(AuthEvent::SignedOut);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
