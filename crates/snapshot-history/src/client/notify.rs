use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name of the notification broadcast after every successful mutation.
pub const SNAPSHOTS_CHANGED: &str = "select-all-snapshots-changed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Appended,
    Cleared,
}

/// Which store completed the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub store: StoreKind,
}

impl ChangeEvent {
    pub fn name(&self) -> &'static str {
        SNAPSHOTS_CHANGED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Same-process observer list. Callbacks run synchronously on the notifying
/// task, in subscription order.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    observers: RwLock<Vec<(SubscriptionId, Callback)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(callback)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, event: ChangeEvent) {
        // Snapshot the list so callbacks may subscribe or unsubscribe.
        let observers: Vec<Callback> = self
            .observers
            .read()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        tracing::debug!(
            name = event.name(),
            kind = ?event.kind,
            store = ?event.store,
            observers = observers.len(),
            "notifying"
        );
        for callback in observers {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn appended_remote() -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Appended,
            store: StoreKind::Remote,
        }
    }

    #[test]
    fn notify_reaches_every_subscriber() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = seen.clone();
            notifier.subscribe(move |event| seen.lock().push((tag, *event)));
        }

        notifier.notify(appended_remote());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("first", appended_remote()));
        assert_eq!(seen[1], ("second", appended_remote()));
    }

    #[test]
    fn unsubscribed_callback_is_not_called() {
        let notifier = ChangeNotifier::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let id = notifier.subscribe(move |_| *counter.lock() += 1);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(appended_remote());

        assert_eq!(*calls.lock(), 0);
        assert!(notifier.is_empty());
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let notifier = Arc::new(ChangeNotifier::new());
        let slot = Arc::new(Mutex::new(None));
        let inner_notifier = notifier.clone();
        let inner_slot = slot.clone();
        let id = notifier.subscribe(move |_| {
            if let Some(id) = inner_slot.lock().take() {
                inner_notifier.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        notifier.notify(appended_remote());
        assert!(notifier.is_empty());
    }

    #[test]
    fn event_carries_fixed_name() {
        assert_eq!(appended_remote().name(), "select-all-snapshots-changed");
    }
}
