//! Dual-backend snapshot client.
//!
//! Every call goes to the remote history service first. Only when the remote
//! cannot be reached does the call run against the [`LocalStore`] instead.
//! Failures never reach the caller: `list` degrades to an empty collection and
//! mutations degrade to silent no-ops.

pub mod local;
pub mod notify;
pub mod remote;

use std::sync::Arc;

use crate::config::{ClientConfig, FallbackPolicy};
use crate::error::CoreResult;
use crate::snapshot::SnapshotCollection;

pub use local::{LocalStore, LOCAL_HISTORY_KEY};
pub use notify::{
    ChangeEvent, ChangeKind, ChangeNotifier, StoreKind, SubscriptionId, SNAPSHOTS_CHANGED,
};
pub use remote::{HttpHistoryRemote, RemoteHistory, RemoteOutcome};

/// Where a call ends up after the remote attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<T> {
    /// The remote served the call.
    Served(T),
    /// The remote answered with an error status and stays authoritative.
    Rejected(u16),
    /// Run the call against the local store.
    Fallback,
}

/// Decides the route for one remote outcome.
pub fn route<T>(outcome: RemoteOutcome<T>, policy: FallbackPolicy) -> Route<T> {
    match (outcome, policy) {
        (RemoteOutcome::Ok(value), _) => Route::Served(value),
        (RemoteOutcome::Failed(status), FallbackPolicy::OnlyWhenUnreachable) => {
            Route::Rejected(status)
        }
        (RemoteOutcome::Failed(_), FallbackPolicy::OnErrorStatus) => Route::Fallback,
        (RemoteOutcome::Unreachable(_), _) => Route::Fallback,
    }
}

pub struct SnapshotClient {
    remote: Arc<dyn RemoteHistory>,
    local: LocalStore,
    policy: FallbackPolicy,
    notifier: ChangeNotifier,
}

impl SnapshotClient {
    pub fn new(remote: Arc<dyn RemoteHistory>, local: LocalStore) -> Self {
        Self {
            remote,
            local,
            policy: FallbackPolicy::default(),
            notifier: ChangeNotifier::new(),
        }
    }

    /// HTTP remote and file-backed local store, both taken from `config`.
    pub fn from_config(config: &ClientConfig) -> CoreResult<Self> {
        let remote = HttpHistoryRemote::new(&config.api_url, config.timeout)?;
        let local = LocalStore::open(config.local_store.clone());
        Ok(Self::new(Arc::new(remote), local).with_policy(config.fallback))
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Records `text`. Blank text is ignored without contacting either store.
    ///
    /// A reachable remote that answers with an error status under
    /// [`FallbackPolicy::OnlyWhenUnreachable`] changes nothing, so no local
    /// write happens and no change notification is sent. Callers used to
    /// seeing a notification after every completed request will not get one
    /// here.
    pub async fn append(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let outcome = self.remote.append(text).await;
        match self.route_logged("append", outcome) {
            Route::Served(()) => self.changed(ChangeKind::Appended, StoreKind::Remote),
            Route::Rejected(_) => {}
            Route::Fallback => match self.local.append(text) {
                Ok(_) => self.changed(ChangeKind::Appended, StoreKind::Local),
                Err(error) => tracing::warn!("local append failed: {error}"),
            },
        }
    }

    /// The full history from whichever store serves the call.
    pub async fn list(&self) -> SnapshotCollection {
        let outcome = self.remote.list().await;
        match self.route_logged("list", outcome) {
            Route::Served(snapshots) => snapshots,
            Route::Rejected(_) => Vec::new(),
            Route::Fallback => self.local.list(),
        }
    }

    /// Clears whichever store serves the call. As with [`Self::append`], a
    /// rejected clear sends no notification.
    pub async fn clear(&self) {
        let outcome = self.remote.clear().await;
        match self.route_logged("clear", outcome) {
            Route::Served(()) => self.changed(ChangeKind::Cleared, StoreKind::Remote),
            Route::Rejected(_) => {}
            Route::Fallback => match self.local.clear() {
                Ok(()) => self.changed(ChangeKind::Cleared, StoreKind::Local),
                Err(error) => tracing::warn!("local clear failed: {error}"),
            },
        }
    }

    fn route_logged<T>(&self, operation: &str, outcome: RemoteOutcome<T>) -> Route<T> {
        match &outcome {
            RemoteOutcome::Ok(_) => {}
            RemoteOutcome::Failed(status) => {
                tracing::warn!(operation, status, "remote history rejected the call")
            }
            RemoteOutcome::Unreachable(reason) => {
                tracing::warn!(operation, "remote history unreachable, using local store: {reason}")
            }
        }
        route(outcome, self.policy)
    }

    fn changed(&self, kind: ChangeKind, store: StoreKind) {
        self.notifier.notify(ChangeEvent { kind, store });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Remote that answers every call with one scripted behaviour.
    #[derive(Clone)]
    enum Behaviour {
        Serve(SnapshotCollection),
        Status(u16),
        Down,
    }

    struct ScriptedRemote {
        behaviour: Behaviour,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRemote {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn outcome<T>(&self, value: T) -> RemoteOutcome<T> {
            match &self.behaviour {
                Behaviour::Serve(_) => RemoteOutcome::Ok(value),
                Behaviour::Status(status) => RemoteOutcome::Failed(*status),
                Behaviour::Down => RemoteOutcome::Unreachable("connection refused".to_string()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl RemoteHistory for ScriptedRemote {
        async fn list(&self) -> RemoteOutcome<SnapshotCollection> {
            self.calls.lock().push("list".to_string());
            let served = match &self.behaviour {
                Behaviour::Serve(snapshots) => snapshots.clone(),
                _ => Vec::new(),
            };
            self.outcome(served)
        }

        async fn append(&self, text: &str) -> RemoteOutcome<()> {
            self.calls.lock().push(format!("append:{text}"));
            self.outcome(())
        }

        async fn clear(&self) -> RemoteOutcome<()> {
            self.calls.lock().push("clear".to_string());
            self.outcome(())
        }
    }

    fn client(remote: Arc<ScriptedRemote>) -> (SnapshotClient, Arc<Mutex<Vec<ChangeEvent>>>) {
        let client = SnapshotClient::new(remote, LocalStore::in_memory());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        client.subscribe(move |event| sink.lock().push(*event));
        (client, events)
    }

    fn snapshot(text: &str, timestamp: u64) -> Snapshot {
        Snapshot {
            text: text.to_string(),
            timestamp,
        }
    }

    #[test]
    fn route_only_falls_back_when_unreachable_by_default() {
        let policy = FallbackPolicy::OnlyWhenUnreachable;
        assert_eq!(route(RemoteOutcome::Ok(1), policy), Route::Served(1));
        assert_eq!(route(RemoteOutcome::<()>::Failed(500), policy), Route::Rejected(500));
        assert_eq!(
            route(RemoteOutcome::<()>::Unreachable("down".into()), policy),
            Route::Fallback
        );
    }

    #[test]
    fn route_falls_back_on_error_status_when_opted_in() {
        let policy = FallbackPolicy::OnErrorStatus;
        assert_eq!(route(RemoteOutcome::Ok(1), policy), Route::Served(1));
        assert_eq!(route(RemoteOutcome::<()>::Failed(503), policy), Route::Fallback);
    }

    #[tokio::test]
    async fn remote_list_is_authoritative_over_local() {
        let served = vec![snapshot("remote", 1)];
        let (client, _) = client(ScriptedRemote::new(Behaviour::Serve(served.clone())));
        client.local().append("local only").expect("seed local");

        assert_eq!(client.list().await, served);
    }

    #[tokio::test]
    async fn empty_remote_list_is_still_authoritative() {
        let (client, _) = client(ScriptedRemote::new(Behaviour::Serve(Vec::new())));
        client.local().append("local only").expect("seed local");

        assert!(client.list().await.is_empty());
    }

    #[tokio::test]
    async fn error_status_list_is_empty_not_local() {
        let (client, _) = client(ScriptedRemote::new(Behaviour::Status(500)));
        client.local().append("local only").expect("seed local");

        assert!(client.list().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_for_every_operation() {
        let remote = ScriptedRemote::new(Behaviour::Down);
        let (client, events) = client(remote.clone());

        client.append("x").await;
        let listed = client.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "x");
        assert_eq!(client.local().list(), listed);

        client.clear().await;
        assert!(client.list().await.is_empty());

        assert_eq!(
            *events.lock(),
            vec![
                ChangeEvent {
                    kind: ChangeKind::Appended,
                    store: StoreKind::Local
                },
                ChangeEvent {
                    kind: ChangeKind::Cleared,
                    store: StoreKind::Local
                },
            ]
        );
        assert_eq!(remote.calls(), vec!["append:x", "list", "clear", "list"]);
    }

    #[tokio::test]
    async fn served_mutations_notify_remote_and_skip_local() {
        let (client, events) = client(ScriptedRemote::new(Behaviour::Serve(Vec::new())));

        client.append("hello").await;
        client.clear().await;

        assert!(client.local().list().is_empty());
        let kinds: Vec<_> = events.lock().iter().map(|e| (e.kind, e.store)).collect();
        assert_eq!(
            kinds,
            vec![
                (ChangeKind::Appended, StoreKind::Remote),
                (ChangeKind::Cleared, StoreKind::Remote),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_mutations_neither_fall_back_nor_notify() {
        let (client, events) = client(ScriptedRemote::new(Behaviour::Status(400)));

        client.append("hello").await;
        client.clear().await;

        assert!(client.local().list().is_empty());
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn error_status_policy_writes_locally() {
        let remote = ScriptedRemote::new(Behaviour::Status(503));
        let client = SnapshotClient::new(remote, LocalStore::in_memory())
            .with_policy(FallbackPolicy::OnErrorStatus);

        client.append("kept").await;

        assert_eq!(client.list().await[0].text, "kept");
    }

    #[tokio::test]
    async fn blank_append_contacts_nothing() {
        let remote = ScriptedRemote::new(Behaviour::Down);
        let (client, events) = client(remote.clone());

        client.append("").await;
        client.append("   ").await;

        assert!(remote.calls().is_empty());
        assert!(client.local().list().is_empty());
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn list_never_notifies() {
        let (client, events) = client(ScriptedRemote::new(Behaviour::Down));
        client.list().await;
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn notification_fires_after_the_write() {
        let remote = ScriptedRemote::new(Behaviour::Down);
        let client = Arc::new(SnapshotClient::new(remote, LocalStore::in_memory()));
        let seen_len = Arc::new(Mutex::new(None));
        let observer_client = Arc::downgrade(&client);
        let sink = seen_len.clone();
        client.subscribe(move |_| {
            if let Some(client) = observer_client.upgrade() {
                *sink.lock() = Some(client.local().list().len());
            }
        });

        client.append("visible").await;

        assert_eq!(*seen_len.lock(), Some(1));
    }
}
