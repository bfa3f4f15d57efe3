use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::session::SessionIdentity;
use crate::store::RecordStore;

/// Which store currently backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Remote,
}

/// Owns both stores for the whole run and exposes the one matching the
/// session: remote while signed in, local otherwise.
///
/// Both stores always exist so the remote subscription is set up and torn
/// down by session changes alone, never by which store happens to be shown.
pub struct StoreSelector {
    local: LocalStore,
    remote: RemoteStore,
}

impl StoreSelector {
    pub fn new(local: LocalStore, remote: RemoteStore) -> Self {
        StoreSelector { local, remote }
    }

    /// Follow a session change. Must be called from within a Tokio runtime.
    pub fn set_session(&self, identity: Option<SessionIdentity>) {
        match identity {
            Some(identity) => self.remote.sign_in(identity),
            None => self.remote.sign_out(),
        }
    }

    pub fn session(&self) -> Option<SessionIdentity> {
        self.remote.identity()
    }

    pub fn kind(&self) -> StoreKind {
        match self.session() {
            Some(_) => StoreKind::Remote,
            None => StoreKind::Local,
        }
    }

    pub fn active(&self) -> &dyn RecordStore {
        match self.kind() {
            StoreKind::Remote => &self.remote,
            StoreKind::Local => &self.local,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> &RemoteStore {
        &self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonDraft;
    use crate::local::MemoryStorage;
    use crate::remote::MemoryBackend;
    use std::sync::Arc;

    fn selector(backend: &Arc<MemoryBackend>) -> StoreSelector {
        StoreSelector::new(
            LocalStore::open(MemoryStorage::new()).unwrap(),
            RemoteStore::new(backend.clone()),
        )
    }

    #[tokio::test]
    async fn test_routes_by_session() {
        let backend = Arc::new(MemoryBackend::new());
        let selector = selector(&backend);
        assert_eq!(selector.kind(), StoreKind::Local);

        selector
            .active()
            .add(LessonDraft::new("2024-01-15", "18:00", 30, "Local"))
            .await
            .unwrap();
        assert_eq!(selector.local().lessons().len(), 1);

        selector.set_session(Some(SessionIdentity::new("ana")));
        assert_eq!(selector.kind(), StoreKind::Remote);
        selector.remote().wait_for_snapshot().await.unwrap();

        selector
            .active()
            .add(LessonDraft::new("2024-01-15", "18:00", 30, "Remote"))
            .await
            .unwrap();
        assert_eq!(backend.lessons(&SessionIdentity::new("ana")).len(), 1);
        assert_eq!(selector.local().lessons().len(), 1);

        selector.set_session(None);
        assert_eq!(selector.kind(), StoreKind::Local);
        assert_eq!(selector.active().lessons()[0].student, "Local");
    }
}
