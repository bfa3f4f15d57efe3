//! Remote store: a subscription-fed lesson list with an optimistic overlay.
//!
//! The visible lessons are whatever the last snapshot delivered, plus any
//! optimistic edits made since. Every snapshot replaces the list wholesale,
//! which is also what retires optimistic records once their writes land.
//! A failed write undoes exactly its own optimistic edit and returns the
//! error.

mod backend;
mod memory;
mod overlay;
pub mod protocol;
mod provider;

pub use backend::{RemoteBackend, SnapshotStream};
pub use memory::{BackendOp, MemoryBackend};
pub use overlay::{Overlay, TxId, Undo};
pub use provider::{Provider, ProviderBackend};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LessonDirError, LessonDirResult};
use crate::id::IdGenerator;
use crate::lesson::{Lesson, LessonChanges, LessonDraft, LessonId};
use crate::session::SessionIdentity;
use crate::settings::{self, RateMap, Settings};
use crate::store::RecordStore;
use crate::template::{NewTemplate, Template};

/// State of the lesson subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Signed out.
    Idle,
    /// Signed in, waiting for the first snapshot.
    Connecting,
    Live { deliveries: u64 },
    Failed(String),
    /// The backend closed the feed.
    Ended,
}

#[derive(Default)]
struct RemoteState {
    identity: Option<SessionIdentity>,
    /// Bumped on every session switch; work started under an older
    /// generation must not touch the state.
    generation: u64,
    lessons: Vec<Lesson>,
    overlay: Overlay,
}

struct Shared {
    state: Mutex<RemoteState>,
    lessons_tx: watch::Sender<Vec<Lesson>>,
    status_tx: watch::Sender<SubscriptionStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &RemoteState) {
        self.lessons_tx.send_replace(state.lessons.clone());
    }

    /// Replace the visible list with a snapshot. Returns `false` if the
    /// snapshot belongs to a session that is no longer current.
    fn deliver(&self, generation: u64, snapshot: Vec<Lesson>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, "Dropping snapshot from a previous session");
            return false;
        }

        debug!(count = snapshot.len(), "Lesson snapshot delivered");
        state.lessons = snapshot;
        state.overlay.supersede();
        self.publish(&state);

        self.status_tx.send_modify(|status| {
            let deliveries = match status {
                SubscriptionStatus::Live { deliveries } => *deliveries + 1,
                _ => 1,
            };
            *status = SubscriptionStatus::Live { deliveries };
        });
        true
    }

    fn set_status(&self, generation: u64, status: SubscriptionStatus) {
        let state = self.lock();
        if state.generation == generation {
            self.status_tx.send_replace(status);
        }
    }
}

async fn consume(shared: Arc<Shared>, generation: u64, mut feed: SnapshotStream) {
    while let Some(item) = feed.next().await {
        match item {
            Ok(snapshot) => {
                if !shared.deliver(generation, snapshot) {
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Lesson subscription failed");
                shared.set_status(generation, SubscriptionStatus::Failed(e.to_string()));
                return;
            }
        }
    }
    debug!(generation, "Lesson subscription ended");
    shared.set_status(generation, SubscriptionStatus::Ended);
}

/// An optimistic mutation that has been applied but not yet confirmed.
struct Pending {
    identity: SessionIdentity,
    generation: u64,
    tx: TxId,
}

pub struct RemoteStore {
    backend: Arc<dyn RemoteBackend>,
    shared: Arc<Shared>,
    ids: IdGenerator,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteStore {
    /// A signed-out store over `backend`.
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        let (lessons_tx, _) = watch::channel(Vec::new());
        let (status_tx, _) = watch::channel(SubscriptionStatus::Idle);

        RemoteStore {
            backend,
            shared: Arc::new(Shared {
                state: Mutex::new(RemoteState::default()),
                lessons_tx,
                status_tx,
            }),
            ids: IdGenerator::temporary(),
            subscription: Mutex::new(None),
        }
    }

    fn subscription(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to `identity`: tear down the previous subscription, reset the
    /// visible list and overlay, then subscribe for the new identity.
    ///
    /// Must be called from within a Tokio runtime. Signing in again as the
    /// current identity does nothing.
    pub fn sign_in(&self, identity: SessionIdentity) {
        let mut subscription = self.subscription();

        let generation = {
            let mut state = self.shared.lock();
            if state.identity.as_ref() == Some(&identity) {
                return;
            }
            if let Some(handle) = subscription.take() {
                handle.abort();
            }
            reset(&mut state, Some(identity.clone()));
            self.shared.publish(&state);
            self.shared.status_tx.send_replace(SubscriptionStatus::Connecting);
            state.generation
        };

        info!(%identity, "Subscribing to remote lessons");
        let feed = self.backend.subscribe(&identity);
        *subscription = Some(tokio::spawn(consume(
            Arc::clone(&self.shared),
            generation,
            feed,
        )));
    }

    /// Tear down the subscription and clear all session state.
    pub fn sign_out(&self) {
        let mut subscription = self.subscription();
        if let Some(handle) = subscription.take() {
            handle.abort();
        }

        let mut state = self.shared.lock();
        if state.identity.is_none() {
            return;
        }
        reset(&mut state, None);
        self.shared.publish(&state);
        self.shared.status_tx.send_replace(SubscriptionStatus::Idle);
        info!("Signed out of remote store");
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.shared.lock().identity.clone()
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Temporary ids still visible and not yet superseded by a snapshot.
    pub fn optimistic_ids(&self) -> Vec<LessonId> {
        self.shared.lock().overlay.optimistic_ids()
    }

    /// Number of writes in flight.
    pub fn pending_writes(&self) -> usize {
        self.shared.lock().overlay.pending()
    }

    /// Wait until the subscription has delivered its first snapshot (or
    /// ended).
    pub async fn wait_for_snapshot(&self) -> LessonDirResult<()> {
        let mut rx = self.shared.status_tx.subscribe();
        let status = rx
            .wait_for(|status| *status != SubscriptionStatus::Connecting)
            .await
            .map_err(|_| LessonDirError::Provider("subscription closed".into()))?
            .clone();

        match status {
            SubscriptionStatus::Idle => Err(LessonDirError::NotSignedIn),
            SubscriptionStatus::Failed(e) => Err(LessonDirError::Provider(e)),
            SubscriptionStatus::Connecting
            | SubscriptionStatus::Live { .. }
            | SubscriptionStatus::Ended => Ok(()),
        }
    }

    fn session(&self) -> LessonDirResult<SessionIdentity> {
        self.shared
            .lock()
            .identity
            .clone()
            .ok_or(LessonDirError::NotSignedIn)
    }

    /// Apply an optimistic edit to the visible list and register its undo.
    fn begin(&self, edit: impl FnOnce(&mut Vec<Lesson>) -> Undo) -> LessonDirResult<Pending> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        let identity = state.identity.clone().ok_or(LessonDirError::NotSignedIn)?;

        let undo = edit(&mut state.lessons);
        let tx = state.overlay.begin(undo);
        self.shared.publish(state);

        Ok(Pending {
            identity,
            generation: state.generation,
            tx,
        })
    }

    /// Settle a pending mutation: commit on success, roll back on failure.
    fn finish<T>(
        &self,
        pending: Pending,
        op: &'static str,
        result: LessonDirResult<T>,
    ) -> LessonDirResult<T> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        if state.generation != pending.generation {
            // Session switched while the write was in flight; its state is gone.
            return result;
        }

        match result {
            Ok(value) => {
                state.overlay.commit(pending.tx);
                Ok(value)
            }
            Err(e) => {
                warn!(op, error = %e, "Remote write failed, rolling back");
                state.overlay.rollback(pending.tx, &mut state.lessons);
                self.shared.publish(state);
                Err(e)
            }
        }
    }
}

fn reset(state: &mut RemoteState, identity: Option<SessionIdentity>) {
    state.generation += 1;
    state.identity = identity;
    state.lessons.clear();
    state.overlay = Overlay::default();
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    fn lessons(&self) -> Vec<Lesson> {
        self.shared.lock().lessons.clone()
    }

    fn watch_lessons(&self) -> watch::Receiver<Vec<Lesson>> {
        self.shared.lessons_tx.subscribe()
    }

    /// Returns the optimistic record, which carries a temporary id until the
    /// next snapshot replaces it.
    async fn add(&self, draft: LessonDraft) -> LessonDirResult<Lesson> {
        let lesson = Lesson::from_draft(self.ids.next_id(), draft.clone());
        let pending = self.begin(|visible| {
            visible.insert(0, lesson.clone());
            Undo::Created(vec![lesson.id.clone()])
        })?;

        let result = self.backend.create_lesson(&pending.identity, &draft).await;
        self.finish(pending, "add", result).map(|_| lesson)
    }

    /// Creates are issued one at a time. On the first failure every
    /// temporary record of the batch is removed; documents created earlier
    /// in the batch are left on the remote side.
    async fn add_many(&self, drafts: Vec<LessonDraft>) -> LessonDirResult<Vec<Lesson>> {
        let created: Vec<Lesson> = drafts
            .iter()
            .map(|draft| Lesson::from_draft(self.ids.next_id(), draft.clone()))
            .collect();
        let pending = self.begin(|visible| {
            let mut next = created.clone();
            next.append(visible);
            *visible = next;
            Undo::Created(created.iter().map(|l| l.id.clone()).collect())
        })?;

        let identity = pending.identity.clone();
        let result = async {
            for draft in &drafts {
                self.backend.create_lesson(&identity, draft).await?;
            }
            Ok::<(), LessonDirError>(())
        }
        .await;

        self.finish(pending, "add_many", result).map(|()| created)
    }

    async fn update(&self, id: &str, changes: LessonChanges) -> LessonDirResult<()> {
        let pending = self.begin(|visible| {
            let before = visible.iter().find(|l| l.id == id).cloned();
            if let Some(lesson) = visible.iter_mut().find(|l| l.id == id) {
                changes.apply(lesson);
            }
            Undo::Updated {
                id: id.to_string(),
                before,
            }
        })?;

        let result = self
            .backend
            .update_lesson(&pending.identity, id, &changes)
            .await;
        self.finish(pending, "update", result)
    }

    async fn remove(&self, id: &str) -> LessonDirResult<()> {
        let pending = self.begin(|visible| {
            let prior = visible.clone();
            visible.retain(|l| l.id != id);
            Undo::Removed(prior)
        })?;

        let result = self.backend.delete_lesson(&pending.identity, id).await;
        self.finish(pending, "remove", result)
    }

    async fn templates(&self) -> LessonDirResult<Vec<Template>> {
        let identity = self.session()?;
        self.backend.list_templates(&identity).await
    }

    async fn add_template(&self, template: NewTemplate) -> LessonDirResult<Template> {
        let identity = self.session()?;
        self.backend.create_template(&identity, &template).await
    }

    async fn delete_template(&self, id: &str) -> LessonDirResult<()> {
        let identity = self.session()?;
        self.backend.delete_template(&identity, id).await
    }

    async fn students(&self) -> LessonDirResult<Vec<String>> {
        let identity = self.session()?;
        self.backend.load_students(&identity).await
    }

    async fn add_student(&self, name: &str) -> LessonDirResult<Vec<String>> {
        let identity = self.session()?;
        let mut students = self.backend.load_students(&identity).await?;
        students.push(name.to_string());
        let students = settings::normalize_students(students);
        self.backend.save_students(&identity, &students).await?;
        Ok(students)
    }

    async fn rates(&self) -> LessonDirResult<RateMap> {
        let identity = self.session()?;
        self.backend.load_rates(&identity).await
    }

    async fn save_rates(&self, rates: RateMap) -> LessonDirResult<RateMap> {
        let identity = self.session()?;
        let cleaned = settings::clean_rates(rates);
        self.backend.save_rates(&identity, &cleaned).await?;
        Ok(cleaned)
    }

    async fn currency(&self) -> LessonDirResult<String> {
        let identity = self.session()?;
        Ok(self.backend.load_settings(&identity).await?.currency)
    }

    async fn save_currency(&self, currency: &str) -> LessonDirResult<String> {
        let identity = self.session()?;
        let currency = settings::normalize_currency(currency);
        self.backend
            .save_settings(
                &identity,
                &Settings {
                    currency: currency.clone(),
                },
            )
            .await?;
        Ok(currency)
    }
}
