//! In-process server of record.
//!
//! Holds one account per identity and pushes a full snapshot to subscribers
//! after every lesson write. Operations can be made to fail on demand, which
//! is how the remote store's rollback paths are exercised.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::error::{LessonDirError, LessonDirResult};
use crate::id::IdGenerator;
use crate::lesson::{self, Lesson, LessonChanges, LessonDraft, LessonId};
use crate::remote::backend::{RemoteBackend, SnapshotStream};
use crate::session::SessionIdentity;
use crate::settings::{self, RateMap, Settings};
use crate::template::{NewTemplate, Template};

/// Backend operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateLesson,
    UpdateLesson,
    DeleteLesson,
    SaveStudents,
    SaveRates,
    SaveSettings,
    CreateTemplate,
    DeleteTemplate,
}

struct StoredLesson {
    lesson: Lesson,
    owner: SessionIdentity,
}

struct Account {
    lessons: Vec<StoredLesson>,
    students: Vec<String>,
    rates: RateMap,
    settings: Settings,
    templates: Vec<Template>,
    feed: watch::Sender<Vec<Lesson>>,
}

impl Account {
    fn new() -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Account {
            lessons: Vec::new(),
            students: Vec::new(),
            rates: RateMap::new(),
            settings: Settings::default(),
            templates: Vec::new(),
            feed,
        }
    }

    fn snapshot(&self, identity: &SessionIdentity) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|stored| &stored.owner == identity)
            .map(|stored| stored.lesson.clone())
            .collect();
        lesson::sort_chronologically(&mut lessons);
        lessons
    }

    fn publish(&self, identity: &SessionIdentity) {
        self.feed.send_replace(self.snapshot(identity));
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    accounts: Mutex<HashMap<SessionIdentity, Account>>,
    /// Remaining successful calls before the op fails once.
    failures: Mutex<HashMap<BackendOp, usize>>,
    latency: Mutex<Duration>,
    ids: IdGenerator,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `skip` calls of `op` succeed, then fail the next one.
    pub fn fail_on(&self, op: BackendOp, skip: usize) {
        lock(&self.failures).insert(op, skip);
    }

    pub fn fail_next(&self, op: BackendOp) {
        self.fail_on(op, 0);
    }

    /// Delay every write by `latency` before it takes effect.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// The stored lessons of `identity`, in snapshot order.
    pub fn lessons(&self, identity: &SessionIdentity) -> Vec<Lesson> {
        lock(&self.accounts)
            .get(identity)
            .map(|account| account.snapshot(identity))
            .unwrap_or_default()
    }

    async fn enter(&self, op: BackendOp) -> LessonDirResult<()> {
        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut failures = lock(&self.failures);
        match failures.get_mut(&op) {
            Some(0) => {
                failures.remove(&op);
                debug!(?op, "Injected backend failure");
                Err(LessonDirError::Provider(format!("injected failure in {op:?}")))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn with_account<R>(
        &self,
        identity: &SessionIdentity,
        f: impl FnOnce(&mut Account) -> R,
    ) -> R {
        let mut accounts = lock(&self.accounts);
        let account = accounts.entry(identity.clone()).or_insert_with(Account::new);
        f(account)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    fn subscribe(&self, identity: &SessionIdentity) -> SnapshotStream {
        let rx = self.with_account(identity, |account| {
            account.publish(identity);
            account.feed.subscribe()
        });
        WatchStream::new(rx).map(Ok).boxed()
    }

    async fn create_lesson(
        &self,
        identity: &SessionIdentity,
        draft: &LessonDraft,
    ) -> LessonDirResult<LessonId> {
        self.enter(BackendOp::CreateLesson).await?;

        let id = self.ids.next_id();
        self.with_account(identity, |account| {
            account.lessons.push(StoredLesson {
                lesson: Lesson::from_draft(id.clone(), draft.clone()),
                owner: identity.clone(),
            });
            account.publish(identity);
        });
        Ok(id)
    }

    async fn update_lesson(
        &self,
        identity: &SessionIdentity,
        id: &str,
        changes: &LessonChanges,
    ) -> LessonDirResult<()> {
        self.enter(BackendOp::UpdateLesson).await?;

        self.with_account(identity, |account| {
            let stored = account
                .lessons
                .iter_mut()
                .find(|stored| stored.lesson.id == id)
                .ok_or_else(|| LessonDirError::LessonNotFound(id.to_string()))?;
            changes.apply(&mut stored.lesson);
            stored.owner = identity.clone();
            account.publish(identity);
            Ok(())
        })
    }

    async fn delete_lesson(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()> {
        self.enter(BackendOp::DeleteLesson).await?;

        self.with_account(identity, |account| {
            account.lessons.retain(|stored| stored.lesson.id != id);
            account.publish(identity);
        });
        Ok(())
    }

    async fn load_students(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<String>> {
        Ok(self.with_account(identity, |account| account.students.clone()))
    }

    async fn save_students(
        &self,
        identity: &SessionIdentity,
        students: &[String],
    ) -> LessonDirResult<()> {
        self.enter(BackendOp::SaveStudents).await?;
        self.with_account(identity, |account| {
            account.students = settings::normalize_students(students);
        });
        Ok(())
    }

    async fn load_rates(&self, identity: &SessionIdentity) -> LessonDirResult<RateMap> {
        Ok(self.with_account(identity, |account| account.rates.clone()))
    }

    async fn save_rates(&self, identity: &SessionIdentity, rates: &RateMap) -> LessonDirResult<()> {
        self.enter(BackendOp::SaveRates).await?;
        self.with_account(identity, |account| account.rates = rates.clone());
        Ok(())
    }

    async fn load_settings(&self, identity: &SessionIdentity) -> LessonDirResult<Settings> {
        Ok(self.with_account(identity, |account| account.settings.clone()))
    }

    async fn save_settings(
        &self,
        identity: &SessionIdentity,
        settings: &Settings,
    ) -> LessonDirResult<()> {
        self.enter(BackendOp::SaveSettings).await?;
        self.with_account(identity, |account| account.settings = settings.clone());
        Ok(())
    }

    async fn list_templates(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<Template>> {
        let mut templates = self.with_account(identity, |account| account.templates.clone());
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn create_template(
        &self,
        identity: &SessionIdentity,
        template: &NewTemplate,
    ) -> LessonDirResult<Template> {
        self.enter(BackendOp::CreateTemplate).await?;

        let template = template.clone().into_template(self.ids.next_id());
        self.with_account(identity, |account| account.templates.push(template.clone()));
        Ok(template)
    }

    async fn delete_template(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()> {
        self.enter(BackendOp::DeleteTemplate).await?;
        self.with_account(identity, |account| account.templates.retain(|t| t.id != id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> SessionIdentity {
        SessionIdentity::new("ana")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_sorted_snapshots() {
        let backend = MemoryBackend::new();
        let mut feed = backend.subscribe(&ana());

        assert_eq!(feed.next().await.unwrap().unwrap(), vec![]);

        backend
            .create_lesson(&ana(), &LessonDraft::new("2024-01-16", "09:00", 30, "B"))
            .await
            .unwrap();
        backend
            .create_lesson(&ana(), &LessonDraft::new("2024-01-15", "18:00", 30, "A"))
            .await
            .unwrap();

        let snapshot = feed.next().await.unwrap().unwrap();
        let students: Vec<_> = snapshot.iter().map(|l| l.student.as_str()).collect();
        assert_eq!(students, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let backend = MemoryBackend::new();
        backend
            .create_lesson(&ana(), &LessonDraft::new("2024-01-15", "18:00", 30, "A"))
            .await
            .unwrap();

        assert_eq!(backend.lessons(&ana()).len(), 1);
        assert!(backend.lessons(&SessionIdentity::new("bo")).is_empty());
    }

    #[tokio::test]
    async fn test_fail_on_skips_then_fails_once() {
        let backend = MemoryBackend::new();
        backend.fail_on(BackendOp::CreateLesson, 1);
        let draft = LessonDraft::new("2024-01-15", "18:00", 30, "A");

        assert!(backend.create_lesson(&ana(), &draft).await.is_ok());
        assert!(matches!(
            backend.create_lesson(&ana(), &draft).await,
            Err(LessonDirError::Provider(_))
        ));
        assert!(backend.create_lesson(&ana(), &draft).await.is_ok());
        assert_eq!(backend.lessons(&ana()).len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_lesson_fails() {
        let backend = MemoryBackend::new();
        let result = backend
            .update_lesson(&ana(), "nope", &LessonChanges::default())
            .await;
        assert!(matches!(result, Err(LessonDirError::LessonNotFound(_))));
    }

    #[tokio::test]
    async fn test_templates_listed_by_name() {
        let backend = MemoryBackend::new();
        for name in ["Week B", "Week A"] {
            backend
                .create_template(
                    &ana(),
                    &NewTemplate {
                        name: name.into(),
                        items: vec![],
                    },
                )
                .await
                .unwrap();
        }

        let names: Vec<_> = backend
            .list_templates(&ana())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["Week A", "Week B"]);
    }
}
