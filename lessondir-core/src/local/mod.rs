//! On-device store used while signed out.
//!
//! Each collection lives under its own storage key. A mutation computes the
//! full new collection, writes it, and only then publishes it, so a failed
//! write leaves the visible state unchanged.

mod storage;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::LessonDirResult;
use crate::id::IdGenerator;
use crate::lesson::{Lesson, LessonChanges, LessonDraft};
use crate::settings::{self, RateMap};
use crate::store::RecordStore;
use crate::template::{NewTemplate, Template};

pub const LESSONS_KEY: &str = "lessons_v1";
pub const STUDENTS_KEY: &str = "students_v1";
pub const TEMPLATES_KEY: &str = "lesson_templates_v1";
pub const RATES_KEY: &str = "student_rates_v1";
pub const CURRENCY_KEY: &str = "currency_pref_v1";

pub struct LocalStore {
    storage: Box<dyn KeyValueStorage>,
    ids: IdGenerator,
    lessons: Mutex<Vec<Lesson>>,
    lessons_tx: watch::Sender<Vec<Lesson>>,
}

impl LocalStore {
    /// Open the store, loading the persisted lesson list.
    pub fn open(storage: impl KeyValueStorage + 'static) -> LessonDirResult<Self> {
        let storage: Box<dyn KeyValueStorage> = Box::new(storage);
        let lessons: Vec<Lesson> = load_json(storage.as_ref(), LESSONS_KEY)?.unwrap_or_default();
        debug!(count = lessons.len(), "Loaded local lessons");

        let (lessons_tx, _) = watch::channel(lessons.clone());

        Ok(LocalStore {
            storage,
            ids: IdGenerator::new(),
            lessons: Mutex::new(lessons),
            lessons_tx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Lesson>> {
        self.lessons.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compute the next lesson list from the current one, persist it, then
    /// publish it.
    fn mutate<R>(&self, f: impl FnOnce(&[Lesson]) -> (Vec<Lesson>, R)) -> LessonDirResult<R> {
        let mut lessons = self.lock();
        let (next, result) = f(&lessons);

        save_json(self.storage.as_ref(), LESSONS_KEY, &next)?;
        debug!(count = next.len(), "Persisted local lessons");

        *lessons = next.clone();
        self.lessons_tx.send_replace(next);
        Ok(result)
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> LessonDirResult<T> {
        Ok(load_json(self.storage.as_ref(), key)?.unwrap_or_default())
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> LessonDirResult<()> {
        save_json(self.storage.as_ref(), key, value)
    }
}

fn load_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> LessonDirResult<Option<T>> {
    match storage.read(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn save_json<T: Serialize + ?Sized>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> LessonDirResult<()> {
    let raw = serde_json::to_string(value)?;
    storage.write(key, &raw)
}

#[async_trait]
impl RecordStore for LocalStore {
    fn lessons(&self) -> Vec<Lesson> {
        self.lock().clone()
    }

    fn watch_lessons(&self) -> watch::Receiver<Vec<Lesson>> {
        self.lessons_tx.subscribe()
    }

    async fn add(&self, draft: LessonDraft) -> LessonDirResult<Lesson> {
        let lesson = Lesson::from_draft(self.ids.next_id(), draft);
        self.mutate(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(lesson.clone());
            next.extend_from_slice(current);
            (next, lesson.clone())
        })
    }

    async fn add_many(&self, drafts: Vec<LessonDraft>) -> LessonDirResult<Vec<Lesson>> {
        let created: Vec<Lesson> = drafts
            .into_iter()
            .map(|draft| Lesson::from_draft(self.ids.next_id(), draft))
            .collect();

        self.mutate(|current| {
            let mut next = created.clone();
            next.extend_from_slice(current);
            (next, created.clone())
        })
    }

    async fn update(&self, id: &str, changes: LessonChanges) -> LessonDirResult<()> {
        self.mutate(|current| {
            let next = current
                .iter()
                .cloned()
                .map(|mut l| {
                    if l.id == id {
                        changes.apply(&mut l);
                    }
                    l
                })
                .collect();
            (next, ())
        })
    }

    async fn remove(&self, id: &str) -> LessonDirResult<()> {
        self.mutate(|current| {
            let next = current.iter().filter(|l| l.id != id).cloned().collect();
            (next, ())
        })
    }

    async fn templates(&self) -> LessonDirResult<Vec<Template>> {
        self.load(TEMPLATES_KEY)
    }

    async fn add_template(&self, template: NewTemplate) -> LessonDirResult<Template> {
        let mut templates: Vec<Template> = self.load(TEMPLATES_KEY)?;
        let template = template.into_template(self.ids.next_id());
        templates.push(template.clone());
        self.save(TEMPLATES_KEY, &templates)?;
        Ok(template)
    }

    async fn delete_template(&self, id: &str) -> LessonDirResult<()> {
        let templates: Vec<Template> = self.load(TEMPLATES_KEY)?;
        let remaining: Vec<Template> = templates.into_iter().filter(|t| t.id != id).collect();
        self.save(TEMPLATES_KEY, &remaining)
    }

    async fn students(&self) -> LessonDirResult<Vec<String>> {
        self.load(STUDENTS_KEY)
    }

    async fn add_student(&self, name: &str) -> LessonDirResult<Vec<String>> {
        let mut students: Vec<String> = self.load(STUDENTS_KEY)?;
        students.push(name.to_string());
        let students = settings::normalize_students(students);
        self.save(STUDENTS_KEY, &students)?;
        Ok(students)
    }

    async fn rates(&self) -> LessonDirResult<RateMap> {
        let Some(raw) = self.storage.read(RATES_KEY)? else {
            return Ok(RateMap::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable local rates");
            RateMap::new()
        }))
    }

    async fn save_rates(&self, rates: RateMap) -> LessonDirResult<RateMap> {
        let cleaned = settings::clean_rates(rates);
        self.save(RATES_KEY, &cleaned)?;
        Ok(cleaned)
    }

    async fn currency(&self) -> LessonDirResult<String> {
        let stored: Option<String> = load_json(self.storage.as_ref(), CURRENCY_KEY)?;
        Ok(stored.unwrap_or_else(|| settings::DEFAULT_CURRENCY.to_string()))
    }

    async fn save_currency(&self, currency: &str) -> LessonDirResult<String> {
        let currency = settings::normalize_currency(currency);
        self.save(CURRENCY_KEY, &currency)?;
        Ok(currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LessonDirError;
    use crate::lesson::LessonStatus;
    use crate::template::TemplateItem;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Storage whose writes can be switched to fail.
    #[derive(Clone, Default)]
    struct FlakyStorage {
        inner: Arc<MemoryStorage>,
        failing: Arc<AtomicBool>,
    }

    impl KeyValueStorage for FlakyStorage {
        fn read(&self, key: &str) -> LessonDirResult<Option<String>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> LessonDirResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(LessonDirError::Io(std::io::Error::other("disk full")));
            }
            self.inner.write(key, value)
        }
    }

    fn draft(date: &str, start: &str, student: &str) -> LessonDraft {
        LessonDraft::new(date, start, 30, student)
    }

    #[tokio::test]
    async fn test_add_prepends_and_persists() {
        let storage = FlakyStorage::default();
        let store = LocalStore::open(storage.clone()).unwrap();

        let first = store.add(draft("2024-01-15", "18:00", "Ana")).await.unwrap();
        let second = store.add(draft("2024-01-16", "18:00", "Bo")).await.unwrap();

        let ids: Vec<_> = store.lessons().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, [second.id.clone(), first.id.clone()]);

        // A new store over the same storage sees the persisted list
        let reopened = LocalStore::open(storage).unwrap();
        assert_eq!(reopened.lessons(), store.lessons());
    }

    #[tokio::test]
    async fn test_add_many_keeps_batch_order_in_front() {
        let store = LocalStore::open(MemoryStorage::new()).unwrap();
        let existing = store.add(draft("2024-01-01", "09:00", "Old")).await.unwrap();

        let created = store
            .add_many(vec![draft("2024-01-15", "18:00", "Ana"), draft("2024-01-16", "18:00", "Bo")])
            .await
            .unwrap();

        let students: Vec<_> = store.lessons().into_iter().map(|l| l.student).collect();
        assert_eq!(students, ["Ana", "Bo", "Old"]);
        assert_eq!(created.len(), 2);
        assert!(store.get(&existing.id).is_some());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let store = LocalStore::open(MemoryStorage::new()).unwrap();
        let lesson = store.add(draft("2024-01-15", "18:00", "Ana")).await.unwrap();

        store
            .update(
                &lesson.id,
                LessonChanges {
                    status: Some(LessonStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get(&lesson.id).unwrap().status, LessonStatus::Done);

        store.remove(&lesson.id).await.unwrap();
        assert!(store.get(&lesson.id).is_none());
        assert!(store.lessons().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let storage = FlakyStorage::default();
        let store = LocalStore::open(storage.clone()).unwrap();
        let lesson = store.add(draft("2024-01-15", "18:00", "Ana")).await.unwrap();
        let before = store.lessons();
        let rx = store.watch_lessons();

        storage.failing.store(true, Ordering::SeqCst);

        assert!(store.add(draft("2024-01-16", "18:00", "Bo")).await.is_err());
        assert!(store.remove(&lesson.id).await.is_err());
        assert_eq!(store.lessons(), before);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_watch_observes_mutations() {
        let store = LocalStore::open(MemoryStorage::new()).unwrap();
        let mut rx = store.watch_lessons();

        store.add(draft("2024-01-15", "18:00", "Ana")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn test_templates_students_rates_currency() {
        let store = LocalStore::open(MemoryStorage::new()).unwrap();

        let template = store
            .add_template(NewTemplate {
                name: "Week A".into(),
                items: vec![TemplateItem {
                    dow: 0,
                    start: "18:00".into(),
                    duration: 30,
                    student: "Ana".into(),
                    notes: String::new(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(store.templates().await.unwrap(), vec![template.clone()]);
        store.delete_template(&template.id).await.unwrap();
        assert!(store.templates().await.unwrap().is_empty());

        store.add_student("Zoe").await.unwrap();
        let students = store.add_student(" Ana ").await.unwrap();
        assert_eq!(students, ["Ana", "Zoe"]);

        let mut rates = RateMap::new();
        rates.insert("Ana".into(), -5.0);
        let saved = store.save_rates(rates).await.unwrap();
        assert_eq!(saved["Ana"], 0.0);
        assert_eq!(store.rates().await.unwrap(), saved);

        assert_eq!(store.currency().await.unwrap(), "€");
        store.save_currency("RSD").await.unwrap();
        assert_eq!(store.currency().await.unwrap(), "RSD");
    }

    #[tokio::test]
    async fn test_corrupt_rates_load_as_empty() {
        let storage = MemoryStorage::new();
        storage.write(RATES_KEY, "{not json").unwrap();
        let store = LocalStore::open(storage).unwrap();
        assert!(store.rates().await.unwrap().is_empty());
    }
}
