//! The record-store contract shared by the local and remote stores, and the
//! selector that decides which one backs the application.

mod selector;

pub use selector::{StoreKind, StoreSelector};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::LessonDirResult;
use crate::lesson::{Lesson, LessonChanges, LessonDraft};
use crate::settings::RateMap;
use crate::template::{NewTemplate, Template};

/// CRUD over lessons plus the side collections (templates, students, rates,
/// currency).
///
/// Every mutation either succeeds or leaves the visible lesson sequence
/// exactly as it was before the call and returns the error. Failures are
/// never swallowed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current visible lessons.
    fn lessons(&self) -> Vec<Lesson>;

    /// Receiver that observes every change to the visible lessons.
    fn watch_lessons(&self) -> watch::Receiver<Vec<Lesson>>;

    fn get(&self, id: &str) -> Option<Lesson> {
        self.lessons().into_iter().find(|l| l.id == id)
    }

    async fn add(&self, draft: LessonDraft) -> LessonDirResult<Lesson>;

    async fn add_many(&self, drafts: Vec<LessonDraft>) -> LessonDirResult<Vec<Lesson>>;

    async fn update(&self, id: &str, changes: LessonChanges) -> LessonDirResult<()>;

    async fn remove(&self, id: &str) -> LessonDirResult<()>;

    // Templates

    async fn templates(&self) -> LessonDirResult<Vec<Template>>;

    async fn add_template(&self, template: NewTemplate) -> LessonDirResult<Template>;

    async fn delete_template(&self, id: &str) -> LessonDirResult<()>;

    // Students, rates, currency

    async fn students(&self) -> LessonDirResult<Vec<String>>;

    /// Add a student name; returns the updated sorted list.
    async fn add_student(&self, name: &str) -> LessonDirResult<Vec<String>>;

    async fn rates(&self) -> LessonDirResult<RateMap>;

    /// Clean and store the rate map; returns what was stored.
    async fn save_rates(&self, rates: RateMap) -> LessonDirResult<RateMap>;

    async fn currency(&self) -> LessonDirResult<String>;

    /// Store the currency label; returns what was stored.
    async fn save_currency(&self, currency: &str) -> LessonDirResult<String>;
}
