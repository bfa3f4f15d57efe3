//! Transport-level interface to the remote store of record.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::LessonDirResult;
use crate::lesson::{Lesson, LessonChanges, LessonDraft, LessonId};
use crate::session::SessionIdentity;
use crate::settings::{RateMap, Settings};
use crate::template::{NewTemplate, Template};

/// Live feed of complete lesson snapshots for one identity.
///
/// Each item is the full, `(date, start)`-ordered set of that identity's
/// lessons. The stream is lazy, may never end, and cannot be restarted: a
/// fresh feed needs a fresh `subscribe` call. An `Err` item ends the feed.
pub type SnapshotStream = BoxStream<'static, LessonDirResult<Vec<Lesson>>>;

/// Writes are single atomic document operations. Lessons are stored per
/// identity and tagged with it as their owner.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    fn subscribe(&self, identity: &SessionIdentity) -> SnapshotStream;

    /// Create a lesson document; returns the store-assigned identifier.
    async fn create_lesson(
        &self,
        identity: &SessionIdentity,
        draft: &LessonDraft,
    ) -> LessonDirResult<LessonId>;

    async fn update_lesson(
        &self,
        identity: &SessionIdentity,
        id: &str,
        changes: &LessonChanges,
    ) -> LessonDirResult<()>;

    async fn delete_lesson(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()>;

    async fn load_students(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<String>>;

    /// Replace the students document; the list is stored sorted and unique.
    async fn save_students(
        &self,
        identity: &SessionIdentity,
        students: &[String],
    ) -> LessonDirResult<()>;

    async fn load_rates(&self, identity: &SessionIdentity) -> LessonDirResult<RateMap>;

    async fn save_rates(&self, identity: &SessionIdentity, rates: &RateMap) -> LessonDirResult<()>;

    async fn load_settings(&self, identity: &SessionIdentity) -> LessonDirResult<Settings>;

    /// Merge into the settings document.
    async fn save_settings(
        &self,
        identity: &SessionIdentity,
        settings: &Settings,
    ) -> LessonDirResult<()>;

    /// Templates ordered by name.
    async fn list_templates(&self, identity: &SessionIdentity) -> LessonDirResult<Vec<Template>>;

    async fn create_template(
        &self,
        identity: &SessionIdentity,
        template: &NewTemplate,
    ) -> LessonDirResult<Template>;

    async fn delete_template(&self, identity: &SessionIdentity, id: &str) -> LessonDirResult<()>;
}
