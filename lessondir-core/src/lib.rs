//! Core of lessondir.
//!
//! - `Lesson`, `Template` and the side collections (students, rates,
//!   currency)
//! - `RecordStore`, implemented by the on-device `LocalStore` and the
//!   subscription-fed `RemoteStore`, with `StoreSelector` picking one by session
//! - `recurrence` for capturing a week as a template and applying it
//! - `totals` for per-student lesson counts and billable amounts
//! - the provider protocol spoken with `lessondir-provider-*` binaries

pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod id;
pub mod lesson;
pub mod local;
pub mod recurrence;
pub mod remote;
pub mod session;
pub mod settings;
pub mod store;
pub mod template;
pub mod totals;

pub use config::LessonDirConfig;
pub use error::{LessonDirError, LessonDirResult};
pub use lesson::{Lesson, LessonChanges, LessonDraft, LessonId, LessonStatus};
pub use local::LocalStore;
pub use remote::RemoteStore;
pub use session::{SessionFile, SessionIdentity};
pub use settings::{RateMap, Settings};
pub use store::{RecordStore, StoreKind, StoreSelector};
pub use template::{NewTemplate, Template, TemplateItem};
