//! JSON protocol spoken with `lessondir-provider-*` binaries over
//! stdin/stdout.
//!
//! One request per process: the provider reads a single `Request` line and
//! answers with a single `Response` document.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::lesson::{Lesson, LessonChanges, LessonDraft, LessonId};
use crate::session::SessionIdentity;
use crate::settings::{RateMap, Settings};
use crate::template::{NewTemplate, Template};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListLessons,
    CreateLesson,
    UpdateLesson,
    DeleteLesson,
    LoadStudents,
    SaveStudents,
    LoadRates,
    SaveRates,
    LoadSettings,
    SaveSettings,
    ListTemplates,
    CreateTemplate,
    DeleteTemplate,
}

/// Request sent to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent back by the provider.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

// ============================================================================
// Documents
// ============================================================================

/// A lesson document as stored remotely: the lesson fields plus its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonDocument {
    #[serde(flatten)]
    pub draft: LessonDraft,
    pub owner: SessionIdentity,
}

/// The single students document, `{list: [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentsDocument {
    #[serde(default)]
    pub list: Vec<String>,
}

/// The single rates document, `{map: {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatesDocument {
    #[serde(default)]
    pub map: RateMap,
}

// ============================================================================
// Lessons
// ============================================================================

/// All lessons owned by an identity.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListLessons {
    pub identity: SessionIdentity,
}

impl ProviderCommand for ListLessons {
    type Response = Vec<Lesson>;
    fn command() -> Command {
        Command::ListLessons
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLesson {
    pub identity: SessionIdentity,
    pub lesson: LessonDocument,
}

impl ProviderCommand for CreateLesson {
    type Response = LessonId;
    fn command() -> Command {
        Command::CreateLesson
    }
}

/// Merge `changes` into an existing lesson document, re-asserting its owner.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateLesson {
    pub identity: SessionIdentity,
    pub id: LessonId,
    pub changes: LessonChanges,
    pub owner: SessionIdentity,
}

impl ProviderCommand for UpdateLesson {
    type Response = ();
    fn command() -> Command {
        Command::UpdateLesson
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteLesson {
    pub identity: SessionIdentity,
    pub id: LessonId,
}

impl ProviderCommand for DeleteLesson {
    type Response = ();
    fn command() -> Command {
        Command::DeleteLesson
    }
}

// ============================================================================
// Students, rates, settings
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadStudents {
    pub identity: SessionIdentity,
}

impl ProviderCommand for LoadStudents {
    type Response = StudentsDocument;
    fn command() -> Command {
        Command::LoadStudents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveStudents {
    pub identity: SessionIdentity,
    #[serde(flatten)]
    pub students: StudentsDocument,
}

impl ProviderCommand for SaveStudents {
    type Response = ();
    fn command() -> Command {
        Command::SaveStudents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadRates {
    pub identity: SessionIdentity,
}

impl ProviderCommand for LoadRates {
    type Response = RatesDocument;
    fn command() -> Command {
        Command::LoadRates
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveRates {
    pub identity: SessionIdentity,
    #[serde(flatten)]
    pub rates: RatesDocument,
}

impl ProviderCommand for SaveRates {
    type Response = ();
    fn command() -> Command {
        Command::SaveRates
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadSettings {
    pub identity: SessionIdentity,
}

impl ProviderCommand for LoadSettings {
    type Response = Settings;
    fn command() -> Command {
        Command::LoadSettings
    }
}

/// Merged into the settings document.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveSettings {
    pub identity: SessionIdentity,
    #[serde(flatten)]
    pub settings: Settings,
}

impl ProviderCommand for SaveSettings {
    type Response = ();
    fn command() -> Command {
        Command::SaveSettings
    }
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTemplates {
    pub identity: SessionIdentity,
}

impl ProviderCommand for ListTemplates {
    type Response = Vec<Template>;
    fn command() -> Command {
        Command::ListTemplates
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub identity: SessionIdentity,
    #[serde(flatten)]
    pub template: NewTemplate,
}

impl ProviderCommand for CreateTemplate {
    type Response = Template;
    fn command() -> Command {
        Command::CreateTemplate
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteTemplate {
    pub identity: SessionIdentity,
    pub id: String,
}

impl ProviderCommand for DeleteTemplate {
    type Response = ();
    fn command() -> Command {
        Command::DeleteTemplate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_lesson_request_shape() {
        let cmd = CreateLesson {
            identity: SessionIdentity::new("uid-1"),
            lesson: LessonDocument {
                draft: LessonDraft::new("2024-01-15", "18:00", 30, "Ana"),
                owner: SessionIdentity::new("uid-1"),
            },
        };
        let request = Request {
            command: CreateLesson::command(),
            params: serde_json::to_value(&cmd).unwrap(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "command": "create_lesson",
                "params": {
                    "identity": "uid-1",
                    "lesson": {
                        "date": "2024-01-15",
                        "start": "18:00",
                        "end": "18:30",
                        "student": "Ana",
                        "status": "scheduled",
                        "notes": "",
                        "owner": "uid-1"
                    }
                }
            })
        );
    }

    #[test]
    fn test_save_students_flattens_document() {
        let cmd = SaveStudents {
            identity: SessionIdentity::new("uid-1"),
            students: StudentsDocument {
                list: vec!["Ana".into(), "Bo".into()],
            },
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "identity": "uid-1", "list": ["Ana", "Bo"] })
        );
    }

    #[test]
    fn test_parse_responses() {
        let ok: Response<LessonId> =
            serde_json::from_str(r#"{"status":"success","data":"doc-7"}"#).unwrap();
        assert!(matches!(ok, Response::Success { data } if data == "doc-7"));

        let err: Response<()> =
            serde_json::from_str(r#"{"status":"error","error":"permission denied"}"#).unwrap();
        assert!(matches!(err, Response::Error { error } if error == "permission denied"));
    }

    #[test]
    fn test_missing_documents_default_to_empty() {
        let students: StudentsDocument = serde_json::from_str("{}").unwrap();
        assert!(students.list.is_empty());

        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.currency, "€");
    }
}
