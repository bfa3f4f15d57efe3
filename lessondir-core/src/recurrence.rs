//! Weekly recurrence through templates.
//!
//! A week of lessons is captured as a template (weekday, start, duration,
//! student, notes per lesson) and later expanded onto any other week.
//! Expansion skips lessons that already exist, so applying the same template
//! to the same week twice creates nothing the second time.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::clock;
use crate::error::{LessonDirError, LessonDirResult};
use crate::lesson::{Lesson, LessonDraft};
use crate::store::RecordStore;
use crate::template::{NewTemplate, Template, TemplateItem};

/// Start used for lessons and template items that have none.
const FALLBACK_START: &str = "18:00";
/// Duration used when a lesson's length is zero, negative or unreadable, and
/// for template items with a zero duration.
const FALLBACK_DURATION: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Saved(Template),
    /// No lessons in the anchor's week.
    EmptyWeek,
    /// The name was blank.
    NoName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Created(Vec<Lesson>),
    /// Every lesson of the template already exists in that week.
    AllDuplicates,
    EmptyTemplate,
    TemplateNotFound,
}

/// Template items for the lessons in the Monday-aligned week containing
/// `anchor`, in `(date, start)` order.
pub fn capture_week(anchor: &str, lessons: &[Lesson]) -> LessonDirResult<Vec<TemplateItem>> {
    let (first, last) = clock::week_bounds(anchor)?;

    let mut in_week: Vec<&Lesson> = lessons
        .iter()
        .filter(|l| l.date.as_str() >= first.as_str() && l.date.as_str() <= last.as_str())
        .collect();
    in_week.sort_by(|a, b| (&a.date, &a.start).cmp(&(&b.date, &b.start)));

    Ok(in_week
        .into_iter()
        .filter_map(|lesson| {
            let dow = clock::weekday_index(&lesson.date).ok()?;
            let start = if lesson.start.is_empty() {
                FALLBACK_START.to_string()
            } else {
                lesson.start.clone()
            };
            Some(TemplateItem {
                dow,
                start,
                duration: captured_duration(lesson),
                student: lesson.student.clone(),
                notes: lesson.notes.clone(),
            })
        })
        .collect())
}

fn captured_duration(lesson: &Lesson) -> u32 {
    match lesson.duration_minutes() {
        Some(minutes) if minutes > 0 => u32::try_from(minutes).unwrap_or(FALLBACK_DURATION),
        _ => FALLBACK_DURATION,
    }
}

/// Drafts for every template item placed on the week containing `anchor`.
pub fn expand(template: &Template, anchor: &str) -> LessonDirResult<Vec<LessonDraft>> {
    let monday = clock::week_start(anchor)?;

    template
        .items
        .iter()
        .map(|item| {
            let date = clock::add_days(&monday, i64::from(item.dow))?;
            let start = if item.start.is_empty() {
                FALLBACK_START
            } else {
                item.start.as_str()
            };
            let duration = if item.duration == 0 {
                FALLBACK_DURATION
            } else {
                item.duration
            };
            Ok(LessonDraft::new(&date, start, duration, &item.student)
                .with_notes(item.notes.clone()))
        })
        .collect()
}

/// Drop drafts whose `date|start|student` key matches an existing lesson.
pub fn without_duplicates(drafts: Vec<LessonDraft>, existing: &[Lesson]) -> Vec<LessonDraft> {
    let taken: HashSet<String> = existing.iter().map(Lesson::dedup_key).collect();
    drafts
        .into_iter()
        .filter(|draft| !taken.contains(&draft.dedup_key()))
        .collect()
}

/// Capture the week containing `anchor` from `store` and save it as a
/// template named `name`.
pub async fn save_week(
    store: &dyn RecordStore,
    anchor: &str,
    name: &str,
) -> LessonDirResult<CaptureOutcome> {
    let items = capture_week(anchor, &store.lessons())?;
    if items.is_empty() {
        return Ok(CaptureOutcome::EmptyWeek);
    }

    let name = name.trim();
    if name.is_empty() {
        return Ok(CaptureOutcome::NoName);
    }

    let template = store
        .add_template(NewTemplate {
            name: name.to_string(),
            items,
        })
        .await?;
    info!(template = name, items = template.items.len(), "Saved week as template");
    Ok(CaptureOutcome::Saved(template))
}

/// Create the lessons of template `template_id` in the week containing
/// `anchor`, skipping any that already exist.
pub async fn apply(
    store: &dyn RecordStore,
    template_id: &str,
    anchor: &str,
) -> LessonDirResult<ApplyOutcome> {
    let templates = store.templates().await?;
    let Some(template) = templates.iter().find(|t| t.id == template_id) else {
        return Ok(ApplyOutcome::TemplateNotFound);
    };
    if template.items.is_empty() {
        return Ok(ApplyOutcome::EmptyTemplate);
    }

    let drafts = expand(template, anchor)?;
    let total = drafts.len();
    let drafts = without_duplicates(drafts, &store.lessons());
    debug!(total, fresh = drafts.len(), "Expanded template");

    if drafts.is_empty() {
        return Ok(ApplyOutcome::AllDuplicates);
    }

    let created = store.add_many(drafts).await?;
    info!(template = %template.name, created = created.len(), "Applied template");
    Ok(ApplyOutcome::Created(created))
}

/// Delete the template `template_id` from `store`.
pub async fn delete(store: &dyn RecordStore, template_id: &str) -> LessonDirResult<()> {
    if !store.templates().await?.iter().any(|t| t.id == template_id) {
        return Err(LessonDirError::TemplateNotFound(template_id.to_string()));
    }
    store.delete_template(template_id).await?;
    info!(template = template_id, "Deleted template");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::LessonStatus;
    use crate::local::{LocalStore, MemoryStorage};

    fn local() -> LocalStore {
        LocalStore::open(MemoryStorage::new()).unwrap()
    }

    fn item(dow: u8, start: &str, student: &str) -> TemplateItem {
        TemplateItem {
            dow,
            start: start.into(),
            duration: 30,
            student: student.into(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_capture_week_window_and_defaults() {
        let mk = |id: &str, date: &str, start: &str, end: &str| Lesson {
            id: id.into(),
            date: date.into(),
            start: start.into(),
            end: end.into(),
            student: "Ana".into(),
            status: LessonStatus::Done,
            notes: String::new(),
        };
        let lessons = vec![
            mk("sun", "2024-01-14", "18:00", "18:45"),
            mk("wed", "2024-01-10", "09:00", "09:00"),
            mk("mon", "2024-01-08", "18:00", "19:15"),
            mk("blank", "2024-01-09", "", ""),
            mk("next", "2024-01-15", "18:00", "18:30"),
            mk("prev", "2024-01-07", "18:00", "18:30"),
        ];

        let items = capture_week("2024-01-10", &lessons).unwrap();

        let summary: Vec<_> = items.iter().map(|i| (i.dow, i.start.as_str(), i.duration)).collect();
        assert_eq!(
            summary,
            [(0, "18:00", 75), (1, "18:00", 30), (2, "09:00", 30), (6, "18:00", 45)]
        );
    }

    #[test]
    fn test_expand_places_items_on_target_week() {
        let template = Template {
            id: "t".into(),
            name: "Week".into(),
            items: vec![item(0, "18:00", "Ana"), item(6, "23:45", "Bo")],
        };

        let drafts = expand(&template, "2024-01-17").unwrap();

        assert_eq!(drafts[0].date, "2024-01-15");
        assert_eq!(drafts[1].date, "2024-01-21");
        // End wraps past midnight
        assert_eq!(drafts[1].end, "00:15");
        assert!(drafts.iter().all(|d| d.status == LessonStatus::Scheduled));
    }

    #[test]
    fn test_expand_fills_missing_start_and_duration() {
        let template: Template = serde_json::from_value(serde_json::json!({
            "id": "t",
            "name": "Old",
            "items": [
                {"dow": 0, "student": "Ana"},
                {"dow": 1, "start": "", "duration": 0, "student": "Bo"},
            ],
        }))
        .unwrap();
        assert_eq!(template.items[0].start, "");
        assert_eq!(template.items[0].duration, 0);

        let drafts = expand(&template, "2024-01-15").unwrap();

        let slots: Vec<_> = drafts
            .iter()
            .map(|d| (d.date.as_str(), d.start.as_str(), d.end.as_str()))
            .collect();
        assert_eq!(
            slots,
            [("2024-01-15", "18:00", "18:30"), ("2024-01-16", "18:00", "18:30")]
        );
    }

    #[tokio::test]
    async fn test_capture_then_apply_round_trip() {
        let store = local();
        store
            .add(LessonDraft::new("2024-01-08", "18:00", 30, "Ana").with_notes("x"))
            .await
            .unwrap();

        let CaptureOutcome::Saved(template) =
            save_week(&store, "2024-01-08", "Week A").await.unwrap()
        else {
            panic!("expected a saved template");
        };
        assert_eq!(
            template.items,
            vec![TemplateItem {
                dow: 0,
                start: "18:00".into(),
                duration: 30,
                student: "Ana".into(),
                notes: "x".into(),
            }]
        );

        let ApplyOutcome::Created(created) =
            apply(&store, &template.id, "2024-01-15").await.unwrap()
        else {
            panic!("expected lessons to be created");
        };
        assert_eq!(created.len(), 1);
        let lesson = &created[0];
        assert_eq!(lesson.date, "2024-01-15");
        assert_eq!(lesson.start, "18:00");
        assert_eq!(lesson.end, "18:30");
        assert_eq!(lesson.student, "Ana");
        assert_eq!(lesson.status, LessonStatus::Scheduled);
        assert_eq!(lesson.notes, "x");
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let store = local();
        let template = store
            .add_template(NewTemplate {
                name: "Week".into(),
                items: vec![item(0, "18:00", "Ana"), item(2, "17:00", "Bo")],
            })
            .await
            .unwrap();

        let first = apply(&store, &template.id, "2024-01-15").await.unwrap();
        assert!(matches!(first, ApplyOutcome::Created(ref l) if l.len() == 2));

        let second = apply(&store, &template.id, "2024-01-15").await.unwrap();
        assert_eq!(second, ApplyOutcome::AllDuplicates);
        assert_eq!(store.lessons().len(), 2);
    }

    #[tokio::test]
    async fn test_apply_skips_only_matching_keys() {
        let store = local();
        store
            .add(LessonDraft::new("2024-01-15", "18:00", 45, "Ana"))
            .await
            .unwrap();
        let template = store
            .add_template(NewTemplate {
                name: "Week".into(),
                items: vec![item(0, "18:00", "Ana"), item(0, "18:00", "Bo")],
            })
            .await
            .unwrap();

        let outcome = apply(&store, &template.id, "2024-01-15").await.unwrap();

        let ApplyOutcome::Created(created) = outcome else {
            panic!("expected lessons to be created");
        };
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].student, "Bo");
    }

    #[tokio::test]
    async fn test_no_op_outcomes() {
        let store = local();
        assert_eq!(
            save_week(&store, "2024-01-15", "Week").await.unwrap(),
            CaptureOutcome::EmptyWeek
        );

        store
            .add(LessonDraft::new("2024-01-15", "18:00", 30, "Ana"))
            .await
            .unwrap();
        assert_eq!(
            save_week(&store, "2024-01-15", "  ").await.unwrap(),
            CaptureOutcome::NoName
        );
        assert!(store.templates().await.unwrap().is_empty());

        assert_eq!(
            apply(&store, "missing", "2024-01-15").await.unwrap(),
            ApplyOutcome::TemplateNotFound
        );

        let empty = store
            .add_template(NewTemplate {
                name: "Empty".into(),
                items: vec![],
            })
            .await
            .unwrap();
        assert_eq!(
            apply(&store, &empty.id, "2024-01-15").await.unwrap(),
            ApplyOutcome::EmptyTemplate
        );

        delete(&store, &empty.id).await.unwrap();
        assert!(store.templates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_template_fails() {
        let store = local();
        let kept = store
            .add_template(NewTemplate {
                name: "Keep".into(),
                items: vec![item(0, "18:00", "Ana")],
            })
            .await
            .unwrap();

        let err = delete(&store, "missing").await.unwrap_err();

        assert!(matches!(err, LessonDirError::TemplateNotFound(id) if id == "missing"));
        assert_eq!(store.templates().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_apply_through_remote_store() {
        use crate::remote::{MemoryBackend, RemoteStore};
        use crate::session::SessionIdentity;
        use std::sync::Arc;

        let backend = Arc::new(MemoryBackend::new());
        let store = RemoteStore::new(backend.clone());
        store.sign_in(SessionIdentity::new("ana"));
        store.wait_for_snapshot().await.unwrap();

        let template = store
            .add_template(NewTemplate {
                name: "Week".into(),
                items: vec![item(0, "18:00", "Ana"), item(1, "18:00", "Ana")],
            })
            .await
            .unwrap();

        apply(&store, &template.id, "2024-01-15").await.unwrap();
        assert_eq!(backend.lessons(&SessionIdentity::new("ana")).len(), 2);
    }
}
