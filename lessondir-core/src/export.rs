//! CSV export of lessons.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::{LessonDirError, LessonDirResult};
use crate::lesson::Lesson;

pub const CSV_COLUMNS: [&str; 7] = ["id", "date", "start", "end", "student", "status", "notes"];

/// Render lessons as CSV in the order given.
///
/// Fields containing a comma, double quote or newline are quoted, with inner
/// quotes doubled. A carriage return counts as a newline here, so a stray
/// `\r` quotes its field as well.
pub fn lessons_to_csv(lessons: &[Lesson]) -> LessonDirResult<String> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(CSV_COLUMNS).map_err(csv_error)?;

    for lesson in lessons {
        wtr.write_record([
            lesson.id.as_str(),
            lesson.date.as_str(),
            lesson.start.as_str(),
            lesson.end.as_str(),
            lesson.student.as_str(),
            lesson.status.as_str(),
            lesson.notes.as_str(),
        ])
        .map_err(csv_error)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| LessonDirError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| LessonDirError::Serialization(e.to_string()))
}

fn csv_error(e: csv::Error) -> LessonDirError {
    LessonDirError::Serialization(e.to_string())
}
