//! Weekly lesson templates.

use serde::{Deserialize, Serialize};

/// A named weekly recurrence pattern.
///
/// Templates are never edited in place: to change one, delete it and capture
/// a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

/// One lesson slot of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateItem {
    /// Day of week, Monday = 0 .. Sunday = 6
    pub dow: u8,
    /// `HH:MM`, empty is read as 18:00 when applied
    #[serde(default)]
    pub start: String,
    /// Minutes, 0 is read as 30 when applied
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub student: String,
    #[serde(default)]
    pub notes: String,
}

/// A template that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub items: Vec<TemplateItem>,
}

impl NewTemplate {
    pub fn into_template(self, id: String) -> Template {
        Template {
            id,
            name: self.name,
            items: self.items,
        }
    }
}
