use chrono::format::StrftimeItems;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{self, Write};

/// Server-assigned task identifier. The API may hand out string ids
/// (`_id`) or numeric ones (`id`); both are kept as their text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TaskId(s),
            RawId::Number(n) => TaskId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "dueDate", default)]
    pub due_date: Option<String>,
    #[serde(rename = "dueTime", default)]
    pub due_time: Option<String>,
}

impl Task {
    pub fn has_due_info(&self) -> bool {
        self.due_date.as_deref().is_some_and(|d| !d.is_empty())
            || self.due_time.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Body of `POST /api/todos`. Missing due fields go out as explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub text: String,
    #[serde(rename = "dueDate")]
    pub due_date: Option<String>,
    #[serde(rename = "dueTime")]
    pub due_time: Option<String>,
}

/// Partial update for `PUT /api/todos/:id`. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "dueDate", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "dueTime", skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
}

impl TaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        TaskPatch {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ConfigItem {
    pub key_name: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Renders `date` with a strftime pattern. `None` when the pattern is
/// malformed or asks for fields a plain date does not have (`%H`, `%Z`).
pub fn format_date(date: NaiveDate, date_format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(StrftimeItems::new(date_format))).ok()?;
    Some(out)
}

pub fn is_valid_date_format(date_format: &str) -> bool {
    NaiveDate::from_ymd_opt(2024, 5, 1).is_some_and(|d| format_date(d, date_format).is_some())
}

/// Formats a due date for display. Accepts plain `YYYY-MM-DD` values as
/// well as full RFC 3339 timestamps; anything else, or a date the pattern
/// cannot render, is shown as-is.
pub fn format_due_date(raw: &str, date_format: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .and_then(|d| format_date(d, date_format))
        .unwrap_or_else(|| raw.to_string())
}
