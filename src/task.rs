//! Task model for the board.
//!
//! Tasks arrive from the backing store as loosely shaped JSON documents
//! (numeric or string ids, a single assignee string or a list, two status
//! spellings). [`Task::from_document`] is the one place that shape is checked;
//! everything past the store boundary works with the typed record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use ulid::Ulid;

use crate::error::{Error, Result};

const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

fn serialize_doc_id<S: Serializer>(raw: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    // Timestamp ids go back out as numbers so documents stay readable by
    // clients that compare ids numerically.
    match raw.parse::<u64>() {
        Ok(number) if number.to_string() == raw => serializer.serialize_u64(number),
        _ => serializer.serialize_str(raw),
    }
}

fn deserialize_doc_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(serde_json::Number),
        Text(String),
    }

    let raw = match RawId::deserialize(deserializer)? {
        RawId::Number(number) => number.to_string(),
        RawId::Text(text) => text.trim().to_string(),
    };
    if raw.is_empty() {
        return Err(de::Error::custom("id cannot be empty"));
    }
    Ok(raw)
}

/// Task identifier: a creation timestamp or a backend-assigned string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Millisecond timestamp id, the way the add-task form assigns them.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis().to_string())
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

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TaskId::new(s)
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_doc_id(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_doc_id(deserializer).map(TaskId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtaskId(String);

impl SubtaskId {
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for SubtaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_doc_id(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for SubtaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_doc_id(deserializer).map(SubtaskId)
    }
}

/// Board status. Each status owns exactly one column.
///
/// Stored documents use the compact spellings (`inprogress`,
/// `awaitfeedback`); the hyphenated forms are accepted everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "todo", alias = "to-do")]
    Todo,
    #[serde(rename = "inprogress", alias = "in-progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "awaitfeedback", alias = "await-feedback", alias = "await_feedback")]
    AwaitFeedback,
    #[serde(rename = "done")]
    Done,
}

impl Status {
    /// Column order, left to right.
    pub const ALL: [Status; 4] = [
        Status::Todo,
        Status::InProgress,
        Status::AwaitFeedback,
        Status::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::AwaitFeedback => "await-feedback",
            Status::Done => "done",
        }
    }

    /// Spelling used in stored documents and DOM ids.
    pub fn storage_key(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "inprogress",
            Status::AwaitFeedback => "awaitfeedback",
            Status::Done => "done",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To do",
            Status::InProgress => "In progress",
            Status::AwaitFeedback => "Await feedback",
            Status::Done => "Done",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::AwaitFeedback => 2,
            Status::Done => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "todo" => Ok(Status::Todo),
            "inprogress" => Ok(Status::InProgress),
            "awaitfeedback" => Ok(Status::AwaitFeedback),
            "done" => Ok(Status::Done),
            _ => Err(Error::InvalidArgument(format!(
                "unknown task status '{}' (expected todo|in-progress|await-feedback|done)",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(Error::InvalidArgument(format!(
                "unknown task priority '{other}' (expected urgent|medium|low)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "user-story")]
    UserStory,
    #[default]
    #[serde(rename = "technical-task", alias = "technical")]
    TechnicalTask,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::UserStory => "user-story",
            Category::TechnicalTask => "technical-task",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::UserStory => "User Story",
            Category::TechnicalTask => "Technical Task",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user-story" | "userstory" | "story" => Ok(Category::UserStory),
            "technical-task" | "technical" | "task" => Ok(Category::TechnicalTask),
            other => Err(Error::InvalidArgument(format!(
                "unknown task category '{other}' (expected user-story|technical-task)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: SubtaskId::generate(),
            text: text.into(),
            completed: false,
        }
    }
}

/// Subtask completion, always derived from the subtask list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

fn deserialize_assignees<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Number(serde_json::Number),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(Entry),
        Many(Vec<Entry>),
    }

    let entries = match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::One(entry)) => vec![entry],
        Some(Raw::Many(entries)) => entries,
    };
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Number(number) => number.to_string(),
            Entry::Text(text) => text.trim().to_string(),
        })
        .filter(|id| !id.is_empty())
        .collect())
}

fn deserialize_created_at<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Millis(millis)) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("createdAt out of range: {millis}"))),
        Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|err| de::Error::custom(format!("invalid createdAt '{text}': {err}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "deserialize_assignees")]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub status: Status,
    #[serde(
        default,
        deserialize_with = "deserialize_created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Task {
    /// Validate a raw backing-store document into a task.
    pub fn from_document(document: serde_json::Value) -> Result<Self> {
        let id = document.get("id").map(|id| match id {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        });
        let task: Task = serde_json::from_value(document).map_err(|err| Error::InvalidTask {
            id: id.clone(),
            reason: err.to_string(),
        })?;
        task.validate()?;
        Ok(task)
    }

    pub fn to_document(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidTask {
                id: Some(self.id.to_string()),
                reason: "title cannot be empty".to_string(),
            });
        }
        for subtask in &self.subtasks {
            if subtask.text.trim().is_empty() {
                return Err(Error::InvalidTask {
                    id: Some(self.id.to_string()),
                    reason: format!("subtask {} has no text", subtask.id.as_str()),
                });
            }
        }
        Ok(())
    }

    pub fn progress(&self) -> Option<Progress> {
        if self.subtasks.is_empty() {
            return None;
        }
        Some(Progress {
            completed: self.subtasks.iter().filter(|subtask| subtask.completed).count(),
            total: self.subtasks.len(),
        })
    }

    /// Due date when it parses as `YYYY-MM-DD`.
    pub fn due_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.due_date.trim(), DUE_DATE_FORMAT).ok()
    }

    /// Case-insensitive match on title or description; empty query matches.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Fields collected by the add-task form.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub assigned_to: Vec<String>,
    pub category: Category,
    pub subtasks: Vec<String>,
    pub created_by: Option<String>,
}

impl NewTask {
    pub fn into_task(self, now: DateTime<Utc>) -> Result<Task> {
        let task = Task {
            id: TaskId::from_timestamp(now),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            due_date: self.due_date.trim().to_string(),
            priority: self.priority,
            assigned_to: self.assigned_to,
            category: self.category,
            subtasks: self
                .subtasks
                .into_iter()
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .map(Subtask::new)
                .collect(),
            status: Status::Todo,
            created_at: Some(now),
            created_by: self.created_by,
        };
        task.validate()?;
        Ok(task)
    }
}

/// Edit-form save. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Vec<String>>,
    pub category: Option<Category>,
    pub subtasks: Option<Vec<Subtask>>,
    pub status: Option<Status>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.category.is_none()
            && self.subtasks.is_none()
            && self.status.is_none()
    }

    /// Apply to a copy of `task`; the original is untouched when validation fails.
    pub fn apply(&self, task: &Task) -> Result<Task> {
        let mut next = task.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = description.trim().to_string();
        }
        if let Some(due_date) = &self.due_date {
            next.due_date = due_date.trim().to_string();
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            next.assigned_to = assigned_to.clone();
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(subtasks) = &self.subtasks {
            next.subtasks = subtasks.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_document() -> serde_json::Value {
        json!({
            "id": 1718000000000u64,
            "title": "Build board",
            "description": "Columns and cards",
            "dueDate": "2024-07-01",
            "priority": "urgent",
            "assignedTo": "contact-7",
            "category": "technical",
            "subtasks": [
                { "id": 1, "text": "Layout", "completed": true },
                { "id": 2, "text": "Drag", "completed": false }
            ],
            "status": "inprogress",
            "createdAt": 1718000000000i64
        })
    }

    #[test]
    fn legacy_document_is_normalized() {
        let task = Task::from_document(legacy_document()).expect("task");
        assert_eq!(task.id.as_str(), "1718000000000");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.category, Category::TechnicalTask);
        assert_eq!(task.assigned_to, vec!["contact-7".to_string()]);
        assert_eq!(task.priority, Priority::Urgent);
        assert!(task.created_at.is_some());
    }

    #[test]
    fn stored_spelling_is_preserved_on_write() {
        let task = Task::from_document(legacy_document()).expect("task");
        let document = task.to_document().expect("document");
        assert_eq!(document["id"], json!(1718000000000u64));
        assert_eq!(document["status"], json!("inprogress"));
        assert_eq!(document["category"], json!("technical-task"));

        let reloaded = Task::from_document(document).expect("reload");
        assert_eq!(reloaded, task);
    }

    #[test]
    fn hyphenated_status_is_accepted() {
        let mut document = legacy_document();
        document["status"] = json!("await-feedback");
        let task = Task::from_document(document).expect("task");
        assert_eq!(task.status, Status::AwaitFeedback);
    }

    #[test]
    fn unknown_status_is_rejected_at_boundary() {
        let mut document = legacy_document();
        document["status"] = json!("archived");
        let err = Task::from_document(document).expect_err("invalid");
        match err {
            Error::InvalidTask { id, .. } => assert_eq!(id.as_deref(), Some("1718000000000")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut document = legacy_document();
        document["title"] = json!("   ");
        assert!(Task::from_document(document).is_err());
    }

    #[test]
    fn status_parses_all_spellings() {
        assert_eq!("todo".parse::<Status>().expect("todo"), Status::Todo);
        assert_eq!("In-Progress".parse::<Status>().expect("ip"), Status::InProgress);
        assert_eq!("awaitfeedback".parse::<Status>().expect("af"), Status::AwaitFeedback);
        assert_eq!("await_feedback".parse::<Status>().expect("af"), Status::AwaitFeedback);
        assert!("blocked".parse::<Status>().is_err());
    }

    #[test]
    fn progress_is_derived_from_subtasks() {
        let mut task = Task::from_document(legacy_document()).expect("task");
        let progress = task.progress().expect("progress");
        assert_eq!(progress, Progress { completed: 1, total: 2 });
        assert_eq!(progress.percent(), 50.0);

        task.subtasks[1].completed = true;
        assert_eq!(task.progress().expect("progress").completed, 2);

        task.subtasks.clear();
        assert!(task.progress().is_none());
    }

    #[test]
    fn assignees_accept_lists_and_null() {
        let mut document = legacy_document();
        document["assignedTo"] = json!(["a", 2, ""]);
        let task = Task::from_document(document.clone()).expect("task");
        assert_eq!(task.assigned_to, vec!["a".to_string(), "2".to_string()]);

        document["assignedTo"] = serde_json::Value::Null;
        let task = Task::from_document(document).expect("task");
        assert!(task.assigned_to.is_empty());
    }

    #[test]
    fn new_task_starts_in_todo() {
        let now = Utc::now();
        let task = NewTask {
            title: "  Write docs ".to_string(),
            subtasks: vec!["outline".to_string(), " ".to_string()],
            ..NewTask::default()
        }
        .into_task(now)
        .expect("task");
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.subtasks.len(), 1);
        assert_eq!(task.id, TaskId::from_timestamp(now));
    }

    #[test]
    fn edit_keeps_original_on_invalid_title() {
        let task = Task::from_document(legacy_document()).expect("task");
        let edit = TaskEdit {
            title: Some(String::new()),
            ..TaskEdit::default()
        };
        assert!(edit.apply(&task).is_err());

        let edit = TaskEdit {
            status: Some(Status::Done),
            priority: Some(Priority::Low),
            ..TaskEdit::default()
        };
        let next = edit.apply(&task).expect("apply");
        assert_eq!(next.status, Status::Done);
        assert_eq!(next.priority, Priority::Low);
        assert_eq!(task.status, Status::InProgress);
    }

    #[test]
    fn query_matches_title_or_description() {
        let task = Task::from_document(legacy_document()).expect("task");
        assert!(task.matches_query("BOARD"));
        assert!(task.matches_query("cards"));
        assert!(task.matches_query(""));
        assert!(!task.matches_query("login"));
    }
}
