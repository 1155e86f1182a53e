//! Task records for taskmaster.
//!
//! A task carries three fields that must agree with each other: `status`,
//! `completed`, and `completed_at`. Every write goes through [`Task::create`]
//! or [`Task::apply_patch`], which derive all three from whatever subset the
//! caller supplied.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::config::TasksConfig;
use crate::error::{Error, Result};

const STATUS_VALUES: &str = "PENDING, IN_PROGRESS, COMPLETED, CANCELLED";
const PRIORITY_VALUES: &str = "LOW, MEDIUM, HIGH, URGENT";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize_enum(s).as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            _ => Err(Error::InvalidEnum {
                field: "status",
                value: s.to_string(),
                expected: STATUS_VALUES,
            }),
        }
    }
}

/// Stored priority. OVERDUE is never a stored value; see `derived`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Parse a priority supplied on the update path.
    ///
    /// Clients that echo a task's displayed priority back may send OVERDUE;
    /// it is stored as HIGH.
    pub fn parse_for_update(value: &str) -> Result<Self> {
        if normalize_enum(value) == "OVERDUE" {
            return Ok(Priority::High);
        }
        value.parse()
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
        match normalize_enum(s).as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "URGENT" => Ok(Priority::Urgent),
            _ => Err(Error::InvalidEnum {
                field: "priority",
                value: s.to_string(),
                expected: PRIORITY_VALUES,
            }),
        }
    }
}

fn normalize_enum(value: &str) -> String {
    value.trim().replace('-', "_").to_ascii_uppercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

/// Partial update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub completed: Option<bool>,
    pub category_id: Option<Option<String>>,
    pub tag_ids: Option<Vec<String>>,
    pub image_url: Option<Option<String>>,
    pub position: Option<i32>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
            && self.category_id.is_none()
            && self.tag_ids.is_none()
            && self.image_url.is_none()
            && self.position.is_none()
    }

    pub fn complete() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    pub fn uncomplete() -> Self {
        Self {
            completed: Some(false),
            ..Self::default()
        }
    }
}

/// What a patch did to the completion state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    /// Task moved from incomplete to completed
    pub became_completed: bool,
    /// Task moved from completed back to incomplete
    pub reopened: bool,
}

impl Task {
    /// Build a new task, validating the title and applying config defaults.
    pub fn create(input: NewTask, config: &TasksConfig, now: DateTime<Utc>) -> Result<Self> {
        let title = validate_title(&input.title, config.title_max_len)?;
        let status = match input.status {
            Some(status) => status,
            None => config.status()?,
        };
        let priority = match input.priority {
            Some(priority) => priority,
            None => config.priority()?,
        };
        let completed = status == TaskStatus::Completed;

        Ok(Task {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            title,
            description: clean_optional(input.description),
            status,
            priority,
            completed,
            completed_at: completed.then_some(now),
            due_date: input.due_date,
            category_id: clean_optional(input.category_id),
            tag_ids: dedupe_ids(input.tag_ids),
            image_url: clean_optional(input.image_url),
            position: input.position.unwrap_or(0),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update and reconcile the completion fields.
    ///
    /// Validation happens before any field is touched, so a rejected patch
    /// leaves the task unchanged.
    pub fn apply_patch(
        &mut self,
        patch: TaskPatch,
        config: &TasksConfig,
        now: DateTime<Utc>,
    ) -> Result<PatchOutcome> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }
        let title = patch
            .title
            .as_deref()
            .map(|title| validate_title(title, config.title_max_len))
            .transpose()?;
        let completion = reconcile_completion(self, patch.status, patch.completed, now)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = clean_optional(description);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = clean_optional(category_id);
        }
        if let Some(tag_ids) = patch.tag_ids {
            self.tag_ids = dedupe_ids(tag_ids);
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = clean_optional(image_url);
        }
        if let Some(position) = patch.position {
            self.position = position;
        }

        let outcome = PatchOutcome {
            became_completed: completion.completed && !self.completed,
            reopened: !completion.completed && self.completed,
        };
        self.status = completion.status;
        self.completed = completion.completed;
        self.completed_at = completion.completed_at;
        self.updated_at = now;
        Ok(outcome)
    }

    /// True when the due date passed and the task is still open
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }

    /// Hours between creation and completion, when both are known
    pub fn completion_hours(&self) -> Option<f64> {
        if !self.completed {
            return None;
        }
        let completed_at = self.completed_at?;
        let millis = (completed_at - self.created_at).num_milliseconds();
        Some(millis as f64 / MILLIS_PER_HOUR)
    }
}

const MILLIS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

struct Completion {
    status: TaskStatus,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

fn reconcile_completion(
    task: &Task,
    status: Option<TaskStatus>,
    completed: Option<bool>,
    now: DateTime<Utc>,
) -> Result<Completion> {
    let completed = match (status, completed) {
        (Some(status), Some(flag)) if (status == TaskStatus::Completed) != flag => {
            return Err(Error::InvalidArgument(format!(
                "status {status} conflicts with completed={flag}"
            )));
        }
        (Some(status), _) => status == TaskStatus::Completed,
        (None, Some(flag)) => flag,
        (None, None) => task.completed,
    };

    let status = match status {
        Some(status) => status,
        None if completed => TaskStatus::Completed,
        None if task.completed => TaskStatus::Pending,
        None => task.status,
    };

    let completed_at = if completed {
        match (task.completed, task.completed_at) {
            (true, Some(at)) => Some(at),
            _ => Some(now),
        }
    } else {
        None
    };

    Ok(Completion {
        status,
        completed,
        completed_at,
    })
}

fn validate_title(title: &str, max_len: usize) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingTitle);
    }
    if trimmed.chars().count() > max_len {
        return Err(Error::InvalidArgument(format!(
            "title cannot exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Parse a due date argument.
///
/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date. A bare date
/// becomes 23:59:59.999 of that day in `offset`. An empty string clears the
/// due date.
pub fn parse_due_date(value: &str, offset: FixedOffset) -> Result<Option<DateTime<Utc>>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|err| {
        Error::InvalidArgument(format!("invalid due date '{trimmed}': {err}"))
    })?;
    end_of_day(date, offset).map(Some)
}

/// 23:59:59.999 of `date` in `offset`, as UTC
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| Error::InvalidArgument(format!("invalid date {date}")))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidArgument(format!("ambiguous local time for {date}")))
}

/// Whether a stored due date carries a real time of day.
///
/// End-of-day values mean the user only picked a date.
pub fn has_explicit_time(due: DateTime<Utc>, offset: FixedOffset) -> bool {
    let local = due.with_timezone(&offset);
    !(local.hour() == 23
        && local.minute() == 59
        && local.second() == 59
        && local.timestamp_subsec_millis() == 999)
}
