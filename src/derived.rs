//! Read-time derived state.
//!
//! OVERDUE depends on the wall clock, so it is computed when a task is read
//! and never written back.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::{Priority, Task};

/// Priority as displayed and sorted
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectivePriority {
    Low,
    Medium,
    High,
    Urgent,
    Overdue,
}

impl EffectivePriority {
    /// Sort rank: OVERDUE=5 down to LOW=1
    pub fn rank(self) -> u8 {
        match self {
            EffectivePriority::Low => 1,
            EffectivePriority::Medium => 2,
            EffectivePriority::High => 3,
            EffectivePriority::Urgent => 4,
            EffectivePriority::Overdue => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EffectivePriority::Low => "LOW",
            EffectivePriority::Medium => "MEDIUM",
            EffectivePriority::High => "HIGH",
            EffectivePriority::Urgent => "URGENT",
            EffectivePriority::Overdue => "OVERDUE",
        }
    }
}

impl From<Priority> for EffectivePriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => EffectivePriority::Low,
            Priority::Medium => EffectivePriority::Medium,
            Priority::High => EffectivePriority::High,
            Priority::Urgent => EffectivePriority::Urgent,
        }
    }
}

impl fmt::Display for EffectivePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OVERDUE when the task is open and its due date is strictly before `now`.
pub fn effective_priority(task: &Task, now: DateTime<Utc>) -> EffectivePriority {
    if task.is_overdue(now) {
        EffectivePriority::Overdue
    } else {
        task.priority.into()
    }
}

/// A task tagged with its derived fields at the read boundary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub effective_priority: EffectivePriority,
    pub overdue: bool,
}

impl TaskView {
    pub fn new(task: Task, now: DateTime<Utc>) -> Self {
        let overdue = task.is_overdue(now);
        let effective_priority = effective_priority(&task, now);
        Self {
            task,
            effective_priority,
            overdue,
        }
    }
}

pub fn tag_all(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<TaskView> {
    tasks.into_iter().map(|task| TaskView::new(task, now)).collect()
}
