//! Task record store
//!
//! `db.json` holds one [`Database`] snapshot. Readers take a consistent copy
//! of it; writers go through [`Store::update`], which holds the lock for the
//! whole read-modify-write.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::tag::{self, Tag};
use crate::task::{NewTask, PatchOutcome, Priority, Task, TaskPatch, TaskStatus};

/// Everything stored in `db.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Database {
    pub fn task_index(&self, input: &str) -> Result<usize> {
        resolve_id(self.tasks.iter().map(|t| t.id.as_str()), input, "task")?
            .ok_or_else(|| Error::TaskNotFound(input.trim().to_string()))
    }

    pub fn category_index(&self, input: &str) -> Result<usize> {
        resolve_id(self.categories.iter().map(|c| c.id.as_str()), input, "category")?
            .ok_or_else(|| Error::CategoryNotFound(input.trim().to_string()))
    }

    pub fn tag_index(&self, input: &str) -> Result<usize> {
        resolve_id(self.tags.iter().map(|t| t.id.as_str()), input, "tag")?
            .ok_or_else(|| Error::TagNotFound(input.trim().to_string()))
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Turn a category reference into a stored id, or clear it.
    fn resolve_category(&self, input: Option<String>) -> Result<Option<String>> {
        match input.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(reference) => {
                let idx = self.category_index(reference)?;
                Ok(Some(self.categories[idx].id.clone()))
            }
        }
    }
}

/// Find `input` among `ids`, as an exact id or a unique prefix.
pub(crate) fn resolve_id<'a>(
    ids: impl Iterator<Item = &'a str>,
    input: &str,
    entity: &str,
) -> Result<Option<usize>> {
    let needle = input.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(Error::InvalidArgument(format!("{entity} id cannot be empty")));
    }

    let mut prefix = Vec::new();
    for (idx, id) in ids.enumerate() {
        let id = id.to_ascii_lowercase();
        if id == needle {
            return Ok(Some(idx));
        }
        if id.starts_with(&needle) {
            prefix.push(idx);
        }
    }

    if prefix.len() > 1 {
        return Err(Error::InvalidArgument(format!(
            "ambiguous {entity} id '{}': {} matches",
            input.trim(),
            prefix.len()
        )));
    }
    Ok(prefix.into_iter().next())
}

/// Task selection criteria; every set field must match.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub category_id: Option<String>,
    pub completed: Option<bool>,
    pub tag_id: Option<String>,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Inclusive lower bound on `createdAt`
    pub created_since: Option<DateTime<Utc>>,
}

impl TaskFilter {
    pub fn created_since(since: Option<DateTime<Utc>>) -> Self {
        Self {
            created_since: since,
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if let Some(category_id) = &self.category_id {
            if task.category_id.as_ref() != Some(category_id) {
                return false;
            }
        }
        if self.completed.is_some_and(|completed| task.completed != completed) {
            return false;
        }
        if let Some(tag_id) = &self.tag_id {
            if !task.has_tag(tag_id) {
                return false;
            }
        }
        if let Some(since) = self.created_since {
            if task.created_at < since {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = task.title.to_lowercase().contains(&needle);
            let in_description = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Status,
    Priority,
    Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    /// `None` groups tasks without a value (e.g. no category)
    pub key: Option<String>,
    pub count: usize,
}

/// Read capability the analytics builders consume
pub trait TaskSource {
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Completion timestamps of the most recent `limit` completed tasks,
    /// newest first.
    fn completion_history(&self, limit: usize) -> Result<Vec<DateTime<Utc>>>;

    fn count_tasks(&self, filter: &TaskFilter) -> Result<usize> {
        Ok(self.list_tasks(filter)?.len())
    }

    fn group_count(&self, filter: &TaskFilter, field: GroupField) -> Result<Vec<GroupCount>> {
        let mut groups: BTreeMap<Option<String>, usize> = BTreeMap::new();
        for task in self.list_tasks(filter)? {
            let key = match field {
                GroupField::Status => Some(task.status.as_str().to_string()),
                GroupField::Priority => Some(task.priority.as_str().to_string()),
                GroupField::Category => task.category_id.clone(),
            };
            *groups.entry(key).or_default() += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect())
    }
}

impl TaskSource for Database {
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    fn completion_history(&self, limit: usize) -> Result<Vec<DateTime<Utc>>> {
        let mut history: Vec<DateTime<Utc>> = self
            .tasks
            .iter()
            .filter(|task| task.completed)
            .filter_map(|task| task.completed_at)
            .collect();
        history.sort_unstable_by(|a, b| b.cmp(a));
        history.truncate(limit);
        Ok(history)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    Complete,
    Uncomplete,
}

impl std::str::FromStr for BulkAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delete" => Ok(BulkAction::Delete),
            "complete" => Ok(BulkAction::Complete),
            "uncomplete" => Ok(BulkAction::Uncomplete),
            _ => Err(Error::InvalidEnum {
                field: "action",
                value: s.to_string(),
                expected: "delete, complete, uncomplete",
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub action: BulkAction,
    pub requested: usize,
    /// Tasks actually changed; already-matching tasks are not counted
    pub affected: usize,
    /// Tasks that moved from open to completed
    pub completed_transitions: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// File-backed store for tasks
#[derive(Debug, Clone)]
pub struct Store {
    storage: Storage,
    config: Config,
}

impl Store {
    pub fn new(storage: Storage, config: Config) -> Self {
        Self { storage, config }
    }

    /// Open the data directory and load its configuration.
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let storage = Storage::open(data_dir)?;
        let config = Config::load_from_dir(storage.data_dir())?;
        Ok(Self::new(storage, config))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consistent read-only copy of the whole database
    pub fn snapshot(&self) -> Result<Database> {
        self.storage.read_json(&self.storage.db_file())
    }

    /// Mutate the database under its lock. Nothing is written on error.
    pub fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Database) -> Result<R>,
    {
        self.storage.update_json(&self.storage.db_file(), f)
    }

    pub fn create_task(&self, mut input: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = self.update(|db| {
            input.category_id = db.resolve_category(input.category_id.take())?;
            input.tag_ids = tag::resolve_refs(db, &input.tag_ids, now)?;
            let task = Task::create(input, &self.config.tasks, now)?;
            db.tasks.push(task.clone());
            Ok(task)
        })?;
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        let db = self.snapshot()?;
        let idx = db.task_index(id)?;
        Ok(db.tasks[idx].clone())
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.snapshot()?.list_tasks(filter)
    }

    /// Apply a patch. Category and tag references are resolved first.
    pub fn update_task(
        &self,
        id: &str,
        mut patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<(Task, PatchOutcome)> {
        let (task, outcome) = self.update(|db| {
            let idx = db.task_index(id)?;
            if let Some(category) = patch.category_id.take() {
                patch.category_id = Some(db.resolve_category(category)?);
            }
            if let Some(refs) = patch.tag_ids.take() {
                patch.tag_ids = Some(tag::resolve_refs(db, &refs, now)?);
            }
            let task = &mut db.tasks[idx];
            let outcome = task.apply_patch(patch, &self.config.tasks, now)?;
            Ok((task.clone(), outcome))
        })?;
        tracing::debug!(task_id = %task.id, ?outcome, "task updated");
        Ok((task, outcome))
    }

    pub fn delete_task(&self, id: &str) -> Result<Task> {
        let task = self.update(|db| {
            let idx = db.task_index(id)?;
            Ok(db.tasks.remove(idx))
        })?;
        tracing::info!(task_id = %task.id, "task deleted");
        Ok(task)
    }

    /// Apply `action` to every id that resolves; unknown ids are reported
    /// and skipped.
    pub fn bulk(&self, action: BulkAction, ids: &[String], now: DateTime<Utc>) -> Result<BulkReport> {
        if ids.is_empty() {
            return Err(Error::InvalidArgument("no task ids given".to_string()));
        }
        let report = self.update(|db| {
            let mut report = BulkReport {
                action,
                requested: ids.len(),
                affected: 0,
                completed_transitions: 0,
                missing: Vec::new(),
            };

            let mut targets: Vec<String> = Vec::new();
            for id in ids {
                match db.task_index(id) {
                    Ok(idx) => {
                        let full = db.tasks[idx].id.clone();
                        if !targets.contains(&full) {
                            targets.push(full);
                        }
                    }
                    Err(Error::TaskNotFound(missing)) => report.missing.push(missing),
                    Err(err) => return Err(err),
                }
            }

            match action {
                BulkAction::Delete => {
                    let before = db.tasks.len();
                    db.tasks.retain(|task| !targets.contains(&task.id));
                    report.affected = before - db.tasks.len();
                }
                BulkAction::Complete | BulkAction::Uncomplete => {
                    let complete = action == BulkAction::Complete;
                    // Tasks already in the target state are left untouched.
                    for task in db
                        .tasks
                        .iter_mut()
                        .filter(|t| targets.contains(&t.id) && t.completed != complete)
                    {
                        let patch = if complete {
                            TaskPatch::complete()
                        } else {
                            TaskPatch::uncomplete()
                        };
                        let outcome = task.apply_patch(patch, &self.config.tasks, now)?;
                        report.affected += 1;
                        if outcome.became_completed {
                            report.completed_transitions += 1;
                        }
                    }
                }
            }
            Ok(report)
        })?;
        tracing::info!(
            action = ?report.action,
            affected = report.affected,
            missing = report.missing.len(),
            "bulk operation applied"
        );
        Ok(report)
    }
}
