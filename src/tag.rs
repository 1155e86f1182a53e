//! Tags: lower-cased unique labels attached to tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::analytics::completion_rate;
use crate::category::validate_color;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::store::Database;

pub const DEFAULT_TAG_COLOR: &str = "#6B7280";
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    fn new(name: String, color: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            name,
            color,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tag with usage counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    #[serde(flatten)]
    pub tag: Tag,
    pub usage_count: usize,
    pub completed_task_count: usize,
    pub completion_rate: f64,
}

/// Trimmed, lower-cased tag name
pub fn normalize_name(name: &str) -> Result<String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(Error::InvalidArgument("tag name is required".to_string()));
    }
    Ok(normalized)
}

fn find_by_name<'a>(db: &'a Database, name: &str) -> Option<&'a Tag> {
    db.tags.iter().find(|tag| tag.name == name)
}

/// Map tag references (ids or names) to ids, creating tags for unknown names.
pub(crate) fn resolve_refs(
    db: &mut Database,
    refs: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let mut ids: Vec<String> = Vec::with_capacity(refs.len());
    for reference in refs {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            continue;
        }
        let id = if let Some(tag) = db.tags.iter().find(|t| t.id.eq_ignore_ascii_case(trimmed)) {
            tag.id.clone()
        } else {
            let name = normalize_name(trimmed)?;
            match find_by_name(db, &name) {
                Some(tag) => tag.id.clone(),
                None => {
                    let tag = Tag::new(name, DEFAULT_TAG_COLOR.to_string(), now);
                    tracing::info!(tag_id = %tag.id, name = %tag.name, "tag created inline");
                    let id = tag.id.clone();
                    db.tags.push(tag);
                    id
                }
            }
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn summarize(db: &Database, tag: &Tag) -> TagSummary {
    let (usage_count, completed_task_count) = db
        .tasks
        .iter()
        .filter(|task| task.has_tag(&tag.id))
        .fold((0, 0), |(used, done), task| {
            (used + 1, done + usize::from(task.completed))
        });
    TagSummary {
        tag: tag.clone(),
        usage_count,
        completed_task_count,
        completion_rate: completion_rate(completed_task_count, usage_count),
    }
}

#[derive(Debug, Clone)]
pub struct TagStore {
    storage: Storage,
}

impl TagStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn snapshot(&self) -> Result<Database> {
        self.storage.read_json(&self.storage.db_file())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        self.storage.update_json(&self.storage.db_file(), f)
    }

    /// All tags with usage counts, by name
    pub fn list(&self) -> Result<Vec<TagSummary>> {
        let db = self.snapshot()?;
        let mut tags: Vec<TagSummary> = db.tags.iter().map(|tag| summarize(&db, tag)).collect();
        tags.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(tags)
    }

    /// Most used tags first
    pub fn popular(&self, limit: usize) -> Result<Vec<TagSummary>> {
        let mut tags = self.list()?;
        tags.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        tags.truncate(limit);
        Ok(tags)
    }

    pub fn get(&self, id: &str) -> Result<TagSummary> {
        let db = self.snapshot()?;
        let idx = db.tag_index(id)?;
        Ok(summarize(&db, &db.tags[idx]))
    }

    pub fn create(&self, name: &str, color: Option<String>, now: DateTime<Utc>) -> Result<Tag> {
        let name = normalize_name(name)?;
        let color = match color {
            Some(color) => validate_color(&color)?,
            None => DEFAULT_TAG_COLOR.to_string(),
        };
        let tag = self.update(|db| {
            if find_by_name(db, &name).is_some() {
                return Err(Error::TagExists(name));
            }
            let tag = Tag::new(name, color, now);
            db.tags.push(tag.clone());
            Ok(tag)
        })?;
        tracing::info!(tag_id = %tag.id, "tag created");
        Ok(tag)
    }

    pub fn update_tag(
        &self,
        id: &str,
        name: Option<&str>,
        color: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Tag> {
        if name.is_none() && color.is_none() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }
        let name = name.map(normalize_name).transpose()?;
        let color = color.map(validate_color).transpose()?;
        self.update(|db| {
            let idx = db.tag_index(id)?;
            if let Some(name) = &name {
                if db
                    .tags
                    .iter()
                    .any(|tag| tag.name == *name && tag.id != db.tags[idx].id)
                {
                    return Err(Error::TagExists(name.clone()));
                }
            }
            let tag = &mut db.tags[idx];
            if let Some(name) = name {
                tag.name = name;
            }
            if let Some(color) = color {
                tag.color = color;
            }
            tag.updated_at = now;
            Ok(tag.clone())
        })
    }

    /// Delete a tag and detach it from every task. Returns the number of
    /// tasks it was removed from.
    pub fn delete(&self, id: &str) -> Result<(Tag, usize)> {
        let (tag, detached) = self.update(|db| {
            let idx = db.tag_index(id)?;
            let tag = db.tags.remove(idx);
            let mut detached = 0;
            for task in db.tasks.iter_mut() {
                let before = task.tag_ids.len();
                task.tag_ids.retain(|tag_id| *tag_id != tag.id);
                if task.tag_ids.len() != before {
                    detached += 1;
                }
            }
            Ok((tag, detached))
        })?;
        tracing::info!(tag_id = %tag.id, detached, "tag deleted");
        Ok((tag, detached))
    }
}
