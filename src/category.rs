//! Categories group tasks; each task belongs to at most one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::analytics::completion_rate;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::store::Database;

pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";
pub const DEFAULT_CATEGORY_ICON: &str = "📁";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl CategoryPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.color.is_none() && self.icon.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub task_count: usize,
    pub completed_task_count: usize,
    pub completion_rate: f64,
}

/// Accept `#RGB` or `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<String> {
    let trimmed = color.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or("");
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(Error::InvalidArgument(format!(
            "invalid color '{trimmed}' (expected #RGB or #RRGGBB)"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("category name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn name_taken(db: &Database, name: &str, except_id: Option<&str>) -> bool {
    db.categories
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(name) && Some(c.id.as_str()) != except_id)
}

fn summarize(db: &Database, category: &Category) -> CategorySummary {
    let (task_count, completed_task_count) = db
        .tasks
        .iter()
        .filter(|task| task.category_id.as_deref() == Some(category.id.as_str()))
        .fold((0, 0), |(total, done), task| {
            (total + 1, done + usize::from(task.completed))
        });
    CategorySummary {
        category: category.clone(),
        task_count,
        completed_task_count,
        completion_rate: completion_rate(completed_task_count, task_count),
    }
}

#[derive(Debug, Clone)]
pub struct CategoryStore {
    storage: Storage,
}

impl CategoryStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn snapshot(&self) -> Result<Database> {
        self.storage.read_json(&self.storage.db_file())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Database) -> Result<R>) -> Result<R> {
        self.storage.update_json(&self.storage.db_file(), f)
    }

    /// Categories in creation order, with task counts
    pub fn list(&self) -> Result<Vec<CategorySummary>> {
        let db = self.snapshot()?;
        let mut categories: Vec<&Category> = db.categories.iter().collect();
        categories.sort_by_key(|c| c.created_at);
        Ok(categories.into_iter().map(|c| summarize(&db, c)).collect())
    }

    pub fn get(&self, id: &str) -> Result<CategorySummary> {
        let db = self.snapshot()?;
        let idx = db.category_index(id)?;
        Ok(summarize(&db, &db.categories[idx]))
    }

    pub fn create(&self, input: NewCategory, now: DateTime<Utc>) -> Result<Category> {
        let name = validate_name(&input.name)?;
        let color = input
            .color
            .as_deref()
            .map(validate_color)
            .transpose()?
            .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string());
        let icon = non_empty(input.icon).unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string());

        let category = self.update(|db| {
            if name_taken(db, &name, None) {
                return Err(Error::CategoryExists(name));
            }
            let category = Category {
                id: Ulid::new().to_string().to_ascii_lowercase(),
                name,
                description: non_empty(input.description),
                color,
                icon,
                created_at: now,
                updated_at: now,
            };
            db.categories.push(category.clone());
            Ok(category)
        })?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub fn update_category(
        &self,
        id: &str,
        patch: CategoryPatch,
        now: DateTime<Utc>,
    ) -> Result<Category> {
        if patch.is_empty() {
            return Err(Error::InvalidArgument("nothing to update".to_string()));
        }
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let color = patch.color.as_deref().map(validate_color).transpose()?;

        self.update(|db| {
            let idx = db.category_index(id)?;
            if let Some(name) = &name {
                if name_taken(db, name, Some(db.categories[idx].id.as_str())) {
                    return Err(Error::CategoryExists(name.clone()));
                }
            }
            let category = &mut db.categories[idx];
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(description) = patch.description {
                category.description = non_empty(description);
            }
            if let Some(color) = color {
                category.color = color;
            }
            if let Some(icon) = non_empty(patch.icon) {
                category.icon = icon;
            }
            category.updated_at = now;
            Ok(category.clone())
        })
    }

    /// Delete an empty category. Categories that still own tasks are kept.
    pub fn delete(&self, id: &str) -> Result<Category> {
        let category = self.update(|db| {
            let idx = db.category_index(id)?;
            let owned = summarize(db, &db.categories[idx]).task_count;
            if owned > 0 {
                return Err(Error::CategoryInUse {
                    name: db.categories[idx].name.clone(),
                    tasks: owned,
                });
            }
            Ok(db.categories.remove(idx))
        })?;
        tracing::info!(category_id = %category.id, "category deleted");
        Ok(category)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
