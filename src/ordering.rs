//! Task ordering and pagination.
//!
//! Open tasks always come before completed ones. Inside each partition the
//! comparator picked from [`comparator`] decides, and pagination only ever
//! slices the fully sorted list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::derived::TaskView;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    DueDate,
    Priority,
    Position,
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::DueDate => "dueDate",
            SortField::Priority => "priority",
            SortField::Position => "position",
            SortField::CreatedAt => "createdAt",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "duedate" | "due" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "position" => Ok(SortField::Position),
            "createdat" | "created" => Ok(SortField::CreatedAt),
            _ => Err(Error::InvalidEnum {
                field: "sort",
                value: s.to_string(),
                expected: "dueDate, priority, position, createdAt",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::InvalidEnum {
                field: "order",
                value: s.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

/// Orders two tasks of the same completion partition
pub type Comparator = fn(&TaskView, &TaskView, SortOrder) -> Ordering;

/// Comparator table keyed by sort field
pub fn comparator(field: SortField) -> Comparator {
    match field {
        SortField::DueDate => by_due_date,
        SortField::Priority => by_priority,
        SortField::Position => by_position,
        SortField::CreatedAt => by_created_at,
    }
}

/// Incomplete first, independent of sort order
fn by_completion(left: &TaskView, right: &TaskView) -> Ordering {
    left.task.completed.cmp(&right.task.completed)
}

fn by_priority(left: &TaskView, right: &TaskView, order: SortOrder) -> Ordering {
    order.apply(
        left.effective_priority
            .rank()
            .cmp(&right.effective_priority.rank()),
    )
}

/// Completed tasks ignore the due date and show the most recently touched
/// first. Open tasks put missing due dates last for asc, first for desc.
fn by_due_date(left: &TaskView, right: &TaskView, order: SortOrder) -> Ordering {
    if left.task.completed && right.task.completed {
        return right.task.updated_at.cmp(&left.task.updated_at);
    }
    match (left.task.due_date, right.task.due_date) {
        (Some(a), Some(b)) => order.apply(a.cmp(&b)),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => order.apply(Ordering::Greater),
        (Some(_), None) => order.apply(Ordering::Less),
    }
}

fn by_position(left: &TaskView, right: &TaskView, order: SortOrder) -> Ordering {
    order.apply(left.task.position.cmp(&right.task.position))
}

fn by_created_at(left: &TaskView, right: &TaskView, order: SortOrder) -> Ordering {
    order.apply(left.task.created_at.cmp(&right.task.created_at))
}

/// Stable sort: ties keep their input order.
pub fn sort_tasks(tasks: &mut [TaskView], field: SortField, order: SortOrder) {
    let secondary = comparator(field);
    tasks.sort_by(|left, right| {
        by_completion(left, right).then_with(|| secondary(left, right, order))
    });
}

/// One page of a sorted list
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

/// Slice a fully sorted list. `page` is 1-based.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Result<Page<T>> {
    if page == 0 {
        return Err(Error::InvalidArgument("page must be >= 1".to_string()));
    }
    if limit == 0 {
        return Err(Error::InvalidArgument("limit must be >= 1".to_string()));
    }
    let total = items.len();
    let pages = total.div_ceil(limit);
    let offset = (page - 1).saturating_mul(limit);
    let items = items.into_iter().skip(offset).take(limit).collect();
    Ok(Page {
        items,
        pagination: PageInfo {
            page,
            limit,
            total,
            pages,
        },
    })
}
