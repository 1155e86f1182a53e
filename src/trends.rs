//! Created/completed counts bucketed by day or ISO week.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            _ => Err(Error::InvalidEnum {
                field: "granularity",
                value: s.to_string(),
                expected: "day, week",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub period: String,
    pub created: usize,
    pub completed: usize,
}

/// Bucket label: `YYYY-MM-DD` for days, `YYYY-Www` (ISO week) for weeks.
pub fn bucket_key(at: DateTime<Utc>, granularity: Granularity, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset).date_naive();
    match granularity {
        Granularity::Day => local.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = local.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
    }
}

/// Aggregate an already period-filtered task list.
///
/// A task counts as created in the bucket of `createdAt`, and as completed in
/// the bucket of `completedAt` when it has one. Buckets without events are
/// omitted.
pub fn aggregate_trends(
    tasks: &[Task],
    granularity: Granularity,
    offset: FixedOffset,
) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for task in tasks {
        buckets
            .entry(bucket_key(task.created_at, granularity, offset))
            .or_default()
            .0 += 1;

        if let (true, Some(completed_at)) = (task.completed, task.completed_at) {
            buckets
                .entry(bucket_key(completed_at, granularity, offset))
                .or_default()
                .1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, (created, completed))| TrendPoint {
            period,
            created,
            completed,
        })
        .collect()
}
