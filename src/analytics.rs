//! Productivity reports built from a [`TaskSource`].
//!
//! Each report runs several queries against the source. If any of them
//! fails the whole report fails with an internal error; partial reports
//! are never returned.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::store::{GroupField, TaskFilter, TaskSource};
use crate::streak::{compute_streaks, Streaks};
use crate::task::{Priority, Task, TaskStatus};
use crate::trends::{aggregate_trends, Granularity, TrendPoint};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNKNOWN_CATEGORY: &str = "Unknown";
const FALLBACK_CATEGORY_COLOR: &str = "#6B7280";
const FALLBACK_CATEGORY_ICON: &str = "📝";

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Week,
    Month,
    Year,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
            Period::All => "all",
        }
    }

    /// Inclusive `createdAt` lower bound, `None` for all time.
    ///
    /// `week` is a rolling seven days; the others start at a calendar
    /// boundary in `offset`.
    pub fn lower_bound(self, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&offset).date_naive();
        match self {
            Period::Today => Some(local_midnight(today, offset)),
            Period::Week => Some(now - Duration::days(7)),
            Period::Month => Some(local_midnight(
                today - Duration::days(i64::from(today.day0())),
                offset,
            )),
            Period::Year => Some(local_midnight(
                today - Duration::days(i64::from(today.ordinal0())),
                offset,
            )),
            Period::All => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "all" => Ok(Period::All),
            _ => Err(Error::InvalidEnum {
                field: "period",
                value: s.to_string(),
                expected: "today, week, month, year, all",
            }),
        }
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}

/// `completed / total * 100` rounded to two decimals, 0 for an empty set
pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One value per stored priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ByPriority<T> {
    pub low: T,
    pub medium: T,
    pub high: T,
    pub urgent: T,
}

impl<T> ByPriority<T> {
    fn get(&self, priority: Priority) -> &T {
        match priority {
            Priority::Low => &self.low,
            Priority::Medium => &self.medium,
            Priority::High => &self.high,
            Priority::Urgent => &self.urgent,
        }
    }

    fn get_mut(&mut self, priority: Priority) -> &mut T {
        match priority {
            Priority::Low => &mut self.low,
            Priority::Medium => &mut self.medium,
            Priority::High => &mut self.high,
            Priority::Urgent => &mut self.urgent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub overdue_tasks: usize,
    pub tasks_with_due_date: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub color: String,
    pub icon: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub overview: Overview,
    pub priority_distribution: Vec<PriorityCount>,
    pub category_distribution: Vec<CategoryCount>,
    pub period: Period,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsReport {
    pub trends: Vec<TrendPoint>,
    pub period: Period,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub day: &'static str,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityReport {
    pub avg_completion_time_hours: f64,
    pub avg_time_by_priority: ByPriority<f64>,
    pub productive_days: Vec<DayCount>,
    pub streaks: Streaks,
    pub period: Period,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnalytics {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: f64,
    pub priority_distribution: ByPriority<usize>,
    pub avg_completion_time_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoriesReport {
    pub categories: Vec<CategoryAnalytics>,
    pub period: Period,
}

/// Report builder over a task source at a fixed `now`
pub struct Analytics<'a, S: TaskSource + ?Sized> {
    source: &'a S,
    now: DateTime<Utc>,
    offset: FixedOffset,
    streak_window: usize,
}

impl<'a, S: TaskSource + ?Sized> Analytics<'a, S> {
    pub fn new(source: &'a S, config: &AnalyticsConfig, now: DateTime<Utc>) -> Self {
        Self {
            source,
            now,
            offset: config.offset(),
            streak_window: config.streak_window,
        }
    }

    fn period_filter(&self, period: Period) -> TaskFilter {
        TaskFilter::created_since(period.lower_bound(self.now, self.offset))
    }

    pub fn overview(&self, period: Period) -> Result<OverviewReport> {
        self.build_overview(period).map_err(fail_closed("overview"))
    }

    fn build_overview(&self, period: Period) -> Result<OverviewReport> {
        let base = self.period_filter(period);
        let with = |f: fn(&mut TaskFilter)| {
            let mut filter = base.clone();
            f(&mut filter);
            filter
        };

        let total_tasks = self.source.count_tasks(&base)?;
        let completed_tasks = self
            .source
            .count_tasks(&with(|f| f.completed = Some(true)))?;
        let pending_tasks = self
            .source
            .count_tasks(&with(|f| f.status = Some(TaskStatus::Pending)))?;
        let in_progress_tasks = self
            .source
            .count_tasks(&with(|f| f.status = Some(TaskStatus::InProgress)))?;
        let open = self.source.list_tasks(&with(|f| f.completed = Some(false)))?;
        let overdue_tasks = open.iter().filter(|t| t.is_overdue(self.now)).count();
        let tasks_with_due_date = self
            .source
            .list_tasks(&base)?
            .iter()
            .filter(|t| t.due_date.is_some())
            .count();

        let mut by_priority = ByPriority::<usize>::default();
        for group in self.source.group_count(&base, GroupField::Priority)? {
            let Some(key) = group.key else { continue };
            *by_priority.get_mut(key.parse()?) += group.count;
        }
        let priority_distribution = Priority::ALL
            .iter()
            .map(|&priority| PriorityCount {
                priority,
                count: *by_priority.get(priority),
            })
            .collect();

        let categories = self.source.list_categories()?;
        let category_distribution = self
            .source
            .group_count(&base, GroupField::Category)?
            .into_iter()
            .map(|group| {
                let (name, color, icon) = match &group.key {
                    None => (
                        UNCATEGORIZED.to_string(),
                        FALLBACK_CATEGORY_COLOR.to_string(),
                        FALLBACK_CATEGORY_ICON.to_string(),
                    ),
                    Some(id) => match categories.iter().find(|c| &c.id == id) {
                        Some(c) => (c.name.clone(), c.color.clone(), c.icon.clone()),
                        None => (
                            UNKNOWN_CATEGORY.to_string(),
                            FALLBACK_CATEGORY_COLOR.to_string(),
                            FALLBACK_CATEGORY_ICON.to_string(),
                        ),
                    },
                };
                CategoryCount {
                    category: name,
                    color,
                    icon,
                    count: group.count,
                }
            })
            .collect();

        Ok(OverviewReport {
            overview: Overview {
                total_tasks,
                completed_tasks,
                pending_tasks,
                in_progress_tasks,
                overdue_tasks,
                tasks_with_due_date,
                completion_rate: completion_rate(completed_tasks, total_tasks),
            },
            priority_distribution,
            category_distribution,
            period,
        })
    }

    pub fn trends(&self, period: Period, granularity: Granularity) -> Result<TrendsReport> {
        let tasks = self
            .source
            .list_tasks(&self.period_filter(period))
            .map_err(fail_closed("trends"))?;
        Ok(TrendsReport {
            trends: aggregate_trends(&tasks, granularity, self.offset),
            period,
            granularity,
        })
    }

    pub fn productivity(&self, period: Period) -> Result<ProductivityReport> {
        self.build_productivity(period)
            .map_err(fail_closed("productivity"))
    }

    fn build_productivity(&self, period: Period) -> Result<ProductivityReport> {
        let mut filter = self.period_filter(period);
        filter.completed = Some(true);
        let completed = self.source.list_tasks(&filter)?;

        let (avg_completion_time_hours, avg_time_by_priority) = completion_times(&completed);

        let mut days = [0usize; 7];
        for at in completed.iter().filter_map(|t| t.completed_at) {
            let weekday = at.with_timezone(&self.offset).weekday();
            days[weekday.num_days_from_sunday() as usize] += 1;
        }
        let mut productive_days: Vec<DayCount> = WEEKDAYS
            .iter()
            .zip(days)
            .map(|(&day, completed_tasks)| DayCount {
                day,
                completed_tasks,
            })
            .collect();
        productive_days.sort_by(|a, b| b.completed_tasks.cmp(&a.completed_tasks));

        let history = self.source.completion_history(self.streak_window)?;
        let today = self.now.with_timezone(&self.offset).date_naive();
        let streaks = compute_streaks(&history, today, self.offset);

        Ok(ProductivityReport {
            avg_completion_time_hours,
            avg_time_by_priority,
            productive_days,
            streaks,
            period,
        })
    }

    pub fn categories(&self, period: Period) -> Result<CategoriesReport> {
        self.build_categories(period)
            .map_err(fail_closed("categories"))
    }

    fn build_categories(&self, period: Period) -> Result<CategoriesReport> {
        let base = self.period_filter(period);
        let mut categories = Vec::new();
        for category in self.source.list_categories()? {
            let tasks = self.source.list_tasks(&TaskFilter {
                category_id: Some(category.id.clone()),
                ..base.clone()
            })?;
            let completed_tasks = tasks.iter().filter(|t| t.completed).count();
            let mut priority_distribution = ByPriority::<usize>::default();
            for task in &tasks {
                *priority_distribution.get_mut(task.priority) += 1;
            }
            let (avg_completion_time_hours, _) = completion_times(&tasks);

            categories.push(CategoryAnalytics {
                id: category.id,
                name: category.name,
                color: category.color,
                icon: category.icon,
                total_tasks: tasks.len(),
                completed_tasks,
                completion_rate: completion_rate(completed_tasks, tasks.len()),
                priority_distribution,
                avg_completion_time_hours,
            });
        }
        Ok(CategoriesReport { categories, period })
    }
}

/// Mean hours from creation to completion, overall and per priority.
/// Completed tasks without a completion timestamp are skipped.
fn completion_times(tasks: &[Task]) -> (f64, ByPriority<f64>) {
    let mut sums = ByPriority::<(f64, usize)>::default();
    let mut total = 0.0;
    let mut count = 0usize;
    for task in tasks.iter().filter(|t| t.completed) {
        let Some(hours) = task.completion_hours() else {
            tracing::warn!(task_id = %task.id, "completed task without completedAt skipped");
            continue;
        };
        total += hours;
        count += 1;
        let slot = sums.get_mut(task.priority);
        slot.0 += hours;
        slot.1 += 1;
    }
    let mean = |(sum, n): (f64, usize)| if n == 0 { 0.0 } else { sum / n as f64 };
    (
        mean((total, count)),
        ByPriority {
            low: mean(sums.low),
            medium: mean(sums.medium),
            high: mean(sums.high),
            urgent: mean(sums.urgent),
        },
    )
}

fn fail_closed(report: &'static str) -> impl Fn(Error) -> Error {
    move |err| {
        tracing::error!(report, error = %err, "analytics query failed");
        Error::OperationFailed(format!("{report} report: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::store::Database;
    use crate::task::TaskStatus;
    use std::cell::Cell;

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn task(id: &str, priority: Priority, created_days_ago: i64) -> Task {
        let created = now() - Duration::days(created_days_ago);
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority,
            completed: false,
            completed_at: None,
            due_date: None,
            category_id: None,
            tag_ids: Vec::new(),
            image_url: None,
            position: 0,
            created_at: created,
            updated_at: created,
        }
    }

    fn complete(mut task: Task, hours_after_creation: i64) -> Task {
        task.completed = true;
        task.status = TaskStatus::Completed;
        task.completed_at = Some(task.created_at + Duration::hours(hours_after_creation));
        task
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            color: "#000000".to_string(),
            icon: "x".to_string(),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn sample() -> Database {
        let mut overdue = task("overdue", Priority::Low, 2);
        overdue.due_date = Some(now() - Duration::hours(1));
        overdue.category_id = Some("work".to_string());

        let mut due_later = task("later", Priority::High, 1);
        due_later.due_date = Some(now() + Duration::days(2));
        due_later.status = TaskStatus::InProgress;

        let mut done = complete(task("done", Priority::High, 3), 4);
        done.category_id = Some("gone".to_string());

        let old = complete(task("old", Priority::Urgent, 400), 10);

        Database {
            tasks: vec![overdue, due_later, done, old],
            categories: vec![category("work", "Work")],
            tags: Vec::new(),
        }
    }

    fn analytics(db: &Database) -> Analytics<'_, Database> {
        Analytics::new(db, &AnalyticsConfig::default(), now())
    }

    #[test]
    fn period_bounds() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            Period::Today.lower_bound(now(), utc),
            Some(Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            Period::Week.lower_bound(now(), utc),
            Some(now() - Duration::days(7))
        );
        assert_eq!(
            Period::Month.lower_bound(now(), utc),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            Period::Year.lower_bound(now(), utc),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(Period::All.lower_bound(now(), utc), None);

        let plus9 = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(
            Period::Today.lower_bound(now(), plus9),
            Some(Utc.with_ymd_and_hms(2024, 5, 14, 15, 0, 0).unwrap())
        );

        // 20:00Z is already 05:00 on the next local day at +09:00
        let late = Utc.with_ymd_and_hms(2024, 5, 15, 20, 0, 0).unwrap();
        assert_eq!(
            Period::Today.lower_bound(late, plus9),
            Some(Utc.with_ymd_and_hms(2024, 5, 15, 15, 0, 0).unwrap())
        );
        let month_end = Utc.with_ymd_and_hms(2024, 5, 31, 20, 0, 0).unwrap();
        assert_eq!(
            Period::Month.lower_bound(month_end, plus9),
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 15, 0, 0).unwrap())
        );
    }

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 3), 33.33);
        assert_eq!(completion_rate(2, 3), 66.67);
    }

    #[test]
    fn overview_counts_within_period() {
        let db = sample();
        let report = analytics(&db).overview(Period::Month).unwrap();
        let o = &report.overview;
        assert_eq!(o.total_tasks, 3);
        assert_eq!(o.completed_tasks, 1);
        assert_eq!(o.pending_tasks, 1);
        assert_eq!(o.in_progress_tasks, 1);
        assert_eq!(o.overdue_tasks, 1);
        assert_eq!(o.tasks_with_due_date, 2);
        assert_eq!(o.completion_rate, 33.33);

        let high = report
            .priority_distribution
            .iter()
            .find(|p| p.priority == Priority::High)
            .unwrap();
        assert_eq!(high.count, 2);
        assert_eq!(report.priority_distribution.len(), 4);

        let names: Vec<&str> = report
            .category_distribution
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert!(names.contains(&UNCATEGORIZED));
        assert!(names.contains(&UNKNOWN_CATEGORY));
        assert!(names.contains(&"Work"));

        let all = analytics(&db).overview(Period::All).unwrap();
        assert_eq!(all.overview.total_tasks, 4);
    }

    #[test]
    fn productivity_averages_and_days() {
        let db = sample();
        let report = analytics(&db).productivity(Period::All).unwrap();
        assert_eq!(report.avg_completion_time_hours, 7.0);
        assert_eq!(report.avg_time_by_priority.high, 4.0);
        assert_eq!(report.avg_time_by_priority.urgent, 10.0);
        assert_eq!(report.avg_time_by_priority.low, 0.0);
        assert_eq!(report.productive_days.len(), 7);
        let total: usize = report.productive_days.iter().map(|d| d.completed_tasks).sum();
        assert_eq!(total, 2);
        assert!(report.productive_days[0].completed_tasks >= report.productive_days[6].completed_tasks);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["avgTimeByPriority"]["URGENT"].is_number());
        assert!(json["streaks"]["current"].is_number());
    }

    #[test]
    fn productive_days_follow_creation_window() {
        // created 2024-04-20, completed 2024-05-10
        let straddling = complete(task("straddling", Priority::Medium, 25), 20 * 24);
        let db = Database {
            tasks: vec![straddling],
            ..Database::default()
        };

        let month = analytics(&db).productivity(Period::Month).unwrap();
        assert_eq!(month.avg_completion_time_hours, 0.0);
        let total: usize = month.productive_days.iter().map(|d| d.completed_tasks).sum();
        assert_eq!(total, 0);

        let all = analytics(&db).productivity(Period::All).unwrap();
        let total: usize = all.productive_days.iter().map(|d| d.completed_tasks).sum();
        assert_eq!(total, 1);
        // 2024-05-10 was a Friday
        assert_eq!(all.productive_days[0].day, "Friday");
    }

    #[test]
    fn productive_days_ties_keep_week_order() {
        let db = Database::default();
        let report = analytics(&db).productivity(Period::All).unwrap();
        let days: Vec<&str> = report.productive_days.iter().map(|d| d.day).collect();
        assert_eq!(days, WEEKDAYS.to_vec());
        assert_eq!(report.streaks, Streaks::default());
    }

    #[test]
    fn missing_completed_at_excluded_from_averages() {
        let mut broken = task("broken", Priority::Low, 1);
        broken.completed = true;
        let db = Database {
            tasks: vec![broken],
            ..Database::default()
        };
        let report = analytics(&db).productivity(Period::All).unwrap();
        assert_eq!(report.avg_completion_time_hours, 0.0);
    }

    #[test]
    fn category_report_per_category() {
        let db = sample();
        let report = analytics(&db).categories(Period::All).unwrap();
        assert_eq!(report.categories.len(), 1);
        let work = &report.categories[0];
        assert_eq!(work.name, "Work");
        assert_eq!(work.total_tasks, 1);
        assert_eq!(work.priority_distribution.low, 1);
        assert_eq!(work.completion_rate, 0.0);
    }

    #[test]
    fn trends_cover_period_tasks() {
        let db = sample();
        let report = analytics(&db).trends(Period::Month, Granularity::Day).unwrap();
        let created: usize = report.trends.iter().map(|p| p.created).sum();
        assert_eq!(created, 3);
    }

    struct FlakySource {
        inner: Database,
        calls_before_failure: Cell<usize>,
    }

    impl TaskSource for FlakySource {
        fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
            let left = self.calls_before_failure.get();
            if left == 0 {
                return Err(Error::Io(std::io::Error::other("disk gone")));
            }
            self.calls_before_failure.set(left - 1);
            self.inner.list_tasks(filter)
        }

        fn list_categories(&self) -> Result<Vec<Category>> {
            self.inner.list_categories()
        }

        fn completion_history(&self, limit: usize) -> Result<Vec<DateTime<Utc>>> {
            self.inner.completion_history(limit)
        }
    }

    #[test]
    fn any_failed_query_fails_whole_report() {
        for budget in 0..4 {
            let source = FlakySource {
                inner: sample(),
                calls_before_failure: Cell::new(budget),
            };
            let err = Analytics::new(&source, &AnalyticsConfig::default(), now())
                .overview(Period::All)
                .unwrap_err();
            assert!(err.is_internal());
            assert_eq!(err.public_message(), crate::error::INTERNAL_MESSAGE);
        }
    }

    #[test]
    fn invalid_period_rejected() {
        let err = "fortnight".parse::<Period>().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
