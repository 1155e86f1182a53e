//! taskmaster stats command implementations.

use chrono::Utc;

use crate::analytics::{Analytics, Period};
use crate::cli::{Context, StatsCommands};
use crate::error::Result;
use crate::lifetime::LifetimeCounter;
use crate::output::{emit_success, HumanOutput};
use crate::trends::Granularity;

pub fn run(ctx: Context, cmd: StatsCommands) -> Result<()> {
    if let StatsCommands::Lifetime = cmd {
        return run_lifetime(&ctx);
    }

    let config = &ctx.store.config().analytics;
    let db = ctx.store.snapshot()?;
    let analytics = Analytics::new(&db, config, Utc::now());
    let period = |raw: Option<String>| -> Result<Period> {
        match raw {
            Some(raw) => raw.parse(),
            None => config.period(),
        }
    };

    match cmd {
        StatsCommands::Overview { period: raw } => {
            let report = analytics.overview(period(raw)?)?;
            let overview = &report.overview;
            let mut human = HumanOutput::new(format!("Overview ({})", report.period));
            human.push_summary("Total", overview.total_tasks.to_string());
            human.push_summary("Completed", overview.completed_tasks.to_string());
            human.push_summary("Pending", overview.pending_tasks.to_string());
            human.push_summary("In progress", overview.in_progress_tasks.to_string());
            human.push_summary("Overdue", overview.overdue_tasks.to_string());
            human.push_summary("Completion rate", format!("{}%", overview.completion_rate));
            for entry in &report.priority_distribution {
                human.push_detail(format!("{}: {}", entry.priority, entry.count));
            }
            for entry in &report.category_distribution {
                human.push_detail(format!("{} {}: {}", entry.icon, entry.category, entry.count));
            }
            emit_success(ctx.output, "stats overview", &report, Some(&human))
        }
        StatsCommands::Trends {
            period: raw,
            granularity,
        } => {
            let granularity = match granularity {
                Some(raw) => raw.parse()?,
                None => config.granularity()?,
            };
            let report = analytics.trends(period(raw)?, granularity)?;
            let unit = match granularity {
                Granularity::Day => "day",
                Granularity::Week => "week",
            };
            let mut human = HumanOutput::new(format!("Trends ({}, per {unit})", report.period));
            if report.trends.is_empty() {
                human.push_detail("no activity in this period");
            }
            for point in &report.trends {
                human.push_detail(format!(
                    "{}: +{} created, {} completed",
                    point.period, point.created, point.completed
                ));
            }
            emit_success(ctx.output, "stats trends", &report, Some(&human))
        }
        StatsCommands::Productivity { period: raw } => {
            let report = analytics.productivity(period(raw)?)?;
            let mut human = HumanOutput::new(format!("Productivity ({})", report.period));
            human.push_summary(
                "Avg completion time",
                format!("{}h", report.avg_completion_time_hours),
            );
            human.push_summary("Current streak", format!("{} day(s)", report.streaks.current));
            human.push_summary("Longest streak", format!("{} day(s)", report.streaks.longest));
            for day in &report.productive_days {
                human.push_detail(format!("{}: {}", day.day, day.completed_tasks));
            }
            emit_success(ctx.output, "stats productivity", &report, Some(&human))
        }
        StatsCommands::Categories { period: raw } => {
            let report = analytics.categories(period(raw)?)?;
            let mut human = HumanOutput::new(format!("Categories ({})", report.period));
            for category in &report.categories {
                human.push_detail(format!(
                    "{} {}: {}/{} done ({}%)",
                    category.icon,
                    category.name,
                    category.completed_tasks,
                    category.total_tasks,
                    category.completion_rate
                ));
            }
            emit_success(ctx.output, "stats categories", &report, Some(&human))
        }
        StatsCommands::Lifetime => run_lifetime(&ctx),
    }
}

fn run_lifetime(ctx: &Context) -> Result<()> {
    let totals = LifetimeCounter::new(ctx.store.storage().clone()).totals()?;
    let mut human = HumanOutput::new("Lifetime");
    human.push_summary("Tasks created", totals.tasks_created.to_string());
    human.push_summary("Tasks completed", totals.tasks_completed.to_string());
    emit_success(ctx.output, "stats lifetime", &totals, Some(&human))
}
