mod support;

use chrono::{Datelike, Utc};

use support::TestData;

fn seed(data: &TestData) -> Result<(), Box<dyn std::error::Error>> {
    let work = data.json(&["category", "new", "Work"]);
    let work_id = work["id"].as_str().expect("id").to_string();

    let report = data.new_task(&["Report", "--category", &work_id, "--priority", "high"]);
    data.new_task(&["Slides", "--category", &work_id, "--priority", "high"]);
    data.new_task(&["Late", "--due", "2020-01-01"]);
    let started = data.new_task(&["Started", "--priority", "urgent"]);

    data.json(&["task", "done", &report]);
    data.json(&["task", "edit", &started, "--status", "in_progress"]);
    Ok(())
}

#[test]
fn overview_counts_and_distributions() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    seed(&data)?;

    let report = data.json(&["stats", "overview", "--period", "all"]);
    let overview = &report["overview"];
    assert_eq!(overview["totalTasks"], 4);
    assert_eq!(overview["completedTasks"], 1);
    assert_eq!(overview["pendingTasks"], 2);
    assert_eq!(overview["inProgressTasks"], 1);
    assert_eq!(overview["overdueTasks"], 1);
    assert_eq!(overview["tasksWithDueDate"], 1);
    assert_eq!(overview["completionRate"], 25.0);
    assert_eq!(report["period"], "all");

    let priorities = report["priorityDistribution"].as_array().expect("array");
    assert_eq!(priorities.len(), 4);
    assert_eq!(priorities[0]["priority"], "LOW");
    assert_eq!(priorities[0]["count"], 0);
    assert_eq!(priorities[2]["priority"], "HIGH");
    assert_eq!(priorities[2]["count"], 2);

    let categories = report["categoryDistribution"].as_array().expect("array");
    let uncategorized = categories
        .iter()
        .find(|c| c["category"] == "Uncategorized")
        .expect("uncategorized bucket");
    assert_eq!(uncategorized["count"], 2);
    assert_eq!(uncategorized["color"], "#6B7280");
    Ok(())
}

#[test]
fn empty_store_reports_zero_rate() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;

    let report = data.json(&["stats", "overview"]);
    assert_eq!(report["overview"]["totalTasks"], 0);
    assert_eq!(report["overview"]["completionRate"], 0.0);
    assert_eq!(report["period"], "month");

    let productivity = data.json(&["stats", "productivity"]);
    assert_eq!(productivity["avgCompletionTimeHours"], 0.0);
    assert_eq!(productivity["streaks"]["current"], 0);
    assert_eq!(productivity["streaks"]["longest"], 0);
    assert_eq!(productivity["productiveDays"].as_array().expect("days").len(), 7);

    data.json_error(&["stats", "overview", "--period", "decade"], 2);
    Ok(())
}

#[test]
fn trends_bucket_today() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    seed(&data)?;
    let today = Utc::now();

    let report = data.json(&["stats", "trends", "--period", "week", "--granularity", "day"]);
    let points = report["trends"].as_array().expect("trends");
    let created: u64 = points.iter().filter_map(|p| p["created"].as_u64()).sum();
    let completed: u64 = points.iter().filter_map(|p| p["completed"].as_u64()).sum();
    assert_eq!(created, 4);
    assert_eq!(completed, 1);
    assert!(points
        .iter()
        .any(|p| p["period"] == today.format("%Y-%m-%d").to_string().as_str()));

    let weekly = data.json(&["stats", "trends", "--granularity", "week"]);
    let week = today.iso_week();
    let label = format!("{}-W{:02}", week.year(), week.week());
    assert!(weekly["trends"]
        .as_array()
        .expect("trends")
        .iter()
        .any(|p| p["period"] == label.as_str()));

    data.json_error(&["stats", "trends", "--granularity", "hour"], 2);
    Ok(())
}

#[test]
fn productivity_streak_and_days() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    seed(&data)?;

    let report = data.json(&["stats", "productivity", "--period", "all"]);
    assert_eq!(report["streaks"]["current"], 1);
    assert_eq!(report["streaks"]["longest"], 1);

    let days = report["productiveDays"].as_array().expect("days");
    assert_eq!(days.len(), 7);
    assert_eq!(days[0]["completedTasks"], 1);
    assert_eq!(days[1]["completedTasks"], 0);

    let by_priority = &report["avgTimeByPriority"];
    for key in ["LOW", "MEDIUM", "HIGH", "URGENT"] {
        assert!(by_priority[key].is_number(), "missing {key}");
    }
    Ok(())
}

#[test]
fn category_analytics() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    seed(&data)?;

    let report = data.json(&["stats", "categories", "--period", "all"]);
    let categories = report["categories"].as_array().expect("categories");
    assert_eq!(categories.len(), 1);
    let work = &categories[0];
    assert_eq!(work["name"], "Work");
    assert_eq!(work["totalTasks"], 2);
    assert_eq!(work["completedTasks"], 1);
    assert_eq!(work["completionRate"], 50.0);
    assert_eq!(work["priorityDistribution"]["HIGH"], 2);
    assert_eq!(work["priorityDistribution"]["LOW"], 0);
    Ok(())
}

#[test]
fn lifetime_survives_deletion() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    let id = data.new_task(&["Ephemeral", "--status", "completed"]);
    data.json(&["task", "delete", &id]);

    let totals = data.json(&["stats", "lifetime"]);
    assert_eq!(totals["tasksCreated"], 1);
    assert_eq!(totals["tasksCompleted"], 1);

    let overview = data.json(&["stats", "overview", "--period", "all"]);
    assert_eq!(overview["overview"]["totalTasks"], 0);
    Ok(())
}

#[test]
fn reference_offset_comes_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    data.write_config("[analytics]\nutc_offset_minutes = 900\n")?;
    data.json_error(&["stats", "overview"], 2);

    data.write_config("[analytics]\nutc_offset_minutes = -300\ndefault_period = \"year\"\n")?;
    let report = data.json(&["stats", "overview"]);
    assert_eq!(report["period"], "year");
    Ok(())
}
