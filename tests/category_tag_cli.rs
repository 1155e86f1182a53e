mod support;

use support::TestData;

#[test]
fn category_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;

    let created = data.json(&["category", "new", "Work", "--color", "#10B981"]);
    assert_eq!(created["name"], "Work");
    assert_eq!(created["color"], "#10B981");
    assert_eq!(created["icon"], "📁");
    let id = created["id"].as_str().expect("id").to_string();

    let error = data.json_error(&["category", "new", "work"], 4);
    assert_eq!(error["kind"], "conflict");

    data.json_error(&["category", "new", "Bad", "--color", "green"], 2);

    let task = data.new_task(&["Report", "--category", &id]);
    let list = data.json(&["category", "list"]);
    assert_eq!(list[0]["taskCount"], 1);
    assert_eq!(list[0]["completionRate"], 0.0);

    let error = data.json_error(&["category", "rm", &id], 4);
    assert_eq!(error["details"]["tasks"], 1);

    let edited = data.json(&["category", "edit", &id, "--name", "Office", "-d", "day job"]);
    assert_eq!(edited["name"], "Office");
    assert_eq!(edited["description"], "day job");

    data.json(&["task", "edit", &task, "--category", ""]);
    let removed = data.json(&["category", "rm", &id]);
    assert_eq!(removed["name"], "Office");
    data.json_error(&["category", "show", &id], 3);
    Ok(())
}

#[test]
fn unknown_category_reference_fails_task_create() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    let error = data.json_error(&["task", "new", "Orphan", "--category", "01zzzz"], 3);
    assert_eq!(error["kind"], "not_found");

    let list = data.json(&["task", "list"]);
    assert_eq!(list["pagination"]["total"], 0);
    Ok(())
}

#[test]
fn tags_are_normalized_and_counted() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;

    let tag = data.json(&["tag", "new", "  Deep-Work "]);
    assert_eq!(tag["name"], "deep-work");
    assert_eq!(tag["color"], "#6B7280");
    data.json_error(&["tag", "new", "DEEP-WORK"], 4);

    let done = data.new_task(&["Focus", "--tag", "deep-work", "--tag", "home"]);
    data.new_task(&["Focus again", "--tag", "Deep-Work"]);
    data.json(&["task", "done", &done]);

    let popular = data.json(&["tag", "popular", "--limit", "1"]);
    let popular = popular.as_array().expect("array");
    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0]["name"], "deep-work");
    assert_eq!(popular[0]["usageCount"], 2);
    assert_eq!(popular[0]["completedTaskCount"], 1);
    assert_eq!(popular[0]["completionRate"], 50.0);

    let list = data.json(&["tag", "list"]);
    let names: Vec<&str> = list
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["deep-work", "home"]);
    Ok(())
}

#[test]
fn deleting_tag_detaches_it() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    let task = data.new_task(&["Chores", "--tag", "home"]);
    let shown = data.json(&["task", "show", &task]);
    let tag_id = shown["tagIds"][0].as_str().expect("tag id").to_string();

    let removed = data.json(&["tag", "rm", &tag_id]);
    assert_eq!(removed["name"], "home");
    assert_eq!(removed["detachedFrom"], 1);

    let shown = data.json(&["task", "show", &task]);
    assert!(shown["tagIds"].as_array().expect("array").is_empty());
    data.json_error(&["tag", "show", &tag_id], 3);
    Ok(())
}

#[test]
fn tag_rename_checks_uniqueness() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new()?;
    let alpha = data.json(&["tag", "new", "alpha"]);
    data.json(&["tag", "new", "beta"]);
    let id = alpha["id"].as_str().expect("id");

    data.json_error(&["tag", "edit", id, "--name", "Beta"], 4);
    data.json_error(&["tag", "edit", id], 2);

    let renamed = data.json(&["tag", "edit", id, "--name", "Gamma", "--color", "#abc"]);
    assert_eq!(renamed["name"], "gamma");
    assert_eq!(renamed["color"], "#abc");
    Ok(())
}
