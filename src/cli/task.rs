//! taskmaster task command implementations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{Context, TaskCommands};
use crate::derived::{tag_all, TaskView};
use crate::error::{Error, Result};
use crate::lifetime::LifetimeCounter;
use crate::ordering::{paginate, sort_tasks, Page, SortField, SortOrder};
use crate::output::{emit_success, HumanOutput};
use crate::store::{BulkAction, Database, TaskFilter, TaskSource};
use crate::tag::normalize_name;
use crate::task::{has_explicit_time, parse_due_date, NewTask, Priority, TaskPatch, TaskStatus};
use crate::upload::{remove_image, store_image, UploadedImage};

pub struct NewOptions {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub position: Option<i32>,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub completed: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: usize,
    pub limit: Option<usize>,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub clear_tags: bool,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Serialize)]
struct DeletedOutput {
    id: String,
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachOutput {
    task: TaskView,
    image: UploadedImage,
}

pub fn run(ctx: Context, cmd: TaskCommands) -> Result<()> {
    match cmd {
        TaskCommands::New {
            title,
            description,
            status,
            priority,
            due,
            category,
            tags,
            position,
        } => run_new(
            &ctx,
            NewOptions {
                title,
                description,
                status,
                priority,
                due,
                category,
                tags,
                position,
            },
        ),
        TaskCommands::List {
            status,
            priority,
            category,
            tag,
            completed,
            search,
            sort,
            order,
            page,
            limit,
        } => run_list(
            &ctx,
            ListOptions {
                status,
                priority,
                category,
                tag,
                completed,
                search,
                sort,
                order,
                page,
                limit,
            },
        ),
        TaskCommands::Show { id } => run_show(&ctx, &id),
        TaskCommands::Edit {
            id,
            title,
            description,
            status,
            priority,
            due,
            completed,
            category,
            tags,
            clear_tags,
            image_url,
            position,
        } => run_edit(
            &ctx,
            EditOptions {
                id,
                title,
                description,
                status,
                priority,
                due,
                completed,
                category,
                tags,
                clear_tags,
                image_url,
                position,
            },
        ),
        TaskCommands::Done { id } => run_patch(&ctx, "task done", &id, TaskPatch::complete()),
        TaskCommands::Reopen { id } => {
            run_patch(&ctx, "task reopen", &id, TaskPatch::uncomplete())
        }
        TaskCommands::Delete { id } => run_delete(&ctx, &id),
        TaskCommands::Bulk { action, ids } => run_bulk(&ctx, &action, &ids),
        TaskCommands::Attach { id, file } => run_attach(&ctx, &id, file),
    }
}

pub fn run_new(ctx: &Context, options: NewOptions) -> Result<()> {
    let now = Utc::now();
    let offset = ctx.store.config().reference_offset();
    let input = NewTask {
        title: options.title,
        description: options.description,
        status: options.status.as_deref().map(str::parse).transpose()?,
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        due_date: match options.due.as_deref() {
            Some(raw) => parse_due_date(raw, offset)?,
            None => None,
        },
        category_id: options.category,
        tag_ids: options.tags,
        image_url: None,
        position: options.position,
    };

    let task = ctx.store.create_task(input, now)?;
    let completed = u64::from(task.completed);
    let mut human = HumanOutput::new("Task created");
    if let Some(warning) = bump_lifetime(ctx, 1, completed) {
        human.push_warning(warning);
    }

    let view = TaskView::new(task, now);
    push_task_summary(&mut human, &view, ctx);
    human.push_next_step(format!("taskmaster task show {}", short_id(&view.task.id)));

    emit_success(ctx.output, "task new", &view, Some(&human))
}

pub fn run_list(ctx: &Context, options: ListOptions) -> Result<()> {
    let now = Utc::now();
    let config = ctx.store.config();
    let field = match options.sort.as_deref() {
        Some(raw) => raw.parse()?,
        None => config.list.sort_field()?,
    };
    let order = match options.order.as_deref() {
        Some(raw) => raw.parse()?,
        None => config.list.sort_order()?,
    };
    let limit = options.limit.unwrap_or(config.list.page_size);
    if limit > config.list.max_page_size {
        return Err(Error::InvalidArgument(format!(
            "limit must be between 1 and {}",
            config.list.max_page_size
        )));
    }

    let db = ctx.store.snapshot()?;
    let filter = TaskFilter {
        status: options.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        priority: options.priority.as_deref().map(str::parse::<Priority>).transpose()?,
        category_id: options
            .category
            .as_deref()
            .map(|reference| db.category_index(reference).map(|idx| db.categories[idx].id.clone()))
            .transpose()?,
        completed: options.completed,
        tag_id: options
            .tag
            .as_deref()
            .map(|reference| resolve_tag_filter(&db, reference))
            .transpose()?,
        search: options
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        created_since: None,
    };

    let mut views = tag_all(db.list_tasks(&filter)?, now);
    sort_tasks(&mut views, field, order);
    let page = paginate(views, options.page, limit)?;

    let human = list_human(&page, field, order, ctx);
    emit_success(ctx.output, "task list", &page, Some(&human))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let now = Utc::now();
    let db = ctx.store.snapshot()?;
    let idx = db.task_index(id)?;
    let view = TaskView::new(db.tasks[idx].clone(), now);

    let mut human = HumanOutput::new(format!("Task {}", view.task.id));
    push_task_summary(&mut human, &view, ctx);
    if let Some(category_id) = &view.task.category_id {
        let name = db
            .category(category_id)
            .map(|c| c.name.as_str())
            .unwrap_or(crate::analytics::UNKNOWN_CATEGORY);
        human.push_summary("Category", name);
    }
    let tag_names: Vec<&str> = db
        .tags
        .iter()
        .filter(|tag| view.task.has_tag(&tag.id))
        .map(|tag| tag.name.as_str())
        .collect();
    if !tag_names.is_empty() {
        human.push_summary("Tags", tag_names.join(", "));
    }
    if let Some(description) = &view.task.description {
        human.push_detail(description.clone());
    }

    emit_success(ctx.output, "task show", &view, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let offset = ctx.store.config().reference_offset();
    let patch = TaskPatch {
        title: options.title,
        description: options.description.map(Some),
        status: options.status.as_deref().map(str::parse).transpose()?,
        priority: options
            .priority
            .as_deref()
            .map(Priority::parse_for_update)
            .transpose()?,
        due_date: options
            .due
            .as_deref()
            .map(|raw| parse_due_date(raw, offset))
            .transpose()?,
        completed: options.completed,
        category_id: options.category.map(Some),
        tag_ids: if options.clear_tags {
            Some(Vec::new())
        } else if options.tags.is_empty() {
            None
        } else {
            Some(options.tags)
        },
        image_url: options.image_url.map(Some),
        position: options.position,
    };
    run_patch(ctx, "task edit", &options.id, patch)
}

fn run_patch(ctx: &Context, command: &str, id: &str, patch: TaskPatch) -> Result<()> {
    let now = Utc::now();
    let (task, outcome) = ctx.store.update_task(id, patch, now)?;

    let mut human = HumanOutput::new("Task updated");
    if outcome.became_completed {
        if let Some(warning) = bump_lifetime(ctx, 0, 1) {
            human.push_warning(warning);
        }
    }
    let view = TaskView::new(task, now);
    push_task_summary(&mut human, &view, ctx);
    if outcome.reopened {
        human.push_summary("Reopened", "");
    }

    emit_success(ctx.output, command, &view, Some(&human))
}

pub fn run_delete(ctx: &Context, id: &str) -> Result<()> {
    let task = ctx.store.delete_task(id)?;
    let mut human = HumanOutput::new("Task deleted");
    if let Some(url) = task.image_url.as_deref() {
        if !discard_image(ctx, &task.id, url) {
            human.push_warning(format!("could not remove {url}"));
        }
    }
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());

    let output = DeletedOutput {
        id: task.id,
        title: task.title,
    };
    emit_success(ctx.output, "task delete", &output, Some(&human))
}

pub fn run_bulk(ctx: &Context, action: &str, ids: &[String]) -> Result<()> {
    let action: BulkAction = action.parse()?;
    let report = ctx.store.bulk(action, ids, Utc::now())?;

    let mut human = HumanOutput::new(format!("Bulk {}", action_name(action)));
    if report.completed_transitions > 0 {
        if let Some(warning) = bump_lifetime(ctx, 0, report.completed_transitions as u64) {
            human.push_warning(warning);
        }
    }
    human.push_summary("Requested", report.requested.to_string());
    human.push_summary("Affected", report.affected.to_string());
    for missing in &report.missing {
        human.push_warning(format!("task not found: {missing}"));
    }

    emit_success(ctx.output, "task bulk", &report, Some(&human))
}

pub fn run_attach(ctx: &Context, id: &str, file: PathBuf) -> Result<()> {
    let now = Utc::now();
    // Resolve first so an unknown task does not leave a stray upload behind.
    let previous = ctx.store.get_task(id)?;
    let image = store_image(ctx.store.storage(), &ctx.store.config().uploads, &file)?;

    let patch = TaskPatch {
        image_url: Some(Some(image.url.clone())),
        ..TaskPatch::default()
    };
    let (task, _) = match ctx.store.update_task(&previous.id, patch, now) {
        Ok(updated) => updated,
        Err(err) => {
            discard_image(ctx, &previous.id, &image.url);
            return Err(err);
        }
    };

    let mut human = HumanOutput::new("Image attached");
    if let Some(old) = previous.image_url.as_deref() {
        if !discard_image(ctx, &task.id, old) {
            human.push_warning(format!("could not remove {old}"));
        }
    }
    human.push_summary("Task", task.id.clone());
    human.push_summary("File", image.filename.clone());
    human.push_summary("Size", format!("{} bytes", image.size));

    let output = AttachOutput {
        task: TaskView::new(task, now),
        image,
    };
    emit_success(ctx.output, "task attach", &output, Some(&human))
}

/// Best-effort image removal. Failures are logged and reported as `false`.
fn discard_image(ctx: &Context, task_id: &str, url: &str) -> bool {
    match remove_image(ctx.store.storage(), url) {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(task_id, url, error = %err, "image cleanup failed");
            false
        }
    }
}

/// Record created/completed counts. A failure here never undoes the task
/// write; it is returned as a warning instead.
fn bump_lifetime(ctx: &Context, created: u64, completed: u64) -> Option<String> {
    let counter = LifetimeCounter::new(ctx.store.storage().clone());
    let result = (|| {
        if created > 0 {
            counter.increment_created(created)?;
        }
        if completed > 0 {
            counter.increment_completed(completed)?;
        }
        Ok::<(), Error>(())
    })();
    match result {
        Ok(()) => None,
        Err(err) => {
            tracing::error!(error = %err, "lifetime counter update failed");
            Some("lifetime totals were not updated".to_string())
        }
    }
}

/// Tag filter accepts an id, id prefix, or tag name.
fn resolve_tag_filter(db: &Database, reference: &str) -> Result<String> {
    match db.tag_index(reference) {
        Ok(idx) => Ok(db.tags[idx].id.clone()),
        Err(Error::TagNotFound(_)) => {
            let name = normalize_name(reference)?;
            db.tags
                .iter()
                .find(|tag| tag.name == name)
                .map(|tag| tag.id.clone())
                .ok_or_else(|| Error::TagNotFound(reference.trim().to_string()))
        }
        Err(err) => Err(err),
    }
}

fn list_human(page: &Page<TaskView>, field: SortField, order: SortOrder, ctx: &Context) -> HumanOutput {
    let info = page.pagination;
    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", info.total.to_string());
    human.push_summary("Page", format!("{}/{}", info.page, info.pages.max(1)));
    human.push_summary(
        "Sort",
        format!("{field} {}", if order == SortOrder::Asc { "asc" } else { "desc" }),
    );
    for view in &page.items {
        let mut line = format!(
            "[{}][{}] {} {}",
            view.task.status,
            view.effective_priority,
            short_id(&view.task.id),
            view.task.title
        );
        if let Some(due) = view.task.due_date {
            line.push_str(&format!(" (due: {})", format_due(due, ctx)));
        }
        human.push_detail(line);
    }
    if info.page < info.pages {
        human.push_next_step(format!("taskmaster task list --page {}", info.page + 1));
    }
    human
}

fn push_task_summary(human: &mut HumanOutput, view: &TaskView, ctx: &Context) {
    let task = &view.task;
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", view.effective_priority.to_string());
    if let Some(due) = task.due_date {
        human.push_summary("Due", format_due(due, ctx));
    }
    if let Some(completed_at) = task.completed_at {
        human.push_summary("Completed", completed_at.to_rfc3339());
    }
    if let Some(url) = &task.image_url {
        human.push_summary("Image", url.clone());
    }
}

fn format_due(due: DateTime<Utc>, ctx: &Context) -> String {
    let offset = ctx.store.config().reference_offset();
    let local = due.with_timezone(&offset);
    if has_explicit_time(due, offset) {
        local.format("%Y-%m-%d %H:%M").to_string()
    } else {
        local.format("%Y-%m-%d").to_string()
    }
}

fn short_id(id: &str) -> &str {
    id.get(..10).unwrap_or(id)
}

fn action_name(action: BulkAction) -> &'static str {
    match action {
        BulkAction::Delete => "delete",
        BulkAction::Complete => "complete",
        BulkAction::Uncomplete => "uncomplete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryStore, NewCategory};
    use crate::output::OutputOptions;
    use crate::store::Store;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> Context {
        Context {
            store: Store::open(Some(temp.path().to_path_buf())).unwrap(),
            output: OutputOptions {
                json: false,
                quiet: true,
            },
        }
    }

    #[test]
    fn tag_filter_accepts_name_or_id() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let task = ctx
            .store
            .create_task(
                NewTask {
                    title: "tagged".to_string(),
                    tag_ids: vec!["Errands".to_string()],
                    ..NewTask::default()
                },
                Utc::now(),
            )
            .unwrap();
        let db = ctx.store.snapshot().unwrap();

        assert_eq!(resolve_tag_filter(&db, "errands").unwrap(), task.tag_ids[0]);
        assert_eq!(resolve_tag_filter(&db, &task.tag_ids[0]).unwrap(), task.tag_ids[0]);
        assert!(matches!(
            resolve_tag_filter(&db, "missing"),
            Err(Error::TagNotFound(_))
        ));
    }

    #[test]
    fn create_and_complete_bump_lifetime() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        run_new(
            &ctx,
            NewOptions {
                title: "Ship".to_string(),
                description: None,
                status: None,
                priority: Some("high".to_string()),
                due: Some("2030-01-01".to_string()),
                category: None,
                tags: Vec::new(),
                position: None,
            },
        )
        .unwrap();
        let id = ctx.store.snapshot().unwrap().tasks[0].id.clone();

        run_patch(&ctx, "task done", &id, TaskPatch::complete()).unwrap();
        // completing again is not a transition
        run_patch(&ctx, "task done", &id, TaskPatch::complete()).unwrap();

        let totals = LifetimeCounter::new(ctx.store.storage().clone())
            .totals()
            .unwrap();
        assert_eq!(totals.tasks_created, 1);
        assert_eq!(totals.tasks_completed, 1);

        run_delete(&ctx, &id).unwrap();
        let totals = LifetimeCounter::new(ctx.store.storage().clone())
            .totals()
            .unwrap();
        assert_eq!(totals.tasks_created, 1);
    }

    #[test]
    fn image_cleanup_failure_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let uploads = ctx.store.storage().uploads_dir();

        std::fs::write(uploads.join("task-image-gone.png"), b"x").unwrap();
        assert!(discard_image(&ctx, "t1", "uploads/task-image-gone.png"));
        assert!(!uploads.join("task-image-gone.png").exists());
        assert!(discard_image(&ctx, "t1", "uploads/task-image-missing.png"));

        // a directory in place of the image makes removal fail
        std::fs::create_dir(uploads.join("task-image-stuck.png")).unwrap();
        assert!(!discard_image(&ctx, "t1", "uploads/task-image-stuck.png"));
    }

    #[test]
    fn list_rejects_oversized_limit() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let err = run_list(
            &ctx,
            ListOptions {
                status: None,
                priority: None,
                category: None,
                tag: None,
                completed: None,
                search: None,
                sort: None,
                order: None,
                page: 1,
                limit: Some(100_000),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn list_with_unknown_category_is_not_found() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        CategoryStore::new(ctx.store.storage().clone())
            .create(
                NewCategory {
                    name: "Work".to_string(),
                    ..NewCategory::default()
                },
                Utc::now(),
            )
            .unwrap();
        let err = run_list(
            &ctx,
            ListOptions {
                status: None,
                priority: None,
                category: Some("zzzz".to_string()),
                tag: None,
                completed: None,
                search: None,
                sort: None,
                order: None,
                page: 1,
                limit: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
