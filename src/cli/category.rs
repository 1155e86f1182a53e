//! taskmaster category command implementations.

use chrono::Utc;

use crate::category::{Category, CategoryPatch, CategoryStore, CategorySummary, NewCategory};
use crate::cli::{CategoryCommands, Context};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub fn run(ctx: Context, cmd: CategoryCommands) -> Result<()> {
    let categories = CategoryStore::new(ctx.store.storage().clone());
    match cmd {
        CategoryCommands::New {
            name,
            description,
            color,
            icon,
        } => {
            let category = categories.create(
                NewCategory {
                    name,
                    description,
                    color,
                    icon,
                },
                Utc::now(),
            )?;
            let mut human = HumanOutput::new("Category created");
            push_category_summary(&mut human, &category);
            human.push_next_step(format!(
                "taskmaster task new \"<title>\" --category {}",
                category.id
            ));
            emit_success(ctx.output, "category new", &category, Some(&human))
        }
        CategoryCommands::List => {
            let list = categories.list()?;
            let mut human = HumanOutput::new("Categories");
            human.push_summary("Total", list.len().to_string());
            for summary in &list {
                human.push_detail(summary_line(summary));
            }
            emit_success(ctx.output, "category list", &list, Some(&human))
        }
        CategoryCommands::Show { id } => {
            let summary = categories.get(&id)?;
            let mut human = HumanOutput::new(format!("Category {}", summary.category.name));
            push_category_summary(&mut human, &summary.category);
            human.push_summary("Tasks", summary.task_count.to_string());
            human.push_summary("Completed", summary.completed_task_count.to_string());
            human.push_summary("Completion rate", format!("{}%", summary.completion_rate));
            emit_success(ctx.output, "category show", &summary, Some(&human))
        }
        CategoryCommands::Edit {
            id,
            name,
            description,
            color,
            icon,
        } => {
            let patch = CategoryPatch {
                name,
                description: description.map(Some),
                color,
                icon,
            };
            let category = categories.update_category(&id, patch, Utc::now())?;
            let mut human = HumanOutput::new("Category updated");
            push_category_summary(&mut human, &category);
            emit_success(ctx.output, "category edit", &category, Some(&human))
        }
        CategoryCommands::Rm { id } => {
            let category = categories.delete(&id)?;
            let mut human = HumanOutput::new("Category deleted");
            push_category_summary(&mut human, &category);
            emit_success(ctx.output, "category rm", &category, Some(&human))
        }
    }
}

fn push_category_summary(human: &mut HumanOutput, category: &Category) {
    human.push_summary("ID", category.id.clone());
    human.push_summary("Name", format!("{} {}", category.icon, category.name));
    human.push_summary("Color", category.color.clone());
    if let Some(description) = &category.description {
        human.push_summary("Description", description.clone());
    }
}

fn summary_line(summary: &CategorySummary) -> String {
    format!(
        "{} {} {} ({}/{} done)",
        summary.category.id,
        summary.category.icon,
        summary.category.name,
        summary.completed_task_count,
        summary.task_count
    )
}
