//! taskmaster tag command implementations.

use chrono::Utc;
use serde::Serialize;

use crate::cli::{Context, TagCommands};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::tag::{Tag, TagStore, TagSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TagDeletedOutput {
    #[serde(flatten)]
    tag: Tag,
    detached_from: usize,
}

pub fn run(ctx: Context, cmd: TagCommands) -> Result<()> {
    let tags = TagStore::new(ctx.store.storage().clone());
    match cmd {
        TagCommands::New { name, color } => {
            let tag = tags.create(&name, color, Utc::now())?;
            let mut human = HumanOutput::new("Tag created");
            human.push_summary("ID", tag.id.clone());
            human.push_summary("Name", tag.name.clone());
            human.push_summary("Color", tag.color.clone());
            emit_success(ctx.output, "tag new", &tag, Some(&human))
        }
        TagCommands::List => {
            let list = tags.list()?;
            let human = list_human("Tags", &list);
            emit_success(ctx.output, "tag list", &list, Some(&human))
        }
        TagCommands::Popular { limit } => {
            if limit == 0 {
                return Err(Error::InvalidArgument("limit must be >= 1".to_string()));
            }
            let list = tags.popular(limit)?;
            let human = list_human("Popular tags", &list);
            emit_success(ctx.output, "tag popular", &list, Some(&human))
        }
        TagCommands::Show { id } => {
            let summary = tags.get(&id)?;
            let mut human = HumanOutput::new(format!("Tag {}", summary.tag.name));
            human.push_summary("ID", summary.tag.id.clone());
            human.push_summary("Color", summary.tag.color.clone());
            human.push_summary("Used by", summary.usage_count.to_string());
            human.push_summary("Completion rate", format!("{}%", summary.completion_rate));
            emit_success(ctx.output, "tag show", &summary, Some(&human))
        }
        TagCommands::Edit { id, name, color } => {
            let tag = tags.update_tag(&id, name.as_deref(), color.as_deref(), Utc::now())?;
            let mut human = HumanOutput::new("Tag updated");
            human.push_summary("ID", tag.id.clone());
            human.push_summary("Name", tag.name.clone());
            human.push_summary("Color", tag.color.clone());
            emit_success(ctx.output, "tag edit", &tag, Some(&human))
        }
        TagCommands::Rm { id } => {
            let (tag, detached_from) = tags.delete(&id)?;
            let mut human = HumanOutput::new("Tag deleted");
            human.push_summary("Name", tag.name.clone());
            human.push_summary("Detached from", format!("{detached_from} task(s)"));
            let output = TagDeletedOutput { tag, detached_from };
            emit_success(ctx.output, "tag rm", &output, Some(&human))
        }
    }
}

fn list_human(header: &str, list: &[TagSummary]) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("Total", list.len().to_string());
    for summary in list {
        human.push_detail(format!(
            "{} #{} used {} time(s), {}% done",
            summary.tag.id, summary.tag.name, summary.usage_count, summary.completion_rate
        ));
    }
    human
}
