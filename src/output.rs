//! Shared output formatting for taskmaster CLI commands.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskmaster.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    data: &'a T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let payload = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

/// Report a failed command. Internal failures are logged in full and shown
/// to the caller only as a generic message.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    if err.is_internal() {
        tracing::error!(command, error = %err, "command failed");
    }
    let next_steps = error_next_steps(err);

    if json {
        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: JsonError,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: JsonError::from(err),
            next_steps,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {}", err.public_message());
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Best-effort command name for error envelopes emitted before clap has
/// finished parsing.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--data-dir" {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        let grouped = matches!(
            words[0].as_str(),
            "task" | "category" | "tag" | "stats"
        );
        if words.len() == 2 || !grouped {
            break;
        }
    }

    if words.is_empty() {
        "taskmaster".to_string()
    } else {
        words.join(" ")
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::MissingTitle => vec!["taskmaster task new \"<title>\"".to_string()],
        Error::TaskNotFound(_) => vec!["taskmaster task list".to_string()],
        Error::CategoryNotFound(_) => vec!["taskmaster category list".to_string()],
        Error::TagNotFound(_) => vec!["taskmaster tag list".to_string()],
        Error::CategoryInUse { .. } => {
            vec!["move or delete its tasks first (taskmaster task list --category <id>)".to_string()]
        }
        Error::InvalidConfig(_) => vec!["fix taskmaster.toml then retry".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_name_includes_group_subcommand() {
        assert_eq!(command_name_from(args(&["--json", "task", "list"])), "task list");
        assert_eq!(
            command_name_from(args(&["--data-dir", "/tmp/x", "stats", "trends", "--period", "week"])),
            "stats trends"
        );
        assert_eq!(command_name_from(args(&["init", "extra"])), "init");
        assert_eq!(command_name_from(args(&[])), "taskmaster");
    }

    #[test]
    fn human_format_sections() {
        let mut out = HumanOutput::new("Task created");
        out.push_summary("id", "01abc");
        out.push_summary("overdue", "");
        out.push_next_step("taskmaster task show 01abc");

        let text = format_human(&out);
        assert!(text.starts_with("Task created\n\nSummary:\n- id: 01abc\n- overdue"));
        assert!(text.ends_with("Next steps:\n- taskmaster task show 01abc"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn internal_errors_have_no_hints() {
        assert!(error_next_steps(&Error::OperationFailed("disk".into())).is_empty());
        assert_eq!(
            error_next_steps(&Error::TagNotFound("x".into())),
            vec!["taskmaster tag list".to_string()]
        );
    }
}
