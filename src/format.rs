//! Output formatting utilities for markdown and JSON.

use crate::types::Task;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

fn status(task: &Task) -> &'static str {
    if task.completed { "completed" } else { "open" }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", status(task)));
    md.push_str(&format!("- **order**: {}\n", task.order));

    if let Some(ref parent_id) = task.parent_id {
        md.push_str(&format!("- **parent_id**: `{}`\n", parent_id));
    }

    md.push_str(&format!("- **updated**: {}\n", task.updated_at.to_rfc3339()));

    if !task.children.is_empty() {
        md.push_str(&format!("- **subtasks**: {}\n", task.subtree_len() - 1));
    }

    if let Some(ref desc) = task.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    if !task.children.is_empty() {
        md.push_str("\n### Subtasks\n");
        for child in &task.children {
            push_checklist(&mut md, child, 0);
        }
    }

    md
}

/// Format a forest as a nested markdown checklist.
pub fn format_tree_markdown(tasks: &[Task]) -> String {
    let total: usize = tasks.iter().map(Task::subtree_len).sum();
    let mut md = format!("# Tasks ({})\n\n", total);

    if tasks.is_empty() {
        md.push_str("_No tasks._\n");
        return md;
    }

    for task in tasks {
        push_checklist(&mut md, task, 0);
    }
    md
}

fn push_checklist(md: &mut String, task: &Task, depth: usize) {
    let mark = if task.completed { "x" } else { " " };
    md.push_str(&format!(
        "{}- [{}] {} (`{}`)\n",
        "  ".repeat(depth),
        mark,
        task.title,
        task.id
    ));
    for child in &task.children {
        push_checklist(md, child, depth + 1);
    }
}

/// Render any serializable value as pretty JSON.
pub fn to_json_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Render a single task in the requested format.
pub fn format_task(task: &Task, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json_pretty(task),
        OutputFormat::Markdown => format_task_markdown(task),
    }
}

/// Render a forest in the requested format.
pub fn format_tree(tasks: &[Task], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json_pretty(&tasks),
        OutputFormat::Markdown => format_tree_markdown(tasks),
    }
}
