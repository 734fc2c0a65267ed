//! CLI command definitions for task-tree.
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;
pub mod import;

use clap::{Args, Parser, Subcommand, ValueEnum};
use export::ExportArgs;
use import::ImportArgs;
use std::path::PathBuf;

/// Output format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    #[value(alias = "md")]
    Markdown,
}

impl From<FormatArg> for crate::format::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => crate::format::OutputFormat::Json,
            FormatArg::Markdown => crate::format::OutputFormat::Markdown,
        }
    }
}

/// Hierarchical task list backed by a JSON document
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the task document (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<FormatArg>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the whole task tree
    List,

    /// Show one task and its subtasks
    Show {
        /// Task ID
        id: String,
    },

    /// Create a task
    Add(AddArgs),

    /// Update a task's title, description, order or completion
    Update(UpdateArgs),

    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
    },

    /// Mark a task not completed
    Reopen {
        /// Task ID
        id: String,
    },

    /// Reorder a task, optionally under a new parent
    Move(MoveArgs),

    /// Delete a task and all of its subtasks
    Delete {
        /// Task ID
        id: String,
    },

    /// Delete every completed task together with its subtasks
    ClearCompleted,

    /// Apply a JSON batch of operations from a file (or - for stdin)
    Batch {
        /// Batch file, or - to read stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Export the task document
    Export(ExportArgs),

    /// Replace all tasks with the contents of an exported document
    Import(ImportArgs),
}

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    /// Task description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Parent task ID for nesting
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Position among siblings (default 0)
    #[arg(short, long, allow_hyphen_values = true)]
    pub order: Option<f64>,
}

/// Arguments for the update subcommand
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Task ID
    pub id: String,

    /// New title
    #[arg(short, long)]
    pub title: Option<String>,

    /// New description
    #[arg(short, long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,

    /// Raw order value; siblings are not renumbered
    #[arg(short, long, allow_hyphen_values = true)]
    pub order: Option<f64>,

    /// Completion state
    #[arg(long)]
    pub completed: Option<bool>,
}

impl UpdateArgs {
    pub fn to_patch(&self) -> crate::types::TaskPatch {
        let description = if self.clear_description {
            Some(None)
        } else {
            self.description.clone().map(Some)
        };
        crate::types::TaskPatch {
            title: self.title.clone(),
            description,
            completed: self.completed,
            order: self.order,
        }
    }
}

/// Arguments for the move subcommand
#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Task ID
    pub id: String,

    /// Target position among the new siblings (clamped)
    #[arg(short, long, allow_hyphen_values = true)]
    pub order: f64,

    /// New parent task ID (omit to move to the top level)
    #[arg(short, long)]
    pub parent: Option<String>,
}
