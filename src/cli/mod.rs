//! Command-line interface for taskmaster
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::output::OutputOptions;
use crate::store::Store;

mod category;
mod init;
mod stats;
mod tag;
mod task;

/// taskmaster - personal task management with productivity analytics
#[derive(Parser, Debug)]
#[command(name = "taskmaster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKMASTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and a default taskmaster.toml
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Tag management
    #[command(subcommand)]
    Tag(TagCommands),

    /// Productivity analytics
    #[command(subcommand)]
    Stats(StatsCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Task title
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// PENDING, IN_PROGRESS, COMPLETED, CANCELLED
        #[arg(long)]
        status: Option<String>,

        /// LOW, MEDIUM, HIGH, URGENT
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date: RFC 3339 timestamp or YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,

        /// Category id or id prefix
        #[arg(short, long)]
        category: Option<String>,

        /// Tag id or name (repeatable; unknown names are created)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        position: Option<i32>,
    },

    /// List tasks with filters, sorting and pagination
    List {
        #[arg(long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// Only tasks carrying this tag (id or name)
        #[arg(short, long)]
        tag: Option<String>,

        /// Filter on completion flag
        #[arg(long)]
        completed: Option<bool>,

        /// Case-insensitive search in title and description
        #[arg(short, long)]
        search: Option<String>,

        /// dueDate, priority, position, createdAt
        #[arg(long)]
        sort: Option<String>,

        /// asc or desc
        #[arg(long)]
        order: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one task
    Show {
        /// Task id or id prefix
        id: String,
    },

    /// Update fields of a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        /// New due date (empty string clears it)
        #[arg(long)]
        due: Option<String>,

        /// Set the completion flag
        #[arg(long)]
        completed: Option<bool>,

        /// New category (empty string clears it)
        #[arg(short, long)]
        category: Option<String>,

        /// Replace tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        /// New image url (empty string clears it)
        #[arg(long)]
        image_url: Option<String>,

        #[arg(long)]
        position: Option<i32>,
    },

    /// Mark a task completed
    Done { id: String },

    /// Reopen a completed task
    Reopen { id: String },

    /// Delete a task
    Delete { id: String },

    /// Apply one action to many tasks
    Bulk {
        /// delete, complete, uncomplete
        action: String,

        /// Task ids or id prefixes
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Attach an image file to a task
    Attach {
        id: String,

        /// Image file (jpg, jpeg, png, gif, webp)
        file: PathBuf,
    },
}

/// Category subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a category
    New {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// #RGB or #RRGGBB
        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },

    /// List categories with task counts
    List,

    /// Show one category
    Show { id: String },

    /// Update a category
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a category that has no tasks
    Rm { id: String },
}

/// Tag subcommands
#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Create a tag
    New {
        name: String,

        #[arg(long)]
        color: Option<String>,
    },

    /// List tags with usage counts
    List,

    /// Most used tags
    Popular {
        #[arg(long, default_value_t = crate::tag::DEFAULT_POPULAR_LIMIT)]
        limit: usize,
    },

    /// Show one tag
    Show { id: String },

    /// Rename or recolor a tag
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a tag and detach it from all tasks
    Rm { id: String },
}

/// Stats subcommands
#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Totals, priority and category distribution
    Overview {
        /// today, week, month, year, all
        #[arg(long)]
        period: Option<String>,
    },

    /// Created/completed counts per day or ISO week
    Trends {
        #[arg(long)]
        period: Option<String>,

        /// day or week
        #[arg(long)]
        granularity: Option<String>,
    },

    /// Completion times, productive days and streaks
    Productivity {
        #[arg(long)]
        period: Option<String>,
    },

    /// Per-category analytics
    Categories {
        #[arg(long)]
        period: Option<String>,
    },

    /// Lifetime created/completed totals
    Lifetime,
}

/// Shared state for one command invocation
pub(crate) struct Context {
    pub store: Store,
    pub output: OutputOptions,
}

impl Context {
    fn open(data_dir: Option<PathBuf>, output: OutputOptions) -> Result<Self> {
        Ok(Self {
            store: Store::open(data_dir)?,
            output,
        })
    }
}

impl Cli {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = self.output();
        match self.command {
            Commands::Init => init::run(self.data_dir, output),
            Commands::Task(cmd) => task::run(Context::open(self.data_dir, output)?, cmd),
            Commands::Category(cmd) => category::run(Context::open(self.data_dir, output)?, cmd),
            Commands::Tag(cmd) => tag::run(Context::open(self.data_dir, output)?, cmd),
            Commands::Stats(cmd) => stats::run(Context::open(self.data_dir, output)?, cmd),
        }
    }
}
