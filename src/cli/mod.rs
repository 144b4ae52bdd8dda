//! Command-line interface for boardsync
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in `task` (board mutations and queries) and
//! `board` (the interactive terminal board).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod board;
mod context;

pub use context::BoardContext;
mod task;

/// boardsync - kanban board state from the command line
///
/// Lists, moves and edits the tasks of one user's board, and opens an
/// interactive terminal board with mouse drag and drop.
#[derive(Parser, Debug)]
#[command(name = "boardsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board data directory (defaults to BOARDSYNC_DIR, then the platform data dir)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// User whose board to use (overrides board.toml)
    #[arg(long, global = true, env = "BOARDSYNC_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write board events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tasks, grouped by column
    List {
        /// Only this status (todo, in-progress, await-feedback, done)
        #[arg(long)]
        status: Option<String>,

        /// Only tasks whose title or description contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one task with its subtasks
    Show {
        id: String,
    },

    /// Add a task to the To do column
    Add {
        /// Task title
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// urgent, medium or low
        #[arg(long, default_value = "medium")]
        priority: String,

        /// user-story or technical-task
        #[arg(long, default_value = "technical-task")]
        category: String,

        /// Contact id to assign (repeatable)
        #[arg(long = "assign")]
        assignees: Vec<String>,

        /// Subtask text (repeatable)
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },

    /// Move a task to another column
    Move {
        id: String,

        /// todo, in-progress, await-feedback or done
        status: String,
    },

    /// Edit task fields
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Replace assignees (repeatable)
        #[arg(long = "assign")]
        assignees: Option<Vec<String>>,
    },

    /// Toggle a subtask (1-based, as listed by `show`)
    Toggle {
        id: String,

        index: usize,
    },

    /// Delete a task
    Delete {
        id: String,
    },

    /// Board metrics: counts per column, urgent tasks, next deadline
    Summary,

    /// Open the interactive terminal board
    Board,
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let global = GlobalOptions {
            dir: self.dir,
            user: self.user,
            json: self.json,
            quiet: self.quiet,
            events: self.events,
        };

        match self.command {
            Commands::List { status, search } => task::run_list(task::ListOptions {
                status,
                search,
                global,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions { id, global }),
            Commands::Add {
                title,
                description,
                due,
                priority,
                category,
                assignees,
                subtasks,
            } => task::run_add(task::AddOptions {
                title,
                description,
                due,
                priority,
                category,
                assignees,
                subtasks,
                global,
            }),
            Commands::Move { id, status } => task::run_move(task::MoveOptions { id, status, global }),
            Commands::Edit {
                id,
                title,
                description,
                due,
                priority,
                category,
                status,
                assignees,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                due,
                priority,
                category,
                status,
                assignees,
                global,
            }),
            Commands::Toggle { id, index } => {
                task::run_toggle(task::ToggleOptions { id, index, global })
            }
            Commands::Delete { id } => task::run_delete(task::DeleteOptions { id, global }),
            Commands::Summary => task::run_summary(global),
            Commands::Board => board::run(global),
        }
    }
}
