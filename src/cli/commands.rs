use clap::{Args, Parser, Subcommand};

use crate::model::page::ListKind;
use crate::model::task::TaskStatus;

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - backlog lists with optimistic sync"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the config file (default: ./taskboard.toml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Server list to show or to look items up in (add always targets the backlog)
    #[arg(long, global = true, value_enum, default_value_t = ListKind::Backlog)]
    pub list: ListKind,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default taskboard.toml
    Init(InitArgs),
    /// Run a gesture/mutation script against an in-memory server
    Replay(ReplayArgs),
    /// List backlog or today items
    List(ListArgs),
    /// Add an item to the top of the backlog
    Add(AddArgs),
    /// Delete an item
    Rm(RmArgs),
    /// Mark an item done, or set its status
    Done(DoneArgs),
    /// Toggle an item's bookmark
    Bookmark(BookmarkArgs),
    /// Set or clear an item's deadline
    Deadline(DeadlineArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the JSON script
    pub script: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Load every page instead of the first
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Item content
    pub content: String,
}

#[derive(Args)]
pub struct RmArgs {
    /// Item id (e.g. 12 or #12)
    pub id: String,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Item id
    pub id: String,
    /// Status to set instead of completed (incomplete, completed)
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,
}

#[derive(Args)]
pub struct BookmarkArgs {
    /// Item id
    pub id: String,
}

#[derive(Args)]
pub struct DeadlineArgs {
    /// Item id
    pub id: String,
    /// YYYY-MM-DD or D-<n>; omit with --clear
    #[arg(required_unless_present = "clear")]
    pub deadline: Option<String>,
    /// Remove the deadline
    #[arg(long, conflicts_with = "deadline")]
    pub clear: bool,
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    s.parse()
}
