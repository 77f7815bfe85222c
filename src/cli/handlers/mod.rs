mod init;
mod replay;
pub use init::{DEFAULT_CONFIG_TEMPLATE, cmd_init};
pub use replay::{ReplayReport, cmd_replay, run_script};

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::HttpApi;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::model::config::Config;
use crate::model::page::ListKind;
use crate::model::task::{Deadline, TaskId, TaskStatus};
use crate::sync::{Board, BoardUpdate, MutationRequest, Resolution};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let list = cli.list;
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config_io::default_config_path);

    match cli.command {
        // Init must not require a readable config
        Commands::Init(args) => cmd_init(args, &config_path, json),
        cmd => {
            let config = config_io::read_config(&config_path)?;
            match cmd {
                Commands::Init(_) => Ok(()),
                Commands::Replay(args) => cmd_replay(args, &config, json),
                Commands::List(args) => cmd_list(args, &config, list, json),
                Commands::Add(args) => cmd_add(args, &config, json),
                Commands::Rm(args) => cmd_rm(args, &config, list, json),
                Commands::Done(args) => cmd_done(args, &config, list, json),
                Commands::Bookmark(args) => cmd_bookmark(args, &config, list, json),
                Commands::Deadline(args) => cmd_deadline(args, &config, list, json),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn remote_board(config: &Config, list: ListKind) -> Board {
    let api = Arc::new(HttpApi::new(&config.api));
    Board::new(list, config, api)
}

fn parse_id(s: &str) -> Result<TaskId, Box<dyn std::error::Error>> {
    s.parse::<TaskId>()
        .map_err(|_| format!("invalid item id: {}", s).into())
}

/// Load pages until `id` is present or the list is exhausted.
async fn load_until(board: &mut Board, id: Option<TaskId>) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        if id.is_some_and(|id| board.state().items.contains(id)) {
            return Ok(());
        }
        if !board.load_next_page() {
            return Ok(());
        }
        for update in board.settle().await {
            if let BoardUpdate::PageFailed { error, .. } = update {
                return Err(error.into());
            }
        }
        if id.is_none() {
            return Ok(());
        }
    }
}

async fn load_all(board: &mut Board) -> Result<(), Box<dyn std::error::Error>> {
    while board.load_next_page() {
        for update in board.settle().await {
            if let BoardUpdate::PageFailed { error, .. } = update {
                return Err(error.into());
            }
        }
    }
    Ok(())
}

/// Load enough of the list to find the target, then run one mutation to
/// completion.
async fn mutate(
    config: &Config,
    list: ListKind,
    target: Option<TaskId>,
    request: MutationRequest,
) -> Result<Resolution, Box<dyn std::error::Error>> {
    let mut board = remote_board(config, list);
    load_until(&mut board, target).await?;
    board.submit(request)?;

    let mut resolution = None;
    for update in board.settle().await {
        if let BoardUpdate::Mutation(r) = update {
            resolution = Some(r);
        }
    }
    resolution.ok_or_else(|| "no response from server".into())
}

fn run_mutation(
    config: &Config,
    list: ListKind,
    target: Option<TaskId>,
    json: bool,
    request: MutationRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolution = runtime()?.block_on(mutate(config, list, target, request))?;

    if json {
        if let Some(out) = resolution_to_json(&resolution) {
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    } else if let Resolution::Committed { .. } = resolution {
        println!("{}", format_resolution(&resolution));
    }

    match resolution {
        Resolution::RolledBack(notice) => Err(format_failure(&notice).into()),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, config: &Config, list: ListKind, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut board = remote_board(config, list);
    let rt = runtime()?;
    if args.all {
        rt.block_on(load_all(&mut board))?;
    } else {
        rt.block_on(load_until(&mut board, None))?;
    }

    let state = board.state();
    let today = chrono::Local::now().date_naive();
    if json {
        println!("{}", serde_json::to_string_pretty(&list_to_json(state, today))?);
    } else {
        for line in format_list(state, today) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_add(args: AddArgs, config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    run_mutation(
        config,
        ListKind::Backlog,
        None,
        json,
        MutationRequest::Create {
            content: args.content,
            at_index: 0,
        },
    )
}

fn cmd_rm(args: RmArgs, config: &Config, list: ListKind, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = parse_id(&args.id)?;
    run_mutation(config, list, Some(id), json, MutationRequest::Delete { id })
}

fn cmd_done(args: DoneArgs, config: &Config, list: ListKind, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = parse_id(&args.id)?;
    let status = args.status.unwrap_or(TaskStatus::Completed);
    run_mutation(config, list, Some(id), json, MutationRequest::SetStatus { id, status })
}

fn cmd_bookmark(args: BookmarkArgs, config: &Config, list: ListKind, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = parse_id(&args.id)?;
    run_mutation(config, list, Some(id), json, MutationRequest::ToggleBookmark { id })
}

fn cmd_deadline(args: DeadlineArgs, config: &Config, list: ListKind, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let id = parse_id(&args.id)?;
    let deadline = if args.clear {
        None
    } else {
        let value = args.deadline.ok_or("a deadline or --clear is required")?;
        Some(value.parse::<Deadline>()?)
    };
    run_mutation(config, list, Some(id), json, MutationRequest::SetDeadline { id, deadline })
}
