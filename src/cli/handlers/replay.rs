use std::path::Path;
use std::sync::Arc;

use crate::api::MemoryApi;
use crate::cli::commands::ReplayArgs;
use crate::cli::output::*;
use crate::io::script::{self, Script, ScriptError, Step};
use crate::model::config::Config;
use crate::model::task::Deadline;
use crate::sync::{
    Board, BoardUpdate, FailureNotice, GestureOutcome, ListState, MutationRequest, PendingMutation,
};

/// Final state of a replayed script
#[derive(Debug)]
pub struct ReplayReport {
    pub state: ListState,
    pub in_flight: Vec<PendingMutation>,
    pub failures: Vec<FailureNotice>,
    pub log: Vec<String>,
}

pub fn cmd_replay(args: ReplayArgs, config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let script = script::read_script(Path::new(&args.script))?;
    // One thread: spawned calls against the in-memory server then finish in
    // submission order, so a replay always prints the same thing.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_script(script, config))?;
    let today = chrono::Local::now().date_naive();

    if json {
        let out = ReplayJson {
            list: list_to_json(&report.state, today),
            selected: report.state.selected,
            in_flight: report.in_flight.iter().map(pending_to_json).collect(),
            failures: report.failures,
            log: report.log,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for line in &report.log {
        println!("{}", line);
    }
    println!();
    for line in format_list(&report.state, today) {
        println!("{}", line);
    }
    if !report.in_flight.is_empty() {
        let pending: Vec<String> = report
            .in_flight
            .iter()
            .map(|p| format!("{} {} #{}", p.id, kind_label(p.kind), p.target))
            .collect();
        println!("in flight: {}", pending.join(", "));
    }
    for notice in &report.failures {
        println!("{}", format_failure(notice));
    }
    Ok(())
}

/// Run every step of `script` against a fresh in-memory server. Remote
/// results are applied only at `settle` steps and once more at the end.
pub async fn run_script(script: Script, config: &Config) -> Result<ReplayReport, ScriptError> {
    script.validate()?;
    let api = Arc::new(MemoryApi::with_items(script.items));
    let mut board = Board::new(script.list, config, api.clone()).with_layout(script.layout.into());
    let mut log = Vec::new();

    for (i, step) in script.steps.into_iter().enumerate() {
        let n = i + 1;
        match step {
            Step::Load => {
                let line = if board.load_next_page() {
                    format!("{}: load page {}", n, board.state().paging.next_page)
                } else {
                    format!("{}: load skipped", n)
                };
                log.push(line);
            }
            Step::Refresh => {
                if board.refresh() {
                    log.push(format!("{}: refresh", n));
                } else {
                    log.push(format!("{}: refresh skipped", n));
                }
            }
            Step::LongPress { at } => {
                let line = if board.long_press(at) {
                    let index = board.gestures().drag().lifted_index().unwrap_or_default();
                    format!("{}: lifted row {}", n, index)
                } else {
                    format!("{}: long press at {} hit nothing", n, at)
                };
                log.push(line);
            }
            Step::HorizontalStart { item } => {
                if board.horizontal_start(item) {
                    log.push(format!("{}: swiping #{}", n, item));
                } else {
                    log.push(format!("{}: swipe on #{} ignored", n, item));
                }
            }
            Step::Move { dx, dy } => {
                let outcome = board.pointer_move(dx, dy);
                if let Some(line) = describe_gesture(n, &outcome) {
                    log.push(line);
                }
            }
            Step::Release => {
                let outcome = board.release();
                log.push(describe_gesture(n, &outcome).unwrap_or_else(|| format!("{}: released", n)));
            }
            Step::Cancel => {
                board.cancel_gesture();
                log.push(format!("{}: gesture cancelled", n));
            }
            Step::Select { item } => board.select(item),
            Step::Create { content, at } => {
                let request = MutationRequest::Create {
                    content,
                    at_index: at,
                };
                log.push(submit(&mut board, n, request));
            }
            Step::Delete { item } => {
                log.push(submit(&mut board, n, MutationRequest::Delete { id: item }));
            }
            Step::Status { item, status } => {
                let request = match status {
                    Some(status) => MutationRequest::SetStatus { id: item, status },
                    None => MutationRequest::ToggleStatus { id: item },
                };
                log.push(submit(&mut board, n, request));
            }
            Step::Bookmark { item } => {
                log.push(submit(&mut board, n, MutationRequest::ToggleBookmark { id: item }));
            }
            Step::Deadline { item, deadline } => {
                let deadline = deadline
                    .map(|value| {
                        value
                            .parse::<Deadline>()
                            .map_err(|_| ScriptError::BadDeadline { step: n, value })
                    })
                    .transpose()?;
                log.push(submit(
                    &mut board,
                    n,
                    MutationRequest::SetDeadline { id: item, deadline },
                ));
            }
            Step::FailNext { call, error } => api.fail_next(call, error.into()),
            Step::Hang { call } => api.hang(call),
            Step::Settle => {
                for update in board.drain_ready().await {
                    log.push(format!("{}: {}", n, describe_update(&update)));
                }
            }
        }
    }

    for update in board.drain_ready().await {
        log.push(format!("end: {}", describe_update(&update)));
    }
    board.cancel_gesture();

    Ok(ReplayReport {
        in_flight: board.coordinator().pending().cloned().collect(),
        failures: board.take_failures(),
        state: board.state().clone(),
        log,
    })
}

fn submit(board: &mut Board, n: usize, request: MutationRequest) -> String {
    let kind = request.kind();
    match board.submit(request) {
        Ok(id) => format!("{}: {} {} sent", n, id, kind_label(kind)),
        Err(e) => format!("{}: {} rejected: {}", n, kind_label(kind), e),
    }
}

fn describe_gesture(n: usize, outcome: &GestureOutcome) -> Option<String> {
    match outcome {
        GestureOutcome::Ignored => None,
        GestureOutcome::Moved { from, to } => Some(format!("{}: moved {} -> {}", n, from, to)),
        GestureOutcome::Deleting(id) => Some(format!("{}: swiped, {} delete sent", n, id)),
        GestureOutcome::Rejected(e) => Some(format!("{}: swipe rejected: {}", n, e)),
    }
}

fn describe_update(update: &BoardUpdate) -> String {
    match update {
        BoardUpdate::Mutation(resolution) => format_resolution(resolution),
        BoardUpdate::PageLoaded { page, items } => format!("page {} loaded ({} items)", page, items),
        BoardUpdate::PageFailed { page, error } => format!("page {} failed: {}", page, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskId;
    use crate::sync::MutationKind;
    use pretty_assertions::assert_eq;

    fn contents(report: &ReplayReport) -> Vec<String> {
        report
            .state
            .items
            .items()
            .iter()
            .map(|t| t.content.clone())
            .collect()
    }

    const SEED: &str = r#""items": [
        {"todoId": 1, "content": "A"},
        {"todoId": 2, "content": "B"},
        {"todoId": 3, "content": "C"}
    ]"#;

    async fn run(steps: &str) -> ReplayReport {
        let text = format!("{{{}, \"steps\": {}}}", SEED, steps);
        let script = script::parse_script(&text).unwrap();
        run_script(script, &Config::default()).await.unwrap()
    }

    #[tokio::test]
    async fn swipe_delete_rolls_back_on_network_failure() {
        let report = run(r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "fail_next", "call": "delete", "error": {"kind": "network", "message": "offline"}},
            {"op": "horizontal_start", "item": 2},
            {"op": "move", "dx": -120},
            {"op": "move", "dx": -81},
            {"op": "release"},
            {"op": "settle"}
        ]"#)
        .await;
        assert_eq!(contents(&report), vec!["A", "B", "C"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, MutationKind::Delete);
        assert_eq!(report.failures[0].target, TaskId(2));
        assert!(report.in_flight.is_empty());
        assert_eq!(report.log[0], "1: load page 0");
        assert_eq!(report.log[2], "4: swiping #2");
        assert_eq!(report.log[3], "7: swiped, m1 delete sent");
    }

    #[tokio::test]
    async fn right_swipe_on_backlog_is_ignored() {
        let report = run(r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "horizontal_start", "item": 2},
            {"op": "move", "dx": 300},
            {"op": "release"},
            {"op": "settle"}
        ]"#)
        .await;
        assert_eq!(contents(&report), vec!["A", "B", "C"]);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn drag_then_hung_status_stays_in_flight() {
        let report = run(r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "long_press", "at": 50},
            {"op": "move", "dy": 120},
            {"op": "release"},
            {"op": "hang", "call": "status"},
            {"op": "status", "item": 3},
            {"op": "settle"}
        ]"#)
        .await;
        assert_eq!(contents(&report), vec!["B", "A", "C"]);
        assert_eq!(report.in_flight.len(), 1);
        assert_eq!(report.in_flight[0].target, TaskId(3));
        assert!(report.state.items.get(TaskId(3)).unwrap().is_completed());
    }

    #[tokio::test]
    async fn create_is_rekeyed_after_settle() {
        let report = run(r#"[
            {"op": "load"},
            {"op": "settle"},
            {"op": "create", "content": "D"},
            {"op": "settle"}
        ]"#)
        .await;
        assert_eq!(contents(&report), vec!["D", "A", "B", "C"]);
        assert_eq!(report.state.items.items()[0].id, TaskId(4));
    }
}
