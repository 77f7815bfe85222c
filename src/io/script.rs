//! JSON replay scripts for `tb replay`.
//!
//! A script seeds an in-memory server, then lists the gestures, mutations and
//! scripted backend failures to run in order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::api::{ApiError, CallKind};
use crate::model::page::ListKind;
use crate::model::task::{Deadline, TaskId, TaskItem, TaskStatus};
use crate::sync::RowLayout;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse script: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("bad deadline {value:?} in step {step}")]
    BadDeadline { step: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub list: ListKind,
    #[serde(default)]
    pub layout: LayoutSpec,
    /// Items on the server before the first step
    #[serde(default)]
    pub items: Vec<TaskItem>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LayoutSpec {
    #[serde(default = "default_row_height")]
    pub row_height: f32,
    #[serde(default = "default_height")]
    pub height: f32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        LayoutSpec {
            row_height: default_row_height(),
            height: default_height(),
        }
    }
}

impl From<LayoutSpec> for RowLayout {
    fn from(spec: LayoutSpec) -> Self {
        RowLayout {
            row_height: spec.row_height,
            height: spec.height,
            scroll: 0.0,
        }
    }
}

fn default_row_height() -> f32 {
    100.0
}

fn default_height() -> f32 {
    800.0
}

/// Error a scripted backend failure produces
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedError {
    Network {
        #[serde(default)]
        message: String,
    },
    Server {
        #[serde(default = "default_status")]
        status: u16,
        #[serde(default)]
        message: String,
    },
    Validation {
        #[serde(default)]
        message: String,
    },
    NotFound {
        item: TaskId,
    },
}

fn default_status() -> u16 {
    500
}

impl From<ScriptedError> for ApiError {
    fn from(e: ScriptedError) -> Self {
        match e {
            ScriptedError::Network { message } => ApiError::Network(message),
            ScriptedError::Server { status, message } => ApiError::Server { status, message },
            ScriptedError::Validation { message } => ApiError::Validation(message),
            ScriptedError::NotFound { item } => ApiError::NotFound(item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Request the next page
    Load,
    /// Reload from the first page
    Refresh,
    LongPress { at: f32 },
    HorizontalStart { item: TaskId },
    Move {
        #[serde(default)]
        dx: f32,
        #[serde(default)]
        dy: f32,
    },
    Release,
    Cancel,
    Select { item: Option<TaskId> },
    Create {
        content: String,
        #[serde(default)]
        at: usize,
    },
    Delete { item: TaskId },
    /// Set the status, or toggle it when `status` is omitted
    Status {
        item: TaskId,
        #[serde(default)]
        status: Option<TaskStatus>,
    },
    Bookmark { item: TaskId },
    /// `deadline` is `YYYY-MM-DD`, `D-n`, or null to clear
    Deadline {
        item: TaskId,
        deadline: Option<String>,
    },
    FailNext { call: CallKind, error: ScriptedError },
    Hang { call: CallKind },
    /// Apply every remote result that is ready
    Settle,
}

impl Script {
    /// Check values serde cannot: deadlines must parse.
    pub fn validate(&self) -> Result<(), ScriptError> {
        for (i, step) in self.steps.iter().enumerate() {
            if let Step::Deadline {
                deadline: Some(value),
                ..
            } = step
            {
                if value.parse::<Deadline>().is_err() {
                    return Err(ScriptError::BadDeadline {
                        step: i + 1,
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

pub fn parse_script(text: &str) -> Result<Script, ScriptError> {
    let script: Script = serde_json::from_str(text)?;
    script.validate()?;
    Ok(script)
}

pub fn read_script(path: &Path) -> Result<Script, ScriptError> {
    let text = fs::read_to_string(path).map_err(|e| ScriptError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_script(&text)
}
