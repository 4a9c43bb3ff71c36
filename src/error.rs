use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate an import run or a discovery command.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("spreadsheet not found: '{}'", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read spreadsheet '{}': {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error(
        "spreadsheet is missing required columns {missing:?}\n   expected: {expected:?}\n   found: {found:?}"
    )]
    MissingColumns {
        missing: Vec<String>,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{action} failed: {status} - {body}")]
    Api {
        action: String,
        status: u16,
        body: String,
    },

    #[error("{action} failed: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: RowError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// A problem with a single spreadsheet row.
///
/// Whether it halts the run or only skips the row is decided by the
/// importer's strictness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("empty title")]
    EmptyTitle,

    #[error("required column '{0}' is empty")]
    EmptyColumn(String),

    #[error("invalid due date '{0}'")]
    InvalidDueDate(String),

    #[error("label '{0}' not found on board")]
    UnresolvedLabel(String),

    #[error("member '{0}' not found on board")]
    UnresolvedMember(String),
}

impl ImportError {
    pub fn api(action: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        ImportError::Api {
            action: action.into(),
            status,
            body: body.into(),
        }
    }

    pub fn transport(action: impl Into<String>, source: reqwest::Error) -> Self {
        ImportError::Transport {
            action: action.into(),
            source,
        }
    }
}
