//! Error taxonomy for the storyboard compiler.
//!
//! Two families of failures exist:
//! - `CompilerError`: a located, source-level failure raised while processing one file
//!   (parse failure, marker arity violation, malformed functions index).
//! - `LowerError`: a failure raised synchronously by Node Lowering.
//!
//! Both are fatal for the unit of work that raised them. Non-fatal findings are
//! reported as `Diagnostic`s instead (see `diagnostics.rs`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "NJ-ERR-PARSE";
pub const ERR_MARKER_ARITY: &str = "NJ-ERR-MARKER-ARITY";
pub const ERR_FUNCTIONS: &str = "NJ-ERR-FUNCTIONS";

fn error_type(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "SYNTAX_ERROR",
        ERR_MARKER_ARITY => "MARKER_ARITY_VIOLATION",
        ERR_FUNCTIONS => "INVALID_FUNCTIONS_INDEX",
        _ => "COMPILER_ERROR",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: error_type(code).to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERING ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("Unsupported namespace prop: \"{0}\"")]
    UnsupportedNamespace(String),

    #[error("slot \"{slot}\" mixes routes and bricks")]
    MixedSlot { slot: String },

    #[error("a `routes` route only accepts routes as children")]
    NonRouteChild,

    #[error("a component definition can not be used as a child")]
    ComponentChild,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CRATE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
