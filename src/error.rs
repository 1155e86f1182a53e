//! Error types for taskmaster
//!
//! Exit codes:
//! - 0: Success
//! - 2: Validation error (bad args, missing title, invalid enum value)
//! - 3: Not found (unknown task, category, or tag id)
//! - 4: Conflict (duplicate names, category still in use)
//! - 5: Internal error (I/O, corrupt data, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskmaster CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const CONFLICT: i32 = 4;
    pub const INTERNAL: i32 = 5;
}

/// Message shown to callers for any internal failure.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Main error type for taskmaster operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (exit code 2)
    #[error("Task title is required")]
    MissingTitle,

    #[error("Invalid {field}: '{value}' (expected one of: {expected})")]
    InvalidEnum {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Not found (exit code 3)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    // Conflicts (exit code 4)
    #[error("Category name already exists: {0}")]
    CategoryExists(String),

    #[error("Tag name already exists: {0}")]
    TagExists(String),

    #[error("Cannot delete category {name}: {tasks} task(s) still assigned")]
    CategoryInUse { name: String, tasks: usize },

    // Internal failures (exit code 5)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Stable machine-readable category of this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingTitle
            | Error::InvalidEnum { .. }
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_) => "validation",

            Error::TaskNotFound(_) | Error::CategoryNotFound(_) | Error::TagNotFound(_) => {
                "not_found"
            }

            Error::CategoryExists(_) | Error::TagExists(_) | Error::CategoryInUse { .. } => {
                "conflict"
            }

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => "internal",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            "validation" => exit_codes::VALIDATION,
            "not_found" => exit_codes::NOT_FOUND,
            "conflict" => exit_codes::CONFLICT,
            _ => exit_codes::INTERNAL,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == "internal"
    }

    /// Message safe to show to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidEnum {
                field, expected, ..
            } => Some(serde_json::json!({ "field": field, "expected": expected })),
            Error::CategoryInUse { tasks, .. } => Some(serde_json::json!({ "tasks": tasks })),
            _ => None,
        }
    }
}

/// Result type alias for taskmaster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub kind: &'static str,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.public_message(),
            kind: err.kind(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
