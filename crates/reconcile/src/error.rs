//! Error types for the reconcile engine

use crate::lifecycle::ApiError;
use thiserror::Error;

/// Error categories for deciding how the host should react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Declared configuration is invalid; fix the config
    Validation,
    /// The object already exists remotely; import it
    Conflict,
    /// The object does not exist remotely
    NotFound,
    /// The backend rejected the call
    Backend,
    /// Programming or table error
    Internal,
}

impl ErrorCategory {
    /// Whether the operator can resolve this without a code change
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Validation | Self::Conflict | Self::NotFound)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid configuration",
            Self::Conflict => "Resource conflict",
            Self::NotFound => "Resource not found",
            Self::Backend => "Backend error",
            Self::Internal => "Internal error",
        }
    }
}

/// Errors from building, classifying or reconciling an instance
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid value for '{field}' ({value}): {reason}")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("'{group}' requires exactly one of [{}], found {}", .candidates.join(", "), selected_list(.selected))]
    VariantSelection {
        group: String,
        candidates: Vec<String>,
        selected: Vec<String>,
    },

    #[error(
        "{kind} '{name}' already exists; bring it under management with `{}`",
        import_command(.kind, .scope.as_deref(), .name)
    )]
    AlreadyExists {
        kind: String,
        /// Parent instance for grouped kinds
        scope: Option<String>,
        name: String,
    },

    #[error("{kind} '{name}' does not exist")]
    Missing { kind: String, name: String },

    #[error("change to [{}] requires replacing the resource", .fields.join(", "))]
    ReplaceRequired { fields: Vec<String> },

    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),

    #[error("malformed schema for '{kind}': {message}")]
    Schema { kind: String, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

fn import_command(kind: &str, scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("cplnform import {kind} {name} --scope {scope}"),
        None => format!("cplnform import {kind} {name}"),
    }
}

fn selected_list(selected: &[String]) -> String {
    if selected.is_empty() {
        "none".to_string()
    } else {
        selected.join(", ")
    }
}

impl Error {
    pub fn validation(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::VariantSelection { .. } | Self::UnknownKind(_) => {
                ErrorCategory::Validation
            }
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::Missing { .. } => ErrorCategory::NotFound,
            Self::ReplaceRequired { .. } | Self::Schema { .. } => ErrorCategory::Internal,
            Self::Api(e) if e.is_not_found() => ErrorCategory::NotFound,
            Self::Api(e) if e.is_conflict() => ErrorCategory::Conflict,
            Self::Api(_) => ErrorCategory::Backend,
        }
    }
}

/// Result type for reconcile operations
pub type Result<T> = std::result::Result<T, Error>;
