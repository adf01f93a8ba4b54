use thiserror::Error;

use crate::path::Location;

/// Misuse of the validator construction API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{kind} requires at least {min} path expression(s), got {got}")]
    TooFewExpressions {
        kind: &'static str,
        min: usize,
        got: usize,
    },
    #[error("scope expression {0} must be absolute")]
    RelativeScope(String),
    #[error("invalid regular expression: {0}")]
    Regex(String),
    #[error("{kind} requires a minimum or a maximum")]
    MissingBounds { kind: &'static str },
    #[error("minimum {min} is greater than maximum {max}")]
    InvertedBounds { min: String, max: String },
    #[error("one_of requires at least one allowed value")]
    EmptyOneOf,
}

impl From<regex::Error> for ConfigError {
    fn from(err: regex::Error) -> Self {
        ConfigError::Regex(err.to_string())
    }
}

/// Failure to resolve a path expression against a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("relative path expression {expression} used without an anchor location")]
    MissingAnchor { expression: String },
    #[error("path expression {expression} ascends above the root")]
    AboveRoot { expression: String },
    #[error("path expression {expression} does not match the schema: {reason}")]
    SchemaMismatch { expression: String, reason: String },
}

/// A JSON instance that does not fit its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {}", display_location(.location))]
pub struct DecodeError {
    pub location: Location,
    pub message: String,
}

fn display_location(location: &Location) -> String {
    if location.is_root() {
        "<root>".to_string()
    } else {
        location.to_string()
    }
}
