//! Error types for template resolution
//!
//! Static resolution fails hard with [`PromptError`]. Dynamic resolution never
//! fails; problems are collected as [`Diagnostic`] values and the offending
//! span resolves to an empty string.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort static resolution
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template file not found: {name} (searched {} paths)", .searched.len())]
    FileNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Unsupported directive: {{{{{directive}}}}}")]
    UnsupportedDirective { directive: String },

    #[error("Include cycle detected: {}", .chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },

    #[error("Failed to read template {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PromptError {
    /// The directive text for an unsupported directive error
    pub fn directive(&self) -> Option<&str> {
        match self {
            PromptError::UnsupportedDirective { directive } => Some(directive),
            _ => None,
        }
    }
}

/// A non-fatal problem found while dispatching a `func:` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnsupportedFunction { name: String },
    WrongArity { function: String, expected: &'static str, got: usize },
    InvalidArgument { function: String, arg: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedFunction { name } => write!(f, "Unsupported function: {}", name),
            Diagnostic::WrongArity { function, expected, got } => {
                write!(f, "{} function requires {} arguments, got {}", function, expected, got)
            }
            Diagnostic::InvalidArgument { function, arg } => {
                write!(f, "Invalid argument '{}' for {} function", arg, function)
            }
        }
    }
}
