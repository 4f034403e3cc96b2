//! Error definitions for the Compose document pipeline.
//!
//! Only fatal failures surface as [`ComposeError`]. Stage-level problems
//! (unresolved includes, extends cycles, bad variable references) are
//! recorded as diagnostics on the parse result instead.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum ComposeError {
    /// The primary document is not syntactically valid YAML.
    #[error("yaml parse error{}: {message}", location_suffix(.line, .column))]
    Yaml {
        message: String,
        /// 1-based line of the syntax error, when the parser reports one.
        line: Option<usize>,
        /// 1-based column of the syntax error, when the parser reports one.
        column: Option<usize>,
    },
    /// The document root is valid YAML but not a mapping.
    #[error("document error: {0}")]
    Document(String),
    /// Filesystem I/O error from callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line} column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}
