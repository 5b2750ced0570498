use thiserror::Error;

use crate::smarts::SmartsError;

/// Errors from reading a Molfile connection table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MolfileError {
    /// Malformed line. `line` is 1-based.
    #[error("Molfile parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unexpected end of Molfile after line {line}")]
    UnexpectedEnd { line: usize },

    /// The table parsed but does not form a valid query molecule.
    #[error("invalid query structure: {0}")]
    Query(#[from] SmartsError),
}

impl MolfileError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        MolfileError::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type MolfileResult<T> = Result<T, MolfileError>;
