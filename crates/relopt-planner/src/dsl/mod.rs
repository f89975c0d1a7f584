//! Front-ends producing catalogues and canonical plans.
//!
//! - `catalogue`: line-oriented catalogue text (`Name:Tuples:Attr:Count,...`)
//! - `query`: SQL `SELECT ... FROM ... WHERE ...` text, via `sqlparser`
//! - `yaml`: a YAML document holding an optional catalogue and a linear
//!   list of plan steps
//!
//! Every canonical plan built here is left-deep and join-free.

pub mod catalogue;
pub mod query;
pub mod yaml;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("step {step}: {message}")]
    Step { step: usize, message: String },

    #[error("no catalogue: embed one or supply it separately")]
    MissingCatalogue,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] relopt_core::Error),
}

/// sqlparser reports positions as a ` at Line: L, Column: C` suffix.
impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        let message = err.to_string();
        let line = message
            .rsplit_once("Line: ")
            .and_then(|(_, rest)| {
                rest.split(|c: char| !c.is_ascii_digit())
                    .next()
                    .and_then(|n| n.parse().ok())
            })
            .unwrap_or(1);
        ParseError::Syntax { line, message }
    }
}

impl ParseError {
    pub(crate) fn step(step: usize, message: impl Into<String>) -> Self {
        ParseError::Step {
            step,
            message: message.into(),
        }
    }

    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }
}
