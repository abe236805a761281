//! Error types for the modulation language.

use thiserror::Error;

use crate::scanner::{describe_expected, Found, Location, UnclosedComment};

/// The modulation text could not be parsed. Nothing is applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModulationError {
    #[error("[{location}] syntax error: expected {}, found {found}", describe_expected(.expected))]
    Grammar {
        expected: Vec<&'static str>,
        found: Found,
        location: Location,
    },
    #[error("[{location}] {message}")]
    Domain { message: String, location: Location },
}

impl ModulationError {
    pub fn grammar(expected: &[&'static str], found: Found, location: Location) -> Self {
        Self::Grammar {
            expected: expected.to_vec(),
            found,
            location,
        }
    }

    pub fn domain(message: impl Into<String>, location: Location) -> Self {
        Self::Domain {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Self::Grammar { location, .. } | Self::Domain { location, .. } => *location,
        }
    }

    pub fn is_grammar(&self) -> bool {
        matches!(self, Self::Grammar { .. })
    }
}

impl From<UnclosedComment> for ModulationError {
    fn from(err: UnclosedComment) -> Self {
        Self::grammar(&["*/"], Found::EndOfInput, err.0)
    }
}

/// One assignment could not be evaluated for one note. The assignment is
/// skipped for that note only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("variable 'note.{0}' is not available")]
    UnknownVariable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{function}() period must be positive, got {period}")]
    InvalidPeriod { function: &'static str, period: f64 },
    #[error("expression produced a non-finite value")]
    NonFinite,
}
