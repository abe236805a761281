//! Error types for the notation compiler.

use thiserror::Error;

use crate::scanner::{describe_expected, Found, Location, UnclosedComment};

/// An error that aborts a notation compile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotationError {
    /// The text does not match the grammar.
    #[error("[{location}] syntax error: expected {}, found {found}", describe_expected(.expected))]
    Grammar {
        expected: Vec<&'static str>,
        found: Found,
        location: Location,
    },
    /// A value parsed fine but lies outside its legal domain.
    #[error("{}{message}", location_prefix(.location))]
    Domain {
        message: String,
        location: Option<Location>,
    },
}

fn location_prefix(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!("[{loc}] "),
        None => String::new(),
    }
}

impl NotationError {
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
            location: Some(location),
        }
    }

    /// A domain error about the call's options rather than a spot in the text.
    pub fn domain_unlocated(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
            location: None,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Grammar { location, .. } => Some(*location),
            Self::Domain { location, .. } => *location,
        }
    }

    pub fn is_grammar(&self) -> bool {
        matches!(self, Self::Grammar { .. })
    }
}

impl From<UnclosedComment> for NotationError {
    fn from(err: UnclosedComment) -> Self {
        Self::grammar(&["*/"], Found::EndOfInput, err.0)
    }
}
