//! Notation compiler — `bar|beat` note text → parsed elements → note events.
//!
//! ```text
//! v90 t0.5 C3 E3 G3 1|1,3     // chord on beats 1 and 3
//! t0.25 C1 1|1x16             // sixteen repeated hits
//! @2=1                        // merge bar 1 into bar 2
//! ```

pub mod ast;
pub mod error;
pub mod format;
pub mod interpret;
pub mod parser;

pub use ast::*;
pub use error::NotationError;
pub use format::format_notation;
pub use interpret::{interpret_notation, Advisory, Interpretation, Interpreter};

use parser::Parser;

/// Parse notation source into its element list without interpreting it.
pub fn parse(source: &str) -> Result<Vec<ParsedElement>, NotationError> {
    Parser::new(source).parse()
}
