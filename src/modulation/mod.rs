//! Modulation language: per-note parameter edits driven by waveforms,
//! ramps and arithmetic over note properties.
//!
//! ```text
//! C1-C2 velocity += 20 * cos(1:0t)    // kick and snare swell once per bar
//! 2|1-2|4 probability = ramp(1, 0.4)  // thin out bar 2
//! timing += 0.01 * noise()
//! ```

pub mod apply;
pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod waveform;

pub use apply::{apply_modulations, apply_modulations_with_rng, ModulationReport};
pub use ast::*;
pub use error::{EvalError, ModulationError};

use lexer::Lexer;
use parser::Parser;

impl ModulationProgram {
    /// Parse modulation text. Empty text gives an empty program.
    pub fn parse(source: &str) -> Result<Self, ModulationError> {
        let tokens = Lexer::new(source).tokenize()?;
        Parser::new(tokens).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_lexer_errors() {
        let err = ModulationProgram::parse("velocity = 1 /* open").unwrap_err();
        assert!(err.is_grammar());
        assert!(err.to_string().contains("expected */, found end of input"));
    }

    #[test]
    fn parse_whole_program() {
        let program =
            ModulationProgram::parse("C1-C2 velocity += 20 * cos(1:0t)\ntiming += 0.01 * noise()")
                .unwrap();
        assert_eq!(program.assignments.len(), 2);
        assert_eq!(
            program.assignments[0].pitch_range,
            Some(PitchRange { start: 36, end: 48 })
        );
    }
}
