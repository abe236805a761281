//! Parser for the modulation language.
//!
//! ```text
//! C3-C4 velocity += 20 * cos(1:0t)
//! 1|1-2|4.5 probability = ramp(0.2, 1)
//! timing += 0.02 * noise()
//! ```

use super::ast::*;
use super::error::ModulationError;
use super::token::{Token, TokenKind};
use crate::note::MAX_PITCH;
use crate::scanner::Location;

const ASSIGNMENT_START: &[&str] = &[
    "pitch",
    "time range",
    "velocity",
    "timing",
    "duration",
    "probability",
];
const AFTER_PITCH_RANGE: &[&str] = &["time range", "velocity", "timing", "duration", "probability"];
const PARAMETERS: &[&str] = &["velocity", "timing", "duration", "probability"];
const PRIMARY: &[&str] = &["number", "note.<property>", "function call", "'('", "'-'"];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<ModulationProgram, ModulationError> {
        let mut assignments = Vec::new();
        while !self.is_at_end() {
            assignments.push(self.parse_assignment()?);
        }
        Ok(ModulationProgram { assignments })
    }

    fn parse_assignment(&mut self) -> Result<Assignment, ModulationError> {
        let location = self.peek().location;

        let pitch_range = if matches!(self.peek().kind, TokenKind::Pitch { .. }) {
            Some(self.parse_pitch_range()?)
        } else {
            None
        };

        let time_range = if self.at_time_range() {
            Some(self.parse_time_range()?)
        } else {
            None
        };

        let parameter = match &self.peek().kind {
            TokenKind::Ident(word) => Parameter::from_keyword(word),
            _ => None,
        };
        let Some(parameter) = parameter else {
            let expected = match (pitch_range, time_range) {
                (None, None) => ASSIGNMENT_START,
                (Some(_), None) => AFTER_PITCH_RANGE,
                (_, Some(_)) => PARAMETERS,
            };
            return Err(self.error(expected));
        };
        self.advance();

        let operator = match self.peek().kind {
            TokenKind::Eq => Operator::Set,
            TokenKind::PlusEq => Operator::Add,
            _ => return Err(self.error(&["'='", "'+='"])),
        };
        self.advance();

        let expression = self.parse_expr()?;

        Ok(Assignment {
            pitch_range,
            time_range,
            parameter,
            operator,
            expression,
            location,
        })
    }

    /// `<pitch>` or `<pitch>-<pitch>`.
    fn parse_pitch_range(&mut self) -> Result<PitchRange, ModulationError> {
        let location = self.peek().location;
        let start = self.expect_pitch()?;
        let end = if self.check(&TokenKind::Minus)
            && matches!(self.peek_next().kind, TokenKind::Pitch { .. })
        {
            self.advance();
            self.expect_pitch()?
        } else {
            start
        };
        if end < start {
            return Err(ModulationError::domain(
                format!("pitch range runs backwards (MIDI {start} to {end})"),
                location,
            ));
        }
        Ok(PitchRange { start, end })
    }

    fn expect_pitch(&mut self) -> Result<u8, ModulationError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Pitch { name, midi } => {
                if !(0..=MAX_PITCH).contains(&midi) {
                    return Err(ModulationError::domain(
                        format!("pitch {name} (MIDI {midi}) outside 0-127"),
                        token.location,
                    ));
                }
                self.advance();
                Ok(midi as u8)
            }
            _ => Err(self.error(&["pitch"])),
        }
    }

    fn at_time_range(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Number(_))
            && self.peek_next().kind == TokenKind::Pipe
    }

    /// `<bar>|<beat>-<bar>|<beat>`.
    fn parse_time_range(&mut self) -> Result<TimeRange, ModulationError> {
        let (start_bar, start_beat) = self.parse_bar_beat()?;
        if !self.check(&TokenKind::Minus) {
            return Err(self.error(&["'-'"]));
        }
        self.advance();
        let (end_bar, end_beat) = self.parse_bar_beat()?;
        Ok(TimeRange {
            start_bar,
            start_beat,
            end_bar,
            end_beat,
        })
    }

    fn parse_bar_beat(&mut self) -> Result<(u32, f64), ModulationError> {
        let location = self.peek().location;
        let bar = match self.peek().kind {
            TokenKind::Number(n) => n,
            _ => return Err(self.error(&["bar number"])),
        };
        if bar < 1.0 || bar.fract() != 0.0 || bar > u32::MAX as f64 {
            return Err(ModulationError::domain(
                format!("bar number must be a whole number from 1, got {bar}"),
                location,
            ));
        }
        self.advance();
        if !self.check(&TokenKind::Pipe) {
            return Err(self.error(&["'|'"]));
        }
        self.advance();
        let beat = self.parse_number_literal()?;
        Ok((bar as u32, beat))
    }

    /// Number, fraction `n/d` or mixed `n+num/den`.
    fn parse_number_literal(&mut self) -> Result<f64, ModulationError> {
        let location = self.peek().location;
        let value = match self.peek().kind {
            TokenKind::Number(n) => n,
            _ => return Err(self.error(&["number"])),
        };
        self.advance();

        if self.check(&TokenKind::Slash) {
            if let TokenKind::Number(den) = self.peek_next().kind {
                self.advance();
                self.advance();
                return divide(value, den, location);
            }
        }

        let mixed = self.check(&TokenKind::Plus)
            && matches!(self.peek_at(1).kind, TokenKind::Number(_))
            && self.peek_at(2).kind == TokenKind::Slash
            && matches!(self.peek_at(3).kind, TokenKind::Number(_));
        if mixed {
            let (TokenKind::Number(num), TokenKind::Number(den)) =
                (self.peek_at(1).kind.clone(), self.peek_at(3).kind.clone())
            else {
                return Ok(value);
            };
            for _ in 0..4 {
                self.advance();
            }
            return Ok(value + divide(num, den, location)?);
        }

        Ok(value)
    }

    fn parse_expr(&mut self) -> Result<Expr, ModulationError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ModulationError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ModulationError> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Subtract, Expr::Number(0.0), operand));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ModulationError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                if self.peek_next().kind == TokenKind::Colon {
                    if let TokenKind::Period(beats) = self.peek_at(2).kind {
                        if n.fract() != 0.0 || n > u32::MAX as f64 {
                            return Err(ModulationError::domain(
                                format!("period bar count must be a whole number, got {n}"),
                                token.location,
                            ));
                        }
                        self.advance();
                        self.advance();
                        self.advance();
                        return Ok(Expr::Period {
                            bars: n as u32,
                            beats,
                        });
                    }
                }
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Period(beats) => {
                self.advance();
                Ok(Expr::Period { bars: 0, beats })
            }
            TokenKind::Ident(name) if name == "note" => {
                self.advance();
                if !self.check(&TokenKind::Dot) {
                    return Err(self.error(&["'.'"]));
                }
                self.advance();
                match self.peek().kind.clone() {
                    TokenKind::Ident(property) => {
                        self.advance();
                        Ok(Expr::Variable(property))
                    }
                    _ => Err(self.error(&["property name"])),
                }
            }
            TokenKind::Ident(ref name) => {
                let Some(function) = Function::from_name(name) else {
                    return Err(ModulationError::grammar(
                        &["cos", "tri", "saw", "square", "noise", "ramp", "note"],
                        token.kind.found(),
                        token.location,
                    ));
                };
                self.advance();
                self.parse_call(function)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                if !self.check(&TokenKind::RParen) {
                    return Err(self.error(&["')'"]));
                }
                self.advance();
                Ok(inner)
            }
            _ => Err(self.error(PRIMARY)),
        }
    }

    /// Argument list; the count is checked against the function's arity
    /// while parsing, so `noise(1)` fails at the `1`.
    fn parse_call(&mut self, function: Function) -> Result<Expr, ModulationError> {
        if !self.check(&TokenKind::LParen) {
            return Err(self.error(&["'('"]));
        }
        self.advance();

        let (min, max) = function.arity();
        let mut args = Vec::new();
        while args.len() < max {
            if args.len() >= min && self.check(&TokenKind::RParen) {
                break;
            }
            if !args.is_empty() {
                if !self.check(&TokenKind::Comma) {
                    let expected: &[&'static str] = if args.len() >= min {
                        &["','", "')'"]
                    } else {
                        &["','"]
                    };
                    return Err(self.error(expected));
                }
                self.advance();
            }
            args.push(self.parse_expr()?);
        }
        if !self.check(&TokenKind::RParen) {
            return Err(self.error(&["')'"]));
        }
        self.advance();

        Ok(Expr::Call { function, args })
    }

    // --- helpers ---

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_next(&self) -> &Token {
        self.peek_at(1)
    }

    /// Token `offset` ahead; the trailing Eof repeats past the end.
    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn error(&self, expected: &[&'static str]) -> ModulationError {
        let token = self.peek();
        ModulationError::grammar(expected, token.kind.found(), token.location)
    }
}

fn divide(num: f64, den: f64, location: Location) -> Result<f64, ModulationError> {
    if den == 0.0 {
        return Err(ModulationError::domain(
            format!("division by zero in fraction {num}/0"),
            location,
        ));
    }
    Ok(num / den)
}
