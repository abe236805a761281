//! Abstract syntax tree for the modulation language.

use std::fmt;

use crate::scanner::Location;
use crate::time::{bar_beat_to_beats, BEAT_EPSILON};

/// A parsed modulation text: assignments in textual order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulationProgram {
    pub assignments: Vec<Assignment>,
}

/// `[pitch range] [time range] parameter (= | +=) expression`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub pitch_range: Option<PitchRange>,
    pub time_range: Option<TimeRange>,
    pub parameter: Parameter,
    pub operator: Operator,
    pub expression: Expr,
    pub location: Location,
}

/// Inclusive MIDI pitch range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchRange {
    pub start: u8,
    pub end: u8,
}

impl PitchRange {
    pub fn contains(self, pitch: u8) -> bool {
        (self.start..=self.end).contains(&pitch)
    }
}

/// Inclusive `bar|beat-bar|beat` range in musical time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start_bar: u32,
    pub start_beat: f64,
    pub end_bar: u32,
    pub end_beat: f64,
}

impl TimeRange {
    /// Start and end as linear musical beats.
    pub fn span(&self, beats_per_bar: f64) -> (f64, f64) {
        (
            bar_beat_to_beats(self.start_bar, self.start_beat, beats_per_bar),
            bar_beat_to_beats(self.end_bar, self.end_beat, beats_per_bar),
        )
    }

    pub fn contains(&self, position: f64, beats_per_bar: f64) -> bool {
        let (start, end) = self.span(beats_per_bar);
        position >= start - BEAT_EPSILON && position <= end + BEAT_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Velocity,
    Timing,
    Duration,
    Probability,
}

impl Parameter {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "velocity" => Some(Parameter::Velocity),
            "timing" => Some(Parameter::Timing),
            "duration" => Some(Parameter::Duration),
            "probability" => Some(Parameter::Probability),
            _ => None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parameter::Velocity => "velocity",
            Parameter::Timing => "timing",
            Parameter::Duration => "duration",
            Parameter::Probability => "probability",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Set,
    /// `+=`
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Cos,
    Tri,
    Saw,
    Square,
    Noise,
    Ramp,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cos" => Some(Function::Cos),
            "tri" => Some(Function::Tri),
            "saw" => Some(Function::Saw),
            "square" => Some(Function::Square),
            "noise" => Some(Function::Noise),
            "ramp" => Some(Function::Ramp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Cos => "cos",
            Function::Tri => "tri",
            Function::Saw => "saw",
            Function::Square => "square",
            Function::Noise => "noise",
            Function::Ramp => "ramp",
        }
    }

    /// Minimum and maximum argument counts.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Cos | Function::Tri | Function::Saw => (1, 2),
            Function::Square => (1, 3),
            Function::Noise => (0, 0),
            Function::Ramp => (2, 3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `<bars>:<beats>t` or `<beats>t`; converted to musical beats at evaluation.
    Period { bars: u32, beats: f64 },
    /// `note.<property>`, holding the property name.
    Variable(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
