//! Parser for the notation language.
//!
//! Works directly on characters: elements are short, whitespace-separated
//! words (`C3`, `v80-100`, `1|1x4@0.5`, `@3-4=1`) whose internal structure
//! doesn't need a separate token stream.

use super::ast::*;
use super::error::NotationError;
use crate::note::{midi_from_parts, pitch_class_value, MAX_PITCH};
use crate::scanner::{Location, Scanner};

const ELEMENT_START: &[&str] = &[
    "pitch",
    "bar number",
    "'|'",
    "'@'",
    "'v'",
    "'t'",
    "'p'",
];

pub struct Parser {
    scanner: Scanner,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            scanner: Scanner::new(source),
        }
    }

    pub fn parse(&mut self) -> Result<Vec<ParsedElement>, NotationError> {
        let mut elements = Vec::new();

        loop {
            self.scanner.skip_trivia()?;
            if self.scanner.is_at_end() {
                break;
            }

            let location = self.scanner.location();
            match self.scanner.peek() {
                Some('@') => elements.push(self.parse_copy(location)?),
                Some('|') | Some('0'..='9') => self.parse_time_positions(&mut elements)?,
                Some('p') => elements.push(self.parse_probability(location)?),
                Some('v') => elements.push(self.parse_velocity(location)?),
                Some('t') => elements.push(self.parse_duration(location)?),
                Some(letter @ 'A'..='G') => elements.push(self.parse_pitch(letter, location)?),
                _ => return Err(self.error(ELEMENT_START)),
            }
        }

        Ok(elements)
    }

    /// `@clear`, `@dest`, `@dest=source`, where each side is `N` or `N-M`.
    fn parse_copy(&mut self, location: Location) -> Result<ParsedElement, NotationError> {
        self.scanner.advance(); // consume '@'

        if self.scanner.eat_str("clear") {
            self.end_element(&[])?;
            return Ok(ParsedElement {
                element: Element::ClearBuffer,
                location,
            });
        }
        if !self.at_digit() {
            return Err(self.error(&["clear", "bar number"]));
        }

        let destination = self.parse_bar_spec()?;
        let source = if self.scanner.eat('=') {
            if !self.at_digit() {
                return Err(self.error(&["bar number"]));
            }
            CopySource::Bars(self.parse_bar_spec()?)
        } else {
            CopySource::Previous
        };
        self.end_element(&["'='", "'-'"])?;

        Ok(ParsedElement {
            element: Element::BarCopy {
                destination,
                source,
            },
            location,
        })
    }

    fn parse_bar_spec(&mut self) -> Result<BarSpec, NotationError> {
        let location = self.scanner.location();
        let start = self.parse_bar_number()?;
        if !self.scanner.eat('-') {
            return Ok(BarSpec::Single(start));
        }
        let end = self.parse_bar_number()?;
        if end < start {
            return Err(NotationError::domain(
                format!("bar range {start}-{end} runs backwards"),
                location,
            ));
        }
        Ok(BarSpec::Range(start, end))
    }

    fn parse_bar_number(&mut self) -> Result<u32, NotationError> {
        let location = self.scanner.location();
        let bar = self.parse_integer("bar number")?;
        if bar == 0 {
            return Err(NotationError::domain("bar numbers start at 1", location));
        }
        Ok(bar)
    }

    /// `[bar]|beat[,beat...]`. Pushes one element per beat.
    fn parse_time_positions(
        &mut self,
        elements: &mut Vec<ParsedElement>,
    ) -> Result<(), NotationError> {
        let bar = if self.at_digit() {
            let bar = self.parse_bar_number()?;
            if !self.scanner.eat('|') {
                return Err(self.error(&["'|'", "digit"]));
            }
            Some(bar)
        } else {
            self.scanner.advance(); // consume '|'
            None
        };

        loop {
            let location = self.scanner.location();
            let beat = self.parse_beat_spec()?;
            elements.push(ParsedElement {
                element: Element::TimePosition { bar, beat },
                location,
            });
            if !self.scanner.eat(',') {
                break;
            }
        }

        self.end_element(&["','", "'x'"])
    }

    /// `beat` or `beat x times [@ step]`.
    fn parse_beat_spec(&mut self) -> Result<BeatSpec, NotationError> {
        let location = self.scanner.location();
        let start = self.parse_number("beat")?;
        if start < 1.0 {
            return Err(NotationError::domain(
                format!("beat {start} is before the start of the bar (beats start at 1)"),
                location,
            ));
        }
        if !self.scanner.eat('x') {
            return Ok(BeatSpec::Single(start));
        }

        let times_location = self.scanner.location();
        let times = self.parse_integer("repeat count")?;
        if times == 0 {
            return Err(NotationError::domain(
                "repeat count must be at least 1",
                times_location,
            ));
        }

        let step = if self.scanner.eat('@') {
            let step_location = self.scanner.location();
            let step = self.parse_number("repeat step")?;
            if step == 0.0 {
                return Err(NotationError::domain("repeat step resolves to 0", step_location));
            }
            Some(step)
        } else {
            None
        };

        Ok(BeatSpec::Repeat(RepeatPattern { start, times, step }))
    }

    fn parse_probability(&mut self, location: Location) -> Result<ParsedElement, NotationError> {
        self.scanner.advance(); // consume 'p'
        let value = self.parse_number("probability")?;
        if !(0.0..=1.0).contains(&value) {
            return Err(NotationError::domain(
                format!("probability {value} outside 0-1"),
                location,
            ));
        }
        self.end_element(&[])?;
        Ok(ParsedElement {
            element: Element::Probability(value),
            location,
        })
    }

    /// `v<int>` or `v<int>-<int>`.
    fn parse_velocity(&mut self, location: Location) -> Result<ParsedElement, NotationError> {
        self.scanner.advance(); // consume 'v'
        let min = self.parse_velocity_value()?;

        let element = if self.scanner.eat('-') {
            let max = self.parse_velocity_value()?;
            if min > max {
                return Err(NotationError::domain(
                    format!("velocity range {min}-{max} is inverted: min must not exceed max"),
                    location,
                ));
            }
            Element::VelocityRange { min, max }
        } else {
            Element::Velocity(min)
        };

        self.end_element(&["'-'"])?;
        Ok(ParsedElement { element, location })
    }

    fn parse_velocity_value(&mut self) -> Result<u8, NotationError> {
        let location = self.scanner.location();
        let value = self.parse_integer("velocity")?;
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 127)
            .ok_or_else(|| {
                NotationError::domain(format!("velocity {value} outside 0-127"), location)
            })
    }

    /// `t<beats>` or `t<bars>:<beats>`.
    fn parse_duration(&mut self, location: Location) -> Result<ParsedElement, NotationError> {
        self.scanner.advance(); // consume 't'

        let mark = self.scanner.mark();
        let whole = self.scanner.digits();
        let spec = if !whole.is_empty() && self.scanner.peek() == Some(':') {
            let bars = whole.parse::<u32>().map_err(|_| {
                NotationError::domain(format!("bar count {whole} is too large"), location)
            })?;
            self.scanner.advance(); // consume ':'
            let beats = self.parse_number("beats")?;
            DurationSpec::BarsBeats { bars, beats }
        } else {
            self.scanner.reset(mark);
            DurationSpec::Beats(self.parse_number("duration")?)
        };

        let positive = match spec {
            DurationSpec::Beats(beats) => beats > 0.0,
            DurationSpec::BarsBeats { bars, beats } => bars > 0 || beats > 0.0,
        };
        if !positive {
            return Err(NotationError::domain(
                "duration must be greater than 0",
                location,
            ));
        }

        self.end_element(&["':'"])?;
        Ok(ParsedElement {
            element: Element::Duration(spec),
            location,
        })
    }

    /// Pitch class letter (already peeked), optional `#`/`b`, signed octave.
    fn parse_pitch(
        &mut self,
        letter: char,
        location: Location,
    ) -> Result<ParsedElement, NotationError> {
        self.scanner.advance();
        let accidental = match self.scanner.peek() {
            Some('#') | Some('b') => self.scanner.advance(),
            _ => None,
        };
        let negative = self.scanner.eat('-');

        let digits = self.scanner.digits();
        if digits.is_empty() {
            return Err(match (accidental, negative) {
                (None, false) => self.error(&["'#'", "'b'", "octave"]),
                _ => self.error(&["octave"]),
            });
        }

        let name = format!(
            "{letter}{}{}{digits}",
            accidental.map(String::from).unwrap_or_default(),
            if negative { "-" } else { "" }
        );
        let out_of_range =
            || NotationError::domain(format!("pitch {name} outside MIDI range 0-127"), location);

        let octave: i32 = digits.parse().map_err(|_| out_of_range())?;
        let octave = if negative { -octave } else { octave };
        let class = pitch_class_value(letter, accidental).ok_or_else(out_of_range)?;
        let midi = midi_from_parts(class, octave);
        if !(0..=MAX_PITCH).contains(&midi) {
            return Err(NotationError::domain(
                format!("pitch {name} (MIDI {midi}) outside 0-127"),
                location,
            ));
        }

        self.end_element(&["digit"])?;
        Ok(ParsedElement {
            element: Element::Pitch(midi as u8),
            location,
        })
    }

    fn parse_integer(&mut self, what: &'static str) -> Result<u32, NotationError> {
        let location = self.scanner.location();
        let digits = self.scanner.digits();
        if digits.is_empty() {
            return Err(self.error(&[what]));
        }
        digits
            .parse()
            .map_err(|_| NotationError::domain(format!("{what} {digits} is too large"), location))
    }

    /// Integer, decimal, fraction `n/d` or mixed `n+num/den`.
    fn parse_number(&mut self, what: &'static str) -> Result<f64, NotationError> {
        let location = self.scanner.location();
        let value = self.parse_decimal().ok_or_else(|| self.error(&[what]))?;

        // Fraction: n/d. A second '/' would be a comment.
        if self.scanner.peek() == Some('/') && self.next_is_digit(1) {
            self.scanner.advance();
            let den = self.parse_decimal().unwrap_or(1.0);
            return divide(value, den, location);
        }

        // Mixed number: n+num/den
        if self.scanner.peek() == Some('+') && self.next_is_digit(1) {
            let mark = self.scanner.mark();
            self.scanner.advance();
            if let Some(num) = self.parse_decimal() {
                if self.scanner.peek() == Some('/') && self.next_is_digit(1) {
                    self.scanner.advance();
                    let den = self.parse_decimal().unwrap_or(1.0);
                    return Ok(value + divide(num, den, location)?);
                }
            }
            self.scanner.reset(mark);
        }

        Ok(value)
    }

    /// Digits with an optional fractional part, or `None` if nothing numeric is here.
    fn parse_decimal(&mut self) -> Option<f64> {
        let mut text = self.scanner.digits();
        if self.scanner.peek() == Some('.') && self.next_is_digit(1) {
            self.scanner.advance();
            text.push('.');
            text.push_str(&self.scanner.digits());
        }
        if text.is_empty() {
            None
        } else {
            text.parse().ok()
        }
    }

    fn at_digit(&self) -> bool {
        self.next_is_digit(0)
    }

    fn next_is_digit(&self, offset: usize) -> bool {
        self.scanner
            .peek_at(offset)
            .is_some_and(|c| c.is_ascii_digit())
    }

    /// Require a separator after an element; `continuations` lists what could
    /// have extended it.
    fn end_element(&self, continuations: &[&'static str]) -> Result<(), NotationError> {
        if self.scanner.at_separator() {
            return Ok(());
        }
        let mut expected = continuations.to_vec();
        expected.push("whitespace");
        Err(self.error(&expected))
    }

    fn error(&self, expected: &[&'static str]) -> NotationError {
        NotationError::grammar(expected, self.scanner.found(), self.scanner.location())
    }
}

fn divide(num: f64, den: f64, location: Location) -> Result<f64, NotationError> {
    if den == 0.0 {
        return Err(NotationError::domain(
            format!("division by zero in fraction {num}/0"),
            location,
        ));
    }
    Ok(num / den)
}
