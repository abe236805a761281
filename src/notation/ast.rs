//! Parsed notation elements.
//!
//! A notation string parses into a flat, ordered list of [`Element`]s. The
//! interpreter gives them meaning by threading state through them in order.

use crate::scanner::Location;

/// One element of a notation string, with where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedElement {
    pub element: Element,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// `@clear`
    ClearBuffer,
    /// `@dest[=source]`
    BarCopy {
        destination: BarSpec,
        source: CopySource,
    },
    /// `[bar]|beat`. One element per entry of a comma-separated beat list.
    TimePosition { bar: Option<u32>, beat: BeatSpec },
    /// `p0.5`
    Probability(f64),
    /// `v80-120`
    VelocityRange { min: u8, max: u8 },
    /// `v100`
    Velocity(u8),
    /// `t0.5` or `t1:2`
    Duration(DurationSpec),
    /// `C3`, `F#-1`, `Bb2`
    Pitch(u8),
}

/// A bar or inclusive bar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarSpec {
    Single(u32),
    Range(u32, u32),
}

impl BarSpec {
    pub fn first(self) -> u32 {
        match self {
            BarSpec::Single(bar) | BarSpec::Range(bar, _) => bar,
        }
    }

    pub fn bars(self) -> std::ops::RangeInclusive<u32> {
        match self {
            BarSpec::Single(bar) => bar..=bar,
            BarSpec::Range(start, end) => start..=end,
        }
    }
}

/// Where a bar copy reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySource {
    /// No `=source` given: the bar before each destination.
    Previous,
    Bars(BarSpec),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeatSpec {
    Single(f64),
    Repeat(RepeatPattern),
}

/// `start x times [@ step]`. A missing step means "current duration".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatPattern {
    pub start: f64,
    pub times: u32,
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationSpec {
    Beats(f64),
    BarsBeats { bars: u32, beats: f64 },
}

impl DurationSpec {
    /// Duration in musical beats for the given bar length.
    pub fn to_beats(self, beats_per_bar: f64) -> f64 {
        match self {
            DurationSpec::Beats(beats) => beats,
            DurationSpec::BarsBeats { bars, beats } => {
                crate::time::bar_beat_duration_to_beats(bars, beats, beats_per_bar)
            }
        }
    }
}
