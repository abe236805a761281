//! Musical time conversions.
//!
//! Notation positions are 1-based `bar|beat` pairs over *musical* beats, where
//! a bar holds `numerator` beats. Note events store time in quarter-note beats,
//! so a musical beat is `4 / denominator` quarter notes long.

use serde::{Deserialize, Serialize};

use crate::notation::error::NotationError;

/// Default time signature: 4/4.
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Tolerance used when comparing beat positions.
pub const BEAT_EPSILON: f64 = 1e-3;

/// A time signature with a numerator (beats per bar) and denominator (beat unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, NotationError> {
        if numerator == 0 || denominator == 0 {
            return Err(NotationError::domain_unlocated(format!(
                "invalid time signature {numerator}/{denominator}: numerator and denominator must be positive"
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Beats per bar in musical beats.
    pub fn beats_per_bar(self) -> f64 {
        self.numerator as f64
    }

    /// How many quarter notes one musical beat spans.
    pub fn quarter_notes_per_beat(self) -> f64 {
        4.0 / self.denominator as f64
    }

    pub fn musical_to_quarter(self, beats: f64) -> f64 {
        beats * self.quarter_notes_per_beat()
    }

    pub fn quarter_to_musical(self, quarters: f64) -> f64 {
        quarters / self.quarter_notes_per_beat()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

/// Timing options accepted by the notation entry points.
///
/// Either `beats_per_bar` alone, or `time_sig_numerator` + `time_sig_denominator`.
/// With only `beats_per_bar`, a musical beat is one quarter note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingOptions {
    #[serde(default)]
    pub beats_per_bar: Option<u32>,
    #[serde(default)]
    pub time_sig_numerator: Option<u32>,
    #[serde(default)]
    pub time_sig_denominator: Option<u32>,
}

impl TimingOptions {
    pub fn beats_per_bar(beats_per_bar: u32) -> Self {
        Self {
            beats_per_bar: Some(beats_per_bar),
            ..Self::default()
        }
    }

    pub fn time_signature(numerator: u32, denominator: u32) -> Self {
        Self {
            time_sig_numerator: Some(numerator),
            time_sig_denominator: Some(denominator),
            ..Self::default()
        }
    }

    /// Resolve the options into a single time signature.
    pub fn resolve(&self) -> Result<TimeSignature, NotationError> {
        match (
            self.beats_per_bar,
            self.time_sig_numerator,
            self.time_sig_denominator,
        ) {
            (None, None, None) => Ok(TimeSignature::COMMON),
            (Some(bpb), None, None) => TimeSignature::new(bpb, 4),
            (bpb, Some(num), Some(den)) => {
                if let Some(bpb) = bpb {
                    if bpb != num {
                        return Err(NotationError::domain_unlocated(format!(
                            "beatsPerBar {bpb} contradicts time signature {num}/{den}"
                        )));
                    }
                }
                TimeSignature::new(num, den)
            }
            (_, Some(num), None) => Err(NotationError::domain_unlocated(format!(
                "time signature numerator {num} given without a denominator"
            ))),
            (_, None, Some(den)) => Err(NotationError::domain_unlocated(format!(
                "time signature denominator {den} given without a numerator"
            ))),
        }
    }
}

/// Convert a 1-based `bar|beat` position to a linear musical beat offset.
pub fn bar_beat_to_beats(bar: u32, beat: f64, beats_per_bar: f64) -> f64 {
    (bar as f64 - 1.0) * beats_per_bar + (beat - 1.0)
}

/// Convert a linear musical beat offset back to a 1-based `bar|beat` position.
///
/// Negative offsets clamp to `1|1`.
pub fn beats_to_bar_beat(beats: f64, beats_per_bar: f64) -> (u32, f64) {
    let beats = beats.max(0.0);
    let mut bar_index = (beats / beats_per_bar).floor();
    let mut within = beats - bar_index * beats_per_bar;
    // Absorb float noise like 7.9999999 landing just short of a bar line.
    if beats_per_bar - within < 1e-9 {
        bar_index += 1.0;
        within = 0.0;
    }
    // Saturates at the last representable bar.
    ((bar_index as u32).saturating_add(1), within + 1.0)
}

/// Whether a linear musical beat offset lands in a bar numbered within `u32`.
pub fn bar_index_in_range(beats: f64, beats_per_bar: f64) -> bool {
    (beats.max(0.0) / beats_per_bar).floor() < u32::MAX as f64
}

/// Start offset of a 1-based bar in musical beats.
pub fn bar_start(bar: u32, beats_per_bar: f64) -> f64 {
    (bar as f64 - 1.0) * beats_per_bar
}

/// Convert a `bars:beats` duration to musical beats.
pub fn bar_beat_duration_to_beats(bars: u32, beats: f64, beats_per_bar: f64) -> f64 {
    bars as f64 * beats_per_bar + beats
}
