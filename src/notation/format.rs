//! Note events → notation text.
//!
//! Notes are sorted by start and pitch. Simultaneous notes that share
//! parameters are written as one chord, and `v`/`t`/`p` are written only when
//! they differ from what is already in effect. Reading the output back with
//! the interpreter reproduces the events (velocity rounded to an integer).
//! Notes the text cannot express are rejected: starts before `1|1` or past the
//! last bar, velocities that would read back as `v0`, and non-positive
//! durations. Durations shorter than the written precision are lengthened to
//! the smallest writable value.

use super::error::NotationError;
use crate::note::{note_name, NoteEvent, DEFAULT_DURATION, DEFAULT_PROBABILITY, DEFAULT_VELOCITY};
use crate::time::{bar_index_in_range, beats_to_bar_beat, TimingOptions};

/// Decimal places kept for beats, durations and probabilities.
const PRECISION: f64 = 1e6;

/// Shortest duration that survives the written precision.
const MIN_DURATION: f64 = 1.0 / PRECISION;

pub fn format_notation(notes: &[NoteEvent], options: &TimingOptions) -> Result<String, NotationError> {
    let signature = options.resolve()?;
    let beats_per_bar = signature.beats_per_bar();

    for note in notes {
        check_writable(note, signature.quarter_to_musical(note.start_time), beats_per_bar)?;
    }

    let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
    sorted.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.pitch.cmp(&b.pitch))
    });

    let mut velocity = velocity_token(DEFAULT_VELOCITY, 0.0);
    let mut duration = format_number(DEFAULT_DURATION);
    let mut probability = format_number(DEFAULT_PROBABILITY);
    let mut last_bar: Option<u32> = None;
    let mut lines: Vec<String> = Vec::new();
    let mut line: Vec<String> = Vec::new();

    let mut i = 0;
    while i < sorted.len() {
        let first = sorted[i];
        let start = signature.quarter_to_musical(first.start_time);
        let group = NoteGroup::of(first, signature.quarter_to_musical(first.duration));

        let mut j = i + 1;
        while j < sorted.len()
            && (signature.quarter_to_musical(sorted[j].start_time) - start).abs() < 1.0 / PRECISION
            && NoteGroup::of(sorted[j], signature.quarter_to_musical(sorted[j].duration)) == group
        {
            j += 1;
        }

        let (bar, beat) = beats_to_bar_beat(start, beats_per_bar);
        if last_bar.is_some_and(|b| b != bar) && !line.is_empty() {
            lines.push(line.join(" "));
            line.clear();
        }

        if group.velocity != velocity {
            line.push(group.velocity.clone());
            velocity = group.velocity.clone();
        }
        if group.duration != duration {
            line.push(format!("t{}", group.duration));
            duration = group.duration.clone();
        }
        if group.probability != probability {
            line.push(format!("p{}", group.probability));
            probability = group.probability.clone();
        }
        line.extend(sorted[i..j].iter().map(|n| note_name(n.pitch)));

        let beat = format_number(beat);
        if last_bar == Some(bar) {
            line.push(format!("|{beat}"));
        } else {
            line.push(format!("{bar}|{beat}"));
        }
        last_bar = Some(bar);
        i = j;
    }

    if !line.is_empty() {
        lines.push(line.join(" "));
    }
    Ok(lines.join("\n"))
}

fn check_writable(note: &NoteEvent, start: f64, beats_per_bar: f64) -> Result<(), NotationError> {
    let name = note_name(note.pitch);
    if !start.is_finite() || start < -0.5 / PRECISION {
        return Err(NotationError::domain_unlocated(format!(
            "note {name} starts before the first bar ({})",
            note.start_time
        )));
    }
    if !bar_index_in_range(start, beats_per_bar) {
        return Err(NotationError::domain_unlocated(format!(
            "note {name} starts past the last representable bar ({})",
            note.start_time
        )));
    }
    if !note.duration.is_finite() || note.duration <= 0.0 {
        return Err(NotationError::domain_unlocated(format!(
            "note {name} at {} has non-positive duration {}",
            note.start_time, note.duration
        )));
    }
    // v0 reads back as a deletion.
    if note.velocity.is_nan() || note.velocity.round() < 1.0 {
        return Err(NotationError::domain_unlocated(format!(
            "note {name} at {} has velocity {}, which would read back as a deletion",
            note.start_time, note.velocity
        )));
    }
    Ok(())
}

/// The written parameters of a note, compared as text so rounding matches.
#[derive(Debug, PartialEq)]
struct NoteGroup {
    velocity: String,
    duration: String,
    probability: String,
}

impl NoteGroup {
    fn of(note: &NoteEvent, musical_duration: f64) -> Self {
        Self {
            velocity: velocity_token(note.velocity, note.velocity_deviation),
            duration: format_number(musical_duration.max(MIN_DURATION)),
            probability: format_number(note.probability.clamp(0.0, 1.0)),
        }
    }
}

fn velocity_token(velocity: f64, deviation: f64) -> String {
    let min = velocity.round().clamp(0.0, 127.0) as u8;
    let max = (velocity + deviation).round().clamp(min as f64, 127.0) as u8;
    if max > min {
        format!("v{min}-{max}")
    } else {
        format!("v{min}")
    }
}

/// Shortest decimal form with at most six fractional digits.
fn format_number(value: f64) -> String {
    let rounded = (value * PRECISION).round() / PRECISION;
    let text = format!("{rounded:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
