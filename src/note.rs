//! Note events and pitch names.
//!
//! Pitch names follow the `C3 = 60` convention: `MIDI = (octave + 2) * 12 + class`.
//! So `C-2` is MIDI 0 and `G8` is MIDI 127.

use serde::{Deserialize, Serialize};

/// Default velocity for notes with no `v` element in effect.
pub const DEFAULT_VELOCITY: f64 = 100.0;
/// Default duration in musical beats.
pub const DEFAULT_DURATION: f64 = 1.0;
/// Default probability.
pub const DEFAULT_PROBABILITY: f64 = 1.0;

pub const MAX_PITCH: i32 = 127;
pub const MAX_VELOCITY: f64 = 127.0;

/// Semitone offsets for the natural pitch classes.
const PITCH_CLASSES: [(char, i32); 7] = [
    ('C', 0),
    ('D', 2),
    ('E', 4),
    ('F', 5),
    ('G', 7),
    ('A', 9),
    ('B', 11),
];

/// Names used when writing pitches back out.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single timed note, as handed to the host environment.
///
/// `start_time` and `duration` are in quarter-note beats, relative to the clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: f64,
    #[serde(default = "default_probability")]
    pub probability: f64,
    #[serde(default)]
    pub velocity_deviation: f64,
}

fn default_probability() -> f64 {
    DEFAULT_PROBABILITY
}

impl NoteEvent {
    /// A note with default velocity, probability and no deviation.
    pub fn new(pitch: u8, start_time: f64, duration: f64) -> Self {
        Self {
            pitch,
            start_time,
            duration,
            velocity: DEFAULT_VELOCITY,
            probability: DEFAULT_PROBABILITY,
            velocity_deviation: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Semitone value of a pitch-class letter plus accidental, or `None` for a bad letter.
pub fn pitch_class_value(letter: char, accidental: Option<char>) -> Option<i32> {
    let base = PITCH_CLASSES
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|(_, v)| *v)?;
    match accidental {
        None => Some(base),
        Some('#') => Some(base + 1),
        Some('b') => Some(base - 1),
        Some(_) => None,
    }
}

/// MIDI number for a pitch class and octave. Not range checked.
pub fn midi_from_parts(class_value: i32, octave: i32) -> i32 {
    (octave + 2) * 12 + class_value
}

/// Parse a note name string into a MIDI note number.
///
/// Format: `<letter><optional accidental><octave>`, octave may be negative.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars().peekable();
    let letter = chars.next()?;
    let accidental = match chars.peek() {
        Some('#') | Some('b') => chars.next(),
        _ => None,
    };
    let class = pitch_class_value(letter, accidental)?;
    let octave: i32 = chars.collect::<String>().parse().ok()?;
    let midi = midi_from_parts(class, octave);
    if (0..=MAX_PITCH).contains(&midi) {
        Some(midi as u8)
    } else {
        None
    }
}

/// Write a MIDI note number as a pitch name, using sharps.
pub fn note_name(pitch: u8) -> String {
    let octave = pitch as i32 / 12 - 2;
    format!("{}{}", SHARP_NAMES[pitch as usize % 12], octave)
}
