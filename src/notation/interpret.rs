//! Notation interpreter — turns parsed elements into note events.
//!
//! A single left-to-right pass. Parameter elements (`v`, `t`, `p`) update the
//! current defaults, pitches collect in a buffer, and each time position emits
//! every buffered pitch. Events are tracked per starting bar so `@` copies can
//! replay them elsewhere.

use std::collections::BTreeMap;
use std::fmt;

use super::ast::*;
use super::error::NotationError;
use super::parser::Parser;
use crate::config::Config;
use crate::note::{NoteEvent, DEFAULT_DURATION, DEFAULT_PROBABILITY, DEFAULT_VELOCITY};
use crate::scanner::Location;
use crate::time::{
    bar_beat_to_beats, bar_index_in_range, bar_start, beats_to_bar_beat, TimeSignature,
    TimingOptions,
};

/// A non-fatal observation about the notation text.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Pitches were buffered but never placed before a copy or clear reset the buffer.
    UnflushedPitches { count: usize, location: Location },
    /// A copy read from a bar that has no recorded notes.
    EmptySourceBar { bar: u32, location: Location },
    /// A copy would have written a bar onto itself.
    SelfCopySkipped { bar: u32, location: Location },
    /// A time position with nothing buffered to place.
    NoPitchesAtPosition { location: Location },
    /// A repeat pattern generated more positions than the configured soft limit.
    ExcessiveRepeat {
        positions: u32,
        threshold: usize,
        location: Location,
    },
    /// A parameter change that no placed note carries: nothing follows it, or a
    /// later change of the same parameter overwrote it first.
    UnusedParameterChange { location: Location },
    /// Pitches still buffered at the end of the text.
    PitchesNeverPlaced { count: usize, location: Location },
}

impl Advisory {
    pub fn location(&self) -> Location {
        match self {
            Advisory::UnflushedPitches { location, .. }
            | Advisory::EmptySourceBar { location, .. }
            | Advisory::SelfCopySkipped { location, .. }
            | Advisory::NoPitchesAtPosition { location }
            | Advisory::ExcessiveRepeat { location, .. }
            | Advisory::UnusedParameterChange { location }
            | Advisory::PitchesNeverPlaced { location, .. } => *location,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.location())?;
        match self {
            Advisory::UnflushedPitches { count, .. } => write!(
                f,
                "{count} buffered pitch(es) were never placed and are discarded"
            ),
            Advisory::EmptySourceBar { bar, .. } => {
                write!(f, "bar {bar} has no notes to copy")
            }
            Advisory::SelfCopySkipped { bar, .. } => {
                write!(f, "skipping copy of bar {bar} onto itself")
            }
            Advisory::NoPitchesAtPosition { .. } => {
                write!(f, "time position has no pitches to place")
            }
            Advisory::ExcessiveRepeat {
                positions,
                threshold,
                ..
            } => write!(
                f,
                "repeat pattern generates {positions} positions (more than {threshold})"
            ),
            Advisory::UnusedParameterChange { .. } => {
                write!(f, "parameter change has no effect on any placed note")
            }
            Advisory::PitchesNeverPlaced { count, .. } => {
                write!(f, "{count} pitch(es) buffered but no time position follows")
            }
        }
    }
}

/// The result of interpreting a notation string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    /// Events ordered by start time, in quarter-note beats.
    pub events: Vec<NoteEvent>,
    pub advisories: Vec<Advisory>,
}

/// Compiles notation text into note events for one time signature.
#[derive(Debug, Clone)]
pub struct Interpreter {
    signature: TimeSignature,
    config: Config,
}

impl Interpreter {
    pub fn new(options: &TimingOptions) -> Result<Self, NotationError> {
        Ok(Self {
            signature: options.resolve()?,
            config: Config::default(),
        })
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn signature(&self) -> TimeSignature {
        self.signature
    }

    /// Parse and interpret `source`. Fails without partial output.
    pub fn run(&self, source: &str) -> Result<Interpretation, NotationError> {
        let elements = Parser::new(source).parse()?;
        self.run_elements(&elements)
    }

    pub fn run_elements(&self, elements: &[ParsedElement]) -> Result<Interpretation, NotationError> {
        let mut state = State::new(self.signature.beats_per_bar(), &self.config);
        for parsed in elements {
            state.step(parsed)?;
        }
        let end = elements
            .last()
            .map(|p| p.location)
            .unwrap_or(Location::new(1, 1));
        state.finish(end);

        let State {
            events, advisories, ..
        } = state;

        let mut events: Vec<NoteEvent> = events
            .into_iter()
            .map(|e| NoteEvent {
                start_time: self.signature.musical_to_quarter(e.start_time),
                duration: self.signature.musical_to_quarter(e.duration),
                ..e
            })
            .collect();
        events = apply_deletions(events, self.config.deletion_tolerance);
        events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Ok(Interpretation { events, advisories })
    }
}

/// Interpret `source` with default configuration and return the events.
pub fn interpret_notation(
    source: &str,
    options: &TimingOptions,
) -> Result<Vec<NoteEvent>, NotationError> {
    Ok(Interpreter::new(options)?.run(source)?.events)
}

/// Parameters a pitch picks up when it is buffered.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NoteParams {
    velocity: f64,
    velocity_deviation: f64,
    duration: f64,
    probability: f64,
}

impl Default for NoteParams {
    fn default() -> Self {
        Self {
            velocity: DEFAULT_VELOCITY,
            velocity_deviation: 0.0,
            duration: DEFAULT_DURATION,
            probability: DEFAULT_PROBABILITY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ParamChange {
    Velocity { velocity: f64, deviation: f64 },
    Duration(f64),
    Probability(f64),
}

impl ParamChange {
    /// Index of the parameter this change writes.
    fn slot(self) -> usize {
        match self {
            ParamChange::Velocity { .. } => 0,
            ParamChange::Duration(_) => 1,
            ParamChange::Probability(_) => 2,
        }
    }

    fn apply(self, params: &mut NoteParams) {
        match self {
            ParamChange::Velocity {
                velocity,
                deviation,
            } => {
                params.velocity = velocity;
                params.velocity_deviation = deviation;
            }
            ParamChange::Duration(duration) => params.duration = duration,
            ParamChange::Probability(probability) => params.probability = probability,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingPitch {
    pitch: u8,
    params: NoteParams,
}

/// Where the pitch buffer stands between elements.
#[derive(Debug)]
enum PitchBuffer {
    /// Nothing buffered. Holds the location of a parameter change no pitch has picked up yet.
    Idle { unused_change: Option<Location> },
    /// A pitch group still waiting for its first time position.
    Collecting {
        pitches: Vec<PendingPitch>,
        started: Location,
    },
    /// A group that has been placed at least once; more positions re-place it,
    /// a new pitch starts a fresh group.
    Placed {
        pitches: Vec<PendingPitch>,
        changed_since: Option<Location>,
    },
}

struct State<'c> {
    beats_per_bar: f64,
    config: &'c Config,
    params: NoteParams,
    /// Last explicitly written bar number.
    current_bar: Option<u32>,
    buffer: PitchBuffer,
    /// Per parameter, the last change no placed note has carried yet.
    unplaced_changes: [Option<Location>; 3],
    /// Events by the bar they start in, in musical beats.
    notes_by_bar: BTreeMap<u32, Vec<NoteEvent>>,
    /// Output events, in musical beats.
    events: Vec<NoteEvent>,
    advisories: Vec<Advisory>,
}

impl<'c> State<'c> {
    fn new(beats_per_bar: f64, config: &'c Config) -> Self {
        Self {
            beats_per_bar,
            config,
            params: NoteParams::default(),
            current_bar: None,
            buffer: PitchBuffer::Idle {
                unused_change: None,
            },
            unplaced_changes: [None; 3],
            notes_by_bar: BTreeMap::new(),
            events: Vec::new(),
            advisories: Vec::new(),
        }
    }

    fn step(&mut self, parsed: &ParsedElement) -> Result<(), NotationError> {
        let location = parsed.location;
        match &parsed.element {
            Element::Pitch(pitch) => self.add_pitch(*pitch, location),
            Element::Velocity(v) => self.change(
                ParamChange::Velocity {
                    velocity: *v as f64,
                    deviation: 0.0,
                },
                location,
            ),
            Element::VelocityRange { min, max } => self.change(
                ParamChange::Velocity {
                    velocity: *min as f64,
                    deviation: (*max - *min) as f64,
                },
                location,
            ),
            Element::Duration(spec) => {
                self.change(ParamChange::Duration(spec.to_beats(self.beats_per_bar)), location)
            }
            Element::Probability(p) => self.change(ParamChange::Probability(*p), location),
            Element::TimePosition { bar, beat } => self.place(*bar, *beat, location)?,
            Element::BarCopy {
                destination,
                source,
            } => self.copy_bars(*destination, *source, location)?,
            Element::ClearBuffer => {
                self.reset_buffer(location);
                self.notes_by_bar.clear();
            }
        }
        Ok(())
    }

    fn add_pitch(&mut self, pitch: u8, location: Location) {
        let pending = PendingPitch {
            pitch,
            params: self.params,
        };
        match &mut self.buffer {
            PitchBuffer::Collecting { pitches, .. } => pitches.push(pending),
            PitchBuffer::Idle { .. } | PitchBuffer::Placed { .. } => {
                self.buffer = PitchBuffer::Collecting {
                    pitches: vec![pending],
                    started: location,
                };
            }
        }
    }

    /// Update the current defaults and late-bind the change onto buffered pitches.
    fn change(&mut self, change: ParamChange, location: Location) {
        change.apply(&mut self.params);
        // Buffered pitches late-bind, so an unplaced change of the same kind is overwritten.
        if let Some(superseded) = self.unplaced_changes[change.slot()].replace(location) {
            self.advise(Advisory::UnusedParameterChange {
                location: superseded,
            });
        }
        match &mut self.buffer {
            PitchBuffer::Idle { unused_change } => *unused_change = Some(location),
            PitchBuffer::Collecting { pitches, .. } => {
                pitches.iter_mut().for_each(|p| change.apply(&mut p.params));
            }
            PitchBuffer::Placed {
                pitches,
                changed_since,
            } => {
                pitches.iter_mut().for_each(|p| change.apply(&mut p.params));
                *changed_since = Some(location);
            }
        }
    }

    fn place(
        &mut self,
        bar: Option<u32>,
        beat: BeatSpec,
        location: Location,
    ) -> Result<(), NotationError> {
        if bar.is_some() {
            self.current_bar = bar;
        }
        let bar = self.current_bar.unwrap_or(1);

        let beats: Vec<f64> = match beat {
            BeatSpec::Single(beat) => vec![beat],
            BeatSpec::Repeat(pattern) => {
                let step = pattern.step.unwrap_or(self.params.duration);
                if step == 0.0 {
                    return Err(NotationError::domain("repeat step resolves to 0", location));
                }
                if pattern.times as usize > self.config.repeat_warning_threshold {
                    self.advise(Advisory::ExcessiveRepeat {
                        positions: pattern.times,
                        threshold: self.config.repeat_warning_threshold,
                        location,
                    });
                }
                (0..pattern.times)
                    .map(|i| pattern.start + i as f64 * step)
                    .collect()
            }
        };

        let pitches = match &self.buffer {
            PitchBuffer::Idle { .. } => {
                self.advise(Advisory::NoPitchesAtPosition { location });
                return Ok(());
            }
            PitchBuffer::Collecting { pitches, .. } | PitchBuffer::Placed { pitches, .. } => {
                pitches.clone()
            }
        };

        for beat in beats {
            let start = bar_beat_to_beats(bar, beat, self.beats_per_bar);
            if !bar_index_in_range(start, self.beats_per_bar) {
                return Err(NotationError::domain(
                    format!("beat {beat} of bar {bar} lies past the last representable bar"),
                    location,
                ));
            }
            for pending in &pitches {
                self.emit(NoteEvent {
                    pitch: pending.pitch,
                    start_time: start,
                    duration: pending.params.duration,
                    velocity: pending.params.velocity,
                    probability: pending.params.probability,
                    velocity_deviation: pending.params.velocity_deviation,
                });
            }
        }

        self.buffer = PitchBuffer::Placed {
            pitches,
            changed_since: None,
        };
        self.unplaced_changes = [None; 3];
        Ok(())
    }

    fn emit(&mut self, event: NoteEvent) {
        let (bar, _) = beats_to_bar_beat(event.start_time, self.beats_per_bar);
        self.notes_by_bar.entry(bar).or_default().push(event);
        self.events.push(event);
    }

    fn copy_bars(
        &mut self,
        destination: BarSpec,
        source: CopySource,
        location: Location,
    ) -> Result<(), NotationError> {
        self.reset_buffer(location);

        let pairs: Vec<(u32, u32)> = match (source, destination) {
            (CopySource::Previous, dest) => {
                if dest.first() == 1 {
                    return Err(NotationError::domain(
                        "bar 1 has no previous bar to copy from",
                        location,
                    ));
                }
                dest.bars().map(|d| (d - 1, d)).collect()
            }
            (CopySource::Bars(BarSpec::Single(src)), dest) => {
                dest.bars().map(|d| (src, d)).collect()
            }
            (CopySource::Bars(BarSpec::Range(first, last)), BarSpec::Single(dest)) => (first
                ..=last)
                .enumerate()
                .map(|(i, src)| {
                    let target = u32::try_from(i).ok().and_then(|i| dest.checked_add(i));
                    target.map(|d| (src, d)).ok_or_else(|| {
                        NotationError::domain(
                            format!("destination bar out of range copying bars {first}-{last} to bar {dest}"),
                            location,
                        )
                    })
                })
                .collect::<Result<_, _>>()?,
            (CopySource::Bars(BarSpec::Range(first, last)), BarSpec::Range(start, end)) => {
                let len = last - first + 1;
                (start..=end)
                    .enumerate()
                    .map(|(i, dest)| (first + i as u32 % len, dest))
                    .collect()
            }
        };

        for (src, dest) in pairs {
            if src == dest {
                self.advise(Advisory::SelfCopySkipped { bar: src, location });
                continue;
            }
            let notes = match self.notes_by_bar.get(&src) {
                Some(notes) if !notes.is_empty() => notes.clone(),
                _ => {
                    self.advise(Advisory::EmptySourceBar { bar: src, location });
                    continue;
                }
            };
            let offset = bar_start(dest, self.beats_per_bar) - bar_start(src, self.beats_per_bar);
            tracing::debug!("copying {} note(s) from bar {src} to bar {dest}", notes.len());
            for note in notes {
                self.emit(NoteEvent {
                    start_time: note.start_time + offset,
                    ..note
                });
            }
        }
        Ok(())
    }

    /// Drop the pitch buffer, warning if it held pitches that were never placed.
    fn reset_buffer(&mut self, location: Location) {
        let unused_change = match std::mem::replace(
            &mut self.buffer,
            PitchBuffer::Idle {
                unused_change: None,
            },
        ) {
            PitchBuffer::Collecting { pitches, .. } => {
                self.advise(Advisory::UnflushedPitches {
                    count: pitches.len(),
                    location,
                });
                None
            }
            PitchBuffer::Placed { changed_since, .. } => changed_since,
            PitchBuffer::Idle { unused_change } => unused_change,
        };
        self.buffer = PitchBuffer::Idle { unused_change };
    }

    fn finish(&mut self, end: Location) {
        match &self.buffer {
            PitchBuffer::Collecting { pitches, started } => {
                let advisory = Advisory::PitchesNeverPlaced {
                    count: pitches.len(),
                    location: *started,
                };
                self.advise(advisory);
            }
            PitchBuffer::Placed {
                changed_since: Some(location),
                ..
            }
            | PitchBuffer::Idle {
                unused_change: Some(location),
            } => {
                let location = *location;
                self.advise(Advisory::UnusedParameterChange { location });
            }
            _ => {}
        }
        tracing::debug!(
            "interpreted {} event(s) ending at {end}",
            self.events.len()
        );
    }

    fn advise(&mut self, advisory: Advisory) {
        tracing::warn!("{advisory}");
        self.advisories.push(advisory);
    }
}

/// Apply the `v0` rule: a zero-velocity event deletes the nearest earlier event
/// of the same pitch starting within `tolerance` beats, and is itself dropped.
fn apply_deletions(events: Vec<NoteEvent>, tolerance: f64) -> Vec<NoteEvent> {
    let mut kept: Vec<Option<NoteEvent>> = Vec::with_capacity(events.len());
    for event in events {
        if event.velocity != 0.0 {
            kept.push(Some(event));
            continue;
        }
        let target = kept.iter_mut().rev().find(|slot| {
            slot.is_some_and(|n| {
                n.pitch == event.pitch && (n.start_time - event.start_time).abs() <= tolerance
            })
        });
        if let Some(slot) = target {
            *slot = None;
        }
    }
    kept.into_iter().flatten().collect()
}
