//! Applying a modulation program to a batch of notes.

use rand::Rng;
use tracing::{debug, warn};

use super::ast::{Assignment, ModulationProgram, Operator, Parameter, PitchRange};
use super::error::{EvalError, ModulationError};
use super::eval::{evaluate, NoteContext};
use crate::note::{NoteEvent, MAX_VELOCITY};
use crate::time::TimeSignature;

/// Durations never drop below this many beats.
pub const MIN_DURATION: f64 = 0.001;

/// What one `apply_modulations` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulationReport {
    /// Notes with at least one changed field.
    pub notes_modified: usize,
    /// Assignment evaluations that failed and were skipped.
    pub evaluation_failures: usize,
    /// Set when the text did not parse; no note was touched.
    pub parse_error: Option<ModulationError>,
}

/// Apply `text` to `notes` in place, drawing `noise()` from the thread RNG.
///
/// Does nothing for empty text, an empty note list, an invalid time
/// signature or text that fails to parse.
pub fn apply_modulations(
    notes: &mut [NoteEvent],
    text: &str,
    time_sig_numerator: u32,
    time_sig_denominator: u32,
) -> ModulationReport {
    apply_modulations_with_rng(
        notes,
        text,
        time_sig_numerator,
        time_sig_denominator,
        &mut rand::thread_rng(),
    )
}

/// [`apply_modulations`] with a caller-supplied random source.
pub fn apply_modulations_with_rng<R: Rng + ?Sized>(
    notes: &mut [NoteEvent],
    text: &str,
    time_sig_numerator: u32,
    time_sig_denominator: u32,
    rng: &mut R,
) -> ModulationReport {
    if text.trim().is_empty() || notes.is_empty() {
        return ModulationReport::default();
    }

    let signature = match TimeSignature::new(time_sig_numerator, time_sig_denominator) {
        Ok(signature) => signature,
        Err(e) => {
            warn!("modulation skipped: {e}");
            return ModulationReport::default();
        }
    };

    let program = match ModulationProgram::parse(text) {
        Ok(program) => program,
        Err(e) => {
            warn!("modulation skipped, notes left unchanged: {e}");
            return ModulationReport {
                parse_error: Some(e),
                ..ModulationReport::default()
            };
        }
    };

    program.apply(notes, signature, rng)
}

#[derive(Debug, Clone, Copy)]
struct Edit {
    operator: Operator,
    value: f64,
}

impl Edit {
    fn resolve(self, current: f64) -> f64 {
        match self.operator {
            Operator::Set => self.value,
            Operator::Add => current + self.value,
        }
    }
}

/// The winning edit per parameter for one note.
#[derive(Debug, Default)]
struct Edits {
    velocity: Option<Edit>,
    timing: Option<Edit>,
    duration: Option<Edit>,
    probability: Option<Edit>,
}

impl Edits {
    fn slot(&mut self, parameter: Parameter) -> &mut Option<Edit> {
        match parameter {
            Parameter::Velocity => &mut self.velocity,
            Parameter::Timing => &mut self.timing,
            Parameter::Duration => &mut self.duration,
            Parameter::Probability => &mut self.probability,
        }
    }

    fn apply_to(&self, note: &mut NoteEvent) {
        if let Some(edit) = self.velocity {
            note.velocity = edit.resolve(note.velocity).clamp(1.0, MAX_VELOCITY);
        }
        if let Some(edit) = self.timing {
            note.start_time = edit.resolve(note.start_time);
        }
        if let Some(edit) = self.duration {
            note.duration = edit.resolve(note.duration).max(MIN_DURATION);
        }
        if let Some(edit) = self.probability {
            note.probability = edit.resolve(note.probability).clamp(0.0, 1.0);
        }
    }
}

impl ModulationProgram {
    /// Run every assignment against every note and write the results back.
    ///
    /// All notes are evaluated against their original values. Per note and
    /// parameter only the last assignment that evaluated successfully counts.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        notes: &mut [NoteEvent],
        signature: TimeSignature,
        rng: &mut R,
    ) -> ModulationReport {
        let mut report = ModulationReport::default();
        if self.assignments.is_empty() {
            return report;
        }

        let clip_end = notes
            .iter()
            .map(NoteEvent::end_time)
            .fold(0.0_f64, f64::max);
        let clip = (0.0, signature.quarter_to_musical(clip_end));
        let beats_per_bar = signature.beats_per_bar();

        for note in notes.iter_mut() {
            let mut edits = Edits::default();
            {
                let ctx = NoteContext::new(note, signature);
                let mut active: Option<PitchRange> = None;

                for assignment in &self.assignments {
                    // A range carries over to later assignments that declare none.
                    active = assignment.pitch_range.or(active);
                    if active.is_some_and(|range| !range.contains(note.pitch)) {
                        continue;
                    }

                    let span = match assignment.time_range {
                        Some(range) => {
                            if !range.contains(ctx.position, beats_per_bar) {
                                continue;
                            }
                            let (start, end) = range.span(beats_per_bar);
                            (start, end - start)
                        }
                        None => clip,
                    };

                    match evaluate(&assignment.expression, &ctx, span, rng) {
                        Ok(value) => {
                            *edits.slot(assignment.parameter) = Some(Edit {
                                operator: assignment.operator,
                                value,
                            });
                        }
                        Err(e) => {
                            report.evaluation_failures += 1;
                            log_failure(assignment, &ctx, &e);
                        }
                    }
                }
            }

            let before = *note;
            edits.apply_to(note);
            if *note != before {
                report.notes_modified += 1;
            }
        }

        debug!(
            notes = notes.len(),
            modified = report.notes_modified,
            failures = report.evaluation_failures,
            "modulation applied"
        );
        report
    }
}

fn log_failure(assignment: &Assignment, ctx: &NoteContext<'_>, error: &EvalError) {
    warn!(
        "[{}] {} assignment skipped for note {} at {}|{}: {error}",
        assignment.location, assignment.parameter, ctx.note.pitch, ctx.bar, ctx.beat
    );
}
