//! Notation round-trip tests — events → text → events reproduces the events.

use assert_approx_eq::assert_approx_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use barbeat::notation::{Advisory, Interpreter};
use barbeat::{format_notation, interpret_notation, NotationError, NoteEvent, TimingOptions};

fn four_four() -> TimingOptions {
    TimingOptions::beats_per_bar(4)
}

fn sorted(mut notes: Vec<NoteEvent>) -> Vec<NoteEvent> {
    notes.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.duration.total_cmp(&b.duration))
            .then(a.velocity.total_cmp(&b.velocity))
            .then(a.probability.total_cmp(&b.probability))
            .then(a.velocity_deviation.total_cmp(&b.velocity_deviation))
    });
    notes
}

fn assert_equivalent(expected: &[NoteEvent], actual: &[NoteEvent]) {
    let expected = sorted(expected.to_vec());
    let actual = sorted(actual.to_vec());
    assert_eq!(expected.len(), actual.len(), "{expected:?}\n{actual:?}");
    for (e, a) in expected.iter().zip(&actual) {
        assert_eq!(e.pitch, a.pitch);
        assert_approx_eq!(e.start_time, a.start_time, 0.001);
        assert_approx_eq!(e.duration, a.duration, 0.001);
        assert_eq!(e.velocity.round(), a.velocity.round());
        assert_approx_eq!(e.probability, a.probability, 0.001);
        assert_eq!(e.velocity_deviation.round(), a.velocity_deviation.round());
    }
}

fn round_trip(notes: &[NoteEvent], options: &TimingOptions) -> Vec<NoteEvent> {
    let text = format_notation(notes, options).unwrap();
    interpret_notation(&text, options)
        .unwrap_or_else(|e| panic!("formatted text failed to compile: {e}\n{text}"))
}

/// A hand-written groove survives the trip.
#[test]
fn groove_round_trips() {
    let notes = vec![
        NoteEvent::new(36, 0.0, 0.5).with_velocity(120.0),
        NoteEvent::new(42, 0.0, 0.25).with_velocity(70.0),
        NoteEvent::new(42, 0.5, 0.25).with_velocity(70.0),
        NoteEvent::new(38, 1.0, 0.5),
        NoteEvent::new(42, 1.5, 0.25).with_probability(0.5),
        NoteEvent::new(36, 4.75, 0.25).with_velocity(90.0),
        NoteEvent::new(60, 6.0, 2.0),
        NoteEvent::new(64, 6.0, 2.0),
        NoteEvent::new(67, 6.0, 2.0),
    ];
    assert_equivalent(&notes, &round_trip(&notes, &four_four()));
}

/// Randomly generated sequences round-trip, including velocity ranges,
/// exact duplicates, third-beat starts and durations below the written precision.
#[test]
fn random_sequences_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..50 {
        let count = rng.gen_range(1..24);
        let mut notes: Vec<NoteEvent> = Vec::with_capacity(count);
        for _ in 0..count {
            if !notes.is_empty() && rng.gen_bool(0.1) {
                let copy = notes[rng.gen_range(0..notes.len())].clone();
                notes.push(copy);
                continue;
            }
            let start = if rng.gen_bool(0.2) {
                rng.gen_range(0..48) as f64 / 3.0
            } else {
                rng.gen_range(0..64) as f64 * 0.25
            };
            let duration = if rng.gen_bool(0.1) {
                1e-9
            } else {
                rng.gen_range(1..8) as f64 * 0.25
            };
            let mut note = NoteEvent::new(rng.gen_range(24..=96), start, duration)
                .with_velocity(rng.gen_range(1..=127) as f64)
                .with_probability(rng.gen_range(0..=4) as f64 * 0.25);
            if rng.gen_bool(0.2) {
                let spread = rng.gen_range(0..=(127 - note.velocity as u32)) as f64;
                note.velocity_deviation = spread;
            }
            notes.push(note);
        }
        assert_equivalent(&notes, &round_trip(&notes, &four_four()));
    }
}

#[test]
fn duplicate_notes_are_kept() {
    let notes = vec![NoteEvent::new(60, 0.0, 1.0), NoteEvent::new(60, 0.0, 1.0)];
    let text = format_notation(&notes, &four_four()).unwrap();
    assert_eq!(text, "C3 C3 1|1");
    assert_equivalent(&notes, &round_trip(&notes, &four_four()));
}

#[test]
fn sub_precision_duration_round_trips() {
    let notes = vec![NoteEvent::new(60, 0.0, 1e-9), NoteEvent::new(62, 1.0, 4e-7)];
    assert_equivalent(&notes, &round_trip(&notes, &four_four()));
}

#[test]
fn unwritable_notes_are_domain_errors() {
    let zero_velocity = vec![
        NoteEvent::new(60, 0.0, 1.0).with_velocity(0.0),
        NoteEvent::new(62, 1.0, 1.0),
    ];
    let before_clip = vec![NoteEvent::new(60, -0.5, 1.0)];
    for notes in [zero_velocity, before_clip] {
        let err = format_notation(&notes, &four_four()).unwrap_err();
        assert!(matches!(err, NotationError::Domain { .. }), "{err}");
    }
}

/// Odd meters convert through musical beats both ways.
#[test]
fn compound_meter_round_trips() {
    let options = TimingOptions::time_signature(6, 8);
    let notes = vec![
        NoteEvent::new(60, 0.0, 0.5),
        NoteEvent::new(62, 1.5, 0.5),
        NoteEvent::new(64, 3.0, 1.5),
        NoteEvent::new(65, 4.5, 0.5),
    ];
    let text = format_notation(&notes, &options).unwrap();
    assert!(text.contains("2|1"), "{text}");
    assert_equivalent(&notes, &interpret_notation(&text, &options).unwrap());
}

#[test]
fn single_note_defaults() {
    let events = interpret_notation("C3 1|1", &four_four()).unwrap();
    assert_eq!(events, vec![NoteEvent::new(60, 0.0, 1.0)]);
}

#[test]
fn repeat_places_four_hits() {
    let events = interpret_notation("t1 C1 1|1x4", &four_four()).unwrap();
    let starts: Vec<f64> = events.iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0]);
    assert!(events.iter().all(|e| e.pitch == 36 && e.duration == 1.0));
}

#[test]
fn v0_deletes_earlier_note() {
    let events = interpret_notation("C3 D3 1|1 v0 C3 1|1", &four_four()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pitch, 62);
    assert_eq!(events[0].start_time, 0.0);
}

#[test]
fn bar_copy_merges() {
    let events = interpret_notation("C1 1|1 @2=1 D1 2|1", &four_four()).unwrap();
    let mut placed: Vec<(u8, f64)> = events.iter().map(|e| (e.pitch, e.start_time)).collect();
    placed.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    assert_eq!(placed, vec![(36, 0.0), (36, 4.0), (38, 4.0)]);
}

#[test]
fn velocity_out_of_range_is_domain_error() {
    let err = interpret_notation("v200 C3 1|1", &four_four()).unwrap_err();
    assert!(matches!(err, NotationError::Domain { .. }));
    assert!(err.to_string().contains("0-127"));
}

#[test]
fn grammar_error_has_position() {
    let err = interpret_notation("C3 1|1\nC3 |", &four_four()).unwrap_err();
    assert!(err.is_grammar());
    assert_eq!(err.location().map(|l| l.line), Some(2));
}

#[test]
fn empty_input_yields_nothing() {
    assert!(interpret_notation("", &four_four()).unwrap().is_empty());
    assert_eq!(format_notation(&[], &four_four()).unwrap(), "");
}

#[test]
fn advisories_are_reported_not_fatal() {
    let result = Interpreter::new(&four_four())
        .unwrap()
        .run("C3 1|1 @1=1 E3")
        .unwrap();
    assert_eq!(result.events.len(), 1);
    assert!(result
        .advisories
        .iter()
        .any(|a| matches!(a, Advisory::SelfCopySkipped { bar: 1, .. })));
    assert!(result
        .advisories
        .iter()
        .any(|a| matches!(a, Advisory::PitchesNeverPlaced { count: 1, .. })));
}
