//! Expression evaluation against a single note.

use rand::Rng;

use super::ast::{BinaryOp, Expr, Function};
use super::error::EvalError;
use super::waveform;
use crate::note::NoteEvent;
use crate::time::{bar_beat_duration_to_beats, beats_to_bar_beat, TimeSignature};

/// Everything an expression can see about the note being modulated.
#[derive(Debug, Clone, Copy)]
pub struct NoteContext<'a> {
    pub note: &'a NoteEvent,
    /// Note start in musical beats.
    pub position: f64,
    pub bar: u32,
    pub beat: f64,
    pub signature: TimeSignature,
}

impl<'a> NoteContext<'a> {
    pub fn new(note: &'a NoteEvent, signature: TimeSignature) -> Self {
        let position = signature.quarter_to_musical(note.start_time);
        let (bar, beat) = beats_to_bar_beat(position, signature.beats_per_bar());
        Self {
            note,
            position,
            bar,
            beat,
            signature,
        }
    }

    /// `note.<property>` lookup. Values are the note's stored ones.
    pub fn property(&self, name: &str) -> Result<f64, EvalError> {
        let note = self.note;
        Ok(match name {
            "pitch" => note.pitch as f64,
            "start" => note.start_time,
            "velocity" => note.velocity,
            "velocityDeviation" => note.velocity_deviation,
            "duration" => note.duration,
            "probability" => note.probability,
            _ => return Err(EvalError::UnknownVariable(name.to_string())),
        })
    }
}

/// Evaluate `expr` for one note.
///
/// `span` is `(start, duration)` in musical beats and is the basis for `ramp`.
pub fn evaluate<R: Rng + ?Sized>(
    expr: &Expr,
    ctx: &NoteContext<'_>,
    span: (f64, f64),
    rng: &mut R,
) -> Result<f64, EvalError> {
    let value = eval(expr, ctx, span, rng)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn eval<R: Rng + ?Sized>(
    expr: &Expr,
    ctx: &NoteContext<'_>,
    span: (f64, f64),
    rng: &mut R,
) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Period { bars, beats } => Ok(bar_beat_duration_to_beats(
            *bars,
            *beats,
            ctx.signature.beats_per_bar(),
        )),
        Expr::Variable(name) => ctx.property(name),
        Expr::Binary { op, left, right } => {
            let l = eval(left, ctx, span, rng)?;
            let r = eval(right, ctx, span, rng)?;
            match op {
                BinaryOp::Add => Ok(l + r),
                BinaryOp::Subtract => Ok(l - r),
                BinaryOp::Multiply => Ok(l * r),
                BinaryOp::Divide => {
                    if r == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
            }
        }
        Expr::Call { function, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, ctx, span, rng)?);
            }
            call(*function, &values, ctx, span, rng)
        }
    }
}

fn call<R: Rng + ?Sized>(
    function: Function,
    args: &[f64],
    ctx: &NoteContext<'_>,
    span: (f64, f64),
    rng: &mut R,
) -> Result<f64, EvalError> {
    let arg = |i: usize, default: f64| args.get(i).copied().unwrap_or(default);

    match function {
        Function::Noise => Ok(rng.gen_range(-1.0..=1.0)),
        Function::Ramp => Ok(waveform::ramp(
            ctx.position,
            span,
            arg(2, 1.0),
            arg(0, 0.0),
            arg(1, 0.0),
        )),
        Function::Cos | Function::Tri | Function::Saw | Function::Square => {
            let period = arg(0, 0.0);
            if period <= 0.0 {
                return Err(EvalError::InvalidPeriod {
                    function: function.name(),
                    period,
                });
            }
            let phase = waveform::phase(ctx.position, period, arg(1, 0.0));
            Ok(match function {
                Function::Cos => waveform::cosine(phase),
                Function::Tri => waveform::triangle(phase),
                Function::Saw => waveform::sawtooth(phase),
                _ => waveform::square(phase, arg(2, waveform::DEFAULT_PULSE_WIDTH)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::ModulationProgram;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn expr(src: &str) -> Expr {
        let program = ModulationProgram::parse(&format!("velocity = {src}")).unwrap();
        program.assignments[0].expression.clone()
    }

    fn eval_at(src: &str, note: &NoteEvent, signature: TimeSignature) -> Result<f64, EvalError> {
        let ctx = NoteContext::new(note, signature);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        evaluate(&expr(src), &ctx, (0.0, 8.0), &mut rng)
    }

    fn common(src: &str, note: &NoteEvent) -> Result<f64, EvalError> {
        eval_at(src, note, TimeSignature::COMMON)
    }

    #[test]
    fn context_derives_bar_and_beat() {
        let note = NoteEvent::new(60, 5.5, 1.0);
        let ctx = NoteContext::new(&note, TimeSignature::COMMON);
        assert_eq!(ctx.bar, 2);
        assert_approx_eq!(ctx.beat, 2.5);
    }

    #[test]
    fn context_uses_musical_beats() {
        // 6/8: a quarter note is two eighth-note beats.
        let note = NoteEvent::new(60, 3.0, 1.0);
        let ctx = NoteContext::new(&note, TimeSignature { numerator: 6, denominator: 8 });
        assert_approx_eq!(ctx.position, 6.0);
        assert_eq!(ctx.bar, 2);
        assert_approx_eq!(ctx.beat, 1.0);
    }

    #[test]
    fn arithmetic() {
        let note = NoteEvent::new(60, 0.0, 1.0);
        assert_approx_eq!(common("1 + 2 * 3", &note).unwrap(), 7.0);
        assert_approx_eq!(common("(1 + 2) * 3", &note).unwrap(), 9.0);
        assert_approx_eq!(common("-4 / 2", &note).unwrap(), -2.0);
    }

    #[test]
    fn note_properties() {
        let note = NoteEvent::new(64, 2.0, 0.5).with_velocity(90.0).with_probability(0.5);
        assert_approx_eq!(common("note.pitch", &note).unwrap(), 64.0);
        assert_approx_eq!(common("note.start", &note).unwrap(), 2.0);
        assert_approx_eq!(common("note.velocity * 0.5", &note).unwrap(), 45.0);
        assert_approx_eq!(common("note.duration", &note).unwrap(), 0.5);
        assert_approx_eq!(common("note.probability", &note).unwrap(), 0.5);
        assert_approx_eq!(common("note.velocityDeviation", &note).unwrap(), 0.0);
    }

    #[test]
    fn unknown_property() {
        let note = NoteEvent::new(60, 0.0, 1.0);
        assert_eq!(
            common("note.color", &note),
            Err(EvalError::UnknownVariable("color".into()))
        );
    }

    #[test]
    fn division_by_zero() {
        let note = NoteEvent::new(60, 0.0, 1.0);
        assert_eq!(common("1 / (2 - 2)", &note), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn waveforms_at_position() {
        let note = NoteEvent::new(60, 1.0, 1.0);
        assert_approx_eq!(common("cos(4t)", &note).unwrap(), 0.0);
        assert_approx_eq!(common("tri(4t)", &note).unwrap(), 0.0);
        assert_approx_eq!(common("saw(4t)", &note).unwrap(), 0.5);
        assert_approx_eq!(common("square(4t)", &note).unwrap(), 1.0);
        assert_approx_eq!(common("square(4t, 0, 0.2)", &note).unwrap(), -1.0);
        assert_approx_eq!(common("cos(4t, 0.25)", &note).unwrap(), -1.0);
    }

    #[test]
    fn bar_period_uses_numerator() {
        // One bar of 3/4 is three beats; position 1.5 is half way.
        let note = NoteEvent::new(60, 1.5, 1.0);
        let sig = TimeSignature { numerator: 3, denominator: 4 };
        assert_approx_eq!(eval_at("saw(1:0t)", &note, sig).unwrap(), 0.0);
        assert_approx_eq!(eval_at("saw(3)", &note, sig).unwrap(), 0.0);
    }

    #[test]
    fn non_positive_period() {
        let note = NoteEvent::new(60, 0.0, 1.0);
        assert!(matches!(
            common("cos(0)", &note),
            Err(EvalError::InvalidPeriod { function: "cos", .. })
        ));
        assert!(common("tri(-1)", &note).is_err());
    }

    #[test]
    fn ramp_uses_span() {
        let note = NoteEvent::new(60, 2.0, 1.0);
        assert_approx_eq!(common("ramp(0, 100)", &note).unwrap(), 25.0);
        assert_approx_eq!(common("ramp(0, 100, 2)", &note).unwrap(), 50.0);
    }

    #[test]
    fn noise_is_bounded_and_seeded() {
        let note = NoteEvent::new(60, 0.0, 1.0);
        let ctx = NoteContext::new(&note, TimeSignature::COMMON);
        let e = expr("noise()");
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let x = evaluate(&e, &ctx, (0.0, 4.0), &mut a).unwrap();
            let y = evaluate(&e, &ctx, (0.0, 4.0), &mut b).unwrap();
            assert!((-1.0..=1.0).contains(&x));
            assert_eq!(x, y);
        }
    }
}
