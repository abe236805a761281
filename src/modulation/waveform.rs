//! Periodic waveforms and ramps evaluated at a note position.
//!
//! All waveforms take a phase and return a value in `[-1.0, 1.0]`.

use std::f64::consts::TAU;

/// Default pulse width for [`square`].
pub const DEFAULT_PULSE_WIDTH: f64 = 0.5;

/// `(position / period) mod 1 + offset`.
///
/// The offset is added after wrapping, so the result may leave `[0, 1)`;
/// each waveform wraps again where it needs to.
pub fn phase(position: f64, period: f64, offset: f64) -> f64 {
    (position / period).rem_euclid(1.0) + offset
}

pub fn cosine(phase: f64) -> f64 {
    (TAU * phase).cos()
}

/// Starts at `1`, falls to `-1` at half phase and climbs back.
pub fn triangle(phase: f64) -> f64 {
    let p = phase.rem_euclid(1.0);
    if p <= 0.5 {
        1.0 - 4.0 * p
    } else {
        -3.0 + 4.0 * p
    }
}

/// Falls linearly from `1` to `-1` over one period.
pub fn sawtooth(phase: f64) -> f64 {
    1.0 - 2.0 * phase.rem_euclid(1.0)
}

pub fn square(phase: f64, pulse_width: f64) -> f64 {
    if phase.rem_euclid(1.0) < pulse_width {
        1.0
    } else {
        -1.0
    }
}

/// Linear interpolation from `start` to `end` across a span.
///
/// `speed` repeats the ramp that many times over the span. A span with no
/// duration holds at `start`.
pub fn ramp(position: f64, span: (f64, f64), speed: f64, start: f64, end: f64) -> f64 {
    let (span_start, span_duration) = span;
    if span_duration <= 0.0 {
        return start;
    }
    let t = ((position - span_start) / span_duration * speed).rem_euclid(1.0);
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn phase_wraps_then_offsets() {
        assert_approx_eq!(phase(5.0, 4.0, 0.0), 0.25);
        assert_approx_eq!(phase(5.0, 4.0, 0.5), 0.75);
        assert_approx_eq!(phase(-1.0, 4.0, 0.0), 0.75);
    }

    #[test]
    fn cosine_cycle() {
        assert_approx_eq!(cosine(0.0), 1.0);
        assert_approx_eq!(cosine(0.25), 0.0);
        assert_approx_eq!(cosine(0.5), -1.0);
        assert_approx_eq!(cosine(1.0), 1.0);
    }

    #[test]
    fn triangle_shape() {
        assert_approx_eq!(triangle(0.0), 1.0);
        assert_approx_eq!(triangle(0.25), 0.0);
        assert_approx_eq!(triangle(0.5), -1.0);
        assert_approx_eq!(triangle(0.75), 0.0);
        // Offset pushes past one period.
        assert_approx_eq!(triangle(1.25), 0.0);
    }

    #[test]
    fn sawtooth_shape() {
        assert_approx_eq!(sawtooth(0.0), 1.0);
        assert_approx_eq!(sawtooth(0.5), 0.0);
        assert_approx_eq!(sawtooth(0.75), -0.5);
    }

    #[test]
    fn square_pulse_width() {
        assert_eq!(square(0.2, DEFAULT_PULSE_WIDTH), 1.0);
        assert_eq!(square(0.5, DEFAULT_PULSE_WIDTH), -1.0);
        assert_eq!(square(0.2, 0.1), -1.0);
        assert_eq!(square(1.05, 0.1), 1.0);
    }

    #[test]
    fn ramp_across_span() {
        let span = (0.0, 8.0);
        assert_approx_eq!(ramp(0.0, span, 1.0, 0.0, 1.0), 0.0);
        assert_approx_eq!(ramp(4.0, span, 1.0, 0.0, 1.0), 0.5);
        assert_approx_eq!(ramp(6.0, span, 1.0, 10.0, 20.0), 17.5);
    }

    #[test]
    fn ramp_speed_repeats() {
        let span = (0.0, 8.0);
        assert_approx_eq!(ramp(2.0, span, 2.0, 0.0, 1.0), 0.5);
        assert_approx_eq!(ramp(4.0, span, 2.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn ramp_empty_span_holds_start() {
        assert_eq!(ramp(3.0, (0.0, 0.0), 1.0, 0.25, 1.0), 0.25);
    }
}
