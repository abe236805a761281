//! Barbeat — compilers for a compact `bar|beat` note notation and a per-note
//! modulation language.

pub mod config;
pub mod modulation;
pub mod notation;
pub mod note;
pub mod scanner;
pub mod time;

pub use modulation::{apply_modulations, apply_modulations_with_rng, ModulationReport};
pub use notation::{format_notation, interpret_notation, NotationError};
pub use note::NoteEvent;
pub use time::{TimeSignature, TimingOptions};
