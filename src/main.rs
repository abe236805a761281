//! Barbeat CLI — compile notation to note events, format them back, and apply
//! modulation text.

use std::io::Read;
use std::path::Path;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use barbeat::config::Config;
use barbeat::modulation::{apply_modulations, apply_modulations_with_rng, ModulationReport};
use barbeat::notation::Interpreter;
use barbeat::note::note_name;
use barbeat::time::beats_to_bar_beat;
use barbeat::{format_notation, NoteEvent, TimingOptions};

#[derive(Parser)]
#[command(name = "barbeat", version)]
#[command(about = "Compile bar|beat note notation and apply modulations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    timing: TimingArgs,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct TimingArgs {
    /// Beats per bar, with quarter-note beats
    #[arg(long, global = true)]
    beats_per_bar: Option<u32>,

    /// Time signature as N/D, e.g. 6/8
    #[arg(long, value_parser = parse_time_sig, global = true)]
    time_sig: Option<(u32, u32)>,
}

impl TimingArgs {
    fn options(&self) -> TimingOptions {
        TimingOptions {
            beats_per_bar: self.beats_per_bar,
            time_sig_numerator: self.time_sig.map(|(n, _)| n),
            time_sig_denominator: self.time_sig.map(|(_, d)| d),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile notation to note events
    Compile {
        /// Notation text, a file path, or - for stdin
        input: String,

        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Write notation for a JSON list of note events
    Format {
        /// JSON file, or - for stdin
        notes: String,
    },
    /// Apply modulation text to a JSON list of note events
    Modulate {
        /// JSON file, or - for stdin
        notes: String,

        /// Modulation text or a file path
        modulation: String,

        /// Seed for noise(); omit for a fresh random source
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_time_sig(s: &str) -> Result<(u32, u32), String> {
    let (num, den) = s
        .split_once('/')
        .ok_or_else(|| format!("expected N/D, got '{s}'"))?;
    let num = num.trim().parse().map_err(|e| format!("numerator: {e}"))?;
    let den = den.trim().parse().map_err(|e| format!("denominator: {e}"))?;
    Ok((num, den))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = cli.timing.options();

    match cli.command {
        Commands::Compile { input, table } => {
            let source = read_text(&input)?;
            let config = Config::load().unwrap_or_default();
            let interpreter = Interpreter::new(&options)?.with_config(config);
            let result = interpreter.run(&source)?;
            if table {
                print_table(&result.events, &options)?;
            } else {
                println!("{}", serde_json::to_string_pretty(&result.events)?);
            }
        }
        Commands::Format { notes } => {
            let notes = read_notes(&notes)?;
            println!("{}", format_notation(&notes, &options)?);
        }
        Commands::Modulate {
            notes,
            modulation,
            seed,
        } => {
            let mut notes = read_notes(&notes)?;
            let text = read_text(&modulation)?;
            let signature = options.resolve()?;
            let report = match seed {
                Some(seed) => apply_modulations_with_rng(
                    &mut notes,
                    &text,
                    signature.numerator,
                    signature.denominator,
                    &mut ChaCha8Rng::seed_from_u64(seed),
                ),
                None => apply_modulations(
                    &mut notes,
                    &text,
                    signature.numerator,
                    signature.denominator,
                ),
            };
            log_report(&report);
            if let Some(e) = report.parse_error {
                return Err(e.into());
            }
            println!("{}", serde_json::to_string_pretty(&notes)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `-` reads stdin, an existing path reads the file, anything else is inline text.
fn read_text(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else if Path::new(input).is_file() {
        std::fs::read_to_string(input)
    } else {
        Ok(input.to_string())
    }
}

fn read_notes(input: &str) -> Result<Vec<NoteEvent>, Box<dyn std::error::Error>> {
    let json = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&json)?)
}

fn print_table(
    events: &[NoteEvent],
    options: &TimingOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let signature = options.resolve()?;
    println!(
        "{:<6} {:>10} {:>9} {:>8} {:>6}",
        "pitch", "bar|beat", "duration", "velocity", "prob"
    );
    for event in events {
        let position = signature.quarter_to_musical(event.start_time);
        let (bar, beat) = beats_to_bar_beat(position, signature.beats_per_bar());
        println!(
            "{:<6} {:>10} {:>9.3} {:>8.0} {:>6.2}",
            note_name(event.pitch),
            format!("{bar}|{beat:.3}"),
            event.duration,
            event.velocity,
            event.probability
        );
    }
    println!("{} events", events.len());
    Ok(())
}

fn log_report(report: &ModulationReport) {
    tracing::info!(
        modified = report.notes_modified,
        failures = report.evaluation_failures,
        "modulation done"
    );
}
