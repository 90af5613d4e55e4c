//! Render the Super Mario Bros. opening to a WAV file.
//!
//! ```text
//! cargo run --example mario -- --output mario.wav -v
//! ```

use std::path::PathBuf;

use clap::Parser;
use log::info;

use chiptone_core::dsp::renderer::render_melody_wav;
use chiptone_core::melody::{mario_options, Melody};
use chiptone_core::{InstrumentConfig, InstrumentOverrides};

#[derive(Debug, Parser)]
#[command(name = "mario", about = "Render a melody with the tone instrument")]
struct Args {
    /// Output WAV file.
    #[arg(short, long, default_value = "mario.wav")]
    output: PathBuf,

    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Instrument options as JSON, replacing the Mario defaults.
    #[arg(long)]
    options: Option<String>,

    /// Seconds between melody steps.
    #[arg(long)]
    tick: Option<f64>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let options = match &args.options {
        Some(json) => InstrumentOverrides::from_json(json)?,
        None => mario_options(),
    };
    let mut melody = Melody::mario();
    if let Some(tick) = args.tick {
        melody.tick_seconds = tick;
    }

    let wav = render_melody_wav(&melody, &options, &InstrumentConfig::default(), args.sample_rate);
    std::fs::write(&args.output, &wav)?;
    info!("wrote {} bytes to {}", wav.len(), args.output.display());
    Ok(())
}
