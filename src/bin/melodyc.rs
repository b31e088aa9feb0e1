// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `melodyc` reads a score, prints the C++ melody definition for the
//! firmware, and optionally writes an audio preview of how it will sound.

use std::error::Error;
use std::path::PathBuf;

use structopt::StructOpt;

use melodyc::emit;
use melodyc::melody::Melody;
use melodyc::output;
use melodyc::score;

#[derive(Debug, StructOpt)]
#[structopt(name = "melodyc", about = "Compiling scores into melody definitions")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// The score to compile. Expected to hold a single voice without chords.
    #[structopt(parse(from_os_str))]
    score: PathBuf,

    /// The name of the emitted variable. Letters and underscores only.
    #[structopt(short = "n", long = "name", default_value = "MY_MELODY")]
    name: String,

    /// Export a preview of what the melody will sound like on the device
    /// (any sox-supported format).
    #[structopt(
        short = "s",
        long = "export-sample-audio",
        value_name = "OUTPUT_FILE",
        parse(from_os_str)
    )]
    sample_audio: Option<PathBuf>,
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level).unwrap();

    if let Err(err) = run(&opt) {
        eprintln!("error: {}", err);
        if opt.verbose > 0 {
            let mut cause = err.source();
            while let Some(inner) = cause {
                eprintln!("  caused by: {}", inner);
                cause = inner.source();
            }
        }
        std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), Box<dyn Error>> {
    let source = std::fs::read_to_string(&opt.score)?;
    let score = score::parse_score(&source)?;
    let melody = Melody::from_score(&score)?;

    println!("{}", emit::cpp_definition(&melody, &opt.name)?);

    if let Some(path) = &opt.sample_audio {
        output::export_preview(&melody, path)?;
    }
    Ok(())
}
