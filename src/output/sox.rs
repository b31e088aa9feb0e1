// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Hands rendered samples to a sox subprocess, which takes care of encoding
//! whatever container format the output path asks for.

use std::io;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::output::Stereo;

pub enum SoxTarget<'a> {
    /// Play directly through the `play` binary. Not reachable from the
    /// command line; kept for ad-hoc listening from code.
    Play,
    /// Encode to a file; the extension selects the format.
    File(&'a Path),
}

/// Pipe the given stereo samples through sox in one go.
///
/// sox exits on its own once the input stream is closed, so no special
/// shutdown handling is required beyond waiting for the subprocess.
pub fn write_samples(
    sample_rate: i32,
    samples: &[Stereo<f64>],
    target: SoxTarget,
) -> io::Result<()> {
    let sample_rate_str = format!("{}", sample_rate);
    let input_args = &[
        "-R", // make the output reproducible
        "--channels",
        "2",
        "--rate",
        &sample_rate_str,
        "--type",
        "f64",
        "/dev/stdin",
    ];

    let mut player = match target {
        SoxTarget::Play => Command::new("play")
            .args(input_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?,
        SoxTarget::File(outfile) => Command::new("sox")
            .args(input_args)
            .arg(outfile)
            .stdin(Stdio::piped())
            .spawn()?,
    };

    let mut audio_stream = player.stdin.take().expect("Used stdio(Stdio::piped())");

    let mut byte_buffer = Vec::with_capacity(samples.len() * 16);
    for sample in samples {
        byte_buffer.extend_from_slice(&sample.left.to_le_bytes());
        byte_buffer.extend_from_slice(&sample.right.to_le_bytes());
    }
    audio_stream.write_all(&byte_buffer)?;

    drop(audio_stream);
    let status = player.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("sox exited with {}", status),
        ))
    }
}
