// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Renders an audible preview of a melody: the same square-wave-per-note
//! playback the firmware produces, mixed into a sample buffer and written
//! out through sox. The preview is for human verification only; the machine
//! notes it consumes are identical to the ones code emission sees.

pub mod sox;

use std::io;
use std::path::Path;

use log::info;
use snafu::{ResultExt, Snafu};

use crate::melody::{Melody, ProjectError};
use crate::output::sox::SoxTarget;

/// Samples per second of the rendered preview.
pub const SAMPLE_RATE: u32 = 44100;

/// Gain applied to the final mix. Full-scale square waves are unpleasant to
/// listen to; this corresponds to roughly -34 dB.
const MIX_RATIO: f64 = 0.02;

/// Convenience type for making things stereo, e.g. individual samples or
/// whole buffers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stereo<T> {
    pub left: T,
    pub right: T,
}

#[derive(Debug, Snafu)]
pub enum PreviewError {
    #[snafu(display("could not project the melody: {}", source))]
    Unplayable { source: ProjectError },
    #[snafu(display("could not write the preview: {}", source))]
    Write { source: io::Error },
}

/// Mix the melody into a stereo sample buffer spanning its actual duration.
pub fn render_preview(melody: &Melody) -> Result<Vec<Stereo<f64>>, PreviewError> {
    let machine_notes = melody.machine_notes().context(Unplayable)?;
    let total_millis = melody.actual_duration_millis().context(Unplayable)?;

    // silence across the whole playing time, notes overlaid on top
    let mut samples = vec![
        Stereo {
            left: 0.0,
            right: 0.0
        };
        millis_to_samples(total_millis)
    ];

    for machine_note in &machine_notes {
        let start = millis_to_samples(machine_note.offset_millis).min(samples.len());
        let length = millis_to_samples(u32::from(machine_note.duration_millis));
        // A note before the last one can outlast the track end (after tie
        // merging); anything beyond the end of the buffer is cut off.
        let end = (start + length).min(samples.len());
        let frequency = f64::from(machine_note.frequency);

        for (index, sample) in samples[start..end].iter_mut().enumerate() {
            let phase = (index as f64 * frequency / f64::from(SAMPLE_RATE)).fract();
            let value = if phase < 0.5 { 1.0 } else { -1.0 };
            sample.left += value;
            sample.right += value;
        }
    }

    for sample in samples.iter_mut() {
        sample.left *= MIX_RATIO;
        sample.right *= MIX_RATIO;
    }
    Ok(samples)
}

/// Render the melody and write it to the given file. The container format
/// follows the file extension.
pub fn export_preview(melody: &Melody, path: &Path) -> Result<(), PreviewError> {
    let samples = render_preview(melody)?;
    info!(
        "writing {:.2} s preview to {}",
        samples.len() as f64 / f64::from(SAMPLE_RATE),
        path.display()
    );
    sox::write_samples(SAMPLE_RATE as i32, &samples, SoxTarget::File(path)).context(Write)
}

fn millis_to_samples(millis: u32) -> usize {
    (u64::from(millis) * u64::from(SAMPLE_RATE) / 1000) as usize
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::melody::Melody;
    use crate::score::parse_score;

    fn build(input: &str) -> Melody {
        Melody::from_score(&parse_score(input).unwrap()).unwrap()
    }

    #[test]
    fn preview_spans_the_actual_duration() {
        let melody = build("a b+ c");
        let samples = render_preview(&melody).unwrap();
        assert_eq!(
            samples.len(),
            millis_to_samples(melody.actual_duration_millis().unwrap())
        );
    }

    #[test]
    fn preview_is_gain_limited() {
        let melody = build("a");
        let samples = render_preview(&melody).unwrap();
        assert!(samples
            .iter()
            .all(|s| s.left.abs() <= MIX_RATIO && s.right.abs() <= MIX_RATIO));
    }

    #[test]
    fn note_sounds_only_for_its_machine_duration() {
        let melody = build("a");
        let machine_note = melody.machine_notes().unwrap()[0];
        let samples = render_preview(&melody).unwrap();

        let sounding = millis_to_samples(u32::from(machine_note.duration_millis));
        assert!(samples[..sounding].iter().any(|s| s.left != 0.0));
        assert!(samples[sounding..].iter().all(|s| s.left == 0.0));
    }

    #[test]
    fn overlong_notes_are_cut_at_the_track_end() {
        // The track length follows the note with the greatest offset, so a
        // long note starting earlier can outlast it; rendering must clip
        // instead of overrunning the buffer.
        use crate::note::{Note, Pitch};
        use crate::rational::Rational;
        use crate::tempo::Tempo;

        let a4 = Pitch::named_str("A4").unwrap();
        let melody = Melody::new(
            vec![
                Note::new(a4, Rational::zero(), Rational::int(4)),
                Note::new(a4, Rational::new(1, 4), Rational::new(1, 4)),
            ],
            Tempo::default(),
        )
        .unwrap();

        let samples = render_preview(&melody).unwrap();
        assert_eq!(
            samples.len(),
            millis_to_samples(melody.actual_duration_millis().unwrap())
        );
    }
}
