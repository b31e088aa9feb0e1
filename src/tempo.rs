// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Tempo handling and the projection of notes onto machine notes.
//!
//! `wholes_to_milliseconds` is the single point where musical time turns
//! into wall-clock time; every millisecond in the system comes out of it.
//! The arithmetic stays rational until the final rounding.

use std::convert::TryFrom;

use log::warn;
use snafu::Snafu;

use crate::note::{MachineNote, Note};
use crate::rational::Rational;

/// The Arduino `tone()` function cannot produce frequencies below 31 Hz.
const MIN_TONE_FREQUENCY: i64 = 31;

/// A computed value does not fit the integer field the firmware reserves
/// for it. Surfaced instead of wrapping, because a wrapped timing would
/// silently corrupt the whole melody.
#[derive(Debug, PartialEq, Snafu)]
pub enum RangeError {
    #[snafu(display("frequency of {} Hz does not fit the firmware's 16-bit field", value))]
    FrequencyOutOfRange { value: i64 },
    #[snafu(display("offset of {} ms does not fit the firmware's 32-bit field", value))]
    OffsetOutOfRange { value: i64 },
    #[snafu(display("duration of {} ms does not fit the firmware's 16-bit field", value))]
    DurationOutOfRange { value: i64 },
}

/// A musical tempo: a beat rate relative to some subdivision of the whole
/// note. Tempos are immutable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tempo {
    subdivision: Rational,
    beats_per_minute: i64,
}

impl Tempo {
    /// Create a tempo where `beats_per_minute` notes of length `subdivision`
    /// (a fraction of a whole note) occur in a single minute.
    ///
    /// # Panics
    ///
    /// Panics if the subdivision or the rate is not positive.
    pub fn new(subdivision: Rational, beats_per_minute: i64) -> Tempo {
        assert!(
            subdivision > Rational::zero(),
            "subdivision must be positive"
        );
        assert!(beats_per_minute > 0, "beats per minute must be positive");
        Tempo {
            subdivision,
            beats_per_minute,
        }
    }

    /// A tempo relative to the quarter note, the most common metronome marking.
    pub fn quarter_equals(beats_per_minute: i64) -> Tempo {
        Tempo::new(Rational::nth(4), beats_per_minute)
    }

    /// The subdivision to which the rate of the tempo is relative.
    pub fn subdivision(&self) -> Rational {
        self.subdivision
    }

    /// The rate of the tempo in beats per minute.
    pub fn beats_per_minute(&self) -> i64 {
        self.beats_per_minute
    }

    /// Re-express the tempo relative to another subdivision. The rate is
    /// scaled by the ratio of the new subdivision to the old one and rounded
    /// half-away-from-zero, so converting back and forth may be off by one
    /// beat per minute.
    ///
    /// ```
    /// # use melodyc::tempo::Tempo;
    /// # use melodyc::rational::Rational;
    /// let quarter = Tempo::quarter_equals(120);
    /// let eighth = quarter.convert_to_subdivision(Rational::nth(8));
    /// assert_eq!(eighth.beats_per_minute(), 60);
    /// ```
    pub fn convert_to_subdivision(&self, subdivision: Rational) -> Tempo {
        let rate = self.beats_per_minute * subdivision / self.subdivision;
        Tempo::new(subdivision, rate.round())
    }

    /// Convert a length in whole-lengths to milliseconds under this tempo,
    /// rounding half-away-from-zero only at the very end.
    ///
    /// ```
    /// # use melodyc::tempo::Tempo;
    /// # use melodyc::rational::Rational;
    /// // A quarter note at quarter = 120 lasts half a second.
    /// let tempo = Tempo::quarter_equals(120);
    /// assert_eq!(tempo.wholes_to_milliseconds(Rational::nth(4)), 500);
    /// ```
    pub fn wholes_to_milliseconds(&self, duration: Rational) -> i64 {
        (duration / (self.beats_per_minute * self.subdivision) * 60_000).round()
    }

    /// Project a note under this tempo into its machine form.
    ///
    /// The duration receives a correction of `100 − round(articulation × 100)`
    /// milliseconds on top of the ratio-scaled sounding length: fully legato
    /// notes are untouched while strongly detached notes are shortened
    /// further than pure ratio scaling would give, keeping the gaps audible
    /// at low tempos. The correction is intentionally computed from the
    /// rounded percentage, not from the exact ratio.
    ///
    /// This is a pure function: projecting the same note twice yields
    /// identical machine notes.
    pub fn machine_note(&self, note: &Note) -> Result<MachineNote, RangeError> {
        let frequency = note.pitch().frequency().round() as i64;
        if frequency < MIN_TONE_FREQUENCY {
            // The firmware reports this on its serial console; it plays the
            // note anyway, so it is a warning here rather than an error.
            warn!(
                "frequency of {} Hz is below the {} Hz floor of the tone generator",
                frequency, MIN_TONE_FREQUENCY
            );
        }

        let offset = self.wholes_to_milliseconds(note.offset());
        let sounding_wholes = note.articulation() * note.duration();
        let duration = 100 + self.wholes_to_milliseconds(sounding_wholes)
            - (note.articulation() * 100).round();

        Ok(MachineNote {
            frequency: u16::try_from(frequency)
                .map_err(|_| RangeError::FrequencyOutOfRange { value: frequency })?,
            offset_millis: u32::try_from(offset)
                .map_err(|_| RangeError::OffsetOutOfRange { value: offset })?,
            duration_millis: u16::try_from(duration)
                .map_err(|_| RangeError::DurationOutOfRange { value: duration })?,
        })
    }
}

/// The default tempo when a score carries no marking: quarter = 120.
impl Default for Tempo {
    fn default() -> Self {
        Tempo::quarter_equals(120)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::articulation::Articulation;
    use crate::note::Pitch;

    #[test]
    fn conversion_scales_by_subdivision_ratio() {
        let quarter = Tempo::quarter_equals(90);
        let eighth = quarter.convert_to_subdivision(Rational::nth(8));
        assert_eq!(eighth.subdivision(), Rational::nth(8));
        assert_eq!(eighth.beats_per_minute(), 45);
    }

    #[test]
    fn conversion_rounds_half_away_from_zero() {
        // 101 bpm scaled by 1/2 is 50.5 bpm, which rounds up (the
        // half-to-even rule would give 50 here).
        let tempo = Tempo::quarter_equals(101).convert_to_subdivision(Rational::nth(8));
        assert_eq!(tempo.beats_per_minute(), 51);
    }

    #[test]
    fn conversion_round_trip_within_one_beat() {
        for bpm in &[60, 63, 72, 97, 120, 144, 208] {
            let original = Tempo::quarter_equals(*bpm);
            let back = original
                .convert_to_subdivision(Rational::nth(6))
                .convert_to_subdivision(Rational::nth(4));
            assert!(
                (back.beats_per_minute() - bpm).abs() <= 1,
                "round trip of {} bpm came back as {}",
                bpm,
                back.beats_per_minute()
            );
        }
    }

    #[test]
    fn milliseconds_of_common_lengths() {
        let tempo = Tempo::quarter_equals(120);
        assert_eq!(tempo.wholes_to_milliseconds(Rational::one()), 2000);
        assert_eq!(tempo.wholes_to_milliseconds(Rational::nth(4)), 500);
        assert_eq!(tempo.wholes_to_milliseconds(Rational::new(3, 8)), 750);
        // 1/3 whole is 666.66... ms, rounded to the nearest millisecond.
        assert_eq!(tempo.wholes_to_milliseconds(Rational::nth(3)), 667);
    }

    #[test]
    fn projects_single_quarter_note() {
        // A4 quarter note at quarter = 120 with the default articulation:
        // the sounding length is 5/7 of 500 ms = 357.14 ms, plus the
        // correction 100 - round(5/7 * 100) = 29.
        let tempo = Tempo::quarter_equals(120);
        let note = Note::new(
            Pitch::named_str("A4").unwrap(),
            Rational::zero(),
            Rational::nth(4),
        );

        let machine = tempo.machine_note(&note).unwrap();
        assert_eq!(machine.frequency, 440);
        assert_eq!(machine.offset_millis, 0);
        assert_eq!(machine.duration_millis, 100 + 357 - 71);
        assert_eq!(machine.duration_millis, 386);
    }

    #[test]
    fn legato_projection_gets_no_correction() {
        let tempo = Tempo::quarter_equals(120);
        let note = Note::with_articulation(
            Pitch::named_str("A4").unwrap(),
            Rational::zero(),
            Rational::nth(4),
            Articulation::Legato.ratio(),
        );

        let machine = tempo.machine_note(&note).unwrap();
        // 100 + 500 - 100: the written length survives untouched.
        assert_eq!(machine.duration_millis, 500);
    }

    #[test]
    fn projection_is_deterministic() {
        let tempo = Tempo::quarter_equals(97);
        let note = Note::with_articulation(
            Pitch::named_str("C♯6").unwrap(),
            Rational::new(7, 16),
            Rational::new(3, 16),
            Articulation::Portato.ratio(),
        );

        let first = tempo.machine_note(&note).unwrap();
        let second = tempo.machine_note(&note).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_offset_is_an_error() {
        // Ten million whole notes at quarter = 120 exceed u32 milliseconds.
        let tempo = Tempo::quarter_equals(120);
        let note = Note::new(
            Pitch::named_str("A4").unwrap(),
            Rational::int(10_000_000),
            Rational::nth(4),
        );

        let err = tempo.machine_note(&note).unwrap_err();
        assert_eq!(
            err,
            RangeError::OffsetOutOfRange {
                value: 20_000_000_000
            }
        );
    }

    #[test]
    fn oversized_duration_is_an_error() {
        // A 40-whole legato note at quarter = 120 lasts 80 s, beyond u16 ms.
        let tempo = Tempo::quarter_equals(120);
        let note = Note::with_articulation(
            Pitch::named_str("A4").unwrap(),
            Rational::zero(),
            Rational::int(40),
            Articulation::Legato.ratio(),
        );

        let err = tempo.machine_note(&note).unwrap_err();
        assert_eq!(err, RangeError::DurationOutOfRange { value: 80_000 });
    }
}
