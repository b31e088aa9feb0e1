// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Pitched events with exact offsets and durations, and their fully resolved
//! machine form ready for firmware embedding.

use snafu::{ensure, Snafu};

use crate::articulation::Articulation;
use crate::rational::Rational;

/// A pitch is an index on the keyboard, following the MIDI standard where
/// C4 corresponds to index 60. Its only job in the pipeline is to resolve to
/// a frequency in Hertz.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Pitch(u8);

/// The name of a pitch in standard notation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PitchName {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

/// Any accidental applied to a pitch in standard notation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Accidental {
    /// The pitch is a half-tone lower than indicated by its name.
    Flat,
    /// The pitch is left unchanged.
    Base,
    /// The pitch is a half-tone higher than indicated by its name.
    Sharp,
}

impl Pitch {
    /// Convert a pitch from standard notation to a MIDI note index.
    /// Note that different names may refer to the same pitch, e.g. a G♯ is
    /// the same as an A♭. Returns `None` if the pitch is not representable
    /// in the MIDI note system.
    ///
    /// # Examples
    ///
    /// ```
    /// use melodyc::note::*;
    ///
    /// assert_eq!(Pitch::try_named(PitchName::A, Accidental::Base, 4), Some(Pitch::from_midi(69)));
    /// assert_eq!(Pitch::try_named(PitchName::C, Accidental::Sharp, 6), Some(Pitch::from_midi(85)));
    /// assert_eq!(Pitch::try_named(PitchName::G, Accidental::Flat, 2), Some(Pitch::from_midi(42)));
    /// ```
    pub fn try_named(name: PitchName, accidental: Accidental, octave: i32) -> Option<Pitch> {
        let name_index = match name {
            PitchName::C => 0,
            PitchName::D => 2,
            PitchName::E => 4,
            PitchName::F => 5,
            PitchName::G => 7,
            PitchName::A => 9,
            PitchName::B => 11,
        };
        let accidental_index = match accidental {
            Accidental::Base => 0,
            Accidental::Flat => -1,
            Accidental::Sharp => 1,
        };
        // C4 is MIDI note number 60
        let normalize_index = 60 - 4 * 12;
        let pitch_index = octave * 12 + name_index + accidental_index + normalize_index;
        Pitch::try_from_midi(pitch_index as i64)
    }

    /// Parse a name string of the format `<letter><accidental><octave>`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use melodyc::note::*;
    ///
    /// assert_eq!(Pitch::named_str("A4"), Some(Pitch::from_midi(69)));
    /// assert_eq!(Pitch::named_str("C♯6"), Some(Pitch::from_midi(85)));
    /// assert_eq!(Pitch::named_str("Gb2"), Some(Pitch::from_midi(42)));
    /// ```
    pub fn named_str(name_str: &str) -> Option<Pitch> {
        let mut name_chars = name_str.chars();
        let name_ch = name_chars.next()?;
        let name = match name_ch.to_ascii_uppercase() {
            'A' => PitchName::A,
            'B' => PitchName::B,
            'C' => PitchName::C,
            'D' => PitchName::D,
            'E' => PitchName::E,
            'F' => PitchName::F,
            'G' => PitchName::G,
            _ => return None,
        };

        let accidental_str = name_chars
            .as_str()
            .trim_end_matches(|ch: char| ch.is_ascii_digit());
        let accidental = match accidental_str {
            "sharp" | "♯" | "#" => Accidental::Sharp,
            "flat" | "♭" | "b" => Accidental::Flat,
            "" => Accidental::Base,
            _ => return None,
        };

        let octave_str = &name_chars.as_str()[accidental_str.len()..];
        let octave = octave_str.parse().ok()?;
        Pitch::try_named(name, accidental, octave)
    }

    pub fn from_midi(midi_note: u8) -> Pitch {
        assert!(midi_note < 128, "MIDI only has notes 0 - 127");
        Pitch(midi_note)
    }

    pub fn try_from_midi(midi_note: i64) -> Option<Pitch> {
        if midi_note >= 0 && midi_note < 128 {
            Some(Pitch(midi_note as u8))
        } else {
            None
        }
    }

    pub fn to_midi(self) -> u8 {
        self.0
    }

    /// The frequency of the pitch in Hertz at concert tuning (A4 = 440 Hz),
    /// with 12 equally tempered half-tones per octave.
    ///
    /// # Examples
    ///
    /// ```
    /// # use melodyc::note::*;
    /// assert_eq!(Pitch::from_midi(69).frequency(), 440.0);
    /// assert_eq!(Pitch::from_midi(81).frequency(), 880.0);
    /// ```
    pub fn frequency(self) -> f64 {
        let semitones = self.0 as i32 - 69;
        440.0 * 2.0f64.powf(semitones as f64 / 12.0)
    }
}

/// Two notes can only be tied when they are the same pitch; tying across
/// pitches has no musical meaning and is rejected.
#[derive(Debug, PartialEq, Snafu)]
pub enum TieError {
    #[snafu(display("tied notes must have the same pitch, got {:?} and {:?}", left, right))]
    PitchMismatch { left: Pitch, right: Pitch },
}

/// A single pitched event: where it starts, how long it is written, and how
/// much of that written length actually sounds.
///
/// Offsets and durations are measured in whole-lengths, the duration of a
/// whole note. Notes are immutable; the articulation is only adjusted
/// through the melody builder before the melody freezes.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pitch: Pitch,
    offset: Rational,
    duration: Rational,
    articulation: Rational,
}

impl Note {
    /// Create a note with the default non-legato articulation.
    ///
    /// # Panics
    ///
    /// Panics if the duration is not positive.
    pub fn new(pitch: Pitch, offset: Rational, duration: Rational) -> Note {
        Note::with_articulation(pitch, offset, duration, Articulation::default().ratio())
    }

    /// Create a note with an explicit articulation ratio.
    ///
    /// # Panics
    ///
    /// Panics if the duration is not positive or the articulation is outside
    /// the half-open interval `(0, 1]`.
    pub fn with_articulation(
        pitch: Pitch,
        offset: Rational,
        duration: Rational,
        articulation: Rational,
    ) -> Note {
        assert!(duration > Rational::zero(), "duration must be positive");
        assert!(
            articulation > Rational::zero() && articulation <= Rational::one(),
            "articulation must be within (0, 1]"
        );
        Note {
            pitch,
            offset,
            duration,
            articulation,
        }
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    /// Position from the start of the melody, in whole-lengths.
    pub fn offset(&self) -> Rational {
        self.offset
    }

    /// Written length in whole-lengths.
    pub fn duration(&self) -> Rational {
        self.duration
    }

    /// Position where the written length ends, in whole-lengths.
    pub fn end_offset(&self) -> Rational {
        self.offset + self.duration
    }

    /// Fraction of the written duration that sounds.
    pub fn articulation(&self) -> Rational {
        self.articulation
    }

    /// Replace the articulation during melody construction. Once the melody
    /// is frozen there is no path left to this method.
    pub(crate) fn set_articulation(&mut self, articulation: Rational) {
        assert!(
            articulation > Rational::zero() && articulation <= Rational::one(),
            "articulation must be within (0, 1]"
        );
        self.articulation = articulation;
    }

    /// Merge this note with another note of the same pitch into a single
    /// note spanning both written intervals. The second note's articulation
    /// wins, matching the convention that a tie's sounding characteristics
    /// follow its final segment.
    ///
    /// The intervals are not required to touch; tying two disjoint intervals
    /// produces one note spanning the gap.
    ///
    /// # Examples
    ///
    /// ```
    /// # use melodyc::note::*;
    /// # use melodyc::rational::Rational;
    /// let a = Pitch::named_str("A4").unwrap();
    /// let first = Note::new(a, Rational::zero(), Rational::new(1, 4));
    /// let second = Note::new(a, Rational::new(1, 4), Rational::new(1, 8));
    /// let tied = first.tie_with(&second).unwrap();
    /// assert_eq!(tied.offset(), Rational::zero());
    /// assert_eq!(tied.duration(), Rational::new(3, 8));
    /// ```
    pub fn tie_with(&self, other: &Note) -> Result<Note, TieError> {
        ensure!(
            self.pitch == other.pitch,
            PitchMismatch {
                left: self.pitch,
                right: other.pitch,
            }
        );
        let offset = self.offset.min(other.offset);
        let duration = self.end_offset().max(other.end_offset()) - offset;
        Ok(Note::with_articulation(
            self.pitch,
            offset,
            duration,
            other.articulation,
        ))
    }
}

/// The fully resolved form of a note that the firmware plays back: an
/// integer frequency and integer millisecond timings. The field widths match
/// the `Note` struct in the Arduino sketch, which is why exceeding them is a
/// conversion error rather than a silent wrap.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MachineNote {
    /// The pitch of the note as a frequency in Hertz.
    pub frequency: u16,
    /// The offset of the note (position from the start) in milliseconds.
    pub offset_millis: u32,
    /// The duration of the note in milliseconds.
    pub duration_millis: u16,
}

#[cfg(test)]
mod test {
    use super::*;

    fn a4() -> Pitch {
        Pitch::named_str("A4").unwrap()
    }

    #[test]
    fn tie_interval_is_commutative() {
        let first = Note::new(a4(), Rational::zero(), Rational::new(1, 4));
        let second = Note::new(a4(), Rational::new(1, 4), Rational::new(1, 2));

        let forward = first.tie_with(&second).unwrap();
        let backward = second.tie_with(&first).unwrap();
        assert_eq!(forward.offset(), backward.offset());
        assert_eq!(forward.duration(), backward.duration());
        assert_eq!(forward.duration(), Rational::new(3, 4));
    }

    #[test]
    fn tie_takes_second_articulation() {
        let first = Note::with_articulation(
            a4(),
            Rational::zero(),
            Rational::new(1, 4),
            Articulation::Tenuto.ratio(),
        );
        let second = Note::with_articulation(
            a4(),
            Rational::new(1, 4),
            Rational::new(1, 4),
            Articulation::Staccato.ratio(),
        );

        let tied = first.tie_with(&second).unwrap();
        assert_eq!(tied.articulation(), Articulation::Staccato.ratio());
        // and the other way around, the first articulation is discarded
        let tied = second.tie_with(&first).unwrap();
        assert_eq!(tied.articulation(), Articulation::Tenuto.ratio());
    }

    #[test]
    fn tie_spans_disjoint_intervals() {
        let first = Note::new(a4(), Rational::zero(), Rational::new(1, 8));
        let second = Note::new(a4(), Rational::new(1, 2), Rational::new(1, 4));

        let tied = first.tie_with(&second).unwrap();
        assert_eq!(tied.offset(), Rational::zero());
        assert_eq!(tied.duration(), Rational::new(3, 4));
    }

    #[test]
    fn tie_rejects_different_pitches() {
        let first = Note::new(a4(), Rational::zero(), Rational::new(1, 4));
        let second = Note::new(
            Pitch::named_str("B4").unwrap(),
            Rational::new(1, 4),
            Rational::new(1, 4),
        );

        let err = first.tie_with(&second).unwrap_err();
        assert_eq!(
            err,
            TieError::PitchMismatch {
                left: a4(),
                right: Pitch::named_str("B4").unwrap(),
            }
        );
    }

    #[test]
    #[should_panic(expected = "duration must be positive")]
    fn zero_duration_rejected() {
        Note::new(a4(), Rational::zero(), Rational::zero());
    }

    #[test]
    #[should_panic(expected = "articulation must be within (0, 1]")]
    fn out_of_range_articulation_rejected() {
        Note::with_articulation(
            a4(),
            Rational::zero(),
            Rational::new(1, 4),
            Rational::new(8, 7),
        );
    }

    #[test]
    fn concert_pitch_octaves() {
        assert_eq!(Pitch::from_midi(57).frequency(), 220.0);
        assert_eq!(Pitch::from_midi(69).frequency(), 440.0);
        assert_eq!(Pitch::from_midi(81).frequency(), 880.0);
    }
}
