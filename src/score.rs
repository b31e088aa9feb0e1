// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The score-side interface of the melody pipeline: a flat sequence of note
//! events with articulation markings, slur spans addressing those events by
//! index, and at most one tempo marking. Offsets and durations are measured
//! in quarter-lengths, the native unit of score formats; the melody builder
//! converts to whole-lengths.
//!
//! A small textual score format is bundled so the command line has something
//! to read. One symbol per note:
//!
//! ```text
//! @tempo 1/4=90
//! (c d e) f+'_ r- g!
//! a- & a-
//! ```
//!
//! A note is a letter `a..g`, an optional accidental (`#`, `b`, `♯`, `♭`),
//! an optional octave digit (default 4), a duration and marking suffixes.
//! Durations start from a quarter; every `+` doubles, every `-` halves, and
//! dots extend by halves like in common notation. `'` marks staccato, `!`
//! staccatissimo, `_` tenuto; suffixes combine. `r` is a rest, `( ... )` a
//! slur, `&` ties the surrounding notes, and `@tempo` sets the metronome
//! marking (referent as a fraction of a quarter note).

use snafu::Snafu;

use crate::articulation::Articulation;
use crate::note::{Accidental, Pitch, PitchName};
use crate::rational::Rational;

/// An articulation marking attached to a note event by the score.
/// The mapping onto the articulation table collapses synonyms the table has
/// no entry for: spiccato sounds as short as staccatissimo, and a detached
/// legato is the ordinary non-legato.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Marking {
    Staccato,
    Staccatissimo,
    Spiccato,
    DetachedLegato,
    Tenuto,
}

impl Marking {
    /// The articulation a lone occurrence of this marking resolves to.
    pub fn articulation(self) -> Articulation {
        match self {
            Marking::Staccato => Articulation::Staccato,
            Marking::Staccatissimo => Articulation::Staccatissimo,
            Marking::Spiccato => Articulation::Staccatissimo,
            Marking::DetachedLegato => Articulation::NonLegato,
            Marking::Tenuto => Articulation::Tenuto,
        }
    }

    /// Whether this marking detaches the note (shorter than non-legato).
    pub fn is_staccato_kind(self) -> bool {
        match self {
            Marking::Staccato | Marking::Staccatissimo | Marking::Spiccato => true,
            _ => false,
        }
    }

    /// Whether this marking sustains the note.
    pub fn is_tenuto_kind(self) -> bool {
        self == Marking::Tenuto
    }
}

/// One note as the score reader saw it, before any articulation inference.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    /// Position from the start of the score, in quarter-lengths.
    pub quarter_offset: Rational,
    /// Written length, in quarter-lengths.
    pub quarter_duration: Rational,
    /// Markings attached to this note, in score order.
    pub markings: Vec<Marking>,
    /// Whether a tie connects this note to the following event.
    pub tied_to_next: bool,
}

/// A slur span: the indices of the events it covers, in score order.
#[derive(Debug, Clone, PartialEq)]
pub struct SlurSpan {
    pub events: Vec<usize>,
}

/// A metronome marking: `beats_per_minute` notes of the referent length per
/// minute, the referent being a fraction of a quarter note.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TempoMarking {
    pub quarter_referent: Rational,
    pub beats_per_minute: i64,
}

/// Everything the melody builder needs from a parsed score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub events: Vec<NoteEvent>,
    pub slurs: Vec<SlurSpan>,
    pub tempo: Option<TempoMarking>,
}

#[derive(Debug, Snafu, PartialEq)]
pub enum ParseError {
    #[snafu(display("unexpected end of score"))]
    UnexpectedEof,
    #[snafu(display("'{}' does not start a note", ch))]
    NoNote { ch: char },
    #[snafu(display("note is not representable as a MIDI pitch"))]
    UnrepresentablePitch,
    #[snafu(display("unknown symbol '{}'", ch))]
    UnknownSymbol { ch: char },
    #[snafu(display("slurs cannot nest"))]
    NestedSlur,
    #[snafu(display("')' without a matching '('"))]
    UnmatchedSlurEnd,
    #[snafu(display("slur is never closed"))]
    UnterminatedSlur,
    #[snafu(display("a tie must connect two notes"))]
    DanglingTie,
    #[snafu(display("malformed tempo directive: {}", reason))]
    BadTempo { reason: &'static str },
    #[snafu(display("unknown directive '@{}'", name))]
    UnknownDirective { name: String },
}

/// Parse a textual score.
pub fn parse_score(input: &str) -> Result<Score, ParseError> {
    let mut p = Parser::new(input);
    p.parse_score()
}

struct Parser<'a> {
    stream: Scan<'a>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut stream = Scan::new(input);
        stream.skip_whitespace();
        Self { stream }
    }

    fn is_eof(&mut self) -> bool {
        self.stream.is_eof()
    }

    fn parse_score(&mut self) -> Result<Score, ParseError> {
        let mut score = Score::default();
        // Cursor position in quarter-lengths; rests only advance it.
        let mut cursor = Rational::zero();
        // Indices of the events inside the currently open slur, if any.
        let mut open_slur: Option<Vec<usize>> = None;
        // Set when a '&' was consumed and the next note must complete it.
        let mut pending_tie = false;

        while !self.is_eof() {
            match self.peek_char()? {
                '@' => {
                    self.expect_char()?;
                    self.parse_directive(&mut score)?;
                }
                '(' => {
                    self.expect_char()?;
                    self.stream.skip_whitespace();
                    if open_slur.is_some() {
                        return Err(ParseError::NestedSlur);
                    }
                    open_slur = Some(Vec::new());
                }
                ')' => {
                    self.expect_char()?;
                    self.stream.skip_whitespace();
                    match open_slur.take() {
                        Some(events) => score.slurs.push(SlurSpan { events }),
                        None => return Err(ParseError::UnmatchedSlurEnd),
                    }
                }
                '&' => {
                    self.expect_char()?;
                    self.stream.skip_whitespace();
                    match score.events.last_mut() {
                        Some(event) => event.tied_to_next = true,
                        None => return Err(ParseError::DanglingTie),
                    }
                    pending_tie = true;
                }
                'r' | 'R' => {
                    self.expect_char()?;
                    let duration = self.parse_duration()?;
                    self.stream.skip_whitespace();
                    cursor += duration;
                }
                'a'..='g' | 'A'..='G' => {
                    let event = self.parse_note_event(cursor)?;
                    cursor += event.quarter_duration;
                    if let Some(events) = open_slur.as_mut() {
                        events.push(score.events.len());
                    }
                    score.events.push(event);
                    pending_tie = false;
                }
                ch => return Err(ParseError::UnknownSymbol { ch }),
            }
        }

        if open_slur.is_some() {
            return Err(ParseError::UnterminatedSlur);
        }
        if pending_tie {
            return Err(ParseError::DanglingTie);
        }
        Ok(score)
    }

    fn parse_note_event(&mut self, cursor: Rational) -> Result<NoteEvent, ParseError> {
        let pitch = self.parse_pitch()?;
        let duration = self.parse_duration()?;
        let markings = self.parse_markings();
        self.stream.skip_whitespace();

        Ok(NoteEvent {
            pitch,
            quarter_offset: cursor,
            quarter_duration: duration,
            markings,
            tied_to_next: false,
        })
    }

    fn parse_pitch(&mut self) -> Result<Pitch, ParseError> {
        // First comes the name
        let name = match self.expect_char()? {
            'a' | 'A' => PitchName::A,
            'b' | 'B' => PitchName::B,
            'c' | 'C' => PitchName::C,
            'd' | 'D' => PitchName::D,
            'e' | 'E' => PitchName::E,
            'f' | 'F' => PitchName::F,
            'g' | 'G' => PitchName::G,
            ch => return Err(ParseError::NoNote { ch }),
        };
        // Then any accidental
        let accidental = match self.peek_char_optional() {
            Some(ch) => {
                if ch == '♯' || ch == '#' {
                    self.stream.advance();
                    Accidental::Sharp
                } else if ch == '♭' || ch == 'b' {
                    self.stream.advance();
                    Accidental::Flat
                } else {
                    Accidental::Base
                }
            }
            _ => Accidental::Base,
        };
        // Then the octave
        let octave = match self.stream.current() {
            Some((_, ch)) if ch.is_ascii_digit() => {
                self.stream.advance();
                ch.to_digit(10).unwrap() as i32
            }
            _ => 4,
        };
        Pitch::try_named(name, accidental, octave).ok_or(ParseError::UnrepresentablePitch)
    }

    /// Parse a duration in quarter-lengths: `+`/`-` adjust in powers of two
    /// starting from a single quarter, dots extend by halves.
    fn parse_duration(&mut self) -> Result<Rational, ParseError> {
        let mut power: i64 = 0;
        loop {
            match self.stream.current() {
                Some((_, '+')) => {
                    self.stream.advance();
                    power += 1;
                }
                Some((_, '-')) => {
                    self.stream.advance();
                    power -= 1;
                }
                _ => break,
            }
        }
        // then the dots
        let mut dots = 0;
        while let Some('.') = self.peek_char_optional() {
            self.expect_char()?;
            dots += 1;
        }
        // Then put everything together
        let mut duration = Rational::int(2).powi(power);
        for i in 0..dots {
            // each dot is worth half of the previous note duration
            duration += Rational::int(2).powi(power - i - 1);
        }
        Ok(duration)
    }

    fn parse_markings(&mut self) -> Vec<Marking> {
        let mut markings = Vec::new();
        loop {
            match self.peek_char_optional() {
                Some('\'') => markings.push(Marking::Staccato),
                Some('!') => markings.push(Marking::Staccatissimo),
                Some('_') => markings.push(Marking::Tenuto),
                _ => break,
            }
            self.stream.advance();
        }
        markings
    }

    /// Parse a `@tempo <referent>=<bpm>` directive; the `@` was already
    /// consumed. Only the first tempo directive of a score takes effect.
    fn parse_directive(&mut self, score: &mut Score) -> Result<(), ParseError> {
        let name = self.parse_word();
        if name != "tempo" {
            return Err(ParseError::UnknownDirective { name });
        }
        self.stream.skip_whitespace();

        let referent_str = self.take_until('=');
        let referent: Rational = referent_str
            .trim()
            .parse()
            .map_err(|_| ParseError::BadTempo {
                reason: "referent must be a fraction of a quarter note",
            })?;
        if referent <= Rational::zero() {
            return Err(ParseError::BadTempo {
                reason: "referent must be positive",
            });
        }
        if self.peek_char_optional() != Some('=') {
            return Err(ParseError::BadTempo {
                reason: "expected '=' after the referent",
            });
        }
        self.stream.advance();
        self.stream.skip_whitespace();

        let bpm_str = self.parse_word();
        let beats_per_minute: i64 = bpm_str.parse().map_err(|_| ParseError::BadTempo {
            reason: "rate must be a whole number of beats per minute",
        })?;
        if beats_per_minute <= 0 {
            return Err(ParseError::BadTempo {
                reason: "rate must be positive",
            });
        }
        self.stream.skip_whitespace();

        if score.tempo.is_none() {
            score.tempo = Some(TempoMarking {
                quarter_referent: referent,
                beats_per_minute,
            });
        }
        Ok(())
    }

    /// Consume a run of non-whitespace word characters.
    fn parse_word(&mut self) -> String {
        let mut word = String::new();
        while let Some((_, ch)) = self.stream.current() {
            if ch.is_alphanumeric() {
                word.push(ch);
                self.stream.advance();
            } else {
                break;
            }
        }
        word
    }

    /// Consume characters up to (not including) the given terminator or the
    /// end of the current line.
    fn take_until(&mut self, terminator: char) -> String {
        let mut taken = String::new();
        while let Some((_, ch)) = self.stream.current() {
            if ch == terminator || ch == '\n' {
                break;
            }
            taken.push(ch);
            self.stream.advance();
        }
        taken
    }

    fn expect_char(&mut self) -> Result<char, ParseError> {
        if let Some((_, ch)) = self.stream.next() {
            Ok(ch)
        } else {
            Err(ParseError::UnexpectedEof)
        }
    }

    fn peek_char(&mut self) -> Result<char, ParseError> {
        if let Some((_, ch)) = self.stream.current() {
            Ok(ch)
        } else {
            Err(ParseError::UnexpectedEof)
        }
    }

    fn peek_char_optional(&mut self) -> Option<char> {
        if let Some((_, ch)) = self.stream.current() {
            Some(ch)
        } else {
            None
        }
    }
}

struct Scan<'a> {
    stream: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Scan<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            stream: input.char_indices().peekable(),
        }
    }

    pub fn is_eof(&mut self) -> bool {
        self.current().is_none()
    }

    pub fn current(&mut self) -> Option<(usize, char)> {
        self.stream.peek().cloned()
    }

    pub fn next(&mut self) -> Option<(usize, char)> {
        self.stream.next()
    }

    pub fn advance(&mut self) {
        self.stream.next();
    }

    pub fn skip_whitespace(&mut self) {
        while let Some((_, ch)) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_note_sequence() {
        let score = parse_score(
            r"
            c- d- e- f- g g
            a- a- a- a- g+",
        )
        .unwrap();
        assert_eq!(score.events.len(), 11);
        assert!(score.slurs.is_empty());
        assert!(score.tempo.is_none());

        let first = &score.events[0];
        assert_eq!(first.pitch, Pitch::named_str("C4").unwrap());
        assert_eq!(first.quarter_offset, Rational::zero());
        assert_eq!(first.quarter_duration, Rational::new(1, 2));

        // the two plain quarters start after four eighths
        assert_eq!(score.events[4].quarter_offset, Rational::int(2));
        assert_eq!(score.events[4].quarter_duration, Rational::one());
    }

    #[test]
    fn parses_durations() {
        let score = parse_score("a a+ a- a. a-..").unwrap();
        let durations: Vec<Rational> = score
            .events
            .iter()
            .map(|event| event.quarter_duration)
            .collect();
        assert_eq!(
            durations,
            vec![
                Rational::one(),
                Rational::int(2),
                Rational::new(1, 2),
                Rational::new(3, 2),
                Rational::new(7, 8),
            ]
        );
    }

    #[test]
    fn rests_advance_the_cursor() {
        let score = parse_score("a r a r- a").unwrap();
        let offsets: Vec<Rational> = score
            .events
            .iter()
            .map(|event| event.quarter_offset)
            .collect();
        assert_eq!(
            offsets,
            vec![Rational::zero(), Rational::int(2), Rational::new(7, 2)]
        );
    }

    #[test]
    fn parses_markings() {
        let score = parse_score("a' b! c_ d'_ e").unwrap();
        assert_eq!(score.events[0].markings, vec![Marking::Staccato]);
        assert_eq!(score.events[1].markings, vec![Marking::Staccatissimo]);
        assert_eq!(score.events[2].markings, vec![Marking::Tenuto]);
        assert_eq!(
            score.events[3].markings,
            vec![Marking::Staccato, Marking::Tenuto]
        );
        assert!(score.events[4].markings.is_empty());
    }

    #[test]
    fn parses_slur_spans() {
        let score = parse_score("a (b c d) e (f g)").unwrap();
        assert_eq!(score.slurs.len(), 2);
        assert_eq!(score.slurs[0].events, vec![1, 2, 3]);
        assert_eq!(score.slurs[1].events, vec![5, 6]);
    }

    #[test]
    fn parses_ties() {
        let score = parse_score("a & a b").unwrap();
        assert!(score.events[0].tied_to_next);
        assert!(!score.events[1].tied_to_next);
        assert!(!score.events[2].tied_to_next);
    }

    #[test]
    fn parses_tempo_directive() {
        let score = parse_score("@tempo 1/2=80\na b").unwrap();
        assert_eq!(
            score.tempo,
            Some(TempoMarking {
                quarter_referent: Rational::new(1, 2),
                beats_per_minute: 80,
            })
        );
    }

    #[test]
    fn first_tempo_directive_wins() {
        let score = parse_score("@tempo 1=60\na\n@tempo 1=90\nb").unwrap();
        assert_eq!(score.tempo.unwrap().beats_per_minute, 60);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_score("a (b (c))").unwrap_err(), ParseError::NestedSlur);
        assert_eq!(parse_score("a b)").unwrap_err(), ParseError::UnmatchedSlurEnd);
        assert_eq!(parse_score("(a b").unwrap_err(), ParseError::UnterminatedSlur);
        assert_eq!(parse_score("& a").unwrap_err(), ParseError::DanglingTie);
        assert_eq!(parse_score("a &").unwrap_err(), ParseError::DanglingTie);
        assert_eq!(parse_score("a x").unwrap_err(), ParseError::UnknownSymbol { ch: 'x' });
        assert!(matches!(
            parse_score("@tempo nope=60\na").unwrap_err(),
            ParseError::BadTempo { .. }
        ));
        assert!(matches!(
            parse_score("@allegro\na").unwrap_err(),
            ParseError::UnknownDirective { .. }
        ));
    }

    #[test]
    fn marking_synonyms_collapse_onto_the_table() {
        assert_eq!(
            Marking::Spiccato.articulation(),
            Articulation::Staccatissimo
        );
        assert_eq!(
            Marking::DetachedLegato.articulation(),
            Articulation::NonLegato
        );
        assert!(Marking::Spiccato.is_staccato_kind());
        assert!(!Marking::DetachedLegato.is_staccato_kind());
        assert!(Marking::Tenuto.is_tenuto_kind());
    }
}
