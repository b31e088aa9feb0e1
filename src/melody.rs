// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The melody aggregate: an ordered collection of notes plus the tempo to
//! play them at, built from a score in one pass of articulation inference.
//!
//! Construction runs over a staging arena of notes addressed by event index
//! (ties first, then slurs, then explicit markings, then the tempo) and only
//! then freezes the result. A frozen melody is immutable; machine notes are
//! recomputed on every request instead of being cached, so code emission and
//! the audio preview always observe identical values.
//!
//! Known quirk, kept deliberately: the marking pass runs after the slur pass
//! and does not re-check slur membership, so an explicit marking on a
//! non-final slurred note silently overwrites the legato the slur implied.

use log::debug;
use snafu::{ensure, ResultExt, Snafu};

use crate::articulation::Articulation;
use crate::note::{MachineNote, Note, TieError};
use crate::rational::Rational;
use crate::score::Score;
use crate::tempo::{RangeError, Tempo};

#[derive(Debug, Snafu)]
pub enum BuildError {
    /// A melody without notes has no duration, so there is nothing valid to
    /// construct.
    #[snafu(display("score contains no notes"))]
    EmptyScore,
    #[snafu(display("could not merge tied notes: {}", source))]
    BadTie { source: TieError },
}

#[derive(Debug, Snafu)]
pub enum ProjectError {
    #[snafu(display("note {} is not machine representable: {}", index, source))]
    NotRepresentable { index: usize, source: RangeError },
}

/// A sequential collection of notes and the tempo indicating the speed to
/// play them. Notes are sorted by offset; the collection is non-empty and
/// immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Melody {
    notes: Vec<Note>,
    tempo: Tempo,
}

impl Melody {
    /// Freeze a collection of notes into a melody. The notes are sorted by
    /// offset (stable, so simultaneous notes keep their insertion order).
    pub fn new(mut notes: Vec<Note>, tempo: Tempo) -> Result<Melody, BuildError> {
        ensure!(!notes.is_empty(), EmptyScore);
        notes.sort_by(|a, b| a.offset().cmp(&b.offset()));
        Ok(Melody { notes, tempo })
    }

    /// Build a melody from a parsed score, resolving ties, slurs,
    /// articulation markings and the tempo marking.
    pub fn from_score(score: &Score) -> Result<Melody, BuildError> {
        // Staging arena, one slot per score event. Tie merging empties the
        // earlier slot of a merged pair, so slur and marking passes address
        // surviving notes through their original event index.
        let mut slots: Vec<Option<Note>> = score
            .events
            .iter()
            .map(|event| {
                Some(Note::new(
                    event.pitch,
                    // quarter-lengths to whole-lengths
                    event.quarter_offset / 4,
                    event.quarter_duration / 4,
                ))
            })
            .collect();

        // Tie pre-pass: merge adjacent tied events. The merged note lands in
        // the later slot so the final segment's markings resolve against it.
        for index in 0..slots.len().saturating_sub(1) {
            if score.events[index].tied_to_next {
                let earlier = slots[index].take().expect("tie pass visits each slot once");
                let merged = {
                    let later = slots[index + 1]
                        .as_ref()
                        .expect("tie flag always has a following event");
                    earlier.tie_with(later).context(BadTie)?
                };
                slots[index + 1] = Some(merged);
            }
        }

        // Slur inference: every surviving note under the slur except the
        // last sounds legato into its successor. The last one keeps its own
        // marking because the slur does not extend past it.
        for slur in &score.slurs {
            let covered: Vec<usize> = slur
                .events
                .iter()
                .copied()
                .filter(|&index| slots[index].is_some())
                .collect();
            for &index in covered.iter().rev().skip(1) {
                if let Some(note) = slots[index].as_mut() {
                    note.set_articulation(Articulation::Legato.ratio());
                }
            }
        }

        // Explicit markings. A note carrying both a staccato-kind and a
        // tenuto-kind marking has no single named equivalent and becomes
        // mezzo-staccato; otherwise the first marking known to the table
        // wins. Notes without a recognized marking keep whatever the slur
        // pass left them with.
        for (event, slot) in score.events.iter().zip(slots.iter_mut()) {
            let note = match slot.as_mut() {
                Some(note) => note,
                None => continue,
            };
            if event.markings.is_empty() {
                continue;
            }
            let staccato = event.markings.iter().any(|m| m.is_staccato_kind());
            let tenuto = event.markings.iter().any(|m| m.is_tenuto_kind());
            if staccato && tenuto {
                note.set_articulation(Articulation::MezzoStaccato.ratio());
            } else if let Some(marking) = event.markings.first() {
                note.set_articulation(marking.articulation().ratio());
            }
        }

        let tempo = match score.tempo {
            Some(marking) => Tempo::new(
                // quarter-length referent to whole-lengths
                marking.quarter_referent / 4,
                marking.beats_per_minute,
            ),
            None => Tempo::default(),
        };

        let notes: Vec<Note> = slots.into_iter().flatten().collect();
        debug!(
            "staged {} notes from {} score events at {:?}",
            notes.len(),
            score.events.len(),
            tempo
        );
        Melody::new(notes, tempo)
    }

    /// The notes of the melody in ascending offset order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// The number of notes in the melody. Never zero.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// The written duration of the melody in whole-lengths, up to the end of
    /// the last note in sorted order.
    pub fn duration(&self) -> Rational {
        let last = self.notes.last().expect("melody is never empty");
        last.end_offset()
    }

    /// Project every note into its machine form, in melody order. The
    /// projection is recomputed on every call; a failed note aborts the
    /// whole conversion, because downstream array sizing depends on a
    /// complete note set.
    pub fn machine_notes(&self) -> Result<Vec<MachineNote>, ProjectError> {
        self.notes
            .iter()
            .enumerate()
            .map(|(index, note)| {
                self.tempo
                    .machine_note(note)
                    .context(NotRepresentable { index })
            })
            .collect()
    }

    /// The duration of the melody as actually played back, in milliseconds:
    /// the end of its final machine note.
    pub fn actual_duration_millis(&self) -> Result<u32, ProjectError> {
        let machine_notes = self.machine_notes()?;
        let last = machine_notes.last().expect("melody is never empty");
        Ok(last.offset_millis + u32::from(last.duration_millis))
    }
}
