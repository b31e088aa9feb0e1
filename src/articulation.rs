// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Sounding lengths of the standard articulations, as a fraction of the
//! written note length. The remainder of the written length is silence,
//! giving audible separation between consecutive notes.

use crate::rational::Rational;

/// The named articulations, ordered from shortest to longest sounding ratio.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Articulation {
    Staccatissimo,
    Staccato,
    MezzoStaccato,
    Portato,
    NonLegato,
    Tenuto,
    Legato,
}

impl Articulation {
    /// The fraction of the written duration that actually sounds.
    /// Always within `(0, 1]`; legato fills the whole written length.
    ///
    /// ```
    /// # use melodyc::articulation::Articulation;
    /// # use melodyc::rational::Rational;
    /// assert_eq!(Articulation::Staccato.ratio(), Rational::new(2, 7));
    /// assert_eq!(Articulation::Legato.ratio(), Rational::one());
    /// ```
    pub fn ratio(self) -> Rational {
        match self {
            Articulation::Staccatissimo => Rational::new(1, 7),
            Articulation::Staccato => Rational::new(2, 7),
            Articulation::MezzoStaccato => Rational::new(3, 7),
            Articulation::Portato => Rational::new(4, 7),
            Articulation::NonLegato => Rational::new(5, 7),
            Articulation::Tenuto => Rational::new(6, 7),
            Articulation::Legato => Rational::one(),
        }
    }
}

/// Unmarked notes sound non-legato, slightly detached from their neighbours.
impl Default for Articulation {
    fn default() -> Self {
        Articulation::NonLegato
    }
}
