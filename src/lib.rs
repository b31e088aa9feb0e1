// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

pub mod articulation;
pub mod emit;
pub mod melody;
pub mod note;
pub mod output;
pub mod score;
pub mod tempo;

// Utility modules
pub mod rational;
