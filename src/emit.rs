// melodyc -- compiles musical scores into embeddable melody definitions
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Emission of a melody as C++ source text.
//!
//! The output is a fixed textual contract the firmware depends on verbatim:
//! a `Melody<N>` array literal of `{frequency, offset, duration}` triples in
//! ascending offset order, with the note count as the template argument.

use std::fmt::Write;

use snafu::{ensure, ResultExt, Snafu};

use crate::melody::{Melody, ProjectError};

/// The variable name used when the caller does not request one.
pub const DEFAULT_VARIABLE: &str = "MY_MELODY";

#[derive(Debug, Snafu)]
pub enum EmitError {
    /// Only letters and underscores are accepted, stricter than C++
    /// requires. In particular digits are rejected even in non-leading
    /// positions.
    #[snafu(display(
        "'{}' is not a usable variable name (letters and underscores only)",
        name
    ))]
    InvalidIdentifier { name: String },
    #[snafu(display("{}", source))]
    Unprojectable { source: ProjectError },
}

/// Render the C++ definition of the melody under the given variable name.
///
/// ```text
/// const Melody<3> MY_MELODY = {{
///   {440, 0, 386},
///   {494, 500, 386},
///   {523, 1000, 386}
/// }};
/// ```
pub fn cpp_definition(melody: &Melody, variable_name: &str) -> Result<String, EmitError> {
    ensure!(
        is_valid_identifier(variable_name),
        InvalidIdentifier {
            name: variable_name,
        }
    );

    let machine_notes = melody.machine_notes().context(Unprojectable)?;

    let mut source = format!(
        "const Melody<{}> {} = {{{{\n",
        machine_notes.len(),
        variable_name
    );
    for (index, machine_note) in machine_notes.iter().enumerate() {
        if index > 0 {
            source.push_str(",\n");
        }
        write!(
            source,
            "  {{{}, {}, {}}}",
            machine_note.frequency, machine_note.offset_millis, machine_note.duration_millis
        )
        .expect("writing to a string cannot fail");
    }
    source.push_str("\n}};");
    Ok(source)
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|ch| ch.is_ascii_alphabetic() || ch == '_')
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
    fn emits_the_firmware_contract() {
        let melody = build("a b");
        let source = cpp_definition(&melody, DEFAULT_VARIABLE).unwrap();
        assert_eq!(
            source,
            "const Melody<2> MY_MELODY = {{\n  {440, 0, 386},\n  {494, 500, 386}\n}};"
        );
    }

    #[test]
    fn emits_a_single_note_without_trailing_comma() {
        let melody = build("a");
        let source = cpp_definition(&melody, "ALARM").unwrap();
        assert_eq!(source, "const Melody<1> ALARM = {{\n  {440, 0, 386}\n}};");
    }

    #[test]
    fn accepts_letters_and_underscores() {
        let melody = build("a");
        assert!(cpp_definition(&melody, "my_var").is_ok());
        assert!(cpp_definition(&melody, "_").is_ok());
        assert!(cpp_definition(&melody, "TUNE").is_ok());
    }

    #[test]
    fn rejects_digits_and_punctuation() {
        let melody = build("a");
        for name in &["My_Var1", "", "with space", "hyphen-ated", "1up"] {
            assert!(
                matches!(
                    cpp_definition(&melody, name),
                    Err(EmitError::InvalidIdentifier { .. })
                ),
                "{:?} should have been rejected",
                name
            );
        }
    }
}
