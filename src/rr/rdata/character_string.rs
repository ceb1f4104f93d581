// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implementation of the [`CharacterString`] type.

use std::fmt;

use arrayvec::ArrayVec;

use crate::util::write_escaped_octet;

/// The maximum length of a `<character-string>`, not including its
/// length octet.
pub const MAX_CHARACTER_STRING_LEN: usize = 255;

/// An [RFC 1035 § 3.3] `<character-string>`: up to 255 arbitrary
/// octets.
///
/// [RFC 1035 § 3.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct CharacterString {
    octets: ArrayVec<u8, MAX_CHARACTER_STRING_LEN>,
}

/// An error signaling that data is too long for a
/// [`CharacterString`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CharacterStringTooLongError;

impl CharacterString {
    /// Returns the octets of the `<character-string>`.
    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    /// Returns the length of the `<character-string>` in octets.
    pub fn len(&self) -> usize {
        self.octets.len()
    }

    /// Returns whether the `<character-string>` is empty.
    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    /// Appends an octet.
    pub fn try_push(&mut self, octet: u8) -> Result<(), CharacterStringTooLongError> {
        self.octets
            .try_push(octet)
            .or(Err(CharacterStringTooLongError))
    }
}

impl TryFrom<&[u8]> for CharacterString {
    type Error = CharacterStringTooLongError;

    fn try_from(octets: &[u8]) -> Result<Self, Self::Error> {
        let mut character_string = Self::default();
        character_string
            .octets
            .try_extend_from_slice(octets)
            .or(Err(CharacterStringTooLongError))?;
        Ok(character_string)
    }
}

/// Writes the `<character-string>` in quoted form. Quotes and
/// backslashes are escaped, as are octets that are not printable ASCII
/// (spaces excepted).
impl fmt::Display for CharacterString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("\"")?;
        for &octet in self.octets.iter() {
            if octet == b' ' {
                f.write_str(" ")?;
            } else {
                write_escaped_octet(f, octet, b"\"\\")?;
            }
        }
        f.write_str("\"")
    }
}

impl fmt::Debug for CharacterString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for CharacterStringTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<character-string> is longer than 255 octets")
    }
}

impl std::error::Error for CharacterStringTooLongError {}
