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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

/// A facility to build [`Name`]s octet by octet.
///
/// The `NameBuilder` maintains the on-the-wire representation and
/// label offsets of the name under construction in fixed-size buffers.
/// The length octet of the label currently being built is kept as a
/// placeholder and filled in when the label is finished.
///
/// A new `NameBuilder` starts with a single, empty label. Finishing it
/// at this point yields the root:
///
/// ```
/// use rrdb::name::{Name, NameBuilder};
/// assert!(NameBuilder::new().finish().unwrap().is_root());
/// ```
///
/// Octets are added to the current label with
/// [`NameBuilder::try_push`] and [`NameBuilder::try_push_slice`], and
/// [`NameBuilder::next_label`] starts a new label. If the current label
/// is empty when the build is finished, it becomes the terminating null
/// label. Otherwise, the name is relative, and [`NameBuilder::finish`]
/// rejects it while [`NameBuilder::finish_qualified`] terminates it
/// with the root.
///
/// ```
/// use rrdb::name::NameBuilder;
/// let mut builder = NameBuilder::new();
/// builder.try_push_slice(b"example").unwrap();
/// builder.next_label().unwrap();
/// builder.try_push_slice(b"test").unwrap();
/// assert_eq!(builder.finish_qualified().unwrap(), "example.test.".parse().unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_offsets: ArrayVec<u8, MAX_N_LABELS>,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder` with a single empty label.
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        let mut label_offsets = ArrayVec::new();
        label_offsets.push(0);
        Self {
            wire_repr,
            label_offsets,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Returns whether the name built so far ends with the null label,
    /// i.e., whether nothing has been pushed since the last call to
    /// [`NameBuilder::next_label`].
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add `octet` to the current label. In the error case,
    /// the builder is left unchanged.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len as usize >= MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add `octets` to the current label. In the error case,
    /// the builder is left unchanged.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if self.label_len as usize + octets.len() > MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_extend_from_slice(octets).is_ok() {
            self.label_len += octets.len() as u8;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Finishes the current label and starts a new one. Fails if the
    /// current label is empty, since only the last label of a name may
    /// be null.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else if self.wire_repr.is_full() || self.label_offsets.is_full() {
            Err(Error::NameTooLong)
        } else {
            self.wire_repr[self.label_start] = self.label_len;
            self.label_start = self.wire_repr.len();
            self.label_len = 0;
            self.wire_repr.push(0);
            self.label_offsets.push(self.label_start as u8);
            Ok(())
        }
    }

    /// Finishes the build, requiring the name to be fully qualified.
    pub fn finish(self) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            Ok(Name {
                wire_repr: self.wire_repr,
                label_offsets: self.label_offsets,
            })
        } else {
            Err(Error::NonNullTerminal)
        }
    }

    /// Finishes the build. If the name is relative, it is made fully
    /// qualified by appending the null label.
    pub fn finish_qualified(mut self) -> Result<Name, Error> {
        if !self.is_fully_qualified() {
            self.next_label()?;
        }
        self.finish()
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_names_label_by_label() {
        let mut builder = NameBuilder::new();
        builder.try_push(b'a').unwrap();
        builder.next_label().unwrap();
        builder.try_push_slice(b"bb").unwrap();
        builder.next_label().unwrap();
        let name = builder.finish().unwrap();
        assert_eq!(name.wire_repr(), b"\x01a\x02bb\x00");
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn finish_rejects_relative_names() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(b"relative").unwrap();
        assert_eq!(builder.finish(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn finish_qualified_appends_the_root() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(b"relative").unwrap();
        let name = builder.finish_qualified().unwrap();
        assert_eq!(name.wire_repr(), b"\x08relative\x00");
    }

    #[test]
    fn labels_cannot_exceed_63_octets() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(&[b'x'; 63]).unwrap();
        assert_eq!(builder.try_push(b'x'), Err(Error::LabelTooLong));
        assert_eq!(builder.try_push_slice(b"x"), Err(Error::LabelTooLong));
    }

    #[test]
    fn empty_labels_are_rejected() {
        let mut builder = NameBuilder::new();
        assert_eq!(builder.next_label(), Err(Error::NullNonTerminal));
    }
}
