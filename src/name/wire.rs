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

//! Parsing of uncompressed on-the-wire names, as they appear in RDATA
//! given in the RFC 3597 `\#` form.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

impl Name {
    /// Parses an uncompressed name at the beginning of `octets`,
    /// returning it and the number of octets it occupies. Compression
    /// pointers are rejected as over-long labels.
    pub fn try_from_uncompressed(octets: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut finished = false;
        let mut label_offsets = ArrayVec::<u8, MAX_N_LABELS>::new();
        while !finished && offset < octets.len() {
            let label_len = octets[offset];
            if label_len as usize > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            } else if label_len == 0 {
                finished = true;
            }
            // offset < MAX_WIRE_LEN here, and each label takes at least
            // two octets except the last, so label_offsets cannot
            // overflow.
            label_offsets.push(offset as u8);
            offset += label_len as usize + 1;
            if offset > MAX_WIRE_LEN {
                return Err(Error::NameTooLong);
            }
        }

        if finished {
            let name = Self {
                wire_repr: octets[..offset].iter().copied().collect(),
                label_offsets,
            };
            Ok((name, offset))
        } else {
            Err(Error::UnexpectedEom)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names_and_reports_length() {
        let (name, len) = Name::try_from_uncompressed(b"\x04rrdb\x04test\x00extra").unwrap();
        assert_eq!(name, "rrdb.test.".parse().unwrap());
        assert_eq!(len, 11);
        assert_eq!(name.label(1), b"test");
    }

    #[test]
    fn rejects_truncated_names() {
        assert_eq!(
            Name::try_from_uncompressed(b"\x04rrdb\x04te"),
            Err(Error::UnexpectedEom),
        );
        assert_eq!(Name::try_from_uncompressed(b""), Err(Error::UnexpectedEom));
    }

    #[test]
    fn rejects_pointers() {
        assert_eq!(
            Name::try_from_uncompressed(b"\xc0\x0c"),
            Err(Error::LabelTooLong),
        );
    }

    #[test]
    fn rejects_long_names() {
        let mut long = Vec::new();
        for _ in 0..5 {
            long.push(63);
            long.extend_from_slice(&[b'x'; 63]);
        }
        long.push(0);
        assert_eq!(Name::try_from_uncompressed(&long), Err(Error::NameTooLong));
    }
}
