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

//! Parsing of escape sequences.

use super::{Error, ErrorKind, Parser, Result};

impl Parser<'_> {
    /// Parses an escape sequence (see [RFC 1035 § 5.1] and [RFC 4343 §
    /// 2.1]), either `\X` for a literal `X` or `\DDD` for the octet with
    /// decimal value `DDD`. The caller must already have consumed the
    /// leading `\`.
    ///
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    /// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
    pub(super) fn parse_escape(&mut self) -> Result<u8> {
        let start_position = self.reader.position();
        match self.reader.read_octet() {
            Some(first) if first.is_ascii_digit() => {
                let [tens, ones] = self
                    .reader
                    .read::<2>()
                    .ok_or_else(|| Error::new(start_position, ErrorKind::EofInEscape))?;
                if !tens.is_ascii_digit() || !ones.is_ascii_digit() {
                    return Err(Error::new(start_position, ErrorKind::EscapeNeedsThreeDigits));
                }
                let value = 100 * (first - b'0') as u16 + 10 * (tens - b'0') as u16 + (ones - b'0') as u16;
                u8::try_from(value)
                    .map_err(|_| Error::new(start_position, ErrorKind::EscapeValueOutOfRange))
            }
            Some(other) => Ok(other),
            None => Err(Error::new(start_position, ErrorKind::EofInEscape)),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;

    #[test]
    fn parsing_works_for_digits() {
        assert_eq!(make_parser("0234").parse_escape(), Ok(23));
    }

    #[test]
    fn parsing_works_for_other_characters() {
        assert_eq!(make_parser("\"x").parse_escape(), Ok(b'"'));
    }

    #[test]
    fn parsing_fails_without_enough_data() {
        for text in ["", "0", "01"] {
            assert!(matches!(
                make_parser(text).parse_escape(),
                Err(e) if e.kind == ErrorKind::EofInEscape,
            ));
        }
    }

    #[test]
    fn parsing_fails_without_enough_digits() {
        for text in ["0xx", "01x"] {
            assert!(matches!(
                make_parser(text).parse_escape(),
                Err(e) if e.kind == ErrorKind::EscapeNeedsThreeDigits,
            ));
        }
    }

    #[test]
    fn parsing_fails_for_values_out_of_range() {
        assert!(matches!(
            make_parser("256").parse_escape(),
            Err(e) if e.kind == ErrorKind::EscapeValueOutOfRange,
        ));
    }
}
