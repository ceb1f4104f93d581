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

//! Parsing of `<character-string>`s.

use super::{Error, ErrorKind, Parser, Result};
use crate::rr::rdata::CharacterString;

impl Parser<'_> {
    /// Parses an [RFC 1035 § 3.3] `<character-string>`, which may be
    /// quoted or unquoted ([RFC 1035 § 5.1]). The reader should be
    /// advanced to the next field first.
    ///
    /// [RFC 1035 § 3.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3
    /// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
    pub(super) fn parse_character_string(&mut self) -> Result<CharacterString> {
        let start_position = self.reader.position();
        let mut character_string = CharacterString::default();
        self.parse_text_field(|octet| {
            character_string
                .try_push(octet)
                .map_err(|_| Error::new(start_position, ErrorKind::CharacterStringTooLong))
        })?;
        Ok(character_string)
    }

    /// Parses a quoted or unquoted text field like a
    /// `<character-string>`, passing each octet of its value to `sink`.
    /// Length limits are left to `sink`.
    pub(super) fn parse_text_field(&mut self, mut sink: impl FnMut(u8) -> Result<()>) -> Result<()> {
        if self.reader.peek_octet() == Some(b'"') {
            self.reader.read_octet();
            loop {
                let position = self.reader.position();
                match self.reader.read_octet() {
                    Some(b'\\') => {
                        let escaped_octet = self.parse_escape()?;
                        sink(escaped_octet)?;
                    }
                    // The closing quote ends the field, whether or not a
                    // field-ending character follows (as in BIND).
                    Some(b'"') => return Ok(()),
                    Some(octet) => sink(octet)?,
                    None => {
                        return Err(Error::new(position, ErrorKind::EofInQuotedCharacterString))
                    }
                }
            }
        } else {
            while let Some(octet) = self.reader.read_field_octet() {
                if octet == b'\\' {
                    let escaped_octet = self.parse_escape()?;
                    sink(escaped_octet)?;
                } else {
                    sink(octet)?;
                }
            }
            Ok(())
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
    fn parsing_unquoted_strings_works() {
        assert_eq!(
            make_parser("test\\000 string")
                .parse_character_string()
                .unwrap()
                .octets(),
            b"test\x00",
        );
    }

    #[test]
    fn parsing_quoted_strings_works() {
        assert_eq!(
            make_parser("\"test\\000 str\"ing")
                .parse_character_string()
                .unwrap()
                .octets(),
            b"test\x00 str",
        );
    }

    #[test]
    fn quoted_strings_may_span_lines() {
        assert_eq!(
            make_parser("\"a\nb\"").parse_character_string().unwrap().octets(),
            b"a\nb",
        );
    }

    #[test]
    fn parser_rejects_unmatched_quotes() {
        assert!(matches!(
            make_parser("\"test").parse_character_string(),
            Err(e) if e.kind == ErrorKind::EofInQuotedCharacterString,
        ));
    }

    #[test]
    fn parser_rejects_strings_that_are_too_long() {
        let unquoted = "x".repeat(256);
        let quoted = format!("\"{unquoted}\"");
        for text in [&unquoted, &quoted] {
            assert!(matches!(
                make_parser(text).parse_character_string(),
                Err(e) if e.kind == ErrorKind::CharacterStringTooLong,
            ));
        }
    }
}
