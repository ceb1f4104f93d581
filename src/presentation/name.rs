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

//! Parsing of domain names.

use super::{Error, ErrorKind, Parser, Position, Result};
use crate::name::{self, Name, NameBuilder};

impl Parser<'_> {
    /// Parses a domain name. `@` and `.` both denote the root, and
    /// relative names are made fully qualified by appending the root.
    /// The reader should be advanced to the next field first; at a
    /// field end this returns the root, which is probably not what you
    /// want.
    pub(super) fn parse_name(&mut self) -> Result<Name> {
        if self.reader.expect_field(b"@") || self.reader.expect_field(b".") {
            return Ok(Name::root());
        }

        let name_start_position = self.reader.position();
        let mut label_start_position = self.reader.position();
        let mut builder = NameBuilder::new();

        while let Some(octet) = self.reader.read_field_octet() {
            let result = match octet {
                b'\\' => {
                    let escaped_octet = self.parse_escape()?;
                    builder.try_push(escaped_octet)
                }
                b'.' => builder.next_label(),
                _ if !octet.is_ascii() => Err(name::Error::StrNotAscii),
                _ => builder.try_push(octet),
            };
            result.map_err(|e| build_label_parse_error(e, name_start_position, label_start_position))?;
            if octet == b'.' {
                label_start_position = self.reader.position();
            }
        }

        builder
            .finish_qualified()
            .map_err(|e| Error::new(name_start_position, ErrorKind::InvalidName(e)))
    }
}

/// Generates a parse error from a [`name::Error`], placed at the
/// current label if the label is at fault and at the start of the name
/// otherwise.
fn build_label_parse_error(
    error: name::Error,
    name_start_position: Position,
    label_start_position: Position,
) -> Error {
    if error == name::Error::LabelTooLong {
        Error::new(label_start_position, ErrorKind::InvalidLabel(error))
    } else {
        Error::new(name_start_position, ErrorKind::InvalidName(error))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::tests::make_parser;
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn parsing_works() {
        assert_eq!(
            make_parser("rrdb.test. extra data").parse_name(),
            Ok(name("rrdb.test.")),
        );
    }

    #[test]
    fn relative_names_are_qualified_with_the_root() {
        assert_eq!(make_parser("foo.bar.baz").parse_name(), Ok(name("foo.bar.baz.")));
    }

    #[test]
    fn escaping_works() {
        assert_eq!(
            make_parser("test\\.with.a.dot.").parse_name(),
            Ok(name("test\\.with.a.dot.")),
        );
        assert_eq!(
            make_parser("test\\000with.a.null").parse_name(),
            Ok(name("test\\000with.a.null.")),
        );
    }

    #[test]
    fn at_and_dot_are_the_root() {
        assert_eq!(make_parser("@ extra").parse_name(), Ok(Name::root()));
        assert_eq!(make_parser(". extra").parse_name(), Ok(Name::root()));
    }

    #[test]
    fn long_labels_are_reported_at_the_label() {
        let text = format!("ok.{}.test.", "x".repeat(64));
        assert!(matches!(
            make_parser(&text).parse_name(),
            Err(e) if e.kind == ErrorKind::InvalidLabel(name::Error::LabelTooLong)
                && e.position.column == 4,
        ));
    }

    #[test]
    fn empty_labels_are_rejected() {
        assert!(matches!(
            make_parser("a..b").parse_name(),
            Err(e) if e.kind == ErrorKind::InvalidName(name::Error::NullNonTerminal),
        ));
    }

    #[test]
    fn non_ascii_names_are_rejected() {
        assert!(matches!(
            make_parser("bücher.test.").parse_name(),
            Err(e) if e.kind == ErrorKind::InvalidName(name::Error::StrNotAscii),
        ));
    }
}
