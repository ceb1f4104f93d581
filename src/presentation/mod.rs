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

//! Parsing of single resource records in presentation format.
//!
//! The presentation format is the textual form of resource records
//! used in zone files ([RFC 1035 § 5]). A record consists of an owner,
//! an optional TTL and an optional class (in either order), a type, and
//! RDATA whose format depends on the type:
//!
//! ```text
//! www.example.com. 300 IN A 192.0.2.1
//! ```
//!
//! Records are parsed one at a time, without the context a zone file
//! would provide. Consequently:
//!
//! * there is no `$ORIGIN`: the origin is always the root, so relative
//!   names (in the owner and in RDATA) are made fully qualified by
//!   appending the root, and `@` stands for the root;
//! * an owner that is omitted (the text starts with whitespace) is the
//!   root as well;
//! * an omitted TTL is [`Ttl::DEFAULT`](crate::rr::Ttl::DEFAULT), and
//!   an omitted class is [`Class::IN`](crate::class::Class::IN).
//!
//! Comments (`;`), parentheses for line continuation, quoted
//! `<character-string>`s and escape sequences are processed as in zone
//! files. RDATA may be given in the generic form of [RFC 3597 § 5] for
//! any type, and must be for types without a typed representation. OPT
//! and TSIG records are rejected, since they are never stored.
//!
//! The work is split between the [`Reader`], which moves between the
//! fields of the text, and the [`Parser`], which interprets them. The
//! [`Parser`]'s methods are spread across submodules by what they
//! parse.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
//! [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5

use std::str::FromStr;

use crate::rr::ResourceRecord;

mod character_string;
mod error;
mod escape;
mod name;
mod reader;
mod record;
pub use error::{Error, ErrorKind, Result};
use reader::{FieldOrEol, Reader};
pub use reader::Position;

/// Interprets presentation-format text; see the [module-level
/// documentation](self).
struct Parser<'a> {
    reader: Reader<'a>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            reader: Reader::new(text),
        }
    }
}

/// Parses a single resource record from presentation-format text.
pub fn parse_record(text: &str) -> Result<ResourceRecord> {
    let mut parser = Parser::new(text);
    let record = parser.parse_record()?;
    parser.reader.expect_end()?;
    Ok(record)
}

impl FromStr for ResourceRecord {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        parse_record(text)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl, Type};

    pub(super) fn make_parser(text: &str) -> Parser {
        Parser::new(text)
    }

    #[test]
    fn parses_a_full_record() {
        let rr: ResourceRecord = "www.example.com. 300 IN A 192.0.2.1".parse().unwrap();
        assert_eq!(rr.owner, "www.example.com.".parse().unwrap());
        assert_eq!(u32::from(rr.ttl), 300);
        assert_eq!(rr.class, Class::IN);
        assert_eq!(rr.rr_type, Type::A);
        assert_eq!(rr.rdata, Rdata::A("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn round_trips_through_canonical_form() {
        let rr: ResourceRecord = "foo  IN  3600 ( A\n 127.0.0.1 ) ; loopback"
            .parse()
            .unwrap();
        let canonical = rr.to_string();
        assert_eq!(canonical, "foo.\t3600\tIN\tA\t127.0.0.1");
        assert_eq!(canonical.parse::<ResourceRecord>().unwrap(), rr);
    }

    #[test]
    fn applies_defaults() {
        let rr: ResourceRecord = "foo TXT hello".parse().unwrap();
        assert_eq!(rr.ttl, Ttl::DEFAULT);
        assert_eq!(rr.class, Class::IN);
    }

    #[test]
    fn rejects_trailing_data() {
        assert!(matches!(
            "foo A 127.0.0.1 extra".parse::<ResourceRecord>(),
            Err(e) if e.kind == ErrorKind::ExpectedEnd,
        ));
        assert!(matches!(
            "foo A 127.0.0.1\nbar A 127.0.0.2".parse::<ResourceRecord>(),
            Err(e) if e.kind == ErrorKind::ExpectedEnd && e.line() == 2,
        ));
    }

    #[test]
    fn tolerates_trailing_newlines() {
        assert!("foo A 127.0.0.1\n\n".parse::<ResourceRecord>().is_ok());
    }

    #[test]
    fn rejects_empty_text() {
        for text in ["", "   ", "; just a comment\n"] {
            assert!(matches!(
                text.parse::<ResourceRecord>(),
                Err(e) if e.kind == ErrorKind::EmptyRecord,
            ));
        }
    }

    #[test]
    fn errors_display_their_position() {
        let error = "foo A 256.0.0.1".parse::<ResourceRecord>().unwrap_err();
        assert_eq!(error.column(), 7);
        assert!(error.to_string().ends_with("at line 1 column 7"));
    }
}
