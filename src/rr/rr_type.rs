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

//! Provides the [`Type`] structure for DNS RR types.

use crate::util::u16_mnemonics;

/// Represents the RR type of a DNS record.
///
/// An RR type is an unsigned 16-bit integer, so this is a wrapper
/// around `u16` with constants for the types this crate knows about
/// and conversions to and from the textual forms (e.g. `CNAME` or the
/// RFC 3597 `TYPE5`). Records are persisted with the numeric value.
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Type(u16);

u16_mnemonics!(Type, "TYPE", "type", {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    NULL = 10,
    PTR = 12,
    HINFO = 13,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    DNAME = 39,
    OPT = 41,
    TSIG = 250,
    CAA = 257,
});

impl Type {
    /// Returns whether records of this type may not be stored: OPT is
    /// a pseudo-RR of the message layer and TSIG records are generated
    /// per transaction.
    pub fn is_meta(self) -> bool {
        self == Self::OPT || self == Self::TSIG
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_displays_according_to_rfc3597() {
        // TYPE65280 is from the private use range, so it should always
        // be unknown.
        assert_eq!(Type::from(0xff00).to_string(), "TYPE65280");
        assert_eq!(Type::DNAME.to_string(), "DNAME");
    }

    #[test]
    fn type_parses_according_to_rfc3597() {
        assert_eq!("TYPE1".parse::<Type>(), Ok(Type::A));
        assert_eq!("type65280".parse::<Type>().map(u16::from), Ok(65280));
        assert_eq!("cname".parse::<Type>(), Ok(Type::CNAME));
    }

    #[test]
    fn type_rejects_garbage() {
        assert_eq!("BOGUS".parse::<Type>(), Err("unknown type"));
        assert!("TYPE".parse::<Type>().is_err());
        assert!("TYPE70000".parse::<Type>().is_err());
    }

    #[test]
    fn meta_types_are_identified() {
        assert!(Type::OPT.is_meta());
        assert!(Type::TSIG.is_meta());
        assert!(!Type::CNAME.is_meta());
    }
}
