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

//! Implementation of the [`Class`] type for DNS classes.

use crate::util::u16_mnemonics;

/// Represents a class in the DNS.
///
/// This is a wrapper around [`u16`] with constants for the defined
/// classes and conversions to and from the textual forms, including
/// the RFC 3597 `CLASSnnn` form. Records stored without an explicit
/// class are [`IN`](Class::IN), which is also the [`Default`].
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Class(u16);

// RFC 1035. CS is not included since the IANA no longer lists it.
u16_mnemonics!(Class, "CLASS", "class", {
    IN = 1,
    CH = 3,
    HS = 4,
});

impl Default for Class {
    fn default() -> Self {
        Self::IN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_according_to_rfc3597() {
        // CLASS65280 is from the private use range.
        assert_eq!(Class::from(0xff00).to_string(), "CLASS65280");
        assert_eq!(Class::CH.to_string(), "CH");
    }

    #[test]
    fn parses_mnemonics_and_generic_forms() {
        assert_eq!("in".parse::<Class>(), Ok(Class::IN));
        assert_eq!("CLASS1".parse::<Class>(), Ok(Class::IN));
        assert_eq!("class65280".parse::<Class>().map(u16::from), Ok(65280));
        assert!("CLASS65536".parse::<Class>().is_err());
        assert!("CS".parse::<Class>().is_err());
    }

    #[test]
    fn default_is_in() {
        assert_eq!(Class::default(), Class::IN);
    }
}
