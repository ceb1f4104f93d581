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

//! Data structures for handling DNS resource records.

use std::fmt;

use crate::class::Class;
use crate::name::Name;

pub mod rdata;
mod rr_type;
mod ttl;
pub use rdata::Rdata;
pub use rr_type::Type;
pub use ttl::Ttl;

/// A single resource record.
///
/// The [`Display`](fmt::Display) implementation writes the record in
/// presentation format with tab-separated fields, e.g.
///
/// ```text
/// foo.example.com.	3600	IN	A	127.0.0.1
/// ```
///
/// This is the canonical form in which records are stored and
/// returned in answers. Records are parsed from presentation format
/// through the [`FromStr`](std::str::FromStr) implementation in
/// [`crate::presentation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceRecord {
    pub owner: Name,
    pub ttl: Ttl,
    pub class: Class,
    pub rr_type: Type,
    pub rdata: Rdata,
}

impl ResourceRecord {
    /// Returns the record with its owner replaced by `owner`. This is
    /// used to synthesize answers from wildcard records.
    pub fn with_owner(self, owner: Name) -> Self {
        Self { owner, ..self }
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.owner, self.ttl, self.class, self.rr_type, self.rdata,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn displays_tab_separated() {
        let rr = ResourceRecord {
            owner: "foo.example.com.".parse().unwrap(),
            ttl: Ttl::default(),
            class: Class::IN,
            rr_type: Type::A,
            rdata: Rdata::A(Ipv4Addr::LOCALHOST),
        };
        assert_eq!(rr.to_string(), "foo.example.com.\t3600\tIN\tA\t127.0.0.1");
        assert_eq!(
            rr.with_owner("bar.example.com.".parse().unwrap()).to_string(),
            "bar.example.com.\t3600\tIN\tA\t127.0.0.1",
        );
    }
}
