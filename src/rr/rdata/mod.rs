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

//! Implementation of the [`Rdata`] type.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::Type;
use crate::name::Name;
use crate::util::{write_escaped_octet, write_hex};

mod character_string;
mod wire;
pub use character_string::{CharacterString, CharacterStringTooLongError, MAX_CHARACTER_STRING_LEN};
pub use wire::InvalidRdataError;

/// The maximum length of RDATA on the wire.
pub const MAX_RDATA_LEN: usize = u16::MAX as usize;

////////////////////////////////////////////////////////////////////////
// RDATA TYPE                                                         //
////////////////////////////////////////////////////////////////////////

/// The RDATA of a resource record.
///
/// RDATA of the types this crate understands is held in typed form, so
/// that it can be validated on input and written back in a canonical
/// presentation format. Anything else is [`Rdata::Unknown`], holding
/// the raw octets from the RFC 3597 `\#` form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rdata {
    A(Ipv4Addr),
    Ns(Name),
    Cname(Name),
    Soa(Soa),
    Ptr(Name),
    Hinfo {
        cpu: CharacterString,
        os: CharacterString,
    },
    Mx {
        preference: u16,
        exchange: Name,
    },
    Txt(Vec<CharacterString>),
    Aaaa(Ipv6Addr),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: Name,
    },
    Dname(Name),
    Caa {
        flags: u8,
        tag: CharacterString,
        value: Vec<u8>,
    },
    Unknown(Vec<u8>),
}

/// The RDATA fields of an SOA record ([RFC 1035 § 3.3.13]).
///
/// [RFC 1035 § 3.3.13]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.13
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Rdata {
    /// Interprets raw RDATA octets (as given in the `\#` form) as RDATA
    /// of type `rr_type`. For types with a typed representation, the
    /// octets are validated and decoded; for all others, they are kept
    /// as [`Rdata::Unknown`].
    pub fn from_wire(rr_type: Type, octets: &[u8]) -> Result<Self, InvalidRdataError> {
        wire::decode(rr_type, octets)
    }
}

////////////////////////////////////////////////////////////////////////
// PRESENTATION FORMAT                                                //
////////////////////////////////////////////////////////////////////////

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::A(address) => write!(f, "{address}"),
            Self::Ns(name) | Self::Cname(name) | Self::Ptr(name) | Self::Dname(name) => write!(f, "{name}"),
            Self::Soa(soa) => write!(f, "{soa}"),
            Self::Hinfo { cpu, os } => write!(f, "{cpu} {os}"),
            Self::Mx {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            Self::Txt(strings) => {
                for (i, string) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{string}")?;
                }
                Ok(())
            }
            Self::Aaaa(address) => write!(f, "{address}"),
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
            Self::Caa { flags, tag, value } => {
                write!(f, "{flags} ")?;
                for &octet in tag.octets() {
                    write!(f, "{}", octet as char)?;
                }
                // Values may be longer than a <character-string>, but
                // are written in the same quoted form.
                f.write_str(" \"")?;
                for &octet in value {
                    if octet == b' ' {
                        f.write_str(" ")?;
                    } else {
                        write_escaped_octet(f, octet, b"\"\\")?;
                    }
                }
                f.write_str("\"")
            }
            Self::Unknown(octets) => {
                // RFC 3597 § 5.
                write!(f, "\\# {}", octets.len())?;
                if !octets.is_empty() {
                    f.write_str(" ")?;
                    write_hex(f, octets)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum,
        )
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
