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

//! Decoding of RDATA from its on-the-wire form.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{CharacterString, Rdata, Soa};
use crate::name::Name;
use crate::rr::Type;

/// An error signaling that raw RDATA is not valid for its RR type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidRdataError;

impl fmt::Display for InvalidRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid RDATA for the RR type")
    }
}

impl std::error::Error for InvalidRdataError {}

type Result<T> = std::result::Result<T, InvalidRdataError>;

/// Decodes `octets` as RDATA of type `rr_type`. This is the
/// implementation of [`Rdata::from_wire`].
pub(super) fn decode(rr_type: Type, octets: &[u8]) -> Result<Rdata> {
    let mut reader = WireReader { octets };
    let rdata = match rr_type {
        Type::A => Rdata::A(Ipv4Addr::from(reader.array::<4>()?)),
        Type::NS => Rdata::Ns(reader.name()?),
        Type::CNAME => Rdata::Cname(reader.name()?),
        Type::PTR => Rdata::Ptr(reader.name()?),
        Type::DNAME => Rdata::Dname(reader.name()?),
        Type::SOA => Rdata::Soa(Soa {
            mname: reader.name()?,
            rname: reader.name()?,
            serial: reader.u32()?,
            refresh: reader.u32()?,
            retry: reader.u32()?,
            expire: reader.u32()?,
            minimum: reader.u32()?,
        }),
        Type::HINFO => Rdata::Hinfo {
            cpu: reader.character_string()?,
            os: reader.character_string()?,
        },
        Type::MX => Rdata::Mx {
            preference: reader.u16()?,
            exchange: reader.name()?,
        },
        Type::TXT => {
            // TXT RDATA must hold at least one <character-string>.
            let mut strings = vec![reader.character_string()?];
            while !reader.octets.is_empty() {
                strings.push(reader.character_string()?);
            }
            Rdata::Txt(strings)
        }
        Type::AAAA => Rdata::Aaaa(Ipv6Addr::from(reader.array::<16>()?)),
        Type::SRV => Rdata::Srv {
            priority: reader.u16()?,
            weight: reader.u16()?,
            port: reader.u16()?,
            target: reader.name()?,
        },
        Type::CAA => {
            let flags = reader.array::<1>()?[0];
            let tag = reader.character_string()?;
            if tag.is_empty() || !tag.octets().iter().all(u8::is_ascii_alphanumeric) {
                return Err(InvalidRdataError);
            }
            let value = reader.octets.to_vec();
            reader.octets = &[];
            Rdata::Caa { flags, tag, value }
        }
        _ => return Ok(Rdata::Unknown(octets.to_vec())),
    };
    if reader.octets.is_empty() {
        Ok(rdata)
    } else {
        Err(InvalidRdataError)
    }
}

/// Reads fields from the front of an RDATA buffer.
struct WireReader<'a> {
    octets: &'a [u8],
}

impl WireReader<'_> {
    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.octets.len() < N {
            Err(InvalidRdataError)
        } else {
            let (field, rest) = self.octets.split_at(N);
            self.octets = rest;
            field.try_into().or(Err(InvalidRdataError))
        }
    }

    fn u16(&mut self) -> Result<u16> {
        self.array().map(u16::from_be_bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.array().map(u32::from_be_bytes)
    }

    fn name(&mut self) -> Result<Name> {
        let (name, len) = Name::try_from_uncompressed(self.octets).or(Err(InvalidRdataError))?;
        self.octets = &self.octets[len..];
        Ok(name)
    }

    fn character_string(&mut self) -> Result<CharacterString> {
        let [len] = self.array::<1>()?;
        let len = len as usize;
        if self.octets.len() < len {
            Err(InvalidRdataError)
        } else {
            let (field, rest) = self.octets.split_at(len);
            self.octets = rest;
            // A length octet cannot exceed the maximum.
            CharacterString::try_from(field).or(Err(InvalidRdataError))
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
