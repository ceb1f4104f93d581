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

//! Parsing of resource records.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::{Error, ErrorKind, FieldOrEol, Parser, Result};
use crate::class::Class;
use crate::name::Name;
use crate::rr::rdata::{CharacterString, Soa, MAX_RDATA_LEN};
use crate::rr::{Rdata, ResourceRecord, Ttl, Type};
use crate::util::ascii_hex_digit_to_nibble;

impl Parser<'_> {
    ////////////////////////////////////////////////////////////////////
    // PARSING OF RESOURCE RECORDS                                    //
    ////////////////////////////////////////////////////////////////////

    /// Parses a resource record. The caller checks that nothing
    /// follows it.
    pub(super) fn parse_record(&mut self) -> Result<ResourceRecord> {
        let leading_whitespace = self.reader.skip_whitespace();
        if self.reader.skip_to_next_field_or_eol()? == FieldOrEol::Eol {
            return Err(Error::new(self.reader.position(), ErrorKind::EmptyRecord));
        }

        // Leading whitespace means the owner is omitted. With no
        // previous record to inherit from, it is the origin, i.e. the
        // root.
        let owner = if leading_whitespace {
            Name::root()
        } else {
            let owner = self.parse_name()?;
            self.reader.skip_to_next_field(ErrorKind::ExpectedTtlClassOrType)?;
            owner
        };

        let (ttl, class) = self.parse_ttl_and_class()?;
        let rr_type = self.parse_type()?;
        let rdata = self.parse_rdata(rr_type)?;

        Ok(ResourceRecord {
            owner,
            ttl,
            class,
            rr_type,
            rdata,
        })
    }

    ////////////////////////////////////////////////////////////////////
    // RESOURCE RECORD PARSING HELPERS                                //
    ////////////////////////////////////////////////////////////////////

    /// Parses the TTL and class fields of a record, which may appear in
    /// either order, and either of which may be omitted. Leaves the
    /// reader at the type field.
    fn parse_ttl_and_class(&mut self) -> Result<(Ttl, Class)> {
        // As noted in RFC 1035 § 5.1, the TTL, class, and type fields
        // are disjoint, so we can just try the possibilities. A failed
        // read_field consumes nothing.
        if let Ok(ttl) = self.reader.read_field::<Ttl, _>(ErrorKind::InvalidType) {
            self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
            let class = self.try_parse_class()?.unwrap_or_default();
            Ok((ttl, class))
        } else if let Some(class) = self.try_parse_class()? {
            let ttl = match self.reader.read_field::<Ttl, _>(ErrorKind::InvalidType) {
                Ok(ttl) => {
                    self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
                    ttl
                }
                Err(_) => Ttl::default(),
            };
            Ok((ttl, class))
        } else {
            Ok((Ttl::default(), Class::default()))
        }
    }

    /// Tries to parse a class field. On success, the reader is advanced
    /// to the next field.
    fn try_parse_class(&mut self) -> Result<Option<Class>> {
        match self.reader.read_field::<Class, _>(ErrorKind::InvalidClass) {
            Ok(class) => {
                self.reader.skip_to_next_field(ErrorKind::ExpectedType)?;
                Ok(Some(class))
            }
            Err(_) => Ok(None),
        }
    }

    /// Parses a [`Type`], rejecting types whose records are never
    /// stored.
    fn parse_type(&mut self) -> Result<Type> {
        let position = self.reader.position();
        let rr_type: Type = self.reader.read_field(ErrorKind::InvalidType)?;
        match rr_type {
            Type::OPT => Err(Error::new(position, ErrorKind::OptNotAllowed)),
            Type::TSIG => Err(Error::new(position, ErrorKind::TsigNotAllowed)),
            _ => Ok(rr_type),
        }
    }

    ////////////////////////////////////////////////////////////////////
    // RDATA PARSING                                                  //
    ////////////////////////////////////////////////////////////////////

    // Each RR type has its own RDATA format, and RFC 3597 § 5 allows
    // RDATA of *any* type to be given in the generic \# form. When the
    // generic form is used for a type with a typed representation, the
    // octets are validated and decoded by Rdata::from_wire.
    //
    // The parse_*_rdata methods skip to their first field themselves,
    // since the appropriate "expected ..." error depends on the type.
    // They stop after the last field of the RDATA, leaving the check
    // for trailing data to the caller.

    /// Parses RDATA for a record of type `rr_type`.
    fn parse_rdata(&mut self, rr_type: Type) -> Result<Rdata> {
        match rr_type {
            Type::A => self.parse_a_rdata(),
            Type::NS => self.parse_name_rdata(rr_type, Rdata::Ns),
            Type::CNAME => self.parse_name_rdata(rr_type, Rdata::Cname),
            Type::PTR => self.parse_name_rdata(rr_type, Rdata::Ptr),
            Type::DNAME => self.parse_name_rdata(rr_type, Rdata::Dname),
            Type::SOA => self.parse_soa_rdata(),
            Type::HINFO => self.parse_hinfo_rdata(),
            Type::MX => self.parse_mx_rdata(),
            Type::TXT => self.parse_txt_rdata(),
            Type::AAAA => self.parse_aaaa_rdata(),
            Type::SRV => self.parse_srv_rdata(),
            Type::CAA => self.parse_caa_rdata(),
            _ => {
                let expected = if rr_type == Type::NULL {
                    ErrorKind::NullNotAllowed
                } else {
                    ErrorKind::ExpectedBackslashHash
                };
                if self.check_backslash_hash(expected.clone())? {
                    self.parse_unknown_rdata(rr_type)
                } else {
                    Err(Error::new(self.reader.position(), expected))
                }
            }
        }
    }

    /// Advances the reader to the next field (producing an error of kind
    /// `expected` if there is none) and returns whether that field is
    /// the `\#` marker of the generic RDATA form, consuming it if so.
    fn check_backslash_hash(&mut self, expected: ErrorKind) -> Result<bool> {
        self.reader.skip_to_next_field(expected)?;
        Ok(self.reader.expect_field(b"\\#"))
    }

    /// Parses RDATA consisting of a single domain name.
    fn parse_name_rdata(&mut self, rr_type: Type, variant: fn(Name) -> Rdata) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedNameOrBh)? {
            self.parse_unknown_rdata(rr_type)
        } else {
            self.parse_name().map(variant)
        }
    }

    /// Parses RDATA for A records.
    fn parse_a_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedIpv4OrBh)? {
            self.parse_unknown_rdata(Type::A)
        } else {
            let address: Ipv4Addr = self.reader.read_field(ErrorKind::InvalidIpv4)?;
            Ok(Rdata::A(address))
        }
    }

    /// Parses RDATA for AAAA records.
    fn parse_aaaa_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedIpv6OrBh)? {
            self.parse_unknown_rdata(Type::AAAA)
        } else {
            let address: Ipv6Addr = self.reader.read_field(ErrorKind::InvalidIpv6)?;
            Ok(Rdata::Aaaa(address))
        }
    }

    /// Parses RDATA for SOA records.
    fn parse_soa_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedNameOrBh)? {
            return self.parse_unknown_rdata(Type::SOA);
        }
        let mname = self.parse_name()?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        let rname = self.parse_name()?;
        let mut times = [0u32; 5];
        for time in times.iter_mut() {
            self.reader.skip_to_next_field(ErrorKind::ExpectedU32)?;
            *time = self.reader.read_field(ErrorKind::InvalidInt)?;
        }
        let [serial, refresh, retry, expire, minimum] = times;
        Ok(Rdata::Soa(Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }))
    }

    /// Parses RDATA for HINFO records.
    fn parse_hinfo_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedCharacterStringOrBh)? {
            return self.parse_unknown_rdata(Type::HINFO);
        }
        let cpu = self.parse_character_string()?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedCharacterString)?;
        let os = self.parse_character_string()?;
        Ok(Rdata::Hinfo { cpu, os })
    }

    /// Parses RDATA for MX records.
    fn parse_mx_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            return self.parse_unknown_rdata(Type::MX);
        }
        let preference = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        let exchange = self.parse_name()?;
        Ok(Rdata::Mx {
            preference,
            exchange,
        })
    }

    /// Parses RDATA for TXT records: one or more `<character-string>`s.
    fn parse_txt_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedCharacterStringOrBh)? {
            return self.parse_unknown_rdata(Type::TXT);
        }
        let start_position = self.reader.position();
        let mut strings: Vec<CharacterString> = Vec::new();
        let mut wire_len = 0;
        loop {
            let string = self.parse_character_string()?;
            wire_len += string.len() + 1;
            if wire_len > MAX_RDATA_LEN {
                return Err(Error::new(start_position, ErrorKind::TxtTooLong));
            }
            strings.push(string);
            if self.reader.skip_to_next_field_or_eol()? == FieldOrEol::Eol {
                return Ok(Rdata::Txt(strings));
            }
        }
    }

    /// Parses RDATA for SRV records.
    fn parse_srv_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedU16OrBh)? {
            return self.parse_unknown_rdata(Type::SRV);
        }
        let priority = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
        let weight = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedU16)?;
        let port = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedName)?;
        let target = self.parse_name()?;
        Ok(Rdata::Srv {
            priority,
            weight,
            port,
            target,
        })
    }

    /// Parses RDATA for CAA records ([RFC 8659 § 4.1.1]): flags, an
    /// alphanumeric tag, and a value written like a
    /// `<character-string>` but not limited to 255 octets.
    ///
    /// [RFC 8659 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc8659#section-4.1.1
    fn parse_caa_rdata(&mut self) -> Result<Rdata> {
        if self.check_backslash_hash(ErrorKind::ExpectedU8OrBh)? {
            return self.parse_unknown_rdata(Type::CAA);
        }
        let flags = self.reader.read_field(ErrorKind::InvalidInt)?;
        self.reader.skip_to_next_field(ErrorKind::ExpectedCharacterString)?;
        let tag_position = self.reader.position();
        let mut tag = CharacterString::default();
        while let Some(octet) = self.reader.read_field_octet() {
            if !octet.is_ascii_alphanumeric() || tag.try_push(octet).is_err() {
                return Err(Error::new(tag_position, ErrorKind::InvalidCaaTag));
            }
        }
        if tag.is_empty() {
            return Err(Error::new(tag_position, ErrorKind::InvalidCaaTag));
        }
        self.reader.skip_to_next_field(ErrorKind::ExpectedCharacterString)?;
        let value_position = self.reader.position();
        // Flags and the tag take at least two octets of RDATA.
        let max_value_len = MAX_RDATA_LEN - 2 - tag.len();
        let mut value = Vec::new();
        self.parse_text_field(|octet| {
            if value.len() < max_value_len {
                value.push(octet);
                Ok(())
            } else {
                Err(Error::new(value_position, ErrorKind::CaaValueTooLong))
            }
        })?;
        Ok(Rdata::Caa { flags, tag, value })
    }

    /// Parses RDATA in the generic `\#` form, after the marker has been
    /// consumed, and interprets it as RDATA of type `rr_type`.
    fn parse_unknown_rdata(&mut self, rr_type: Type) -> Result<Rdata> {
        self.reader.skip_to_next_field(ErrorKind::ExpectedRdataLen)?;
        let len = self.reader.read_field::<u16, _>(ErrorKind::InvalidRdataLen)?;
        let hex_digits_position = self.reader.position();
        let octets = if len == 0 {
            Vec::new()
        } else {
            self.reader.skip_to_next_field(ErrorKind::ExpectedHexRdata)?;
            self.parse_unknown_rdata_hex_digits(len as usize)?
        };
        Rdata::from_wire(rr_type, &octets)
            .map_err(|_| Error::new(hex_digits_position, ErrorKind::InvalidRdataForType))
    }

    /// Parses hexadecimal digits for a total of `len` octets. The digits
    /// may be split across several fields.
    fn parse_unknown_rdata_hex_digits(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut octets = Vec::with_capacity(len);
        while octets.len() < len {
            if self.reader.skip_to_next_field_or_eol()? == FieldOrEol::Eol {
                return Err(Error::new(
                    self.reader.position(),
                    ErrorKind::UnexpectedEndOfHexRdata,
                ));
            }
            let high_nibble = self.parse_ascii_hex_digit()?;
            let low_nibble = self.parse_ascii_hex_digit()?;
            octets.push((high_nibble << 4) | low_nibble);
        }
        Ok(octets)
    }

    /// Parses a single ASCII hexadecimal digit.
    fn parse_ascii_hex_digit(&mut self) -> Result<u8> {
        let position = self.reader.position();
        match self.reader.read_field_octet() {
            Some(digit) => ascii_hex_digit_to_nibble(digit)
                .ok_or_else(|| Error::new(position, ErrorKind::InvalidHexDigit)),
            None => Err(Error::new(position, ErrorKind::UnexpectedEndOfHexRdata)),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::parse_record;
    use super::*;

    fn parse(text: &str) -> ResourceRecord {
        parse_record(text).unwrap()
    }

    fn parse_err(text: &str) -> ErrorKind {
        parse_record(text).unwrap_err().kind
    }

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn owner_shorthands_denote_the_root() {
        assert!(parse("@ A 127.0.0.1").owner.is_root());
        assert!(parse(". A 127.0.0.1").owner.is_root());
        assert!(parse("  A 127.0.0.1").owner.is_root());
        assert!(parse("\t3600 IN A 127.0.0.1").owner.is_root());
    }

    #[test]
    fn ttl_and_class_may_appear_in_either_order() {
        for text in [
            "foo 300 CH A 127.0.0.1",
            "foo CH 300 A 127.0.0.1",
        ] {
            let rr = parse(text);
            assert_eq!(u32::from(rr.ttl), 300);
            assert_eq!(rr.class, Class::CH);
        }
        let rr = parse("foo CH A 127.0.0.1");
        assert_eq!(rr.ttl, Ttl::DEFAULT);
        let rr = parse("foo 60 A 127.0.0.1");
        assert_eq!(rr.class, Class::IN);
    }

    #[test]
    fn names_in_rdata_are_qualified() {
        assert_eq!(parse("www CNAME target").rdata, Rdata::Cname(name("target.")));
        assert_eq!(
            parse("@ MX 10 mail.example.com.").rdata,
            Rdata::Mx {
                preference: 10,
                exchange: name("mail.example.com."),
            },
        );
    }

    #[test]
    fn soa_parses_across_lines() {
        let rr = parse(
            "@ SOA ns1 hostmaster (\n\
             \t2022010101 ; serial\n\
             \t7200 3600 1209600 300 )",
        );
        assert_eq!(
            rr.rdata.to_string(),
            "ns1. hostmaster. 2022010101 7200 3600 1209600 300",
        );
    }

    #[test]
    fn txt_collects_multiple_strings() {
        let rr = parse("txt TXT \"hello world\" plain \"\"");
        assert_eq!(rr.rdata.to_string(), "\"hello world\" \"plain\" \"\"");
    }

    #[test]
    fn srv_and_hinfo_parse() {
        assert_eq!(
            parse("_sip._udp SRV 0 5 5060 sip").rdata.to_string(),
            "0 5 5060 sip.",
        );
        assert_eq!(
            parse("host HINFO \"x86 64\" Linux").rdata.to_string(),
            "\"x86 64\" \"Linux\"",
        );
    }

    #[test]
    fn caa_parses() {
        assert_eq!(
            parse("@ CAA 0 issue \"ca.example.net; account=1\"")
                .rdata
                .to_string(),
            "0 issue \"ca.example.net; account=1\"",
        );
        assert_eq!(parse_err("@ CAA 0 is-sue x"), ErrorKind::InvalidCaaTag);
    }

    #[test]
    fn generic_rdata_is_decoded_for_known_types() {
        assert_eq!(
            parse("foo A \\# 4 7f000001").rdata,
            Rdata::A(Ipv4Addr::LOCALHOST),
        );
        assert_eq!(
            parse("foo CNAME \\# 5 03 666f6f 00").rdata,
            Rdata::Cname(name("foo.")),
        );
        assert_eq!(parse_err("foo A \\# 3 7f0000"), ErrorKind::InvalidRdataForType);
    }

    #[test]
    fn generic_rdata_is_required_for_unknown_types() {
        let rr = parse("foo TYPE65280 \\# 2 beef");
        assert_eq!(rr.rdata, Rdata::Unknown(vec![0xbe, 0xef]));
        assert_eq!(parse("foo TYPE65280 \\# 0").rdata, Rdata::Unknown(vec![]));
        assert_eq!(parse_err("foo TYPE65280 beef"), ErrorKind::ExpectedBackslashHash);
    }

    #[test]
    fn null_requires_generic_rdata() {
        assert_eq!(parse("foo NULL \\# 1 00").rdata, Rdata::Unknown(vec![0]));
        assert_eq!(parse_err("foo NULL 00"), ErrorKind::NullNotAllowed);
    }

    #[test]
    fn meta_types_are_rejected() {
        assert_eq!(parse_err("foo OPT \\# 0"), ErrorKind::OptNotAllowed);
        assert_eq!(parse_err("foo TSIG \\# 0"), ErrorKind::TsigNotAllowed);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(parse_err("foo TYPE65280 \\# 2 be"), ErrorKind::UnexpectedEndOfHexRdata);
        assert_eq!(parse_err("foo TYPE65280 \\# 1 zz"), ErrorKind::InvalidHexDigit);
        assert_eq!(parse_err("foo TYPE65280 \\# 1 abc"), ErrorKind::ExpectedEnd);
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_eq!(parse_err("foo"), ErrorKind::ExpectedTtlClassOrType);
        assert_eq!(parse_err("foo 300 IN"), ErrorKind::ExpectedType);
        assert_eq!(parse_err("foo A"), ErrorKind::ExpectedIpv4OrBh);
        assert_eq!(parse_err("foo MX 10"), ErrorKind::ExpectedName);
        assert!(matches!(parse_err("foo BOGUS x"), ErrorKind::InvalidType(_)));
        assert!(matches!(parse_err("foo A 300.1.1.1"), ErrorKind::InvalidIpv4(_)));
    }
}
