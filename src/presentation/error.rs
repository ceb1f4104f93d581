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

//! Error types for presentation-format parsing.
//!
//! All syntax errors are recorded with an [`ErrorKind`] value that
//! provides an appropriate error message, along with the [`Position`]
//! at which they occurred.

use std::fmt;
use std::net::AddrParseError;
use std::num::ParseIntError;
use std::str::Utf8Error;

use super::Position;
use crate::name;

////////////////////////////////////////////////////////////////////////
// ERROR STRUCTURE                                                    //
////////////////////////////////////////////////////////////////////////

/// A syntax error in a presentation-format resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub(super) position: Position,
    pub(super) kind: ErrorKind,
}

impl Error {
    pub(super) fn new(position: Position, kind: ErrorKind) -> Self {
        Self { position, kind }
    }

    /// Returns the line at which the error occurred.
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// Returns the column at which the error occurred.
    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Returns the kind of syntax error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at line {} column {}",
            self.kind, self.position.line, self.position.column,
        )
    }
}

impl std::error::Error for Error {}

/// A result type for presentation-format parsing.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// ERROR KINDS                                                        //
////////////////////////////////////////////////////////////////////////

/// Kinds of presentation-format syntax errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    BadUtf8(Utf8Error),
    CaaValueTooLong,
    CharacterStringTooLong,
    EmptyRecord,
    EofBeforeCloseParen,
    EofInEscape,
    EofInQuotedCharacterString,
    EscapeNeedsThreeDigits,
    EscapeValueOutOfRange,
    ExpectedBackslashHash,
    ExpectedCharacterString,
    ExpectedCharacterStringOrBh,
    ExpectedEnd,
    ExpectedHexRdata,
    ExpectedIpv4OrBh,
    ExpectedIpv6OrBh,
    ExpectedName,
    ExpectedNameOrBh,
    ExpectedRdataLen,
    ExpectedTtlClassOrType,
    ExpectedType,
    ExpectedU8OrBh,
    ExpectedU16,
    ExpectedU16OrBh,
    ExpectedU32,
    FieldTooLong,
    InvalidCaaTag,
    InvalidClass(&'static str),
    InvalidHexDigit,
    InvalidInt(ParseIntError),
    InvalidIpv4(AddrParseError),
    InvalidIpv6(AddrParseError),
    InvalidLabel(name::Error),
    InvalidName(name::Error),
    InvalidRdataForType,
    InvalidRdataLen(ParseIntError),
    InvalidType(&'static str),
    NestedParens,
    NullNotAllowed,
    OptNotAllowed,
    TsigNotAllowed,
    TxtTooLong,
    UnexpectedEndOfHexRdata,
    UnmatchedCloseParen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadUtf8(utf8_err) => write!(f, "{utf8_err}"),
            Self::CaaValueTooLong => f.write_str("CAA value is too long"),
            Self::CharacterStringTooLong => f.write_str("<character-string> is too long"),
            Self::EmptyRecord => f.write_str("the record is empty"),
            Self::EofBeforeCloseParen => f.write_str("reached end of input before close parenthesis"),
            Self::EofInEscape => f.write_str("reached end of input in escape sequence"),
            Self::EofInQuotedCharacterString => {
                f.write_str("reached end of input in quoted <character-string>")
            }
            Self::EscapeNeedsThreeDigits => {
                f.write_str("invalid escape sequence: expected three decimal digits")
            }
            Self::EscapeValueOutOfRange => {
                f.write_str("invalid escape sequence: escaped octet value is out of range")
            }
            Self::ExpectedBackslashHash => f.write_str("expected \\#"),
            Self::ExpectedCharacterString => f.write_str("expected a <character-string>"),
            Self::ExpectedCharacterStringOrBh => {
                f.write_str("expected a <character-string> or \\#")
            }
            Self::ExpectedEnd => f.write_str("expected the end of the record"),
            Self::ExpectedHexRdata => f.write_str("expected hexadecimal RDATA"),
            Self::ExpectedIpv4OrBh => f.write_str("expected an IPv4 address or \\#"),
            Self::ExpectedIpv6OrBh => f.write_str("expected an IPv6 address or \\#"),
            Self::ExpectedName => f.write_str("expected a domain name"),
            Self::ExpectedNameOrBh => f.write_str("expected a domain name or \\#"),
            Self::ExpectedRdataLen => f.write_str("expected RDATA length"),
            Self::ExpectedTtlClassOrType => f.write_str("expected a TTL, class, or RR type"),
            Self::ExpectedType => f.write_str("expected an RR type"),
            Self::ExpectedU8OrBh => f.write_str("expected an unsigned 8-bit integer or \\#"),
            Self::ExpectedU16 => f.write_str("expected an unsigned 16-bit integer"),
            Self::ExpectedU16OrBh => f.write_str("expected an unsigned 16-bit integer or \\#"),
            Self::ExpectedU32 => f.write_str("expected an unsigned 32-bit integer"),
            Self::FieldTooLong => f.write_str("field is too long to parse"),
            Self::InvalidCaaTag => f.write_str("CAA tag must be non-empty and alphanumeric"),
            Self::InvalidClass(class_err) => f.write_str(class_err),
            Self::InvalidHexDigit => f.write_str("invalid hexadecimal digit"),
            Self::InvalidInt(int_err) => write!(f, "{int_err}"),
            Self::InvalidIpv4(addr_err) => write!(f, "{addr_err}"),
            Self::InvalidIpv6(addr_err) => write!(f, "{addr_err}"),
            Self::InvalidLabel(name_err) => write!(f, "invalid label: {name_err}"),
            Self::InvalidName(name_err) => write!(f, "invalid name: {name_err}"),
            Self::InvalidRdataForType => f.write_str("invalid RDATA for the RR type"),
            Self::InvalidRdataLen(int_err) => write!(f, "invalid RDATA length: {int_err}"),
            Self::InvalidType(type_err) => f.write_str(type_err),
            Self::NestedParens => f.write_str("nested parentheses"),
            Self::NullNotAllowed => f.write_str("NULL records must use the \\# format"),
            Self::OptNotAllowed => f.write_str("OPT records are not allowed"),
            Self::TsigNotAllowed => f.write_str("TSIG records are not allowed"),
            Self::TxtTooLong => f.write_str("TXT record is too long"),
            Self::UnexpectedEndOfHexRdata => f.write_str("unexpected end of hexadecimal RDATA"),
            Self::UnmatchedCloseParen => f.write_str("unmatched close parenthesis"),
        }
    }
}
