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

//! Crate-private utilities.

use std::fmt;

/// A wrapper around [`str`] references whose [`PartialEq`] and [`Eq`]
/// implementations are ASCII-case-insensitive. Used to match
/// mnemonics such as `IN` and `CNAME`.
pub struct Caseless<'a>(pub &'a str);

impl PartialEq for Caseless<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Caseless<'_> {}

/// Generates the constants, the [`FromStr`](std::str::FromStr)
/// implementation, and the [`Display`](fmt::Display) and
/// [`Debug`](fmt::Debug) implementations of a `u16` newtype whose
/// values have mnemonics, with the RFC 3597 § 5 generic form
/// (`<PREFIX><decimal>`) as the fallback in both directions.
macro_rules! u16_mnemonics {
    ($ty:ident, $prefix:literal, $what:literal, { $($mnemonic:ident = $value:literal,)* }) => {
        impl $ty {
            $(pub const $mnemonic: Self = Self($value);)*
        }

        impl std::str::FromStr for $ty {
            type Err = &'static str;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                $(
                    if $crate::util::Caseless(text) == $crate::util::Caseless(stringify!($mnemonic)) {
                        return Ok(Self::$mnemonic);
                    }
                )*
                match text.get(0..$prefix.len()) {
                    Some(prefix) if prefix.eq_ignore_ascii_case($prefix) => text[$prefix.len()..]
                        .parse::<u16>()
                        .map(Self)
                        .or(Err(concat!($what, " value is not a valid unsigned 16-bit integer"))),
                    _ => Err(concat!("unknown ", $what)),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match *self {
                    $(Self::$mnemonic => f.write_str(stringify!($mnemonic)),)*
                    Self(value) => write!(f, concat!($prefix, "{}"), value),
                }
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{self}")
            }
        }

        impl From<u16> for $ty {
            fn from(value: u16) -> Self {
                Self(value)
            }
        }

        impl From<$ty> for u16 {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

pub(crate) use u16_mnemonics;

/// Converts an ASCII hexadecimal digit to its numeric value, or
/// returns [`None`] if `digit` is not a hexadecimal digit.
pub fn ascii_hex_digit_to_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// Writes `octets` as lower-case hexadecimal digits.
pub fn write_hex(f: &mut fmt::Formatter, octets: &[u8]) -> fmt::Result {
    for octet in octets {
        write!(f, "{octet:02x}")?;
    }
    Ok(())
}

/// Writes a single octet in presentation format, escaping it if it is
/// not printable or if it is one of the `special` characters.
pub fn write_escaped_octet(f: &mut fmt::Formatter, octet: u8, special: &[u8]) -> fmt::Result {
    if special.contains(&octet) {
        write!(f, "\\{}", octet as char)
    } else if octet.is_ascii_graphic() {
        write!(f, "{}", octet as char)
    } else {
        write!(f, "\\{octet:03}")
    }
}
