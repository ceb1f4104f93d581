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

//! Implementation of data structures related to domain names.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use arrayvec::ArrayVec;

use crate::util::write_escaped_octet;

mod builder;
mod error;
mod wire;
pub use builder::NameBuilder;
pub use error::Error;

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

/// Octets that must be escaped when a label is written in presentation
/// format, so that the output parses back to the same name.
const SPECIAL_OCTETS: &[u8] = b".\\\"();@";

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A fully-qualified domain name.
///
/// A `Name` stores the uncompressed on-the-wire representation of the
/// name ([RFC 1035 § 3.1]) alongside the offset of each label within
/// it. Both live in fixed-size inline buffers, so a `Name` never needs
/// more than one allocation-free copy to move around.
///
/// Names are constructed
///
/// * through the [`FromStr`] implementation, which requires a fully
///   qualified name (one ending in `.`);
/// * through [`Name::parse_qualified`], which makes relative names
///   fully qualified by appending the root; or
/// * through a [`NameBuilder`].
///
/// Per [RFC 4343], comparison of names is ASCII-case-insensitive, but
/// the original spelling is kept and is what [`Display`](fmt::Display)
/// writes. Use [`Name::to_ascii_lowercase`] for a canonical spelling.
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
/// [RFC 4343]: https://datatracker.ietf.org/doc/html/rfc4343
#[derive(Clone)]
pub struct Name {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_offsets: ArrayVec<u8, MAX_N_LABELS>,
}

impl Name {
    /// Returns the name of the DNS root, `.`.
    pub fn root() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        let mut label_offsets = ArrayVec::new();
        label_offsets.push(0);
        Self {
            wire_repr,
            label_offsets,
        }
    }

    /// Parses a name from presentation text. Unlike the [`FromStr`]
    /// implementation, a relative name is accepted and made fully
    /// qualified by appending the root, so `www.example` and
    /// `www.example.` parse to the same name.
    pub fn parse_qualified(s: &str) -> Result<Self, Error> {
        parse_text(s)?.finish_qualified()
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.label_offsets.len() == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        !self.is_root() && self.label(0) == b"*"
    }

    /// Returns the number of labels in this `Name`, including the
    /// terminating null label. The root has a length of one.
    pub fn len(&self) -> usize {
        self.label_offsets.len()
    }

    /// Returns the octets of the label at index `n`. Index zero is the
    /// leftmost label; index `len() - 1` is the null label.
    ///
    /// # Panics
    ///
    /// Panics if `n` is out of bounds.
    pub fn label(&self, n: usize) -> &[u8] {
        let offset = self.label_offsets[n] as usize;
        let len = self.wire_repr[offset] as usize;
        &self.wire_repr[offset + 1..offset + 1 + len]
    }

    /// Returns an iterator over the labels of this `Name`, from left to
    /// right, ending with the null label.
    pub fn labels(&self) -> Labels {
        Labels {
            name: self,
            front: 0,
            back: self.len(),
        }
    }

    /// Returns the uncompressed on-the-wire representation.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire_repr
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    /// Skipping zero labels yields a copy of the name itself.
    pub fn superdomain(&self, skip: usize) -> Option<Self> {
        if skip < self.len() {
            let start = self.label_offsets[skip];
            Some(Self {
                wire_repr: self.wire_repr[start as usize..].iter().copied().collect(),
                label_offsets: self.label_offsets[skip..]
                    .iter()
                    .map(|offset| offset - start)
                    .collect(),
            })
        } else {
            None
        }
    }

    /// Returns an iterator over the strict ancestors of this name that
    /// lie below the root: for a name with `L` non-null labels, the
    /// names obtained by dropping `1` through `L - 1` leading labels,
    /// longest first. The name itself and the root are never produced.
    ///
    /// ```
    /// use rrdb::name::Name;
    /// let name: Name = "a.b.example.".parse().unwrap();
    /// let ancestors: Vec<String> = name.strict_ancestors().map(|n| n.to_string()).collect();
    /// assert_eq!(ancestors, ["b.example.", "example."]);
    /// ```
    pub fn strict_ancestors(&self) -> StrictAncestors {
        StrictAncestors {
            name: self,
            next_skip: 1,
        }
    }

    /// Returns the name with its leading `*` label removed, or `None`
    /// if this is not a wildcard domain name.
    pub fn strip_wildcard(&self) -> Option<Self> {
        if self.is_wildcard() {
            self.superdomain(1)
        } else {
            None
        }
    }

    /// Concatenates the non-null labels of this name with all labels of
    /// `suffix`. For example, `www.` concatenated with `example.com.`
    /// is `www.example.com.`. Concatenating the root with any name
    /// yields that name.
    pub fn concat(&self, suffix: &Name) -> Result<Self, Error> {
        let mut builder = NameBuilder::new();
        for label in self.labels().chain(suffix.labels()) {
            if !label.is_empty() {
                builder.try_push_slice(label)?;
                builder.next_label()?;
            }
        }
        builder.finish()
    }

    /// Returns a copy of this name with all ASCII letters lowercased.
    pub fn to_ascii_lowercase(&self) -> Self {
        // Length octets never exceed 63, which is below the ASCII
        // letters, so the whole wire representation can be lowercased
        // at once.
        let mut lowercase = self.clone();
        lowercase.wire_repr.make_ascii_lowercase();
        lowercase
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels().filter(|label| !label.is_empty()) {
            for octet in label {
                write_escaped_octet(f, *octet, SPECIAL_OCTETS)?;
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire_repr.eq_ignore_ascii_case(&other.wire_repr)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for octet in self.wire_repr.iter() {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION                                                          //
////////////////////////////////////////////////////////////////////////

/// An iterator over the labels of a [`Name`], as octet slices.
///
/// To use this iterator, construct one from a [`Name`] using
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.front += 1;
            Some(self.name.label(self.front - 1))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back > self.front {
            self.back -= 1;
            Some(self.name.label(self.back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

/// An iterator over the strict, non-root ancestors of a [`Name`]. See
/// [`Name::strict_ancestors`].
#[derive(Debug)]
pub struct StrictAncestors<'a> {
    name: &'a Name,
    next_skip: usize,
}

impl Iterator for StrictAncestors<'_> {
    type Item = Name;

    fn next(&mut self) -> Option<Self::Item> {
        // The last label is the null label, so skipping len() - 1
        // labels would produce the root.
        if self.next_skip + 1 < self.name.len() {
            self.next_skip += 1;
            self.name.superdomain(self.next_skip - 1)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.name.len().saturating_sub(self.next_skip + 1);
        (len, Some(len))
    }
}

impl ExactSizeIterator for StrictAncestors<'_> {}

impl FusedIterator for StrictAncestors<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING                                                            //
////////////////////////////////////////////////////////////////////////

/// Parses a fully-qualified `Name` from presentation text. Escape
/// sequences as described in [RFC 1035 § 5.1] and [RFC 4343 § 2.1] are
/// supported.
///
/// [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_text(s)?.finish()
    }
}

/// Feeds presentation text into a [`NameBuilder`] without finishing
/// it, so that callers can decide how to treat relative names.
fn parse_text(s: &str) -> Result<NameBuilder, Error> {
    if s.is_empty() {
        return Err(Error::StrEmpty);
    } else if s == "." {
        return Ok(NameBuilder::new());
    }

    let mut remaining_octets = s.as_bytes();
    let mut builder = NameBuilder::new();

    // NOTE: to check that the string is ASCII, it suffices to check
    // that each octet is ASCII as we go, since all multi-byte
    // characters start with a non-ASCII octet.
    while let Some(&octet) = remaining_octets.first() {
        if octet == b'\\' {
            let (value, consumed) = parse_escape(&remaining_octets[1..])?;
            builder.try_push(value)?;
            remaining_octets = &remaining_octets[consumed + 1..];
        } else if octet == b'.' {
            builder.next_label()?;
            remaining_octets = &remaining_octets[1..];
        } else if !octet.is_ascii() {
            return Err(Error::StrNotAscii);
        } else {
            builder.try_push(octet)?;
            remaining_octets = &remaining_octets[1..];
        }
    }
    Ok(builder)
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence. Returns the escaped value and the number of octets
/// consumed.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [a, b, c, ..] if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() => {
            let value = 100 * (a - b'0') as usize + 10 * (b - b'0') as usize + (c - b'0') as usize;
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(Error::InvalidEscape))
        }
        [first, ..] if first.is_ascii_digit() => Err(Error::InvalidEscape),
        [first, ..] => Ok((*first, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn root_has_expected_characteristics() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.len(), 1);
        assert_eq!(root.wire_repr(), &[0]);
        assert_eq!(root.to_string(), ".");
    }

    #[test]
    fn is_wildcard_works() {
        assert!(name("*.rrdb.test.").is_wildcard());
        assert!(name("*.*.rrdb.test.").is_wildcard());
        assert!(!name("rrdb.test.").is_wildcard());
        assert!(!name("x.*.rrdb.test.").is_wildcard());
        assert!(!name("\\*x.rrdb.test.").is_wildcard());
        assert!(!Name::root().is_wildcard());
    }

    #[test]
    fn superdomain_works() {
        let subdomain = name("subdomain.example.test.");
        assert_eq!(subdomain.superdomain(0), Some(subdomain.clone()));
        assert_eq!(subdomain.superdomain(1), Some(name("example.test.")));
        assert_eq!(subdomain.superdomain(2), Some(name("test.")));
        assert_eq!(subdomain.superdomain(3), Some(Name::root()));
        assert_eq!(subdomain.superdomain(4), None);
    }

    #[test]
    fn superdomain_rebases_label_offsets() {
        let tld = name("a.bb.test.").superdomain(2).unwrap();
        assert_eq!(tld.wire_repr(), b"\x04test\x00");
        assert_eq!(tld.label(0), b"test");
        assert_eq!(tld.len(), 2);
    }

    #[test]
    fn labels_iterator_works() {
        let name = name("a.b.example.test.");
        let labels: Vec<&[u8]> = name.labels().collect();
        assert_eq!(labels, [&b"a"[..], b"b", b"example", b"test", b""]);
        assert_eq!(name.labels().rev().next(), Some(&b""[..]));
    }

    #[test]
    fn strict_ancestors_exclude_self_and_root() {
        let ancestors: Vec<Name> = name("foo.bar.wildcard.example.com.")
            .strict_ancestors()
            .collect();
        assert_eq!(
            ancestors,
            [
                name("bar.wildcard.example.com."),
                name("wildcard.example.com."),
                name("example.com."),
                name("com."),
            ],
        );
    }

    #[test]
    fn strict_ancestors_of_short_names_are_empty() {
        assert_eq!(name("com.").strict_ancestors().count(), 0);
        assert_eq!(Name::root().strict_ancestors().count(), 0);
        assert_eq!(name("example.com.").strict_ancestors().len(), 1);
    }

    #[test]
    fn strip_wildcard_works() {
        assert_eq!(
            name("*.wildcard.example.com.").strip_wildcard(),
            Some(name("wildcard.example.com.")),
        );
        assert_eq!(name("www.example.com.").strip_wildcard(), None);
    }

    #[test]
    fn concat_works() {
        assert_eq!(
            name("foo.bar.").concat(&name("example.com.")).unwrap(),
            name("foo.bar.example.com."),
        );
        assert_eq!(
            Name::root().concat(&name("example.com.")).unwrap(),
            name("example.com."),
        );
    }

    #[test]
    fn concat_rejects_long_results() {
        let long = Name::parse_qualified(&["x"; 100].join(".")).unwrap();
        assert_eq!(long.concat(&long), Err(Error::NameTooLong));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert_eq!(name("WWW.Example.COM."), name("www.example.com."));
        assert_ne!(name("www.example.com."), name("ww.example.com."));
    }

    #[test]
    fn to_ascii_lowercase_works() {
        let lower = name("UPPERCASE.Domain.Test.").to_ascii_lowercase();
        assert_eq!(lower.wire_repr(), b"\x09uppercase\x06domain\x04test\x00");
        assert_eq!(lower.to_string(), "uppercase.domain.test.");
    }

    #[test]
    fn display_escapes_special_octets() {
        assert_eq!(name("a\\.b.test.").to_string(), "a\\.b.test.");
        assert_eq!(name("a\\032b.test.").to_string(), "a\\032b.test.");
        assert_eq!(name("semi\\;colon.test.").to_string(), "semi\\;colon.test.");
        assert_eq!(name("\\065bc.test.").to_string(), "Abc.test.");
    }

    #[test]
    fn fromstr_works() {
        assert_eq!(name("example.test.").wire_repr(), b"\x07example\x04test\x00");
        assert!(name(".").is_root());
    }

    #[test]
    fn fromstr_rejects_empty() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
    }

    #[test]
    fn fromstr_rejects_non_ascii() {
        assert_eq!("✈.aero.".parse::<Name>(), Err(Error::StrNotAscii));
    }

    #[test]
    fn fromstr_rejects_non_fqdn() {
        assert_eq!("non.fqdn".parse::<Name>(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn parse_qualified_accepts_relative_names() {
        assert_eq!(Name::parse_qualified("non.fqdn").unwrap(), name("non.fqdn."));
        assert_eq!(Name::parse_qualified("fqdn.").unwrap(), name("fqdn."));
        assert!(Name::parse_qualified(".").unwrap().is_root());
    }

    #[test]
    fn fromstr_rejects_long_label() {
        let label = "x".repeat(64);
        assert_eq!(format!("{label}.").parse::<Name>(), Err(Error::LabelTooLong));
    }

    #[test]
    fn fromstr_rejects_long_name() {
        let long = "x.".repeat(128);
        assert_eq!(long.parse::<Name>(), Err(Error::NameTooLong));
    }

    #[test]
    fn fromstr_rejects_null_non_terminal() {
        assert_eq!("a.b..c.".parse::<Name>(), Err(Error::NullNonTerminal));
    }

    #[test]
    fn fromstr_escaping_works() {
        assert_eq!(name("\\000.\\\\\\..").wire_repr(), b"\x01\x00\x02\\.\x00");
    }

    #[test]
    fn fromstr_rejects_invalid_escapes() {
        assert_eq!("\\00".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\00x.".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\256.".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("trailing\\".parse::<Name>(), Err(Error::InvalidEscape));
    }
}
