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

//! The [`Reader`] structure.

use std::str::{self, FromStr};

use super::{Error, ErrorKind, Result};

/// Performs low-level reading of presentation-format text.
///
/// The [`Reader`] implements basic operations for moving between fields
/// of a record and reading their data, including processing comments
/// and parentheses for line extension.
pub(super) struct Reader<'a> {
    octets: &'a [u8],
    start: usize,
    in_parens: bool,
    position: Position,
}

/// Records the current human-readable position (line and column) in
/// the text being parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// The maximum length of a field (in octets) that
/// [`Reader::read_field`] will accept.
const MAX_READ_FIELD_SIZE: usize = 65_536;

impl<'a> Reader<'a> {
    /// Creates a new [`Reader`] over `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            octets: text.as_bytes(),
            start: 0,
            in_parens: false,
            position: Position { line: 1, column: 1 },
        }
    }

    /// Returns the current [`Position`].
    pub fn position(&self) -> Position {
        self.position
    }

    ////////////////////////////////////////////////////////////////////
    // PEEKING AND READING OF RAW DATA                                //
    ////////////////////////////////////////////////////////////////////

    /// Returns the octet at `index` (where `0` is the first unconsumed
    /// octet), or `None` if it is beyond the end of the text.
    fn peek_octet_at(&self, index: usize) -> Option<u8> {
        self.octets.get(self.start + index).copied()
    }

    /// Returns the next unconsumed octet without consuming it.
    pub fn peek_octet(&self) -> Option<u8> {
        self.peek_octet_at(0)
    }

    /// Consumes `len` octets that are known to contain no newlines.
    fn advance(&mut self, len: usize) {
        self.start += len;
        self.position.column += len;
    }

    /// Consumes a line ending of length `len`.
    fn advance_line(&mut self, len: usize) {
        self.start += len;
        self.position.line += 1;
        self.position.column = 1;
    }

    /// Consumes and returns the next octet, or returns `None` at the
    /// end of the text.
    pub fn read_octet(&mut self) -> Option<u8> {
        let octet = self.peek_octet()?;
        if octet == b'\n' {
            self.advance_line(1);
        } else {
            self.advance(1);
        }
        Some(octet)
    }

    /// Consumes and returns the next `N` octets if there are that many
    /// left. Otherwise, nothing is consumed. The octets are assumed to
    /// contain no newlines.
    pub fn read<const N: usize>(&mut self) -> Option<[u8; N]> {
        let octets = self.octets.get(self.start..self.start + N)?;
        let array = octets.try_into().ok()?;
        self.advance(N);
        Some(array)
    }

    ////////////////////////////////////////////////////////////////////
    // EOL DETECTION                                                  //
    ////////////////////////////////////////////////////////////////////

    /// Detects a line ending at `index`. Returns the length of the line
    /// ending: `0` for the end of the text, `1` for a newline, or `2`
    /// for a carriage return plus newline. Returns `None` if `index` is
    /// not at a line ending.
    fn get_eol_at(&self, index: usize) -> Option<usize> {
        match self.peek_octet_at(index) {
            None => Some(0),
            Some(b'\n') => Some(1),
            Some(b'\r') if self.peek_octet_at(index + 1) == Some(b'\n') => Some(2),
            _ => None,
        }
    }

    ////////////////////////////////////////////////////////////////////
    // READING OF FIELDS                                              //
    ////////////////////////////////////////////////////////////////////

    /// Returns whether `index` marks the end of a field. This occurs at
    /// line endings (including the end of the text) and field-ending
    /// characters (see [`ends_field`]).
    fn at_field_end_at(&self, index: usize) -> bool {
        self.get_eol_at(index).is_some()
            || self.peek_octet_at(index).map_or(true, ends_field)
    }

    /// Checks whether the next field is equal to `field` using
    /// `comparison`. If equal, the field is consumed.
    fn expect_field_impl(&mut self, field: &[u8], comparison: impl Fn(&[u8], &[u8]) -> bool) -> bool {
        match self.octets.get(self.start..self.start + field.len()) {
            Some(peek) if comparison(peek, field) && self.at_field_end_at(field.len()) => {
                self.advance(field.len());
                true
            }
            _ => false,
        }
    }

    /// Checks whether the next field is exactly equal to `field`. If
    /// equal, the field is consumed.
    pub fn expect_field(&mut self, field: &[u8]) -> bool {
        self.expect_field_impl(field, <[u8]>::eq)
    }

    /// Checks whether the next field is case-insensitively equal (in
    /// ASCII) to `field`. If equal, the field is consumed.
    pub fn expect_field_case_insensitive(&mut self, field: &[u8]) -> bool {
        self.expect_field_impl(field, <[u8]>::eq_ignore_ascii_case)
    }

    /// Consumes a field, parsing it into a value of type `T`. If
    /// parsing fails, nothing is consumed, so the caller may try again
    /// with a different type.
    ///
    /// The parameter `or_else` converts `<T as FromStr>::Err` into an
    /// [`ErrorKind`] when parsing fails.
    pub fn read_field<T, F>(&mut self, or_else: F) -> Result<T>
    where
        T: FromStr,
        F: FnOnce(T::Err) -> ErrorKind,
    {
        let mut len = 0;
        while !self.at_field_end_at(len) {
            len += 1;
            if len > MAX_READ_FIELD_SIZE {
                return Err(Error::new(self.position, ErrorKind::FieldTooLong));
            }
        }
        // A previous octet-wise read may have stopped inside a
        // multi-octet character.
        let text = str::from_utf8(&self.octets[self.start..self.start + len])
            .map_err(|e| Error::new(self.position, ErrorKind::BadUtf8(e)))?;
        match text.parse() {
            Ok(field) => {
                self.advance(len);
                Ok(field)
            }
            Err(e) => Err(Error::new(self.position, or_else(e))),
        }
    }

    /// Returns `None` if the reader is at a field end, and otherwise
    /// consumes and returns the next octet.
    pub fn read_field_octet(&mut self) -> Option<u8> {
        if self.at_field_end_at(0) {
            None
        } else {
            let octet = self.peek_octet();
            self.advance(1);
            octet
        }
    }

    ////////////////////////////////////////////////////////////////////
    // "NAVIGATION" AMONG FIELDS AND LINES                            //
    ////////////////////////////////////////////////////////////////////

    /// Consumes whitespace (excluding newlines). Returns whether any
    /// whitespace was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek_octet().map_or(false, is_whitespace) {
            skipped = true;
            self.advance(1);
        }
        skipped
    }

    /// Consumes data up to and including the next line ending.
    fn skip_through_eol(&mut self) {
        loop {
            match self.get_eol_at(0) {
                Some(0) => return,
                Some(eol_len) => return self.advance_line(eol_len),
                None => self.advance(1),
            }
        }
    }

    /// Consumes data up to, but not including, the next line ending.
    fn skip_to_eol(&mut self) {
        while self.get_eol_at(0).is_none() {
            self.advance(1);
        }
    }

    /// Consumes data until the next field or the next line ending,
    /// whichever comes first. Parentheses are processed, so line
    /// endings within them are skipped over. Line endings outside them
    /// are not consumed.
    pub fn skip_to_next_field_or_eol(&mut self) -> Result<FieldOrEol> {
        loop {
            self.skip_whitespace();
            if let Some(eol_len) = self.get_eol_at(0) {
                if !self.in_parens {
                    return Ok(FieldOrEol::Eol);
                } else if eol_len == 0 {
                    return Err(Error::new(self.position, ErrorKind::EofBeforeCloseParen));
                } else {
                    self.advance_line(eol_len);
                }
            } else {
                match self.peek_octet() {
                    Some(b';') if self.in_parens => self.skip_through_eol(),
                    Some(b';') => {
                        self.skip_to_eol();
                        return Ok(FieldOrEol::Eol);
                    }
                    Some(b'(') if self.in_parens => {
                        return Err(Error::new(self.position, ErrorKind::NestedParens))
                    }
                    Some(b'(') => {
                        self.in_parens = true;
                        self.advance(1);
                    }
                    Some(b')') if !self.in_parens => {
                        return Err(Error::new(self.position, ErrorKind::UnmatchedCloseParen))
                    }
                    Some(b')') => {
                        self.in_parens = false;
                        self.advance(1);
                    }
                    _ => return Ok(FieldOrEol::Field),
                }
            }
        }
    }

    /// Consumes data until the next field of the record. If a line
    /// ending is found first, an error of kind `error_on_eol` is raised
    /// at its position.
    pub fn skip_to_next_field(&mut self, error_on_eol: ErrorKind) -> Result<()> {
        if self.skip_to_next_field_or_eol()? != FieldOrEol::Field {
            Err(Error::new(self.position, error_on_eol))
        } else {
            Ok(())
        }
    }

    /// Checks that the record is complete: only whitespace, comments,
    /// and line endings may remain.
    pub fn expect_end(&mut self) -> Result<()> {
        loop {
            match self.skip_to_next_field_or_eol()? {
                FieldOrEol::Field => {
                    return Err(Error::new(self.position, ErrorKind::ExpectedEnd))
                }
                FieldOrEol::Eol => match self.get_eol_at(0).unwrap_or(0) {
                    0 => return Ok(()),
                    eol_len => self.advance_line(eol_len),
                },
            }
        }
    }
}

/// Returns whether `c` is whitespace within a line.
fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Returns whether `c` ends a field.
fn ends_field(c: u8) -> bool {
    is_whitespace(c) || c == b'(' || c == b')' || c == b';'
}

/// Indicates whether certain operations stopped at the next field on
/// a line, or at a line ending.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum FieldOrEol {
    Field,
    Eol,
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_octet_tracks_position() {
        let mut reader = Reader::new("a\nb");
        assert_eq!(reader.read_octet(), Some(b'a'));
        assert_eq!(reader.position(), Position { line: 1, column: 2 });
        assert_eq!(reader.read_octet(), Some(b'\n'));
        assert_eq!(reader.position(), Position { line: 2, column: 1 });
        assert_eq!(reader.read_octet(), Some(b'b'));
        assert_eq!(reader.read_octet(), None);
    }

    #[test]
    fn read_is_all_or_nothing() {
        let mut reader = Reader::new("ab");
        assert_eq!(reader.read::<3>(), None);
        assert_eq!(reader.read::<2>(), Some(*b"ab"));
    }

    #[test]
    fn expect_field_requires_a_field_end() {
        let mut reader = Reader::new("@x @");
        assert!(!reader.expect_field(b"@"));
        assert_eq!(reader.read_field_octet(), Some(b'@'));
        assert_eq!(reader.read_field_octet(), Some(b'x'));
        assert_eq!(reader.read_field_octet(), None);
        reader.skip_whitespace();
        assert!(reader.expect_field(b"@"));
    }

    #[test]
    fn expect_field_case_insensitive_works() {
        let mut reader = Reader::new("in");
        assert!(!reader.expect_field(b"IN"));
        assert!(reader.expect_field_case_insensitive(b"IN"));
    }

    #[test]
    fn read_field_does_not_consume_on_failure() {
        let mut reader = Reader::new("abc 12");
        assert!(reader.read_field::<u16, _>(ErrorKind::InvalidInt).is_err());
        assert_eq!(reader.read_field::<String, _>(|_| unreachable!()), Ok("abc".into()));
        reader.skip_whitespace();
        assert_eq!(reader.read_field::<u16, _>(ErrorKind::InvalidInt), Ok(12));
    }

    #[test]
    fn parentheses_extend_lines() {
        let mut reader = Reader::new("( a ; comment\n b )\nc");
        assert_eq!(reader.skip_to_next_field_or_eol(), Ok(FieldOrEol::Field));
        assert_eq!(reader.read_field_octet(), Some(b'a'));
        assert_eq!(reader.skip_to_next_field_or_eol(), Ok(FieldOrEol::Field));
        assert_eq!(reader.read_field_octet(), Some(b'b'));
        assert_eq!(reader.skip_to_next_field_or_eol(), Ok(FieldOrEol::Eol));
        assert_eq!(reader.position().line, 2);
    }

    #[test]
    fn comments_end_lines() {
        let mut reader = Reader::new("; comment");
        assert_eq!(reader.skip_to_next_field_or_eol(), Ok(FieldOrEol::Eol));
        assert_eq!(reader.expect_end(), Ok(()));
    }

    #[test]
    fn unbalanced_parentheses_are_rejected() {
        let mut reader = Reader::new("( a");
        reader.skip_to_next_field_or_eol().unwrap();
        reader.read_field_octet();
        assert!(matches!(
            reader.skip_to_next_field_or_eol(),
            Err(e) if e.kind == ErrorKind::EofBeforeCloseParen,
        ));
        assert!(matches!(
            Reader::new(")").skip_to_next_field_or_eol(),
            Err(e) if e.kind == ErrorKind::UnmatchedCloseParen,
        ));
        assert!(matches!(
            Reader::new("((").skip_to_next_field_or_eol(),
            Err(e) if e.kind == ErrorKind::NestedParens,
        ));
    }

    #[test]
    fn expect_end_tolerates_trailing_lines_and_comments() {
        let mut reader = Reader::new("  ; one\r\n\n ; two\n");
        assert_eq!(reader.expect_end(), Ok(()));
        let mut reader = Reader::new("\nextra");
        assert!(matches!(
            reader.expect_end(),
            Err(e) if e.kind == ErrorKind::ExpectedEnd && e.position.line == 2,
        ));
    }
}
