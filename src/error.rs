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

//! Implementation of the crate-level [`Error`] type.

use std::fmt;

use rusqlite::ErrorCode;

use crate::name::Name;
use crate::rr::Type;

/// The outcomes of record-store operations other than success.
///
/// Callers are expected to match on the kind: validation errors and
/// constraint violations are the caller's fault and carry details
/// meant for them, [`Error::NotFound`] is an ordinary outcome,
/// [`Error::Cancelled`] means the caller gave up, and only
/// [`Error::Server`] indicates a fault worth logging.
#[derive(Debug)]
pub enum Error {
    /// The input was malformed. Each [`FieldError`] names the offending
    /// input field.
    Validation(Vec<FieldError>),

    /// Creating the record would break CNAME exclusivity ([RFC 1034 §
    /// 3.6.2]).
    ///
    /// [RFC 1034 § 3.6.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-3.6.2
    ConstraintViolation(Conflict),

    /// No record has the requested id, or no record answers the
    /// question.
    NotFound,

    /// The operation's deadline expired or it was cancelled.
    Cancelled,

    /// The persistence layer failed.
    Server(ServerError),
}

/// A problem with a single input field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub key: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Details of a CNAME-exclusivity violation: the node, and the types
/// of the existing and the rejected record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conflict {
    pub zone: Name,

    /// The stored name of the node, without any `*` label.
    pub name: Name,
    pub existing: Type,
    pub attempted: Type,
}

/// A persistence-layer failure.
#[derive(Debug)]
pub enum ServerError {
    Sqlite(rusqlite::Error),

    /// Stored data could not be interpreted.
    Corrupt(String),
}

impl Error {
    /// Constructs a validation error for a single field.
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(key, message)])
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::Server(ServerError::Corrupt(message.into()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        match error.sqlite_error_code() {
            // Raised when the progress handler aborts a statement
            // because the deadline expired.
            Some(ErrorCode::OperationInterrupted) => Self::Cancelled,
            _ => Self::Server(ServerError::Sqlite(error)),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Validation(fields) => {
                f.write_str("invalid input")?;
                for (i, field) in fields.iter().enumerate() {
                    let separator = if i == 0 { ": " } else { "; " };
                    write!(f, "{separator}{field}")?;
                }
                Ok(())
            }
            Self::ConstraintViolation(conflict) => write!(
                f,
                "cannot add {} record at {} in zone {}: a {} record exists there",
                conflict.attempted, conflict.name, conflict.zone, conflict.existing,
            ),
            Self::NotFound => f.write_str("not found"),
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::Server(server_error) => write!(f, "server error: {server_error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Server(ServerError::Sqlite(sqlite_error)) => Some(sqlite_error),
            _ => None,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sqlite(sqlite_error) => write!(f, "{sqlite_error}"),
            Self::Corrupt(message) => write!(f, "inconsistent data: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_statements_are_cancellations() {
        let interrupted = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        );
        assert!(matches!(Error::from(interrupted), Error::Cancelled));
        assert!(matches!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::Server(ServerError::Sqlite(_)),
        ));
    }

    #[test]
    fn validation_errors_list_all_fields() {
        let error = Error::Validation(vec![
            FieldError::new("zone", "required"),
            FieldError::new("content", "required"),
        ]);
        assert_eq!(
            error.to_string(),
            "invalid input: zone: required; content: required",
        );
    }
}
