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

//! Enforcement of CNAME exclusivity.
//!
//! [RFC 1034 § 3.6.2] forbids a node that owns a CNAME record from
//! owning any other data. (The RFC 2181 § 10.1 exceptions for DNSSEC
//! types do not apply here.) A node is identified by its zone and its
//! stored name. Since wildcard records are stored without their `*`
//! label, `*.foo` and `foo` are the same node.
//!
//! [RFC 1034 § 3.6.2]: https://datatracker.ietf.org/doc/html/rfc1034#section-3.6.2

use rusqlite::{params, OptionalExtension, Transaction};

use crate::error::{Conflict, Error};
use crate::normalize::Normalized;
use crate::rr::Type;

/// Fails with [`Error::ConstraintViolation`] if adding the `normalized`
/// record would break CNAME exclusivity:
///
/// * a CNAME may not join a node that owns any record;
/// * no record may join a node that owns a CNAME.
///
/// This must run inside the transaction that performs the insert, and
/// that transaction must hold the database write lock from its start,
/// so that no conflicting record can be committed between the check
/// and the insert.
pub(super) fn check_cname_exclusivity(tx: &Transaction, normalized: &Normalized) -> Result<(), Error> {
    let zone = normalized.zone.to_string();
    let name = normalized.name.to_string();

    let existing: Option<u16> = if normalized.rr_type == Type::CNAME {
        tx.query_row(
            "SELECT type FROM records
             WHERE zone = ?1 AND name = ?2
             ORDER BY id LIMIT 1",
            params![zone, name],
            |row| row.get(0),
        )
        .optional()?
    } else {
        tx.query_row(
            "SELECT type FROM records
             WHERE zone = ?1 AND name = ?2 AND type = ?3
             LIMIT 1",
            params![zone, name, u16::from(Type::CNAME)],
            |row| row.get(0),
        )
        .optional()?
    };

    match existing {
        Some(existing) => Err(Error::ConstraintViolation(Conflict {
            zone: normalized.zone.clone(),
            name: normalized.name.clone(),
            existing: existing.into(),
            attempted: normalized.rr_type,
        })),
        None => Ok(()),
    }
}
