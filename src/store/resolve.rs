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

//! Answering questions from the stored records.
//!
//! Resolution proceeds in two steps. First, records whose owner is the
//! question name itself are looked up. Only if there are none are
//! wildcards consulted: a wildcard record stored under `X` (that is,
//! with owner `*.X`) covers every strict descendant of `X`, but not `X`
//! itself ([RFC 4592 § 2.2]). When wildcards at several ancestors of
//! the question name have records of the requested type, the deepest
//! ancestor wins, and all of its records are returned.
//!
//! Unlike full [RFC 4592] processing, a wildcard is not blocked by the
//! existence of names between it and the question name; the closest
//! wildcard with data of the requested type is always used.
//!
//! [RFC 4592]: https://datatracker.ietf.org/doc/html/rfc4592
//! [RFC 4592 § 2.2]: https://datatracker.ietf.org/doc/html/rfc4592#section-2.2

use log::debug;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};

use crate::error::Error;
use crate::name::Name;
use crate::rr::{ResourceRecord, Type};

/// A question to be answered from the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Question {
    pub name: Name,
    pub qtype: Type,
}

/// Answers `question`, returning the matching records in presentation
/// format with their owners replaced by the question name as asked.
/// Fails with [`Error::NotFound`] if there is no match.
pub(super) fn resolve(connection: &Connection, question: &Question) -> Result<Vec<String>, Error> {
    let lowercase_name = question.name.to_ascii_lowercase();
    let qtype = u16::from(question.qtype);

    let exact = find_exact(connection, &lowercase_name, qtype)?;
    if !exact.is_empty() {
        debug!(
            "{} exact match(es) for {} {}",
            exact.len(),
            question.name,
            question.qtype,
        );
        return rewrite_owners(exact, &question.name);
    }

    let wildcard = find_closest_wildcard(connection, &lowercase_name, qtype)?;
    if wildcard.is_empty() {
        Err(Error::NotFound)
    } else {
        debug!(
            "{} wildcard match(es) for {} {}",
            wildcard.len(),
            question.name,
            question.qtype,
        );
        rewrite_owners(wildcard, &question.name)
    }
}

/// A stored record as needed for answering.
struct Match {
    id: i64,
    presentation: String,
}

fn find_exact(connection: &Connection, name: &Name, qtype: u16) -> Result<Vec<Match>, Error> {
    let mut statement = connection.prepare(
        "SELECT id, presentation FROM records
         WHERE name = ?1 AND type = ?2 AND is_wildcard = 0
         ORDER BY id",
    )?;
    let rows = statement.query_map(params![name.to_string(), qtype], |row| {
        Ok(Match {
            id: row.get(0)?,
            presentation: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Finds the records of the wildcard at the deepest strict ancestor of
/// `name` that has records of type `qtype`.
fn find_closest_wildcard(
    connection: &Connection,
    name: &Name,
    qtype: u16,
) -> Result<Vec<Match>, Error> {
    let candidates: Vec<String> = name.strict_ancestors().map(|a| a.to_string()).collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = (2..candidates.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT id, name, presentation FROM records
         WHERE is_wildcard = 1 AND type = ?1 AND name IN ({placeholders})
         ORDER BY id"
    );
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(candidates.len() + 1);
    values.push(&qtype);
    values.extend(candidates.iter().map(|c| c as &dyn ToSql));

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(values.as_slice())?;

    // Every candidate is a suffix of the question name, so a longer
    // stored name is a deeper ancestor.
    let mut longest = 0;
    let mut matches = Vec::new();
    while let Some(row) = rows.next()? {
        let stored_name: String = row.get(1)?;
        let found = Match {
            id: row.get(0)?,
            presentation: row.get(2)?,
        };
        if stored_name.len() > longest {
            longest = stored_name.len();
            matches.clear();
            matches.push(found);
        } else if stored_name.len() == longest {
            matches.push(found);
        }
    }
    Ok(matches)
}

fn rewrite_owners(matches: Vec<Match>, owner: &Name) -> Result<Vec<String>, Error> {
    matches
        .into_iter()
        .map(|m| {
            let record: ResourceRecord = m
                .presentation
                .parse()
                .map_err(|e| Error::corrupt(format!("record {}: {e}", m.id)))?;
            Ok(record.with_owner(owner.clone()).to_string())
        })
        .collect()
}
