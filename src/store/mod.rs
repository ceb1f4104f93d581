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

//! Persistence of records and resolution of questions.
//!
//! The [`Store`] keeps records in an SQLite database. It does not hold
//! a connection: every operation opens its own, so a `Store` can be
//! cloned freely and shared between threads. Concurrency control is
//! left entirely to SQLite. Reads run concurrently under its WAL
//! journal, while every write takes the database write lock when its
//! transaction begins, queueing for up to the configured busy timeout.
//!
//! Every operation takes a [`Deadline`]. It is checked before the
//! operation starts, between attempts to take the write lock, and by a
//! progress handler on the connection, so that a statement still
//! running when the deadline passes is interrupted. In each case the
//! operation fails with [`Error::Cancelled`].
//!
//! Before a store is used, its schema must be provisioned with
//! [`Store::migrate`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::deadline::Deadline;
use crate::error::Error;
use crate::name::Name;
use crate::normalize::{normalize, RecordParams};
use crate::rr::Type;

mod constraint;
mod resolve;
mod schema;
pub use resolve::Question;

/// The number of SQLite virtual machine instructions between checks of
/// an operation's deadline.
const PROGRESS_HANDLER_PERIOD: i32 = 1000;

/// How long SQLite itself waits for a lock before returning control, so
/// that the deadline can be checked.
const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The columns of the `records` table, in the order [`RawRecord`]
/// reads them.
const COLUMNS: &str =
    "id, zone, name, presentation, type, is_wildcard, comment, created_at, modified_at";

////////////////////////////////////////////////////////////////////////
// RECORDS                                                            //
////////////////////////////////////////////////////////////////////////

/// A stored resource record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The record's identifier, assigned by the store.
    pub id: i64,

    /// The zone the record belongs to, lowercased.
    pub zone: Name,

    /// The owner name derived from the zone and the presentation,
    /// lowercased, without the `*` label for wildcards.
    pub name: Name,

    /// The record in presentation format, as supplied.
    pub presentation: String,

    pub rr_type: Type,
    pub is_wildcard: bool,
    pub comment: String,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

/// A row of the `records` table before its values are interpreted.
struct RawRecord {
    id: i64,
    zone: String,
    name: String,
    presentation: String,
    rr_type: u16,
    is_wildcard: bool,
    comment: String,
    created_at: i64,
    modified_at: i64,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            zone: row.get(1)?,
            name: row.get(2)?,
            presentation: row.get(3)?,
            rr_type: row.get(4)?,
            is_wildcard: row.get(5)?,
            comment: row.get(6)?,
            created_at: row.get(7)?,
            modified_at: row.get(8)?,
        })
    }
}

impl TryFrom<RawRecord> for Record {
    type Error = Error;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let id = raw.id;
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            Error::corrupt(format!("record {id}: invalid {what}: {e}"))
        };
        Ok(Self {
            id,
            zone: raw.zone.parse().map_err(|e| corrupt("zone", &e))?,
            name: raw.name.parse().map_err(|e| corrupt("name", &e))?,
            presentation: raw.presentation,
            rr_type: raw.rr_type.into(),
            is_wildcard: raw.is_wildcard,
            comment: raw.comment,
            created_at: from_unix_nanos(raw.created_at).map_err(|e| corrupt("creation time", &e))?,
            modified_at: from_unix_nanos(raw.modified_at)
                .map_err(|e| corrupt("modification time", &e))?,
        })
    }
}

fn from_unix_nanos(nanos: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos.into())
}

/// Returns the current time, both as an [`OffsetDateTime`] and as it is
/// stored.
fn now() -> Result<(OffsetDateTime, i64), Error> {
    let now = OffsetDateTime::now_utc();
    let nanos = i64::try_from(now.unix_timestamp_nanos())
        .map_err(|_| Error::corrupt("the current time is not representable"))?;
    Ok((now, nanos))
}

////////////////////////////////////////////////////////////////////////
// THE STORE                                                          //
////////////////////////////////////////////////////////////////////////

/// A handle to an SQLite record store. See the [module-level
/// documentation](self).
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    /// Creates a handle to the database at `path`. The database is not
    /// opened until an operation is performed. Writers wait up to
    /// `busy_timeout` for the database write lock.
    pub fn new(path: impl AsRef<Path>, busy_timeout: Duration) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            busy_timeout,
        }
    }

    /// Returns the path of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a connection for an operation bounded by `deadline`.
    fn connect(&self, deadline: &Deadline) -> Result<Connection, Error> {
        deadline.check()?;
        let connection = Connection::open(&self.path)?;

        connection.busy_timeout(BUSY_POLL_INTERVAL.min(self.busy_timeout))?;
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        let deadline = deadline.clone();
        connection.progress_handler(PROGRESS_HANDLER_PERIOD, Some(move || deadline.is_expired()));
        Ok(connection)
    }

    /// Begins a transaction holding the database write lock. While
    /// another connection holds the lock, this retries until the busy
    /// timeout elapses, failing with [`Error::Cancelled`] as soon as
    /// `deadline` passes.
    fn begin_write<'c>(&self, connection: &'c Connection, deadline: &Deadline) -> Result<Transaction<'c>, Error> {
        let started = Instant::now();
        loop {
            match Transaction::new_unchecked(connection, TransactionBehavior::Immediate) {
                Ok(tx) => return Ok(tx),
                Err(e) if e.sqlite_error_code() == Some(ErrorCode::DatabaseBusy) => {
                    deadline.check()?;
                    if started.elapsed() >= self.busy_timeout {
                        return Err(e.into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Provisions the schema if it is not already in place. This is
    /// idempotent.
    pub fn migrate(&self, deadline: &Deadline) -> Result<(), Error> {
        let connection = self.connect(deadline)?;
        let tx = self.begin_write(&connection, deadline)?;
        let migrated = schema::migrate(&tx)?;
        tx.commit()?;
        if migrated {
            info!(
                "Provisioned schema version {} in {}.",
                schema::SCHEMA_VERSION,
                self.path.display(),
            );
        } else {
            debug!("Schema in {} is up to date.", self.path.display());
        }
        Ok(())
    }

    /// Succeeds if the database answers a trivial query.
    pub fn ping(&self, deadline: &Deadline) -> Result<(), Error> {
        let connection = self.connect(deadline)?;
        connection.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Creates a record.
    ///
    /// The owner name is derived from `params` as described in
    /// [`crate::normalize`]. The CNAME-exclusivity check and the insert
    /// happen in one transaction that holds the database write lock
    /// throughout, so of two racing creates that conflict, one fails
    /// with [`Error::ConstraintViolation`].
    pub fn create(&self, params: &RecordParams, deadline: &Deadline) -> Result<Record, Error> {
        let normalized = normalize(&params.zone, &params.presentation)?;
        let connection = self.connect(deadline)?;
        let tx = self.begin_write(&connection, deadline)?;

        constraint::check_cname_exclusivity(&tx, &normalized)?;

        let (now, now_nanos) = now()?;
        tx.execute(
            "INSERT INTO records
             (zone, name, presentation, type, is_wildcard, comment, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                normalized.zone.to_string(),
                normalized.name.to_string(),
                params.presentation,
                u16::from(normalized.rr_type),
                normalized.is_wildcard,
                params.comment,
                now_nanos,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(
            "Created record {id}: {} {} in zone {}.",
            normalized.owner, normalized.rr_type, normalized.zone,
        );
        Ok(Record {
            id,
            zone: normalized.zone,
            name: normalized.name,
            presentation: params.presentation.clone(),
            rr_type: normalized.rr_type,
            is_wildcard: normalized.is_wildcard,
            comment: params.comment.clone(),
            created_at: now,
            modified_at: now,
        })
    }

    /// Reads the record with identifier `id`.
    pub fn read(&self, id: i64, deadline: &Deadline) -> Result<Record, Error> {
        let connection = self.connect(deadline)?;
        let raw = connection
            .query_row(
                &format!("SELECT {COLUMNS} FROM records WHERE id = ?1"),
                [id],
                RawRecord::from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;
        raw.try_into()
    }

    /// Replaces the zone, presentation and comment of the record with
    /// identifier `id`, deriving its owner name and type afresh.
    ///
    /// Unlike [`Store::create`], this does not check CNAME
    /// exclusivity.
    pub fn update(&self, id: i64, params: &RecordParams, deadline: &Deadline) -> Result<Record, Error> {
        let normalized = normalize(&params.zone, &params.presentation)?;
        let connection = self.connect(deadline)?;
        let tx = self.begin_write(&connection, deadline)?;
        let (_, now_nanos) = now()?;
        let raw = tx
            .query_row(
                &format!(
                    "UPDATE records
                     SET zone = ?1, name = ?2, presentation = ?3, type = ?4,
                         is_wildcard = ?5, comment = ?6, modified_at = ?7
                     WHERE id = ?8
                     RETURNING {COLUMNS}"
                ),
                params![
                    normalized.zone.to_string(),
                    normalized.name.to_string(),
                    params.presentation,
                    u16::from(normalized.rr_type),
                    normalized.is_wildcard,
                    params.comment,
                    now_nanos,
                    id,
                ],
                RawRecord::from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;
        tx.commit()?;
        debug!("Updated record {id}.");
        raw.try_into()
    }

    /// Deletes the record with identifier `id`, returning it as it was
    /// before deletion.
    pub fn delete(&self, id: i64, deadline: &Deadline) -> Result<Record, Error> {
        let connection = self.connect(deadline)?;
        let tx = self.begin_write(&connection, deadline)?;
        let raw = tx
            .query_row(
                &format!("DELETE FROM records WHERE id = ?1 RETURNING {COLUMNS}"),
                [id],
                RawRecord::from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;
        tx.commit()?;
        debug!("Deleted record {id}.");
        raw.try_into()
    }

    /// Lists the records of `zone`, in order of creation. Records of
    /// subdomains that are separate zones are not included.
    pub fn list_by_zone(&self, zone: &Name, deadline: &Deadline) -> Result<Vec<Record>, Error> {
        let connection = self.connect(deadline)?;
        let mut statement =
            connection.prepare(&format!("SELECT {COLUMNS} FROM records WHERE zone = ?1 ORDER BY id"))?;
        let rows = statement.query_map([zone.to_ascii_lowercase().to_string()], RawRecord::from_row)?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(Record::try_from(raw?)?);
        }
        Ok(records)
    }

    /// Answers `question`; see [`resolve`](self::resolve) for the
    /// algorithm. The returned records are in presentation format,
    /// owned by `question.name` exactly as spelled in the question.
    /// Fails with [`Error::NotFound`] if nothing matches.
    pub fn resolve(&self, question: &Question, deadline: &Deadline) -> Result<Vec<String>, Error> {
        let connection = self.connect(deadline)?;
        resolve::resolve(&connection, question)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
