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

//! The database schema.
//!
//! There is a single `records` table with one row per resource record.
//! `zone` and `name` hold lowercased fully-qualified names in
//! presentation format; `type` holds the numeric RR type; timestamps
//! are unix nanoseconds. The three indexes serve the exact-match and
//! wildcard steps of resolution and listing by zone.

use rusqlite::Transaction;

/// The schema version written to `PRAGMA user_version` once the schema
/// below is in place.
pub(super) const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id           INTEGER PRIMARY KEY,
    zone         TEXT NOT NULL,
    name         TEXT NOT NULL,
    presentation TEXT NOT NULL,
    type         INTEGER NOT NULL,
    is_wildcard  INTEGER NOT NULL,
    comment      TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    modified_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS records_name_type ON records (name, type);
CREATE INDEX IF NOT EXISTS records_zone ON records (zone);
CREATE INDEX IF NOT EXISTS records_wildcard_name_type ON records (is_wildcard, name, type);
";

/// Creates the table and indexes if they do not exist yet. Returns
/// whether anything had to be done. The caller commits `tx`, which
/// must hold the write lock so that concurrent migrations serialize.
pub(super) fn migrate(tx: &Transaction) -> rusqlite::Result<bool> {
    let version: i64 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(false);
    }
    tx.execute_batch(SCHEMA)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, TransactionBehavior};

    use super::*;

    fn migrate_and_commit(connection: &Connection) -> bool {
        let tx = Transaction::new_unchecked(connection, TransactionBehavior::Immediate).unwrap();
        let migrated = migrate(&tx).unwrap();
        tx.commit().unwrap();
        migrated
    }

    #[test]
    fn migrate_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();
        assert!(migrate_and_commit(&connection));
        assert!(!migrate_and_commit(&connection));
        let n_indexes: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'records'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(n_indexes, 3);
    }
}
