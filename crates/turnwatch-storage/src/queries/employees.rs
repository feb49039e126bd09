// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Employee roster persistence. The in-memory registry snapshot is rebuilt
//! from these rows on startup and after every roster change.

use rusqlite::params;

use turnwatch_core::{EmployeeRecord, TurnwatchError};

use crate::database::Database;

/// All roster user ids, for seeding the classifier snapshot.
pub async fn list_ids(db: &Database) -> Result<Vec<i64>, TurnwatchError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM employees ORDER BY user_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full roster, for reporting.
pub async fn list_all(db: &Database) -> Result<Vec<EmployeeRecord>, TurnwatchError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, display_name, added_by, added_at
                 FROM employees ORDER BY display_name COLLATE NOCASE",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(EmployeeRecord {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    added_by: row.get(2)?,
                    added_at: row.get(3)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Add a user to the roster, or refresh the stored name if already present.
pub async fn add(db: &Database, record: EmployeeRecord) -> Result<(), TurnwatchError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO employees (user_id, display_name, added_by, added_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name",
                params![record.user_id, record.display_name, record.added_by, record.added_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a user from the roster. Returns `false` when the id was not listed.
pub async fn remove(db: &Database, user_id: i64) -> Result<bool, TurnwatchError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM employees WHERE user_id = ?1", params![user_id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
