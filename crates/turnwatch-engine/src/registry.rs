// SPDX-FileCopyrightText: 2026 Turnwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory employee registry snapshot.
//!
//! Classification happens on the hot path of every inbound message, so the
//! roster is held as an [`ArcSwap`] set: readers never block, and roster
//! edits publish a whole new snapshot rebuilt from the database. The roster
//! is small (a team, not a user base) so full rebuilds are fine.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use turnwatch_core::{SenderRole, TurnwatchError};
use turnwatch_storage::{Database, queries::employees};

pub struct EmployeeRegistry {
    ids: ArcSwap<HashSet<i64>>,
}

impl EmployeeRegistry {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ArcSwap::from_pointee(ids.into_iter().collect()),
        }
    }

    /// Build a registry seeded from the persisted roster.
    pub async fn load(db: &Database) -> Result<Self, TurnwatchError> {
        let ids = employees::list_ids(db).await?;
        tracing::debug!(count = ids.len(), "loaded employee roster");
        Ok(Self::new(ids))
    }

    /// Re-read the persisted roster and publish a fresh snapshot. Called
    /// after every roster edit; messages classified concurrently see either
    /// the old or the new snapshot, never a partial one.
    pub async fn refresh(&self, db: &Database) -> Result<(), TurnwatchError> {
        let ids = employees::list_ids(db).await?;
        self.ids.store(Arc::new(ids.into_iter().collect()));
        Ok(())
    }

    pub fn is_employee(&self, user_id: i64) -> bool {
        self.ids.load().contains(&user_id)
    }

    /// Binary classification: in the roster means employee, everyone else
    /// is a conversation partner.
    pub fn classify(&self, user_id: i64) -> SenderRole {
        if self.is_employee(user_id) {
            SenderRole::Employee
        } else {
            SenderRole::Partner
        }
    }

    pub fn len(&self) -> usize {
        self.ids.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use turnwatch_core::EmployeeRecord;

    #[test]
    fn classification_follows_the_snapshot() {
        let registry = EmployeeRegistry::new([50, 51]);
        assert_eq!(registry.classify(50), SenderRole::Employee);
        assert_eq!(registry.classify(7), SenderRole::Partner);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn empty_roster_classifies_everyone_as_partner() {
        let registry = EmployeeRegistry::new([]);
        assert!(registry.is_empty());
        assert_eq!(registry.classify(50), SenderRole::Partner);
    }

    #[tokio::test]
    async fn refresh_picks_up_roster_edits() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("roster.db").to_str().unwrap())
            .await
            .unwrap();

        let registry = EmployeeRegistry::load(&db).await.unwrap();
        assert!(registry.is_empty());

        employees::add(
            &db,
            EmployeeRecord {
                user_id: 50,
                display_name: "Priya".to_string(),
                added_by: "ops".to_string(),
                added_at: 1_000,
            },
        )
        .await
        .unwrap();
        registry.refresh(&db).await.unwrap();
        assert!(registry.is_employee(50));

        employees::remove(&db, 50).await.unwrap();
        registry.refresh(&db).await.unwrap();
        assert!(!registry.is_employee(50));

        db.close().await.unwrap();
    }
}
