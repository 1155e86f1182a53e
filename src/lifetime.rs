//! Lifetime totals of tasks created and completed.
//!
//! Kept in `lifetime.json`, apart from the task database, so deleting tasks
//! never lowers them. There is no decrement operation.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeTotals {
    #[serde(default)]
    pub tasks_created: u64,
    #[serde(default)]
    pub tasks_completed: u64,
}

#[derive(Debug, Clone)]
pub struct LifetimeCounter {
    storage: Storage,
}

impl LifetimeCounter {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn totals(&self) -> Result<LifetimeTotals> {
        self.storage.read_json(&self.storage.lifetime_file())
    }

    pub fn increment_created(&self, by: u64) -> Result<LifetimeTotals> {
        self.bump(|totals| totals.tasks_created = totals.tasks_created.saturating_add(by))
    }

    pub fn increment_completed(&self, by: u64) -> Result<LifetimeTotals> {
        self.bump(|totals| totals.tasks_completed = totals.tasks_completed.saturating_add(by))
    }

    fn bump(&self, f: impl FnOnce(&mut LifetimeTotals)) -> Result<LifetimeTotals> {
        self.storage
            .update_json(&self.storage.lifetime_file(), |totals: &mut LifetimeTotals| {
                f(totals);
                Ok(*totals)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn starts_at_zero_and_counts_up() {
        let temp = TempDir::new().unwrap();
        let counter = LifetimeCounter::new(Storage::new(temp.path().to_path_buf()));
        assert_eq!(counter.totals().unwrap(), LifetimeTotals::default());

        counter.increment_created(2).unwrap();
        let totals = counter.increment_completed(1).unwrap();
        assert_eq!(
            totals,
            LifetimeTotals {
                tasks_created: 2,
                tasks_completed: 1
            }
        );
        assert_eq!(counter.totals().unwrap(), totals);
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        fs::write(
            storage.lifetime_file(),
            format!("{{\"tasksCreated\": {}, \"tasksCompleted\": 0}}", u64::MAX),
        )
        .unwrap();

        let counter = LifetimeCounter::new(storage);
        assert_eq!(counter.increment_created(5).unwrap().tasks_created, u64::MAX);
    }

    #[test]
    fn independent_of_task_database() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        let counter = LifetimeCounter::new(storage.clone());
        counter.increment_created(1).unwrap();

        fs::remove_file(storage.db_file()).ok();
        assert_eq!(counter.totals().unwrap().tasks_created, 1);
    }
}
