//! In-memory run store. Production persistence is an external collaborator
//! behind the [`RunStore`] trait; this is its in-process stand-in for tests
//! and single-process deployments.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tradeforge_core::{RunRecord, RunStore};

#[derive(Default)]
pub struct MemoryRunStore {
    records: RwLock<HashMap<String, RunRecord>>,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn load(&self, run_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.records.read().get(run_id).cloned())
    }

    async fn save(&self, record: &RunRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.run_id.clone(), record.clone());
        Ok(())
    }
}
