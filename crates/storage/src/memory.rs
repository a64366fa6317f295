use std::collections::BTreeMap;

use async_trait::async_trait;
use bpmon_model::{score::ScoreRecord, subject::SubjectId};
use bpmon_scoring::sources::ScoreStore;
use parking_lot::RwLock;

use crate::errors::StoreError;

/// Score history kept in memory, for ephemeral runs and tests.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    records: RwLock<BTreeMap<SubjectId, Vec<ScoreRecord>>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: ScoreRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let history = records.entry(record.subject.clone()).or_default();
        if let Some(latest) = history.last()
            && record.time_stamp <= latest.time_stamp
        {
            return Err(StoreError::NonIncreasingTimestamp {
                subject: record.subject,
                latest: latest.time_stamp,
                attempted: record.time_stamp,
            });
        }
        history.push(record);
        Ok(())
    }

    pub fn latest(&self, subject: &SubjectId) -> Option<ScoreRecord> {
        self.records
            .read()
            .get(subject)
            .and_then(|history| history.last().cloned())
    }

    pub fn history(&self, subject: &SubjectId) -> Vec<ScoreRecord> {
        self.records
            .read()
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of records across all subjects.
    pub fn len(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn append(&self, record: ScoreRecord) -> anyhow::Result<()> {
        Ok(MemoryScoreStore::append(self, record)?)
    }

    async fn latest(&self, subject: &SubjectId) -> anyhow::Result<Option<ScoreRecord>> {
        Ok(MemoryScoreStore::latest(self, subject))
    }

    async fn history(&self, subject: &SubjectId) -> anyhow::Result<Vec<ScoreRecord>> {
        Ok(MemoryScoreStore::history(self, subject))
    }
}
