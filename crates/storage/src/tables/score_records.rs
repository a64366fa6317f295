use std::sync::Arc;

use async_trait::async_trait;
use bpmon_model::{score::ScoreRecord, subject::SubjectId};
use bpmon_scoring::sources::ScoreStore;
use chrono::{DateTime, Utc};
use redb::{Database, Durability, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use crate::errors::StoreError;

const SEPARATOR: u8 = 0x00;

/// Append-only history of score records.
///
/// Key: subject text form ‖ 0x00 ‖ timestamp in milliseconds (big endian)
/// Value: [ScoreRecord] (JSON encoded)
///
/// Big endian timestamps keep each subject's records in time order, so the latest record is the
/// last key of the subject's range.
pub struct ScoreRecordTable {
    pub db: Arc<Database>,
}

impl ScoreRecordTable {
    pub const TABLE_DEFINITION: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("score_records");

    /// Stores `record`, rejecting it unless it is strictly newer than the subject's latest
    /// record. The check and the insert share one write transaction.
    pub fn append(&self, record: &ScoreRecord) -> Result<(), StoreError> {
        let key = record_key(&record.subject, record.time_stamp)?;
        let (start, end) = subject_range(&record.subject);
        let value = serde_json::to_vec(record)?;

        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::Immediate)?;
        {
            let mut table = write_txn.open_table(Self::TABLE_DEFINITION)?;
            let latest = match table.range(start.as_slice()..=end.as_slice())?.next_back() {
                Some(entry) => Some(key_millis(entry?.0.value())),
                None => None,
            };
            if let Some(latest) = latest
                && key_millis(&key) <= latest
            {
                return Err(StoreError::NonIncreasingTimestamp {
                    subject: record.subject.clone(),
                    latest: DateTime::from_timestamp_millis(latest as i64).unwrap_or_default(),
                    attempted: record.time_stamp,
                });
            }
            table.insert(key.as_slice(), value.as_slice())?;
        }
        write_txn.commit()?;

        debug!(subject = %record.subject, time_stamp = %record.time_stamp, "Stored score record");
        Ok(())
    }

    pub fn latest(&self, subject: &SubjectId) -> Result<Option<ScoreRecord>, StoreError> {
        let (start, end) = subject_range(subject);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(Self::TABLE_DEFINITION)?;
        match table.range(start.as_slice()..=end.as_slice())?.next_back() {
            Some(entry) => Ok(Some(serde_json::from_slice(entry?.1.value())?)),
            None => Ok(None),
        }
    }

    /// Every record of `subject`, oldest first.
    pub fn history(&self, subject: &SubjectId) -> Result<Vec<ScoreRecord>, StoreError> {
        let (start, end) = subject_range(subject);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(Self::TABLE_DEFINITION)?;
        table
            .range(start.as_slice()..=end.as_slice())?
            .map(|entry| -> Result<ScoreRecord, StoreError> {
                let (_, value) = entry?;
                Ok(serde_json::from_slice(value.value())?)
            })
            .collect()
    }
}

#[async_trait]
impl ScoreStore for ScoreRecordTable {
    async fn append(&self, record: ScoreRecord) -> anyhow::Result<()> {
        Ok(ScoreRecordTable::append(self, &record)?)
    }

    async fn latest(&self, subject: &SubjectId) -> anyhow::Result<Option<ScoreRecord>> {
        Ok(ScoreRecordTable::latest(self, subject)?)
    }

    async fn history(&self, subject: &SubjectId) -> anyhow::Result<Vec<ScoreRecord>> {
        Ok(ScoreRecordTable::history(self, subject)?)
    }
}

fn subject_prefix(subject: &SubjectId) -> Vec<u8> {
    let mut prefix = subject.to_string().into_bytes();
    prefix.push(SEPARATOR);
    prefix
}

fn subject_range(subject: &SubjectId) -> (Vec<u8>, Vec<u8>) {
    let prefix = subject_prefix(subject);
    let mut start = prefix.clone();
    start.extend_from_slice(&0u64.to_be_bytes());
    let mut end = prefix;
    end.extend_from_slice(&u64::MAX.to_be_bytes());
    (start, end)
}

fn record_key(subject: &SubjectId, time_stamp: DateTime<Utc>) -> Result<Vec<u8>, StoreError> {
    let millis = u64::try_from(time_stamp.timestamp_millis())
        .map_err(|_| StoreError::InvalidTimestamp(time_stamp))?;
    let mut key = subject_prefix(subject);
    key.extend_from_slice(&millis.to_be_bytes());
    Ok(key)
}

fn key_millis(key: &[u8]) -> u64 {
    let mut millis = [0u8; 8];
    if let Some(suffix) = key.len().checked_sub(8).map(|start| &key[start..]) {
        millis.copy_from_slice(suffix);
    }
    u64::from_be_bytes(millis)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bpmon_model::score::CriterionOutcome;
    use bpmon_network_spec::networks::Chain;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::db::BpmonDB;

    fn table() -> (TempDir, ScoreRecordTable) {
        let dir = TempDir::new().expect("temp dir");
        let db = BpmonDB::new(dir.path().to_path_buf()).expect("open db");
        (dir, db.score_records_provider())
    }

    fn record(subject: SubjectId, millis: i64, score: i64) -> ScoreRecord {
        ScoreRecord {
            subject,
            time_stamp: Utc.timestamp_millis_opt(millis).single().expect("date"),
            details: BTreeMap::from([(
                "has_ssl".to_string(),
                CriterionOutcome {
                    status: true,
                    score,
                },
            )]),
            score,
            max_score: 10,
            grade: "A".to_string(),
        }
    }

    #[test]
    fn test_latest_and_history_are_time_ordered() {
        let (_dir, table) = table();
        let subject = SubjectId::producer(Chain::Mainnet, "bp1");
        table.append(&record(subject.clone(), 1_000, 1)).expect("append");
        table.append(&record(subject.clone(), 300_000, 3)).expect("append");
        table.append(&record(subject.clone(), 2_000, 2)).unwrap_err();

        let latest = table.latest(&subject).expect("latest").expect("record");
        assert_eq!(latest.score, 3);
        let scores = table
            .history(&subject)
            .expect("history")
            .iter()
            .map(|record| record.score)
            .collect::<Vec<_>>();
        assert_eq!(scores, vec![1, 3]);
    }

    #[test]
    fn test_rejects_non_increasing_timestamp() {
        let (_dir, table) = table();
        let subject = SubjectId::producer(Chain::Mainnet, "bp1");
        table.append(&record(subject.clone(), 5_000, 1)).expect("append");

        let err = table.append(&record(subject.clone(), 5_000, 2)).unwrap_err();
        assert!(matches!(err, StoreError::NonIncreasingTimestamp { .. }));
        assert_eq!(table.history(&subject).expect("history").len(), 1);
    }

    #[test]
    fn test_subjects_do_not_share_history() {
        let (_dir, table) = table();
        let producer = SubjectId::producer(Chain::Mainnet, "bp1");
        let node = SubjectId::node(Chain::Mainnet, "bp1", 7);
        let other_chain = SubjectId::producer(Chain::Testnet, "bp1");
        table.append(&record(producer.clone(), 1_000, 1)).expect("append");
        table.append(&record(node.clone(), 500, 2)).expect("append");

        assert_eq!(table.latest(&producer).expect("latest").expect("record").score, 1);
        assert_eq!(table.latest(&node).expect("latest").expect("record").score, 2);
        assert_eq!(table.latest(&other_chain).expect("latest"), None);
        assert!(table.history(&other_chain).expect("history").is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let subject = SubjectId::node(Chain::Testnet, "bp2", 3);
        {
            let db = BpmonDB::new(dir.path().to_path_buf()).expect("db");
            db.score_records_provider()
                .append(&record(subject.clone(), 1_000, 4))
                .expect("append");
        }
        let db = BpmonDB::new(dir.path().to_path_buf()).expect("db");
        let stored = db.score_records_provider().latest(&subject).expect("latest").expect("record");
        assert_eq!(stored, record(subject, 1_000, 4));
    }

    #[tokio::test]
    async fn test_score_store_impl() {
        let (_dir, table) = table();
        let store: &dyn ScoreStore = &table;
        let subject = SubjectId::producer(Chain::Mainnet, "bp9");
        store.append(record(subject.clone(), 1_000, 1)).await.expect("append");
        assert!(store.append(record(subject.clone(), 999, 1)).await.is_err());
        assert_eq!(store.history(&subject).await.expect("history").len(), 1);
    }
}
