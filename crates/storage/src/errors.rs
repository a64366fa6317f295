use std::io;

use bpmon_model::subject::SubjectId;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    TransactionError(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    CommitError(#[from] redb::CommitError),

    #[error("Storage error: {0}")]
    StorageError(#[from] redb::StorageError),

    #[error("Table error: {0}")]
    TableError(#[from] redb::TableError),

    #[error("Set durability error: {0}")]
    SetDurabilityError(#[from] redb::SetDurabilityError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Record for {subject} at {attempted} is not newer than the latest at {latest}")]
    NonIncreasingTimestamp {
        subject: SubjectId,
        latest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("Timestamp {0} predates the Unix epoch")]
    InvalidTimestamp(DateTime<Utc>),
}
