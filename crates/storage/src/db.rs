use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
};

use redb::{Builder, Database, Durability};
use tracing::info;

use crate::{errors::StoreError, tables::score_records::ScoreRecordTable};

pub const REDB_FILE: &str = "bpmon.redb";

/// The size of the cache for the database
///
/// 64 MiB
pub const REDB_CACHE_SIZE: usize = 64 * 1_024 * 1_024;

#[derive(Clone, Debug)]
pub struct BpmonDB {
    pub db: Arc<Database>,
    pub data_dir: PathBuf,
}

impl BpmonDB {
    /// Opens (or creates) the database in `data_dir` and makes sure every table exists, so
    /// read transactions never hit a missing table.
    pub fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        let db = Builder::new()
            .set_cache_size(REDB_CACHE_SIZE)
            .create(data_dir.join(REDB_FILE))?;

        let mut write_txn = db.begin_write()?;
        write_txn.set_durability(Durability::Immediate)?;
        write_txn.open_table(ScoreRecordTable::TABLE_DEFINITION)?;
        write_txn.commit()?;

        info!(path = %data_dir.display(), "Opened score database");
        Ok(Self {
            db: Arc::new(db),
            data_dir,
        })
    }

    pub fn score_records_provider(&self) -> ScoreRecordTable {
        ScoreRecordTable {
            db: self.db.clone(),
        }
    }
}

/// Deletes the score database in `data_dir` once the operator confirms on `confirmation`.
/// Returns whether anything was deleted.
pub fn reset_db(data_dir: PathBuf, confirmation: impl BufRead) -> anyhow::Result<bool> {
    let db_file = data_dir.join(REDB_FILE);
    if !db_file.exists() {
        info!("No score database at {}", db_file.display());
        return Ok(false);
    }

    info!(
        "Are you sure you want to delete every score record in {}? (y/n):",
        db_file.display()
    );
    let mut input = String::new();
    let mut confirmation = confirmation;
    confirmation.read_line(&mut input)?;
    if !input.trim().eq_ignore_ascii_case("y") {
        info!("Operation canceled by user.");
        return Ok(false);
    }

    fs::remove_file(&db_file)?;
    info!("Score database deleted.");
    Ok(true)
}

/// [reset_db] confirmed on stdin.
pub fn reset_db_interactive(data_dir: PathBuf) -> anyhow::Result<bool> {
    reset_db(data_dir, io::stdin().lock())
}
