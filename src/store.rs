//! Per-user persistence of validated uploads.
//!
//! Each user owns a directory under the store root; every saved table lands
//! there as a parquet file named `{username}_table{N}.parquet`, with `N`
//! assigned as one past the highest id already present. Id assignment and
//! the write itself happen under a per-user lock so concurrent saves for the
//! same user cannot race to the same name. Files are written to a temp path
//! and renamed into place, so readers never observe a half-written table.

use crate::error::{ExplorerError, Result, ResultExt};
use crate::schema::SchemaValidator;
use crate::template;
use crate::types::StoredTableRecord;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const TABLE_EXTENSION: &str = "parquet";

pub struct TableStore {
    root: PathBuf,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a raw upload against the reference template and persist it
    /// under the user's next table id.
    pub fn save(&self, username: &str, df: &DataFrame) -> Result<StoredTableRecord> {
        check_username(username)?;
        SchemaValidator::check(df, &template::reference_schema())?;

        let lock = self.lock_for(username);
        let _guard = lock.lock();

        let user_dir = self.root.join(username);
        fs::create_dir_all(&user_dir)
            .context(format!("creating store directory for '{username}'"))?;

        let next_id = next_table_id(&user_dir, username)?;
        let table_name = format!("{username}_table{next_id}");
        let final_path = user_dir.join(format!("{table_name}.{TABLE_EXTENSION}"));
        let temp_path = user_dir.join(format!(".{table_name}.tmp"));

        write_parquet(&temp_path, df)?;
        fs::rename(&temp_path, &final_path)
            .context(format!("publishing table '{table_name}'"))?;

        info!(username, table_name, path = %final_path.display(), "table saved");
        Ok(StoredTableRecord {
            username: username.to_string(),
            table_name,
            path: final_path,
            created_at: Utc::now(),
        })
    }

    /// All tables saved for a user, ordered by table id.
    pub fn list_tables(&self, username: &str) -> Result<Vec<StoredTableRecord>> {
        check_username(username)?;
        let user_dir = self.root.join(username);
        if !user_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records: Vec<(u64, StoredTableRecord)> = Vec::new();
        for entry in fs::read_dir(&user_dir)
            .context(format!("listing tables for '{username}'"))?
        {
            let entry = entry.context(format!("listing tables for '{username}'"))?;
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(id) = parse_table_id(stem, username) else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION) {
                continue;
            }
            let created_at = created_at_of(&path)?;
            records.push((
                id,
                StoredTableRecord {
                    username: username.to_string(),
                    table_name: stem.to_string(),
                    path,
                    created_at,
                },
            ));
        }

        records.sort_by_key(|(id, _)| *id);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    /// Load a previously saved table by its full name, e.g. `amy_table2`.
    pub fn load(&self, username: &str, table_name: &str) -> Result<DataFrame> {
        check_username(username)?;
        let path = self
            .root
            .join(username)
            .join(format!("{table_name}.{TABLE_EXTENSION}"));
        if !path.exists() {
            return Err(ExplorerError::Storage(format!(
                "table '{table_name}' not found for user '{username}'"
            )));
        }
        let file =
            fs::File::open(&path).context(format!("opening table '{table_name}'"))?;
        ParquetReader::new(file)
            .finish()
            .context(format!("reading table '{table_name}'"))
    }

    fn lock_for(&self, username: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock();
        locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn check_username(username: &str) -> Result<()> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ExplorerError::Storage(format!(
            "invalid username '{username}': only alphanumerics, '_' and '-' are allowed"
        )))
    }
}

/// One past the highest table id already on disk, or 1 for a fresh user.
fn next_table_id(user_dir: &Path, username: &str) -> Result<u64> {
    let mut max_id = 0u64;
    for entry in fs::read_dir(user_dir)
        .context(format!("scanning tables for '{username}'"))?
    {
        let entry = entry.context(format!("scanning tables for '{username}'"))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION) {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|stem| parse_table_id(stem, username))
        {
            max_id = max_id.max(id);
        }
    }
    Ok(max_id + 1)
}

fn parse_table_id(stem: &str, username: &str) -> Option<u64> {
    stem.strip_prefix(username)?
        .strip_prefix("_table")?
        .parse()
        .ok()
}

fn write_parquet(path: &Path, df: &DataFrame) -> Result<()> {
    let file = fs::File::create(path)
        .context(format!("creating '{}'", path.display()))?;
    let mut out = df.clone();
    ParquetWriter::new(file)
        .finish(&mut out)
        .context(format!("writing '{}'", path.display()))?;
    Ok(())
}

fn created_at_of(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .context(format!("reading metadata of '{}'", path.display()))?;
    Ok(DateTime::<Utc>::from(modified))
}
