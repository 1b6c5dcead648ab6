// sled holds an exclusive lock on its directory, and a dropped `Db` keeps it
// until its flusher thread exits. Every open of a path goes through here and
// shares one handle for the life of the process.

use crate::error::{LedgerError, Result};
use log::debug;
use once_cell::sync::Lazy;
use sled::Db;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static OPEN_STORES: Lazy<Mutex<HashMap<PathBuf, Db>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Opens the sled store at `path`, reusing the handle if this process already opened it.
pub fn open_db(path: &Path) -> Result<Db> {
    fs::create_dir_all(path).map_err(|e| {
        LedgerError::StoreIo(format!("Failed to create {}: {e}", path.display()))
    })?;
    let key = fs::canonicalize(path).map_err(|e| {
        LedgerError::StoreIo(format!("Failed to resolve {}: {e}", path.display()))
    })?;

    let mut stores = OPEN_STORES
        .lock()
        .map_err(|_| LedgerError::StoreIo("Store registry lock poisoned".to_string()))?;
    if let Some(db) = stores.get(&key) {
        return Ok(db.clone());
    }

    let db = sled::open(&key).map_err(|e| {
        LedgerError::StoreIo(format!("Failed to open database {}: {e}", path.display()))
    })?;
    debug!("Opened store at {}", key.display());
    stores.insert(key, db.clone());
    Ok(db)
}
