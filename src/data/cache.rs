use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use log::{debug, info};

use super::error::Result;
use super::loader::load_file;
use super::model::Table;

/// The loaded dataset for one source file, read at most once per process.
///
/// The first successful [`DatasetCache::get`] loads the file; every later call
/// returns the same `Arc<Table>`. Concurrent first calls are serialized so the
/// file is read exactly once. A failed load is not remembered: the next call
/// tries again. There is no invalidation; the dataset is static.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    table: OnceLock<Arc<Table>>,
    loading: Mutex<()>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatasetCache {
            path: path.into(),
            table: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn get(&self) -> Result<Arc<Table>> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let _guard = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = self.table.get() {
            debug!("dataset loaded by another caller while waiting");
            return Ok(Arc::clone(table));
        }

        info!("loading dataset from {}", self.path.display());
        let table = Arc::new(load_file(&self.path)?);
        Ok(Arc::clone(self.table.get_or_init(|| table)))
    }
}
