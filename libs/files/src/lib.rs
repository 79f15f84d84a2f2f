use anyhow::{Context, Result};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::*;

use engine::storage::{JsonValue, RecordStore, StoreError, WriteLocks};

/// One pretty printed JSON array per collection, `<dir>/<name>.json`.
pub struct JsonFiles {
    dir: PathBuf,
    writing: WriteLocks,
}

enum Contents {
    Records(Vec<JsonValue>),
    Unparsable(serde_json::Error),
}

impl JsonFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let dir = dir.into();

        fs::create_dir_all(&dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;

        info!(dir = %dir.display(), "files:open");

        Ok(Arc::new(Self {
            dir,
            writing: WriteLocks::default(),
        }))
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn read(&self, name: &str, path: &Path) -> Result<Contents, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(%name, "files:absent");
                return Ok(Contents::Records(Vec::new()));
            }
            Err(e) => return Err(StoreError::Io(name.to_owned(), e)),
        };

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Contents::Records(Vec::new()));
        }

        match serde_json::from_slice::<Vec<JsonValue>>(&bytes) {
            Ok(records) => {
                trace!(%name, records = records.len(), "files:loaded");
                Ok(Contents::Records(records))
            }
            Err(e) => Ok(Contents::Unparsable(e)),
        }
    }

    /// Moves an unreadable collection out of the way so the next save
    /// doesn't destroy it. Each copy gets its own name, earlier copies are
    /// never replaced.
    fn set_aside(&self, name: &str, path: &Path) -> Result<PathBuf, StoreError> {
        let io = |e: std::io::Error| StoreError::Io(name.to_owned(), e);

        let (placeholder, aside) = tempfile::Builder::new()
            .prefix(&format!(
                "{}.json.corrupt-{}-",
                name,
                chrono::Utc::now().timestamp_millis()
            ))
            .tempfile_in(&self.dir)
            .map_err(io)?
            .keep()
            .map_err(|e| io(e.error))?;

        drop(placeholder);

        if let Err(e) = fs::rename(path, &aside) {
            let _ = fs::remove_file(&aside);
            return Err(io(e));
        }

        Ok(aside)
    }
}

impl RecordStore for JsonFiles {
    fn load(&self, name: &str) -> Result<Vec<JsonValue>, StoreError> {
        match self.read(name, &self.path_of(name))? {
            Contents::Records(records) => Ok(records),
            Contents::Unparsable(e) => {
                warn!(%name, "files:corrupt {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn load_for_write(&self, name: &str) -> Result<Vec<JsonValue>, StoreError> {
        let path = self.path_of(name);

        // Writers are serialized, so these are the bytes the save replaces.
        match self.read(name, &path)? {
            Contents::Records(records) => Ok(records),
            Contents::Unparsable(e) => {
                let aside = self.set_aside(name, &path)?;
                warn!(%name, aside = %aside.display(), "files:corrupt {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, name: &str, records: &[JsonValue]) -> Result<(), StoreError> {
        let io = |e: std::io::Error| StoreError::Io(name.to_owned(), e);

        let serialized =
            serde_json::to_vec_pretty(records).map_err(|e| StoreError::Serialize(name.to_owned(), e))?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(io)?;
        temp.write_all(&serialized).map_err(io)?;
        temp.as_file().sync_all().map_err(io)?;
        temp.persist(self.path_of(name)).map_err(|e| io(e.error))?;

        debug!(%name, records = records.len(), "files:saved");

        Ok(())
    }

    fn write_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.writing.get(name)
    }
}
