//! Storage layer for taskmaster
//!
//! All state lives in one data directory:
//!
//! ```text
//! <data-dir>/
//!   taskmaster.toml        # Optional configuration
//!   db.json                # Tasks, categories, tags
//!   db.json.lock           # Advisory lock guarding db.json
//!   lifetime.json          # Lifetime created/completed counters
//!   lifetime.json.lock
//!   uploads/               # Attached images
//!     task-image-<uuid>.<ext>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::CONFIG_FILE;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

pub const DB_FILE: &str = "db.json";
pub const LIFETIME_FILE: &str = "lifetime.json";
pub const UPLOADS_DIR: &str = "uploads";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKMASTER_DATA_DIR";

/// Platform data directory, e.g. `~/.local/share/taskmaster` on Linux
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "taskmaster")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| Error::OperationFailed("cannot determine a home directory".to_string()))
}

/// Storage manager for a taskmaster data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Use `explicit` when given, otherwise the platform data directory.
    pub fn open(explicit: Option<PathBuf>) -> Result<Self> {
        let data_dir = match explicit {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let storage = Self::new(data_dir);
        storage.init()?;
        Ok(storage)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn db_file(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn lifetime_file(&self) -> PathBuf {
        self.data_dir.join(LIFETIME_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_DIR)
    }

    /// Create the data directory and its subdirectories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }

    // =========================================================================
    // JSON documents
    // =========================================================================

    /// Read a JSON document under its lock. A missing file reads as `T::default()`.
    pub fn read_json<T>(&self, path: &Path) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match lock::read_locked(path, DEFAULT_LOCK_TIMEOUT_MS)? {
            Some(bytes) => decode(path, &bytes),
            None => Ok(T::default()),
        }
    }

    /// Read-modify-write a JSON document while holding its lock.
    ///
    /// Nothing is written when `f` fails.
    pub fn update_json<T, R, F>(&self, path: &Path, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut doc: T = match fs::read(path) {
            Ok(bytes) => decode(path, &bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(err) => return Err(Error::Io(err)),
        };
        let result = f(&mut doc)?;
        write_pretty(path, &doc)?;
        tracing::debug!(path = %path.display(), "document written");
        Ok(result)
    }
}

fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "corrupt document");
        Error::Json(err)
    })
}

fn write_pretty<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    lock::write_atomic(path, json.as_bytes())
}
