//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is a [`KvStore`] implementation that persists each key as a
//! single file under a base directory, so task collections and credentials
//! survive app restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── tasks_a@x.com          # serialized task collection
//! ├── users                  # credential list
//! └── currentUser            # session marker
//! ```
//!
//! Key names are sanitized to filesystem-safe characters (anything outside
//! `[A-Za-z0-9.@_-]` becomes `_`), which is why `tasks:a@x.com` lands in a
//! file named `tasks_a@x.com`.
//!
//! Use `dirs::data_dir()` or similar to obtain a platform-appropriate base
//! directory; the store itself takes any `PathBuf`.

use std::path::PathBuf;

use crate::kv::{KvStore, StoreError};

/// Filesystem-backed KvStore for desktop persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base.join(name)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                key: key.to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, value).map_err(|e| StoreError::Write {
            key: key.to_string(),
            source: e,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write {
                key: key.to_string(),
                source: e,
            }),
        }
    }
}
