// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key/value store for client-side state.
//!
//! Each key is one file under the store root, so entries can be inspected
//! and removed by hand. Writes go to a temp file first and are renamed into
//! place.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> LocalStoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> LocalStoreResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.ends_with(TEMP_SUFFIX)
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LocalStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    pub fn get(&self, key: &str) -> LocalStoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a value (atomic write via rename).
    pub fn set(&self, key: &str, value: &str) -> LocalStoreResult<()> {
        let path = self.path_for(key)?;
        let temp_path = self.root.join(format!("{key}{TEMP_SUFFIX}"));
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> LocalStoreResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> LocalStoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }

    /// Remove a key. Missing keys are not an error.
    pub fn remove(&self, key: &str) -> LocalStoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn keys(&self) -> LocalStoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(TEMP_SUFFIX) {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Remove every entry in the store.
    pub fn clear(&self) -> LocalStoreResult<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}
