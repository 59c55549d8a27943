// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Key-value storage for the user's workspace template.
//!
//! [`ConfigStore`] is the adapter the engine talks to. It never fails on
//! reads: a missing backend or a backend error resolves to an absent value,
//! and [`ConfigStore::workspace_template`] substitutes the shipped default.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    error::{self, Error},
    template::{DEFAULT_TEMPLATE, validate_template},
};

/// Storage key holding the workspace template.
pub const TEMPLATE_KEY: &str = "workspaceTemplate";

/// Asynchronous string key-value store.
#[async_trait]
pub trait StorageBackend: Send + Sync
{
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str,) -> Result<Option<String,>, Error,>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str,) -> Result<(), Error,>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default,)]
pub struct MemoryBackend
{
    entries: Arc<Mutex<HashMap<String, String,>,>,>,
}

impl MemoryBackend
{
    /// Creates an empty store.
    pub fn new() -> Self
    {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend
{
    async fn get(&self, key: &str,) -> Result<Option<String,>, Error,>
    {
        Ok(self.entries.lock().get(key,).cloned(),)
    }

    async fn set(&self, key: &str, value: &str,) -> Result<(), Error,>
    {
        self.entries.lock().insert(key.to_owned(), value.to_owned(),);
        Ok((),)
    }
}

/// Store persisted as one JSON object file.
///
/// A missing file reads as empty and is created on first write. Writes go
/// through a sibling temp file that is renamed over the target.
#[derive(Debug,)]
pub struct FileBackend
{
    path:  PathBuf,
    write: tokio::sync::Mutex<(),>,
}

impl FileBackend
{
    /// Creates a backend persisting to `path`.
    pub fn new(path: impl Into<PathBuf,>,) -> Self
    {
        Self {
            path: path.into(), write: tokio::sync::Mutex::new((),),
        }
    }

    /// Location of the backing file.
    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    async fn read_entries(&self,) -> Result<Map<String, Value,>, Error,>
    {
        let contents = match tokio::fs::read_to_string(&self.path,).await {
            Ok(contents,) => contents,
            Err(source,) if source.kind() == ErrorKind::NotFound => return Ok(Map::new(),),
            Err(source,) => return Err(error::io_error(&self.path, source,),),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new(),);
        }

        match serde_json::from_str::<Value,>(&contents,)? {
            Value::Object(entries,) => Ok(entries,),
            _ => Err(Error::store(format!("{} does not contain a JSON object", self.path.display()),),),
        }
    }

    fn temp_path(&self,) -> PathBuf
    {
        let mut name = self.path.file_name().map(|name| name.to_os_string(),).unwrap_or_default();
        name.push(".tmp",);
        self.path.with_file_name(name,)
    }
}

#[async_trait]
impl StorageBackend for FileBackend
{
    async fn get(&self, key: &str,) -> Result<Option<String,>, Error,>
    {
        let entries = self.read_entries().await?;
        Ok(entries.get(key,).and_then(Value::as_str,).map(str::to_owned,),)
    }

    async fn set(&self, key: &str, value: &str,) -> Result<(), Error,>
    {
        let _guard = self.write.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_owned(), Value::String(value.to_owned(),),);
        let serialized = serde_json::to_string_pretty(&Value::Object(entries,),)?;

        if let Some(parent,) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent,).await.map_err(|source| error::io_error(parent, source,),)?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, serialized,).await.map_err(|source| error::io_error(&temp, source,),)?;
        tokio::fs::rename(&temp, &self.path,)
            .await
            .map_err(|source| error::io_error(&self.path, source,),)?;
        debug!("stored {} in {}", key, self.path.display());
        Ok((),)
    }
}

/// Adapter over an optional [`StorageBackend`].
#[derive(Clone, Default,)]
pub struct ConfigStore
{
    backend: Option<Arc<dyn StorageBackend,>,>,
}

impl std::fmt::Debug for ConfigStore
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        f.debug_struct("ConfigStore",).field("available", &self.is_available(),).finish()
    }
}

impl ConfigStore
{
    /// Creates an adapter over `backend`.
    pub fn new(backend: Arc<dyn StorageBackend,>,) -> Self
    {
        Self {
            backend: Some(backend,),
        }
    }

    /// Creates an adapter with no backend; every read resolves to absent.
    pub fn unavailable() -> Self
    {
        Self::default()
    }

    /// Whether a backend is configured.
    pub fn is_available(&self,) -> bool
    {
        self.backend.is_some()
    }

    /// Reads `key`, treating backend failures as absence.
    pub async fn get(&self, key: &str,) -> Option<String,>
    {
        let backend = self.backend.as_ref()?;
        match backend.get(key,).await {
            Ok(value,) => value,
            Err(error,) => {
                warn!("failed to read {} from storage: {}", key, error);
                None
            }
        }
    }

    /// Writes `value` under `key`.
    ///
    /// Values for [`TEMPLATE_KEY`] must pass [`validate_template`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) for a rejected
    /// template, [`Error::Store`](Error::Store) when no backend is
    /// configured, and any error the backend reports.
    pub async fn set(&self, key: &str, value: &str,) -> Result<(), Error,>
    {
        if key == TEMPLATE_KEY {
            validate_template(value,)?;
        }
        let backend = self.backend.as_ref().ok_or_else(|| Error::store("no storage backend configured",),)?;
        backend.set(key, value,).await
    }

    /// The stored workspace template, or the default when absent or blank.
    pub async fn workspace_template(&self,) -> String
    {
        match self.get(TEMPLATE_KEY,).await {
            Some(template,) if !template.trim().is_empty() => template,
            _ => DEFAULT_TEMPLATE.to_owned(),
        }
    }
}
