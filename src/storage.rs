// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Write-once file storage for shares and drafts.
//!
//! One file per record, named by its share id: validated shares live under
//! `<data>/shares/<id>.json` as pretty-printed `{shareID, data}` documents,
//! raw drafts under `<data>/drafts/<id>.json` byte-for-byte as submitted.
//!
//! Writes are admitted only while the storage filesystem keeps a configured
//! amount of free headroom, and land via a randomized temp file that is
//! hard-linked into place: the link fails with `AlreadyExists` when the id
//! is taken, so concurrent writers for one id resolve to exactly one winner
//! and a partially written file is never visible under its final name.

use crate::config::StorageConfig;
use crate::share_id::SHARE_ID_LEN;
use crate::validator::SaveData;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Storage error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("share {0} already exists")]
    Conflict(String),

    #[error("share {0} not found")]
    NotFound(String),

    #[error("stored share id {stored} does not match requested id {requested}")]
    IdentityMismatch { requested: String, stored: String },

    #[error("insufficient storage capacity: {available} bytes free, {required} required")]
    InsufficientCapacity { available: u64, required: u64 },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("failed to encode share data: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode share data: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write-once store for shares and drafts.
pub struct ShareStore {
    shares_dir: PathBuf,
    drafts_dir: PathBuf,
    min_free_bytes: u64,
}

impl ShareStore {
    /// Open the store, creating the `shares/` and `drafts/` trees under the
    /// configured data directory.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let shares_dir = config.data_dir.join("shares");
        let drafts_dir = config.data_dir.join("drafts");
        fs::create_dir_all(&shares_dir).await?;
        fs::create_dir_all(&drafts_dir).await?;
        Ok(Self {
            shares_dir,
            drafts_dir,
            min_free_bytes: config.min_free_bytes,
        })
    }

    /// Persist a validated share record under its id.
    pub async fn store_share(&self, record: &SaveData) -> Result<(), StoreError> {
        let path = self.entry_path(&self.shares_dir, &record.share_id)?;
        let json = serde_json::to_vec_pretty(record).map_err(StoreError::Encode)?;
        self.write_exclusive(&self.shares_dir, &record.share_id, &path, &json)
            .await?;
        debug!(id = %record.share_id, bytes = json.len(), "share stored");
        Ok(())
    }

    /// Persist a raw draft body verbatim under a freshly generated id.
    pub async fn store_draft(&self, id: &str, raw: &[u8]) -> Result<(), StoreError> {
        let path = self.entry_path(&self.drafts_dir, id)?;
        self.write_exclusive(&self.drafts_dir, id, &path, raw).await?;
        debug!(%id, bytes = raw.len(), "draft stored");
        Ok(())
    }

    /// Load the share stored under `id`.
    ///
    /// Callers must check the returned record's embedded id against the
    /// requested one and surface [`StoreError::IdentityMismatch`] if they
    /// disagree.
    pub async fn load_share(&self, id: &str) -> Result<SaveData, StoreError> {
        let path = self.entry_path(&self.shares_dir, id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(StoreError::Decode)
    }

    fn entry_path(&self, dir: &Path, id: &str) -> Result<PathBuf, StoreError> {
        // Ids are checksum-verified before they reach the store; this fence
        // keeps anything else out of the filesystem namespace.
        if id.len() != SHARE_ID_LEN || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        Ok(dir.join(format!("{id}.json")))
    }

    async fn write_exclusive(
        &self,
        dir: &Path,
        id: &str,
        path: &Path,
        contents: &[u8],
    ) -> Result<(), StoreError> {
        if fs::try_exists(path).await? {
            return Err(StoreError::Conflict(id.to_string()));
        }

        // Capacity is checked before the write attempt; anonymous writes are
        // a disk-exhaustion vector.
        let available = available_space(dir)?;
        if available < self.min_free_bytes {
            return Err(StoreError::InsufficientCapacity {
                available,
                required: self.min_free_bytes,
            });
        }

        let tmp = dir.join(format!(".{id}.{:08x}.tmp", rand::random::<u32>()));
        fs::write(&tmp, contents).await?;
        let linked = fs::hard_link(&tmp, path).await;
        if let Err(e) = fs::remove_file(&tmp).await {
            warn!(tmp = %tmp.display(), error = %e, "failed to remove temp file");
        }

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::Conflict(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Free space in bytes available to unprivileged writers on the filesystem
/// holding `path`.
#[cfg(target_family = "unix")]
fn available_space(path: &Path) -> std::io::Result<u64> {
    use std::os::unix::ffi::OsStrExt;

    let path_cstr = std::ffi::CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidInput, e))?;

    // SAFETY: statvfs is a C struct of plain integers; zero is a valid
    // initial state.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: statvfs() is a POSIX syscall. path_cstr is a valid
    // null-terminated C string, and stat is a valid mutable reference for
    // the duration of the call.
    let result = unsafe { libc::statvfs(path_cstr.as_ptr(), &mut stat) };

    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(target_family = "unix"))]
fn available_space(_path: &Path) -> std::io::Result<u64> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        "free space checking currently only supported on Unix systems",
    ))
}
