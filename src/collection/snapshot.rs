//! Saved collection state for restoring across restarts.

use crate::error::{CollectionError, Result};
use crate::types::ChildKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Keys in order plus the parallel item list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot<T> {
    pub version: u8,
    pub keys: Vec<ChildKey>,
    pub items: Vec<T>,
}

impl<T> CollectionSnapshot<T> {
    /// Snapshot at the current format version.
    pub fn new(keys: Vec<ChildKey>, items: Vec<T>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            keys,
            items,
        }
    }

    /// Get child count.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the snapshot holds no children.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<T: Serialize> CollectionSnapshot<T> {
    /// Write the snapshot as JSON.
    ///
    /// Goes through a sibling temp file and a rename so a crash never leaves
    /// a half-written snapshot at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = temp_path_for(path);

        let encoded = serde_json::to_vec(self)?;
        let written = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&encoded)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), children = self.keys.len(), "saved snapshot");
        Ok(())
    }
}

/// `list.json` -> `list.json.tmp`, so snapshots sharing a stem never collide.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl<T: DeserializeOwned> CollectionSnapshot<T> {
    /// Read a snapshot written by [`CollectionSnapshot::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: Self = serde_json::from_reader(BufReader::new(file))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CollectionError::InvalidSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }

        Ok(snapshot)
    }
}
