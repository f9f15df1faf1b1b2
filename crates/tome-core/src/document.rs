// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON document persistence shared by manifests, notes and binders.
//!
//! Every write replaces the whole document in place. There is no temp file
//! and no rename-into-place: a crash mid-write can leave a truncated document.

use std::fs;
use std::io::ErrorKind as IoKind;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Load and deserialize the document at `path`. Returns `Ok(None)` if missing
/// or empty.
pub(crate) fn load<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == IoKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::io(path, err)),
    };
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize and persist `value` at `path`.
pub(crate) fn save<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let mut data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    data.push(b'\n');
    fs::write(path, data).map_err(|err| StoreError::io(path, err))?;
    debug!(path = %path.display(), "document written");
    Ok(())
}

/// Delete the document at `path`. Returns whether a file was removed.
pub(crate) fn remove(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "document removed");
            Ok(true)
        }
        Err(err) if err.kind() == IoKind::NotFound => Ok(false),
        Err(err) => Err(StoreError::io(path, err)),
    }
}

/// Rename `from` to `to`, surfacing the source path on failure.
pub(crate) fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|err| StoreError::io(from, err))
}

/// Remove `dir` if it exists and holds no entries. Returns whether it was removed.
pub(crate) fn remove_dir_if_empty(dir: &Path) -> Result<bool> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == IoKind::NotFound => return Ok(false),
        Err(err) => return Err(StoreError::io(dir, err)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(dir).map_err(|err| StoreError::io(dir, err))?;
    debug!(dir = %dir.display(), "empty directory removed");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_and_empty_documents_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load::<BTreeMap<String, u32>>(&path).unwrap().is_none());
        fs::write(&path, b"").unwrap();
        assert!(load::<BTreeMap<String, u32>>(&path).unwrap().is_none());
    }

    #[test]
    fn malformed_documents_are_storage_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = load::<BTreeMap<String, u32>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Storage);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut value = BTreeMap::new();
        value.insert("b".to_string(), 2_u32);
        value.insert("a".to_string(), 1_u32);
        save(&path, &value).unwrap();
        assert_eq!(load::<BTreeMap<String, u32>>(&path).unwrap(), Some(value));
        assert!(remove(&path).unwrap());
        assert!(!remove(&path).unwrap());
    }

    #[test]
    fn only_empty_directories_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f"), b"x").unwrap();
        assert!(!remove_dir_if_empty(&sub).unwrap());
        fs::remove_file(sub.join("f")).unwrap();
        assert!(remove_dir_if_empty(&sub).unwrap());
        assert!(!remove_dir_if_empty(&sub).unwrap());
    }
}
