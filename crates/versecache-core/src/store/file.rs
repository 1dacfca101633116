use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

use super::KeyValueStore;

/// Longest encoded file name, below the common 255-byte filesystem limit.
const MAX_FILE_NAME_LEN: usize = 240;

/// Filesystem-backed store, one file per key.
pub struct FileStore {
    dir: PathBuf,
    // Serialises writers; readers rely on the rename being atomic.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Map a key to a file name that is safe on every platform.
    ///
    /// Bytes outside `[a-z0-9_.-]` are written as `%XX`, so distinct keys
    /// never share a file, including on case-insensitive filesystems.
    fn file_name(key: &str) -> Result<String> {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            match byte {
                b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' => name.push(byte as char),
                _ => name.push_str(&format!("%{:02X}", byte)),
            }
        }
        name.push_str(".json");
        if name.len() > MAX_FILE_NAME_LEN {
            anyhow::bail!("Store key too long: {} bytes encoded", name.len());
        }
        Ok(name)
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.dir.join(Self::file_name(key)?))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read store key: {}", key)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write store key: {}", key))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to commit store key: {}", key))?;
        debug!(key, bytes = value.len(), "Store key written");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete store key: {}", key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_set_get_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("store")).expect("store");

        assert!(store.get("quiz_questions_cache").unwrap().is_none());

        store.set("quiz_questions_cache", b"{\"a\":1}").unwrap();
        assert_eq!(
            store.get("quiz_questions_cache").unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );

        store.set("quiz_questions_cache", b"{}").unwrap();
        assert_eq!(store.get("quiz_questions_cache").unwrap().as_deref(), Some(&b"{}"[..]));

        store.delete("quiz_questions_cache").unwrap();
        assert!(store.get("quiz_questions_cache").unwrap().is_none());
    }

    #[test]
    fn test_file_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().to_path_buf()).expect("store");
        assert!(store.delete("never_written").is_ok());
    }

    #[test]
    fn test_file_name_escapes_unsafe_bytes() {
        assert_eq!(FileStore::file_name("user_progress_local").unwrap(), "user_progress_local.json");
        assert_eq!(FileStore::file_name("../etc/passwd").unwrap(), "..%2Fetc%2Fpasswd.json");
        assert_eq!(FileStore::file_name("a b:c").unwrap(), "a%20b%3Ac.json");
        assert_eq!(FileStore::file_name("Ruth").unwrap(), "%52uth.json");
    }

    #[test]
    fn test_distinct_keys_never_share_a_file() {
        let keys = ["a b", "a_b", "a%20b", "josé", "josè", "Ruth", "ruth"];
        let names: std::collections::HashSet<String> =
            keys.iter().map(|k| FileStore::file_name(k).unwrap()).collect();
        assert_eq!(names.len(), keys.len());

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().to_path_buf()).expect("store");
        store.set("a b", b"1").unwrap();
        assert!(store.get("a_b").unwrap().is_none());
        store.set("user_progress_josé", b"jose-acute").unwrap();
        store.set("user_progress_josè", b"jose-grave").unwrap();
        assert_eq!(store.get("user_progress_josé").unwrap().as_deref(), Some(&b"jose-acute"[..]));
        assert_eq!(store.get("user_progress_josè").unwrap().as_deref(), Some(&b"jose-grave"[..]));
    }

    #[test]
    fn test_overlong_key_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().to_path_buf()).expect("store");
        let key = "é".repeat(100);
        assert!(store.set(&key, b"x").is_err());
        assert!(store.get(&key).is_err());
        assert!(store.set(&"k".repeat(200), b"x").is_ok());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().to_path_buf()).expect("store");
        store.set("key", b"value").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["key.json".to_string()]);
    }
}
