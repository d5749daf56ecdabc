use std::path::PathBuf;

use rusty_ulid::Ulid;

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

/// Flat directory of named files.
#[derive(Clone, Debug)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = storage_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(BackendLocal { base_dir })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    /// Write through a uniquely named temp file so readers never see a
    /// partially written file.
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self.base_dir.join(format!("{}-{ident}", Ulid::generate()));

        std::fs::write(&temp_path, data)?;

        std::fs::rename(&temp_path, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackendLocal::new(dir.path()).unwrap();

        assert!(!store.exists("config.yaml"));
        store.write("config.yaml", b"top_k: 5\n").unwrap();

        assert!(store.exists("config.yaml"));
        assert_eq!(store.read("config.yaml").unwrap(), b"top_k: 5\n");

        // no temp files left behind
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");

        BackendLocal::new(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
