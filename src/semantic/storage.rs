//! Binary storage for the recipe vector index.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (2)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - recipe_id: u64 (little-endian)
//! - embedding: [f32; dimensions] (little-endian)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::index::VectorIndex;

/// Current file format version
const FORMAT_VERSION: u8 = 2;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index has {0} dimensions, the file format allows at most 65535")]
    TooManyDimensions(usize),
}

/// Storage manager for the persisted vector index.
pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the vector index from storage.
    ///
    /// # Arguments
    /// * `expected_model_id` - SHA256 hash of the expected model name
    /// * `expected_dimensions` - Expected embedding dimensions
    ///
    /// # Returns
    /// A populated VectorIndex, or an error if the file is invalid/incompatible.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<VectorIndex, VectorStorageError> {
        let file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = Self::read_header(&mut reader)?;
        Self::validate_header(&header, expected_model_id, expected_dimensions)?;

        let dimensions = header.dimensions as usize;
        // a truncated file fails in read_entry; only size the map for what fits
        let entry_size = 8 + dimensions as u64 * 4;
        let fits = file_len.saturating_sub(HEADER_SIZE as u64) / entry_size;
        let mut index = VectorIndex::with_capacity(dimensions, header.entry_count.min(fits) as usize);

        let mut rejected = 0;
        for _ in 0..header.entry_count {
            let (id, embedding) = Self::read_entry(&mut reader, dimensions)?;
            if let Err(e) = index.insert(id, embedding) {
                log::warn!("skipping stored vector for recipe {id}: {e}");
                rejected += 1;
            }
        }

        if rejected > 0 {
            log::warn!(
                "{rejected} of {} stored vectors in {} were rejected",
                header.entry_count,
                self.path.display()
            );
        }

        Ok(index)
    }

    /// Save the vector index to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self, index: &VectorIndex, model_id: &[u8; 32]) -> Result<(), VectorStorageError> {
        let dimensions = u16::try_from(index.dimensions())
            .map_err(|_| VectorStorageError::TooManyDimensions(index.dimensions()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");

        let result = Self::write_to_file(&temp_path, index, dimensions, model_id);

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    fn write_to_file(
        path: &Path,
        index: &VectorIndex,
        dimensions: u16,
        model_id: &[u8; 32],
    ) -> Result<(), VectorStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = Header {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions,
            entry_count: index.len() as u64,
        };
        Self::write_header(&mut writer, &header)?;

        for (id, embedding) in index.iter() {
            writer.write_all(&id.to_le_bytes())?;
            for &value in embedding {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        Ok(())
    }

    fn read_header(reader: &mut impl Read) -> Result<Header, VectorStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let version = header_bytes[0];
        if version != FORMAT_VERSION {
            return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let stored_checksum = u32::from_le_bytes([
            header_bytes[43],
            header_bytes[44],
            header_bytes[45],
            header_bytes[46],
        ]);
        let computed_checksum = Self::compute_checksum(&header_bytes[0..43]);
        if stored_checksum != computed_checksum {
            return Err(VectorStorageError::ChecksumMismatch);
        }

        let mut model_id = [0u8; 32];
        model_id.copy_from_slice(&header_bytes[1..33]);

        let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header_bytes[35..43]);
        let entry_count = u64::from_le_bytes(count_bytes);

        Ok(Header {
            version,
            model_id,
            dimensions,
            entry_count,
        })
    }

    fn validate_header(
        header: &Header,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<(), VectorStorageError> {
        if header.model_id != *expected_model_id {
            return Err(VectorStorageError::ModelMismatch);
        }

        if header.dimensions as usize != expected_dimensions {
            return Err(VectorStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: header.dimensions as usize,
            });
        }

        Ok(())
    }

    fn write_header(writer: &mut impl Write, header: &Header) -> Result<(), VectorStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];

        header_bytes[0] = header.version;
        header_bytes[1..33].copy_from_slice(&header.model_id);
        header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
        header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

        let checksum = Self::compute_checksum(&header_bytes[0..43]);
        header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

        writer.write_all(&header_bytes)?;
        Ok(())
    }

    fn read_entry(
        reader: &mut impl Read,
        dimensions: usize,
    ) -> Result<(u64, Vec<f32>), VectorStorageError> {
        let mut id_bytes = [0u8; 8];
        reader.read_exact(&mut id_bytes)?;
        let id = u64::from_le_bytes(id_bytes);

        let mut embedding = Vec::with_capacity(dimensions);
        for _ in 0..dimensions {
            let mut float_bytes = [0u8; 4];
            reader.read_exact(&mut float_bytes)?;
            embedding.push(f32::from_le_bytes(float_bytes));
        }

        Ok((id, embedding))
    }

    fn compute_checksum(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    fn test_model_id() -> [u8; 32] {
        let mut id = [0u8; 32];
        id[0] = 0xAB;
        id[31] = 0xCD;
        id
    }

    #[test]
    fn test_save_and_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = test_model_id();

        storage.save(&VectorIndex::new(384), &model_id).unwrap();
        assert!(storage.exists());

        let loaded = storage.load(&model_id, 384).unwrap();
        assert_eq!(loaded.len(), 0);
        assert_eq!(loaded.dimensions(), 384);
    }

    #[test]
    fn test_save_and_load_with_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = test_model_id();

        let mut index = VectorIndex::new(3);
        index.insert(38, vec![1.0, 0.0, 0.0]).unwrap();
        index.insert(39, vec![0.0, 1.0, 0.0]).unwrap();
        index.insert(40, vec![0.0, 0.25, 1.0]).unwrap();

        storage.save(&index, &model_id).unwrap();

        let loaded = storage.load(&model_id, 3).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(38).unwrap(), &[1.0, 0.0, 0.0]);
        assert_eq!(loaded.get(40).unwrap(), &[0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("persist").join("vectors.bin"));

        storage.save(&VectorIndex::new(2), &test_model_id()).unwrap();
        assert!(storage.exists());
    }

    #[test]
    fn test_load_skips_zero_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = test_model_id();

        let mut index = VectorIndex::new(2);
        index.insert(7, vec![1.0, 0.0]).unwrap();
        storage.save(&index, &model_id).unwrap();

        // zero the entry's vector; the header checksum does not cover entries
        let mut file = std::fs::OpenOptions::new().write(true).open(storage.path()).unwrap();
        file.seek(SeekFrom::Start(HEADER_SIZE as u64 + 8)).unwrap();
        file.write_all(&[0u8; 8]).unwrap();
        drop(file);

        let loaded = storage.load(&model_id, 2).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_model_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));

        storage.save(&VectorIndex::new(3), &test_model_id()).unwrap();

        let mut wrong_model_id = [0u8; 32];
        wrong_model_id[0] = 0xFF;

        let result = storage.load(&wrong_model_id, 3);
        assert!(matches!(result, Err(VectorStorageError::ModelMismatch)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = test_model_id();

        storage.save(&VectorIndex::new(3), &model_id).unwrap();

        let result = storage.load(&model_id, 384);
        assert!(matches!(result, Err(VectorStorageError::DimensionMismatch { expected: 384, got: 3 })));
    }

    #[test]
    fn test_old_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = test_model_id();

        storage.save(&VectorIndex::new(3), &model_id).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.write_all(&[1]).unwrap();

        let result = storage.load(&model_id, 3);
        assert!(matches!(result, Err(VectorStorageError::VersionMismatch(1, FORMAT_VERSION))));
    }

    #[test]
    fn test_atomic_write_cleans_up_on_error() {
        let path = PathBuf::from("/nonexistent/directory/vectors.bin");
        let storage = VectorStorage::new(path.clone());

        let result = storage.save(&VectorIndex::new(3), &test_model_id());

        assert!(result.is_err());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = test_model_id();

        let mut index = VectorIndex::new(3);
        index.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        storage.save(&index, &model_id).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(10)).unwrap();
        file.write_all(&[0xFF]).unwrap();

        let result = storage.load(&model_id, 3);
        assert!(matches!(result, Err(VectorStorageError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = test_model_id();

        let mut index = VectorIndex::new(3);
        index.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        storage.save(&index, &model_id).unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 4).unwrap();

        let result = storage.load(&model_id, 3);
        assert!(matches!(result, Err(VectorStorageError::Io(_))));
    }
}
