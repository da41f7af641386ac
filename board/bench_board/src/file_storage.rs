use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use cubesat_board::{StorageError, StorageServices};

// ENOSPC
const NO_SPACE_LEFT: i32 = 28;

/// A host directory standing in for the removable card.
pub struct FileStorage {
    root: PathBuf,
    mounted: bool,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStorage {
            root: root.into(),
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        Ok(self.root.join(file_name))
    }
}

fn storage_error(err: io::Error) -> StorageError {
    if err.raw_os_error() == Some(NO_SPACE_LEFT) {
        return StorageError::Full;
    }
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::Io,
    }
}

impl StorageServices for FileStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        if let Err(err) = fs::create_dir_all(&self.root) {
            log::error!("cannot mount {}: {}", self.root.display(), err);
            return Err(StorageError::MountFailed);
        }
        if !self.root.is_dir() {
            return Err(StorageError::MountFailed);
        }
        self.mounted = true;
        log::debug!("mounted {}", self.root.display());
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn append(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path(file_name)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(storage_error)?;
        file.write_all(bytes).map_err(storage_error)?;
        file.sync_data().map_err(storage_error)
    }

    fn last_byte(&mut self, file_name: &str) -> Result<Option<u8>, StorageError> {
        let path = self.path(file_name)?;
        let mut file = File::open(path).map_err(storage_error)?;
        let length = file.metadata().map_err(storage_error)?.len();
        if length == 0 {
            return Ok(None);
        }
        file.seek(SeekFrom::End(-1)).map_err(storage_error)?;
        let mut byte = [0_u8; 1];
        file.read_exact(&mut byte).map_err(storage_error)?;
        Ok(Some(byte[0]))
    }

    fn read(&mut self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(file_name)?;
        fs::read(path).map_err(storage_error)
    }

    fn list_files(&mut self) -> Result<Vec<String>, StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(storage_error)? {
            let entry = entry.map_err(storage_error)?;
            if entry.file_type().map_err(storage_error)?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove(&mut self, file_name: &str) -> Result<(), StorageError> {
        let path = self.path(file_name)?;
        fs::remove_file(path).map_err(storage_error)
    }
}
