use alloc::string::String;
use alloc::vec::Vec;

use cubesat_board::{StorageError, StorageServices};

use crate::record::{RecordError, TelemetryRecord};

pub const DEFAULT_LOG_FILE_NAME: &str = "telemetry.jsonl";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageFault {
    #[error("mount failed: {0}")]
    Mount(StorageError),
    #[error("storage not mounted")]
    NotMounted,
    #[error("append failed: {0}")]
    Append(StorageError),
    #[error("{0}")]
    Encode(RecordError),
    #[error("read failed: {0}")]
    Read(StorageError),
    #[error("clear failed: {0}")]
    Clear(StorageError),
}

/// Append-only JSON Lines log of telemetry records on removable media.
///
/// Bytes already on the medium are never rewritten. When the log does not end
/// in a newline, because a write was torn before this boot or the previous
/// append failed, the next append starts with a newline so the new record
/// lands on a line of its own.
pub struct StorageSink<S: StorageServices> {
    storage: S,
    log_file_name: String,
    pending_separator: bool,
}

impl<S: StorageServices> StorageSink<S> {
    pub fn new(storage: S, log_file_name: &str) -> Self {
        StorageSink {
            storage,
            log_file_name: String::from(log_file_name),
            pending_separator: false,
        }
    }

    pub fn log_file_name(&self) -> &str {
        &self.log_file_name
    }

    pub fn is_mounted(&self) -> bool {
        self.storage.is_mounted()
    }

    pub fn storage(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn mount(&mut self) -> Result<(), StorageFault> {
        self.storage.mount().map_err(StorageFault::Mount)?;

        self.pending_separator = match self.storage.last_byte(&self.log_file_name) {
            Ok(None) | Ok(Some(b'\n')) => false,
            Ok(Some(_)) => {
                warn!("{} ends in a torn record", self.log_file_name);
                true
            }
            Err(StorageError::NotFound) => false,
            Err(err) => {
                warn!("could not inspect {}: {}", self.log_file_name, err);
                true
            }
        };
        info!("storage mounted, logging to {}", self.log_file_name);
        Ok(())
    }

    pub fn append(&mut self, record: &TelemetryRecord) -> Result<(), StorageFault> {
        if !self.storage.is_mounted() {
            return Err(StorageFault::NotMounted);
        }
        let line = record.to_json().map_err(StorageFault::Encode)?;

        let mut bytes = Vec::with_capacity(line.len() + 2);
        if self.pending_separator {
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        match self.storage.append(&self.log_file_name, &bytes) {
            Ok(()) => {
                self.pending_separator = false;
                Ok(())
            }
            Err(err) => {
                // part of the line may have reached the medium
                self.pending_separator = true;
                Err(StorageFault::Append(err))
            }
        }
    }

    /// Removes every file on the medium. Operator action only.
    pub fn clear(&mut self) -> Result<usize, StorageFault> {
        if !self.storage.is_mounted() {
            return Err(StorageFault::NotMounted);
        }
        let files = self.storage.list_files().map_err(StorageFault::Clear)?;
        for file in files.iter() {
            self.storage.remove(file).map_err(StorageFault::Clear)?;
            info!("removed {}", file);
        }
        self.pending_separator = false;
        Ok(files.len())
    }

    pub fn read_log(&mut self) -> Result<Vec<u8>, StorageFault> {
        if !self.storage.is_mounted() {
            return Err(StorageFault::NotMounted);
        }
        match self.storage.read(&self.log_file_name) {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound) => Ok(Vec::new()),
            Err(err) => Err(StorageFault::Read(err)),
        }
    }

    /// Every complete record in the log, oldest first. Torn lines are skipped.
    pub fn records(&mut self) -> Result<Vec<TelemetryRecord>, StorageFault> {
        let bytes = self.read_log()?;
        Ok(parse_log(&bytes))
    }
}

pub fn parse_log(bytes: &[u8]) -> Vec<TelemetryRecord> {
    let mut records = Vec::new();
    for (number, line) in bytes.split(|b| *b == b'\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let parsed = core::str::from_utf8(line)
            .map_err(|_| RecordError::Decode(String::from("not utf-8")))
            .and_then(TelemetryRecord::from_json);
        match parsed {
            Ok(record) => records.push(record),
            Err(err) => debug!("skipping log line {}: {}", number + 1, err),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStorage;

    fn record(sequence_number: u32) -> TelemetryRecord {
        let mut record = TelemetryRecord::unavailable(33, sequence_number, 1_700_000_000);
        record.temperature_c = Some(21.5);
        record
    }

    fn mounted_sink(storage: &MemoryStorage) -> StorageSink<MemoryStorage> {
        let mut sink = StorageSink::new(storage.clone(), DEFAULT_LOG_FILE_NAME);
        sink.mount().unwrap();
        sink
    }

    #[test]
    fn appends_one_line_per_record() {
        let storage = MemoryStorage::new();
        let mut sink = mounted_sink(&storage);
        sink.append(&record(1)).unwrap();
        sink.append(&record(2)).unwrap();

        let log = storage.contents(DEFAULT_LOG_FILE_NAME);
        assert_eq!(log.iter().filter(|b| **b == b'\n').count(), 2);
        assert_eq!(log.last(), Some(&b'\n'));
        assert_eq!(sink.records().unwrap(), vec![record(1), record(2)]);
    }

    #[test]
    fn append_is_purely_additive() {
        let storage = MemoryStorage::new();
        let mut sink = mounted_sink(&storage);
        for k in 1..=5 {
            let before = storage.contents(DEFAULT_LOG_FILE_NAME);
            sink.append(&record(k)).unwrap();
            let after = storage.contents(DEFAULT_LOG_FILE_NAME);
            assert_eq!(&after[..before.len()], &before[..]);
            assert!(after.len() > before.len());
        }
    }

    #[test]
    fn torn_tail_from_previous_boot_gets_separator() {
        let storage = MemoryStorage::new();
        storage.put(DEFAULT_LOG_FILE_NAME, b"{\"team_id\":33,\"sequ");
        let mut sink = mounted_sink(&storage);
        sink.append(&record(1)).unwrap();

        let log = storage.contents(DEFAULT_LOG_FILE_NAME);
        assert!(log.starts_with(b"{\"team_id\":33,\"sequ\n{"));
        assert_eq!(sink.records().unwrap(), vec![record(1)]);
    }

    #[test]
    fn failed_append_separates_next_record() {
        let storage = MemoryStorage::new();
        let mut sink = mounted_sink(&storage);
        sink.append(&record(1)).unwrap();

        storage.fail_next_append(10);
        assert_eq!(
            sink.append(&record(2)),
            Err(StorageFault::Append(StorageError::Io))
        );
        sink.append(&record(3)).unwrap();

        assert_eq!(sink.records().unwrap(), vec![record(1), record(3)]);
    }

    #[test]
    fn mount_failure_is_reported() {
        let storage = MemoryStorage::new();
        storage.fail_mount();
        let mut sink = StorageSink::new(storage, DEFAULT_LOG_FILE_NAME);
        assert_eq!(
            sink.mount(),
            Err(StorageFault::Mount(StorageError::MountFailed))
        );
        assert_eq!(sink.append(&record(1)), Err(StorageFault::NotMounted));
    }

    #[test]
    fn clear_removes_every_file() {
        let storage = MemoryStorage::new();
        storage.put("notes.txt", b"hello");
        let mut sink = mounted_sink(&storage);
        sink.append(&record(1)).unwrap();

        assert_eq!(sink.clear().unwrap(), 2);
        assert!(storage.file_names().is_empty());
        assert!(sink.records().unwrap().is_empty());
    }
}
