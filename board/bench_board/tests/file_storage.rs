use bench_board::FileStorage;
use cubesat_board::{StorageError, StorageServices};

#[test]
fn mount_creates_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("sd");
    let mut storage = FileStorage::new(&root);

    assert!(!storage.is_mounted());
    storage.mount().unwrap();
    assert!(storage.is_mounted());
    assert!(root.is_dir());
}

#[test]
fn mount_fails_when_path_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("card");
    std::fs::write(&root, b"not a directory").unwrap();

    let mut storage = FileStorage::new(&root);
    assert_eq!(storage.mount(), Err(StorageError::MountFailed));
}

#[test]
fn unmounted_storage_refuses_access() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());
    assert_eq!(storage.append("log", b"x"), Err(StorageError::NotMounted));
    assert_eq!(storage.list_files(), Err(StorageError::NotMounted));
}

#[test]
fn appends_without_touching_earlier_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());
    storage.mount().unwrap();

    storage.append("telemetry.jsonl", b"{\"a\":1}\n").unwrap();
    storage.append("telemetry.jsonl", b"{\"a\":2}").unwrap();

    assert_eq!(
        storage.read("telemetry.jsonl").unwrap(),
        b"{\"a\":1}\n{\"a\":2}".to_vec()
    );
    assert_eq!(storage.last_byte("telemetry.jsonl"), Ok(Some(b'}')));
}

#[test]
fn missing_and_empty_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = FileStorage::new(dir.path());
    storage.mount().unwrap();

    assert_eq!(storage.last_byte("absent"), Err(StorageError::NotFound));
    assert_eq!(storage.read("absent"), Err(StorageError::NotFound));

    storage.append("empty", b"").unwrap();
    assert_eq!(storage.last_byte("empty"), Ok(None));
}

#[test]
fn lists_and_removes_files_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("subdir")).unwrap();
    let mut storage = FileStorage::new(dir.path());
    storage.mount().unwrap();
    storage.append("b.jsonl", b"1").unwrap();
    storage.append("a.txt", b"2").unwrap();

    assert_eq!(
        storage.list_files().unwrap(),
        vec![String::from("a.txt"), String::from("b.jsonl")]
    );

    storage.remove("a.txt").unwrap();
    assert_eq!(storage.list_files().unwrap(), vec![String::from("b.jsonl")]);
    assert_eq!(storage.remove("a.txt"), Err(StorageError::NotFound));
}
