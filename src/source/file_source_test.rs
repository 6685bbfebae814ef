use std::fs::File;
use std::time::Duration;
use std::time::SystemTime;

use super::*;
use crate::Error;
use crate::SourceError;

fn touch(
    path: &std::path::Path,
    modified: SystemTime,
) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

#[test]
fn test_content_type_follows_extension() {
    let source = FileSource::new();
    assert_eq!(source.content_type("/etc/app/conf.yml"), ContentType::Yaml);
    assert_eq!(source.content_type("/etc/app/conf.json"), ContentType::Json);
}

#[test]
fn test_get_reads_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, br#"{"a":1}"#).unwrap();

    let source = FileSource::new();
    let content = source.get(path.to_str().unwrap()).unwrap();
    assert_eq!(content, Some(br#"{"a":1}"#.to_vec()));
}

#[test]
fn test_get_serves_cached_content_until_modified() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conf.json");
    let key = path.to_str().unwrap();
    let modified = SystemTime::now() - Duration::from_secs(60);

    std::fs::write(&path, br#"{"v":1}"#).unwrap();
    touch(&path, modified);

    let source = FileSource::new();
    assert_eq!(source.get(key).unwrap(), Some(br#"{"v":1}"#.to_vec()));

    // Same modification time: the cached content wins
    std::fs::write(&path, br#"{"v":2}"#).unwrap();
    touch(&path, modified);
    assert_eq!(source.get(key).unwrap(), Some(br#"{"v":1}"#.to_vec()));

    touch(&path, modified + Duration::from_secs(1));
    assert_eq!(source.get(key).unwrap(), Some(br#"{"v":2}"#.to_vec()));
}

#[test]
fn test_get_missing_file_is_path_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let source = FileSource::new();
    let err = source.get(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Source(SourceError::PathError { .. })));
}

#[test]
fn test_empty_file_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, b"").unwrap();

    let source = FileSource::new();
    assert_eq!(source.get(path.to_str().unwrap()).unwrap(), None);
}

#[test]
fn test_set_is_unsupported_and_watch_is_none() {
    let source = FileSource::new();
    let err = source.set("/tmp/conf.json", b"{}").unwrap_err();
    assert!(matches!(
        err,
        Error::Source(SourceError::Unsupported {
            operation: "set",
            ..
        })
    ));
    assert!(source.watch("/tmp/conf.json").is_none());
}
