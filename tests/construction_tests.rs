use std::io::{self, Read};
use stmtmgr::{ErrorKind, StmtManager, StmtMgrError};

#[tokio::test]
async fn missing_fields_fail_at_each_stage() {
    let err = StmtManager::new(br#"{}"#).await.unwrap_err();
    assert!(matches!(err, StmtMgrError::MissingUser));

    let err = StmtManager::new(br#"{"user":"test"}"#).await.unwrap_err();
    assert!(matches!(err, StmtMgrError::MissingServer));

    let err = StmtManager::new(br#"{"user":"test","server":"test"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, StmtMgrError::MissingDatabase));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn malformed_document_is_a_config_error() {
    let err = StmtManager::new(b"database = test").await.unwrap_err();
    assert!(matches!(err, StmtMgrError::ConfigParse(_)));

    let err = StmtManager::new(br#"{"user":"u","server":"s","database":"d","driver":"db2"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, StmtMgrError::UnsupportedDriver(ref d) if d == "db2"));
}

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader closed"))
    }
}

#[tokio::test]
async fn reader_errors_surface_as_config_read() {
    let err = StmtManager::from_reader(BrokenReader).await.unwrap_err();
    assert!(matches!(err, StmtMgrError::ConfigRead(_)));
}

#[tokio::test]
async fn complete_config_reaches_the_network_stage() {
    // Nothing listens on port 1; validation passes and the ping fails.
    let document = br#"{
        "user": "test",
        "pw": "test",
        "server": "127.0.0.1",
        "database": "test",
        "port": 1,
        "connect_timeout_secs": 1
    }"#;

    let err = StmtManager::from_reader(&document[..]).await.unwrap_err();
    assert!(
        matches!(err, StmtMgrError::Unreachable(_)),
        "expected Unreachable, got {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Connectivity);
}
