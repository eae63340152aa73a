//! Teardown failures are logged and do not stop resource release
use std::sync::{Mutex, Once};

use anyhow::Result;
use kadmin_session::{
    backend::{KADM5_FAILURE, KADM5_RPC_ERROR},
    KAdminImpl, Operation,
};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serial_test::serial;
mod util;
use util::TestRealm;

struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if record.target().starts_with("kadmin_session") {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

/// Install the capturing logger and forget earlier records
fn logger() -> &'static CaptureLogger {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Debug);
    });
    LOGGER.records.lock().unwrap().clear();
    &LOGGER
}

fn errors(logger: &CaptureLogger) -> Vec<String> {
    logger
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, message)| message.clone())
        .collect()
}

#[test]
#[serial]
fn clean_teardown_logs_no_error() -> Result<()> {
    let logger = logger();
    let realm = TestRealm::new()?;
    let mut kadmin = realm.kadmin()?;
    kadmin.close();
    assert!(errors(logger).is_empty());
    Ok(())
}

#[test]
#[serial]
fn destroy_failure_is_logged() -> Result<()> {
    let logger = logger();
    let realm = TestRealm::new()?;
    let backend = realm.backend();
    let mut kadmin = realm.kadmin()?;
    backend.inject_failure(Operation::Destroy, None, KADM5_RPC_ERROR);

    kadmin.close();

    let errors = errors(logger);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("destroy"), "{}", errors[0]);
    assert!(errors[0].contains(&KADM5_RPC_ERROR.to_string()));
    assert_eq!(backend.live_connections(), 0);
    assert_eq!(backend.live_contexts(), 0);
    assert_eq!(backend.released_contexts(), 1);
    Ok(())
}

#[test]
#[serial]
fn flush_failure_is_logged_on_drop() -> Result<()> {
    let logger = logger();
    let realm = TestRealm::new()?;
    let backend = realm.backend();
    {
        let kadmin = realm.kadmin()?;
        kadmin.create_principal("alice", None)?;
        backend.inject_failure(Operation::Flush, None, KADM5_FAILURE);
    }

    let errors = errors(logger);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("flush"), "{}", errors[0]);
    assert_eq!(backend.live_connections(), 0);
    assert_eq!(backend.live_contexts(), 0);
    Ok(())
}

#[test]
#[serial]
fn unpack_failure_is_warned() -> Result<()> {
    let logger = logger();
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    kadmin.create_principal("alice", None)?;
    realm
        .backend()
        .inject_failure(Operation::Get, Some("alice@TEST.LOCAL"), KADM5_RPC_ERROR);

    let failed = kadmin
        .list_principals(Some("alice"), true)?
        .filter(Result::is_err)
        .count();
    assert_eq!(failed, 1);

    let records = logger.records.lock().unwrap();
    assert!(records
        .iter()
        .any(|(level, message)| *level == Level::Warn && message.contains("alice@TEST.LOCAL")));
    Ok(())
}
