//! Test Handle builders
use anyhow::Result;
use kadmin_session::{
    backend::{KADM5_AUTH_INSUFFICIENT, KADM5_BAD_PASSWORD, KADM5_GSS_ERROR, KADM5_RPC_ERROR},
    Context, Credentials, Error, Handle, KAdminImpl, MemoryBackend, Params,
};
mod util;
use util::{TestRealm, REALM};

#[test]
fn with_password() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = Handle::builder(realm.context()?)
        .with_password(&realm.admin_princ(), realm.admin_password())?;
    assert_eq!(kadmin.realm(), Some(REALM));
    assert_eq!(kadmin.client(), Some(realm.admin_princ().as_str()));
    kadmin.list_principals(None, false)?.collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

#[test]
fn with_password_wrong_password() -> Result<()> {
    let realm = TestRealm::new()?;
    let err = Handle::builder(realm.context()?)
        .with_password(&realm.admin_princ(), "not the password")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Connection {
            code: KADM5_BAD_PASSWORD,
            ..
        }
    ));
    assert_eq!(realm.backend().live_contexts(), 0);
    Ok(())
}

#[test]
fn with_password_not_an_admin() -> Result<()> {
    let realm = TestRealm::new()?;
    realm.kadmin()?.create_principal("alice", Some("hunter2"))?;
    let err = Handle::builder(realm.context()?)
        .with_password("alice", "hunter2")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Connection {
            code: KADM5_AUTH_INSUFFICIENT,
            ..
        }
    ));
    Ok(())
}

#[test]
fn with_keytab() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = Handle::builder(realm.context()?)
        .with_keytab(Some(&realm.admin_princ()), Some("FILE:/etc/krb5.keytab"))?;
    kadmin.list_principals(None, false)?.collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

#[test]
fn with_keytab_no_client() -> Result<()> {
    let realm = TestRealm::new()?;
    let err = Handle::builder(realm.context()?)
        .with_keytab(None, None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Connection {
            code: KADM5_GSS_ERROR,
            ..
        }
    ));
    Ok(())
}

#[test]
fn with_ccache() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = Handle::builder(realm.context()?)
        .with_ccache(Some(&realm.admin_princ()), Some("MEMORY:kadmin"))?;
    kadmin.list_principals(None, false)?.collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

#[test]
fn with_local() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = Handle::builder(realm.context()?).with_local()?;
    assert_eq!(kadmin.client(), None);
    kadmin.list_principals(None, false)?.collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

#[test]
fn open_with_realm() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = Handle::open(realm.context()?, REALM, Credentials::Local)?;
    assert_eq!(kadmin.realm(), Some(REALM));
    Ok(())
}

#[test]
fn params_realm_overrides_context() -> Result<()> {
    let backend = MemoryBackend::without_default_realm(REALM);
    let kadmin = Handle::builder(Context::new(backend)?)
        .params(Params::new().realm(REALM))
        .with_local()?;
    assert_eq!(kadmin.realm(), Some(REALM));
    Ok(())
}

#[test]
fn admin_server_mismatch() -> Result<()> {
    let backend = MemoryBackend::new(REALM).with_admin_server("kdc.test.local");
    let context = Context::new(backend.clone())?;
    let err = Handle::builder(context)
        .params(Params::new().admin_server("other.test.local"))
        .with_local()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Connection {
            code: KADM5_RPC_ERROR,
            ..
        }
    ));

    let kadmin = Handle::builder(Context::new(backend)?)
        .params(Params::new().admin_server("kdc.test.local").kadmind_port(749))
        .with_local()?;
    assert!(kadmin.is_open());
    Ok(())
}

#[test]
fn injected_connection_failure() -> Result<()> {
    let realm = TestRealm::new()?;
    let backend = realm.backend();
    backend.fail_connect(KADM5_RPC_ERROR);
    let err = Handle::builder(realm.context()?).with_local().unwrap_err();
    assert!(matches!(err, Error::Connection { ref realm, .. } if realm == REALM));
    assert_eq!(backend.live_contexts(), 0);
    assert_eq!(backend.live_connections(), 0);

    Handle::builder(realm.context()?).with_local()?;
    Ok(())
}

#[test]
fn handle_is_send() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let admin = realm.admin_princ();
    let exists = std::thread::spawn(move || kadmin.principal_exists(&admin))
        .join()
        .map_err(|_| anyhow::anyhow!("thread panicked"))??;
    assert!(exists);
    Ok(())
}
