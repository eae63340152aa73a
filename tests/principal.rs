//! Test principals
use std::time::Duration;

use anyhow::Result;
use kadmin_session::{
    backend::{KADM5_DUP, KADM5_UNK_POLICY, KADM5_UNK_PRINC, KRB5_PARSE_MALFORMED},
    EntityKind, Error, KAdminImpl, Operation, Principal, PrincipalAttributes,
    PrincipalBuilderKey,
};
mod util;
use util::{random_string, TestRealm, REALM};

#[test]
fn create_get_delete() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    kadmin.create_principal("alice@TEST.LOCAL", Some("hunter2"))?;
    let princ = kadmin.get_principal("alice@TEST.LOCAL")?;
    assert_eq!(princ.name(), "alice@TEST.LOCAL");
    kadmin.delete_principal("alice@TEST.LOCAL")?;
    let err = kadmin.get_principal("alice@TEST.LOCAL").unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: EntityKind::Principal,
            ref name,
        } if name == "alice@TEST.LOCAL"
    ));
    Ok(())
}

#[test]
fn name_is_canonicalized() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    for name in ["carol", "host/db.test.local", "svc\\/x"] {
        kadmin.create_principal(name, None)?;
        let princ = kadmin.get_principal(name)?;
        assert_eq!(princ.name(), format!("{name}@{REALM}"));
    }
    Ok(())
}

#[test]
fn delete_missing_leaves_others() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let name = random_string(16);
    kadmin.create_principal(&name, Some("hunter2"))?;
    let before = kadmin.get_principal(&name)?;

    let err = kadmin.delete_principal("nobody").unwrap_err();
    assert!(matches!(
        err,
        Error::AdminOperation {
            op: Operation::Delete,
            code: KADM5_UNK_PRINC,
            ..
        }
    ));

    let after = kadmin.get_principal(&name)?;
    assert_eq!(after.kvno(), before.kvno());
    assert_eq!(after.modified_at(), before.modified_at());
    assert!(kadmin.principal_exists(&realm.admin_princ())?);
    Ok(())
}

#[test]
fn create_twice() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let name = random_string(16);
    kadmin.create_principal(&name, None)?;
    let err = kadmin.create_principal(&name, None).unwrap_err();
    assert!(matches!(
        err,
        Error::AdminOperation {
            op: Operation::Create,
            code: KADM5_DUP,
            ..
        }
    ));
    Ok(())
}

#[test]
fn create_malformed_name() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    for name in ["", "alice@", "alice@A@B", "/admin", "alice\\"] {
        let err = kadmin.create_principal(name, None).unwrap_err();
        assert!(
            matches!(
                err,
                Error::NameParse {
                    code: KRB5_PARSE_MALFORMED,
                    ..
                }
            ),
            "{name:?}: {err}"
        );
    }
    Ok(())
}

#[test]
fn builder_fields() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let princ = Principal::builder(&random_string(16))
        .max_life(Some(Duration::from_secs(3600)))
        .attributes(PrincipalAttributes::RequiresPreAuth)
        .create(&kadmin)?;
    assert_eq!(princ.max_life(), Some(Duration::from_secs(3600)));
    assert_eq!(princ.attributes(), PrincipalAttributes::RequiresPreAuth);
    assert_eq!(princ.kvno(), 1);
    assert_eq!(princ.modified_by(), Some(realm.admin_princ().as_str()));
    assert!(princ.last_password_change().is_some());
    Ok(())
}

#[test]
fn builder_without_key() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let princ = Principal::builder(&random_string(16))
        .key(&PrincipalBuilderKey::NoKey)
        .create(&kadmin)?;
    assert_eq!(princ.kvno(), 0);
    princ.randkey(&kadmin)?;
    assert_eq!(kadmin.get_principal(princ.name())?.kvno(), 1);
    Ok(())
}

#[test]
fn builder_unknown_policy() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let name = random_string(16);
    let err = Principal::builder(&name)
        .policy(Some("nope"))
        .create(&kadmin)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::AdminOperation {
            code: KADM5_UNK_POLICY,
            ..
        }
    ));
    assert!(!kadmin.principal_exists(&name)?);
    Ok(())
}

#[test]
fn modify_principal() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let princ = Principal::builder(&random_string(16)).create(&kadmin)?;
    let princ = princ
        .modifier()
        .attributes(princ.attributes() | PrincipalAttributes::DisallowAllTix)
        .max_renewable_life(Some(Duration::from_secs(86_400)))
        .modify(&kadmin)?;
    assert!(princ.attributes().contains(PrincipalAttributes::DisallowAllTix));
    assert_eq!(
        princ.max_renewable_life(),
        Some(Duration::from_secs(86_400))
    );
    Ok(())
}

#[test]
fn rename_principal() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let old = random_string(16);
    let new = random_string(16);
    kadmin.create_principal(&old, Some("hunter2"))?;
    kadmin.rename_principal(&old, &new)?;
    assert!(!kadmin.principal_exists(&old)?);
    assert_eq!(kadmin.get_principal(&new)?.name(), format!("{new}@{REALM}"));

    let err = kadmin.rename_principal(&old, &new).unwrap_err();
    assert!(matches!(
        err,
        Error::AdminOperation {
            op: Operation::Rename,
            code: KADM5_UNK_PRINC,
            ..
        }
    ));
    Ok(())
}

#[test]
fn change_password_and_randkey() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let name = random_string(16);
    let princ = Principal::builder(&name)
        .key(&PrincipalBuilderKey::Password("hunter2".to_owned()))
        .create(&kadmin)?;
    assert_eq!(princ.kvno(), 1);
    princ.change_password(&kadmin, "hunter3")?;
    assert_eq!(kadmin.get_principal(&name)?.kvno(), 2);
    kadmin.principal_randkey(&name)?;
    assert_eq!(kadmin.get_principal(&name)?.kvno(), 3);

    let err = kadmin
        .principal_change_password("nobody", "hunter2")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::AdminOperation {
            op: Operation::ChangePassword,
            ..
        }
    ));
    Ok(())
}

#[test]
fn delete_via_principal() -> Result<()> {
    let realm = TestRealm::new()?;
    let kadmin = realm.kadmin()?;
    let princ = Principal::builder(&random_string(16)).create(&kadmin)?;
    assert!(kadmin.principal_exists(princ.name())?);
    princ.delete(&kadmin)?;
    assert!(!kadmin.principal_exists(princ.name())?);
    Ok(())
}
