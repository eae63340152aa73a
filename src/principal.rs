//! kadm5 principal

use std::time::Duration;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use getset::CopyGetters;

use crate::{
    backend::{Mask, PrincipalEntry},
    conv::{delta_to_dur, dt_to_ts, dur_to_delta, ts_to_dt},
    error::Result,
    kadmin::KAdminImpl,
    name::PrincipalName,
};

bitflags! {
    /// Attributes set on a principal
    ///
    /// See `man kadmin(1)`, under the `add_principal` section for an explanation
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct PrincipalAttributes: i32 {
        /// Prohibits the principal from obtaining postdated tickets
        const DisallowPostdated = 0x0000_0001;
        /// Prohibits the principal from obtaining forwardable tickets
        const DisallowForwardable = 0x0000_0002;
        /// Specifies that a Ticket-Granting Service (TGS) request for a service ticket for the principal is not permitted
        const DisallowTgtBased = 0x0000_0004;
        /// Prohibits the principal from obtaining renewable tickets
        const DisallowRenewable = 0x0000_0008;
        /// Prohibits the principal from obtaining proxiable tickets
        const DisallowProxiable = 0x0000_0010;
        /// Disables user-to-user authentication for the principal by prohibiting this principal from obtaining a session key for another user
        const DisallowDupSkey = 0x0000_0020;
        /// Forbids the issuance of any tickets for the principal
        const DisallowAllTix = 0x0000_0040;
        /// Requires the principal to preauthenticate before being allowed to kinit
        const RequiresPreAuth = 0x0000_0080;
        /// Requires the principal to preauthenticate using a hardware device before being allowed to kinit
        const RequiresHwAuth = 0x0000_0100;
        /// Force a password change
        const RequiresPwChange = 0x0000_0200;
        /// Prohibits the issuance of service tickets for the principal
        const DisallowSvr = 0x0000_1000;
        /// Marks the principal as a password change service principal
        const PwChangeService = 0x0000_2000;
        /// An AS_REQ for a principal with this bit set and an encrytion type of ENCTYPE_DES_CBC_CRC causes the encryption type ENCTYPE_DES_CBC_MD5 to be used instead
        const SupportDesMd5 = 0x0000_4000;
        /// Allow kadmin administrators with `add` acls to modify the principal until this bit is cleared
        const NewPrinc = 0x0000_8000;
        /// Sets the OK-AS-DELEGATE flag on tickets issued for use with the principal as the service, which clients may use as a hint that credentials can and should be delegated when authenticating to the service
        const OkAsDelegate = 0x0010_0000;
        /// Sets the service to allow the use of S4U2Self
        const OkToAuthAsDelegate = 0x0020_0000;
        /// Prevents PAC or AD-SIGNEDPATH data from being added to service tickets for the principal
        const NoAuthDataRequired = 0x0040_0000;
        /// Prevents keys for the principal from being extracted or set to a known value by the kadmin protocol
        const LockdownKeys = 0x0080_0000;

        const _ = !0;
    }
}

/// A kadm5 principal
///
/// This is a snapshot taken at lookup time. Use [`KAdminImpl::get_principal`] again to observe
/// later changes.
#[derive(Clone, Debug, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Principal {
    /// The principal name
    #[getset(skip)]
    name: String,
    /// When the principal expires
    expire_time: Option<DateTime<Utc>>,
    /// When the password was last changed
    last_password_change: Option<DateTime<Utc>>,
    /// When the password expires
    password_expiration: Option<DateTime<Utc>>,
    /// Maximum ticket life
    max_life: Option<Duration>,
    /// Last principal to modify this principal
    #[getset(skip)]
    modified_by: Option<String>,
    /// When the principal was last modified
    modified_at: Option<DateTime<Utc>>,
    /// See [`PrincipalAttributes`]
    attributes: PrincipalAttributes,
    /// Current key version number
    kvno: u32,
    /// Master key version number
    mkvno: u32,
    /// Associated policy
    #[getset(skip)]
    policy: Option<String>,
    /// Extra attributes
    aux_attributes: i64,
    /// Maximum renewable ticket life
    max_renewable_life: Option<Duration>,
    /// When the last successful authentication occurred
    last_success: Option<DateTime<Utc>>,
    /// When the last failed authentication occurred
    last_failed: Option<DateTime<Utc>>,
    /// Number of failed authentication attempts
    fail_auth_count: u32,
}

impl Principal {
    /// Create a [`Principal`] from a [`PrincipalEntry`]
    pub(crate) fn from_raw(entry: &PrincipalEntry) -> Result<Self> {
        Ok(Self {
            name: entry.principal.to_string(),
            expire_time: ts_to_dt(entry.princ_expire_time)?,
            last_password_change: ts_to_dt(entry.last_pwd_change)?,
            password_expiration: ts_to_dt(entry.pw_expiration)?,
            max_life: delta_to_dur(entry.max_life),
            modified_by: entry.mod_name.as_ref().map(PrincipalName::to_string),
            modified_at: ts_to_dt(entry.mod_date)?,
            attributes: PrincipalAttributes::from_bits_retain(entry.attributes),
            kvno: entry.kvno,
            mkvno: entry.mkvno,
            policy: entry.policy.clone(),
            aux_attributes: entry.aux_attributes,
            max_renewable_life: delta_to_dur(entry.max_renewable_life),
            last_success: ts_to_dt(entry.last_success)?,
            last_failed: ts_to_dt(entry.last_failed)?,
            fail_auth_count: entry.fail_auth_count,
        })
    }

    /// Canonical name of the principal
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last principal to modify this principal
    pub fn modified_by(&self) -> Option<&str> {
        self.modified_by.as_deref()
    }

    /// Associated policy
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// Construct a new [`PrincipalBuilder`] for a principal with `name`
    ///
    /// ```no_run
    /// # use kadmin_session::{KAdminImpl, Principal, PrincipalBuilderKey};
    /// # fn example<K: KAdminImpl>(kadmin: &K) {
    /// let princ = Principal::builder("user@EXAMPLE.ORG")
    ///     .key(&PrincipalBuilderKey::Password("hunter2".to_owned()))
    ///     .create(kadmin)
    ///     .unwrap();
    /// assert_eq!(princ.kvno(), 1);
    /// # }
    /// ```
    pub fn builder(name: &str) -> PrincipalBuilder {
        PrincipalBuilder::new(name)
    }

    /// Construct a new [`PrincipalModifier`] from this principal
    pub fn modifier(&self) -> PrincipalModifier {
        PrincipalModifier::from_principal(self)
    }

    /// Delete this principal
    ///
    /// The [`Principal`] object is not consumed by this method, but after deletion, it shouldn't be
    /// used for modifying, as the principal may not exist anymore
    pub fn delete<K: KAdminImpl>(&self, kadmin: &K) -> Result<()> {
        kadmin.delete_principal(&self.name)
    }

    /// Change the password of the principal
    pub fn change_password<K: KAdminImpl>(&self, kadmin: &K, password: &str) -> Result<()> {
        kadmin.principal_change_password(&self.name, password)
    }

    /// Set the key of the principal to a random value
    pub fn randkey<K: KAdminImpl>(&self, kadmin: &K) -> Result<()> {
        kadmin.principal_randkey(&self.name)
    }
}

macro_rules! principal_doer_struct {
    (
        $(#[$outer:meta])*
        $StructName:ident { $($manual_fields:tt)* }
    ) => {
        $(#[$outer])*
        pub struct $StructName {
            pub(crate) name: String,
            pub(crate) mask: Mask,
            pub(crate) expire_time: Option<Option<DateTime<Utc>>>,
            pub(crate) password_expiration: Option<Option<DateTime<Utc>>>,
            pub(crate) max_life: Option<Option<Duration>>,
            pub(crate) attributes: Option<PrincipalAttributes>,
            pub(crate) policy: Option<Option<String>>,
            pub(crate) aux_attributes: Option<i64>,
            pub(crate) max_renewable_life: Option<Option<Duration>>,
            $($manual_fields)*
        }
    }
}

macro_rules! principal_doer_impl {
    () => {
        /// Set when the principal expires
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn expire_time(mut self, expire_time: Option<DateTime<Utc>>) -> Self {
            self.expire_time = Some(expire_time);
            self.mask |= Mask::PRINC_EXPIRE_TIME;
            self
        }

        /// Set the password expiration time
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn password_expiration(mut self, password_expiration: Option<DateTime<Utc>>) -> Self {
            self.password_expiration = Some(password_expiration);
            self.mask |= Mask::PW_EXPIRATION;
            self
        }

        /// Set the maximum ticket life
        pub fn max_life(mut self, max_life: Option<Duration>) -> Self {
            self.max_life = Some(max_life);
            self.mask |= Mask::MAX_LIFE;
            self
        }

        /// Set the principal attributes
        ///
        /// Note that this completely overrides existing attributes. Make sure to re-use the old
        /// ones if needed
        pub fn attributes(mut self, attributes: PrincipalAttributes) -> Self {
            self.attributes = Some(attributes);
            self.mask |= Mask::ATTRIBUTES;
            self
        }

        /// Set the principal policy
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn policy(mut self, policy: Option<&str>) -> Self {
            let (flag, nflag) = if policy.is_some() {
                (Mask::POLICY, Mask::POLICY_CLR)
            } else {
                (Mask::POLICY_CLR, Mask::POLICY)
            };
            self.policy = Some(policy.map(String::from));
            self.mask |= flag;
            self.mask &= !nflag;
            self
        }

        /// Set auxiliary attributes
        pub fn aux_attributes(mut self, aux_attributes: i64) -> Self {
            self.aux_attributes = Some(aux_attributes);
            self.mask |= Mask::AUX_ATTRIBUTES;
            self
        }

        /// Set the maximum renewable ticket life
        pub fn max_renewable_life(mut self, max_renewable_life: Option<Duration>) -> Self {
            self.max_renewable_life = Some(max_renewable_life);
            self.mask |= Mask::MAX_RLIFE;
            self
        }

        /// Create a [`PrincipalEntry`] from this builder
        ///
        /// The name is parsed last, with `default_realm` filling a missing realm
        pub(crate) fn make_entry(&self, default_realm: Option<&str>) -> Result<PrincipalEntry> {
            let principal = PrincipalName::parse(&self.name, default_realm)?;
            let mut entry = PrincipalEntry::new(principal);

            if let Some(expire_time) = self.expire_time {
                entry.princ_expire_time = dt_to_ts(expire_time)?;
            }
            if let Some(password_expiration) = self.password_expiration {
                entry.pw_expiration = dt_to_ts(password_expiration)?;
            }
            if let Some(max_life) = self.max_life {
                entry.max_life = dur_to_delta(max_life)?;
            }
            if let Some(attributes) = self.attributes {
                entry.attributes = attributes.bits();
            }
            if let Some(policy) = &self.policy {
                entry.policy = policy.clone();
            }
            if let Some(aux_attributes) = self.aux_attributes {
                entry.aux_attributes = aux_attributes;
            }
            if let Some(max_renewable_life) = self.max_renewable_life {
                entry.max_renewable_life = dur_to_delta(max_renewable_life)?;
            }

            Ok(entry)
        }
    };
}

principal_doer_struct!(
    /// Utility to create a principal
    ///
    /// Fields that are not set are left to the backend defaults.
    #[derive(Clone, Debug, Default)]
    PrincipalBuilder {
        pub(crate) key: PrincipalBuilderKey,
    }
);

impl PrincipalBuilder {
    principal_doer_impl!();

    /// Construct a new [`PrincipalBuilder`] for a principal with `name`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Set the name of the principal
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// How the principal key should be set
    ///
    /// See [`PrincipalBuilderKey`] for the default value
    pub fn key(mut self, key: &PrincipalBuilderKey) -> Self {
        self.key = key.clone();
        self
    }

    /// Create the principal and return a fresh snapshot of it
    pub fn create<K: KAdminImpl>(&self, kadmin: &K) -> Result<Principal> {
        kadmin.add_principal(self)?;
        kadmin.get_principal(&self.name)
    }
}

principal_doer_struct!(
    /// Utility to modify a principal
    ///
    /// Only the fields that were set are sent to the backend.
    #[derive(Clone, Debug, Default)]
    PrincipalModifier {}
);

impl PrincipalModifier {
    principal_doer_impl!();

    /// Construct a new [`PrincipalModifier`] from a [`Principal`]
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            name: principal.name.to_owned(),
            ..Default::default()
        }
    }

    /// Modify the principal and return a fresh snapshot of it
    pub fn modify<K: KAdminImpl>(&self, kadmin: &K) -> Result<Principal> {
        kadmin.modify_principal(self)?;
        kadmin.get_principal(&self.name)
    }
}

/// How the principal key should be set
///
/// The default is [`Self::RandKey`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum PrincipalBuilderKey {
    /// Provide a password to use
    Password(String),
    /// No key should be set on the principal
    NoKey,
    /// A random key should be generated for the principal by the backend
    #[default]
    RandKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_mask() {
        let builder = PrincipalBuilder::new("alice")
            .max_life(Some(Duration::from_secs(3600)))
            .attributes(PrincipalAttributes::RequiresPreAuth);
        assert_eq!(builder.mask, Mask::MAX_LIFE | Mask::ATTRIBUTES);
    }

    #[test]
    fn policy_flags_are_exclusive() {
        let builder = PrincipalBuilder::new("alice").policy(Some("strict"));
        assert!(builder.mask.contains(Mask::POLICY));
        let builder = builder.policy(None);
        assert!(builder.mask.contains(Mask::POLICY_CLR));
        assert!(!builder.mask.contains(Mask::POLICY));
    }

    #[test]
    fn make_entry() -> Result<()> {
        let entry = PrincipalBuilder::new("alice")
            .max_life(Some(Duration::from_secs(3600)))
            .policy(Some("strict"))
            .make_entry(Some("TEST.LOCAL"))?;
        assert_eq!(entry.principal.to_string(), "alice@TEST.LOCAL");
        assert_eq!(entry.max_life, 3600);
        assert_eq!(entry.policy.as_deref(), Some("strict"));
        assert_eq!(entry.princ_expire_time, 0);
        Ok(())
    }

    #[test]
    fn from_raw() -> Result<()> {
        let mut entry = PrincipalEntry::new("alice@TEST.LOCAL".parse()?);
        entry.kvno = 3;
        entry.max_life = 600;
        entry.attributes = PrincipalAttributes::DisallowAllTix.bits();
        entry.mod_name = Some("root/admin@TEST.LOCAL".parse()?);
        let principal = Principal::from_raw(&entry)?;
        assert_eq!(principal.name(), "alice@TEST.LOCAL");
        assert_eq!(principal.kvno(), 3);
        assert_eq!(principal.max_life(), Some(Duration::from_secs(600)));
        assert_eq!(principal.expire_time(), None);
        assert_eq!(principal.modified_by(), Some("root/admin@TEST.LOCAL"));
        assert_eq!(principal.attributes(), PrincipalAttributes::DisallowAllTix);
        assert_eq!(principal.policy(), None);
        Ok(())
    }
}
