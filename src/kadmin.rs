//! [`Handle`] interface to an administration backend

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use log::{debug, error};

use crate::{
    backend::{
        Connection, Credentials, Mask, KADM5_MISSING_KRB5_CONF_PARAMS, KADM5_UNK_POLICY,
        KADM5_UNK_PRINC,
    },
    context::Context,
    error::{
        error_code_to_message, kadm5_escape_hatch, lookup_escape_hatch, Error, Operation, Result,
    },
    iter::{EntityIter, EntityKind},
    name::PrincipalName,
    params::Params,
    policy::{Policy, PolicyBuilder, PolicyModifier},
    principal::{Principal, PrincipalBuilder, PrincipalBuilderKey, PrincipalModifier},
};

/// Lock acquired when opening or closing a [`Handle`]
pub static KADMIN_INIT_LOCK: Mutex<()> = Mutex::new(());

/// An open administrative session
///
/// A handle owns its [`Context`] and one backend connection. It serves one operation at a time:
/// it is `Send` but not `Sync`. Open one handle per thread where needed.
///
/// Once [closed][`Handle::close`], every operation fails with [`Error::UseAfterClose`].
pub struct Handle {
    /// Backend context
    pub(crate) context: Context,
    /// Connection to the backend, `None` once closed
    pub(crate) connection: Option<Box<dyn Connection>>,
    realm: Option<String>,
    client: Option<String>,
}

/// Common methods for `Handle` implementations
pub trait KAdminImpl {
    /// Create a principal
    ///
    /// Don't use this method directly. Instead, use a [`PrincipalBuilder`], via
    /// [`Principal::builder`], or [`KAdminImpl::create_principal`]
    #[doc(alias = "addprinc")]
    fn add_principal(&self, builder: &PrincipalBuilder) -> Result<()>;

    /// Create a principal with a password, or a random key when `password` is `None`
    ///
    /// ```no_run
    /// # use kadmin_session::KAdminImpl;
    /// # fn example<K: KAdminImpl>(kadm: &K) {
    /// kadm.create_principal("alice@EXAMPLE.ORG", Some("hunter2"))
    ///     .unwrap();
    /// # }
    /// ```
    #[doc(alias("ank", "create_princ"))]
    fn create_principal(&self, name: &str, password: Option<&str>) -> Result<()> {
        let key = match password {
            Some(password) => PrincipalBuilderKey::Password(password.to_owned()),
            None => PrincipalBuilderKey::RandKey,
        };
        self.add_principal(&PrincipalBuilder::new(name).key(&key))
    }

    /// Modify a principal
    ///
    /// Don't use this method directly. Instead, use a [`PrincipalModifier`], via
    /// [`Principal::modifier`]
    #[doc(alias = "modprinc")]
    fn modify_principal(&self, modifier: &PrincipalModifier) -> Result<()>;

    /// Rename a principal
    #[doc(alias = "renprinc")]
    fn rename_principal(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Delete a principal
    ///
    /// [`Principal::delete`] is also available
    #[doc(alias = "delprinc")]
    fn delete_principal(&self, name: &str) -> Result<()>;

    /// Retrieve a principal
    ///
    /// Fails with [`Error::NotFound`] if the principal does not exist
    #[doc(alias = "getprinc")]
    fn get_principal(&self, name: &str) -> Result<Principal>;

    /// Check if a principal exists
    fn principal_exists(&self, name: &str) -> Result<bool> {
        match self.get_principal(name) {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Change a principal password
    ///
    /// [`Principal::change_password`] is also available
    #[doc(alias = "cpw")]
    fn principal_change_password(&self, name: &str, password: &str) -> Result<()>;

    /// Sets the key of the principal to a random value
    ///
    /// [`Principal::randkey`] is also available
    #[doc(alias = "randkey")]
    fn principal_randkey(&self, name: &str) -> Result<()>;

    /// Add a policy
    ///
    /// Don't use this method directly. Instead, use a [`PolicyBuilder`], via [`Policy::builder`]
    #[doc(alias = "addpol")]
    fn add_policy(&self, builder: &PolicyBuilder) -> Result<()>;

    /// Modify a policy
    ///
    /// Don't use this method directly. Instead, use a [`PolicyModifier`], via [`Policy::modifier`]
    #[doc(alias = "modpol")]
    fn modify_policy(&self, modifier: &PolicyModifier) -> Result<()>;

    /// Delete a policy
    ///
    /// [`Policy::delete`] is also available
    #[doc(alias = "delpol")]
    fn delete_policy(&self, name: &str) -> Result<()>;

    /// Retrieve a policy
    ///
    /// Fails with [`Error::NotFound`] if the policy does not exist
    #[doc(alias = "getpol")]
    fn get_policy(&self, name: &str) -> Result<Policy>;

    /// Check if a policy exists
    fn policy_exists(&self, name: &str) -> Result<bool> {
        match self.get_policy(name) {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl Handle {
    /// Construct a new [`HandleBuilder`]
    pub fn builder(context: Context) -> HandleBuilder {
        HandleBuilder::new(context)
    }

    /// Open a session on `realm` with `credentials`
    pub fn open(context: Context, realm: &str, credentials: Credentials) -> Result<Self> {
        Self::builder(context)
            .params(Params::new().realm(realm))
            .open(credentials)
    }

    /// Realm this session administers, `None` once closed
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Client principal this session authenticated as, if any
    pub fn client(&self) -> Option<&str> {
        self.client.as_deref()
    }

    /// Whether the session is still open
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn connection(&self) -> Result<&dyn Connection> {
        self.connection.as_deref().ok_or(Error::UseAfterClose)
    }

    fn parse_name(&self, name: &str) -> Result<PrincipalName> {
        PrincipalName::parse(name, self.realm.as_deref())
    }

    /// Push pending changes to the backend
    pub fn flush(&self) -> Result<()> {
        kadm5_escape_hatch(Operation::Flush, self.connection()?.flush())
    }

    /// Enumerate principals
    ///
    /// `pattern` is a shell-style glob expression that can contain the wild-card characters `?`,
    /// `*`, and `[]`. All principal names matching the expression are returned. If the expression
    /// does not contain an `@` character, the backend appends an `@` character followed by the
    /// local realm. If no pattern is provided, all principals are returned.
    ///
    /// Nothing is fetched until the first call to [`Iterator::next`]. With `unpack`, each name is
    /// expanded into a [`Principal`].
    ///
    /// ```no_run
    /// # use kadmin_session::Handle;
    /// # fn example(kadm: &Handle) {
    /// for princ in kadm.list_principals(None, false).unwrap() {
    ///     println!("{}", princ.unwrap().name());
    /// }
    /// # }
    /// ```
    #[doc(alias("listprincs", "get_principals", "getprincs", "principals"))]
    pub fn list_principals(&self, pattern: Option<&str>, unpack: bool) -> Result<EntityIter<'_>> {
        self.connection()?;
        Ok(EntityIter::new(self, EntityKind::Principal, pattern, unpack))
    }

    /// Enumerate policies
    ///
    /// `pattern` is a shell-style glob expression that can contain the wild-card characters `?`,
    /// `*`, and `[]`. All policy names matching the expression are returned. If no pattern is
    /// provided, all existing policy names are returned.
    ///
    /// Nothing is fetched until the first call to [`Iterator::next`]. With `unpack`, each name is
    /// expanded into a [`Policy`].
    #[doc(alias("listpols", "get_policies", "getpols", "policies"))]
    pub fn list_policies(&self, pattern: Option<&str>, unpack: bool) -> Result<EntityIter<'_>> {
        self.connection()?;
        Ok(EntityIter::new(self, EntityKind::Policy, pattern, unpack))
    }

    /// Close the session
    ///
    /// The backend connection is flushed and destroyed, then the context is released, then the
    /// session strings are dropped. Failures during teardown are logged and teardown carries on.
    /// Calling this more than once does nothing.
    pub fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let realm = self.realm.take().unwrap_or_default();

        let guard = KADMIN_INIT_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(code) = connection.flush() {
            error!(
                "Failed to flush kadmin session for {realm}: {} (code: {code})",
                error_code_to_message(code)
            );
        }
        if let Err(code) = connection.destroy() {
            error!(
                "Failed to destroy kadmin session for {realm}: {} (code: {code})",
                error_code_to_message(code)
            );
        }
        drop(guard);

        self.context.release();
        self.client = None;
        debug!("Closed kadmin session for {realm}");
    }
}

impl KAdminImpl for Handle {
    fn add_principal(&self, builder: &PrincipalBuilder) -> Result<()> {
        let connection = self.connection()?;
        let entry = builder.make_entry(self.realm.as_deref())?;
        let mut mask = builder.mask | Mask::PRINCIPAL;

        if let Some(policy) = &builder.policy {
            if policy.is_none() {
                mask &= !Mask::POLICY_CLR;
            }
        }

        let password = match &builder.key {
            PrincipalBuilderKey::Password(password) => Some(password.as_str()),
            PrincipalBuilderKey::NoKey => {
                mask |= Mask::KEY_DATA;
                None
            }
            PrincipalBuilderKey::RandKey => None,
        };

        kadm5_escape_hatch(
            Operation::Create,
            connection.create_principal(&entry, mask, password),
        )
    }

    fn modify_principal(&self, modifier: &PrincipalModifier) -> Result<()> {
        let connection = self.connection()?;
        let entry = modifier.make_entry(self.realm.as_deref())?;
        kadm5_escape_hatch(
            Operation::Modify,
            connection.modify_principal(&entry, modifier.mask),
        )
    }

    fn rename_principal(&self, old_name: &str, new_name: &str) -> Result<()> {
        let connection = self.connection()?;
        let old_princ = self.parse_name(old_name)?;
        let new_princ = self.parse_name(new_name)?;
        kadm5_escape_hatch(
            Operation::Rename,
            connection.rename_principal(&old_princ, &new_princ),
        )
    }

    fn delete_principal(&self, name: &str) -> Result<()> {
        let connection = self.connection()?;
        let princ = self.parse_name(name)?;
        kadm5_escape_hatch(Operation::Delete, connection.delete_principal(&princ))
    }

    fn get_principal(&self, name: &str) -> Result<Principal> {
        let connection = self.connection()?;
        let princ = self.parse_name(name)?;
        let entry = lookup_escape_hatch(
            Operation::Get,
            EntityKind::Principal,
            name,
            KADM5_UNK_PRINC,
            connection.get_principal(&princ),
        )?;
        Principal::from_raw(&entry)
    }

    fn principal_change_password(&self, name: &str, password: &str) -> Result<()> {
        let connection = self.connection()?;
        let princ = self.parse_name(name)?;
        kadm5_escape_hatch(
            Operation::ChangePassword,
            connection.chpass_principal(&princ, password),
        )
    }

    fn principal_randkey(&self, name: &str) -> Result<()> {
        let connection = self.connection()?;
        let princ = self.parse_name(name)?;
        kadm5_escape_hatch(Operation::Randkey, connection.randkey_principal(&princ))
    }

    fn add_policy(&self, builder: &PolicyBuilder) -> Result<()> {
        let connection = self.connection()?;
        let entry = builder.make_entry()?;
        let mask = builder.mask | Mask::POLICY;
        kadm5_escape_hatch(
            Operation::CreatePolicy,
            connection.create_policy(&entry, mask),
        )
    }

    fn modify_policy(&self, modifier: &PolicyModifier) -> Result<()> {
        let connection = self.connection()?;
        let entry = modifier.make_entry()?;
        kadm5_escape_hatch(
            Operation::ModifyPolicy,
            connection.modify_policy(&entry, modifier.mask),
        )
    }

    fn delete_policy(&self, name: &str) -> Result<()> {
        let connection = self.connection()?;
        kadm5_escape_hatch(Operation::DeletePolicy, connection.delete_policy(name))
    }

    fn get_policy(&self, name: &str) -> Result<Policy> {
        let connection = self.connection()?;
        let entry = lookup_escape_hatch(
            Operation::GetPolicy,
            EntityKind::Policy,
            name,
            KADM5_UNK_POLICY,
            connection.get_policy(name),
        )?;
        Ok(Policy::from_raw(&entry))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("context", &self.context)
            .field("realm", &self.realm)
            .field("client", &self.client)
            .field("open", &self.is_open())
            .finish()
    }
}

/// [`Handle`] builder
#[derive(Debug)]
pub struct HandleBuilder {
    context: Context,
    params: Params,
}

impl HandleBuilder {
    /// Construct a new [`HandleBuilder`] that will own `context`
    pub fn new(context: Context) -> Self {
        Self {
            context,
            params: Params::default(),
        }
    }

    /// Provide additional [`Params`] to this session
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Open the session with a client name and password
    pub fn with_password(self, client_name: &str, password: &str) -> Result<Handle> {
        self.open(Credentials::Password {
            client: client_name.to_owned(),
            password: password.to_owned(),
        })
    }

    /// Open the session with a client name and keytab
    ///
    /// Both are optional and left to the backend defaults when missing
    pub fn with_keytab(self, client_name: Option<&str>, keytab: Option<&str>) -> Result<Handle> {
        self.open(Credentials::Keytab {
            client: client_name.map(String::from),
            keytab: keytab.map(String::from),
        })
    }

    /// Open the session with a client name and credentials cache
    ///
    /// Both are optional and left to the backend defaults when missing
    pub fn with_ccache(self, client_name: Option<&str>, ccache: Option<&str>) -> Result<Handle> {
        self.open(Credentials::Ccache {
            client: client_name.map(String::from),
            ccache: ccache.map(String::from),
        })
    }

    /// Open a server-side session without authentication
    pub fn with_local(self) -> Result<Handle> {
        self.open(Credentials::Local)
    }

    /// Open the session with arbitrary [`Credentials`]
    ///
    /// The realm is taken from [`Params`] first, then from the [`Context`]. On failure, the
    /// context is released before returning.
    pub fn open(self, credentials: Credentials) -> Result<Handle> {
        if !self.context.is_initialized() {
            return Err(Error::UseAfterClose);
        }

        let realm = self
            .params
            .get_realm()
            .map(String::from)
            .or_else(|| self.context.realm.clone());
        let Some(realm) = realm else {
            return Err(Error::Connection {
                realm: String::new(),
                code: KADM5_MISSING_KRB5_CONF_PARAMS,
                message: error_code_to_message(KADM5_MISSING_KRB5_CONF_PARAMS),
            });
        };

        let _guard = KADMIN_INIT_LOCK.lock().map_err(|_| Error::LockError)?;

        let connection = self
            .context
            .backend
            .connect(&realm, &credentials, &self.params)
            .map_err(|code| Error::Connection {
                realm: realm.clone(),
                code,
                message: error_code_to_message(code),
            })?;

        drop(_guard);

        debug!(
            "Opened kadmin session for {realm} as {:?}",
            credentials.client()
        );
        Ok(Handle {
            context: self.context,
            connection: Some(connection),
            client: credentials.client().map(String::from),
            realm: Some(realm),
        })
    }
}
