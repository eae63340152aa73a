//! Boundary to the administration service
//!
//! A [`Backend`] plays the role of the native kadm5 library: it owns the library-wide state
//! created by [`Backend::init_context`] and hands out live [`Connection`]s. Every call returns
//! either its value or a raw, non-zero [`ErrorCode`]. Translating those codes into
//! [`Error`][`crate::Error`]s is the job of the [`Handle`][`crate::Handle`], never of the backend.

use bitflags::bitflags;

use crate::{name::PrincipalName, params::Params};

/// Raw status code returned by a backend
pub type ErrorCode = i64;

/// Seconds since the epoch, `0` meaning "never"
pub type Timestamp = i32;

/// Duration in seconds, `0` meaning "unset"
pub type Deltat = i32;

/// Success
pub const KADM5_OK: ErrorCode = 0;
/// Success, krb5 flavour
pub const KRB5_OK: ErrorCode = 0;

const KADM5_BASE: ErrorCode = 43_787_520;

/// Operation failed for unspecified reason
pub const KADM5_FAILURE: ErrorCode = KADM5_BASE;
/// Operation requires ``get'' privilege
pub const KADM5_AUTH_GET: ErrorCode = KADM5_BASE + 1;
/// Operation requires ``add'' privilege
pub const KADM5_AUTH_ADD: ErrorCode = KADM5_BASE + 2;
/// Operation requires ``modify'' privilege
pub const KADM5_AUTH_MODIFY: ErrorCode = KADM5_BASE + 3;
/// Operation requires ``delete'' privilege
pub const KADM5_AUTH_DELETE: ErrorCode = KADM5_BASE + 4;
/// Insufficient authorization for operation
pub const KADM5_AUTH_INSUFFICIENT: ErrorCode = KADM5_BASE + 5;
/// Database inconsistency detected
pub const KADM5_BAD_DB: ErrorCode = KADM5_BASE + 6;
/// Principal or policy already exists
pub const KADM5_DUP: ErrorCode = KADM5_BASE + 7;
/// Communication failure with server
pub const KADM5_RPC_ERROR: ErrorCode = KADM5_BASE + 8;
/// No administration server found for realm
pub const KADM5_NO_SRV: ErrorCode = KADM5_BASE + 9;
/// Connection to server not initialized
pub const KADM5_NOT_INIT: ErrorCode = KADM5_BASE + 11;
/// Principal does not exist
pub const KADM5_UNK_PRINC: ErrorCode = KADM5_BASE + 12;
/// Policy does not exist
pub const KADM5_UNK_POLICY: ErrorCode = KADM5_BASE + 13;
/// Invalid field mask for operation
pub const KADM5_BAD_MASK: ErrorCode = KADM5_BASE + 14;
/// Invalid number of character classes
pub const KADM5_BAD_CLASS: ErrorCode = KADM5_BASE + 15;
/// Invalid password length
pub const KADM5_BAD_LENGTH: ErrorCode = KADM5_BASE + 16;
/// Illegal policy name
pub const KADM5_BAD_POLICY: ErrorCode = KADM5_BASE + 17;
/// Illegal principal name
pub const KADM5_BAD_PRINCIPAL: ErrorCode = KADM5_BASE + 18;
/// Invalid password history count
pub const KADM5_BAD_HISTORY: ErrorCode = KADM5_BASE + 20;
/// Password minimum life is greater than password maximum life
pub const KADM5_BAD_MIN_PASS_LIFE: ErrorCode = KADM5_BASE + 21;
/// Password is too short
pub const KADM5_PASS_Q_TOOSHORT: ErrorCode = KADM5_BASE + 22;
/// Password does not contain enough character classes
pub const KADM5_PASS_Q_CLASS: ErrorCode = KADM5_BASE + 23;
/// Password is in the password dictionary
pub const KADM5_PASS_Q_DICT: ErrorCode = KADM5_BASE + 24;
/// Cannot reuse password
pub const KADM5_PASS_REUSE: ErrorCode = KADM5_BASE + 25;
/// Current password's minimum life has not expired
pub const KADM5_PASS_TOOSOON: ErrorCode = KADM5_BASE + 26;
/// Policy is in use
pub const KADM5_POLICY_REF: ErrorCode = KADM5_BASE + 27;
/// Connection to server already initialized
pub const KADM5_INIT: ErrorCode = KADM5_BASE + 28;
/// Incorrect password
pub const KADM5_BAD_PASSWORD: ErrorCode = KADM5_BASE + 29;
/// Cannot change protected principal
pub const KADM5_PROTECT_PRINCIPAL: ErrorCode = KADM5_BASE + 30;
/// Programmer error! Bad Admin server handle
pub const KADM5_BAD_SERVER_HANDLE: ErrorCode = KADM5_BASE + 31;
/// Operation requires ``list'' privilege
pub const KADM5_AUTH_LIST: ErrorCode = KADM5_BASE + 44;
/// Operation requires ``change-password'' privilege
pub const KADM5_AUTH_CHANGEPW: ErrorCode = KADM5_BASE + 45;
/// GSS-API (or Kerberos) error
pub const KADM5_GSS_ERROR: ErrorCode = KADM5_BASE + 46;
/// Missing parameters in krb5.conf required for kadmin client
pub const KADM5_MISSING_KRB5_CONF_PARAMS: ErrorCode = KADM5_BASE + 54;

/// Malformed representation of principal
pub const KRB5_PARSE_MALFORMED: ErrorCode = -1_765_328_250;
/// Cannot determine realm for host
pub const KRB5_CONFIG_NODEFREALM: ErrorCode = -1_765_328_160;
/// Cannot allocate memory
pub const ENOMEM: ErrorCode = 12;

bitflags! {
    /// Which fields of a [`PrincipalEntry`] or [`PolicyEntry`] an operation uses
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct Mask: i64 {
        /// Principal name
        const PRINCIPAL = 0x0000_0001;
        /// Principal expiration time
        const PRINC_EXPIRE_TIME = 0x0000_0002;
        /// Password expiration time
        const PW_EXPIRATION = 0x0000_0004;
        /// Last password change
        const LAST_PWD_CHANGE = 0x0000_0008;
        /// Principal attributes
        const ATTRIBUTES = 0x0000_0010;
        /// Maximum ticket life
        const MAX_LIFE = 0x0000_0020;
        /// Modification time
        const MOD_TIME = 0x0000_0040;
        /// Last modifier
        const MOD_NAME = 0x0000_0080;
        /// Key version number
        const KVNO = 0x0000_0100;
        /// Master key version number
        const MKVNO = 0x0000_0200;
        /// Auxiliary attributes
        const AUX_ATTRIBUTES = 0x0000_0400;
        /// Policy reference (or policy name, for policy operations)
        const POLICY = 0x0000_0800;
        /// Clear the policy reference
        const POLICY_CLR = 0x0000_1000;
        /// Maximum renewable ticket life
        const MAX_RLIFE = 0x0000_2000;
        /// Policy: password maximum life
        const PW_MAX_LIFE = 0x0000_4000;
        /// Policy: password minimum life
        const PW_MIN_LIFE = 0x0000_8000;
        /// Policy: password minimum length
        const PW_MIN_LENGTH = 0x0001_0000;
        /// Policy: password minimum character classes
        const PW_MIN_CLASSES = 0x0002_0000;
        /// Policy: password history count
        const PW_HISTORY_NUM = 0x0004_0000;
        /// Policy: reference count
        const REF_COUNT = 0x0008_0000;
        /// Key data. On creation, means "create without keys"
        const KEY_DATA = 0x0010_0000;
        /// Policy: maximum failed authentications
        const PW_MAX_FAILURE = 0x0020_0000;
        /// Policy: failure count reset interval
        const PW_FAILURE_COUNT_INTERVAL = 0x0040_0000;
        /// Policy: lockout duration
        const PW_LOCKOUT_DURATION = 0x0080_0000;
    }
}

/// Raw principal record as exchanged with a backend
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_structs)]
#[allow(missing_docs)]
pub struct PrincipalEntry {
    pub principal: PrincipalName,
    pub princ_expire_time: Timestamp,
    pub last_pwd_change: Timestamp,
    pub pw_expiration: Timestamp,
    pub max_life: Deltat,
    pub mod_name: Option<PrincipalName>,
    pub mod_date: Timestamp,
    pub attributes: i32,
    pub kvno: u32,
    pub mkvno: u32,
    pub policy: Option<String>,
    pub aux_attributes: i64,
    pub max_renewable_life: Deltat,
    pub last_success: Timestamp,
    pub last_failed: Timestamp,
    pub fail_auth_count: u32,
}

impl PrincipalEntry {
    /// An entry with every field unset
    pub fn new(principal: PrincipalName) -> Self {
        Self {
            principal,
            princ_expire_time: 0,
            last_pwd_change: 0,
            pw_expiration: 0,
            max_life: 0,
            mod_name: None,
            mod_date: 0,
            attributes: 0,
            kvno: 0,
            mkvno: 0,
            policy: None,
            aux_attributes: 0,
            max_renewable_life: 0,
            last_success: 0,
            last_failed: 0,
            fail_auth_count: 0,
        }
    }
}

/// Raw policy record as exchanged with a backend
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::exhaustive_structs)]
#[allow(missing_docs)]
pub struct PolicyEntry {
    pub policy: String,
    pub pw_min_life: Deltat,
    pub pw_max_life: Deltat,
    pub pw_min_length: i64,
    pub pw_min_classes: i64,
    pub pw_history_num: i64,
    pub policy_refcnt: i64,
    pub pw_max_fail: u32,
    pub pw_failcnt_interval: Deltat,
    pub pw_lockout_duration: Deltat,
}

/// How a session authenticates against the administration service
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum Credentials {
    /// Client principal and its password
    Password {
        /// Client principal
        client: String,
        /// Client password
        password: String,
    },
    /// Client principal and a keytab holding its keys
    ///
    /// Without a client, the backend picks its default (usually `host/<hostname>`)
    Keytab {
        /// Client principal
        client: Option<String>,
        /// Keytab location
        keytab: Option<String>,
    },
    /// An existing credentials cache
    Ccache {
        /// Client principal
        client: Option<String>,
        /// Credentials cache location
        ccache: Option<String>,
    },
    /// Direct, server-side access without authentication
    Local,
}

impl Credentials {
    /// Client principal these credentials authenticate, if known
    pub fn client(&self) -> Option<&str> {
        match self {
            Self::Password { client, .. } => Some(client),
            Self::Keytab { client, .. } | Self::Ccache { client, .. } => client.as_deref(),
            Self::Local => None,
        }
    }
}

/// Library-level entry point of an administration backend
///
/// Implementations are driven by [`Context`][`crate::Context`]: `init_context` is called once
/// when the context is built and `free_context` exactly once when it is released.
pub trait Backend: Send {
    /// Allocate library state
    fn init_context(&self) -> Result<(), ErrorCode>;

    /// Release library state
    fn free_context(&self);

    /// Realm to use when none is configured
    fn default_realm(&self) -> Option<String>;

    /// Open an administrative channel for `realm`
    fn connect(
        &self,
        realm: &str,
        credentials: &Credentials,
        params: &Params,
    ) -> Result<Box<dyn Connection>, ErrorCode>;
}

/// A live administrative channel
///
/// A connection serves one operation at a time. Name lists returned by `get_principals` and
/// `get_policies` are complete: backends have no server-side cursor.
pub trait Connection: Send {
    /// Create a principal
    ///
    /// Without a password and without [`Mask::KEY_DATA`], the backend generates a random key.
    fn create_principal(
        &self,
        entry: &PrincipalEntry,
        mask: Mask,
        password: Option<&str>,
    ) -> Result<(), ErrorCode>;

    /// Delete a principal
    fn delete_principal(&self, principal: &PrincipalName) -> Result<(), ErrorCode>;

    /// Modify the fields of a principal selected by `mask`
    fn modify_principal(&self, entry: &PrincipalEntry, mask: Mask) -> Result<(), ErrorCode>;

    /// Rename a principal
    fn rename_principal(
        &self,
        source: &PrincipalName,
        target: &PrincipalName,
    ) -> Result<(), ErrorCode>;

    /// Retrieve a principal
    fn get_principal(&self, principal: &PrincipalName) -> Result<PrincipalEntry, ErrorCode>;

    /// Set a principal password
    fn chpass_principal(&self, principal: &PrincipalName, password: &str)
        -> Result<(), ErrorCode>;

    /// Set a principal key to a random value
    fn randkey_principal(&self, principal: &PrincipalName) -> Result<(), ErrorCode>;

    /// All principal names matching a glob expression
    fn get_principals(&self, expression: &str) -> Result<Vec<String>, ErrorCode>;

    /// Create a policy
    fn create_policy(&self, entry: &PolicyEntry, mask: Mask) -> Result<(), ErrorCode>;

    /// Delete a policy
    fn delete_policy(&self, name: &str) -> Result<(), ErrorCode>;

    /// Modify the fields of a policy selected by `mask`
    fn modify_policy(&self, entry: &PolicyEntry, mask: Mask) -> Result<(), ErrorCode>;

    /// Retrieve a policy
    fn get_policy(&self, name: &str) -> Result<PolicyEntry, ErrorCode>;

    /// All policy names matching a glob expression
    fn get_policies(&self, expression: &str) -> Result<Vec<String>, ErrorCode>;

    /// Push pending changes
    fn flush(&self) -> Result<(), ErrorCode>;

    /// Tear the channel down
    fn destroy(self: Box<Self>) -> Result<(), ErrorCode>;
}
