//! [`Error`] type for various errors this library can encounter

use strum::{Display, IntoStaticStr};

use crate::{
    backend::{self, ErrorCode, KADM5_OK},
    iter::EntityKind,
};

/// Administrative operation that failed
///
/// Displays as the operation name, e.g. `create` or `list_policies`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[allow(clippy::exhaustive_enums)]
pub enum Operation {
    /// Principal creation
    Create,
    /// Principal deletion
    Delete,
    /// Principal lookup
    Get,
    /// Principal modification
    Modify,
    /// Principal rename
    Rename,
    /// Principal password change
    ChangePassword,
    /// Principal random key
    Randkey,
    /// Principal enumeration
    List,
    /// Policy creation
    CreatePolicy,
    /// Policy deletion
    DeletePolicy,
    /// Policy lookup
    GetPolicy,
    /// Policy modification
    ModifyPolicy,
    /// Policy enumeration
    ListPolicies,
    /// Flushing pending changes
    Flush,
    /// Connection teardown
    Destroy,
}

/// Errors this library can encounter
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Backend state could not be allocated
    #[error("Failed to initialize context: {message} (code: {code})")]
    Initialization {
        /// Backend error code
        code: ErrorCode,
        /// Backend error message
        message: String,
    },

    /// The administration service refused or failed the connection
    #[error("Failed to connect to the admin server for {realm}: {message} (code: {code})")]
    Connection {
        /// Realm the connection was attempted for
        realm: String,
        /// Backend error code
        code: ErrorCode,
        /// Backend error message
        message: String,
    },

    /// A principal name is malformed
    #[error("Failed to parse principal name {name:?}: {reason} (code: {code})")]
    NameParse {
        /// Name as provided
        name: String,
        /// krb5 error code
        code: ErrorCode,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The backend rejected an operation
    #[error("KAdmin {op} error: {message} (code: {code})")]
    AdminOperation {
        /// Failed operation
        op: Operation,
        /// kadm5 error code
        code: ErrorCode,
        /// kadm5 error message
        message: String,
    },

    /// A looked up entity does not exist
    #[error("{kind} {name} does not exist")]
    NotFound {
        /// Kind of the missing entity
        kind: EntityKind,
        /// Name as looked up
        name: String,
    },

    /// The handle or iterator was already closed
    #[error("Not connected: the handle or iterator has been closed")]
    UseAfterClose,

    /// Failed to acquire [`crate::kadmin::KADMIN_INIT_LOCK`] or
    /// [`crate::context::CONTEXT_INIT_LOCK`]
    #[error("Failed to acquire the kadmin initialisation lock")]
    LockError,

    /// Failed to convert a [`Timestamp`][`backend::Timestamp`] to a [`chrono::DateTime`]
    #[error("Failed to convert krb5 timestamp to chrono DateTime")]
    TimestampConversion,
    /// Failed to convert a [`chrono::DateTime`] to a [`Timestamp`][`backend::Timestamp`]
    #[error("Failed to convert chrono DateTime to krb5 timestamp")]
    DateTimeConversion(std::num::TryFromIntError),
    /// Failed to convert a [`Duration`][`std::time::Duration`] to a
    /// [`Deltat`][`backend::Deltat`]
    #[error("Failed to convert Duration to a krb5 deltat")]
    DurationConversion(std::num::TryFromIntError),
}

/// Helper type for errors sent from this library
pub type Result<T> = std::result::Result<T, Error>;

/// Human readable message for a backend error code
pub fn error_code_to_message(code: ErrorCode) -> String {
    match code {
        KADM5_OK => "No error",
        backend::KADM5_FAILURE => "Operation failed for unspecified reason",
        backend::KADM5_AUTH_GET => "Operation requires ``get'' privilege",
        backend::KADM5_AUTH_ADD => "Operation requires ``add'' privilege",
        backend::KADM5_AUTH_MODIFY => "Operation requires ``modify'' privilege",
        backend::KADM5_AUTH_DELETE => "Operation requires ``delete'' privilege",
        backend::KADM5_AUTH_INSUFFICIENT => "Insufficient authorization for operation",
        backend::KADM5_BAD_DB => "Database inconsistency detected",
        backend::KADM5_DUP => "Principal or policy already exists",
        backend::KADM5_RPC_ERROR => "Communication failure with server",
        backend::KADM5_NO_SRV => "No administration server found for realm",
        backend::KADM5_NOT_INIT => "Connection to server not initialized",
        backend::KADM5_UNK_PRINC => "Principal does not exist",
        backend::KADM5_UNK_POLICY => "Policy does not exist",
        backend::KADM5_BAD_MASK => "Invalid field mask for operation",
        backend::KADM5_BAD_CLASS => "Invalid number of character classes",
        backend::KADM5_BAD_LENGTH => "Invalid password length",
        backend::KADM5_BAD_POLICY => "Illegal policy name",
        backend::KADM5_BAD_PRINCIPAL => "Illegal principal name",
        backend::KADM5_BAD_HISTORY => "Invalid password history count",
        backend::KADM5_BAD_MIN_PASS_LIFE => {
            "Password minimum life is greater then password maximum life"
        }
        backend::KADM5_PASS_Q_TOOSHORT => "Password is too short",
        backend::KADM5_PASS_Q_CLASS => "Password does not contain enough character classes",
        backend::KADM5_PASS_Q_DICT => "Password is in the password dictionary",
        backend::KADM5_PASS_REUSE => "Cannot reuse password",
        backend::KADM5_PASS_TOOSOON => "Current password's minimum life has not expired",
        backend::KADM5_POLICY_REF => "Policy is in use",
        backend::KADM5_INIT => "Connection to server already initialized",
        backend::KADM5_BAD_PASSWORD => "Incorrect password",
        backend::KADM5_PROTECT_PRINCIPAL => "Cannot change protected principal",
        backend::KADM5_BAD_SERVER_HANDLE => "Programmer error! Bad Admin server handle",
        backend::KADM5_AUTH_LIST => "Operation requires ``list'' privilege",
        backend::KADM5_AUTH_CHANGEPW => "Operation requires ``change-password'' privilege",
        backend::KADM5_GSS_ERROR => "GSS-API (or Kerberos) error",
        backend::KADM5_MISSING_KRB5_CONF_PARAMS => {
            "Missing parameters in krb5.conf required for kadmin client"
        }
        backend::KRB5_PARSE_MALFORMED => "Malformed representation of principal",
        backend::KRB5_CONFIG_NODEFREALM => "Cannot determine realm for host",
        backend::ENOMEM => "Cannot allocate memory",
        code => return format!("Unknown code {code}"),
    }
    .to_owned()
}

/// Helper function to "raise" an error from a failed backend call
pub(crate) fn kadm5_escape_hatch<T>(
    op: Operation,
    result: std::result::Result<T, ErrorCode>,
) -> Result<T> {
    result.map_err(|code| Error::AdminOperation {
        op,
        code,
        message: error_code_to_message(code),
    })
}

/// Same as [`kadm5_escape_hatch`], except that `not_found_code` becomes [`Error::NotFound`]
pub(crate) fn lookup_escape_hatch<T>(
    op: Operation,
    kind: EntityKind,
    name: &str,
    not_found_code: ErrorCode,
    result: std::result::Result<T, ErrorCode>,
) -> Result<T> {
    match result {
        Err(code) if code == not_found_code => Err(Error::NotFound {
            kind,
            name: name.to_owned(),
        }),
        result => kadm5_escape_hatch(op, result),
    }
}
