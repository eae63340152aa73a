//! kadm5 policy

use std::time::Duration;

use getset::CopyGetters;

use crate::{
    backend::{Mask, PolicyEntry},
    conv::{delta_to_dur, dur_to_delta},
    error::Result,
    kadmin::KAdminImpl,
};

/// A kadm5 policy
///
/// Policies are named sets of password-quality constraints that principals can reference.
#[derive(Clone, Debug, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Policy {
    /// The policy name
    #[getset(skip)]
    name: String,
    /// Minimum lifetime of a password
    password_min_life: Option<Duration>,
    /// Maximum lifetime of a password
    password_max_life: Option<Duration>,
    /// Minimum length of a password
    password_min_length: i64,
    /// Minimum number of character classes required in a password. The five character classes
    /// are lower case, upper case, numbers, punctuation, and whitespace/unprintable characters
    password_min_classes: i64,
    /// Number of past keys kept for a principal. May not be filled if used with other database
    /// modules such as the MIT krb5 LDAP KDC database module
    password_history_num: i64,
    /// How many principals use this policy
    policy_refcnt: i64,
    /// Number of authentication failures before the principal is locked. Authentication failures
    /// are only tracked for principals which require preauthentication. The counter of failed
    /// attempts resets to 0 after a successful attempt to authenticate. A value of 0 disables
    /// lock‐out
    password_max_fail: u32,
    /// Allowable time between authentication failures. If an authentication failure happens after
    /// this duration has elapsed since the previous failure, the number of authentication failures
    /// is reset to 1. `None` means forever
    password_failcount_interval: Option<Duration>,
    /// Duration for which the principal is locked from authenticating if too many authentication
    /// failures occur without the specified failure count interval elapsing. `None` means the
    /// principal remains locked out until it is administratively unlocked
    password_lockout_duration: Option<Duration>,
}

impl Policy {
    /// Create a [`Policy`] from a [`PolicyEntry`]
    pub(crate) fn from_raw(entry: &PolicyEntry) -> Self {
        Self {
            name: entry.policy.clone(),
            password_min_life: delta_to_dur(entry.pw_min_life),
            password_max_life: delta_to_dur(entry.pw_max_life),
            password_min_length: entry.pw_min_length,
            password_min_classes: entry.pw_min_classes,
            password_history_num: entry.pw_history_num,
            policy_refcnt: entry.policy_refcnt,
            password_max_fail: entry.pw_max_fail,
            password_failcount_interval: delta_to_dur(entry.pw_failcnt_interval),
            password_lockout_duration: delta_to_dur(entry.pw_lockout_duration),
        }
    }

    /// Name of the policy
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct a new [`PolicyBuilder`] for a policy with `name`
    ///
    /// ```no_run
    /// # use kadmin_session::{KAdminImpl, Policy};
    /// # fn example<K: KAdminImpl>(kadmin: &K) {
    /// let policy = Policy::builder("strict")
    ///     .password_min_length(12)
    ///     .create(kadmin)
    ///     .unwrap();
    /// assert_eq!(policy.password_min_length(), 12);
    /// # }
    /// ```
    pub fn builder(name: &str) -> PolicyBuilder {
        PolicyBuilder::new(name)
    }

    /// Construct a new [`PolicyModifier`] from this policy
    pub fn modifier(&self) -> PolicyModifier {
        PolicyModifier::from_policy(self)
    }

    /// Delete this policy
    ///
    /// The [`Policy`] object is not consumed by this method, but after deletion, it shouldn't be
    /// used for modifying, as the policy may not exist anymore
    pub fn delete<K: KAdminImpl>(&self, kadmin: &K) -> Result<()> {
        kadmin.delete_policy(&self.name)
    }
}

macro_rules! policy_doer_struct {
    (
        $(#[$outer:meta])*
        $StructName:ident { $($manual_fields:tt)* }
    ) => {
        $(#[$outer])*
        pub struct $StructName {
            pub(crate) name: String,
            pub(crate) mask: Mask,
            pub(crate) password_min_life: Option<Option<Duration>>,
            pub(crate) password_max_life: Option<Option<Duration>>,
            pub(crate) password_min_length: Option<i64>,
            pub(crate) password_min_classes: Option<i64>,
            pub(crate) password_history_num: Option<i64>,
            pub(crate) password_max_fail: Option<u32>,
            pub(crate) password_failcount_interval: Option<Option<Duration>>,
            pub(crate) password_lockout_duration: Option<Option<Duration>>,
            $($manual_fields)*
        }
    }
}

macro_rules! policy_doer_impl {
    () => {
        /// Set the minimum lifetime of a password
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn password_min_life(mut self, password_min_life: Option<Duration>) -> Self {
            self.password_min_life = Some(password_min_life);
            self.mask |= Mask::PW_MIN_LIFE;
            self
        }

        /// Set the maximum lifetime of a password
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn password_max_life(mut self, password_max_life: Option<Duration>) -> Self {
            self.password_max_life = Some(password_max_life);
            self.mask |= Mask::PW_MAX_LIFE;
            self
        }

        /// Set the minimum length of a password
        pub fn password_min_length(mut self, password_min_length: i64) -> Self {
            self.password_min_length = Some(password_min_length);
            self.mask |= Mask::PW_MIN_LENGTH;
            self
        }

        /// Set the minimum number of character classes required in a password
        pub fn password_min_classes(mut self, password_min_classes: i64) -> Self {
            self.password_min_classes = Some(password_min_classes);
            self.mask |= Mask::PW_MIN_CLASSES;
            self
        }

        /// Set the number of past keys kept for a principal
        pub fn password_history_num(mut self, password_history_num: i64) -> Self {
            self.password_history_num = Some(password_history_num);
            self.mask |= Mask::PW_HISTORY_NUM;
            self
        }

        /// Set the number of authentication failures before the principal is locked
        pub fn password_max_fail(mut self, password_max_fail: u32) -> Self {
            self.password_max_fail = Some(password_max_fail);
            self.mask |= Mask::PW_MAX_FAILURE;
            self
        }

        /// Set the allowable time between authentication failures
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn password_failcount_interval(
            mut self,
            password_failcount_interval: Option<Duration>,
        ) -> Self {
            self.password_failcount_interval = Some(password_failcount_interval);
            self.mask |= Mask::PW_FAILURE_COUNT_INTERVAL;
            self
        }

        /// Set the duration for which the principal is locked after too many failures
        ///
        /// Pass `None` to clear it. Defaults to not set
        pub fn password_lockout_duration(
            mut self,
            password_lockout_duration: Option<Duration>,
        ) -> Self {
            self.password_lockout_duration = Some(password_lockout_duration);
            self.mask |= Mask::PW_LOCKOUT_DURATION;
            self
        }

        /// Create a [`PolicyEntry`] from this builder
        pub(crate) fn make_entry(&self) -> Result<PolicyEntry> {
            let mut entry = PolicyEntry {
                policy: self.name.clone(),
                ..Default::default()
            };

            if let Some(password_min_life) = self.password_min_life {
                entry.pw_min_life = dur_to_delta(password_min_life)?;
            }
            if let Some(password_max_life) = self.password_max_life {
                entry.pw_max_life = dur_to_delta(password_max_life)?;
            }
            if let Some(password_min_length) = self.password_min_length {
                entry.pw_min_length = password_min_length;
            }
            if let Some(password_min_classes) = self.password_min_classes {
                entry.pw_min_classes = password_min_classes;
            }
            if let Some(password_history_num) = self.password_history_num {
                entry.pw_history_num = password_history_num;
            }
            if let Some(password_max_fail) = self.password_max_fail {
                entry.pw_max_fail = password_max_fail;
            }
            if let Some(password_failcount_interval) = self.password_failcount_interval {
                entry.pw_failcnt_interval = dur_to_delta(password_failcount_interval)?;
            }
            if let Some(password_lockout_duration) = self.password_lockout_duration {
                entry.pw_lockout_duration = dur_to_delta(password_lockout_duration)?;
            }

            Ok(entry)
        }
    };
}

policy_doer_struct!(
    /// Utility to create a policy
    #[derive(Clone, Debug, Default)]
    PolicyBuilder {}
);

impl PolicyBuilder {
    policy_doer_impl!();

    /// Construct a new [`PolicyBuilder`] for a policy with `name`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Set the name of the policy
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Create the policy and return a fresh snapshot of it
    pub fn create<K: KAdminImpl>(&self, kadmin: &K) -> Result<Policy> {
        kadmin.add_policy(self)?;
        kadmin.get_policy(&self.name)
    }
}

policy_doer_struct!(
    /// Utility to modify a policy
    #[derive(Clone, Debug, Default)]
    PolicyModifier {}
);

impl PolicyModifier {
    policy_doer_impl!();

    /// Construct a new [`PolicyModifier`] from a [`Policy`]
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            name: policy.name.clone(),
            ..Default::default()
        }
    }

    /// Modify the policy and return a fresh snapshot of it
    pub fn modify<K: KAdminImpl>(&self, kadmin: &K) -> Result<Policy> {
        kadmin.modify_policy(self)?;
        kadmin.get_policy(&self.name)
    }
}
