//! In-memory administration backend
//!
//! [`MemoryBackend`] keeps a realm database in process and answers with the same status codes a
//! kadm5 server would. Clones share the same database, so several [`Context`][`crate::Context`]s
//! (and thus several [`Handle`][`crate::Handle`]s) can administer it at once.
//!
//! ```
//! use kadmin_session::{Context, Handle, KAdminImpl, memory::MemoryBackend};
//!
//! let backend = MemoryBackend::new("TEST.LOCAL").with_admin("admin/admin", "secret");
//! let kadmin = Handle::builder(Context::new(backend).unwrap())
//!     .with_password("admin/admin", "secret")
//!     .unwrap();
//! kadmin.create_principal("alice", Some("hunter2")).unwrap();
//! assert!(kadmin.principal_exists("alice@TEST.LOCAL").unwrap());
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use regex::Regex;

use crate::{
    backend::{
        Backend, Connection, Credentials, ErrorCode, Mask, PolicyEntry, PrincipalEntry,
        KADM5_AUTH_INSUFFICIENT, KADM5_BAD_CLASS, KADM5_BAD_HISTORY, KADM5_BAD_LENGTH,
        KADM5_BAD_MIN_PASS_LIFE, KADM5_BAD_PASSWORD, KADM5_BAD_POLICY, KADM5_BAD_PRINCIPAL,
        KADM5_DUP, KADM5_FAILURE, KADM5_GSS_ERROR, KADM5_NO_SRV, KADM5_PASS_Q_CLASS,
        KADM5_PASS_Q_TOOSHORT, KADM5_PASS_REUSE, KADM5_PASS_TOOSOON, KADM5_POLICY_REF,
        KADM5_RPC_ERROR, KADM5_UNK_POLICY, KADM5_UNK_PRINC,
    },
    conv::now_ts,
    error::Operation,
    name::PrincipalName,
    params::Params,
};

/// Key material stored for a principal
#[derive(Clone, Debug, PartialEq, Eq)]
enum Key {
    Password(String),
    Random,
    None,
}

#[derive(Clone, Debug)]
struct StoredPrincipal {
    entry: PrincipalEntry,
    key: Key,
    /// Previous passwords, most recent last
    history: Vec<String>,
}

#[derive(Clone, Debug)]
struct InjectedFailure {
    op: Operation,
    name: Option<String>,
    code: ErrorCode,
}

#[derive(Debug, Default)]
struct Kdc {
    realm: String,
    default_realm: bool,
    admin_server: Option<String>,
    acl: BTreeSet<String>,
    principals: BTreeMap<String, StoredPrincipal>,
    policies: BTreeMap<String, PolicyEntry>,
    live_contexts: usize,
    released_contexts: usize,
    live_connections: usize,
    init_failure: Option<ErrorCode>,
    connect_failure: Option<ErrorCode>,
    failures: Vec<InjectedFailure>,
}

impl Kdc {
    /// Pop a one-shot failure registered for `op` on `name`
    fn injected(&mut self, op: Operation, name: &str) -> Result<(), ErrorCode> {
        let position = self.failures.iter().position(|failure| {
            failure.op == op && failure.name.as_deref().map_or(true, |n| n == name)
        });
        match position {
            Some(position) => Err(self.failures.remove(position).code),
            None => Ok(()),
        }
    }

    fn principal_mut(&mut self, name: &PrincipalName) -> Result<&mut StoredPrincipal, ErrorCode> {
        self.principals
            .get_mut(&name.to_string())
            .ok_or(KADM5_UNK_PRINC)
    }

    fn attach_policy(&mut self, policy: &str) -> Result<(), ErrorCode> {
        let policy = self.policies.get_mut(policy).ok_or(KADM5_UNK_POLICY)?;
        policy.policy_refcnt += 1;
        Ok(())
    }

    fn detach_policy(&mut self, policy: Option<&str>) {
        if let Some(policy) = policy.and_then(|policy| self.policies.get_mut(policy)) {
            policy.policy_refcnt = (policy.policy_refcnt - 1).max(0);
        }
    }

    fn policy_of(&self, entry: &PrincipalEntry) -> Option<&PolicyEntry> {
        entry
            .policy
            .as_deref()
            .and_then(|policy| self.policies.get(policy))
    }
}

/// Number of character classes in `password`: lower case, upper case, digits, punctuation, and
/// everything else
fn character_classes(password: &str) -> i64 {
    let mut classes = [false; 5];
    for c in password.chars() {
        let class = if c.is_ascii_lowercase() {
            0
        } else if c.is_ascii_uppercase() {
            1
        } else if c.is_ascii_digit() {
            2
        } else if c.is_ascii_punctuation() {
            3
        } else {
            4
        };
        classes[class] = true;
    }
    classes.iter().filter(|c| **c).count() as i64
}

fn check_password_quality(policy: Option<&PolicyEntry>, password: &str) -> Result<(), ErrorCode> {
    let Some(policy) = policy else {
        return Ok(());
    };
    if (password.chars().count() as i64) < policy.pw_min_length {
        return Err(KADM5_PASS_Q_TOOSHORT);
    }
    if character_classes(password) < policy.pw_min_classes {
        return Err(KADM5_PASS_Q_CLASS);
    }
    Ok(())
}

fn check_policy_entry(entry: &PolicyEntry, mask: Mask) -> Result<(), ErrorCode> {
    if entry.policy.is_empty() {
        return Err(KADM5_BAD_POLICY);
    }
    if mask.contains(Mask::PW_MIN_LENGTH) && entry.pw_min_length < 1 {
        return Err(KADM5_BAD_LENGTH);
    }
    if mask.contains(Mask::PW_MIN_CLASSES) && !(1..=5).contains(&entry.pw_min_classes) {
        return Err(KADM5_BAD_CLASS);
    }
    if mask.contains(Mask::PW_HISTORY_NUM) && entry.pw_history_num < 1 {
        return Err(KADM5_BAD_HISTORY);
    }
    Ok(())
}

/// Translate a shell-style glob into an anchored regular expression
///
/// Supports `*`, `?` and `[...]` classes, with `[!...]` negating the class. An unterminated `[`
/// matches itself.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '[' => {
                let rest: String = chars.clone().collect();
                match rest.find(']') {
                    Some(end) if end > 0 => {
                        let class = &rest[..end];
                        pattern.push('[');
                        let class = match class.strip_prefix('!') {
                            Some(negated) => {
                                pattern.push('^');
                                negated
                            }
                            None => class,
                        };
                        for c in class.chars() {
                            if matches!(c, '\\' | '[' | '^' | '&' | '~') {
                                pattern.push('\\');
                            }
                            pattern.push(c);
                        }
                        pattern.push(']');
                        for _ in rest[..=end].chars() {
                            chars.next();
                        }
                    }
                    _ => pattern.push_str(r"\["),
                }
            }
            '\\' => match chars.next() {
                Some(escaped) => pattern.push_str(&regex::escape(&escaped.to_string())),
                None => pattern.push_str(r"\\"),
            },
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

fn matching_names<'a, I: Iterator<Item = &'a String>>(
    names: I,
    glob: &str,
) -> Result<Vec<String>, ErrorCode> {
    let regex = glob_to_regex(glob).map_err(|_| KADM5_FAILURE)?;
    Ok(names.filter(|name| regex.is_match(name)).cloned().collect())
}

/// In-memory administration backend
///
/// Principal names are enumerated in lexicographic order.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    kdc: Arc<Mutex<Kdc>>,
}

impl MemoryBackend {
    /// New, empty database for `realm`, which is also the default realm
    pub fn new(realm: &str) -> Self {
        Self {
            kdc: Arc::new(Mutex::new(Kdc {
                realm: realm.to_owned(),
                default_realm: true,
                ..Default::default()
            })),
        }
    }

    /// New, empty database for `realm`, without a default realm
    pub fn without_default_realm(realm: &str) -> Self {
        let backend = Self::new(realm);
        backend.lock().default_realm = false;
        backend
    }

    /// Only accept sessions asking for `admin_server`
    pub fn with_admin_server(self, admin_server: &str) -> Self {
        self.lock().admin_server = Some(admin_server.to_owned());
        self
    }

    /// Add an administrator principal with a password
    ///
    /// Only administrators can open authenticated sessions. Local sessions are always allowed.
    pub fn with_admin(self, name: &str, password: &str) -> Self {
        {
            let mut kdc = self.lock();
            let realm = kdc.realm.clone();
            if let Ok(principal) = PrincipalName::parse(name, Some(&realm)) {
                let mut entry = PrincipalEntry::new(principal.clone());
                entry.kvno = 1;
                entry.last_pwd_change = now_ts();
                kdc.acl.insert(principal.to_string());
                kdc.principals.insert(
                    principal.to_string(),
                    StoredPrincipal {
                        entry,
                        key: Key::Password(password.to_owned()),
                        history: Vec::new(),
                    },
                );
            }
        }
        self
    }

    /// Make the next context initialization fail with `code`
    pub fn fail_init(&self, code: ErrorCode) {
        self.lock().init_failure = Some(code);
    }

    /// Make the next connection attempt fail with `code`
    pub fn fail_connect(&self, code: ErrorCode) {
        self.lock().connect_failure = Some(code);
    }

    /// Make the next `op` fail with `code`
    ///
    /// With a `name`, only an operation on that principal (canonical form) or policy fails.
    /// Operations without a subject, such as [`Operation::Flush`] or [`Operation::Destroy`],
    /// only match failures registered without a name.
    pub fn inject_failure(&self, op: Operation, name: Option<&str>, code: ErrorCode) {
        self.lock().failures.push(InjectedFailure {
            op,
            name: name.map(String::from),
            code,
        });
    }

    /// Number of contexts currently holding backend state
    pub fn live_contexts(&self) -> usize {
        self.lock().live_contexts
    }

    /// Number of contexts released so far
    pub fn released_contexts(&self) -> usize {
        self.lock().released_contexts
    }

    /// Number of open connections
    pub fn live_connections(&self) -> usize {
        self.lock().live_connections
    }

    fn lock(&self) -> MutexGuard<'_, Kdc> {
        self.kdc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for MemoryBackend {
    fn init_context(&self) -> Result<(), ErrorCode> {
        let mut kdc = self.lock();
        if let Some(code) = kdc.init_failure.take() {
            return Err(code);
        }
        kdc.live_contexts += 1;
        Ok(())
    }

    fn free_context(&self) {
        let mut kdc = self.lock();
        kdc.live_contexts = kdc.live_contexts.saturating_sub(1);
        kdc.released_contexts += 1;
    }

    fn default_realm(&self) -> Option<String> {
        let kdc = self.lock();
        kdc.default_realm.then(|| kdc.realm.clone())
    }

    fn connect(
        &self,
        realm: &str,
        credentials: &Credentials,
        params: &Params,
    ) -> Result<Box<dyn Connection>, ErrorCode> {
        let mut kdc = self.lock();
        if let Some(code) = kdc.connect_failure.take() {
            return Err(code);
        }
        if realm != kdc.realm {
            return Err(KADM5_NO_SRV);
        }
        if let (Some(wanted), Some(served)) = (params.get_admin_server(), &kdc.admin_server) {
            if wanted != served.as_str() {
                return Err(KADM5_RPC_ERROR);
            }
        }

        let client = match credentials {
            Credentials::Local => None,
            Credentials::Password { client, password } => {
                let client =
                    PrincipalName::parse(client, Some(realm)).map_err(|_| KADM5_BAD_PRINCIPAL)?;
                match kdc.principals.get(&client.to_string()) {
                    Some(stored) if stored.key == Key::Password(password.clone()) => {}
                    _ => return Err(KADM5_BAD_PASSWORD),
                }
                Some(client)
            }
            Credentials::Keytab { client, .. } | Credentials::Ccache { client, .. } => {
                let client = client.as_deref().ok_or(KADM5_GSS_ERROR)?;
                let client =
                    PrincipalName::parse(client, Some(realm)).map_err(|_| KADM5_BAD_PRINCIPAL)?;
                if !kdc.principals.contains_key(&client.to_string()) {
                    return Err(KADM5_GSS_ERROR);
                }
                Some(client)
            }
        };
        if let Some(client) = &client {
            if !kdc.acl.contains(&client.to_string()) {
                return Err(KADM5_AUTH_INSUFFICIENT);
            }
        }

        kdc.live_connections += 1;
        Ok(Box::new(MemoryConnection {
            kdc: Arc::clone(&self.kdc),
            realm: realm.to_owned(),
            client,
        }))
    }
}

struct MemoryConnection {
    kdc: Arc<Mutex<Kdc>>,
    realm: String,
    client: Option<PrincipalName>,
}

impl MemoryConnection {
    fn lock(&self) -> Result<MutexGuard<'_, Kdc>, ErrorCode> {
        self.kdc.lock().map_err(|_| KADM5_FAILURE)
    }

    fn stamp(&self, entry: &mut PrincipalEntry) {
        entry.mod_date = now_ts();
        entry.mod_name = self.client.clone();
    }

    fn set_password(
        kdc: &Kdc,
        stored: &mut StoredPrincipal,
        password: &str,
    ) -> Result<(), ErrorCode> {
        let policy = kdc.policy_of(&stored.entry);
        check_password_quality(policy, password)?;
        if let Some(policy) = policy {
            let now = now_ts();
            if policy.pw_min_life > 0
                && stored.entry.last_pwd_change > 0
                && now.saturating_sub(stored.entry.last_pwd_change) < policy.pw_min_life
            {
                return Err(KADM5_PASS_TOOSOON);
            }
            if policy.pw_history_num > 1 {
                let kept = (policy.pw_history_num - 1) as usize;
                let start = stored.history.len().saturating_sub(kept);
                let reused = stored.history[start..].iter().any(|old| old == password)
                    || stored.key == Key::Password(password.to_owned());
                if reused {
                    return Err(KADM5_PASS_REUSE);
                }
            }
        }
        if let Key::Password(old) = &stored.key {
            stored.history.push(old.clone());
        }
        Self::rekey(policy, stored, Key::Password(password.to_owned()));
        Ok(())
    }

    fn rekey(policy: Option<&PolicyEntry>, stored: &mut StoredPrincipal, key: Key) {
        let now = now_ts();
        stored.key = key;
        stored.entry.kvno += 1;
        stored.entry.last_pwd_change = now;
        stored.entry.pw_expiration = match policy {
            Some(policy) if policy.pw_max_life > 0 => now.saturating_add(policy.pw_max_life),
            _ => stored.entry.pw_expiration,
        };
    }
}

impl Connection for MemoryConnection {
    fn create_principal(
        &self,
        entry: &PrincipalEntry,
        mask: Mask,
        password: Option<&str>,
    ) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        let name = entry.principal.to_string();
        kdc.injected(Operation::Create, &name)?;
        if kdc.principals.contains_key(&name) {
            return Err(KADM5_DUP);
        }

        let mut stored = StoredPrincipal {
            entry: PrincipalEntry::new(entry.principal.clone()),
            key: Key::None,
            history: Vec::new(),
        };
        let new = &mut stored.entry;
        new.princ_expire_time = entry.princ_expire_time;
        new.pw_expiration = entry.pw_expiration;
        new.max_life = entry.max_life;
        new.attributes = entry.attributes;
        new.aux_attributes = entry.aux_attributes;
        new.max_renewable_life = entry.max_renewable_life;
        new.mkvno = 1;
        if mask.contains(Mask::POLICY) {
            new.policy = entry.policy.clone();
        }
        self.stamp(&mut stored.entry);

        if let Some(policy) = &stored.entry.policy {
            if !kdc.policies.contains_key(policy) {
                return Err(KADM5_UNK_POLICY);
            }
        }

        match password {
            Some(password) => Self::set_password(&kdc, &mut stored, password)?,
            None if mask.contains(Mask::KEY_DATA) => {}
            None => {
                let policy = kdc.policy_of(&stored.entry);
                Self::rekey(policy, &mut stored, Key::Random);
            }
        }

        if let Some(policy) = stored.entry.policy.clone() {
            kdc.attach_policy(&policy)?;
        }
        kdc.principals.insert(name, stored);
        Ok(())
    }

    fn delete_principal(&self, principal: &PrincipalName) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        let name = principal.to_string();
        kdc.injected(Operation::Delete, &name)?;
        let stored = kdc.principals.remove(&name).ok_or(KADM5_UNK_PRINC)?;
        kdc.acl.remove(&name);
        kdc.detach_policy(stored.entry.policy.as_deref());
        Ok(())
    }

    fn modify_principal(&self, entry: &PrincipalEntry, mask: Mask) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::Modify, &entry.principal.to_string())?;
        if mask.contains(Mask::POLICY) {
            if let Some(policy) = &entry.policy {
                if !kdc.policies.contains_key(policy) {
                    return Err(KADM5_UNK_POLICY);
                }
            }
        }

        let stored = kdc.principal_mut(&entry.principal)?;
        let old_policy = stored.entry.policy.clone();
        let current = &mut stored.entry;
        if mask.contains(Mask::PRINC_EXPIRE_TIME) {
            current.princ_expire_time = entry.princ_expire_time;
        }
        if mask.contains(Mask::PW_EXPIRATION) {
            current.pw_expiration = entry.pw_expiration;
        }
        if mask.contains(Mask::MAX_LIFE) {
            current.max_life = entry.max_life;
        }
        if mask.contains(Mask::ATTRIBUTES) {
            current.attributes = entry.attributes;
        }
        if mask.contains(Mask::AUX_ATTRIBUTES) {
            current.aux_attributes = entry.aux_attributes;
        }
        if mask.contains(Mask::MAX_RLIFE) {
            current.max_renewable_life = entry.max_renewable_life;
        }
        if mask.contains(Mask::KVNO) {
            current.kvno = entry.kvno;
        }
        if mask.contains(Mask::POLICY) {
            current.policy = entry.policy.clone();
        } else if mask.contains(Mask::POLICY_CLR) {
            current.policy = None;
        }
        let new_policy = current.policy.clone();
        self.stamp(current);

        if old_policy != new_policy {
            kdc.detach_policy(old_policy.as_deref());
            if let Some(policy) = new_policy {
                kdc.attach_policy(&policy)?;
            }
        }
        Ok(())
    }

    fn rename_principal(
        &self,
        source: &PrincipalName,
        target: &PrincipalName,
    ) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        let source_name = source.to_string();
        let target_name = target.to_string();
        kdc.injected(Operation::Rename, &source_name)?;
        if !kdc.principals.contains_key(&source_name) {
            return Err(KADM5_UNK_PRINC);
        }
        if kdc.principals.contains_key(&target_name) {
            return Err(KADM5_DUP);
        }
        if let Some(mut stored) = kdc.principals.remove(&source_name) {
            stored.entry.principal = target.clone();
            self.stamp(&mut stored.entry);
            kdc.principals.insert(target_name.clone(), stored);
        }
        if kdc.acl.remove(&source_name) {
            kdc.acl.insert(target_name);
        }
        Ok(())
    }

    fn get_principal(&self, principal: &PrincipalName) -> Result<PrincipalEntry, ErrorCode> {
        let mut kdc = self.lock()?;
        let name = principal.to_string();
        kdc.injected(Operation::Get, &name)?;
        kdc.principals
            .get(&name)
            .map(|stored| stored.entry.clone())
            .ok_or(KADM5_UNK_PRINC)
    }

    fn chpass_principal(
        &self,
        principal: &PrincipalName,
        password: &str,
    ) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        let name = principal.to_string();
        kdc.injected(Operation::ChangePassword, &name)?;
        let mut stored = kdc.principal_mut(principal)?.clone();
        Self::set_password(&kdc, &mut stored, password)?;
        self.stamp(&mut stored.entry);
        kdc.principals.insert(name, stored);
        Ok(())
    }

    fn randkey_principal(&self, principal: &PrincipalName) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        let name = principal.to_string();
        kdc.injected(Operation::Randkey, &name)?;
        let mut stored = kdc.principal_mut(principal)?.clone();
        let policy = kdc.policy_of(&stored.entry);
        Self::rekey(policy, &mut stored, Key::Random);
        self.stamp(&mut stored.entry);
        kdc.principals.insert(name, stored);
        Ok(())
    }

    fn get_principals(&self, expression: &str) -> Result<Vec<String>, ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::List, expression)?;
        let expression = if expression.contains('@') {
            expression.to_owned()
        } else {
            format!("{expression}@{}", self.realm)
        };
        matching_names(kdc.principals.keys(), &expression)
    }

    fn create_policy(&self, entry: &PolicyEntry, mask: Mask) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::CreatePolicy, &entry.policy)?;
        check_policy_entry(entry, mask)?;
        if entry.pw_min_life > 0 && entry.pw_max_life > 0 && entry.pw_min_life > entry.pw_max_life
        {
            return Err(KADM5_BAD_MIN_PASS_LIFE);
        }
        if kdc.policies.contains_key(&entry.policy) {
            return Err(KADM5_DUP);
        }
        let mut policy = entry.clone();
        policy.policy_refcnt = 0;
        if !mask.contains(Mask::PW_MIN_LENGTH) {
            policy.pw_min_length = 1;
        }
        if !mask.contains(Mask::PW_MIN_CLASSES) {
            policy.pw_min_classes = 1;
        }
        if !mask.contains(Mask::PW_HISTORY_NUM) {
            policy.pw_history_num = 1;
        }
        kdc.policies.insert(entry.policy.clone(), policy);
        Ok(())
    }

    fn delete_policy(&self, name: &str) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::DeletePolicy, name)?;
        let policy = kdc.policies.get(name).ok_or(KADM5_UNK_POLICY)?;
        if policy.policy_refcnt > 0 {
            return Err(KADM5_POLICY_REF);
        }
        kdc.policies.remove(name);
        Ok(())
    }

    fn modify_policy(&self, entry: &PolicyEntry, mask: Mask) -> Result<(), ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::ModifyPolicy, &entry.policy)?;
        check_policy_entry(entry, mask)?;
        let current = kdc
            .policies
            .get_mut(&entry.policy)
            .ok_or(KADM5_UNK_POLICY)?;
        let mut updated = current.clone();
        if mask.contains(Mask::PW_MIN_LIFE) {
            updated.pw_min_life = entry.pw_min_life;
        }
        if mask.contains(Mask::PW_MAX_LIFE) {
            updated.pw_max_life = entry.pw_max_life;
        }
        if mask.contains(Mask::PW_MIN_LENGTH) {
            updated.pw_min_length = entry.pw_min_length;
        }
        if mask.contains(Mask::PW_MIN_CLASSES) {
            updated.pw_min_classes = entry.pw_min_classes;
        }
        if mask.contains(Mask::PW_HISTORY_NUM) {
            updated.pw_history_num = entry.pw_history_num;
        }
        if mask.contains(Mask::PW_MAX_FAILURE) {
            updated.pw_max_fail = entry.pw_max_fail;
        }
        if mask.contains(Mask::PW_FAILURE_COUNT_INTERVAL) {
            updated.pw_failcnt_interval = entry.pw_failcnt_interval;
        }
        if mask.contains(Mask::PW_LOCKOUT_DURATION) {
            updated.pw_lockout_duration = entry.pw_lockout_duration;
        }
        if updated.pw_min_life > 0
            && updated.pw_max_life > 0
            && updated.pw_min_life > updated.pw_max_life
        {
            return Err(KADM5_BAD_MIN_PASS_LIFE);
        }
        *current = updated;
        Ok(())
    }

    fn get_policy(&self, name: &str) -> Result<PolicyEntry, ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::GetPolicy, name)?;
        kdc.policies.get(name).cloned().ok_or(KADM5_UNK_POLICY)
    }

    fn get_policies(&self, expression: &str) -> Result<Vec<String>, ErrorCode> {
        let mut kdc = self.lock()?;
        kdc.injected(Operation::ListPolicies, expression)?;
        matching_names(kdc.policies.keys(), expression)
    }

    fn flush(&self) -> Result<(), ErrorCode> {
        self.lock()?.injected(Operation::Flush, "")
    }

    fn destroy(self: Box<Self>) -> Result<(), ErrorCode> {
        let mut kdc = self
            .kdc
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        kdc.live_connections = kdc.live_connections.saturating_sub(1);
        kdc.injected(Operation::Destroy, "")
    }
}
