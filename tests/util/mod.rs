//! Shared test fixtures
#![allow(dead_code)]

use anyhow::Result;
use kadmin_session::{Context, Handle, MemoryBackend};
use rand::{distr::Alphanumeric, Rng};

pub const REALM: &str = "TEST.LOCAL";
const ADMIN: &str = "admin/admin";

pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A throw-away realm served by an in-memory backend
pub struct TestRealm {
    backend: MemoryBackend,
    admin_password: String,
}

impl TestRealm {
    pub fn new() -> Result<Self> {
        let admin_password = random_string(16);
        let backend = MemoryBackend::new(REALM).with_admin(ADMIN, &admin_password);
        Ok(Self {
            backend,
            admin_password,
        })
    }

    pub fn backend(&self) -> MemoryBackend {
        self.backend.clone()
    }

    pub fn admin_princ(&self) -> String {
        format!("{ADMIN}@{REALM}")
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    pub fn context(&self) -> Result<Context> {
        Ok(Context::new(self.backend())?)
    }

    /// Session authenticated as the realm administrator
    pub fn kadmin(&self) -> Result<Handle> {
        Ok(Handle::builder(self.context()?)
            .with_password(&self.admin_princ(), &self.admin_password)?)
    }
}
