//! Manage backend [contexts][`Context`]

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use log::debug;

use crate::{
    backend::Backend,
    error::{error_code_to_message, Error, Result},
};

/// Lock acquired when creating or releasing a [`Context`] instance
pub static CONTEXT_INIT_LOCK: Mutex<()> = Mutex::new(());

/// Backend library state for use with a [`Handle`][`crate::Handle`]
///
/// The backend state is released exactly once, either by [`Context::release`] or when the
/// context is dropped.
pub struct Context {
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) realm: Option<String>,
    initialized: bool,
}

impl Context {
    /// Create a default context
    pub fn new<B: Backend + 'static>(backend: B) -> Result<Self> {
        Self::builder().build(backend)
    }

    /// Construct a new [builder][`ContextBuilder`] for custom contexts
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Realm of this context
    ///
    /// Either the one set with [`ContextBuilder::realm`], or the backend default realm
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Whether the backend state is still held
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Release the backend state
    ///
    /// Subsequent calls do nothing.
    pub fn release(&mut self) {
        if !self.initialized {
            return;
        }
        let _guard = CONTEXT_INIT_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.backend.free_context();
        self.initialized = false;
        debug!("Released context for realm {:?}", self.realm);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("realm", &self.realm)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Context`]
#[derive(Debug, Default)]
pub struct ContextBuilder {
    realm: Option<String>,
}

impl ContextBuilder {
    /// Use `realm` instead of the backend default realm
    pub fn realm(mut self, realm: &str) -> Self {
        self.realm = Some(realm.to_owned());
        self
    }

    /// Build a [`Context`] instance
    pub fn build<B: Backend + 'static>(self, backend: B) -> Result<Context> {
        let _guard = CONTEXT_INIT_LOCK.lock().map_err(|_| Error::LockError)?;

        backend
            .init_context()
            .map_err(|code| Error::Initialization {
                code,
                message: error_code_to_message(code),
            })?;

        drop(_guard);

        let realm = self.realm.or_else(|| backend.default_realm());
        debug!("Initialized context for realm {realm:?}");
        Ok(Context {
            backend: Box::new(backend),
            realm,
            initialized: true,
        })
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.release();
    }
}
