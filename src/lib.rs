//! Session-scoped administrative handle for Kerberos (kadm5) backends
//!
//! A [`Context`] holds the backend library state, a [`Handle`] owns a context and one live
//! administrative connection, and [`Principal`]s and [`Policy`]s are value snapshots read through
//! a handle.
//!
//! ```
//! use kadmin_session::{Context, Handle, KAdminImpl, memory::MemoryBackend};
//!
//! let backend = MemoryBackend::new("EXAMPLE.ORG").with_admin("user/admin", "vErYsEcUrE");
//! let context = Context::new(backend).unwrap();
//! let kadmin = Handle::builder(context)
//!     .with_password("user/admin", "vErYsEcUrE")
//!     .unwrap();
//!
//! kadmin.create_principal("alice", Some("hunter2")).unwrap();
//! for princ in kadmin.list_principals(Some("ali*"), false).unwrap() {
//!     println!("{}", princ.unwrap().name());
//! }
//! ```
//!
//! Backends implement [`Backend`] and [`Connection`]. The crate ships an in-memory backend
//! behind the `memory` feature, enabled by default.
//!
//! # About thread safety
//!
//! kadm5 sessions serve one operation at a time. A [`Handle`] is `Send` but not `Sync`: move it to
//! the thread that uses it, or open one handle per thread. Context initialization and session
//! setup and teardown are serialized by [`context::CONTEXT_INIT_LOCK`] and
//! [`kadmin::KADMIN_INIT_LOCK`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod conv;

pub mod error;
pub use error::{Error, Operation};

pub mod backend;
pub use backend::{Backend, Connection, Credentials};

pub mod name;
pub use name::PrincipalName;

pub mod params;
pub use params::Params;

pub mod context;
pub use context::{Context, ContextBuilder};

pub mod kadmin;
pub use kadmin::{Handle, HandleBuilder, KAdminImpl};

pub mod iter;
pub use iter::{EntityIter, EntityKind, Entry, IterState};

pub mod principal;
pub use principal::{
    Principal, PrincipalAttributes, PrincipalBuilder, PrincipalBuilderKey, PrincipalModifier,
};

pub mod policy;
pub use policy::{Policy, PolicyBuilder, PolicyModifier};

#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
pub mod memory;
#[cfg(feature = "memory")]
pub use memory::MemoryBackend;
