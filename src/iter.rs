//! Lazy enumeration of principals and policies

use log::{debug, warn};
use strum::Display;

use crate::{
    backend::{Connection, ErrorCode},
    error::{kadm5_escape_hatch, Error, Operation, Result},
    kadmin::{Handle, KAdminImpl},
    policy::Policy,
    principal::Principal,
};

/// Kind of entity an [`EntityIter`] enumerates
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[allow(clippy::exhaustive_enums)]
pub enum EntityKind {
    /// Principals
    Principal,
    /// Policies
    Policy,
}

impl EntityKind {
    fn list_operation(self) -> Operation {
        match self {
            Self::Principal => Operation::List,
            Self::Policy => Operation::ListPolicies,
        }
    }

    fn list(
        self,
        connection: &dyn Connection,
        expression: &str,
    ) -> std::result::Result<Vec<String>, ErrorCode> {
        match self {
            Self::Principal => connection.get_principals(expression),
            Self::Policy => connection.get_policies(expression),
        }
    }

    fn fetch(self, kadmin: &Handle, name: &str) -> Result<Entry> {
        match self {
            Self::Principal => kadmin.get_principal(name).map(Entry::Principal),
            Self::Policy => kadmin.get_policy(name).map(Entry::Policy),
        }
    }
}

/// An element yielded by an [`EntityIter`]
#[derive(Clone, Debug)]
#[allow(clippy::exhaustive_enums)]
pub enum Entry {
    /// A bare name
    Name(String),
    /// An unpacked principal
    Principal(Principal),
    /// An unpacked policy
    Policy(Policy),
}

impl Entry {
    /// Name of the entry, whatever its kind
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Principal(principal) => principal.name(),
            Self::Policy(policy) => policy.name(),
        }
    }

    /// The principal, if this entry is one
    pub fn into_principal(self) -> Option<Principal> {
        match self {
            Self::Principal(principal) => Some(principal),
            _ => None,
        }
    }

    /// The policy, if this entry is one
    pub fn into_policy(self) -> Option<Policy> {
        match self {
            Self::Policy(policy) => Some(policy),
            _ => None,
        }
    }
}

/// Where an [`EntityIter`] stands
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::exhaustive_enums)]
pub enum IterState {
    /// Nothing fetched yet
    Created,
    /// Enumeration call in progress
    Fetching,
    /// Names captured, some left to yield
    Ready,
    /// Every name was yielded
    Exhausted,
    /// Closed by the caller
    Closed,
}

/// Cursor over principal or policy names
///
/// The first call to [`Iterator::next`] fetches the complete list of matching names in one
/// backend call; later calls walk that list. The iterator is single-pass.
///
/// In unpack mode each name is looked up before being yielded. A failed lookup yields an `Err`
/// for that element only, and iteration continues with the next name.
///
/// After [`EntityIter::close`], every call to `next` yields [`Error::UseAfterClose`].
#[derive(Debug)]
pub struct EntityIter<'a> {
    kadmin: &'a Handle,
    kind: EntityKind,
    expression: String,
    unpack: bool,
    names: Vec<String>,
    position: usize,
    state: IterState,
}

impl<'a> EntityIter<'a> {
    pub(crate) fn new(
        kadmin: &'a Handle,
        kind: EntityKind,
        pattern: Option<&str>,
        unpack: bool,
    ) -> Self {
        Self {
            kadmin,
            kind,
            expression: pattern.unwrap_or("*").to_owned(),
            unpack,
            names: Vec::new(),
            position: 0,
            state: IterState::Created,
        }
    }

    /// Kind of entity being enumerated
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Whether names are expanded into entities
    pub fn unpack(&self) -> bool {
        self.unpack
    }

    /// Current state
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Release the captured names
    pub fn close(&mut self) {
        self.names = Vec::new();
        self.position = 0;
        self.state = IterState::Closed;
    }

    fn fetch(&mut self) -> Result<()> {
        self.state = IterState::Fetching;
        let connection = self.kadmin.connection()?;
        self.names = kadm5_escape_hatch(
            self.kind.list_operation(),
            self.kind.list(connection, &self.expression),
        )?;
        debug!(
            "Listed {} {} names matching {:?}",
            self.names.len(),
            self.kind,
            self.expression
        );
        self.position = 0;
        self.state = if self.names.is_empty() {
            IterState::Exhausted
        } else {
            IterState::Ready
        };
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.names.len().saturating_sub(self.position)
    }
}

impl Iterator for EntityIter<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            IterState::Closed => return Some(Err(Error::UseAfterClose)),
            IterState::Exhausted => return None,
            IterState::Created | IterState::Fetching => {
                if let Err(err) = self.fetch() {
                    self.names = Vec::new();
                    self.state = IterState::Exhausted;
                    return Some(Err(err));
                }
            }
            IterState::Ready => {}
        }

        let name = std::mem::take(self.names.get_mut(self.position)?);
        self.position += 1;
        if self.remaining() == 0 {
            self.names = Vec::new();
            self.position = 0;
            self.state = IterState::Exhausted;
        }

        if !self.unpack {
            return Some(Ok(Entry::Name(name)));
        }
        Some(self.kind.fetch(self.kadmin, &name).inspect_err(|err| {
            warn!("Failed to unpack {} {name}: {err}", self.kind);
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            IterState::Ready => (self.remaining(), Some(self.remaining())),
            IterState::Exhausted => (0, Some(0)),
            _ => (0, None),
        }
    }
}
