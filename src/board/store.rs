//! Observable state container with optimistic transactions.
//!
//! A `Store` holds one value and notifies subscribers on every change. Each
//! write bumps the store version. An optimistic write goes through
//! `begin` → (`commit` | `rollback`):
//!
//! - `begin` snapshots the current value, installs the next one, and hands
//!   back a `Transaction` tagged with the version it wrote.
//! - `commit` keeps the applied value.
//! - `rollback` restores the snapshot exactly, but only if nothing else has
//!   written to the store since. A later write means the snapshot no longer
//!   describes "before this change", so the transaction is reported as
//!   superseded and the store is flagged stale for a canonical refetch.

use std::fmt;

/// Version written by an optimistic apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationToken(u64);

impl MutationToken {
    pub fn version(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened to the store, delivered to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Full replacement (fetch result or direct set)
    Replaced,
    Applied(MutationToken),
    Committed(MutationToken),
    RolledBack(MutationToken),
    /// Rollback skipped because a later write landed first
    Superseded(MutationToken),
}

/// How an optimistic transaction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Persisted,
    RolledBack,
    Superseded,
}

/// An applied but unsettled optimistic change
#[must_use = "an optimistic transaction must be committed or rolled back"]
#[derive(Debug)]
pub struct Transaction<S> {
    token: MutationToken,
    snapshot: S,
}

impl<S> Transaction<S> {
    pub fn token(&self) -> MutationToken {
        self.token
    }

    /// State as it was before the change was applied
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }
}

type Subscriber<S> = Box<dyn FnMut(&S, &Change)>;

pub struct Store<S> {
    state: S,
    version: u64,
    stale: bool,
    subscribers: Vec<Subscriber<S>>,
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("stale", &self.stale)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            state: initial,
            version: 0,
            stale: false,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &S {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// True after a superseded rollback, until the next replacement
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&S, &Change) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    fn emit(&mut self, change: Change) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&self.state, &change);
        }
    }

    /// Replace the whole value. Clears the stale flag.
    pub fn replace(&mut self, next: S) {
        self.state = next;
        self.version += 1;
        self.stale = false;
        self.emit(Change::Replaced);
    }

    /// Apply `next` immediately, keeping the current value as the rollback snapshot
    pub fn begin(&mut self, next: S) -> Transaction<S> {
        let snapshot = std::mem::replace(&mut self.state, next);
        self.version += 1;
        let token = MutationToken(self.version);
        self.emit(Change::Applied(token));
        Transaction { token, snapshot }
    }

    /// Keep the applied change. If another write landed after it, the
    /// committed value may no longer be on screen and the store is marked stale.
    pub fn commit(&mut self, tx: Transaction<S>) -> Settled {
        if self.version != tx.token.0 {
            log::debug!(
                "Commit of {} after store moved on to version {}",
                tx.token, self.version
            );
            self.stale = true;
        }
        self.emit(Change::Committed(tx.token));
        Settled::Persisted
    }

    pub fn rollback(&mut self, tx: Transaction<S>) -> Settled {
        if self.version != tx.token.0 {
            log::warn!(
                "Rollback of {} skipped: store moved on to version {}",
                tx.token, self.version
            );
            self.stale = true;
            self.emit(Change::Superseded(tx.token));
            return Settled::Superseded;
        }

        self.state = tx.snapshot;
        self.version += 1;
        self.emit(Change::RolledBack(tx.token));
        Settled::RolledBack
    }
}
