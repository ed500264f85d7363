//! Snapshot and rollback as one unit.
//!
//! A [`Compensation`] captures a store's value when it is created and is the
//! only thing that can put it back. A mutation walks it through
//! `Idle → Optimistic → {Reconciled | RolledBack}`.

use crate::state::{CartStore, WishlistMembership, WishlistStore};

/// A store whose value can be captured and later restored exactly.
pub trait Snapshotting: Clone {
    type Snapshot: Clone + std::fmt::Debug;

    fn capture(&self) -> Self::Snapshot;
    fn restore(&self, snapshot: Self::Snapshot);
}

/// Only the count moves during the optimistic phase of a cart mutation.
impl Snapshotting for CartStore {
    type Snapshot = u32;

    fn capture(&self) -> u32 {
        self.read()
    }

    fn restore(&self, count: u32) {
        self.write(count);
    }
}

impl Snapshotting for WishlistStore {
    type Snapshot = WishlistMembership;

    fn capture(&self) -> WishlistMembership {
        self.read()
    }

    fn restore(&self, membership: WishlistMembership) {
        self.replace(membership);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Optimistic,
    Reconciled,
    RolledBack,
}

/// Pre-mutation snapshot paired with the write that undoes it.
///
/// Dropping it while still optimistic restores the snapshot: a mutation
/// abandoned before its call settled leaves the last confirmed value.
#[derive(Debug)]
pub struct Compensation<S: Snapshotting> {
    store: S,
    original: S::Snapshot,
    phase: MutationPhase,
}

impl<S: Snapshotting> Compensation<S> {
    /// Capture the store's current value.
    pub fn capture(store: &S) -> Self {
        Self {
            store: store.clone(),
            original: store.capture(),
            phase: MutationPhase::Idle,
        }
    }

    #[must_use]
    pub const fn original(&self) -> &S::Snapshot {
        &self.original
    }

    #[must_use]
    pub const fn phase(&self) -> MutationPhase {
        self.phase
    }

    /// Write the optimistic value.
    pub fn apply(&mut self, optimistic: S::Snapshot) {
        self.store.restore(optimistic);
        self.phase = MutationPhase::Optimistic;
    }

    /// The server confirmed; `reconcile` writes its values.
    pub fn commit(mut self, reconcile: impl FnOnce(&S)) -> MutationPhase {
        reconcile(&self.store);
        self.phase = MutationPhase::Reconciled;
        self.phase
    }

    /// The server refused; put the snapshot back.
    pub fn rollback(mut self) -> MutationPhase {
        self.store.restore(self.original.clone());
        self.phase = MutationPhase::RolledBack;
        self.phase
    }
}

impl<S: Snapshotting> Drop for Compensation<S> {
    fn drop(&mut self) {
        if self.phase == MutationPhase::Optimistic {
            tracing::warn!(snapshot = ?self.original, "mutation abandoned mid-flight, restoring snapshot");
            self.store.restore(self.original.clone());
            self.phase = MutationPhase::RolledBack;
        }
    }
}
