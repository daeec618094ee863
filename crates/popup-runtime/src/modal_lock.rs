#![forbid(unsafe_code)]

//! Page-level "modal open" marker.
//!
//! Surrounding CSS keys scroll locking and background dimming off a class on
//! the document root. The marker is shared by every popup on the page, so it
//! is owned here instead of being toggled ad hoc by each controller.
//!
//! # Invariants
//!
//! - The root carries the marker iff at least one popup holds the lock.
//! - Holders are dialog elements, not popup ids, so popups sharing an id
//!   (including the default one) are counted separately.
//! - Locking a popup that already holds the lock, or unlocking one that does
//!   not, changes nothing.

use std::collections::BTreeSet;

use popup_core::{Document, NodeId};
use tracing::trace;

/// Reference-counted owner of the document root marker class.
#[derive(Debug, Clone)]
pub struct ModalLock {
    class: String,
    holders: BTreeSet<NodeId>,
}

impl ModalLock {
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            holders: BTreeSet::new(),
        }
    }

    /// Record the popup at `dialog` as open. Adds the marker on the first
    /// holder.
    ///
    /// Returns `false` if `dialog` already held the lock.
    pub fn lock<D: Document + ?Sized>(&mut self, doc: &mut D, dialog: NodeId) -> bool {
        if !self.holders.insert(dialog) {
            return false;
        }
        if self.holders.len() == 1 {
            trace!(dialog = %dialog, class = %self.class, "modal marker set");
            let root = doc.root();
            doc.add_class(root, &self.class);
        }
        true
    }

    /// Record the popup at `dialog` as closed. Removes the marker with the
    /// last holder.
    ///
    /// Returns `false` if `dialog` did not hold the lock.
    pub fn unlock<D: Document + ?Sized>(&mut self, doc: &mut D, dialog: NodeId) -> bool {
        if !self.holders.remove(&dialog) {
            return false;
        }
        if self.holders.is_empty() {
            trace!(dialog = %dialog, class = %self.class, "modal marker cleared");
            let root = doc.root();
            doc.remove_class(root, &self.class);
        }
        true
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !self.holders.is_empty()
    }

    /// Number of popups currently holding the lock.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.holders.len()
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }
}
