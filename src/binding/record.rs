//! One object's binding record.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::object::BoundObject;

/// How a record holds its wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    /// The record keeps the wrapper alive.
    Strong,
    /// The record only observes the wrapper; managed holders keep it alive.
    Weak,
}

enum Holder {
    Strong(Arc<dyn BoundObject>),
    Weak(Weak<dyn BoundObject>),
}

/// The extension-side record attached to one native object.
///
/// The host carries the record's address as its opaque binding pointer, so a
/// record never moves once registered. Reference-count transitions swap the
/// holder in place instead of replacing the record, and a wrapper rebuilt
/// over a still-live handle is installed into the existing record for the
/// same reason.
///
/// Holder swaps are single operations under the internal lock; an `Arc`
/// whose drop could run wrapper code is always dropped after the lock is
/// released.
pub struct BindingRecord {
    holder: Mutex<Holder>,
}

impl BindingRecord {
    /// A record that keeps `object` alive.
    pub fn strong(object: Arc<dyn BoundObject>) -> Self {
        Self {
            holder: Mutex::new(Holder::Strong(object)),
        }
    }

    /// A record that observes `object` without keeping it alive.
    pub fn weak(object: &Arc<dyn BoundObject>) -> Self {
        Self {
            holder: Mutex::new(Holder::Weak(Arc::downgrade(object))),
        }
    }

    pub fn kind(&self) -> BindingKind {
        match &*self.lock() {
            Holder::Strong(_) => BindingKind::Strong,
            Holder::Weak(_) => BindingKind::Weak,
        }
    }

    /// The held wrapper, if it is still alive.
    pub fn object(&self) -> Option<Arc<dyn BoundObject>> {
        match &*self.lock() {
            Holder::Strong(object) => Some(Arc::clone(object)),
            Holder::Weak(weak) => weak.upgrade(),
        }
    }

    /// Pins the wrapper when the host acquires its first external reference.
    /// Returns whether a live wrapper is pinned afterwards; a dead weak
    /// holder stays as it is.
    pub fn promote(&self) -> bool {
        let mut holder = self.lock();
        match &*holder {
            Holder::Strong(_) => true,
            Holder::Weak(weak) => match weak.upgrade() {
                Some(object) => {
                    *holder = Holder::Strong(object);
                    true
                }
                None => false,
            },
        }
    }

    /// Releases the pin when the host drops its last external reference.
    /// Returns whether the native object may be freed, which is only the
    /// case when no managed holder survives the demotion.
    pub fn demote(&self) -> bool {
        let previous = {
            let mut holder = self.lock();
            match &*holder {
                Holder::Strong(object) => {
                    let weak = Arc::downgrade(object);
                    Some(mem::replace(&mut *holder, Holder::Weak(weak)))
                }
                Holder::Weak(_) => None,
            }
        };
        match previous {
            Some(Holder::Strong(object)) => {
                // Ours is the only strong count iff no managed holder
                // remains; the wrapper dies with this drop.
                let sole_holder = Arc::strong_count(&object) == 1;
                drop(object);
                sole_holder
            }
            // A weak record was never pinning anything; the answer is
            // whether the wrapper is already gone.
            None => self.object().is_none(),
            Some(Holder::Weak(_)) => unreachable!(),
        }
    }

    /// Replaces the held wrapper in place. Used when a live handle outlives
    /// its wrapper and a new one is built over the same record.
    pub(crate) fn rebind(&self, object: &Arc<dyn BoundObject>, kind: BindingKind) {
        let next = match kind {
            BindingKind::Strong => Holder::Strong(Arc::clone(object)),
            BindingKind::Weak => Holder::Weak(Arc::downgrade(object)),
        };
        let previous = {
            let mut holder = self.lock();
            mem::replace(&mut *holder, next)
        };
        drop(previous);
    }

    // Holder swaps are single operations, so a poisoned lock still guards a
    // coherent value.
    fn lock(&self) -> MutexGuard<'_, Holder> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, live) = match &*self.lock() {
            Holder::Strong(_) => (BindingKind::Strong, true),
            Holder::Weak(weak) => (BindingKind::Weak, weak.strong_count() > 0),
        };
        write!(f, "BindingRecord {{ kind: {kind:?}, live: {live} }}")
    }
}
