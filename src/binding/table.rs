//! The handle-to-record table.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use crate::binding::record::BindingRecord;
use crate::object::NativeHandle;

/// All live bindings, keyed by native handle.
///
/// This is the identity map of the bridge: at most one record per handle,
/// ever. Every mutation is a single map operation under the lock, and no
/// wrapper code runs while it is held.
pub struct BindingTable {
    entries: Mutex<FxHashMap<NativeHandle, Arc<BindingRecord>>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Registers the record for `handle`.
    ///
    /// A handle that is already bound is a fault: two wrappers would both
    /// believe they own the same native object.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn register(&self, handle: NativeHandle, record: Arc<BindingRecord>) {
        use std::collections::hash_map::Entry;
        let clash = {
            let mut entries = self.lock();
            match entries.entry(handle) {
                Entry::Occupied(_) => true,
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    false
                }
            }
        };
        if clash {
            crate::fault!("handle {handle:?} is already bound");
        }
        tracing::trace!(?handle, "binding registered");
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lookup(&self, handle: NativeHandle) -> Option<Arc<BindingRecord>> {
        self.lock().get(&handle).cloned()
    }

    /// Removes and returns the record for `handle`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn remove(&self, handle: NativeHandle) -> Option<Arc<BindingRecord>> {
        let removed = self.lock().remove(&handle);
        if removed.is_some() {
            tracing::trace!(?handle, "binding removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Single-operation critical sections stay coherent across a poisoning
    // panic.
    fn lock(&self) -> MutexGuard<'_, FxHashMap<NativeHandle, Arc<BindingRecord>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide table used by the binding entry points and the host
/// callback surface.
pub fn bindings() -> &'static BindingTable {
    static BINDINGS: OnceLock<BindingTable> = OnceLock::new();
    BINDINGS.get_or_init(BindingTable::new)
}
