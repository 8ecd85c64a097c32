//! The class registry: every type the bridge can build a wrapper for.
//!
//! Framework classes are recorded locally so inbound handles resolve to the
//! most specific wrapper. User classes are additionally pushed into the
//! host's class database, which is when the host starts constructing them
//! through the callback surface in [`crate::callbacks`].

use std::any::TypeId;
use std::ffi::c_void;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use mooring_sys as sys;

use crate::callbacks;
use crate::interface::host;
use crate::object::{BoundObject, HostClass, LifetimeKind, VirtualOverride, construct_erased};
use crate::string_name::StringName;

/// Which side of the bridge a class originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Ships with the host; only wrapped, never registered with it.
    Framework,
    /// Defined by this library and registered into the host's database.
    User,
}

pub(crate) type Constructor = fn() -> Arc<dyn BoundObject>;

/// Everything the bridge knows about one registered class.
#[derive(Debug)]
pub struct ClassRecord {
    name: StringName,
    parent: StringName,
    engine_class: StringName,
    kind: ClassKind,
    lifetime: LifetimeKind,
    type_id: TypeId,
    constructor: Constructor,
    virtuals: FxHashMap<StringName, sys::VirtualCallFn>,
}

impl ClassRecord {
    fn of<T: HostClass>(kind: ClassKind) -> Self {
        let mut virtuals = FxHashMap::default();
        for VirtualOverride { name, call } in T::implemented_overrides() {
            virtuals.insert(name, call);
        }
        Self {
            name: T::class_name(),
            parent: T::parent_class_name(),
            engine_class: T::engine_class_name(),
            kind,
            lifetime: T::lifetime_kind(),
            type_id: TypeId::of::<T>(),
            constructor: construct_erased::<T>,
            virtuals,
        }
    }

    pub fn name(&self) -> &StringName {
        &self.name
    }

    pub fn parent(&self) -> &StringName {
        &self.parent
    }

    pub fn engine_class(&self) -> &StringName {
        &self.engine_class
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn lifetime(&self) -> LifetimeKind {
        self.lifetime
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The trampoline for an overridden virtual method, if this class
    /// overrides it.
    pub fn virtual_override(&self, name: &StringName) -> Option<sys::VirtualCallFn> {
        self.virtuals.get(name).copied()
    }

    pub fn virtual_count(&self) -> usize {
        self.virtuals.len()
    }

    pub(crate) fn constructor(&self) -> Constructor {
        self.constructor
    }
}

/// Invoked instead of registering when a class name is already taken.
/// The default handler faults.
pub type DuplicateClassHandler = Arc<dyn Fn(&StringName) + Send + Sync>;

struct RegistryState {
    framework: FxHashMap<StringName, Arc<ClassRecord>>,
    user: FxHashMap<StringName, Arc<ClassRecord>>,
    user_order: Vec<StringName>,
    on_duplicate: DuplicateClassHandler,
}

pub struct ClassRegistry {
    state: Mutex<RegistryState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                framework: FxHashMap::default(),
                user: FxHashMap::default(),
                user_order: Vec::new(),
                on_duplicate: Arc::new(|name| {
                    crate::fault!("class {name} is already registered");
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a framework class so inbound handles of its native class
    /// resolve to `T`. Makes no host calls.
    pub fn register_framework_class<T: HostClass>(&self) {
        let record = Arc::new(ClassRecord::of::<T>(ClassKind::Framework));
        let name = record.name.clone();
        let clash = {
            let mut state = self.lock();
            if state.framework.contains_key(&name) || state.user.contains_key(&name) {
                Some(Arc::clone(&state.on_duplicate))
            } else {
                state.framework.insert(name.clone(), record);
                None
            }
        };
        if let Some(handler) = clash {
            handler(&name);
            return;
        }
        tracing::trace!(class = %name, "framework class registered");
    }

    /// Registers a user class here and in the host's class database.
    ///
    /// On a name clash the duplicate handler runs and nothing is
    /// registered anywhere.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn register_user_class<T: HostClass>(&self) {
        let record = Arc::new(ClassRecord::of::<T>(ClassKind::User));
        let name = record.name.clone();

        // The host's database can know the name without us: builtin
        // classes, or a class another library registered.
        if !host().class_tag(&name).is_null() {
            let handler = Arc::clone(&self.lock().on_duplicate);
            handler(&name);
            return;
        }

        let clash = {
            let mut state = self.lock();
            if state.framework.contains_key(&name) || state.user.contains_key(&name) {
                Some(Arc::clone(&state.on_duplicate))
            } else {
                state.user.insert(name.clone(), Arc::clone(&record));
                state.user_order.push(name.clone());
                None
            }
        };
        if let Some(handler) = clash {
            handler(&name);
            return;
        }

        let info = creation_info_for(&record);
        host().register_class(&name, &record.parent, &info);
        tracing::debug!(class = %name, parent = %record.parent, "user class registered");
    }

    /// Removes a user class from both databases. Unknown names are
    /// reported and ignored.
    pub fn unregister_user_class<T: HostClass>(&self) {
        self.unregister_user_class_by_name(&T::class_name());
    }

    fn unregister_user_class_by_name(&self, name: &StringName) {
        let record = {
            let mut state = self.lock();
            let record = state.user.remove(name);
            if record.is_some() {
                state.user_order.retain(|entry| entry != name);
            }
            record
        };
        let Some(record) = record else {
            tracing::warn!(class = %name, "unregister ignored: class is not registered");
            return;
        };
        host().unregister_class(name);
        // Balances the reference leaked into class_userdata at
        // registration; the host hands out no more callbacks for this
        // class once it is unregistered.
        unsafe {
            drop(Arc::from_raw(Arc::as_ptr(&record)));
        }
        tracing::debug!(class = %name, "user class unregistered");
    }

    /// Unregisters every user class, most recently registered first, so
    /// classes never outlive ones they were declared after.
    pub fn unregister_all_user_classes(&self) {
        let names: Vec<StringName> = {
            let state = self.lock();
            state.user_order.iter().rev().cloned().collect()
        };
        for name in &names {
            self.unregister_user_class_by_name(name);
        }
    }

    /// Looks a class up by name across both partitions.
    pub fn resolve(&self, name: &StringName) -> Option<Arc<ClassRecord>> {
        let state = self.lock();
        state
            .framework
            .get(name)
            .or_else(|| state.user.get(name))
            .cloned()
    }

    pub fn is_registered(&self, name: &StringName) -> bool {
        let state = self.lock();
        state.framework.contains_key(name) || state.user.contains_key(name)
    }

    pub fn framework_class_count(&self) -> usize {
        self.lock().framework.len()
    }

    pub fn user_class_count(&self) -> usize {
        self.lock().user.len()
    }

    /// User class names in registration order.
    pub fn user_class_names(&self) -> Vec<StringName> {
        self.lock().user_order.clone()
    }

    /// Swaps in a new duplicate handler and returns the previous one.
    pub fn set_duplicate_class_handler(
        &self,
        handler: DuplicateClassHandler,
    ) -> DuplicateClassHandler {
        std::mem::replace(&mut self.lock().on_duplicate, handler)
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ClassRegistry")
            .field("framework_classes", &state.framework.len())
            .field("user_classes", &state.user.len())
            .finish()
    }
}

fn creation_info_for(record: &Arc<ClassRecord>) -> sys::ClassCreationInfo {
    sys::ClassCreationInfo {
        is_exposed: 1,
        create_instance: Some(callbacks::create_instance),
        recreate_instance: Some(callbacks::recreate_instance),
        free_instance: Some(callbacks::free_instance),
        get_virtual: Some(callbacks::get_virtual),
        notification: Some(callbacks::notification),
        validate_property: Some(callbacks::validate_property),
        // The host echoes this pointer into every class callback; the
        // matching release happens at unregistration.
        class_userdata: Arc::into_raw(Arc::clone(record)) as *mut c_void,
    }
}

/// The process-wide registry.
pub fn classes() -> &'static ClassRegistry {
    static CLASSES: OnceLock<ClassRegistry> = OnceLock::new();
    CLASSES.get_or_init(ClassRegistry::new)
}
