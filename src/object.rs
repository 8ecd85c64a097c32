//! Managed wrappers around native objects.
//!
//! The bridge keeps exactly one wrapper per live native handle. Wrappers
//! embed an [`ObjectBase`] carrying the handle and the cached address of
//! their [`BindingRecord`]; the record in turn either owns the wrapper
//! (strong) or merely observes it (weak), depending on who constructed the
//! object and how the host manages its lifetime.
//!
//! Construction enters through three doors:
//!
//! * [`bind_new`]: managed code creates the native object and its wrapper.
//! * [`bind_existing`]: managed code adopts a handle it obtained elsewhere.
//! * [`get_or_init`]: the native side hands over a handle (call result,
//!   callback argument) and the canonical wrapper is resolved or built.

use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

use mooring_sys as sys;

use crate::binding::record::{BindingKind, BindingRecord};
use crate::binding::table::bindings;
use crate::callbacks;
use crate::error::CallFailure;
use crate::interface::host;
use crate::property::PropertyInfo;
use crate::registry::classes;
use crate::string_name::StringName;
use crate::variant::Variant;

/// Address of a native object. Never dereferenced on this side of the ABI;
/// it is passed back to the host and used as an identity key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonNull<c_void>);

// Used purely as an address.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

impl NativeHandle {
    /// Wraps a raw object pointer; `None` for null.
    pub fn new(raw: sys::RawObjectPtr) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub fn as_ptr(self) -> sys::RawObjectPtr {
        self.0.as_ptr()
    }

    /// The handle's address, doubling as a stable object id.
    pub fn id(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.id())
    }
}

/// Which side initiated a wrapper's construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOrigin {
    /// Managed code constructed the object (and usually the native instance
    /// with it).
    FromManagedSide,
    /// The native side handed over an existing object to wrap.
    FromNativeSide,
}

/// How the host manages a native object's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifetimeKind {
    /// Freed only by an explicit destroy call.
    Manual,
    /// Freed by the host's reference counting.
    RefCounted,
    /// Owned by a host container; never freed from this side.
    HostManaged,
}

impl InitOrigin {
    /// The record kind a fresh wrapper starts with.
    ///
    /// Managed-side construction of a ref-counted object starts weak: the
    /// returned wrapper is the only holder and the host has not taken a
    /// reference yet, so managed code alone decides how long it lives.
    /// Every other combination pins the wrapper until the host tears the
    /// binding down.
    pub(crate) fn binding_kind(self, lifetime: LifetimeKind) -> BindingKind {
        match (self, lifetime) {
            (InitOrigin::FromManagedSide, LifetimeKind::RefCounted) => BindingKind::Weak,
            _ => BindingKind::Strong,
        }
    }
}

/// Construction context handed through the binding path.
#[derive(Clone, Copy, Debug)]
pub struct InitContext {
    pub handle: NativeHandle,
    pub origin: InitOrigin,
}

/// State embedded in every wrapper: the native handle and the cached address
/// of the wrapper's binding record.
///
/// Both fields are cleared when the host frees the object; a cleared base is
/// what makes a wrapper invalid.
pub struct ObjectBase {
    handle: AtomicPtr<c_void>,
    record: AtomicPtr<BindingRecord>,
}

impl ObjectBase {
    /// A base not attached to anything yet. The binding entry points attach
    /// the handle before the wrapper is handed to anyone.
    pub fn unbound() -> Self {
        Self {
            handle: AtomicPtr::new(std::ptr::null_mut()),
            record: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// The native handle, while the wrapper is valid.
    pub fn handle(&self) -> Option<NativeHandle> {
        NativeHandle::new(self.handle.load(Ordering::Acquire))
    }

    /// Whether the native object is still attached.
    pub fn is_valid(&self) -> bool {
        !self.handle.load(Ordering::Acquire).is_null()
    }

    /// Stable id of the underlying object, or zero when invalid.
    pub fn instance_id(&self) -> usize {
        self.handle.load(Ordering::Acquire) as usize
    }

    pub(crate) fn attach(&self, handle: NativeHandle, record: *const BindingRecord) {
        self.handle.store(handle.as_ptr(), Ordering::Release);
        self.record.store(record.cast_mut(), Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.handle.store(std::ptr::null_mut(), Ordering::Release);
        self.record.store(std::ptr::null_mut(), Ordering::Release);
    }

    /// Cached address of the binding record; what create and recreate hand
    /// back to the host without a table query.
    pub(crate) fn record_ptr(&self) -> *mut BindingRecord {
        self.record.load(Ordering::Acquire)
    }
}

impl PartialEq for ObjectBase {
    /// Wrappers are equal when they point at the same native object.
    /// Invalidated wrappers all compare equal to each other.
    fn eq(&self, other: &Self) -> bool {
        self.handle.load(Ordering::Acquire) == other.handle.load(Ordering::Acquire)
    }
}

impl Eq for ObjectBase {}

impl Hash for ObjectBase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.instance_id());
    }
}

impl fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle() {
            Some(handle) => write!(f, "ObjectBase({handle:?})"),
            None => f.write_str("ObjectBase(invalid)"),
        }
    }
}

/// One overridden virtual method: its name and the generated trampoline the
/// host will call for it.
#[derive(Clone, Debug)]
pub struct VirtualOverride {
    pub name: StringName,
    pub call: sys::VirtualCallFn,
}

/// A managed type bound to a native class.
///
/// Framework wrappers return their own name from both `class_name` and
/// `engine_class_name`. User classes return their own name from the former
/// and the name of the framework class they extend from the latter; that is
/// also the class the host actually constructs for them.
pub trait HostClass: Sized + Send + Sync + 'static {
    /// Name this type is known by in the class database.
    fn class_name() -> StringName;

    /// Nearest framework class.
    fn engine_class_name() -> StringName;

    /// Parent class reported at registration.
    fn parent_class_name() -> StringName;

    /// How the host manages instances of the engine class.
    fn lifetime_kind() -> LifetimeKind {
        LifetimeKind::Manual
    }

    /// Builds the wrapper around an unbound base.
    fn construct(base: ObjectBase) -> Self;

    fn base(&self) -> &ObjectBase;

    /// Virtual methods this type overrides. Collected into a per-class map
    /// at registration, so lookups from the host are a single map probe.
    fn implemented_overrides() -> Vec<VirtualOverride> {
        Vec::new()
    }

    /// Engine notification hook.
    fn on_notification(&self, what: i32, reversed: bool) {
        let _ = (what, reversed);
    }

    /// Property metadata hook. Return `true` after changing `property` to
    /// have its scalar fields written back to the host.
    fn validate_property(&self, property: &mut PropertyInfo) -> bool {
        let _ = property;
        false
    }
}

/// Object-safe view of any bound wrapper. Implemented for every
/// [`HostClass`] type through a blanket impl; the binding table and the
/// callback surface only ever see this trait.
pub trait BoundObject: Any + Send + Sync {
    fn object_base(&self) -> &ObjectBase;
    fn class_name(&self) -> StringName;
    fn engine_class_name(&self) -> StringName;
    fn lifetime_kind(&self) -> LifetimeKind;
    fn notification(&self, what: i32, reversed: bool);
    fn validate(&self, property: &mut PropertyInfo) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Whether the native object is still attached.
    fn is_valid(&self) -> bool {
        self.object_base().is_valid()
    }

    /// Whether this wrapper's class differs from the engine class backing
    /// it.
    fn is_user_class(&self) -> bool {
        self.class_name() != self.engine_class_name()
    }

    /// Destroys the native object behind a manually managed wrapper.
    ///
    /// Misuse is reported and ignored: ref-counted and host-owned objects
    /// cannot be destroyed from here, and an invalid wrapper has nothing
    /// left to destroy.
    fn release(&self) {
        match self.lifetime_kind() {
            LifetimeKind::RefCounted => {
                tracing::warn!(
                    class = %self.class_name(),
                    "release() ignored: the host frees ref-counted objects when the last reference drops"
                );
            }
            LifetimeKind::HostManaged => {
                tracing::warn!(
                    class = %self.class_name(),
                    "release() ignored: the host owns this object; remove it through the host instead"
                );
            }
            LifetimeKind::Manual => match self.object_base().handle() {
                Some(handle) => host().destroy_object(handle),
                None => {
                    tracing::warn!(
                        class = %self.class_name(),
                        "release() ignored: wrapper is already invalid"
                    );
                }
            },
        }
    }

    /// Whether a script attached to the native object implements `method`.
    fn has_script_method(&self, method: &StringName) -> bool {
        match self.object_base().handle() {
            Some(handle) => host().has_script_method(handle, method),
            None => false,
        }
    }

    /// Calls a script-provided method on the native object.
    fn call_script_method(
        &self,
        method: &StringName,
        args: &[Variant],
    ) -> Result<Variant, CallFailure> {
        match self.object_base().handle() {
            Some(handle) => host().call_script_method(handle, method, args),
            None => Err(CallFailure::instance_is_null()),
        }
    }
}

impl<T: HostClass> BoundObject for T {
    fn object_base(&self) -> &ObjectBase {
        HostClass::base(self)
    }

    fn class_name(&self) -> StringName {
        T::class_name()
    }

    fn engine_class_name(&self) -> StringName {
        T::engine_class_name()
    }

    fn lifetime_kind(&self) -> LifetimeKind {
        T::lifetime_kind()
    }

    fn notification(&self, what: i32, reversed: bool) {
        HostClass::on_notification(self, what, reversed);
    }

    fn validate(&self, property: &mut PropertyInfo) -> bool {
        HostClass::validate_property(self, property)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Erased allocation of a `T` around an unbound base. Stored per class in
/// the registry as that class's constructor.
pub(crate) fn construct_erased<T: HostClass>() -> Arc<dyn BoundObject> {
    Arc::new(T::construct(ObjectBase::unbound()))
}

/// Registers `object` for `context.handle` and wires the native side.
///
/// The table entry is created before any native call, so binding the same
/// handle twice faults before the host ever observes the new record.
pub(crate) fn bind_object(object: &Arc<dyn BoundObject>, context: InitContext) {
    let kind = context.origin.binding_kind(object.lifetime_kind());
    let record = match kind {
        BindingKind::Strong => Arc::new(BindingRecord::strong(Arc::clone(object))),
        BindingKind::Weak => Arc::new(BindingRecord::weak(object)),
    };
    let record_ptr = Arc::as_ptr(&record);
    bindings().register(context.handle, record);
    object.object_base().attach(context.handle, record_ptr);

    // The record address doubles as the instance payload: anything the host
    // hands back later resolves to the wrapper without a table query.
    let instance = record_ptr as sys::RawInstancePtr;
    if object.is_user_class() {
        let class_name = object.class_name();
        host().set_instance(context.handle, &class_name, instance);
        host().set_instance_binding(context.handle, instance, callbacks::user_binding_callbacks());
    } else {
        host().set_instance_binding(
            context.handle,
            instance,
            callbacks::framework_binding_callbacks(),
        );
    }

    tracing::debug!(
        class = %object.class_name(),
        handle = ?context.handle,
        ?kind,
        origin = ?context.origin,
        "object bound"
    );
}

/// Creates a fresh native object of `T`'s engine class and binds a wrapper
/// to it. This is the managed-side constructor.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn bind_new<T: HostClass>() -> Arc<T> {
    let engine_class = T::engine_class_name();
    let Some(handle) = host().construct_object(&engine_class) else {
        crate::fault!("host could not construct an object of class {engine_class}");
    };
    let object = Arc::new(T::construct(ObjectBase::unbound()));
    let erased: Arc<dyn BoundObject> = object.clone();
    bind_object(
        &erased,
        InitContext {
            handle,
            origin: InitOrigin::FromManagedSide,
        },
    );
    object
}

/// Binds a wrapper over a native object the caller already holds a handle
/// to. Faults if the handle is already bound.
pub fn bind_existing<T: HostClass>(handle: NativeHandle) -> Arc<T> {
    let object = Arc::new(T::construct(ObjectBase::unbound()));
    let erased: Arc<dyn BoundObject> = object.clone();
    bind_object(
        &erased,
        InitContext {
            handle,
            origin: InitOrigin::FromManagedSide,
        },
    );
    object
}

/// The canonical wrapper for `handle`, if one is bound and alive. Performs
/// no construction.
pub fn bound_object(handle: NativeHandle) -> Option<Arc<dyn BoundObject>> {
    bindings().lookup(handle).and_then(|record| record.object())
}

/// Resolves the wrapper for `handle`, building one if none exists.
///
/// This is the single entry point for objects arriving from the native
/// side: call results, callback arguments, scene queries. A second call
/// with the same live handle returns the same wrapper, which keeps managed
/// identity aligned with native identity. New wrappers are built from the
/// most specific class the registry knows for the handle's native class
/// name, defaulting to `T` itself for unregistered names.
///
/// Faults when the resulting wrapper is not exactly a `T`; callers that do
/// not know the concrete type use [`bound_object`] instead.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn get_or_init<T: HostClass>(handle: NativeHandle) -> Arc<T> {
    if let Some(record) = bindings().lookup(handle) {
        if let Some(existing) = record.object() {
            return downcast_or_fault::<T>(existing, handle);
        }
        // The wrapper died while the native object lived on. Build a
        // replacement into the same record so the binding pointer the host
        // carries stays valid.
        let object = construct_for_handle::<T>(handle);
        let kind = InitOrigin::FromNativeSide.binding_kind(object.lifetime_kind());
        record.rebind(&object, kind);
        object.object_base().attach(handle, Arc::as_ptr(&record));
        if object.is_user_class() {
            let class_name = object.class_name();
            host().set_instance(
                handle,
                &class_name,
                Arc::as_ptr(&record) as sys::RawInstancePtr,
            );
        }
        tracing::debug!(class = %object.class_name(), ?handle, "wrapper rebuilt over a live handle");
        return downcast_or_fault::<T>(object, handle);
    }

    let object = construct_for_handle::<T>(handle);
    bind_object(
        &object,
        InitContext {
            handle,
            origin: InitOrigin::FromNativeSide,
        },
    );
    downcast_or_fault::<T>(object, handle)
}

/// Builds the most specific wrapper the registry knows for `handle`,
/// defaulting to `T` itself when the native class name is not registered.
fn construct_for_handle<T: HostClass>(handle: NativeHandle) -> Arc<dyn BoundObject> {
    let class_name = host().object_class_name(handle);
    match classes().resolve(&class_name) {
        Some(class) => (class.constructor())(),
        None => construct_erased::<T>(),
    }
}

fn downcast_or_fault<T: HostClass>(object: Arc<dyn BoundObject>, handle: NativeHandle) -> Arc<T> {
    let found = object.class_name();
    match object.into_any().downcast::<T>() {
        Ok(object) => object,
        Err(_) => {
            let expected = T::class_name();
            crate::fault!("handle {handle:?} is bound to {found}, not {expected}");
        }
    }
}
