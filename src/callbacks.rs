//! The `extern "C"` surface handed to the host.
//!
//! Class callbacks arrive with the `class_userdata` pointer registered in
//! [`crate::registry`]; binding callbacks arrive with the record pointer the
//! bridge installed through `object_set_instance_binding`. Neither pointer
//! is dereferenced until checked.
//!
//! Faults raised in here panic across an `extern "C"` boundary, which
//! aborts the process. That is the intended behavior for the invariants
//! checked below; none of them are recoverable mid-callback.

use std::ffi::{CStr, c_char, c_void};
use std::sync::Arc;

use mooring_sys as sys;

use crate::binding::record::BindingRecord;
use crate::binding::table::bindings;
use crate::interface::host;
use crate::object::{InitContext, InitOrigin, NativeHandle, bind_object};
use crate::property::PropertyInfo;
use crate::registry::ClassRecord;
use crate::string_name::StringName;

/// Binding callbacks for wrappers whose class the host ships.
pub fn framework_binding_callbacks() -> &'static sys::InstanceBindingCallbacks {
    static CALLBACKS: sys::InstanceBindingCallbacks = sys::InstanceBindingCallbacks {
        create: Some(framework_binding_create),
        free: Some(binding_free),
        reference: Some(binding_reference),
    };
    &CALLBACKS
}

/// Binding callbacks for user classes registered by this library.
pub fn user_binding_callbacks() -> &'static sys::InstanceBindingCallbacks {
    static CALLBACKS: sys::InstanceBindingCallbacks = sys::InstanceBindingCallbacks {
        create: Some(user_binding_create),
        free: Some(binding_free),
        reference: Some(binding_reference),
    };
    &CALLBACKS
}

/// # Safety
///
/// `class_userdata` must be the pointer registered for the class, which is
/// a leaked `Arc<ClassRecord>` kept alive until unregistration.
unsafe fn class_record<'a>(class_userdata: *mut c_void) -> &'a ClassRecord {
    if class_userdata.is_null() {
        crate::fault!("class callback received a null class pointer");
    }
    unsafe { &*(class_userdata as *const ClassRecord) }
}

/// # Safety
///
/// `binding` must be null or a record pointer installed by this bridge and
/// not yet freed.
unsafe fn record_at<'a>(binding: sys::RawBindingPtr) -> Option<&'a BindingRecord> {
    if binding.is_null() {
        None
    } else {
        Some(unsafe { &*(binding as *const BindingRecord) })
    }
}

/// Host-initiated construction of a user class: builds the native object
/// and its wrapper together and returns the binding record pointer.
///
/// # Safety
///
/// Called by the host with the registered `class_userdata`.
pub unsafe extern "C" fn create_instance(class_userdata: *mut c_void) -> sys::RawBindingPtr {
    let class = unsafe { class_record(class_userdata) };
    let engine_class = class.engine_class().clone();
    let Some(handle) = host().construct_object(&engine_class) else {
        crate::fault!("host could not construct an object of class {engine_class}");
    };
    let object = (class.constructor())();
    bind_object(
        &object,
        InitContext {
            handle,
            origin: InitOrigin::FromNativeSide,
        },
    );
    object.object_base().record_ptr() as sys::RawBindingPtr
}

/// Rebuilds a wrapper over a native object the host kept alive across an
/// extension reload.
///
/// # Safety
///
/// Called by the host with the registered `class_userdata`; `object` must
/// be null or a live object of this class.
pub unsafe extern "C" fn recreate_instance(
    class_userdata: *mut c_void,
    object: sys::RawObjectPtr,
) -> sys::RawBindingPtr {
    let class = unsafe { class_record(class_userdata) };
    let Some(handle) = NativeHandle::new(object) else {
        tracing::warn!(class = %class.name(), "recreate requested for a null object");
        return std::ptr::null_mut();
    };
    let wrapper = (class.constructor())();
    bind_object(
        &wrapper,
        InitContext {
            handle,
            origin: InitOrigin::FromNativeSide,
        },
    );
    wrapper.object_base().record_ptr() as sys::RawBindingPtr
}

/// Per-class instance release hook. Wrapper teardown happens in
/// [`binding_free`]; nothing class-owned remains to release here.
///
/// # Safety
///
/// Called by the host with the registered `class_userdata`.
pub unsafe extern "C" fn free_instance(class_userdata: *mut c_void, binding: sys::RawBindingPtr) {
    let class = unsafe { class_record(class_userdata) };
    tracing::trace!(class = %class.name(), ?binding, "instance released by the host");
}

/// Resolves an overridden virtual method to its trampoline.
///
/// # Safety
///
/// Called by the host with the registered `class_userdata`; `name` must be
/// null or a NUL-terminated string.
pub unsafe extern "C" fn get_virtual(
    class_userdata: *mut c_void,
    name: *const c_char,
) -> Option<sys::VirtualCallFn> {
    let class = unsafe { class_record(class_userdata) };
    if name.is_null() {
        return None;
    }
    let name = StringName::from_cstr(unsafe { CStr::from_ptr(name) });
    class.virtual_override(&name)
}

/// Delivers an engine notification. Unbound or dead bindings are skipped.
///
/// # Safety
///
/// `binding` must be null or a live record pointer installed by this
/// bridge.
pub unsafe extern "C" fn notification(binding: sys::RawBindingPtr, what: i32, reversed: u8) {
    let Some(record) = (unsafe { record_at(binding) }) else {
        return;
    };
    let Some(object) = record.object() else {
        return;
    };
    object.notification(what, reversed != 0);
}

/// Lets the wrapper rewrite property metadata in place. Only the scalar
/// fields are written back; the host owns the strings.
///
/// # Safety
///
/// `binding` must be null or a live record pointer; `property` must be
/// null or a valid property description.
pub unsafe extern "C" fn validate_property(
    binding: sys::RawBindingPtr,
    property: *mut sys::RawPropertyInfo,
) -> u8 {
    if property.is_null() {
        return 0;
    }
    let Some(record) = (unsafe { record_at(binding) }) else {
        return 0;
    };
    let Some(object) = record.object() else {
        return 0;
    };
    let mut info = unsafe { PropertyInfo::from_raw(&*property) };
    if object.validate(&mut info) {
        info.write_scalars(unsafe { &mut *property });
        1
    } else {
        0
    }
}

/// The host asked for a binding no wrapper has installed yet. The canonical
/// record arrives through `object_set_instance_binding` when a wrapper is
/// first built; until then the object's own address stands in.
///
/// # Safety
///
/// Called by the host; `object` is passed through untouched.
pub unsafe extern "C" fn framework_binding_create(
    token: *mut c_void,
    object: sys::RawObjectPtr,
) -> sys::RawBindingPtr {
    let _ = token;
    tracing::trace!(?object, "framework binding requested by the host");
    object
}

/// User-class bindings are installed eagerly at construction; the host
/// never needs to create one.
///
/// # Safety
///
/// Called by the host.
pub unsafe extern "C" fn user_binding_create(
    token: *mut c_void,
    object: sys::RawObjectPtr,
) -> sys::RawBindingPtr {
    let _ = (token, object);
    std::ptr::null_mut()
}

/// The host destroyed the object carrying `binding`: drop the table entry
/// and invalidate the wrapper.
///
/// A null `binding` means the host never materialized one for this object
/// and there is nothing to tear down. A non-null binding with no table
/// entry, or one that does not match the table's record, is a fault.
///
/// # Safety
///
/// Called by the host exactly once per installed binding.
pub unsafe extern "C" fn binding_free(
    token: *mut c_void,
    object: sys::RawObjectPtr,
    binding: sys::RawBindingPtr,
) {
    let _ = token;
    let Some(handle) = NativeHandle::new(object) else {
        crate::fault!("binding free received a null object");
    };
    if binding.is_null() {
        return;
    }
    let Some(record) = bindings().remove(handle) else {
        crate::fault!("no binding registered for freed handle {handle:?}");
    };
    if !std::ptr::eq(Arc::as_ptr(&record), binding as *const BindingRecord) {
        crate::fault!("binding freed for handle {handle:?} does not match its registered record");
    }
    if let Some(object) = record.object() {
        object.object_base().clear();
    }
    tracing::trace!(?handle, "binding freed");
    drop(record);
}

/// Reference-count boundary crossing for ref-counted objects.
///
/// The host acquiring its first external reference pins the wrapper; the
/// host releasing its last one unpins it, and the return value reports
/// whether the native object may be freed now.
///
/// # Safety
///
/// `binding` must be null or a live record pointer installed by this
/// bridge.
pub unsafe extern "C" fn binding_reference(
    token: *mut c_void,
    binding: sys::RawBindingPtr,
    is_last_reference: u8,
) -> u8 {
    let _ = token;
    let Some(record) = (unsafe { record_at(binding) }) else {
        return 1;
    };
    if is_last_reference == 0 {
        // A dead wrapper cannot be pinned; the host keeps its reference
        // either way.
        record.promote();
        1
    } else {
        u8::from(record.demote())
    }
}
