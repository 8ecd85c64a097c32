//! Managed closures exposed to the host as custom callable values.
//!
//! A closure is boxed, its address becomes the callable's userdata, and two
//! trampolines translate the host's calling convention: one invokes the
//! closure, one reclaims the box when the host drops its last reference to
//! the callable.

use std::ffi::c_void;

use mooring_sys as sys;

use crate::interface::host;
use crate::variant::Variant;

/// Argument list for one callable invocation, borrowed from the host for
/// the duration of the call.
pub struct Arguments<'a> {
    slots: &'a [sys::ConstVariantPtr],
}

impl Arguments<'_> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The argument at `index`; `None` past the end or for a null slot.
    pub fn get(&self, index: usize) -> Option<&Variant> {
        let slot = *self.slots.get(index)?;
        if slot.is_null() {
            return None;
        }
        // Variant is a transparent wrapper over the raw variant, so a host
        // variant pointer is a variant reference.
        Some(unsafe { &*(slot as *const Variant) })
    }
}

struct CallableWrapper {
    function: Box<dyn Fn(&Arguments<'_>) -> Option<Variant> + Send + Sync>,
}

/// Wraps a closure as a host callable value.
///
/// The closure's result is copied into the host's return slot; `None`
/// leaves the slot untouched. The reported status is always success;
/// argument problems inside the closure surface as a nil result, not a
/// call error.
pub fn callable_from_fn<F>(function: F) -> Variant
where
    F: Fn(&Arguments<'_>) -> Option<Variant> + Send + Sync + 'static,
{
    let wrapper = Box::new(CallableWrapper {
        function: Box::new(function),
    });
    let info = sys::CallableCustomInfo {
        callable_userdata: Box::into_raw(wrapper) as *mut c_void,
        token: host().library(),
        call_func: Some(invoke_callable),
        free_func: Some(free_callable),
        hash_func: None,
        equal_func: None,
        to_string_func: None,
    };
    host().callable_create(&info)
}

unsafe extern "C" fn invoke_callable(
    userdata: *mut c_void,
    args: *const sys::ConstVariantPtr,
    arg_count: i64,
    ret: sys::MutVariantPtr,
    error: *mut sys::RawCallError,
) {
    if userdata.is_null() {
        return;
    }
    let wrapper = unsafe { &*(userdata as *const CallableWrapper) };
    let slots: &[sys::ConstVariantPtr] = if args.is_null() || arg_count <= 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(args, arg_count as usize) }
    };
    let arguments = Arguments { slots };
    if let Some(result) = (wrapper.function)(&arguments) {
        if !ret.is_null() {
            host().variant_copy(ret, result.as_raw());
        }
    }
    if !error.is_null() {
        unsafe { *error = sys::RawCallError::ok() };
    }
}

unsafe extern "C" fn free_callable(userdata: *mut c_void) {
    if userdata.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(userdata as *mut CallableWrapper) });
}
