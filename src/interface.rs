//! Safe wrapper over the host's function table.
//!
//! The host hands an extension one [`sys::HostApi`] at load time, together
//! with the token identifying the library. [`HostInterface::install`] stores
//! both for the life of the process; every native call the crate makes goes
//! through the typed methods here, which keep the unsafe blocks in one place.

use std::ffi::{CStr, c_char};
use std::fmt;
use std::sync::OnceLock;

use mooring_sys as sys;

use crate::error::{BridgeError, BridgeResult, CallFailure};
use crate::object::NativeHandle;
use crate::string_name::StringName;
use crate::variant::Variant;

static HOST: OnceLock<HostInterface> = OnceLock::new();

/// Longest class name the fallback query is expected to produce.
const CLASS_NAME_BUF: usize = 256;

/// The installed host function table plus this library's token.
pub struct HostInterface {
    api: sys::HostApi,
    library: sys::RawLibraryPtr,
}

// The table holds plain function pointers and the library token is an opaque
// address; neither is dereferenced as data.
unsafe impl Send for HostInterface {}
unsafe impl Sync for HostInterface {}

impl HostInterface {
    /// Installs the host table for the rest of the process. Called once from
    /// the extension entry point, before anything else touches the bridge.
    ///
    /// # Safety
    ///
    /// `api` must be a valid host table whose entries stay callable for the
    /// rest of the process, and `library` must be the token the host issued
    /// for this extension.
    pub unsafe fn install(api: &sys::HostApi, library: sys::RawLibraryPtr) -> BridgeResult<()> {
        HOST.set(HostInterface { api: *api, library })
            .map_err(|_| BridgeError::HostAlreadyInstalled)
    }

    /// The installed interface. Faults when nothing is installed, since no
    /// binding operation can proceed without the host.
    pub fn get() -> &'static HostInterface {
        match HOST.get() {
            Some(host) => host,
            None => crate::fault!("host interface used before it was installed"),
        }
    }

    pub fn try_get() -> Option<&'static HostInterface> {
        HOST.get()
    }

    pub fn library(&self) -> sys::RawLibraryPtr {
        self.library
    }

    // Class database -------------------------------------------------------

    /// Asks the host to construct a native object of `class_name`. `None`
    /// when the host does not know the class.
    pub fn construct_object(&self, class_name: &StringName) -> Option<NativeHandle> {
        let raw = unsafe { (self.api.classdb_construct_object)(class_name.as_ptr()) };
        NativeHandle::new(raw)
    }

    pub fn destroy_object(&self, handle: NativeHandle) {
        unsafe { (self.api.object_destroy)(handle.as_ptr()) }
    }

    /// Non-null when the host's class database already knows `class_name`,
    /// whether as a built-in or through another extension.
    pub fn class_tag(&self, class_name: &StringName) -> sys::RawClassTag {
        unsafe { (self.api.classdb_get_class_tag)(class_name.as_ptr()) }
    }

    pub(crate) fn register_class(
        &self,
        class_name: &StringName,
        parent_name: &StringName,
        info: &sys::ClassCreationInfo,
    ) {
        unsafe {
            (self.api.classdb_register_class)(
                self.library,
                class_name.as_ptr(),
                parent_name.as_ptr(),
                info,
            )
        }
    }

    pub(crate) fn unregister_class(&self, class_name: &StringName) {
        unsafe { (self.api.classdb_unregister_class)(self.library, class_name.as_ptr()) }
    }

    pub(crate) fn register_method(&self, class_name: &StringName, info: &sys::RawMethodInfo) {
        unsafe { (self.api.classdb_register_class_method)(self.library, class_name.as_ptr(), info) }
    }

    pub(crate) fn register_property(
        &self,
        class_name: &StringName,
        info: &sys::RawPropertyInfo,
        setter: &StringName,
        getter: &StringName,
    ) {
        unsafe {
            (self.api.classdb_register_class_property)(
                self.library,
                class_name.as_ptr(),
                info,
                setter.as_ptr(),
                getter.as_ptr(),
            )
        }
    }

    pub(crate) fn register_property_group(
        &self,
        class_name: &StringName,
        group_name: &StringName,
        prefix: &StringName,
    ) {
        unsafe {
            (self.api.classdb_register_class_property_group)(
                self.library,
                class_name.as_ptr(),
                group_name.as_ptr(),
                prefix.as_ptr(),
            )
        }
    }

    pub(crate) fn register_property_subgroup(
        &self,
        class_name: &StringName,
        subgroup_name: &StringName,
        prefix: &StringName,
    ) {
        unsafe {
            (self.api.classdb_register_class_property_subgroup)(
                self.library,
                class_name.as_ptr(),
                subgroup_name.as_ptr(),
                prefix.as_ptr(),
            )
        }
    }

    pub(crate) fn register_signal(
        &self,
        class_name: &StringName,
        signal_name: &StringName,
        arguments: &[sys::RawPropertyInfo],
    ) {
        unsafe {
            (self.api.classdb_register_class_signal)(
                self.library,
                class_name.as_ptr(),
                signal_name.as_ptr(),
                arguments.as_ptr(),
                arguments.len() as i64,
            )
        }
    }

    // Instance wiring -------------------------------------------------------

    pub(crate) fn set_instance(
        &self,
        handle: NativeHandle,
        class_name: &StringName,
        instance: sys::RawInstancePtr,
    ) {
        unsafe { (self.api.object_set_instance)(handle.as_ptr(), class_name.as_ptr(), instance) }
    }

    pub(crate) fn set_instance_binding(
        &self,
        handle: NativeHandle,
        binding: sys::RawBindingPtr,
        callbacks: &'static sys::InstanceBindingCallbacks,
    ) {
        unsafe {
            (self.api.object_set_instance_binding)(handle.as_ptr(), self.library, binding, callbacks)
        }
    }

    /// The binding pointer the host carries for `handle`, or null.
    pub fn instance_binding(&self, handle: NativeHandle) -> sys::RawBindingPtr {
        unsafe { (self.api.object_get_instance_binding)(handle.as_ptr(), self.library) }
    }

    /// Resolves the native class name of `handle`, preferring the host's
    /// fast query and falling back to the bounded buffer query on hosts that
    /// predate it. Returns an empty name when the host cannot answer.
    pub fn object_class_name(&self, handle: NativeHandle) -> StringName {
        if let Some(fast_query) = self.api.object_get_class_name {
            let mut out: *const c_char = std::ptr::null();
            let ok = unsafe { fast_query(handle.as_ptr(), self.library, &mut out) };
            if ok != 0 && !out.is_null() {
                return StringName::from_cstr(unsafe { CStr::from_ptr(out) });
            }
        }
        let mut buf = [0 as c_char; CLASS_NAME_BUF];
        let len =
            unsafe { (self.api.object_query_class)(handle.as_ptr(), buf.as_mut_ptr(), buf.len()) };
        if len <= 0 {
            return StringName::new("");
        }
        StringName::from_cstr(unsafe { CStr::from_ptr(buf.as_ptr()) })
    }

    // Script surface --------------------------------------------------------

    pub fn has_script_method(&self, handle: NativeHandle, method: &StringName) -> bool {
        unsafe { (self.api.object_has_script_method)(handle.as_ptr(), method.as_ptr()) != 0 }
    }

    /// Invokes a script-provided method on the object behind `handle`.
    pub fn call_script_method(
        &self,
        handle: NativeHandle,
        method: &StringName,
        args: &[Variant],
    ) -> Result<Variant, CallFailure> {
        let arg_ptrs: Vec<sys::ConstVariantPtr> = args.iter().map(Variant::as_raw).collect();
        let mut ret = Variant::nil();
        let mut error = sys::RawCallError::ok();
        unsafe {
            (self.api.object_call_script_method)(
                handle.as_ptr(),
                method.as_ptr(),
                arg_ptrs.as_ptr(),
                arg_ptrs.len() as i64,
                ret.as_raw_mut(),
                &mut error,
            )
        };
        match CallFailure::from_raw(&error) {
            None => Ok(ret),
            Some(failure) => Err(failure),
        }
    }

    // Callables and variants ------------------------------------------------

    pub(crate) fn callable_create(&self, info: &sys::CallableCustomInfo) -> Variant {
        let mut out = Variant::nil();
        unsafe { (self.api.callable_custom_create)(out.as_raw_mut(), info) };
        out
    }

    pub(crate) fn variant_copy(&self, dst: sys::MutVariantPtr, src: sys::ConstVariantPtr) {
        unsafe { (self.api.variant_new_copy)(dst, src) }
    }

    pub(crate) fn variant_destroy(&self, variant: sys::MutVariantPtr) {
        unsafe { (self.api.variant_destroy)(variant) }
    }
}

impl fmt::Debug for HostInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostInterface {{ library: {:p} }}", self.library)
    }
}

/// Shorthand used across the crate.
pub(crate) fn host() -> &'static HostInterface {
    HostInterface::get()
}
