//! Raw C-ABI surface of the host extension interface.
//!
//! Everything in this crate mirrors the host's extension header one to one:
//! opaque pointer aliases, the function-pointer table the host hands to an
//! extension at load time, and the `#[repr(C)]` info structs exchanged during
//! class registration, instance binding and custom-callable creation.
//!
//! Nothing here is called directly by user code. The `mooring` crate wraps
//! this table in a safe interface and owns all pointer discipline; this crate
//! only guarantees layout.

use std::ffi::{c_char, c_void};

/// Opaque native object handle. Owned by the host; never dereferenced here.
pub type RawObjectPtr = *mut c_void;

/// Opaque token identifying one loaded extension library to the host.
pub type RawLibraryPtr = *mut c_void;

/// Address of one binding record, carried by the host as an out-of-band
/// pointer attached to a native object.
pub type RawBindingPtr = *mut c_void;

/// Address of the managed instance backing a user-registered class.
pub type RawInstancePtr = *mut c_void;

/// Non-null when a class name is known to the host's class database.
pub type RawClassTag = *const c_void;

/// Size of the host's dynamic-value storage. Variants move across the ABI as
/// opaque blobs of exactly this size, by pointer.
pub const VARIANT_SIZE: usize = 24;

/// Opaque dynamic-value storage. All-zero bytes is the nil value.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawVariant {
    pub opaque: [u8; VARIANT_SIZE],
}

impl RawVariant {
    pub const fn zeroed() -> Self {
        Self {
            opaque: [0; VARIANT_SIZE],
        }
    }
}

impl Default for RawVariant {
    fn default() -> Self {
        Self::zeroed()
    }
}

pub type ConstVariantPtr = *const RawVariant;
pub type MutVariantPtr = *mut RawVariant;

// Call status codes written into `RawCallError.status`.
pub const CALL_OK: i32 = 0;
pub const CALL_ERROR_INVALID_METHOD: i32 = 1;
pub const CALL_ERROR_INVALID_ARGUMENT: i32 = 2;
pub const CALL_ERROR_TOO_MANY_ARGUMENTS: i32 = 3;
pub const CALL_ERROR_TOO_FEW_ARGUMENTS: i32 = 4;
pub const CALL_ERROR_INSTANCE_IS_NULL: i32 = 5;
pub const CALL_ERROR_METHOD_NOT_CONST: i32 = 6;

/// Out-parameter filled by the host (or by an extension trampoline) after a
/// dynamic call. `argument`/`expected` are only meaningful for the
/// argument-related statuses.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawCallError {
    pub status: i32,
    pub argument: i32,
    pub expected: i32,
}

impl RawCallError {
    pub const fn ok() -> Self {
        Self {
            status: CALL_OK,
            argument: -1,
            expected: -1,
        }
    }
}

// ---------------------------------------------------------------------------
// Function pointers installed per registered class.
// ---------------------------------------------------------------------------

/// Constructs a fresh instance of the class; returns its binding record.
pub type CreateInstanceFn = unsafe extern "C" fn(class_userdata: *mut c_void) -> RawBindingPtr;

/// Re-establishes an instance over a handle the host already owns (reload
/// path); returns the new binding record.
pub type RecreateInstanceFn =
    unsafe extern "C" fn(class_userdata: *mut c_void, object: RawObjectPtr) -> RawBindingPtr;

/// Releases per-instance state owned by the class itself. Binding teardown
/// happens through [`BindingFreeFn`], not here.
pub type FreeInstanceFn = unsafe extern "C" fn(class_userdata: *mut c_void, binding: RawBindingPtr);

/// Trampoline for one overridden virtual method. `args`/`ret` are marshaled
/// type pointers whose layout is a contract between host and the generated
/// call glue, not interpreted by the core.
pub type VirtualCallFn =
    unsafe extern "C" fn(instance: RawInstancePtr, args: *const *const c_void, ret: *mut c_void);

/// Resolves the trampoline for a virtual method name, or null for "not
/// overridden, use the base behavior".
pub type GetVirtualFn =
    unsafe extern "C" fn(class_userdata: *mut c_void, name: *const c_char) -> Option<VirtualCallFn>;

/// Delivers an engine notification to the instance behind `binding`.
pub type NotificationFn =
    unsafe extern "C" fn(binding: RawBindingPtr, what: i32, reversed: u8);

/// Lets the instance rewrite editor-facing property metadata in place.
/// Returns non-zero when anything changed.
pub type ValidatePropertyFn =
    unsafe extern "C" fn(binding: RawBindingPtr, property: *mut RawPropertyInfo) -> u8;

/// Per-class registration payload passed to `classdb_register_class`.
#[repr(C)]
pub struct ClassCreationInfo {
    pub is_exposed: u8,
    pub create_instance: Option<CreateInstanceFn>,
    pub recreate_instance: Option<RecreateInstanceFn>,
    pub free_instance: Option<FreeInstanceFn>,
    pub get_virtual: Option<GetVirtualFn>,
    pub notification: Option<NotificationFn>,
    pub validate_property: Option<ValidatePropertyFn>,
    /// Opaque per-class pointer echoed back through every callback above.
    pub class_userdata: *mut c_void,
}

// ---------------------------------------------------------------------------
// Instance binding.
// ---------------------------------------------------------------------------

/// Invoked when the host asks for a binding that does not exist yet.
pub type BindingCreateFn =
    unsafe extern "C" fn(token: *mut c_void, object: RawObjectPtr) -> RawBindingPtr;

/// Invoked once when the host destroys the object carrying the binding.
pub type BindingFreeFn =
    unsafe extern "C" fn(token: *mut c_void, object: RawObjectPtr, binding: RawBindingPtr);

/// Reference-count boundary transition. `is_last_reference == 0` means the
/// host just acquired its first external reference; non-zero means it just
/// released its last one. The return value answers "may the object be freed
/// now" (non-zero) or "the extension still needs it" (zero).
pub type BindingReferenceFn =
    unsafe extern "C" fn(token: *mut c_void, binding: RawBindingPtr, is_last_reference: u8) -> u8;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct InstanceBindingCallbacks {
    pub create: Option<BindingCreateFn>,
    pub free: Option<BindingFreeFn>,
    pub reference: Option<BindingReferenceFn>,
}

// ---------------------------------------------------------------------------
// Custom callables.
// ---------------------------------------------------------------------------

/// Invokes the wrapped closure. The trampoline writes the result into `ret`
/// (left untouched for void results) and the status into `error`.
pub type CallableCallFn = unsafe extern "C" fn(
    userdata: *mut c_void,
    args: *const ConstVariantPtr,
    arg_count: i64,
    ret: MutVariantPtr,
    error: *mut RawCallError,
);

/// Deallocates the wrapper. Called exactly once, when the host's reference
/// count on the callable value reaches zero.
pub type CallableFreeFn = unsafe extern "C" fn(userdata: *mut c_void);

pub type CallableHashFn = unsafe extern "C" fn(userdata: *mut c_void) -> u32;
pub type CallableEqualFn = unsafe extern "C" fn(a: *mut c_void, b: *mut c_void) -> u8;
pub type CallableToStringFn =
    unsafe extern "C" fn(userdata: *mut c_void, is_valid: *mut u8, out: *mut c_void);

/// Payload for `callable_custom_create`. Unset optional trampolines fall back
/// to host defaults.
#[repr(C)]
pub struct CallableCustomInfo {
    pub callable_userdata: *mut c_void,
    pub token: *mut c_void,
    pub call_func: Option<CallableCallFn>,
    pub free_func: Option<CallableFreeFn>,
    pub hash_func: Option<CallableHashFn>,
    pub equal_func: Option<CallableEqualFn>,
    pub to_string_func: Option<CallableToStringFn>,
}

// ---------------------------------------------------------------------------
// Member registration payloads.
// ---------------------------------------------------------------------------

/// Editor/serialization metadata for one property or one call argument.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawPropertyInfo {
    pub variant_type: u32,
    pub name: *const c_char,
    pub class_name: *const c_char,
    pub hint: u32,
    pub hint_string: *const c_char,
    pub usage: u32,
}

/// Dynamic (variant-based) method call trampoline.
pub type MethodCallFn = unsafe extern "C" fn(
    method_userdata: *mut c_void,
    instance: RawInstancePtr,
    args: *const ConstVariantPtr,
    arg_count: i64,
    ret: MutVariantPtr,
    error: *mut RawCallError,
);

/// Raw (pointer-based) method call trampoline used on hot paths.
pub type MethodPtrCallFn = unsafe extern "C" fn(
    method_userdata: *mut c_void,
    instance: RawInstancePtr,
    args: *const *const c_void,
    ret: *mut c_void,
);

#[repr(C)]
pub struct RawMethodInfo {
    pub name: *const c_char,
    pub method_userdata: *mut c_void,
    pub call_func: Option<MethodCallFn>,
    pub ptrcall_func: Option<MethodPtrCallFn>,
    pub method_flags: u32,
    pub has_return_value: u8,
    pub return_value_info: *const RawPropertyInfo,
    pub argument_count: u32,
    pub arguments_info: *const RawPropertyInfo,
}

// ---------------------------------------------------------------------------
// The host function table.
// ---------------------------------------------------------------------------

/// Fixed function-pointer table supplied by the host at extension load.
///
/// `object_get_class_name` is the only optional entry: older hosts predate
/// the fast query and extensions must fall back to `object_query_class`.
///
/// # Safety
///
/// Every function in this table is a raw host entry point. Callers must
/// uphold the host's contract for each: handles must be live, strings must
/// be NUL-terminated, and info structs must outlive the call.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostApi {
    pub classdb_construct_object: unsafe extern "C" fn(class_name: *const c_char) -> RawObjectPtr,
    pub classdb_register_class: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        parent_name: *const c_char,
        info: *const ClassCreationInfo,
    ),
    pub classdb_unregister_class:
        unsafe extern "C" fn(library: RawLibraryPtr, class_name: *const c_char),
    pub classdb_get_class_tag: unsafe extern "C" fn(class_name: *const c_char) -> RawClassTag,
    pub classdb_register_class_method: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        info: *const RawMethodInfo,
    ),
    pub classdb_register_class_property: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        info: *const RawPropertyInfo,
        setter: *const c_char,
        getter: *const c_char,
    ),
    pub classdb_register_class_property_group: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        group_name: *const c_char,
        prefix: *const c_char,
    ),
    pub classdb_register_class_property_subgroup: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        subgroup_name: *const c_char,
        prefix: *const c_char,
    ),
    pub classdb_register_class_signal: unsafe extern "C" fn(
        library: RawLibraryPtr,
        class_name: *const c_char,
        signal_name: *const c_char,
        arguments: *const RawPropertyInfo,
        argument_count: i64,
    ),
    pub object_destroy: unsafe extern "C" fn(object: RawObjectPtr),
    pub object_set_instance: unsafe extern "C" fn(
        object: RawObjectPtr,
        class_name: *const c_char,
        instance: RawInstancePtr,
    ),
    pub object_set_instance_binding: unsafe extern "C" fn(
        object: RawObjectPtr,
        token: *mut c_void,
        binding: RawBindingPtr,
        callbacks: *const InstanceBindingCallbacks,
    ),
    pub object_get_instance_binding:
        unsafe extern "C" fn(object: RawObjectPtr, token: *mut c_void) -> RawBindingPtr,
    /// Fast class-name query: writes a host-owned NUL-terminated name into
    /// `out` and returns non-zero on success. Absent on older hosts.
    pub object_get_class_name: Option<
        unsafe extern "C" fn(
            object: RawObjectPtr,
            library: RawLibraryPtr,
            out: *mut *const c_char,
        ) -> u8,
    >,
    /// Fallback class query: fills `buf` (NUL-terminated, truncating) and
    /// returns the name length, or a negative value on failure.
    pub object_query_class:
        unsafe extern "C" fn(object: RawObjectPtr, buf: *mut c_char, len: usize) -> isize,
    pub object_has_script_method:
        unsafe extern "C" fn(object: RawObjectPtr, method: *const c_char) -> u8,
    pub object_call_script_method: unsafe extern "C" fn(
        object: RawObjectPtr,
        method: *const c_char,
        args: *const ConstVariantPtr,
        arg_count: i64,
        ret: MutVariantPtr,
        error: *mut RawCallError,
    ),
    pub callable_custom_create:
        unsafe extern "C" fn(out: MutVariantPtr, info: *const CallableCustomInfo),
    pub variant_new_copy: unsafe extern "C" fn(dst: MutVariantPtr, src: ConstVariantPtr),
    pub variant_destroy: unsafe extern "C" fn(variant: MutVariantPtr),
}
