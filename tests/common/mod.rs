//! A scriptable in-process host for integration tests.
//!
//! The mock implements the full host function table over a table of
//! fabricated object addresses. Handles are identity keys only; nothing
//! here ever dereferences one. Captured class and binding callbacks are
//! invoked the way a real host would: never while the mock's own state
//! lock is held, since the bridge calls straight back into the table.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString, c_char, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use mooring::prelude::*;
use mooring::sys;

/// Token the bridge is installed with; every host call that carries a
/// library pointer is checked against it.
pub const LIBRARY_TOKEN: usize = 0x4d4f_4f52;

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0x1000);

// =============================================================================
// Mock state
// =============================================================================

struct NativeObject {
    class_name: String,
    alive: bool,
    instance: usize,
    instance_class: Option<String>,
    binding: usize,
    callbacks: Option<sys::InstanceBindingCallbacks>,
    script_methods: Vec<String>,
}

impl NativeObject {
    fn fresh(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            alive: true,
            instance: 0,
            instance_class: None,
            binding: 0,
            callbacks: None,
            script_methods: Vec::new(),
        }
    }
}

struct RegisteredClass {
    parent: String,
    is_exposed: u8,
    create: Option<sys::CreateInstanceFn>,
    recreate: Option<sys::RecreateInstanceFn>,
    free: Option<sys::FreeInstanceFn>,
    get_virtual: Option<sys::GetVirtualFn>,
    notification: Option<sys::NotificationFn>,
    validate: Option<sys::ValidatePropertyFn>,
    class_userdata: usize,
}

struct StoredCallable {
    userdata: usize,
    token: usize,
    call: Option<sys::CallableCallFn>,
    free: Option<sys::CallableFreeFn>,
}

/// One member registration observed by the mock, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberEvent {
    Group {
        class: String,
        name: String,
        prefix: String,
    },
    Subgroup {
        class: String,
        name: String,
        prefix: String,
    },
    Property {
        class: String,
        name: String,
        variant_type: u32,
        usage: u32,
        setter: String,
        getter: String,
    },
    Method {
        class: String,
        name: String,
        flags: u32,
        has_return: bool,
        arguments: u32,
    },
    Signal {
        class: String,
        name: String,
        arguments: u32,
    },
}

impl MemberEvent {
    pub fn class(&self) -> &str {
        match self {
            MemberEvent::Group { class, .. }
            | MemberEvent::Subgroup { class, .. }
            | MemberEvent::Property { class, .. }
            | MemberEvent::Method { class, .. }
            | MemberEvent::Signal { class, .. } => class,
        }
    }
}

struct HostState {
    objects: HashMap<usize, NativeObject>,
    classes: HashMap<String, RegisteredClass>,
    builtin_classes: HashSet<String>,
    // Keeps fast-path class-name pointers alive for the process.
    interned: Vec<CString>,
    callables: Vec<StoredCallable>,
    member_events: Vec<MemberEvent>,
    unregister_log: Vec<String>,
    fast_class_name: bool,
    destroyed: Vec<usize>,
    variant_destroys: usize,
}

fn state() -> &'static Mutex<HostState> {
    static STATE: OnceLock<Mutex<HostState>> = OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(HostState {
            objects: HashMap::new(),
            classes: HashMap::new(),
            builtin_classes: HashSet::new(),
            interned: Vec::new(),
            callables: Vec::new(),
            member_events: Vec::new(),
            unregister_log: Vec::new(),
            fast_class_name: true,
            destroyed: Vec::new(),
            variant_destroys: 0,
        })
    })
}

fn lock() -> MutexGuard<'static, HostState> {
    state().lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_name(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

fn assert_library(library: sys::RawLibraryPtr) {
    assert_eq!(
        library as usize, LIBRARY_TOKEN,
        "host call carried the wrong library token"
    );
}

// =============================================================================
// Host entry points
// =============================================================================

unsafe extern "C" fn classdb_construct_object(class_name: *const c_char) -> sys::RawObjectPtr {
    let name = read_name(class_name);
    let known = {
        let guard = lock();
        guard.builtin_classes.contains(&name) || guard.classes.contains_key(&name)
    };
    if !known {
        return std::ptr::null_mut();
    }
    let id = NEXT_HANDLE.fetch_add(16, Ordering::SeqCst);
    lock().objects.insert(id, NativeObject::fresh(&name));
    id as sys::RawObjectPtr
}

unsafe extern "C" fn classdb_register_class(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    parent_name: *const c_char,
    info: *const sys::ClassCreationInfo,
) {
    assert_library(library);
    let info = unsafe { &*info };
    let entry = RegisteredClass {
        parent: read_name(parent_name),
        is_exposed: info.is_exposed,
        create: info.create_instance,
        recreate: info.recreate_instance,
        free: info.free_instance,
        get_virtual: info.get_virtual,
        notification: info.notification,
        validate: info.validate_property,
        class_userdata: info.class_userdata as usize,
    };
    lock().classes.insert(read_name(class_name), entry);
}

unsafe extern "C" fn classdb_unregister_class(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
) {
    assert_library(library);
    let name = read_name(class_name);
    let mut guard = lock();
    guard.classes.remove(&name);
    guard.unregister_log.push(name);
}

unsafe extern "C" fn classdb_get_class_tag(class_name: *const c_char) -> sys::RawClassTag {
    let name = read_name(class_name);
    let guard = lock();
    if guard.builtin_classes.contains(&name) || guard.classes.contains_key(&name) {
        1 as sys::RawClassTag
    } else {
        std::ptr::null()
    }
}

unsafe extern "C" fn classdb_register_class_method(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    info: *const sys::RawMethodInfo,
) {
    assert_library(library);
    let info = unsafe { &*info };
    let event = MemberEvent::Method {
        class: read_name(class_name),
        name: read_name(info.name),
        flags: info.method_flags,
        has_return: info.has_return_value != 0,
        arguments: info.argument_count,
    };
    lock().member_events.push(event);
}

unsafe extern "C" fn classdb_register_class_property(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    info: *const sys::RawPropertyInfo,
    setter: *const c_char,
    getter: *const c_char,
) {
    assert_library(library);
    let info = unsafe { &*info };
    let event = MemberEvent::Property {
        class: read_name(class_name),
        name: read_name(info.name),
        variant_type: info.variant_type,
        usage: info.usage,
        setter: read_name(setter),
        getter: read_name(getter),
    };
    lock().member_events.push(event);
}

unsafe extern "C" fn classdb_register_class_property_group(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    group_name: *const c_char,
    prefix: *const c_char,
) {
    assert_library(library);
    let event = MemberEvent::Group {
        class: read_name(class_name),
        name: read_name(group_name),
        prefix: read_name(prefix),
    };
    lock().member_events.push(event);
}

unsafe extern "C" fn classdb_register_class_property_subgroup(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    subgroup_name: *const c_char,
    prefix: *const c_char,
) {
    assert_library(library);
    let event = MemberEvent::Subgroup {
        class: read_name(class_name),
        name: read_name(subgroup_name),
        prefix: read_name(prefix),
    };
    lock().member_events.push(event);
}

unsafe extern "C" fn classdb_register_class_signal(
    library: sys::RawLibraryPtr,
    class_name: *const c_char,
    signal_name: *const c_char,
    _arguments: *const sys::RawPropertyInfo,
    argument_count: i64,
) {
    assert_library(library);
    let event = MemberEvent::Signal {
        class: read_name(class_name),
        name: read_name(signal_name),
        arguments: argument_count as u32,
    };
    lock().member_events.push(event);
}

unsafe extern "C" fn object_destroy(object: sys::RawObjectPtr) {
    let id = object as usize;
    let (class_free, binding, callbacks) = {
        let mut guard = lock();
        let state = &mut *guard;
        let Some(entry) = state.objects.get_mut(&id) else {
            return;
        };
        if !entry.alive {
            return;
        }
        entry.alive = false;
        state.destroyed.push(id);
        let class_free = entry
            .instance_class
            .as_ref()
            .and_then(|name| state.classes.get(name))
            .and_then(|class| class.free.map(|free| (free, class.class_userdata)));
        let binding = entry.binding;
        let callbacks = entry.callbacks.take();
        entry.binding = 0;
        entry.instance = 0;
        (class_free, binding, callbacks)
    };
    // Callback order mirrors a real host: the class releases its instance
    // state, then the binding is torn down.
    if let Some((free, userdata)) = class_free {
        unsafe { free(userdata as *mut c_void, binding as sys::RawBindingPtr) };
    }
    if let Some(free) = callbacks.and_then(|callbacks| callbacks.free) {
        unsafe {
            free(
                LIBRARY_TOKEN as *mut c_void,
                object,
                binding as sys::RawBindingPtr,
            )
        };
    }
}

unsafe extern "C" fn object_set_instance(
    object: sys::RawObjectPtr,
    class_name: *const c_char,
    instance: sys::RawInstancePtr,
) {
    let mut guard = lock();
    let entry = guard
        .objects
        .get_mut(&(object as usize))
        .expect("set_instance on an unknown object");
    entry.instance = instance as usize;
    entry.instance_class = Some(read_name(class_name));
}

unsafe extern "C" fn object_set_instance_binding(
    object: sys::RawObjectPtr,
    token: *mut c_void,
    binding: sys::RawBindingPtr,
    callbacks: *const sys::InstanceBindingCallbacks,
) {
    assert_library(token);
    let callbacks = unsafe { *callbacks };
    let mut guard = lock();
    let entry = guard
        .objects
        .get_mut(&(object as usize))
        .expect("set_instance_binding on an unknown object");
    entry.binding = binding as usize;
    entry.callbacks = Some(callbacks);
}

unsafe extern "C" fn object_get_instance_binding(
    object: sys::RawObjectPtr,
    token: *mut c_void,
) -> sys::RawBindingPtr {
    assert_library(token);
    let guard = lock();
    match guard.objects.get(&(object as usize)) {
        Some(entry) => entry.binding as sys::RawBindingPtr,
        None => std::ptr::null_mut(),
    }
}

fn reported_class(entry: &NativeObject) -> String {
    entry
        .instance_class
        .clone()
        .unwrap_or_else(|| entry.class_name.clone())
}

unsafe extern "C" fn object_get_class_name(
    object: sys::RawObjectPtr,
    library: sys::RawLibraryPtr,
    out: *mut *const c_char,
) -> u8 {
    assert_library(library);
    let mut guard = lock();
    if !guard.fast_class_name {
        return 0;
    }
    let Some(entry) = guard.objects.get(&(object as usize)) else {
        return 0;
    };
    if !entry.alive {
        return 0;
    }
    let name = CString::new(reported_class(entry)).expect("class names have no NUL");
    let ptr = name.as_ptr();
    guard.interned.push(name);
    unsafe { *out = ptr };
    1
}

unsafe extern "C" fn object_query_class(
    object: sys::RawObjectPtr,
    buf: *mut c_char,
    len: usize,
) -> isize {
    let name = {
        let guard = lock();
        let Some(entry) = guard.objects.get(&(object as usize)) else {
            return -1;
        };
        if !entry.alive {
            return -1;
        }
        reported_class(entry)
    };
    let bytes = name.as_bytes();
    if !buf.is_null() && len > 0 {
        let copied = bytes.len().min(len - 1);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, copied);
            *buf.add(copied) = 0;
        }
    }
    bytes.len() as isize
}

unsafe extern "C" fn object_has_script_method(
    object: sys::RawObjectPtr,
    method: *const c_char,
) -> u8 {
    let name = read_name(method);
    let guard = lock();
    let Some(entry) = guard.objects.get(&(object as usize)) else {
        return 0;
    };
    u8::from(entry.alive && entry.script_methods.iter().any(|m| m == &name))
}

unsafe extern "C" fn object_call_script_method(
    object: sys::RawObjectPtr,
    method: *const c_char,
    _args: *const sys::ConstVariantPtr,
    _arg_count: i64,
    ret: sys::MutVariantPtr,
    error: *mut sys::RawCallError,
) {
    let name = read_name(method);
    let status = {
        let guard = lock();
        match guard.objects.get(&(object as usize)) {
            Some(entry) if entry.alive => {
                if entry.script_methods.iter().any(|m| m == &name) {
                    sys::CALL_OK
                } else {
                    sys::CALL_ERROR_INVALID_METHOD
                }
            }
            _ => sys::CALL_ERROR_INSTANCE_IS_NULL,
        }
    };
    if status == sys::CALL_OK && !ret.is_null() {
        unsafe {
            *ret = sys::RawVariant {
                opaque: [0xEE; sys::VARIANT_SIZE],
            }
        };
    }
    if !error.is_null() {
        unsafe {
            *error = sys::RawCallError {
                status,
                argument: -1,
                expected: -1,
            }
        };
    }
}

unsafe extern "C" fn callable_custom_create(
    out: sys::MutVariantPtr,
    info: *const sys::CallableCustomInfo,
) {
    let info = unsafe { &*info };
    let id = {
        let mut guard = lock();
        let id = guard.callables.len();
        guard.callables.push(StoredCallable {
            userdata: info.callable_userdata as usize,
            token: info.token as usize,
            call: info.call_func,
            free: info.free_func,
        });
        id
    };
    if !out.is_null() {
        let mut opaque = [0u8; sys::VARIANT_SIZE];
        opaque[..8].copy_from_slice(&((id as u64) + 1).to_le_bytes());
        unsafe { *out = sys::RawVariant { opaque } };
    }
}

unsafe extern "C" fn variant_new_copy(dst: sys::MutVariantPtr, src: sys::ConstVariantPtr) {
    if dst.is_null() || src.is_null() {
        return;
    }
    unsafe { std::ptr::copy_nonoverlapping(src, dst, 1) };
}

unsafe extern "C" fn variant_destroy(variant: sys::MutVariantPtr) {
    if variant.is_null() {
        return;
    }
    unsafe { (*variant).opaque = [0; sys::VARIANT_SIZE] };
    lock().variant_destroys += 1;
}

fn host_api() -> sys::HostApi {
    sys::HostApi {
        classdb_construct_object,
        classdb_register_class,
        classdb_unregister_class,
        classdb_get_class_tag,
        classdb_register_class_method,
        classdb_register_class_property,
        classdb_register_class_property_group,
        classdb_register_class_property_subgroup,
        classdb_register_class_signal,
        object_destroy,
        object_set_instance,
        object_set_instance_binding,
        object_get_instance_binding,
        object_get_class_name: Some(object_get_class_name),
        object_query_class,
        object_has_script_method,
        object_call_script_method,
        callable_custom_create,
        variant_new_copy,
        variant_destroy,
    }
}

// =============================================================================
// Fixture classes
// =============================================================================

/// Framework class with manual lifetime management.
pub struct Widget {
    base: ObjectBase,
}

impl HostClass for Widget {
    fn class_name() -> StringName {
        StringName::new("Widget")
    }
    fn engine_class_name() -> StringName {
        StringName::new("Widget")
    }
    fn parent_class_name() -> StringName {
        StringName::new("Object")
    }
    fn construct(base: ObjectBase) -> Self {
        Self { base }
    }
    fn base(&self) -> &ObjectBase {
        &self.base
    }
}

/// Framework class the host reference-counts.
pub struct Counter {
    base: ObjectBase,
}

impl HostClass for Counter {
    fn class_name() -> StringName {
        StringName::new("Counter")
    }
    fn engine_class_name() -> StringName {
        StringName::new("Counter")
    }
    fn parent_class_name() -> StringName {
        StringName::new("Object")
    }
    fn lifetime_kind() -> LifetimeKind {
        LifetimeKind::RefCounted
    }
    fn construct(base: ObjectBase) -> Self {
        Self { base }
    }
    fn base(&self) -> &ObjectBase {
        &self.base
    }
}

/// Framework class owned by a host container.
pub struct Screen {
    base: ObjectBase,
}

impl HostClass for Screen {
    fn class_name() -> StringName {
        StringName::new("Screen")
    }
    fn engine_class_name() -> StringName {
        StringName::new("Screen")
    }
    fn parent_class_name() -> StringName {
        StringName::new("Object")
    }
    fn lifetime_kind() -> LifetimeKind {
        LifetimeKind::HostManaged
    }
    fn construct(base: ObjectBase) -> Self {
        Self { base }
    }
    fn base(&self) -> &ObjectBase {
        &self.base
    }
}

pub unsafe extern "C" fn spinner_process(
    _instance: sys::RawInstancePtr,
    _args: *const *const c_void,
    _ret: *mut c_void,
) {
}

/// User class extending `Widget`, with a notification log and one virtual
/// override.
pub struct Spinner {
    base: ObjectBase,
    pub notifications: Mutex<Vec<i32>>,
}

impl HostClass for Spinner {
    fn class_name() -> StringName {
        StringName::new("Spinner")
    }
    fn engine_class_name() -> StringName {
        StringName::new("Widget")
    }
    fn parent_class_name() -> StringName {
        StringName::new("Widget")
    }
    fn construct(base: ObjectBase) -> Self {
        Self {
            base,
            notifications: Mutex::new(Vec::new()),
        }
    }
    fn base(&self) -> &ObjectBase {
        &self.base
    }
    fn implemented_overrides() -> Vec<VirtualOverride> {
        vec![VirtualOverride {
            name: StringName::new("_process"),
            call: spinner_process,
        }]
    }
    fn on_notification(&self, what: i32, _reversed: bool) {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(what);
    }
    fn validate_property(&self, property: &mut PropertyInfo) -> bool {
        property.hint = PropertyHint::Range;
        property.usage |= PropertyUsage::READ_ONLY;
        true
    }
}

/// Ref-counted user class extending `Counter`.
pub struct Gauge {
    base: ObjectBase,
}

impl HostClass for Gauge {
    fn class_name() -> StringName {
        StringName::new("Gauge")
    }
    fn engine_class_name() -> StringName {
        StringName::new("Counter")
    }
    fn parent_class_name() -> StringName {
        StringName::new("Counter")
    }
    fn lifetime_kind() -> LifetimeKind {
        LifetimeKind::RefCounted
    }
    fn construct(base: ObjectBase) -> Self {
        Self { base }
    }
    fn base(&self) -> &ObjectBase {
        &self.base
    }
}

// =============================================================================
// Setup and drivers
// =============================================================================

/// Installs the mock host and registers the fixture classes, once per test
/// binary.
pub fn setup() {
    static SETUP: OnceLock<()> = OnceLock::new();
    SETUP.get_or_init(|| {
        {
            let mut guard = lock();
            for builtin in ["Object", "Widget", "Panel", "Counter", "Image", "Screen"] {
                guard.builtin_classes.insert(builtin.to_string());
            }
        }
        let api = host_api();
        unsafe {
            HostInterface::install(&api, LIBRARY_TOKEN as sys::RawLibraryPtr)
                .expect("mock host installs once per process");
        }
        classes().register_framework_class::<Widget>();
        classes().register_framework_class::<Counter>();
        classes().register_framework_class::<Screen>();
        register_class::<Spinner>();
        register_class::<Gauge>();
    });
}

/// Inserts a host-owned object of `class` without constructing through the
/// class database.
pub fn spawn_native(class: &str) -> NativeHandle {
    let id = NEXT_HANDLE.fetch_add(16, Ordering::SeqCst);
    lock().objects.insert(id, NativeObject::fresh(class));
    NativeHandle::new(id as sys::RawObjectPtr).expect("mock handles are non-null")
}

/// Drives the captured create callback for `class`, as the host does when
/// instantiating a scene. Returns the new object and the binding the
/// callback produced.
pub fn create_extension_instance(class: &str) -> (NativeHandle, sys::RawBindingPtr) {
    let (create, userdata) = {
        let guard = lock();
        let class = guard.classes.get(class).expect("registered mock class");
        (
            class.create.expect("class registered a create callback"),
            class.class_userdata,
        )
    };
    let binding = unsafe { create(userdata as *mut c_void) };
    let id = {
        let guard = lock();
        guard
            .objects
            .iter()
            .find(|(_, entry)| entry.binding == binding as usize && entry.alive)
            .map(|(id, _)| *id)
            .expect("create callback bound a new object")
    };
    let handle = NativeHandle::new(id as sys::RawObjectPtr).expect("mock handles are non-null");
    (handle, binding)
}

/// Drives the captured recreate callback over an existing object.
pub fn recreate_extension_instance(class: &str, handle: NativeHandle) -> sys::RawBindingPtr {
    let (recreate, userdata) = {
        let guard = lock();
        let class = guard.classes.get(class).expect("registered mock class");
        (
            class.recreate.expect("class registered a recreate callback"),
            class.class_userdata,
        )
    };
    unsafe { recreate(userdata as *mut c_void, handle.as_ptr()) }
}

/// Tears down the binding for `handle` without destroying the object, as a
/// host does when unloading an extension it will reload.
pub fn drop_binding(handle: NativeHandle) {
    let (callbacks, binding) = {
        let mut guard = lock();
        let entry = guard
            .objects
            .get_mut(&handle.id())
            .expect("known mock object");
        let callbacks = entry.callbacks.take();
        let binding = entry.binding;
        entry.binding = 0;
        entry.instance = 0;
        entry.instance_class = None;
        (callbacks, binding)
    };
    if let Some(free) = callbacks.and_then(|callbacks| callbacks.free) {
        unsafe {
            free(
                LIBRARY_TOKEN as *mut c_void,
                handle.as_ptr(),
                binding as sys::RawBindingPtr,
            )
        };
    }
}

/// Reports a reference-count boundary crossing to the object's binding.
/// Returns the callback's answer to "may the object be freed".
pub fn reference(handle: NativeHandle, is_last: bool) -> bool {
    let (callback, binding) = {
        let guard = lock();
        let entry = guard.objects.get(&handle.id()).expect("known mock object");
        let callbacks = entry.callbacks.expect("object carries binding callbacks");
        (
            callbacks
                .reference
                .expect("binding callbacks include reference"),
            entry.binding,
        )
    };
    unsafe {
        callback(
            LIBRARY_TOKEN as *mut c_void,
            binding as sys::RawBindingPtr,
            u8::from(is_last),
        ) != 0
    }
}

/// Delivers an engine notification through the captured class callback.
pub fn invoke_notification(handle: NativeHandle, what: i32, reversed: bool) {
    let (notify, binding) = {
        let guard = lock();
        let entry = guard.objects.get(&handle.id()).expect("known mock object");
        let class_name = entry
            .instance_class
            .as_ref()
            .expect("object carries an instance class");
        let class = guard
            .classes
            .get(class_name)
            .expect("registered mock class");
        (
            class
                .notification
                .expect("class registered a notification hook"),
            entry.binding,
        )
    };
    unsafe { notify(binding as sys::RawBindingPtr, what, u8::from(reversed)) };
}

/// Runs property validation through the captured class callback.
pub fn invoke_validate_property(handle: NativeHandle, raw: &mut sys::RawPropertyInfo) -> bool {
    let (validate, binding) = {
        let guard = lock();
        let entry = guard.objects.get(&handle.id()).expect("known mock object");
        let class_name = entry
            .instance_class
            .as_ref()
            .expect("object carries an instance class");
        let class = guard
            .classes
            .get(class_name)
            .expect("registered mock class");
        (
            class
                .validate
                .expect("class registered a validation hook"),
            entry.binding,
        )
    };
    unsafe { validate(binding as sys::RawBindingPtr, raw) != 0 }
}

/// Resolves a virtual method through the captured class callback; true when
/// an override was returned.
pub fn invoke_get_virtual(class: &str, method: &str) -> bool {
    let (get_virtual, userdata) = {
        let guard = lock();
        let class = guard.classes.get(class).expect("registered mock class");
        (
            class
                .get_virtual
                .expect("class registered a virtual resolver"),
            class.class_userdata,
        )
    };
    let method = CString::new(method).expect("method names have no NUL");
    unsafe { get_virtual(userdata as *mut c_void, method.as_ptr()) }.is_some()
}

pub fn add_script_method(handle: NativeHandle, method: &str) {
    lock()
        .objects
        .get_mut(&handle.id())
        .expect("known mock object")
        .script_methods
        .push(method.to_string());
}

pub fn was_destroyed(handle: NativeHandle) -> bool {
    lock().destroyed.contains(&handle.id())
}

pub fn destroy_count(handle: NativeHandle) -> usize {
    lock()
        .destroyed
        .iter()
        .filter(|id| **id == handle.id())
        .count()
}

pub fn instance_class_of(handle: NativeHandle) -> Option<String> {
    lock()
        .objects
        .get(&handle.id())
        .and_then(|entry| entry.instance_class.clone())
}

pub fn binding_of(handle: NativeHandle) -> sys::RawBindingPtr {
    lock()
        .objects
        .get(&handle.id())
        .map_or(std::ptr::null_mut(), |entry| {
            entry.binding as sys::RawBindingPtr
        })
}

pub fn registered_class_names() -> Vec<String> {
    lock().classes.keys().cloned().collect()
}

pub fn class_parent_of(class: &str) -> Option<String> {
    lock().classes.get(class).map(|entry| entry.parent.clone())
}

pub fn class_is_exposed(class: &str) -> bool {
    lock()
        .classes
        .get(class)
        .is_some_and(|entry| entry.is_exposed != 0)
}

pub fn unregister_index_of(class: &str) -> Option<usize> {
    lock().unregister_log.iter().position(|name| name == class)
}

pub fn member_events() -> Vec<MemberEvent> {
    lock().member_events.clone()
}

pub fn set_fast_class_name(enabled: bool) {
    lock().fast_class_name = enabled;
}

pub fn last_callable_id() -> usize {
    let guard = lock();
    guard.callables.len().checked_sub(1).expect("a callable was stored")
}

pub fn callable_token(id: usize) -> usize {
    lock().callables[id].token
}

/// Invokes a stored callable's call trampoline. `seed` pre-fills the return
/// slot so tests can observe whether the trampoline wrote it. The error out
/// parameter starts poisoned for the same reason.
pub fn invoke_stored_callable(
    id: usize,
    args: &[sys::RawVariant],
    seed: Option<[u8; sys::VARIANT_SIZE]>,
) -> (sys::RawVariant, sys::RawCallError) {
    let (call, userdata) = {
        let guard = lock();
        let stored = &guard.callables[id];
        (
            stored.call.expect("stored callable has a call trampoline"),
            stored.userdata,
        )
    };
    let slots: Vec<sys::ConstVariantPtr> = args
        .iter()
        .map(|arg| arg as *const sys::RawVariant)
        .collect();
    let mut ret = sys::RawVariant {
        opaque: seed.unwrap_or([0; sys::VARIANT_SIZE]),
    };
    let mut error = sys::RawCallError {
        status: -7,
        argument: -7,
        expected: -7,
    };
    unsafe {
        call(
            userdata as *mut c_void,
            slots.as_ptr(),
            slots.len() as i64,
            &mut ret,
            &mut error,
        )
    };
    (ret, error)
}

/// Invokes a stored callable's free trampoline, as the host does when the
/// last reference to the callable value drops.
pub fn free_stored_callable(id: usize) {
    let (free, userdata) = {
        let guard = lock();
        let stored = &guard.callables[id];
        (
            stored.free.expect("stored callable has a free trampoline"),
            stored.userdata,
        )
    };
    unsafe { free(userdata as *mut c_void) };
}

pub fn variant_destroy_count() -> usize {
    lock().variant_destroys
}
