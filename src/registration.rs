//! Declaring user classes and their members to the host.
//!
//! Members are forwarded in declaration order because the host's editor
//! surfaces groups and properties in the order they arrive.

use std::ffi::c_void;

use mooring_sys as sys;

use crate::error::{BridgeError, BridgeResult};
use crate::interface::host;
use crate::object::HostClass;
use crate::property::{MethodFlags, PropertyInfo};
use crate::registry::classes;
use crate::string_name::StringName;

/// Registers `T` into the host's class database. Instances of `T` can be
/// constructed from either side afterwards.
pub fn register_class<T: HostClass>() {
    classes().register_user_class::<T>();
}

/// Removes `T` from the host's class database.
pub fn unregister_class<T: HostClass>() {
    classes().unregister_user_class::<T>();
}

/// A property exposed on a user class, accessed through named setter and
/// getter methods.
#[derive(Clone, Debug)]
pub struct PropertyRegistration {
    pub info: PropertyInfo,
    pub setter: StringName,
    pub getter: StringName,
}

/// A method exposed on a user class. The call trampolines and their
/// userdata come from generated glue; the bridge only forwards them.
#[derive(Clone, Debug)]
pub struct MethodRegistration {
    pub name: StringName,
    pub flags: MethodFlags,
    pub return_value: Option<PropertyInfo>,
    pub arguments: Vec<PropertyInfo>,
    pub call: Option<sys::MethodCallFn>,
    pub ptrcall: Option<sys::MethodPtrCallFn>,
    pub method_userdata: *mut c_void,
}

/// A signal exposed on a user class.
#[derive(Clone, Debug)]
pub struct SignalRegistration {
    pub name: StringName,
    pub arguments: Vec<PropertyInfo>,
}

/// One declared member of a user class.
#[derive(Clone, Debug)]
pub enum ClassMember {
    PropertyGroup { name: StringName, prefix: StringName },
    PropertySubgroup { name: StringName, prefix: StringName },
    Property(PropertyRegistration),
    Method(MethodRegistration),
    Signal(SignalRegistration),
}

/// Forwards `members` to the host, in order, for a registered class.
pub fn register_members(class_name: &StringName, members: &[ClassMember]) -> BridgeResult<()> {
    if !classes().is_registered(class_name) {
        return Err(BridgeError::UnknownClass(class_name.clone()));
    }
    let host = host();
    for member in members {
        match member {
            ClassMember::PropertyGroup { name, prefix } => {
                host.register_property_group(class_name, name, prefix);
            }
            ClassMember::PropertySubgroup { name, prefix } => {
                host.register_property_subgroup(class_name, name, prefix);
            }
            ClassMember::Property(property) => {
                let raw = property.info.as_raw();
                host.register_property(class_name, &raw, &property.setter, &property.getter);
            }
            ClassMember::Method(method) => {
                let return_value_info = method.return_value.as_ref().map(PropertyInfo::as_raw);
                let arguments_info: Vec<sys::RawPropertyInfo> =
                    method.arguments.iter().map(PropertyInfo::as_raw).collect();
                let info = sys::RawMethodInfo {
                    name: method.name.as_ptr(),
                    method_userdata: method.method_userdata,
                    call_func: method.call,
                    ptrcall_func: method.ptrcall,
                    method_flags: method.flags.bits(),
                    has_return_value: u8::from(method.return_value.is_some()),
                    return_value_info: return_value_info
                        .as_ref()
                        .map_or(std::ptr::null(), |info| info as *const _),
                    argument_count: arguments_info.len() as u32,
                    arguments_info: arguments_info.as_ptr(),
                };
                host.register_method(class_name, &info);
            }
            ClassMember::Signal(signal) => {
                let arguments: Vec<sys::RawPropertyInfo> =
                    signal.arguments.iter().map(PropertyInfo::as_raw).collect();
                host.register_signal(class_name, &signal.name, &arguments);
            }
        }
    }
    Ok(())
}
