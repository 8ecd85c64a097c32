//! Property and method metadata exchanged with the host.
//!
//! Descriptors cross the ABI as [`sys::RawPropertyInfo`]; this module holds
//! the managed view plus the enums and flag sets that give the raw scalar
//! fields names.

use std::ffi::{CStr, c_char};

use bitflags::bitflags;
use mooring_sys as sys;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::string_name::StringName;

/// Dynamic type tag carried in property metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum VariantTag {
    /// Untyped. Also what unknown tags decode to.
    #[num_enum(default)]
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    StringName = 5,
    Object = 6,
    Callable = 7,
    Array = 8,
    Dictionary = 9,
}

/// Editor presentation hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum PropertyHint {
    #[num_enum(default)]
    None = 0,
    Range = 1,
    Enum = 2,
    Flags = 3,
    File = 4,
    Dir = 5,
    MultilineText = 6,
    ResourceType = 7,
}

bitflags! {
    /// Where a property participates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyUsage: u32 {
        const STORAGE = 1 << 0;
        const EDITOR = 1 << 1;
        const INTERNAL = 1 << 2;
        const READ_ONLY = 1 << 3;
        const GROUP = 1 << 4;
        const SUBGROUP = 1 << 5;
        const DEFAULT = Self::STORAGE.bits() | Self::EDITOR.bits();
    }
}

bitflags! {
    /// Qualifiers attached to a registered method.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MethodFlags: u32 {
        const NORMAL = 1 << 0;
        const EDITOR = 1 << 1;
        const CONST = 1 << 2;
        const VIRTUAL = 1 << 3;
        const VARARG = 1 << 4;
        const STATIC = 1 << 5;
        const DEFAULT = Self::NORMAL.bits();
    }
}

/// Managed view of one property (or call argument) descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyInfo {
    pub variant_type: VariantTag,
    pub name: StringName,
    pub class_name: StringName,
    pub hint: PropertyHint,
    pub hint_string: StringName,
    pub usage: PropertyUsage,
}

impl PropertyInfo {
    /// A plain property: stored, shown in the editor, no hint.
    pub fn new(variant_type: VariantTag, name: impl AsRef<str>) -> Self {
        Self {
            variant_type,
            name: StringName::new(name),
            class_name: StringName::new(""),
            hint: PropertyHint::None,
            hint_string: StringName::new(""),
            usage: PropertyUsage::DEFAULT,
        }
    }

    pub fn with_hint(mut self, hint: PropertyHint, hint_string: impl AsRef<str>) -> Self {
        self.hint = hint;
        self.hint_string = StringName::new(hint_string);
        self
    }

    pub fn with_usage(mut self, usage: PropertyUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Names the class backing an [`VariantTag::Object`]-typed property.
    pub fn with_class_name(mut self, class_name: StringName) -> Self {
        self.class_name = class_name;
        self
    }

    /// Reads a host-owned descriptor. String fields are copied; null string
    /// pointers read as empty names.
    ///
    /// # Safety
    ///
    /// Non-null string pointers in `raw` must point at valid NUL-terminated
    /// strings for the duration of the call.
    pub(crate) unsafe fn from_raw(raw: &sys::RawPropertyInfo) -> Self {
        Self {
            variant_type: VariantTag::from(raw.variant_type),
            name: unsafe { name_at(raw.name) },
            class_name: unsafe { name_at(raw.class_name) },
            hint: PropertyHint::from(raw.hint),
            hint_string: unsafe { name_at(raw.hint_string) },
            usage: PropertyUsage::from_bits_retain(raw.usage),
        }
    }

    /// Writes the scalar fields back into a host descriptor. The string
    /// fields stay host-owned and untouched.
    pub(crate) fn write_scalars(&self, raw: &mut sys::RawPropertyInfo) {
        raw.variant_type = self.variant_type.into();
        raw.hint = self.hint.into();
        raw.usage = self.usage.bits();
    }

    /// Builds a raw descriptor borrowing this info's strings. The result is
    /// only valid while `self` is.
    pub(crate) fn as_raw(&self) -> sys::RawPropertyInfo {
        sys::RawPropertyInfo {
            variant_type: self.variant_type.into(),
            name: self.name.as_ptr(),
            class_name: self.class_name.as_ptr(),
            hint: self.hint.into(),
            hint_string: self.hint_string.as_ptr(),
            usage: self.usage.bits(),
        }
    }
}

unsafe fn name_at(ptr: *const c_char) -> StringName {
    if ptr.is_null() {
        StringName::new("")
    } else {
        StringName::from_cstr(unsafe { CStr::from_ptr(ptr) })
    }
}
