//! Object lifetime and identity bridging between managed wrappers and a
//! native host engine.
//!
//! The bridge keeps exactly one managed wrapper per live native object and
//! keeps both sides agreed on who owns it. Native objects are reached only
//! through the C call table in [`mooring_sys`]; their handles are opaque
//! addresses, never dereferenced here.
//!
//! Managed types implement [`prelude::HostClass`] and are either wrappers
//! over classes the host ships (framework classes) or new classes pushed
//! into the host's database ([`prelude::register_class`]). Construction
//! goes through [`prelude::bind_new`] on the managed side and
//! [`prelude::get_or_init`] for handles arriving from the host; both funnel
//! into a shared binding table so repeated lookups of the same handle
//! return the same wrapper.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mooring::prelude::*;
//!
//! struct Spinner {
//!     base: ObjectBase,
//! }
//!
//! impl HostClass for Spinner {
//!     fn class_name() -> StringName {
//!         StringName::new("Spinner")
//!     }
//!     fn engine_class_name() -> StringName {
//!         StringName::new("Widget")
//!     }
//!     fn parent_class_name() -> StringName {
//!         StringName::new("Widget")
//!     }
//!     fn construct(base: ObjectBase) -> Self {
//!         Self { base }
//!     }
//!     fn base(&self) -> &ObjectBase {
//!         &self.base
//!     }
//! }
//!
//! register_class::<Spinner>();
//! let spinner: Arc<Spinner> = bind_new::<Spinner>();
//! assert!(spinner.is_valid());
//! ```

pub mod binding;
pub mod callable;
pub mod callbacks;
pub mod error;
pub mod interface;
pub mod object;
pub mod property;
pub mod registration;
pub mod registry;
pub mod string_name;
pub mod variant;

pub use mooring_sys as sys;

// Re-export main types
pub mod prelude {
    pub use crate::binding::{BindingKind, BindingRecord, BindingTable, bindings};
    pub use crate::callable::{Arguments, callable_from_fn};
    pub use crate::error::{BridgeError, BridgeResult, CallFailure, CallStatus};
    pub use crate::interface::HostInterface;
    pub use crate::object::{
        BoundObject, HostClass, InitContext, InitOrigin, LifetimeKind, NativeHandle, ObjectBase,
        VirtualOverride, bind_existing, bind_new, bound_object, get_or_init,
    };
    pub use crate::property::{MethodFlags, PropertyHint, PropertyInfo, PropertyUsage, VariantTag};
    pub use crate::registration::{
        ClassMember, MethodRegistration, PropertyRegistration, SignalRegistration, register_class,
        register_members, unregister_class,
    };
    pub use crate::registry::{ClassKind, ClassRecord, ClassRegistry, DuplicateClassHandler, classes};
    pub use crate::string_name::StringName;
    pub use crate::variant::Variant;
}
