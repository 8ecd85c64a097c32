//! Wrapper-to-native-handle binding state: the per-object record and the
//! process-wide identity table.

pub mod record;
pub mod table;

pub use record::{BindingKind, BindingRecord};
pub use table::{BindingTable, bindings};
