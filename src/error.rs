//! Error taxonomy of the binding bridge.
//!
//! Failures fall into three tiers by how recoverable they are:
//!
//! * Invariant faults (a handle bound twice, a teardown for a record we never
//!   issued, a wrapper of the wrong type) go through [`fault!`] and never
//!   return. Inside a host callback the panic cannot unwind across the C
//!   boundary and aborts, which is the intended outcome for corrupted binding
//!   state.
//! * Reported misuse (releasing an invalid wrapper, releasing an object the
//!   host owns) is logged at the call site and otherwise ignored.
//! * Native call failures are ordinary [`CallFailure`] values the caller can
//!   match on.

use mooring_sys as sys;
use num_enum::{FromPrimitive, IntoPrimitive};
use thiserror::Error;

use crate::string_name::StringName;

/// Result alias used across the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("host interface is not installed")]
    HostNotInstalled,

    #[error("host interface is already installed")]
    HostAlreadyInstalled,

    #[error("class {0} is not registered")]
    UnknownClass(StringName),

    #[error(transparent)]
    Call(#[from] CallFailure),
}

/// Status of a dynamic call, decoded from the raw ABI code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum CallStatus {
    Ok = sys::CALL_OK,
    InvalidMethod = sys::CALL_ERROR_INVALID_METHOD,
    InvalidArgument = sys::CALL_ERROR_INVALID_ARGUMENT,
    TooManyArguments = sys::CALL_ERROR_TOO_MANY_ARGUMENTS,
    TooFewArguments = sys::CALL_ERROR_TOO_FEW_ARGUMENTS,
    InstanceIsNull = sys::CALL_ERROR_INSTANCE_IS_NULL,
    MethodNotConst = sys::CALL_ERROR_METHOD_NOT_CONST,
    /// Status code this build does not know about.
    #[num_enum(default)]
    Unrecognized = -1,
}

/// A dynamic call the host reported as failed.
///
/// `argument` and `expected` are only meaningful for the argument-related
/// statuses and are `-1` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("call failed: {status:?} (argument {argument}, expected {expected})")]
pub struct CallFailure {
    pub status: CallStatus,
    pub argument: i32,
    pub expected: i32,
}

impl CallFailure {
    /// Decodes a raw out-parameter. `None` when the call succeeded.
    pub fn from_raw(raw: &sys::RawCallError) -> Option<Self> {
        match CallStatus::from(raw.status) {
            CallStatus::Ok => None,
            status => Some(Self {
                status,
                argument: raw.argument,
                expected: raw.expected,
            }),
        }
    }

    pub(crate) fn instance_is_null() -> Self {
        Self {
            status: CallStatus::InstanceIsNull,
            argument: -1,
            expected: -1,
        }
    }
}

/// Fatal invariant fault: logs the message through `tracing`, then panics
/// with a stable `binding invariant violated` prefix.
///
/// Call sites use plain format strings; the same tokens feed both the log
/// record and the panic message.
#[macro_export]
macro_rules! fault {
    ($($arg:tt)*) => {{
        ::tracing::error!($($arg)*);
        panic!("binding invariant violated: {}", ::std::format!($($arg)*));
    }};
}
