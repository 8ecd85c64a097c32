//! Interned identifiers exchanged with the host.
//!
//! Class and method names cross the ABI as NUL-terminated strings and are
//! used as registry keys on this side. [`StringName`] keeps both forms in one
//! value: a shared `CStr` allocation whose pointer can be handed to the host
//! directly, plus a precomputed deterministic 64-bit hash so map lookups
//! never re-walk the bytes.

use std::ffi::{CStr, CString};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use xxhash_rust::xxh64::xxh64;

/// Domain-separation seed so name hashes never collide with other xxh64 uses
/// of the same byte strings.
const NAME_HASH_SEED: u64 = 0x51a3_77c2_9e4e_8f0d;

/// Deterministic hash of a raw name, as stored in [`StringName`] and in the
/// per-class virtual-dispatch maps.
pub(crate) fn name_hash(bytes: &[u8]) -> u64 {
    xxh64(bytes, NAME_HASH_SEED)
}

/// An interned class/method/property name.
///
/// Cheap to clone (one `Arc` bump) and cheap to compare: equality checks the
/// precomputed hash before touching bytes, and the `Hash` impl writes the
/// stored 64-bit value straight through.
#[derive(Clone)]
pub struct StringName {
    text: Arc<CStr>,
    hash: u64,
}

impl StringName {
    /// Interns `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` contains an interior NUL byte; names are identifiers
    /// handed to a C ABI and cannot carry embedded NULs.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let text = match CString::new(name) {
            Ok(text) => text,
            Err(_) => panic!("string name contains an interior NUL byte: {name:?}"),
        };
        Self::from_cstring(text)
    }

    /// Interns an already NUL-terminated name.
    pub fn from_cstr(name: &CStr) -> Self {
        Self::from_cstring(name.to_owned())
    }

    fn from_cstring(text: CString) -> Self {
        let hash = name_hash(text.as_bytes());
        Self {
            text: Arc::from(text),
            hash,
        }
    }

    /// The stored xxh64 of the name bytes.
    pub fn hash64(&self) -> u64 {
        self.hash
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.text
    }

    /// Pointer suitable for host calls. Valid while any clone of this name
    /// is alive.
    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        self.text.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.to_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.to_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.to_bytes().is_empty()
    }
}

impl PartialEq for StringName {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for StringName {}

impl PartialEq<str> for StringName {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for StringName {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Hash for StringName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringName({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl From<&str> for StringName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&CStr> for StringName {
    fn from(name: &CStr) -> Self {
        Self::from_cstr(name)
    }
}
