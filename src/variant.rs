//! Owned dynamic values.
//!
//! The host's variant type crosses the ABI as an opaque fixed-size blob,
//! always by pointer. The extension never interprets the payload; it only
//! moves blobs around and tells the host when one is done with.

use std::fmt;

use mooring_sys as sys;

use crate::interface::HostInterface;

/// An owned, opaque dynamic value.
///
/// All-zero storage is the nil value and owns nothing. Any other content was
/// produced by the host and is handed back to `variant_destroy` on drop.
#[repr(transparent)]
pub struct Variant {
    raw: sys::RawVariant,
}

impl Variant {
    /// The nil value.
    pub const fn nil() -> Self {
        Self {
            raw: sys::RawVariant::zeroed(),
        }
    }

    /// Takes ownership of host-created storage.
    pub fn from_raw(raw: sys::RawVariant) -> Self {
        Self { raw }
    }

    pub fn is_nil(&self) -> bool {
        self.raw.opaque.iter().all(|b| *b == 0)
    }

    /// Copies this value through the host's copy constructor.
    pub fn duplicate(&self) -> Variant {
        if self.is_nil() {
            return Variant::nil();
        }
        let mut copy = Variant::nil();
        HostInterface::get().variant_copy(copy.as_raw_mut(), self.as_raw());
        copy
    }

    /// Moves the value out, leaving nil behind.
    pub fn take(&mut self) -> Variant {
        Variant {
            raw: std::mem::replace(&mut self.raw, sys::RawVariant::zeroed()),
        }
    }

    /// Releases ownership of the storage without destroying the value.
    pub fn into_raw(mut self) -> sys::RawVariant {
        std::mem::replace(&mut self.raw, sys::RawVariant::zeroed())
    }

    pub(crate) fn as_raw(&self) -> sys::ConstVariantPtr {
        &self.raw
    }

    pub(crate) fn as_raw_mut(&mut self) -> sys::MutVariantPtr {
        &mut self.raw
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::nil()
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        if self.is_nil() {
            return;
        }
        // Non-nil storage can only have come from the host; without an
        // installed interface there is nothing to release against.
        if let Some(host) = HostInterface::try_get() {
            host.variant_destroy(&mut self.raw);
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            f.write_str("Variant(nil)")
        } else {
            write!(f, "Variant({} opaque bytes)", sys::VARIANT_SIZE)
        }
    }
}
