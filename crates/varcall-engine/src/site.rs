//! Call-site descriptors
//!
//! One descriptor exists per call site. Its first word is the stub cache
//! slot the trampoline reads on every call, so the layout is `#[repr(C)]`
//! and the slot offset is a compile-time constant shared with the assembly.
//!
//! The slot starts empty. Once an entry point is stored it is never cleared;
//! later stores may replace it with another, equivalent entry point.

use std::fmt;
use std::mem::offset_of;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use varcall_sdk::{CallSignature, CallSiteInfo, CallSiteKind, EntryPoint};

use crate::arch;
use crate::bridge::BridgeShared;

/// Per-call-site state read by the dispatch trampolines
#[repr(C)]
pub struct CallSiteDescriptor {
    /// Cached stub entry, 0 while unresolved
    cached_stub: AtomicUsize,
    kind: CallSiteKind,
    signature: CallSignature,
    shared: Arc<BridgeShared>,
}

/// Byte offset of the cache slot inside [`CallSiteDescriptor`]
pub const CACHED_STUB_OFFSET: usize = offset_of!(CallSiteDescriptor, cached_stub);

// aarch64 loads the slot with `ldar`, which takes no displacement.
const _: () = assert!(CACHED_STUB_OFFSET == 0);

impl CallSiteDescriptor {
    pub(crate) fn new(kind: CallSiteKind, signature: CallSignature, shared: Arc<BridgeShared>) -> Self {
        CallSiteDescriptor {
            cached_stub: AtomicUsize::new(0),
            kind,
            signature,
            shared,
        }
    }

    /// Read the cache slot.
    ///
    /// Acquire ordering: a thread that observes an entry point also observes
    /// every write the generator made to the stub before it was published.
    #[inline]
    pub fn try_get_cached_stub(&self) -> Option<EntryPoint> {
        EntryPoint::new(self.cached_stub.load(Ordering::Acquire))
    }

    /// Publish a generated stub.
    ///
    /// Unconditional release store. Concurrent publishers each store their
    /// own entry; the last store wins and all of them are equivalent.
    #[inline]
    pub fn store_stub(&self, entry: EntryPoint) {
        self.cached_stub.store(entry.addr(), Ordering::Release);
    }

    /// Whether a stub has been published
    pub fn is_resolved(&self) -> bool {
        self.try_get_cached_stub().is_some()
    }

    /// Which trampoline variant serves this site
    pub fn kind(&self) -> CallSiteKind {
        self.kind
    }

    /// The site's signature
    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    /// Address passed in the call-site register
    pub fn address(&self) -> usize {
        self as *const Self as usize
    }

    /// Generator-facing view of this site
    pub fn info(&self) -> CallSiteInfo<'_> {
        CallSiteInfo {
            kind: self.kind,
            signature: &self.signature,
            address: self.address(),
        }
    }

    /// Shared trampoline the caller jumps to for this site
    pub fn trampoline(&self) -> EntryPoint {
        arch::trampoline(self.kind)
    }

    pub(crate) fn shared(&self) -> &BridgeShared {
        &self.shared
    }
}

impl fmt::Debug for CallSiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSiteDescriptor")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("kind", &self.kind)
            .field("signature", &format_args!("{}", self.signature))
            .field("cached_stub", &self.try_get_cached_stub())
            .finish()
    }
}
