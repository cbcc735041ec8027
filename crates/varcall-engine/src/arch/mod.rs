//! Dispatch trampolines
//!
//! Two shared trampolines, one per call-site kind, are written as naked
//! functions per target. Each runs with the caller's argument registers
//! live plus two extra registers:
//!
//! | target | hidden argument | call-site descriptor |
//! |--------|-----------------|----------------------|
//! | x86_64 | r10 | r11 |
//! | aarch64 | x12 | x15 |
//!
//! Fast path: load the descriptor's cache slot and tail-jump to it with every
//! register untouched. Slow path: spill the argument registers into a
//! `TransitionBlock`, call the dispatch worker, reload the registers and
//! start over. On a target without an implementation every entry point
//! logs and aborts.

use varcall_sdk::{CallSiteKind, EntryPoint};

#[cfg(all(unix, target_arch = "x86_64"))]
mod x86_64;
#[cfg(all(unix, target_arch = "x86_64"))]
use self::x86_64 as imp;

#[cfg(all(unix, target_arch = "aarch64"))]
mod aarch64;
#[cfg(all(unix, target_arch = "aarch64"))]
use self::aarch64 as imp;

#[cfg(not(any(
    all(unix, target_arch = "x86_64"),
    all(unix, target_arch = "aarch64")
)))]
mod unsupported;
#[cfg(not(any(
    all(unix, target_arch = "x86_64"),
    all(unix, target_arch = "aarch64")
)))]
use self::unsupported as imp;

pub use imp::{CALL_SITE_REGISTER, ENTRY_ALIGNMENT, HIDDEN_ARGUMENT_REGISTER, SUPPORTED};

/// Signature shared by every naked entry point in this module
pub(crate) type RawEntry = unsafe extern "C" fn();

/// Shared trampoline for a call-site kind
pub fn trampoline(kind: CallSiteKind) -> EntryPoint {
    let entry: RawEntry = match kind {
        CallSiteKind::Vararg => imp::vararg_dispatch,
        CallSiteKind::GenericCalli => imp::generic_calli_dispatch,
    };
    EntryPoint::of(entry)
}

/// Stub that forwards a call unchanged to the target in the hidden register.
///
/// A tagged word is a native pointer (jump to `word >> 1`); an untagged word
/// is a [`NativeMethod`](crate::NativeMethod) whose first word is the entry.
pub fn pass_through_stub() -> EntryPoint {
    EntryPoint::of(imp::pass_through)
}

/// Helper that loads the call-site and hidden registers and tail-jumps to an
/// entry point. Called with `(entry, site, hidden, a0, a1, a2, vector_count)`
/// and optionally two trailing `f64`s.
pub(crate) fn enter_call_site() -> RawEntry {
    imp::enter_call_site
}
