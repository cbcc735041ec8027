//! Calling through a dispatch trampoline from Rust
//!
//! Native callers set the hidden and call-site registers themselves. These
//! helpers do it for Rust code (the CLI self-test, tests, benches) by going
//! through a small naked shim that loads the registers and tail-jumps, so the
//! trampoline sees the same frame a compiled call site would produce.
//!
//! Only the first three integer arguments and two `f64` arguments are
//! forwarded; the target must not expect more.

use varcall_sdk::{EntryPoint, HiddenWord};

use crate::arch;
use crate::dispatch::fatal;
use crate::site::CallSiteDescriptor;

type EnterU64 = unsafe extern "C" fn(usize, usize, usize, u64, u64, u64, u64) -> u64;
type EnterF64 = unsafe extern "C" fn(usize, usize, usize, u64, u64, u64, u64, f64, f64) -> f64;

/// Call `entry` with the call-site register set to `site` and the hidden
/// register set to `hidden`, returning the integer result register.
///
/// # Safety
///
/// `entry` must be callable with the C convention and up to three integer
/// arguments, and must interpret `site` and `hidden` correctly (a trampoline
/// requires `site` to be a live [`CallSiteDescriptor`]).
pub unsafe fn call_entry_u64(entry: EntryPoint, site: usize, hidden: HiddenWord, args: [u64; 3]) -> u64 {
    if !arch::SUPPORTED {
        fatal("native call dispatch is not implemented for this target");
    }
    let enter: EnterU64 = std::mem::transmute(arch::enter_call_site());
    enter(entry.addr(), site, hidden.raw(), args[0], args[1], args[2], 0)
}

/// Like [`call_entry_u64`] with one integer and two `f64` arguments,
/// returning the float result register.
///
/// # Safety
///
/// Same contract as [`call_entry_u64`], for a target taking
/// `(u64, f64, f64)` and returning `f64`.
pub unsafe fn call_entry_f64(entry: EntryPoint, site: usize, hidden: HiddenWord, arg: u64, floats: [f64; 2]) -> f64 {
    if !arch::SUPPORTED {
        fatal("native call dispatch is not implemented for this target");
    }
    let enter: EnterF64 = std::mem::transmute(arch::enter_call_site());
    enter(entry.addr(), site, hidden.raw(), arg, 0, 0, 2, floats[0], floats[1])
}

/// Issue a call through `site`'s trampoline.
///
/// A generation failure returns 0; the error is then available from
/// [`take_last_failure`](crate::take_last_failure) on this thread.
///
/// # Safety
///
/// The stub the site resolves to must accept three integer arguments, and
/// `hidden` must name a target the site's generator understands.
pub unsafe fn call_u64(site: &CallSiteDescriptor, hidden: HiddenWord, args: [u64; 3]) -> u64 {
    call_entry_u64(site.trampoline(), site.address(), hidden, args)
}

/// Issue a float call through `site`'s trampoline.
///
/// A generation failure returns 0.0 and parks the error like [`call_u64`].
///
/// # Safety
///
/// Same contract as [`call_u64`], for a target taking `(u64, f64, f64)`.
pub unsafe fn call_f64(site: &CallSiteDescriptor, hidden: HiddenWord, arg: u64, floats: [f64; 2]) -> f64 {
    call_entry_f64(site.trampoline(), site.address(), hidden, arg, floats)
}
