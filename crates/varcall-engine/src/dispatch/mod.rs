//! Slow-path resolution
//!
//! The trampolines in `arch` handle the fast path on their own. When a
//! site's cache slot is empty they capture the argument registers into a
//! [`TransitionBlock`] and call one of the workers below, which runs the
//! generator, validates its result and publishes it. The trampoline then
//! restores the registers and re-reads the slot.
//!
//! [`resolve`] is the same state machine without the register handling, for
//! hosts that drive dispatch themselves.

mod failure;

pub use failure::{clear_last_failure, take_last_failure};

use tracing::{debug, error, trace, warn};
use varcall_sdk::{CallSiteKind, EntryPoint, GenerationRequest, HiddenWord, TransitionBlock};

use crate::arch;
use crate::error::DispatchError;
use crate::site::CallSiteDescriptor;

/// Return the site's cached stub, generating and publishing one if the slot
/// is empty.
///
/// The slot is re-read after publication, so the returned entry is whatever
/// the slot holds at that point (possibly another thread's equivalent stub).
/// A failure leaves the slot untouched.
pub fn resolve(
    site: &CallSiteDescriptor,
    block: &TransitionBlock,
    hidden: HiddenWord,
) -> Result<EntryPoint, DispatchError> {
    loop {
        if let Some(entry) = site.try_get_cached_stub() {
            return Ok(entry);
        }
        generate_and_publish(site, block, hidden)?;
    }
}

/// One slow-path step: generate a stub for `site` and store it.
pub(crate) fn generate_and_publish(
    site: &CallSiteDescriptor,
    block: &TransitionBlock,
    hidden: HiddenWord,
) -> Result<EntryPoint, DispatchError> {
    let shared = site.shared();
    let record_stats = shared.config.record_stats;
    if record_stats {
        shared.stats.record_slow_path();
    }

    let target = site.kind().decode_hidden(hidden);
    trace!(
        site = site.address(),
        kind = %site.kind(),
        signature = %site.signature(),
        %target,
        "slow path"
    );

    let request = GenerationRequest {
        transition_block: block,
        site: site.info(),
        target,
    };
    if record_stats {
        shared.stats.record_generation();
    }
    let entry = match shared.generator.generate(&request) {
        Ok(entry) => entry,
        Err(err) => {
            if record_stats {
                shared.stats.record_failure();
            }
            warn!(
                site = site.address(),
                kind = %site.kind(),
                generator = shared.generator.name(),
                error = %err,
                "stub generation failed"
            );
            return Err(err.into());
        }
    };

    if shared.config.validate_entry_points && !entry.is_aligned_to(arch::ENTRY_ALIGNMENT) {
        if record_stats {
            shared.stats.record_rejected();
        }
        warn!(site = site.address(), %entry, "rejected misaligned entry point");
        return Err(DispatchError::InvalidEntryPoint {
            site: site.address(),
            kind: site.kind(),
            entry,
        });
    }

    site.store_stub(entry);
    if record_stats {
        shared.stats.record_store();
    }
    debug!(
        site = site.address(),
        kind = %site.kind(),
        signature = %site.signature(),
        %entry,
        "stub published"
    );
    Ok(entry)
}

/// Log and abort. Used where no caller exists to report to.
#[cold]
pub(crate) fn fatal(message: &str) -> ! {
    error!("{}", message);
    std::process::abort()
}

/// Worker called by the vararg trampoline's slow path.
///
/// Returns the published entry point, or 0 after parking the error in the
/// thread's failure slot. A panic escaping the generator aborts the process.
pub(crate) unsafe extern "C" fn vararg_worker(
    block: *mut TransitionBlock,
    site: *const CallSiteDescriptor,
    hidden: usize,
) -> usize {
    native_slow_path(CallSiteKind::Vararg, block, site, hidden)
}

/// Worker called by the generic indirect-call trampoline's slow path
pub(crate) unsafe extern "C" fn calli_worker(
    block: *mut TransitionBlock,
    site: *const CallSiteDescriptor,
    hidden: usize,
) -> usize {
    native_slow_path(CallSiteKind::GenericCalli, block, site, hidden)
}

unsafe fn native_slow_path(
    expected: CallSiteKind,
    block: *mut TransitionBlock,
    site: *const CallSiteDescriptor,
    hidden: usize,
) -> usize {
    if site.is_null() || block.is_null() {
        fatal("dispatch trampoline entered without a call-site descriptor");
    }
    let site = &*site;
    let block = &*block;
    if site.kind() != expected {
        fatal(&format!(
            "{} call-site descriptor {:#x} reached the {} trampoline",
            site.kind(),
            site.address(),
            expected
        ));
    }

    match generate_and_publish(site, block, HiddenWord::from_raw(hidden)) {
        Ok(entry) => entry.addr(),
        Err(err) => {
            failure::record(err);
            0
        }
    }
}
