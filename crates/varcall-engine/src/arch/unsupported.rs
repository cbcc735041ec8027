//! Targets without trampolines. Every entry point is a fatal trap.

use crate::dispatch::fatal;

/// Whether this target has real trampolines
pub const SUPPORTED: bool = false;
/// Register carrying the hidden argument
pub const HIDDEN_ARGUMENT_REGISTER: &str = "<none>";
/// Register carrying the call-site descriptor
pub const CALL_SITE_REGISTER: &str = "<none>";
/// Required alignment of a stub entry point
pub const ENTRY_ALIGNMENT: usize = 1;

pub unsafe extern "C" fn vararg_dispatch() {
    fatal("vararg native call dispatch is not implemented for this target")
}

pub unsafe extern "C" fn generic_calli_dispatch() {
    fatal("generic indirect native call dispatch is not implemented for this target")
}

pub unsafe extern "C" fn enter_call_site() {
    fatal("native call dispatch is not implemented for this target")
}

pub unsafe extern "C" fn pass_through() {
    fatal("pass-through stubs are not implemented for this target")
}
