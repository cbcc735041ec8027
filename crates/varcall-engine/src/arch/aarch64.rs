//! AArch64 (AAPCS64) trampolines
//!
//! Argument registers: x0-x7, plus x8 as the indirect result location.
//! Hidden argument in x12, descriptor in x15. x16 is the scratch register
//! for the tail jump.

use std::arch::naked_asm;

use varcall_sdk::transition::offsets;
use varcall_sdk::CallSiteKind;

use crate::dispatch::{calli_worker, vararg_worker};
use crate::method::NATIVE_METHOD_ENTRY_OFFSET;
use crate::site::CACHED_STUB_OFFSET;

/// Whether this target has real trampolines
pub const SUPPORTED: bool = true;
/// Register carrying the hidden argument
pub const HIDDEN_ARGUMENT_REGISTER: &str = "x12";
/// Register carrying the call-site descriptor
pub const CALL_SITE_REGISTER: &str = "x15";
/// Required alignment of a stub entry point
pub const ENTRY_ALIGNMENT: usize = 4;

const VARARG_SAVES_FLOATS: usize = CallSiteKind::Vararg.saves_float_registers() as usize;
const CALLI_SAVES_FLOATS: usize = CallSiteKind::GenericCalli.saves_float_registers() as usize;

// The integer registers are spilled at fixed offsets from the block base.
const _: () = assert!(offsets::ARGUMENT_REGISTERS == 0);
const _: () = assert!(CACHED_STUB_OFFSET == 0);

macro_rules! dispatch_trampoline {
    ($(#[$attr:meta])* $name:ident, $worker:path, $save_floats:expr) => {
        $(#[$attr])*
        #[unsafe(naked)]
        pub unsafe extern "C" fn $name() {
            naked_asm!(
                // Initial check
                "2:",
                "ldar x16, [x15]",
                "cbz x16, 3f",
                "br x16",

                // Slow path
                "3:",
                "stp x29, x30, [sp, #-16]!",
                "mov x29, sp",
                "sub sp, sp, #{frame}",
                "stp x0, x1, [sp]",
                "stp x2, x3, [sp, #16]",
                "stp x4, x5, [sp, #32]",
                "stp x6, x7, [sp, #48]",
                "str x8, [sp, #64]",
                "str x12, [sp, #{hidden}]",
                "str x15, [sp, #{site}]",
                "add x9, x29, #16",
                "str x9, [sp, #{stack_args}]",
                "mov x9, #{save_floats}",
                "str x9, [sp, #{saved}]",
                "cbz x9, 4f",
                "add x9, sp, #{fp}",
                "stp q0, q1, [x9]",
                "stp q2, q3, [x9, #32]",
                "stp q4, q5, [x9, #64]",
                "stp q6, q7, [x9, #96]",
                "4:",
                "mov x0, sp",
                "mov x1, x15",
                "mov x2, x12",
                "bl {worker}",
                "cbz x0, 6f",

                // Reload and re-run the check
                "ldr x9, [sp, #{saved}]",
                "cbz x9, 5f",
                "add x9, sp, #{fp}",
                "ldp q0, q1, [x9]",
                "ldp q2, q3, [x9, #32]",
                "ldp q4, q5, [x9, #64]",
                "ldp q6, q7, [x9, #96]",
                "5:",
                "ldp x0, x1, [sp]",
                "ldp x2, x3, [sp, #16]",
                "ldp x4, x5, [sp, #32]",
                "ldp x6, x7, [sp, #48]",
                "ldr x8, [sp, #64]",
                "ldr x12, [sp, #{hidden}]",
                "ldr x15, [sp, #{site}]",
                "mov sp, x29",
                "ldp x29, x30, [sp], #16",
                "b 2b",

                // Generation failed; x0 is already zero
                "6:",
                "mov sp, x29",
                "ldp x29, x30, [sp], #16",
                "mov x1, xzr",
                "movi d0, #0",
                "movi d1, #0",
                "ret",
                frame = const offsets::SIZE,
                hidden = const offsets::HIDDEN_ARGUMENT,
                site = const offsets::CALL_SITE,
                stack_args = const offsets::STACK_ARGUMENTS,
                saved = const offsets::FLOAT_REGISTERS_SAVED,
                fp = const offsets::FLOAT_REGISTERS,
                save_floats = const $save_floats,
                worker = sym $worker,
            );
        }
    };
}

dispatch_trampoline!(
    /// Trampoline shared by every variadic call site
    vararg_dispatch,
    vararg_worker,
    VARARG_SAVES_FLOATS
);

dispatch_trampoline!(
    /// Trampoline shared by every generic indirect call site
    generic_calli_dispatch,
    calli_worker,
    CALLI_SAVES_FLOATS
);

/// `(entry, site, hidden, a0, a1, a2, vector_count)`: load the dedicated
/// registers, shift `a0..a2` into place and tail-jump to `entry`. AAPCS64
/// has no vector count register, so the last argument is ignored.
#[unsafe(naked)]
pub unsafe extern "C" fn enter_call_site() {
    naked_asm!(
        "mov x16, x0",
        "mov x15, x1",
        "mov x12, x2",
        "mov x0, x3",
        "mov x1, x4",
        "mov x2, x5",
        "br x16",
    );
}

#[unsafe(naked)]
pub unsafe extern "C" fn pass_through() {
    naked_asm!(
        "tbz x12, #0, 2f",
        "lsr x16, x12, #1",
        "br x16",
        "2:",
        "ldr x16, [x12, #{entry}]",
        "br x16",
        entry = const NATIVE_METHOD_ENTRY_OFFSET,
    );
}
