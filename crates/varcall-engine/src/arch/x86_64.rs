//! x86_64 System V trampolines
//!
//! Argument registers: rdi rsi rdx rcx r8 r9, plus al holding the vector
//! register count of a variadic call. Hidden argument in r10, descriptor in
//! r11 (both caller-saved and unused by the SysV argument sequence).

use std::arch::naked_asm;

use varcall_sdk::transition::offsets;
use varcall_sdk::CallSiteKind;

use crate::dispatch::{calli_worker, vararg_worker};
use crate::method::NATIVE_METHOD_ENTRY_OFFSET;
use crate::site::CACHED_STUB_OFFSET;

/// Whether this target has real trampolines
pub const SUPPORTED: bool = true;
/// Register carrying the hidden argument
pub const HIDDEN_ARGUMENT_REGISTER: &str = "r10";
/// Register carrying the call-site descriptor
pub const CALL_SITE_REGISTER: &str = "r11";
/// Required alignment of a stub entry point
pub const ENTRY_ALIGNMENT: usize = 1;

const VARARG_SAVES_FLOATS: usize = CallSiteKind::Vararg.saves_float_registers() as usize;
const CALLI_SAVES_FLOATS: usize = CallSiteKind::GenericCalli.saves_float_registers() as usize;

macro_rules! dispatch_trampoline {
    ($(#[$attr:meta])* $name:ident, $worker:path, $save_floats:expr) => {
        $(#[$attr])*
        #[unsafe(naked)]
        pub unsafe extern "C" fn $name() {
            naked_asm!(
                // Initial check. Nothing but flags is touched before the jump.
                "2:",
                "cmp qword ptr [r11 + {cache}], 0",
                "je 3f",
                "jmp qword ptr [r11 + {cache}]",

                // Slow path. rbp anchors the caller's stack arguments at rbp+16
                // and keeps rsp 16-byte aligned for the worker call.
                "3:",
                "push rbp",
                "mov rbp, rsp",
                "sub rsp, {frame}",
                "mov [rsp + {gp}], rdi",
                "mov [rsp + {gp} + 8], rsi",
                "mov [rsp + {gp} + 16], rdx",
                "mov [rsp + {gp} + 24], rcx",
                "mov [rsp + {gp} + 32], r8",
                "mov [rsp + {gp} + 40], r9",
                "mov [rsp + {gp} + 48], rax",
                "mov [rsp + {hidden}], r10",
                "mov [rsp + {site}], r11",
                "lea rax, [rbp + 16]",
                "mov [rsp + {stack_args}], rax",
                "mov qword ptr [rsp + {saved}], {save_floats}",
                "cmp qword ptr [rsp + {saved}], 0",
                "je 4f",
                "movdqu [rsp + {fp}], xmm0",
                "movdqu [rsp + {fp} + 16], xmm1",
                "movdqu [rsp + {fp} + 32], xmm2",
                "movdqu [rsp + {fp} + 48], xmm3",
                "movdqu [rsp + {fp} + 64], xmm4",
                "movdqu [rsp + {fp} + 80], xmm5",
                "movdqu [rsp + {fp} + 96], xmm6",
                "movdqu [rsp + {fp} + 112], xmm7",
                "4:",
                "mov rdi, rsp",
                "mov rsi, r11",
                "mov rdx, r10",
                "call {worker}",
                "test rax, rax",
                "jz 6f",

                // Reload exactly what was captured and re-run the check.
                "cmp qword ptr [rsp + {saved}], 0",
                "je 5f",
                "movdqu xmm0, [rsp + {fp}]",
                "movdqu xmm1, [rsp + {fp} + 16]",
                "movdqu xmm2, [rsp + {fp} + 32]",
                "movdqu xmm3, [rsp + {fp} + 48]",
                "movdqu xmm4, [rsp + {fp} + 64]",
                "movdqu xmm5, [rsp + {fp} + 80]",
                "movdqu xmm6, [rsp + {fp} + 96]",
                "movdqu xmm7, [rsp + {fp} + 112]",
                "5:",
                "mov rdi, [rsp + {gp}]",
                "mov rsi, [rsp + {gp} + 8]",
                "mov rdx, [rsp + {gp} + 16]",
                "mov rcx, [rsp + {gp} + 24]",
                "mov r8, [rsp + {gp} + 32]",
                "mov r9, [rsp + {gp} + 40]",
                "mov rax, [rsp + {gp} + 48]",
                "mov r10, [rsp + {hidden}]",
                "mov r11, [rsp + {site}]",
                "mov rsp, rbp",
                "pop rbp",
                "jmp 2b",

                // Generation failed. The worker parked the error; return
                // zeroed result registers to the original caller.
                "6:",
                "mov rsp, rbp",
                "pop rbp",
                "xor eax, eax",
                "xor edx, edx",
                "xorps xmm0, xmm0",
                "xorps xmm1, xmm1",
                "ret",
                cache = const CACHED_STUB_OFFSET,
                frame = const offsets::SIZE,
                gp = const offsets::ARGUMENT_REGISTERS,
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
/// registers, shift `a0..a2` into place, set al for variadic callees and
/// tail-jump to `entry`. The seventh argument arrives on the stack.
#[unsafe(naked)]
pub unsafe extern "C" fn enter_call_site() {
    naked_asm!(
        "mov r11, rsi",
        "mov r10, rdx",
        "mov rax, rdi",
        "mov rdi, rcx",
        "mov rsi, r8",
        "mov rdx, r9",
        "mov rcx, rax",
        "mov eax, dword ptr [rsp + 8]",
        "jmp rcx",
    );
}

#[unsafe(naked)]
pub unsafe extern "C" fn pass_through() {
    naked_asm!(
        "test r10b, 1",
        "jz 2f",
        "shr r10, 1",
        "jmp r10",
        "2:",
        "jmp qword ptr [r10 + {entry}]",
        entry = const NATIVE_METHOD_ENTRY_OFFSET,
    );
}
