//! Transition block
//!
//! Stack-resident snapshot of the incoming argument registers, built by the
//! dispatch trampoline's slow path before it calls into the generation worker
//! and reloaded from the same memory afterwards. The layout is `#[repr(C)]`
//! and the trampolines address fields through `offset_of!` constants, so the
//! Rust view and the assembly view cannot drift apart.
//!
//! | target | integer registers | float registers |
//! |--------|-------------------|-----------------|
//! | x86_64 | rdi rsi rdx rcx r8 r9 rax | xmm0-xmm7 |
//! | aarch64 | x0-x7 x8 | q0-q7 |
//!
//! `rax` carries the vector-register count of a SysV variadic call and `x8`
//! the indirect result location on AAPCS64; both must reach the stub intact,
//! so they are captured alongside the argument registers.

use std::fmt;

/// Number of integer/pointer registers captured in a transition block
#[cfg(target_arch = "x86_64")]
pub const NUM_ARGUMENT_REGISTERS: usize = 7;
/// Number of integer/pointer registers captured in a transition block
#[cfg(target_arch = "aarch64")]
pub const NUM_ARGUMENT_REGISTERS: usize = 9;
/// Number of integer/pointer registers captured in a transition block
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const NUM_ARGUMENT_REGISTERS: usize = 8;

/// Number of floating-point argument registers captured when required
pub const NUM_FLOAT_ARGUMENT_REGISTERS: usize = 8;

/// Names of the captured integer registers, in slot order
#[cfg(target_arch = "x86_64")]
pub const ARGUMENT_REGISTER_NAMES: [&str; NUM_ARGUMENT_REGISTERS] =
    ["rdi", "rsi", "rdx", "rcx", "r8", "r9", "rax"];
/// Names of the captured integer registers, in slot order
#[cfg(target_arch = "aarch64")]
pub const ARGUMENT_REGISTER_NAMES: [&str; NUM_ARGUMENT_REGISTERS] =
    ["x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8"];
/// Names of the captured integer registers, in slot order
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const ARGUMENT_REGISTER_NAMES: [&str; NUM_ARGUMENT_REGISTERS] =
    ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"];

/// Name of the float register family
#[cfg(target_arch = "x86_64")]
pub const FLOAT_REGISTER_PREFIX: &str = "xmm";
/// Name of the float register family
#[cfg(not(target_arch = "x86_64"))]
pub const FLOAT_REGISTER_PREFIX: &str = "q";

/// Integer argument registers in calling-convention order
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ArgumentRegisters {
    /// Register values
    pub regs: [usize; NUM_ARGUMENT_REGISTERS],
}

impl fmt::Debug for ArgumentRegisters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in ARGUMENT_REGISTER_NAMES.iter().zip(self.regs.iter()) {
            map.entry(name, &format_args!("{:#x}", value));
        }
        map.finish()
    }
}

/// Full 128-bit contents of the float/vector argument registers
#[repr(C, align(16))]
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct FloatArgumentRegisters {
    /// Register contents, low quadword first
    pub regs: [[u64; 2]; NUM_FLOAT_ARGUMENT_REGISTERS],
}

impl FloatArgumentRegisters {
    /// Build a register file holding one `f64` in the low lane of each register
    pub fn from_f64s(values: [f64; NUM_FLOAT_ARGUMENT_REGISTERS]) -> Self {
        let mut regs = [[0u64; 2]; NUM_FLOAT_ARGUMENT_REGISTERS];
        for (reg, value) in regs.iter_mut().zip(values) {
            reg[0] = value.to_bits();
        }
        FloatArgumentRegisters { regs }
    }

    /// Low lane of register `index` as an `f64`
    pub fn f64_at(&self, index: usize) -> f64 {
        f64::from_bits(self.regs[index][0])
    }
}

/// Register snapshot shared between the trampoline and the generation worker
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TransitionBlock {
    /// Integer argument registers
    pub argument_registers: ArgumentRegisters,
    /// Hidden-argument register as received (still tagged)
    pub hidden_argument: usize,
    /// Call-site descriptor register
    pub call_site: usize,
    /// Address of the first argument the caller passed on the stack
    pub stack_arguments: usize,
    /// Non-zero when `float_registers` holds live values
    pub float_registers_saved: usize,
    /// Float/vector argument registers (undefined unless saved)
    pub float_registers: FloatArgumentRegisters,
}

/// Byte offsets of each field, consumed by the trampolines as `const` operands
pub mod offsets {
    use super::TransitionBlock;
    use std::mem::{offset_of, size_of};

    /// Offset of the integer argument registers
    pub const ARGUMENT_REGISTERS: usize = offset_of!(TransitionBlock, argument_registers);
    /// Offset of the saved hidden argument
    pub const HIDDEN_ARGUMENT: usize = offset_of!(TransitionBlock, hidden_argument);
    /// Offset of the saved call-site descriptor
    pub const CALL_SITE: usize = offset_of!(TransitionBlock, call_site);
    /// Offset of the caller's stack-argument pointer
    pub const STACK_ARGUMENTS: usize = offset_of!(TransitionBlock, stack_arguments);
    /// Offset of the float-saved flag
    pub const FLOAT_REGISTERS_SAVED: usize = offset_of!(TransitionBlock, float_registers_saved);
    /// Offset of the float argument registers
    pub const FLOAT_REGISTERS: usize = offset_of!(TransitionBlock, float_registers);
    /// Bytes reserved on the stack for one block
    pub const SIZE: usize = size_of::<TransitionBlock>();

    const _: () = assert!(ARGUMENT_REGISTERS == 0);
    const _: () = assert!(FLOAT_REGISTERS % 16 == 0);
    const _: () = assert!(SIZE % 16 == 0);
}

impl TransitionBlock {
    /// Build a block by hand (portable resolution, tests)
    pub fn new(
        argument_registers: ArgumentRegisters,
        float_registers: Option<FloatArgumentRegisters>,
        hidden_argument: usize,
        call_site: usize,
    ) -> Self {
        TransitionBlock {
            argument_registers,
            hidden_argument,
            call_site,
            stack_arguments: 0,
            float_registers_saved: float_registers.is_some() as usize,
            float_registers: float_registers.unwrap_or_default(),
        }
    }

    /// Integer argument register `index` in convention order
    pub fn argument_register(&self, index: usize) -> usize {
        self.argument_registers.regs[index]
    }

    /// Whether the float argument registers were captured
    pub fn floats_saved(&self) -> bool {
        self.float_registers_saved != 0
    }

    /// Float argument registers, if the call convention required capturing them
    pub fn float_registers(&self) -> Option<&FloatArgumentRegisters> {
        if self.floats_saved() {
            Some(&self.float_registers)
        } else {
            None
        }
    }

    /// Raw hidden-argument word as it arrived in the register
    pub fn hidden_word(&self) -> crate::HiddenWord {
        crate::HiddenWord::from_raw(self.hidden_argument)
    }

    /// Read the `index`th stack-passed argument word.
    ///
    /// # Safety
    ///
    /// The block must have been built by a trampoline (so `stack_arguments`
    /// points into the caller's frame) and the caller must actually have
    /// passed at least `index + 1` stack words.
    pub unsafe fn stack_argument(&self, index: usize) -> usize {
        debug_assert!(self.stack_arguments != 0);
        *(self.stack_arguments as *const usize).add(index)
    }
}

impl fmt::Debug for TransitionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TransitionBlock");
        s.field("argument_registers", &self.argument_registers)
            .field("hidden_argument", &format_args!("{:#x}", self.hidden_argument))
            .field("call_site", &format_args!("{:#x}", self.call_site))
            .field("stack_arguments", &format_args!("{:#x}", self.stack_arguments));
        match self.float_registers() {
            Some(floats) => s.field("float_registers", floats),
            None => s.field("float_registers", &"<not saved>"),
        };
        s.finish()
    }
}
