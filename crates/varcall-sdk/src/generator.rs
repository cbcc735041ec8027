//! Stub-generation contract
//!
//! The dispatch engine calls a generator the first time a call site is used
//! (and again on any thread that races that first use). The generator turns
//! the call site's signature plus the decoded hidden argument into a callable
//! stub and returns its entry point.
//!
//! Requirements the engine relies on:
//! - Repeated generation for the same call site yields behaviorally
//!   interchangeable entry points; the engine stores whichever finishes last.
//! - The generator is re-entrant and callable from any native thread.
//! - It depends only on the request, never on the register state of the
//!   thread that happens to call it.
//! - On failure it returns an error; the engine does not cache it and hands
//!   it back to the original caller.

use std::fmt;

use crate::entry::EntryPoint;
use crate::error::GenerationResult;
use crate::hidden::{HiddenArgument, HiddenWord};
use crate::signature::CallSignature;
use crate::transition::TransitionBlock;

/// Whether the target ABI passes floating arguments of a variadic call in
/// vector registers (SysV x86_64, AAPCS64 outside Apple platforms).
pub const VARIADIC_FLOATS_IN_REGISTERS: bool = cfg!(not(any(
    windows,
    all(target_arch = "aarch64", target_vendor = "apple")
)));

/// The two call-site variants served by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallSiteKind {
    /// Variadic native call. The hidden argument is always an untagged
    /// method descriptor.
    Vararg,
    /// Generic indirect ("calli") native call. The hidden argument is tagged
    /// and may carry either a method descriptor or a native pointer.
    GenericCalli,
}

impl CallSiteKind {
    /// Whether the slow path must capture the float argument registers
    pub const fn saves_float_registers(self) -> bool {
        match self {
            CallSiteKind::Vararg => VARIADIC_FLOATS_IN_REGISTERS,
            CallSiteKind::GenericCalli => true,
        }
    }

    /// Whether hidden arguments at this kind of site carry the native tag bit
    pub const fn tags_hidden_argument(self) -> bool {
        matches!(self, CallSiteKind::GenericCalli)
    }

    /// Decode a hidden word according to this site kind's convention
    pub const fn decode_hidden(self, word: HiddenWord) -> HiddenArgument {
        match self {
            CallSiteKind::Vararg => HiddenArgument::untagged_method(word),
            CallSiteKind::GenericCalli => HiddenArgument::decode(word),
        }
    }

    /// Short name used in logs and reports
    pub const fn as_str(self) -> &'static str {
        match self {
            CallSiteKind::Vararg => "vararg",
            CallSiteKind::GenericCalli => "calli",
        }
    }
}

impl fmt::Display for CallSiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the call-site descriptor handed to a generator
#[derive(Debug, Clone, Copy)]
pub struct CallSiteInfo<'a> {
    /// Which trampoline variant the site uses
    pub kind: CallSiteKind,
    /// The site's signature
    pub signature: &'a CallSignature,
    /// Address of the descriptor (stable for the descriptor's lifetime)
    pub address: usize,
}

/// Everything a generator receives for one generation
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Registers captured on entry to the slow path
    pub transition_block: &'a TransitionBlock,
    /// The call site being resolved
    pub site: CallSiteInfo<'a>,
    /// Decoded hidden argument, with its discriminant
    pub target: HiddenArgument,
}

/// Produces call stubs for call sites
pub trait StubGenerator: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Generate (or look up) the stub for `request.site`.
    fn generate(&self, request: &GenerationRequest<'_>) -> GenerationResult<EntryPoint>;
}

impl<F> StubGenerator for F
where
    F: Fn(&GenerationRequest<'_>) -> GenerationResult<EntryPoint> + Send + Sync,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> GenerationResult<EntryPoint> {
        self(request)
    }
}
