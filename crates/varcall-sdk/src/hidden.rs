//! Hidden-argument codec
//!
//! A call site passes one extra word in a designated register. Generic
//! indirect call sites may put either a managed method descriptor or a raw
//! native function pointer there, so the two are told apart by bit 0:
//!
//! ```text
//! MethodTarget(m)  ->  m               (m is at least 2-byte aligned, bit 0 = 0)
//! NativeTarget(p)  ->  (p << 1) | 1
//! ```
//!
//! Vararg call sites always pass a method descriptor and never tag it.

use std::fmt;

use crate::error::CodecError;

/// Bit set in a hidden word that carries a native function pointer
pub const NATIVE_TARGET_TAG: usize = 1;

const TOP_BIT: usize = 1 << (usize::BITS - 1);

/// Raw value of the hidden-argument register
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HiddenWord(usize);

impl HiddenWord {
    /// Wrap a register value as seen by the trampoline
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        HiddenWord(raw)
    }

    /// The register value
    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Whether bit 0 marks a native target
    #[inline]
    pub const fn is_tagged(self) -> bool {
        self.0 & NATIVE_TARGET_TAG != 0
    }
}

impl fmt::Debug for HiddenWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HiddenWord({:#x})", self.0)
    }
}

/// Which variant a decoded hidden argument is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A managed method descriptor
    Method,
    /// A raw native function pointer
    Native,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Method => f.write_str("method"),
            TargetKind::Native => f.write_str("native"),
        }
    }
}

/// Decoded hidden argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HiddenArgument {
    /// Address of a managed method descriptor
    MethodTarget(usize),
    /// Address of a native function
    NativeTarget(usize),
}

impl HiddenArgument {
    /// Checked constructor for a method descriptor target
    pub fn method(descriptor: usize) -> Result<Self, CodecError> {
        let target = HiddenArgument::MethodTarget(descriptor);
        target.encode()?;
        Ok(target)
    }

    /// Checked constructor for a native function target
    pub fn native(function: usize) -> Result<Self, CodecError> {
        let target = HiddenArgument::NativeTarget(function);
        target.encode()?;
        Ok(target)
    }

    /// Encode into the single word passed in the hidden register.
    ///
    /// Method descriptors pass through untouched; native pointers are
    /// shifted left and tagged.
    pub fn encode(self) -> Result<HiddenWord, CodecError> {
        match self {
            HiddenArgument::MethodTarget(0) | HiddenArgument::NativeTarget(0) => {
                Err(CodecError::NullTarget)
            }
            HiddenArgument::MethodTarget(m) if m & NATIVE_TARGET_TAG != 0 => {
                Err(CodecError::MisalignedMethod(m))
            }
            HiddenArgument::MethodTarget(m) => Ok(HiddenWord(m)),
            HiddenArgument::NativeTarget(p) if p & TOP_BIT != 0 => {
                Err(CodecError::NativeAddressOverflow(p))
            }
            HiddenArgument::NativeTarget(p) => Ok(HiddenWord((p << 1) | NATIVE_TARGET_TAG)),
        }
    }

    /// Decode a tagged word. Total: every word maps to exactly one variant.
    #[inline]
    pub const fn decode(word: HiddenWord) -> Self {
        if word.is_tagged() {
            HiddenArgument::NativeTarget(word.0 >> 1)
        } else {
            HiddenArgument::MethodTarget(word.0)
        }
    }

    /// Interpret a word from a call site that never tags (vararg calls)
    #[inline]
    pub const fn untagged_method(word: HiddenWord) -> Self {
        HiddenArgument::MethodTarget(word.0)
    }

    /// The discriminant
    #[inline]
    pub const fn kind(&self) -> TargetKind {
        match self {
            HiddenArgument::MethodTarget(_) => TargetKind::Method,
            HiddenArgument::NativeTarget(_) => TargetKind::Native,
        }
    }

    /// The decoded address, whichever variant this is
    #[inline]
    pub const fn address(&self) -> usize {
        match *self {
            HiddenArgument::MethodTarget(a) | HiddenArgument::NativeTarget(a) => a,
        }
    }

    /// Whether this is a native function target
    #[inline]
    pub const fn is_native(&self) -> bool {
        matches!(self, HiddenArgument::NativeTarget(_))
    }
}

impl fmt::Display for HiddenArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.kind(), self.address())
    }
}
