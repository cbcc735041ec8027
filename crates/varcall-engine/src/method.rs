//! Native method descriptors
//!
//! The runtime-side record a `MethodTarget` hidden argument points at. Only
//! the first word is part of the machine interface: pass-through stubs load
//! the native entry from it.

use std::mem::offset_of;

use varcall_sdk::{EntryPoint, HiddenArgument, HiddenWord};

use crate::loader::{Library, LoadError};

/// Descriptor of a bound native method
///
/// The descriptor's address is what a call site passes as the hidden
/// argument, so it must stay put while calls are in flight (box it or
/// keep it in a static).
#[repr(C)]
#[derive(Debug)]
pub struct NativeMethod {
    entry: EntryPoint,
    name: String,
}

/// Byte offset of the native entry inside [`NativeMethod`]
pub const NATIVE_METHOD_ENTRY_OFFSET: usize = offset_of!(NativeMethod, entry);

const _: () = assert!(NATIVE_METHOD_ENTRY_OFFSET == 0);
// Bit 0 of a descriptor address is reserved for the native-target tag.
const _: () = assert!(std::mem::align_of::<NativeMethod>() >= 2);

impl NativeMethod {
    /// Describe a native function by name and entry point
    pub fn new(name: impl Into<String>, entry: EntryPoint) -> Self {
        NativeMethod {
            entry,
            name: name.into(),
        }
    }

    /// Resolve `symbol` in `library` and describe it
    pub fn bind(library: &Library, symbol: &str) -> Result<Self, LoadError> {
        let entry = library.symbol_address(symbol)?;
        tracing::debug!(symbol, library = library.path(), %entry, "bound native method");
        Ok(Self::new(symbol, entry))
    }

    /// Native entry point
    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    /// Symbol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hidden argument naming this descriptor
    pub fn as_target(&self) -> HiddenArgument {
        HiddenArgument::MethodTarget(self as *const Self as usize)
    }

    /// Hidden-register word for this descriptor (method targets are never tagged)
    pub fn hidden_word(&self) -> HiddenWord {
        HiddenWord::from_raw(self as *const Self as usize)
    }
}
