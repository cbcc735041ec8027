//! Stub entry points

use std::fmt;
use std::num::NonZeroUsize;

/// Address of a callable stub.
///
/// An entry point is never null: the empty cache slot is represented by
/// `Option<EntryPoint>::None`, which has the same size as a bare address.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPoint(NonZeroUsize);

impl EntryPoint {
    /// Wrap a raw code address. Returns `None` for null.
    #[inline]
    pub const fn new(addr: usize) -> Option<Self> {
        match NonZeroUsize::new(addr) {
            Some(addr) => Some(EntryPoint(addr)),
            None => None,
        }
    }

    /// Wrap a code pointer. Returns `None` for null.
    #[inline]
    pub fn from_ptr(ptr: *const ()) -> Option<Self> {
        Self::new(ptr as usize)
    }

    /// Entry point of a function with the C ABI
    #[inline]
    pub fn of(function: unsafe extern "C" fn()) -> Self {
        // SAFETY: function pointers are never null
        EntryPoint(unsafe { NonZeroUsize::new_unchecked(function as usize) })
    }

    /// The raw code address
    #[inline]
    pub const fn addr(self) -> usize {
        self.0.get()
    }

    /// The code address as an untyped pointer
    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.0.get() as *const ()
    }

    /// Whether the address satisfies an instruction alignment requirement
    #[inline]
    pub const fn is_aligned_to(self, align: usize) -> bool {
        self.0.get() % align == 0
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryPoint({:#x})", self.addr())
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.addr())
    }
}
