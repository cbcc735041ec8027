//! Owning interface pointer

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

use crate::guid::Guid;
use crate::hresult::HResult;
use crate::unknown::IUnknownVtbl;

/// Owned reference to an object implementing `IUnknown`.
///
/// Clone adds a reference, Drop releases one.
pub struct ComPtr {
    ptr: NonNull<c_void>,
}

// Objects built by this crate are `Send + Sync`; foreign pointers wrapped with
// `from_raw*` must be free-threaded.
unsafe impl Send for ComPtr {}
unsafe impl Sync for ComPtr {}

impl ComPtr {
    /// Take ownership of one existing reference (for example one returned
    /// through an out-parameter). Returns `None` for null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point at an object whose first word is a
    /// pointer to an `IUnknownVtbl`-prefixed vtable, and the caller must own
    /// the reference being transferred.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| ComPtr { ptr })
    }

    pub(crate) unsafe fn from_non_null(ptr: NonNull<c_void>) -> Self {
        ComPtr { ptr }
    }

    /// Add a reference to a borrowed pointer and own it.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point at a live object as for [`ComPtr::from_raw`].
    pub unsafe fn from_raw_borrowed(ptr: *mut c_void) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let this = ComPtr { ptr };
        (this.vtbl().add_ref)(ptr.as_ptr());
        Some(this)
    }

    /// The interface pointer
    pub fn as_raw(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    /// Give up ownership without releasing
    pub fn into_raw(self) -> *mut c_void {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    fn vtbl(&self) -> &IUnknownVtbl {
        // SAFETY: the first word of every wrapped object is its vtable pointer
        unsafe { &**(self.ptr.as_ptr() as *const *const IUnknownVtbl) }
    }

    /// Ask the object for another interface
    pub fn query_interface(&self, iid: &Guid) -> Result<ComPtr, HResult> {
        let mut out = ptr::null_mut();
        // SAFETY: `out` is a valid out-pointer, the object is live
        let hr = unsafe { (self.vtbl().query_interface)(self.as_raw(), iid, &mut out) };
        hr.ok()?;
        // SAFETY: a successful query transfers one reference through `out`
        unsafe { ComPtr::from_raw(out) }.ok_or(crate::hresult::E_POINTER)
    }

    /// Reinterpret the vtable as `V`.
    ///
    /// # Safety
    ///
    /// The pointer must have been obtained for an interface whose vtable
    /// layout is `V`.
    pub unsafe fn vtable<V>(&self) -> &V {
        &**(self.ptr.as_ptr() as *const *const V)
    }
}

impl Clone for ComPtr {
    fn clone(&self) -> Self {
        // SAFETY: the object is live while `self` holds a reference
        unsafe { (self.vtbl().add_ref)(self.as_raw()) };
        ComPtr { ptr: self.ptr }
    }
}

impl Drop for ComPtr {
    fn drop(&mut self) {
        // SAFETY: this wrapper owns exactly one reference
        unsafe { (self.vtbl().release)(self.as_raw()) };
    }
}

impl PartialEq for ComPtr {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for ComPtr {}

impl fmt::Debug for ComPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComPtr({:p})", self.ptr)
    }
}
