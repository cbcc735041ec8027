//! IUnknown: reference counting and interface queries
//!
//! A [`ComObject`] is a heap block whose first word points at a vtable that
//! starts with [`IUnknownVtbl`]. The three `IUnknown` entries are generic
//! `extern "system"` functions instantiated per class, so any caller that
//! speaks the binary interface (native code included) can query, retain and
//! release the object.

use std::alloc::{alloc, dealloc, Layout};
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use std::sync::atomic::{fence, AtomicU32, Ordering};

use crate::guid::{Guid, IID_IUNKNOWN};
use crate::hresult::{HResult, E_NOINTERFACE, E_OUTOFMEMORY, E_POINTER, S_OK};
use crate::ptr::ComPtr;

/// Atomic reference count. Starts at 1 for the creating owner.
#[derive(Debug)]
pub struct RefCount(AtomicU32);

impl RefCount {
    /// Count owned by the creator
    pub fn new() -> Self {
        RefCount(AtomicU32::new(1))
    }

    /// Add a reference, returning the new count
    pub fn add_ref(&self) -> u32 {
        let previous = self.0.fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "add_ref on a destroyed object");
        previous + 1
    }

    /// Drop a reference, returning the new count. The owner destroys the
    /// object when this returns 0.
    pub fn release(&self) -> u32 {
        let previous = self.0.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "release on a destroyed object");
        if previous == 1 {
            // Synchronize with every earlier release before destruction
            fence(Ordering::Acquire);
        }
        previous - 1
    }

    /// Current count (racy, diagnostics only)
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

/// `IUnknown` vtable
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IUnknownVtbl {
    /// `QueryInterface(this, riid, ppv)`
    pub query_interface:
        unsafe extern "system" fn(this: *mut c_void, iid: *const Guid, out: *mut *mut c_void) -> HResult,
    /// `AddRef(this)`
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    /// `Release(this)`
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

impl IUnknownVtbl {
    /// The `IUnknown` entries for objects of class `T`
    pub const fn of<T: ComClass>() -> Self {
        IUnknownVtbl {
            query_interface: query_interface::<T>,
            add_ref: add_ref::<T>,
            release: release::<T>,
        }
    }
}

/// A class whose instances live in [`ComObject`]s.
///
/// # Safety
///
/// `Vtbl` must be `#[repr(C)]` and begin with `IUnknownVtbl::of::<Self>()`.
pub unsafe trait ComClass: Send + Sync + Sized + 'static {
    /// Full vtable type
    type Vtbl: 'static;
    /// Vtable shared by every instance
    const VTABLE: &'static Self::Vtbl;
    /// Interfaces answered besides `IUnknown`
    const INTERFACES: &'static [Guid];
}

/// Heap object exposing `T` through its vtable
#[repr(C)]
pub struct ComObject<T: ComClass> {
    vtbl: &'static T::Vtbl,
    refs: RefCount,
    value: T,
}

impl<T: ComClass> ComObject<T> {
    /// Allocate an object holding `value` and return the creator's reference
    pub fn new(value: T) -> Result<ComPtr, HResult> {
        let object = Self::allocate(value)?;
        // SAFETY: freshly allocated, count 1, vtable begins with IUnknown
        Ok(unsafe { ComPtr::from_non_null(object.cast()) })
    }

    /// Allocate with a reference count of 1. Allocation failure is reported
    /// as `E_OUTOFMEMORY` rather than aborting.
    pub(crate) fn allocate(value: T) -> Result<NonNull<Self>, HResult> {
        let layout = Layout::new::<Self>();
        // SAFETY: the layout is never zero-sized (vtable pointer + count)
        let raw = unsafe { alloc(layout) } as *mut Self;
        let object = NonNull::new(raw).ok_or(E_OUTOFMEMORY)?;
        // SAFETY: `raw` is valid for writes of `Self`
        unsafe {
            object.as_ptr().write(ComObject {
                vtbl: T::VTABLE,
                refs: RefCount::new(),
                value,
            });
        }
        Ok(object)
    }

    /// The wrapped value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Current reference count
    pub fn ref_count(&self) -> u32 {
        self.refs.get()
    }

    /// View an interface pointer as an object of class `T`.
    ///
    /// # Safety
    ///
    /// `this` must point at a live `ComObject<T>`.
    pub unsafe fn from_interface<'a>(this: *mut c_void) -> &'a Self {
        &*(this as *const Self)
    }

    /// Whether this class answers to `iid`
    pub fn supports(iid: &Guid) -> bool {
        *iid == IID_IUNKNOWN || T::INTERFACES.contains(iid)
    }
}

pub(crate) unsafe extern "system" fn query_interface<T: ComClass>(
    this: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    if out.is_null() {
        return E_POINTER;
    }
    if iid.is_null() {
        *out = ptr::null_mut();
        return E_POINTER;
    }
    if !ComObject::<T>::supports(&*iid) {
        *out = ptr::null_mut();
        return E_NOINTERFACE;
    }
    *out = this;
    ComObject::<T>::from_interface(this).refs.add_ref();
    S_OK
}

pub(crate) unsafe extern "system" fn add_ref<T: ComClass>(this: *mut c_void) -> u32 {
    ComObject::<T>::from_interface(this).refs.add_ref()
}

pub(crate) unsafe extern "system" fn release<T: ComClass>(this: *mut c_void) -> u32 {
    let object = this as *mut ComObject<T>;
    let remaining = (*object).refs.release();
    if remaining == 0 {
        tracing::trace!(object = this as usize, "destroying object");
        ptr::drop_in_place(object);
        dealloc(object.cast(), Layout::new::<ComObject<T>>());
    }
    remaining
}
