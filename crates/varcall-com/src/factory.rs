//! Class factories
//!
//! [`ClassFactory`] refuses aggregation outright. [`AggregatingClassFactory`]
//! accepts an outer object, but only when the caller asks for `IUnknown`,
//! which is the one interface an aggregated inner object may hand out.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::guid::{Guid, IID_ICLASSFACTORY, IID_IUNKNOWN};
use crate::hresult::{HResult, CLASS_E_NOAGGREGATION, E_NOTIMPL, E_POINTER};
use crate::ptr::ComPtr;
use crate::unknown::{query_interface, release, ComClass, ComObject, IUnknownVtbl};

/// `IClassFactory` vtable
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IClassFactoryVtbl {
    /// `IUnknown` entries
    pub base: IUnknownVtbl,
    /// `CreateInstance(this, outer, riid, ppv)`
    pub create_instance: unsafe extern "system" fn(
        this: *mut c_void,
        outer: *mut c_void,
        iid: *const Guid,
        out: *mut *mut c_void,
    ) -> HResult,
    /// `LockServer(this, lock)`
    pub lock_server: unsafe extern "system" fn(this: *mut c_void, lock: i32) -> HResult,
}

/// A class that can be created as the inner object of an aggregate
pub trait Aggregatable: ComClass {
    /// Construct, remembering the controlling outer object if there is one.
    /// The outer pointer is not reference counted by the inner object.
    fn with_outer(outer: Option<NonNull<c_void>>) -> Self;
}

/// Factory for `T` that refuses aggregation
pub struct ClassFactory<T>(PhantomData<fn() -> T>);

/// Factory for `T` that supports aggregation
pub struct AggregatingClassFactory<T>(PhantomData<fn() -> T>);

unsafe impl<T: ComClass + Default> ComClass for ClassFactory<T> {
    type Vtbl = IClassFactoryVtbl;
    const VTABLE: &'static IClassFactoryVtbl = &IClassFactoryVtbl {
        base: IUnknownVtbl::of::<Self>(),
        create_instance: create_basic::<T>,
        lock_server,
    };
    const INTERFACES: &'static [Guid] = &[IID_ICLASSFACTORY];
}

unsafe impl<T: Aggregatable> ComClass for AggregatingClassFactory<T> {
    type Vtbl = IClassFactoryVtbl;
    const VTABLE: &'static IClassFactoryVtbl = &IClassFactoryVtbl {
        base: IUnknownVtbl::of::<Self>(),
        create_instance: create_aggregated::<T>,
        lock_server,
    };
    const INTERFACES: &'static [Guid] = &[IID_ICLASSFACTORY];
}

impl<T: ComClass + Default> ClassFactory<T> {
    /// Create a factory object and return it as `iid`
    pub fn create(iid: &Guid) -> Result<ComPtr, HResult> {
        create_object(ClassFactory::<T>(PhantomData), iid)
    }
}

impl<T: Aggregatable> AggregatingClassFactory<T> {
    /// Create a factory object and return it as `iid`
    pub fn create(iid: &Guid) -> Result<ComPtr, HResult> {
        create_object(AggregatingClassFactory::<T>(PhantomData), iid)
    }
}

/// Allocate `value`, query it for `iid` into `out` and drop the creation
/// reference, so a failed query destroys the object.
unsafe fn instantiate<T: ComClass>(value: T, iid: *const Guid, out: *mut *mut c_void) -> HResult {
    let object = match ComObject::allocate(value) {
        Ok(object) => object,
        Err(hr) => return hr,
    };
    let this = object.as_ptr().cast::<c_void>();
    let hr = query_interface::<T>(this, iid, out);
    release::<T>(this);
    hr
}

fn create_object<T: ComClass>(value: T, iid: &Guid) -> Result<ComPtr, HResult> {
    let mut out = ptr::null_mut();
    // SAFETY: `out` is a valid out-pointer
    unsafe { instantiate(value, iid, &mut out) }.ok()?;
    // SAFETY: a successful query transferred one reference through `out`
    unsafe { ComPtr::from_raw(out) }.ok_or(E_POINTER)
}

unsafe extern "system" fn create_basic<T: ComClass + Default>(
    _this: *mut c_void,
    outer: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    if !outer.is_null() {
        return CLASS_E_NOAGGREGATION;
    }
    instantiate(T::default(), iid, out)
}

unsafe extern "system" fn create_aggregated<T: Aggregatable>(
    _this: *mut c_void,
    outer: *mut c_void,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult {
    if !outer.is_null() && (iid.is_null() || *iid != IID_IUNKNOWN) {
        return CLASS_E_NOAGGREGATION;
    }
    instantiate(T::with_outer(NonNull::new(outer)), iid, out)
}

unsafe extern "system" fn lock_server(_this: *mut c_void, _lock: i32) -> HResult {
    tracing::warn!("LockServer is not implemented");
    E_NOTIMPL
}

/// Call `IClassFactory::CreateInstance` on any factory object
pub fn create_instance(factory: &ComPtr, outer: Option<&ComPtr>, iid: &Guid) -> Result<ComPtr, HResult> {
    let factory = factory.query_interface(&IID_ICLASSFACTORY)?;
    // SAFETY: the pointer was returned for IID_ICLASSFACTORY
    let vtbl = unsafe { factory.vtable::<IClassFactoryVtbl>() };
    let outer = outer.map_or(ptr::null_mut(), ComPtr::as_raw);
    let mut out = ptr::null_mut();
    // SAFETY: valid object, iid and out-pointer
    unsafe { (vtbl.create_instance)(factory.as_raw(), outer, iid, &mut out) }.ok()?;
    // SAFETY: a successful call transferred one reference through `out`
    unsafe { ComPtr::from_raw(out) }.ok_or(E_POINTER)
}

/// Call `IClassFactory::LockServer`
pub fn lock_server_on(factory: &ComPtr, lock: bool) -> Result<(), HResult> {
    let factory = factory.query_interface(&IID_ICLASSFACTORY)?;
    // SAFETY: the pointer was returned for IID_ICLASSFACTORY
    let vtbl = unsafe { factory.vtable::<IClassFactoryVtbl>() };
    unsafe { (vtbl.lock_server)(factory.as_raw(), lock as i32) }.ok()
}
