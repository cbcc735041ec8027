use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use varcall_com::{
    create_instance, lock_server_on, Aggregatable, AggregatingClassFactory, ClassFactory,
    ComClass, ComObject, ComPtr, Guid, IUnknownVtbl, CLASS_E_NOAGGREGATION, E_NOINTERFACE,
    E_NOTIMPL, IID_ICLASSFACTORY, IID_IUNKNOWN,
};

const IID_IWIDGET: Guid = Guid::from_u128(0x0b6e3f8a_51c4_4d2e_8f17_a4c9d0e1f203);
const IID_IGADGET: Guid = Guid::from_u128(0x9d2a7c14_6e03_4b8f_a155_3c7e9f0a1b2d);

// Each test uses its own class so the drop counters never interfere.

macro_rules! counted_class {
    ($name:ident, $drops:ident) => {
        static $drops: AtomicUsize = AtomicUsize::new(0);

        #[derive(Default)]
        struct $name {
            outer: Option<usize>,
        }

        impl Drop for $name {
            fn drop(&mut self) {
                $drops.fetch_add(1, Ordering::SeqCst);
            }
        }

        unsafe impl ComClass for $name {
            type Vtbl = IUnknownVtbl;
            const VTABLE: &'static IUnknownVtbl = &IUnknownVtbl::of::<Self>();
            const INTERFACES: &'static [Guid] = &[IID_IWIDGET];
        }

        impl Aggregatable for $name {
            fn with_outer(outer: Option<NonNull<c_void>>) -> Self {
                $name {
                    outer: outer.map(|p| p.as_ptr() as usize),
                }
            }
        }
    };
}

/// Controlling object for aggregation tests
struct Outer;

unsafe impl ComClass for Outer {
    type Vtbl = IUnknownVtbl;
    const VTABLE: &'static IUnknownVtbl = &IUnknownVtbl::of::<Self>();
    const INTERFACES: &'static [Guid] = &[IID_IGADGET];
}

fn value_of<T: ComClass>(ptr: &ComPtr) -> &T {
    unsafe { ComObject::<T>::from_interface(ptr.as_raw()).value() }
}

fn ref_count<T: ComClass>(ptr: &ComPtr) -> u32 {
    unsafe { ComObject::<T>::from_interface(ptr.as_raw()).ref_count() }
}

// ============================================================================
// Reference counting
// ============================================================================

counted_class!(Lifetime, LIFETIME_DROPS);

#[test]
fn test_destroyed_exactly_at_zero() {
    let first = ComObject::new(Lifetime::default()).unwrap();
    assert_eq!(ref_count::<Lifetime>(&first), 1);

    let second = first.clone();
    let third = first.query_interface(&IID_IWIDGET).unwrap();
    assert_eq!(ref_count::<Lifetime>(&first), 3);
    assert_eq!(first, third);

    drop(second);
    drop(first);
    assert_eq!(LIFETIME_DROPS.load(Ordering::SeqCst), 0);
    drop(third);
    assert_eq!(LIFETIME_DROPS.load(Ordering::SeqCst), 1);
}

counted_class!(Queried, QUERIED_DROPS);

#[test]
fn test_unrecognized_interface() {
    let object = ComObject::new(Queried::default()).unwrap();
    assert_eq!(object.query_interface(&IID_IGADGET), Err(E_NOINTERFACE));
    assert_eq!(object.query_interface(&IID_ICLASSFACTORY), Err(E_NOINTERFACE));
    assert_eq!(ref_count::<Queried>(&object), 1);

    let unknown = object.query_interface(&IID_IUNKNOWN).unwrap();
    assert_eq!(unknown.as_raw(), object.as_raw());
    drop((object, unknown));
    assert_eq!(QUERIED_DROPS.load(Ordering::SeqCst), 1);
}

counted_class!(Raw, RAW_DROPS);

#[test]
fn test_raw_round_trip() {
    let object = ComObject::new(Raw::default()).unwrap();
    let raw = object.into_raw();
    let borrowed = unsafe { ComPtr::from_raw_borrowed(raw) }.unwrap();
    assert_eq!(ref_count::<Raw>(&borrowed), 2);
    let owned = unsafe { ComPtr::from_raw(raw) }.unwrap();
    drop(borrowed);
    drop(owned);
    assert_eq!(RAW_DROPS.load(Ordering::SeqCst), 1);
    assert!(unsafe { ComPtr::from_raw(std::ptr::null_mut()) }.is_none());
}

counted_class!(Shared, SHARED_DROPS);

#[test]
fn test_concurrent_add_ref_release() {
    let object = ComObject::new(Shared::default()).unwrap();
    crossbeam::scope(|s| {
        for _ in 0..8 {
            let object = &object;
            s.spawn(move |_| {
                for _ in 0..1000 {
                    let clone = object.clone();
                    let queried = clone.query_interface(&IID_IWIDGET).unwrap();
                    drop((clone, queried));
                }
            });
        }
    })
    .unwrap();
    assert_eq!(ref_count::<Shared>(&object), 1);
    assert_eq!(SHARED_DROPS.load(Ordering::SeqCst), 0);
    drop(object);
    assert_eq!(SHARED_DROPS.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Class factories
// ============================================================================

counted_class!(Basic, BASIC_DROPS);

#[test]
fn test_basic_factory_creates_instances() {
    let factory = ClassFactory::<Basic>::create(&IID_ICLASSFACTORY).unwrap();
    let widget = create_instance(&factory, None, &IID_IWIDGET).unwrap();
    assert_eq!(ref_count::<Basic>(&widget), 1);
    assert!(value_of::<Basic>(&widget).outer.is_none());
    drop(widget);
    assert_eq!(BASIC_DROPS.load(Ordering::SeqCst), 1);
}

counted_class!(Refused, REFUSED_DROPS);

#[test]
fn test_basic_factory_refuses_aggregation() {
    let factory = ClassFactory::<Refused>::create(&IID_IUNKNOWN).unwrap();
    let outer = ComObject::new(Outer).unwrap();
    assert_eq!(
        create_instance(&factory, Some(&outer), &IID_IUNKNOWN),
        Err(CLASS_E_NOAGGREGATION)
    );
    assert_eq!(REFUSED_DROPS.load(Ordering::SeqCst), 0);
}

counted_class!(Unwanted, UNWANTED_DROPS);

#[test]
fn test_failed_query_destroys_instance() {
    let factory = ClassFactory::<Unwanted>::create(&IID_ICLASSFACTORY).unwrap();
    assert_eq!(create_instance(&factory, None, &IID_IGADGET), Err(E_NOINTERFACE));
    assert_eq!(UNWANTED_DROPS.load(Ordering::SeqCst), 1);
}

counted_class!(Inner, INNER_DROPS);

#[test]
fn test_aggregating_factory() {
    let factory = AggregatingClassFactory::<Inner>::create(&IID_ICLASSFACTORY).unwrap();
    let outer = ComObject::new(Outer).unwrap();

    let inner = create_instance(&factory, Some(&outer), &IID_IUNKNOWN).unwrap();
    assert_eq!(value_of::<Inner>(&inner).outer, Some(outer.as_raw() as usize));

    // An aggregated inner object may only be requested as IUnknown
    assert_eq!(
        create_instance(&factory, Some(&outer), &IID_IWIDGET),
        Err(CLASS_E_NOAGGREGATION)
    );

    let standalone = create_instance(&factory, None, &IID_IWIDGET).unwrap();
    assert!(value_of::<Inner>(&standalone).outer.is_none());

    drop((inner, standalone));
    assert_eq!(INNER_DROPS.load(Ordering::SeqCst), 2);
}

#[test]
fn test_factory_interfaces() {
    let factory = ClassFactory::<Basic>::create(&IID_IUNKNOWN).unwrap();
    assert!(factory.query_interface(&IID_ICLASSFACTORY).is_ok());
    assert_eq!(factory.query_interface(&IID_IWIDGET), Err(E_NOINTERFACE));
    assert_eq!(
        ClassFactory::<Basic>::create(&IID_IGADGET).map(|_| ()),
        Err(E_NOINTERFACE)
    );
}

#[test]
fn test_lock_server_not_implemented() {
    let factory = ClassFactory::<Basic>::create(&IID_ICLASSFACTORY).unwrap();
    assert_eq!(lock_server_on(&factory, true), Err(E_NOTIMPL));
}
