//! Reference-counted interface-query objects
//!
//! A minimal `IUnknown` object model sharing the binary layout native code
//! expects: objects start with a vtable pointer, status codes are 32-bit
//! `HRESULT`s, interface ids are 16-byte GUIDs and every entry uses the
//! `system` calling convention.
//!
//! - `QueryInterface` hands out the object for `IUnknown` and the class's
//!   own interface ids, adding a reference; anything else yields null and
//!   `E_NOINTERFACE`.
//! - `AddRef`/`Release` adjust an atomic count that starts at 1; the object
//!   is destroyed exactly when it drops from 1 to 0.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Class factories
pub mod factory;

/// Interface identifiers
pub mod guid;

/// Status codes
pub mod hresult;

/// Owning interface pointer
pub mod ptr;

/// IUnknown implementation
pub mod unknown;

pub use factory::{
    create_instance, lock_server_on, Aggregatable, AggregatingClassFactory, ClassFactory,
    IClassFactoryVtbl,
};
pub use guid::{Guid, GuidParseError, IID_ICLASSFACTORY, IID_IUNKNOWN};
pub use hresult::{
    HResult, CLASS_E_NOAGGREGATION, E_FAIL, E_NOINTERFACE, E_NOTIMPL, E_OUTOFMEMORY, E_POINTER,
    S_FALSE, S_OK,
};
pub use ptr::ComPtr;
pub use unknown::{ComClass, ComObject, IUnknownVtbl, RefCount};
