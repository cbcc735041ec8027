//! Native symbol resolution
//!
//! Thin handle over the platform loader, used to find the native functions
//! that pass-through stubs forward to. A `Library` either owns a module it
//! opened (closed on drop) or borrows the running process's symbol scope.

use std::ffi::{c_void, CString};
use std::path::Path;

use once_cell::sync::OnceCell;
use thiserror::Error;
use varcall_sdk::EntryPoint;

/// Errors raised while opening a module or resolving a symbol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The loader refused the module
    #[error("Cannot open {library}: {reason}")]
    Open {
        /// Module that was requested
        library: String,
        /// Loader diagnostic
        reason: String,
    },

    /// The module does not export the symbol, or exports it as null
    #[error("{library} does not export {symbol}: {reason}")]
    MissingSymbol {
        /// Requested symbol
        symbol: String,
        /// Module that was searched
        library: String,
        /// Loader diagnostic
        reason: String,
    },

    /// A path or symbol name the loader cannot accept
    #[error("Invalid name {0:?}")]
    InvalidName(String),
}

/// Name reported for the running executable's symbol scope
const THIS_PROCESS: &str = "<process>";

/// Handle to a loaded module
pub struct Library {
    handle: *mut c_void,
    owned: bool,
    name: String,
}

// SAFETY: module handles are process-global and the loader APIs are
// thread-safe.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
    /// Open the module at `path` with immediate binding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| LoadError::InvalidName(path.display().to_string()))?;
        let handle = sys::open(Some(name)).map_err(|reason| LoadError::Open {
            library: name.to_string(),
            reason,
        })?;
        Ok(Library {
            handle,
            owned: true,
            name: name.to_string(),
        })
    }

    /// Symbol scope of the running process: the executable and every library
    /// it was linked against (the C runtime included).
    ///
    /// Opened once and kept for the life of the process.
    pub fn this_process() -> Result<&'static Library, LoadError> {
        static PROCESS: OnceCell<Library> = OnceCell::new();
        PROCESS.get_or_try_init(|| {
            let handle = sys::open(None).map_err(|reason| LoadError::Open {
                library: THIS_PROCESS.to_string(),
                reason,
            })?;
            Ok(Library {
                handle,
                owned: !cfg!(windows),
                name: THIS_PROCESS.to_string(),
            })
        })
    }

    /// Entry point of an exported function
    pub fn symbol_address(&self, symbol: &str) -> Result<EntryPoint, LoadError> {
        let c_symbol =
            CString::new(symbol).map_err(|_| LoadError::InvalidName(symbol.to_string()))?;
        let missing = |reason: String| LoadError::MissingSymbol {
            symbol: symbol.to_string(),
            library: self.name.clone(),
            reason,
        };
        let address = sys::lookup(self.handle, &c_symbol).map_err(missing)?;
        EntryPoint::new(address).ok_or_else(|| missing("null address".to_string()))
    }

    /// Path the module was opened from, or `<process>`
    pub fn path(&self) -> &str {
        &self.name
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if self.owned {
            sys::close(self.handle);
        }
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.name)
            .field("owned", &self.owned)
            .finish()
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::{c_void, CStr, CString};

    fn take_error() -> Option<String> {
        // SAFETY: dlerror returns null or a thread-local NUL-terminated string.
        unsafe {
            let message = libc::dlerror();
            (!message.is_null()).then(|| CStr::from_ptr(message).to_string_lossy().into_owned())
        }
    }

    /// `None` opens the global scope of the executable.
    pub(super) fn open(path: Option<&str>) -> Result<*mut c_void, String> {
        let c_path = path
            .map(CString::new)
            .transpose()
            .map_err(|e| e.to_string())?;
        let raw = c_path.as_ref().map_or(std::ptr::null(), |p| p.as_ptr());
        let flags = if path.is_some() {
            libc::RTLD_NOW | libc::RTLD_LOCAL
        } else {
            libc::RTLD_NOW
        };
        // SAFETY: `raw` is null or points at a live NUL-terminated string.
        let handle = unsafe { libc::dlopen(raw, flags) };
        if handle.is_null() {
            return Err(take_error().unwrap_or_else(|| "unknown dlopen failure".to_string()));
        }
        Ok(handle)
    }

    pub(super) fn lookup(handle: *mut c_void, symbol: &CStr) -> Result<usize, String> {
        take_error();
        // SAFETY: `handle` came from dlopen and is still open.
        let address = unsafe { libc::dlsym(handle, symbol.as_ptr()) };
        match take_error() {
            Some(reason) => Err(reason),
            None => Ok(address as usize),
        }
    }

    pub(super) fn close(handle: *mut c_void) {
        // SAFETY: called once, from Drop, on a handle this module opened.
        unsafe {
            libc::dlclose(handle);
        }
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::{c_void, CStr, OsStr};
    use std::os::windows::ffi::OsStrExt;

    extern "system" {
        fn LoadLibraryW(filename: *const u16) -> *mut c_void;
        fn GetModuleHandleW(filename: *const u16) -> *mut c_void;
        fn GetProcAddress(module: *mut c_void, name: *const std::ffi::c_char) -> *mut c_void;
        fn FreeLibrary(module: *mut c_void) -> i32;
        fn GetLastError() -> u32;
    }

    fn last_error() -> String {
        // SAFETY: no preconditions.
        format!("error code {}", unsafe { GetLastError() })
    }

    /// `None` borrows the executable's module handle, which must not be freed.
    pub(super) fn open(path: Option<&str>) -> Result<*mut c_void, String> {
        // SAFETY: the wide string is NUL-terminated and outlives the call.
        let handle = unsafe {
            match path {
                Some(path) => {
                    let wide: Vec<u16> = OsStr::new(path)
                        .encode_wide()
                        .chain(std::iter::once(0))
                        .collect();
                    LoadLibraryW(wide.as_ptr())
                }
                None => GetModuleHandleW(std::ptr::null()),
            }
        };
        if handle.is_null() {
            return Err(last_error());
        }
        Ok(handle)
    }

    pub(super) fn lookup(handle: *mut c_void, symbol: &CStr) -> Result<usize, String> {
        // SAFETY: `handle` is a loaded module.
        let address = unsafe { GetProcAddress(handle, symbol.as_ptr()) };
        if address.is_null() {
            return Err(last_error());
        }
        Ok(address as usize)
    }

    pub(super) fn close(handle: *mut c_void) {
        // SAFETY: called once, from Drop, on a handle LoadLibraryW returned.
        unsafe {
            FreeLibrary(handle);
        }
    }
}
