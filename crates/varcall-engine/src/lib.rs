//! Varcall dispatch engine
//!
//! Lazily resolved dispatch for variadic and generic indirect native calls:
//! - **Call sites**: descriptors with a one-word stub cache (`site` module)
//! - **Trampolines**: per-architecture naked shims (`arch` module)
//! - **Dispatch**: slow-path generation, validation and publication (`dispatch` module)
//! - **Bridge**: generator ownership, configuration and call-site interning
//!
//! # Example
//!
//! ```rust,ignore
//! use varcall_engine::{invoke, Bridge, Library, NativeMethod, PassThroughGenerator};
//! use varcall_sdk::{CallSignature, ValueType};
//!
//! let bridge = Bridge::new(PassThroughGenerator::new());
//! let site = bridge.vararg_site(CallSignature::variadic(1, vec![ValueType::I64], ValueType::I64));
//!
//! let labs = Box::new(NativeMethod::bind(Library::this_process()?, "labs")?);
//! let result = unsafe { invoke::call_u64(&site, labs.hidden_word(), [(-7i64) as u64, 0, 0]) };
//! assert_eq!(result, 7);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::missing_safety_doc)]

// ============================================================================
// Core Modules
// ============================================================================

/// Per-architecture trampolines
pub mod arch;

/// Bridge and call-site interning
pub mod bridge;

/// Dispatch configuration
pub mod config;

/// Default configuration values
pub mod defaults;

/// Slow-path resolution and failure reporting
pub mod dispatch;

/// Error types
pub mod error;

/// Calling through trampolines from Rust
pub mod invoke;

/// Native symbol resolution
pub mod loader;

/// Native method descriptors
pub mod method;

/// Pass-through stub generator
pub mod passthrough;

/// Call-site descriptors
pub mod site;

/// Slow-path counters
pub mod stats;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::Bridge;
pub use config::DispatchConfig;
pub use dispatch::{clear_last_failure, resolve, take_last_failure};
pub use error::{BridgeError, DispatchError};
pub use loader::{Library, LoadError};
pub use method::NativeMethod;
pub use passthrough::PassThroughGenerator;
pub use site::{CallSiteDescriptor, CACHED_STUB_OFFSET};
pub use stats::{DispatchStats, StatsSnapshot};
