//! Varcall SDK - ABI types shared by call-site emitters and stub generators
//!
//! This crate holds everything that crosses the boundary between the
//! dispatch engine and the code around it, without depending on the engine:
//!
//! - [`EntryPoint`]: address of a resolved, callable stub
//! - [`CallSignature`]: the opaque-to-the-engine signature of a call site
//! - [`HiddenArgument`] and [`HiddenWord`]: the single-register target codec
//! - [`TransitionBlock`]: the register snapshot built on the slow path
//! - [`StubGenerator`]: the contract a stub generator implements
//!
//! # Example
//!
//! ```ignore
//! use varcall_sdk::{EntryPoint, GenerationRequest, GenerationResult, StubGenerator};
//!
//! struct Fixed(EntryPoint);
//!
//! impl StubGenerator for Fixed {
//!     fn name(&self) -> &str {
//!         "fixed"
//!     }
//!
//!     fn generate(&self, _request: &GenerationRequest<'_>) -> GenerationResult<EntryPoint> {
//!         Ok(self.0)
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod generator;
pub mod hidden;
pub mod signature;
pub mod transition;

pub use entry::EntryPoint;
pub use error::{CodecError, GenerationError, GenerationResult};
pub use generator::{
    CallSiteInfo, CallSiteKind, GenerationRequest, StubGenerator, VARIADIC_FLOATS_IN_REGISTERS,
};
pub use hidden::{HiddenArgument, HiddenWord, TargetKind, NATIVE_TARGET_TAG};
pub use signature::{CallConv, CallSignature, ValueType};
pub use transition::{
    ArgumentRegisters, FloatArgumentRegisters, TransitionBlock, NUM_ARGUMENT_REGISTERS,
    NUM_FLOAT_ARGUMENT_REGISTERS,
};
