//! Pass-through stub generator
//!
//! For signatures that need no marshaling, every call site can share one
//! stub: it leaves the argument registers alone and jumps to the target
//! named by the hidden argument. By-value aggregates are refused.

use varcall_sdk::{
    EntryPoint, GenerationError, GenerationRequest, GenerationResult, StubGenerator,
};

use crate::arch;

/// Generator that hands out the shared pass-through stub
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughGenerator;

impl PassThroughGenerator {
    /// Create the generator
    pub fn new() -> Self {
        PassThroughGenerator
    }
}

impl StubGenerator for PassThroughGenerator {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> GenerationResult<EntryPoint> {
        let signature = request.site.signature;
        if signature.has_aggregates() {
            return Err(GenerationError::UnsupportedSignature(format!(
                "{} passes an aggregate by value",
                signature
            )));
        }
        if request.target.address() == 0 {
            return Err(GenerationError::UnresolvedTarget(format!(
                "null {} target for {} site {:#x}",
                request.target.kind(),
                request.site.kind,
                request.site.address
            )));
        }
        if !arch::SUPPORTED {
            return Err(GenerationError::Generator(
                "no pass-through stub for this target".to_string(),
            ));
        }
        Ok(arch::pass_through_stub())
    }
}
