//! `varcall codec`: hidden-argument encoding.

use anyhow::bail;
use varcall_sdk::{CallSiteKind, HiddenArgument, HiddenWord};

use super::parse_address;
use crate::output::StyledOutput;

/// Build the target named by exactly one of `native` / `method` and encode it.
pub fn encode(
    native: Option<&str>,
    method: Option<&str>,
) -> anyhow::Result<(HiddenArgument, HiddenWord)> {
    let target = match (native, method) {
        (Some(addr), None) => HiddenArgument::native(parse_address(addr)?)?,
        (None, Some(addr)) => HiddenArgument::method(parse_address(addr)?)?,
        _ => bail!("pass exactly one of --native or --method"),
    };
    Ok((target, target.encode()?))
}

/// Decode `word` with the convention of the given site kind.
pub fn decode(word: &str, vararg: bool) -> anyhow::Result<(CallSiteKind, HiddenArgument)> {
    let kind = if vararg {
        CallSiteKind::Vararg
    } else {
        CallSiteKind::GenericCalli
    };
    let word = HiddenWord::from_raw(parse_address(word)?);
    Ok((kind, kind.decode_hidden(word)))
}

pub fn execute_encode(
    native: Option<&str>,
    method: Option<&str>,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let (target, word) = encode(native, method)?;
    out.field("target", &target.to_string());
    out.field("hidden word", &format!("{:#x}", word.raw()));
    out.field("tagged", &word.is_tagged().to_string());
    out.flush();
    Ok(())
}

pub fn execute_decode(word: &str, vararg: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let (kind, target) = decode(word, vararg)?;
    out.field("site kind", kind.as_str());
    out.field("target", &target.to_string());
    out.flush();
    Ok(())
}
