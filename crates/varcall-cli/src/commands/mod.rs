//! Subcommand implementations.

pub mod codec;
pub mod layout;
pub mod selftest;

use anyhow::{bail, Context};

/// Parse an address given as decimal or `0x`-prefixed hex.
pub fn parse_address(text: &str) -> anyhow::Result<usize> {
    let text = text.trim().replace('_', "");
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse::<usize>(),
    }
    .with_context(|| format!("invalid address '{}'", text))?;
    if value == 0 {
        bail!("address must be non-zero");
    }
    Ok(value)
}
