//! Interface identifiers

use std::fmt;
use std::str::FromStr;

/// 128-bit interface identifier in the Windows `GUID` layout
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    /// First group, 8 hex digits
    pub data1: u32,
    /// Second group
    pub data2: u16,
    /// Third group
    pub data3: u16,
    /// Last two groups, byte order as written
    pub data4: [u8; 8],
}

/// `IUnknown`: every object answers to it
pub const IID_IUNKNOWN: Guid = Guid::from_u128(0x00000000_0000_0000_c000_000000000046);

/// `IClassFactory`
pub const IID_ICLASSFACTORY: Guid = Guid::from_u128(0x00000001_0000_0000_c000_000000000046);

impl Guid {
    /// Build from the 128-bit value as written in registry format
    pub const fn from_u128(value: u128) -> Self {
        Guid {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    /// The 128-bit value in registry order
    pub const fn to_u128(self) -> u128 {
        ((self.data1 as u128) << 96)
            | ((self.data2 as u128) << 80)
            | ((self.data3 as u128) << 64)
            | (u64::from_be_bytes(self.data4) as u128)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// Text that is not a registry-format GUID
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid GUID: {0}")]
pub struct GuidParseError(String);

impl FromStr for Guid {
    type Err = GuidParseError;

    /// Accepts `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, optionally in braces
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GuidParseError(s.to_string());
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);

        let groups: Vec<&str> = inner.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if groups.len() != lengths.len()
            || groups.iter().zip(lengths).any(|(g, len)| {
                g.len() != len || !g.bytes().all(|b| b.is_ascii_hexdigit())
            })
        {
            return Err(invalid());
        }

        let hex: String = groups.concat();
        u128::from_str_radix(&hex, 16)
            .map(Guid::from_u128)
            .map_err(|_| invalid())
    }
}
