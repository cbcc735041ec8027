//! `varcall layout`: register assignments and descriptor layouts.

use serde::Serialize;
use varcall_engine::{arch, method::NATIVE_METHOD_ENTRY_OFFSET, CACHED_STUB_OFFSET};
use varcall_sdk::transition::{
    offsets, ARGUMENT_REGISTER_NAMES, FLOAT_REGISTER_PREFIX, NUM_FLOAT_ARGUMENT_REGISTERS,
};
use varcall_sdk::{CallSiteKind, VARIADIC_FLOATS_IN_REGISTERS};

use crate::output::StyledOutput;

#[derive(Debug, Serialize)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct LayoutReport {
    pub target: String,
    pub supported: bool,
    pub hidden_argument_register: &'static str,
    pub call_site_register: &'static str,
    pub entry_alignment: usize,
    pub argument_registers: Vec<&'static str>,
    pub float_registers: String,
    pub vararg_saves_floats: bool,
    pub calli_saves_floats: bool,
    pub cached_stub_offset: usize,
    pub native_method_entry_offset: usize,
    pub transition_block_size: usize,
    pub transition_block: Vec<Field>,
}

impl LayoutReport {
    pub fn current() -> Self {
        LayoutReport {
            target: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
            supported: arch::SUPPORTED,
            hidden_argument_register: arch::HIDDEN_ARGUMENT_REGISTER,
            call_site_register: arch::CALL_SITE_REGISTER,
            entry_alignment: arch::ENTRY_ALIGNMENT,
            argument_registers: ARGUMENT_REGISTER_NAMES.to_vec(),
            float_registers: format!(
                "{}0-{}{}",
                FLOAT_REGISTER_PREFIX,
                FLOAT_REGISTER_PREFIX,
                NUM_FLOAT_ARGUMENT_REGISTERS - 1
            ),
            vararg_saves_floats: CallSiteKind::Vararg.saves_float_registers(),
            calli_saves_floats: CallSiteKind::GenericCalli.saves_float_registers(),
            cached_stub_offset: CACHED_STUB_OFFSET,
            native_method_entry_offset: NATIVE_METHOD_ENTRY_OFFSET,
            transition_block_size: offsets::SIZE,
            transition_block: vec![
                Field {
                    name: "argument_registers",
                    offset: offsets::ARGUMENT_REGISTERS,
                },
                Field {
                    name: "hidden_argument",
                    offset: offsets::HIDDEN_ARGUMENT,
                },
                Field {
                    name: "call_site",
                    offset: offsets::CALL_SITE,
                },
                Field {
                    name: "stack_arguments",
                    offset: offsets::STACK_ARGUMENTS,
                },
                Field {
                    name: "float_registers_saved",
                    offset: offsets::FLOAT_REGISTERS_SAVED,
                },
                Field {
                    name: "float_registers",
                    offset: offsets::FLOAT_REGISTERS,
                },
            ],
        }
    }
}

pub fn execute(json: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let report = LayoutReport::current();
    if json {
        out.line(&serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    out.bold(&format!("varcall layout ({})", report.target));
    out.newline();
    out.field("supported", &report.supported.to_string());
    out.field("hidden argument", report.hidden_argument_register);
    out.field("call-site descriptor", report.call_site_register);
    out.field("entry alignment", &report.entry_alignment.to_string());
    out.field("argument registers", &report.argument_registers.join(" "));
    out.field("float registers", &report.float_registers);
    out.field(
        "variadic floats",
        if VARIADIC_FLOATS_IN_REGISTERS {
            "in registers"
        } else {
            "in integer registers / stack"
        },
    );
    out.field("vararg saves floats", &report.vararg_saves_floats.to_string());
    out.field("calli saves floats", &report.calli_saves_floats.to_string());
    out.field("cached stub offset", &report.cached_stub_offset.to_string());
    out.field(
        "method entry offset",
        &report.native_method_entry_offset.to_string(),
    );
    out.newline();
    out.bold(&format!(
        "TransitionBlock ({} bytes)",
        report.transition_block_size
    ));
    out.newline();
    for field in &report.transition_block {
        out.field(field.name, &format!("+{}", field.offset));
    }
    out.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_matches_build() {
        let report = LayoutReport::current();
        assert_eq!(report.cached_stub_offset, 0);
        assert_eq!(report.native_method_entry_offset, 0);
        assert!(report.calli_saves_floats);
        assert_eq!(report.transition_block.len(), 6);
        assert_eq!(report.transition_block[0].offset, 0);
        assert!(report
            .transition_block
            .windows(2)
            .all(|pair| pair[0].offset < pair[1].offset));
        assert!(report.transition_block_size > report.transition_block[5].offset);
    }

    #[cfg(all(unix, target_arch = "x86_64"))]
    #[test]
    fn test_x86_64_registers() {
        let report = LayoutReport::current();
        assert!(report.supported);
        assert_eq!(report.hidden_argument_register, "r10");
        assert_eq!(report.call_site_register, "r11");
        assert_eq!(report.float_registers, "xmm0-xmm7");
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(LayoutReport::current()).unwrap();
        assert!(json["hidden_argument_register"].is_string());
        assert_eq!(json["transition_block"][1]["name"], "hidden_argument");
    }
}
