//! Renders a [`crate::vm::VmUnit`] to the assembly text format
//! (`spec.md §4.5`/`§6`): a `.data_start`/`.data_end` section of typed heap
//! entries, followed by a `.code_start`/`.code_end` section of
//! PUSH/POP/COPY/EXTERN/JUMP/JUMP_IF_FALSE/JUMP_INDIRECT instructions and
//! labels.

use crate::tac::ConstValue;
use crate::vm::{DataEntry, VmInstr, VmUnit};
use std::fmt::Write as _;

/// Render a [`ConstValue`] the way the assembler's data section expects an
/// initial value literal: `null` for the absence of one, a bare numeral for
/// numbers, `true`/`false` for booleans, and a quoted string otherwise.
fn render_const(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(n) => n.to_string(),
        ConstValue::Float(n) => n.to_string(),
        ConstValue::Bool(b) => b.to_string(),
        ConstValue::Str(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        ConstValue::Null => "null".to_string(),
    }
}

fn render_data_entry(out: &mut String, entry: &DataEntry) {
    let value = entry
        .initial_value
        .as_ref()
        .map(render_const)
        .unwrap_or_else(|| "null".to_string());
    write!(out, "  {}: %{}, {}", entry.name, entry.vm_type.mnemonic(), value).unwrap();
    if entry.is_exported {
        write!(out, ", export").unwrap();
    }
    if let Some(sync) = &entry.sync_mode {
        write!(out, ", sync={sync}").unwrap();
    }
    writeln!(out).unwrap();
}

fn render_code_instr(out: &mut String, instr: &VmInstr) {
    match instr {
        VmInstr::Push(addr) => writeln!(out, "    PUSH, {}", addr.0).unwrap(),
        VmInstr::Pop => writeln!(out, "    POP").unwrap(),
        VmInstr::Copy => writeln!(out, "    COPY").unwrap(),
        VmInstr::Extern(sig) => writeln!(out, "    EXTERN, \"{sig}\"").unwrap(),
        VmInstr::Jump(Some(label)) => writeln!(out, "    JUMP, {label}").unwrap(),
        VmInstr::Jump(None) => writeln!(out, "    JUMP").unwrap(),
        VmInstr::JumpIfFalse(label) => writeln!(out, "    JUMP_IF_FALSE, {label}").unwrap(),
        VmInstr::JumpIndirect(addr) => writeln!(out, "    JUMP_INDIRECT, {}", addr.0).unwrap(),
        VmInstr::Label(name) => writeln!(out, "{name}:").unwrap(),
    }
}

/// Render a whole [`VmUnit`] as assembly text for one entry point.
///
/// `entry_point_name` is printed in the leading comment line when
/// `comment_header` is set (`SPEC_FULL.md §4.5`: the header is informational
/// only, never parsed back in).
pub fn assemble(unit: &VmUnit, entry_point_name: &str, comment_header: bool) -> String {
    let mut out = String::new();

    if comment_header {
        writeln!(out, "# generated by uasmc, entry point {entry_point_name}").unwrap();
    }

    writeln!(out, ".data_start").unwrap();
    for entry in &unit.data {
        render_data_entry(&mut out, entry);
    }
    writeln!(out, ".data_end").unwrap();
    writeln!(out).unwrap();

    writeln!(out, ".code_start").unwrap();
    for instr in &unit.code {
        render_code_instr(&mut out, instr);
    }
    writeln!(out, ".code_end").unwrap();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::HeapAddress;
    use uasmc_core::VmType;

    fn unit_with(data: Vec<DataEntry>, code: Vec<VmInstr>) -> VmUnit {
        VmUnit {
            data,
            code,
            externs_used: Vec::new(),
        }
    }

    #[test]
    fn data_section_renders_type_and_value() {
        let unit = unit_with(
            vec![DataEntry {
                name: "x".to_string(),
                address: HeapAddress(0),
                vm_type: VmType::Int32,
                initial_value: Some(ConstValue::Int(7)),
                is_exported: false,
                sync_mode: None,
                owning_class: "C".to_string(),
            }],
            vec![],
        );
        let text = assemble(&unit, "C", false);
        assert!(text.contains(".data_start"));
        assert!(text.contains("x: %Int32, 7"));
        assert!(text.contains(".data_end"));
    }

    #[test]
    fn exported_entry_gets_export_tag() {
        let unit = unit_with(
            vec![DataEntry {
                name: "total".to_string(),
                address: HeapAddress(0),
                vm_type: VmType::Int32,
                initial_value: Some(ConstValue::Int(0)),
                is_exported: true,
                sync_mode: None,
                owning_class: "C".to_string(),
            }],
            vec![],
        );
        let text = assemble(&unit, "C", false);
        assert!(text.contains("export"));
    }

    #[test]
    fn code_section_renders_instructions() {
        let unit = unit_with(
            vec![],
            vec![
                VmInstr::Label("C::Add".to_string()),
                VmInstr::Push(HeapAddress(0)),
                VmInstr::Push(HeapAddress(1)),
                VmInstr::Copy,
                VmInstr::Extern("UnityEngineMathf.__Add__SystemInt32_SystemInt32__SystemInt32".to_string()),
                VmInstr::JumpIfFalse("C::Add__L1".to_string()),
                VmInstr::Jump(None),
            ],
        );
        let text = assemble(&unit, "C", false);
        assert!(text.contains("C::Add:"));
        assert!(text.contains("    PUSH, 0"));
        assert!(text.contains("    COPY"));
        assert!(text.contains("    EXTERN, \"UnityEngineMathf"));
        assert!(text.contains("    JUMP_IF_FALSE, C::Add__L1"));
        assert!(text.contains("    JUMP\n"));
    }

    #[test]
    fn comment_header_printed_when_requested() {
        let unit = unit_with(vec![], vec![]);
        let text = assemble(&unit, "MyBehaviour", true);
        assert!(text.starts_with("# generated by uasmc, entry point MyBehaviour\n"));
    }

    #[test]
    fn string_initial_value_is_quoted_and_escaped() {
        let unit = unit_with(
            vec![DataEntry {
                name: "greeting".to_string(),
                address: HeapAddress(0),
                vm_type: VmType::String,
                initial_value: Some(ConstValue::Str("say \"hi\"".to_string())),
                is_exported: false,
                sync_mode: None,
                owning_class: "C".to_string(),
            }],
            vec![],
        );
        let text = assemble(&unit, "C", false);
        assert!(text.contains("greeting: %String, \"say \\\"hi\\\"\""));
    }
}
