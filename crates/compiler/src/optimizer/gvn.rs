//! Global value numbering: pure `BinOp`/`UnOp`/`LoadField` computations with
//! an identical value number already seen earlier in reachable-block order
//! become a `Copy` of the earlier result, rather than recomputed
//! (`spec.md §4.4`'s "GVN across blocks" example).
//!
//! `LoadField` is treated as pure only between stores: a `StoreField`
//! invalidates every field-load value number live at that point, since the
//! field's value may have changed.

use super::Pass;
use crate::tac::{Instr, Operand, TacFunction, TempId};
use std::collections::HashMap;

pub struct Gvn;

impl Pass for Gvn {
    fn name(&self) -> &'static str {
        "gvn"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut value_numbers: HashMap<ValueKey, TempId> = HashMap::new();
        let mut changed = false;

        for &block_id in &func.reachable_blocks() {
            let block = func.block_mut(block_id);
            for instr in &mut block.instrs {
                if matches!(instr, Instr::StoreField { .. }) {
                    value_numbers.retain(|k, _| !matches!(k, ValueKey::Field(..)));
                    continue;
                }
                let Some(key) = value_key(instr) else { continue };
                if let Some(&existing) = value_numbers.get(&key) {
                    if let Some(dst) = instr.dst() {
                        *instr = Instr::Copy {
                            dst,
                            src: Operand::Temp(existing),
                        };
                        changed = true;
                    }
                } else if let Some(dst) = instr.dst() {
                    value_numbers.insert(key, dst);
                }
            }
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Bin(String, OperandKey, OperandKey),
    Un(String, OperandKey),
    Field(OperandKey, String),
}

/// A hashable stand-in for [`Operand`] (which holds an `f64` in its float
/// constant variant and so cannot derive `Eq`/`Hash` itself): renders each
/// operand to its debug text, which is exact for the finite set of operand
/// shapes this pass cares about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OperandKey(String);

impl From<&Operand> for OperandKey {
    fn from(op: &Operand) -> Self {
        OperandKey(format!("{op:?}"))
    }
}

fn value_key(instr: &Instr) -> Option<ValueKey> {
    match instr {
        Instr::BinOp { op, lhs, rhs, .. } => Some(ValueKey::Bin(format!("{op:?}"), lhs.into(), rhs.into())),
        Instr::UnOp { op, operand, .. } => Some(ValueKey::Un(format!("{op:?}"), operand.into())),
        Instr::LoadField { object, field, .. } => Some(ValueKey::Field(object.into(), field.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::tac::ConstValue;

    #[test]
    fn eliminates_redundant_computation_across_blocks() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let next = f.new_block();
        let a = f.new_temp();
        let b = f.new_temp();
        f.push(
            entry,
            Instr::BinOp {
                dst: a,
                op: BinOp::Add,
                lhs: Operand::Temp(0),
                rhs: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(entry, Instr::Jump { target: next });
        f.push(
            next,
            Instr::BinOp {
                dst: b,
                op: BinOp::Add,
                lhs: Operand::Temp(0),
                rhs: Operand::Const(ConstValue::Int(1)),
            },
        );
        assert!(Gvn.run(&mut f));
        assert_eq!(
            f.block(next).instrs[0],
            Instr::Copy {
                dst: b,
                src: Operand::Temp(a)
            }
        );
    }

    #[test]
    fn store_field_invalidates_load_value_numbers() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let obj = f.new_temp();
        let a = f.new_temp();
        let b = f.new_temp();
        f.push(
            entry,
            Instr::LoadField {
                dst: a,
                object: Operand::Temp(obj),
                field: "x".to_string(),
            },
        );
        f.push(
            entry,
            Instr::StoreField {
                object: Operand::Temp(obj),
                field: "x".to_string(),
                value: Operand::Const(ConstValue::Int(9)),
            },
        );
        f.push(
            entry,
            Instr::LoadField {
                dst: b,
                object: Operand::Temp(obj),
                field: "x".to_string(),
            },
        );
        assert!(!Gvn.run(&mut f));
    }
}
