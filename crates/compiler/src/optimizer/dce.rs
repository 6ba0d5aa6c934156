//! Dead code elimination (`spec.md §4.4` item 10):
//!
//! (a) instructions after a block's terminator are unreachable and dropped;
//! (b) a pure producer whose destination temp is never used anywhere in the
//!     function is deleted outright;
//! (c) a `Copy` whose source and destination are the same temp is a no-op
//!     and is dropped.
//!
//! (b) is a whole-function liveness question, not a local one: a temp
//! defined in one block may be consumed in another, so "used" is computed
//! once over every reachable block before any instruction is removed.

use super::Pass;
use crate::tac::{Instr, Operand, TacFunction, TempId};
use std::collections::HashSet;

pub struct Dce;

impl Pass for Dce {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = trim_after_terminator(func);

        let used = used_temps(func);
        for block in &mut func.blocks {
            let before = block.instrs.len();
            block.instrs.retain(|instr| {
                if is_noop_copy(instr) {
                    return false;
                }
                match instr.dst() {
                    Some(dst) if !instr.has_side_effect() => used.contains(&dst),
                    _ => true,
                }
            });
            changed |= block.instrs.len() != before;
        }
        changed
    }
}

fn trim_after_terminator(func: &mut TacFunction) -> bool {
    let mut changed = false;
    for block in &mut func.blocks {
        if let Some(pos) = block.instrs.iter().position(Instr::is_terminator) {
            if pos + 1 < block.instrs.len() {
                block.instrs.truncate(pos + 1);
                changed = true;
            }
        }
    }
    changed
}

fn is_noop_copy(instr: &Instr) -> bool {
    matches!(instr, Instr::Copy { dst, src: Operand::Temp(t) } if dst == t)
}

fn used_temps(func: &TacFunction) -> HashSet<TempId> {
    let mut used = HashSet::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            for operand in instr.uses() {
                if let Operand::Temp(t) = operand {
                    used.insert(t);
                }
            }
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::tac::ConstValue;

    #[test]
    fn removes_unused_pure_computation() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dead = f.new_temp();
        f.push(
            entry,
            Instr::BinOp {
                dst: dead,
                op: BinOp::Add,
                lhs: Operand::Const(ConstValue::Int(1)),
                rhs: Operand::Const(ConstValue::Int(2)),
            },
        );
        f.push(entry, Instr::Return { value: None });
        assert!(Dce.run(&mut f));
        assert_eq!(f.block(entry).instrs.len(), 1);
    }

    #[test]
    fn keeps_side_effecting_instruction_even_when_dst_unused() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::Call {
                dst: Some(dst),
                signature: "Foo.__Bar__SystemVoid".to_string(),
                receiver: None,
                args: vec![],
                is_extern: true,
                is_tail_call: false,
            },
        );
        f.push(entry, Instr::Return { value: None });
        assert!(!Dce.run(&mut f));
    }

    #[test]
    fn drops_instructions_after_terminator() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let dst = f.new_temp();
        f.push(entry, Instr::Return { value: None });
        f.push(
            entry,
            Instr::Copy {
                dst,
                src: Operand::Const(ConstValue::Int(1)),
            },
        );
        assert!(Dce.run(&mut f));
        assert_eq!(f.block(entry).instrs.len(), 1);
    }

    #[test]
    fn drops_noop_self_copy() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let t = f.new_temp();
        f.push(entry, Instr::Copy { dst: t, src: Operand::Temp(t) });
        f.push(entry, Instr::Return { value: Some(Operand::Temp(t)) });
        assert!(Dce.run(&mut f));
        assert_eq!(f.block(entry).instrs.len(), 1);
    }
}
