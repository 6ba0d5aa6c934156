//! Tail-call marking (`spec.md §4.4` item 12): a `Call` whose result flows
//! straight into the block's own `Return` gets `is_tail_call` set. Purely
//! advisory — the lowerer may use it to emit a `JUMP_INDIRECT` in place of a
//! call-then-return pair, but nothing upstream of the lowerer depends on it,
//! and leaving it `false` everywhere is always a safe (if less efficient)
//! choice.

use super::Pass;
use crate::tac::{Instr, Operand, TacFunction};

pub struct TailCallMark;

impl Pass for TailCallMark {
    fn name(&self) -> &'static str {
        "tail-call-mark"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = false;
        for block in &mut func.blocks {
            let len = block.instrs.len();
            if len < 2 {
                continue;
            }
            let is_tail = matches!(
                (&block.instrs[len - 2], &block.instrs[len - 1]),
                (
                    Instr::Call { dst: Some(call_dst), is_tail_call: false, .. },
                    Instr::Return { value: Some(Operand::Temp(ret_val)) }
                ) if call_dst == ret_val
            );
            if is_tail {
                if let Instr::Call { is_tail_call, .. } = &mut block.instrs[len - 2] {
                    *is_tail_call = true;
                    changed = true;
                }
            }
        }
        changed
    }
}
