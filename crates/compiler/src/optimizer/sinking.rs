//! Code sinking (`spec.md §4.4` item 15): a pure producer computed in a
//! block with two successors, but only consumed in one of them, moves into
//! that successor. Its operands are already computed earlier in the
//! producing block, so they stay available regardless of where the
//! instruction itself lives; the only thing that must hold is that neither
//! the producing block nor the *other* successor reads the result.
//!
//! Only blocks with exactly two successors (an `if`/`else` shape) are
//! considered — sinking into one of more than two successors would need a
//! real dominance query this IR doesn't carry, so that case is left alone
//! per the "conservative when unproven" rule every pass here follows.

use super::Pass;
use crate::tac::{BlockId, Instr, Operand, TacFunction, TempId};

pub struct CodeSinking;

impl Pass for CodeSinking {
    fn name(&self) -> &'static str {
        "code-sinking"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        for block_id in func.reachable_blocks() {
            let successors = func.block(block_id).successors();
            let [s1, s2] = successors.as_slice() else {
                continue;
            };
            if let Some((index, target)) = find_sinkable(func, block_id, *s1, *s2) {
                let instr = func.block_mut(block_id).instrs.remove(index);
                func.block_mut(target).instrs.insert(0, instr);
                return true;
            }
        }
        false
    }
}

fn find_sinkable(
    func: &TacFunction,
    block_id: BlockId,
    s1: BlockId,
    s2: BlockId,
) -> Option<(usize, BlockId)> {
    let block = func.block(block_id);
    for (index, instr) in block.instrs.iter().enumerate() {
        if instr.has_side_effect() || instr.is_terminator() {
            continue;
        }
        let Some(dst) = instr.dst() else { continue };

        if block.instrs[index + 1..].iter().any(|later| used_by(later, dst)) {
            continue;
        }
        let used_in_s1 = block_used(func, s1, dst);
        let used_in_s2 = block_used(func, s2, dst);
        match (used_in_s1, used_in_s2) {
            (true, false) => return Some((index, s1)),
            (false, true) => return Some((index, s2)),
            _ => continue,
        }
    }
    None
}

fn used_by(instr: &Instr, dst: TempId) -> bool {
    instr.uses().iter().any(|op| matches!(op, Operand::Temp(t) if *t == dst))
}

fn block_used(func: &TacFunction, block_id: BlockId, dst: TempId) -> bool {
    func.block(block_id).instrs.iter().any(|i| used_by(i, dst))
}
