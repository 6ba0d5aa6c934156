//! Block layout (`spec.md §4.4` item 14): physically reorders blocks so
//! that an unconditional jump's target immediately follows it whenever that
//! target hasn't already been placed elsewhere, then drops any trailing
//! jump that now targets the block physically right after it — the VM falls
//! through to the next block in the assembled stream with no instruction
//! needed.
//!
//! Block ids never change; only their order within [`TacFunction::blocks`]
//! does; every `Jump`/`Branch` still names the same id it always did.

use super::Pass;
use crate::tac::{BlockId, Instr, TacFunction};
use std::collections::{HashMap, HashSet};

pub struct BlockLayout;

impl Pass for BlockLayout {
    fn name(&self) -> &'static str {
        "block-layout"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let original_order: Vec<BlockId> = func.blocks.iter().map(|b| b.id).collect();
        let order = layout_order(func, &original_order);

        let mut by_id: HashMap<BlockId, _> =
            func.blocks.drain(..).map(|b| (b.id, b)).collect();
        for id in &order {
            func.blocks.push(by_id.remove(id).expect("layout_order covers every block"));
        }

        let mut changed = order != original_order;
        for i in 0..func.blocks.len().saturating_sub(1) {
            let next_id = func.blocks[i + 1].id;
            if matches!(func.blocks[i].instrs.last(), Some(Instr::Jump { target }) if *target == next_id)
            {
                func.blocks[i].instrs.pop();
                changed = true;
            }
        }
        changed
    }
}

fn layout_order(func: &TacFunction, original_order: &[BlockId]) -> Vec<BlockId> {
    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(original_order.len());

    let starts = std::iter::once(func.entry).chain(original_order.iter().copied());
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut current = start;
        loop {
            order.push(current);
            visited.insert(current);
            let next = match func.block(current).terminator() {
                Some(Instr::Jump { target }) if !visited.contains(target) => Some(*target),
                _ => None,
            };
            match next {
                Some(n) => current = n,
                None => break,
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::Operand;

    #[test]
    fn chains_unconditional_jump_target_immediately_after() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let middle = f.new_block();
        let tail = f.new_block();
        // Declared out of chain order: entry -> tail is wrong; real edge is
        // entry -> middle -> tail, with `tail` pushed to the vec first.
        f.push(tail, Instr::Return { value: None });
        f.push(entry, Instr::Jump { target: middle });
        f.push(middle, Instr::Jump { target: tail });

        assert!(BlockLayout.run(&mut f));
        let ids: Vec<BlockId> = f.blocks.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![entry, middle, tail]);
    }

    #[test]
    fn drops_jump_onto_physically_next_block() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let next = f.new_block();
        f.push(entry, Instr::Jump { target: next });
        f.push(next, Instr::Return { value: None });

        assert!(BlockLayout.run(&mut f));
        assert!(f.block(entry).instrs.is_empty());
    }

    #[test]
    fn keeps_jump_when_target_is_not_adjacent() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let a = f.new_block();
        let b = f.new_block();
        // entry branches to both a and b; b jumps back to a, which can only
        // be placed once, so one of the two jumps into it must survive.
        f.push(
            entry,
            Instr::Branch { cond: Operand::Const(crate::tac::ConstValue::Bool(true)), then_block: a, else_block: b },
        );
        f.push(a, Instr::Return { value: None });
        f.push(b, Instr::Jump { target: a });

        BlockLayout.run(&mut f);
        let jump_count = f
            .blocks
            .iter()
            .filter(|blk| matches!(blk.instrs.last(), Some(Instr::Jump { target }) if *target == a))
            .count();
        assert_eq!(jump_count, 1);
    }
}
