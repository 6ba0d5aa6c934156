//! Partial redundancy elimination: when both arms of an `if`/`else` diamond
//! independently compute the same pure expression as their first
//! instruction, hoist the computation above the branch so it runs once
//! instead of on every path (`spec.md §4.4`'s "branch folding" family —
//! this is the partially-redundant case constant folding itself can't
//! reach, since the branch condition isn't constant).

use super::Pass;
use crate::tac::{BlockId, Instr, Operand, TacFunction};

pub struct Pre;

impl Pass for Pre {
    fn name(&self) -> &'static str {
        "pre"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = false;
        for &block_id in &func.reachable_blocks() {
            if let Some((then_block, else_block)) = branch_targets(func, block_id) {
                if try_hoist(func, block_id, then_block, else_block) {
                    changed = true;
                }
            }
        }
        changed
    }
}

fn branch_targets(func: &TacFunction, block_id: BlockId) -> Option<(BlockId, BlockId)> {
    match func.block(block_id).terminator() {
        Some(Instr::Branch {
            then_block,
            else_block,
            ..
        }) => Some((*then_block, *else_block)),
        _ => None,
    }
}

/// Blocks that are the unique entry of a diamond: exactly one predecessor,
/// so hoisting their leading instruction above the branch can't change
/// behavior for any other path reaching them.
fn has_single_predecessor(func: &TacFunction, block_id: BlockId, expected_pred: BlockId) -> bool {
    func.predecessors()
        .get(&block_id)
        .map(|preds| preds == &vec![expected_pred])
        .unwrap_or(false)
}

fn try_hoist(func: &mut TacFunction, branch_block: BlockId, then_block: BlockId, else_block: BlockId) -> bool {
    if !has_single_predecessor(func, then_block, branch_block) || !has_single_predecessor(func, else_block, branch_block) {
        return false;
    }

    let then_key = func.block(then_block).instrs.first().and_then(purity_key);
    let else_key = func.block(else_block).instrs.first().and_then(purity_key);
    let (Some(then_key), Some(else_key)) = (then_key, else_key) else {
        return false;
    };
    if then_key != else_key {
        return false;
    }

    let hoisted = func.block_mut(then_block).instrs.remove(0);
    let hoisted_dst = hoisted.dst();
    let removed_else = func.block_mut(else_block).instrs.remove(0);

    // Insert the hoisted instruction just before the branch terminator.
    let branch = func.block_mut(branch_block).instrs.pop();
    func.block_mut(branch_block).instrs.push(hoisted);
    if let Some(branch) = branch {
        func.block_mut(branch_block).instrs.push(branch);
    }

    if let (Some(hoisted_dst), Some(else_dst)) = (hoisted_dst, removed_else.dst()) {
        if hoisted_dst != else_dst {
            func.block_mut(else_block).instrs.insert(
                0,
                Instr::Copy {
                    dst: else_dst,
                    src: Operand::Temp(hoisted_dst),
                },
            );
        }
    }
    true
}

fn purity_key(instr: &Instr) -> Option<String> {
    if instr.has_side_effect() {
        return None;
    }
    match instr {
        Instr::BinOp { op, lhs, rhs, .. } => Some(format!("bin:{op:?}:{lhs:?}:{rhs:?}")),
        Instr::UnOp { op, operand, .. } => Some(format!("un:{op:?}:{operand:?}")),
        Instr::LoadField { object, field, .. } => Some(format!("load:{object:?}:{field}")),
        _ => None,
    }
}
