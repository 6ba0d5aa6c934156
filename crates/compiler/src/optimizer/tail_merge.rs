//! Tail merging (`spec.md §4.4` item 13): when two blocks end in the exact
//! same instruction sequence (a shared cleanup-then-return, or two branches
//! of an `if` that both terminate the same way), factor the shared suffix
//! out into one new block and have both originals jump to it. Safe by
//! construction: the suffix is compared with plain `PartialEq`, so a
//! `Jump`/`Branch` inside it already targets the same block id regardless of
//! which original block it came from.
//!
//! Only the first matching pair is merged per call; the fixed-point driver
//! in [`super::optimize`] re-invokes the pass until no pair matches, which
//! also lets [`super::jump_simplify`] clean up any block a merge reduced to
//! a single trivial jump.

use super::Pass;
use crate::tac::{BlockId, Instr, TacFunction};

pub struct TailMerge;

impl Pass for TailMerge {
    fn name(&self) -> &'static str {
        "tail-merge"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let ids: Vec<BlockId> = func.blocks.iter().map(|b| b.id).collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let len = common_suffix_len(&func.block(a).instrs, &func.block(b).instrs);
                if len == 0 {
                    continue;
                }
                merge_suffix(func, a, b, len);
                return true;
            }
        }
        false
    }
}

fn common_suffix_len(a: &[Instr], b: &[Instr]) -> usize {
    let mut n = 0;
    while n < a.len() && n < b.len() && a[a.len() - 1 - n] == b[b.len() - 1 - n] {
        n += 1;
    }
    n
}

fn merge_suffix(func: &mut TacFunction, a: BlockId, b: BlockId, len: usize) {
    let suffix = func.block(a).instrs[func.block(a).instrs.len() - len..].to_vec();
    let tail = func.new_block();
    func.block_mut(tail).instrs = suffix;

    for block_id in [a, b] {
        let block = func.block_mut(block_id);
        let prefix_len = block.instrs.len() - len;
        block.instrs.truncate(prefix_len);
        block.instrs.push(Instr::Jump { target: tail });
    }
}
