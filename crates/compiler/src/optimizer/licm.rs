//! Loop-invariant code motion: pure computations inside a loop body whose
//! operands are all defined outside the loop get hoisted into the loop's
//! preheader, so they run once per entry into the loop instead of once per
//! iteration (`spec.md §4.4`).
//!
//! Loops are detected structurally rather than via dominance: a back edge is
//! any jump/branch target whose block id is less than or equal to the
//! block id it's taken from (blocks are numbered in the order the
//! AST-to-TAC converter creates them, so a `while`/`for` body always
//! allocates its header before its latch). The loop body is every block
//! reachable from the header without leaving the `[header, latch]` id
//! range; the preheader is whichever predecessor of the header falls
//! outside that range.

use super::Pass;
use crate::tac::{BlockId, Instr, Operand, TacFunction, TempId};
use std::collections::HashSet;

pub struct Licm;

impl Pass for Licm {
    fn name(&self) -> &'static str {
        "licm"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = false;
        for (header, latch) in find_back_edges(func) {
            if hoist_loop(func, header, latch) {
                changed = true;
            }
        }
        changed
    }
}

fn find_back_edges(func: &TacFunction) -> Vec<(BlockId, BlockId)> {
    let mut edges = Vec::new();
    for &block_id in &func.reachable_blocks() {
        for succ in func.block(block_id).successors() {
            if succ <= block_id {
                edges.push((succ, block_id));
            }
        }
    }
    edges
}

fn loop_body(func: &TacFunction, header: BlockId, latch: BlockId) -> HashSet<BlockId> {
    let mut body = HashSet::new();
    let mut stack = vec![header];
    while let Some(b) = stack.pop() {
        if !body.insert(b) {
            continue;
        }
        if b == latch {
            continue;
        }
        for succ in func.block(b).successors() {
            if succ >= header && succ <= latch {
                stack.push(succ);
            }
        }
    }
    body
}

fn find_preheader(func: &TacFunction, header: BlockId, body: &HashSet<BlockId>) -> Option<BlockId> {
    func.predecessors()
        .get(&header)
        .into_iter()
        .flatten()
        .find(|p| !body.contains(p))
        .copied()
}

fn hoist_loop(func: &mut TacFunction, header: BlockId, latch: BlockId) -> bool {
    let body = loop_body(func, header, latch);
    let Some(preheader) = find_preheader(func, header, &body) else {
        return false;
    };

    let defined_inside: HashSet<TempId> = func
        .blocks
        .iter()
        .filter(|b| body.contains(&b.id))
        .flat_map(|b| b.instrs.iter().filter_map(Instr::dst))
        .collect();

    // A temp only counts as loop-invariant if it's defined outside the loop
    // and never redefined anywhere inside it; a temp reassigned on each
    // iteration (a loop-carried variable) must not be treated as invariant
    // just because it also happens to have a definition before the loop.
    let defined_outside: HashSet<TempId> = func
        .blocks
        .iter()
        .filter(|b| !body.contains(&b.id))
        .flat_map(|b| b.instrs.iter().filter_map(Instr::dst))
        .filter(|t| !defined_inside.contains(t))
        .collect();

    let mut hoisted_so_far: HashSet<TempId> = HashSet::new();
    let mut changed = false;

    // Walk loop-body blocks in id order so a temp hoisted earlier in the
    // loop can make a later, dependent computation invariant too.
    let mut body_order: Vec<BlockId> = body.iter().copied().collect();
    body_order.sort_unstable();

    for block_id in body_order {
        if block_id == header {
            continue;
        }
        let mut i = 0;
        while i < func.block(block_id).instrs.len() {
            let is_candidate = {
                let instr = &func.block(block_id).instrs[i];
                is_invariant(instr, &defined_outside, &hoisted_so_far)
            };
            if is_candidate {
                let instr = func.block_mut(block_id).instrs.remove(i);
                if let Some(dst) = instr.dst() {
                    hoisted_so_far.insert(dst);
                }
                let preheader_instrs = &mut func.block_mut(preheader).instrs;
                let insert_at = preheader_instrs
                    .last()
                    .map(|last| if last.is_terminator() { preheader_instrs.len() - 1 } else { preheader_instrs.len() })
                    .unwrap_or(0);
                preheader_instrs.insert(insert_at, instr);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    changed
}

fn is_invariant(instr: &Instr, defined_outside: &HashSet<TempId>, hoisted_so_far: &HashSet<TempId>) -> bool {
    if instr.has_side_effect() || instr.is_terminator() {
        return false;
    }
    if !matches!(instr, Instr::BinOp { .. } | Instr::UnOp { .. }) {
        return false;
    }
    instr.uses().iter().all(|op| match op {
        Operand::Const(_) => true,
        Operand::Temp(t) => defined_outside.contains(t) || hoisted_so_far.contains(t),
    })
}
