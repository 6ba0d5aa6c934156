//! Induction-variable strength reduction and trivial loop unrolling
//! (`spec.md §4.4` item 5), sharing the structural back-edge/loop-body
//! detection [`super::licm`] already established (blocks are numbered in
//! creation order, so a back edge is any successor whose id is `<=` the
//! block it's taken from).

use super::Pass;
use crate::ast::BinOp;
use crate::tac::{BlockId, ConstValue, Instr, Operand, TacFunction, TempId};
use std::collections::HashSet;

pub struct StrengthReduction;

impl Pass for StrengthReduction {
    fn name(&self) -> &'static str {
        "strength-reduction"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = false;
        for (header, latch) in back_edges(func) {
            if let Some(preheader) = preheader_of(func, header, latch) {
                if reduce_loop(func, header, latch, preheader) {
                    changed = true;
                }
            }
        }
        changed
    }
}

pub struct LoopUnroll;

impl Pass for LoopUnroll {
    fn name(&self) -> &'static str {
        "loop-unroll"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        for (header, latch) in back_edges(func) {
            if let Some(preheader) = preheader_of(func, header, latch) {
                if try_unroll(func, header, latch, preheader) {
                    return true;
                }
            }
        }
        false
    }
}

fn back_edges(func: &TacFunction) -> Vec<(BlockId, BlockId)> {
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

fn body_blocks(func: &TacFunction, header: BlockId, latch: BlockId) -> HashSet<BlockId> {
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

fn preheader_of(func: &TacFunction, header: BlockId, latch: BlockId) -> Option<BlockId> {
    let body = body_blocks(func, header, latch);
    func.predecessors()
        .get(&header)
        .into_iter()
        .flatten()
        .find(|p| !body.contains(*p))
        .copied()
}

/// An induction variable incremented by a constant step: `t = iv + step;
/// iv = t` (or `t = step + iv`), found as two adjacent instructions
/// anywhere in the loop, with `t` used only by the copy back into `iv`.
struct Induction {
    iv: TempId,
    step: i64,
    /// Index of the `BinOp` (add) instruction within its block.
    add_block: BlockId,
    add_index: usize,
}

fn find_induction(func: &TacFunction, body: &HashSet<BlockId>) -> Option<Induction> {
    for &block_id in body {
        let block = func.block(block_id);
        for i in 0..block.instrs.len().saturating_sub(1) {
            let Instr::BinOp { dst: t, op: BinOp::Add, lhs, rhs } = &block.instrs[i] else {
                continue;
            };
            let (iv, step) = match (lhs, rhs) {
                (Operand::Temp(iv), Operand::Const(ConstValue::Int(s))) => (*iv, *s),
                (Operand::Const(ConstValue::Int(s)), Operand::Temp(iv)) => (*iv, *s),
                _ => continue,
            };
            if let Instr::Copy { dst, src: Operand::Temp(src) } = &block.instrs[i + 1] {
                if dst == &iv && src == t {
                    return Some(Induction {
                        iv,
                        step,
                        add_block: block_id,
                        add_index: i,
                    });
                }
            }
        }
    }
    None
}

/// Finds a `Mul` against the induction variable inside the loop body
/// (excluding the increment's own block/index), and rewrites it plus
/// threads a matching accumulator alongside the induction variable.
fn reduce_loop(func: &mut TacFunction, header: BlockId, latch: BlockId, preheader: BlockId) -> bool {
    let body = body_blocks(func, header, latch);
    let Some(induction) = find_induction(func, &body) else {
        return false;
    };

    let mut target = None;
    'search: for &block_id in &body {
        let block = func.block(block_id);
        for (i, instr) in block.instrs.iter().enumerate() {
            if block_id == induction.add_block && i == induction.add_index {
                continue;
            }
            if let Instr::BinOp { dst, op: BinOp::Mul, lhs, rhs } = instr {
                let c = match (lhs, rhs) {
                    (Operand::Temp(iv), Operand::Const(ConstValue::Int(c))) if *iv == induction.iv => Some(*c),
                    (Operand::Const(ConstValue::Int(c)), Operand::Temp(iv)) if *iv == induction.iv => Some(*c),
                    _ => None,
                };
                if let Some(c) = c {
                    target = Some((block_id, i, *dst, c));
                    break 'search;
                }
            }
        }
    }
    let Some((mul_block, mul_index, mul_dst, c)) = target else {
        return false;
    };

    let acc = func.new_temp();
    let acc_next = func.new_temp();

    // Seed the accumulator in the preheader from the induction variable's
    // value on entry (whatever it is, constant-folded or not — this pass
    // doesn't need to know the loop's trip count).
    let insert_at = preheader_insert_point(func, preheader);
    func.block_mut(preheader).instrs.insert(
        insert_at,
        Instr::BinOp {
            dst: acc,
            op: BinOp::Mul,
            lhs: Operand::Temp(induction.iv),
            rhs: Operand::Const(ConstValue::Int(c)),
        },
    );

    // Replace the multiplication with a read of the accumulator.
    func.block_mut(mul_block).instrs[mul_index] = Instr::Copy {
        dst: mul_dst,
        src: Operand::Temp(acc),
    };

    // Advance the accumulator by step*c alongside the induction variable's
    // own increment (right after the `iv = t` copy at `add_index + 1`).
    let advance_at = induction.add_index;
    let block = func.block_mut(induction.add_block);
    block.instrs.insert(
        advance_at + 2,
        Instr::Copy { dst: acc, src: Operand::Temp(acc_next) },
    );
    block.instrs.insert(
        advance_at + 2,
        Instr::BinOp {
            dst: acc_next,
            op: BinOp::Add,
            lhs: Operand::Temp(acc),
            rhs: Operand::Const(ConstValue::Int(induction.step * c)),
        },
    );

    true
}

fn preheader_insert_point(func: &TacFunction, preheader: BlockId) -> usize {
    let instrs = &func.block(preheader).instrs;
    if instrs.last().map(Instr::is_terminator).unwrap_or(false) {
        instrs.len() - 1
    } else {
        instrs.len()
    }
}

/// A loop qualifies for trivial unrolling when: the preheader's last
/// instruction sets the induction variable to a constant; the header's
/// branch condition is a single `Lt`/`Le` comparison of that variable
/// against a constant bound; the body is exactly one block (straight-line,
/// no internal branches) ending in the increment back to the header; and
/// the resulting trip count is between 1 and 3 inclusive.
fn try_unroll(func: &mut TacFunction, header: BlockId, latch: BlockId, preheader: BlockId) -> bool {
    let body = body_blocks(func, header, latch);
    if body.len() != 2 || !body.contains(&header) {
        // Exactly {header, one straight-line body block}; latch == that
        // body block in the single-block-body case this pass handles.
        return false;
    }
    let Some(Induction { iv, step, add_block, add_index }) = find_induction(func, &body) else {
        return false;
    };
    if add_block != latch {
        return false;
    }

    let Some(init) = constant_init(func, preheader, iv) else {
        return false;
    };
    let Some((bound_op, bound)) = header_bound(func, header, iv) else {
        return false;
    };

    let trip_count = match bound_op {
        BinOp::Lt => trip_count_for(init, bound, step),
        BinOp::Le => trip_count_for(init, bound + 1, step),
        _ => None,
    };
    let Some(trip_count) = trip_count.filter(|n| (1..=3).contains(n)) else {
        return false;
    };

    // Straight-line body instructions, excluding the trailing increment
    // pair and the jump back to the header.
    let body_instrs: Vec<Instr> = func.block(latch).instrs[..add_index].to_vec();
    let exit_block = func
        .block(header)
        .successors()
        .into_iter()
        .find(|b| *b != body_head(func, header))
        .unwrap_or(header);

    // Replace the preheader's jump-to-header with the unrolled sequence,
    // then jump straight to the loop's exit.
    let ph_instrs = &mut func.block_mut(preheader).instrs;
    if matches!(ph_instrs.last(), Some(Instr::Jump { target }) if *target == header) {
        ph_instrs.pop();
    }
    for _ in 0..trip_count {
        func.block_mut(preheader).instrs.extend(body_instrs.iter().cloned());
    }
    func.block_mut(preheader).instrs.push(Instr::Jump { target: exit_block });

    // Orphan the header/body blocks by pointing nothing at them; DCE-style
    // passes don't remove unreachable blocks explicitly in this IR, but
    // `reachable_blocks` (and therefore every later pass and the lowerer)
    // only ever walks from `entry`, so an unreachable header is inert.
    true
}

fn body_head(func: &TacFunction, header: BlockId) -> BlockId {
    match func.block(header).terminator() {
        Some(Instr::Branch { then_block, .. }) => *then_block,
        _ => header,
    }
}

fn constant_init(func: &TacFunction, preheader: BlockId, iv: TempId) -> Option<i64> {
    func.block(preheader).instrs.iter().rev().find_map(|i| match i {
        Instr::Copy { dst, src: Operand::Const(ConstValue::Int(n)) } if *dst == iv => Some(*n),
        _ => None,
    })
}

fn header_bound(func: &TacFunction, header: BlockId, iv: TempId) -> Option<(BinOp, i64)> {
    let block = func.block(header);
    let Instr::Branch { cond: Operand::Temp(cond), .. } = block.terminator()? else {
        return None;
    };
    block.instrs.iter().find_map(|i| match i {
        Instr::BinOp { dst, op, lhs: Operand::Temp(l), rhs: Operand::Const(ConstValue::Int(n)) }
            if dst == cond && *l == iv && matches!(op, BinOp::Lt | BinOp::Le) =>
        {
            Some((*op, *n))
        }
        _ => None,
    })
}

fn trip_count_for(init: i64, bound_exclusive: i64, step: i64) -> Option<u32> {
    if step <= 0 || bound_exclusive <= init {
        return None;
    }
    let count = (bound_exclusive - init + step - 1) / step;
    u32::try_from(count).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_reduces_induction_multiply_to_accumulator() {
        let mut f = TacFunction::new("C::m");
        let preheader = f.entry;
        let header = f.new_block();
        let body = f.new_block();
        let exit = f.new_block();
        let iv = f.new_temp();
        let bound = f.new_temp();
        let mul_dst = f.new_temp();
        let incr = f.new_temp();

        f.push(preheader, Instr::Copy { dst: iv, src: Operand::Const(ConstValue::Int(0)) });
        f.push(preheader, Instr::Jump { target: header });

        f.push(
            header,
            Instr::BinOp {
                dst: bound,
                op: BinOp::Lt,
                lhs: Operand::Temp(iv),
                rhs: Operand::Const(ConstValue::Int(10)),
            },
        );
        f.push(
            header,
            Instr::Branch { cond: Operand::Temp(bound), then_block: body, else_block: exit },
        );

        f.push(
            body,
            Instr::BinOp {
                dst: mul_dst,
                op: BinOp::Mul,
                lhs: Operand::Temp(iv),
                rhs: Operand::Const(ConstValue::Int(4)),
            },
        );
        f.push(
            body,
            Instr::BinOp {
                dst: incr,
                op: BinOp::Add,
                lhs: Operand::Temp(iv),
                rhs: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(body, Instr::Copy { dst: iv, src: Operand::Temp(incr) });
        f.push(body, Instr::Jump { target: header });
        f.push(exit, Instr::Return { value: None });

        assert!(StrengthReduction.run(&mut f));
        assert!(!f.block(body).instrs.iter().any(|i| matches!(i, Instr::BinOp { op: BinOp::Mul, .. })));
    }

    #[test]
    fn unrolls_small_constant_trip_count_loop() {
        let mut f = TacFunction::new("C::m");
        let preheader = f.entry;
        let header = f.new_block();
        let body = f.new_block();
        let exit = f.new_block();
        let iv = f.new_temp();
        let bound = f.new_temp();
        let side_effect_dst = f.new_temp();
        let incr = f.new_temp();

        f.push(preheader, Instr::Copy { dst: iv, src: Operand::Const(ConstValue::Int(0)) });
        f.push(preheader, Instr::Jump { target: header });

        f.push(
            header,
            Instr::BinOp {
                dst: bound,
                op: BinOp::Lt,
                lhs: Operand::Temp(iv),
                rhs: Operand::Const(ConstValue::Int(3)),
            },
        );
        f.push(
            header,
            Instr::Branch { cond: Operand::Temp(bound), then_block: body, else_block: exit },
        );

        f.push(
            body,
            Instr::Call {
                dst: Some(side_effect_dst),
                signature: "Foo.__Bar__SystemVoid".to_string(),
                receiver: None,
                args: vec![Operand::Temp(iv)],
                is_extern: true,
                is_tail_call: false,
            },
        );
        f.push(
            body,
            Instr::BinOp {
                dst: incr,
                op: BinOp::Add,
                lhs: Operand::Temp(iv),
                rhs: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(body, Instr::Copy { dst: iv, src: Operand::Temp(incr) });
        f.push(body, Instr::Jump { target: header });
        f.push(exit, Instr::Return { value: None });

        assert!(LoopUnroll.run(&mut f));
        let calls = f
            .block(preheader)
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::Call { .. }))
            .count();
        assert_eq!(calls, 3);
    }
}
