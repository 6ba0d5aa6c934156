//! Sparse conditional constant propagation (`spec.md §4.4`/§8): a
//! lattice-based worklist dataflow pass over the reachable CFG. Every temp
//! carries a [`Lattice`] value (`Unknown`, a known `Constant`, or
//! `Overdefined`) that can only move downward as evidence accumulates; a
//! CFG edge only contributes its source block's values once it is proven
//! executable, so a branch on a constant condition starves its untaken arm
//! of any contribution at all.
//!
//! Once the analysis converges, a second pass rewrites every resolved
//! constant use in place and folds a `Branch` whose condition is fully
//! constant into a plain `Jump`. That rewrite is the whole of "unreachable
//! block pruning" this pass needs to do: every downstream consumer
//! ([`crate::lowerer`], [`super::dce`], [`super::block_layout`]) already
//! walks only [`TacFunction::reachable_blocks`], so the untaken arm simply
//! stops being structurally reachable.

use super::constant_fold::{fold_binop, fold_cast, fold_unop};
use super::Pass;
use crate::tac::{BinOp, BlockId, ConstValue, Instr, Operand, TacFunction, TempId, UnOp};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct Sccp;

impl Pass for Sccp {
    fn name(&self) -> &'static str {
        "sccp"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let cap = (func.blocks.len() * 1000).max(1000);
        run_with_cap(func, cap)
    }
}

/// Runs the analysis/rewrite pair with an explicit iteration cap, so the
/// cap's behavior (give up rather than loop forever on a malformed CFG) is
/// directly testable without constructing a function large enough to hit
/// the default `blocks * 1000` threshold.
fn run_with_cap(func: &mut TacFunction, cap: usize) -> bool {
    let overdefined = overdefined_temps(func);
    let preds = func.predecessors();
    let (block_in, block_out, executable) = analyze(func, &preds, &overdefined, cap);
    rewrite(func, &block_in, &block_out, &executable, &overdefined)
}

#[derive(Debug, Clone, PartialEq)]
enum Lattice {
    /// Not yet proven either way; the optimistic starting point for every
    /// temp defined somewhere in the function.
    Unknown,
    Constant(ConstValue),
    /// Proven to take more than one value, or to come from outside this
    /// function's own instructions (a parameter, `this`, a field load, a
    /// call result).
    Overdefined,
}

fn meet(a: &Lattice, b: &Lattice) -> Lattice {
    match (a, b) {
        (Lattice::Unknown, x) | (x, Lattice::Unknown) => x.clone(),
        (Lattice::Overdefined, _) | (_, Lattice::Overdefined) => Lattice::Overdefined,
        (Lattice::Constant(l), Lattice::Constant(r)) => {
            if l == r {
                Lattice::Constant(l.clone())
            } else {
                Lattice::Overdefined
            }
        }
    }
}

fn binop_lattice(op: BinOp, l: &Lattice, r: &Lattice) -> Lattice {
    match (l, r) {
        (Lattice::Overdefined, _) | (_, Lattice::Overdefined) => Lattice::Overdefined,
        (Lattice::Unknown, _) | (_, Lattice::Unknown) => Lattice::Unknown,
        (Lattice::Constant(lc), Lattice::Constant(rc)) => match fold_binop(op, lc, rc) {
            Some(v) => Lattice::Constant(v),
            None => Lattice::Overdefined,
        },
    }
}

fn unop_lattice(op: UnOp, v: &Lattice) -> Lattice {
    match v {
        Lattice::Overdefined => Lattice::Overdefined,
        Lattice::Unknown => Lattice::Unknown,
        Lattice::Constant(c) => match fold_unop(op, c) {
            Some(r) => Lattice::Constant(r),
            None => Lattice::Overdefined,
        },
    }
}

fn cast_lattice(type_name: &str, v: &Lattice) -> Lattice {
    match v {
        Lattice::Overdefined => Lattice::Overdefined,
        Lattice::Unknown => Lattice::Unknown,
        Lattice::Constant(c) => match fold_cast(type_name, c) {
            Some(r) => Lattice::Constant(r),
            None => Lattice::Overdefined,
        },
    }
}

/// Non-boolean branch conditions coerce the same way the runtime does:
/// zero/empty/null is falsy, everything else is truthy.
fn truthy(c: &ConstValue) -> bool {
    match c {
        ConstValue::Bool(b) => *b,
        ConstValue::Int(n) => *n != 0,
        ConstValue::Float(n) => *n != 0.0,
        ConstValue::Str(s) => !s.is_empty(),
        ConstValue::Null => false,
    }
}

fn lookup(op: &Operand, env: &HashMap<TempId, Lattice>, overdefined: &HashSet<TempId>) -> Lattice {
    match op {
        Operand::Const(c) => Lattice::Constant(c.clone()),
        Operand::Temp(t) => {
            if overdefined.contains(t) {
                Lattice::Overdefined
            } else {
                env.get(t).cloned().unwrap_or(Lattice::Unknown)
            }
        }
    }
}

/// Temps that can never be proven constant on their own: function
/// parameters (including the implicit `this` the converter allocates a
/// temp for but never defines via any instruction) and anything else with
/// no defining instruction anywhere in the function.
fn overdefined_temps(func: &TacFunction) -> HashSet<TempId> {
    let mut defined: HashSet<TempId> = HashSet::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let Some(dst) = instr.dst() {
                defined.insert(dst);
            }
        }
    }
    let mut result: HashSet<TempId> = func.params.iter().copied().collect();
    for t in 0..func.temp_count() {
        if !defined.contains(&t) {
            result.insert(t);
        }
    }
    result
}

fn merge_entry_env(
    block: BlockId,
    preds: &HashMap<BlockId, Vec<BlockId>>,
    executable: &HashSet<(BlockId, BlockId)>,
    block_out: &HashMap<BlockId, HashMap<TempId, Lattice>>,
) -> HashMap<TempId, Lattice> {
    let mut merged: HashMap<TempId, Lattice> = HashMap::new();
    for &pred in preds.get(&block).into_iter().flatten() {
        if !executable.contains(&(pred, block)) {
            continue;
        }
        let Some(out) = block_out.get(&pred) else {
            continue;
        };
        for (temp, value) in out {
            merged
                .entry(*temp)
                .and_modify(|existing| *existing = meet(existing, value))
                .or_insert_with(|| value.clone());
        }
    }
    merged
}

type BlockEnvs = HashMap<BlockId, HashMap<TempId, Lattice>>;

/// Runs the worklist fixpoint, returning the converged entry/exit
/// environment used for each visited block plus the set of edges proven
/// executable. A block absent from either map was never reached by the
/// analysis (dead code the rewrite pass leaves untouched this round).
fn analyze(
    func: &TacFunction,
    preds: &HashMap<BlockId, Vec<BlockId>>,
    overdefined: &HashSet<TempId>,
    cap: usize,
) -> (BlockEnvs, BlockEnvs, HashSet<(BlockId, BlockId)>) {
    let mut executable: HashSet<(BlockId, BlockId)> = HashSet::new();
    let mut block_in: BlockEnvs = HashMap::new();
    let mut block_out: BlockEnvs = HashMap::new();
    let mut worklist: VecDeque<BlockId> = VecDeque::new();
    worklist.push_back(func.entry);

    let mut iterations = 0usize;
    while let Some(block_id) = worklist.pop_front() {
        iterations += 1;
        if iterations > cap {
            break;
        }

        let entry = if block_id == func.entry {
            HashMap::new()
        } else {
            merge_entry_env(block_id, preds, &executable, &block_out)
        };
        let block = func.block(block_id);
        let (out, edges) = transfer(block, &entry, overdefined, &block_out, &executable);
        let changed = block_out.get(&block_id) != Some(&out);
        block_in.insert(block_id, entry);
        block_out.insert(block_id, out);

        for (from, to) in edges {
            let newly_executable = executable.insert((from, to));
            if newly_executable || changed {
                worklist.push_back(to);
            }
        }
    }

    (block_in, block_out, executable)
}

/// Interprets `block`'s instructions starting from `entry`, returning the
/// resulting exit environment plus the successor edges this block's
/// terminator makes executable (both arms, unless the condition resolves
/// to a known constant).
fn transfer(
    block: &crate::tac::BasicBlock,
    entry: &HashMap<TempId, Lattice>,
    overdefined: &HashSet<TempId>,
    block_out: &BlockEnvs,
    executable: &HashSet<(BlockId, BlockId)>,
) -> (HashMap<TempId, Lattice>, Vec<(BlockId, BlockId)>) {
    let mut env = entry.clone();
    for (index, instr) in block.instrs.iter().enumerate() {
        if index + 1 == block.instrs.len() {
            break; // terminator handled below, after the env is final
        }
        apply(instr, &mut env, overdefined, block.id, block_out, executable);
    }

    let edges = match block.instrs.last() {
        Some(Instr::Jump { target }) => vec![(block.id, *target)],
        Some(Instr::Branch { cond, then_block, else_block }) => match lookup(cond, &env, overdefined) {
            Lattice::Constant(c) => {
                if truthy(&c) {
                    vec![(block.id, *then_block)]
                } else {
                    vec![(block.id, *else_block)]
                }
            }
            _ => vec![(block.id, *then_block), (block.id, *else_block)],
        },
        _ => vec![],
    };
    (env, edges)
}

/// Updates `env` for one non-terminator instruction's effect, read-only
/// (the rewrite pass below mirrors this exactly while also mutating the
/// instruction in place).
fn apply(
    instr: &Instr,
    env: &mut HashMap<TempId, Lattice>,
    overdefined: &HashSet<TempId>,
    block_id: BlockId,
    block_out: &BlockEnvs,
    executable: &HashSet<(BlockId, BlockId)>,
) {
    match instr {
        Instr::BinOp { dst, op, lhs, rhs } => {
            let l = lookup(lhs, env, overdefined);
            let r = lookup(rhs, env, overdefined);
            env.insert(*dst, binop_lattice(*op, &l, &r));
        }
        Instr::UnOp { dst, op, operand } => {
            let v = lookup(operand, env, overdefined);
            env.insert(*dst, unop_lattice(*op, &v));
        }
        Instr::Cast { dst, type_name, operand } => {
            let v = lookup(operand, env, overdefined);
            env.insert(*dst, cast_lattice(type_name, &v));
        }
        Instr::Copy { dst, src } => {
            let v = lookup(src, env, overdefined);
            env.insert(*dst, v);
        }
        Instr::LoadField { dst, .. } => {
            env.insert(*dst, Lattice::Overdefined);
        }
        Instr::Call { dst: Some(dst), .. } => {
            env.insert(*dst, Lattice::Overdefined);
        }
        Instr::New { dst, .. } => {
            env.insert(*dst, Lattice::Overdefined);
        }
        Instr::Phi { dst, incoming } => {
            env.insert(*dst, phi_value(incoming, block_id, overdefined, block_out, executable));
        }
        Instr::StoreField { .. } | Instr::Call { dst: None, .. } | Instr::Branch { .. } | Instr::Return { .. } | Instr::Jump { .. } | Instr::Nop => {}
    }
}

fn phi_value(
    incoming: &[(BlockId, Operand)],
    block_id: BlockId,
    overdefined: &HashSet<TempId>,
    block_out: &BlockEnvs,
    executable: &HashSet<(BlockId, BlockId)>,
) -> Lattice {
    let mut acc = Lattice::Unknown;
    let mut any = false;
    for (pred, op) in incoming {
        if !executable.contains(&(*pred, block_id)) {
            continue;
        }
        let value = match block_out.get(pred) {
            Some(pred_env) => lookup(op, pred_env, overdefined),
            None => Lattice::Unknown,
        };
        acc = meet(&acc, &value);
        any = true;
    }
    if any {
        acc
    } else {
        Lattice::Unknown
    }
}

/// Replaces every resolved-constant use with its literal value and folds a
/// constant-conditioned `Branch` into a `Jump`. Re-derives each block's
/// per-instruction environment from its converged entry state rather than
/// reusing [`analyze`]'s exit snapshot, so a substitution made mid-block is
/// visible to every instruction after it in the same pass.
fn rewrite(
    func: &mut TacFunction,
    block_in: &BlockEnvs,
    block_out: &BlockEnvs,
    executable: &HashSet<(BlockId, BlockId)>,
    overdefined: &HashSet<TempId>,
) -> bool {
    let mut changed = false;
    for block_id in func.reachable_blocks() {
        let Some(start) = block_in.get(&block_id) else {
            continue;
        };
        let mut env = start.clone();
        let block = func.block_mut(block_id);
        let last = block.instrs.len().saturating_sub(1);
        for instr in &mut block.instrs[..last] {
            changed |= rewrite_instr(instr, &mut env, overdefined, block_id, block_out, executable);
        }

        let Some(terminator) = block.instrs.last_mut() else {
            continue;
        };
        match terminator {
            Instr::Branch { cond, then_block, else_block } => {
                let v = lookup(cond, &env, overdefined);
                changed |= substitute_operand(cond, &v);
                if let Lattice::Constant(c) = &v {
                    let target = if truthy(c) { *then_block } else { *else_block };
                    *terminator = Instr::Jump { target };
                    changed = true;
                }
            }
            Instr::Return { value: Some(v) } => {
                let lv = lookup(v, &env, overdefined);
                changed |= substitute_operand(v, &lv);
            }
            Instr::Jump { .. } | Instr::Return { value: None } | Instr::Nop => {}
            _ => {}
        }
    }
    changed
}

fn substitute_operand(op: &mut Operand, v: &Lattice) -> bool {
    if let Lattice::Constant(c) = v {
        if op.as_const().is_none() {
            *op = Operand::Const(c.clone());
            return true;
        }
    }
    false
}

fn rewrite_instr(
    instr: &mut Instr,
    env: &mut HashMap<TempId, Lattice>,
    overdefined: &HashSet<TempId>,
    block_id: BlockId,
    block_out: &BlockEnvs,
    executable: &HashSet<(BlockId, BlockId)>,
) -> bool {
    let mut changed = false;
    match instr {
        Instr::BinOp { dst, op, lhs, rhs } => {
            let dst = *dst;
            let op = *op;
            let l = lookup(lhs, env, overdefined);
            let r = lookup(rhs, env, overdefined);
            changed |= substitute_operand(lhs, &l);
            changed |= substitute_operand(rhs, &r);
            let result = binop_lattice(op, &l, &r);
            if let Lattice::Constant(c) = &result {
                changed = true;
                *instr = Instr::Copy { dst, src: Operand::Const(c.clone()) };
            }
            env.insert(dst, result);
        }
        Instr::UnOp { dst, op, operand } => {
            let dst = *dst;
            let op = *op;
            let v = lookup(operand, env, overdefined);
            changed |= substitute_operand(operand, &v);
            let result = unop_lattice(op, &v);
            if let Lattice::Constant(c) = &result {
                changed = true;
                *instr = Instr::Copy { dst, src: Operand::Const(c.clone()) };
            }
            env.insert(dst, result);
        }
        Instr::Cast { dst, type_name, operand } => {
            let dst = *dst;
            let v = lookup(operand, env, overdefined);
            changed |= substitute_operand(operand, &v);
            let result = cast_lattice(type_name, &v);
            if let Lattice::Constant(c) = &result {
                changed = true;
                *instr = Instr::Copy { dst, src: Operand::Const(c.clone()) };
            }
            env.insert(dst, result);
        }
        Instr::Copy { dst, src } => {
            let dst = *dst;
            let v = lookup(src, env, overdefined);
            changed |= substitute_operand(src, &v);
            env.insert(dst, v);
        }
        Instr::LoadField { dst, object, .. } => {
            let dst = *dst;
            let v = lookup(object, env, overdefined);
            changed |= substitute_operand(object, &v);
            env.insert(dst, Lattice::Overdefined);
        }
        Instr::StoreField { object, value, .. } => {
            let vo = lookup(object, env, overdefined);
            changed |= substitute_operand(object, &vo);
            let vv = lookup(value, env, overdefined);
            changed |= substitute_operand(value, &vv);
        }
        Instr::Call { dst, receiver, args, .. } => {
            if let Some(r) = receiver {
                let v = lookup(r, env, overdefined);
                changed |= substitute_operand(r, &v);
            }
            for a in args.iter_mut() {
                let v = lookup(a, env, overdefined);
                changed |= substitute_operand(a, &v);
            }
            if let Some(d) = dst {
                env.insert(*d, Lattice::Overdefined);
            }
        }
        Instr::New { dst, args, .. } => {
            let dst = *dst;
            for a in args.iter_mut() {
                let v = lookup(a, env, overdefined);
                changed |= substitute_operand(a, &v);
            }
            env.insert(dst, Lattice::Overdefined);
        }
        Instr::Phi { dst, incoming } => {
            let dst = *dst;
            let mut acc = Lattice::Unknown;
            let mut any = false;
            for (pred, op) in incoming.iter_mut() {
                if !executable.contains(&(*pred, block_id)) {
                    continue;
                }
                let value = match block_out.get(pred) {
                    Some(pred_env) => lookup(op, pred_env, overdefined),
                    None => Lattice::Unknown,
                };
                changed |= substitute_operand(op, &value);
                acc = meet(&acc, &value);
                any = true;
            }
            env.insert(dst, if any { acc } else { Lattice::Unknown });
        }
        Instr::Branch { .. } | Instr::Return { .. } | Instr::Jump { .. } | Instr::Nop => {}
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::tac::ConstValue;

    #[test]
    fn propagates_single_def_constant_into_later_use() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let x = f.new_temp();
        let y = f.new_temp();
        f.push(
            entry,
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Int(7)),
            },
        );
        f.push(
            entry,
            Instr::BinOp {
                dst: y,
                op: BinOp::Add,
                lhs: Operand::Temp(x),
                rhs: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(entry, Instr::Return { value: Some(Operand::Temp(y)) });
        assert!(Sccp.run(&mut f));
        assert_eq!(
            f.block(entry).instrs[1],
            Instr::Copy {
                dst: y,
                src: Operand::Const(ConstValue::Int(8)),
            }
        );
    }

    #[test]
    fn propagates_constant_through_a_cast() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let x = f.new_temp();
        let y = f.new_temp();
        f.push(
            entry,
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Float(3.9)),
            },
        );
        f.push(
            entry,
            Instr::Cast {
                dst: y,
                type_name: "int".to_string(),
                operand: Operand::Temp(x),
            },
        );
        f.push(entry, Instr::Return { value: Some(Operand::Temp(y)) });
        assert!(Sccp.run(&mut f));
        assert_eq!(
            f.block(entry).instrs[1],
            Instr::Copy {
                dst: y,
                src: Operand::Const(ConstValue::Int(3)),
            }
        );
    }

    #[test]
    fn straight_line_reassignment_propagates_the_final_value() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let x = f.new_temp();
        f.push(
            entry,
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(
            entry,
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Int(2)),
            },
        );
        f.push(entry, Instr::Return { value: Some(Operand::Temp(x)) });
        assert!(Sccp.run(&mut f));
        assert_eq!(f.block(entry).instrs[2], Instr::Return { value: Some(Operand::Const(ConstValue::Int(2))) });
    }

    #[test]
    fn values_merged_from_diverging_constants_do_not_propagate() {
        // Both arms are reachable (the branch condition is a parameter), and
        // each assigns a different constant to `a`; the merge at `join` must
        // land on Overdefined rather than picking either arm's value.
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let cond = f.new_temp();
        f.params.push(cond);
        let then_block = f.new_block();
        let else_block = f.new_block();
        let join = f.new_block();
        let a = f.new_temp();

        f.push(
            entry,
            Instr::Branch {
                cond: Operand::Temp(cond),
                then_block,
                else_block,
            },
        );
        f.push(
            then_block,
            Instr::Copy {
                dst: a,
                src: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(then_block, Instr::Jump { target: join });
        f.push(
            else_block,
            Instr::Copy {
                dst: a,
                src: Operand::Const(ConstValue::Int(2)),
            },
        );
        f.push(else_block, Instr::Jump { target: join });
        f.push(
            join,
            Instr::Phi {
                dst: a,
                incoming: vec![(then_block, Operand::Temp(a)), (else_block, Operand::Temp(a))],
            },
        );
        f.push(join, Instr::Return { value: Some(Operand::Temp(a)) });

        assert!(!Sccp.run(&mut f));
        assert_eq!(f.block(join).instrs.last(), Some(&Instr::Return { value: Some(Operand::Temp(a)) }));
    }

    /// `spec.md §8` scenario 4, restated against this IR's then/else
    /// `Branch` polarity: `if (false) { a = 2; } else { a = 1; } return a;`
    /// must fold to `return 1`, with the `then` arm (which assigns 2)
    /// pruned from the reachable set entirely.
    #[test]
    fn folds_constant_branch_and_prunes_the_untaken_arm() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let then_block = f.new_block();
        let else_block = f.new_block();
        let join = f.new_block();
        let a = f.new_temp();

        f.push(
            entry,
            Instr::Branch {
                cond: Operand::Const(ConstValue::Bool(false)),
                then_block,
                else_block,
            },
        );
        f.push(
            then_block,
            Instr::Copy {
                dst: a,
                src: Operand::Const(ConstValue::Int(2)),
            },
        );
        f.push(then_block, Instr::Jump { target: join });
        f.push(
            else_block,
            Instr::Copy {
                dst: a,
                src: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(else_block, Instr::Jump { target: join });
        f.push(
            join,
            Instr::Phi {
                dst: a,
                incoming: vec![(then_block, Operand::Temp(a)), (else_block, Operand::Temp(a))],
            },
        );
        f.push(join, Instr::Return { value: Some(Operand::Temp(a)) });

        assert!(Sccp.run(&mut f));
        assert_eq!(f.block(entry).instrs[0], Instr::Jump { target: else_block });
        assert!(!f.reachable_blocks().contains(&then_block));
        assert_eq!(f.block(join).instrs.last(), Some(&Instr::Return { value: Some(Operand::Const(ConstValue::Int(1))) }));
    }

    #[test]
    fn overdefined_branch_condition_keeps_both_arms_reachable() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let cond_temp = f.new_temp();
        f.params.push(cond_temp);
        let then_block = f.new_block();
        let else_block = f.new_block();
        f.push(
            entry,
            Instr::Branch {
                cond: Operand::Temp(cond_temp),
                then_block,
                else_block,
            },
        );
        f.push(then_block, Instr::Return { value: None });
        f.push(else_block, Instr::Return { value: None });

        assert!(!Sccp.run(&mut f));
        assert!(matches!(f.block(entry).instrs[0], Instr::Branch { .. }));
    }

    #[test]
    fn iteration_cap_stops_without_panicking() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let x = f.new_temp();
        f.push(
            entry,
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Int(1)),
            },
        );
        f.push(entry, Instr::Return { value: Some(Operand::Temp(x)) });
        // A zero cap means the worklist never processes even the entry
        // block, so nothing is rewritten.
        assert!(!run_with_cap(&mut f, 0));
        assert_eq!(
            f.block(entry).instrs[0],
            Instr::Copy {
                dst: x,
                src: Operand::Const(ConstValue::Int(1)),
            }
        );
    }
}
