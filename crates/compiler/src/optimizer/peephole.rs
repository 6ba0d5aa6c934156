//! Peephole simplifications (`spec.md §4.4` item 6): double-negation
//! elimination, negated-comparison fusion, and narrow-type cast
//! elimination.

use super::Pass;
use crate::ast::{BinOp, UnOp};
use crate::tac::{ConstValue, Instr, Operand, TacFunction, TempId};
use std::collections::HashMap;

pub struct Peephole;

impl Pass for Peephole {
    fn name(&self) -> &'static str {
        "peephole"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let mut changed = eliminate_double_negation(func);
        changed |= fuse_negated_comparisons(func);
        changed |= eliminate_narrow_casts(func);
        changed
    }
}

/// `t = (narrowType)x` drops to `t = x` when every use of `t` is a
/// comparison against an integer constant that's in range for `narrowType`
/// and whose signedness matches it (`spec.md §4.4` item 6). Truncating
/// before such a comparison can never change its outcome, so the narrowing
/// is unobservable and the cast (and whatever representation change the
/// lowerer would otherwise have to perform for it) can be dropped.
fn eliminate_narrow_casts(func: &mut TacFunction) -> bool {
    let mut casts: HashMap<TempId, (String, Operand)> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let Instr::Cast { dst, type_name, operand } = instr {
                if narrow_range(type_name).is_some() {
                    casts.insert(*dst, (type_name.clone(), operand.clone()));
                }
            }
        }
    }
    if casts.is_empty() {
        return false;
    }

    let mut eligible: HashMap<TempId, bool> = casts.keys().map(|&t| (t, true)).collect();
    for block in &func.blocks {
        for instr in &block.instrs {
            for operand in instr.uses() {
                let Operand::Temp(used) = operand else { continue };
                if !casts.contains_key(&used) {
                    continue;
                }
                let qualifies = comparison_against_in_range_const(instr, used, &casts[&used].0);
                if !qualifies {
                    eligible.insert(used, false);
                }
            }
        }
    }

    let mut changed = false;
    for block in &mut func.blocks {
        for instr in &mut block.instrs {
            if let Instr::Cast { dst, .. } = instr {
                let dst = *dst;
                if eligible.get(&dst).copied().unwrap_or(false) {
                    let (_, operand) = casts[&dst].clone();
                    *instr = Instr::Copy { dst, src: operand };
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Whether `instr` is an equality/ordering comparison with `temp` on one
/// side and an integer constant in range (and signedness-compatible) for
/// `type_name` on the other.
fn comparison_against_in_range_const(instr: &Instr, temp: TempId, type_name: &str) -> bool {
    let Instr::BinOp { op, lhs, rhs, .. } = instr else {
        return false;
    };
    if !matches!(op, BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge) {
        return false;
    }
    let other = match (lhs, rhs) {
        (Operand::Temp(t), other) if *t == temp => other,
        (other, Operand::Temp(t)) if *t == temp => other,
        _ => return false,
    };
    matches!(other, Operand::Const(ConstValue::Int(n)) if in_range(type_name, *n))
}

/// Inclusive `(min, max, signed)` range for a narrowing target type, or
/// `None` for types this pass doesn't reason about (`float`/`double`/
/// `bool`/`string`/user types).
fn narrow_range(type_name: &str) -> Option<(i64, i64, bool)> {
    match type_name {
        "int" => Some((i32::MIN as i64, i32::MAX as i64, true)),
        "long" => Some((i64::MIN, i64::MAX, true)),
        "char" => Some((0, u16::MAX as i64, false)),
        _ => None,
    }
}

fn in_range(type_name: &str, n: i64) -> bool {
    match narrow_range(type_name) {
        Some((lo, hi, signed)) => (signed || n >= 0) && n >= lo && n <= hi,
        None => false,
    }
}

/// `t1 = !t0; t2 = !t1` (both `UnOp::Not`), with `t1` used exactly once
/// (by the second negation), collapses to `t2 = t0`.
fn eliminate_double_negation(func: &mut TacFunction) -> bool {
    let use_counts = use_counts(func);
    let mut negations: HashMap<TempId, TempId> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let Instr::UnOp {
                dst,
                op: UnOp::Not,
                operand: Operand::Temp(src),
            } = instr
            {
                negations.insert(*dst, *src);
            }
        }
    }

    let mut changed = false;
    for block in &mut func.blocks {
        for instr in &mut block.instrs {
            if let Instr::UnOp {
                dst,
                op: UnOp::Not,
                operand: Operand::Temp(inner),
            } = instr
            {
                if use_counts.get(inner).copied().unwrap_or(0) == 1 {
                    if let Some(&original) = negations.get(inner) {
                        *instr = Instr::Copy {
                            dst: *dst,
                            src: Operand::Temp(original),
                        };
                        changed = true;
                    }
                }
            }
        }
    }
    changed
}

/// `t0 = a < b; t1 = !t0` fuses to `t1 = a >= b` when `t0` is used exactly
/// once (by the negation). Covers every comparison operator's negation.
fn fuse_negated_comparisons(func: &mut TacFunction) -> bool {
    let use_counts = use_counts(func);
    let mut comparisons: HashMap<TempId, (BinOp, Operand, Operand)> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let Instr::BinOp { dst, op, lhs, rhs } = instr {
                if negated(*op).is_some() {
                    comparisons.insert(*dst, (*op, lhs.clone(), rhs.clone()));
                }
            }
        }
    }

    let mut changed = false;
    for block in &mut func.blocks {
        for instr in &mut block.instrs {
            if let Instr::UnOp {
                dst,
                op: UnOp::Not,
                operand: Operand::Temp(inner),
            } = instr
            {
                if use_counts.get(inner).copied().unwrap_or(0) == 1 {
                    if let Some((op, lhs, rhs)) = comparisons.get(inner) {
                        *instr = Instr::BinOp {
                            dst: *dst,
                            op: negated(*op).unwrap(),
                            lhs: lhs.clone(),
                            rhs: rhs.clone(),
                        };
                        changed = true;
                    }
                }
            }
        }
    }
    changed
}

fn negated(op: BinOp) -> Option<BinOp> {
    match op {
        BinOp::Lt => Some(BinOp::Ge),
        BinOp::Gt => Some(BinOp::Le),
        BinOp::Le => Some(BinOp::Gt),
        BinOp::Ge => Some(BinOp::Lt),
        BinOp::Eq => Some(BinOp::Neq),
        BinOp::Neq => Some(BinOp::Eq),
        _ => None,
    }
}

fn use_counts(func: &TacFunction) -> HashMap<TempId, u32> {
    let mut counts = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            for operand in instr.uses() {
                if let Operand::Temp(t) = operand {
                    *counts.entry(t).or_insert(0) += 1;
                }
            }
        }
    }
    counts
}
