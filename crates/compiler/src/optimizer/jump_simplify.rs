//! Jump simplification (`spec.md §4.4` item 11). Blocks are this IR's
//! labels (there is no separate `Label` instruction), so "merge consecutive
//! label definitions" and "thread a jump onto another unconditional jump"
//! both reduce to one operation: a block whose entire body is a single
//! unconditional `Jump` is an alias for its target, and every other
//! terminator that names it gets retargeted directly, following a chain of
//! aliases (cycles are left alone — an infinite self-loop is a legitimate
//! program, not a simplification opportunity). Fully merging a linear
//! predecessor/successor pair into one physical block is left to
//! [`super::block_layout`], which already owns block ordering; this pass
//! only rewrites jump targets.
//!
//! Idempotent by construction: a second run finds no alias chains left to
//! shorten and no terminators left pointing at one.

use super::Pass;
use crate::tac::{BlockId, Instr, TacFunction};
use std::collections::{HashMap, HashSet};

pub struct JumpSimplify;

impl Pass for JumpSimplify {
    fn name(&self) -> &'static str {
        "jump-simplify"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let aliases = find_aliases(func);
        if aliases.is_empty() {
            return false;
        }
        let mut changed = false;
        for block in &mut func.blocks {
            if let Some(instr) = block.instrs.last_mut() {
                changed |= retarget(instr, &aliases);
            }
        }
        changed
    }
}

/// A block consisting of exactly one instruction, an unconditional `Jump`,
/// is an alias for its (possibly further-aliased) target. Resolves each
/// alias to its final, non-alias target up front, so retargeting a
/// terminator is a single lookup rather than a chain walk per site.
fn find_aliases(func: &TacFunction) -> HashMap<BlockId, BlockId> {
    let mut direct = HashMap::new();
    for block in &func.blocks {
        if let [Instr::Jump { target }] = block.instrs.as_slice() {
            if *target != block.id {
                direct.insert(block.id, *target);
            }
        }
    }

    let mut resolved = HashMap::new();
    for &start in direct.keys() {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(&next) = direct.get(&current) {
            if !seen.insert(current) {
                // Cycle of pure-alias blocks; leave it untouched.
                current = start;
                break;
            }
            current = next;
        }
        if current != start {
            resolved.insert(start, current);
        }
    }
    resolved
}

fn retarget(instr: &mut Instr, aliases: &HashMap<BlockId, BlockId>) -> bool {
    let mut changed = false;
    match instr {
        Instr::Jump { target } => {
            if let Some(&resolved) = aliases.get(target) {
                *target = resolved;
                changed = true;
            }
        }
        Instr::Branch { then_block, else_block, .. } => {
            if let Some(&resolved) = aliases.get(then_block) {
                *then_block = resolved;
                changed = true;
            }
            if let Some(&resolved) = aliases.get(else_block) {
                *else_block = resolved;
                changed = true;
            }
        }
        _ => {}
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::Operand;

    #[test]
    fn threads_jump_through_alias_block() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let alias = f.new_block();
        let real_target = f.new_block();
        f.push(entry, Instr::Jump { target: alias });
        f.push(alias, Instr::Jump { target: real_target });
        f.push(real_target, Instr::Return { value: None });

        assert!(JumpSimplify.run(&mut f));
        assert_eq!(f.block(entry).instrs[0], Instr::Jump { target: real_target });
    }

    #[test]
    fn retargets_both_branch_arms() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let then_alias = f.new_block();
        let else_alias = f.new_block();
        let join = f.new_block();
        f.push(
            entry,
            Instr::Branch {
                cond: Operand::Temp(0),
                then_block: then_alias,
                else_block: else_alias,
            },
        );
        f.push(then_alias, Instr::Jump { target: join });
        f.push(else_alias, Instr::Jump { target: join });
        f.push(join, Instr::Return { value: None });

        assert!(JumpSimplify.run(&mut f));
        assert_eq!(
            f.block(entry).instrs[0],
            Instr::Branch {
                cond: Operand::Temp(0),
                then_block: join,
                else_block: join,
            }
        );
    }

    #[test]
    fn idempotent_on_already_simplified_function() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        f.push(entry, Instr::Return { value: None });
        assert!(!JumpSimplify.run(&mut f));
    }

    #[test]
    fn leaves_self_looping_alias_untouched() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let loop_block = f.new_block();
        f.push(entry, Instr::Jump { target: loop_block });
        f.push(loop_block, Instr::Jump { target: loop_block });
        assert!(!JumpSimplify.run(&mut f));
    }
}
