//! The TAC optimizer: a fixed-point pipeline of small, independently
//! testable passes (`spec.md §4.4`). Passes run in a fixed order each
//! iteration; the pipeline repeats until a full pass over the list makes no
//! further change, or an iteration cap is hit (large functions should
//! converge in a handful of rounds — a function still changing past the cap
//! is a bug in a pass, not a sign to raise the cap).

mod block_layout;
mod constant_fold;
mod cow;
mod dce;
mod gvn;
mod jump_simplify;
mod licm;
mod loops;
mod peephole;
mod pre;
mod sccp;
mod sinking;
mod tail_call;
mod tail_merge;
mod temp_reuse;

use crate::tac::TacFunction;

/// Maximum number of full passes over the pipeline before giving up on
/// convergence; chosen generously relative to the optimizer's own
/// observation that real functions converge within a handful of rounds.
const MAX_ITERATIONS: usize = 32;

pub trait Pass {
    fn name(&self) -> &'static str;
    /// Returns whether the function was modified.
    fn run(&self, func: &mut TacFunction) -> bool;
}

fn passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(constant_fold::ConstantFold),
        Box::new(sccp::Sccp),
        Box::new(gvn::Gvn),
        Box::new(pre::Pre),
        Box::new(licm::Licm),
        Box::new(loops::StrengthReduction),
        Box::new(loops::LoopUnroll),
        Box::new(peephole::Peephole),
        Box::new(temp_reuse::TempReuse),
        Box::new(cow::CowInsertion),
        Box::new(dce::Dce),
        Box::new(jump_simplify::JumpSimplify),
        Box::new(tail_call::TailCallMark),
        Box::new(tail_merge::TailMerge),
        Box::new(block_layout::BlockLayout),
        Box::new(sinking::CodeSinking),
    ]
}

/// Run the full pass pipeline to a fixed point. Returns the names of passes
/// that fired at least once, in first-fired order, for diagnostic/tracing
/// purposes (the orchestrator logs this at `debug` level).
pub fn optimize(func: &mut TacFunction) -> Vec<&'static str> {
    let pipeline = passes();
    let mut fired = Vec::new();
    for _ in 0..MAX_ITERATIONS {
        let mut changed_this_round = false;
        for pass in &pipeline {
            if pass.run(func) {
                changed_this_round = true;
                if !fired.contains(&pass.name()) {
                    fired.push(pass.name());
                }
            }
        }
        if !changed_this_round {
            break;
        }
    }
    fired
}
