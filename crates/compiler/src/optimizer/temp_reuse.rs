//! Temporary reuse by liveness-based graph coloring (`spec.md §4.4` item 8):
//! build the interference graph over a function's temporaries (two temps
//! interfere when both are live at the same program point) and assign each
//! a color — a reused temp id — such that interfering temps never share
//! one. Parameters keep their own id as a pinned color so callers and the
//! lowerer's argument-binding code don't need to special-case a renumbered
//! entry point.
//!
//! Two simplifications relative to the full algorithm, both conservative:
//! operands here carry no VM type tag, so colors aren't partitioned by type
//! the way the full pass does (a color can in principle hold values of
//! different shapes across iterations) — acceptable because every consumer
//! of a temp reads it immediately after whichever producer last wrote it,
//! never across an unrelated write. And `Phi` liveness is attributed to the
//! whole block rather than the specific predecessor edge, which is
//! standard for a block-granular dataflow pass and only ever overstates
//! liveness (never causes two interfering temps to share a color).

use super::Pass;
use crate::tac::{BlockId, Instr, Operand, TacFunction, TempId};
use std::collections::{HashMap, HashSet};

pub struct TempReuse;

impl Pass for TempReuse {
    fn name(&self) -> &'static str {
        "temp-reuse"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let live_out = block_live_out(func);
        let interference = interference_graph(func, &live_out);
        let colors = color(func, &interference);

        if colors.iter().all(|(&t, &c)| t == c) {
            return false;
        }

        for block in &mut func.blocks {
            for instr in &mut block.instrs {
                remap(instr, &colors);
            }
        }
        true
    }
}

fn def_use(instr: &Instr) -> (Option<TempId>, Vec<TempId>) {
    let uses = instr
        .uses()
        .into_iter()
        .filter_map(|op| op.as_temp())
        .collect();
    (instr.dst(), uses)
}

/// Block-level live-out sets via the standard backward fixed point:
/// `out[b] = union(in[succ] for succ in successors(b))`,
/// `in[b] = use[b] | (out[b] - def[b])`.
fn block_live_out(func: &TacFunction) -> HashMap<BlockId, HashSet<TempId>> {
    let reachable = func.reachable_blocks();
    let mut block_use = HashMap::new();
    let mut block_def = HashMap::new();
    for &id in &reachable {
        let mut used = HashSet::new();
        let mut defined = HashSet::new();
        for instr in &func.block(id).instrs {
            let (dst, uses) = def_use(instr);
            for u in uses {
                if !defined.contains(&u) {
                    used.insert(u);
                }
            }
            if let Some(d) = dst {
                defined.insert(d);
            }
        }
        block_use.insert(id, used);
        block_def.insert(id, defined);
    }

    let mut live_in: HashMap<BlockId, HashSet<TempId>> =
        reachable.iter().map(|&id| (id, HashSet::new())).collect();
    let mut live_out: HashMap<BlockId, HashSet<TempId>> =
        reachable.iter().map(|&id| (id, HashSet::new())).collect();

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &reachable {
            let mut out = HashSet::new();
            for succ in func.block(id).successors() {
                out.extend(live_in.get(&succ).cloned().unwrap_or_default());
            }
            let mut inset = block_use[&id].clone();
            inset.extend(out.difference(&block_def[&id]).copied());

            if out != live_out[&id] {
                live_out.insert(id, out);
                changed = true;
            }
            if inset != live_in[&id] {
                live_in.insert(id, inset);
                changed = true;
            }
        }
    }
    live_out
}

fn interference_graph(
    func: &TacFunction,
    live_out: &HashMap<BlockId, HashSet<TempId>>,
) -> HashMap<TempId, HashSet<TempId>> {
    let mut graph: HashMap<TempId, HashSet<TempId>> = HashMap::new();
    let mut touch = |graph: &mut HashMap<TempId, HashSet<TempId>>, a: TempId, b: TempId| {
        if a != b {
            graph.entry(a).or_default().insert(b);
            graph.entry(b).or_default().insert(a);
        }
    };

    for &block_id in &func.reachable_blocks() {
        let mut live = live_out.get(&block_id).cloned().unwrap_or_default();
        for instr in func.block(block_id).instrs.iter().rev() {
            let (dst, uses) = def_use(instr);
            if let Some(d) = dst {
                graph.entry(d).or_default();
                for &other in &live {
                    touch(&mut graph, d, other);
                }
                live.remove(&d);
            }
            for u in uses {
                graph.entry(u).or_default();
                live.insert(u);
            }
        }
    }
    graph
}

fn color(func: &TacFunction, graph: &HashMap<TempId, HashSet<TempId>>) -> HashMap<TempId, TempId> {
    let mut colors: HashMap<TempId, TempId> = HashMap::new();
    for &p in &func.params {
        colors.insert(p, p);
    }

    let mut temps: Vec<TempId> = graph.keys().copied().collect();
    temps.sort_unstable();

    for t in temps {
        if colors.contains_key(&t) {
            continue;
        }
        let neighbors = &graph[&t];
        let used: HashSet<TempId> = neighbors.iter().filter_map(|n| colors.get(n).copied()).collect();
        let mut candidate = 0;
        while used.contains(&candidate) {
            candidate += 1;
        }
        colors.insert(t, candidate);
    }
    colors
}

fn remap(instr: &mut Instr, colors: &HashMap<TempId, TempId>) {
    let m = |t: TempId| colors.get(&t).copied().unwrap_or(t);
    let map_operand = |op: &mut Operand| {
        if let Operand::Temp(t) = op {
            *t = m(*t);
        }
    };

    match instr {
        Instr::BinOp { dst, lhs, rhs, .. } => {
            *dst = m(*dst);
            map_operand(lhs);
            map_operand(rhs);
        }
        Instr::UnOp { dst, operand, .. } => {
            *dst = m(*dst);
            map_operand(operand);
        }
        Instr::Cast { dst, operand, .. } => {
            *dst = m(*dst);
            map_operand(operand);
        }
        Instr::Copy { dst, src } => {
            *dst = m(*dst);
            map_operand(src);
        }
        Instr::LoadField { dst, object, .. } => {
            *dst = m(*dst);
            map_operand(object);
        }
        Instr::StoreField { object, value, .. } => {
            map_operand(object);
            map_operand(value);
        }
        Instr::Call { dst, receiver, args, .. } => {
            if let Some(d) = dst {
                *d = m(*d);
            }
            if let Some(r) = receiver {
                map_operand(r);
            }
            for a in args {
                map_operand(a);
            }
        }
        Instr::New { dst, args, .. } => {
            *dst = m(*dst);
            for a in args {
                map_operand(a);
            }
        }
        Instr::Phi { dst, incoming } => {
            *dst = m(*dst);
            for (_, op) in incoming {
                map_operand(op);
            }
        }
        Instr::Branch { cond, .. } => map_operand(cond),
        Instr::Return { value } => {
            if let Some(v) = value {
                map_operand(v);
            }
        }
        Instr::Jump { .. } | Instr::Nop => {}
    }
}
