//! Copy-on-write insertion for mutable reference-like operands
//! (`spec.md §4.4` item 9): `DataList`/`DataDictionary` values are reference
//! types at the VM layer, so a mutating call through a temp that's also read
//! elsewhere would otherwise let that mutation leak across every alias.
//! Before such a call, materialize a private copy and mutate that instead.
//!
//! Recognizing "mutable reference-like" is signature-based: the receiver's
//! declared type isn't tracked on `Operand` itself, so this pass goes by the
//! extern signature's class prefix and method name, mirroring how
//! [`crate::types`] already names these two types.

use super::Pass;
use crate::tac::{Instr, Operand, TacFunction, TempId};
use std::collections::HashMap;

pub struct CowInsertion;

const REFERENCE_TYPES: &[&str] = &["DataList", "DataDictionary"];
const MUTATORS: &[&str] = &["__Add", "__Set", "__Remove", "__Clear", "__Insert"];

impl Pass for CowInsertion {
    fn name(&self) -> &'static str {
        "cow-insertion"
    }

    fn run(&self, func: &mut TacFunction) -> bool {
        let uses = use_counts(func);
        let mut changed = false;

        for block_id in func.reachable_blocks() {
            let mut i = 0;
            loop {
                let len = func.block(block_id).instrs.len();
                if i >= len {
                    break;
                }
                let site = match &func.block(block_id).instrs[i] {
                    Instr::Call {
                        receiver: Some(Operand::Temp(recv)),
                        signature,
                        is_extern: true,
                        ..
                    } if is_mutator(signature) && uses.get(recv).copied().unwrap_or(0) > 1 => {
                        Some(*recv)
                    }
                    _ => None,
                };

                if let Some(recv) = site {
                    let clone = func.new_temp();
                    func.block_mut(block_id).instrs.insert(
                        i,
                        Instr::Call {
                            dst: Some(clone),
                            signature: "__cow_clone".to_string(),
                            receiver: Some(Operand::Temp(recv)),
                            args: vec![],
                            is_extern: true,
                            is_tail_call: false,
                        },
                    );
                    if let Instr::Call { receiver, .. } = &mut func.block_mut(block_id).instrs[i + 1] {
                        *receiver = Some(Operand::Temp(clone));
                    }
                    changed = true;
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
        changed
    }
}

fn is_mutator(signature: &str) -> bool {
    REFERENCE_TYPES.iter().any(|ty| signature.contains(ty))
        && MUTATORS.iter().any(|m| signature.contains(m))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn mutating_call(recv: TempId) -> Instr {
        Instr::Call {
            dst: None,
            signature: "VRCSDK3DataDataList.__Add__SystemObject__SystemVoid".to_string(),
            receiver: Some(Operand::Temp(recv)),
            args: vec![Operand::Const(crate::tac::ConstValue::Int(1))],
            is_extern: true,
            is_tail_call: false,
        }
    }

    #[test]
    fn clones_before_mutating_an_aliased_list() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let list = f.new_temp();
        let other_dst = f.new_temp();
        f.push(
            entry,
            Instr::Call {
                dst: Some(other_dst),
                signature: "VRCSDK3DataDataList.__GetCount__SystemInt32".to_string(),
                receiver: Some(Operand::Temp(list)),
                args: vec![],
                is_extern: true,
                is_tail_call: false,
            },
        );
        f.push(entry, mutating_call(list));
        f.push(entry, Instr::Return { value: None });

        assert!(CowInsertion.run(&mut f));
        assert_eq!(f.block(entry).instrs.len(), 4);
        assert!(matches!(
            &f.block(entry).instrs[1],
            Instr::Call { signature, .. } if signature == "__cow_clone"
        ));
        match &f.block(entry).instrs[2] {
            Instr::Call { receiver: Some(Operand::Temp(r)), .. } => assert_ne!(*r, list),
            other => panic!("expected mutating call, got {other:?}"),
        }
    }

    #[test]
    fn does_not_clone_an_unaliased_list() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let list = f.new_temp();
        f.push(entry, mutating_call(list));
        f.push(entry, Instr::Return { value: None });
        assert!(!CowInsertion.run(&mut f));
    }

    #[test]
    fn leaves_non_mutating_calls_alone() {
        let mut f = TacFunction::new("C::m");
        let entry = f.entry;
        let list = f.new_temp();
        let dst = f.new_temp();
        f.push(
            entry,
            Instr::Call {
                dst: Some(dst),
                signature: "VRCSDK3DataDataList.__GetCount__SystemInt32".to_string(),
                receiver: Some(Operand::Temp(list)),
                args: vec![],
                is_extern: true,
                is_tail_call: false,
            },
        );
        f.push(
            entry,
            Instr::Call {
                dst: None,
                signature: "VRCSDK3DataDataList.__GetCount__SystemInt32".to_string(),
                receiver: Some(Operand::Temp(list)),
                args: vec![],
                is_extern: true,
                is_tail_call: false,
            },
        );
        f.push(entry, Instr::Return { value: None });
        assert!(!CowInsertion.run(&mut f));
    }
}
