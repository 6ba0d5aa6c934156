//! Three-address code: the SSA-amenable intermediate form between the AST
//! and the VM lowerer (`spec.md §3`). One [`TacFunction`] per source method
//! (or constructor, or synthesized property accessor); a function is a list
//! of [`BasicBlock`]s ending in a terminator instruction, with temporaries
//! numbered densely from zero.

use std::collections::HashMap;

pub type BlockId = u32;
pub type TempId = u32;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Const(ConstValue),
    Temp(TempId),
}

impl Operand {
    pub fn as_const(&self) -> Option<&ConstValue> {
        match self {
            Operand::Const(c) => Some(c),
            Operand::Temp(_) => None,
        }
    }

    pub fn as_temp(&self) -> Option<TempId> {
        match self {
            Operand::Temp(t) => Some(*t),
            Operand::Const(_) => None,
        }
    }
}

pub use crate::ast::{BinOp, UnOp};

/// One TAC instruction. Every variant that defines a value names its
/// destination temp as `dst`; `uses()`/`defs()` let passes reason about
/// instructions generically without re-deriving this per pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    BinOp {
        dst: TempId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    UnOp {
        dst: TempId,
        op: UnOp,
        operand: Operand,
    },
    /// A source-level `(Type)expr` cast. Carries the target source type
    /// name so later passes can reason about narrowing (`spec.md §4.4`
    /// item 6's narrow-type cast elimination) and so constant folding can
    /// apply the right truncation/conversion.
    Cast {
        dst: TempId,
        type_name: String,
        operand: Operand,
    },
    Copy {
        dst: TempId,
        src: Operand,
    },
    LoadField {
        dst: TempId,
        object: Operand,
        field: String,
    },
    StoreField {
        object: Operand,
        field: String,
        value: Operand,
    },
    /// A resolved extern or user-method call. `signature` is the canonical
    /// VM signature string for externs, or a user method key
    /// (`"Class::method"`) for calls the lowerer resolves to a direct
    /// `JUMP` at the callee's label.
    Call {
        dst: Option<TempId>,
        signature: String,
        receiver: Option<Operand>,
        args: Vec<Operand>,
        is_extern: bool,
        /// Advisory hint set by [`super::optimizer::tail_call`] when this
        /// call's result flows straight into the following `Return`. Never
        /// changes the observable effect of that `Return` (`spec.md §3`).
        is_tail_call: bool,
    },
    New {
        dst: TempId,
        signature: String,
        args: Vec<Operand>,
    },
    /// SSA join: `dst` takes the value of whichever incoming edge was
    /// actually taken. Inserted by the AST-to-TAC converter at blocks with
    /// more than one predecessor that make use of a variable assigned
    /// differently on different paths.
    Phi {
        dst: TempId,
        incoming: Vec<(BlockId, Operand)>,
    },
    Jump {
        target: BlockId,
    },
    Branch {
        cond: Operand,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return {
        value: Option<Operand>,
    },
    /// Emitted by DCE in place of a removed instruction's slot when removing
    /// it outright would perturb indices a later pass still refers to; the
    /// block-layout pass compacts these away at the end of the pipeline.
    Nop,
}

impl Instr {
    pub fn dst(&self) -> Option<TempId> {
        match self {
            Instr::BinOp { dst, .. }
            | Instr::UnOp { dst, .. }
            | Instr::Cast { dst, .. }
            | Instr::Copy { dst, .. }
            | Instr::LoadField { dst, .. }
            | Instr::New { dst, .. }
            | Instr::Phi { dst, .. } => Some(*dst),
            Instr::Call { dst, .. } => *dst,
            _ => None,
        }
    }

    pub fn uses(&self) -> Vec<Operand> {
        match self {
            Instr::BinOp { lhs, rhs, .. } => vec![lhs.clone(), rhs.clone()],
            Instr::UnOp { operand, .. } => vec![operand.clone()],
            Instr::Cast { operand, .. } => vec![operand.clone()],
            Instr::Copy { src, .. } => vec![src.clone()],
            Instr::LoadField { object, .. } => vec![object.clone()],
            Instr::StoreField { object, value, .. } => vec![object.clone(), value.clone()],
            Instr::Call { receiver, args, .. } => {
                let mut v = receiver.iter().cloned().collect::<Vec<_>>();
                v.extend(args.iter().cloned());
                v
            }
            Instr::New { args, .. } => args.clone(),
            Instr::Phi { incoming, .. } => incoming.iter().map(|(_, op)| op.clone()).collect(),
            Instr::Branch { cond, .. } => vec![cond.clone()],
            Instr::Return { value } => value.iter().cloned().collect(),
            Instr::Jump { .. } | Instr::Nop => vec![],
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instr::Jump { .. } | Instr::Branch { .. } | Instr::Return { .. })
    }

    /// Whether evaluating this instruction can have a visible side effect
    /// beyond defining `dst` (an extern call, a field store, a `new`).
    /// Passes that reorder or delete instructions (DCE, sinking, LICM) must
    /// not touch these without the explicit purity checks those passes
    /// perform (`spec.md §4.4`'s "pure extern" pass note).
    pub fn has_side_effect(&self) -> bool {
        matches!(
            self,
            Instr::StoreField { .. } | Instr::Call { .. } | Instr::New { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instrs: Vec<Instr>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        BasicBlock { id, instrs: Vec::new() }
    }

    pub fn terminator(&self) -> Option<&Instr> {
        self.instrs.last().filter(|i| i.is_terminator())
    }

    pub fn successors(&self) -> Vec<BlockId> {
        match self.terminator() {
            Some(Instr::Jump { target }) => vec![*target],
            Some(Instr::Branch {
                then_block,
                else_block,
                ..
            }) => vec![*then_block, *else_block],
            _ => vec![],
        }
    }
}

/// One method/constructor/accessor lowered to TAC.
#[derive(Debug, Clone)]
pub struct TacFunction {
    /// `"ClassName::methodName"`, used as the call-graph/key identity.
    pub name: String,
    pub params: Vec<TempId>,
    pub entry: BlockId,
    pub blocks: Vec<BasicBlock>,
    next_temp: TempId,
    next_block: BlockId,
}

impl TacFunction {
    pub fn new(name: impl Into<String>) -> Self {
        let mut f = TacFunction {
            name: name.into(),
            params: Vec::new(),
            entry: 0,
            blocks: Vec::new(),
            next_temp: 0,
            next_block: 0,
        };
        let entry_id = f.new_block();
        f.entry = entry_id;
        f
    }

    pub fn new_temp(&mut self) -> TempId {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// The number of distinct temporaries allocated; the single source of
    /// truth the temp-reuse coloring pass and the lowerer both rely on
    /// instead of re-scanning for the max `dst` seen.
    pub fn temp_count(&self) -> TempId {
        self.next_temp
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = self.next_block;
        self.next_block += 1;
        self.blocks.push(BasicBlock::new(id));
        id
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.iter_mut().find(|b| b.id == id).expect("unknown block id")
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks.iter().find(|b| b.id == id).expect("unknown block id")
    }

    pub fn push(&mut self, block: BlockId, instr: Instr) {
        self.block_mut(block).instrs.push(instr);
    }

    /// Reachable blocks from `entry`, in BFS order, for passes that need a
    /// deterministic traversal (DCE, block layout).
    pub fn reachable_blocks(&self) -> Vec<BlockId> {
        let mut seen = vec![self.entry];
        let mut i = 0;
        while i < seen.len() {
            let current = seen[i];
            i += 1;
            for succ in self.block(current).successors() {
                if !seen.contains(&succ) {
                    seen.push(succ);
                }
            }
        }
        seen
    }

    /// Predecessor map over reachable blocks, used by SSA-sensitive passes
    /// (phi simplification, GVN, PRE) to reason about join points.
    pub fn predecessors(&self) -> HashMap<BlockId, Vec<BlockId>> {
        let mut preds: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for &block_id in &self.reachable_blocks() {
            for succ in self.block(block_id).successors() {
                preds.entry(succ).or_default().push(block_id);
            }
        }
        preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_has_single_entry_block() {
        let f = TacFunction::new("C::m");
        assert_eq!(f.entry, 0);
        assert_eq!(f.blocks.len(), 1);
    }

    #[test]
    fn reachable_blocks_follows_branch_successors() {
        let mut f = TacFunction::new("C::m");
        let then_b = f.new_block();
        let else_b = f.new_block();
        let join = f.new_block();
        f.push(
            f.entry,
            Instr::Branch {
                cond: Operand::Const(ConstValue::Bool(true)),
                then_block: then_b,
                else_block: else_b,
            },
        );
        f.push(then_b, Instr::Jump { target: join });
        f.push(else_b, Instr::Jump { target: join });
        f.push(join, Instr::Return { value: None });

        let reachable = f.reachable_blocks();
        assert_eq!(reachable.len(), 4);
        let preds = f.predecessors();
        assert_eq!(preds.get(&join).map(|p| p.len()), Some(2));
    }

    #[test]
    fn side_effect_classification() {
        assert!(Instr::StoreField {
            object: Operand::Temp(0),
            field: "x".to_string(),
            value: Operand::Const(ConstValue::Int(1)),
        }
        .has_side_effect());
        assert!(!Instr::Copy {
            dst: 1,
            src: Operand::Temp(0),
        }
        .has_side_effect());
    }
}
