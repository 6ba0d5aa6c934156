//! The VM's typed data section and instruction set (`spec.md §4.5` / `§6`):
//! the output of the TAC lowerer, before the assembler renders it to text.

use crate::tac::ConstValue;
use uasmc_core::VmType;

/// A PUSH/JUMP_INDIRECT operand: a heap address, optionally rendered by the
/// assembler under its symbolic data-entry name when one is known
/// (`spec.md §6`: `PUSH, <address-or-symbol>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapAddress(pub u64);

/// One entry in the `.data_start`/`.data_end` section: a typed, addressed
/// heap slot, with an optional literal initial value and the export/sync
/// flags the assembler prints alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub name: String,
    pub address: HeapAddress,
    pub vm_type: VmType,
    pub initial_value: Option<ConstValue>,
    /// Set for top-level consts and public instance properties
    /// (`spec.md §4.3`: "Expose every top-level const as a Variable with
    /// `isLocal=true, isExported=true`").
    pub is_exported: bool,
    /// A sync mode tag (`None`, `Linear`, `Smooth`), printed after the
    /// value when present. Only ever set on exported instance properties;
    /// this lowerer never infers one on its own, but an embedder can
    /// request one through a future `ExternOverride`-shaped hook.
    pub sync_mode: Option<String>,
    /// Which originating class introduced this entry, for the
    /// orchestrator's per-class heap usage breakdown (`spec.md §4.6`).
    pub owning_class: String,
}

/// A VM instruction (`spec.md §6`). `PUSH` carries an operand; `POP` and
/// `COPY` don't (four-byte instructions per `spec.md §4.5`); everything
/// else is eight bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum VmInstr {
    Push(HeapAddress),
    Pop,
    Copy,
    /// `EXTERN, "<signature>"` for a host call, referencing the resolved
    /// ESR signature string.
    Extern(String),
    /// `JUMP[, <label>]`: an unconditional jump, or (label-less) a
    /// fallthrough marker the block-layout pass already resolved away.
    Jump(Option<String>),
    JumpIfFalse(String),
    JumpIndirect(HeapAddress),
    Label(String),
}

impl VmInstr {
    /// Encoded instruction width in bytes, per `spec.md §4.5`.
    pub fn byte_size(&self) -> u32 {
        match self {
            VmInstr::Pop | VmInstr::Copy => 4,
            VmInstr::Label(_) => 0,
            _ => 8,
        }
    }
}

/// One lowered entry point's worth of data and code, plus the bookkeeping
/// the orchestrator needs for budget enforcement.
#[derive(Debug, Clone, Default)]
pub struct VmUnit {
    pub data: Vec<DataEntry>,
    pub code: Vec<VmInstr>,
    /// Externs referenced, in first-use order, deduplicated — the
    /// assembler's per-type extern declaration block.
    pub externs_used: Vec<String>,
}

impl VmUnit {
    pub fn new() -> Self {
        VmUnit::default()
    }

    /// `heapUsage = max(address) + 1` for a non-empty data section, `0`
    /// when empty (`spec.md §8`).
    pub fn heap_usage(&self) -> u64 {
        self.data.iter().map(|e| e.address.0).max().map_or(0, |m| m + 1)
    }

    /// Per-class heap entry counts, in first-introduced order, for the
    /// orchestrator's budget breakdown (`spec.md §4.6`).
    pub fn usage_by_class(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for entry in &self.data {
            let count = counts.entry(entry.owning_class.clone()).or_insert_with(|| {
                order.push(entry.owning_class.clone());
                0
            });
            *count += 1;
        }
        order.into_iter().map(|name| (counts[&name], name)).map(|(c, n)| (n, c)).collect()
    }
}
