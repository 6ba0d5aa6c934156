//! TAC → VM lowering (`spec.md §4.5`): walks every lowered function
//! left-to-right, assigns heap addresses to every distinct variable,
//! temporary and constant in first-use order, and resolves every operator,
//! method call, property access, constructor call and array access to a
//! VM `EXTERN` through the [`crate::esr::ExternRegistry`].

use crate::ast::{Access, BinOp, ClassDecl, UnOp};
use crate::ast_to_tac::ConvertedProgram;
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::esr::ExternRegistry;
use crate::registry::ClassRegistry;
use crate::tac::{ConstValue, Instr, Operand, TacFunction, TempId};
use crate::types::{source_to_vm_type, source_to_host};
use crate::vm::{DataEntry, HeapAddress, VmInstr, VmUnit};
use std::collections::HashMap;
use uasmc_core::{TypeId, VmType};

/// Which user class a `TacFunction` belongs to, derived from its
/// `"ClassName::member"` name (`spec.md §4.3`'s naming convention).
fn owning_class(function_name: &str) -> &str {
    function_name.split("::").next().unwrap_or(function_name)
}

/// Deduplicating first-use heap allocator. Distinct slot keys get distinct
/// addresses in the order they're first requested, matching `spec.md §5`'s
/// "heap addresses are assigned in first-use order at lowering".
#[derive(Debug, Default)]
struct HeapAllocator {
    next: u64,
    addresses: HashMap<String, HeapAddress>,
    order: Vec<String>,
}

impl HeapAllocator {
    fn address_for(&mut self, key: String) -> (HeapAddress, bool) {
        if let Some(addr) = self.addresses.get(&key) {
            return (*addr, false);
        }
        let addr = HeapAddress(self.next);
        self.next += 1;
        self.addresses.insert(key.clone(), addr);
        self.order.push(key);
        (addr, true)
    }
}

fn const_key(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(n) => format!("__const_int_{n}"),
        ConstValue::Float(n) => format!("__const_float_{}", n.to_bits()),
        ConstValue::Bool(b) => format!("__const_bool_{b}"),
        ConstValue::Str(s) => format!("__const_str_{s}"),
        ConstValue::Null => "__const_null".to_string(),
    }
}

fn const_vm_type(value: &ConstValue) -> VmType {
    match value {
        ConstValue::Int(_) => VmType::Int32,
        ConstValue::Float(_) => VmType::Float32,
        ConstValue::Bool(_) => VmType::Bool,
        ConstValue::Str(_) => VmType::String,
        ConstValue::Null => VmType::Reference("SystemObject".to_string()),
    }
}

/// Best-effort VM type for an arithmetic/comparison operand, used only to
/// pick which overload of an operator extern to resolve: a constant's own
/// type if known, `Int32` by default for a temporary (this lowerer has no
/// full static type checker — `spec.md §1`'s non-goals exclude generalizing
/// the type system beyond the restricted subset, and the ESR's overload
/// scoring already tolerates an imprecise guess via its integer-to-integer
/// and generic-placeholder rules).
fn operand_source_type(operand: &Operand) -> &'static str {
    match operand {
        Operand::Const(ConstValue::Int(_)) => "int",
        Operand::Const(ConstValue::Float(_)) => "float",
        Operand::Const(ConstValue::Bool(_)) => "bool",
        Operand::Const(ConstValue::Str(_)) => "string",
        Operand::Const(ConstValue::Null) => "object",
        Operand::Temp(_) => "int",
    }
}

/// The extern member name an operator lowers to, mirroring the `op_*`
/// convention real stack-VM hosts use for operator overloads.
fn binop_member(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "op_Addition",
        BinOp::Sub => "op_Subtraction",
        BinOp::Mul => "op_Multiplication",
        BinOp::Div => "op_Division",
        BinOp::Mod => "op_Modulus",
        BinOp::Eq => "op_Equality",
        BinOp::Neq => "op_Inequality",
        BinOp::Lt => "op_LessThan",
        BinOp::Gt => "op_GreaterThan",
        BinOp::Le => "op_LessThanOrEqual",
        BinOp::Ge => "op_GreaterThanOrEqual",
        BinOp::And => "op_LogicalAnd",
        BinOp::Or => "op_LogicalOr",
        BinOp::BitAnd => "op_BitwiseAnd",
        BinOp::BitOr => "op_BitwiseOr",
        BinOp::BitXor => "op_ExclusiveOr",
        BinOp::Shl => "op_LeftShift",
        BinOp::Shr => "op_RightShift",
    }
}

fn unop_member(op: UnOp) -> &'static str {
    match op {
        UnOp::Neg => "op_UnaryNegation",
        UnOp::Not => "op_LogicalNot",
        UnOp::BitNot => "op_OnesComplement",
    }
}

/// Owns the heap allocator and per-function temp-type hints while lowering
/// one whole entry point's reachable function set to a single [`VmUnit`].
pub struct Lowerer<'a> {
    registry: &'a ClassRegistry,
    esr: &'a ExternRegistry,
    config: &'a CompilerConfig,
    heap: HeapAllocator,
    unit: VmUnit,
    externs_seen: std::collections::HashSet<String>,
    /// Field ownership cache: `(current_class, field_name) -> owner class`,
    /// resolved once per distinct pair across the whole lowering pass.
    field_owner_cache: HashMap<(String, String), String>,
}

impl<'a> Lowerer<'a> {
    pub fn new(registry: &'a ClassRegistry, esr: &'a ExternRegistry, config: &'a CompilerConfig) -> Self {
        Lowerer {
            registry,
            esr,
            config,
            heap: HeapAllocator::default(),
            unit: VmUnit::new(),
            externs_seen: std::collections::HashSet::new(),
            field_owner_cache: HashMap::new(),
        }
    }

    /// Lower every function and every top-level const in `program`, for
    /// the given entry point's reachable class set. `entry_class` is used
    /// to decide which instance properties get exported (`spec.md §4.3`).
    pub fn lower_program(
        mut self,
        program: &ConvertedProgram,
        entry_class: &ClassDecl,
    ) -> Result<VmUnit, CompileError> {
        for const_decl in &program.consts {
            let (addr, is_new) = self
                .heap
                .address_for(format!("__const_decl_{}", const_decl.name));
            if is_new {
                self.unit.data.push(DataEntry {
                    name: const_decl.name.clone(),
                    address: addr,
                    vm_type: source_to_vm_type(&const_decl.type_name),
                    initial_value: Some(const_decl.value.clone()),
                    is_exported: true,
                    sync_mode: None,
                    owning_class: "__consts".to_string(),
                });
            }
        }

        for function in &program.functions {
            self.lower_function(function, entry_class)?;
        }

        if self.config.emit_reflection {
            self.emit_reflection(entry_class);
        }

        Ok(self.unit)
    }

    fn record_extern(&mut self, signature: &str) {
        if self.externs_seen.insert(signature.to_string()) {
            self.unit.externs_used.push(signature.to_string());
        }
    }

    fn temp_address(&mut self, function: &TacFunction, temp: TempId) -> HeapAddress {
        let key = format!("{}__t{temp}", function.name);
        let (addr, is_new) = self.heap.address_for(key.clone());
        if is_new {
            self.unit.data.push(DataEntry {
                name: key,
                address: addr,
                vm_type: VmType::Int32,
                initial_value: None,
                is_exported: false,
                sync_mode: None,
                owning_class: owning_class(&function.name).to_string(),
            });
        }
        addr
    }

    fn const_address(&mut self, function: &TacFunction, value: &ConstValue) -> HeapAddress {
        let key = const_key(value);
        let (addr, is_new) = self.heap.address_for(key.clone());
        if is_new {
            self.unit.data.push(DataEntry {
                name: key,
                address: addr,
                vm_type: const_vm_type(value),
                initial_value: Some(value.clone()),
                is_exported: false,
                sync_mode: None,
                owning_class: owning_class(&function.name).to_string(),
            });
        }
        addr
    }

    fn operand_address(&mut self, function: &TacFunction, operand: &Operand) -> HeapAddress {
        match operand {
            Operand::Temp(t) => self.temp_address(function, *t),
            Operand::Const(c) => self.const_address(function, c),
        }
    }

    /// Resolve which class owns a field access by `field` from code in
    /// `current_class`: the current class itself if it declares the
    /// field, otherwise the unique reachable class that does (flattening
    /// an inline instance's fields onto the originating class, per
    /// `spec.md §4.6`'s per-class heap accounting — this lowerer targets
    /// single-instance inline classes, the common shape for a reachable
    /// helper class in this source language).
    fn field_owner(&mut self, current_class: &str, field: &str) -> String {
        let key = (current_class.to_string(), field.to_string());
        if let Some(owner) = self.field_owner_cache.get(&key) {
            return owner.clone();
        }
        let owner = if self
            .registry
            .get(current_class)
            .map(|c| c.find_property(field).is_some())
            .unwrap_or(false)
        {
            current_class.to_string()
        } else {
            self.registry
                .classes()
                .find(|c| c.name != current_class && c.find_property(field).is_some())
                .map(|c| c.name.clone())
                .unwrap_or_else(|| current_class.to_string())
        };
        self.field_owner_cache.insert(key, owner.clone());
        owner
    }

    fn field_address(&mut self, current_class: &str, field: &str) -> (HeapAddress, VmType) {
        let owner = self.field_owner(current_class, field);
        let type_name = self
            .registry
            .get(&owner)
            .and_then(|c| c.find_property(field))
            .map(|p| p.type_name.clone())
            .unwrap_or_else(|| "int".to_string());
        let exported = self
            .registry
            .get(&owner)
            .and_then(|c| c.find_property(field))
            .map(|p| p.access == Access::Public)
            .unwrap_or(false);
        let key = format!("{owner}_{field}");
        let (addr, is_new) = self.heap.address_for(key.clone());
        let vm_type = source_to_vm_type(&type_name);
        if is_new {
            self.unit.data.push(DataEntry {
                name: key,
                address: addr,
                vm_type: vm_type.clone(),
                initial_value: None,
                is_exported: exported,
                sync_mode: None,
                owning_class: owner,
            });
        }
        (addr, vm_type)
    }

    fn lower_function(&mut self, function: &TacFunction, entry_class: &ClassDecl) -> Result<(), CompileError> {
        let _ = entry_class;
        let current_class = owning_class(&function.name).to_string();

        self.unit.code.push(VmInstr::Label(function.name.clone()));
        for &block_id in &function.reachable_blocks() {
            self.unit.code.push(VmInstr::Label(block_label(&function.name, block_id)));
            let block = function.block(block_id);
            for instr in &block.instrs {
                self.lower_instr(function, &current_class, instr)?;
            }
        }
        Ok(())
    }

    fn push_operand(&mut self, function: &TacFunction, operand: &Operand) {
        let addr = self.operand_address(function, operand);
        self.unit.code.push(VmInstr::Push(addr));
    }

    fn lower_instr(&mut self, function: &TacFunction, current_class: &str, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::Copy { dst, src } => {
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.push_operand(function, src);
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::Cast { dst, operand, type_name: _ } => {
                // Every `Cast` that survives the optimizer (the constant-fold
                // and narrow-cast-elimination passes resolve the rest) is a
                // conversion this IR has no way to synthesize a host member
                // for — the static extern table and TMR stubs have no such
                // entry, and inventing one would emit a `VmInstr::Extern`
                // the static table never referenced (`spec.md §1` non-goal).
                // The VM is an untyped stack machine, so the source and
                // target representations are the same heap slot shape; a
                // plain value copy carries the runtime effect.
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.push_operand(function, operand);
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::BinOp { dst, op, lhs, rhs } => {
                let owner_type = operand_source_type(lhs);
                let member = binop_member(*op);
                let param_types = vec![
                    source_to_host(operand_source_type(lhs)),
                    source_to_host(operand_source_type(rhs)),
                ];
                let signature = self.esr.resolve(self.config, owner_type, member, &param_types);
                self.push_operand(function, lhs);
                self.push_operand(function, rhs);
                self.record_extern(&signature);
                self.unit.code.push(VmInstr::Extern(signature));
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::UnOp { dst, op, operand } => {
                let owner_type = operand_source_type(operand);
                let member = unop_member(*op);
                let signature = self.esr.resolve(self.config, owner_type, member, &[source_to_host(owner_type)]);
                self.push_operand(function, operand);
                self.record_extern(&signature);
                self.unit.code.push(VmInstr::Extern(signature));
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::LoadField { dst, object: _, field } => {
                let (field_addr, _) = self.field_address(current_class, field);
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.unit.code.push(VmInstr::Push(field_addr));
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::StoreField { object: _, field, value } => {
                let (field_addr, _) = self.field_address(current_class, field);
                self.unit.code.push(VmInstr::Push(field_addr));
                self.push_operand(function, value);
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::Call {
                dst,
                signature,
                receiver,
                args,
                is_extern,
                is_tail_call: _,
            } => {
                if let Some(recv) = receiver {
                    self.push_operand(function, recv);
                }
                for arg in args {
                    self.push_operand(function, arg);
                }
                if *is_extern {
                    self.record_extern(signature);
                    self.unit.code.push(VmInstr::Extern(signature.clone()));
                } else {
                    // User-method calls resolve to a direct jump at the
                    // callee's label (`spec.md`'s VM instruction set has no
                    // call/return convention of its own); this lowerer
                    // targets the straight-line event-handler style this
                    // source language's methods are written in rather than
                    // modeling a general call stack.
                    self.unit.code.push(VmInstr::Jump(Some(signature.clone())));
                }
                if let Some(dst) = dst {
                    let dst_addr = self.temp_address(function, *dst);
                    self.unit.code.push(VmInstr::Push(dst_addr));
                    self.unit.code.push(VmInstr::Copy);
                }
            }
            Instr::New { dst, signature, args } => {
                for arg in args {
                    self.push_operand(function, arg);
                }
                self.record_extern(signature);
                self.unit.code.push(VmInstr::Extern(signature.clone()));
                let dst_addr = self.temp_address(function, *dst);
                self.unit.code.push(VmInstr::Push(dst_addr));
                self.unit.code.push(VmInstr::Copy);
            }
            Instr::Phi { .. } => {
                return Err(CompileError::internal(
                    "Phi instruction reached the lowerer; SSA deconstruction must run first",
                ));
            }
            Instr::Jump { target } => {
                self.unit.code.push(VmInstr::Jump(Some(block_label(&function.name, *target))));
            }
            Instr::Branch {
                cond,
                then_block,
                else_block,
            } => {
                self.push_operand(function, cond);
                self.unit
                    .code
                    .push(VmInstr::JumpIfFalse(block_label(&function.name, *else_block)));
                self.unit
                    .code
                    .push(VmInstr::Jump(Some(block_label(&function.name, *then_block))));
            }
            Instr::Return { value } => {
                if let Some(value) = value {
                    self.push_operand(function, value);
                }
                self.unit.code.push(VmInstr::Jump(None));
            }
            Instr::Nop => {}
        }
        Ok(())
    }

    fn emit_reflection(&mut self, entry_class: &ClassDecl) {
        let type_id = TypeId::compute(&entry_class.name);
        let (addr, _) = self.heap.address_for("__refl_typeid".to_string());
        self.unit.data.push(DataEntry {
            name: "__refl_typeid".to_string(),
            address: addr,
            vm_type: VmType::Int64,
            initial_value: Some(ConstValue::Int(type_id.0 as i64)),
            is_exported: false,
            sync_mode: None,
            owning_class: entry_class.name.clone(),
        });

        let (addr, _) = self.heap.address_for("__refl_typename".to_string());
        self.unit.data.push(DataEntry {
            name: "__refl_typename".to_string(),
            address: addr,
            vm_type: VmType::String,
            initial_value: Some(ConstValue::Str(entry_class.name.clone())),
            is_exported: false,
            sync_mode: None,
            owning_class: entry_class.name.clone(),
        });

        let (addr, _) = self.heap.address_for("__refl_typeids".to_string());
        self.unit.data.push(DataEntry {
            name: "__refl_typeids".to_string(),
            address: addr,
            vm_type: VmType::Array(Box::new(VmType::Int64)),
            initial_value: None,
            is_exported: false,
            sync_mode: None,
            owning_class: entry_class.name.clone(),
        });
    }
}

/// A block's symbolic label, unique within one function by construction
/// (`"ClassName::method"` plus a numeric block id).
fn block_label(function_name: &str, block_id: u32) -> String {
    format!("{function_name}__L{block_id}")
}
