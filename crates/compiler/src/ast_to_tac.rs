//! AST-to-TAC conversion (`spec.md §4.3`).
//!
//! Each method, each synthesized parameterless constructor, and each
//! user-declared constructor becomes one [`TacFunction`] named
//! `"ClassName::methodName"` (`"ClassName::ctor"` for constructors).
//! Property initializers are folded into the constructor body, ahead of any
//! user-written constructor statements. `for` loops desugar to `while` at
//! this stage; there is no `Stmt::For` left by the time a function reaches
//! the optimizer.

use crate::ast::{Access, BinOp as AstBinOp, ClassDecl, Expr, Program, Stmt, TopLevelConst, UnOp as AstUnOp};
use crate::config::CompilerConfig;
use crate::error::{CompileError, ErrorKind};
use crate::esr::ExternRegistry;
use crate::registry::ClassRegistry;
use crate::static_externs::PropertyAccess;
use crate::tac::{BlockId, ConstValue, Instr, Operand, TacFunction, TempId};
use std::collections::HashMap;

/// A converted top-level constant, available for folding into any function
/// that references it by name.
#[derive(Debug, Clone)]
pub struct ConvertedConst {
    pub name: String,
    pub type_name: String,
    pub value: ConstValue,
}

/// Everything the AST-to-TAC stage produces for one compilation run.
#[derive(Debug, Clone, Default)]
pub struct ConvertedProgram {
    pub functions: Vec<TacFunction>,
    pub consts: Vec<ConvertedConst>,
}

/// Converts every class in a [`ClassRegistry`] plus every top-level const
/// across the programs that fed it, detecting duplicate const names across
/// files as it goes.
pub fn convert_all(
    registry: &ClassRegistry,
    programs: &[Program],
    esr: &ExternRegistry,
    config: &CompilerConfig,
) -> Result<ConvertedProgram, Vec<CompileError>> {
    let mut errors = Vec::new();
    let mut consts = Vec::new();
    let mut seen_const_names: HashMap<String, TopLevelConst> = HashMap::new();

    for program in programs {
        for c in &program.consts {
            if let Some(first) = seen_const_names.get(&c.name) {
                errors.push(CompileError::new(
                    ErrorKind::TypeError,
                    format!(
                        "duplicate top-level const `{}` (first declared at {})",
                        c.name, first.location
                    ),
                    c.location.file.clone(),
                    c.location.line,
                    c.location.column,
                ));
                continue;
            }
            seen_const_names.insert(c.name.clone(), c.clone());
            match eval_const_expr(&c.value) {
                Ok(value) => consts.push(ConvertedConst {
                    name: c.name.clone(),
                    type_name: c.type_name.clone(),
                    value,
                }),
                Err(message) => errors.push(CompileError::new(
                    ErrorKind::UnsupportedFeature,
                    message,
                    c.location.file.clone(),
                    c.location.line,
                    c.location.column,
                )),
            }
        }
    }

    let const_values: HashMap<String, ConstValue> =
        consts.iter().map(|c| (c.name.clone(), c.value.clone())).collect();

    let mut functions = Vec::new();
    for class in registry.classes() {
        match convert_class(class, registry, esr, config, &const_values) {
            Ok(mut fns) => functions.append(&mut fns),
            Err(mut class_errors) => errors.append(&mut class_errors),
        }
    }

    if errors.is_empty() {
        Ok(ConvertedProgram { functions, consts })
    } else {
        Err(errors)
    }
}

/// Constant expressions are restricted to literals and literal-on-literal
/// arithmetic, per `spec.md §4.3`; anything else is an unsupported-feature
/// diagnostic rather than a silent runtime-evaluated const.
fn eval_const_expr(expr: &Expr) -> Result<ConstValue, String> {
    match expr {
        Expr::IntLit(n) => Ok(ConstValue::Int(*n)),
        Expr::FloatLit(n) => Ok(ConstValue::Float(*n)),
        Expr::BoolLit(b) => Ok(ConstValue::Bool(*b)),
        Expr::StringLit(s) => Ok(ConstValue::Str(s.clone())),
        Expr::Null => Ok(ConstValue::Null),
        Expr::Unary { op: AstUnOp::Neg, operand } => match eval_const_expr(operand)? {
            ConstValue::Int(n) => Ok(ConstValue::Int(-n)),
            ConstValue::Float(n) => Ok(ConstValue::Float(-n)),
            _ => Err("top-level const negation requires a numeric literal".to_string()),
        },
        _ => Err("top-level const initializer must be a literal expression".to_string()),
    }
}

fn convert_class(
    class: &ClassDecl,
    registry: &ClassRegistry,
    esr: &ExternRegistry,
    config: &CompilerConfig,
    consts: &HashMap<String, ConstValue>,
) -> Result<Vec<TacFunction>, Vec<CompileError>> {
    let mut functions = Vec::new();
    let mut errors = Vec::new();

    let ctor_body = synthesize_ctor_body(class);
    let mut conv = FunctionConverter::new(class, registry, esr, config, consts, &format!("{}::ctor", class.name));
    if let Some(ctor) = &class.ctor {
        for param in &ctor.params {
            conv.bind_param(&param.name);
        }
    }
    match conv.convert_body(&ctor_body) {
        Ok(()) => functions.push(conv.finish()),
        Err(e) => errors.push(e),
    }

    for method in &class.methods {
        // Methods are converted in declaration order, per `spec.md §4.3`:
        // deterministic lowering order matters for reproducible output.
        let mut conv = FunctionConverter::new(
            class,
            registry,
            esr,
            config,
            consts,
            &format!("{}::{}", class.name, method.name),
        );
        conv.is_static = method.is_static;
        for param in &method.params {
            conv.bind_param(&param.name);
        }
        match conv.convert_body(&method.body) {
            Ok(()) => functions.push(conv.finish()),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(functions)
    } else {
        Err(errors)
    }
}

/// Property initializers become assignment statements at the front of the
/// constructor body (`spec.md §4.3`'s constructor-synthesis note): a class
/// with no declared constructor still gets one, containing only these.
fn synthesize_ctor_body(class: &ClassDecl) -> Vec<Stmt> {
    let mut body: Vec<Stmt> = class
        .properties
        .iter()
        .filter_map(|p| {
            p.initializer.as_ref().map(|init| Stmt::Assign {
                target: Expr::FieldAccess {
                    receiver: Box::new(Expr::This),
                    field: p.name.clone(),
                },
                value: init.clone(),
            })
        })
        .collect();
    if let Some(ctor) = &class.ctor {
        body.extend(ctor.body.iter().cloned());
    }
    body
}

struct FunctionConverter<'a> {
    class: &'a ClassDecl,
    registry: &'a ClassRegistry,
    esr: &'a ExternRegistry,
    config: &'a CompilerConfig,
    consts: &'a HashMap<String, ConstValue>,
    func: TacFunction,
    scopes: Vec<HashMap<String, TempId>>,
    loop_stack: Vec<(BlockId, BlockId)>, // (continue target, break target)
    current: BlockId,
    is_static: bool,
}

impl<'a> FunctionConverter<'a> {
    fn new(
        class: &'a ClassDecl,
        registry: &'a ClassRegistry,
        esr: &'a ExternRegistry,
        config: &'a CompilerConfig,
        consts: &'a HashMap<String, ConstValue>,
        name: &str,
    ) -> Self {
        let func = TacFunction::new(name);
        let entry = func.entry;
        FunctionConverter {
            class,
            registry,
            esr,
            config,
            consts,
            func,
            scopes: vec![HashMap::new()],
            loop_stack: Vec::new(),
            current: entry,
            is_static: false,
        }
    }

    fn bind_param(&mut self, name: &str) {
        let temp = self.func.new_temp();
        self.func.params.push(temp);
        self.scopes.last_mut().unwrap().insert(name.to_string(), temp);
    }

    fn finish(mut self) -> TacFunction {
        if self.func.block(self.current).terminator().is_none() {
            self.func.push(self.current, Instr::Return { value: None });
        }
        self.func
    }

    fn convert_body(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for stmt in body {
            self.convert_stmt(stmt)?;
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<TempId> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn declare(&mut self, name: &str) -> TempId {
        let temp = self.func.new_temp();
        self.scopes.last_mut().unwrap().insert(name.to_string(), temp);
        temp
    }

    fn convert_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let temp = self.declare(name);
                if let Some(init) = init {
                    let value = self.convert_expr(init)?;
                    self.func.push(self.current, Instr::Copy { dst: temp, src: value });
                }
                Ok(())
            }
            Stmt::Assign { target, value } => {
                let rhs = self.convert_expr(value)?;
                self.convert_assign(target, rhs)
            }
            Stmt::ExprStmt(expr) => {
                self.convert_expr(expr)?;
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.convert_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body } => self.convert_while(cond, body),
            Stmt::For { init, cond, step, body } => self.convert_for(init, cond, step, body),
            Stmt::Return(value) => {
                let value = match value {
                    Some(e) => Some(self.convert_expr(e)?),
                    None => None,
                };
                self.func.push(self.current, Instr::Return { value });
                Ok(())
            }
            Stmt::Break => {
                let (_, break_target) = *self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompileError::internal("`break` outside of a loop"))?;
                self.func.push(self.current, Instr::Jump { target: break_target });
                Ok(())
            }
            Stmt::Continue => {
                let (continue_target, _) = *self
                    .loop_stack
                    .last()
                    .ok_or_else(|| CompileError::internal("`continue` outside of a loop"))?;
                self.func.push(self.current, Instr::Jump { target: continue_target });
                Ok(())
            }
            Stmt::Block(stmts) => {
                self.scopes.push(HashMap::new());
                let result = self.convert_body(stmts);
                self.scopes.pop();
                result
            }
        }
    }

    fn convert_assign(&mut self, target: &Expr, value: Operand) -> Result<(), CompileError> {
        match target {
            Expr::Ident(name) => {
                let temp = self.lookup(name).ok_or_else(|| {
                    CompileError::internal(format!("assignment to unknown local `{name}`"))
                })?;
                self.func.push(self.current, Instr::Copy { dst: temp, src: value });
                Ok(())
            }
            Expr::FieldAccess { receiver, field } => {
                let object = self.convert_expr(receiver)?;
                if let Some(signature) = self.resolve_host_property(receiver, field, PropertyAccess::Setter) {
                    self.func.push(
                        self.current,
                        Instr::Call {
                            dst: None,
                            signature,
                            receiver: Some(object),
                            args: vec![value],
                            is_extern: true,
                            is_tail_call: false,
                        },
                    );
                    return Ok(());
                }
                self.func.push(
                    self.current,
                    Instr::StoreField {
                        object,
                        field: field.clone(),
                        value,
                    },
                );
                Ok(())
            }
            Expr::Index { array, index } => {
                let array = self.convert_expr(array)?;
                let index = self.convert_expr(index)?;
                self.func.push(
                    self.current,
                    Instr::Call {
                        dst: None,
                        signature: "__index_set".to_string(),
                        receiver: Some(array),
                        args: vec![index, value],
                        is_extern: true,
                        is_tail_call: false,
                    },
                );
                Ok(())
            }
            _ => Err(CompileError::internal("unsupported assignment target")),
        }
    }

    /// `if`/`while`/`for` all desugar to the same diamond/loop shape over
    /// basic blocks; `for` further desugars its own init/cond/step into a
    /// `while`, per `spec.md §4.3`.
    fn convert_if(
        &mut self,
        cond: &Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
    ) -> Result<(), CompileError> {
        let cond_value = self.convert_expr(cond)?;
        let then_block = self.func.new_block();
        let else_block = self.func.new_block();
        let join_block = self.func.new_block();
        self.func.push(
            self.current,
            Instr::Branch {
                cond: cond_value,
                then_block,
                else_block,
            },
        );

        self.current = then_block;
        self.scopes.push(HashMap::new());
        self.convert_body(then_branch)?;
        self.scopes.pop();
        if self.func.block(self.current).terminator().is_none() {
            self.func.push(self.current, Instr::Jump { target: join_block });
        }

        self.current = else_block;
        if let Some(else_branch) = else_branch {
            self.scopes.push(HashMap::new());
            self.convert_body(else_branch)?;
            self.scopes.pop();
        }
        if self.func.block(self.current).terminator().is_none() {
            self.func.push(self.current, Instr::Jump { target: join_block });
        }

        self.current = join_block;
        Ok(())
    }

    fn convert_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<(), CompileError> {
        let header = self.func.new_block();
        let body_block = self.func.new_block();
        let exit_block = self.func.new_block();

        self.func.push(self.current, Instr::Jump { target: header });

        self.current = header;
        let cond_value = self.convert_expr(cond)?;
        self.func.push(
            self.current,
            Instr::Branch {
                cond: cond_value,
                then_block: body_block,
                else_block: exit_block,
            },
        );

        self.loop_stack.push((header, exit_block));
        self.current = body_block;
        self.scopes.push(HashMap::new());
        self.convert_body(body)?;
        self.scopes.pop();
        if self.func.block(self.current).terminator().is_none() {
            self.func.push(self.current, Instr::Jump { target: header });
        }
        self.loop_stack.pop();

        self.current = exit_block;
        Ok(())
    }

    fn convert_for(
        &mut self,
        init: &Option<Box<Stmt>>,
        cond: &Option<Expr>,
        step: &Option<Box<Stmt>>,
        body: &[Stmt],
    ) -> Result<(), CompileError> {
        self.scopes.push(HashMap::new());
        if let Some(init) = init {
            self.convert_stmt(init)?;
        }
        let mut desugared_body = body.to_vec();
        if let Some(step) = step {
            desugared_body.push((**step).clone());
        }
        let cond = cond.clone().unwrap_or(Expr::BoolLit(true));
        let result = self.convert_while(&cond, &desugared_body);
        self.scopes.pop();
        result
    }

    fn convert_expr(&mut self, expr: &Expr) -> Result<Operand, CompileError> {
        match expr {
            Expr::IntLit(n) => Ok(Operand::Const(ConstValue::Int(*n))),
            Expr::FloatLit(n) => Ok(Operand::Const(ConstValue::Float(*n))),
            Expr::BoolLit(b) => Ok(Operand::Const(ConstValue::Bool(*b))),
            Expr::StringLit(s) => Ok(Operand::Const(ConstValue::Str(s.clone()))),
            Expr::Null => Ok(Operand::Const(ConstValue::Null)),
            Expr::This => Ok(Operand::Temp(self.this_temp())),
            Expr::Ident(name) => {
                if let Some(temp) = self.lookup(name) {
                    return Ok(Operand::Temp(temp));
                }
                // A property shadows a same-named top-level const (`spec.md
                // §4.6` step 3): instance state wins once a local binding
                // doesn't match.
                if self.class.find_property(name).is_some() {
                    let dst = self.func.new_temp();
                    let this = Operand::Temp(self.this_temp());
                    self.func.push(
                        self.current,
                        Instr::LoadField {
                            dst,
                            object: this,
                            field: name.clone(),
                        },
                    );
                    return Ok(Operand::Temp(dst));
                }
                if let Some(value) = self.consts.get(name) {
                    return Ok(Operand::Const(value.clone()));
                }
                Err(CompileError::internal(format!("reference to unknown identifier `{name}`")))
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.convert_expr(left)?;
                let rhs = self.convert_expr(right)?;
                let dst = self.func.new_temp();
                self.func.push(
                    self.current,
                    Instr::BinOp {
                        dst,
                        op: *op,
                        lhs,
                        rhs,
                    },
                );
                Ok(Operand::Temp(dst))
            }
            Expr::Unary { op, operand } => {
                let operand = self.convert_expr(operand)?;
                let dst = self.func.new_temp();
                self.func.push(self.current, Instr::UnOp { dst, op: *op, operand });
                Ok(Operand::Temp(dst))
            }
            Expr::Cast { type_name, expr } => {
                let operand = self.convert_expr(expr)?;
                let dst = self.func.new_temp();
                self.func.push(
                    self.current,
                    Instr::Cast {
                        dst,
                        type_name: type_name.clone(),
                        operand,
                    },
                );
                Ok(Operand::Temp(dst))
            }
            Expr::FieldAccess { receiver, field } => {
                let object = self.convert_expr(receiver)?;
                let dst = self.func.new_temp();
                if let Some(signature) = self.resolve_host_property(receiver, field, PropertyAccess::Getter) {
                    self.func.push(
                        self.current,
                        Instr::Call {
                            dst: Some(dst),
                            signature,
                            receiver: Some(object),
                            args: vec![],
                            is_extern: true,
                            is_tail_call: false,
                        },
                    );
                    return Ok(Operand::Temp(dst));
                }
                self.func.push(
                    self.current,
                    Instr::LoadField {
                        dst,
                        object,
                        field: field.clone(),
                    },
                );
                Ok(Operand::Temp(dst))
            }
            Expr::Index { array, index } => {
                let object = self.convert_expr(array)?;
                let index = self.convert_expr(index)?;
                let dst = self.func.new_temp();
                self.func.push(
                    self.current,
                    Instr::Call {
                        dst: Some(dst),
                        signature: "__index_get".to_string(),
                        receiver: Some(object),
                        args: vec![index],
                        is_extern: true,
                        is_tail_call: false,
                    },
                );
                Ok(Operand::Temp(dst))
            }
            Expr::New { type_name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.convert_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let dst = self.func.new_temp();
                let signature = self.esr.resolve_ctor(self.config, type_name);
                self.func.push(self.current, Instr::New { dst, signature, args });
                Ok(Operand::Temp(dst))
            }
            Expr::MethodCall { receiver, method, args } => {
                let converted_args = args
                    .iter()
                    .map(|a| self.convert_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let (receiver_operand, is_extern, signature) = self.resolve_call_target(receiver, method, args.len())?;
                let dst = self.func.new_temp();
                self.func.push(
                    self.current,
                    Instr::Call {
                        dst: Some(dst),
                        signature,
                        receiver: receiver_operand,
                        args: converted_args,
                        is_extern,
                        is_tail_call: false,
                    },
                );
                Ok(Operand::Temp(dst))
            }
        }
    }

    fn this_temp(&mut self) -> TempId {
        if let Some(temp) = self.lookup("this") {
            return temp;
        }
        let temp = self.func.new_temp();
        self.scopes.first_mut().unwrap().insert("this".to_string(), temp);
        temp
    }

    /// Decide whether a call resolves to a user method (same or another
    /// registered class, dispatched by `JUMP_INDIRECT` at lowering time) or
    /// an extern. Implicit-receiver calls (`Helper()`) are a call on
    /// `this` if the current class declares that method, otherwise an
    /// unqualified extern the static table must resolve.
    fn resolve_call_target(
        &mut self,
        receiver: &Option<Box<Expr>>,
        method: &str,
        _arity: usize,
    ) -> Result<(Option<Operand>, bool, String), CompileError> {
        match receiver {
            None => {
                if self.class.find_method(method).is_some() || self.registry.resolve_method(&self.class.name, method).is_some() {
                    let this = Operand::Temp(self.this_temp());
                    Ok((Some(this), false, format!("{}::{}", self.class.name, method)))
                } else {
                    let sig = self.esr.resolve(self.config, &self.class.name, method, &[]);
                    Ok((Some(Operand::Temp(self.this_temp())), true, sig))
                }
            }
            Some(receiver_expr) => {
                let receiver_operand = self.convert_expr(receiver_expr)?;
                let type_hint = static_type_hint(receiver_expr, self.class, self.registry);
                if let Some(type_name) = &type_hint {
                    if self.registry.contains(type_name) {
                        return Ok((
                            Some(receiver_operand),
                            false,
                            format!("{type_name}::{method}"),
                        ));
                    }
                }
                let owner = type_hint.unwrap_or_else(|| "System.Object".to_string());
                let sig = self.esr.resolve(self.config, &owner, method, &[]);
                Ok((Some(receiver_operand), true, sig))
            }
        }
    }

    /// Field access on a receiver whose static type names a registered class
    /// stays a direct `LoadField`/`StoreField` (the class's own instance
    /// storage); field access on anything else is a property access on a
    /// host type, resolved through the ESR the same way a method call is.
    /// Returns `None` when the receiver has no class of its own (`this`, one
    /// of its own fields) so the caller falls back to `LoadField`/`StoreField`.
    fn resolve_host_property(
        &self,
        receiver: &Expr,
        field: &str,
        access: PropertyAccess,
    ) -> Option<String> {
        let type_name = static_type_hint(receiver, self.class, self.registry)?;
        if self.registry.contains(&type_name) {
            return None;
        }
        Some(self.esr.resolve_property(self.config, &type_name, field, access, "object"))
    }
}

/// A best-effort static type name for a receiver expression, used to decide
/// whether a method call dispatches to a known user class or must resolve
/// through the extern registry. Returns `None` when the receiver's type
/// can't be determined locally (this is acceptable: the extern fallback
/// still synthesizes a plausible signature, per `spec.md §4.1`).
fn static_type_hint(expr: &Expr, class: &ClassDecl, registry: &ClassRegistry) -> Option<String> {
    match expr {
        Expr::This => Some(class.name.clone()),
        Expr::Ident(name) => class
            .find_property(name)
            .map(|p| p.type_name.clone())
            .or_else(|| registry.resolve_property(&class.name, name).map(|p| p.type_name.clone())),
        Expr::FieldAccess { receiver, field } => {
            let receiver_type = static_type_hint(receiver, class, registry)?;
            registry.resolve_property(&receiver_type, field).map(|p| p.type_name.clone())
        }
        Expr::New { type_name, .. } => Some(type_name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Access, MethodDecl, Param, SourceLocation};
    use crate::esr::ExternRegistry;

    fn loc() -> SourceLocation {
        SourceLocation::new("Test.uc", 0, 0)
    }

    fn simple_class() -> ClassDecl {
        ClassDecl {
            name: "Calc".to_string(),
            base: None,
            interfaces: vec![],
            decorators: vec![],
            properties: vec![],
            methods: vec![MethodDecl {
                name: "Add".to_string(),
                access: Access::Public,
                is_static: false,
                return_type: "int".to_string(),
                params: vec![
                    Param {
                        name: "a".to_string(),
                        type_name: "int".to_string(),
                    },
                    Param {
                        name: "b".to_string(),
                        type_name: "int".to_string(),
                    },
                ],
                body: vec![Stmt::Return(Some(Expr::Binary {
                    op: AstBinOp::Add,
                    left: Box::new(Expr::Ident("a".to_string())),
                    right: Box::new(Expr::Ident("b".to_string())),
                }))],
                location: loc(),
            }],
            ctor: None,
            location: loc(),
        }
    }

    #[test]
    fn converts_method_with_binary_op_and_return() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(simple_class());
        registry.add_program(&p);
        let esr = ExternRegistry::new();
        let result = convert_all(&registry, &[p], &esr, &CompilerConfig::new()).unwrap();
        let add_fn = result.functions.iter().find(|f| f.name == "Calc::Add").unwrap();
        assert_eq!(add_fn.params.len(), 2);
        let last_block = add_fn.blocks.last().unwrap();
        assert!(matches!(last_block.instrs.last(), Some(Instr::Return { value: Some(_) })));
    }

    #[test]
    fn synthesizes_parameterless_ctor_for_class_without_one() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(simple_class());
        registry.add_program(&p);
        let esr = ExternRegistry::new();
        let result = convert_all(&registry, &[p], &esr, &CompilerConfig::new()).unwrap();
        assert!(result.functions.iter().any(|f| f.name == "Calc::ctor"));
    }

    #[test]
    fn duplicate_top_level_const_is_rejected() {
        let mut registry = ClassRegistry::new();
        let mut p1 = Program::new("a.uc");
        p1.consts.push(TopLevelConst {
            name: "MAX".to_string(),
            type_name: "int".to_string(),
            value: Expr::IntLit(10),
            location: loc(),
        });
        let mut p2 = Program::new("b.uc");
        p2.consts.push(TopLevelConst {
            name: "MAX".to_string(),
            type_name: "int".to_string(),
            value: Expr::IntLit(20),
            location: loc(),
        });
        registry.add_program(&p1);
        registry.add_program(&p2);
        let esr = ExternRegistry::new();
        let err = convert_all(&registry, &[p1, p2], &esr, &CompilerConfig::new()).unwrap_err();
        assert!(err.iter().any(|e| e.message.contains("duplicate top-level const")));
    }

    #[test]
    fn for_loop_desugars_to_while_shape() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        let mut class = simple_class();
        class.methods.push(MethodDecl {
            name: "Loop".to_string(),
            access: Access::Public,
            is_static: false,
            return_type: "void".to_string(),
            params: vec![],
            body: vec![Stmt::For {
                init: Some(Box::new(Stmt::VarDecl {
                    name: "i".to_string(),
                    type_name: "int".to_string(),
                    init: Some(Expr::IntLit(0)),
                })),
                cond: Some(Expr::Binary {
                    op: AstBinOp::Lt,
                    left: Box::new(Expr::Ident("i".to_string())),
                    right: Box::new(Expr::IntLit(10)),
                }),
                step: Some(Box::new(Stmt::Assign {
                    target: Expr::Ident("i".to_string()),
                    value: Expr::Binary {
                        op: AstBinOp::Add,
                        left: Box::new(Expr::Ident("i".to_string())),
                        right: Box::new(Expr::IntLit(1)),
                    },
                })),
                body: vec![],
            }],
            location: loc(),
        });
        p.classes.push(class);
        registry.add_program(&p);
        let esr = ExternRegistry::new();
        let result = convert_all(&registry, &[p], &esr, &CompilerConfig::new()).unwrap();
        let func = result.functions.iter().find(|f| f.name == "Calc::Loop").unwrap();
        // header + body + exit + entry blocks at minimum.
        assert!(func.blocks.len() >= 4);
    }

    #[test]
    fn field_access_on_host_type_resolves_through_esr() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        let mut class = simple_class();
        class.properties.push(crate::ast::PropertyDecl {
            name: "target".to_string(),
            type_name: "Transform".to_string(),
            access: Access::Public,
            is_static: false,
            initializer: None,
            location: loc(),
        });
        class.methods.push(MethodDecl {
            name: "ReadPosition".to_string(),
            access: Access::Public,
            is_static: false,
            return_type: "Vector3".to_string(),
            params: vec![],
            body: vec![Stmt::Return(Some(Expr::FieldAccess {
                receiver: Box::new(Expr::Ident("target".to_string())),
                field: "position".to_string(),
            }))],
            location: loc(),
        });
        p.classes.push(class);
        registry.add_program(&p);
        let esr = ExternRegistry::new();
        let result = convert_all(&registry, &[p], &esr, &CompilerConfig::new()).unwrap();
        let func = result.functions.iter().find(|f| f.name == "Calc::ReadPosition").unwrap();
        let has_extern_call = func.blocks.iter().any(|b| {
            b.instrs.iter().any(|i| {
                matches!(i, Instr::Call { signature, is_extern: true, .. } if signature.contains("get_position"))
            })
        });
        assert!(has_extern_call);
    }

    #[test]
    fn property_shadows_same_named_top_level_const() {
        // `spec.md §4.6` step 3: a property wins over a same-named const.
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.consts.push(TopLevelConst {
            name: "value".to_string(),
            type_name: "int".to_string(),
            value: Expr::IntLit(99),
            location: loc(),
        });
        let mut class = simple_class();
        class.properties.push(crate::ast::PropertyDecl {
            name: "value".to_string(),
            type_name: "int".to_string(),
            access: Access::Public,
            is_static: false,
            initializer: None,
            location: loc(),
        });
        class.methods.push(MethodDecl {
            name: "ReadValue".to_string(),
            access: Access::Public,
            is_static: false,
            return_type: "int".to_string(),
            params: vec![],
            body: vec![Stmt::Return(Some(Expr::Ident("value".to_string())))],
            location: loc(),
        });
        p.classes.push(class);
        registry.add_program(&p);
        let esr = ExternRegistry::new();
        let result = convert_all(&registry, &[p], &esr, &CompilerConfig::new()).unwrap();
        let func = result.functions.iter().find(|f| f.name == "Calc::ReadValue").unwrap();
        let loads_field = func
            .blocks
            .iter()
            .any(|b| b.instrs.iter().any(|i| matches!(i, Instr::LoadField { field, .. } if field == "value")));
        assert!(loads_field, "property read must win over the same-named const");
    }
}
