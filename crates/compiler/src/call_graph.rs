//! Class reachability analysis: `spec.md §6`'s `R(E)`, the set of inline
//! classes reachable from an entry point `E`.
//!
//! A class is reachable from another if the referencing class constructs it
//! (`new Foo(...)`), declares a property or parameter of its type, or
//! returns it — transitively. The orchestrator unions each entry's `R(E)`
//! with `{E}` to decide which classes get lowered into that entry's unit
//! (teacher idiom: `CallGraph::build` extracting an edge set and then doing
//! a reachability walk, adapted from word-call edges to class-reference
//! edges).

use crate::ast::{ClassDecl, Expr, Stmt};
use crate::registry::ClassRegistry;
use std::collections::{HashSet, VecDeque};

/// A directed graph of class-to-class references, used to compute each
/// entry point's reachable set.
#[derive(Debug, Clone, Default)]
pub struct ClassReferenceGraph {
    edges: std::collections::HashMap<String, HashSet<String>>,
}

impl ClassReferenceGraph {
    pub fn build(registry: &ClassRegistry) -> Self {
        let mut edges = std::collections::HashMap::new();
        for class in registry.classes() {
            edges.insert(class.name.clone(), referenced_classes(class, registry));
        }
        ClassReferenceGraph { edges }
    }

    /// The classes reachable from `entry_name` via zero or more reference
    /// edges, NOT including `entry_name` itself.
    pub fn reachable_from(&self, entry_name: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(entry_name.to_string());
        visited.insert(entry_name.to_string());

        let mut result = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if let Some(callees) = self.edges.get(&current) {
                for callee in callees {
                    if visited.insert(callee.clone()) {
                        result.insert(callee.clone());
                        queue.push_back(callee.clone());
                    }
                }
            }
        }
        result
    }
}

fn referenced_classes(class: &ClassDecl, registry: &ClassRegistry) -> HashSet<String> {
    let mut refs = HashSet::new();
    let mut note = |type_name: &str| {
        let base = type_name.trim_end_matches("[]");
        if registry.contains(base) && base != class.name {
            refs.insert(base.to_string());
        }
    };

    if let Some(base) = &class.base {
        note(base);
    }
    for property in &class.properties {
        note(&property.type_name);
    }
    for method in &class.methods {
        note(&method.return_type);
        for param in &method.params {
            note(&param.type_name);
        }
        for stmt in &method.body {
            walk_stmt(stmt, &mut note);
        }
    }
    if let Some(ctor) = &class.ctor {
        for param in &ctor.params {
            note(&param.type_name);
        }
        for stmt in &ctor.body {
            walk_stmt(stmt, &mut note);
        }
    }
    refs
}

fn walk_stmt(stmt: &Stmt, note: &mut impl FnMut(&str)) {
    match stmt {
        Stmt::VarDecl { type_name, init, .. } => {
            note(type_name);
            if let Some(e) = init {
                walk_expr(e, note);
            }
        }
        Stmt::Assign { target, value } => {
            walk_expr(target, note);
            walk_expr(value, note);
        }
        Stmt::ExprStmt(e) => walk_expr(e, note),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond, note);
            then_branch.iter().for_each(|s| walk_stmt(s, note));
            if let Some(else_branch) = else_branch {
                else_branch.iter().for_each(|s| walk_stmt(s, note));
            }
        }
        Stmt::While { cond, body } => {
            walk_expr(cond, note);
            body.iter().for_each(|s| walk_stmt(s, note));
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(s) = init {
                walk_stmt(s, note);
            }
            if let Some(e) = cond {
                walk_expr(e, note);
            }
            if let Some(s) = step {
                walk_stmt(s, note);
            }
            body.iter().for_each(|s| walk_stmt(s, note));
        }
        Stmt::Return(Some(e)) => walk_expr(e, note),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
        Stmt::Block(stmts) => stmts.iter().for_each(|s| walk_stmt(s, note)),
    }
}

fn walk_expr(expr: &Expr, note: &mut impl FnMut(&str)) {
    match expr {
        Expr::New { type_name, args } => {
            note(type_name);
            args.iter().for_each(|a| walk_expr(a, note));
        }
        Expr::Cast { type_name, expr } => {
            note(type_name);
            walk_expr(expr, note);
        }
        Expr::Binary { left, right, .. } => {
            walk_expr(left, note);
            walk_expr(right, note);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, note),
        Expr::MethodCall { receiver, args, .. } => {
            if let Some(r) = receiver {
                walk_expr(r, note);
            }
            args.iter().for_each(|a| walk_expr(a, note));
        }
        Expr::FieldAccess { receiver, .. } => walk_expr(receiver, note),
        Expr::Index { array, index } => {
            walk_expr(array, note);
            walk_expr(index, note);
        }
        Expr::IntLit(_)
        | Expr::FloatLit(_)
        | Expr::BoolLit(_)
        | Expr::StringLit(_)
        | Expr::Null
        | Expr::Ident(_)
        | Expr::This => {}
    }
}
