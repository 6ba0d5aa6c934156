//! Method usage analysis: which methods, across an entry point's reachable
//! class set, are actually called — used by the orchestrator to avoid
//! lowering dead methods into an entry's unit (`spec.md §6`).

use crate::ast::{ClassDecl, Expr, Stmt};
use crate::registry::ClassRegistry;
use std::collections::{HashSet, VecDeque};

/// `(class name, method name)` pair identifying one method across the
/// reachable class set.
pub type MethodKey = (String, String);

/// Walks outward from an entry class's own methods (plus its constructor),
/// following method calls to build the set of methods actually invoked,
/// transitively, across every class in the entry's reachable set.
pub struct MethodUsageAnalyzer<'a> {
    registry: &'a ClassRegistry,
}

impl<'a> MethodUsageAnalyzer<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        MethodUsageAnalyzer { registry }
    }

    /// Compute the reachable method set starting from every method defined
    /// directly on `entry`, across `reachable_classes` (the entry's own
    /// class plus everything `ClassReferenceGraph::reachable_from` found).
    pub fn used_methods(&self, entry: &ClassDecl, reachable_classes: &HashSet<String>) -> HashSet<MethodKey> {
        let mut used = HashSet::new();
        let mut queue = VecDeque::new();

        for method in &entry.methods {
            let key = (entry.name.clone(), method.name.clone());
            if used.insert(key.clone()) {
                queue.push_back(key);
            }
        }
        if let Some(ctor) = &entry.ctor {
            for stmt in &ctor.body {
                self.collect_calls(stmt, &mut used, &mut queue);
            }
        }

        while let Some((class_name, method_name)) = queue.pop_front() {
            let Some(class) = self.registry.get(&class_name) else {
                continue;
            };
            let Some(method) = class.find_method(&method_name) else {
                continue;
            };
            for stmt in &method.body {
                self.collect_calls(stmt, &mut used, &mut queue);
            }
        }

        used.retain(|(class_name, _)| class_name == &entry.name || reachable_classes.contains(class_name));
        used
    }

    fn collect_calls(&self, stmt: &Stmt, used: &mut HashSet<MethodKey>, queue: &mut VecDeque<MethodKey>) {
        walk_stmt_calls(stmt, &mut |method_name| {
            for class in self.registry.classes() {
                if class.find_method(method_name).is_some() {
                    let key = (class.name.clone(), method_name.to_string());
                    if used.insert(key.clone()) {
                        queue.push_back(key);
                    }
                }
            }
        });
    }
}

fn walk_stmt_calls(stmt: &Stmt, on_call: &mut impl FnMut(&str)) {
    match stmt {
        Stmt::VarDecl { init: Some(e), .. } => walk_expr_calls(e, on_call),
        Stmt::VarDecl { init: None, .. } => {}
        Stmt::Assign { target, value } => {
            walk_expr_calls(target, on_call);
            walk_expr_calls(value, on_call);
        }
        Stmt::ExprStmt(e) => walk_expr_calls(e, on_call),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr_calls(cond, on_call);
            then_branch.iter().for_each(|s| walk_stmt_calls(s, on_call));
            if let Some(else_branch) = else_branch {
                else_branch.iter().for_each(|s| walk_stmt_calls(s, on_call));
            }
        }
        Stmt::While { cond, body } => {
            walk_expr_calls(cond, on_call);
            body.iter().for_each(|s| walk_stmt_calls(s, on_call));
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(s) = init {
                walk_stmt_calls(s, on_call);
            }
            if let Some(e) = cond {
                walk_expr_calls(e, on_call);
            }
            if let Some(s) = step {
                walk_stmt_calls(s, on_call);
            }
            body.iter().for_each(|s| walk_stmt_calls(s, on_call));
        }
        Stmt::Return(Some(e)) => walk_expr_calls(e, on_call),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
        Stmt::Block(stmts) => stmts.iter().for_each(|s| walk_stmt_calls(s, on_call)),
    }
}

fn walk_expr_calls(expr: &Expr, on_call: &mut impl FnMut(&str)) {
    match expr {
        Expr::MethodCall { receiver, method, args } => {
            on_call(method);
            if let Some(r) = receiver {
                walk_expr_calls(r, on_call);
            }
            args.iter().for_each(|a| walk_expr_calls(a, on_call));
        }
        Expr::New { args, .. } => args.iter().for_each(|a| walk_expr_calls(a, on_call)),
        Expr::Cast { expr, .. } => walk_expr_calls(expr, on_call),
        Expr::Binary { left, right, .. } => {
            walk_expr_calls(left, on_call);
            walk_expr_calls(right, on_call);
        }
        Expr::Unary { operand, .. } => walk_expr_calls(operand, on_call),
        Expr::FieldAccess { receiver, .. } => walk_expr_calls(receiver, on_call),
        Expr::Index { array, index } => {
            walk_expr_calls(array, on_call);
            walk_expr_calls(index, on_call);
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
