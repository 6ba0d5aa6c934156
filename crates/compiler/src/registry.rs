//! Class registry: `spec.md §2`'s merged view over every parsed class and
//! interface, spanning however many source files were given to one
//! orchestrator run.

use crate::ast::{ClassDecl, InterfaceDecl, MethodDecl, Program, PropertyDecl};
use std::collections::HashMap;

/// All classes and interfaces collected across the files passed to one
/// compilation run, keyed by name for `O(1)` lookup during inheritance
/// validation and AST-to-TAC lowering.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDecl>,
    class_order: Vec<String>,
    interfaces: HashMap<String, InterfaceDecl>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        ClassRegistry::default()
    }

    /// Merge one parsed file's classes and interfaces in. Returns the names
    /// of any classes that were already registered (a duplicate class name
    /// across files), which the caller reports as a `TypeError`.
    pub fn add_program(&mut self, program: &Program) -> Vec<String> {
        let mut duplicates = Vec::new();
        for class in &program.classes {
            if self.classes.contains_key(&class.name) {
                duplicates.push(class.name.clone());
                continue;
            }
            self.class_order.push(class.name.clone());
            self.classes.insert(class.name.clone(), class.clone());
        }
        for iface in &program.interfaces {
            self.interfaces.insert(iface.name.clone(), iface.clone());
        }
        duplicates
    }

    pub fn get(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn get_interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Classes in registration order, for deterministic reachable-set
    /// iteration in the orchestrator.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.class_order.iter().filter_map(move |name| self.classes.get(name))
    }

    /// The base-class chain for `class_name`, nearest first, stopping at the
    /// first unregistered (host) base name.
    pub fn base_chain<'a>(&'a self, class_name: &str) -> Vec<&'a ClassDecl> {
        let mut chain = Vec::new();
        let mut current = self.classes.get(class_name);
        while let Some(class) = current {
            chain.push(class);
            current = class.base.as_deref().and_then(|b| self.classes.get(b));
        }
        chain
    }

    /// The terminal base name in `class_name`'s chain that is NOT itself a
    /// registered class (i.e. a host runtime base, or `None` if the class
    /// declares no base at all).
    pub fn runtime_base(&self, class_name: &str) -> Option<String> {
        let mut current = self.classes.get(class_name)?;
        loop {
            match &current.base {
                None => return None,
                Some(base_name) => match self.classes.get(base_name) {
                    Some(next) => current = next,
                    None => return Some(base_name.clone()),
                },
            }
        }
    }

    /// Resolve a method by name, walking up `class_name`'s base chain
    /// (nearest override wins).
    pub fn resolve_method(&self, class_name: &str, method_name: &str) -> Option<&MethodDecl> {
        self.base_chain(class_name)
            .into_iter()
            .find_map(|c| c.find_method(method_name))
    }

    /// Resolve a property by name, walking up `class_name`'s base chain.
    pub fn resolve_property(&self, class_name: &str, property_name: &str) -> Option<&PropertyDecl> {
        self.base_chain(class_name)
            .into_iter()
            .find_map(|c| c.find_property(property_name))
    }

    /// All interface names `class_name` claims to implement, across its
    /// base chain.
    pub fn implemented_interfaces(&self, class_name: &str) -> Vec<String> {
        let mut names = Vec::new();
        for class in self.base_chain(class_name) {
            for iface in &class.interfaces {
                if !names.contains(iface) {
                    names.push(iface.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::new("Test.uc", 0, 0)
    }

    fn class(name: &str, base: Option<&str>) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            base: base.map(str::to_string),
            interfaces: vec![],
            decorators: vec![],
            properties: vec![],
            methods: vec![],
            ctor: None,
            location: loc(),
        }
    }

    #[test]
    fn merges_programs_and_detects_duplicates() {
        let mut registry = ClassRegistry::new();
        let mut p1 = Program::new("a.uc");
        p1.classes.push(class("Foo", None));
        let mut p2 = Program::new("b.uc");
        p2.classes.push(class("Foo", None));
        p2.classes.push(class("Bar", None));

        assert!(registry.add_program(&p1).is_empty());
        let dups = registry.add_program(&p2);
        assert_eq!(dups, vec!["Foo".to_string()]);
        assert!(registry.contains("Bar"));
    }

    #[test]
    fn base_chain_walks_to_host_runtime_base() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(class("Base", Some("UdonSharpBehaviour")));
        p.classes.push(class("Derived", Some("Base")));
        registry.add_program(&p);

        let chain: Vec<_> = registry.base_chain("Derived").iter().map(|c| c.name.clone()).collect();
        assert_eq!(chain, vec!["Derived".to_string(), "Base".to_string()]);
        assert_eq!(
            registry.runtime_base("Derived"),
            Some("UdonSharpBehaviour".to_string())
        );
    }

    #[test]
    fn method_resolution_honors_overrides() {
        let mut registry = ClassRegistry::new();
        let mut base = class("Base", None);
        base.methods.push(MethodDecl {
            name: "Speak".to_string(),
            access: crate::ast::Access::Public,
            is_static: false,
            return_type: "void".to_string(),
            params: vec![],
            body: vec![],
            location: loc(),
        });
        let derived = class("Derived", Some("Base"));
        let mut p = Program::new("a.uc");
        p.classes.push(base);
        p.classes.push(derived);
        registry.add_program(&p);

        assert!(registry.resolve_method("Derived", "Speak").is_some());
        assert!(registry.resolve_method("Derived", "Missing").is_none());
    }
}
