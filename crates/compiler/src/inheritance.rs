//! Inheritance validation: `spec.md §2`'s structural checks run before
//! lowering — every entry class's base chain must terminate at the expected
//! runtime base, and every interface a class claims must be fully
//! implemented somewhere in its base chain.

use crate::ast::ClassDecl;
use crate::error::{CompileError, ErrorKind};
use crate::registry::ClassRegistry;

/// The runtime base every `@Entry` class must ultimately derive from.
pub const REQUIRED_ENTRY_BASE: &str = "UdonSharpBehaviour";

pub struct InheritanceValidator<'a> {
    registry: &'a ClassRegistry,
}

impl<'a> InheritanceValidator<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        InheritanceValidator { registry }
    }

    /// Validate every registered class; accumulates all failures rather
    /// than stopping at the first.
    pub fn validate_all(&self) -> Vec<CompileError> {
        let mut errors = Vec::new();
        for class in self.registry.classes() {
            if class.is_entry() {
                if let Err(e) = self.validate_entry_base(class) {
                    errors.push(e);
                }
            }
            errors.extend(self.validate_interfaces(class));
            if let Some(cycle) = self.detect_cycle(class) {
                errors.push(CompileError::new(
                    ErrorKind::TypeError,
                    format!("circular base-class chain detected: {}", cycle.join(" -> ")),
                    class.location.file.clone(),
                    class.location.line,
                    class.location.column,
                ));
            }
        }
        errors
    }

    /// An `@Entry` class's base chain must terminate at
    /// [`REQUIRED_ENTRY_BASE`], possibly through intermediate registered
    /// classes.
    fn validate_entry_base(&self, class: &ClassDecl) -> Result<(), CompileError> {
        match self.registry.runtime_base(&class.name) {
            Some(base) if base == REQUIRED_ENTRY_BASE => Ok(()),
            Some(other) => Err(self.error(
                class,
                format!(
                    "entry class `{}` must derive from `{REQUIRED_ENTRY_BASE}`, but its base chain terminates at `{other}`",
                    class.name
                ),
            )),
            None => Err(self.error(
                class,
                format!(
                    "entry class `{}` must derive from `{REQUIRED_ENTRY_BASE}`",
                    class.name
                ),
            )),
        }
    }

    /// Every interface a class (or one of its bases) names must have every
    /// one of its methods implemented somewhere in the same base chain.
    fn validate_interfaces(&self, class: &ClassDecl) -> Vec<CompileError> {
        let mut errors = Vec::new();
        for iface_name in self.registry.implemented_interfaces(&class.name) {
            let Some(iface) = self.registry.get_interface(&iface_name) else {
                errors.push(self.error(
                    class,
                    format!("class `{}` implements unknown interface `{iface_name}`", class.name),
                ));
                continue;
            };
            for method_sig in &iface.methods {
                let satisfied = self
                    .registry
                    .resolve_method(&class.name, &method_sig.name)
                    .map(|m| m.params.len() == method_sig.params.len())
                    .unwrap_or(false);
                if !satisfied {
                    errors.push(
                        self.error(
                            class,
                            format!(
                                "class `{}` does not implement `{}.{}`",
                                class.name, iface_name, method_sig.name
                            ),
                        )
                        .with_suggestion(format!(
                            "add a method `{} {}(...)` to `{}`",
                            method_sig.return_type, method_sig.name, class.name
                        )),
                    );
                }
            }
        }
        errors
    }

    fn detect_cycle(&self, class: &ClassDecl) -> Option<Vec<String>> {
        let mut seen = vec![class.name.clone()];
        let mut current = class.base.clone();
        while let Some(base_name) = current {
            if seen.contains(&base_name) {
                seen.push(base_name);
                return Some(seen);
            }
            seen.push(base_name.clone());
            current = self.registry.get(&base_name).and_then(|c| c.base.clone());
        }
        None
    }

    fn error(&self, class: &ClassDecl, message: impl Into<String>) -> CompileError {
        CompileError::new(
            ErrorKind::TypeError,
            message,
            class.location.file.clone(),
            class.location.line,
            class.location.column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Access, Decorator, InterfaceMethodSig, MethodDecl, Param, Program, SourceLocation, ENTRY_DECORATOR};
    use crate::ast::InterfaceDecl;

    fn loc() -> SourceLocation {
        SourceLocation::new("Test.uc", 0, 0)
    }

    fn class(name: &str, base: Option<&str>, entry: bool) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            base: base.map(str::to_string),
            interfaces: vec![],
            decorators: if entry {
                vec![Decorator {
                    name: ENTRY_DECORATOR.to_string(),
                    args: vec![],
                }]
            } else {
                vec![]
            },
            properties: vec![],
            methods: vec![],
            ctor: None,
            location: loc(),
        }
    }

    #[test]
    fn entry_class_with_correct_base_passes() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(class("MyBehaviour", Some("UdonSharpBehaviour"), true));
        registry.add_program(&p);
        let errors = InheritanceValidator::new(&registry).validate_all();
        assert!(errors.is_empty());
    }

    #[test]
    fn entry_class_with_wrong_base_fails() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(class("MyBehaviour", Some("System.Object"), true));
        registry.add_program(&p);
        let errors = InheritanceValidator::new(&registry).validate_all();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TypeError);
    }

    #[test]
    fn unimplemented_interface_method_fails() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        let mut c = class("MyBehaviour", Some("UdonSharpBehaviour"), true);
        c.interfaces.push("IDamageable".to_string());
        p.classes.push(c);
        p.interfaces.push(InterfaceDecl {
            name: "IDamageable".to_string(),
            methods: vec![InterfaceMethodSig {
                name: "TakeDamage".to_string(),
                return_type: "void".to_string(),
                params: vec![Param {
                    name: "amount".to_string(),
                    type_name: "int".to_string(),
                }],
            }],
            location: loc(),
        });
        registry.add_program(&p);
        let errors = InheritanceValidator::new(&registry).validate_all();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("TakeDamage"));
    }

    #[test]
    fn implemented_interface_method_passes() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        let mut c = class("MyBehaviour", Some("UdonSharpBehaviour"), true);
        c.interfaces.push("IDamageable".to_string());
        c.methods.push(MethodDecl {
            name: "TakeDamage".to_string(),
            access: Access::Public,
            is_static: false,
            return_type: "void".to_string(),
            params: vec![Param {
                name: "amount".to_string(),
                type_name: "int".to_string(),
            }],
            body: vec![],
            location: loc(),
        });
        p.classes.push(c);
        p.interfaces.push(InterfaceDecl {
            name: "IDamageable".to_string(),
            methods: vec![InterfaceMethodSig {
                name: "TakeDamage".to_string(),
                return_type: "void".to_string(),
                params: vec![Param {
                    name: "amount".to_string(),
                    type_name: "int".to_string(),
                }],
            }],
            location: loc(),
        });
        registry.add_program(&p);
        let errors = InheritanceValidator::new(&registry).validate_all();
        assert!(errors.is_empty());
    }

    #[test]
    fn circular_base_chain_detected() {
        let mut registry = ClassRegistry::new();
        let mut p = Program::new("a.uc");
        p.classes.push(class("A", Some("B"), false));
        p.classes.push(class("B", Some("A"), false));
        registry.add_program(&p);
        let errors = InheritanceValidator::new(&registry).validate_all();
        assert!(errors.iter().any(|e| e.message.contains("circular")));
    }
}
