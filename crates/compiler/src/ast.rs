//! Abstract Syntax Tree for the decorated-class source language.
//!
//! Sufficient for the restricted static subset `spec.md §4.2` describes:
//! decorated classes with properties, methods, a constructor, and
//! file-scoped top-level constants. See `SPEC_FULL.md §4.2` for the
//! concrete surface grammar this AST is parsed from.

use std::path::PathBuf;

/// Source location for error reporting and tooling (teacher idiom:
/// `ast::SourceLocation`, simplified to a single point since this
/// language's statements don't span multiple lines the way Seq quotations
/// do).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// 0-indexed line.
    pub line: usize,
    /// 0-indexed column.
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line + 1, self.column + 1)
    }
}

/// Access modifier on a property or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
    Protected,
}

/// A `@Name(args...)` decorator attached to a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<String>,
}

/// The decorator name identifying an entry-point class, per `spec.md §4.2`.
pub const ENTRY_DECORATOR: &str = "Entry";

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

/// A property declaration: `accessMod type name [= initializer];`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub type_name: String,
    pub access: Access,
    pub is_static: bool,
    pub initializer: Option<Expr>,
    pub location: SourceLocation,
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub access: Access,
    pub is_static: bool,
    pub return_type: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// A constructor declaration. Synthesized as parameterless when a class
/// declares none, per `spec.md §4.3`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub base: Option<String>,
    pub interfaces: Vec<String>,
    pub decorators: Vec<Decorator>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    pub ctor: Option<ConstructorDecl>,
    pub location: SourceLocation,
}

impl ClassDecl {
    pub fn is_entry(&self) -> bool {
        self.decorators.iter().any(|d| d.name == ENTRY_DECORATOR)
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// An interface declaration: a name plus the method signatures
/// implementors must provide.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethodSig {
    pub name: String,
    pub return_type: String,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<InterfaceMethodSig>,
    pub location: SourceLocation,
}

/// A file-scoped top-level constant, exposed as an exported local variable
/// when reachable from an entry point (`spec.md §4.3`).
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevelConst {
    pub name: String,
    pub type_name: String,
    pub value: Expr,
    pub location: SourceLocation,
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub file: PathBuf,
    pub classes: Vec<ClassDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub consts: Vec<TopLevelConst>,
}

impl Program {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Program {
            file: file.into(),
            ..Default::default()
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Null,
    Ident(String),
    This,
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Cast {
        type_name: String,
        expr: Box<Expr>,
    },
    New {
        type_name: String,
        args: Vec<Expr>,
    },
    /// `receiver.method(args)`; `receiver = None` for an implicit `this.`
    /// call to a method of the enclosing class or an inline-class helper.
    MethodCall {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
}

/// Statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        type_name: String,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    ExprStmt(Expr),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Block(Vec<Stmt>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("Test.uc", 0, 0)
    }

    #[test]
    fn entry_decorator_detected() {
        let class = ClassDecl {
            name: "MyBehaviour".to_string(),
            base: Some("UdonSharpBehaviour".to_string()),
            interfaces: vec![],
            decorators: vec![Decorator {
                name: ENTRY_DECORATOR.to_string(),
                args: vec![],
            }],
            properties: vec![],
            methods: vec![],
            ctor: None,
            location: loc(),
        };
        assert!(class.is_entry());
    }

    #[test]
    fn non_entry_class_is_inline() {
        let class = ClassDecl {
            name: "Helper".to_string(),
            base: None,
            interfaces: vec![],
            decorators: vec![],
            properties: vec![],
            methods: vec![],
            ctor: None,
            location: loc(),
        };
        assert!(!class.is_entry());
    }

    #[test]
    fn find_method_and_property() {
        let class = ClassDecl {
            name: "C".to_string(),
            base: None,
            interfaces: vec![],
            decorators: vec![],
            properties: vec![PropertyDecl {
                name: "x".to_string(),
                type_name: "int".to_string(),
                access: Access::Public,
                is_static: false,
                initializer: None,
                location: loc(),
            }],
            methods: vec![MethodDecl {
                name: "DoThing".to_string(),
                access: Access::Public,
                is_static: false,
                return_type: "void".to_string(),
                params: vec![],
                body: vec![],
                location: loc(),
            }],
            ctor: None,
            location: loc(),
        };
        assert!(class.find_property("x").is_some());
        assert!(class.find_property("y").is_none());
        assert!(class.find_method("DoThing").is_some());
    }
}
