//! Recursive-descent parser for the decorated-class source language.
//!
//! Syntax (see `SPEC_FULL.md §4.2` for the full grammar):
//! ```text
//! const int MAX_HEALTH = 100;
//!
//! interface IDamageable {
//!     void TakeDamage(int amount);
//! }
//!
//! @Entry
//! class MyBehaviour : UdonSharpBehaviour, IDamageable {
//!     public int health = 100;
//!
//!     public void TakeDamage(int amount) {
//!         health -= amount;
//!     }
//! }
//! ```

use crate::ast::{
    Access, BinOp, ClassDecl, ConstructorDecl, Decorator, Expr, InterfaceDecl, InterfaceMethodSig,
    MethodDecl, Param, Program, PropertyDecl, SourceLocation, Stmt, TopLevelConst, UnOp,
};
use crate::error::{CompileError, ErrorKind};
use crate::lexer::{tokenize, Token, TokenKind};
use std::path::{Path, PathBuf};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: PathBuf,
}

impl Parser {
    pub fn new(source: &str, file: impl Into<PathBuf>) -> Self {
        Parser {
            tokens: tokenize(source),
            pos: 0,
            file: file.into(),
        }
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut program = Program::new(self.file.clone());
        while !self.is_eof() {
            if self.check(&TokenKind::At) || self.check(&TokenKind::Class) {
                program.classes.push(self.parse_class()?);
            } else if self.check(&TokenKind::Interface) {
                program.interfaces.push(self.parse_interface()?);
            } else if self.check(&TokenKind::Const) {
                program.consts.push(self.parse_top_level_const()?);
            } else {
                return Err(self.error(
                    ErrorKind::UnsupportedSyntax,
                    format!("expected a class, interface, or const declaration, found {:?}", self.current().kind),
                ));
            }
        }
        Ok(program)
    }

    // ---- declarations ----

    fn parse_class(&mut self) -> Result<ClassDecl, CompileError> {
        let mut decorators = Vec::new();
        while self.consume(&TokenKind::At) {
            decorators.push(self.parse_decorator()?);
        }
        let location = self.here();
        self.expect(&TokenKind::Class)?;
        let name = self.expect_ident()?;
        let mut base = None;
        let mut interfaces = Vec::new();
        if self.consume(&TokenKind::Colon) {
            base = Some(self.expect_ident()?);
            while self.consume(&TokenKind::Comma) {
                interfaces.push(self.expect_ident()?);
            }
        }
        self.expect(&TokenKind::LBrace)?;

        let mut properties = Vec::new();
        let mut methods = Vec::new();
        let mut ctor = None;
        while !self.check(&TokenKind::RBrace) {
            let member_loc = self.here();
            let access = self.parse_access();
            let is_static = self.consume(&TokenKind::Static);

            if self.check_ident(&name) && self.peek_is(1, &TokenKind::LParen) {
                // Constructor: `Name(params) { ... }`.
                self.advance();
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                ctor = Some(ConstructorDecl {
                    params,
                    body,
                    location: member_loc,
                });
                continue;
            }

            let type_name = self.parse_type_name()?;
            let member_name = self.expect_ident()?;
            if self.check(&TokenKind::LParen) {
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                methods.push(MethodDecl {
                    name: member_name,
                    access,
                    is_static,
                    return_type: type_name,
                    params,
                    body,
                    location: member_loc,
                });
            } else {
                let initializer = if self.consume(&TokenKind::Eq) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semi)?;
                properties.push(PropertyDecl {
                    name: member_name,
                    type_name,
                    access,
                    is_static,
                    initializer,
                    location: member_loc,
                });
            }
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(ClassDecl {
            name,
            base,
            interfaces,
            decorators,
            properties,
            methods,
            ctor,
            location,
        })
    }

    fn parse_decorator(&mut self) -> Result<Decorator, CompileError> {
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.consume(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) {
                args.push(self.parse_decorator_arg()?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(Decorator { name, args })
    }

    fn parse_decorator_arg(&mut self) -> Result<String, CompileError> {
        match &self.current().kind {
            TokenKind::StringLit(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            TokenKind::IntLit(n) => {
                let s = n.to_string();
                self.advance();
                Ok(s)
            }
            TokenKind::Ident(name) => {
                let s = name.clone();
                self.advance();
                Ok(s)
            }
            other => Err(self.error(
                ErrorKind::UnsupportedSyntax,
                format!("expected a decorator argument, found {other:?}"),
            )),
        }
    }

    fn parse_interface(&mut self) -> Result<InterfaceDecl, CompileError> {
        let location = self.here();
        self.expect(&TokenKind::Interface)?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let return_type = self.parse_type_name()?;
            let method_name = self.expect_ident()?;
            let params = self.parse_params()?;
            self.expect(&TokenKind::Semi)?;
            methods.push(InterfaceMethodSig {
                name: method_name,
                return_type,
                params,
            });
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(InterfaceDecl {
            name,
            methods,
            location,
        })
    }

    fn parse_top_level_const(&mut self) -> Result<TopLevelConst, CompileError> {
        let location = self.here();
        self.expect(&TokenKind::Const)?;
        let type_name = self.parse_type_name()?;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::Semi)?;
        Ok(TopLevelConst {
            name,
            type_name,
            value,
            location,
        })
    }

    fn parse_access(&mut self) -> Access {
        if self.consume(&TokenKind::Public) {
            Access::Public
        } else if self.consume(&TokenKind::Private) {
            Access::Private
        } else if self.consume(&TokenKind::Protected) {
            Access::Protected
        } else {
            Access::Public
        }
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let type_name = self.parse_type_name()?;
            let name = self.expect_ident()?;
            params.push(Param { name, type_name });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    /// `Name`, `Name[]`, `Name[][]`, ...
    fn parse_type_name(&mut self) -> Result<String, CompileError> {
        let mut name = self.expect_ident()?;
        while self.check(&TokenKind::LBracket) && self.peek_is(1, &TokenKind::RBracket) {
            self.advance();
            self.advance();
            name.push_str("[]");
        }
        Ok(name)
    }

    // ---- statements ----

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(&TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        match &self.current().kind {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&TokenKind::Semi)?;
                Ok(Stmt::Return(value))
            }
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semi)?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semi)?;
                Ok(Stmt::Continue)
            }
            _ => self.parse_simple_stmt(),
        }
    }

    /// Disambiguates a var-decl (`Type name [= expr];`) from an
    /// assignment/expression statement by speculatively trying the
    /// var-decl shape first (teacher idiom: `parser::parse_statement`'s
    /// leading-token dispatch, adapted since this grammar's statements
    /// aren't uniformly keyword-prefixed).
    fn parse_simple_stmt(&mut self) -> Result<Stmt, CompileError> {
        if let TokenKind::Ident(_) = &self.current().kind {
            if self.looks_like_var_decl() {
                let type_name = self.parse_type_name()?;
                let name = self.expect_ident()?;
                let init = if self.consume(&TokenKind::Eq) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(&TokenKind::Semi)?;
                return Ok(Stmt::VarDecl {
                    name,
                    type_name,
                    init,
                });
            }
        }

        let expr = self.parse_expr()?;
        let stmt = if let Some(op) = self.compound_assign_op() {
            self.advance();
            let rhs = self.parse_expr()?;
            let value = Expr::Binary {
                op,
                left: Box::new(expr.clone()),
                right: Box::new(rhs),
            };
            Stmt::Assign {
                target: expr,
                value,
            }
        } else if self.consume(&TokenKind::Eq) {
            let value = self.parse_expr()?;
            Stmt::Assign {
                target: expr,
                value,
            }
        } else {
            Stmt::ExprStmt(expr)
        };
        self.expect(&TokenKind::Semi)?;
        Ok(stmt)
    }

    fn compound_assign_op(&self) -> Option<BinOp> {
        match &self.current().kind {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            _ => None,
        }
    }

    /// Peeks ahead for `Ident Ident (= | ;)`, the only shape a var-decl can
    /// take, without committing to consuming tokens.
    fn looks_like_var_decl(&self) -> bool {
        let mut offset = 1;
        while self.peek_is(offset, &TokenKind::LBracket) && self.peek_is(offset + 1, &TokenKind::RBracket) {
            offset += 2;
        }
        matches!(self.peek_kind(offset), Some(TokenKind::Ident(_)))
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = self.parse_block_or_stmt()?;
        let else_branch = if self.consume(&TokenKind::Else) {
            Some(self.parse_block_or_stmt()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;
        let init = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        if init.is_none() {
            self.expect(&TokenKind::Semi)?;
        }
        let cond = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semi)?;
        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_step_stmt()?))
        };
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block_or_stmt()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    /// A `for(...)` step clause has no trailing `;` of its own.
    fn parse_step_stmt(&mut self) -> Result<Stmt, CompileError> {
        let expr = self.parse_expr()?;
        if let Some(op) = self.compound_assign_op() {
            self.advance();
            let rhs = self.parse_expr()?;
            let value = Expr::Binary {
                op,
                left: Box::new(expr.clone()),
                right: Box::new(rhs),
            };
            return Ok(Stmt::Assign {
                target: expr,
                value,
            });
        }
        if self.consume(&TokenKind::Eq) {
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
            });
        }
        Ok(Stmt::ExprStmt(expr))
    }

    fn parse_block_or_stmt(&mut self) -> Result<Vec<Stmt>, CompileError> {
        if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    // ---- expressions (precedence climbing, lowest to highest) ----

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.consume(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_bit_or()?;
        while self.consume(&TokenKind::AndAnd) {
            let right = self.parse_bit_or()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_bit_xor()?;
        while self.consume(&TokenKind::Pipe) {
            let right = self.parse_bit_xor()?;
            left = Expr::Binary {
                op: BinOp::BitOr,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_bit_and()?;
        while self.consume(&TokenKind::Caret) {
            let right = self.parse_bit_and()?;
            left = Expr::Binary {
                op: BinOp::BitXor,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.consume(&TokenKind::Amp) {
            let right = self.parse_equality()?;
            left = Expr::Binary {
                op: BinOp::BitAnd,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.consume(&TokenKind::EqEq) {
                BinOp::Eq
            } else if self.consume(&TokenKind::NotEq) {
                BinOp::Neq
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = if self.consume(&TokenKind::Lt) {
                BinOp::Lt
            } else if self.consume(&TokenKind::Gt) {
                BinOp::Gt
            } else if self.consume(&TokenKind::LtEq) {
                BinOp::Le
            } else if self.consume(&TokenKind::GtEq) {
                BinOp::Ge
            } else {
                break;
            };
            let right = self.parse_shift()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.consume(&TokenKind::ShiftL) {
                BinOp::Shl
            } else if self.consume(&TokenKind::ShiftR) {
                BinOp::Shr
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.consume(&TokenKind::Plus) {
                BinOp::Add
            } else if self.consume(&TokenKind::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.consume(&TokenKind::Star) {
                BinOp::Mul
            } else if self.consume(&TokenKind::Slash) {
                BinOp::Div
            } else if self.consume(&TokenKind::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if self.consume(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.consume(&TokenKind::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
            });
        }
        if self.consume(&TokenKind::Tilde) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnOp::BitNot,
                operand: Box::new(operand),
            });
        }
        if self.check(&TokenKind::LParen) && self.is_cast_ahead() {
            self.advance();
            let type_name = self.parse_type_name()?;
            self.expect(&TokenKind::RParen)?;
            let expr = self.parse_unary()?;
            return Ok(Expr::Cast {
                type_name,
                expr: Box::new(expr),
            });
        }
        self.parse_postfix()
    }

    /// `( Ident )` immediately followed by something that can only start an
    /// expression, not a parenthesized expression's closing context.
    fn is_cast_ahead(&self) -> bool {
        if !matches!(self.peek_kind(1), Some(TokenKind::Ident(_))) {
            return false;
        }
        let mut offset = 2;
        while self.peek_is(offset, &TokenKind::LBracket) && self.peek_is(offset + 1, &TokenKind::RBracket) {
            offset += 2;
        }
        self.peek_is(offset, &TokenKind::RParen)
            && matches!(
                self.peek_kind(offset + 1),
                Some(TokenKind::Ident(_))
                    | Some(TokenKind::IntLit(_))
                    | Some(TokenKind::FloatLit(_))
                    | Some(TokenKind::StringLit(_))
                    | Some(TokenKind::This)
                    | Some(TokenKind::LParen)
            )
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.consume(&TokenKind::Dot) {
                let member = self.expect_ident()?;
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    expr = Expr::MethodCall {
                        receiver: Some(Box::new(expr)),
                        method: member,
                        args,
                    };
                } else {
                    expr = Expr::FieldAccess {
                        receiver: Box::new(expr),
                        field: member,
                    };
                }
            } else if self.consume(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                expr = Expr::Index {
                    array: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.current().kind.clone() {
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::IntLit(n))
            }
            TokenKind::FloatLit(n) => {
                self.advance();
                Ok(Expr::FloatLit(n))
            }
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Expr::StringLit(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLit(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLit(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::New => {
                self.advance();
                let type_name = self.parse_type_name()?;
                let args = self.parse_args()?;
                Ok(Expr::New { type_name, args })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::MethodCall {
                        receiver: None,
                        method: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(self.error(
                ErrorKind::UnsupportedSyntax,
                format!("expected an expression, found {other:?}"),
            )),
        }
    }

    // ---- token-stream helpers ----

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn here(&self) -> SourceLocation {
        let t = self.current();
        SourceLocation::new(self.file.clone(), t.line, t.column)
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(n) if n == name)
    }

    fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind.clone())
    }

    fn peek_is(&self, offset: usize, kind: &TokenKind) -> bool {
        self.peek_kind(offset).as_ref() == Some(kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_eof() {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), CompileError> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.error(
                ErrorKind::UnsupportedSyntax,
                format!("expected {kind:?}, found {:?}", self.current().kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(
                ErrorKind::UnsupportedSyntax,
                format!("expected an identifier, found {other:?}"),
            )),
        }
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> CompileError {
        let t = self.current();
        CompileError::new(kind, message, self.file.clone(), t.line, t.column)
    }
}

pub fn parse_source(source: &str, file: impl AsRef<Path>) -> Result<Program, CompileError> {
    Parser::new(source, file.as_ref().to_path_buf()).parse()
}
