//! Identifier Registry Module
//!
//! Collision-free name minting for the loop guard pass. Every identifier
//! declared or referenced anywhere in a chunk is reserved up front, so a
//! minted name can never collide with a user binding in any scope, with a
//! binding introduced later in the same scope, or with a previously minted
//! name. This is deliberately stronger than walking one scope chain: the
//! guard's timer bindings stay unique even across shadowing and sibling
//! scopes.

use std::collections::HashSet;

use super::ast::*;

/// Registry of names in use within one chunk
pub struct NameRegistry {
    /// Every identifier seen in the chunk plus every minted name
    reserved: HashSet<String>,
    /// Names handed out by `generate_unique`
    minted: HashSet<String>,
}

impl NameRegistry {
    /// Build a registry from all identifiers in a chunk
    pub fn collect(chunk: &Chunk) -> Self {
        let mut registry = NameRegistry {
            reserved: HashSet::new(),
            minted: HashSet::new(),
        };
        for statement in &chunk.statements {
            registry.scan_statement(statement);
        }
        registry
    }

    /// Reserve every identifier appearing in an expression, for fragments
    /// that will be spliced into the chunk
    pub fn reserve_expression(&mut self, expr: &Expression) {
        self.scan_expression(expr);
    }

    /// Mint a fresh identifier from a hint: `_hint`, then `_hint2`,
    /// `_hint3`, ... until an unused name is found
    pub fn generate_unique(&mut self, hint: &str) -> String {
        let base = format!("_{}", hint);
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while self.reserved.contains(&candidate) {
            counter += 1;
            candidate = format!("{}{}", base, counter);
        }
        self.reserved.insert(candidate.clone());
        self.minted.insert(candidate.clone());
        candidate
    }

    /// Whether a name was handed out by `generate_unique`
    pub fn was_minted(&self, name: &str) -> bool {
        self.minted.contains(name)
    }

    fn reserve(&mut self, name: &str) {
        if !self.reserved.contains(name) {
            self.reserved.insert(name.to_string());
        }
    }

    fn scan_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VarDeclaration { name, initializer } => {
                self.reserve(name);
                if let Some(initializer) = initializer {
                    self.scan_expression(initializer);
                }
            }
            Statement::Assignment { target, value } => {
                match target {
                    AssignTarget::Name(name) => self.reserve(name),
                    AssignTarget::Index { object, index } => {
                        self.scan_expression(object);
                        self.scan_expression(index);
                    }
                }
                self.scan_expression(value);
            }
            Statement::Expression(expr) => self.scan_expression(expr),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.scan_expression(condition);
                self.scan_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.scan_statement(else_branch);
                }
            }
            Statement::While {
                condition, body, ..
            } => {
                self.scan_expression(condition);
                self.scan_statement(body);
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                self.scan_statement(body);
                self.scan_expression(condition);
            }
            Statement::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.scan_statement(init);
                }
                if let Some(condition) = condition {
                    self.scan_expression(condition);
                }
                if let Some(update) = update {
                    self.scan_statement(update);
                }
                self.scan_statement(body);
            }
            Statement::Block(block) => {
                for statement in &block.statements {
                    self.scan_statement(statement);
                }
            }
            Statement::Return(Some(expr)) => self.scan_expression(expr),
            Statement::FunctionDeclaration(def) => {
                self.reserve(&def.name);
                for parameter in &def.parameters {
                    self.reserve(parameter);
                }
                for statement in &def.body.statements {
                    self.scan_statement(statement);
                }
            }
            _ => {}
        }
    }

    fn scan_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Identifier(name) => self.reserve(name),
            Expression::Array(elements) => {
                for element in elements {
                    self.scan_expression(element);
                }
            }
            Expression::Binary { left, right, .. } => {
                self.scan_expression(left);
                self.scan_expression(right);
            }
            Expression::Unary { operand, .. } => self.scan_expression(operand),
            Expression::Call { callee, arguments } => {
                self.scan_expression(callee);
                for argument in arguments {
                    self.scan_expression(argument);
                }
            }
            Expression::Member { object, .. } => self.scan_expression(object),
            Expression::Index { object, index } => {
                self.scan_expression(object);
                self.scan_expression(index);
            }
            Expression::Function(def) => {
                if let Some(name) = &def.name {
                    self.reserve(name);
                }
                for parameter in &def.parameters {
                    self.reserve(parameter);
                }
                for statement in &def.body.statements {
                    self.scan_statement(statement);
                }
            }
            Expression::Arrow { parameters, body } => {
                for parameter in parameters {
                    self.reserve(parameter);
                }
                match body {
                    ArrowBody::Expression(expr) => self.scan_expression(expr),
                    ArrowBody::Block(block) => {
                        for statement in &block.statements {
                            self.scan_statement(statement);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}
