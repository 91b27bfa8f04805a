//! Read-only AST traversal and the statement-splicing helper the rewriting
//! passes are built on.
//!
//! Traversal order: statements pre-order, expressions post-order (children
//! first), matching what the rewrites expect.

use crate::ast::{Block, Expression, FunctionCall, Statement};

pub trait Visitor {
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    /// Called for every declared or referenced name: variable declarations,
    /// assignment targets, identifiers, function names, parameters, return
    /// variables and callee names.
    fn visit_name(&mut self, _name: &str) {}
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for statement in &block.statements {
        visitor.visit_statement(statement);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Block(block) => visitor.visit_block(block),
        Statement::VariableDeclaration(decl) => {
            for name in &decl.variables {
                visitor.visit_name(name);
            }
            if let Some(value) = &decl.value {
                visitor.visit_expression(value);
            }
        }
        Statement::Assignment(assignment) => {
            for name in &assignment.targets {
                visitor.visit_name(name);
            }
            visitor.visit_expression(&assignment.value);
        }
        Statement::Expression(call) => walk_call(visitor, call),
        Statement::If(if_st) => {
            visitor.visit_expression(&if_st.condition);
            visitor.visit_block(&if_st.body);
        }
        Statement::Switch(switch) => {
            visitor.visit_expression(&switch.expression);
            for case in &switch.cases {
                visitor.visit_block(&case.body);
            }
            if let Some(default) = &switch.default {
                visitor.visit_block(default);
            }
        }
        Statement::ForLoop(for_loop) => {
            visitor.visit_block(&for_loop.pre);
            visitor.visit_expression(&for_loop.condition);
            visitor.visit_block(&for_loop.post);
            visitor.visit_block(&for_loop.body);
        }
        Statement::Break | Statement::Continue | Statement::Leave => {}
        Statement::FunctionDefinition(function) => {
            visitor.visit_name(&function.name);
            for name in function.parameters.iter().chain(&function.returns) {
                visitor.visit_name(name);
            }
            visitor.visit_block(&function.body);
        }
    }
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::Literal(_) => {}
        Expression::Identifier(identifier) => visitor.visit_name(&identifier.name),
        Expression::FunctionCall(call) => walk_call(visitor, call),
    }
}

fn walk_call<V: Visitor + ?Sized>(visitor: &mut V, call: &FunctionCall) {
    for argument in &call.arguments {
        visitor.visit_expression(argument);
    }
    visitor.visit_name(&call.name);
}

/// Replaces each statement of `block` with the sequence `f` returns for it,
/// spliced in at the statement's position. Nested blocks are not visited;
/// rewrites recurse themselves.
pub fn replace_statements(block: &mut Block, mut f: impl FnMut(Statement) -> Vec<Statement>) {
    let old = std::mem::take(&mut block.statements);
    let mut statements = Vec::with_capacity(old.len());
    for statement in old {
        statements.extend(f(statement));
    }
    block.statements = statements;
}
