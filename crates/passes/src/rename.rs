//! Scope-aware renaming engine shared by the disambiguator and the name
//! displacer.
//!
//! A policy callback decides, per binding occurrence, whether the binding
//! gets a new name; every reference that resolves to the binding is renamed
//! consistently. Function names bind for their whole enclosing block, so
//! each block is pre-scanned for definitions before its statements are
//! walked.

use sasm_data::{Block, Expression, FunctionCall, Statement};
use std::collections::HashMap;

pub(crate) struct Renamer<F: FnMut(&str) -> Option<String>> {
    decide: F,
    scopes: Vec<HashMap<String, String>>,
}

impl<F: FnMut(&str) -> Option<String>> Renamer<F> {
    pub(crate) fn new(decide: F) -> Self {
        Self { decide, scopes: Vec::new() }
    }

    pub(crate) fn rewrite_block(&mut self, block: &mut Block) {
        self.scopes.push(HashMap::new());
        self.bind_functions(block);
        for statement in &mut block.statements {
            self.rewrite_statement(statement);
        }
        self.scopes.pop();
    }

    fn bind_functions(&mut self, block: &Block) {
        let names: Vec<String> = block
            .statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::FunctionDefinition(function) => Some(function.name.clone()),
                _ => None,
            })
            .collect();
        for name in names {
            self.bind(&name);
        }
    }

    fn bind(&mut self, name: &str) -> String {
        let resolved = (self.decide)(name).unwrap_or_else(|| name.to_string());
        self.scopes
            .last_mut()
            .expect("scope present")
            .insert(name.to_string(), resolved.clone());
        resolved
    }

    fn resolve(&self, name: &str) -> Option<String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    fn rewrite_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Block(block) => self.rewrite_block(block),
            Statement::VariableDeclaration(decl) => {
                // The initializer refers to the outer environment.
                if let Some(value) = &mut decl.value {
                    self.rewrite_expression(value);
                }
                for name in &mut decl.variables {
                    *name = self.bind(name);
                }
            }
            Statement::Assignment(assignment) => {
                self.rewrite_expression(&mut assignment.value);
                for target in &mut assignment.targets {
                    if let Some(new) = self.resolve(target) {
                        *target = new;
                    }
                }
            }
            Statement::Expression(call) => self.rewrite_call(call),
            Statement::If(if_st) => {
                self.rewrite_expression(&mut if_st.condition);
                self.rewrite_block(&mut if_st.body);
            }
            Statement::Switch(switch) => {
                self.rewrite_expression(&mut switch.expression);
                for case in &mut switch.cases {
                    self.rewrite_block(&mut case.body);
                }
                if let Some(default) = &mut switch.default {
                    self.rewrite_block(default);
                }
            }
            Statement::ForLoop(for_loop) => {
                // Declarations in the init block scope over all four parts.
                self.scopes.push(HashMap::new());
                self.bind_functions(&for_loop.pre);
                for statement in &mut for_loop.pre.statements {
                    self.rewrite_statement(statement);
                }
                self.rewrite_expression(&mut for_loop.condition);
                self.rewrite_block(&mut for_loop.post);
                self.rewrite_block(&mut for_loop.body);
                self.scopes.pop();
            }
            Statement::Break | Statement::Continue | Statement::Leave => {}
            Statement::FunctionDefinition(function) => {
                if let Some(new) = self.resolve(&function.name) {
                    function.name = new;
                }
                self.scopes.push(HashMap::new());
                for name in function.parameters.iter_mut().chain(&mut function.returns) {
                    *name = self.bind(name);
                }
                self.rewrite_block(&mut function.body);
                self.scopes.pop();
            }
        }
    }

    fn rewrite_expression(&mut self, expression: &mut Expression) {
        match expression {
            Expression::Literal(_) => {}
            Expression::Identifier(identifier) => {
                if let Some(new) = self.resolve(&identifier.name) {
                    identifier.name = new;
                }
            }
            Expression::FunctionCall(call) => self.rewrite_call(call),
        }
    }

    fn rewrite_call(&mut self, call: &mut FunctionCall) {
        for argument in &mut call.arguments {
            self.rewrite_expression(argument);
        }
        if let Some(new) = self.resolve(&call.name) {
            call.name = new;
        }
    }
}
