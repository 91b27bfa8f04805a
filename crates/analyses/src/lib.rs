//! Static analysis for structured assembly.
//!
//! Checks an AST against a dialect: scoping, call arity, value counts,
//! literal width and loop-control placement. All violations are collected
//! and returned together rather than stopping at the first.

use alloy_primitives::U256;
use sasm_data::{
    Block, Dialect, Expression, FunctionCall, Object, ObjectMember, Statement, Switch,
};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("use of undeclared variable `{0}`")]
    UndeclaredVariable(String),
    #[error("variable `{0}` redeclared in the same scope")]
    DuplicateVariable(String),
    #[error("function `{0}` defined more than once in the same block")]
    DuplicateFunction(String),
    #[error("call to unknown function `{0}`")]
    UnknownFunction(String),
    #[error("function `{name}` takes {expected} arguments, got {found}")]
    ArityMismatch { name: String, expected: usize, found: usize },
    #[error("expected {expected} values, got {found}")]
    ValueCountMismatch { expected: usize, found: usize },
    #[error("literal {value} does not fit a {word_bits}-bit word")]
    LiteralTooWide { value: U256, word_bits: u32 },
    #[error("`{0}` outside of a loop body")]
    LoopControlOutsideLoop(&'static str),
    #[error("duplicate switch case {0}")]
    DuplicateCase(U256),
}

/// Accumulated analyzer diagnostics, formatted one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<AnalysisError>);

impl std::error::Error for Diagnostics {}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Analyzes a code block against `dialect`.
pub fn analyze_block(dialect: &Dialect, block: &Block) -> Result<(), Diagnostics> {
    let mut analyzer = Analyzer::new(dialect);
    analyzer.enter_block(block, ScopeKind::Plain);
    if analyzer.errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(dialect = dialect.name, errors = analyzer.errors.len(), "analysis failed");
        Err(Diagnostics(analyzer.errors))
    }
}

/// Analyzes an object and all of its subobjects.
pub fn analyze_object(dialect: &Dialect, object: &Object) -> Result<(), Diagnostics> {
    let mut errors = Vec::new();
    collect_object_errors(dialect, object, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(Diagnostics(errors)) }
}

fn collect_object_errors(dialect: &Dialect, object: &Object, errors: &mut Vec<AnalysisError>) {
    if let Err(Diagnostics(mut block_errors)) = analyze_block(dialect, &object.code) {
        errors.append(&mut block_errors);
    }
    for member in &object.subobjects {
        if let ObjectMember::Object(subobject) = member {
            collect_object_errors(dialect, subobject, errors);
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ScopeKind {
    Plain,
    /// Function bodies cannot see outer variables.
    FunctionBody,
}

struct Scope {
    variables: HashSet<String>,
    /// Variable lookups stop here; function lookups continue outwards.
    barrier: bool,
}

struct Analyzer<'a> {
    dialect: &'a Dialect,
    scopes: Vec<Scope>,
    /// Function signatures per enclosing block, innermost last. A block's
    /// functions are visible everywhere inside it, including before their
    /// definition.
    functions: Vec<HashMap<String, (usize, usize)>>,
    loop_depth: usize,
    errors: Vec<AnalysisError>,
}

impl<'a> Analyzer<'a> {
    fn new(dialect: &'a Dialect) -> Self {
        Self { dialect, scopes: Vec::new(), functions: Vec::new(), loop_depth: 0, errors: Vec::new() }
    }

    fn enter_block(&mut self, block: &Block, kind: ScopeKind) {
        self.push_scope(kind);
        self.register_functions(block);
        for statement in &block.statements {
            self.statement(statement);
        }
        self.functions.pop();
        self.scopes.pop();
    }

    fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes
            .push(Scope { variables: HashSet::new(), barrier: kind == ScopeKind::FunctionBody });
        self.functions.push(HashMap::new());
    }

    fn register_functions(&mut self, block: &Block) {
        for statement in &block.statements {
            if let Statement::FunctionDefinition(function) = statement {
                let signature = (function.parameters.len(), function.returns.len());
                let table = self.functions.last_mut().expect("scope present");
                if table.insert(function.name.clone(), signature).is_some() {
                    self.errors.push(AnalysisError::DuplicateFunction(function.name.clone()));
                }
            }
        }
    }

    fn declare(&mut self, name: &str) {
        let scope = self.scopes.last_mut().expect("scope present");
        if !scope.variables.insert(name.to_string()) {
            self.errors.push(AnalysisError::DuplicateVariable(name.to_string()));
        }
    }

    fn variable_visible(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.variables.contains(name) {
                return true;
            }
            if scope.barrier {
                break;
            }
        }
        false
    }

    fn function_signature(&self, name: &str) -> Option<(usize, usize)> {
        self.functions.iter().rev().find_map(|table| table.get(name).copied())
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.enter_block(block, ScopeKind::Plain),
            Statement::VariableDeclaration(decl) => {
                if let Some(value) = &decl.value {
                    self.expect_values(value, decl.variables.len());
                }
                for name in &decl.variables {
                    self.declare(name);
                }
            }
            Statement::Assignment(assignment) => {
                self.expect_values(&assignment.value, assignment.targets.len());
                for target in &assignment.targets {
                    if !self.variable_visible(target) {
                        self.errors.push(AnalysisError::UndeclaredVariable(target.clone()));
                    }
                }
            }
            Statement::Expression(call) => {
                if let Some(found) = self.call(call) {
                    if found != 0 {
                        self.errors
                            .push(AnalysisError::ValueCountMismatch { expected: 0, found });
                    }
                }
            }
            Statement::If(if_st) => {
                self.expect_values(&if_st.condition, 1);
                self.enter_block(&if_st.body, ScopeKind::Plain);
            }
            Statement::Switch(switch) => self.switch(switch),
            Statement::ForLoop(for_loop) => {
                // The init block's declarations stay visible for the
                // condition, post and body parts.
                self.push_scope(ScopeKind::Plain);
                self.register_functions(&for_loop.pre);
                for statement in &for_loop.pre.statements {
                    self.statement(statement);
                }
                self.expect_values(&for_loop.condition, 1);
                self.loop_depth += 1;
                self.enter_block(&for_loop.body, ScopeKind::Plain);
                self.loop_depth -= 1;
                self.enter_block(&for_loop.post, ScopeKind::Plain);
                self.functions.pop();
                self.scopes.pop();
            }
            Statement::Break => {
                if self.loop_depth == 0 {
                    self.errors.push(AnalysisError::LoopControlOutsideLoop("break"));
                }
            }
            Statement::Continue => {
                if self.loop_depth == 0 {
                    self.errors.push(AnalysisError::LoopControlOutsideLoop("continue"));
                }
            }
            Statement::Leave => {}
            Statement::FunctionDefinition(function) => {
                let outer_loop_depth = std::mem::take(&mut self.loop_depth);
                self.push_scope(ScopeKind::FunctionBody);
                for name in function.parameters.iter().chain(&function.returns) {
                    self.declare(name);
                }
                self.register_functions(&function.body);
                for statement in &function.body.statements {
                    self.statement(statement);
                }
                self.functions.pop();
                self.scopes.pop();
                self.loop_depth = outer_loop_depth;
            }
        }
    }

    fn switch(&mut self, switch: &Switch) {
        self.expect_values(&switch.expression, 1);
        let mut seen = HashSet::new();
        for case in &switch.cases {
            self.check_literal(case.value.value);
            if !seen.insert(case.value.value) {
                self.errors.push(AnalysisError::DuplicateCase(case.value.value));
            }
            self.enter_block(&case.body, ScopeKind::Plain);
        }
        if let Some(default) = &switch.default {
            self.enter_block(default, ScopeKind::Plain);
        }
    }

    /// Returns the callee's return count, or `None` if the callee is
    /// unknown (already reported).
    fn call(&mut self, call: &FunctionCall) -> Option<usize> {
        // Nested calls are legal here; each argument must produce one value.
        for argument in &call.arguments {
            self.expect_values(argument, 1);
        }

        let (parameters, returns) = match self.function_signature(&call.name) {
            Some(signature) => signature,
            None => match self.dialect.builtin(&call.name) {
                Some(builtin) => (builtin.parameters, builtin.returns),
                None => {
                    self.errors.push(AnalysisError::UnknownFunction(call.name.clone()));
                    return None;
                }
            },
        };
        if call.arguments.len() != parameters {
            self.errors.push(AnalysisError::ArityMismatch {
                name: call.name.clone(),
                expected: parameters,
                found: call.arguments.len(),
            });
        }
        Some(returns)
    }

    fn expect_values_of_call(&mut self, call: &FunctionCall, expected: usize) {
        if let Some(found) = self.call(call) {
            if found != expected {
                self.errors.push(AnalysisError::ValueCountMismatch { expected, found });
            }
        }
    }

    fn expect_values(&mut self, expression: &Expression, expected: usize) {
        match expression {
            Expression::Literal(literal) => {
                self.check_literal(literal.value);
                if expected != 1 {
                    self.errors.push(AnalysisError::ValueCountMismatch { expected, found: 1 });
                }
            }
            Expression::Identifier(identifier) => {
                if !self.variable_visible(&identifier.name) {
                    self.errors.push(AnalysisError::UndeclaredVariable(identifier.name.clone()));
                }
                if expected != 1 {
                    self.errors.push(AnalysisError::ValueCountMismatch { expected, found: 1 });
                }
            }
            Expression::FunctionCall(call) => self.expect_values_of_call(call, expected),
        }
    }

    fn check_literal(&mut self, value: U256) {
        if value > self.dialect.max_literal() {
            self.errors.push(AnalysisError::LiteralTooWide {
                value,
                word_bits: self.dialect.word_bits,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasm_parser::parse_block;

    fn analyze(dialect: &Dialect, source: &str) -> Result<(), Diagnostics> {
        analyze_block(dialect, &parse_block(source).expect("parse failed"))
    }

    #[test]
    fn accepts_well_formed_evm_code() {
        let dialect = Dialect::evm256();
        analyze(
            &dialect,
            r#"
{
    let a := calldataload(0)
    let b := not(0)
    if lt(a, b) {
        sstore(0, add(a, 1))
    }
    for { let i := 0 } lt(i, a) { i := add(i, 1) } {
        if eq(i, 3) { continue }
        if eq(i, 5) { break }
    }
    function double(x) -> y {
        y := mul(x, 2)
        leave
    }
    sstore(1, double(a))
}
"#,
        )
        .expect("analysis should pass");
    }

    #[test]
    fn rejects_undeclared_and_unknown() {
        let dialect = Dialect::evm256();
        let Diagnostics(errors) = analyze(
            &dialect,
            r#"
{
    let a := frobnicate(1)
    b := 2
}
"#,
        )
        .unwrap_err();
        assert!(errors.contains(&AnalysisError::UnknownFunction("frobnicate".into())));
        assert!(errors.contains(&AnalysisError::UndeclaredVariable("b".into())));
    }

    #[test]
    fn rejects_wide_literals_in_wasm() {
        let dialect = Dialect::wasm64();
        let Diagnostics(errors) = analyze(&dialect, "{ let a := 0x10000000000000000 }").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], AnalysisError::LiteralTooWide { word_bits: 64, .. }));
    }

    #[test]
    fn rejects_arity_and_value_count_mismatches() {
        let dialect = Dialect::evm256();
        let Diagnostics(errors) = analyze(
            &dialect,
            r#"
{
    let a := add(1)
    let b, c := add(1, 2)
    add(1, 2)
}
"#,
        )
        .unwrap_err();
        assert!(errors.contains(&AnalysisError::ArityMismatch {
            name: "add".into(),
            expected: 2,
            found: 1
        }));
        assert!(errors.contains(&AnalysisError::ValueCountMismatch { expected: 2, found: 1 }));
        assert!(errors.contains(&AnalysisError::ValueCountMismatch { expected: 0, found: 1 }));
    }

    #[test]
    fn function_scopes_do_not_capture() {
        let dialect = Dialect::evm256();
        let Diagnostics(errors) = analyze(
            &dialect,
            r#"
{
    let outer := 1
    function f() -> r {
        r := outer
    }
    pop(f())
}
"#,
        )
        .unwrap_err();
        assert!(errors.contains(&AnalysisError::UndeclaredVariable("outer".into())));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let dialect = Dialect::evm256();
        let Diagnostics(errors) = analyze(&dialect, "{ break }").unwrap_err();
        assert_eq!(errors, vec![AnalysisError::LoopControlOutsideLoop("break")]);
    }
}
