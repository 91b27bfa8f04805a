//! The word-size transform: rewrites a 256-bit-word AST into a 64-bit-word
//! AST by expanding every value into four limbs (most significant first).
//!
//! Preconditions (the canonicalization passes establish them): names are
//! globally unique, every call argument is a literal or identifier, and
//! control-flow conditions are literals or identifiers. Violations are
//! internal bugs and panic.

use crate::{
    error::{Result, TranslationError},
    polyfill::Polyfill,
};
use sasm_data::{
    Assignment, Block, Case, Dialect, Expression, FunctionCall, If, Literal, NameDispenser,
    Statement, Switch, VariableDeclaration,
};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Condition-reduction helper defined by the polyfill: `or_bool(a,b,c,d)`
/// is the 64-bit truthiness of a four-limb value.
const OR_BOOL: &str = "or_bool";

pub struct WordSizeTransform<'a> {
    dialect: &'a Dialect,
    dispenser: &'a mut NameDispenser,
    polyfill: &'a Polyfill,
    expanded: HashMap<String, [String; 4]>,
}

impl<'a> WordSizeTransform<'a> {
    /// Rewrites `block` in place from `dialect` (256-bit) to the 64-bit
    /// value domain.
    pub fn run(
        dialect: &'a Dialect,
        dispenser: &'a mut NameDispenser,
        polyfill: &'a Polyfill,
        block: &mut Block,
    ) -> Result<()> {
        let mut transform = Self { dialect, dispenser, polyfill, expanded: HashMap::new() };
        transform.rewrite_block(block)
    }

    fn rewrite_block(&mut self, block: &mut Block) -> Result<()> {
        let old = std::mem::take(&mut block.statements);
        let mut statements = Vec::with_capacity(old.len() * 2);
        for statement in old {
            self.rewrite_statement(statement, &mut statements)?;
        }
        block.statements = statements;
        Ok(())
    }

    fn rewrite_statement(&mut self, statement: Statement, out: &mut Vec<Statement>) -> Result<()> {
        match statement {
            Statement::Block(mut block) => {
                self.rewrite_block(&mut block)?;
                out.push(Statement::Block(block));
            }
            Statement::VariableDeclaration(decl) => self.rewrite_declaration(decl, out)?,
            Statement::Assignment(assignment) => self.rewrite_assignment(assignment, out)?,
            Statement::Expression(call) => {
                out.push(Statement::Expression(self.rewrite_call(call)?));
            }
            Statement::If(mut if_st) => {
                if_st.condition = self.truthiness(&if_st.condition)?;
                self.rewrite_block(&mut if_st.body)?;
                out.push(Statement::If(if_st));
            }
            Statement::Switch(switch) => self.rewrite_switch(switch, out)?,
            Statement::ForLoop(mut for_loop) => {
                self.rewrite_block(&mut for_loop.pre)?;
                for_loop.condition = self.truthiness(&for_loop.condition)?;
                self.rewrite_block(&mut for_loop.post)?;
                self.rewrite_block(&mut for_loop.body)?;
                out.push(Statement::ForLoop(for_loop));
            }
            Statement::Break | Statement::Continue | Statement::Leave => out.push(statement),
            Statement::FunctionDefinition(mut function) => {
                function.parameters = self.expand_name_list(&function.parameters);
                function.returns = self.expand_name_list(&function.returns);
                self.rewrite_block(&mut function.body)?;
                out.push(Statement::FunctionDefinition(function));
            }
        }
        Ok(())
    }

    /// `let v := rhs` becomes four zero-cost declarations for literal and
    /// identifier initializers, or a single 4n-name declaration when the
    /// initializer is a call. Uninitialized declarations expand to one
    /// uninitialized declaration (limbs default to zero).
    fn rewrite_declaration(
        &mut self,
        decl: VariableDeclaration,
        out: &mut Vec<Statement>,
    ) -> Result<()> {
        let expanded: Vec<[String; 4]> =
            decl.variables.iter().map(|name| self.expand_name(name)).collect();
        match decl.value {
            None => {
                out.push(Statement::VariableDeclaration(VariableDeclaration {
                    variables: expanded.into_iter().flatten().collect(),
                    value: None,
                }));
            }
            Some(Expression::FunctionCall(call)) => {
                let call = self.rewrite_call(call)?;
                out.push(Statement::VariableDeclaration(VariableDeclaration {
                    variables: expanded.into_iter().flatten().collect(),
                    value: Some(Expression::FunctionCall(call)),
                }));
            }
            Some(value) => {
                assert_eq!(
                    decl.variables.len(),
                    1,
                    "multi-variable declaration with a single-valued initializer"
                );
                let limbs = self.expand_value(&value)?;
                for (name, limb) in expanded.into_iter().flatten().zip(limbs) {
                    out.push(Statement::VariableDeclaration(VariableDeclaration {
                        variables: vec![name],
                        value: Some(limb),
                    }));
                }
            }
        }
        Ok(())
    }

    fn rewrite_assignment(&mut self, assignment: Assignment, out: &mut Vec<Statement>) -> Result<()> {
        let expanded: Vec<[String; 4]> =
            assignment.targets.iter().map(|name| self.expand_name(name)).collect();
        match assignment.value {
            Expression::FunctionCall(call) => {
                let call = self.rewrite_call(call)?;
                out.push(Statement::Assignment(Assignment {
                    targets: expanded.into_iter().flatten().collect(),
                    value: Expression::FunctionCall(call),
                }));
            }
            value => {
                assert_eq!(
                    assignment.targets.len(),
                    1,
                    "multi-target assignment with a single-valued right-hand side"
                );
                let limbs = self.expand_value(&value)?;
                for (name, limb) in expanded.into_iter().flatten().zip(limbs) {
                    out.push(Statement::Assignment(Assignment {
                        targets: vec![name],
                        value: limb,
                    }));
                }
            }
        }
        Ok(())
    }

    /// Case literals become `if` statements over four-limb equality; a
    /// fresh flag guards the default body. The discriminator is copied into
    /// fresh limb variables first so case bodies cannot change which case
    /// was selected.
    fn rewrite_switch(&mut self, switch: Switch, out: &mut Vec<Statement>) -> Result<()> {
        let temps = self.dispenser.expand("switch_value");
        let limbs = self.expand_value(&switch.expression)?;
        for (name, limb) in temps.iter().zip(limbs) {
            out.push(Statement::VariableDeclaration(VariableDeclaration {
                variables: vec![name.clone()],
                value: Some(limb),
            }));
        }

        let flag = switch.default.is_some().then(|| self.dispenser.fresh("match_found"));
        if let Some(flag) = &flag {
            out.push(Statement::VariableDeclaration(VariableDeclaration {
                variables: vec![flag.clone()],
                value: Some(Expression::literal(0)),
            }));
        }

        for Case { value, mut body } in switch.cases {
            self.rewrite_block(&mut body)?;
            if let Some(flag) = &flag {
                body.statements.insert(
                    0,
                    Statement::Assignment(Assignment {
                        targets: vec![flag.clone()],
                        value: Expression::literal(1),
                    }),
                );
            }
            out.push(Statement::If(If { condition: limb_equality(&temps, &value), body }));
        }

        if let (Some(flag), Some(mut default)) = (flag, switch.default) {
            self.rewrite_block(&mut default)?;
            out.push(Statement::If(If {
                condition: Expression::call("i64.eqz", vec![Expression::identifier(flag)]),
                body: default,
            }));
        }
        Ok(())
    }

    /// Expands all arguments in place; the callee keeps its name. EVM
    /// builtins must have a polyfill definition.
    fn rewrite_call(&mut self, call: FunctionCall) -> Result<FunctionCall> {
        if self.dialect.is_builtin(&call.name) && !self.polyfill.function_names.contains(&call.name)
        {
            return Err(TranslationError::MissingPolyfill(call.name));
        }
        let mut arguments = Vec::with_capacity(call.arguments.len() * 4);
        for argument in &call.arguments {
            arguments.extend(self.expand_value(argument)?);
        }
        Ok(FunctionCall { name: call.name, arguments })
    }

    /// Reduces a condition to a single 64-bit truthiness value.
    fn truthiness(&mut self, condition: &Expression) -> Result<Expression> {
        Ok(Expression::call(OR_BOOL, self.expand_value(condition)?.into_vec()))
    }

    /// The four-limb expansion of an atomic expression.
    fn expand_value(&mut self, expression: &Expression) -> Result<SmallVec<[Expression; 4]>> {
        match expression {
            Expression::Identifier(identifier) => {
                let names = self.expand_name(&identifier.name);
                Ok(names.iter().map(Expression::identifier).collect())
            }
            Expression::Literal(literal) => Ok(literal
                .be_limbs()
                .into_iter()
                .map(|limb| {
                    Expression::Literal(Literal { value: alloy_primitives::U256::from(limb) })
                })
                .collect()),
            Expression::FunctionCall(call) => {
                panic!(
                    "call to `{}` in value position reached the word-size transform; \
                     expression splitting must run first",
                    call.name
                )
            }
        }
    }

    fn expand_name(&mut self, name: &str) -> [String; 4] {
        if let Some(names) = self.expanded.get(name) {
            return names.clone();
        }
        let names = self.dispenser.expand(name);
        self.expanded.insert(name.to_string(), names.clone());
        names
    }

    fn expand_name_list(&mut self, names: &[String]) -> Vec<String> {
        names.iter().flat_map(|name| self.expand_name(name)).collect()
    }
}

/// `i64.and`-tree comparing four limb variables against a literal's limbs.
fn limb_equality(names: &[String; 4], value: &Literal) -> Expression {
    let eq = |index: usize, limb: u64| {
        Expression::call("i64.eq", vec![
            Expression::identifier(&names[index]),
            Expression::Literal(Literal { value: alloy_primitives::U256::from(limb) }),
        ])
    };
    let limbs = value.be_limbs();
    Expression::call("i64.and", vec![
        Expression::call("i64.and", vec![eq(0, limbs[0]), eq(1, limbs[1])]),
        Expression::call("i64.and", vec![eq(2, limbs[2]), eq(3, limbs[3])]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasm_parser::parse_block;
    use test_utils::assert_text_eq;

    fn transform(source: &str) -> String {
        let mut block = parse_block(source).expect("parse failed");
        let dialect = Dialect::evm256();
        let polyfill = Polyfill::parse().expect("polyfill parses");
        let mut dispenser =
            NameDispenser::new(&block, polyfill.function_names.iter().cloned());
        WordSizeTransform::run(&dialect, &mut dispenser, &polyfill, &mut block)
            .expect("transform failed");
        block.to_string()
    }

    #[test]
    fn expands_declarations_and_literals() {
        let actual = transform("{ let x := 0x1122334455667788999900000000000000000000000000000000000000000001 }");
        let expected = r#"
{
    let x_1 := 0x1122334455667788
    let x_2 := 0x9999000000000000
    let x_3 := 0
    let x_4 := 1
}
"#;
        assert_text_eq(&actual, expected, "Transformed block");
    }

    #[test]
    fn expands_builtin_calls() {
        let actual = transform("{ let x := add(1, 2) }");
        let expected = r#"
{
    let x_1, x_2, x_3, x_4 := add(0, 0, 0, 1, 0, 0, 0, 2)
}
"#;
        assert_text_eq(&actual, expected, "Transformed block");
    }

    #[test]
    fn expands_function_definitions_and_conditions() {
        let actual = transform(
            r#"
{
    function id(a) -> r {
        r := a
    }
    let x := id(5)
    if x {
        pop(x)
    }
}
"#,
        );
        let expected = r#"
{
    function id(a_1, a_2, a_3, a_4) -> r_1, r_2, r_3, r_4 {
        r_1 := a_1
        r_2 := a_2
        r_3 := a_3
        r_4 := a_4
    }
    let x_1, x_2, x_3, x_4 := id(0, 0, 0, 5)
    if or_bool(x_1, x_2, x_3, x_4) {
        pop(x_1, x_2, x_3, x_4)
    }
}
"#;
        assert_text_eq(&actual, expected, "Transformed block");
    }

    #[test]
    fn lowers_switches_to_limb_comparisons() {
        let actual = transform(
            r#"
{
    let x := 1
    switch x
    case 1 {
        pop(2)
    }
    default {
        pop(3)
    }
}
"#,
        );
        let expected = r#"
{
    let x_1 := 0
    let x_2 := 0
    let x_3 := 0
    let x_4 := 1
    let switch_value_1 := x_1
    let switch_value_2 := x_2
    let switch_value_3 := x_3
    let switch_value_4 := x_4
    let match_found := 0
    if i64.and(i64.and(i64.eq(switch_value_1, 0), i64.eq(switch_value_2, 0)), i64.and(i64.eq(switch_value_3, 0), i64.eq(switch_value_4, 1))) {
        match_found := 1
        pop(0, 0, 0, 2)
    }
    if i64.eqz(match_found) {
        pop(0, 0, 0, 3)
    }
}
"#;
        assert_text_eq(&actual, expected, "Transformed block");
    }

    #[test]
    fn missing_polyfill_entry_is_a_translation_error() {
        let mut block = parse_block("{ let x := sdiv(1, 2) pop(x) }").unwrap();
        let dialect = Dialect::evm256();
        let polyfill = Polyfill::parse().unwrap();
        let mut dispenser = NameDispenser::new(&block, polyfill.function_names.iter().cloned());
        let err = WordSizeTransform::run(&dialect, &mut dispenser, &polyfill, &mut block)
            .unwrap_err();
        assert!(matches!(err, TranslationError::MissingPolyfill(name) if name == "sdiv"));
    }

    #[test]
    #[should_panic(expected = "expression splitting must run first")]
    fn nested_calls_are_an_invariant_violation() {
        transform("{ let x := add(add(1, 2), 3) }");
    }
}
