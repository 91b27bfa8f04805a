//! Outlines nested calls so every call argument and every control
//! expression is a literal or an identifier.
//!
//! Loop conditions are skipped; [`crate::ForLoopConditionIntoBody`] must
//! run first so they are already literals.

use crate::PassContext;
use sasm_data::{
    Block, Expression, Statement, VariableDeclaration,
    visitor::replace_statements,
};

pub struct ExpressionSplitter;

impl ExpressionSplitter {
    pub fn run(ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("splitting expressions");
        split_block(ctx, block);
    }
}

fn split_block(ctx: &mut PassContext<'_>, block: &mut Block) {
    replace_statements(block, |statement| {
        let mut out = Vec::new();
        split_statement(ctx, statement, &mut out);
        out
    });
}

fn split_statement(ctx: &mut PassContext<'_>, mut statement: Statement, out: &mut Vec<Statement>) {
    match &mut statement {
        Statement::Block(inner) => split_block(ctx, inner),
        Statement::VariableDeclaration(decl) => {
            if let Some(value) = &mut decl.value {
                split_value(ctx, value, out);
            }
        }
        Statement::Assignment(assignment) => split_value(ctx, &mut assignment.value, out),
        Statement::Expression(call) => {
            for argument in &mut call.arguments {
                outline(ctx, argument, out);
            }
        }
        Statement::If(if_st) => {
            outline(ctx, &mut if_st.condition, out);
            split_block(ctx, &mut if_st.body);
        }
        Statement::Switch(switch) => {
            outline(ctx, &mut switch.expression, out);
            for case in &mut switch.cases {
                split_block(ctx, &mut case.body);
            }
            if let Some(default) = &mut switch.default {
                split_block(ctx, default);
            }
        }
        Statement::ForLoop(for_loop) => {
            split_block(ctx, &mut for_loop.pre);
            split_block(ctx, &mut for_loop.post);
            split_block(ctx, &mut for_loop.body);
        }
        Statement::FunctionDefinition(function) => split_block(ctx, &mut function.body),
        Statement::Break | Statement::Continue | Statement::Leave => {}
    }
    out.push(statement);
}

/// Keeps a top-level call (it may return multiple values) but makes its
/// arguments atomic.
fn split_value(ctx: &mut PassContext<'_>, value: &mut Expression, out: &mut Vec<Statement>) {
    if let Expression::FunctionCall(call) = value {
        for argument in &mut call.arguments {
            outline(ctx, argument, out);
        }
    }
}

/// Replaces a call expression with a fresh identifier, declaring it from
/// the call just before the enclosing statement. Literals and identifiers
/// are already atomic.
fn outline(ctx: &mut PassContext<'_>, expression: &mut Expression, out: &mut Vec<Statement>) {
    if let Expression::FunctionCall(call) = expression {
        for argument in &mut call.arguments {
            outline(ctx, argument, out);
        }
        let name = ctx.dispenser.fresh("expr");
        let call_expr = std::mem::replace(expression, Expression::identifier(name.clone()));
        out.push(Statement::VariableDeclaration(VariableDeclaration {
            variables: vec![name],
            value: Some(call_expr),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasm_data::{Dialect, NameDispenser};
    use sasm_parser::parse_block;
    use test_utils::assert_text_eq;

    fn split(source: &str) -> String {
        let mut block = parse_block(source).expect("parse failed");
        let dialect = Dialect::evm256();
        let mut dispenser = NameDispenser::new(&block, []);
        let mut ctx = PassContext { dialect: &dialect, dispenser: &mut dispenser };
        ExpressionSplitter::run(&mut ctx, &mut block);
        block.to_string()
    }

    #[test]
    fn outlines_nested_arguments_in_evaluation_order() {
        let actual = split("{ sstore(add(1, mload(0)), 2) }");
        let expected = r#"
{
    let expr := mload(0)
    let expr_1 := add(1, expr)
    sstore(expr_1, 2)
}
"#;
        assert_text_eq(&actual, expected, "Split block");
    }

    #[test]
    fn outlines_conditions_but_keeps_declaration_calls() {
        let actual = split(
            r#"
{
    let a := add(mload(0), 1)
    if eq(a, 2) {
        a := 3
    }
}
"#,
        );
        let expected = r#"
{
    let expr := mload(0)
    let a := add(expr, 1)
    let expr_1 := eq(a, 2)
    if expr_1 {
        a := 3
    }
}
"#;
        assert_text_eq(&actual, expected, "Split block");
    }
}
