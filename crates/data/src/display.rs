//! Text rendering of ASTs and objects.
//!
//! The output is valid source for the parser crate, which the golden tests
//! rely on for round-tripping. Small literals print in decimal, larger ones
//! in hex, so rendered code reads like the hand-written kind.

use crate::{
    ast::{Block, Expression, Statement},
    object::{Data, Object, ObjectMember},
};
use alloy_primitives::U256;
use std::fmt;

const INDENT: &str = "    ";

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self, 0)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expression(f, self)
    }
}

fn write_object(f: &mut fmt::Formatter<'_>, object: &Object, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    writeln!(f, "{pad}object \"{}\" {{", object.name)?;
    write!(f, "{pad}{INDENT}code ")?;
    write_block(f, &object.code, depth + 1)?;
    writeln!(f)?;
    for member in &object.subobjects {
        match member {
            ObjectMember::Object(subobject) => write_object(f, subobject, depth + 1)?,
            ObjectMember::Data(data) => write_data(f, data, depth + 1)?,
        }
    }
    writeln!(f, "{pad}}}")
}

fn write_data(f: &mut fmt::Formatter<'_>, data: &Data, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    write!(f, "{pad}data \"{}\" hex\"", data.name)?;
    for byte in &data.contents {
        write!(f, "{byte:02x}")?;
    }
    writeln!(f, "\"")
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    if block.statements.is_empty() {
        return write!(f, "{{ }}");
    }
    writeln!(f, "{{")?;
    for statement in &block.statements {
        write!(f, "{}", INDENT.repeat(depth + 1))?;
        write_statement(f, statement, depth + 1)?;
        writeln!(f)?;
    }
    write!(f, "{}}}", INDENT.repeat(depth))
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    match statement {
        Statement::Block(block) => write_block(f, block, depth),
        Statement::VariableDeclaration(decl) => {
            write!(f, "let {}", decl.variables.join(", "))?;
            if let Some(value) = &decl.value {
                write!(f, " := ")?;
                write_expression(f, value)?;
            }
            Ok(())
        }
        Statement::Assignment(assignment) => {
            write!(f, "{} := ", assignment.targets.join(", "))?;
            write_expression(f, &assignment.value)
        }
        Statement::Expression(call) => {
            write_expression(f, &Expression::FunctionCall(call.clone()))
        }
        Statement::If(if_st) => {
            write!(f, "if ")?;
            write_expression(f, &if_st.condition)?;
            write!(f, " ")?;
            write_block(f, &if_st.body, depth)
        }
        Statement::Switch(switch) => {
            write!(f, "switch ")?;
            write_expression(f, &switch.expression)?;
            for case in &switch.cases {
                writeln!(f)?;
                write!(f, "{}case {} ", INDENT.repeat(depth), literal_text(case.value.value))?;
                write_block(f, &case.body, depth)?;
            }
            if let Some(default) = &switch.default {
                writeln!(f)?;
                write!(f, "{}default ", INDENT.repeat(depth))?;
                write_block(f, default, depth)?;
            }
            Ok(())
        }
        Statement::ForLoop(for_loop) => {
            write!(f, "for ")?;
            write_block(f, &for_loop.pre, depth)?;
            write!(f, " ")?;
            write_expression(f, &for_loop.condition)?;
            write!(f, " ")?;
            write_block(f, &for_loop.post, depth)?;
            write!(f, " ")?;
            write_block(f, &for_loop.body, depth)
        }
        Statement::Break => write!(f, "break"),
        Statement::Continue => write!(f, "continue"),
        Statement::Leave => write!(f, "leave"),
        Statement::FunctionDefinition(function) => {
            write!(f, "function {}({})", function.name, function.parameters.join(", "))?;
            if !function.returns.is_empty() {
                write!(f, " -> {}", function.returns.join(", "))?;
            }
            write!(f, " ")?;
            write_block(f, &function.body, depth)
        }
    }
}

fn write_expression(f: &mut fmt::Formatter<'_>, expression: &Expression) -> fmt::Result {
    match expression {
        Expression::Literal(literal) => write!(f, "{}", literal_text(literal.value)),
        Expression::Identifier(identifier) => write!(f, "{}", identifier.name),
        Expression::FunctionCall(call) => {
            write!(f, "{}(", call.name)?;
            for (i, argument) in call.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_expression(f, argument)?;
            }
            write!(f, ")")
        }
    }
}

fn literal_text(value: U256) -> String {
    if value <= U256::from(0xffffu64) {
        format!("{value}")
    } else {
        format!("{value:#x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionCall, If, VariableDeclaration};
    use test_utils::assert_text_eq;

    #[test]
    fn renders_statements() {
        let block = Block {
            statements: vec![
                Statement::VariableDeclaration(VariableDeclaration {
                    variables: vec!["x".into()],
                    value: Some(Expression::call("add", vec![
                        Expression::literal(1),
                        Expression::literal(0x10000),
                    ])),
                }),
                Statement::If(If {
                    condition: Expression::identifier("x"),
                    body: Block {
                        statements: vec![Statement::Expression(FunctionCall {
                            name: "pop".into(),
                            arguments: vec![Expression::identifier("x")],
                        })],
                    },
                }),
            ],
        };

        let expected = r#"
{
    let x := add(1, 0x10000)
    if x {
        pop(x)
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "Rendered block");
    }
}
