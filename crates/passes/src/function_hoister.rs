//! Moves every function definition to the end of the root block.
//!
//! Requires disambiguated names; function definitions are scope-independent
//! afterwards because functions never capture outer variables.

use crate::PassContext;
use sasm_data::{Block, FunctionDefinition, Statement};

pub struct FunctionHoister;

impl FunctionHoister {
    pub fn run(_ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("hoisting function definitions");
        let mut functions = Vec::new();
        hoist_from_block(block, &mut functions);
        block.statements.extend(functions.into_iter().map(Statement::FunctionDefinition));
    }
}

fn hoist_from_block(block: &mut Block, out: &mut Vec<FunctionDefinition>) {
    let old = std::mem::take(&mut block.statements);
    block.statements = Vec::with_capacity(old.len());
    for mut statement in old {
        // Recurse first so nested definitions bubble all the way up.
        match &mut statement {
            Statement::Block(inner) => hoist_from_block(inner, out),
            Statement::If(if_st) => hoist_from_block(&mut if_st.body, out),
            Statement::Switch(switch) => {
                for case in &mut switch.cases {
                    hoist_from_block(&mut case.body, out);
                }
                if let Some(default) = &mut switch.default {
                    hoist_from_block(default, out);
                }
            }
            Statement::ForLoop(for_loop) => {
                hoist_from_block(&mut for_loop.pre, out);
                hoist_from_block(&mut for_loop.post, out);
                hoist_from_block(&mut for_loop.body, out);
            }
            Statement::FunctionDefinition(function) => hoist_from_block(&mut function.body, out),
            _ => {}
        }
        match statement {
            Statement::FunctionDefinition(function) => out.push(function),
            other => block.statements.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasm_data::{Dialect, NameDispenser};
    use sasm_parser::parse_block;
    use test_utils::assert_text_eq;

    #[test]
    fn hoists_nested_definitions() {
        let mut block = parse_block(
            r#"
{
    let a := 1
    if a {
        function inner() -> r {
            r := 2
        }
        a := inner()
    }
}
"#,
        )
        .unwrap();
        let dialect = Dialect::evm256();
        let mut dispenser = NameDispenser::new(&block, []);
        let mut ctx = PassContext { dialect: &dialect, dispenser: &mut dispenser };
        FunctionHoister::run(&mut ctx, &mut block);

        let expected = r#"
{
    let a := 1
    if a {
        a := inner()
    }
    function inner() -> r {
        r := 2
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "Hoisted block");
    }
}
