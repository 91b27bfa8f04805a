//! Rewrites loop conditions into the loop body.
//!
//! `for {pre} cond {post} {body}` becomes
//! `for {pre} 1 {post} { if iszero(cond) { break } body }`, so that the
//! expression splitter can outline the condition like any other statement.

use crate::PassContext;
use sasm_data::{Block, Expression, If, Statement};

pub struct ForLoopConditionIntoBody;

impl ForLoopConditionIntoBody {
    pub fn run(ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("moving loop conditions into bodies");
        let negation = ctx
            .dialect
            .boolean_negation
            .expect("dialect has no boolean negation builtin");
        rewrite_block(negation, block);
    }
}

fn rewrite_block(negation: &'static str, block: &mut Block) {
    for statement in &mut block.statements {
        match statement {
            Statement::Block(inner) => rewrite_block(negation, inner),
            Statement::If(if_st) => rewrite_block(negation, &mut if_st.body),
            Statement::Switch(switch) => {
                for case in &mut switch.cases {
                    rewrite_block(negation, &mut case.body);
                }
                if let Some(default) = &mut switch.default {
                    rewrite_block(negation, default);
                }
            }
            Statement::FunctionDefinition(function) => rewrite_block(negation, &mut function.body),
            Statement::ForLoop(for_loop) => {
                rewrite_block(negation, &mut for_loop.pre);
                rewrite_block(negation, &mut for_loop.post);
                rewrite_block(negation, &mut for_loop.body);
                if !matches!(for_loop.condition, Expression::Literal(_)) {
                    let condition =
                        std::mem::replace(&mut for_loop.condition, Expression::literal(1));
                    for_loop.body.statements.insert(
                        0,
                        Statement::If(If {
                            condition: Expression::call(negation, vec![condition]),
                            body: Block { statements: vec![Statement::Break] },
                        }),
                    );
                }
            }
            _ => {}
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
    fn moves_condition_into_body() {
        let mut block = parse_block(
            r#"
{
    for { let i := 0 } lt(i, 10) { i := add(i, 1) } {
        sstore(i, i)
    }
}
"#,
        )
        .unwrap();
        let dialect = Dialect::evm256();
        let mut dispenser = NameDispenser::new(&block, []);
        let mut ctx = PassContext { dialect: &dialect, dispenser: &mut dispenser };
        ForLoopConditionIntoBody::run(&mut ctx, &mut block);

        let expected = r#"
{
    for {
        let i := 0
    } 1 {
        i := add(i, 1)
    } {
        if iszero(lt(i, 10)) {
            break
        }
        sstore(i, i)
    }
}
"#;
        assert_text_eq(&block.to_string(), expected, "Rewritten loop");
    }

    #[test]
    fn literal_conditions_are_left_alone() {
        let mut block = parse_block("{ for { } 1 { } { break } }").unwrap();
        let before = block.to_string();
        let dialect = Dialect::evm256();
        let mut dispenser = NameDispenser::new(&block, []);
        let mut ctx = PassContext { dialect: &dialect, dispenser: &mut dispenser };
        ForLoopConditionIntoBody::run(&mut ctx, &mut block);
        assert_eq!(block.to_string(), before);
    }
}
