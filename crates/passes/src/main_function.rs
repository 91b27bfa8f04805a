//! Wraps the grouped top-level statements into `function main()`.

use crate::PassContext;
use sasm_data::{Block, FunctionDefinition, Statement};

pub struct MainFunction;

impl MainFunction {
    /// Requires the grouped shape produced by [`crate::FunctionGrouper`]:
    /// one leading block, then only function definitions.
    pub fn run(ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("synthesizing main function");
        assert!(
            matches!(block.statements.first(), Some(Statement::Block(_))),
            "main-function synthesis requires a grouped root block"
        );
        assert!(
            block.statements[1..]
                .iter()
                .all(|statement| matches!(statement, Statement::FunctionDefinition(_))),
            "main-function synthesis requires functions to be grouped"
        );

        ctx.dispenser.mark_used("main");
        let Statement::Block(body) = std::mem::replace(
            &mut block.statements[0],
            Statement::FunctionDefinition(FunctionDefinition {
                name: "main".to_string(),
                parameters: Vec::new(),
                returns: Vec::new(),
                body: Block::default(),
            }),
        ) else {
            unreachable!("checked above");
        };
        let Statement::FunctionDefinition(main) = &mut block.statements[0] else {
            unreachable!("just placed");
        };
        main.body = body;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionGrouper;
    use sasm_data::{Dialect, NameDispenser};
    use sasm_parser::parse_block;
    use test_utils::assert_text_eq;

    #[test]
    fn wraps_grouped_statements() {
        let mut block = parse_block("{ let a := 1 function f() { } }").unwrap();
        let dialect = Dialect::evm256();
        let mut dispenser = NameDispenser::new(&block, ["main".to_string()]);
        let mut ctx = PassContext { dialect: &dialect, dispenser: &mut dispenser };
        FunctionGrouper::run(&mut ctx, &mut block);
        MainFunction::run(&mut ctx, &mut block);

        let expected = r#"
{
    function main() {
        let a := 1
    }
    function f() { }
}
"#;
        assert_text_eq(&block.to_string(), expected, "Main-wrapped block");
    }
}
