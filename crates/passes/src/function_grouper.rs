//! Groups the root block into a single leading block of plain statements
//! followed by all function definitions.

use crate::PassContext;
use sasm_data::{Block, Statement};

pub struct FunctionGrouper;

impl FunctionGrouper {
    pub fn run(_ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("grouping functions");
        let old = std::mem::take(&mut block.statements);
        let mut plain = Vec::new();
        let mut functions = Vec::new();
        for statement in old {
            match statement {
                Statement::FunctionDefinition(_) => functions.push(statement),
                other => plain.push(other),
            }
        }
        block.statements = Vec::with_capacity(functions.len() + 1);
        block.statements.push(Statement::Block(Block { statements: plain }));
        block.statements.extend(functions);
    }
}
