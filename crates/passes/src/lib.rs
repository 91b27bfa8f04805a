//! Canonicalization passes.
//!
//! The translator driver runs these in a fixed order so the word-size
//! transform only ever sees a canonical tree: globally unique names, all
//! functions grouped behind a synthetic `main`, loop conditions reduced to
//! literals, and every call argument an identifier or literal.

mod disambiguator;
mod expression_splitter;
mod for_loop_condition_into_body;
mod function_grouper;
mod function_hoister;
mod main_function;
mod name_displacer;
mod rename;

pub use disambiguator::Disambiguator;
pub use expression_splitter::ExpressionSplitter;
pub use for_loop_condition_into_body::ForLoopConditionIntoBody;
pub use function_grouper::FunctionGrouper;
pub use function_hoister::FunctionHoister;
pub use main_function::MainFunction;
pub use name_displacer::NameDisplacer;

use sasm_data::{Dialect, NameDispenser};

/// Shared state threaded through the passes.
pub struct PassContext<'a> {
    pub dialect: &'a Dialect,
    pub dispenser: &'a mut NameDispenser,
}
