//! Makes every variable and function name unique across the whole tree.

use crate::{PassContext, rename::Renamer};
use sasm_data::Block;
use std::collections::HashSet;

pub struct Disambiguator;

impl Disambiguator {
    /// Renames any binding whose name was already bound elsewhere in the
    /// tree, or collides with the dispenser's reserved set. First
    /// occurrences keep their names, so already-unique trees come through
    /// unchanged.
    pub fn run(ctx: &mut PassContext<'_>, block: &mut Block) {
        tracing::debug!("disambiguating identifiers");
        let dispenser = &mut *ctx.dispenser;
        let mut defined: HashSet<String> = HashSet::new();
        let mut renamer = Renamer::new(|name: &str| {
            if dispenser.is_reserved(name) || !defined.insert(name.to_string()) {
                Some(dispenser.fresh(name))
            } else {
                None
            }
        });
        renamer.rewrite_block(block);
    }
}
