//! Renames user bindings that collide with a forbidden name set (the
//! polyfill's function names), so the polyfill can be spliced into the same
//! block without capture.

use crate::{PassContext, rename::Renamer};
use sasm_data::Block;
use std::collections::HashSet;

pub struct NameDisplacer;

impl NameDisplacer {
    pub fn run(ctx: &mut PassContext<'_>, block: &mut Block, forbidden: &HashSet<String>) {
        tracing::debug!(forbidden = forbidden.len(), "displacing colliding names");
        let dispenser = &mut *ctx.dispenser;
        let mut renamer =
            Renamer::new(|name: &str| forbidden.contains(name).then(|| dispenser.fresh(name)));
        renamer.rewrite_block(block);
    }
}
