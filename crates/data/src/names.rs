//! Fresh-name allocation.
//!
//! The dispenser is seeded with every name occurring in the AST plus a
//! reserved set. Allocation is a prefix lookup with a per-prefix counter,
//! so it is deterministic for a given seeding and never re-walks the tree.

use crate::{
    ast::Block,
    visitor::{self, Visitor},
};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct NameDispenser {
    used: HashSet<String>,
    reserved: HashSet<String>,
    counters: HashMap<String, u64>,
}

impl NameDispenser {
    pub fn new(block: &Block, reserved: impl IntoIterator<Item = String>) -> Self {
        let mut collector = NameCollector::default();
        collector.visit_block(block);
        let reserved: HashSet<String> = reserved.into_iter().collect();
        let mut used = collector.names;
        used.extend(reserved.iter().cloned());
        Self { used, reserved, counters: HashMap::new() }
    }

    /// Whether `name` is reserved (e.g. a polyfill function name) and must
    /// not be used for user bindings.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn mark_used(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Returns `base` if it is still free, otherwise `base_<n>` for the
    /// smallest counter value that is.
    pub fn fresh(&mut self, base: &str) -> String {
        if !self.used.contains(base) {
            let name = base.to_string();
            self.used.insert(name.clone());
            return name;
        }
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}_{counter}");
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }

    /// The four limb names for a 256-bit variable, in big-endian limb
    /// order. Distinct source names can never collide because each limb
    /// name is individually made fresh.
    pub fn expand(&mut self, name: &str) -> [String; 4] {
        [1u32, 2, 3, 4].map(|limb| self.fresh(&format!("{name}_{limb}")))
    }
}

#[derive(Default)]
struct NameCollector {
    names: HashSet<String>,
}

impl Visitor for NameCollector {
    fn visit_name(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }
}

/// Collects every name occurring in `block` (declarations and uses alike).
pub fn collect_names(block: &Block) -> HashSet<String> {
    let mut collector = NameCollector::default();
    visitor::walk_block(&mut collector, block);
    collector.names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Statement, VariableDeclaration};

    fn block_declaring(names: &[&str]) -> Block {
        Block {
            statements: names
                .iter()
                .map(|name| {
                    Statement::VariableDeclaration(VariableDeclaration {
                        variables: vec![name.to_string()],
                        value: None,
                    })
                })
                .collect(),
        }
    }

    #[test]
    fn fresh_avoids_seeded_names() {
        let block = block_declaring(&["x", "x_1"]);
        let mut dispenser = NameDispenser::new(&block, ["main".to_string()]);

        assert_eq!(dispenser.fresh("y"), "y");
        assert_eq!(dispenser.fresh("x"), "x_2");
        assert_eq!(dispenser.fresh("main"), "main_1");
    }

    #[test]
    fn expansion_is_deterministic_and_collision_free() {
        let block = block_declaring(&["v", "v_2"]);
        let mut dispenser = NameDispenser::new(&block, []);

        let limbs = dispenser.expand("v");
        assert_eq!(limbs, ["v_1".to_string(), "v_2_1".into(), "v_3".into(), "v_4".into()]);

        // A second variable whose name looks like a limb cannot collide.
        let other = dispenser.expand("v_2");
        assert_eq!(other[0], "v_2_1_1");
    }
}
