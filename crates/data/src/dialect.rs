//! Dialect tables.
//!
//! A dialect is a closed set of builtin function names with fixed argument
//! and return counts, plus the word width its values carry. Dialects are
//! plain values constructed once by the driver and passed by reference;
//! there are no process-wide singletons.

use alloy_primitives::U256;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub parameters: usize,
    pub returns: usize,
}

#[derive(Debug, Clone)]
pub struct Dialect {
    pub name: &'static str,
    pub word_bits: u32,
    /// Name of the builtin computing boolean negation, if the dialect has
    /// one. Used by the for-loop condition rewrite.
    pub boolean_negation: Option<&'static str>,
    builtins: HashMap<&'static str, BuiltinFunction>,
}

impl Dialect {
    fn from_table(
        name: &'static str,
        word_bits: u32,
        boolean_negation: Option<&'static str>,
        table: &[(&'static str, usize, usize)],
    ) -> Self {
        let builtins = table
            .iter()
            .map(|&(name, parameters, returns)| (name, BuiltinFunction { name, parameters, returns }))
            .collect();
        Self { name, word_bits, boolean_negation, builtins }
    }

    /// The source dialect: structured assembly over 256-bit words with the
    /// EVM instruction set as builtins.
    pub fn evm256() -> Self {
        Self::from_table("evm256", 256, Some("iszero"), EVM256_BUILTINS)
    }

    /// The target dialect: structured assembly over 64-bit words with wasm
    /// integer instructions and the `eth.*` host imports as builtins.
    pub fn wasm64() -> Self {
        Self::from_table("wasm64", 64, Some("i64.eqz"), WASM64_BUILTINS)
    }

    pub fn builtin(&self, name: &str) -> Option<&BuiltinFunction> {
        self.builtins.get(name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Largest literal value representable in this dialect's word.
    pub fn max_literal(&self) -> U256 {
        if self.word_bits >= 256 {
            U256::MAX
        } else {
            (U256::from(1u64) << self.word_bits) - U256::from(1u64)
        }
    }
}

const EVM256_BUILTINS: &[(&str, usize, usize)] = &[
    // Arithmetic
    ("add", 2, 1),
    ("sub", 2, 1),
    ("mul", 2, 1),
    ("div", 2, 1),
    ("sdiv", 2, 1),
    ("mod", 2, 1),
    ("smod", 2, 1),
    ("addmod", 3, 1),
    ("mulmod", 3, 1),
    ("exp", 2, 1),
    ("signextend", 2, 1),
    // Comparison
    ("lt", 2, 1),
    ("gt", 2, 1),
    ("slt", 2, 1),
    ("sgt", 2, 1),
    ("eq", 2, 1),
    ("iszero", 1, 1),
    // Bit operations
    ("and", 2, 1),
    ("or", 2, 1),
    ("xor", 2, 1),
    ("not", 1, 1),
    ("shl", 2, 1),
    ("shr", 2, 1),
    ("sar", 2, 1),
    ("byte", 2, 1),
    // Hashing
    ("keccak256", 2, 1),
    // Memory
    ("mload", 1, 1),
    ("mstore", 2, 0),
    ("mstore8", 2, 0),
    ("msize", 0, 1),
    // Storage
    ("sload", 1, 1),
    ("sstore", 2, 0),
    // Environment
    ("address", 0, 1),
    ("balance", 1, 1),
    ("origin", 0, 1),
    ("caller", 0, 1),
    ("callvalue", 0, 1),
    ("calldataload", 1, 1),
    ("calldatasize", 0, 1),
    ("calldatacopy", 3, 0),
    ("codesize", 0, 1),
    ("codecopy", 3, 0),
    ("gasprice", 0, 1),
    ("extcodesize", 1, 1),
    ("extcodecopy", 4, 0),
    ("extcodehash", 1, 1),
    ("returndatasize", 0, 1),
    ("returndatacopy", 3, 0),
    ("blockhash", 1, 1),
    ("coinbase", 0, 1),
    ("timestamp", 0, 1),
    ("number", 0, 1),
    ("difficulty", 0, 1),
    ("gaslimit", 0, 1),
    ("pc", 0, 1),
    ("gas", 0, 1),
    // Logging
    ("log0", 2, 0),
    ("log1", 3, 0),
    ("log2", 4, 0),
    ("log3", 5, 0),
    ("log4", 6, 0),
    // Control / lifecycle
    ("create", 3, 1),
    ("create2", 4, 1),
    ("call", 7, 1),
    ("callcode", 7, 1),
    ("delegatecall", 6, 1),
    ("staticcall", 6, 1),
    ("selfdestruct", 1, 0),
    ("return", 2, 0),
    ("revert", 2, 0),
    ("invalid", 0, 0),
    ("pop", 1, 0),
];

const WASM64_BUILTINS: &[(&str, usize, usize)] = &[
    ("i64.add", 2, 1),
    ("i64.sub", 2, 1),
    ("i64.mul", 2, 1),
    ("i64.div_u", 2, 1),
    ("i64.rem_u", 2, 1),
    ("i64.and", 2, 1),
    ("i64.or", 2, 1),
    ("i64.xor", 2, 1),
    ("i64.shl", 2, 1),
    ("i64.shr_u", 2, 1),
    ("i64.eq", 2, 1),
    ("i64.ne", 2, 1),
    ("i64.eqz", 1, 1),
    ("i64.lt_u", 2, 1),
    ("i64.gt_u", 2, 1),
    ("i64.le_u", 2, 1),
    ("i64.ge_u", 2, 1),
    ("i64.clz", 1, 1),
    ("i64.load", 1, 1),
    ("i64.store", 2, 0),
    ("i64.store8", 2, 0),
    ("unreachable", 0, 0),
    // Host imports, with the arities the polyfill marshalling uses.
    ("eth.getAddress", 1, 0),
    ("eth.getExternalBalance", 2, 0),
    ("eth.getTxOrigin", 1, 0),
    ("eth.getCaller", 1, 0),
    ("eth.getCallValue", 1, 0),
    ("eth.callDataCopy", 3, 0),
    ("eth.getCallDataSize", 0, 1),
    ("eth.getCodeSize", 0, 1),
    ("eth.codeCopy", 3, 0),
    ("eth.externalCodeCopy", 4, 0),
    ("eth.getExternalCodeSize", 1, 1),
    ("eth.getReturnDataSize", 0, 1),
    ("eth.returnDataCopy", 3, 0),
    ("eth.getBlockHash", 2, 1),
    ("eth.getBlockCoinbase", 1, 0),
    ("eth.getBlockTimestamp", 0, 1),
    ("eth.getBlockNumber", 0, 1),
    ("eth.getBlockDifficulty", 1, 0),
    ("eth.getBlockGasLimit", 0, 1),
    ("eth.getTxGasPrice", 1, 0),
    ("eth.getGasLeft", 0, 1),
    ("eth.storageLoad", 2, 0),
    ("eth.storageStore", 2, 0),
    ("eth.log", 7, 0),
    ("eth.create", 4, 1),
    ("eth.call", 5, 1),
    ("eth.callCode", 5, 1),
    ("eth.callDelegate", 4, 1),
    ("eth.callStatic", 4, 1),
    ("eth.selfDestruct", 1, 0),
    ("eth.finish", 2, 0),
    ("eth.revert", 2, 0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_builtin_lookup() {
        let dialect = Dialect::evm256();
        let addmod = dialect.builtin("addmod").unwrap();
        assert_eq!(addmod.parameters, 3);
        assert_eq!(addmod.returns, 1);
        assert!(dialect.is_builtin("pc"));
        assert!(dialect.builtin("i64.add").is_none());
        assert_eq!(dialect.max_literal(), U256::MAX);
    }

    #[test]
    fn wasm_builtin_lookup() {
        let dialect = Dialect::wasm64();
        assert!(dialect.is_builtin("i64.shr_u"));
        assert!(dialect.is_builtin("eth.storageStore"));
        assert!(!dialect.is_builtin("mload"));
        assert_eq!(dialect.max_literal(), U256::from(u64::MAX));
    }
}
