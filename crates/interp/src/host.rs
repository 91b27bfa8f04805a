//! Host-side state and the `eth.*` import implementations.
//!
//! The conventions match what the polyfill's marshalling expects: 256-bit
//! values cross the boundary as 32 big-endian bytes at a given memory
//! offset, addresses as the trailing 20 bytes of such a word, and small
//! scalars as flat `i64` values.

use crate::{EResult, InterpError, Interpreter, Interrupt};
use alloy_primitives::U256;
use std::collections::BTreeMap;

/// Upper bound on linear memory, far above anything the tests touch.
const MAX_MEMORY: u64 = 1 << 26;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub data: Vec<u8>,
    pub topics: Vec<U256>,
}

/// Transaction- and block-level values reported by the environment
/// imports. All default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    pub address: U256,
    pub caller: U256,
    pub origin: U256,
    pub callvalue: U256,
    pub coinbase: U256,
    pub difficulty: U256,
    pub gas_price: U256,
    pub block_hash: U256,
    pub timestamp: u64,
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_left: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HostState {
    pub memory: Vec<u8>,
    pub storage: BTreeMap<U256, U256>,
    pub balances: BTreeMap<U256, U256>,
    pub calldata: Vec<u8>,
    pub code: Vec<u8>,
    pub returndata: Vec<u8>,
    pub logs: Vec<LogEntry>,
    pub env: Env,
}

impl HostState {
    fn ensure(&mut self, addr: u64, len: u64) -> Result<usize, InterpError> {
        let end = addr.checked_add(len).ok_or(InterpError::MemoryOutOfBounds(addr))?;
        if end > MAX_MEMORY {
            return Err(InterpError::MemoryOutOfBounds(addr));
        }
        if (self.memory.len() as u64) < end {
            self.memory.resize(end as usize, 0);
        }
        Ok(addr as usize)
    }

    pub fn read_bytes(&mut self, addr: u64, len: u64) -> Result<Vec<u8>, InterpError> {
        let start = self.ensure(addr, len)?;
        Ok(self.memory[start..start + len as usize].to_vec())
    }

    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), InterpError> {
        let start = self.ensure(addr, bytes.len() as u64)?;
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Reads a 256-bit big-endian word.
    pub fn read_word(&mut self, addr: u64) -> Result<U256, InterpError> {
        let bytes = self.read_bytes(addr, 32)?;
        Ok(U256::from_be_slice(&bytes))
    }

    /// Writes a 256-bit big-endian word.
    pub fn write_word(&mut self, addr: u64, value: U256) -> Result<(), InterpError> {
        self.write_bytes(addr, &value.to_be_bytes::<32>())
    }

    /// Reads the 20-byte address suffix convention used by the polyfill.
    fn read_address(&mut self, addr: u64) -> Result<U256, InterpError> {
        let bytes = self.read_bytes(addr, 20)?;
        Ok(U256::from_be_slice(&bytes))
    }

    pub(crate) fn load_i64(&mut self, addr: u64) -> Result<u64, InterpError> {
        let bytes = self.read_bytes(addr, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    pub(crate) fn store_i64(&mut self, addr: u64, value: u64) -> Result<(), InterpError> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub(crate) fn store_byte(&mut self, addr: u64, value: u8) -> Result<(), InterpError> {
        self.write_bytes(addr, &[value])
    }

    /// Copies `len` bytes of `source` starting at `from` to memory at
    /// `to`, zero-padding reads past the end like EVM copy semantics.
    fn copy_padded(&mut self, source: &[u8], to: u64, from: u64, len: u64) -> Result<(), InterpError> {
        let mut bytes = vec![0u8; len as usize];
        for (i, slot) in bytes.iter_mut().enumerate() {
            let src = from as usize + i;
            if src < source.len() {
                *slot = source[src];
            }
        }
        self.write_bytes(to, &bytes)
    }
}

impl Interpreter {
    pub(crate) fn eval_host(&mut self, name: &str, args: &[u64]) -> EResult<Vec<u64>> {
        let state = &mut self.state;
        let values = match (name, args) {
            ("eth.getAddress", [result]) => {
                state.write_word(*result, state.env.address).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getCaller", [result]) => {
                state.write_word(*result, state.env.caller).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getTxOrigin", [result]) => {
                state.write_word(*result, state.env.origin).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getCallValue", [result]) => {
                state.write_word(*result, state.env.callvalue).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getBlockCoinbase", [result]) => {
                state.write_word(*result, state.env.coinbase).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getBlockDifficulty", [result]) => {
                state.write_word(*result, state.env.difficulty).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getTxGasPrice", [result]) => {
                state.write_word(*result, state.env.gas_price).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getExternalBalance", [address, result]) => {
                let address = state.read_address(*address).map_err(Interrupt::from)?;
                let balance = state.balances.get(&address).copied().unwrap_or_default();
                state.write_word(*result, balance).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getBlockHash", [_number, result]) => {
                state.write_word(*result, state.env.block_hash).map_err(Interrupt::from)?;
                vec![0]
            }
            ("eth.getBlockTimestamp", []) => vec![state.env.timestamp],
            ("eth.getBlockNumber", []) => vec![state.env.block_number],
            ("eth.getBlockGasLimit", []) => vec![state.env.gas_limit],
            ("eth.getGasLeft", []) => vec![state.env.gas_left],
            ("eth.getCallDataSize", []) => vec![state.calldata.len() as u64],
            ("eth.callDataCopy", [to, from, len]) => {
                let calldata = state.calldata.clone();
                state.copy_padded(&calldata, *to, *from, *len).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getCodeSize", []) => vec![state.code.len() as u64],
            ("eth.codeCopy", [to, from, len]) => {
                let code = state.code.clone();
                state.copy_padded(&code, *to, *from, *len).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.getReturnDataSize", []) => vec![state.returndata.len() as u64],
            ("eth.returnDataCopy", [to, from, len]) => {
                let returndata = state.returndata.clone();
                state.copy_padded(&returndata, *to, *from, *len).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.storageStore", [key, value]) => {
                let key = state.read_word(*key).map_err(Interrupt::from)?;
                let value = state.read_word(*value).map_err(Interrupt::from)?;
                state.storage.insert(key, value);
                vec![]
            }
            ("eth.storageLoad", [key, result]) => {
                let key = state.read_word(*key).map_err(Interrupt::from)?;
                let value = state.storage.get(&key).copied().unwrap_or_default();
                state.write_word(*result, value).map_err(Interrupt::from)?;
                vec![]
            }
            ("eth.log", [data, len, count, t1, t2, t3, t4]) => {
                let data = state.read_bytes(*data, *len).map_err(Interrupt::from)?;
                let mut topics = Vec::new();
                for offset in [t1, t2, t3, t4].into_iter().take(*count as usize) {
                    topics.push(state.read_word(*offset).map_err(Interrupt::from)?);
                }
                state.logs.push(LogEntry { data, topics });
                vec![]
            }
            ("eth.finish", [data, len]) => {
                let data = state.read_bytes(*data, *len).map_err(Interrupt::from)?;
                return Err(Interrupt::Finish(data));
            }
            ("eth.revert", [data, len]) => {
                let data = state.read_bytes(*data, *len).map_err(Interrupt::from)?;
                return Err(Interrupt::Revert(data));
            }
            _ => return Err(InterpError::UnsupportedImport(name.to_string()).into()),
        };
        Ok(values)
    }
}
