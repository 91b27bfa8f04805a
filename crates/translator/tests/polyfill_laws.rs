//! Differential tests for the polyfill: every arithmetic, comparison and
//! bit operation is executed limb-wise through the interpreter and checked
//! against the 256-bit reference arithmetic of `U256`.

use alloy_primitives::U256;
use proptest::prelude::*;
use sasm_interp::{InterpError, Interpreter};
use sasm_parser::parse_block;
use sasm_translator::POLYFILL_SRC;
use std::sync::OnceLock;
use test_utils::{be_limbs, from_be_limbs};

fn polyfill_block() -> &'static sasm_data::Block {
    static BLOCK: OnceLock<sasm_data::Block> = OnceLock::new();
    BLOCK.get_or_init(|| parse_block(POLYFILL_SRC).expect("polyfill parses"))
}

struct Harness {
    interp: Interpreter,
}

impl Harness {
    fn new() -> Self {
        Self { interp: Interpreter::new(polyfill_block()) }
    }

    fn op(&mut self, name: &str, operands: &[U256]) -> Result<U256, InterpError> {
        let args: Vec<u64> = operands.iter().flat_map(|value| be_limbs(*value)).collect();
        self.interp.fuel = 50_000_000;
        let out = self.interp.call_values(name, &args)?;
        assert_eq!(out.len(), 4, "`{name}` must return four limbs");
        Ok(from_be_limbs([out[0], out[1], out[2], out[3]]))
    }

    fn binop(&mut self, name: &str, x: U256, y: U256) -> U256 {
        self.op(name, &[x, y]).unwrap_or_else(|err| panic!("`{name}` trapped: {err}"))
    }

    fn unop(&mut self, name: &str, x: U256) -> U256 {
        self.op(name, &[x]).unwrap_or_else(|err| panic!("`{name}` trapped: {err}"))
    }
}

fn u256_value() -> impl Strategy<Value = U256> {
    prop_oneof![
        Just(U256::ZERO),
        Just(U256::from(1u64)),
        Just(U256::from(2u64)),
        Just(U256::MAX),
        Just(U256::MAX - U256::from(1u64)),
        Just(U256::from(1u64) << 64),
        Just(U256::from(1u64) << 128),
        Just(U256::from(1u64) << 255),
        any::<u64>().prop_map(U256::from),
        any::<[u64; 4]>().prop_map(U256::from_limbs),
    ]
}

fn shift_amount() -> impl Strategy<Value = U256> {
    prop_oneof![
        (0u64..256).prop_map(U256::from),
        Just(U256::from(256u64)),
        Just(U256::from(300u64)),
        Just(U256::MAX),
    ]
}

fn sign_flip(value: U256) -> U256 {
    value ^ (U256::from(1u64) << 255)
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn magnitude(value: U256) -> U256 {
    if is_negative(value) { value.wrapping_neg() } else { value }
}

proptest! {
    #[test]
    fn add_matches_reference(x in u256_value(), y in u256_value()) {
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("add", x, y), x.wrapping_add(y));
        prop_assert_eq!(harness.binop("add", x, U256::ZERO), x);
    }

    #[test]
    fn sub_matches_reference(x in u256_value(), y in u256_value()) {
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("sub", x, y), x.wrapping_sub(y));
        prop_assert_eq!(harness.binop("sub", x, x), U256::ZERO);
    }

    #[test]
    fn mul_matches_reference(x in u256_value(), y in u256_value()) {
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("mul", x, y), x.wrapping_mul(y));
        prop_assert_eq!(harness.binop("mul", x, U256::from(1u64)), x);
        prop_assert_eq!(harness.binop("mul", x, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn bit_ops_match_reference(x in u256_value(), y in u256_value()) {
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("and", x, y), x & y);
        prop_assert_eq!(harness.binop("or", x, y), x | y);
        prop_assert_eq!(harness.binop("xor", x, y), x ^ y);
        prop_assert_eq!(harness.unop("not", x), !x);

        prop_assert_eq!(harness.binop("xor", x, x), U256::ZERO);
        let negated = harness.unop("not", x);
        prop_assert_eq!(harness.binop("or", x, negated), U256::MAX);
        prop_assert_eq!(harness.binop("and", x, negated), U256::ZERO);
    }

    #[test]
    fn comparisons_match_reference(x in u256_value(), y in u256_value()) {
        let mut harness = Harness::new();
        let truth = |condition: bool| U256::from(u64::from(condition));
        prop_assert_eq!(harness.binop("eq", x, y), truth(x == y));
        prop_assert_eq!(harness.binop("lt", x, y), truth(x < y));
        prop_assert_eq!(harness.binop("gt", x, y), truth(x > y));
        prop_assert_eq!(harness.binop("slt", x, y), truth(sign_flip(x) < sign_flip(y)));
        prop_assert_eq!(harness.binop("sgt", x, y), truth(sign_flip(x) > sign_flip(y)));
        prop_assert_eq!(harness.unop("iszero", x), truth(x.is_zero()));
    }

    #[test]
    fn shifts_match_reference(n in shift_amount(), x in u256_value()) {
        let mut harness = Harness::new();
        let expected_shl = if n < U256::from(256u64) { x << n.to::<usize>() } else { U256::ZERO };
        let expected_shr = if n < U256::from(256u64) { x >> n.to::<usize>() } else { U256::ZERO };
        prop_assert_eq!(harness.binop("shl", n, x), expected_shl);
        prop_assert_eq!(harness.binop("shr", n, x), expected_shr);
    }

    #[test]
    fn sar_matches_reference(n in shift_amount(), x in u256_value()) {
        let mut harness = Harness::new();
        let expected = if !is_negative(x) {
            if n < U256::from(256u64) { x >> n.to::<usize>() } else { U256::ZERO }
        } else if n >= U256::from(256u64) {
            U256::MAX
        } else {
            let shift = n.to::<usize>();
            if shift == 0 { x } else { (x >> shift) | (U256::MAX << (256 - shift)) }
        };
        prop_assert_eq!(harness.binop("sar", n, x), expected);
    }

    #[test]
    fn byte_matches_reference(n in prop_oneof![0u64..40, Just(1u64 << 40)], x in u256_value()) {
        let mut harness = Harness::new();
        let expected = if n < 32 {
            U256::from(x.to_be_bytes::<32>()[n as usize])
        } else {
            U256::ZERO
        };
        prop_assert_eq!(harness.binop("byte", U256::from(n), x), expected);
    }

    #[test]
    fn signextend_matches_reference(k in prop_oneof![0u64..34, Just(500u64)], x in u256_value()) {
        let mut harness = Harness::new();
        let expected = if k < 31 {
            let bit = 8 * k as usize + 7;
            let mask = (U256::from(1u64) << (bit + 1)) - U256::from(1u64);
            if x.bit(bit) { x | !mask } else { x & mask }
        } else {
            x
        };
        prop_assert_eq!(harness.binop("signextend", U256::from(k), x), expected);
    }
}

proptest! {
    // Division-family ops walk up to 512 shift-subtract iterations per
    // call, so keep the case count down.
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn div_and_mod_match_reference(x in u256_value(), y in u256_value()) {
        prop_assume!(!y.is_zero());
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("div", x, y), x / y);
        prop_assert_eq!(harness.binop("mod", x, y), x % y);
    }

    #[test]
    fn smod_matches_reference(x in u256_value(), y in u256_value()) {
        prop_assume!(!y.is_zero());
        let mut harness = Harness::new();
        let result = magnitude(x) % magnitude(y);
        let expected = if is_negative(x) { result.wrapping_neg() } else { result };
        prop_assert_eq!(harness.binop("smod", x, y), expected);
    }

    #[test]
    fn addmod_matches_reference(x in u256_value(), y in u256_value(), n in u256_value()) {
        prop_assume!(!n.is_zero());
        let mut harness = Harness::new();
        prop_assert_eq!(
            harness.op("addmod", &[x, y, n]).unwrap(),
            x.add_mod(y, n)
        );
    }

    #[test]
    fn mulmod_matches_reference(x in u256_value(), y in u256_value(), n in u256_value()) {
        prop_assume!(!n.is_zero());
        let mut harness = Harness::new();
        prop_assert_eq!(
            harness.op("mulmod", &[x, y, n]).unwrap(),
            x.mul_mod(y, n)
        );
    }

    #[test]
    fn exp_matches_reference(x in u256_value(), e in prop_oneof![
        Just(U256::ZERO),
        Just(U256::from(1u64)),
        Just(U256::from(2u64)),
        Just(U256::from(3u64)),
        Just(U256::from(255u64)),
        Just(U256::from(256u64)),
        (0u64..1000).prop_map(U256::from),
    ]) {
        let mut harness = Harness::new();
        prop_assert_eq!(harness.binop("exp", x, e), x.pow(e));
    }

    #[test]
    fn shl_is_mul_by_power_of_two(n in 0u64..256, x in u256_value()) {
        let mut harness = Harness::new();
        let power = harness.binop("exp", U256::from(2u64), U256::from(n));
        let shifted = harness.binop("shl", U256::from(n), x);
        prop_assert_eq!(shifted, harness.binop("mul", x, power));
    }

    #[test]
    fn shr_is_div_by_power_of_two(n in 0u64..256, x in u256_value()) {
        let mut harness = Harness::new();
        let power = harness.binop("exp", U256::from(2u64), U256::from(n));
        let shifted = harness.binop("shr", U256::from(n), x);
        prop_assert_eq!(shifted, harness.binop("div", x, power));
    }
}

#[test]
fn division_by_zero_traps() {
    let mut harness = Harness::new();
    for name in ["div", "mod", "smod"] {
        let err = harness.op(name, &[U256::from(10u64), U256::ZERO]).unwrap_err();
        assert_eq!(err, InterpError::Unreachable, "`{name}` must trap");
    }
    let err = harness.op("addmod", &[U256::ONE, U256::ONE, U256::ZERO]).unwrap_err();
    assert_eq!(err, InterpError::Unreachable);
    let err = harness.op("mulmod", &[U256::ONE, U256::ONE, U256::ZERO]).unwrap_err();
    assert_eq!(err, InterpError::Unreachable);
}

#[test]
fn add_overflow_wraps_to_zero() {
    let mut harness = Harness::new();
    assert_eq!(harness.binop("add", U256::MAX, U256::from(1u64)), U256::ZERO);
}

#[test]
fn narrowing_helpers_trap_on_overflow() {
    let mut harness = Harness::new();

    let ok = harness.interp.call_values("u256_to_i64", &[0, 0, 0, 7]).unwrap();
    assert_eq!(ok, vec![7]);

    harness.interp.fuel = 1_000_000;
    let err = harness.interp.call_values("u256_to_i64", &[0, 0, 1, 7]).unwrap_err();
    assert_eq!(err, InterpError::Unreachable);

    let err = harness.interp.call_values("u256_to_byte", &[0, 0, 0, 256]).unwrap_err();
    assert_eq!(err, InterpError::Unreachable);
}

#[test]
fn memory_words_are_big_endian_with_scratch_offset() {
    let mut harness = Harness::new();
    let value = U256::from(0x11223344u64);
    let limbs = be_limbs(value);
    let mut args = vec![0, 0, 0, 0];
    args.extend(limbs);
    // mstore(0, value) must land at physical offset 64 in big-endian order.
    let outcome = harness.interp.call_values("mstore", &args).unwrap();
    assert!(outcome.is_empty());
    assert_eq!(harness.interp.state.read_word(64).unwrap(), value);

    let loaded = harness.interp.call_values("mload", &[0, 0, 0, 0]).unwrap();
    assert_eq!(from_be_limbs([loaded[0], loaded[1], loaded[2], loaded[3]]), value);
}
