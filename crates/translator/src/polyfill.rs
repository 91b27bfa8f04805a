//! The polyfill: 64-bit dialect implementations of every EVM builtin the
//! word-size transform can emit calls to.
//!
//! Values are four 64-bit limbs, most significant first. Arithmetic is
//! schoolbook limb arithmetic; division is shift-and-subtract with a
//! running mask; host interaction marshals through the scratch area at
//! memory `[0, 64)`, which is also why every user pointer is offset by 64.

use crate::error::Result;
use sasm_data::{Block, Statement};
use sasm_parser::parse_block;
use std::collections::HashSet;

/// The parsed polyfill plus its function-name set, computed once per
/// translator instance.
#[derive(Debug, Clone)]
pub struct Polyfill {
    pub statements: Vec<Statement>,
    pub function_names: HashSet<String>,
}

impl Polyfill {
    pub fn parse() -> Result<Self> {
        let Block { statements } = parse_block(POLYFILL_SRC)?;
        let function_names = statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::FunctionDefinition(function) => Some(function.name.clone()),
                _ => None,
            })
            .collect();
        Ok(Self { statements, function_names })
    }
}

/// The fixed polyfill source, in the 64-bit wasm dialect.
pub const POLYFILL_SRC: &str = r#"{
function or_bool(a, b, c, d) -> r {
    r := i64.or(i64.or(a, b), i64.or(c, d))
}
// returns a + b + c plus carry value on 64 bit values.
// c should be at most 1
function add_carry(x, y, c) -> r, r_c {
    let t := i64.add(x, y)
    r := i64.add(t, c)
    r_c := i64.or(
        i64.lt_u(t, x),
        i64.lt_u(r, t)
    )
}
function add(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    let carry
    r4, carry := add_carry(x4, y4, 0)
    r3, carry := add_carry(x3, y3, carry)
    r2, carry := add_carry(x2, y2, carry)
    r1, carry := add_carry(x1, y1, carry)
}
function bit_negate(x) -> y {
    y := i64.xor(x, 0xffffffffffffffff)
}
function sub(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    // x - y = x + (~y + 1)
    let carry
    r4, carry := add_carry(x4, bit_negate(y4), 1)
    r3, carry := add_carry(x3, bit_negate(y3), carry)
    r2, carry := add_carry(x2, bit_negate(y2), carry)
    r1, carry := add_carry(x1, bit_negate(y1), carry)
}
function sub320(x1, x2, x3, x4, x5, y1, y2, y3, y4, y5) -> r1, r2, r3, r4, r5 {
    // x - y = x + (~y + 1)
    let carry
    r5, carry := add_carry(x5, bit_negate(y5), 1)
    r4, carry := add_carry(x4, bit_negate(y4), carry)
    r3, carry := add_carry(x3, bit_negate(y3), carry)
    r2, carry := add_carry(x2, bit_negate(y2), carry)
    r1, carry := add_carry(x1, bit_negate(y1), carry)
}
function sub512(x1, x2, x3, x4, x5, x6, x7, x8, y1, y2, y3, y4, y5, y6, y7, y8) -> r1, r2, r3, r4, r5, r6, r7, r8 {
    // x - y = x + (~y + 1)
    let carry
    r8, carry := add_carry(x8, bit_negate(y8), 1)
    r7, carry := add_carry(x7, bit_negate(y7), carry)
    r6, carry := add_carry(x6, bit_negate(y6), carry)
    r5, carry := add_carry(x5, bit_negate(y5), carry)
    r4, carry := add_carry(x4, bit_negate(y4), carry)
    r3, carry := add_carry(x3, bit_negate(y3), carry)
    r2, carry := add_carry(x2, bit_negate(y2), carry)
    r1, carry := add_carry(x1, bit_negate(y1), carry)
}
function split(x) -> hi, lo {
    hi := i64.shr_u(x, 32)
    lo := i64.and(x, 0xffffffff)
}
// Multiplies two 64 bit values resulting in a 128 bit
// value split into two 64 bit values.
function mul_64x64_128(x, y) -> hi, lo {
    let xh, xl := split(x)
    let yh, yl := split(y)

    let t0 := i64.mul(xl, yl)
    let t1 := i64.mul(xh, yl)
    let t2 := i64.mul(xl, yh)
    let t3 := i64.mul(xh, yh)

    let t0h, t0l := split(t0)
    let u1 := i64.add(t1, t0h)
    let u1h, u1l := split(u1)
    let u2 := i64.add(t2, u1l)

    lo := i64.or(i64.shl(u2, 32), t0l)
    hi := i64.add(t3, i64.add(i64.shr_u(u2, 32), u1h))
}
// Multiplies two 128 bit values resulting in a 256 bit
// value split into four 64 bit values.
function mul_128x128_256(x1, x2, y1, y2) -> r1, r2, r3, r4 {
    let ah, al := mul_64x64_128(x1, y1)
    let bh, bl := mul_64x64_128(x1, y2)
    let ch, cl := mul_64x64_128(x2, y1)
    let dh, dl := mul_64x64_128(x2, y2)

    r4 := dl

    let carry1, carry2
    let t1

    r3, carry1 := add_carry(bl, cl, 0)
    r3, carry2 := add_carry(r3, dh, 0)

    t1, carry1 := add_carry(bh, ch, carry1)
    r2, carry2 := add_carry(t1, al, carry2)

    r1 := i64.add(i64.add(ah, carry1), carry2)
}
// Multiplies two 256 bit values resulting in a 512 bit
// value split into eight 64 bit values.
function mul_256x256_512(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4, r5, r6, r7, r8 {
    let a1, a2, a3, a4 := mul_128x128_256(x1, x2, y1, y2)
    let b1, b2, b3, b4 := mul_128x128_256(x1, x2, y3, y4)
    let c1, c2, c3, c4 := mul_128x128_256(x3, x4, y1, y2)
    let d1, d2, d3, d4 := mul_128x128_256(x3, x4, y3, y4)

    r8 := d4
    r7 := d3

    let carry1, carry2

    r6, carry1 := add_carry(b4, c4, 0)
    r6, carry2 := add_carry(r6, d2, 0)

    r5, carry1 := add_carry(b3, c3, carry1)
    r5, carry2 := add_carry(r5, d1, carry2)

    r4, carry1 := add_carry(a4, b2, carry1)
    r4, carry2 := add_carry(r4, c2, carry2)

    r3, carry1 := add_carry(a3, b1, carry1)
    r3, carry2 := add_carry(r3, c1, carry2)

    r2, carry1 := add_carry(a2, carry1, carry2)
    r1 := i64.add(a1, carry1)
}
function mul(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    // high-limb products only feed the truncated upper half
    let b1, b2, b3, b4 := mul_128x128_256(x3, x4, y1, y2)
    let c1, c2, c3, c4 := mul_128x128_256(x1, x2, y3, y4)
    let d1, d2, d3, d4 := mul_128x128_256(x3, x4, y3, y4)
    r4 := d4
    r3 := d3
    let t1, t2
    t1, t2, r1, r2 := add(0, 0, b3, b4, 0, 0, c3, c4)
    t1, t2, r1, r2 := add(0, 0, r1, r2, 0, 0, d1, d2)
}
function div(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    if iszero256(y1, y2, y3, y4) {
        invalid()
    }

    let m1 := 0
    let m2 := 0
    let m3 := 0
    let m4 := 1

    for {} 1 {} {
        if i64.or(i64.eqz(i64.clz(y1)), gte_256x256_64(y1, y2, y3, y4, x1, x2, x3, x4)) {
            break
        }

        // y = y << 1
        y1 := i64.add(i64.shl(y1, 1), i64.shr_u(y2, 63))
        y2 := i64.add(i64.shl(y2, 1), i64.shr_u(y3, 63))
        y3 := i64.add(i64.shl(y3, 1), i64.shr_u(y4, 63))
        y4 := i64.shl(y4, 1)

        // m = m << 1
        m1 := i64.add(i64.shl(m1, 1), i64.shr_u(m2, 63))
        m2 := i64.add(i64.shl(m2, 1), i64.shr_u(m3, 63))
        m3 := i64.add(i64.shl(m3, 1), i64.shr_u(m4, 63))
        m4 := i64.shl(m4, 1)
    }

    for {} i64.xor(iszero256(m1, m2, m3, m4), 1) {} {
        if gte_256x256_64(x1, x2, x3, x4, y1, y2, y3, y4) {
            x1, x2, x3, x4 := sub(x1, x2, x3, x4, y1, y2, y3, y4)
            r1, r2, r3, r4 := add(r1, r2, r3, r4, m1, m2, m3, m4)
        }

        // y = y >> 1
        y4 := i64.add(i64.shr_u(y4, 1), i64.shl(y3, 63))
        y3 := i64.add(i64.shr_u(y3, 1), i64.shl(y2, 63))
        y2 := i64.add(i64.shr_u(y2, 1), i64.shl(y1, 63))
        y1 := i64.shr_u(y1, 1)

        // m = m >> 1
        m4 := i64.add(i64.shr_u(m4, 1), i64.shl(m3, 63))
        m3 := i64.add(i64.shr_u(m3, 1), i64.shl(m2, 63))
        m2 := i64.add(i64.shr_u(m2, 1), i64.shl(m1, 63))
        m1 := i64.shr_u(m1, 1)
    }
}
function mod(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    if iszero256(y1, y2, y3, y4) {
        invalid()
    }

    r1 := x1
    r2 := x2
    r3 := x3
    r4 := x4

    let m1 := 0
    let m2 := 0
    let m3 := 0
    let m4 := 1

    for {} 1 {} {
        if i64.or(i64.eqz(i64.clz(y1)), gte_256x256_64(y1, y2, y3, y4, r1, r2, r3, r4)) {
            break
        }

        // y = y << 1
        y1 := i64.add(i64.shl(y1, 1), i64.shr_u(y2, 63))
        y2 := i64.add(i64.shl(y2, 1), i64.shr_u(y3, 63))
        y3 := i64.add(i64.shl(y3, 1), i64.shr_u(y4, 63))
        y4 := i64.shl(y4, 1)

        // m = m << 1
        m1 := i64.add(i64.shl(m1, 1), i64.shr_u(m2, 63))
        m2 := i64.add(i64.shl(m2, 1), i64.shr_u(m3, 63))
        m3 := i64.add(i64.shl(m3, 1), i64.shr_u(m4, 63))
        m4 := i64.shl(m4, 1)
    }

    for {} i64.xor(iszero256(m1, m2, m3, m4), 1) {} {
        if gte_256x256_64(r1, r2, r3, r4, y1, y2, y3, y4) {
            r1, r2, r3, r4 := sub(r1, r2, r3, r4, y1, y2, y3, y4)
        }

        // y = y >> 1
        y4 := i64.add(i64.shr_u(y4, 1), i64.shl(y3, 63))
        y3 := i64.add(i64.shr_u(y3, 1), i64.shl(y2, 63))
        y2 := i64.add(i64.shr_u(y2, 1), i64.shl(y1, 63))
        y1 := i64.shr_u(y1, 1)

        // m = m >> 1
        m4 := i64.add(i64.shr_u(m4, 1), i64.shl(m3, 63))
        m3 := i64.add(i64.shr_u(m3, 1), i64.shl(m2, 63))
        m2 := i64.add(i64.shr_u(m2, 1), i64.shl(m1, 63))
        m1 := i64.shr_u(m1, 1)
    }
}
function mod320(x1, x2, x3, x4, x5, y1, y2, y3, y4, y5) -> r1, r2, r3, r4, r5 {
    if iszero320(y1, y2, y3, y4, y5) {
        invalid()
    }

    r1 := x1
    r2 := x2
    r3 := x3
    r4 := x4
    r5 := x5

    let m1 := 0
    let m2 := 0
    let m3 := 0
    let m4 := 0
    let m5 := 1

    for {} 1 {} {
        if i64.or(i64.eqz(i64.clz(y1)), gte_320x320_64(y1, y2, y3, y4, y5, r1, r2, r3, r4, r5)) {
            break
        }

        // y = y << 1
        y1 := i64.add(i64.shl(y1, 1), i64.shr_u(y2, 63))
        y2 := i64.add(i64.shl(y2, 1), i64.shr_u(y3, 63))
        y3 := i64.add(i64.shl(y3, 1), i64.shr_u(y4, 63))
        y4 := i64.add(i64.shl(y4, 1), i64.shr_u(y5, 63))
        y5 := i64.shl(y5, 1)

        // m = m << 1
        m1 := i64.add(i64.shl(m1, 1), i64.shr_u(m2, 63))
        m2 := i64.add(i64.shl(m2, 1), i64.shr_u(m3, 63))
        m3 := i64.add(i64.shl(m3, 1), i64.shr_u(m4, 63))
        m4 := i64.add(i64.shl(m4, 1), i64.shr_u(m5, 63))
        m5 := i64.shl(m5, 1)
    }

    for {} i64.xor(iszero320(m1, m2, m3, m4, m5), 1) {} {
        if gte_320x320_64(r1, r2, r3, r4, r5, y1, y2, y3, y4, y5) {
            r1, r2, r3, r4, r5 := sub320(r1, r2, r3, r4, r5, y1, y2, y3, y4, y5)
        }

        // y = y >> 1
        y5 := i64.add(i64.shr_u(y5, 1), i64.shl(y4, 63))
        y4 := i64.add(i64.shr_u(y4, 1), i64.shl(y3, 63))
        y3 := i64.add(i64.shr_u(y3, 1), i64.shl(y2, 63))
        y2 := i64.add(i64.shr_u(y2, 1), i64.shl(y1, 63))
        y1 := i64.shr_u(y1, 1)

        // m = m >> 1
        m5 := i64.add(i64.shr_u(m5, 1), i64.shl(m4, 63))
        m4 := i64.add(i64.shr_u(m4, 1), i64.shl(m3, 63))
        m3 := i64.add(i64.shr_u(m3, 1), i64.shl(m2, 63))
        m2 := i64.add(i64.shr_u(m2, 1), i64.shl(m1, 63))
        m1 := i64.shr_u(m1, 1)
    }
}
function mod512(x1, x2, x3, x4, x5, x6, x7, x8, y1, y2, y3, y4, y5, y6, y7, y8) -> r1, r2, r3, r4, r5, r6, r7, r8 {
    if iszero512(y1, y2, y3, y4, y5, y6, y7, y8) {
        invalid()
    }

    r1 := x1
    r2 := x2
    r3 := x3
    r4 := x4
    r5 := x5
    r6 := x6
    r7 := x7
    r8 := x8

    let m1 := 0
    let m2 := 0
    let m3 := 0
    let m4 := 0
    let m5 := 0
    let m6 := 0
    let m7 := 0
    let m8 := 1

    for {} 1 {} {
        if i64.or(i64.eqz(i64.clz(y1)), gte_512x512_64(y1, y2, y3, y4, y5, y6, y7, y8, r1, r2, r3, r4, r5, r6, r7, r8)) {
            break
        }

        // y = y << 1
        y1 := i64.add(i64.shl(y1, 1), i64.shr_u(y2, 63))
        y2 := i64.add(i64.shl(y2, 1), i64.shr_u(y3, 63))
        y3 := i64.add(i64.shl(y3, 1), i64.shr_u(y4, 63))
        y4 := i64.add(i64.shl(y4, 1), i64.shr_u(y5, 63))
        y5 := i64.add(i64.shl(y5, 1), i64.shr_u(y6, 63))
        y6 := i64.add(i64.shl(y6, 1), i64.shr_u(y7, 63))
        y7 := i64.add(i64.shl(y7, 1), i64.shr_u(y8, 63))
        y8 := i64.shl(y8, 1)

        // m = m << 1
        m1 := i64.add(i64.shl(m1, 1), i64.shr_u(m2, 63))
        m2 := i64.add(i64.shl(m2, 1), i64.shr_u(m3, 63))
        m3 := i64.add(i64.shl(m3, 1), i64.shr_u(m4, 63))
        m4 := i64.add(i64.shl(m4, 1), i64.shr_u(m5, 63))
        m5 := i64.add(i64.shl(m5, 1), i64.shr_u(m6, 63))
        m6 := i64.add(i64.shl(m6, 1), i64.shr_u(m7, 63))
        m7 := i64.add(i64.shl(m7, 1), i64.shr_u(m8, 63))
        m8 := i64.shl(m8, 1)
    }

    for {} i64.xor(iszero512(m1, m2, m3, m4, m5, m6, m7, m8), 1) {} {
        if gte_512x512_64(r1, r2, r3, r4, r5, r6, r7, r8, y1, y2, y3, y4, y5, y6, y7, y8) {
            r1, r2, r3, r4, r5, r6, r7, r8 := sub512(r1, r2, r3, r4, r5, r6, r7, r8, y1, y2, y3, y4, y5, y6, y7, y8)
        }

        // y = y >> 1
        y8 := i64.add(i64.shr_u(y8, 1), i64.shl(y7, 63))
        y7 := i64.add(i64.shr_u(y7, 1), i64.shl(y6, 63))
        y6 := i64.add(i64.shr_u(y6, 1), i64.shl(y5, 63))
        y5 := i64.add(i64.shr_u(y5, 1), i64.shl(y4, 63))
        y4 := i64.add(i64.shr_u(y4, 1), i64.shl(y3, 63))
        y3 := i64.add(i64.shr_u(y3, 1), i64.shl(y2, 63))
        y2 := i64.add(i64.shr_u(y2, 1), i64.shl(y1, 63))
        y1 := i64.shr_u(y1, 1)

        // m = m >> 1
        m8 := i64.add(i64.shr_u(m8, 1), i64.shl(m7, 63))
        m7 := i64.add(i64.shr_u(m7, 1), i64.shl(m6, 63))
        m6 := i64.add(i64.shr_u(m6, 1), i64.shl(m5, 63))
        m5 := i64.add(i64.shr_u(m5, 1), i64.shl(m4, 63))
        m4 := i64.add(i64.shr_u(m4, 1), i64.shl(m3, 63))
        m3 := i64.add(i64.shr_u(m3, 1), i64.shl(m2, 63))
        m2 := i64.add(i64.shr_u(m2, 1), i64.shl(m1, 63))
        m1 := i64.shr_u(m1, 1)
    }
}
function smod(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    if iszero256(y1, y2, y3, y4) {
        invalid()
    }

    // the result takes the dividend's sign
    let sign := i64.shr_u(x1, 63)
    if sign {
        x1, x2, x3, x4 := sub(0, 0, 0, 0, x1, x2, x3, x4)
    }
    if i64.shr_u(y1, 63) {
        y1, y2, y3, y4 := sub(0, 0, 0, 0, y1, y2, y3, y4)
    }

    r1, r2, r3, r4 := mod(x1, x2, x3, x4, y1, y2, y3, y4)

    if sign {
        r1, r2, r3, r4 := sub(0, 0, 0, 0, r1, r2, r3, r4)
    }
}
function exp(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    r4 := 1
    for {} i64.xor(iszero256(y1, y2, y3, y4), 1) {} {
        if i64.and(y4, 1) {
            r1, r2, r3, r4 := mul(r1, r2, r3, r4, x1, x2, x3, x4)
        }
        x1, x2, x3, x4 := mul(x1, x2, x3, x4, x1, x2, x3, x4)

        // y = y >> 1
        y4 := i64.add(i64.shr_u(y4, 1), i64.shl(y3, 63))
        y3 := i64.add(i64.shr_u(y3, 1), i64.shl(y2, 63))
        y2 := i64.add(i64.shr_u(y2, 1), i64.shl(y1, 63))
        y1 := i64.shr_u(y1, 1)
    }
}

function byte(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    if i64.eqz(i64.or(i64.or(x1, x2), x3)) {
        let component
        switch i64.div_u(x4, 8)
        case 0 { component := y1 }
        case 1 { component := y2 }
        case 2 { component := y3 }
        case 3 { component := y4 }
        default { }
        x4 := i64.mul(i64.rem_u(x4, 8), 8)
        r4 := i64.shr_u(component, i64.sub(56, x4))
        r4 := i64.and(0xff, r4)
    }
}
function xor(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    r1 := i64.xor(x1, y1)
    r2 := i64.xor(x2, y2)
    r3 := i64.xor(x3, y3)
    r4 := i64.xor(x4, y4)
}
function or(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    r1 := i64.or(x1, y1)
    r2 := i64.or(x2, y2)
    r3 := i64.or(x3, y3)
    r4 := i64.or(x4, y4)
}
function and(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    r1 := i64.and(x1, y1)
    r2 := i64.and(x2, y2)
    r3 := i64.and(x3, y3)
    r4 := i64.and(x4, y4)
}
function not(x1, x2, x3, x4) -> r1, r2, r3, r4 {
    let mask := 0xffffffffffffffff
    r1, r2, r3, r4 := xor(x1, x2, x3, x4, mask, mask, mask, mask)
}
function iszero(x1, x2, x3, x4) -> r1, r2, r3, r4 {
    r4 := iszero256(x1, x2, x3, x4)
}
function iszero256(x1, x2, x3, x4) -> r {
    r := i64.eqz(i64.or(i64.or(x1, x2), i64.or(x3, x4)))
}
function iszero320(x1, x2, x3, x4, x5) -> r {
    r := i64.eqz(i64.or(i64.or(i64.or(x1, x2), i64.or(x3, x4)), x5))
}
function iszero512(x1, x2, x3, x4, x5, x6, x7, x8) -> r {
    r := i64.eqz(i64.or(i64.or(i64.or(i64.or(x1, x2), i64.or(x3, x4)), i64.or(x5, x6)), i64.or(x7, x8)))
}
function eq(x1, x2, x3, x4, y1, y2, y3, y4) -> r1, r2, r3, r4 {
    if i64.eq(x1, y1) {
        if i64.eq(x2, y2) {
            if i64.eq(x3, y3) {
                if i64.eq(x4, y4) {
                    r4 := 1
                }
            }
        }
    }
}

// returns 0 if a == b, -1 if a < b and 1 if a > b
function cmp(a, b) -> r {
    switch i64.lt_u(a, b)
    case 1 { r := 0xffffffffffffffff }
    default {
        r := i64.ne(a, b)
    }
}
function lt_256x256_64(x1, x2, x3, x4, y1, y2, y3, y4) -> z {
    switch cmp(x1, y1)
    case 0 {
        switch cmp(x2, y2)
        case 0 {
            switch cmp(x3, y3)
            case 0 {
                z := i64.lt_u(x4, y4)
            }
            case 1 { z := 0 }
            default { z := 1 }
        }
        case 1 { z := 0 }
        default { z := 1 }
    }
    case 1 { z := 0 }
    default { z := 1 }
}
function lt_320x320_64(x1, x2, x3, x4, x5, y1, y2, y3, y4, y5) -> z {
    switch cmp(x1, y1)
    case 0 {
        z := lt_256x256_64(x2, x3, x4, x5, y2, y3, y4, y5)
    }
    case 1 { z := 0 }
    default { z := 1 }
}
function lt_512x512_64(x1, x2, x3, x4, x5, x6, x7, x8, y1, y2, y3, y4, y5, y6, y7, y8) -> z {
    switch cmp(x1, y1)
    case 0 {
        switch cmp(x2, y2)
        case 0 {
            switch cmp(x3, y3)
            case 0 {
                switch cmp(x4, y4)
                case 0 {
                    z := lt_256x256_64(x5, x6, x7, x8, y5, y6, y7, y8)
                }
                case 1 { z := 0 }
                default { z := 1 }
            }
            case 1 { z := 0 }
            default { z := 1 }
        }
        case 1 { z := 0 }
        default { z := 1 }
    }
    case 1 { z := 0 }
    default { z := 1 }
}
function lt(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    z4 := lt_256x256_64(x1, x2, x3, x4, y1, y2, y3, y4)
}
function gt(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    z4 := lt_256x256_64(y1, y2, y3, y4, x1, x2, x3, x4)
}
function gte_256x256_64(x1, x2, x3, x4, y1, y2, y3, y4) -> z {
    z := i64.xor(lt_256x256_64(x1, x2, x3, x4, y1, y2, y3, y4), 1)
}
function gte_320x320_64(x1, x2, x3, x4, x5, y1, y2, y3, y4, y5) -> z {
    z := i64.xor(lt_320x320_64(x1, x2, x3, x4, x5, y1, y2, y3, y4, y5), 1)
}
function gte_512x512_64(x1, x2, x3, x4, x5, x6, x7, x8, y1, y2, y3, y4, y5, y6, y7, y8) -> z {
    z := i64.xor(lt_512x512_64(x1, x2, x3, x4, x5, x6, x7, x8, y1, y2, y3, y4, y5, y6, y7, y8), 1)
}
function slt(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    // unsigned comparison with the sign bit of the top limb flipped
    x1 := i64.add(x1, 0x8000000000000000)
    y1 := i64.add(y1, 0x8000000000000000)
    z1, z2, z3, z4 := lt(x1, x2, x3, x4, y1, y2, y3, y4)
}
function sgt(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    z1, z2, z3, z4 := slt(y1, y2, y3, y4, x1, x2, x3, x4)
}

function shl_single(a, amount) -> x, y {
    // 1 <= amount <= 63
    x := i64.shr_u(a, i64.sub(64, amount))
    y := i64.shl(a, amount)
}

function shl(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    if i64.and(i64.and(i64.eqz(x1), i64.eqz(x2)), i64.eqz(x3)) {
        if i64.lt_u(x4, 256) {
            if i64.ge_u(x4, 128) {
                y1 := y3
                y2 := y4
                y3 := 0
                y4 := 0
                x4 := i64.sub(x4, 128)
            }
            if i64.ge_u(x4, 64) {
                y1 := y2
                y2 := y3
                y3 := y4
                y4 := 0
                x4 := i64.sub(x4, 64)
            }
            // wasm shifts are modulo 64, so amount 0 is its own case
            switch x4
            case 0 {
                z1 := y1
                z2 := y2
                z3 := y3
                z4 := y4
            }
            default {
                let t, r
                t, z4 := shl_single(y4, x4)
                r, z3 := shl_single(y3, x4)
                z3 := i64.or(z3, t)
                t, z2 := shl_single(y2, x4)
                z2 := i64.or(z2, r)
                r, z1 := shl_single(y1, x4)
                z1 := i64.or(z1, t)
            }
        }
    }
}

function shr_single(a, amount) -> x, y {
    // 1 <= amount <= 63
    y := i64.shl(a, i64.sub(64, amount))
    x := i64.shr_u(a, amount)
}

function shr(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    if i64.and(i64.and(i64.eqz(x1), i64.eqz(x2)), i64.eqz(x3)) {
        if i64.lt_u(x4, 256) {
            if i64.ge_u(x4, 128) {
                y4 := y2
                y3 := y1
                y2 := 0
                y1 := 0
                x4 := i64.sub(x4, 128)
            }
            if i64.ge_u(x4, 64) {
                y4 := y3
                y3 := y2
                y2 := y1
                y1 := 0
                x4 := i64.sub(x4, 64)
            }
            // wasm shifts are modulo 64, so amount 0 is its own case
            switch x4
            case 0 {
                z1 := y1
                z2 := y2
                z3 := y3
                z4 := y4
            }
            default {
                let t
                z4, t := shr_single(y4, x4)
                z3, t := shr_single(y3, x4)
                z4 := i64.or(z4, t)
                z2, t := shr_single(y2, x4)
                z3 := i64.or(z3, t)
                z1, t := shr_single(y1, x4)
                z2 := i64.or(z2, t)
            }
        }
    }
}
function sar(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    let sign := i64.shr_u(y1, 63)
    if i64.eqz(sign) {
        z1, z2, z3, z4 := shr(x1, x2, x3, x4, y1, y2, y3, y4)
    }
    if sign {
        switch or_bool(x1, x2, x3, i64.ge_u(x4, 256))
        case 0 {
            let sr1, sr2, sr3, sr4 := shr(x1, x2, x3, x4, y1, y2, y3, y4)
            let d1, d2, d3, d4 := sub(0, 0, 0, 256, x1, x2, x3, x4)
            let sl1, sl2, sl3, sl4 := shl(d1, d2, d3, d4, 0xffffffffffffffff, 0xffffffffffffffff, 0xffffffffffffffff, 0xffffffffffffffff)
            z1, z2, z3, z4 := or(sr1, sr2, sr3, sr4, sl1, sl2, sl3, sl4)
        }
        default {
            z1 := 0xffffffffffffffff
            z2 := 0xffffffffffffffff
            z3 := 0xffffffffffffffff
            z4 := 0xffffffffffffffff
        }
    }
}
function addmod(x1, x2, x3, x4, y1, y2, y3, y4, m1, m2, m3, m4) -> z1, z2, z3, z4 {
    // the sum is 257 bits wide, reduce in 320
    let carry
    let t1
    let t2
    let t3
    let t4
    t4, carry := add_carry(x4, y4, 0)
    t3, carry := add_carry(x3, y3, carry)
    t2, carry := add_carry(x2, y2, carry)
    t1, carry := add_carry(x1, y1, carry)

    let u1, u2, u3, u4, u5 := mod320(carry, t1, t2, t3, t4, 0, m1, m2, m3, m4)
    z1 := u2
    z2 := u3
    z3 := u4
    z4 := u5
}
function mulmod(x1, x2, x3, x4, y1, y2, y3, y4, m1, m2, m3, m4) -> z1, z2, z3, z4 {
    let p1, p2, p3, p4, p5, p6, p7, p8 := mul_256x256_512(x1, x2, x3, x4, y1, y2, y3, y4)
    let u1
    let u2
    let u3
    let u4
    u1, u2, u3, u4, z1, z2, z3, z4 := mod512(p1, p2, p3, p4, p5, p6, p7, p8, 0, 0, 0, 0, m1, m2, m3, m4)
}
function signextend(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    z1 := y1
    z2 := y2
    z3 := y3
    z4 := y4
    if i64.and(i64.eqz(i64.or(i64.or(x1, x2), x3)), i64.lt_u(x4, 31)) {
        let bit := i64.add(i64.mul(x4, 8), 7)
        let sm1, sm2, sm3, sm4 := shl(0, 0, 0, bit, 0, 0, 0, 1)
        let vm1, vm2, vm3, vm4 := sub(sm1, sm2, sm3, sm4, 0, 0, 0, 1)
        let b1, b2, b3, b4 := and(y1, y2, y3, y4, sm1, sm2, sm3, sm4)
        switch iszero256(b1, b2, b3, b4)
        case 1 {
            z1, z2, z3, z4 := and(y1, y2, y3, y4, vm1, vm2, vm3, vm4)
        }
        default {
            let nv1, nv2, nv3, nv4 := not(vm1, vm2, vm3, vm4)
            z1, z2, z3, z4 := or(y1, y2, y3, y4, nv1, nv2, nv3, nv4)
        }
    }
}
function u256_to_i128(x1, x2, x3, x4) -> v1, v2 {
    if i64.ne(0, i64.or(x1, x2)) { invalid() }
    v1 := x3
    v2 := x4
}

function u256_to_i64(x1, x2, x3, x4) -> v {
    if i64.ne(0, i64.or(i64.or(x1, x2), x3)) { invalid() }
    v := x4
}

function u256_to_i32(x1, x2, x3, x4) -> v {
    if i64.ne(0, i64.or(i64.or(x1, x2), x3)) { invalid() }
    if i64.ne(0, i64.shr_u(x4, 32)) { invalid() }
    v := x4
}

function u256_to_byte(x1, x2, x3, x4) -> v {
    if i64.ne(0, i64.or(i64.or(x1, x2), x3)) { invalid() }
    if i64.ne(0, i64.shr_u(x4, 8)) { invalid() }
    v := x4
}

function u256_to_i32ptr(x1, x2, x3, x4) -> v {
    v := u256_to_i32(x1, x2, x3, x4)
}

function keccak256(x1, x2, x3, x4, y1, y2, y3, y4) -> z1, z2, z3, z4 {
    // hashing is delegated to the host; no import exists for it yet
    unreachable()
}

function address() -> z1, z2, z3, z4 {
    eth.getAddress(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function balance(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    mstore_internal(0, x1, x2, x3, x4)
    eth.getExternalBalance(12, 32)
    z1, z2, z3, z4 := mload_internal(32)
}
function origin() -> z1, z2, z3, z4 {
    eth.getTxOrigin(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function caller() -> z1, z2, z3, z4 {
    eth.getCaller(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function callvalue() -> z1, z2, z3, z4 {
    eth.getCallValue(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function calldataload(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    eth.callDataCopy(0, u256_to_i32(x1, x2, x3, x4), 32)
    z1, z2, z3, z4 := mload_internal(0)
}
function calldatasize() -> z1, z2, z3, z4 {
    z4 := eth.getCallDataSize()
}
function calldatacopy(x1, x2, x3, x4, y1, y2, y3, y4, z1, z2, z3, z4) {
    eth.callDataCopy(
        i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64),
        u256_to_i32(y1, y2, y3, y4),
        u256_to_i32(z1, z2, z3, z4)
    )
}

function codesize() -> z1, z2, z3, z4 {
    z4 := eth.getCodeSize()
}
function codecopy(x1, x2, x3, x4, y1, y2, y3, y4, z1, z2, z3, z4) {
    eth.codeCopy(
        i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64),
        u256_to_i32(y1, y2, y3, y4),
        u256_to_i32(z1, z2, z3, z4)
    )
}

function gasprice() -> z1, z2, z3, z4 {
    eth.getTxGasPrice(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function extcodesize(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    mstore_internal(0, x1, x2, x3, x4)
    z4 := eth.getExternalCodeSize(12)
}
function extcodehash(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    // needs keccak256 of the external code; not available as an import
    unreachable()
}
function extcodecopy(a1, a2, a3, a4, p1, p2, p3, p4, o1, o2, o3, o4, l1, l2, l3, l4) {
    mstore_internal(0, a1, a2, a3, a4)
    let codeOffset := u256_to_i32(o1, o2, o3, o4)
    let codeLength := u256_to_i32(l1, l2, l3, l4)
    eth.externalCodeCopy(12, i64.add(u256_to_i32ptr(p1, p2, p3, p4), 64), codeOffset, codeLength)
}

function returndatasize() -> z1, z2, z3, z4 {
    z4 := eth.getReturnDataSize()
}
function returndatacopy(x1, x2, x3, x4, y1, y2, y3, y4, z1, z2, z3, z4) {
    eth.returnDataCopy(
        i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64),
        u256_to_i32(y1, y2, y3, y4),
        u256_to_i32(z1, z2, z3, z4)
    )
}

function blockhash(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    let r := eth.getBlockHash(u256_to_i64(x1, x2, x3, x4), 0)
    if i64.eqz(r) {
        z1, z2, z3, z4 := mload_internal(0)
    }
}
function coinbase() -> z1, z2, z3, z4 {
    eth.getBlockCoinbase(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function timestamp() -> z1, z2, z3, z4 {
    z4 := eth.getBlockTimestamp()
}
function number() -> z1, z2, z3, z4 {
    z4 := eth.getBlockNumber()
}
function difficulty() -> z1, z2, z3, z4 {
    eth.getBlockDifficulty(0)
    z1, z2, z3, z4 := mload_internal(0)
}
function gaslimit() -> z1, z2, z3, z4 {
    z4 := eth.getBlockGasLimit()
}
function pc() -> z1, z2, z3, z4 {
    // program counters don't survive the translation to structured code
    unreachable()
}
function gas() -> z1, z2, z3, z4 {
    z4 := eth.getGasLeft()
}

function pop(x1, x2, x3, x4) {
}

function endian_swap_16(x) -> y {
    let hi := i64.and(i64.shl(x, 8), 0xff00)
    let lo := i64.and(i64.shr_u(x, 8), 0xff)
    y := i64.or(hi, lo)
}

function endian_swap_32(x) -> y {
    let hi := i64.shl(endian_swap_16(x), 16)
    let lo := endian_swap_16(i64.shr_u(x, 16))
    y := i64.or(hi, lo)
}

function endian_swap(x) -> y {
    let hi := i64.shl(endian_swap_32(x), 32)
    let lo := endian_swap_32(i64.shr_u(x, 32))
    y := i64.or(hi, lo)
}
function mload(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    // skip the scratch space
    let pos := i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64)
    z1, z2, z3, z4 := mload_internal(pos)
}
function mload_internal(pos) -> z1, z2, z3, z4 {
    z1 := endian_swap(i64.load(pos))
    z2 := endian_swap(i64.load(i64.add(pos, 8)))
    z3 := endian_swap(i64.load(i64.add(pos, 16)))
    z4 := endian_swap(i64.load(i64.add(pos, 24)))
}
function mstore(x1, x2, x3, x4, y1, y2, y3, y4) {
    // skip the scratch space
    let pos := i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64)
    mstore_internal(pos, y1, y2, y3, y4)
}
function mstore_internal(pos, y1, y2, y3, y4) {
    i64.store(pos, endian_swap(y1))
    i64.store(i64.add(pos, 8), endian_swap(y2))
    i64.store(i64.add(pos, 16), endian_swap(y3))
    i64.store(i64.add(pos, 24), endian_swap(y4))
}
function mstore8(x1, x2, x3, x4, y1, y2, y3, y4) {
    let pos := i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64)
    let v := u256_to_byte(y1, y2, y3, y4)
    i64.store8(pos, v)
}
function msize() -> z1, z2, z3, z4 {
    // the scratch offset makes the wasm memory size unobservable here
    unreachable()
}
function sload(x1, x2, x3, x4) -> z1, z2, z3, z4 {
    mstore_internal(0, x1, x2, x3, x4)
    eth.storageLoad(0, 32)
    z1, z2, z3, z4 := mload_internal(32)
}

function sstore(x1, x2, x3, x4, y1, y2, y3, y4) {
    mstore_internal(0, x1, x2, x3, x4)
    mstore_internal(32, y1, y2, y3, y4)
    eth.storageStore(0, 32)
}

function log0(p1, p2, p3, p4, s1, s2, s3, s4) {
    let dataOffset := u256_to_i32ptr(p1, p2, p3, p4)
    let dataLength := u256_to_i32ptr(s1, s2, s3, s4)
    eth.log(i64.add(dataOffset, 64), dataLength, 0, 0, 0, 0, 0)
}
function log1(
    p1, p2, p3, p4, s1, s2, s3, s4,
    t11, t12, t13, t14
) {
    let dataOffset := u256_to_i32ptr(p1, p2, p3, p4)
    let dataLength := u256_to_i32ptr(s1, s2, s3, s4)
    let topic1Offset := u256_to_i32ptr(t11, t12, t13, t14)
    eth.log(i64.add(dataOffset, 64), dataLength, 1, i64.add(topic1Offset, 64), 0, 0, 0)
}
function log2(
    p1, p2, p3, p4, s1, s2, s3, s4,
    t11, t12, t13, t14,
    t21, t22, t23, t24
) {
    let dataOffset := u256_to_i32ptr(p1, p2, p3, p4)
    let dataLength := u256_to_i32ptr(s1, s2, s3, s4)
    let topic1Offset := u256_to_i32ptr(t11, t12, t13, t14)
    let topic2Offset := u256_to_i32ptr(t21, t22, t23, t24)
    eth.log(i64.add(dataOffset, 64), dataLength, 2, i64.add(topic1Offset, 64), i64.add(topic2Offset, 64), 0, 0)
}
function log3(
    p1, p2, p3, p4, s1, s2, s3, s4,
    t11, t12, t13, t14,
    t21, t22, t23, t24,
    t31, t32, t33, t34
) {
    let dataOffset := u256_to_i32ptr(p1, p2, p3, p4)
    let dataLength := u256_to_i32ptr(s1, s2, s3, s4)
    let topic1Offset := u256_to_i32ptr(t11, t12, t13, t14)
    let topic2Offset := u256_to_i32ptr(t21, t22, t23, t24)
    let topic3Offset := u256_to_i32ptr(t31, t32, t33, t34)
    eth.log(i64.add(dataOffset, 64), dataLength, 3, i64.add(topic1Offset, 64), i64.add(topic2Offset, 64), i64.add(topic3Offset, 64), 0)
}
function log4(
    p1, p2, p3, p4, s1, s2, s3, s4,
    t11, t12, t13, t14,
    t21, t22, t23, t24,
    t31, t32, t33, t34,
    t41, t42, t43, t44
) {
    let dataOffset := u256_to_i32ptr(p1, p2, p3, p4)
    let dataLength := u256_to_i32ptr(s1, s2, s3, s4)
    let topic1Offset := u256_to_i32ptr(t11, t12, t13, t14)
    let topic2Offset := u256_to_i32ptr(t21, t22, t23, t24)
    let topic3Offset := u256_to_i32ptr(t31, t32, t33, t34)
    let topic4Offset := u256_to_i32ptr(t41, t42, t43, t44)
    eth.log(i64.add(dataOffset, 64), dataLength, 4, i64.add(topic1Offset, 64), i64.add(topic2Offset, 64), i64.add(topic3Offset, 64), i64.add(topic4Offset, 64))
}

function create(
    x1, x2, x3, x4,
    y1, y2, y3, y4,
    z1, z2, z3, z4
) -> a1, a2, a3, a4 {
    let v1, v2 := u256_to_i128(x1, x2, x3, x4)
    let dataOffset := i64.add(u256_to_i32ptr(y1, y2, y3, y4), 64)
    let dataLength := u256_to_i32(z1, z2, z3, z4)
    mstore_internal(0, 0, 0, v1, v2)

    let r := eth.create(0, dataOffset, dataLength, 32)
    if i64.eqz(r) {
        a1, a2, a3, a4 := mload_internal(32)
    }
    if i64.or(i64.eq(r, 1), i64.eq(r, 2)) {
        a4 := r
    }
}
function call(
    a1, a2, a3, a4,
    b1, b2, b3, b4,
    c1, c2, c3, c4,
    d1, d2, d3, d4,
    e1, e2, e3, e4,
    f1, f2, f3, f4,
    g1, g2, g3, g4
) -> x1, x2, x3, x4 {
    let g := u256_to_i64(a1, a2, a3, a4)
    let dataOffset := i64.add(u256_to_i32ptr(d1, d2, d3, d4), 64)
    let dataLength := u256_to_i32(e1, e2, e3, e4)
    mstore_internal(0, b1, b2, b3, b4)
    let v1, v2 := u256_to_i128(c1, c2, c3, c4)
    mstore_internal(32, 0, 0, v1, v2)
    x4 := eth.call(g, 12, 32, dataOffset, dataLength)
}
function callcode(
    a1, a2, a3, a4,
    b1, b2, b3, b4,
    c1, c2, c3, c4,
    d1, d2, d3, d4,
    e1, e2, e3, e4,
    f1, f2, f3, f4,
    g1, g2, g3, g4
) -> x1, x2, x3, x4 {
    let g := u256_to_i64(a1, a2, a3, a4)
    let dataOffset := i64.add(u256_to_i32ptr(d1, d2, d3, d4), 64)
    let dataLength := u256_to_i32(e1, e2, e3, e4)
    mstore_internal(0, b1, b2, b3, b4)
    let v1, v2 := u256_to_i128(c1, c2, c3, c4)
    mstore_internal(32, 0, 0, v1, v2)
    x4 := eth.callCode(g, 12, 32, dataOffset, dataLength)
}
function delegatecall(
    a1, a2, a3, a4,
    b1, b2, b3, b4,
    c1, c2, c3, c4,
    d1, d2, d3, d4,
    e1, e2, e3, e4,
    f1, f2, f3, f4
) -> x1, x2, x3, x4 {
    let g := u256_to_i64(a1, a2, a3, a4)
    let dataOffset := i64.add(u256_to_i32ptr(c1, c2, c3, c4), 64)
    let dataLength := u256_to_i32(d1, d2, d3, d4)
    mstore_internal(0, b1, b2, b3, b4)
    x4 := eth.callDelegate(g, 12, dataOffset, dataLength)
}
function staticcall(
    a1, a2, a3, a4,
    b1, b2, b3, b4,
    c1, c2, c3, c4,
    d1, d2, d3, d4,
    e1, e2, e3, e4,
    f1, f2, f3, f4
) -> x1, x2, x3, x4 {
    let g := u256_to_i64(a1, a2, a3, a4)
    let dataOffset := i64.add(u256_to_i32ptr(c1, c2, c3, c4), 64)
    let dataLength := u256_to_i32(d1, d2, d3, d4)
    mstore_internal(0, b1, b2, b3, b4)
    x4 := eth.callStatic(g, 12, dataOffset, dataLength)
}
function create2(
    a1, a2, a3, a4,
    b1, b2, b3, b4,
    c1, c2, c3, c4,
    d1, d2, d3, d4
) -> x1, x2, x3, x4 {
    // no matching host import exists
    unreachable()
}
function selfdestruct(a1, a2, a3, a4) {
    mstore_internal(0, a1, a2, a3, a4)
    // addresses are padded to 32 bytes, discard the first 12
    eth.selfDestruct(12)
}

function return(x1, x2, x3, x4, y1, y2, y3, y4) {
    eth.finish(
        i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64),
        u256_to_i32(y1, y2, y3, y4)
    )
}
function revert(x1, x2, x3, x4, y1, y2, y3, y4) {
    eth.revert(
        i64.add(u256_to_i32ptr(x1, x2, x3, x4), 64),
        u256_to_i32(y1, y2, y3, y4)
    )
}
function invalid() {
    unreachable()
}
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyfill_parses() {
        let polyfill = Polyfill::parse().expect("polyfill must parse");
        for name in ["or_bool", "add", "mulmod", "mload", "sstore", "return", "invalid"] {
            assert!(polyfill.function_names.contains(name), "missing `{name}`");
        }
        // Only function definitions at the top level.
        assert_eq!(polyfill.statements.len(), polyfill.function_names.len());
    }

    #[test]
    fn polyfill_is_valid_wasm_dialect_code() {
        let polyfill = Polyfill::parse().unwrap();
        let block = Block { statements: polyfill.statements };
        sasm_analyses::analyze_block(&sasm_data::Dialect::wasm64(), &block)
            .expect("polyfill must analyze cleanly");
    }
}
