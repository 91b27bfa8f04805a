use alloy_primitives::U256;
use std::fmt::Write;

/// Splits a 256-bit value into four 64-bit limbs in big-endian limb order
/// (limb 1 is most significant).
pub fn be_limbs(value: U256) -> [u64; 4] {
    let le = value.as_limbs();
    [le[3], le[2], le[1], le[0]]
}

/// Reassembles a 256-bit value from four big-endian limbs.
pub fn from_be_limbs(limbs: [u64; 4]) -> U256 {
    U256::from_limbs([limbs[3], limbs[2], limbs[1], limbs[0]])
}

/// Compares rendered structured-assembly text against a golden string.
///
/// Both sides are compared line by line, ignoring surrounding blank lines
/// and trailing whitespace, so golden strings can be indented raw literals.
/// On mismatch the panic message carries an inline diff (`-` expected,
/// `+` actual) with the first differing line called out, which keeps
/// limb-expanded output readable when only one limb differs.
pub fn assert_text_eq(actual: &str, expected: &str, context: &str) {
    let actual_lines: Vec<&str> = actual.trim().lines().map(str::trim_end).collect();
    let expected_lines: Vec<&str> = expected.trim().lines().map(str::trim_end).collect();
    if actual_lines == expected_lines {
        return;
    }

    let first_mismatch = actual_lines
        .iter()
        .zip(&expected_lines)
        .position(|(got, want)| got != want)
        .unwrap_or_else(|| actual_lines.len().min(expected_lines.len()));

    let mut diff = String::new();
    for line in 0..actual_lines.len().max(expected_lines.len()) {
        let got = actual_lines.get(line).copied();
        let want = expected_lines.get(line).copied();
        match (want, got) {
            (Some(want), Some(got)) if want == got => {
                writeln!(diff, "  {want}").expect("write failed");
            }
            (want, got) => {
                if let Some(want) = want {
                    writeln!(diff, "- {want}").expect("write failed");
                }
                if let Some(got) = got {
                    writeln!(diff, "+ {got}").expect("write failed");
                }
            }
        }
    }

    panic!(
        "{context} differs from the golden text (first mismatch on line {}):\n{diff}",
        first_mismatch + 1
    );
}
