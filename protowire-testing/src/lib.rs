//! Internal testing utilities for the protowire crates.
//!
//! This provides table-driven test cases, a hex literal parser for writing
//! expected wire bytes and seeded generators for numeric edge cases.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Utility for creating parametrized (aka. table-driven) tests.
///
/// Create a `Debug` struct, conventionally named `Case`, put the cases in a
/// collection and call `test_each` with the test body. Every case is run,
/// panics are caught and the test fails at the end with a list of the cases
/// that panicked.
///
/// ```
/// use protowire_testing::{TestCases, from_hex};
///
/// #[derive(Debug)]
/// struct Case {
///     hex: &'static str,
///     len: usize,
/// }
///
/// let cases = [
///     Case { hex: "08 96 01", len: 3 },
///     Case { hex: "", len: 0 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(from_hex(case.hex).len(), case.len);
/// });
/// ```
///
/// Cases and captured values must be unwind safe. Wrap offending values in
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe) or construct them
/// inside the test function.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Call `test` with a reference to each case, catching any panics.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Variant of [`test_each`](TestCases::test_each) which passes cases by
    /// value. Each case is formatted before the call so that failures can
    /// still be reported.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let mut failures = Vec::new();
        for case in self {
            if std::panic::catch_unwind(|| test(&case)).is_err() {
                failures.push(format!("{:?}", case));
            }
        }
        report(failures);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe,
    {
        let mut failures = Vec::new();
        for case in self {
            let test = &test;
            let case_str = format!("{:?}", case);
            if std::panic::catch_unwind(move || test(case)).is_err() {
                failures.push(case_str);
            }
        }
        report(failures);
    }
}

fn report(failures: Vec<String>) {
    assert_eq!(
        failures.len(),
        0,
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

/// Parse a string of hex digit pairs into bytes.
///
/// Whitespace is ignored so that fields can be visually separated, eg.
/// `"0a 03 616263"`.
///
/// Panics if the string contains non-hex characters or an odd number of
/// digits.
pub fn from_hex(hex: &str) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            c.to_digit(16)
                .unwrap_or_else(|| panic!("invalid hex digit {:?}", c)) as u8
        })
        .collect();
    assert!(digits.len() % 2 == 0, "odd number of hex digits in {:?}", hex);
    digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect()
}

/// Format bytes as lowercase hex digit pairs without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 64-bit values that exercise varint length boundaries, the 32-bit split
/// and the limit of integer precision in an `f64`.
pub fn boundary_u64s() -> Vec<u64> {
    let mut values = vec![0, 1, 127, 128, 150, 16383, 16384];
    for shift in [31, 32, 35, 49, 52, 53, 56, 63] {
        let v = 1u64 << shift;
        values.extend([v - 1, v, v + 1]);
    }
    values.extend([u32::MAX as u64, i64::MAX as u64, u64::MAX - 1, u64::MAX]);
    values
}

/// Generate `n` random `u64` values with a fixed seed.
///
/// Values are drawn so that all varint lengths are represented, rather than
/// being dominated by 10-byte encodings.
pub fn random_u64s(seed: u64, n: usize) -> Vec<u64> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n)
        .map(|_| {
            let bits = rng.u32(1..=64);
            if bits == 64 {
                rng.u64(..)
            } else {
                rng.u64(..1u64 << bits)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{TestCases, boundary_u64s, from_hex, random_u64s, to_hex};

    #[test]
    fn test_test_cases_success() {
        #[derive(Clone, Debug)]
        struct Case {
            x: i32,
        }

        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.clone().test_each(|case| _ = case.x);
        cases.test_each_value(|case| _ = case.x);
    }

    #[test]
    #[should_panic(expected = "2 test cases failed")]
    fn test_test_each_failure() {
        #[derive(Debug)]
        struct Case {
            x: i32,
        }

        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.test_each(|case| {
            _ = case.x;
            panic!("oh no");
        })
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(from_hex("08 96 01"), [0x08, 0x96, 0x01]);
        assert_eq!(from_hex("6a09646f63"), [0x6a, 0x09, 0x64, 0x6f, 0x63]);
        assert!(from_hex("").is_empty());
        assert_eq!(to_hex(&from_hex("ff 00 7f")), "ff007f");
    }

    #[test]
    #[should_panic(expected = "odd number")]
    fn test_from_hex_odd() {
        from_hex("abc");
    }

    #[test]
    fn test_number_generators() {
        let values = boundary_u64s();
        assert!(values.contains(&(1 << 53)));
        assert!(values.contains(&u64::MAX));

        let a = random_u64s(1234, 100);
        let b = random_u64s(1234, 100);
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v < 1 << 32));
    }
}
