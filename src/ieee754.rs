//! Conversion between floating point values and their IEEE 754 bit patterns.
//!
//! Values are assembled from and decomposed into sign, exponent and mantissa
//! using exact floating point arithmetic on 32-bit halves. NaN is always
//! encoded with the canonical patterns `0x7fffffff` (float) and
//! `0x7fffffff_ffffffff` (double).

const TWO_TO_20: f64 = (1u64 << 20) as f64;
const TWO_TO_23: f64 = (1u64 << 23) as f64;
const TWO_TO_32: f64 = (1u64 << 32) as f64;
const TWO_TO_52: f64 = (1u64 << 52) as f64;

/// Return 2^exp for exponents in the subnormal or normal range of a double.
fn pow2(exp: i32) -> f64 {
    debug_assert!((-1074..=1023).contains(&exp));
    if exp >= -1022 {
        f64::from_bits(((exp + 1023) as u64) << 52)
    } else {
        f64::from_bits(1u64 << (exp + 1074))
    }
}

fn sign_of(bits: u32) -> f64 {
    if bits >> 31 == 1 { -1. } else { 1. }
}

/// Decode a double from the low and high 32 bits of its encoding.
pub fn f64_from_halves(low: u32, high: u32) -> f64 {
    let sign = sign_of(high);
    let exp = ((high >> 20) & 0x7ff) as i32;
    let mant = TWO_TO_32 * (high & 0xf_ffff) as f64 + low as f64;

    match exp {
        0x7ff if mant != 0. => f64::NAN,
        0x7ff => sign * f64::INFINITY,
        0 => sign * pow2(-1074) * mant,
        _ => sign * pow2(exp - 1075) * (mant + TWO_TO_52),
    }
}

/// Decode a float from its 32-bit encoding.
pub fn f32_from_bits(bits: u32) -> f32 {
    let sign = sign_of(bits);
    let exp = ((bits >> 23) & 0xff) as i32;
    let mant = (bits & 0x7f_ffff) as f64;

    // The result is computed exactly as a double and is representable as a
    // float, so the final cast does not round.
    let value = match exp {
        0xff if mant != 0. => return f32::NAN,
        0xff => sign * f64::INFINITY,
        0 => sign * pow2(-149) * mant,
        _ => sign * pow2(exp - 150) * (mant + TWO_TO_23),
    };
    value as f32
}

/// Encode a double as the low and high 32 bits of its bit pattern.
pub fn f64_to_halves(value: f64) -> (u32, u32) {
    if value.is_nan() {
        return (0xffff_ffff, 0x7fff_ffff);
    }
    let sign = (value.is_sign_negative() as u32) << 31;
    let abs = value.abs();

    if abs == 0. {
        (0, sign)
    } else if abs > f64::MAX {
        (0, sign | 0x7ff0_0000)
    } else if abs < f64::MIN_POSITIVE {
        // Subnormal. The mantissa is an exact integer multiple of 2^-1074.
        let mant = (abs / pow2(-1074)) as u64;
        (mant as u32, sign | (mant >> 32) as u32)
    } else {
        let exp = normalize_exponent(abs, 1023, -1022);
        // `mant` is in [1, 2). Drop the implicit leading one.
        let mant = abs * pow2(-exp);
        let mant_bits = (mant * TWO_TO_52) as u64;
        let mant_high = ((mant * TWO_TO_20) as u32) & 0xf_ffff;
        let biased_exp = ((exp + 1023) as u32) << 20;
        (mant_bits as u32, sign | biased_exp | mant_high)
    }
}

/// Encode a float as its 32-bit pattern.
pub fn f32_to_bits(value: f32) -> u32 {
    if value.is_nan() {
        return 0x7fff_ffff;
    }
    let sign = (value.is_sign_negative() as u32) << 31;
    let abs = value.abs() as f64;

    if abs == 0. {
        sign
    } else if abs > f32::MAX as f64 {
        sign | 0x7f80_0000
    } else if abs < f32::MIN_POSITIVE as f64 {
        let mant = (abs / pow2(-149)).round() as u32;
        sign | mant
    } else {
        let exp = normalize_exponent(abs, 127, -126);
        let mant = ((abs * pow2(-exp) * TWO_TO_23).round() as u32) & 0x7f_ffff;
        sign | (((exp + 127) as u32) << 23) | mant
    }
}

/// Find the exponent `e` such that `abs / 2^e` is in `[1, 2)`, by repeated
/// halving or doubling. Logarithms can be off by one near the limits of
/// precision.
fn normalize_exponent(abs: f64, max_exp: i32, min_exp: i32) -> i32 {
    let mut x = abs;
    let mut exp = 0;
    if x >= 2. {
        while x >= 2. && exp < max_exp {
            exp += 1;
            x /= 2.;
        }
    } else {
        while x < 1. && exp > min_exp {
            x *= 2.;
            exp -= 1;
        }
    }
    exp
}
