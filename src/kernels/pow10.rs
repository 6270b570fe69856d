//! Process-wide read-only powers-of-ten tables.
//!
//! Scaled decimal values are stored as `(mantissa, exponent)` pairs meaning
//! `mantissa * 10^exponent`. Both the encoding selector and the decode path
//! must agree bit-for-bit on how that product is evaluated, so every
//! power-of-ten lookup in the crate goes through this module.

/// Exact powers of ten representable in an `i64`, `10^0` through `10^18`.
pub const POW10_LONG: [i64; 19] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
];

/// The number of decimal digits a fixed-point mantissa may span before the
/// rescaling pass must give up and fall back to floating-point storage.
pub const MAX_FIXED_DIGITS: i32 = POW10_LONG.len() as i32;

/// `10^exp` as an exact `i64`.
///
/// Callers must keep `exp` inside `[0, MAX_FIXED_DIGITS)`; the selector's
/// overflow detection guarantees this on every internal path.
#[inline]
pub fn pow10_long(exp: i32) -> i64 {
    POW10_LONG[exp as usize]
}

/// `10^exp` as an `f64`, exact wherever the value fits an `i64` mantissa.
#[inline]
pub fn pow10(exp: i32) -> f64 {
    if (0..MAX_FIXED_DIGITS).contains(&exp) {
        POW10_LONG[exp as usize] as f64
    } else {
        10f64.powi(exp)
    }
}
