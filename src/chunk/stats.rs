//! The statistics passes that feed the encoding selector.
//!
//! Two linear scans over an accumulator's stored values:
//! 1. the rollup scan ([`Counts::scan`]) counting missing / categorical /
//!    non-zero entries, consumed by the type classifier, and
//! 2. the fixed-point scan ([`FixedPointStats::scan`]) computing the value
//!    range and the common decimal exponent every mantissa can be rescaled
//!    to, with overflow detection when the exponent spread exceeds what an
//!    `i64` mantissa can absorb.
//!
//! Both are pure reads; neither mutates the accumulator.

use crate::chunk::accumulator::{Accumulator, CATEGORICAL_EXPONENT, NA_EXPONENT};
use crate::kernels::pow10::{pow10, pow10_long, MAX_FIXED_DIGITS};

/// Mantissas above this magnitude do not round-trip through an `f32`
/// mantissa; used to veto narrow scaled layouts for fractional data.
pub(crate) const MAX_FLOAT_MANTISSA: i64 = 0x7F_FFFF;

/// Rollup counters over the stored (non-implicit) entries of a block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    /// Rows appended as missing.
    pub missing: usize,
    /// Rows appended as categorical codes.
    pub categorical: usize,
    /// Rows holding a non-zero value (missing rows excluded).
    pub nonzero: usize,
}

impl Counts {
    /// One linear scan over the stored entries.
    pub(crate) fn scan(acc: &Accumulator) -> Self {
        let mut c = Counts::default();
        if acc.is_floats() {
            for &d in acc.floats_slice() {
                if d.is_nan() {
                    c.missing += 1;
                } else if d != 0.0 {
                    c.nonzero += 1;
                }
            }
        } else {
            let (mantissas, _) = acc.scaled_slices();
            for j in 0..mantissas.len() {
                if acc.is_na_stored(j) {
                    c.missing += 1;
                } else {
                    if acc.is_categorical_stored(j) {
                        c.categorical += 1;
                    }
                    if mantissas[j] != 0 {
                        c.nonzero += 1;
                    }
                }
            }
        }
        c
    }
}

/// The coarse semantic kind of a column block, decided once per finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every row is missing (this includes the empty block).
    AllMissing,
    /// Every non-missing row is a categorical code.
    Categorical,
    /// Timestamp parses outnumber plain numbers.
    Temporal,
    Numeric,
}

/// Heuristic mapping the rollup counters to a [`ColumnKind`].
///
/// `time_hits` is the count of successful timestamp parses reported by the
/// ingestion layer; a tie between timestamps and plain numbers goes to
/// [`ColumnKind::Temporal`].
pub(crate) fn classify(c: &Counts, total: usize, time_hits: usize) -> ColumnKind {
    if c.missing == total {
        return ColumnKind::AllMissing;
    }
    if c.categorical > 0 && c.categorical + c.missing == total {
        return ColumnKind::Categorical;
    }
    let numbers = total as i64 - c.missing as i64 - time_hits as i64;
    if time_hits as i64 >= numbers {
        ColumnKind::Temporal
    } else {
        ColumnKind::Numeric
    }
}

/// The statistics record the encoding selector consumes.
///
/// `lemin`/`lemax` are the smallest and largest mantissas after rescaling
/// every value to the common exponent `xmin`; `min`/`max` are the plain
/// numeric extremes. `overflow` is raised when rescaling left the
/// representable-digit bound and the fixed-point layouts are off the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FixedPointStats {
    pub min: f64,
    pub max: f64,
    pub xmin: i32,
    pub lemin: i64,
    pub lemax: i64,
    pub overflow: bool,
    pub float_overflow: bool,
}

impl FixedPointStats {
    /// Scans the scaled buffer. `sparse_padded` widens the range to include
    /// the implicit zeros of a sparse block.
    ///
    /// Trailing decimal zeros are stripped again here (appends only strip
    /// while the exponent is negative), so a column like {100, 1000} still
    /// normalizes to mantissas {1, 10} at `xmin = 2`.
    pub(crate) fn scan(acc: &Accumulator, sparse_padded: bool) -> Self {
        let (mantissas, exponents) = acc.scaled_slices();
        let mut s = FixedPointStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            xmin: i32::MAX,
            lemin: 0,
            lemax: 0,
            overflow: false,
            float_overflow: false,
        };
        let mut first = true;
        for j in 0..mantissas.len() {
            if acc.is_na_stored(j) {
                continue;
            }
            let mut l = mantissas[j];
            let mut x = exponents[j];
            debug_assert_ne!(x, NA_EXPONENT);
            if x == CATEGORICAL_EXPONENT {
                x = 0; // a categorical code carries no scaling
            }
            let d = l as f64 * pow10(x);
            if d < s.min {
                s.min = d;
            }
            if d > s.max {
                s.max = d;
            }
            while l != 0 && l % 10 == 0 {
                l /= 10;
                x += 1;
            }
            s.float_overflow |= l.unsigned_abs() > MAX_FLOAT_MANTISSA as u64;
            if first {
                first = false;
                s.xmin = x;
                s.lemin = l;
                s.lemax = l;
                continue;
            }
            // Track the extremes at the smallest exponent seen so far; any
            // rescale that leaves the digit bound poisons the whole block.
            if x < s.xmin {
                if s.overflow || s.xmin - x >= MAX_FIXED_DIGITS {
                    s.overflow = true;
                    continue;
                }
                let p = pow10_long(s.xmin - x);
                match (s.lemin.checked_mul(p), s.lemax.checked_mul(p)) {
                    (Some(lo), Some(hi)) => {
                        s.lemin = lo;
                        s.lemax = hi;
                        s.xmin = x;
                    }
                    _ => {
                        s.overflow = true;
                        continue;
                    }
                }
            }
            if s.overflow || x - s.xmin >= MAX_FIXED_DIGITS {
                s.overflow = true;
                continue;
            }
            match l.checked_mul(pow10_long(x - s.xmin)) {
                Some(le) => {
                    if le < s.lemin {
                        s.lemin = le;
                    }
                    if le > s.lemax {
                        s.lemax = le;
                    }
                }
                None => s.overflow = true,
            }
        }
        if sparse_padded {
            s.lemin = s.lemin.min(0);
            s.lemax = s.lemax.max(0);
            s.min = s.min.min(0.0);
            s.max = s.max.max(0.0);
        }
        s
    }
}
