//! The encoding selector: a pure function from the statistics record to a
//! concrete layout descriptor.
//!
//! This is deliberately free of any accumulator access so the whole decision
//! cascade can be unit-tested straight against hand-built statistics. The
//! cascade is ordered narrowest-first and the first match wins; every layout
//! it returns must round-trip the original values exactly (integers) or to
//! double precision (when exactness at a narrower width was unattainable).

use crate::chunk::layout::{ChunkLayout, LaneWidth};
use crate::chunk::stats::{Counts, FixedPointStats};

/// Largest magnitude of the common exponent the fixed-point layouts accept;
/// outside this band the block falls back to plain doubles.
const MAX_SCALE_EXPONENT: i32 = 35;

/// Picks the layout for a block given its statistics.
///
/// `sparse` is the finalize-time sparsity verdict
/// (`32 * (missing + nonzero) < total`); the caller compacts the buffer to
/// match before serializing.
pub(crate) fn select_layout(
    s: &FixedPointStats,
    c: &Counts,
    sparse: bool,
    _total: usize,
) -> ChunkLayout {
    // Constant non-missing column: one decode parameter, no payload.
    if c.missing == 0 && s.min == s.max {
        return if s.min as i64 as f64 == s.min {
            ChunkLayout::ConstantInt {
                value: s.min as i64,
            }
        } else {
            ChunkLayout::ConstantFloat { value: s.min }
        };
    }

    // Boolean column: 1 bit per row, 2 when a missing sentinel is needed.
    if s.max == 1.0 && s.min == 0.0 && s.xmin == 0 && !s.overflow {
        if sparse {
            // Very sparse: row ids alone (no missing) or 1-byte values.
            return if c.missing == 0 {
                ChunkLayout::SparseBool
            } else {
                ChunkLayout::SparseInt {
                    width: LaneWidth::W1,
                }
            };
        }
        let bits_per_value = if c.categorical + c.missing > 0 { 2 } else { 1 };
        return ChunkLayout::Bits { bits_per_value };
    }

    let fpoint = s.xmin < 0 || s.min < i64::MIN as f64 || s.max > i64::MAX as f64;

    if sparse {
        // Each width's most negative code is its missing sentinel, so a real
        // value equal to it needs the next wider lane; i64::MIN has no wider
        // lane and goes to doubles (which hold -2^63 exactly).
        if fpoint || s.min <= i64::MIN as f64 {
            return ChunkLayout::SparseFloat64;
        }
        let width = if (i16::MIN as f64) < s.min && s.max <= i16::MAX as f64 {
            LaneWidth::W2
        } else if (i32::MIN as f64) < s.min && s.max <= i32::MAX as f64 {
            LaneWidth::W4
        } else {
            LaneWidth::W8
        };
        return ChunkLayout::SparseInt { width };
    }

    // Rescaling broke down, the shared exponent is outside the band the
    // fixed-point layouts accept, or the range reaches the 8-byte missing
    // sentinel: store plain doubles.
    if s.overflow
        || (fpoint && s.float_overflow)
        || s.lemin == i64::MIN
        || s.xmin < -MAX_SCALE_EXPONENT
        || s.xmin > MAX_SCALE_EXPONENT
    {
        return ChunkLayout::DenseFloat64;
    }

    // Exponent scaling: numbers like 1.3 become mantissa 13 with a shared
    // 10^-1 block scale. {1.2, 23, 0.34} normalizes to {120, 2300, 34} at
    // 10^-2 and fits a biased short. Worth it for bytes and shorts; larger
    // fractional ranges go to doubles.
    if fpoint {
        if s.lemin as i32 as i64 == s.lemin && s.lemax as i32 as i64 == s.lemax {
            let span = s.lemax - s.lemin;
            if span < 255 {
                return ChunkLayout::DenseInt {
                    width: LaneWidth::W1,
                    bias: s.lemin,
                    scale_exp: s.xmin,
                    nullable: true,
                };
            }
            if span < 65_535 {
                // Signed short lanes: shift the bias so the span sits above
                // the width's reserved NA sentinel.
                return ChunkLayout::DenseInt {
                    width: LaneWidth::W2,
                    bias: 32_767 + s.lemin,
                    scale_exp: s.xmin,
                    nullable: true,
                };
            }
            if span < i32::MAX as i64 {
                return ChunkLayout::DenseInt {
                    width: LaneWidth::W4,
                    bias: s.lemin,
                    scale_exp: s.xmin,
                    nullable: true,
                };
            }
        }
        return ChunkLayout::DenseFloat64;
    }

    // Integer column, narrowest width that exactly covers [min, max] first;
    // unbiased beats biased when both fit.
    if s.xmin == 0 && 0 <= s.lemin && s.lemax <= 255 && c.missing + c.categorical == 0 {
        return ChunkLayout::DenseInt {
            width: LaneWidth::W1,
            bias: 0,
            scale_exp: 0,
            nullable: false,
        };
    }
    if s.lemin < i32::MIN as i64 {
        return ChunkLayout::DenseInt {
            width: LaneWidth::W8,
            bias: 0,
            scale_exp: 0,
            nullable: true,
        };
    }
    if s.lemax.saturating_sub(s.lemin) < 255 {
        if 0.0 <= s.min && s.max < 255.0 {
            return ChunkLayout::DenseInt {
                width: LaneWidth::W1,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            };
        }
        return ChunkLayout::DenseInt {
            width: LaneWidth::W1,
            bias: s.lemin,
            scale_exp: s.xmin,
            nullable: true,
        };
    }
    if s.lemax.saturating_sub(s.lemin) < 65_535 {
        if s.xmin == 0 && (i16::MIN as i64) < s.lemin && s.lemax <= i16::MAX as i64 {
            return ChunkLayout::DenseInt {
                width: LaneWidth::W2,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            };
        }
        return ChunkLayout::DenseInt {
            width: LaneWidth::W2,
            bias: s.lemin + 32_767,
            scale_exp: s.xmin,
            nullable: true,
        };
    }
    if (i32::MIN as f64) < s.min && s.max <= i32::MAX as f64 {
        return ChunkLayout::DenseInt {
            width: LaneWidth::W4,
            bias: 0,
            scale_exp: 0,
            nullable: true,
        };
    }
    ChunkLayout::DenseInt {
        width: LaneWidth::W8,
        bias: 0,
        scale_exp: 0,
        nullable: true,
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn stats(min: f64, max: f64, xmin: i32, lemin: i64, lemax: i64) -> FixedPointStats {
        FixedPointStats {
            min,
            max,
            xmin,
            lemin,
            lemax,
            overflow: false,
            float_overflow: false,
        }
    }

    fn counts(missing: usize, categorical: usize, nonzero: usize) -> Counts {
        Counts {
            missing,
            categorical,
            nonzero,
        }
    }

    #[test]
    fn test_constant_columns() {
        let layout = select_layout(&stats(42.0, 42.0, 0, 42, 42), &counts(0, 0, 8), false, 8);
        assert_eq!(layout, ChunkLayout::ConstantInt { value: 42 });

        let layout = select_layout(&stats(2.5, 2.5, -1, 25, 25), &counts(0, 0, 8), false, 8);
        assert_eq!(layout, ChunkLayout::ConstantFloat { value: 2.5 });

        // A single missing row disqualifies the constant forms.
        let layout = select_layout(&stats(42.0, 42.0, 0, 42, 42), &counts(1, 0, 8), false, 9);
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W1,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            }
        );
    }

    #[test]
    fn test_boolean_columns() {
        let s = stats(0.0, 1.0, 0, 0, 1);
        assert_eq!(
            select_layout(&s, &counts(0, 0, 3), false, 6),
            ChunkLayout::Bits { bits_per_value: 1 }
        );
        assert_eq!(
            select_layout(&s, &counts(2, 0, 3), false, 8),
            ChunkLayout::Bits { bits_per_value: 2 }
        );
        assert_eq!(
            select_layout(&s, &counts(0, 0, 3), true, 1000),
            ChunkLayout::SparseBool
        );
        assert_eq!(
            select_layout(&s, &counts(2, 0, 3), true, 1000),
            ChunkLayout::SparseInt {
                width: LaneWidth::W1
            }
        );
    }

    #[test]
    fn test_unbiased_widths() {
        // Full byte range with no missing rows: the sentinel-free byte form.
        let layout = select_layout(&stats(0.0, 255.0, 0, 0, 255), &counts(0, 0, 9), false, 10);
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W1,
                bias: 0,
                scale_exp: 0,
                nullable: false,
            }
        );

        let layout = select_layout(
            &stats(-100.0, 30_000.0, 0, -100, 30_000),
            &counts(1, 0, 9),
            false,
            10,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W2,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            }
        );

        let layout = select_layout(
            &stats(-100_000.0, 100_000.0, 0, -100_000, 100_000),
            &counts(0, 0, 9),
            false,
            10,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W4,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            }
        );
    }

    #[test]
    fn test_biased_short_when_span_fits_but_extremes_do_not() {
        let layout = select_layout(
            &stats(0.0, 40_000.0, 0, 0, 40_000),
            &counts(0, 0, 9),
            false,
            10,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W2,
                bias: 32_767,
                scale_exp: 0,
                nullable: true,
            }
        );
    }

    #[test]
    fn test_wide_range_falls_through_to_longs() {
        let max = 1i64 << 62;
        let layout = select_layout(
            &stats(1.0, max as f64, 0, 1, max),
            &counts(0, 0, 4),
            false,
            4,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W8,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            }
        );
    }

    #[test]
    fn test_exponent_scaled_fractionals() {
        // {1.2, 23, 0.34} -> mantissas {120, 2300, 34} at 10^-2.
        let layout = select_layout(
            &stats(0.34, 23.0, -2, 34, 2300),
            &counts(0, 0, 3),
            false,
            3,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W2,
                bias: 32_767 + 34,
                scale_exp: -2,
                nullable: true,
            }
        );
    }

    #[test]
    fn test_double_fallbacks() {
        let mut s = stats(1.0, 2.0, 0, 1, 2);
        s.overflow = true;
        assert_eq!(
            select_layout(&s, &counts(0, 0, 2), false, 2),
            ChunkLayout::DenseFloat64
        );

        // Shared exponent outside the +/-35 band.
        let s = stats(5e40, 6e40, 40, 5, 6);
        assert_eq!(
            select_layout(&s, &counts(0, 0, 2), false, 2),
            ChunkLayout::DenseFloat64
        );

        // Fractional with a mantissa too wide for narrow scaled lanes.
        let mut s = stats(0.1, 123_456_789.5, -1, 1, 1_234_567_895);
        s.float_overflow = true;
        assert_eq!(
            select_layout(&s, &counts(0, 0, 2), false, 2),
            ChunkLayout::DenseFloat64
        );
    }

    #[test]
    fn test_sparse_widths() {
        let layout = select_layout(&stats(0.0, 7.0, 0, 0, 7), &counts(0, 0, 50), true, 10_050);
        assert_eq!(
            layout,
            ChunkLayout::SparseInt {
                width: LaneWidth::W2
            }
        );

        let layout = select_layout(
            &stats(0.0, 1e9, 0, 0, 1_000_000_000),
            &counts(0, 0, 50),
            true,
            10_050,
        );
        assert_eq!(
            layout,
            ChunkLayout::SparseInt {
                width: LaneWidth::W4
            }
        );

        let layout = select_layout(&stats(0.0, 2.5, -1, 0, 25), &counts(0, 0, 50), true, 10_050);
        assert_eq!(layout, ChunkLayout::SparseFloat64);
    }

    #[test]
    fn test_sparse_widths_step_past_their_na_sentinels() {
        // A real -32768 would collide with the W2 missing sentinel.
        let layout = select_layout(
            &stats(-32_768.0, 7.0, 0, -32_768, 7),
            &counts(0, 0, 50),
            true,
            10_050,
        );
        assert_eq!(
            layout,
            ChunkLayout::SparseInt {
                width: LaneWidth::W4
            }
        );

        let layout = select_layout(
            &stats(i32::MIN as f64, 7.0, 0, i32::MIN as i64, 7),
            &counts(0, 0, 50),
            true,
            10_050,
        );
        assert_eq!(
            layout,
            ChunkLayout::SparseInt {
                width: LaneWidth::W8
            }
        );

        // -2^63 has no wider integer lane to step up to.
        let layout = select_layout(
            &stats(i64::MIN as f64, 7.0, 0, i64::MIN, 7),
            &counts(0, 0, 50),
            true,
            10_050,
        );
        assert_eq!(layout, ChunkLayout::SparseFloat64);
    }

    #[test]
    fn test_long_sentinel_value_forces_doubles_when_dense() {
        let layout = select_layout(
            &stats(i64::MIN as f64, 0.0, 0, i64::MIN, 0),
            &counts(0, 0, 1),
            false,
            2,
        );
        assert_eq!(layout, ChunkLayout::DenseFloat64);
    }

    #[test]
    fn test_span_arithmetic_never_wraps() {
        // lemin just above the long cutoff with a huge lemax: the span
        // saturates instead of wrapping into a bogus narrow layout.
        let layout = select_layout(
            &stats(-1.0, i64::MAX as f64, 0, -1, i64::MAX),
            &counts(0, 0, 2),
            false,
            2,
        );
        assert_eq!(
            layout,
            ChunkLayout::DenseInt {
                width: LaneWidth::W8,
                bias: 0,
                scale_exp: 0,
                nullable: true,
            }
        );
    }
}
