//! The closed set of binary layouts a finalized chunk can take.
//!
//! A `ChunkLayout` value plus the packed byte buffer is everything the decode
//! path needs: every bias, scale and sentinel is carried here (or, for the
//! bit-vector form, inside the buffer's two header bytes). There is no
//! side-channel state.

use serde::{Deserialize, Serialize};

/// Width of one stored value lane, in bytes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneWidth {
    W1,
    W2,
    W4,
    W8,
}

impl LaneWidth {
    pub const fn bytes(self) -> usize {
        match self {
            LaneWidth::W1 => 1,
            LaneWidth::W2 => 2,
            LaneWidth::W4 => 4,
            LaneWidth::W8 => 8,
        }
    }

    /// The reserved bit pattern meaning "missing" at this width.
    ///
    /// One-byte lanes are read unsigned, so the sentinel is the top code
    /// `0xFF`; wider lanes are read signed and reserve their most negative
    /// value.
    pub const fn na_sentinel(self) -> i64 {
        match self {
            LaneWidth::W1 => 0xFF,
            LaneWidth::W2 => i16::MIN as i64,
            LaneWidth::W4 => i32::MIN as i64,
            LaneWidth::W8 => i64::MIN,
        }
    }
}

/// In a 2-bit vector lane, the pattern reserved for a missing row.
pub const BITS_NA: u8 = 0b10;

/// Logical rows at or above this count force 4-byte row ids in sparse
/// buffers; below it row ids are 2 bytes.
pub const WIDE_ROW_ID_THRESHOLD: usize = 65_535;

/// Descriptor of one concrete binary layout.
///
/// The variants mirror the serializers one-to-one. `DenseInt` folds the
/// unbiased, biased and exponent-scaled fixed-width forms into a single
/// parameterized shape; a decoded value is `(stored + bias) * 10^scale_exp`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ChunkLayout {
    /// Every row decodes to the same integer. No payload buffer.
    ConstantInt { value: i64 },
    /// Every row decodes to the same double; `NaN` is the all-missing chunk.
    ConstantFloat { value: f64 },
    /// 1 or 2 bits per row, MSB-first; buffer bytes 0/1 repeat the trailing
    /// bit gap and the bits-per-value so the buffer decodes standalone.
    Bits { bits_per_value: u8 },
    /// Fixed-width integer lanes, one per logical row. `nullable = false`
    /// marks the no-sentinel byte form whose full 0..=255 range is data
    /// (used for categorical code blocks with no missing rows).
    DenseInt {
        width: LaneWidth,
        bias: i64,
        scale_exp: i32,
        nullable: bool,
    },
    /// One IEEE-754 double per logical row.
    DenseFloat64,
    /// Row ids only; a listed row decodes to 1, everything else to 0.
    SparseBool,
    /// `[row-id][value]` pairs at the given lane width; missing rows are
    /// stored with the width's NA sentinel, unlisted rows decode to 0.
    SparseInt { width: LaneWidth },
    /// `[row-id][f64]` pairs; NaN stores a missing row.
    SparseFloat64,
}

impl ChunkLayout {
    /// True when the layout stores explicit entries only for non-default rows.
    pub fn is_sparse(&self) -> bool {
        matches!(
            self,
            ChunkLayout::SparseBool | ChunkLayout::SparseInt { .. } | ChunkLayout::SparseFloat64
        )
    }
}

/// Row-id lane width for a sparse buffer over `total` logical rows.
pub(crate) fn row_id_bytes(total: usize) -> usize {
    if total >= WIDE_ROW_ID_THRESHOLD {
        4
    } else {
        2
    }
}
