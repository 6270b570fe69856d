//! The immutable read side: O(1) random access over a packed chunk.
//!
//! A `DecodableChunk` is a layout descriptor plus the byte buffer the
//! serializer produced, and nothing else; the pair is self-describing enough
//! to be shipped to another node and decoded there. Reads never materialize
//! the column: every accessor is a direct lane read (dense forms) or a
//! binary search over row ids (sparse forms).

use crate::chunk::layout::{row_id_bytes, ChunkLayout, LaneWidth, BITS_NA};
use crate::error::StrataError;
use crate::kernels::lanes::{get_f64, get_lane};
use crate::kernels::pow10::{pow10, pow10_long, MAX_FIXED_DIGITS};

pub struct DecodableChunk {
    len: usize,
    layout: ChunkLayout,
    bytes: Box<[u8]>,
}

impl DecodableChunk {
    /// A payload-free constant chunk.
    pub(crate) fn constant(len: usize, layout: ChunkLayout) -> Self {
        debug_assert!(matches!(
            layout,
            ChunkLayout::ConstantInt { .. } | ChunkLayout::ConstantFloat { .. }
        ));
        DecodableChunk {
            len,
            layout,
            bytes: Box::new([]),
        }
    }

    /// Reassembles a chunk from a descriptor and its byte buffer, e.g. after
    /// the pair crossed a node boundary. The buffer geometry is validated
    /// against the descriptor; the values themselves are trusted.
    pub fn from_parts(
        len: usize,
        layout: ChunkLayout,
        bytes: Vec<u8>,
    ) -> Result<Self, StrataError> {
        let got = bytes.len();
        match layout {
            ChunkLayout::ConstantInt { .. } | ChunkLayout::ConstantFloat { .. } => {
                expect_len(0, got)?;
            }
            ChunkLayout::Bits { bits_per_value } => {
                if !(bits_per_value == 1 || bits_per_value == 2) {
                    return Err(StrataError::InternalError(format!(
                        "bit-vector chunk with {} bits per value",
                        bits_per_value
                    )));
                }
                expect_len(2 + (len * bits_per_value as usize).div_ceil(8), got)?;
            }
            ChunkLayout::DenseInt { width, .. } => expect_len(len * width.bytes(), got)?,
            ChunkLayout::DenseFloat64 => expect_len(len * 8, got)?,
            ChunkLayout::SparseBool => expect_stride(row_id_bytes(len), got)?,
            ChunkLayout::SparseInt { width } => {
                expect_stride(row_id_bytes(len) + width.bytes(), got)?
            }
            ChunkLayout::SparseFloat64 => expect_stride(row_id_bytes(len) + 8, got)?,
        }
        Ok(DecodableChunk {
            len,
            layout,
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Logical row count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    /// The packed payload, for transport alongside the descriptor.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_missing(&self, row: usize) -> bool {
        assert!(row < self.len, "row {} out of range ({})", row, self.len);
        match self.layout {
            ChunkLayout::ConstantInt { .. } => false,
            ChunkLayout::ConstantFloat { value } => value.is_nan(),
            ChunkLayout::Bits { bits_per_value } => {
                bits_per_value == 2 && self.bit_value(row, 2) == BITS_NA
            }
            ChunkLayout::DenseInt {
                width, nullable, ..
            } => nullable && self.dense_raw(row, width) == width.na_sentinel(),
            ChunkLayout::DenseFloat64 => get_f64(&self.bytes, row * 8).is_nan(),
            ChunkLayout::SparseBool => false,
            ChunkLayout::SparseInt { width } => self
                .find_sparse_entry(row, width.bytes())
                .map(|off| self.raw_lane(off, width) == width.na_sentinel())
                .unwrap_or(false),
            ChunkLayout::SparseFloat64 => self
                .find_sparse_entry(row, 8)
                .map(|off| get_f64(&self.bytes, off).is_nan())
                .unwrap_or(false),
        }
    }

    /// The row as an integer, truncating any fractional scale.
    ///
    /// # Panics
    /// Panics if the row is missing (callers gate on [`Self::is_missing`])
    /// or out of range.
    pub fn at_integer(&self, row: usize) -> i64 {
        assert!(row < self.len, "row {} out of range ({})", row, self.len);
        assert!(!self.is_missing(row), "row {} is missing", row);
        match self.layout {
            ChunkLayout::ConstantInt { value } => value,
            ChunkLayout::ConstantFloat { value } => value as i64,
            ChunkLayout::Bits { bits_per_value } => {
                self.bit_value(row, bits_per_value) as i64
            }
            ChunkLayout::DenseInt {
                width,
                bias,
                scale_exp,
                ..
            } => scale_to_integer(self.dense_raw(row, width) + bias, scale_exp),
            ChunkLayout::DenseFloat64 => get_f64(&self.bytes, row * 8) as i64,
            ChunkLayout::SparseBool => self.find_sparse_entry(row, 0).is_some() as i64,
            ChunkLayout::SparseInt { width } => self
                .find_sparse_entry(row, width.bytes())
                .map(|off| self.raw_lane(off, width))
                .unwrap_or(0),
            ChunkLayout::SparseFloat64 => self
                .find_sparse_entry(row, 8)
                .map(|off| get_f64(&self.bytes, off) as i64)
                .unwrap_or(0),
        }
    }

    /// The row as a double; a missing row decodes to NaN.
    pub fn at_double(&self, row: usize) -> f64 {
        assert!(row < self.len, "row {} out of range ({})", row, self.len);
        match self.layout {
            ChunkLayout::ConstantInt { value } => value as f64,
            ChunkLayout::ConstantFloat { value } => value,
            ChunkLayout::Bits { bits_per_value } => {
                let v = self.bit_value(row, bits_per_value);
                if bits_per_value == 2 && v == BITS_NA {
                    f64::NAN
                } else {
                    v as f64
                }
            }
            ChunkLayout::DenseInt {
                width,
                bias,
                scale_exp,
                nullable,
            } => {
                let raw = self.dense_raw(row, width);
                if nullable && raw == width.na_sentinel() {
                    f64::NAN
                } else {
                    (raw + bias) as f64 * pow10(scale_exp)
                }
            }
            ChunkLayout::DenseFloat64 => get_f64(&self.bytes, row * 8),
            ChunkLayout::SparseBool => {
                if self.find_sparse_entry(row, 0).is_some() {
                    1.0
                } else {
                    0.0
                }
            }
            ChunkLayout::SparseInt { width } => match self.find_sparse_entry(row, width.bytes())
            {
                Some(off) => {
                    let v = self.raw_lane(off, width);
                    if v == width.na_sentinel() {
                        f64::NAN
                    } else {
                        v as f64
                    }
                }
                None => 0.0,
            },
            ChunkLayout::SparseFloat64 => self
                .find_sparse_entry(row, 8)
                .map(|off| get_f64(&self.bytes, off))
                .unwrap_or(0.0),
        }
    }

    /// One raw lane. One-byte lanes are unsigned (their sentinel is the top
    /// code 0xFF); wider lanes are signed.
    fn raw_lane(&self, off: usize, width: LaneWidth) -> i64 {
        match width {
            LaneWidth::W1 => get_lane::<u8>(&self.bytes, off) as i64,
            LaneWidth::W2 => get_lane::<i16>(&self.bytes, off) as i64,
            LaneWidth::W4 => get_lane::<i32>(&self.bytes, off) as i64,
            LaneWidth::W8 => get_lane::<i64>(&self.bytes, off),
        }
    }

    fn dense_raw(&self, row: usize, width: LaneWidth) -> i64 {
        self.raw_lane(row * width.bytes(), width)
    }

    /// Bit-vector read; the payload starts after the two header bytes and is
    /// MSB-first within each byte.
    fn bit_value(&self, row: usize, bits_per_value: u8) -> u8 {
        debug_assert_eq!(self.bytes[1], bits_per_value);
        let bpv = bits_per_value as usize;
        let pos = row * bpv;
        let byte = self.bytes[2 + pos / 8];
        let shift = 8 - bpv - (pos % 8);
        (byte >> shift) & ((1 << bpv) - 1)
    }

    /// Binary search over the sparse row-id lanes; returns the byte offset
    /// of the matching entry's value lane.
    fn find_sparse_entry(&self, row: usize, value_bytes: usize) -> Option<usize> {
        let idb = row_id_bytes(self.len);
        let stride = idb + value_bytes;
        let n = self.bytes.len() / stride;
        let target = row as u32;
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let off = mid * stride;
            let id = if idb == 4 {
                get_lane::<u32>(&self.bytes, off)
            } else {
                get_lane::<u16>(&self.bytes, off) as u32
            };
            match id.cmp(&target) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(off + idb),
            }
        }
        None
    }
}

/// Applies the block scale exactly where an `i64` can, via `f64` otherwise.
fn scale_to_integer(v: i64, exp: i32) -> i64 {
    if exp == 0 {
        v
    } else if (1..MAX_FIXED_DIGITS).contains(&exp) {
        v * pow10_long(exp)
    } else {
        (v as f64 * pow10(exp)) as i64
    }
}

fn expect_len(expected: usize, got: usize) -> Result<(), StrataError> {
    if expected != got {
        return Err(StrataError::BufferMismatch(expected, got));
    }
    Ok(())
}

fn expect_stride(stride: usize, got: usize) -> Result<(), StrataError> {
    if got % stride != 0 {
        return Err(StrataError::BufferMismatch(got / stride * stride, got));
    }
    Ok(())
}
