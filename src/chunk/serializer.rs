//! The per-layout byte packers.
//!
//! Each function walks the accumulator's stored entries once and emits the
//! flat little-endian buffer the matching [`ChunkLayout`] variant describes.
//! The selector has already proven every value fits the chosen layout, so the
//! packers are infallible; fit violations are debug assertions.
//!
//! Storage-shape contract: by the time a packer runs, the accumulator's
//! buffer shape agrees with the layout. Dense layouts see a dense buffer
//! (one stored entry per logical row) and sparse layouts see a compacted
//! buffer with a row-id vector.

use bitvec::prelude::*;

use crate::chunk::accumulator::{Accumulator, CATEGORICAL_EXPONENT};
use crate::chunk::layout::{row_id_bytes, ChunkLayout, LaneWidth, BITS_NA};
use crate::kernels::lanes::{put_f64, put_lane};
use crate::kernels::pow10::pow10_long;

/// Packs the accumulator into the byte buffer for `layout`.
pub(crate) fn serialize(acc: &Accumulator, layout: &ChunkLayout) -> Vec<u8> {
    match *layout {
        // Constant chunks carry everything in the descriptor.
        ChunkLayout::ConstantInt { .. } | ChunkLayout::ConstantFloat { .. } => Vec::new(),
        ChunkLayout::Bits { bits_per_value } => pack_bits(acc, bits_per_value),
        ChunkLayout::DenseInt {
            width,
            bias,
            scale_exp,
            ..
        } => pack_fixed(acc, width, bias, scale_exp),
        ChunkLayout::DenseFloat64 => pack_dense_f64(acc),
        ChunkLayout::SparseBool => pack_sparse_bool(acc),
        ChunkLayout::SparseInt { width } => pack_sparse_int(acc, width),
        ChunkLayout::SparseFloat64 => pack_sparse_f64(acc),
    }
}

/// Rescales a stored `(mantissa, exponent)` pair to the block's shared
/// exponent. Trailing decimal zeros are stripped first so the shift is
/// always non-negative (`scale_exp` is the minimum of the stripped
/// exponents).
fn rescaled(mut mantissa: i64, mut exponent: i32, scale_exp: i32) -> i64 {
    if mantissa == 0 {
        return 0;
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent += 1;
    }
    debug_assert!(exponent >= scale_exp);
    mantissa * pow10_long(exponent - scale_exp)
}

fn write_lane(buf: &mut Vec<u8>, width: LaneWidth, value: i64) {
    match width {
        LaneWidth::W1 => {
            debug_assert!(0 <= value && value <= 0xFF);
            put_lane::<u8>(buf, value as u8);
        }
        LaneWidth::W2 => put_lane::<i16>(buf, value as i16),
        LaneWidth::W4 => put_lane::<i32>(buf, value as i32),
        LaneWidth::W8 => put_lane::<i64>(buf, value),
    }
}

fn write_row_id(buf: &mut Vec<u8>, total: usize, row: u32) {
    if row_id_bytes(total) == 4 {
        put_lane::<u32>(buf, row);
    } else {
        put_lane::<u16>(buf, row as u16);
    }
}

/// Fixed-width integer lanes, one per logical row.
///
/// A lane stores `rescaled - bias`; missing rows store the width's reserved
/// sentinel. The decoder inverts this as `(stored + bias) * 10^scale_exp`.
fn pack_fixed(acc: &Accumulator, width: LaneWidth, bias: i64, scale_exp: i32) -> Vec<u8> {
    debug_assert!(!acc.is_floats());
    debug_assert!(acc.row_ids().is_none());
    let (mantissas, exponents) = acc.scaled_slices();
    let mut buf = Vec::with_capacity(mantissas.len() * width.bytes());
    for j in 0..mantissas.len() {
        let stored = if acc.is_na_stored(j) {
            width.na_sentinel()
        } else {
            let x = if exponents[j] == CATEGORICAL_EXPONENT {
                0
            } else {
                exponents[j]
            };
            rescaled(mantissas[j], x, scale_exp) - bias
        };
        write_lane(&mut buf, width, stored);
    }
    buf
}

/// One double per logical row; missing rows store NaN.
fn pack_dense_f64(acc: &Accumulator) -> Vec<u8> {
    debug_assert!(acc.row_ids().is_none());
    let total = acc.total_rows();
    let mut buf = Vec::with_capacity(total * 8);
    for j in 0..total {
        put_f64(&mut buf, acc.stored_f64(j));
    }
    buf
}

/// `[row-id][value]` pairs for a sparse integer block; unlisted rows decode
/// to zero. The selector only picks this form for integral blocks, so every
/// stored entry rescales exactly to exponent zero.
fn pack_sparse_int(acc: &Accumulator, width: LaneWidth) -> Vec<u8> {
    debug_assert!(!acc.is_floats());
    let row_ids = acc.row_ids().expect("sparse layout over a dense buffer");
    let total = acc.total_rows();
    let (mantissas, exponents) = acc.scaled_slices();
    let mut buf = Vec::with_capacity(row_ids.len() * (row_id_bytes(total) + width.bytes()));
    for j in 0..mantissas.len() {
        write_row_id(&mut buf, total, row_ids[j]);
        let stored = if acc.is_na_stored(j) {
            width.na_sentinel()
        } else {
            let x = if exponents[j] == CATEGORICAL_EXPONENT {
                0
            } else {
                exponents[j]
            };
            rescaled(mantissas[j], x, 0)
        };
        write_lane(&mut buf, width, stored);
    }
    buf
}

/// Row ids alone: a listed row is 1, everything else is 0.
///
/// An overwrite can leave an explicit zero entry in a sparse buffer; such
/// entries are not listed, so they decode like any unlisted row.
fn pack_sparse_bool(acc: &Accumulator) -> Vec<u8> {
    debug_assert!(!acc.is_floats());
    let row_ids = acc.row_ids().expect("sparse layout over a dense buffer");
    let total = acc.total_rows();
    let (mantissas, _) = acc.scaled_slices();
    let mut buf = Vec::with_capacity(row_ids.len() * row_id_bytes(total));
    for (j, &row) in row_ids.iter().enumerate() {
        debug_assert!(!acc.is_na_stored(j));
        debug_assert!(mantissas[j] == 0 || mantissas[j] == 1);
        if mantissas[j] == 0 {
            continue;
        }
        write_row_id(&mut buf, total, row);
    }
    buf
}

/// `[row-id][f64]` pairs; a missing row stores NaN.
fn pack_sparse_f64(acc: &Accumulator) -> Vec<u8> {
    let row_ids = acc.row_ids().expect("sparse layout over a dense buffer");
    let total = acc.total_rows();
    let mut buf = Vec::with_capacity(row_ids.len() * (row_id_bytes(total) + 8));
    for (j, &row) in row_ids.iter().enumerate() {
        write_row_id(&mut buf, total, row);
        put_f64(&mut buf, acc.stored_f64(j));
    }
    buf
}

/// The bit-vector form for boolean blocks, MSB-first within each byte.
///
/// Two header bytes precede the payload: the count of unused trailing bits in
/// the last payload byte, then the bits-per-value (1, or 2 when the block
/// needs the `0b10` missing pattern).
fn pack_bits(acc: &Accumulator, bits_per_value: u8) -> Vec<u8> {
    debug_assert!(!acc.is_floats());
    debug_assert!(acc.row_ids().is_none());
    let (mantissas, _) = acc.scaled_slices();
    let total = acc.total_rows();
    let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(total * bits_per_value as usize);
    for j in 0..total {
        let v = if acc.is_na_stored(j) {
            debug_assert_eq!(bits_per_value, 2);
            BITS_NA
        } else {
            debug_assert!(mantissas[j] == 0 || mantissas[j] == 1);
            mantissas[j] as u8
        };
        if bits_per_value == 2 {
            bits.push(v & 0b10 != 0);
        }
        bits.push(v & 0b01 != 0);
    }
    let gap = (8 - (total * bits_per_value as usize) % 8) % 8;
    bits.set_uninitialized(false);
    let mut buf = Vec::with_capacity(2 + bits.as_raw_slice().len());
    buf.push(gap as u8);
    buf.push(bits_per_value);
    buf.extend_from_slice(bits.as_raw_slice());
    buf
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::accumulator::Accumulator;
    use crate::config::CodecConfig;
    use std::sync::Arc;

    fn acc() -> Accumulator {
        Accumulator::new(Arc::new(CodecConfig::default()))
    }

    #[test]
    fn test_rescaled_strips_trailing_zeros() {
        // (1000, 0) at a shared exponent of 2 is mantissa 10.
        assert_eq!(rescaled(1000, 0, 2), 10);
        assert_eq!(rescaled(13, -1, -1), 13);
        assert_eq!(rescaled(7, 0, -2), 700);
        assert_eq!(rescaled(0, 0, -5), 0);
    }

    #[test]
    fn test_fixed_lanes_store_biased_values() {
        let mut a = acc();
        for v in [100i64, 101, 102] {
            a.append_scaled_integer(v, 0).unwrap();
        }
        a.append_missing().unwrap();
        let buf = pack_fixed(&a, LaneWidth::W1, 100, 0);
        assert_eq!(buf, vec![0, 1, 2, 0xFF]);
    }

    #[test]
    fn test_bit_vector_header_and_padding() {
        let mut a = acc();
        for v in [1i64, 0, 0, 1, 1] {
            a.append_scaled_integer(v, 0).unwrap();
        }
        let buf = pack_bits(&a, 1);
        // 5 bits used, 3 trailing, one payload byte: 0b10011_000.
        assert_eq!(buf, vec![3, 1, 0b1001_1000]);
    }

    #[test]
    fn test_two_bit_vector_encodes_missing() {
        let mut a = acc();
        a.append_scaled_integer(1, 0).unwrap();
        a.append_missing().unwrap();
        a.append_scaled_integer(0, 0).unwrap();
        let buf = pack_bits(&a, 2);
        // Pairs 01, 10, 00 then two unused bits.
        assert_eq!(buf, vec![2, 2, 0b0110_0000]);
    }
}
