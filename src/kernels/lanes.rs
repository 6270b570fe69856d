//! Fixed-width little-endian lane access over raw byte buffers.
//!
//! Every serialized chunk layout is a flat sequence of 1/2/4/8-byte lanes
//! (values, biases, row ids). This kernel is the only place that touches
//! raw byte offsets; it relies on `bytemuck` for alignment-free reads so the
//! decode path never has to care how the storage layer aligned the buffer.

use bytemuck::Pod;
use num_traits::PrimInt;

/// Appends one lane to `buf` in little-endian byte order.
#[inline]
pub fn put_lane<T: PrimInt + Pod>(buf: &mut Vec<u8>, value: T) {
    let le = value.to_le();
    buf.extend_from_slice(bytemuck::bytes_of(&le));
}

/// Reads one lane at byte offset `off`, regardless of buffer alignment.
///
/// Panics if `off + size_of::<T>()` runs past the buffer; lane offsets are
/// always derived from an in-bounds row index, so that is a caller bug.
#[inline]
pub fn get_lane<T: PrimInt + Pod>(buf: &[u8], off: usize) -> T {
    let raw: T = bytemuck::pod_read_unaligned(&buf[off..off + std::mem::size_of::<T>()]);
    T::from_le(raw)
}

/// Appends an `f64` lane; stored via its IEEE-754 bit pattern.
#[inline]
pub fn put_f64(buf: &mut Vec<u8>, value: f64) {
    put_lane::<u64>(buf, value.to_bits());
}

/// Reads an `f64` lane at byte offset `off`.
#[inline]
pub fn get_f64(buf: &[u8], off: usize) -> f64 {
    f64::from_bits(get_lane::<u64>(buf, off))
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_roundtrip_all_widths() {
        let mut buf = Vec::new();
        put_lane::<u8>(&mut buf, 0xAB);
        put_lane::<i16>(&mut buf, -12345);
        put_lane::<i32>(&mut buf, -7_654_321);
        put_lane::<i64>(&mut buf, i64::MIN + 1);

        assert_eq!(get_lane::<u8>(&buf, 0), 0xAB);
        assert_eq!(get_lane::<i16>(&buf, 1), -12345);
        assert_eq!(get_lane::<i32>(&buf, 3), -7_654_321);
        assert_eq!(get_lane::<i64>(&buf, 7), i64::MIN + 1);
    }

    #[test]
    fn test_lanes_are_little_endian() {
        let mut buf = Vec::new();
        put_lane::<u16>(&mut buf, 0x0102);
        assert_eq!(buf, vec![0x02, 0x01]);
    }

    #[test]
    fn test_unaligned_reads() {
        // Offset 1 is misaligned for every multi-byte lane width.
        let mut buf = vec![0u8];
        put_lane::<i64>(&mut buf, 42);
        put_f64(&mut buf, 2.5);
        assert_eq!(get_lane::<i64>(&buf, 1), 42);
        assert_eq!(get_f64(&buf, 9), 2.5);
    }

    #[test]
    fn test_f64_nan_survives() {
        let mut buf = Vec::new();
        put_f64(&mut buf, f64::NAN);
        assert!(get_f64(&buf, 0).is_nan());
    }
}
