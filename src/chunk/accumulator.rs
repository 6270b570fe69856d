//! The mutable write-side buffer for one block of one column.
//!
//! An `Accumulator` ingests parsed tokens one at a time, keeping them in the
//! widest-but-lossless internal form: scaled decimals `(mantissa, exponent)`
//! while every value permits it, plain `f64` once one does not. The buffer
//! starts dense (one stored entry per logical row) and flips to a sparse
//! representation (stored entries plus a row-id vector, zeros implicit) when
//! a reallocation finds the block overwhelmingly zero; the flip is reversed
//! the same way if the block densifies again.
//!
//! `finalize` runs the rollup and fixed-point statistics passes, reconciles
//! the block against its classified column kind, asks the selector for a
//! layout and packs the bytes into an immutable [`DecodableChunk`].

use std::sync::Arc;

use crate::chunk::decode::DecodableChunk;
use crate::chunk::layout::ChunkLayout;
use crate::chunk::selector::select_layout;
use crate::chunk::serializer;
use crate::chunk::stats::{classify, ColumnKind, Counts, FixedPointStats};
use crate::config::CodecConfig;
use crate::error::StrataError;
use crate::kernels::pow10::pow10;

/// Mantissa half of the stored missing-value pair.
pub(crate) const NA_MANTISSA: i64 = i64::MAX;
/// Exponent half of the stored missing-value pair. A stored entry is missing
/// iff its exponent equals this; the mantissa is never consulted.
pub(crate) const NA_EXPONENT: i32 = i32::MIN;
/// Exponent marking a stored mantissa as a categorical code, not a number.
pub(crate) const CATEGORICAL_EXPONENT: i32 = i32::MIN + 1;
/// A block is worth storing sparsely when stored-worthy entries make up less
/// than one part in this many of the logical rows.
pub(crate) const MIN_SPARSE_RATIO: usize = 32;

enum Values {
    Scaled {
        mantissas: Vec<i64>,
        exponents: Vec<i32>,
    },
    Floats(Vec<f64>),
}

pub struct Accumulator {
    values: Values,
    /// `Some` when the buffer is sparse: one logical row id per stored entry,
    /// strictly increasing. `None` means dense storage, where the invariant
    /// `stored_len == total` holds.
    row_ids: Option<Vec<u32>>,
    /// Logical row count, including the implicit zeros of a sparse buffer.
    total: usize,
    /// Successful timestamp parses reported by the ingestion layer.
    time_hits: usize,
    config: Arc<CodecConfig>,
}

impl Accumulator {
    pub fn new(config: Arc<CodecConfig>) -> Self {
        Accumulator {
            values: Values::Scaled {
                mantissas: Vec::new(),
                exponents: Vec::new(),
            },
            row_ids: None,
            total: 0,
            time_hits: 0,
            config,
        }
    }

    /// A block of `rows` logical rows, every one missing. Used when a column
    /// is materialized before any of its values arrive.
    pub fn prefilled(config: Arc<CodecConfig>, rows: usize) -> Result<Self, StrataError> {
        if rows > config.max_rows_per_block {
            return Err(StrataError::RowOverflow(rows, config.max_rows_per_block));
        }
        Ok(Accumulator {
            values: Values::Floats(vec![f64::NAN; rows]),
            row_ids: None,
            total: rows,
            time_hits: 0,
            config,
        })
    }

    //==============================================================================
    // Append interface
    //==============================================================================

    /// Appends a number. NaN is treated as a missing row; integral values are
    /// kept in scaled form so they stay eligible for the integer layouts.
    pub fn append_number(&mut self, value: f64) -> Result<(), StrataError> {
        if value.is_nan() {
            return self.append_missing();
        }
        if !self.is_floats() {
            let l = value as i64;
            if l as f64 == value {
                return self.append_scaled_integer(l, 0);
            }
            self.switch_to_floats();
        }
        self.push_float(value)
    }

    /// Appends `mantissa * 10^exponent` without going through an `f64`.
    ///
    /// This is the lossless path for parsed decimals: `1.3` arrives as
    /// `(13, -1)` and is stored exactly. Zero is canonicalized to `(0, 0)`
    /// and trailing decimal zeros are folded into the exponent while it is
    /// negative, so `(1300, -3)` and `(13, -1)` store identically.
    pub fn append_scaled_integer(
        &mut self,
        mut mantissa: i64,
        mut exponent: i32,
    ) -> Result<(), StrataError> {
        if exponent == NA_EXPONENT || exponent == CATEGORICAL_EXPONENT {
            return Err(StrataError::InternalError(format!(
                "exponent {} is reserved",
                exponent
            )));
        }
        if self.is_floats() {
            return self.push_float(mantissa as f64 * pow10(exponent));
        }
        if mantissa == 0 {
            exponent = 0;
        }
        while exponent < 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }
        self.push_scaled(mantissa, exponent)
    }

    /// Appends a categorical code. In float storage the code is
    /// unrepresentable and degrades to a missing row.
    pub fn append_categorical(&mut self, code: u32) -> Result<(), StrataError> {
        if self.is_floats() {
            return self.push_float(f64::NAN);
        }
        self.push_scaled(code as i64, CATEGORICAL_EXPONENT)
    }

    pub fn append_missing(&mut self) -> Result<(), StrataError> {
        if self.is_floats() {
            return self.push_float(f64::NAN);
        }
        self.push_scaled(NA_MANTISSA, NA_EXPONENT)
    }

    /// Appends `n` zero rows. In a sparse buffer this is O(1).
    pub fn append_zeros(&mut self, n: usize) -> Result<(), StrataError> {
        self.check_capacity(n)?;
        if self.row_ids.is_none() {
            match &mut self.values {
                Values::Scaled {
                    mantissas,
                    exponents,
                } => {
                    mantissas.resize(mantissas.len() + n, 0);
                    exponents.resize(exponents.len() + n, 0);
                }
                Values::Floats(ds) => ds.resize(ds.len() + n, 0.0),
            }
        }
        self.total += n;
        Ok(())
    }

    /// Tells the block one of its rows parsed as a timestamp. The classifier
    /// weighs these against plain numbers when deciding the column kind.
    pub fn record_time_parse(&mut self) {
        self.time_hits += 1;
    }

    //==============================================================================
    // Random-access repair
    //==============================================================================

    /// Overwrites one logical row with a number (NaN overwrites with
    /// missing). Writing a non-stored row of a sparse buffer densifies it,
    /// except for the no-op of writing zero there.
    pub fn overwrite(&mut self, row: usize, value: f64) -> Result<(), StrataError> {
        if value.is_nan() {
            return self.overwrite_missing(row);
        }
        if !self.is_floats() {
            let l = value as i64;
            if l as f64 == value {
                return self.overwrite_scaled(row, l, 0);
            }
            self.switch_to_floats();
        }
        self.overwrite_float(row, value)
    }

    pub fn overwrite_integer(&mut self, row: usize, value: i64) -> Result<(), StrataError> {
        if self.is_floats() {
            return self.overwrite_float(row, value as f64);
        }
        self.overwrite_scaled(row, value, 0)
    }

    pub fn overwrite_missing(&mut self, row: usize) -> Result<(), StrataError> {
        if self.is_floats() {
            return self.overwrite_float(row, f64::NAN);
        }
        self.overwrite_scaled(row, NA_MANTISSA, NA_EXPONENT)
    }

    fn stored_slot(&mut self, row: usize) -> Result<Option<usize>, StrataError> {
        if row >= self.total {
            return Err(StrataError::InternalError(format!(
                "row {} out of range for a block of {} rows",
                row, self.total
            )));
        }
        match &self.row_ids {
            None => Ok(Some(row)),
            Some(ids) => Ok(ids.binary_search(&(row as u32)).ok()),
        }
    }

    fn overwrite_scaled(&mut self, row: usize, m: i64, x: i32) -> Result<(), StrataError> {
        let slot = match self.stored_slot(row)? {
            Some(j) => j,
            None => {
                if m == 0 && x == 0 {
                    return Ok(()); // zero over an implicit zero
                }
                self.make_dense();
                row
            }
        };
        let Values::Scaled {
            mantissas,
            exponents,
        } = &mut self.values
        else {
            unreachable!()
        };
        mantissas[slot] = m;
        exponents[slot] = x;
        Ok(())
    }

    fn overwrite_float(&mut self, row: usize, value: f64) -> Result<(), StrataError> {
        let slot = match self.stored_slot(row)? {
            Some(j) => j,
            None => {
                if value == 0.0 {
                    return Ok(());
                }
                self.make_dense();
                row
            }
        };
        let Values::Floats(ds) = &mut self.values else {
            unreachable!()
        };
        ds[slot] = value;
        Ok(())
    }

    //==============================================================================
    // Block splicing
    //==============================================================================

    /// Appends every row of `other` after this block's rows.
    ///
    /// Mixed internal forms are unified to floats; mixed storage shapes are
    /// unified dense. Two sparse blocks splice without densifying.
    pub fn concat(&mut self, mut other: Accumulator) -> Result<(), StrataError> {
        self.check_capacity(other.total)?;
        self.time_hits += other.time_hits;
        if other.total == 0 {
            return Ok(());
        }
        if self.total == 0 {
            self.values = other.values;
            self.row_ids = other.row_ids;
            self.total = other.total;
            return Ok(());
        }
        if self.is_floats() != other.is_floats() {
            self.switch_to_floats();
            other.switch_to_floats();
        }
        let both_sparse = self.row_ids.is_some() && other.row_ids.is_some();
        if !both_sparse {
            self.make_dense();
            other.make_dense();
        } else {
            let offset = self.total as u32;
            let ids = self.row_ids.as_mut().expect("both_sparse");
            for &r in other.row_ids.as_ref().expect("both_sparse") {
                ids.push(r + offset);
            }
        }
        match (&mut self.values, other.values) {
            (
                Values::Scaled {
                    mantissas,
                    exponents,
                },
                Values::Scaled {
                    mantissas: om,
                    exponents: ox,
                },
            ) => {
                mantissas.extend_from_slice(&om);
                exponents.extend_from_slice(&ox);
            }
            (Values::Floats(ds), Values::Floats(od)) => ds.extend_from_slice(&od),
            _ => unreachable!("forms were unified above"),
        }
        self.total += other.total;
        Ok(())
    }

    /// Inserts every row of `other` before this block's rows.
    pub fn prepend(&mut self, mut other: Accumulator) -> Result<(), StrataError> {
        std::mem::swap(self, &mut other);
        self.concat(other)
    }

    //==============================================================================
    // Push path and storage-shape management
    //==============================================================================

    fn check_capacity(&self, extra: usize) -> Result<(), StrataError> {
        let max = self.config.max_rows_per_block;
        if self.total + extra > max {
            return Err(StrataError::RowOverflow(self.total, max));
        }
        Ok(())
    }

    fn push_scaled(&mut self, mantissa: i64, exponent: i32) -> Result<(), StrataError> {
        self.check_capacity(1)?;
        self.maybe_reshape();
        // Re-checked after the reshape: the buffer may just have gone sparse.
        if self.row_ids.is_some() && mantissa == 0 {
            self.total += 1;
            return Ok(());
        }
        let Values::Scaled {
            mantissas,
            exponents,
        } = &mut self.values
        else {
            unreachable!()
        };
        mantissas.push(mantissa);
        exponents.push(exponent);
        if let Some(ids) = &mut self.row_ids {
            ids.push(self.total as u32);
        }
        self.total += 1;
        Ok(())
    }

    fn push_float(&mut self, value: f64) -> Result<(), StrataError> {
        self.check_capacity(1)?;
        self.maybe_reshape();
        if self.row_ids.is_some() && value == 0.0 {
            self.total += 1;
            return Ok(());
        }
        let Values::Floats(ds) = &mut self.values else {
            unreachable!()
        };
        ds.push(value);
        if let Some(ids) = &mut self.row_ids {
            ids.push(self.total as u32);
        }
        self.total += 1;
        Ok(())
    }

    /// Revisits the storage shape, but only when the stored vector is about
    /// to reallocate, which keeps the O(stored) scan amortized-free.
    fn maybe_reshape(&mut self) {
        let len = self.stored_len();
        let cap = match &self.values {
            Values::Scaled { mantissas, .. } => mantissas.capacity(),
            Values::Floats(ds) => ds.capacity(),
        };
        if len == 0 || len < cap {
            return;
        }
        if self.row_ids.is_none() {
            let worthy = self.count_stored_worthy();
            if (worthy + 1) * MIN_SPARSE_RATIO < self.total {
                self.compact_to_sparse();
            }
        } else if !self.is_floats() && MIN_SPARSE_RATIO / 2 * len > self.total {
            self.make_dense();
        }
    }

    /// Entries a sparse compaction would keep: anything but a plain zero
    /// (missing rows store a NaN / sentinel pair and always survive).
    fn count_stored_worthy(&self) -> usize {
        match &self.values {
            Values::Scaled { mantissas, .. } => mantissas.iter().filter(|&&m| m != 0).count(),
            Values::Floats(ds) => ds.iter().filter(|&&d| d != 0.0).count(),
        }
    }

    /// Dense to sparse, in place: zeros are dropped, survivors get row ids.
    fn compact_to_sparse(&mut self) {
        debug_assert!(self.row_ids.is_none());
        let mut ids = Vec::new();
        match &mut self.values {
            Values::Scaled {
                mantissas,
                exponents,
            } => {
                let mut k = 0;
                for j in 0..mantissas.len() {
                    if mantissas[j] != 0 {
                        mantissas[k] = mantissas[j];
                        exponents[k] = exponents[j];
                        ids.push(j as u32);
                        k += 1;
                    }
                }
                mantissas.truncate(k);
                exponents.truncate(k);
            }
            Values::Floats(ds) => {
                let mut k = 0;
                for j in 0..ds.len() {
                    if ds[j] != 0.0 {
                        ds[k] = ds[j];
                        ids.push(j as u32);
                        k += 1;
                    }
                }
                ds.truncate(k);
            }
        }
        self.row_ids = Some(ids);
    }

    /// Sparse to dense: implicit zeros are materialized. No-op when already
    /// dense.
    fn make_dense(&mut self) {
        let Some(ids) = self.row_ids.take() else {
            return;
        };
        match &mut self.values {
            Values::Scaled {
                mantissas,
                exponents,
            } => {
                let mut m2 = vec![0i64; self.total];
                let mut x2 = vec![0i32; self.total];
                for (j, &row) in ids.iter().enumerate() {
                    m2[row as usize] = mantissas[j];
                    x2[row as usize] = exponents[j];
                }
                *mantissas = m2;
                *exponents = x2;
            }
            Values::Floats(ds) => {
                let mut d2 = vec![0.0f64; self.total];
                for (j, &row) in ids.iter().enumerate() {
                    d2[row as usize] = ds[j];
                }
                *ds = d2;
            }
        }
    }

    /// One-way widening to `f64` storage. Categorical codes have no numeric
    /// meaning and widen to missing.
    fn switch_to_floats(&mut self) {
        if let Values::Scaled {
            mantissas,
            exponents,
        } = &self.values
        {
            let ds = mantissas
                .iter()
                .zip(exponents)
                .map(|(&m, &x)| {
                    if x == NA_EXPONENT || x == CATEGORICAL_EXPONENT {
                        f64::NAN
                    } else {
                        m as f64 * pow10(x)
                    }
                })
                .collect();
            self.values = Values::Floats(ds);
        }
    }

    fn floats_all_integral(&self) -> bool {
        match &self.values {
            Values::Floats(ds) => ds
                .iter()
                .all(|&d| d.is_nan() || (d as i64) as f64 == d),
            Values::Scaled { .. } => false,
        }
    }

    /// Narrows integral float storage back to scaled form so the block stays
    /// eligible for the integer layouts.
    fn floats_to_scaled(&mut self) {
        debug_assert!(self.floats_all_integral());
        if let Values::Floats(ds) = &self.values {
            let mut mantissas = Vec::with_capacity(ds.len());
            let mut exponents = Vec::with_capacity(ds.len());
            for &d in ds {
                if d.is_nan() {
                    mantissas.push(NA_MANTISSA);
                    exponents.push(NA_EXPONENT);
                } else {
                    mantissas.push(d as i64);
                    exponents.push(0);
                }
            }
            self.values = Values::Scaled {
                mantissas,
                exponents,
            };
        }
    }

    //==============================================================================
    // Classification and reconciliation
    //==============================================================================

    /// The block's classified column kind, as `finalize` will see it.
    pub fn column_kind(&self) -> ColumnKind {
        classify(&Counts::scan(self), self.total, self.time_hits)
    }

    /// For a categorical block: categorical marks drop away (the codes are
    /// now plain small integers) and stray plain numbers, which cannot be
    /// valid codes, become missing. Returns whether anything changed.
    fn resolve_categorical(&mut self) -> bool {
        let Values::Scaled {
            mantissas,
            exponents,
        } = &mut self.values
        else {
            return false;
        };
        let mut changed = false;
        for j in 0..exponents.len() {
            match exponents[j] {
                NA_EXPONENT => {}
                CATEGORICAL_EXPONENT => {
                    exponents[j] = 0;
                    changed = true;
                }
                _ => {
                    mantissas[j] = NA_MANTISSA;
                    exponents[j] = NA_EXPONENT;
                    changed = true;
                }
            }
        }
        changed
    }

    /// For a non-categorical block: stray categorical codes become missing.
    fn resolve_numeric(&mut self) -> bool {
        let Values::Scaled {
            mantissas,
            exponents,
        } = &mut self.values
        else {
            return false;
        };
        let mut changed = false;
        for j in 0..exponents.len() {
            if exponents[j] == CATEGORICAL_EXPONENT {
                mantissas[j] = NA_MANTISSA;
                exponents[j] = NA_EXPONENT;
                changed = true;
            }
        }
        changed
    }

    //==============================================================================
    // Finalize
    //==============================================================================

    /// Consumes the accumulator and packs it into its most compact layout.
    pub fn finalize(mut self) -> Result<DecodableChunk, StrataError> {
        let mut counts = Counts::scan(&self);
        let kind = classify(&counts, self.total, self.time_hits);
        if kind == ColumnKind::AllMissing {
            log::debug!("block finalize: rows={} all missing", self.total);
            return Ok(DecodableChunk::constant(
                self.total,
                ChunkLayout::ConstantFloat { value: f64::NAN },
            ));
        }
        if !self.is_floats() {
            let changed = match kind {
                ColumnKind::Categorical => self.resolve_categorical(),
                // A time-stamped block keeps stray codes as plain numbers.
                ColumnKind::Temporal => false,
                _ => self.resolve_numeric(),
            };
            if changed {
                counts = Counts::scan(&self);
            }
        }

        // Final sparsity verdict; the storage shape is aligned to it so each
        // packer sees the shape its layout expects.
        let want_sparse = MIN_SPARSE_RATIO * (counts.missing + counts.nonzero) < self.total;
        if want_sparse && self.row_ids.is_none() {
            self.compact_to_sparse();
        } else if !want_sparse {
            self.make_dense();
        }

        if self.is_floats() {
            if self.floats_all_integral() {
                self.floats_to_scaled();
            } else {
                return self.finalize_floats(&counts, want_sparse);
            }
        }

        let stats = FixedPointStats::scan(&self, want_sparse);
        let layout = select_layout(&stats, &counts, want_sparse, self.total);
        log::debug!(
            "block finalize: rows={} stored={} layout={:?}",
            self.total,
            self.stored_len(),
            layout
        );
        let bytes = serializer::serialize(&self, &layout);
        DecodableChunk::from_parts(self.total, layout, bytes)
    }

    /// The float-only tail of `finalize`: a dense block of one repeated
    /// value collapses to a constant, everything else packs as raw doubles.
    fn finalize_floats(
        &self,
        counts: &Counts,
        want_sparse: bool,
    ) -> Result<DecodableChunk, StrataError> {
        if self.row_ids.is_none() && counts.missing == 0 {
            let Values::Floats(ds) = &self.values else {
                unreachable!()
            };
            if let Some((&first, rest)) = ds.split_first() {
                if rest.iter().all(|&d| d == first) {
                    log::debug!("block finalize: rows={} constant float", self.total);
                    return Ok(DecodableChunk::constant(
                        self.total,
                        ChunkLayout::ConstantFloat { value: first },
                    ));
                }
            }
        }
        let layout = if want_sparse {
            ChunkLayout::SparseFloat64
        } else {
            ChunkLayout::DenseFloat64
        };
        log::debug!(
            "block finalize: rows={} stored={} layout={:?}",
            self.total,
            self.stored_len(),
            layout
        );
        let bytes = serializer::serialize(self, &layout);
        DecodableChunk::from_parts(self.total, layout, bytes)
    }

    //==============================================================================
    // Read accessors for the statistics and packing passes
    //==============================================================================

    pub fn total_rows(&self) -> usize {
        self.total
    }

    /// Stored entries, excluding the implicit zeros of a sparse buffer.
    pub fn stored_len(&self) -> usize {
        match &self.values {
            Values::Scaled { mantissas, .. } => mantissas.len(),
            Values::Floats(ds) => ds.len(),
        }
    }

    pub(crate) fn is_floats(&self) -> bool {
        matches!(self.values, Values::Floats(_))
    }

    pub(crate) fn floats_slice(&self) -> &[f64] {
        match &self.values {
            Values::Floats(ds) => ds,
            Values::Scaled { .. } => &[],
        }
    }

    pub(crate) fn scaled_slices(&self) -> (&[i64], &[i32]) {
        match &self.values {
            Values::Scaled {
                mantissas,
                exponents,
            } => (mantissas, exponents),
            Values::Floats(_) => (&[], &[]),
        }
    }

    pub(crate) fn row_ids(&self) -> Option<&[u32]> {
        self.row_ids.as_deref()
    }

    pub(crate) fn is_na_stored(&self, j: usize) -> bool {
        match &self.values {
            Values::Scaled { exponents, .. } => exponents[j] == NA_EXPONENT,
            Values::Floats(ds) => ds[j].is_nan(),
        }
    }

    pub(crate) fn is_categorical_stored(&self, j: usize) -> bool {
        match &self.values {
            Values::Scaled { exponents, .. } => exponents[j] == CATEGORICAL_EXPONENT,
            Values::Floats(_) => false,
        }
    }

    /// Stored entry `j` as an `f64`; missing decodes to NaN.
    pub(crate) fn stored_f64(&self, j: usize) -> f64 {
        match &self.values {
            Values::Floats(ds) => ds[j],
            Values::Scaled {
                mantissas,
                exponents,
            } => match exponents[j] {
                NA_EXPONENT => f64::NAN,
                CATEGORICAL_EXPONENT => mantissas[j] as f64,
                x => mantissas[j] as f64 * pow10(x),
            },
        }
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn acc() -> Accumulator {
        Accumulator::new(Arc::new(CodecConfig::default()))
    }

    fn acc_with_max(max: usize) -> Accumulator {
        Accumulator::new(Arc::new(CodecConfig {
            max_rows_per_block: max,
        }))
    }

    #[test]
    fn test_scaled_append_canonicalizes() {
        let mut a = acc();
        a.append_scaled_integer(1300, -3).unwrap();
        a.append_scaled_integer(0, -7).unwrap();
        let (m, x) = a.scaled_slices();
        assert_eq!(m, &[13, 0]);
        assert_eq!(x, &[-1, 0]);
    }

    #[test]
    fn test_reserved_exponents_are_rejected() {
        let mut a = acc();
        assert!(a.append_scaled_integer(1, NA_EXPONENT).is_err());
        assert!(a
            .append_scaled_integer(1, CATEGORICAL_EXPONENT)
            .is_err());
        assert_eq!(a.total_rows(), 0);
    }

    #[test]
    fn test_fractional_number_switches_to_floats() {
        let mut a = acc();
        a.append_scaled_integer(7, 0).unwrap();
        assert!(!a.is_floats());
        a.append_number(0.5).unwrap();
        assert!(a.is_floats());
        assert_eq!(a.floats_slice(), &[7.0, 0.5]);
        // Later integers ride along as floats.
        a.append_scaled_integer(3, 0).unwrap();
        assert_eq!(a.floats_slice(), &[7.0, 0.5, 3.0]);
    }

    #[test]
    fn test_mostly_zero_buffer_goes_sparse_on_growth() {
        let mut a = acc();
        a.append_scaled_integer(5, 0).unwrap();
        for _ in 0..2000 {
            a.append_scaled_integer(0, 0).unwrap();
        }
        assert!(a.row_ids().is_some());
        assert_eq!(a.stored_len(), 1);
        assert_eq!(a.total_rows(), 2001);
        assert_eq!(a.row_ids().unwrap(), &[0]);
    }

    #[test]
    fn test_dense_growth_cancels_sparsity() {
        let mut a = acc();
        a.append_scaled_integer(5, 0).unwrap();
        for _ in 0..2000 {
            a.append_scaled_integer(0, 0).unwrap();
        }
        assert!(a.row_ids().is_some());
        for v in 1..3000 {
            a.append_scaled_integer(v, 0).unwrap();
        }
        assert!(a.row_ids().is_none());
        assert_eq!(a.stored_len(), a.total_rows());
    }

    #[test]
    fn test_missing_rows_survive_sparse_compaction() {
        let mut a = acc();
        a.append_missing().unwrap();
        for _ in 0..2000 {
            a.append_scaled_integer(0, 0).unwrap();
        }
        assert!(a.row_ids().is_some());
        assert_eq!(a.stored_len(), 1);
        assert!(a.is_na_stored(0));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut a = acc_with_max(4);
        for _ in 0..4 {
            a.append_scaled_integer(1, 0).unwrap();
        }
        let err = a.append_scaled_integer(1, 0).unwrap_err();
        assert!(matches!(err, StrataError::RowOverflow(4, 4)));
    }

    #[test]
    fn test_overwrite_in_sparse_buffer() {
        let mut a = acc();
        a.append_scaled_integer(5, 0).unwrap();
        for _ in 0..2000 {
            a.append_scaled_integer(0, 0).unwrap();
        }
        assert!(a.row_ids().is_some());
        // Zero over an implicit zero keeps the buffer sparse.
        a.overwrite(100, 0.0).unwrap();
        assert!(a.row_ids().is_some());
        // A stored row updates in place.
        a.overwrite(0, 9.0).unwrap();
        assert!(a.row_ids().is_some());
        // A real value on an implicit row densifies.
        a.overwrite(100, 3.0).unwrap();
        assert!(a.row_ids().is_none());
        let (m, _) = a.scaled_slices();
        assert_eq!(m[0], 9);
        assert_eq!(m[100], 3);
        assert!(a.overwrite(5000, 1.0).is_err());
    }

    #[test]
    fn test_concat_mixed_forms_unifies_to_floats() {
        let mut a = acc();
        a.append_scaled_integer(1, 0).unwrap();
        let mut b = acc();
        b.append_number(2.5).unwrap();
        a.concat(b).unwrap();
        assert!(a.is_floats());
        assert_eq!(a.floats_slice(), &[1.0, 2.5]);
        assert_eq!(a.total_rows(), 2);
    }

    #[test]
    fn test_concat_sparse_blocks_offsets_row_ids() {
        let mut a = acc();
        a.append_scaled_integer(5, 0).unwrap();
        for _ in 0..2000 {
            a.append_scaled_integer(0, 0).unwrap();
        }
        let mut b = acc();
        b.append_scaled_integer(7, 0).unwrap();
        for _ in 0..2000 {
            b.append_scaled_integer(0, 0).unwrap();
        }
        a.concat(b).unwrap();
        assert_eq!(a.total_rows(), 4002);
        assert_eq!(a.row_ids().unwrap(), &[0, 2001]);
        let (m, _) = a.scaled_slices();
        assert_eq!(m, &[5, 7]);
    }

    #[test]
    fn test_prepend_reverses_order() {
        let mut a = acc();
        a.append_scaled_integer(2, 0).unwrap();
        let mut b = acc();
        b.append_scaled_integer(1, 0).unwrap();
        a.prepend(b).unwrap();
        let (m, _) = a.scaled_slices();
        assert_eq!(m, &[1, 2]);
    }

    #[test]
    fn test_classification_follows_time_hits() {
        let mut a = acc();
        for _ in 0..4 {
            a.append_scaled_integer(1_400_000_000_000, 0).unwrap();
            a.record_time_parse();
        }
        a.append_scaled_integer(17, 0).unwrap();
        assert_eq!(a.column_kind(), ColumnKind::Temporal);
    }

    #[test]
    fn test_prefilled_is_all_missing() {
        let a = Accumulator::prefilled(Arc::new(CodecConfig::default()), 10).unwrap();
        assert_eq!(a.total_rows(), 10);
        assert_eq!(a.column_kind(), ColumnKind::AllMissing);
    }
}
