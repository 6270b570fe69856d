//! This module defines the single, unified error type for the strata chunk codec.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to this library's logic)
    // =========================================================================
    /// A block build appended more rows than the configured maximum. This is
    /// fatal: it signals a misconfigured block boundary upstream, never a
    /// condition the codec can recover from.
    #[error("row capacity exceeded: block already holds {0} rows, limit is {1}")]
    RowOverflow(usize, usize),

    #[error("invalid codec configuration: {0}")]
    ConfigError(String),

    #[error("internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically during config or
    /// layout-descriptor serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error from a safe byte-casting operation failing.
    #[error("Byte slice casting error: {0}")]
    PodCast(String), // Manual `From` impl needed; bytemuck::PodCastError doesn't impl Error

    // =========================================================================
    // === Low-Level Buffer Errors
    // =========================================================================
    #[error("Buffer length mismatch: expected {0} bytes, got {1}")]
    BufferMismatch(usize, usize),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for StrataError {
    fn from(err: bytemuck::PodCastError) -> Self {
        StrataError::PodCast(err.to_string())
    }
}
