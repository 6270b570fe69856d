//! This file is the root of the `strata_chunk` Rust crate.
//!
//! The crate is the adaptive columnar chunk codec of the strata in-memory
//! tabular engine: it accumulates one block of one column's values and, on
//! finalize, packs them into the most compact fixed-format binary layout
//! that still supports O(1) random-access decode.
//!
//! The surrounding engine (distributed key-value store, task runner, parser,
//! models) only ever touches three seams:
//! 1. the append interface of [`chunk::Accumulator`], fed tokens one at a time,
//! 2. `Accumulator::finalize`, yielding an immutable [`chunk::DecodableChunk`],
//! 3. the chunk's `at_integer` / `at_double` / `is_missing` read path.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod chunk;
pub mod config;
pub mod kernels;

mod error;

pub use error::StrataError;

//==================================================================================
// 2. Logging Toggle
//==================================================================================
/// Turns on verbose logging of the codec's layout decisions.
///
/// Intended for diagnostics from a host application or test harness; safe to
/// call more than once.
pub fn enable_verbose_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
