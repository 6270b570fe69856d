//! The chunk codec pipeline.
//!
//! Write side: [`Accumulator`] buffers one block of one column, adapting its
//! internal form (scaled decimals vs floats, dense vs sparse) as values
//! arrive. Read side: [`DecodableChunk`] is the immutable packed result.
//! In between sit the statistics passes ([`stats`]), the layout catalogue
//! ([`layout`]), the pure encoding selector and the per-layout packers.

pub mod accumulator;
pub mod decode;
pub mod layout;
pub mod stats;

mod selector;
mod serializer;

pub use accumulator::Accumulator;
pub use decode::DecodableChunk;
pub use layout::{ChunkLayout, LaneWidth};
pub use stats::{ColumnKind, Counts};
