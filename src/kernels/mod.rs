//! Pure, stateless kernels shared by the chunk builder and the decode path.
//!
//! Everything in here is panic-free for in-contract inputs and performs no
//! allocation beyond the output buffers handed in by the caller.

pub mod lanes;
pub mod pow10;
