//! Shared models and helpers for the splitswap router.
//!
//! Everything here is free of execution concerns: addresses and byte strings, token metadata,
//! the `SwapRoute` description a caller submits, its ABI wire format and the pre-transfer
//! validation rules. The execution pipeline itself lives in `router-engine`.

pub mod abi;
pub mod hex_bytes;
pub mod math;
pub mod models;
pub mod serde_primitives;

pub use hex_bytes::Bytes;
