//! River and delta generation library
//!
//! Re-exports modules for use by binaries and tools.

pub mod export;
pub mod geometry;
pub mod grid;
pub mod noise_field;
pub mod river;
pub mod seeds;
pub mod tilemap;
