//! Leaf data structures for fiducial tag detection.
//!
//! This crate is intentionally small and has no notion of images or tag
//! codes. A pixel-level detector uses [`UnionFind`] to merge connected
//! components and [`SpatialGrid`] to find nearby candidates (segment end
//! points, corners) while assembling quads.

mod logger;
mod spatial_grid;
mod union_find;

pub use spatial_grid::{GridError, GridQuery, SpatialGrid};
pub use union_find::{UnionFind, UnionFindError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
