//! AprilTag-style code families and nearest-code decoding.
//!
//! This crate focuses on:
//! - the code family model (square bit grids packed into `u64`),
//! - rotation-invariant decoding by minimum Hamming distance,
//! - decode results, with optional quad geometry and duplicate suppression,
//! - built-in families and JSON family configs.
//!
//! It does **not** look at pixels. A quad detector samples the payload
//! bits of each candidate into a code word and hands it to
//! [`TagCodeFamily::decode`].
//!
//! ```
//! use tagcode_family::{builtin_family, rotate90};
//!
//! let family = builtin_family("tag16h5").expect("built-in");
//! let seen = rotate90(family.codes()[7], family.grid_dimension()) ^ 0b1;
//! let det = family.decode(seen);
//! assert_eq!((det.id, det.rotation, det.hamming_distance), (7, 1, 1));
//! assert!(det.good);
//! ```

mod bits;
pub mod builtins;
mod detection;
mod family;
mod homography;
pub mod io;

pub use bits::{hamming_distance, popcount, rotate90, rotations};
pub use builtins::{builtin_family, BUILTIN_FAMILIES};
pub use detection::{suppress_duplicates, QuadObservation, TagDetection};
pub use family::{compute_minimum_hamming_distance, FamilyError, TagCodeFamily, TagPattern};
pub use homography::Homography;
pub use io::{parse_code, FamilyConfigError, FamilyIoError, FamilySource, TagFamilyConfig};
