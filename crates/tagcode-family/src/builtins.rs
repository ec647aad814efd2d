//! Embedded built-in tag families.

#![allow(clippy::unreadable_literal)]

use crate::TagCodeFamily;

/// Names accepted by [`builtin_family`].
pub const BUILTIN_FAMILIES: &[&str] = &["tag16h5"];

/// Tag16h5: 30 codes on a 4x4 grid, minimum rotated Hamming distance 5.
pub const TAG16H5_CODES: [u64; 30] = [
    0x231b, 0x2ea5, 0x346a, 0x45b9, 0x79a6, 0x7f6b, 0xb358, 0xe745, 0xfe59, 0x156d, 0x380b,
    0xf0ab, 0x0d84, 0x4736, 0x8c72, 0xaf10, 0x093c, 0x93b4, 0xa503, 0x468f, 0xe137, 0x5795,
    0xdf42, 0x1c1d, 0xe9dc, 0x73ad, 0xad5f, 0xd530, 0x07ca, 0xaf2e,
];

/// Build a built-in family by name (case-insensitive).
pub fn builtin_family(name: &str) -> Option<TagCodeFamily> {
    match name.to_ascii_lowercase().as_str() {
        "tag16h5" => TagCodeFamily::new("tag16h5", 16, 5, TAG16H5_CODES.to_vec()).ok(),
        _ => None,
    }
}
