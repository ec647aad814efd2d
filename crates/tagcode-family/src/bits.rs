//! Bit-level helpers on packed tag codes.

const POPCOUNT_SHIFT: u32 = 12;
const POPCOUNT_MASK: u64 = (1 << POPCOUNT_SHIFT) - 1;

/// Set-bit counts of every 12-bit value, built at compile time.
static POPCOUNT_TABLE: [u8; 1 << POPCOUNT_SHIFT] = build_popcount_table();

const fn build_popcount_table() -> [u8; 1 << POPCOUNT_SHIFT] {
    let mut table = [0u8; 1 << POPCOUNT_SHIFT];
    let mut i = 1;
    while i < table.len() {
        // popcount(i) = popcount(i / 2) + lowest bit
        table[i] = table[i >> 1] + (i & 1) as u8;
        i += 1;
    }
    table
}

/// Number of set bits, summed over 12-bit table lookups.
#[inline]
pub fn popcount(mut word: u64) -> u32 {
    let mut count = 0u32;
    while word != 0 {
        count += POPCOUNT_TABLE[(word & POPCOUNT_MASK) as usize] as u32;
        word >>= POPCOUNT_SHIFT;
    }
    count
}

/// Number of differing bits between `a` and `b`.
#[inline]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    popcount(a ^ b)
}

/// Mask selecting the low `bits` bits of a word (`bits <= 64`).
#[inline]
pub(crate) fn low_bits_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Rotate a `d x d` code grid by 90 degrees.
///
/// The low `d * d` bits of `word` are the grid, with the most significant
/// payload bit at the top-left cell and bit 0 at the bottom-right. Source
/// bit `r + d * c` is emitted for `r` from `d - 1` down to `0` and `c`
/// ascending, which is the layout published tag families are generated
/// with. Four applications return the input; bits above `d * d` are
/// dropped.
///
/// `grid_dimension` must satisfy `d * d <= 64`.
pub fn rotate90(word: u64, grid_dimension: usize) -> u64 {
    let d = grid_dimension;
    debug_assert!(d * d <= 64, "{d}x{d} grid does not fit in 64 bits");

    let mut out = 0u64;
    for r in (0..d).rev() {
        for c in 0..d {
            let b = r + d * c;
            out = (out << 1) | ((word >> b) & 1);
        }
    }
    out
}

/// The four orientations `[w, R(w), R²(w), R³(w)]` of a code.
#[inline]
pub fn rotations(word: u64, grid_dimension: usize) -> [u64; 4] {
    let r1 = rotate90(word, grid_dimension);
    let r2 = rotate90(r1, grid_dimension);
    let r3 = rotate90(r2, grid_dimension);
    [word, r1, r2, r3]
}
