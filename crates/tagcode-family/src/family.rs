//! Tag code families and nearest-code decoding.

use crate::bits::{hamming_distance, low_bits_mask, rotations};
use crate::TagDetection;

/// Reasons a code table cannot form a family.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FamilyError {
    #[error("bit count must be > 0")]
    ZeroBitCount,
    #[error("bit count {0} is not a perfect square")]
    BitCountNotSquare(usize),
    #[error("bit count {0} exceeds the 64-bit code word")]
    BitCountTooLarge(usize),
    #[error("family has no codes")]
    EmptyCodes,
    #[error("code #{index} ({code:#x}) has bits above bit {bit_count}")]
    CodeTooWide {
        index: usize,
        code: u64,
        bit_count: usize,
    },
}

/// A fixed table of reference codes; the index of a code is the tag id.
///
/// Codes are square bit grids packed into the low `bit_count` bits of a
/// `u64` (MSB of the payload at the top-left, 1 = white). The table is
/// owned and immutable; only the acceptance threshold can be tuned.
#[derive(Clone, Debug)]
pub struct TagCodeFamily {
    name: String,
    bit_count: usize,
    grid_dimension: usize,
    minimum_hamming_distance: u32,
    error_recovery_bits: u32,
    white_border: usize,
    black_border: usize,
    codes: Vec<u64>,
    /// `rotated[id][r]` is `codes[id]` turned `r` times by [`crate::rotate90`].
    rotated: Vec<[u64; 4]>,
}

impl TagCodeFamily {
    /// Validate and build a family.
    ///
    /// `minimum_hamming_distance` is metadata (see
    /// [`compute_minimum_hamming_distance`] to derive it). The error
    /// recovery threshold starts at 1 bit and both borders at 1 module.
    pub fn new(
        name: impl Into<String>,
        bit_count: usize,
        minimum_hamming_distance: u32,
        codes: Vec<u64>,
    ) -> Result<Self, FamilyError> {
        if bit_count == 0 {
            return Err(FamilyError::ZeroBitCount);
        }
        if bit_count > 64 {
            return Err(FamilyError::BitCountTooLarge(bit_count));
        }
        let grid_dimension = bit_count.isqrt();
        if grid_dimension * grid_dimension != bit_count {
            return Err(FamilyError::BitCountNotSquare(bit_count));
        }
        if codes.is_empty() {
            return Err(FamilyError::EmptyCodes);
        }
        let mask = low_bits_mask(bit_count);
        if let Some((index, &code)) = codes.iter().enumerate().find(|(_, c)| **c & !mask != 0) {
            return Err(FamilyError::CodeTooWide {
                index,
                code,
                bit_count,
            });
        }

        let rotated = codes
            .iter()
            .map(|&c| rotations(c, grid_dimension))
            .collect();
        let name = name.into();

        log::debug!(
            "family {name}: {} codes, {bit_count} bits, min hamming {minimum_hamming_distance}",
            codes.len()
        );

        Ok(Self {
            name,
            bit_count,
            grid_dimension,
            minimum_hamming_distance,
            error_recovery_bits: 1,
            white_border: 1,
            black_border: 1,
            codes,
            rotated,
        })
    }

    /// Set the white/black border widths (in modules) used when exporting patterns.
    pub fn with_borders(mut self, white_border: usize, black_border: usize) -> Self {
        self.white_border = white_border;
        self.black_border = black_border;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload bits per code.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.bit_count
    }

    /// Side of the payload grid, `sqrt(bit_count)`.
    #[inline]
    pub fn grid_dimension(&self) -> usize {
        self.grid_dimension
    }

    #[inline]
    pub fn minimum_hamming_distance(&self) -> u32 {
        self.minimum_hamming_distance
    }

    #[inline]
    pub fn white_border(&self) -> usize {
        self.white_border
    }

    #[inline]
    pub fn black_border(&self) -> usize {
        self.black_border
    }

    /// Reference codes, indexed by tag id.
    #[inline]
    pub fn codes(&self) -> &[u64] {
        &self.codes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Always `false`: construction rejects empty tables.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Largest Hamming distance still reported as a good detection.
    #[inline]
    pub fn error_recovery_bits(&self) -> u32 {
        self.error_recovery_bits
    }

    pub fn set_error_recovery_bits(&mut self, bits: u32) {
        self.error_recovery_bits = bits;
    }

    /// Set the threshold to `trunc(((min_hamming - 1) / 2) * fraction)`.
    ///
    /// The halving is integer division. The product is truncated toward
    /// zero; negative or NaN fractions give 0. No other validation.
    pub fn set_error_recovery_fraction(&mut self, fraction: f64) {
        let correctable = self.minimum_hamming_distance.saturating_sub(1) / 2;
        self.error_recovery_bits = (correctable as f64 * fraction) as u32;
    }

    /// Find the reference code nearest to `observed_code` over all four orientations.
    ///
    /// Candidates are visited by ascending id, then ascending rotation, and
    /// the first strict minimum wins. The reported `rotation` `r` satisfies
    /// `observed ≈ rotate90^r(codes[id])`. Observed bits above `bit_count`
    /// are ignored. Never fails: a poor match comes back with `good == false`.
    pub fn decode(&self, observed_code: u64) -> TagDetection {
        let observed = observed_code & low_bits_mask(self.bit_count);

        let mut best_id = 0usize;
        let mut best_rotation = 0u8;
        let mut best_hamming = u32::MAX;

        'search: for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = hamming_distance(observed, cand);
                if h < best_hamming {
                    best_hamming = h;
                    best_id = id;
                    best_rotation = rot as u8;
                    if h == 0 {
                        break 'search;
                    }
                }
            }
        }

        let good = best_hamming <= self.error_recovery_bits;
        log::trace!(
            "{}: {observed_code:#x} -> id {best_id} rot {best_rotation} hamming {best_hamming} good {good}",
            self.name
        );

        TagDetection {
            good,
            observed_code,
            matched_code: self.codes[best_id],
            id: best_id as u32,
            hamming_distance: best_hamming,
            rotation: best_rotation,
            quad: None,
        }
    }

    /// Payload and border layout of tag `id`, or `None` if `id` is out of range.
    pub fn tag_pattern(&self, id: usize) -> Option<TagPattern> {
        let code = *self.codes.get(id)?;
        let d = self.grid_dimension;
        let offset = self.white_border + self.black_border;
        let size = 2 * offset + d;

        let mut modules = vec![true; size * size];
        for y in self.white_border..size - self.white_border {
            for x in self.white_border..size - self.white_border {
                modules[y * size + x] = false;
            }
        }
        for y in 0..d {
            for x in 0..d {
                let bit = d * d - 1 - (y * d + x);
                modules[(y + offset) * size + x + offset] = (code >> bit) & 1 == 1;
            }
        }

        Some(TagPattern { size, modules })
    }
}

/// Square module grid of one tag, row-major from the top-left; `true` is white.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPattern {
    pub size: usize,
    pub modules: Vec<bool>,
}

impl TagPattern {
    /// Module at column `x`, row `y` (`true` = white).
    #[inline]
    pub fn is_white(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.size + x]
    }

    /// Rows as text, `#` for black and `.` for white.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(self.size * (self.size + 1));
        for row in self.modules.chunks(self.size) {
            out.extend(row.iter().map(|&white| if white { '.' } else { '#' }));
            out.push('\n');
        }
        out
    }
}

/// Smallest Hamming distance between any two codes under any rotation.
///
/// A code is also compared with its own three non-trivial rotations, so a
/// rotationally symmetric code drives the result to 0. Returns `None` when
/// `bit_count` is not a square `<= 64` or `codes` is empty.
pub fn compute_minimum_hamming_distance(bit_count: usize, codes: &[u64]) -> Option<u32> {
    if bit_count == 0 || bit_count > 64 || codes.is_empty() {
        return None;
    }
    let d = bit_count.isqrt();
    if d * d != bit_count {
        return None;
    }

    let mut best = bit_count as u32;
    for (i, &a) in codes.iter().enumerate() {
        let rots = rotations(a, d);
        for &r in &rots[1..] {
            best = best.min(hamming_distance(a, r));
        }
        for &b in &codes[i + 1..] {
            for &r in &rots {
                best = best.min(hamming_distance(r, b));
            }
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotate90;

    fn two_code_family() -> TagCodeFamily {
        TagCodeFamily::new("test16", 16, 0, vec![0x0f0f, 0xf0f0]).expect("family")
    }

    #[test]
    fn rejects_invalid_configurations() {
        assert_eq!(
            TagCodeFamily::new("x", 15, 1, vec![1]).unwrap_err(),
            FamilyError::BitCountNotSquare(15)
        );
        assert_eq!(
            TagCodeFamily::new("x", 81, 1, vec![1]).unwrap_err(),
            FamilyError::BitCountTooLarge(81)
        );
        assert_eq!(
            TagCodeFamily::new("x", 0, 1, vec![0]).unwrap_err(),
            FamilyError::ZeroBitCount
        );
        assert_eq!(
            TagCodeFamily::new("x", 16, 1, vec![]).unwrap_err(),
            FamilyError::EmptyCodes
        );
        assert!(matches!(
            TagCodeFamily::new("x", 9, 1, vec![0x1ff, 0x200]).unwrap_err(),
            FamilyError::CodeTooWide { index: 1, .. }
        ));
    }

    #[test]
    fn accepts_full_word_families() {
        let fam = TagCodeFamily::new("x", 64, 3, vec![u64::MAX, 0]).expect("family");
        assert_eq!(fam.grid_dimension(), 8);
        assert_eq!(fam.decode(u64::MAX).id, 0);
    }

    #[test]
    fn defaults() {
        let fam = two_code_family();
        assert_eq!(fam.grid_dimension(), 4);
        assert_eq!(fam.error_recovery_bits(), 1);
        assert_eq!(fam.white_border(), 1);
        assert_eq!(fam.black_border(), 1);
        assert_eq!(fam.len(), 2);
    }

    #[test]
    fn exact_and_one_bit_off() {
        let fam = two_code_family();

        let det = fam.decode(0x0f0f);
        assert_eq!((det.id, det.hamming_distance, det.rotation), (0, 0, 0));
        assert!(det.good);
        assert_eq!(det.matched_code, 0x0f0f);

        let det = fam.decode(0x0f0e);
        assert_eq!((det.id, det.hamming_distance), (0, 1));
        assert!(det.good);
        assert_eq!(det.observed_code, 0x0f0e);
    }

    #[test]
    fn equidistant_code_is_not_good() {
        let fam = two_code_family();
        let det = fam.decode(0x00ff);
        assert_eq!(det.hamming_distance, 8);
        assert_eq!(det.id, 0);
        assert!(!det.good);
    }

    #[test]
    fn first_minimum_wins_ties() {
        // 0xf0f0 is code 0 turned twice and code 1 unturned.
        let fam = two_code_family();
        let det = fam.decode(0xf0f0);
        assert_eq!((det.id, det.rotation, det.hamming_distance), (0, 2, 0));
    }

    #[test]
    fn rotation_is_reported_relative_to_reference() {
        let fam = TagCodeFamily::new("x", 16, 0, vec![0x231b, 0x2ea5]).expect("family");
        let observed = rotate90(0x2ea5, 4);
        let det = fam.decode(observed);
        assert_eq!((det.id, det.rotation, det.hamming_distance), (1, 1, 0));
        assert_eq!(det.matched_code, 0x2ea5);
    }

    #[test]
    fn high_bits_are_ignored() {
        let fam = two_code_family();
        let det = fam.decode(0xffff_0000_0000_0f0f);
        assert_eq!((det.id, det.hamming_distance), (0, 0));
        assert_eq!(det.observed_code, 0xffff_0000_0000_0f0f);
    }

    #[test]
    fn threshold_boundary() {
        let mut fam = TagCodeFamily::new("x", 16, 5, vec![0x231b, 0x2ea5, 0x346a]).expect("family");
        fam.set_error_recovery_bits(2);

        let det = fam.decode(0x231b ^ 0b11);
        assert_eq!((det.id, det.hamming_distance), (0, 2));
        assert!(det.good);

        let det = fam.decode(0x231b ^ 0b111);
        assert_eq!(det.hamming_distance, 3);
        assert!(!det.good);
    }

    #[test]
    fn error_recovery_fraction_truncates() {
        let mut fam = TagCodeFamily::new("x", 36, 11, vec![1]).expect("family");
        fam.set_error_recovery_fraction(1.0);
        assert_eq!(fam.error_recovery_bits(), 5);
        fam.set_error_recovery_fraction(0.5);
        assert_eq!(fam.error_recovery_bits(), 2);
        fam.set_error_recovery_fraction(0.1);
        assert_eq!(fam.error_recovery_bits(), 0);
        fam.set_error_recovery_fraction(-1.0);
        assert_eq!(fam.error_recovery_bits(), 0);

        let mut fam = TagCodeFamily::new("x", 16, 0, vec![1]).expect("family");
        fam.set_error_recovery_fraction(1.0);
        assert_eq!(fam.error_recovery_bits(), 0);
    }

    #[test]
    fn decode_is_deterministic() {
        let fam = two_code_family();
        for code in [0u64, 0x1234, 0xbeef, 0xffff] {
            assert_eq!(fam.decode(code), fam.decode(code));
        }
    }

    #[test]
    fn minimum_distance_counts_self_rotations() {
        // 0x0f0f turned twice is 0xf0f0.
        assert_eq!(compute_minimum_hamming_distance(16, &[0x0f0f, 0xf0f0]), Some(0));
        assert_eq!(compute_minimum_hamming_distance(16, &[0x0f0f]), Some(0));
        assert_eq!(compute_minimum_hamming_distance(4, &[0b0001]), Some(2));
        assert_eq!(compute_minimum_hamming_distance(15, &[1]), None);
        assert_eq!(compute_minimum_hamming_distance(16, &[]), None);
    }

    #[test]
    fn pattern_has_borders_and_msb_top_left() {
        let fam = TagCodeFamily::new("x", 4, 1, vec![0b1000]).expect("family");
        let p = fam.tag_pattern(0).expect("pattern");
        assert_eq!(p.size, 6);
        assert_eq!(
            p.to_ascii(),
            "......\n.####.\n.#.##.\n.####.\n.####.\n......\n"
        );
        assert!(p.is_white(2, 2));
        assert!(!p.is_white(3, 2));
        assert!(!p.is_white(2, 3));
        assert!(!p.is_white(3, 3));
        assert!(!p.is_white(1, 4));
        assert!(p.is_white(0, 5));
        assert!(fam.tag_pattern(1).is_none());
    }

    #[test]
    fn pattern_border_widths() {
        let fam = TagCodeFamily::new("x", 16, 1, vec![0xffff])
            .expect("family")
            .with_borders(2, 1);
        let p = fam.tag_pattern(0).expect("pattern");
        assert_eq!(p.size, 10);
        assert!(p.is_white(1, 1));
        assert!(!p.is_white(2, 2));
        assert!(p.is_white(3, 3));
        assert_eq!(p.modules.iter().filter(|&&w| !w).count(), 36 - 16);
    }
}
