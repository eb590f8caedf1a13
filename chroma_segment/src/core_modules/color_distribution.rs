// THEORY:
// The `ColorDistribution` is the fingerprint of a patch of color. It is a 3D histogram
// over a quantized color cube: every channel (0..=255) is split into `K` equal ranges,
// so a color lands in exactly one of the K*K*K cells. Two patches with the same mix
// of colors produce the same fingerprint regardless of where those colors sit inside
// the patch, which is what makes it a good descriptor for "what does the background
// look like" versus "what does the object look like".
//
// Lifecycle:
// 1.  **Accumulation**: A fresh distribution starts with every bin at zero. Each call to
//     `add` increments one integer counter and the sample counter. Counts are kept as
//     `u32` so frames past 2^24 pixels still count exactly.
// 2.  **Finalization**: `finalize` divides every bin by the sample count so the bins become
//     frequencies summing to 1. From that point the distribution is frozen: `add` is a
//     silent no-op and a second `finalize` changes nothing.
// 3.  **Comparison**: `distance` is only defined between two finalized distributions. It
//     is the chi-squared dissimilarity, summed over all K^3 bins.
//
// The quantization mapping (`value * K / 256`) is part of the contract: distributions
// built with different `K` are not comparable, which the const generic enforces at
// compile time.

use crate::error::{Result, SegmentError};
use image::Rgb;

/// Number of quantization steps per channel in the reference configuration.
pub const HIST_SIZE: usize = 8;

/// Sentinel returned by [`ColorDistribution::distance`] when either operand is not finalized.
pub const NOT_READY: f32 = -1.0;

/// Added to every chi-squared denominator so bins empty in both operands contribute zero.
const DISTANCE_EPSILON: f32 = 1e-10;

/// A normalized 3D color histogram over a `K`x`K`x`K` quantized color cube.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorDistribution<const K: usize = HIST_SIZE> {
    /// Raw per-bin counts, frozen once finalized.
    counts: [[[u32; K]; K]; K],
    /// Frequencies, only filled in by `finalize`.
    frequencies: [[[f32; K]; K]; K],
    /// Number of samples accumulated through `add`.
    sample_count: u32,
    finalized: bool,
}

impl<const K: usize> Default for ColorDistribution<K> {
    fn default() -> Self {
        Self {
            counts: [[[0; K]; K]; K],
            frequencies: [[[0.0; K]; K]; K],
            sample_count: 0,
            finalized: false,
        }
    }
}

impl<const K: usize> ColorDistribution<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a raw channel value to its bin index.
    #[inline]
    pub fn quantize(value: u8) -> usize {
        value as usize * K / 256
    }

    /// Zeroes every bin and the sample count, and clears the finalized flag.
    pub fn reset(&mut self) {
        self.counts = [[[0; K]; K]; K];
        self.frequencies = [[[0.0; K]; K]; K];
        self.sample_count = 0;
        self.finalized = false;
    }

    /// Accumulates one color sample. Ignored once the distribution is finalized.
    pub fn add(&mut self, color: Rgb<u8>) {
        if self.finalized {
            return;
        }
        let [c0, c1, c2] = color.0;
        self.counts[Self::quantize(c0)][Self::quantize(c1)][Self::quantize(c2)] += 1;
        self.sample_count += 1;
    }

    /// Turns counts into frequencies and freezes the distribution.
    ///
    /// Finalizing an already finalized distribution is a no-op. Finalizing without any
    /// sample would divide by zero; it fails with [`SegmentError::EmptyRegion`] and leaves
    /// the distribution open for further samples.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        if self.sample_count == 0 {
            return Err(SegmentError::EmptyRegion);
        }
        let total = self.sample_count as f64;
        let counts = self.counts.iter().flatten().flatten();
        for (frequency, count) in self.frequencies.iter_mut().flatten().flatten().zip(counts) {
            *frequency = (*count as f64 / total) as f32;
        }
        self.finalized = true;
        Ok(())
    }

    /// Chi-squared distance to `other`, or [`NOT_READY`] if either side is not finalized.
    ///
    /// Each bin pair `(p, q)` contributes `(p - q)^2 / (p + q + eps)`; the epsilon keeps
    /// doubly-empty bins at zero without a branch.
    pub fn distance(&self, other: &Self) -> f32 {
        self.try_distance(other).unwrap_or(NOT_READY)
    }

    /// Same as [`distance`](Self::distance) but reports the not-ready case as an error.
    pub fn try_distance(&self, other: &Self) -> Result<f32> {
        if !self.finalized || !other.finalized {
            return Err(SegmentError::NotReady);
        }
        let distance = self
            .bins()
            .zip(other.bins())
            .map(|(p, q)| (p - q).powi(2) / (p + q + DISTANCE_EPSILON))
            .sum();
        Ok(distance)
    }

    /// Iterates every bin in index order: counts while open, frequencies once finalized.
    pub fn bins(&self) -> impl Iterator<Item = f32> + '_ {
        let finalized = self.finalized;
        self.counts
            .iter()
            .flatten()
            .flatten()
            .zip(self.frequencies.iter().flatten().flatten())
            .map(move |(count, frequency)| if finalized { *frequency } else { *count as f32 })
    }

    /// Value of the bin addressed by three quantized indices.
    pub fn bin(&self, i: usize, j: usize, k: usize) -> f32 {
        if self.finalized {
            self.frequencies[i][j][k]
        } else {
            self.counts[i][j][k] as f32
        }
    }

    /// Value of the bin a given color falls into.
    pub fn bin_for(&self, color: Rgb<u8>) -> f32 {
        let [c0, c1, c2] = color.0;
        self.bin(Self::quantize(c0), Self::quantize(c1), Self::quantize(c2))
    }

    /// Exact number of samples that fell into the bin addressed by three quantized indices.
    pub fn count(&self, i: usize, j: usize, k: usize) -> u32 {
        self.counts[i][j][k]
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalized_from(colors: &[[u8; 3]]) -> ColorDistribution {
        let mut distribution = ColorDistribution::new();
        for color in colors {
            distribution.add(Rgb(*color));
        }
        distribution.finalize().expect("non-empty distribution");
        distribution
    }

    #[test]
    fn quantization_splits_channel_into_equal_ranges() {
        assert_eq!(ColorDistribution::<8>::quantize(0), 0);
        assert_eq!(ColorDistribution::<8>::quantize(31), 0);
        assert_eq!(ColorDistribution::<8>::quantize(32), 1);
        assert_eq!(ColorDistribution::<8>::quantize(255), 7);
        assert_eq!(ColorDistribution::<4>::quantize(64), 1);
    }

    #[test]
    fn add_counts_samples_before_finalization() {
        let mut distribution = ColorDistribution::<8>::new();
        distribution.add(Rgb([10, 10, 10]));
        distribution.add(Rgb([20, 20, 20]));
        distribution.add(Rgb([200, 0, 0]));

        assert_eq!(distribution.sample_count(), 3);
        assert_eq!(distribution.bin(0, 0, 0), 2.0);
        assert_eq!(distribution.bin(6, 0, 0), 1.0);
        assert_eq!(distribution.bins().sum::<f32>(), 3.0);
    }

    #[test]
    fn finalized_bins_sum_to_one() {
        let distribution = finalized_from(&[[0, 0, 0], [255, 255, 255], [90, 160, 30], [90, 161, 31]]);
        let total: f32 = distribution.bins().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(distribution.bin_for(Rgb([90, 160, 30])), 0.5);
    }

    #[test]
    fn add_after_finalize_is_ignored() {
        let mut distribution = finalized_from(&[[1, 2, 3]]);
        let before = distribution.clone();
        distribution.add(Rgb([250, 250, 250]));
        assert_eq!(distribution, before);
    }

    #[test]
    fn second_finalize_keeps_bins() {
        let mut distribution = finalized_from(&[[1, 2, 3], [100, 100, 100], [100, 100, 100]]);
        let before = distribution.clone();
        distribution.finalize().unwrap();
        assert_eq!(distribution, before);
    }

    #[test]
    fn finalize_without_samples_fails() {
        let mut distribution = ColorDistribution::<8>::new();
        assert!(matches!(distribution.finalize(), Err(SegmentError::EmptyRegion)));
        assert!(!distribution.is_finalized());
    }

    #[test]
    fn distance_requires_both_sides_finalized() {
        let finalized = finalized_from(&[[5, 5, 5]]);
        let mut open = ColorDistribution::<8>::new();
        open.add(Rgb([5, 5, 5]));

        assert_eq!(finalized.distance(&open), NOT_READY);
        assert_eq!(open.distance(&finalized), NOT_READY);
        assert_eq!(open.distance(&open), NOT_READY);
        assert!(matches!(open.try_distance(&finalized), Err(SegmentError::NotReady)));
    }

    #[test]
    fn distance_is_zero_on_self_and_symmetric() {
        let a = finalized_from(&[[0, 0, 0], [40, 80, 120], [250, 10, 10]]);
        let b = finalized_from(&[[0, 0, 0], [0, 0, 0], [128, 128, 128]]);

        assert_eq!(a.distance(&a), 0.0);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert!(a.distance(&b) > 0.0);
    }

    #[test]
    fn disjoint_distributions_are_maximally_distant() {
        let a = finalized_from(&[[0, 0, 0]]);
        let b = finalized_from(&[[255, 255, 255]]);
        // Two bins, each contributing 1^2 / 1.
        assert!((a.distance(&b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn counts_past_f32_precision_stay_exact() {
        let mut distribution = ColorDistribution::<8>::new();
        let samples = (1u32 << 24) + 3;
        for _ in 0..samples {
            distribution.add(Rgb([0, 0, 0]));
        }
        distribution.add(Rgb([255, 255, 255]));

        assert_eq!(distribution.count(0, 0, 0), samples);
        assert_eq!(distribution.count(7, 7, 7), 1);
        assert_eq!(distribution.sample_count(), samples + 1);

        distribution.finalize().unwrap();
        let total: f32 = distribution.bins().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reset_reopens_the_distribution() {
        let mut distribution = finalized_from(&[[1, 2, 3]]);
        distribution.reset();
        assert!(!distribution.is_finalized());
        assert_eq!(distribution.sample_count(), 0);
        assert!(distribution.bins().all(|bin| bin == 0.0));
        distribution.add(Rgb([1, 2, 3]));
        assert_eq!(distribution.sample_count(), 1);
    }
}
