//! Luminance grids and their conversion into dark/light bit images

use crate::{Binarizer, ImageView};

/// Row-major 8-bit luminance, one byte per pixel.
#[derive(Debug, Clone)]
pub(crate) struct LumImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl LumImage {
    pub fn from_view(view: &ImageView) -> Self {
        Self {
            width: view.width(),
            height: view.height(),
            data: view.to_luminance(),
        }
    }

    #[cfg(test)]
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Half resolution copy, each pixel the mean of a 2x2 block.
    pub fn downscaled(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let (x0, y0) = (2 * x, 2 * y);
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);
                let sum = self.get(x0, y0) as u32
                    + self.get(x1, y0) as u32
                    + self.get(x0, y1) as u32
                    + self.get(x1, y1) as u32;
                data.push(((sum + 2) / 4) as u8);
            }
        }
        Self { width, height, data }
    }

    pub fn binarize(&self, binarizer: Binarizer) -> BitImage {
        match binarizer {
            Binarizer::LocalAverage => local_average(self),
            Binarizer::GlobalHistogram => self.threshold(histogram_threshold(&self.data)),
            Binarizer::FixedThreshold => self.threshold(127),
            Binarizer::BoolCast => self.threshold(0),
        }
    }

    /// Dark means a luminance of at most `t`.
    fn threshold(&self, t: u8) -> BitImage {
        BitImage {
            width: self.width,
            height: self.height,
            bits: self.data.iter().map(|&v| v <= t).collect(),
        }
    }
}

/// Row-major dark (true) / light (false) pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitImage {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl BitImage {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.bits[y * self.width..(y + 1) * self.width]
    }

    /// Swap rows and columns, so column scans become row scans.
    pub fn transposed(&self) -> Self {
        let mut bits = Vec::with_capacity(self.bits.len());
        for x in 0..self.width {
            bits.extend((0..self.height).map(|y| self.bits[y * self.width + x]));
        }
        Self {
            width: self.height,
            height: self.width,
            bits,
        }
    }

    pub fn inverted(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            bits: self.bits.iter().map(|b| !b).collect(),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Otsu threshold over the 256 bin histogram.
fn histogram_threshold(data: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in data {
        histogram[v as usize] += 1;
    }
    let total = data.len() as f64;
    let sum_all: f64 = histogram.iter().enumerate().map(|(v, &n)| v as f64 * n as f64).sum();

    let mut best = (0.0, 127u8);
    let mut weight_dark = 0.0;
    let mut sum_dark = 0.0;
    for (t, &n) in histogram.iter().enumerate() {
        weight_dark += n as f64;
        sum_dark += t as f64 * n as f64;
        let weight_light = total - weight_dark;
        if weight_dark == 0.0 || weight_light == 0.0 {
            continue;
        }
        let mean_dark = sum_dark / weight_dark;
        let mean_light = (sum_all - sum_dark) / weight_light;
        let between = weight_dark * weight_light * (mean_dark - mean_light).powi(2);
        if between > best.0 {
            best = (between, t as u8);
        }
    }
    best.1
}

const BLOCK_SIZE: usize = 8;
const MIN_DYNAMIC_RANGE: u8 = 24;
/// Below this size in either direction the local average falls back to the
/// histogram threshold.
const MIN_LOCAL_SIZE: usize = 5 * BLOCK_SIZE;

/// Threshold each 8x8 block by the mean black point of its 5x5 block
/// neighbourhood.
fn local_average(lum: &LumImage) -> BitImage {
    if lum.width < MIN_LOCAL_SIZE || lum.height < MIN_LOCAL_SIZE {
        return lum.threshold(histogram_threshold(&lum.data));
    }
    let bw = lum.width.div_ceil(BLOCK_SIZE);
    let bh = lum.height.div_ceil(BLOCK_SIZE);

    let mut black_points = vec![0u32; bw * bh];
    for by in 0..bh {
        for bx in 0..bw {
            let (mut min, mut max, mut sum, mut count) = (u8::MAX, 0u8, 0u32, 0u32);
            for y in by * BLOCK_SIZE..((by + 1) * BLOCK_SIZE).min(lum.height) {
                for x in bx * BLOCK_SIZE..((bx + 1) * BLOCK_SIZE).min(lum.width) {
                    let v = lum.get(x, y);
                    min = min.min(v);
                    max = max.max(v);
                    sum += v as u32;
                    count += 1;
                }
            }
            let mut average = sum / count.max(1);
            if max - min <= MIN_DYNAMIC_RANGE {
                // flat block: assume it is light unless the neighbours say otherwise
                average = min as u32 / 2;
                if by > 0 && bx > 0 {
                    let neighbours = (black_points[(by - 1) * bw + bx]
                        + 2 * black_points[by * bw + bx - 1]
                        + black_points[(by - 1) * bw + bx - 1])
                        / 4;
                    if (min as u32) < neighbours {
                        average = neighbours;
                    }
                }
            }
            black_points[by * bw + bx] = average;
        }
    }

    let mut bits = vec![false; lum.width * lum.height];
    for by in 0..bh {
        for bx in 0..bw {
            let cx = bx.clamp(2, bw.saturating_sub(3).max(2));
            let cy = by.clamp(2, bh.saturating_sub(3).max(2));
            let mut sum = 0;
            let mut count = 0;
            for ny in cy.saturating_sub(2)..(cy + 3).min(bh) {
                for nx in cx.saturating_sub(2)..(cx + 3).min(bw) {
                    sum += black_points[ny * bw + nx];
                    count += 1;
                }
            }
            let threshold = sum / count.max(1);
            for y in by * BLOCK_SIZE..((by + 1) * BLOCK_SIZE).min(lum.height) {
                for x in bx * BLOCK_SIZE..((bx + 1) * BLOCK_SIZE).min(lum.width) {
                    bits[y * lum.width + x] = (lum.get(x, y) as u32) <= threshold;
                }
            }
        }
    }

    BitImage {
        width: lum.width,
        height: lum.height,
        bits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripes(width: usize, height: usize, dark: u8, light: u8) -> LumImage {
        let data = (0..height)
            .flat_map(|_| (0..width).map(move |x| if (x / 4) % 2 == 1 { dark } else { light }))
            .collect();
        LumImage::from_raw(width, height, data)
    }

    #[test]
    fn test_fixed_and_bool_cast() {
        let lum = LumImage::from_raw(4, 1, vec![0, 100, 127, 200]);
        let bits = lum.binarize(Binarizer::FixedThreshold);
        assert_eq!(bits.row(0), &[true, true, true, false]);
        let bits = lum.binarize(Binarizer::BoolCast);
        assert_eq!(bits.row(0), &[true, false, false, false]);
    }

    #[test]
    fn test_histogram_threshold_separates_levels() {
        let lum = stripes(16, 2, 60, 180);
        let t = histogram_threshold(&lum.data);
        assert!((60..180).contains(&t), "{t}");
        let bits = lum.binarize(Binarizer::GlobalHistogram);
        assert_eq!(&bits.row(1)[..8], &[false, false, false, false, true, true, true, true]);
    }

    #[test]
    fn test_local_average_follows_stripes() {
        let lum = stripes(64, 48, 30, 220);
        let bits = lum.binarize(Binarizer::LocalAverage);
        for y in [0, 20, 47] {
            for x in 0..64 {
                assert_eq!(bits.row(y)[x], (x / 4) % 2 == 1, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_transpose_invert_downscale() {
        let lum = LumImage::from_raw(3, 2, vec![0, 255, 0, 255, 0, 255]);
        let bits = lum.binarize(Binarizer::FixedThreshold);
        let t = bits.transposed();
        assert_eq!((t.width(), t.height()), (2, 3));
        assert_eq!(t.row(0), &[true, false]);
        assert_eq!(t.row(1), &[false, true]);
        assert_eq!(bits.inverted().row(0), &[false, true, false]);

        let lum = LumImage::from_raw(4, 2, vec![0, 0, 255, 255, 0, 0, 255, 255]);
        let small = lum.downscaled();
        assert_eq!((small.width(), small.height()), (2, 1));
        assert_eq!(small.data, vec![0, 255]);
    }
}
