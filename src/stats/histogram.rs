//! Fixed-binning counting histograms in one and two dimensions.

use serde::{Deserialize, Serialize};

/// Uniform binning over `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub bins: usize,
    pub min: f64,
    pub max: f64,
}

/// Where a value falls on an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisBin {
    Underflow,
    Bin(usize),
    Overflow,
}

impl Axis {
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }

    /// Build from a `(bins, min, max)` tuple
    pub const fn from_tuple(spec: (usize, f64, f64)) -> Self {
        Self::new(spec.0, spec.1, spec.2)
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Lower edge of bin `i`
    pub fn low_edge(&self, i: usize) -> f64 {
        self.min + i as f64 * self.width()
    }

    pub fn center(&self, i: usize) -> f64 {
        self.low_edge(i) + 0.5 * self.width()
    }

    /// Locate a value; NaN lands in the overflow
    pub fn locate(&self, value: f64) -> AxisBin {
        if value < self.min {
            return AxisBin::Underflow;
        }
        if !(value < self.max) {
            return AxisBin::Overflow;
        }
        let bin = ((value - self.min) / self.width()) as usize;
        // Guard the upper edge against rounding
        AxisBin::Bin(bin.min(self.bins - 1))
    }
}

/// One-dimensional counting histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    pub axis: Axis,
    pub counts: Vec<u64>,
    /// Every fill, including under- and overflow
    pub entries: u64,
    pub underflow: u64,
    pub overflow: u64,
    sum: f64,
    sum_sq: f64,
}

impl Histogram1D {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            counts: vec![0; axis.bins],
            entries: 0,
            underflow: 0,
            overflow: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        match self.axis.locate(value) {
            AxisBin::Underflow => self.underflow += 1,
            AxisBin::Overflow => self.overflow += 1,
            AxisBin::Bin(i) => {
                self.counts[i] += 1;
                self.sum += value;
                self.sum_sq += value * value;
            }
        }
    }

    /// Count in bin `i`, zero outside the axis
    pub fn content(&self, i: usize) -> u64 {
        self.counts.get(i).copied().unwrap_or(0)
    }

    /// In-range count
    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of in-range fills
    pub fn mean(&self) -> f64 {
        let n = self.integral();
        if n > 0 {
            self.sum / n as f64
        } else {
            0.0
        }
    }

    /// Standard deviation of in-range fills
    pub fn rms(&self) -> f64 {
        let n = self.integral();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / n as f64 - mean * mean).max(0.0).sqrt()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Two-dimensional counting histogram, counts stored row-major in x
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub counts: Vec<u64>,
    pub entries: u64,
    /// Fills outside the grid in either coordinate
    pub outside: u64,
}

impl Histogram2D {
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0; x_axis.bins * y_axis.bins],
            entries: 0,
            outside: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (self.x_axis.locate(x), self.y_axis.locate(y)) {
            (AxisBin::Bin(ix), AxisBin::Bin(iy)) => self.counts[ix * self.y_axis.bins + iy] += 1,
            _ => self.outside += 1,
        }
    }

    pub fn content(&self, ix: usize, iy: usize) -> u64 {
        if ix >= self.x_axis.bins || iy >= self.y_axis.bins {
            return 0;
        }
        self.counts[ix * self.y_axis.bins + iy]
    }

    pub fn integral(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum over y for each x bin
    pub fn projection_x(&self) -> Vec<u64> {
        self.counts
            .chunks(self.y_axis.bins.max(1))
            .map(|row| row.iter().sum())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_locate() {
        let axis = Axis::new(10, 0.0, 10.0);
        assert_eq!(axis.locate(-0.1), AxisBin::Underflow);
        assert_eq!(axis.locate(0.0), AxisBin::Bin(0));
        assert_eq!(axis.locate(9.999), AxisBin::Bin(9));
        assert_eq!(axis.locate(10.0), AxisBin::Overflow);
        assert_eq!(axis.locate(f64::NAN), AxisBin::Overflow);
        assert!((axis.center(3) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_fill_1d() {
        let mut h = Histogram1D::new(Axis::new(4, -2.0, 2.0));
        h.fill(-1.5);
        h.fill(0.5);
        h.fill(0.7);
        h.fill(5.0);
        h.fill(-3.0);

        assert_eq!(h.entries, 5);
        assert_eq!(h.integral(), 3);
        assert_eq!(h.content(0), 1);
        assert_eq!(h.content(2), 2);
        assert_eq!(h.content(17), 0);
        assert_eq!(h.underflow, 1);
        assert_eq!(h.overflow, 1);
        assert!((h.mean() - (-1.5 + 0.5 + 0.7) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_2d() {
        let mut h = Histogram2D::new(Axis::new(10, 0.0, 10.0), Axis::new(4, 0.0, 4.0));
        h.fill(2.5, 1.5);
        h.fill(2.5, 3.5);
        h.fill(11.0, 1.0);

        assert_eq!(h.entries, 3);
        assert_eq!(h.outside, 1);
        assert_eq!(h.content(2, 1), 1);
        assert_eq!(h.content(2, 3), 1);
        assert_eq!(h.integral(), 2);
        assert_eq!(h.projection_x()[2], 2);
    }

    #[test]
    fn test_rms() {
        let mut h = Histogram1D::new(Axis::new(100, -10.0, 10.0));
        for v in [-1.0, 1.0, -1.0, 1.0] {
            h.fill(v);
        }
        assert!(h.mean().abs() < 1e-12);
        assert!((h.rms() - 1.0).abs() < 1e-12);
    }
}
