//! Pairwise distance kernel
//!
//! The divergence statistic only ever needs sums of pairwise distances over
//! rectangular blocks of the `(i, k)` plane. [`PrefixTable`] stores the
//! two-dimensional prefix sums of the upper triangle of the distance matrix so
//! any such block sum costs four lookups.

/// Distance between two observations, `|a - b|^power`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceKernel {
    power: f64,
}

impl DistanceKernel {
    /// Create a kernel with the given exponent
    pub fn new(power: f64) -> Self {
        Self { power }
    }

    /// Exponent applied to the absolute difference
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Distance between `a` and `b`
    #[inline]
    pub fn distance(&self, a: f64, b: f64) -> f64 {
        let d = (a - b).abs();
        if self.power == 1.0 {
            d
        } else {
            d.powf(self.power)
        }
    }
}

impl Default for DistanceKernel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Prefix sums of pairwise distances
///
/// `G[x][y] = Σ d(i, k)` over `i < x`, `k < y`, `i < k`, stored row-major
/// with dimension `n + 1`.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    dim: usize,
    sums: Vec<f64>,
}

impl PrefixTable {
    /// Build the table for `series` in O(n²)
    pub fn build(series: &[f64], kernel: &DistanceKernel) -> Self {
        let n = series.len();
        let dim = n + 1;
        let mut sums = vec![0.0; dim * dim];

        for x in 1..dim {
            let i = x - 1;
            let mut row = 0.0;
            for y in 1..dim {
                let k = y - 1;
                if i < k {
                    row += kernel.distance(series[i], series[k]);
                }
                sums[x * dim + y] = sums[(x - 1) * dim + y] + row;
            }
        }

        Self { dim, sums }
    }

    /// Number of observations covered by the table
    pub fn len(&self) -> usize {
        self.dim - 1
    }

    /// Check if the table covers no observations
    pub fn is_empty(&self) -> bool {
        self.dim == 1
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f64 {
        self.sums[x * self.dim + y]
    }

    /// Distances between `[s, t)` and `[t, k)`
    #[inline]
    pub fn cross(&self, s: usize, t: usize, k: usize) -> f64 {
        self.at(t, k) - self.at(s, k) - self.at(t, t) + self.at(s, t)
    }

    /// Distances between pairs inside `[s, t)`
    #[inline]
    pub fn within(&self, s: usize, t: usize) -> f64 {
        self.at(t, t) - self.at(s, t)
    }

    /// Divergence of the split of `[s, k)` at `t`
    ///
    /// A segment with a single element has no internal pairs and contributes
    /// zero. Callers guarantee `s < t < k <= len`.
    pub fn q(&self, s: usize, t: usize, k: usize) -> f64 {
        let cross = self.cross(s, t, k);
        let within_left = self.within(s, t);
        let within_right = self.at(k, k) - self.at(t, k);
        let n = k - s;

        let a = 2.0 / n as f64 * cross;
        let b = if t - s - 1 > 0 {
            2.0 * (k - t) as f64 / (n * (t - s - 1)) as f64 * within_left
        } else {
            0.0
        };
        let c = if k - t - 1 > 0 {
            2.0 * (t - s) as f64 / (n * (k - t - 1)) as f64 * within_right
        } else {
            0.0
        };
        a - b - c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn naive_within(xs: &[f64], kernel: &DistanceKernel) -> f64 {
        let mut total = 0.0;
        for i in 0..xs.len() {
            for k in i + 1..xs.len() {
                total += kernel.distance(xs[i], xs[k]);
            }
        }
        total
    }

    #[test]
    fn test_block_sums_match_naive() {
        let xs = [1.0, 4.0, 2.5, 7.0, 3.0, 3.5];
        let kernel = DistanceKernel::default();
        let table = PrefixTable::build(&xs, &kernel);
        assert_eq!(table.len(), 6);

        for s in 0..xs.len() {
            for t in s + 1..xs.len() {
                assert_relative_eq!(
                    table.within(s, t),
                    naive_within(&xs[s..t], &kernel),
                    epsilon = 1e-12
                );
                for k in t + 1..=xs.len() {
                    let mut cross = 0.0;
                    for &a in &xs[s..t] {
                        for &b in &xs[t..k] {
                            cross += kernel.distance(a, b);
                        }
                    }
                    assert_relative_eq!(table.cross(s, t, k), cross, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_single_element_segments_contribute_zero() {
        let xs = [0.0, 10.0];
        let table = PrefixTable::build(&xs, &DistanceKernel::default());
        // Only the cross term survives: 2 / 2 * |0 - 10|
        assert_relative_eq!(table.q(0, 1, 2), 10.0);
    }

    #[test]
    fn test_power_kernel() {
        let kernel = DistanceKernel::new(0.5);
        assert_relative_eq!(kernel.distance(1.0, 5.0), 2.0);
        assert_eq!(DistanceKernel::default().distance(-1.0, 2.0), 3.0);
    }

    #[test]
    fn test_empty_table() {
        let table = PrefixTable::build(&[], &DistanceKernel::default());
        assert!(table.is_empty());
    }
}
