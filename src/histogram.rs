/// Bin edges of one histogram axis.
///
/// Lookups never fail: values below the first edge land in the first bin and values at or above
/// the last edge land in the last bin. `NaN` is treated as underflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    edges: Vec<f64>,
    logarithmic: bool,
}

impl Binning {
    pub fn linear(n_bins: usize, min: f64, max: f64) -> Self {
        //! Equal-width bins between `min` and `max`. At least one bin is always created.
        let n_bins = n_bins.max(1);
        let width = (max - min) / n_bins as f64;
        let edges = (0..=n_bins).map(|i| min + width * i as f64).collect();
        Self {
            edges,
            logarithmic: false,
        }
    }

    pub fn logarithmic(n_bins: usize, min: f64, max: f64) -> Self {
        //! Bins of equal width in $`\log_{10}`$ between `min` and `max`.
        //!
        //! Falls back to [`Binning::linear`] when `min` is not positive.
        if min <= 0.0 {
            return Self::linear(n_bins, min, max);
        }
        let n_bins = n_bins.max(1);
        let (lmin, lmax) = (min.log10(), max.log10());
        let step = (lmax - lmin) / n_bins as f64;
        let edges = (0..=n_bins)
            .map(|i| 10f64.powf(lmin + step * i as f64))
            .collect();
        Self {
            edges,
            logarithmic: true,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn is_logarithmic(&self) -> bool {
        self.logarithmic
    }

    pub fn bin_index(&self, value: f64) -> usize {
        //! Index of the bin containing `value`, clipped to `0..n_bins()`.
        if value.is_nan() || value < self.min() {
            return 0;
        }
        // first edge strictly above value, minus one
        let upper = self.edges.partition_point(|edge| *edge <= value);
        upper.saturating_sub(1).min(self.n_bins() - 1)
    }

    pub fn center(&self, bin: usize) -> f64 {
        let bin = bin.min(self.n_bins() - 1);
        let (lo, hi) = (self.edges[bin], self.edges[bin + 1]);
        if self.logarithmic {
            (lo * hi).sqrt()
        } else {
            0.5 * (lo + hi)
        }
    }
}

/// A weighted one-dimensional histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    binning: Binning,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram1D {
    pub fn new(binning: Binning) -> Self {
        let contents = vec![0.0; binning.n_bins()];
        Self {
            binning,
            contents,
            entries: 0,
        }
    }

    pub fn fill(&mut self, value: f64) -> usize {
        self.fill_weighted(value, 1.0)
    }

    pub fn fill_weighted(&mut self, value: f64, weight: f64) -> usize {
        //! Add `weight` to the bin holding `value` and return that bin's index.
        let bin = self.binning.bin_index(value);
        self.contents[bin] += weight;
        self.entries += 1;
        bin
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }
}

/// A weighted two-dimensional histogram, clipped on both axes like [`Histogram1D`].
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    x: Binning,
    y: Binning,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram2D {
    pub fn new(x: Binning, y: Binning) -> Self {
        let contents = vec![0.0; x.n_bins() * y.n_bins()];
        Self {
            x,
            y,
            contents,
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) -> (usize, usize) {
        let bins = (self.x.bin_index(x), self.y.bin_index(y));
        self.contents[bins.0 * self.y.n_bins() + bins.1] += 1.0;
        self.entries += 1;
        bins
    }

    pub fn x_binning(&self) -> &Binning {
        &self.x
    }

    pub fn y_binning(&self) -> &Binning {
        &self.y
    }

    pub fn content(&self, x_bin: usize, y_bin: usize) -> f64 {
        if y_bin >= self.y.n_bins() {
            return 0.0;
        }
        self.contents
            .get(x_bin * self.y.n_bins() + y_bin)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }
}

/// Running mean of a quantity per bin of another, the way a `TProfile` accumulates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile1D {
    binning: Binning,
    sum_w: Vec<f64>,
    sum_wy: Vec<f64>,
    sum_wy2: Vec<f64>,
    entries: u64,
}

impl Profile1D {
    pub fn new(binning: Binning) -> Self {
        let n = binning.n_bins();
        Self {
            binning,
            sum_w: vec![0.0; n],
            sum_wy: vec![0.0; n],
            sum_wy2: vec![0.0; n],
            entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) -> usize {
        self.fill_weighted(x, y, 1.0)
    }

    pub fn fill_weighted(&mut self, x: f64, y: f64, weight: f64) -> usize {
        let bin = self.binning.bin_index(x);
        self.sum_w[bin] += weight;
        self.sum_wy[bin] += weight * y;
        self.sum_wy2[bin] += weight * y * y;
        self.entries += 1;
        bin
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn mean(&self, bin: usize) -> Option<f64> {
        //! Weighted mean of the bin, or [`None`] while it holds no weight.
        let w = *self.sum_w.get(bin)?;
        (w != 0.0).then(|| self.sum_wy[bin] / w)
    }

    pub fn error_of_mean(&self, bin: usize) -> Option<f64> {
        //! Standard error of [`Profile1D::mean`], treating weights as frequencies.
        let mean = self.mean(bin)?;
        let w = self.sum_w[bin];
        let variance = (self.sum_wy2[bin] / w - mean * mean).max(0.0);
        Some((variance / w).sqrt())
    }

    pub fn weight(&self, bin: usize) -> f64 {
        self.sum_w.get(bin).copied().unwrap_or(0.0)
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}
