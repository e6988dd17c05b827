//! Fragment-by-cycle intensity matrices and the row operations used to
//! pick the fragments worth integrating.

use crate::errors::DataProcessingError;

/// Thresholds applied by [`FragmentTraceMatrix::quality_filter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityThresholds {
    pub min_total_intensity: f32,
    pub min_max_to_min_ratio: f32,
}

impl QualityThresholds {
    pub const DEFAULT: Self = Self {
        min_total_intensity: 200.0,
        min_max_to_min_ratio: 1.5,
    };
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Smallest non-zero value of a row, `None` if every entry is zero.
pub fn nonzero_min(row: &[f32]) -> Option<f32> {
    row.iter()
        .copied()
        .filter(|&x| x != 0.0)
        .fold(None, |acc, x| match acc {
            Some(m) if m <= x => Some(m),
            _ => Some(x),
        })
}

/// Row-major matrix, one row per fragment and one column per cycle.
///
/// Every row carries a key so rows can be traced back after filtering
/// and reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentTraceMatrix<K> {
    keys: Vec<K>,
    values: Vec<f32>,
    ncols: usize,
}

impl<K: Clone> FragmentTraceMatrix<K> {
    pub fn try_new(rows: Vec<(K, Vec<f32>)>) -> Result<Self, DataProcessingError> {
        let ncols = rows.first().map(|(_, r)| r.len()).unwrap_or(0);
        let mut keys = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len() * ncols);
        for (key, row) in rows {
            if row.len() != ncols {
                return Err(DataProcessingError::ExpectedSlicesSameLength {
                    expected: ncols,
                    other: row.len(),
                    context: "FragmentTraceMatrix rows".to_string(),
                });
            }
            keys.push(key);
            values.extend(row);
        }
        Ok(Self {
            keys,
            values,
            ncols,
        })
    }

    fn from_selected(&self, selected: impl IntoIterator<Item = usize>) -> Self {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for i in selected {
            keys.push(self.keys[i].clone());
            values.extend_from_slice(self.row(i));
        }
        Self {
            keys,
            values,
            ncols: self.ncols,
        }
    }

    pub fn nrows(&self) -> usize {
        self.keys.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn row(&self, idx: usize) -> &[f32] {
        &self.values[idx * self.ncols..(idx + 1) * self.ncols]
    }

    pub fn rows(&self) -> impl Iterator<Item = (&K, &[f32])> {
        // chunks(0) panics
        let ncols = self.ncols.max(1);
        self.keys
            .iter()
            .zip(self.values.chunks(ncols).chain(std::iter::repeat(&[][..])))
    }

    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.nrows()).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Sum of a single column across all rows.
    pub fn column_sum(&self, col: usize) -> f32 {
        (0..self.nrows()).map(|i| self.row(i)[col]).sum()
    }

    /// Keeps rows with enough total signal and a real peak shape.
    ///
    /// A row passes when its total intensity is at least
    /// `min_total_intensity` and `max / nonzero_min` is at least
    /// `min_max_to_min_ratio`. Rows with no non-zero entry always fail.
    pub fn quality_filter(&self, thresholds: QualityThresholds) -> Self {
        let keep = (0..self.nrows()).filter(|&i| {
            let row = self.row(i);
            let total: f32 = row.iter().sum();
            if total < thresholds.min_total_intensity {
                return false;
            }
            let max = row.iter().copied().fold(f32::MIN, f32::max);
            match nonzero_min(row) {
                Some(min) => max / min >= thresholds.min_max_to_min_ratio,
                None => false,
            }
        });
        self.from_selected(keep.collect::<Vec<_>>())
    }

    /// Centered weighted moving average along every row.
    ///
    /// Interior points use weights `[0.25, 0.5, 0.25]`, the edges
    /// `2/3` of themselves and `1/3` of their only neighbor.
    pub fn smooth(&self) -> Self {
        if self.ncols <= 1 {
            return self.clone();
        }
        let n = self.ncols;
        let mut values = Vec::with_capacity(self.values.len());
        for i in 0..self.nrows() {
            let row = self.row(i);
            values.push(2.0 / 3.0 * row[0] + 1.0 / 3.0 * row[1]);
            for c in 1..n - 1 {
                values.push(0.5 * row[c] + 0.25 * (row[c - 1] + row[c + 1]));
            }
            values.push(2.0 / 3.0 * row[n - 1] + 1.0 / 3.0 * row[n - 2]);
        }
        Self {
            keys: self.keys.clone(),
            values,
            ncols: n,
        }
    }

    /// Keeps the `n` rows with the largest total intensity, largest first.
    ///
    /// Ties keep their original order. A matrix with at most `n` rows is
    /// returned unchanged.
    pub fn top_n(&self, n: usize) -> Self {
        if self.nrows() <= n {
            return self.clone();
        }
        let sums = self.row_sums();
        let mut order: Vec<usize> = (0..self.nrows()).collect();
        order.sort_by(|&a, &b| sums[b].total_cmp(&sums[a]));
        order.truncate(n);
        self.from_selected(order)
    }
}
