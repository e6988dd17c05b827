use thiserror::Error;

/// TupleRange represents a range defined by a tuple of two elements (T, T).
///
/// It represents a range as closed-closed [a, b], meaning both endpoints are inclusive.
/// Importantly, it ensures that the first element is always less than or equal to the second.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TupleRange<T: Copy + PartialOrd>(T, T);

#[derive(Error, Debug)]
pub enum TupleRangeError<T: Copy + PartialOrd + std::fmt::Debug> {
    #[error(
        "Expected the first element to be less than or equal to the second, got ({0:?}, {1:?})"
    )]
    ExpectedOrderedRange(T, T),
}

impl<T: Copy + PartialOrd + std::fmt::Debug> TupleRange<T> {
    pub fn try_new(left: T, right: T) -> Result<Self, TupleRangeError<T>> {
        // NaN endpoints fail both comparisons, so check the ordering positively
        if left <= right {
            Ok(Self(left, right))
        } else {
            Err(TupleRangeError::ExpectedOrderedRange(left, right))
        }
    }

    pub fn as_tuple(&self) -> (T, T) {
        (self.0, self.1)
    }

    pub fn contains(&self, x: T) -> bool {
        self.0 <= x && x <= self.1
    }

    pub fn start(&self) -> T {
        self.0
    }

    pub fn end(&self) -> T {
        self.1
    }
}

impl<T: Copy + PartialOrd + std::fmt::Debug> TryFrom<(T, T)> for TupleRange<T> {
    type Error = TupleRangeError<T>;

    fn try_from(value: (T, T)) -> Result<Self, Self::Error> {
        Self::try_new(value.0, value.1)
    }
}

/// Index range of the elements of an ascending slice that fall within `range`
/// (both ends inclusive).
///
/// ```
/// use diaquery::utils::{TupleRange, inclusive_range_indices};
///
/// let mzs = [499.99, 500.0, 500.0, 500.02];
/// let range = TupleRange::try_new(499.995, 500.005).unwrap();
/// assert_eq!(inclusive_range_indices(&mzs, range), 1..3);
/// ```
pub fn inclusive_range_indices(sorted: &[f64], range: TupleRange<f64>) -> std::ops::Range<usize> {
    let start_idx = sorted.partition_point(|&x| x < range.start());
    let end_idx = start_idx + sorted[start_idx..].partition_point(|&x| x <= range.end());
    start_idx..end_idx
}
