use std::ops::Range;

use crate::errors::DataProcessingError;

/// Row ranges of contiguous runs of identical precursor ids.
///
/// ```
/// use diaquant::utils::partition::precursor_groups;
///
/// let groups = precursor_groups(&["a", "a", "b", "a"]);
/// assert_eq!(groups, vec![0..2, 2..3, 3..4]);
/// ```
pub fn precursor_groups<T: PartialEq>(ids: &[T]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=ids.len() {
        if i == ids.len() || ids[i] != ids[start] {
            if start < i {
                out.push(start..i);
            }
            start = i;
        }
    }
    out
}

/// Splits `n_groups` into `n_threads` contiguous chunks of near equal size.
///
/// Every chunk gets `n_groups / n_threads` groups and the first
/// `n_groups % n_threads` chunks get one more.
///
/// ```
/// use diaquant::utils::partition::partition_groups;
///
/// let chunks = partition_groups(10, 3).unwrap();
/// assert_eq!(chunks, vec![0..4, 4..7, 7..10]);
/// ```
pub fn partition_groups(
    n_groups: usize,
    n_threads: usize,
) -> Result<Vec<Range<usize>>, DataProcessingError> {
    if n_threads == 0 {
        return Err(DataProcessingError::InvalidParameter {
            name: "n_threads",
            msg: "must be at least 1".to_string(),
        });
    }
    let base = n_groups / n_threads;
    let extra = n_groups % n_threads;
    let mut start = 0;
    let out = (0..n_threads)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let chunk = start..start + size;
            start += size;
            chunk
        })
        .collect();
    Ok(out)
}
