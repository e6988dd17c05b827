use std::ops::Range;

use crate::errors::DataProcessingError;

/// Window of `n_cycles` cycle indices centered on the cycle closest to
/// `target_rt`.
///
/// The window is shifted to stay within `[0, rt_list.len())`, and covers the
/// whole list if it has fewer than `n_cycles` cycles.
///
/// ```
/// use diaquant::scoring::peak_locator::find_rt_window;
///
/// let rts = [0.0, 10.0, 20.0, 30.0, 40.0];
/// assert_eq!(find_rt_window(21.0, &rts, 3).unwrap(), 1..4);
/// assert_eq!(find_rt_window(1.0, &rts, 3).unwrap(), 0..3);
/// ```
pub fn find_rt_window(
    target_rt: f32,
    rt_list: &[f32],
    n_cycles: usize,
) -> Result<Range<usize>, DataProcessingError> {
    if rt_list.is_empty() {
        return Err(DataProcessingError::ExpectedNonEmptyData {
            context: Some("retention times for find_rt_window".to_string()),
        });
    }
    let len = rt_list.len();
    if len < n_cycles {
        return Ok(0..len);
    }

    // First index with the smallest distance
    let mut middle = 0;
    let mut best = f32::INFINITY;
    for (i, rt) in rt_list.iter().enumerate() {
        let dist = (rt - target_rt).abs();
        if dist < best {
            best = dist;
            middle = i;
        }
    }

    let expand = n_cycles / 2;
    let end = if n_cycles % 2 == 0 {
        middle + expand
    } else {
        middle + expand + 1
    };
    if middle < expand {
        Ok(0..n_cycles)
    } else if end > len {
        Ok(len - n_cycles..len)
    } else {
        Ok(middle - expand..end)
    }
}

/// Candidate apex positions within a window of `n_cycles`, best guess first.
///
/// Starts at the center `n_cycles / 2` and steps outwards one cycle at a
/// time, left before right. With an even width the first left step has no
/// right counterpart, so the right side lags one step behind. Positions
/// outside the window are skipped and at most `peak_index_range` positions
/// are returned.
///
/// ```
/// use diaquant::scoring::peak_locator::peak_apex_offsets;
///
/// assert_eq!(peak_apex_offsets(7, 5), vec![3, 2, 4, 1, 5]);
/// assert_eq!(peak_apex_offsets(6, 5), vec![3, 2, 1, 4, 0]);
/// ```
pub fn peak_apex_offsets(n_cycles: usize, peak_index_range: usize) -> Vec<usize> {
    if n_cycles == 0 || peak_index_range == 0 {
        return Vec::new();
    }
    let center = (n_cycles / 2) as isize;
    let odd = n_cycles % 2 != 0;

    let mut candidates: Vec<isize> = vec![center];
    for i in 0..n_cycles as isize {
        candidates.push(center - (i + 1));
        if odd {
            candidates.push(center + (i + 1));
        } else if i > 0 {
            candidates.push(center + i);
        }
    }

    candidates
        .into_iter()
        .filter(|&c| c >= 0 && (c as usize) < n_cycles)
        .map(|c| c as usize)
        .take(peak_index_range)
        .collect()
}
