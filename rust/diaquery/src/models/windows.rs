use crate::errors::{
    DataProcessingError,
    DataReadingError,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::io::{
    BufRead,
    BufReader,
};
use std::path::Path;
use tracing::info;

/// A precursor isolation window, `id` is the row index in the window file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsolationWindow {
    pub id: usize,
    pub mz_min: f64,
    pub mz_max: f64,
}

impl IsolationWindow {
    pub fn contains(&self, mz: f64) -> bool {
        self.mz_min <= mz && mz < self.mz_max
    }
}

/// Ordered table of isolation windows.
///
/// Windows are kept in file order, which has to be ascending in `mz_min`
/// for the binary search in [`WindowTable::window_of`] to make sense.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    windows: Vec<IsolationWindow>,
    lower_bounds: Vec<f64>,
}

impl WindowTable {
    /// Builds a table from `(mz_min, mz_max)` pairs in acquisition order.
    ///
    /// Errors report the 1-based position of the offending pair as the line.
    pub fn try_new(bounds: &[(f64, f64)]) -> Result<Self, DataReadingError> {
        let rows: Vec<(usize, f64, f64)> = bounds
            .iter()
            .enumerate()
            .map(|(i, &(mz_min, mz_max))| (i + 1, mz_min, mz_max))
            .collect();
        Self::from_rows(&rows)
    }

    /// `rows` are `(line, mz_min, mz_max)`, the line is only used in errors.
    fn from_rows(rows: &[(usize, f64, f64)]) -> Result<Self, DataReadingError> {
        if rows.is_empty() {
            return Err(DataReadingError::WindowFile {
                line: 0,
                msg: "No isolation windows defined".to_string(),
            });
        }

        let mut windows = Vec::with_capacity(rows.len());
        for (id, &(line, mz_min, mz_max)) in rows.iter().enumerate() {
            if !(mz_min < mz_max) {
                return Err(DataReadingError::WindowFile {
                    line,
                    msg: format!("window lower bound {} is not below upper bound {}", mz_min, mz_max),
                });
            }
            if let Some(prev) = windows.last().map(|w: &IsolationWindow| w.mz_min) {
                if mz_min < prev {
                    return Err(DataReadingError::WindowFile {
                        line,
                        msg: format!(
                            "windows must be sorted by lower bound ({} comes after {})",
                            mz_min, prev
                        ),
                    });
                }
            }
            windows.push(IsolationWindow { id, mz_min, mz_max });
        }

        let lower_bounds = windows.iter().map(|w| w.mz_min).collect();
        Ok(Self {
            windows,
            lower_bounds,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataReadingError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| DataReadingError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        let table = Self::from_reader(BufReader::new(file))?;
        info!(
            "Loaded {} isolation windows from {} (m/z {} - {})",
            table.len(),
            path.display(),
            table.windows[0].mz_min,
            table.windows[table.len() - 1].mz_max,
        );
        Ok(table)
    }

    /// Parses a whitespace delimited table with one `mz_min mz_max` row per window.
    ///
    /// Extra columns are ignored, blank lines and `#` comments are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DataReadingError> {
        let mut rows = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = i + 1;
            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let values = content
                .split_whitespace()
                .take(2)
                .map(|tok| {
                    tok.parse::<f64>().map_err(|_| DataReadingError::WindowFile {
                        line: line_num,
                        msg: format!("'{}' is not a number", tok),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            if values.len() < 2 {
                return Err(DataReadingError::WindowFile {
                    line: line_num,
                    msg: "expected two columns (mz_min mz_max)".to_string(),
                });
            }
            rows.push((line_num, values[0], values[1]));
        }
        Self::from_rows(&rows)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[IsolationWindow] {
        &self.windows
    }

    pub fn get(&self, id: usize) -> Option<&IsolationWindow> {
        self.windows.get(id)
    }

    /// Index of the window a precursor m/z belongs to.
    ///
    /// This is the insertion point of `precursor_mz` to the right of any equal
    /// lower bound, minus one. Anything below the first window or at/after the
    /// end of the last one is out of range.
    ///
    /// ```
    /// use diaquery::models::windows::WindowTable;
    ///
    /// let table = WindowTable::try_new(&[(400.0, 410.0), (410.0, 420.0)]).unwrap();
    /// assert_eq!(table.window_of(405.0).unwrap(), 0);
    /// assert_eq!(table.window_of(410.0).unwrap(), 1);
    /// assert!(table.window_of(399.0).is_err());
    /// ```
    pub fn window_of(&self, precursor_mz: f64) -> Result<usize, DataProcessingError> {
        let insertion = self.lower_bounds.partition_point(|&lb| lb <= precursor_mz);
        if insertion == 0 {
            return Err(DataProcessingError::OutOfRange { precursor_mz });
        }
        let idx = insertion - 1;
        if idx == self.windows.len() - 1 && precursor_mz >= self.windows[idx].mz_max {
            return Err(DataProcessingError::OutOfRange { precursor_mz });
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> WindowTable {
        WindowTable::try_new(&[(400.0, 425.0), (425.0, 450.0), (450.0, 475.0)]).unwrap()
    }

    #[test]
    fn test_window_of_boundaries() {
        let table = sample_table();
        assert_eq!(table.window_of(400.0).unwrap(), 0);
        assert_eq!(table.window_of(424.999).unwrap(), 0);
        assert_eq!(table.window_of(425.0).unwrap(), 1);
        assert_eq!(table.window_of(474.0).unwrap(), 2);
    }

    #[test]
    fn test_window_of_out_of_range() {
        let table = sample_table();
        assert_eq!(
            table.window_of(399.9),
            Err(DataProcessingError::OutOfRange { precursor_mz: 399.9 })
        );
        assert!(table.window_of(475.0).is_err());
    }

    #[test]
    fn test_window_of_is_monotonic() {
        let table = sample_table();
        let mut last = 0;
        let mut mz = 400.0;
        while mz < 475.0 {
            let curr = table.window_of(mz).unwrap();
            assert!(curr >= last, "window_of({}) went backwards", mz);
            last = curr;
            mz += 0.37;
        }
    }

    #[test]
    fn test_from_reader_skips_comments() {
        let content = "# lower upper\n400 425\n\n425\t450 extra\n";
        let table = WindowTable::from_reader(content.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(1),
            Some(&IsolationWindow {
                id: 1,
                mz_min: 425.0,
                mz_max: 450.0
            })
        );
    }

    #[test]
    fn test_from_reader_errors() {
        let err = WindowTable::from_reader("400 425\n425\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataReadingError::WindowFile { line: 2, .. }));

        let err = WindowTable::from_reader("400 abc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataReadingError::WindowFile { line: 1, .. }));

        let err = WindowTable::from_reader("450 475\n400 425\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataReadingError::WindowFile { line: 2, .. }));

        assert!(WindowTable::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_validation_errors_point_at_file_lines() {
        let content = "# lower upper\n\n400 425\n# unsorted below\n\n380 390\n";
        let err = WindowTable::from_reader(content.as_bytes()).unwrap_err();
        assert!(
            matches!(err, DataReadingError::WindowFile { line: 6, .. }),
            "got {:?}",
            err
        );

        let content = "# header\n400 425\n425 425\n";
        let err = WindowTable::from_reader(content.as_bytes()).unwrap_err();
        assert!(matches!(err, DataReadingError::WindowFile { line: 3, .. }));
    }

    #[test]
    fn test_try_new_reports_pair_position() {
        let err = WindowTable::try_new(&[(400.0, 410.0), (420.0, 415.0)]).unwrap_err();
        assert!(matches!(err, DataReadingError::WindowFile { line: 2, .. }));
    }
}
