//! Assembly of cycle-aligned MS1 / MS2 chromatograms from a scan stream.
//!
//! # Usage
//!
//! ```ignore
//! use diaquery::models::chromatogram::ChromatogramBuilder;
//!
//! let builder = ChromatogramBuilder::new(window_table, spectrum_filter);
//! let (chromatograms, stats) = builder.build_from_path("run.mzML")?;
//! println!("Built {} cycles ({})", chromatograms.num_cycles(), stats);
//! ```

use std::fmt::Display;
use std::path::Path;

use super::spectrum::{
    ScanRecord,
    Spectrum,
    SpectrumFilter,
};
use super::windows::{
    IsolationWindow,
    WindowTable,
};
use crate::errors::{
    DataProcessingError,
    DataReadingError,
    DiaqueryError,
};
use crate::readers::RawScanReader;
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

/// Retention times and spectra of a single acquisition channel.
///
/// Boundary artifacts are removed by moving the `skip_front` / `skip_back`
/// bounds, the underlying vectors are never shifted. All public accessors
/// only see the cycles within the bounds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Chromatogram {
    rt_list: Vec<f32>,
    spectra: Vec<Spectrum>,
    skip_front: usize,
    skip_back: usize,
}

impl Chromatogram {
    pub fn try_new(rt_list: Vec<f32>, spectra: Vec<Spectrum>) -> Result<Self, DataProcessingError> {
        if rt_list.len() != spectra.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: rt_list.len(),
                other: spectra.len(),
                context: "Chromatogram::try_new",
            });
        }
        Ok(Self {
            rt_list,
            spectra,
            skip_front: 0,
            skip_back: 0,
        })
    }

    fn push(&mut self, rt: f32, spectrum: Spectrum) {
        self.rt_list.push(rt);
        self.spectra.push(spectrum);
    }

    fn bounds(&self) -> std::ops::Range<usize> {
        let end = self.rt_list.len().saturating_sub(self.skip_back);
        self.skip_front.min(end)..end
    }

    fn trim_front(&mut self) {
        if self.num_cycles() > 0 {
            self.skip_front += 1;
        }
    }

    fn trim_back(&mut self) {
        if self.num_cycles() > 0 {
            self.skip_back += 1;
        }
    }

    pub fn rt_list(&self) -> &[f32] {
        &self.rt_list[self.bounds()]
    }

    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra[self.bounds()]
    }

    pub fn num_cycles(&self) -> usize {
        self.bounds().len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_cycles() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ms2Chromatogram {
    pub window: IsolationWindow,
    pub chromatogram: Chromatogram,
}

/// The MS1 chromatogram plus one MS2 chromatogram per isolation window.
///
/// Immutable once built, cycle `c` refers to the same acquisition cycle in
/// every chromatogram.
#[derive(Debug, Clone)]
pub struct DiaChromatograms {
    ms1: Chromatogram,
    ms2: Vec<Ms2Chromatogram>,
    windows: WindowTable,
}

impl DiaChromatograms {
    pub fn ms1(&self) -> &Chromatogram {
        &self.ms1
    }

    pub fn ms2(&self) -> &[Ms2Chromatogram] {
        &self.ms2
    }

    pub fn windows(&self) -> &WindowTable {
        &self.windows
    }

    pub fn num_cycles(&self) -> usize {
        self.ms1.num_cycles()
    }

    /// MS2 chromatogram of the window that isolates `precursor_mz`.
    pub fn ms2_for_precursor(
        &self,
        precursor_mz: f64,
    ) -> Result<&Ms2Chromatogram, DataProcessingError> {
        let idx = self.windows.window_of(precursor_mz)?;
        Ok(&self.ms2[idx])
    }

    pub fn is_aligned(&self) -> bool {
        let n = self.ms1.num_cycles();
        self.ms2.iter().all(|c| c.chromatogram.num_cycles() == n)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub ms1_scans: usize,
    pub ms2_scans: usize,
    pub skipped_scans: usize,
    pub leading_trims: usize,
    pub trailing_trim: bool,
    pub num_cycles: usize,
}

impl Display for BuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BuildStats {{ ms1_scans: {}, ms2_scans: {}, skipped_scans: {}, leading_trims: {}, trailing_trim: {}, num_cycles: {} }}",
            self.ms1_scans,
            self.ms2_scans,
            self.skipped_scans,
            self.leading_trims,
            self.trailing_trim,
            self.num_cycles,
        )
    }
}

#[derive(Debug, Clone)]
pub struct ChromatogramBuilder {
    windows: WindowTable,
    filter: SpectrumFilter,
}

impl ChromatogramBuilder {
    pub fn new(windows: WindowTable, filter: SpectrumFilter) -> Self {
        Self { windows, filter }
    }

    pub fn build_from_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(DiaChromatograms, BuildStats), DiaqueryError> {
        let reader = RawScanReader::open(path.as_ref())?;
        let format = reader.format();
        let st = std::time::Instant::now();
        let out = self.build(reader)?;
        info!(
            "Built chromatograms from {} data in {:?}: {}",
            format,
            st.elapsed(),
            out.1
        );
        Ok(out)
    }

    /// Consumes a scan stream in arrival order.
    ///
    /// MS2 scans that arrive before the first MS1 scan belong to a partial
    /// leading cycle. They get a synthetic retention time of 0 and are later
    /// dropped from every window where they make an extra cycle. An
    /// incomplete last cycle is trimmed from every chromatogram that has it.
    pub fn build<I, E>(&self, scans: I) -> Result<(DiaChromatograms, BuildStats), DiaqueryError>
    where
        I: IntoIterator<Item = Result<ScanRecord, E>>,
        E: Into<DiaqueryError>,
    {
        let mut stats = BuildStats::default();
        let mut ms1 = Chromatogram::default();
        let mut ms2 = vec![Chromatogram::default(); self.windows.len()];
        // MS2 scans seen before the first MS1 scan, per window
        let mut leading = vec![0usize; self.windows.len()];

        for (idx, scan) in scans.into_iter().enumerate() {
            let scan = scan.map_err(Into::<DiaqueryError>::into)?;
            match scan.ms_level {
                1 => {
                    let spectrum = self.filter.filter_scan(&scan)?;
                    ms1.push(scan.retention_time, spectrum);
                    stats.ms1_scans += 1;
                }
                2 => {
                    let before_ms1 = ms1.rt_list.is_empty();
                    let rt = if idx == 0 || before_ms1 {
                        0.0
                    } else {
                        scan.retention_time
                    };
                    let precursor_mz =
                        scan.precursor_mz
                            .ok_or_else(|| DataReadingError::MissingField {
                                field: "precursor m/z",
                                context: format!("MS2 scan #{}", idx),
                            })?;
                    let win_id = self.windows.window_of(precursor_mz)?;
                    let spectrum = self.filter.filter_scan(&scan)?;
                    ms2[win_id].push(rt, spectrum);
                    if before_ms1 {
                        leading[win_id] += 1;
                    }
                    stats.ms2_scans += 1;
                }
                other => {
                    debug!("Skipping scan #{} with ms level {}", idx, other);
                    stats.skipped_scans += 1;
                }
            }
        }

        // Data starting with MS2: synthetic leading entries are extra cycles.
        let n_ms1 = ms1.num_cycles();
        for (chrom, &n_leading) in ms2.iter_mut().zip(leading.iter()) {
            let extra = chrom.num_cycles().saturating_sub(n_ms1).min(n_leading);
            if extra > 0 && chrom.rt_list().first() == Some(&0.0) {
                for _ in 0..extra {
                    chrom.trim_front();
                }
                stats.leading_trims += 1;
            }
        }

        // Incomplete last cycle, a single trim pass.
        if let Some(shorter) = ms2
            .iter()
            .map(|c| c.num_cycles())
            .find(|&n| n + 1 == n_ms1)
        {
            for chrom in ms2.iter_mut() {
                if chrom.num_cycles() > shorter {
                    chrom.trim_back();
                }
            }
            ms1.trim_back();
            stats.trailing_trim = true;
        }

        stats.num_cycles = ms1.num_cycles();
        let ms2: Vec<Ms2Chromatogram> = self
            .windows
            .windows()
            .iter()
            .zip(ms2)
            .map(|(window, chromatogram)| Ms2Chromatogram {
                window: *window,
                chromatogram,
            })
            .collect();

        let out = DiaChromatograms {
            ms1,
            ms2,
            windows: self.windows.clone(),
        };

        if !out.is_aligned() {
            let counts: Vec<usize> = out
                .ms2
                .iter()
                .map(|c| c.chromatogram.num_cycles())
                .collect();
            warn!(
                "MS2 chromatograms are not aligned with MS1 ({} cycles): {:?}",
                out.num_cycles(),
                counts
            );
        }

        Ok((out, stats))
    }
}
