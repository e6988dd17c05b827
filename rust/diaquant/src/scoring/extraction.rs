//! Per-precursor extraction and quantification.
//!
//! For every library precursor the pipeline:
//!
//! 1. Finds the isolation window that fragmented it.
//! 2. Extracts one trace per library fragment (MS2) plus the precursor trace (MS1).
//! 3. Drops low quality fragment traces, smooths them and keeps the most intense ones.
//! 4. Centers a window of `n_cycles` on the library retention time.
//! 5. Picks the apex among a few candidate cycles near the window center.
//! 6. Integrates every kept trace over the window and compares the areas to
//!    the library intensities.
//!
//! Chromatograms are only read, so one [`PrecursorExtractor`] can be shared
//! by all worker threads.

use std::ops::Range;
use std::time::{
    Duration,
    Instant,
};

use diaquery::models::xic::{
    extract_xic,
    extract_xics,
};
use diaquery::{
    DiaChromatograms,
    MzTolerance,
};
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

use super::area::trapezoid_area;
use super::peak_locator::{
    find_rt_window,
    peak_apex_offsets,
};
use crate::data_sources::PrecursorQuery;
use crate::errors::{
    DataProcessingError,
    DiaquantError,
    Result,
};
use crate::models::{
    FragmentTraceMatrix,
    QualityThresholds,
};
use crate::utils::correlation::cosine_similarity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    pub ms1_tolerance: MzTolerance,
    pub ms2_tolerance: MzTolerance,
    /// Width of the integration window, in cycles.
    pub n_cycles: usize,
    /// Maximum number of fragments kept per precursor.
    pub n_frags: usize,
    /// Number of candidate apex cycles.
    pub peak_index_range: usize,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            ms1_tolerance: MzTolerance::Ppm(20.0),
            ms2_tolerance: MzTolerance::Ppm(50.0),
            n_cycles: 7,
            n_frags: 6,
            peak_index_range: 3,
        }
    }
}

impl ExtractionParams {
    pub fn validate(&self) -> std::result::Result<(), DataProcessingError> {
        let positive = [
            ("n_cycles", self.n_cycles),
            ("n_frags", self.n_frags),
            ("peak_index_range", self.peak_index_range),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(DataProcessingError::InvalidParameter {
                    name,
                    msg: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Quantification of a single precursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecursorQuant {
    pub precursor_id: String,
    pub decoy: bool,
    pub window_id: usize,
    pub rt_window_start: f32,
    pub rt_window_end: f32,
    pub apex_rt: Option<f32>,
    pub n_fragments_kept: usize,
    pub ms1_area: f64,
    pub fragment_areas: Vec<f64>,
    pub total_fragment_area: f64,
    pub library_cosine: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ExtractionTimings {
    pub extract: Duration,
    pub locate: Duration,
    pub integrate: Duration,
}

impl std::ops::AddAssign for ExtractionTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.extract += rhs.extract;
        self.locate += rhs.locate;
        self.integrate += rhs.integrate;
    }
}

/// Results of a batch, in query order.
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    pub results: Vec<PrecursorQuant>,
    pub failures: Vec<(String, DiaquantError)>,
    pub timings: ExtractionTimings,
}

impl ExtractionBatch {
    pub fn extend(&mut self, other: ExtractionBatch) {
        self.results.extend(other.results);
        self.failures.extend(other.failures);
        self.timings += other.timings;
    }
}

pub struct PrecursorExtractor<'a> {
    chromatograms: &'a DiaChromatograms,
    params: ExtractionParams,
    thresholds: QualityThresholds,
}

impl<'a> PrecursorExtractor<'a> {
    pub fn try_new(chromatograms: &'a DiaChromatograms, params: ExtractionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            chromatograms,
            params,
            thresholds: QualityThresholds::DEFAULT,
        })
    }

    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    pub fn process_query(
        &self,
        query: &PrecursorQuery,
        timings: &mut ExtractionTimings,
    ) -> Result<PrecursorQuant> {
        let st = Instant::now();
        let window_id = self
            .chromatograms
            .windows()
            .window_of(query.precursor_mz)?;
        let ms2 = &self.chromatograms.ms2()[window_id].chromatogram;
        let ms1 = self.chromatograms.ms1();
        let rt_list = ms1.rt_list();
        if ms2.num_cycles() != rt_list.len() {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: rt_list.len(),
                other: ms2.num_cycles(),
                context: format!(" (MS2 window {} vs MS1 cycles)", window_id),
            }
            .into());
        }

        let ms1_trace = extract_xic(ms1.spectra(), query.precursor_mz, self.params.ms1_tolerance)?;
        let fragment_traces = extract_xics(
            ms2.spectra(),
            &query.fragment_mzs(),
            self.params.ms2_tolerance,
        )?;
        let matrix = FragmentTraceMatrix::try_new(
            fragment_traces.into_iter().enumerate().collect(),
        )
        .map_err(|e| e.append_to_context(&format!(" for {}", query.id)))?;
        let fragments = matrix
            .quality_filter(self.thresholds)
            .smooth()
            .top_n(self.params.n_frags);
        let ms1_smoothed = FragmentTraceMatrix::try_new(vec![((), ms1_trace)])?.smooth();
        timings.extract += st.elapsed();

        let st = Instant::now();
        let window = find_rt_window(query.retention_time, rt_list, self.params.n_cycles)?;
        let apex = self.find_apex(&fragments, window.clone());
        timings.locate += st.elapsed();

        let st = Instant::now();
        let window_rts = &rt_list[window.clone()];
        let ms1_area = trapezoid_area(&ms1_smoothed.row(0)[window.clone()], window_rts)?;
        let fragment_areas = fragments
            .rows()
            .map(|(_, row)| trapezoid_area(&row[window.clone()], window_rts))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        let library_cosine = if fragment_areas.is_empty() {
            None
        } else {
            let library: Vec<f64> = fragments
                .keys()
                .iter()
                .map(|&k| query.fragments[k].library_intensity as f64)
                .collect();
            cosine_similarity(&library, &fragment_areas)?
        };
        timings.integrate += st.elapsed();

        debug!(
            "{}: window {}, {} of {} fragments kept, apex {:?}",
            query.id,
            window_id,
            fragments.nrows(),
            query.fragments.len(),
            apex.map(|a| rt_list[a])
        );

        Ok(PrecursorQuant {
            precursor_id: query.id.clone(),
            decoy: query.decoy,
            window_id,
            rt_window_start: window_rts.first().copied().unwrap_or_default(),
            rt_window_end: window_rts.last().copied().unwrap_or_default(),
            apex_rt: apex.map(|a| rt_list[a]),
            n_fragments_kept: fragments.nrows(),
            ms1_area,
            total_fragment_area: fragment_areas.iter().sum(),
            fragment_areas,
            library_cosine,
        })
    }

    /// Cycle index of the candidate with the largest summed intensity.
    ///
    /// Candidates are visited center first, the earliest of equally
    /// intense candidates wins.
    fn find_apex(
        &self,
        fragments: &FragmentTraceMatrix<usize>,
        window: Range<usize>,
    ) -> Option<usize> {
        if fragments.is_empty() {
            return None;
        }
        let mut best: Option<(usize, f32)> = None;
        for offset in peak_apex_offsets(window.len(), self.params.peak_index_range) {
            let idx = window.start + offset;
            let score = fragments.column_sum(idx);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Processes queries one after the other.
    pub fn process_chunk(&self, queries: &[PrecursorQuery]) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();
        for query in queries {
            match self.process_query(query, &mut batch.timings) {
                Ok(res) => batch.results.push(res),
                Err(e) => batch.failures.push((query.id.clone(), e)),
            }
        }
        batch
    }

    /// Processes every chunk on the current rayon pool.
    ///
    /// Results keep the order of the chunks.
    pub fn process_chunks(
        &self,
        queries: &[PrecursorQuery],
        chunks: &[Range<usize>],
    ) -> ExtractionBatch {
        self.process_chunks_with_progress(queries, chunks, || {})
    }

    /// Same as [`PrecursorExtractor::process_chunks`], calling `on_chunk`
    /// from the worker thread after each chunk is done.
    pub fn process_chunks_with_progress<F>(
        &self,
        queries: &[PrecursorQuery],
        chunks: &[Range<usize>],
        on_chunk: F,
    ) -> ExtractionBatch
    where
        F: Fn() + Sync,
    {
        let st = Instant::now();
        let batches: Vec<ExtractionBatch> = chunks
            .par_iter()
            .map(|chunk| {
                let batch = self.process_chunk(&queries[chunk.clone()]);
                on_chunk();
                batch
            })
            .collect();

        let mut out = ExtractionBatch::default();
        for batch in batches {
            out.extend(batch);
        }
        info!(
            "Processed {} precursors in {:?} ({} failed): {:?}",
            out.results.len() + out.failures.len(),
            st.elapsed(),
            out.failures.len(),
            out.timings
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ExtractionParams::default();
        assert_eq!(params.n_cycles, 7);
        assert_eq!(params.n_frags, 6);
        assert_eq!(params.peak_index_range, 3);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let params = ExtractionParams {
            n_cycles: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(DataProcessingError::InvalidParameter {
                name: "n_cycles",
                ..
            })
        ));
    }

    #[test]
    fn test_params_serde_defaults() {
        let params: ExtractionParams =
            serde_json::from_str(r#"{"n_frags": 4, "ms2_tolerance": {"da": 0.02}}"#).unwrap();
        assert_eq!(params.n_frags, 4);
        assert_eq!(params.ms2_tolerance, MzTolerance::Absolute(0.02));
        assert_eq!(params.n_cycles, 7);
    }
}
