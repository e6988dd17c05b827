use std::path::Path;
use std::time::Instant;

use diaquant::data_sources::PrecursorQuery;
use diaquant::scoring::{
    ExtractionBatch,
    PrecursorExtractor,
    PrecursorQuant,
};
use diaquant::utils::partition::partition_groups;
use diaquant::Speclib;
use diaquery::{
    ChromatogramBuilder,
    DiaqueryError,
    RawFormat,
    SpectrumFilter,
    WindowTable,
};
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use serde::Serialize;
use tracing::{
    error,
    info,
    warn,
};

use crate::config::{
    AnalysisConfig,
    OutputConfig,
    ResolvedInputs,
};
use crate::errors::CliError;

pub const RESULTS_FILENAME: &str = "quantification.tsv";

/// One line of the results table.
#[derive(Debug, Serialize)]
struct QuantRow<'a> {
    precursor_id: &'a str,
    decoy: bool,
    window_id: usize,
    rt_window_start: f32,
    rt_window_end: f32,
    apex_rt: Option<f32>,
    n_fragments_kept: usize,
    ms1_area: f64,
    fragment_areas: String,
    total_fragment_area: f64,
    library_cosine: Option<f64>,
}

impl<'a> From<&'a PrecursorQuant> for QuantRow<'a> {
    fn from(x: &'a PrecursorQuant) -> Self {
        let fragment_areas = x
            .fragment_areas
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(";");
        QuantRow {
            precursor_id: &x.precursor_id,
            decoy: x.decoy,
            window_id: x.window_id,
            rt_window_start: x.rt_window_start,
            rt_window_end: x.rt_window_end,
            apex_rt: x.apex_rt,
            n_fragments_kept: x.n_fragments_kept,
            ms1_area: x.ms1_area,
            fragment_areas,
            total_fragment_area: x.total_fragment_area,
            library_cosine: x.library_cosine,
        }
    }
}

pub fn write_results(results: &[PrecursorQuant], path: &Path) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    for res in results {
        writer.serialize(QuantRow::from(res))?;
    }
    writer.flush().map_err(|e| CliError::Io {
        msg: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })?;
    Ok(())
}

pub fn load_library(path: &Path, analysis: &AnalysisConfig) -> Result<Vec<PrecursorQuery>, CliError> {
    let mut speclib = Speclib::from_file(path, &analysis.schema)?;

    let abnormal = speclib.abnormal_precursor_ids().len();
    if abnormal > 0 {
        if analysis.correct_full_sequences {
            speclib = speclib.correct_full_sequences();
        } else {
            warn!(
                "{} library rows have a full sequence that does not match their precursor id",
                abnormal
            );
        }
    }
    if let Some(n) = analysis.irt_subset {
        speclib = speclib.endogenous_irt_subset(n);
        info!("Using the {} most intense target precursors ({} rows)", n, speclib.len());
    }

    let queries = speclib.precursor_queries();
    info!("Library has {} precursors", queries.len());
    Ok(queries)
}

fn run_extraction(
    extractor: &PrecursorExtractor,
    queries: &[PrecursorQuery],
    n_threads: usize,
) -> Result<ExtractionBatch, CliError> {
    let chunks = partition_groups(queries.len(), n_threads)
        .map_err(|e| CliError::Config { msg: e.to_string() })?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| CliError::Config { msg: e.to_string() })?;

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Config { msg: e.to_string() })?;
    let pb = ProgressBar::new(chunks.len() as u64).with_style(style);

    let batch = pool.install(|| {
        extractor.process_chunks_with_progress(queries, &chunks, || pb.inc(1))
    });
    pb.finish();
    Ok(batch)
}

pub fn main_loop(
    inputs: &ResolvedInputs,
    analysis: &AnalysisConfig,
    output: &OutputConfig,
) -> Result<(), CliError> {
    let start = Instant::now();

    // Fail on unsupported raw files before any heavy lifting
    RawFormat::from_path(&inputs.raw_file).map_err(DiaqueryError::from)?;
    let windows = WindowTable::from_file(&inputs.window_file).map_err(DiaqueryError::from)?;
    let queries = load_library(&inputs.library_file, analysis)?;

    let filter =
        SpectrumFilter::try_new(analysis.mz_min, analysis.mz_max).map_err(DiaqueryError::from)?;
    let (chromatograms, _stats) =
        ChromatogramBuilder::new(windows, filter).build_from_path(&inputs.raw_file)?;

    let extractor = PrecursorExtractor::try_new(&chromatograms, analysis.extraction)?;
    let batch = run_extraction(&extractor, &queries, analysis.n_threads)?;

    let out_path = output.directory.join(RESULTS_FILENAME);
    write_results(&batch.results, &out_path)?;
    info!(
        "Quantified {} of {} precursors in {:?}, results written to {}",
        batch.results.len(),
        queries.len(),
        start.elapsed(),
        out_path.display()
    );

    for (id, err) in batch.failures.iter() {
        match err.out_of_range_mz() {
            Some(mz) => error!(
                "Precursor {} (m/z {}) is not covered by any isolation window",
                id, mz
            ),
            None => error!("Failed to quantify {}: {}", id, err),
        }
    }
    if let Some((first_id, first_err)) = batch.failures.first() {
        return Err(CliError::FailedPrecursors {
            n_failed: batch.failures.len(),
            first: format!("{}: {}", first_id, first_err),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_table() {
        let results = vec![PrecursorQuant {
            precursor_id: "1_PEPTIDE_2".into(),
            decoy: false,
            window_id: 3,
            rt_window_start: 20.0,
            rt_window_end: 80.0,
            apex_rt: Some(50.0),
            n_fragments_kept: 2,
            ms1_area: 10.0,
            fragment_areas: vec![1.5, 2.0],
            total_fragment_area: 3.5,
            library_cosine: None,
        }];
        let dir = std::env::temp_dir().join("diaquant_cli_processing_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(RESULTS_FILENAME);
        write_results(&results, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "precursor_id\tdecoy\twindow_id\trt_window_start\trt_window_end\tapex_rt\tn_fragments_kept\tms1_area\tfragment_areas\ttotal_fragment_area\tlibrary_cosine"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1_PEPTIDE_2\tfalse\t3\t20.0\t80.0\t50.0\t2\t10.0\t1.5;2\t3.5\t"
        );
    }
}
