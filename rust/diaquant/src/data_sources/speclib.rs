//! Tabular (tsv / csv) spectral libraries.
//!
//! A library has one row per fragment; all rows of a precursor share the
//! same precursor id and are expected to be contiguous.

use std::collections::{
    HashMap,
    HashSet,
};
use std::io::Read;
use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    warn,
};

use crate::errors::LibraryReadingError;
use crate::utils::partition::precursor_groups;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFormat {
    Tsv,
    Csv,
}

impl LibraryFormat {
    pub fn detect_from_path(path: &Path) -> Result<Self, LibraryReadingError> {
        let path_str = path.to_string_lossy().to_lowercase();
        if path_str.ends_with(".tsv") {
            Ok(LibraryFormat::Tsv)
        } else if path_str.ends_with(".csv") {
            Ok(LibraryFormat::Csv)
        } else {
            Err(LibraryReadingError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            LibraryFormat::Tsv => b'\t',
            LibraryFormat::Csv => b',',
        }
    }
}

/// Names of the library columns that are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySchema {
    pub precursor_id: String,
    pub full_sequence: String,
    pub precursor_mz: String,
    pub retention_time: String,
    pub product_mz: String,
    pub library_intensity: String,
    pub decoy: String,
    pub precursor_charge: String,
}

impl Default for LibrarySchema {
    fn default() -> Self {
        Self {
            precursor_id: "transition_group_id".into(),
            full_sequence: "FullUniModPeptideName".into(),
            precursor_mz: "PrecursorMz".into(),
            retention_time: "Tr_recalibrated".into(),
            product_mz: "ProductMz".into(),
            library_intensity: "LibraryIntensity".into(),
            decoy: "decoy".into(),
            precursor_charge: "PrecursorCharge".into(),
        }
    }
}

impl LibrarySchema {
    fn columns(&self) -> [&str; 8] {
        [
            &self.precursor_id,
            &self.full_sequence,
            &self.precursor_mz,
            &self.retention_time,
            &self.product_mz,
            &self.library_intensity,
            &self.decoy,
            &self.precursor_charge,
        ]
    }
}

/// One fragment row of the library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryRow {
    pub precursor_id: String,
    pub full_sequence: String,
    pub precursor_mz: f64,
    pub retention_time: f32,
    pub product_mz: f64,
    pub library_intensity: f32,
    pub decoy: bool,
    pub precursor_charge: u8,
}

impl LibraryRow {
    pub fn is_decoy_id(&self) -> bool {
        self.precursor_id.starts_with("DECOY")
    }

    /// Full sequence encoded in the precursor id (`<n>_<SEQUENCE>_<charge>`).
    pub fn sequence_from_id(&self) -> Option<&str> {
        self.precursor_id.trim().split('_').nth(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FragmentTarget {
    pub mz: f64,
    pub library_intensity: f32,
}

/// All the library information needed to quantify one precursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecursorQuery {
    pub id: String,
    pub sequence: String,
    pub charge: u8,
    pub precursor_mz: f64,
    pub retention_time: f32,
    pub decoy: bool,
    pub fragments: Vec<FragmentTarget>,
}

impl PrecursorQuery {
    pub fn fragment_mzs(&self) -> Vec<f64> {
        self.fragments.iter().map(|f| f.mz).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Speclib {
    rows: Vec<LibraryRow>,
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    column: &str,
    row: usize,
) -> Result<T, LibraryReadingError> {
    let value = record.get(idx).unwrap_or("").trim();
    value.parse().map_err(|_| LibraryReadingError::RowParse {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_decoy(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

impl Speclib {
    pub fn from_rows(rows: Vec<LibraryRow>) -> Self {
        Self { rows }
    }

    pub fn from_file(path: &Path, schema: &LibrarySchema) -> Result<Self, LibraryReadingError> {
        let format = LibraryFormat::detect_from_path(path)?;
        let file = std::fs::File::open(path).map_err(|e| LibraryReadingError::Io {
            source: e,
            context: "Error opening spectral library",
            path: path.to_path_buf(),
        })?;
        let st = std::time::Instant::now();
        let out = Self::from_reader(file, format, schema)?;
        info!(
            "Loaded {} library rows from {} in {:?}",
            out.len(),
            path.display(),
            st.elapsed()
        );
        Ok(out)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        format: LibraryFormat,
        schema: &LibrarySchema,
    ) -> Result<Self, LibraryReadingError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| LibraryReadingError::Csv {
                source: e,
                context: "Error reading library header",
            })?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let mut indices = HashMap::new();
        let mut missing = Vec::new();
        for col in schema.columns() {
            match headers.iter().position(|h| h == col) {
                Some(i) => {
                    indices.insert(col.to_string(), i);
                }
                None => missing.push(col.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(LibraryReadingError::SchemaError { missing });
        }
        let idx = |col: &str| indices[col];

        let mut rows = Vec::new();
        for (i, record) in csv_reader.records().enumerate() {
            // Header is row 1
            let row_num = i + 2;
            let record = record.map_err(|e| LibraryReadingError::Csv {
                source: e,
                context: "Error reading library row",
            })?;
            let decoy_raw = record.get(idx(&schema.decoy)).unwrap_or("");
            let decoy = parse_decoy(decoy_raw).ok_or_else(|| LibraryReadingError::RowParse {
                row: row_num,
                column: schema.decoy.clone(),
                value: decoy_raw.to_string(),
            })?;
            rows.push(LibraryRow {
                precursor_id: record
                    .get(idx(&schema.precursor_id))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
                full_sequence: record
                    .get(idx(&schema.full_sequence))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
                precursor_mz: parse_field(
                    &record,
                    idx(&schema.precursor_mz),
                    &schema.precursor_mz,
                    row_num,
                )?,
                retention_time: parse_field(
                    &record,
                    idx(&schema.retention_time),
                    &schema.retention_time,
                    row_num,
                )?,
                product_mz: parse_field(
                    &record,
                    idx(&schema.product_mz),
                    &schema.product_mz,
                    row_num,
                )?,
                library_intensity: parse_field(
                    &record,
                    idx(&schema.library_intensity),
                    &schema.library_intensity,
                    row_num,
                )?,
                decoy,
                precursor_charge: parse_field(
                    &record,
                    idx(&schema.precursor_charge),
                    &schema.precursor_charge,
                    row_num,
                )?,
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[LibraryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Target precursor ids whose full sequence disagrees with the id.
    ///
    /// One entry per offending row, in file order.
    pub fn abnormal_precursor_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| !r.is_decoy_id())
            .filter(|r| r.sequence_from_id() != Some(r.full_sequence.as_str()))
            .map(|r| r.precursor_id.as_str())
            .collect()
    }

    /// Rewrites the full sequence of abnormal precursors from their ids.
    ///
    /// All rows of an abnormal precursor are moved after the untouched rows,
    /// keeping their relative order.
    pub fn correct_full_sequences(self) -> Self {
        let abnormal: HashSet<String> = self
            .abnormal_precursor_ids()
            .into_iter()
            .map(|x| x.to_string())
            .collect();
        if abnormal.is_empty() {
            return self;
        }
        warn!(
            "Correcting the full sequence of {} library precursors",
            abnormal.len()
        );

        let (mut normal, mut corrected): (Vec<LibraryRow>, Vec<LibraryRow>) = self
            .rows
            .into_iter()
            .partition(|r| !abnormal.contains(&r.precursor_id));
        for row in corrected.iter_mut() {
            if let Some(seq) = row.sequence_from_id() {
                row.full_sequence = seq.to_string();
            }
        }
        normal.append(&mut corrected);
        Self { rows: normal }
    }

    /// The `n` target precursors with the highest mean library intensity,
    /// for retention time calibration.
    pub fn endogenous_irt_subset(&self, n: usize) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
        for row in self.rows.iter().filter(|r| !r.decoy) {
            let entry = sums.entry(row.precursor_id.as_str()).or_insert_with(|| {
                order.push(row.precursor_id.as_str());
                (0.0, 0)
            });
            entry.0 += row.library_intensity as f64;
            entry.1 += 1;
        }

        let mut ranked: Vec<(&str, f64)> = order
            .into_iter()
            .map(|id| {
                let (sum, count) = sums[id];
                (id, sum / count as f64)
            })
            .collect();
        // Stable, ties keep first-seen order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let keep: HashSet<&str> = ranked.into_iter().take(n).map(|(id, _)| id).collect();

        let rows = self
            .rows
            .iter()
            .filter(|r| !r.decoy && keep.contains(r.precursor_id.as_str()))
            .cloned()
            .collect();
        Self { rows }
    }

    /// Groups contiguous rows with the same precursor id into queries.
    pub fn precursor_queries(&self) -> Vec<PrecursorQuery> {
        let ids: Vec<&str> = self.rows.iter().map(|r| r.precursor_id.as_str()).collect();
        precursor_groups(&ids)
            .into_iter()
            .map(|range| {
                let rows = &self.rows[range];
                let first = &rows[0];
                PrecursorQuery {
                    id: first.precursor_id.clone(),
                    sequence: first.full_sequence.clone(),
                    charge: first.precursor_charge,
                    precursor_mz: first.precursor_mz,
                    retention_time: first.retention_time,
                    decoy: first.decoy,
                    fragments: rows
                        .iter()
                        .map(|r| FragmentTarget {
                            mz: r.product_mz,
                            library_intensity: r.library_intensity,
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "transition_group_id\tFullUniModPeptideName\tPrecursorMz\tTr_recalibrated\tProductMz\tLibraryIntensity\tdecoy\tPrecursorCharge\tProteinName";

    fn library(rows: &[&str]) -> Speclib {
        let mut content = HEADER.to_string();
        for r in rows {
            content.push('\n');
            content.push_str(r);
        }
        Speclib::from_reader(
            content.as_bytes(),
            LibraryFormat::Tsv,
            &LibrarySchema::default(),
        )
        .unwrap()
    }

    fn sample() -> Speclib {
        library(&[
            "1_PEPTIDE_2\tPEPTIDE\t400.2\t100.0\t500.1\t10\t0\t2\tP1",
            "1_PEPTIDE_2\tPEPTIDE\t400.2\t100.0\t600.1\t30\t0\t2\tP1",
            "2_PEPTIDEK_2\tPEPTIDEX\t450.7\t200.0\t700.3\t50\t0\t2\tP1",
            "2_PEPTIDEK_2\tPEPTIDEX\t450.7\t200.0\t800.3\t50\t0\t2\tP1",
            "DECOY_1_EDITPEP_2\tEDITPEP\t400.2\t100.0\t510.1\t90\t1\t2\tP1",
            "3_SAMPLER_3\tSAMPLER\t300.1\t300.0\t400.1\t20\t0\t3\tP2",
        ])
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            LibraryFormat::detect_from_path(Path::new("lib.TSV")).unwrap(),
            LibraryFormat::Tsv
        );
        assert_eq!(
            LibraryFormat::detect_from_path(Path::new("lib.csv")).unwrap(),
            LibraryFormat::Csv
        );
        assert!(matches!(
            LibraryFormat::detect_from_path(Path::new("lib.parquet")),
            Err(LibraryReadingError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_schema_error_lists_all_missing_columns() {
        let content = "transition_group_id\tPrecursorMz\tProductMz\n1_A_2\t1.0\t2.0\n";
        let res = Speclib::from_reader(
            content.as_bytes(),
            LibraryFormat::Tsv,
            &LibrarySchema::default(),
        );
        match res {
            Err(LibraryReadingError::SchemaError { missing }) => {
                assert_eq!(
                    missing,
                    vec![
                        "FullUniModPeptideName",
                        "Tr_recalibrated",
                        "LibraryIntensity",
                        "decoy",
                        "PrecursorCharge"
                    ]
                );
            }
            other => panic!("Expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_schema() {
        let schema = LibrarySchema {
            retention_time: "iRT".into(),
            ..Default::default()
        };
        let content = "transition_group_id,FullUniModPeptideName,PrecursorMz,iRT,ProductMz,LibraryIntensity,decoy,PrecursorCharge\n1_AA_1,AA,100.0,12.5,50.0,1,0,1\n";
        let lib = Speclib::from_reader(content.as_bytes(), LibraryFormat::Csv, &schema).unwrap();
        assert_eq!(lib.rows()[0].retention_time, 12.5);
    }

    #[test]
    fn test_row_parse_error_reports_row() {
        let res = Speclib::from_reader(
            format!("{}\n1_A_2\tA\tnot_a_number\t1\t1\t1\t0\t2\tP", HEADER).as_bytes(),
            LibraryFormat::Tsv,
            &LibrarySchema::default(),
        );
        match res {
            Err(LibraryReadingError::RowParse { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "PrecursorMz");
            }
            other => panic!("Expected RowParse, got {:?}", other),
        }
    }

    #[test]
    fn test_abnormal_ids_skip_decoys() {
        let lib = sample();
        assert_eq!(
            lib.abnormal_precursor_ids(),
            vec!["2_PEPTIDEK_2", "2_PEPTIDEK_2"]
        );
    }

    #[test]
    fn test_correct_full_sequences_moves_rows_to_end() {
        let lib = sample().correct_full_sequences();
        let ids: Vec<&str> = lib.rows().iter().map(|r| r.precursor_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "1_PEPTIDE_2",
                "1_PEPTIDE_2",
                "DECOY_1_EDITPEP_2",
                "3_SAMPLER_3",
                "2_PEPTIDEK_2",
                "2_PEPTIDEK_2"
            ]
        );
        assert!(lib.abnormal_precursor_ids().is_empty());
        assert_eq!(lib.rows()[4].full_sequence, "PEPTIDEK");
    }

    #[test]
    fn test_irt_subset_ranks_by_mean_intensity() {
        let lib = sample();
        // Means: 1 -> 20, 2 -> 50, 3 -> 20 (decoy excluded)
        let subset = lib.endogenous_irt_subset(2);
        let ids: Vec<&str> = subset.rows().iter().map(|r| r.precursor_id.as_str()).collect();
        // Tie between 1 and 3 goes to the first seen, rows stay in file order
        assert_eq!(
            ids,
            vec!["1_PEPTIDE_2", "1_PEPTIDE_2", "2_PEPTIDEK_2", "2_PEPTIDEK_2"]
        );
        assert!(lib.endogenous_irt_subset(0).is_empty());
    }

    #[test]
    fn test_precursor_queries_group_contiguous_rows() {
        let queries = sample().precursor_queries();
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0].id, "1_PEPTIDE_2");
        assert_eq!(queries[0].fragment_mzs(), vec![500.1, 600.1]);
        assert_eq!(queries[0].fragments[1].library_intensity, 30.0);
        assert!(queries[2].decoy);
        assert_eq!(queries[3].charge, 3);
        assert_eq!(queries[3].retention_time, 300.0);
    }
}
