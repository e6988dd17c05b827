use diaquant::{
    ExtractionParams,
    LibrarySchema,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;

use crate::cli::Cli;
use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub analysis: AnalysisConfig,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InputConfig {
    pub raw_file: Option<PathBuf>,
    pub window_file: Option<PathBuf>,
    pub library_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mz_min: f64,
    pub mz_max: f64,
    pub n_threads: usize,
    /// Only quantify the N most intense target precursors.
    pub irt_subset: Option<usize>,
    pub correct_full_sequences: bool,
    pub schema: LibrarySchema,
    pub extraction: ExtractionParams,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mz_min: 200.0,
            mz_max: 1800.0,
            n_threads: 4,
            irt_subset: None,
            correct_full_sequences: true,
            schema: LibrarySchema::default(),
            extraction: ExtractionParams::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// Input paths after merging the config file and the command line.
#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub raw_file: PathBuf,
    pub window_file: PathBuf,
    pub library_file: PathBuf,
}

impl Config {
    pub fn template() -> Self {
        Self {
            input: InputConfig {
                raw_file: Some(PathBuf::from("run.mzML")),
                window_file: Some(PathBuf::from("windows.tsv")),
                library_file: Some(PathBuf::from("library.tsv")),
            },
            analysis: AnalysisConfig::default(),
            output: Some(OutputConfig {
                directory: PathBuf::from("diaquant_results"),
            }),
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, CliError> {
        let conf = std::fs::File::open(path).map_err(|e| CliError::Io {
            msg: e.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        })?;
        serde_json::from_reader(std::io::BufReader::new(conf))
            .map_err(|e| CliError::ParseError { msg: e.to_string() })
    }

    /// Command line values take precedence over the config file.
    pub fn with_cli_args(mut self, args: &Cli) -> Self {
        if let Some(raw_file) = &args.raw_file {
            self.input.raw_file = Some(raw_file.clone());
        }
        if let Some(window_file) = &args.window_file {
            self.input.window_file = Some(window_file.clone());
        }
        if let Some(library_file) = &args.library_file {
            self.input.library_file = Some(library_file.clone());
        }
        if let Some(n_threads) = args.n_threads {
            self.analysis.n_threads = n_threads;
        }
        if let Some(output_dir) = &args.output_dir {
            self.output = Some(OutputConfig {
                directory: output_dir.clone(),
            });
        }
        self
    }

    pub fn resolve_inputs(&self) -> Result<ResolvedInputs, CliError> {
        fn required(path: &Option<PathBuf>, name: &str, flag: &str) -> Result<PathBuf, CliError> {
            path.clone().ok_or_else(|| CliError::Config {
                msg: format!(
                    "No {} provided, please provide one in either the config file or with the {} flag",
                    name, flag
                ),
            })
        }
        Ok(ResolvedInputs {
            raw_file: required(&self.input.raw_file, "raw file", "--raw-file")?,
            window_file: required(&self.input.window_file, "window file", "--window-file")?,
            library_file: required(&self.input.library_file, "library file", "--library-file")?,
        })
    }

    pub fn output_config(&self) -> Result<OutputConfig, CliError> {
        self.output.clone().ok_or_else(|| CliError::Config {
            msg: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
        })
    }
}
