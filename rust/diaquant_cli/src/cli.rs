use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, required_unless_present = "write_template")]
    pub config: Option<PathBuf>,

    /// Path to the raw file, .mzML or .mzXML (will over-write the config file)
    #[arg(short, long)]
    pub raw_file: Option<PathBuf>,

    /// Path to the isolation window file (will over-write the config file)
    #[arg(short, long)]
    pub window_file: Option<PathBuf>,

    /// Path to the spectral library, .tsv or .csv (will over-write the config file)
    #[arg(short, long)]
    pub library_file: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads (will over-write the config file)
    #[arg(short = 't', long)]
    pub n_threads: Option<usize>,

    /// Print a configuration template to stdout and exit
    #[arg(long)]
    pub write_template: bool,
}
