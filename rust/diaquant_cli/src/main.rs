mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use errors::CliError;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();

    if args.write_template {
        let template = serde_json::to_string_pretty(&Config::template())
            .map_err(|e| CliError::ParseError { msg: e.to_string() })?;
        println!("{}", template);
        return Ok(());
    }

    let config_path = args.config.clone().ok_or_else(|| CliError::Config {
        msg: "No config file provided, use --config or --write-template".to_string(),
    })?;
    let config = Config::from_file(&config_path)?.with_cli_args(&args);
    let inputs = config.resolve_inputs()?;
    let output_config = config.output_config()?;
    info!("Parsed configuration: {:#?}", config);

    std::fs::create_dir_all(&output_config.directory).map_err(|e| CliError::Io {
        msg: e.to_string(),
        path: Some(output_config.directory.to_string_lossy().to_string()),
    })?;

    processing::main_loop(&inputs, &config.analysis, &output_config)
}
