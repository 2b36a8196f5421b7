//! Climate Import CLI
//!
//! Command-line interface for importing climate data into DHIS2:
//! - Import data values from JSON or CSV files
//! - Fetch an Earth Engine token
//! - Check the DHIS2 connection
//! - Compare monthly precipitation against normals

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use climate_import::alerts::TracingAlertSink;
use climate_import::api::dto::MonthlyPrecipitationRequest;
use climate_import::config::{generate_default_config, Config};
use climate_import::dhis2::{Dhis2Client, EarthEngineTokenProvider};
use climate_import::explore::monthly_precipitation;
use climate_import::import::report::{
    org_units_without_data, progress_label, FailureReport, ImportSummary,
};
use climate_import::import::source::{load_json, CsvRecordReader};
use climate_import::import::{
    DataElement, ImportController, ImportFailure, ImportPipeline, ImportState, Record,
    RecordSource,
};
use climate_import::logging;
use climate_import::org_unit::parse_features;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "climate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Import climate data values into DHIS2")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import data values from a file
    Import {
        /// Path to a JSON or CSV file of {value, ou, period} records
        path: PathBuf,
        /// Data element id receiving the values
        #[arg(short, long)]
        data_element: String,
        /// Input format (default: from file extension)
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,
        /// Org unit features (GeoJSON) to report units without data
        #[arg(long)]
        features: Option<PathBuf>,
        /// CSV org unit column
        #[arg(long, default_value = "ou")]
        ou_column: String,
        /// CSV period column
        #[arg(long, default_value = "period")]
        period_column: String,
        /// CSV value column
        #[arg(long, default_value = "value")]
        value_column: String,
        /// Show the chunk plan without importing
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch an Earth Engine token through DHIS2
    Token,

    /// Show DHIS2 connection status
    Status,

    /// Monthly precipitation against climate normals
    Explore {
        /// JSON file with context, observations and normals
        path: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Generating a default config must work even when the current one is broken
    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    config.validate()?;
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Import {
            path,
            data_element,
            format,
            features,
            ou_column,
            period_column,
            value_column,
            dry_run,
        } => {
            let format = match format {
                Some(InputFormat::Json) => RecordSource::Json,
                Some(InputFormat::Csv) => RecordSource::Csv,
                None => RecordSource::detect(&path)
                    .with_context(|| format!("Cannot detect format of {:?}, use --format", path))?,
            };

            let load = match format {
                RecordSource::Json => load_json(&path)?,
                RecordSource::Csv => CsvRecordReader::new()
                    .with_ou_column(&ou_column)
                    .with_period_column(&period_column)
                    .with_value_column(&value_column)
                    .read(&path)?,
            };

            println!("Read {} records from {:?}", load.records.len(), path);
            if load.rows_failed > 0 {
                println!("Skipped {} unreadable rows:", load.rows_failed);
                for error in &load.errors {
                    println!("  {}", error);
                }
            }

            if let Some(features_path) = features {
                report_missing_org_units(&load.records, &features_path)?;
            }

            import(&config, load.records, DataElement::new(data_element), dry_run).await?;
        }

        Commands::Token => {
            let client = Arc::new(Dhis2Client::new((&config.dhis2).into())?);
            let provider = EarthEngineTokenProvider::new(client, Arc::new(TracingAlertSink));

            match provider.fetch_token().await {
                Some(token) => {
                    println!("{}", serde_json::to_string_pretty(&token)?);
                }
                None => std::process::exit(1),
            }
        }

        Commands::Status => {
            let client = Dhis2Client::new((&config.dhis2).into())?;

            println!("climate-import v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("DHIS2: {}", config.dhis2.url);

            match client.system_info().await {
                Ok(info) => {
                    println!("  Version: {}", info.version);
                    if let Some(name) = info.system_name {
                        println!("  Name: {}", name);
                    }
                    if let Some(date) = info.server_date {
                        println!("  Server date: {}", date);
                    }
                }
                Err(e) => {
                    eprintln!("Cannot connect to DHIS2 at {}", config.dhis2.url);
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }

            println!();
            println!(
                "Import: chunks of {}, {} requests in flight",
                config.import.chunk_size, config.import.request_limit
            );
        }

        Commands::Explore { path, json } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let request: MonthlyPrecipitationRequest = serde_json::from_str(&content)?;
            let chart =
                monthly_precipitation(&request.context, &request.observations, &request.normals)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&chart)?);
            } else {
                println!("{}", chart.title);
                println!("Reference period: {}", chart.reference_period);
                println!();
                println!("{:<10} {:>10} {:>10} {:>10}", "Period", "Value", "Normal", "Anomaly");
                println!("{}", "-".repeat(43));

                for row in &chart.rows {
                    println!(
                        "{:<10} {:>10.1} {:>10} {:>10}",
                        row.period.to_string(),
                        row.value,
                        format_optional(row.normal),
                        format_optional(row.anomaly)
                    );
                }
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn import(
    config: &Config,
    records: Vec<Record>,
    data_element: DataElement,
    dry_run: bool,
) -> anyhow::Result<()> {
    let client = Arc::new(Dhis2Client::new((&config.dhis2).into())?);
    let pipeline = ImportPipeline::new(client.clone(), (&config.import).into());

    if dry_run {
        let chunks = pipeline.plan(&records, &data_element);
        let values: usize = chunks.iter().map(|c| c.len()).sum();

        println!();
        println!("Dry run: {} numeric values in {} chunks", values, chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            println!("  Chunk {}: {} values", i + 1, chunk.len());
        }
        return Ok(());
    }

    match client.data_element(&data_element.id).await {
        Ok(info) if !info.accepts_numbers() => {
            bail!(
                "Data element {} ({}) does not accept numeric values",
                info.id,
                info.name
            );
        }
        Ok(info) => {
            println!("Importing into {} ({})", info.name, info.id);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not look up data element, importing anyway");
        }
    }

    let controller = ImportController::new(pipeline, Arc::new(TracingAlertSink));
    let mut rx = controller.subscribe();

    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().state.clone();
            if let ImportState::Importing { progress, .. } = state {
                eprintln!("{}", progress_label(progress));
            }
        }
    });

    let outcome = controller
        .trigger(records.into(), Arc::new(data_element))
        .await;
    printer.abort();

    match outcome {
        Some(Ok(result)) => {
            println!();
            println!("{}", ImportSummary(&result));
            Ok(())
        }
        Some(Err(e)) => {
            eprintln!();
            eprintln!("{}", FailureReport(&ImportFailure::from(&e)));
            std::process::exit(1);
        }
        None => Ok(()),
    }
}

fn report_missing_org_units(records: &[Record], path: &Path) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let features = parse_features(&content)?;
    let missing = org_units_without_data(records, &features);

    if missing.is_empty() {
        println!("All {} org units have data", features.len());
    } else {
        println!("{} of {} org units have no data:", missing.len(), features.len());
        for feature in missing {
            println!("  {:<14} {}", feature.id, feature.name());
        }
    }

    Ok(())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Wrote default config to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_command_ignores_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[dhis2\nurl = ").unwrap();
        let output = dir.path().join("config.toml");

        let cli = Cli::try_parse_from([
            "climate",
            "--config",
            broken.to_str().unwrap(),
            "config",
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();

        run(cli).await.unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, generate_default_config());
    }

    #[tokio::test]
    async fn test_broken_config_fails_other_commands() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[dhis2\nurl = ").unwrap();

        let cli =
            Cli::try_parse_from(["climate", "--config", broken.to_str().unwrap(), "status"]).unwrap();

        assert!(run(cli).await.is_err());
    }
}
