use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relatedness_features::{
    record::read_records, FeatureConfig, FeatureMatrix, FeaturePipeline, FeatureSchema,
    FeatureTelemetry,
};
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "featurize", version, about = "Sentence-pair relatedness feature extraction")]
struct Cli {
    /// JSON-lines log file; overrides `[telemetry].log_path`.
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assembles one feature row per record.
    Extract {
        #[arg(long)]
        config: PathBuf,
        /// JSON-lines records.
        #[arg(long)]
        records: PathBuf,
        /// Destination of the feature matrix (JSON).
        #[arg(long)]
        output: PathBuf,
        /// Also append rows to this feature store.
        #[arg(long)]
        store: Option<PathBuf>,
        /// Records that fix the frequency stop list; defaults to `--records`.
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Prints the column contract of a configuration.
    Schema {
        #[arg(long)]
        config: PathBuf,
        /// Print features and columns as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct SchemaReport<'a> {
    features: Vec<&'static str>,
    columns: &'a [String],
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Extract {
            config,
            records,
            output,
            store,
            corpus,
        } => handle_extract(
            &config,
            &records,
            &output,
            ExtractOptions {
                store,
                corpus,
                log: cli.log,
            },
        ),
        Commands::Schema { config, json } => {
            let config = FeatureConfig::load(&config)?;
            let schema = FeatureSchema::from_features(&config.features)?;
            if let Some(columns) = &config.columns {
                schema.verify_columns(columns)?;
            }
            print!("{}", render_schema(&schema, json)?);
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct ExtractOptions {
    store: Option<PathBuf>,
    corpus: Option<PathBuf>,
    log: Option<PathBuf>,
}

fn handle_extract(
    config_path: &Path,
    records_path: &Path,
    output: &Path,
    options: ExtractOptions,
) -> Result<()> {
    let ExtractOptions { store, corpus, log } = options;
    anyhow::ensure!(config_path.exists(), "config file {} not found", config_path.display());
    let mut builder = FeaturePipeline::builder().config_path(config_path)?;
    let telemetry = match log {
        Some(path) => {
            let telemetry = FeatureTelemetry::builder("featurize")
                .log_path(&path)
                .build()
                .with_context(|| format!("opening log {}", path.display()))?;
            builder = builder.telemetry(telemetry.clone());
            Some(telemetry)
        }
        None => None,
    };
    if let Some(path) = store {
        builder = builder.feature_store_path(path)?;
    }
    let mut pipeline = builder.build()?;
    if let Some(path) = corpus {
        pipeline.fit_stop_list(&read_records(&path)?);
    }
    let records = read_records(records_path)?;
    let matrix = pipeline.extract(&records)?;
    write_matrix(output, &matrix)?;
    if let Some(tel) = &telemetry {
        tel.log(
            LogLevel::Info,
            "featurize.extract.written",
            json!({ "output": output.display().to_string(), "rows": matrix.rows.len() }),
        )?;
    }
    println!(
        "{} rows x {} columns -> {} ({} flagged)",
        matrix.rows.len(),
        matrix.columns.len(),
        output.display(),
        matrix.flagged()
    );
    Ok(())
}

fn write_matrix(path: &Path, matrix: &FeatureMatrix) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, matrix)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn render_schema(schema: &FeatureSchema, as_json: bool) -> Result<String> {
    if as_json {
        let report = SchemaReport {
            features: schema.features().iter().map(|id| id.name()).collect(),
            columns: schema.columns(),
        };
        return Ok(format!("{}\n", serde_json::to_string_pretty(&report)?));
    }
    Ok(schema
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("{idx}\t{column}\n"))
        .collect())
}
