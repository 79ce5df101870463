use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;

use climate_analyzer::pipeline::{
    DropNullsTransformer, InterpolateTransformer, InterpolationMethod, Pipeline,
    UnitConversionTransformer,
};
use climate_analyzer::utils::DateParser;
use climate_analyzer::utils::logging::console::{
    print_anomaly_summary, print_batch_summary, print_quality_report, print_schema_info,
    print_trend_table,
};
use climate_analyzer::utils::logging::{create_spinner, finish_progress_bar, init_logging};
use climate_analyzer::{
    AnalyzerConfig, ClimateAnalyzer, DEFAULT_ANOMALY_THRESHOLD, IngestionPipeline, NoaaAdapter,
    Result,
};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "climate-analyzer", version)]
#[command(about = "Analyze climate patterns in historical weather data.")]
struct CommandLine {
    /// Log filter (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory exports are written to
    #[arg(long, global = true, env = "CLIMATE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mann-Kendall trend of every numeric column
    Trends { file: PathBuf },
    /// Z-score anomalies across numeric columns
    Anomalies {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_ANOMALY_THRESHOLD)]
        threshold: f64,
        /// Also export the anomaly table in this format
        #[arg(long)]
        export: Option<String>,
        /// Rows shown per column
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Completeness and plausibility report
    Quality { file: PathBuf },
    /// Run a registered analyzer with JSON parameters
    Analyze {
        file: PathBuf,
        #[arg(long)]
        analyzer: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Clean a file and export the result
    Clean {
        file: PathBuf,
        /// Drop rows with at least this share of nulls
        #[arg(long)]
        drop_nulls: Option<f64>,
        /// Fill gaps: linear, ffill or bfill
        #[arg(long)]
        interpolate: Option<InterpolationMethod>,
        /// Unit conversion as COLUMN:CONVERSION, e.g. temperature:f_to_c
        #[arg(long = "convert")]
        conversions: Vec<String>,
        #[arg(long, default_value = "parquet")]
        format: String,
        #[arg(long, default_value = "cleaned")]
        name: String,
    },
    /// Convert a file to another format
    Convert {
        file: PathBuf,
        #[arg(long)]
        format: String,
        /// Output name without extension (defaults to the input stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// Fetch data from an external source
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },
}

#[derive(Subcommand)]
enum IngestSource {
    /// NOAA GHCN-Daily through the CDO v2 API
    Noaa {
        /// Station id, e.g. GHCND:USW00094728 (repeatable)
        #[arg(long = "station", required = true)]
        stations: Vec<String>,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        /// Parquet file name inside the output directory
        #[arg(long)]
        output: Option<String>,
    },
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    DateParser::default()
        .parse(s, true)
        .ok_or_else(|| format!("unrecognised date '{s}'"))
}

fn load(analyzer: &mut ClimateAnalyzer, file: &Path) -> Result<()> {
    let start = Instant::now();
    let batch = analyzer.load_data(file)?;
    print_batch_summary(batch, start.elapsed());
    Ok(())
}

fn clean_pipeline(
    drop_nulls: Option<f64>,
    interpolate: Option<InterpolationMethod>,
    conversions: &[String],
) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    if let Some(threshold) = drop_nulls {
        pipeline = pipeline.add(DropNullsTransformer::new(None, threshold));
    }
    if let Some(method) = interpolate {
        pipeline = pipeline.add(InterpolateTransformer::new(method, None));
    }
    for spec in conversions {
        let (column, conversion) = spec
            .split_once(':')
            .with_context(|| format!("Expected COLUMN:CONVERSION, got '{spec}'"))?;
        pipeline = pipeline.add(UnitConversionTransformer::new(column, conversion)?);
    }
    Ok(pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLine::parse();

    let mut config = AnalyzerConfig::from_env()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    init_logging(&config.log_level);
    config.validate()?;

    let mut analyzer = ClimateAnalyzer::new(config);
    info!("Climate Data Analyzer initialized");

    match cli.command {
        Commands::Trends { file } => {
            load(&mut analyzer, &file)?;
            print_trend_table(&analyzer.analyze_trends()?);
        }
        Commands::Anomalies {
            file,
            threshold,
            export,
            limit,
        } => {
            load(&mut analyzer, &file)?;
            analyzer.detect_anomalies(threshold)?;
            print_anomaly_summary(analyzer.anomaly_rows(), limit);
            if let Some(format) = export {
                let path = analyzer.export_results("anomalies", &format)?;
                println!("Exported anomalies to {}", path.display());
            }
        }
        Commands::Quality { file } => {
            load(&mut analyzer, &file)?;
            print_quality_report(&analyzer.quality_report()?);
        }
        Commands::Analyze {
            file,
            analyzer: name,
            params,
        } => {
            load(&mut analyzer, &file)?;
            let params: serde_json::Value =
                serde_json::from_str(&params).context("Failed to parse --params as JSON")?;
            let result = analyzer.run_analyzer(&name, &params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Clean {
            file,
            drop_nulls,
            interpolate,
            conversions,
            format,
            name,
        } => {
            load(&mut analyzer, &file)?;
            let pipeline = clean_pipeline(drop_nulls, interpolate, &conversions)?;
            let data = analyzer.data().context("No data loaded")?;
            let cleaned = pipeline.transform(data)?;
            print_schema_info(&cleaned);
            analyzer.set_data(cleaned);
            let path = analyzer.export_results(&name, &format)?;
            println!("Wrote {}", path.display());
        }
        Commands::Convert { file, format, name } => {
            load(&mut analyzer, &file)?;
            let name = name
                .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "converted".to_string());
            let path = analyzer.export_results(&name, &format)?;
            println!("Wrote {}", path.display());
        }
        Commands::Ingest {
            source:
                IngestSource::Noaa {
                    stations,
                    start,
                    end,
                    output,
                },
        } => {
            let config = analyzer.config();
            let adapter = NoaaAdapter::new(config.api_key.clone())?
                .with_base_url(config.noaa_base_url.clone())
                .with_stations(stations);
            let mut pipeline = IngestionPipeline::new(config.output_dir.clone())?;
            pipeline.register_adapter("noaa", adapter);

            let spinner = create_spinner(Some("Fetching NOAA data"));
            let batch = pipeline.ingest("noaa", start, end).await;
            finish_progress_bar(&spinner, None);
            let batch = batch?;

            let filename = output.unwrap_or_else(|| format!("noaa_{start}_{end}.parquet"));
            let path = pipeline.save(&batch, &filename)?;
            println!("Saved {} records to {}", batch.num_rows(), path.display());
        }
    }

    Ok(())
}
