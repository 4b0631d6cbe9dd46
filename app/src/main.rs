// ==============================================================================
// main.rs - Variant Triage Entry Point
// ==============================================================================
// Description: Command-line triage of annotated WGS variant reports
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_triage::config::{
    ColumnLayout, FetchFailurePolicy, NcbiConfig, ZygosityThresholds, DEFAULT_EUTILS_URL,
};
use variant_triage::evidence::NcbiClinVarSource;
use variant_triage::gene_panel::GenePanel;
use variant_triage::output::{self, OutputFormat};
use variant_triage::parsers::{is_workbook, ReportReader};
use variant_triage::processor::{TriagePipeline, DEFAULT_CONCURRENCY};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Annotated variant report (.xlsx, .csv, .tsv/.txt, optionally .gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Gene panel file (symbol,inheritance,name,reference codes)
    #[arg(short, long)]
    genes: PathBuf,

    /// Output path (default: <input stem>.triage.<format extension>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: from the output extension, else xlsx for
    /// workbook input and csv otherwise)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// JSON file overriding report column positions
    #[arg(long)]
    columns: Option<PathBuf>,

    /// Reject X-linked variants with this many hemizygous observations or more
    #[arg(long, default_value_t = 1)]
    xl_hemizygous_limit: u64,

    /// What to do when ClinVar evidence cannot be fetched for a variant
    #[arg(long, value_enum, default_value_t = FetchFailurePolicy::Skip)]
    on_fetch_error: FetchFailurePolicy,

    /// Variants enriched concurrently
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// NCBI API key (raises the request rate limit)
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    ncbi_api_key: Option<String>,

    /// NCBI E-utilities base URL
    #[arg(long, env = "NCBI_EUTILS_URL", default_value = DEFAULT_EUTILS_URL)]
    eutils_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "variant_triage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Variant triage starting...");

    let layout = match &args.columns {
        Some(path) => ColumnLayout::load(path)
            .with_context(|| format!("Failed to load column layout: {}", path.display()))?,
        None => ColumnLayout::default(),
    };

    let panel = GenePanel::load(&args.genes)
        .with_context(|| format!("Failed to load gene panel: {}", args.genes.display()))?;

    let reader = ReportReader::open(&args.input, layout)
        .with_context(|| format!("Failed to open variant report: {}", args.input.display()))?;
    let headers = reader.headers().clone();

    let ncbi = NcbiConfig {
        base_url: args.eutils_url.clone(),
        api_key: args.ncbi_api_key.clone(),
        request_timeout: Duration::from_secs(args.request_timeout),
    };
    let source = NcbiClinVarSource::new(&ncbi).context("Failed to build NCBI client")?;

    let thresholds = ZygosityThresholds::default().with_x_linked_limit(args.xl_hemizygous_limit);
    let pipeline = TriagePipeline::new(&panel, thresholds, source)
        .with_policy(args.on_fetch_error)
        .with_concurrency(args.concurrency);

    let report = pipeline.run(reader).await.context("Triage failed")?;

    let format = output_format(&args);
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, format));
    output::write_report(&output_path, format, &headers, &report)?;

    info!(
        "Run {} finished: {} of {} variants reported to {}",
        report.run_id,
        report.records.len(),
        report.total_records,
        output_path.display()
    );
    Ok(())
}

fn output_format(args: &Args) -> OutputFormat {
    args.format
        .or_else(|| args.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or(if is_workbook(&args.input) {
            OutputFormat::Xlsx
        } else {
            OutputFormat::Csv
        })
}

/// `<dir>/<stem>.triage.<ext>`, with any `.gz` dropped from the stem
fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    input.with_file_name(format!("{}.triage.{}", stem, format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/sample.csv.gz"), OutputFormat::Csv),
            PathBuf::from("/data/sample.triage.csv")
        );
        assert_eq!(
            default_output_path(Path::new("run/sample.tsv"), OutputFormat::Json),
            PathBuf::from("run/sample.triage.json")
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "variant-triage",
            "--input",
            "in.csv",
            "--genes",
            "genes.txt",
            "--on-fetch-error",
            "abort",
            "--xl-hemizygous-limit",
            "5",
        ])
        .unwrap();
        assert_eq!(args.on_fetch_error, FetchFailurePolicy::Abort);
        assert_eq!(args.xl_hemizygous_limit, 5);
        assert_eq!(args.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(args.format, None);
        assert_eq!(output_format(&args), OutputFormat::Csv);
    }

    #[test]
    fn test_output_format_resolution() {
        let parse = |extra: &[&str]| {
            let mut argv: Vec<&str> = vec!["variant-triage", "--input", "WGS.xlsx", "--genes", "genes.txt"];
            argv.extend_from_slice(extra);
            Args::try_parse_from(argv).unwrap()
        };

        assert_eq!(output_format(&parse(&[])), OutputFormat::Xlsx);
        assert_eq!(output_format(&parse(&["--output", "out.json"])), OutputFormat::Json);
        assert_eq!(
            output_format(&parse(&["--output", "out.json", "--format", "csv"])),
            OutputFormat::Csv
        );
        assert_eq!(
            default_output_path(Path::new("WGS.xlsx"), OutputFormat::Xlsx),
            PathBuf::from("WGS.triage.xlsx")
        );
    }
}
