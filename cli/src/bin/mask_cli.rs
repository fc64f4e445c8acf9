use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use mask::{codec, AutoMaskOutput, AutoMaskPipeline};
use mask_cli::{default_report_path, schema, write_report, EngineConfig, API_TOKEN_ENV};
use providers::{
    AutoMasker, HttpPointPromptClient, HttpSegmentationClient, PointLabel, PointMasker,
    PointPrompt,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

/// Class reported for masks refined from a local file
const LOCAL_MASK_CLASS: &str = "local_mask";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration (.toml or .json); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Provider API token (or set MASK_PROVIDER_TOKEN environment variable)
    #[arg(long, global = true)]
    api_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the renovation target automatically; always writes a mask
    Auto {
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        /// Where to write the mask PNG
        #[arg(short, long)]
        out: PathBuf,
        /// Where to write the coverage report (defaults to <out>.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Segment the object under a single click
    Point {
        /// Path to the input image
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        x: u32,
        #[arg(short, long)]
        y: u32,
        /// Treat the click as background instead of foreground
        #[arg(long)]
        background: bool,
        /// Where to write the mask PNG
        #[arg(short, long)]
        out: PathBuf,
        /// Where to write the coverage report (defaults to <out>.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Clean a provider mask from disk and apply the safety gates, offline
    Refine {
        /// Path to the provider mask image
        #[arg(short, long)]
        mask: PathBuf,
        /// Where to write the refined mask PNG
        #[arg(short, long)]
        out: PathBuf,
        /// Where to write the coverage report (defaults to <out>.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the JSON schema of the engine configuration
    Schema,
    /// Write the default engine configuration to a .toml or .json file
    InitConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Auto { image, out, report } => {
            let config = load_config(&cli)?;
            auto_mask(&config, image, out, report.as_deref()).await?;
        }
        Commands::Point {
            image,
            x,
            y,
            background,
            out,
            report,
        } => {
            let config = load_config(&cli)?;
            let label = if *background {
                PointLabel::Background
            } else {
                PointLabel::Foreground
            };
            let prompt = PointPrompt { x: *x, y: *y, label };
            point_mask(&config, image, prompt, out, report.as_deref()).await?;
        }
        Commands::Refine { mask, out, report } => {
            let config = load_config(&cli)?;
            refine_mask(&config, mask, out, report.as_deref())?;
        }
        Commands::Schema => {
            println!("{}", schema()?);
        }
        Commands::InitConfig { path } => {
            EngineConfig::default().to_file(path)?;
            info!("Wrote default configuration to {:?}", path);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .wrap_err_with(|| format!("Failed to load configuration {:?}", path))?,
        None => EngineConfig::default(),
    };
    Ok(config.with_api_token(cli.api_token.clone(), std::env::var(API_TOKEN_ENV).ok()))
}

fn write_output(output: &AutoMaskOutput, out: &Path, report: Option<&Path>) -> Result<()> {
    std::fs::write(out, output.encode_png()?)
        .wrap_err_with(|| format!("Failed to write mask {:?}", out))?;
    let report_path = report.map(Path::to_path_buf).unwrap_or_else(|| default_report_path(out));
    write_report(&report_path, &output.report)?;

    info!(
        "Wrote {:?} ({:.1}% coverage, classes {:?}) and report {:?}",
        out, output.report.coverage_pct, output.report.classes_used, report_path
    );
    Ok(())
}

async fn auto_mask(
    config: &EngineConfig,
    image_path: &Path,
    out: &Path,
    report: Option<&Path>,
) -> Result<()> {
    let image = std::fs::read(image_path)
        .wrap_err_with(|| format!("Failed to read image {:?}", image_path))?;

    let pipeline = AutoMaskPipeline::from_config(&config.pipeline)?;
    info!("{}", pipeline.info());

    let client = HttpSegmentationClient::new(&config.provider)?;
    let masker = AutoMasker::new(client, pipeline).with_provider_config(&config.provider);
    let output = masker.generate(&image).await?;

    write_output(&output, out, report)
}

async fn point_mask(
    config: &EngineConfig,
    image_path: &Path,
    prompt: PointPrompt,
    out: &Path,
    report: Option<&Path>,
) -> Result<()> {
    let image = std::fs::read(image_path)
        .wrap_err_with(|| format!("Failed to read image {:?}", image_path))?;

    let client = HttpPointPromptClient::new(&config.provider)?;
    let masker = PointMasker::new(client).with_timeout(config.provider.timeout());
    let selected = masker.generate(&image, prompt).await?;

    let output = AutoMaskOutput {
        report: selected.report(),
        mask: selected.mask,
    };
    write_output(&output, out, report)
}

fn refine_mask(config: &EngineConfig, mask_path: &Path, out: &Path, report: Option<&Path>) -> Result<()> {
    let bytes = std::fs::read(mask_path)
        .wrap_err_with(|| format!("Failed to read mask {:?}", mask_path))?;
    let mask = codec::decode_provider_mask(&bytes)?;

    let pipeline = AutoMaskPipeline::from_config(&config.pipeline)?;
    info!("{}", pipeline.info());

    let output = pipeline.refine(mask, vec![LOCAL_MASK_CLASS.to_string()]);
    write_output(&output, out, report)
}
