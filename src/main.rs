//! banknote CLI: classify banknote images as real or counterfeit.

use std::path::{Path, PathBuf};

use banknote_auth::{
    BanknoteInspector, DEFAULT_MODEL_PATH, FeatureVector, InspectorConfig,
    analysis::{edges::EdgeRenderer, features::FeatureExtractor},
    report::{FailedReport, JsonReport},
};
use clap::{Args, Parser, Subcommand};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "banknote")]
#[command(about = "Detect counterfeit banknotes from Sobel edge statistics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one or more banknote images.
    Classify(ClassifyArgs),

    /// Print the four gradient features of an image.
    Features {
        /// Path to the input image.
        image: PathBuf,
    },

    /// Write the normalized edge-magnitude image.
    Edges {
        /// Path to the input image.
        image: PathBuf,

        /// Output image path (format from extension).
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    /// Images to classify.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Path to the serialized model (JSON).
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Emit a JSON array of reports instead of status lines.
    #[arg(long)]
    json: bool,

    /// Process images one after another.
    #[arg(long)]
    sequential: bool,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify(args) => run_classify(&args),
        Commands::Features { image } => run_features(&image),
        Commands::Edges { image, out } => run_edges(&image, &out),
    }
}

// ── classify ───────────────────────────────────────────────────────────

fn run_classify(args: &ClassifyArgs) -> CliResult<()> {
    let inspector = BanknoteInspector::with_config(InspectorConfig {
        model_path: args.model.clone(),
        parallel: !args.sequential,
        render_edges: false,
    });

    let results = inspector.inspect_many(&args.images);

    if args.json {
        let mut entries = Vec::with_capacity(results.len());
        for (path, result) in &results {
            let value = match result {
                Ok(report) => serde_json::to_value(JsonReport::from(report))?,
                Err(e) => serde_json::to_value(FailedReport::new(path.display().to_string(), e))?,
            };
            entries.push(value);
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (path, result) in &results {
        let status = match result {
            Ok(report) => report.status(),
            Err(e) => format!("Error: {}", e),
        };
        println!("{}: {}", path.display(), status);
    }

    Ok(())
}

// ── features ───────────────────────────────────────────────────────────

fn run_features(image: &Path) -> CliResult<()> {
    let features = match FeatureExtractor::extract(image) {
        Ok(features) => features,
        Err(e) => {
            println!("{}: Error: {}", image.display(), e);
            return Ok(());
        }
    };

    println!("{}", image.display());
    for (name, value) in FeatureVector::NAMES.iter().zip(features.to_array()) {
        println!("  {:<10} {:.6}", name, value);
    }

    Ok(())
}

// ── edges ──────────────────────────────────────────────────────────────

fn run_edges(image: &Path, out: &Path) -> CliResult<()> {
    match EdgeRenderer::render_edges(image) {
        Ok(edges) => {
            edges.save(out)?;
            println!(
                "{}: edges written to {} (peak magnitude {:.4})",
                image.display(),
                out.display(),
                edges.max_magnitude
            );
        }
        Err(e) => println!("{}: Error: {}", image.display(), e),
    }

    Ok(())
}
