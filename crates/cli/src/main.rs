use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eval::{
    build_complaint_evaluator, ElementsEvaluator, ElementsSummary, EvalConfig, EvaluationSummary,
};
use extract::{CitationExtractor, Extractor, OpenAiClient, StructuredLlm};
use ingest::FileReader;

#[derive(Parser)]
#[command(name = "citecheck")]
#[command(about = "Citation hallucination evaluation for generated legal complaints")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract citations from complaints and print them
    Extract {
        /// Directory containing .txt complaints
        #[arg(long, default_value = "data/complaints")]
        input_dir: PathBuf,

        #[arg(long)]
        model: Option<String>,
    },

    /// Validate citations and evaluate proposition support
    Evaluate {
        #[arg(long, default_value = "data/complaints")]
        input_dir: PathBuf,

        #[arg(long)]
        extraction_model: Option<String>,

        #[arg(long)]
        evaluation_model: Option<String>,

        /// Documents evaluated in parallel
        #[arg(long)]
        workers: Option<usize>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Check that complaints plead every element of their cause of action
    EvaluateElements {
        #[arg(long, default_value = "data/complaints")]
        input_dir: PathBuf,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        workers: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = EvalConfig::from_env();

    match cli.command {
        Commands::Extract { input_dir, model } => {
            if let Some(model) = model {
                config.models.extraction = model;
            }
            cmd_extract(&config, &input_dir).await
        }
        Commands::Evaluate {
            input_dir,
            extraction_model,
            evaluation_model,
            workers,
            cache_dir,
        } => {
            if let Some(model) = extraction_model {
                config.models.extraction = model;
            }
            if let Some(model) = evaluation_model {
                config.models.evaluation = model;
            }
            if let Some(workers) = workers {
                config.concurrency.max_workers = workers;
            }
            if let Some(dir) = cache_dir {
                config.cache.dir = dir;
            }
            cmd_evaluate(&config, &input_dir).await
        }
        Commands::EvaluateElements {
            input_dir,
            model,
            workers,
        } => {
            if let Some(model) = model {
                config.models.elements = model;
            }
            if let Some(workers) = workers {
                config.concurrency.max_workers = workers;
            }
            cmd_evaluate_elements(&config, &input_dir).await
        }
    }
}

fn llm_client() -> Result<Arc<dyn StructuredLlm>> {
    let client = OpenAiClient::from_env().context("Failed to configure the OpenAI client")?;
    Ok(Arc::new(client))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }
    Ok(())
}

async fn cmd_extract(config: &EvalConfig, input_dir: &Path) -> Result<()> {
    ensure_dir(input_dir)?;

    let files = FileReader::list_complaints(input_dir).await?;
    if files.is_empty() {
        println!("No complaint files found in {}", input_dir.display());
        return Ok(());
    }

    println!("Extracting citations from {} complaints...", files.len());
    let extractor = Extractor::new(llm_client()?, config.models.extraction.clone());

    for path in files {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let text = FileReader::read_file(&path).await?;

        match extractor.extract(&text).await {
            Ok(citations) => {
                println!("\n{}: {} citations", name, citations.len());
                for citation in citations {
                    println!("  [{}] {}", citation.citation_type, citation.raw_text);
                }
            }
            Err(e) => error!(document = %name, error = %e, "Extraction failed"),
        }
    }

    Ok(())
}

async fn cmd_evaluate(config: &EvalConfig, input_dir: &Path) -> Result<()> {
    ensure_dir(input_dir)?;

    let evaluator = build_complaint_evaluator(config, llm_client()?)?;
    info!(
        extraction_model = %config.models.extraction,
        evaluation_model = %config.models.evaluation,
        workers = config.concurrency.max_workers,
        "Starting evaluation"
    );

    let results = evaluator
        .evaluate_directory(input_dir, config.concurrency.max_workers)
        .await?;

    if !results.is_empty() {
        println!("\n{}", EvaluationSummary::from_results(&results));
    }

    let metrics = evaluator.validator().metrics().snapshot();
    println!("Validation metrics: {}", serde_json::to_string(&metrics)?);

    Ok(())
}

async fn cmd_evaluate_elements(config: &EvalConfig, input_dir: &Path) -> Result<()> {
    ensure_dir(input_dir)?;

    let evaluator = ElementsEvaluator::new(llm_client()?, config.models.elements.clone());
    let results = evaluator
        .evaluate_directory(input_dir, config.concurrency.max_workers)
        .await?;

    if !results.is_empty() {
        println!("\n{}", ElementsSummary::from_results(&results));
    }

    Ok(())
}
