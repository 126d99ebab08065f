use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mathvar_core::{AppConfig, SingleProblem};

mod commands;

use commands::Side;

#[derive(Parser)]
#[command(name = "mathvar")]
#[command(about = "Generate numeric variants of a math problem from text or images")]
struct Args {
    /// Problem text; takes precedence over --problem-image
    #[arg(long)]
    problem_text: Option<String>,

    /// Problem image to recognize (JPG, PNG, GIF, WebP, BMP)
    #[arg(long)]
    problem_image: Option<PathBuf>,

    /// Solution text; takes precedence over --solution-image
    #[arg(long)]
    solution_text: Option<String>,

    /// Solution image to recognize
    #[arg(long)]
    solution_image: Option<PathBuf>,

    /// Number of variants to generate (1-10, default from config)
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the result file is written to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Skip the OCR engine and pretend every image reads as TEXT
    #[arg(long, value_name = "TEXT")]
    dry_run_ocr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(args.config.as_deref())
        .context("failed to load config")?;

    let needs_ocr = (args.problem_image.is_some() && args.problem_text.is_none())
        || (args.solution_image.is_some() && args.solution_text.is_none());
    let pipeline = if needs_ocr {
        Some(commands::build_pipeline(&config.ocr, args.dry_run_ocr.as_deref())?)
    } else {
        None
    };

    let (problem, solution) = tokio::join!(
        commands::resolve_side(
            pipeline.as_ref(),
            Side::Problem,
            args.problem_text,
            args.problem_image,
        ),
        commands::resolve_side(
            pipeline.as_ref(),
            Side::Solution,
            args.solution_text,
            args.solution_image,
        ),
    );
    let (problem_text, problem_image) = problem?;
    let (solution_text, solution_image) = solution?;

    let submission = SingleProblem {
        problem_text,
        problem_image,
        solution_text,
        solution_image,
    };
    if submission.is_empty() {
        bail!("nothing to vary: pass --problem-text or --problem-image");
    }

    let count = args.count.unwrap_or(config.variation.count);
    let batch = commands::generate(&config, &submission, count).await?;
    let path = commands::export(&args.out, &batch)?;

    println!("{} variants written to {}", batch.len() - 1, path.display());
    Ok(())
}
