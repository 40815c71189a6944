//! Scan command - recognize receipts and append them to the draft.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use kabala_core::{ExpenseField, PureOcrEngine};

use super::Context;

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Receipt files (images or PDF) or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Description for the added entries
    #[arg(short, long)]
    description: Option<String>,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Stop at the first receipt that fails
    #[arg(long)]
    fail_fast: bool,
}

pub async fn run(args: ScanArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();
    let files = expand_inputs(&args.inputs)?;
    let mut session = ctx.session()?;

    let mut ocr_config = ctx.config.ocr.clone();
    if let Some(dir) = args.model_dir {
        ocr_config.model_dir = dir;
    }
    let engine = PureOcrEngine::from_config(&ocr_config).map_err(|e| {
        anyhow::anyhow!(
            "{}\nSet the model directory with --model-dir or 'kabala config set ocr.model_dir <DIR>'.",
            e
        )
    })?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut added = Vec::new();
    let mut failed = 0;

    for path in &files {
        pb.set_message(path.display().to_string());

        match session.process_upload(path, &engine) {
            Ok(index) => {
                if let Some(description) = &args.description {
                    session.update(index, ExpenseField::Description, description);
                }
                added.push(index);
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                pb.suspend(|| {
                    eprintln!("{} {}: {}", style("✗").red(), path.display(), e);
                });
                failed += 1;
                if args.fail_fast {
                    break;
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    for &index in &added {
        if let Some(entry) = session.entries().get(index) {
            let amount = if entry.amount.is_empty() {
                style("(no amount found)").yellow().to_string()
            } else {
                entry.amount.clone()
            };
            println!(
                "{} #{} {} {}",
                style("✓").green(),
                index + 1,
                entry.date,
                amount
            );
        }
    }

    ctx.save_session(session)?;
    debug!("Scan finished in {:?}", start.elapsed());

    println!(
        "{} Added {} receipt(s), {} failed",
        style("ℹ").blue(),
        added.len(),
        failed
    );

    if added.is_empty() && failed > 0 {
        anyhow::bail!("No receipts could be processed");
    }
    Ok(())
}

/// Expand glob patterns; plain paths pass through so missing files are
/// reported by the session.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            files.push(PathBuf::from(input));
            continue;
        }

        let matched: Vec<PathBuf> = glob(input)?.filter_map(|r| r.ok()).collect();
        if matched.is_empty() {
            warn!("No files match {}", input);
        }
        files.extend(matched);
    }

    if files.is_empty() {
        anyhow::bail!("No matching files found");
    }
    Ok(files)
}
