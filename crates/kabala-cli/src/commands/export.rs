//! Export command - render the draft into the report PDF.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use kabala_core::models::format_amount;
use kabala_core::{FileAttachments, GlyphRasterizer, PdfReportWriter};

use super::Context;

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: report.output_file from config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Font used for report text (TTF/OTF; default: bundled DejaVu Sans)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Print a mailto link for sending the report
    #[arg(long)]
    mail: bool,

    /// Discard the draft after a successful export
    #[arg(long)]
    clear: bool,
}

pub async fn run(args: ExportArgs, ctx: &Context) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let report = &ctx.config.report;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&report.output_file));

    let writer = PdfReportWriter::new().with_jpeg_quality(report.jpeg_quality);
    let writer = match args.font.or_else(|| report.font_path.clone()) {
        Some(font) => {
            info!("Rasterizing text with {}", font.display());
            writer.with_rasterizer(Box::new(GlyphRasterizer::from_file(&font)?))
        }
        None => writer.with_bundled_font()?,
    };

    session.export_to(&output, &FileAttachments, &writer)?;

    println!(
        "{} Wrote {} ({} entries, total {} {})",
        style("✓").green(),
        output.display(),
        session.entries().len(),
        format_amount(session.total()),
        report.currency_symbol
    );

    if args.mail {
        println!();
        println!("{}", session.mail_link());
        println!(
            "{} Attach {} in your mail client before sending.",
            style("ℹ").blue(),
            output.display()
        );
    }

    if args.clear {
        ctx.clear_draft()?;
        println!("{} Draft cleared", style("✓").green());
    }

    Ok(())
}
