//! List command - review draft entries and the running total.

use clap::Args;
use console::style;

use kabala_core::models::format_amount;
use kabala_core::report::format_date;

use super::Context;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Print entries as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let draft = ctx.load_draft()?;
    let store = &draft.store;

    if args.json {
        println!("{}", serde_json::to_string_pretty(store.as_slice())?);
        return Ok(());
    }

    if store.is_empty() {
        println!("{} The draft is empty. Add receipts with 'kabala scan'.", style("ℹ").blue());
        return Ok(());
    }

    println!(
        "{:>3}  {:<10}  {:>10}  {:<30}  {}",
        "#", "Date", "Amount", "Description", "Receipt"
    );
    for (index, entry) in store.iter().enumerate() {
        let amount = if entry.parsed_amount().is_some() {
            style(entry.amount.clone())
        } else {
            // Shown as entered; counts as zero
            style(format!("{:?}", entry.amount)).yellow()
        };
        println!(
            "{:>3}  {:<10}  {:>10}  {:<30}  {}",
            index + 1,
            format_date(&entry.date),
            amount,
            entry.description,
            entry.attachment.as_ref().map(|a| a.as_str()).unwrap_or("-")
        );
    }

    println!();
    println!(
        "Total: {} {}",
        style(format_amount(store.total())).bold(),
        ctx.config.report.currency_symbol
    );

    Ok(())
}
