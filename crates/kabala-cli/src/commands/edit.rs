//! Edit command - change one field of a draft entry.

use clap::Args;
use console::style;

use kabala_core::ExpenseField;

use super::Context;

/// Arguments for the edit command.
#[derive(Args)]
pub struct EditArgs {
    /// Entry number as shown by 'kabala list'
    number: usize,

    /// Field to change (amount, date, description)
    field: ExpenseField,

    /// New value
    value: String,
}

pub async fn run(args: EditArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut draft = ctx.load_draft()?;

    let index = args.number.checked_sub(1);
    let updated = index.is_some_and(|i| draft.store.update(i, args.field, &args.value));
    if !updated {
        anyhow::bail!(
            "No entry #{} ({} entries in the draft)",
            args.number,
            draft.store.len()
        );
    }

    ctx.save_draft(&draft)?;

    if let Some(entry) = index.and_then(|i| draft.store.get(i)) {
        let value = match args.field {
            ExpenseField::Amount => &entry.amount,
            ExpenseField::Date => &entry.date,
            ExpenseField::Description => &entry.description,
        };
        println!(
            "{} #{} {} = {}",
            style("✓").green(),
            args.number,
            args.field,
            value
        );
    }

    Ok(())
}
