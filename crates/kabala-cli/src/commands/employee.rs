//! Employee command - show or set the details printed on the report.

use clap::Args;
use console::style;

use kabala_core::EmployeeDetails;

use super::Context;

/// Arguments for the employee command.
#[derive(Args)]
pub struct EmployeeArgs {
    /// Full name
    #[arg(long, requires = "id")]
    name: Option<String>,

    /// Employee number
    #[arg(long, requires = "name")]
    id: Option<String>,
}

pub async fn run(args: EmployeeArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut profile = ctx.profile()?;

    if let (Some(name), Some(id)) = (args.name, args.id) {
        let details = EmployeeDetails::new(name, id)?;
        profile.set_employee(details.clone())?;
        println!(
            "{} Saved employee {} ({})",
            style("✓").green(),
            details.name,
            details.id
        );
        return Ok(());
    }

    match profile.employee() {
        Some(details) => {
            println!("Name: {}", details.name);
            println!("ID:   {}", details.id);
        }
        None => {
            println!("{} No employee details saved.", style("ℹ").blue());
        }
    }

    Ok(())
}
