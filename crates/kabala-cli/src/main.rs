//! CLI for scanning receipts into Hebrew expense reimbursement reports.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, edit, employee, export, list, scan, Context};

/// Kabala - turn receipt photos into an expense reimbursement report
#[derive(Parser)]
#[command(name = "kabala")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Directory holding the employee profile and the draft report
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or set the employee details printed on the report
    Employee(employee::EmployeeArgs),

    /// Recognize receipts and add them to the draft report
    Scan(scan::ScanArgs),

    /// Edit a field of a draft entry
    Edit(edit::EditArgs),

    /// List draft entries and the running total
    List(list::ListArgs),

    /// Write the report PDF
    Export(export::ExportArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let load = || Context::load(cli.config.as_deref(), cli.data_dir.as_deref());

    // Execute command
    match cli.command {
        Commands::Employee(args) => employee::run(args, &load()?).await,
        Commands::Scan(args) => scan::run(args, &load()?).await,
        Commands::Edit(args) => edit::run(args, &load()?).await,
        Commands::List(args) => list::run(args, &load()?).await,
        Commands::Export(args) => export::run(args, &load()?).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
