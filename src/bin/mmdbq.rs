use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mmdbq::Database;

/// Look up an IP address in a MaxMind DB file.
///
/// Prints the record attached to the longest matching prefix as JSON.
/// Exits 0 when a record was found, 1 when not, and 2 on error.
#[derive(Parser)]
#[command(name = "mmdbq", version)]
struct Cli {
    /// Path to the .mmdb database file
    #[arg(value_name = "DATABASE")]
    database: PathBuf,

    /// IP address to look up, like 128.101.101.101 or 2001:db8::1
    #[arg(value_name = "IP", required_unless_present = "metadata")]
    address: Option<String>,

    /// Print the database metadata instead of looking up an address
    #[arg(long)]
    metadata: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("mmdbq: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let db = Database::open(&cli.database)
        .with_context(|| format!("failed to open {}", cli.database.display()))?;

    if cli.metadata {
        println!("{}", serde_json::to_string_pretty(db.metadata())?);
        return Ok(true);
    }

    let Some(address) = cli.address.as_deref() else {
        bail!("an IP address is required");
    };

    match db
        .lookup(address)
        .with_context(|| format!("lookup failed for {address}"))?
    {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(true)
        }
        None => {
            eprintln!("mmdbq: no record for {address}");
            Ok(false)
        }
    }
}
