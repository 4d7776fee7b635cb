mod cmd;
mod repo;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Repository maintenance tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local quality gate (check, test, fmt, clippy, schema drift, release build).
    Preflight,
    /// Regenerate the mcp.json JSON Schema.
    Schema {
        /// Output file path (defaults to docs/mcp.schema.json)
        #[arg(value_name = "OUT")]
        out: Option<std::path::PathBuf>,
    },
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Preflight => {
            cmd::preflight::run()?;
        }
        Command::Schema { out } => {
            cmd::schema::run(out)?;
        }
    }
    Ok(())
}
