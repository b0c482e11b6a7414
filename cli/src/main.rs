mod config;
mod launcher;
mod ui;

use clap::{Parser, Subcommand};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = ui::app_name())]
#[command(about = ui::build_banner())]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported venues
    Venues,

    /// Show version
    Version,

    /// Run the MEV engine
    Run {
        /// Path to config.toml file
        #[arg(short, long, default_value = "config.toml")]
        config: std::path::PathBuf,
    },

    /// Validate an evidence JSONL file against the row schema
    VerifyEvidence {
        /// Evidence file path
        #[arg(long)]
        path: String,

        /// Also reject unknown keys
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tools::setup_application(env!("CARGO_PKG_NAME"))?;

    let cli = Cli::parse();

    match cli.commands {
        Commands::Version => ui::print_version(),
        Commands::Venues => ui::print_venues(),
        Commands::Run { config } => {
            launcher::start(config).await?;
        }
        Commands::VerifyEvidence { path, strict } => {
            match solana::evidence::verify_schema(&path, strict) {
                Ok(rows) => println!("ok: {rows} rows"),
                Err(e) => {
                    eprintln!("schema mismatch: {e:#}");
                    #[allow(clippy::exit)]
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
