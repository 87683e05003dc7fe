//! Point d'entrée CLI pour zonal-report

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use zonal_report::cli::{self, Commands};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Statistiques zonales de rasters climatiques vers un rapport XLSX ou JSON
#[derive(Parser)]
#[command(name = "zonal-report")]
#[command(author, version)]
#[command(about = "Statistiques zonales de rasters climatiques (GeoTIFF) sur des zones (GeoJSON)")]
#[command(long_about = "Calcule des statistiques par zone pour une ou deux périodes, avec les différences entre périodes, et exporte un classeur XLSX ou un JSON.\n\nLes variables ZONAL_TARGET_CRS et ZONAL_TOLERANCE (ou un fichier .env) surchargent la configuration.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run {
            overrides,
            output,
            report,
        } => {
            cli::cmd_run(&overrides, output.as_deref(), report.as_deref())?;
        }
        Commands::Check { overrides } => {
            cli::cmd_check(&overrides)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
