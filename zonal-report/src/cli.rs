//! Définition et implémentation des commandes CLI
//!
//! - `run` : calcul complet et écriture du rapport
//! - `check` : vérification à blanc (entrées, CRS, recouvrement)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;
use zonal::{Crs, Resampling, Statistic};

use crate::config::RunConfig;
use crate::pipeline;
use crate::report::RunReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Compute zonal statistics and write the report
    Run {
        #[command(flatten)]
        overrides: ConfigArgs,

        /// Output file (.xlsx or .json), overrides the config
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check inputs, CRS and overlap without aggregating
    Check {
        #[command(flatten)]
        overrides: ConfigArgs,
    },
}

/// Fichier de configuration et surcharges communes
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the JSON run configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Target CRS (e.g. EPSG:32719)
    #[arg(long)]
    pub target_crs: Option<Crs>,

    /// Overlap tolerance in target CRS units
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Comma-separated statistics (e.g. min,max,mean,p90)
    #[arg(long, value_delimiter = ',')]
    pub statistics: Option<Vec<String>>,

    /// Resampling method: nearest, bilinear or cubic
    #[arg(long)]
    pub resampling: Option<Resampling>,

    /// Include every cell touched by a zone
    #[arg(long)]
    pub all_touched: bool,
}

impl ConfigArgs {
    /// Charge la configuration : fichier, puis environnement, puis arguments
    pub fn load(&self) -> Result<RunConfig> {
        let mut config = RunConfig::load(&self.config)?;
        config.apply_env()?;
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Applique les surcharges de la ligne de commande
    pub fn apply(&self, config: &mut RunConfig) -> Result<()> {
        if let Some(crs) = &self.target_crs {
            config.target_crs = Some(crs.clone());
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(names) = &self.statistics {
            config.statistics = Statistic::parse_list(names).context("Invalid --statistics")?;
        }
        if let Some(resampling) = self.resampling {
            config.resampling = resampling;
        }
        if self.all_touched {
            config.all_touched = true;
        }
        Ok(())
    }
}

/// Exécute la commande run
pub fn cmd_run(overrides: &ConfigArgs, output: Option<&Path>, report_path: Option<&Path>) -> Result<RunReport> {
    let mut config = overrides.load()?;
    if let Some(output) = output {
        config.output = output.to_path_buf();
    }

    info!(
        config = %overrides.config.display(),
        zones = %config.zones.display(),
        periods = config.periods.len(),
        output = %config.output.display(),
        "Starting run"
    );

    let run = pipeline::run(&config)?;

    info!(summary = %run.summary(), "Run finished");
    if let Some(path) = report_path {
        run.save_to_file(path)?;
        info!(path = %path.display(), "Run report saved");
    }
    run.display();

    Ok(run)
}

/// Exécute la commande check
pub fn cmd_check(overrides: &ConfigArgs) -> Result<RunReport> {
    let config = overrides.load()?;

    info!(config = %overrides.config.display(), "Checking configuration");
    let run = pipeline::check(&config)?;
    run.display();

    Ok(run)
}
