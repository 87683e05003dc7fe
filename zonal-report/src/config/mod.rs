//! Configuration d'une exécution
//!
//! Chargée depuis un fichier JSON, puis surchargée par l'environnement
//! (`ZONAL_TARGET_CRS`, `ZONAL_TOLERANCE`) et enfin par la ligne de commande.
//! Construite une fois par exécution et passée explicitement à chaque étape.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;
use zonal::{Crs, Resampling, Statistic, DEFAULT_TOLERANCE};

use crate::export::OutputFormat;

/// Variable d'environnement : CRS cible
pub const ENV_TARGET_CRS: &str = "ZONAL_TARGET_CRS";
/// Variable d'environnement : tolérance de recouvrement
pub const ENV_TOLERANCE: &str = "ZONAL_TOLERANCE";

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Fichier GeoJSON des zones
    pub zones: PathBuf,

    /// Surcharge du CRS déclaré par le fichier de zones
    #[serde(default)]
    pub zones_crs: Option<Crs>,

    /// Une ou deux périodes ; deux périodes activent le calcul des différences
    pub periods: Vec<PeriodConfig>,

    /// CRS projeté cible
    #[serde(default)]
    pub target_crs: Option<Crs>,

    /// Tolérance de recouvrement (unités du CRS cible)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Statistiques demandées, dans l'ordre des colonnes
    #[serde(default = "Statistic::default_set")]
    pub statistics: Vec<Statistic>,

    #[serde(default)]
    pub resampling: Resampling,

    #[serde(default)]
    pub all_touched: bool,

    /// Colonnes d'identification ; absent = tous les attributs
    #[serde(default)]
    pub identity_fields: Option<Vec<String>>,

    #[serde(default)]
    pub include_zone_id: bool,

    /// Fichier de sortie (.xlsx ou .json)
    pub output: PathBuf,

    /// Nom de la section des différences
    #[serde(default = "default_differences_label")]
    pub differences_label: String,

    #[serde(default)]
    pub sheet_style: SheetStyle,
}

/// Une période : un raster et ses surcharges
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodConfig {
    /// Libellé (nom de la section du rapport)
    pub label: String,

    /// Fichier GeoTIFF
    pub raster: PathBuf,

    /// Surcharge du CRS déclaré par le raster
    #[serde(default)]
    pub crs: Option<Crs>,

    /// Surcharge de la valeur nodata
    #[serde(default)]
    pub nodata: Option<f64>,
}

/// Présentation du classeur, transmise au writer
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetStyle {
    pub header_bold: bool,
    pub freeze_header: bool,
    pub column_width: f64,
    /// Décimales affichées pour les statistiques
    pub stat_decimals: u8,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            header_bold: true,
            freeze_header: true,
            column_width: 16.0,
            stat_decimals: 2,
        }
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_differences_label() -> String {
    "Differences".to_string()
}

impl RunConfig {
    /// Charge une configuration depuis un fichier.
    ///
    /// Les chemins relatifs sont résolus par rapport au dossier du fichier.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Rend absolus les chemins relatifs
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.zones);
        resolve(&mut self.output);
        for period in &mut self.periods {
            resolve(&mut period.raster);
        }
    }

    /// Applique les surcharges des variables d'environnement du processus
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applique les surcharges d'environnement lues par `lookup`
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_TARGET_CRS).filter(|v| !v.trim().is_empty()) {
            self.target_crs = Some(
                value
                    .parse()
                    .with_context(|| format!("Invalid {}: {}", ENV_TARGET_CRS, value))?,
            );
        }
        if let Some(value) = lookup(ENV_TOLERANCE).filter(|v| !v.trim().is_empty()) {
            self.tolerance = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_TOLERANCE, value))?;
        }
        Ok(())
    }

    /// CRS cible (obligatoire)
    pub fn target_crs(&self) -> Result<&Crs> {
        self.target_crs.as_ref().with_context(|| {
            format!(
                "No target CRS: set target_crs in the config, {} or --target-crs",
                ENV_TARGET_CRS
            )
        })
    }

    /// Deux périodes : la section des différences est produite
    pub fn has_differences(&self) -> bool {
        self.periods.len() == 2
    }

    /// Vérifie la cohérence de la configuration
    pub fn validate(&self) -> Result<()> {
        let target = self.target_crs()?;

        if self.periods.is_empty() || self.periods.len() > 2 {
            anyhow::bail!(
                "Expected 1 or 2 periods, got {}",
                self.periods.len()
            );
        }

        let mut labels = HashSet::new();
        for period in &self.periods {
            if period.label.trim().is_empty() {
                anyhow::bail!("Period label must not be empty ({})", period.raster.display());
            }
            if !labels.insert(period.label.as_str()) {
                anyhow::bail!("Duplicate period label: {}", period.label);
            }
            if period.nodata.is_some_and(|nd| !nd.is_finite()) {
                anyhow::bail!("Nodata of period '{}' must be finite", period.label);
            }
        }
        if self.has_differences() && labels.contains(self.differences_label.as_str()) {
            anyhow::bail!(
                "Differences label '{}' is also a period label",
                self.differences_label
            );
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!("Tolerance must be a finite value >= 0, got {}", self.tolerance);
        }
        if target.is_geographic() {
            warn!(
                target_crs = %target,
                tolerance = self.tolerance,
                "Target CRS is geographic: tolerance is in degrees and cells are not equal-area"
            );
        }

        if self.statistics.is_empty() {
            anyhow::bail!("At least one statistic is required");
        }

        if OutputFormat::from_path(&self.output).is_none() {
            anyhow::bail!(
                "Unsupported output extension: {} (use .xlsx or .json)",
                self.output.display()
            );
        }

        Ok(())
    }

    /// Options d'agrégation dérivées
    pub fn zonal_options(&self) -> zonal::ZonalOptions {
        zonal::ZonalOptions {
            stats: self.statistics.clone(),
            all_touched: self.all_touched,
        }
    }

    /// Options d'assemblage dérivées
    pub fn assembly_options(&self) -> zonal::AssemblyOptions {
        zonal::AssemblyOptions {
            identity_fields: self.identity_fields.clone(),
            include_zone_id: self.include_zone_id,
        }
    }
}
