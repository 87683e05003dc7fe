//! Rapport d'exécution
//!
//! Collecte ce qui s'est passé pendant une exécution (zones réparées, périodes,
//! zones sans valeur, avertissements) pour l'afficher en fin de run ou le
//! sauvegarder en JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use zonal::repair::RepairSummary;
use zonal::{Crs, ZoneId};

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Rapport écrit sans avertissement
    Success,
    /// Rapport écrit, avec des avertissements (zones réparées ou vides)
    SuccessWithWarnings,
    /// Vérification seule (`check`), aucun rapport écrit
    Checked,
}

/// Avertissement non fatal
#[derive(Debug, Clone, Serialize)]
pub struct RunWarning {
    /// Étape concernée (zones, libellé de période...)
    pub stage: String,
    pub message: String,
}

/// Résumé d'une période
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub label: String,
    pub raster: String,
    pub dtype: String,
    pub width: usize,
    pub height: usize,
    /// CRS d'origine du raster
    pub source_crs: String,
    pub reprojected: bool,
    /// Zones sans aucune cellule valide (vide en mode `check`)
    pub missing_zones: Vec<ZoneId>,
}

/// Rapport complet d'exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub duration_secs: f64,
    pub target_crs: String,
    /// Nombre de zones chargées
    pub zones: usize,
    pub zones_repaired: Vec<ZoneId>,
    pub zones_emptied: Vec<ZoneId>,
    /// Empreinte hexadécimale de l'ensemble de zones
    pub fingerprint: Option<String>,
    pub periods: Vec<PeriodSummary>,
    /// Sections écrites, dans l'ordre
    pub sections: Vec<String>,
    pub output: Option<String>,
    pub warnings: Vec<RunWarning>,
}

impl RunReport {
    pub fn new(target_crs: &Crs) -> Self {
        Self {
            status: RunStatus::Success,
            duration_secs: 0.0,
            target_crs: target_crs.to_string(),
            zones: 0,
            zones_repaired: Vec::new(),
            zones_emptied: Vec::new(),
            fingerprint: None,
            periods: Vec::new(),
            sections: Vec::new(),
            output: None,
            warnings: Vec::new(),
        }
    }

    /// Enregistre le résultat de la réparation des géométries
    pub fn record_repair(&mut self, summary: &RepairSummary) {
        if !summary.repaired.is_empty() {
            self.record_warning(
                "zones",
                format!("{} invalid geometries repaired", summary.repaired.len()),
            );
        }
        if !summary.emptied.is_empty() {
            self.record_warning(
                "zones",
                format!("{} geometries empty after repair", summary.emptied.len()),
            );
        }
        self.zones_repaired = summary.repaired.clone();
        self.zones_emptied = summary.emptied.clone();
    }

    /// Enregistre une période traitée
    pub fn record_period(&mut self, period: PeriodSummary) {
        if !period.missing_zones.is_empty() {
            self.record_warning(
                &period.label,
                format!("{} zones cover no valid raster cell", period.missing_zones.len()),
            );
        }
        self.periods.push(period);
    }

    pub fn record_warning(&mut self, stage: &str, message: impl Into<String>) {
        self.warnings.push(RunWarning {
            stage: stage.to_string(),
            message: message.into(),
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self, checked_only: bool) {
        self.status = if checked_only {
            RunStatus::Checked
        } else if self.warnings.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::SuccessWithWarnings
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("ZONAL STATISTICS REPORT - {}", self.target_crs);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- ZONES ---");
        println!(
            "{} zones, {} repaired, {} empty after repair",
            self.zones,
            self.zones_repaired.len(),
            self.zones_emptied.len()
        );
        if let Some(fp) = &self.fingerprint {
            println!("Fingerprint: {}", fp);
        }

        if !self.periods.is_empty() {
            println!("\n--- PERIODS ---");
            for p in &self.periods {
                println!(
                    "  {}: {} ({}x{} {}, {}{}), {} zones without data",
                    p.label,
                    p.raster,
                    p.width,
                    p.height,
                    p.dtype,
                    p.source_crs,
                    if p.reprojected { ", reprojected" } else { "" },
                    p.missing_zones.len()
                );
            }
        }

        if let Some(output) = &self.output {
            println!("\nOutput: {} ({})", output, self.sections.join(", "));
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  [{}] {}", w.stage, w.message);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} zones, {} periods, {} sections, {} warnings",
            self.zones,
            self.periods.len(),
            self.sections.len(),
            self.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(label: &str, missing: Vec<ZoneId>) -> PeriodSummary {
        PeriodSummary {
            label: label.to_string(),
            raster: "tmax.tif".to_string(),
            dtype: "f32".to_string(),
            width: 10,
            height: 10,
            source_crs: "EPSG:4326".to_string(),
            reprojected: true,
            missing_zones: missing,
        }
    }

    #[test]
    fn test_new_report() {
        let report = RunReport::new(&Crs::Epsg(32719));
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.target_crs, "EPSG:32719");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_finalize_success() {
        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.record_period(period("1981-2010", vec![]));
        report.finalize(false);
        assert_eq!(report.status, RunStatus::Success);
    }

    #[test]
    fn test_missing_zones_warn() {
        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.record_period(period("1981-2010", vec![ZoneId(3)]));
        report.finalize(false);

        assert_eq!(report.status, RunStatus::SuccessWithWarnings);
        assert_eq!(report.warnings[0].stage, "1981-2010");
    }

    #[test]
    fn test_record_repair() {
        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.record_repair(&RepairSummary {
            repaired: vec![ZoneId(0), ZoneId(2)],
            emptied: vec![ZoneId(2)],
        });

        assert_eq!(report.zones_repaired.len(), 2);
        assert_eq!(report.zones_emptied, vec![ZoneId(2)]);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_finalize_checked() {
        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.record_warning("zones", "something");
        report.finalize(true);
        assert_eq!(report.status, RunStatus::Checked);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.zones = 4;
        report.save_to_file(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["zones"], 4);
        assert_eq!(value["status"], "Success");
    }

    #[test]
    fn test_summary() {
        let mut report = RunReport::new(&Crs::Epsg(32719));
        report.zones = 12;
        assert!(report.summary().contains("12 zones"));
    }
}
