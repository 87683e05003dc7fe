//! Orchestration d'une exécution
//!
//! Entrées vérifiées -> zones chargées, réparées, reprojetées -> pour chaque
//! période : raster chargé, reprojeté, recouvrement validé, agrégé ->
//! différences (deux périodes) -> assemblage -> écriture. Toute erreur est
//! fatale et rien n'est écrit avant la fin.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use zonal::fingerprint;
use zonal::{AnyGrid, Crs, Report, ZoneSet, ZoneStatistics};

use crate::config::{PeriodConfig, RunConfig};
use crate::export::writer_for_path;
use crate::report::{PeriodSummary, RunReport};

/// Résultat d'un calcul complet, avant écriture
#[derive(Debug)]
pub struct RunOutput {
    pub report: Report,
    pub tables: Vec<(String, ZoneStatistics)>,
    pub run: RunReport,
}

/// Vérifie l'existence des fichiers d'entrée et du dossier de sortie
pub fn check_inputs(config: &RunConfig) -> Result<()> {
    zonal::io::require_file(&config.zones).context("Zones file")?;
    for period in &config.periods {
        zonal::io::require_file(&period.raster)
            .with_context(|| format!("Raster of period '{}'", period.label))?;
    }

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            anyhow::bail!("Output directory does not exist: {}", parent.display());
        }
    }
    Ok(())
}

/// Charge les zones, répare les géométries et les exprime dans le CRS cible
pub fn prepare_zones(config: &RunConfig, target: &Crs, run: &mut RunReport) -> Result<ZoneSet> {
    let mut zones = zonal::io::read_zones(&config.zones, config.zones_crs.as_ref())
        .with_context(|| format!("Failed to load zones: {}", config.zones.display()))?;

    let repair = zonal::repair::repair_zone_set(&mut zones);
    run.record_repair(&repair);

    let zones = zonal::reconcile_zones(zones, target).context("Failed to reproject zones")?;

    run.zones = zones.len();
    run.fingerprint = Some(fingerprint::to_hex(&fingerprint::zone_set_fingerprint(&zones)));
    Ok(zones)
}

/// Charge le raster d'une période, le reprojette et valide le recouvrement
pub fn prepare_period(
    config: &RunConfig,
    period: &PeriodConfig,
    zones: &ZoneSet,
    target: &Crs,
) -> Result<(AnyGrid, PeriodSummary)> {
    let grid = zonal::io::read_grid(&period.raster, period.crs.as_ref(), period.nodata)
        .with_context(|| format!("Failed to load raster: {}", period.raster.display()))?;

    let source_crs = grid.crs().to_string();
    let reprojected = grid.crs() != target;

    let grid = zonal::reproject_any(grid, target, config.resampling)
        .with_context(|| format!("Failed to reproject raster of period '{}'", period.label))?;

    zonal::validate_overlap(zones, &grid.bounds(), config.tolerance)
        .with_context(|| format!("Period '{}'", period.label))?;

    let summary = PeriodSummary {
        label: period.label.clone(),
        raster: period.raster.display().to_string(),
        dtype: grid.dtype().to_string(),
        width: grid.width(),
        height: grid.height(),
        source_crs,
        reprojected,
        missing_zones: Vec::new(),
    };
    Ok((grid, summary))
}

/// Calcule toutes les sections du rapport sans rien écrire
pub fn compute(config: &RunConfig) -> Result<RunOutput> {
    let start = Instant::now();
    config.validate()?;
    check_inputs(config)?;

    let target = config.target_crs()?;
    let mut run = RunReport::new(target);
    let zones = prepare_zones(config, target, &mut run)?;

    let options = config.zonal_options();
    let mut tables = Vec::with_capacity(config.periods.len() + 1);

    for period in &config.periods {
        let (grid, mut summary) = prepare_period(config, period, &zones, target)?;

        let stats = zonal::aggregate_any(&zones, &grid, &options)
            .with_context(|| format!("Aggregation failed for period '{}'", period.label))?;

        summary.missing_zones = stats.missing_zones();
        run.record_period(summary);
        tables.push((period.label.clone(), stats));
    }

    if let [(_, earlier), (_, later)] = tables.as_slice() {
        let diff = zonal::difference(earlier, later).context("Failed to compute differences")?;
        info!(
            earlier = %config.periods[0].label,
            later = %config.periods[1].label,
            "Differences computed"
        );
        tables.push((config.differences_label.clone(), diff));
    }

    let sections: Vec<(&str, &ZoneStatistics)> =
        tables.iter().map(|(name, t)| (name.as_str(), t)).collect();
    let report = zonal::assemble(&zones, &sections, &config.assembly_options())
        .context("Failed to assemble report")?;

    run.sections = report.sections.iter().map(|s| s.name.clone()).collect();
    run.set_duration(start.elapsed());

    Ok(RunOutput { report, tables, run })
}

/// Exécution complète : calcul puis écriture du rapport
pub fn run(config: &RunConfig) -> Result<RunReport> {
    let start = Instant::now();
    let writer = writer_for_path(&config.output, &config.sheet_style)?;

    let RunOutput { report, mut run, .. } = compute(config)?;

    writer
        .write(&report, &config.output)
        .with_context(|| format!("Failed to write report: {}", config.output.display()))?;
    info!(
        output = %config.output.display(),
        format = writer.name(),
        sections = report.sections.len(),
        "Report written"
    );

    run.output = Some(config.output.display().to_string());
    run.set_duration(start.elapsed());
    run.finalize(false);
    Ok(run)
}

/// Vérification à blanc : entrées, CRS, reprojection et recouvrement, sans agrégation
pub fn check(config: &RunConfig) -> Result<RunReport> {
    let start = Instant::now();
    config.validate()?;
    check_inputs(config)?;

    let target = config.target_crs()?;
    let mut run = RunReport::new(target);
    let zones = prepare_zones(config, target, &mut run)?;

    for period in &config.periods {
        let (_, summary) = prepare_period(config, period, &zones, target)?;
        run.record_period(summary);
    }

    run.set_duration(start.elapsed());
    run.finalize(true);
    Ok(run)
}
