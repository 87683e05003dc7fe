//! Validation du recouvrement entre zones et raster

use tracing::info;

use crate::error::{Result, ZonalError};
use crate::types::{Bounds, ZoneSet};

/// Tolérance par défaut, en unités du CRS cible
pub const DEFAULT_TOLERANCE: f64 = 1000.0;

/// Vérifie que l'emprise des zones, agrandie de `tolerance` de chaque côté,
/// intersecte l'emprise du raster (bords inclus).
pub fn check_overlap(zones: &Bounds, raster: &Bounds, tolerance: f64) -> Result<()> {
    if zones.expand(tolerance).intersects(raster) {
        info!(zones = %zones, raster = %raster, tolerance, "Overlap check passed");
        Ok(())
    } else {
        Err(ZonalError::Overlap {
            zones: *zones,
            raster: *raster,
            tolerance,
        })
    }
}

/// Valide le recouvrement d'un ensemble de zones avec l'emprise d'un raster
pub fn validate_overlap(zone_set: &ZoneSet, raster: &Bounds, tolerance: f64) -> Result<()> {
    // Un ensemble sans géométrie exploitable ne recouvre rien
    let zones = zone_set.bounds().ok_or_else(|| ZonalError::Overlap {
        zones: Bounds::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN),
        raster: *raster,
        tolerance,
    })?;
    check_overlap(&zones, raster, tolerance)
}
