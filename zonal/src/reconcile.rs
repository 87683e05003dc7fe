//! Alignement du CRS des zones sur le CRS cible

use tracing::{debug, info};

use crate::crs::Crs;
use crate::error::Result;
use crate::reproject::Reprojector;
use crate::types::ZoneSet;

/// Reprojette les zones dans `target`.
///
/// Sans effet si les zones sont déjà dans ce CRS. Les identifiants, les
/// attributs et l'ordre des zones sont conservés.
pub fn reconcile_zones(mut zone_set: ZoneSet, target: &Crs) -> Result<ZoneSet> {
    if zone_set.crs == *target {
        debug!(crs = %target, "Zones already in target CRS");
        return Ok(zone_set);
    }

    let reprojector = Reprojector::new(&zone_set.crs, target)?;
    info!(
        from = %zone_set.crs,
        to = %target,
        zones = zone_set.len(),
        method = reprojector.description(),
        "Reprojecting zones"
    );

    for zone in &mut zone_set.zones {
        zone.geometry = reprojector.transform_multipolygon(&zone.geometry)?;
    }
    zone_set.crs = target.clone();

    Ok(zone_set)
}
