//! Réparation des géométries de zones
//!
//! Équivalent d'un buffer de largeur nulle : les anneaux sont nettoyés, puis
//! les polygones auto-intersectés sont recomposés par une union booléenne
//! (règle de remplissage de `geo::BooleanOps`), ce qui sépare par exemple un
//! « nœud papillon » en deux triangles valides.

pub mod ring;

use geo::{Area, BooleanOps, MultiPolygon, Polygon};
use tracing::{debug, warn};

use crate::types::{ZoneId, ZoneSet};

/// Résultat de la réparation d'un ensemble de zones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairSummary {
    /// Zones dont la géométrie a été recomposée
    pub repaired: Vec<ZoneId>,
    /// Zones dont la géométrie est vide après réparation
    pub emptied: Vec<ZoneId>,
}

/// Vérifie si une géométrie est valide au sens du calcul zonal
pub fn is_valid(geometry: &MultiPolygon) -> bool {
    geometry.0.iter().all(|polygon| {
        ring::clean_polygon(polygon)
            .is_some_and(|clean| clean == *polygon && ring::is_simple(&clean))
    })
}

/// Répare une géométrie.
///
/// Retourne `None` si la géométrie était déjà valide (pas de copie), sinon la
/// géométrie réparée, éventuellement vide.
pub fn make_valid(geometry: &MultiPolygon) -> Option<MultiPolygon> {
    if is_valid(geometry) {
        return None;
    }

    let cleaned: Vec<Polygon> = geometry.0.iter().filter_map(ring::clean_polygon).collect();
    if cleaned.is_empty() {
        return Some(MultiPolygon::new(vec![]));
    }

    let cleaned = MultiPolygon::new(cleaned);
    if cleaned.0.iter().all(ring::is_simple) {
        // Seul le nettoyage des anneaux était nécessaire
        return Some(cleaned);
    }

    // Union avec un ensemble vide : résout les auto-intersections
    let unioned = cleaned.union(&MultiPolygon::new(vec![]));
    let kept: Vec<Polygon> = unioned
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();

    Some(MultiPolygon::new(kept))
}

/// Répare en place toutes les zones d'un ensemble.
///
/// Les zones gardent leur identifiant ; une zone vidée par la réparation
/// produira des statistiques manquantes plutôt qu'une erreur.
pub fn repair_zone_set(zone_set: &mut ZoneSet) -> RepairSummary {
    let mut summary = RepairSummary::default();

    for zone in &mut zone_set.zones {
        let Some(repaired) = make_valid(&zone.geometry) else {
            continue;
        };

        if repaired.0.is_empty() {
            warn!(zone = %zone.id, "Geometry is empty after repair");
            summary.emptied.push(zone.id);
        } else {
            debug!(
                zone = %zone.id,
                parts_before = zone.geometry.0.len(),
                parts_after = repaired.0.len(),
                "Invalid geometry repaired"
            );
        }

        summary.repaired.push(zone.id);
        zone.geometry = repaired;
    }

    if !summary.repaired.is_empty() {
        warn!(
            repaired = summary.repaired.len(),
            emptied = summary.emptied.len(),
            "Repaired invalid zone geometries"
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use approx::assert_relative_eq;
    use geo::polygon;
    use std::collections::HashMap;

    fn bowtie() -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    fn square() -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn test_valid_geometry_untouched() {
        assert!(is_valid(&square()));
        assert!(make_valid(&square()).is_none());
    }

    #[test]
    fn test_bowtie_repaired() {
        assert!(!is_valid(&bowtie()));

        let repaired = make_valid(&bowtie()).unwrap();
        assert!(is_valid(&repaired));
        // Les deux lobes du papillon sont conservés (aire 1 chacun)
        assert_relative_eq!(repaired.unsigned_area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_geometry_emptied() {
        let flat = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);

        let repaired = make_valid(&flat).unwrap();
        assert!(repaired.0.is_empty());
    }

    #[test]
    fn test_repair_zone_set() {
        let mut set = ZoneSet::new(
            vec![(square(), HashMap::new()), (bowtie(), HashMap::new())],
            vec![],
            Crs::Epsg(32719),
        );

        let summary = repair_zone_set(&mut set);
        assert_eq!(summary.repaired, vec![ZoneId(1)]);
        assert!(summary.emptied.is_empty());
        assert!(set.zones.iter().all(|z| is_valid(&z.geometry)));
    }
}
