//! Nettoyage des anneaux et détection des auto-intersections

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString, Polygon};

/// Compare deux coordonnées avec tolérance
fn coords_equal(a: Coord, b: Coord) -> bool {
    const TOLERANCE: f64 = 1e-9;
    (a.x - b.x).abs() < TOLERANCE && (a.y - b.y).abs() < TOLERANCE
}

/// Nettoie un anneau : supprime les points non finis et les doublons
/// consécutifs, puis le ferme.
///
/// Retourne `None` si l'anneau a moins de 3 sommets distincts.
pub fn clean_ring(ring: &LineString) -> Option<LineString> {
    let mut coords: Vec<Coord> = Vec::with_capacity(ring.0.len() + 1);
    for &c in ring.0.iter() {
        if !(c.x.is_finite() && c.y.is_finite()) {
            continue;
        }
        if coords.last().is_some_and(|&last| coords_equal(last, c)) {
            continue;
        }
        coords.push(c);
    }

    // Retirer la fermeture éventuelle pour compter les sommets distincts
    while coords.len() > 1 && coords_equal(coords[0], coords[coords.len() - 1]) {
        coords.pop();
    }

    if coords.len() < 3 {
        return None;
    }

    let first = coords[0];
    coords.push(first);
    Some(LineString::new(coords))
}

/// Nettoie tous les anneaux d'un polygone.
///
/// Un extérieur dégénéré élimine le polygone ; un trou dégénéré est ignoré.
pub fn clean_polygon(polygon: &Polygon) -> Option<Polygon> {
    let exterior = clean_ring(polygon.exterior())?;
    let interiors = polygon.interiors().iter().filter_map(clean_ring).collect();
    Some(Polygon::new(exterior, interiors))
}

/// Vérifie qu'aucun segment du polygone n'en croise un autre.
///
/// Tous les anneaux (extérieur et trous) sont testés ensemble : un trou qui
/// touche ou traverse l'extérieur est signalé comme invalide. Les anneaux
/// doivent être fermés (voir [`clean_ring`]).
pub fn is_simple(polygon: &Polygon) -> bool {
    // (segment, anneau, index dans l'anneau, nombre de segments de l'anneau)
    let mut segments: Vec<(Line, usize, usize, usize)> = Vec::new();
    for (ring_idx, ring) in std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .enumerate()
    {
        let count = ring.0.len().saturating_sub(1);
        for (i, line) in ring.lines().enumerate() {
            segments.push((line, ring_idx, i, count));
        }
    }

    // Balayage selon x : on ne compare que les segments dont les projections se chevauchent
    segments.sort_by(|a, b| {
        min_x(&a.0)
            .partial_cmp(&min_x(&b.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for i in 0..segments.len() {
        let (a, ring_a, idx_a, count_a) = segments[i];
        let a_max_x = a.start.x.max(a.end.x);

        for &(b, ring_b, idx_b, _) in &segments[i + 1..] {
            if min_x(&b) > a_max_x {
                break;
            }

            let adjacent = ring_a == ring_b
                && (idx_a.abs_diff(idx_b) == 1 || idx_a.abs_diff(idx_b) == count_a - 1);

            match line_intersection(a, b) {
                None => {}
                // Deux segments consécutifs partagent un sommet
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return false,
            }
        }
    }

    true
}

fn min_x(line: &Line) -> f64 {
    line.start.x.min(line.end.x)
}
