//! Empreinte d'un ensemble de zones
//!
//! Chaque table de statistiques porte l'empreinte du `ZoneSet` dont elle est
//! issue : deux tables ne sont comparées ou jointes que si leurs empreintes
//! sont identiques. Les anneaux sont normalisés pour commencer au sommet
//! lexicographiquement le plus petit.

use std::cmp::Ordering;

use blake3::Hasher;
use geo::{Coord, LineString, MultiPolygon};

use crate::types::{AttributeValue, ZoneSet};

/// Empreinte blake3 (32 octets)
pub type Fingerprint = [u8; 32];

/// Calcule l'empreinte d'un ensemble de zones : identifiants, attributs
/// (dans l'ordre des champs) et géométries
pub fn zone_set_fingerprint(zone_set: &ZoneSet) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(b"ZONESET");
    hasher.update(&(zone_set.len() as u64).to_le_bytes());

    for zone in &zone_set.zones {
        hasher.update(b"ZONE");
        hasher.update(&(zone.id.0 as u64).to_le_bytes());

        for field in &zone_set.fields {
            hasher.update(b"ATTR");
            hash_str(&mut hasher, field);
            hash_attribute(&mut hasher, zone.attribute(field));
        }

        hash_multipolygon(&mut hasher, &zone.geometry);
    }

    *hasher.finalize().as_bytes()
}

/// Empreinte en hexadécimal
pub fn to_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(fingerprint)
}

fn hash_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_attribute(hasher: &mut Hasher, value: &AttributeValue) {
    match value {
        AttributeValue::Text(s) => {
            hasher.update(b"T");
            hash_str(hasher, s);
        }
        AttributeValue::Integer(i) => {
            hasher.update(b"I");
            hasher.update(&i.to_le_bytes());
        }
        AttributeValue::Float(f) => {
            hasher.update(b"F");
            hasher.update(&f.to_bits().to_le_bytes());
        }
        AttributeValue::Bool(b) => {
            hasher.update(if *b { b"B1" } else { b"B0" });
        }
        AttributeValue::Null => {
            hasher.update(b"N");
        }
    }
}

fn hash_multipolygon(hasher: &mut Hasher, mp: &MultiPolygon) {
    hasher.update(b"MULTIPOLYGON");
    for poly in mp.0.iter() {
        hasher.update(b"POLY");
        hasher.update(b"EXT");
        hash_ring_normalized(hasher, poly.exterior());
        for interior in poly.interiors() {
            hasher.update(b"INT");
            hash_ring_normalized(hasher, interior);
        }
    }
}

/// Hash un anneau en commençant au sommet (min x, puis min y)
fn hash_ring_normalized(hasher: &mut Hasher, ring: &LineString) {
    // Le dernier point d'un anneau fermé répète le premier
    let len = if ring.0.len() > 1 && ring.0.first() == ring.0.last() {
        ring.0.len() - 1
    } else {
        ring.0.len()
    };

    if len == 0 {
        return;
    }

    let min_idx = (0..len)
        .min_by(|&a, &b| {
            let ca = &ring.0[a];
            let cb = &ring.0[b];
            ca.x.partial_cmp(&cb.x)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ca.y.partial_cmp(&cb.y).unwrap_or(Ordering::Equal))
        })
        .unwrap_or(0);

    for i in 0..len {
        hash_coord(hasher, ring.0[(min_idx + i) % len]);
    }
}

/// Hash une coordonnée arrondie à 6 décimales
fn hash_coord(hasher: &mut Hasher, coord: Coord) {
    let x = (coord.x * 1_000_000.0).round() as i64;
    let y = (coord.y * 1_000_000.0).round() as i64;
    hasher.update(&x.to_le_bytes());
    hasher.update(&y.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use geo::Polygon;
    use std::collections::HashMap;

    fn zone_set(ring: Vec<(f64, f64)>, name: &str) -> ZoneSet {
        let geometry = MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])]);
        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), AttributeValue::Text(name.to_string()));
        ZoneSet::new(vec![(geometry, attributes)], vec!["name".to_string()], Crs::Epsg(32719))
    }

    fn square() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
    }

    #[test]
    fn test_same_zones_same_fingerprint() {
        assert_eq!(
            zone_set_fingerprint(&zone_set(square(), "A")),
            zone_set_fingerprint(&zone_set(square(), "A"))
        );
    }

    #[test]
    fn test_ring_start_ignored() {
        let shifted = vec![(1.0, 1.0), (0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        assert_eq!(
            zone_set_fingerprint(&zone_set(square(), "A")),
            zone_set_fingerprint(&zone_set(shifted, "A"))
        );
    }

    #[test]
    fn test_attribute_change_detected() {
        assert_ne!(
            zone_set_fingerprint(&zone_set(square(), "A")),
            zone_set_fingerprint(&zone_set(square(), "B"))
        );
    }

    #[test]
    fn test_hex() {
        let fp = zone_set_fingerprint(&zone_set(square(), "A"));
        let hex = to_hex(&fp);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
