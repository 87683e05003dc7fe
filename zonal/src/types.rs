//! Types de données pour le crate zonal

use std::collections::HashMap;
use std::fmt;

use geo::{BoundingRect, MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;

/// Identifiant stable d'une zone (son rang dans le `ZoneSet` d'origine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub usize);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Valeur d'attribut d'une zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl AttributeValue {
    /// Convertit une valeur JSON (propriété GeoJSON) en attribut
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            // Tableaux et objets imbriqués : conservés sous forme de texte JSON
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Null => Ok(()),
        }
    }
}

/// Une zone : géométrie polygonale et attributs
#[derive(Debug, Clone)]
pub struct Zone {
    /// Identifiant stable
    pub id: ZoneId,

    /// Géométrie (toujours normalisée en MultiPolygon)
    pub geometry: MultiPolygon<f64>,

    /// Attributs de la zone (champ -> valeur)
    pub attributes: HashMap<String, AttributeValue>,
}

impl Zone {
    /// Valeur d'un attribut, `Null` si absent
    pub fn attribute(&self, field: &str) -> &AttributeValue {
        const NULL: &AttributeValue = &AttributeValue::Null;
        self.attributes.get(field).unwrap_or(NULL)
    }
}

/// Ensemble ordonné de zones partageant un même CRS
#[derive(Debug, Clone)]
pub struct ZoneSet {
    /// Zones, dans l'ordre de la source
    pub zones: Vec<Zone>,

    /// Noms des champs attributaires, dans l'ordre de première apparition
    pub fields: Vec<String>,

    /// Système de coordonnées des géométries
    pub crs: Crs,
}

impl ZoneSet {
    /// Construit un ensemble en attribuant les identifiants par position
    pub fn new(
        geometries: Vec<(MultiPolygon<f64>, HashMap<String, AttributeValue>)>,
        fields: Vec<String>,
        crs: Crs,
    ) -> Self {
        let zones = geometries
            .into_iter()
            .enumerate()
            .map(|(i, (geometry, attributes))| Zone {
                id: ZoneId(i),
                geometry,
                attributes,
            })
            .collect();

        Self { zones, fields, crs }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Recherche une zone par identifiant
    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        // Les identifiants sont attribués par position : accès direct, puis recherche
        match self.zones.get(id.0) {
            Some(zone) if zone.id == id => Some(zone),
            _ => self.zones.iter().find(|z| z.id == id),
        }
    }

    /// Emprise totale des zones (None si aucune géométrie non vide)
    pub fn bounds(&self) -> Option<Bounds> {
        self.zones
            .iter()
            .filter_map(|z| z.geometry.bounding_rect())
            .map(Bounds::from)
            .reduce(|a, b| a.union(&b))
    }
}

/// Emprise rectangulaire (xmin, ymin, xmax, ymax)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Agrandit l'emprise de `distance` de chaque côté
    pub fn expand(&self, distance: f64) -> Self {
        Self {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
        }
    }

    /// Intersection de rectangles, bords inclus
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Plus petite emprise contenant les deux
    pub fn union(&self, other: &Bounds) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Emprise de points quelconques
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(x, y)| Bounds::new(x, y, x, y))
            .reduce(|a, b| a.union(&b))
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}, {:.3}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn test_zone_ids_follow_position() {
        let set = ZoneSet::new(
            vec![
                (square(0.0, 0.0, 1.0), HashMap::new()),
                (square(5.0, 5.0, 1.0), HashMap::new()),
            ],
            vec![],
            Crs::Epsg(32719),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.zones[1].id, ZoneId(1));
        assert!(set.get(ZoneId(1)).is_some());
        assert!(set.get(ZoneId(2)).is_none());
    }

    #[test]
    fn test_zone_set_bounds() {
        let set = ZoneSet::new(
            vec![
                (square(0.0, 0.0, 1.0), HashMap::new()),
                (square(5.0, 5.0, 1.0), HashMap::new()),
            ],
            vec![],
            Crs::Epsg(32719),
        );

        assert_eq!(set.bounds(), Some(Bounds::new(0.0, 0.0, 6.0, 6.0)));
    }

    #[test]
    fn test_bounds_intersects_inclusive() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let touching = Bounds::new(1.0, 0.0, 2.0, 1.0);
        let apart = Bounds::new(2.0, 0.0, 3.0, 1.0);

        assert!(a.intersects(&touching));
        assert!(!a.intersects(&apart));
        assert!(a.expand(1.0).intersects(&apart));
    }

    #[test]
    fn test_attribute_from_json() {
        assert_eq!(
            AttributeValue::from_json(&serde_json::json!("Maipo")),
            AttributeValue::Text("Maipo".to_string())
        );
        assert_eq!(
            AttributeValue::from_json(&serde_json::json!(13)),
            AttributeValue::Integer(13)
        );
        assert_eq!(
            AttributeValue::from_json(&serde_json::json!(1.5)),
            AttributeValue::Float(1.5)
        );
        assert_eq!(
            AttributeValue::from_json(&serde_json::Value::Null),
            AttributeValue::Null
        );
    }
}
