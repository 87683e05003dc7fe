//! Lecture des zones depuis un fichier GeoJSON

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{GeoJson, JsonObject};
use tracing::{debug, info, warn};

use super::require_file;
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::types::{AttributeValue, ZoneSet};

/// Lit un GeoJSON (`FeatureCollection`, `Feature` ou géométrie nue) en `ZoneSet`.
///
/// Seuls les polygones et multipolygones deviennent des zones (y compris
/// ceux contenus dans une `GeometryCollection`). Le CRS est `crs_override`
/// s'il est donné, sinon le membre `crs` historique du fichier, sinon
/// EPSG:4326.
pub fn read_zones(path: &Path, crs_override: Option<&Crs>) -> Result<ZoneSet> {
    require_file(path)?;

    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| ZonalError::parse_error(path.display().to_string(), e.to_string()))?;

    let (declared_crs, features) = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let crs = declared_crs(fc.foreign_members.as_ref());
            let features = fc
                .features
                .into_iter()
                .map(|f| (f.geometry, f.properties))
                .collect::<Vec<_>>();
            (crs, features)
        }
        GeoJson::Feature(f) => {
            let crs = declared_crs(f.foreign_members.as_ref());
            (crs, vec![(f.geometry, f.properties)])
        }
        GeoJson::Geometry(g) => {
            let crs = declared_crs(g.foreign_members.as_ref());
            (crs, vec![(Some(g), None)])
        }
    };

    let crs = match (crs_override, declared_crs) {
        (Some(forced), Some(declared)) if *forced != declared => {
            warn!(declared = %declared, forced = %forced, "Overriding the declared vector CRS");
            forced.clone()
        }
        (Some(forced), _) => forced.clone(),
        (None, Some(declared)) => declared,
        (None, None) => Crs::WGS84,
    };

    let mut fields: Vec<String> = Vec::new();
    let mut zones = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (index, (geometry, properties)) in features.into_iter().enumerate() {
        let Some(geometry) = geometry else {
            warn!(feature = index, "Feature without geometry skipped");
            skipped += 1;
            continue;
        };

        let geometry: Geometry<f64> = geometry.try_into().map_err(|e: geojson::Error| {
            ZonalError::parse_error(path.display().to_string(), format!("feature {}: {}", index, e))
        })?;

        let Some(multipolygon) = polygons_of(&geometry) else {
            warn!(feature = index, kind = geometry_kind(&geometry), "Non-polygon feature skipped");
            skipped += 1;
            continue;
        };

        let attributes = attributes_of(properties.as_ref(), &mut fields);
        zones.push((multipolygon, attributes));
    }

    if zones.is_empty() {
        return Err(ZonalError::EmptyVector(path.to_path_buf()));
    }

    info!(
        path = %path.display(),
        zones = zones.len(),
        skipped,
        fields = fields.len(),
        crs = %crs,
        "Zones loaded"
    );

    Ok(ZoneSet::new(zones, fields, crs))
}

/// CRS déclaré par le membre `crs` (format GeoJSON 2008)
fn declared_crs(foreign_members: Option<&JsonObject>) -> Option<Crs> {
    let name = foreign_members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    match name.parse() {
        Ok(crs) => Some(crs),
        Err(e) => {
            warn!(crs = name, error = %e, "Unrecognised declared CRS ignored");
            None
        }
    }
}

/// Extrait les polygones d'une géométrie ; `None` s'il n'y en a aucun
fn polygons_of(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    fn collect(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
        match geometry {
            Geometry::Polygon(p) => out.push(p.clone()),
            Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
            Geometry::Rect(r) => out.push(r.to_polygon()),
            Geometry::Triangle(t) => out.push(t.to_polygon()),
            Geometry::GeometryCollection(gc) => {
                for g in gc.iter() {
                    collect(g, out);
                }
            }
            _ => {}
        }
    }

    let mut polygons = Vec::new();
    collect(geometry, &mut polygons);
    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Attributs d'une feature ; enregistre les nouveaux champs dans l'ordre du fichier
fn attributes_of(
    properties: Option<&JsonObject>,
    fields: &mut Vec<String>,
) -> HashMap<String, AttributeValue> {
    let Some(properties) = properties else {
        return HashMap::new();
    };

    properties
        .iter()
        .map(|(key, value)| {
            if !fields.contains(key) {
                debug!(field = %key, "New attribute field");
                fields.push(key.clone());
            }
            (key.clone(), AttributeValue::from_json(value))
        })
        .collect()
}
