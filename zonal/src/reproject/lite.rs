//! Reprojection en Rust pur entre WGS84, Web Mercator et UTM

use super::mercator::{geographic_to_web_mercator, web_mercator_to_geographic};
use super::utm::{geographic_to_utm, parse_utm_epsg, utm_to_geographic};
use super::Geographic;

/// Système de coordonnées pris en charge sans PROJ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteCrs {
    /// WGS84 géographique (EPSG:4326), ordre lon/lat en degrés
    Geographic,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM WGS84 (EPSG:326xx / 327xx)
    Utm { zone: u32, south: bool },
}

impl LiteCrs {
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Geographic),
            3857 => Some(Self::WebMercator),
            _ => parse_utm_epsg(epsg).map(|(zone, south)| Self::Utm { zone, south }),
        }
    }

    fn unproject(self, x: f64, y: f64) -> Geographic {
        match self {
            Self::Geographic => Geographic::from_degrees(x, y),
            Self::WebMercator => web_mercator_to_geographic(x, y),
            Self::Utm { zone, south } => utm_to_geographic(x, y, zone, south),
        }
    }

    fn project(self, geo: Geographic) -> (f64, f64) {
        match self {
            Self::Geographic => geo.to_degrees(),
            Self::WebMercator => geographic_to_web_mercator(geo),
            Self::Utm { zone, south } => geographic_to_utm(geo, zone, south),
        }
    }
}

/// Reprojection légère : source → géographique → cible
#[derive(Debug, Clone, Copy)]
pub struct LiteReprojector {
    source: LiteCrs,
    target: LiteCrs,
}

impl LiteReprojector {
    /// `None` si l'un des deux EPSG n'est pas pris en charge
    pub fn new(source_epsg: u32, target_epsg: u32) -> Option<Self> {
        Some(Self {
            source: LiteCrs::from_epsg(source_epsg)?,
            target: LiteCrs::from_epsg(target_epsg)?,
        })
    }

    /// Vérifie si la paire est prise en charge
    pub fn is_supported(source_epsg: u32, target_epsg: u32) -> bool {
        LiteCrs::from_epsg(source_epsg).is_some() && LiteCrs::from_epsg(target_epsg).is_some()
    }

    /// Transforme un point.
    ///
    /// Retourne `None` pour une entrée non finie ou hors du domaine de la
    /// source (latitude au-delà des pôles).
    pub fn transform_point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !(x.is_finite() && y.is_finite()) {
            return None;
        }
        if self.source == LiteCrs::Geographic && y.abs() > 90.0 {
            return None;
        }

        let geo = self.source.unproject(x, y);
        let (tx, ty) = self.target.project(geo);
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }
}
