//! Reprojection de coordonnées
//!
//! Le chemin léger en Rust pur couvre WGS84 (EPSG:4326), Web Mercator
//! (EPSG:3857) et les zones UTM WGS84 (EPSG:326xx / 327xx). Les autres
//! systèmes passent par PROJ si la feature `proj` est activée.

mod ellipsoid;
mod lite;
mod mercator;
#[cfg(feature = "proj")]
mod proj_backend;
mod utm;

pub use lite::{LiteCrs, LiteReprojector};

use geo::{Coord, MapCoords, MultiPolygon};

use crate::crs::Crs;
use crate::error::{Result, ZonalError};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

enum Backend {
    /// Pas de reprojection (source == cible)
    Identity,
    /// Reprojection légère (pure Rust)
    Lite(LiteReprojector),
    /// Reprojection via PROJ
    #[cfg(feature = "proj")]
    Proj(proj_backend::ProjReprojector),
}

/// Transformation de coordonnées entre deux CRS.
///
/// Choisit la meilleure option disponible : identité, chemin léger, puis
/// PROJ en dernier recours.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    backend: Backend,
}

impl Reprojector {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        let backend = Self::select_backend(source, target)?;
        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            backend,
        })
    }

    fn select_backend(source: &Crs, target: &Crs) -> Result<Backend> {
        if source == target {
            return Ok(Backend::Identity);
        }

        if let (Some(from), Some(to)) = (source.epsg(), target.epsg()) {
            if let Some(lite) = LiteReprojector::new(from, to) {
                return Ok(Backend::Lite(lite));
            }
        }

        #[cfg(feature = "proj")]
        {
            let proj = proj_backend::ProjReprojector::new(source, target)?;
            Ok(Backend::Proj(proj))
        }

        #[cfg(not(feature = "proj"))]
        Err(ZonalError::reprojection(
            source,
            target,
            "unsupported CRS pair: only EPSG:4326, EPSG:3857 and WGS84 UTM zones \
             are available without the `proj` feature",
        ))
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.backend, Backend::Identity)
    }

    /// Transforme un point
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match &self.backend {
            Backend::Identity => Ok((x, y)),
            Backend::Lite(lite) => lite.transform_point(x, y).ok_or_else(|| {
                ZonalError::reprojection(
                    &self.source,
                    &self.target,
                    format!("point ({}, {}) is outside the source domain", x, y),
                )
            }),
            #[cfg(feature = "proj")]
            Backend::Proj(proj) => proj
                .transform_point(x, y)
                .map_err(|e| ZonalError::reprojection(&self.source, &self.target, e)),
        }
    }

    /// Transforme un point, `None` en cas d'échec (échantillonnage de grilles)
    pub fn try_transform_point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.transform_point(x, y).ok()
    }

    /// Transforme toutes les coordonnées d'un MultiPolygon
    pub fn transform_multipolygon(&self, geometry: &MultiPolygon) -> Result<MultiPolygon> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }

        geometry.try_map_coords(|c: Coord| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self.backend {
            Backend::Identity => "identity (no reprojection)",
            Backend::Lite(_) => "lite (pure Rust)",
            #[cfg(feature = "proj")]
            Backend::Proj(_) => "proj (PROJ library)",
        }
    }
}
