//! # zonal
//!
//! Statistiques zonales de rasters climatiques sur des zones polygonales.
//!
//! ## Features
//!
//! - Réconciliation des CRS : zones et rasters ramenés dans un CRS projeté cible
//! - Reprojection de grilles (plus proche voisin par défaut, bilinéaire, cubique)
//! - Validation du recouvrement raster / zones avec tolérance
//! - Agrégation par zone (min, max, moyenne, écart-type, médiane, percentiles...)
//! - Différence entre deux périodes, alignée par identifiant de zone
//! - Assemblage des tables de rapport (attributs puis statistiques)
//! - Reprojection en pur Rust pour WGS84, Web Mercator et UTM ; PROJ via la feature `proj`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//! use zonal::{Crs, ZonalOptions};
//!
//! let target = Crs::Epsg(32719);
//! let mut zones = zonal::io::read_zones(Path::new("zones.geojson"), None)?;
//! zonal::repair::repair_zone_set(&mut zones);
//! let zones = zonal::reconcile_zones(zones, &target)?;
//!
//! let grid = zonal::io::read_grid(Path::new("tmax.tif"), None, None)?;
//! let grid = zonal::reproject_any(grid, &target, Default::default())?;
//! zonal::validate_overlap(&zones, &grid.bounds(), zonal::DEFAULT_TOLERANCE)?;
//!
//! let stats = zonal::aggregate_any(&zones, &grid, &ZonalOptions::default())?;
//! for record in &stats.records {
//!     println!("{}: {:?}", record.zone, record.values);
//! }
//! ```

pub mod crs;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod io;
pub mod overlap;
pub mod reconcile;
pub mod repair;
pub mod reproject;
pub mod stats;
pub mod table;
pub mod types;
pub mod warp;

pub use crs::Crs;
pub use diff::difference;
pub use error::{Result, ZonalError};
pub use grid::{AnyGrid, GeoTransform, Grid, Sample};
pub use overlap::{check_overlap, validate_overlap, DEFAULT_TOLERANCE};
pub use reconcile::reconcile_zones;
pub use reproject::Reprojector;
pub use stats::{aggregate_any, aggregate_grid, zonal_stats, Statistic, ZonalOptions, ZoneRecord, ZoneStatistics};
pub use table::{assemble, AssemblyOptions, Cell, Report, ReportSection};
pub use types::{AttributeValue, Bounds, Zone, ZoneId, ZoneSet};
pub use warp::{reproject_any, reproject_grid, Resampling};
