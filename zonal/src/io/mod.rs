//! Lecture des fichiers d'entrée
//!
//! - [`vector`] : zones depuis un GeoJSON
//! - [`raster`] : grilles depuis un GeoTIFF

pub mod raster;
pub mod vector;

pub use raster::read_grid;
pub use vector::read_zones;

use std::path::Path;

use crate::error::{Result, ZonalError};

/// Vérifie l'existence d'un fichier d'entrée
pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ZonalError::MissingInput(path.to_path_buf()))
    }
}
