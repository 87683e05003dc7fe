//! Reprojection avec PROJ (feature `proj`)

use proj::Proj;

use crate::crs::Crs;
use crate::error::{Result, ZonalError};

/// Transformation PROJ normalisée en ordre x/y (lon/lat)
pub struct ProjReprojector {
    proj: Proj,
}

impl ProjReprojector {
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        let proj = Proj::new_known_crs(&source.to_proj_string(), &target.to_proj_string(), None)
            .map_err(|e| ZonalError::reprojection(source, target, e))?;
        Ok(Self { proj })
    }

    pub fn transform_point(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), proj::ProjError> {
        self.proj.convert((x, y))
    }
}
