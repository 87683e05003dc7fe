//! Reprojection de grilles raster
//!
//! Chaque cellule de la grille de sortie est projetée en sens inverse vers la
//! grille source, puis échantillonnée selon la méthode choisie. La taille et la
//! transformation de sortie suivent le calcul « transform par défaut » de GDAL :
//! emprise des bords transformés, résolution conservant la diagonale en pixels.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::grid::{AnyGrid, GeoTransform, Grid, Sample};
use crate::reproject::Reprojector;
use crate::types::Bounds;
use crate::with_grid;

/// Nombre de points échantillonnés par bord pour l'emprise de sortie
const EDGE_SAMPLES: usize = 21;

/// Méthode de rééchantillonnage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Plus proche voisin : ne crée aucune valeur absente de la source
    #[default]
    Nearest,
    /// Interpolation bilinéaire (2x2)
    Bilinear,
    /// Convolution cubique de Keys (4x4, a = -0.5)
    Cubic,
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resampling::Nearest => "nearest",
            Resampling::Bilinear => "bilinear",
            Resampling::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

impl FromStr for Resampling {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" | "near" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            "cubic" => Ok(Resampling::Cubic),
            other => Err(format!(
                "unknown resampling '{}' (expected nearest, bilinear or cubic)",
                other
            )),
        }
    }
}

/// Transformation et dimensions de sortie
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpLayout {
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

/// Calcule la grille de sortie couvrant l'emprise de la source dans le CRS cible.
///
/// La résolution est choisie pour que la diagonale de sortie compte autant de
/// pixels que celle de la source ; les pixels de sortie sont carrés.
pub fn suggested_layout(
    transform: &GeoTransform,
    width: usize,
    height: usize,
    forward: &Reprojector,
) -> Result<WarpLayout> {
    let mut points = Vec::with_capacity(4 * EDGE_SAMPLES);
    let (w, h) = (width as f64, height as f64);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        for (col, row) in [(t * w, 0.0), (t * w, h), (0.0, t * h), (w, t * h)] {
            let (x, y) = transform.apply(col, row);
            if let Some(p) = forward.try_transform_point(x, y) {
                points.push(p);
            }
        }
    }

    let bounds = Bounds::from_points(points).ok_or_else(|| {
        ZonalError::reprojection(
            forward.source(),
            forward.target(),
            "no corner of the raster footprint could be transformed",
        )
    })?;

    let diagonal = bounds.width().hypot(bounds.height());
    let pixel_diagonal = w.hypot(h);
    let resolution = diagonal / pixel_diagonal;
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(ZonalError::reprojection(
            forward.source(),
            forward.target(),
            format!("degenerate output footprint {}", bounds),
        ));
    }

    let out_width = ((bounds.width() / resolution + 0.5) as usize).max(1);
    let out_height = ((bounds.height() / resolution + 0.5) as usize).max(1);

    Ok(WarpLayout {
        transform: GeoTransform::new(bounds.min_x, bounds.max_y, resolution, -resolution),
        width: out_width,
        height: out_height,
    })
}

/// Reprojette une grille dans `target`.
///
/// Une grille déjà dans le CRS cible est rendue telle quelle (sans copie).
/// Toutes les bandes sont rééchantillonnées ; le type des cellules est conservé.
/// Avec un nodata source, les cellules hors emprise reçoivent ce nodata. Sans
/// nodata, la sortie n'en a pas non plus : les cellules hors emprise reçoivent
/// la valeur de remplissage du type et sont exclues par le masque de couverture,
/// ce qui laisse valides les cellules source égales à cette valeur.
pub fn reproject_grid<T: Sample>(grid: Grid<T>, target: &Crs, method: Resampling) -> Result<Grid<T>> {
    if grid.crs() == target {
        debug!(crs = %target, "Raster already in target CRS");
        return Ok(grid);
    }

    let forward = Reprojector::new(grid.crs(), target)?;
    let inverse = Reprojector::new(target, grid.crs())?;

    let layout = suggested_layout(grid.transform(), grid.width(), grid.height(), &forward)?;
    info!(
        from = %grid.crs(),
        to = %target,
        width = layout.width,
        height = layout.height,
        resampling = %method,
        "Reprojecting raster"
    );

    let fill = grid.nodata().unwrap_or_else(T::fill_value);
    let src_transform = grid.transform();
    let src_coverage = grid.coverage();
    let (src_rows, src_cols) = (grid.height(), grid.width());

    // Positions source (col, row) fractionnaires de chaque centre de sortie,
    // `None` hors de l'emprise couverte
    let positions: Vec<Option<(f64, f64)>> = (0..layout.height)
        .flat_map(|row| (0..layout.width).map(move |col| (col, row)))
        .map(|(col, row)| {
            let (x, y) = layout.transform.pixel_center(col, row);
            inverse
                .try_transform_point(x, y)
                .map(|(sx, sy)| src_transform.invert(sx, sy))
                .filter(|&(scol, srow)| covered(src_coverage, src_rows, src_cols, scol, srow))
        })
        .collect();

    let mut data = Array3::from_elem((grid.band_count(), layout.height, layout.width), fill);
    for (band_idx, mut out_band) in data.axis_iter_mut(Axis(0)).enumerate() {
        let Some(source) = grid.band(band_idx) else {
            continue;
        };
        for ((row, col), cell) in out_band.indexed_iter_mut() {
            if let Some((scol, srow)) = positions[row * layout.width + col] {
                if let Some(value) = sample(&source, grid.nodata(), src_coverage, scol, srow, method) {
                    *cell = value;
                }
            }
        }
    }

    let warped = Grid::new(data, layout.transform, target.clone(), grid.nodata())?;
    if grid.nodata().is_some() {
        return Ok(warped);
    }

    let coverage = Array2::from_shape_fn((layout.height, layout.width), |(row, col)| {
        positions[row * layout.width + col].is_some()
    });
    debug!(
        uncovered = coverage.iter().filter(|c| !**c).count(),
        "No source nodata, output footprint kept as coverage mask"
    );
    warped.with_coverage(coverage)
}

/// Vrai si la position pixel tombe sur une cellule couverte de la source
fn covered(coverage: Option<ArrayView2<'_, bool>>, rows: usize, cols: usize, col: f64, row: f64) -> bool {
    if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
        return false;
    }
    let (c, r) = (col.floor() as usize, row.floor() as usize);
    c < cols && r < rows && coverage.map_or(true, |mask| mask[[r, c]])
}

/// Reprojette une grille de type quelconque
pub fn reproject_any(grid: AnyGrid, target: &Crs, method: Resampling) -> Result<AnyGrid> {
    with_grid!(grid, g => reproject_grid(g, target, method).map(AnyGrid::from))
}

/// Échantillonne la bande à la position pixel fractionnaire `(col, row)`.
///
/// `None` hors de la grille, hors couverture ou sur une cellule nodata.
pub fn sample<T: Sample>(
    band: &ArrayView2<'_, T>,
    nodata: Option<T>,
    coverage: Option<ArrayView2<'_, bool>>,
    col: f64,
    row: f64,
    method: Resampling,
) -> Option<T> {
    let source = Source {
        band,
        nodata,
        coverage,
    };
    let nearest = source.nearest(col, row);
    match method {
        Resampling::Nearest => nearest,
        // La cellule centrale doit exister ; les voisins nodata sont ignorés
        Resampling::Bilinear if nearest.is_some() => {
            convolve(&source, col, row, 1, bilinear_weight).or(nearest)
        }
        Resampling::Cubic if nearest.is_some() => {
            convolve(&source, col, row, 2, cubic_weight).or(nearest)
        }
        _ => None,
    }
}

struct Source<'a, 'b, 'c, T> {
    band: &'a ArrayView2<'b, T>,
    nodata: Option<T>,
    coverage: Option<ArrayView2<'c, bool>>,
}

impl<T: Sample> Source<'_, '_, '_, T> {
    fn valid_cell(&self, col: i64, row: i64) -> Option<T> {
        let (rows, cols) = self.band.dim();
        if col < 0 || row < 0 || col as usize >= cols || row as usize >= rows {
            return None;
        }
        let (r, c) = (row as usize, col as usize);
        if self.coverage.is_some_and(|mask| !mask[[r, c]]) {
            return None;
        }
        let value = self.band[[r, c]];
        (!value.is_nodata(self.nodata)).then_some(value)
    }

    fn nearest(&self, col: f64, row: f64) -> Option<T> {
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        self.valid_cell(col.floor() as i64, row.floor() as i64)
    }
}

fn bilinear_weight(t: f64) -> f64 {
    (1.0 - t.abs()).max(0.0)
}

fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        (A + 2.0) * t.powi(3) - (A + 3.0) * t.powi(2) + 1.0
    } else if t < 2.0 {
        A * t.powi(3) - 5.0 * A * t.powi(2) + 8.0 * A * t - 4.0 * A
    } else {
        0.0
    }
}

/// Convolution séparable normalisée par la somme des poids retenus
fn convolve<T: Sample>(
    source: &Source<'_, '_, '_, T>,
    col: f64,
    row: f64,
    radius: i64,
    kernel: fn(f64) -> f64,
) -> Option<T> {
    // Les centres de cellules sont aux positions entières + 0.5
    let u = col - 0.5;
    let v = row - 0.5;
    let c0 = u.floor() as i64;
    let r0 = v.floor() as i64;

    let mut total = 0.0;
    let mut weights = 0.0;
    for r in (r0 - radius + 1)..=(r0 + radius) {
        let wy = kernel(v - r as f64);
        if wy == 0.0 {
            continue;
        }
        for c in (c0 - radius + 1)..=(c0 + radius) {
            let wx = kernel(u - c as f64);
            if wx == 0.0 {
                continue;
            }
            if let Some(value) = source.valid_cell(c, r) {
                let w = wx * wy;
                total += w * value.as_f64();
                weights += w;
            }
        }
    }

    if weights.abs() < 1e-12 {
        return None;
    }
    T::round_from_f64(total / weights)
}
