//! Rastérisation des polygones de zones
//!
//! Les polygones sont ramenés dans l'espace pixel (colonne, ligne fractionnaires)
//! par la transformation inverse, ce qui gère aussi les rasters tournés.
//!
//! Règle par défaut : une cellule appartient à la zone si son centre est à
//! l'intérieur (pair-impair, bord gauche inclus, bord droit exclu). Avec
//! `all_touched`, toute cellule dont l'intérieur touche le polygone est retenue.

use geo::{Coord, Intersects, LineString, MapCoords, MultiPolygon, Polygon, Rect};

use crate::grid::GeoTransform;

/// Marge retirée aux cellules en mode `all_touched` (un simple contact de bord ne compte pas)
const TOUCH_MARGIN: f64 = 1e-9;

/// Fenêtre de cellules `[row_start, row_end) x [col_start, col_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    row_start: usize,
    row_end: usize,
    col_start: usize,
    col_end: usize,
}

impl Window {
    fn of(polygon: &Polygon, width: usize, height: usize) -> Option<Self> {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in polygon.exterior().coords() {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            return None;
        }

        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        let window = Self {
            row_start: clamp(min_y.floor(), height),
            row_end: clamp(max_y.ceil(), height),
            col_start: clamp(min_x.floor(), width),
            col_end: clamp(max_x.ceil(), width),
        };
        (window.row_start < window.row_end && window.col_start < window.col_end).then_some(window)
    }
}

/// Ramène un polygone dans l'espace pixel
fn to_pixel_space(polygon: &Polygon, transform: &GeoTransform) -> Option<Polygon> {
    let pixel = polygon.map_coords(|c: Coord| {
        let (x, y) = transform.invert(c.x, c.y);
        Coord { x, y }
    });
    let finite = pixel
        .exterior()
        .coords()
        .chain(pixel.interiors().iter().flat_map(LineString::coords))
        .all(|c| c.x.is_finite() && c.y.is_finite());
    finite.then_some(pixel)
}

/// Abscisses des croisements des anneaux avec l'horizontale `y`
fn crossings(polygon: &Polygon, y: f64, out: &mut Vec<f64>) {
    out.clear();
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for line in ring.lines() {
            let (a, b) = (line.start, line.end);
            // Demi-ouvert : un sommet exactement sur la ligne n'est compté qu'une fois
            if (a.y > y) != (b.y > y) {
                out.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }
    out.sort_by(|a, b| a.total_cmp(b));
}

fn center_cells(polygon: &Polygon, window: Window, width: usize, cells: &mut Vec<(usize, usize)>) {
    let mut xs = Vec::new();
    for row in window.row_start..window.row_end {
        crossings(polygon, row as f64 + 0.5, &mut xs);
        for pair in xs.chunks_exact(2) {
            // Centres c + 0.5 dans [xa, xb)
            let start = (pair[0] - 0.5).ceil().max(0.0) as usize;
            let end = ((pair[1] - 0.5).ceil().max(0.0) as usize).min(width);
            cells.extend((start..end).map(|col| (row, col)));
        }
    }
}

fn touched_cells(polygon: &Polygon, window: Window, cells: &mut Vec<(usize, usize)>) {
    for row in window.row_start..window.row_end {
        for col in window.col_start..window.col_end {
            let cell = Rect::new(
                Coord {
                    x: col as f64 + TOUCH_MARGIN,
                    y: row as f64 + TOUCH_MARGIN,
                },
                Coord {
                    x: (col + 1) as f64 - TOUCH_MARGIN,
                    y: (row + 1) as f64 - TOUCH_MARGIN,
                },
            );
            if cell.intersects(polygon) {
                cells.push((row, col));
            }
        }
    }
}

/// Cellules `(ligne, colonne)` couvertes par la géométrie, triées et sans doublon
pub fn rasterize(
    geometry: &MultiPolygon,
    transform: &GeoTransform,
    width: usize,
    height: usize,
    all_touched: bool,
) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();

    for polygon in &geometry.0 {
        let Some(pixel) = to_pixel_space(polygon, transform) else {
            continue;
        };
        let Some(window) = Window::of(&pixel, width, height) else {
            continue;
        };

        center_cells(&pixel, window, width, &mut cells);
        if all_touched {
            touched_cells(&pixel, window, &mut cells);
        }
    }

    cells.sort_unstable();
    cells.dedup();
    cells
}
