//! Grilles raster géoréférencées
//!
//! Une [`Grid`] associe un tableau `(bande, ligne, colonne)` à une transformation
//! affine, un CRS et une valeur nodata optionnelle. Le type des cellules est
//! conservé tel que lu dans le fichier (voir [`AnyGrid`]).

use std::fmt::Debug;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_traits::{NumCast, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::types::Bounds;

/// Transformation affine pixel → coordonnées terrain (convention GDAL).
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Pour un raster nord en haut, les rotations sont nulles et `pixel_height`
/// est négatif.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transformation sans rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height,
        }
    }

    /// Depuis les 6 coefficients GDAL `[ox, pw, rr, oy, cr, ph]`
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Coordonnées terrain d'une position pixel fractionnaire
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Centre de la cellule (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Vérifie que la transformation est inversible
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det.is_finite() && det.abs() > f64::EPSILON * 1e-6
    }

    /// Position pixel fractionnaire (col, row) d'un point terrain.
    ///
    /// Retourne `(NaN, NaN)` pour une transformation dégénérée.
    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.is_invertible() {
            return (f64::NAN, f64::NAN);
        }
        let det = self.determinant();
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (col, row)
    }

    /// Emprise d'un raster `width` x `height`.
    ///
    /// Les quatre coins sont transformés, ce qui gère `pixel_height < 0`
    /// (nord en haut) comme les rasters retournés ou tournés.
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];

        let mut bounds = Bounds::new(corners[0].0, corners[0].1, corners[0].0, corners[0].1);
        for (x, y) in &corners[1..] {
            bounds = bounds.union(&Bounds::new(*x, *y, *x, *y));
        }
        bounds
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Type de cellule stockable dans une [`Grid`]
pub trait Sample:
    Copy + Debug + PartialOrd + PartialEq + NumCast + ToPrimitive + Send + Sync + 'static
{
    /// Nom du type (pour les logs)
    const DTYPE: &'static str;

    /// Valeur de remplissage des cellules hors emprise après reprojection
    fn fill_value() -> Self;

    /// Vrai pour NaN (types flottants seulement)
    fn is_nan(self) -> bool {
        false
    }

    /// Vérifie si la valeur est nodata
    fn is_nodata(self, nodata: Option<Self>) -> bool {
        self.is_nan() || nodata.is_some_and(|nd| self == nd)
    }

    /// Conversion en f64 pour le calcul des statistiques
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// Conversion exacte depuis f64 : `None` hors plage, ou valeur
    /// fractionnaire pour un type entier
    fn from_f64(value: f64) -> Option<Self> {
        if !Self::fill_value().is_nan() && value.fract() != 0.0 {
            return None;
        }
        NumCast::from(value)
    }

    /// Conversion arrondie à l'entier le plus proche pour les types entiers
    fn round_from_f64(value: f64) -> Option<Self> {
        if Self::fill_value().is_nan() {
            NumCast::from(value)
        } else {
            NumCast::from(value.round())
        }
    }
}

macro_rules! impl_sample_int {
    ($t:ty, $fill:expr) => {
        impl Sample for $t {
            const DTYPE: &'static str = stringify!($t);

            fn fill_value() -> Self {
                $fill
            }
        }
    };
}

macro_rules! impl_sample_float {
    ($t:ty) => {
        impl Sample for $t {
            const DTYPE: &'static str = stringify!($t);

            fn fill_value() -> Self {
                <$t>::NAN
            }

            fn is_nan(self) -> bool {
                <$t>::is_nan(self)
            }
        }
    };
}

impl_sample_int!(u8, u8::MAX);
impl_sample_int!(u16, u16::MAX);
impl_sample_int!(u32, u32::MAX);
impl_sample_int!(u64, u64::MAX);
impl_sample_int!(i8, i8::MIN);
impl_sample_int!(i16, i16::MIN);
impl_sample_int!(i32, i32::MIN);
impl_sample_int!(i64, i64::MIN);
impl_sample_float!(f32);
impl_sample_float!(f64);

/// Grille raster multi-bandes géoréférencée
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: Sample> {
    /// Données `(bande, ligne, colonne)`
    data: Array3<T>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<T>,
    /// Cellules couvertes par des données (`None` = toutes).
    /// Une cellule hors couverture n'est jamais une valeur valide.
    coverage: Option<Array2<bool>>,
}

impl<T: Sample> Grid<T> {
    /// Construit une grille multi-bandes
    pub fn new(data: Array3<T>, transform: GeoTransform, crs: Crs, nodata: Option<T>) -> Result<Self> {
        let (bands, rows, cols) = data.dim();
        if bands == 0 || rows == 0 || cols == 0 {
            return Err(ZonalError::aggregation(
                None,
                format!("empty grid ({} bands, {}x{})", bands, cols, rows),
            ));
        }
        if !transform.is_invertible() {
            return Err(ZonalError::aggregation(
                None,
                format!("degenerate affine transform {:?}", transform.to_gdal()),
            ));
        }

        Ok(Self {
            data,
            transform,
            crs,
            nodata,
            coverage: None,
        })
    }

    /// Associe un masque de couverture `(ligne, colonne)` commun à toutes les bandes
    pub fn with_coverage(mut self, coverage: Array2<bool>) -> Result<Self> {
        if coverage.dim() != (self.height(), self.width()) {
            return Err(ZonalError::aggregation(
                None,
                format!(
                    "coverage mask is {}x{}, grid is {}x{}",
                    coverage.dim().1,
                    coverage.dim().0,
                    self.width(),
                    self.height()
                ),
            ));
        }
        self.coverage = Some(coverage);
        Ok(self)
    }

    /// Construit une grille mono-bande
    pub fn from_band(band: Array2<T>, transform: GeoTransform, crs: Crs, nodata: Option<T>) -> Result<Self> {
        Self::new(band.insert_axis(Axis(0)), transform, crs, nodata)
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn band_count(&self) -> usize {
        self.data.dim().0
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Vue sur une bande (index 0 = bande 1)
    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, T>> {
        (index < self.band_count()).then(|| self.data.index_axis(Axis(0), index))
    }

    /// Vue sur la première bande, seule utilisée par l'agrégation
    pub fn first_band(&self) -> ArrayView2<'_, T> {
        self.data.index_axis(Axis(0), 0)
    }

    pub fn coverage(&self) -> Option<ArrayView2<'_, bool>> {
        self.coverage.as_ref().map(Array2::view)
    }

    /// Emprise terrain de la grille
    pub fn bounds(&self) -> Bounds {
        self.transform.bounds(self.width(), self.height())
    }

    /// Remplace la valeur nodata (surcharge de configuration)
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }
}

/// Grille dont le type de cellule est connu à l'exécution seulement
#[derive(Debug, Clone, PartialEq)]
pub enum AnyGrid {
    U8(Grid<u8>),
    U16(Grid<u16>),
    U32(Grid<u32>),
    U64(Grid<u64>),
    I8(Grid<i8>),
    I16(Grid<i16>),
    I32(Grid<i32>),
    I64(Grid<i64>),
    F32(Grid<f32>),
    F64(Grid<f64>),
}

/// Applique une expression générique à la grille typée contenue dans un [`AnyGrid`].
///
/// ```rust,ignore
/// let width = with_grid!(&any, g => g.width());
/// let reprojected = with_grid!(any, g => AnyGrid::from(reproject_grid(g, &target, method)?));
/// ```
#[macro_export]
macro_rules! with_grid {
    ($grid:expr, $g:ident => $body:expr) => {
        match $grid {
            $crate::grid::AnyGrid::U8($g) => $body,
            $crate::grid::AnyGrid::U16($g) => $body,
            $crate::grid::AnyGrid::U32($g) => $body,
            $crate::grid::AnyGrid::U64($g) => $body,
            $crate::grid::AnyGrid::I8($g) => $body,
            $crate::grid::AnyGrid::I16($g) => $body,
            $crate::grid::AnyGrid::I32($g) => $body,
            $crate::grid::AnyGrid::I64($g) => $body,
            $crate::grid::AnyGrid::F32($g) => $body,
            $crate::grid::AnyGrid::F64($g) => $body,
        }
    };
}

macro_rules! impl_any_grid_from {
    ($($variant:ident($t:ty)),*) => {
        $(
            impl From<Grid<$t>> for AnyGrid {
                fn from(grid: Grid<$t>) -> Self {
                    AnyGrid::$variant(grid)
                }
            }
        )*
    };
}

impl_any_grid_from!(
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64)
);

impl AnyGrid {
    pub fn dtype(&self) -> &'static str {
        fn name<T: Sample>(_: &Grid<T>) -> &'static str {
            T::DTYPE
        }
        with_grid!(self, g => name(g))
    }

    pub fn width(&self) -> usize {
        with_grid!(self, g => g.width())
    }

    pub fn height(&self) -> usize {
        with_grid!(self, g => g.height())
    }

    pub fn band_count(&self) -> usize {
        with_grid!(self, g => g.band_count())
    }

    pub fn crs(&self) -> &Crs {
        with_grid!(self, g => g.crs())
    }

    pub fn transform(&self) -> &GeoTransform {
        with_grid!(self, g => g.transform())
    }

    pub fn bounds(&self) -> Bounds {
        with_grid!(self, g => g.bounds())
    }

    /// Nodata converti en f64
    pub fn nodata_f64(&self) -> Option<f64> {
        with_grid!(self, g => g.nodata().map(Sample::as_f64))
    }

    /// Surcharge la valeur nodata ; échoue si elle n'est pas représentable dans le type
    pub fn override_nodata(&mut self, nodata: f64) -> Result<()> {
        let dtype = self.dtype();
        with_grid!(self, g => {
            let value = Sample::from_f64(nodata).ok_or_else(|| {
                ZonalError::aggregation(
                    None,
                    format!("nodata {} is not representable as {}", nodata, dtype),
                )
            })?;
            g.set_nodata(Some(value));
        });
        Ok(())
    }
}
