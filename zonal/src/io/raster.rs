//! Lecture de grilles depuis un fichier GeoTIFF
//!
//! Lecteur natif (crate `tiff`) : seule la première image du fichier est lue.
//! Le géoréférencement vient des tags ModelTransformation ou
//! ModelPixelScale + ModelTiepoint, le CRS de la GeoKeyDirectory et le nodata
//! du tag GDAL_NODATA.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{info, warn};

use super::require_file;
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::grid::{AnyGrid, GeoTransform, Grid, Sample};

// GeoKeys
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Géoréférencement lu dans les tags GeoTIFF
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffInfo {
    pub transform: GeoTransform,
    pub crs: Option<Crs>,
    pub nodata: Option<f64>,
}

/// Lit un GeoTIFF en conservant le type des cellules.
///
/// `crs_override` remplace le CRS déclaré (obligatoire si le fichier n'en
/// déclare pas) ; `nodata_override` remplace la valeur GDAL_NODATA et doit
/// être exactement représentable dans le type des cellules.
pub fn read_grid(path: &Path, crs_override: Option<&Crs>, nodata_override: Option<f64>) -> Result<AnyGrid> {
    require_file(path)?;
    let file_name = path.display().to_string();
    let tiff_err = |e: tiff::TiffError| ZonalError::parse_error(file_name.clone(), e.to_string());

    let reader = BufReader::new(File::open(path)?);
    let mut decoder = Decoder::new(reader)
        .map_err(tiff_err)?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let (width, height) = (width as usize, height as usize);

    let info = read_geotiff_info(&mut decoder, &file_name)?;

    let crs = match (crs_override, info.crs) {
        (Some(forced), Some(declared)) if *forced != declared => {
            warn!(declared = %declared, forced = %forced, "Overriding the declared raster CRS");
            forced.clone()
        }
        (Some(forced), _) => forced.clone(),
        (None, Some(declared)) => declared,
        (None, None) => {
            return Err(ZonalError::InvalidCrs(format!(
                "{} declares no CRS, set one explicitly",
                file_name
            )))
        }
    };

    let image = decoder.read_image().map_err(tiff_err)?;

    macro_rules! typed {
        ($buf:expr) => {
            AnyGrid::from(build_grid($buf, width, height, info.transform, crs, info.nodata, &file_name)?)
        };
    }

    let mut grid = match image {
        DecodingResult::U8(buf) => typed!(buf),
        DecodingResult::U16(buf) => typed!(buf),
        DecodingResult::U32(buf) => typed!(buf),
        DecodingResult::U64(buf) => typed!(buf),
        DecodingResult::I8(buf) => typed!(buf),
        DecodingResult::I16(buf) => typed!(buf),
        DecodingResult::I32(buf) => typed!(buf),
        DecodingResult::I64(buf) => typed!(buf),
        DecodingResult::F32(buf) => typed!(buf),
        DecodingResult::F64(buf) => typed!(buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(ZonalError::parse_error(
                file_name,
                "unsupported TIFF sample format",
            ))
        }
    };

    if let Some(nodata) = nodata_override {
        grid
            .override_nodata(nodata)
            .map_err(|e| ZonalError::parse_error(file_name.as_str(), e.to_string()))?;
    }

    info!(
        path = %path.display(),
        width,
        height,
        bands = grid.band_count(),
        dtype = grid.dtype(),
        crs = %grid.crs(),
        nodata = ?grid.nodata_f64(),
        "Raster loaded"
    );

    Ok(grid)
}

/// Construit une grille `(bande, ligne, colonne)` depuis des échantillons entrelacés
fn build_grid<T: Sample>(
    buf: Vec<T>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<f64>,
    file_name: &str,
) -> Result<Grid<T>> {
    let pixels = width * height;
    if pixels == 0 || buf.len() % pixels != 0 {
        return Err(ZonalError::parse_error(
            file_name,
            format!("{} samples do not fit a {}x{} image", buf.len(), width, height),
        ));
    }
    let samples = buf.len() / pixels;

    let data = Array3::from_shape_vec((height, width, samples), buf)
        .map_err(|e| ZonalError::parse_error(file_name, e.to_string()))?
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    // Aucune cellule ne peut valoir un nodata non représentable : il est ignoré, jamais arrondi
    let nodata = nodata.and_then(|nd| {
        let value = T::from_f64(nd);
        if value.is_none() {
            warn!(nodata = nd, dtype = T::DTYPE, "Nodata value not representable, ignored");
        }
        value
    });

    Grid::new(data, transform, crs, nodata)
}

/// Lit le géoréférencement d'un GeoTIFF
pub fn read_geotiff_info<R: Read + Seek>(decoder: &mut Decoder<R>, file_name: &str) -> Result<GeoTiffInfo> {
    let geokeys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()
        .map(|v| parse_geokeys(&v))
        .unwrap_or_default();
    let key = |id: u16| geokeys.iter().find(|(k, _)| *k == id).map(|(_, v)| *v);

    let mut transform = read_transform(decoder).ok_or_else(|| {
        ZonalError::parse_error(file_name, "no georeferencing tags (ModelTransformation or ModelTiepoint)")
    })?;

    // PixelIsPoint : l'origine désigne le centre du premier pixel
    if key(GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT) {
        let (x, y) = transform.apply(-0.5, -0.5);
        transform.origin_x = x;
        transform.origin_y = y;
    }

    let crs = key(PROJECTED_CS_TYPE_GEO_KEY)
        .or_else(|| key(GEOGRAPHIC_TYPE_GEO_KEY))
        .filter(|&code| code != 0 && code != USER_DEFINED)
        .map(|code| Crs::Epsg(code as u32));

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok());

    Ok(GeoTiffInfo {
        transform,
        crs,
        nodata,
    })
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            // x = m0*col + m1*row + m3 ; y = m4*col + m5*row + m7
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint : [I, J, K, X, Y, Z] ; scale : [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Paires (clé, valeur) des GeoKeys stockées directement dans le répertoire
fn parse_geokeys(directory: &[u16]) -> Vec<(u16, u16)> {
    if directory.len() < 4 {
        return Vec::new();
    }
    let count = directory[3] as usize;
    directory[4..]
        .chunks_exact(4)
        .take(count)
        // location 0 : valeur SHORT en ligne
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tiff::encoder::{colortype, TiffEncoder, TiffValue};

    fn write_tiff(values: &[f32], width: u32, height: u32, epsg: Option<u16>, nodata: Option<&str>) -> NamedTempFile {
        write_typed_tiff::<colortype::Gray32Float>(values, width, height, epsg, nodata)
    }

    fn write_typed_tiff<C>(
        values: &[C::Inner],
        width: u32,
        height: u32,
        epsg: Option<u16>,
        nodata: Option<&str>,
    ) -> NamedTempFile
    where
        C: colortype::ColorType,
        [C::Inner]: TiffValue,
    {
        let file = NamedTempFile::new().unwrap();
        let mut encoder = TiffEncoder::new(file.reopen().unwrap()).unwrap();
        let mut image = encoder.new_image::<C>(width, height).unwrap();

        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[1000.0f64, 1000.0, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 346_000.0, 6_298_000.0, 0.0][..])
            .unwrap();
        if let Some(code) = epsg {
            let keys: Vec<u16> = vec![1, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, code];
            image
                .encoder()
                .write_tag(Tag::GeoKeyDirectoryTag, &keys[..])
                .unwrap();
        }
        if let Some(nd) = nodata {
            image.encoder().write_tag(Tag::GdalNodata, nd).unwrap();
        }
        image.write_data(values).unwrap();
        file
    }

    #[test]
    fn test_read_georeferenced_tiff() {
        let values: Vec<f32> = (1..=6).map(|v| v as f32).collect();
        let file = write_tiff(&values, 3, 2, Some(32719), Some("-9999"));

        let grid = read_grid(file.path(), None, None).unwrap();
        assert_eq!(grid.dtype(), "f32");
        assert_eq!((grid.width(), grid.height(), grid.band_count()), (3, 2, 1));
        assert_eq!(grid.crs(), &Crs::Epsg(32719));
        assert_eq!(grid.nodata_f64(), Some(-9999.0));
        assert_eq!(
            *grid.transform(),
            GeoTransform::new(346_000.0, 6_298_000.0, 1000.0, -1000.0)
        );

        let AnyGrid::F32(g) = grid else {
            panic!("expected f32 grid");
        };
        assert_eq!(g.first_band()[[1, 2]], 6.0);
    }

    #[test]
    fn test_overrides() {
        let file = write_tiff(&[1.0, 2.0, 3.0, 4.0], 2, 2, Some(32719), None);

        let grid = read_grid(file.path(), Some(&Crs::Epsg(32718)), Some(0.0)).unwrap();
        assert_eq!(grid.crs(), &Crs::Epsg(32718));
        assert_eq!(grid.nodata_f64(), Some(0.0));
    }

    #[test]
    fn test_integer_nodata_is_never_rounded() {
        let values = [-10000i32, 1, 2, 3];

        let file = write_typed_tiff::<colortype::GrayI32>(&values, 2, 2, Some(32719), None);
        let err = read_grid(file.path(), None, Some(-9999.5)).unwrap_err();
        assert!(matches!(err, ZonalError::Parse { .. }));
        assert_eq!(read_grid(file.path(), None, Some(-10000.0)).unwrap().nodata_f64(), Some(-10000.0));

        // Tag GDAL_NODATA fractionnaire : ignoré, la cellule -10000 reste valide
        let file = write_typed_tiff::<colortype::GrayI32>(&values, 2, 2, Some(32719), Some("-9999.5"));
        let grid = read_grid(file.path(), None, None).unwrap();
        assert_eq!(grid.dtype(), "i32");
        assert_eq!(grid.nodata_f64(), None);
    }

    #[test]
    fn test_missing_crs() {
        let file = write_tiff(&[1.0, 2.0, 3.0, 4.0], 2, 2, None, None);

        let err = read_grid(file.path(), None, None).unwrap_err();
        assert!(matches!(err, ZonalError::InvalidCrs(_)));
        assert!(read_grid(file.path(), Some(&Crs::Epsg(32719)), None).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = read_grid(Path::new("/nonexistent/raster.tif"), None, None).unwrap_err();
        assert!(matches!(err, ZonalError::MissingInput(_)));
    }

    #[test]
    fn test_parse_geokeys() {
        let keys = parse_geokeys(&[1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32719]);
        assert_eq!(keys, vec![(1024, 1), (3072, 32719)]);
        assert!(parse_geokeys(&[1, 1]).is_empty());
    }
}
