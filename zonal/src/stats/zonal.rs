//! Agrégation des valeurs raster par zone

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use super::{compute, mask, Statistic};
use crate::error::{Result, ZonalError};
use crate::fingerprint::{self, zone_set_fingerprint, Fingerprint};
use crate::grid::{AnyGrid, GeoTransform, Grid, Sample};
use crate::types::{ZoneId, ZoneSet};
use crate::with_grid;

/// Options de l'agrégation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalOptions {
    /// Statistiques demandées, dans l'ordre des colonnes
    pub stats: Vec<Statistic>,
    /// Retenir toute cellule touchée, pas seulement celles dont le centre est dedans
    pub all_touched: bool,
}

impl Default for ZonalOptions {
    fn default() -> Self {
        Self {
            stats: Statistic::default_set(),
            all_touched: false,
        }
    }
}

/// Statistiques d'une zone (`None` = valeur manquante)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRecord {
    pub zone: ZoneId,
    pub values: Vec<Option<f64>>,
}

impl ZoneRecord {
    /// Vrai si aucune statistique n'a pu être calculée
    pub fn is_missing(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Table de statistiques : un enregistrement par zone, dans l'ordre du `ZoneSet`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatistics {
    pub stats: Vec<Statistic>,
    pub records: Vec<ZoneRecord>,
    /// Empreinte du `ZoneSet` source
    #[serde(serialize_with = "serialize_fingerprint")]
    pub fingerprint: Fingerprint,
}

fn serialize_fingerprint<S: Serializer>(fp: &Fingerprint, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&fingerprint::to_hex(fp))
}

impl ZoneStatistics {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index de colonne d'une statistique
    pub fn column(&self, stat: Statistic) -> Option<usize> {
        self.stats.iter().position(|s| *s == stat)
    }

    /// Valeur d'une statistique pour une zone
    pub fn value(&self, zone: ZoneId, stat: Statistic) -> Option<f64> {
        let col = self.column(stat)?;
        self.records
            .iter()
            .find(|r| r.zone == zone)
            .and_then(|r| r.values.get(col).copied().flatten())
    }

    /// Zones sans aucune cellule valide
    pub fn missing_zones(&self) -> Vec<ZoneId> {
        self.records
            .iter()
            .filter(|r| r.is_missing())
            .map(|r| r.zone)
            .collect()
    }
}

/// Calcule les statistiques de chaque zone sur une bande.
///
/// Les zones et la bande doivent partager le même CRS. Les cellules nodata,
/// NaN ou hors du masque `coverage` sont exclues ; une zone sans cellule
/// valide donne un enregistrement entièrement manquant, pas une erreur.
pub fn zonal_stats<T: Sample>(
    zone_set: &ZoneSet,
    band: ArrayView2<'_, T>,
    transform: &GeoTransform,
    nodata: Option<T>,
    coverage: Option<ArrayView2<'_, bool>>,
    options: &ZonalOptions,
) -> Result<ZoneStatistics> {
    if options.stats.is_empty() {
        return Err(ZonalError::aggregation(None, "no statistic requested"));
    }
    let (height, width) = band.dim();
    if width == 0 || height == 0 {
        return Err(ZonalError::aggregation(None, "raster band is empty"));
    }
    if !transform.is_invertible() {
        return Err(ZonalError::aggregation(
            None,
            format!("degenerate affine transform {:?}", transform.to_gdal()),
        ));
    }
    if coverage.is_some_and(|mask| mask.dim() != (height, width)) {
        return Err(ZonalError::aggregation(None, "coverage mask does not match the raster band"));
    }

    info!(
        zones = zone_set.len(),
        width,
        height,
        dtype = T::DTYPE,
        all_touched = options.all_touched,
        "Aggregation started"
    );

    let mut records = Vec::with_capacity(zone_set.len());
    for zone in &zone_set.zones {
        let cells = mask::rasterize(&zone.geometry, transform, width, height, options.all_touched);
        let values: Vec<f64> = cells
            .iter()
            .filter(|&&(row, col)| coverage.map_or(true, |mask| mask[[row, col]]))
            .map(|&(row, col)| band[[row, col]])
            .filter(|v| !v.is_nodata(nodata))
            .map(T::as_f64)
            .filter(|v| !v.is_nan())
            .collect();

        debug!(zone = %zone.id, cells = cells.len(), valid = values.len(), "Zone masked");

        let record = ZoneRecord {
            zone: zone.id,
            values: compute(values, &options.stats),
        };
        if record.is_missing() {
            warn!(zone = %zone.id, "Zone covers no valid raster cell, statistics are missing");
        }
        records.push(record);
    }

    let result = ZoneStatistics {
        stats: options.stats.clone(),
        records,
        fingerprint: zone_set_fingerprint(zone_set),
    };

    info!(
        zones = result.len(),
        missing = result.missing_zones().len(),
        "Aggregation finished"
    );

    Ok(result)
}

/// Agrège la première bande d'une grille
pub fn aggregate_grid<T: Sample>(
    zone_set: &ZoneSet,
    grid: &Grid<T>,
    options: &ZonalOptions,
) -> Result<ZoneStatistics> {
    if grid.crs() != &zone_set.crs {
        warn!(
            zones = %zone_set.crs,
            raster = %grid.crs(),
            "Zones and raster CRS differ"
        );
    }
    zonal_stats(
        zone_set,
        grid.first_band(),
        grid.transform(),
        grid.nodata(),
        grid.coverage(),
        options,
    )
}

/// Agrège la première bande d'une grille de type quelconque
pub fn aggregate_any(zone_set: &ZoneSet, grid: &AnyGrid, options: &ZonalOptions) -> Result<ZoneStatistics> {
    with_grid!(grid, g => aggregate_grid(zone_set, g, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use approx::assert_relative_eq;
    use geo::{polygon, MultiPolygon};
    use ndarray::array;
    use std::collections::HashMap;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    fn zones(geometries: Vec<MultiPolygon>) -> ZoneSet {
        ZoneSet::new(
            geometries.into_iter().map(|g| (g, HashMap::new())).collect(),
            vec![],
            Crs::Epsg(32719),
        )
    }

    fn grid() -> Grid<i32> {
        Grid::from_band(
            array![[1, 2, 3], [4, 5, 6], [7, 8, 9]],
            GeoTransform::new(0.0, 3.0, 1.0, -1.0),
            Crs::Epsg(32719),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_full_extent_zone() {
        let set = zones(vec![rect(0.0, 0.0, 3.0, 3.0)]);
        let result = aggregate_grid(&set, &grid(), &ZonalOptions::default()).unwrap();

        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.value(ZoneId(0), Statistic::Min).unwrap(), 1.0);
        assert_relative_eq!(result.value(ZoneId(0), Statistic::Max).unwrap(), 9.0);
        assert_relative_eq!(result.value(ZoneId(0), Statistic::Mean).unwrap(), 5.0);
        assert_relative_eq!(result.value(ZoneId(0), Statistic::Median).unwrap(), 5.0);
    }

    #[test]
    fn test_nodata_excluded() {
        let mut g = grid();
        g.set_nodata(Some(9));
        let set = zones(vec![rect(0.0, 0.0, 3.0, 3.0)]);
        let options = ZonalOptions {
            stats: vec![Statistic::Max, Statistic::Count],
            all_touched: false,
        };

        let result = aggregate_grid(&set, &g, &options).unwrap();
        assert_eq!(result.value(ZoneId(0), Statistic::Max), Some(8.0));
        assert_eq!(result.value(ZoneId(0), Statistic::Count), Some(8.0));
    }

    #[test]
    fn test_empty_zone_is_missing() {
        let set = zones(vec![rect(0.0, 0.0, 1.0, 1.0), rect(50.0, 50.0, 60.0, 60.0)]);
        let result = aggregate_grid(&set, &grid(), &ZonalOptions::default()).unwrap();

        assert_eq!(result.len(), 2);
        assert!(!result.records[0].is_missing());
        assert!(result.records[1].is_missing());
        assert_eq!(result.missing_zones(), vec![ZoneId(1)]);
    }

    #[test]
    fn test_all_nodata_zone_is_missing() {
        let g = Grid::from_band(
            array![[f32::NAN, f32::NAN], [f32::NAN, f32::NAN]],
            GeoTransform::new(0.0, 2.0, 1.0, -1.0),
            Crs::Epsg(32719),
            None,
        )
        .unwrap();
        let set = zones(vec![rect(0.0, 0.0, 2.0, 2.0)]);

        let result = aggregate_grid(&set, &g, &ZonalOptions::default()).unwrap();
        assert!(result.records[0].is_missing());
    }

    #[test]
    fn test_ordering_invariants() {
        let set = zones(vec![rect(0.0, 0.0, 2.0, 3.0), rect(1.0, 1.0, 3.0, 2.0)]);
        let result = aggregate_grid(&set, &grid(), &ZonalOptions::default()).unwrap();

        assert_ordered(&result);
    }

    fn assert_ordered(result: &ZoneStatistics) {
        for record in &result.records {
            let get = |s| result.value(record.zone, s).unwrap();
            let (min, max) = (get(Statistic::Min), get(Statistic::Max));
            assert!(min <= get(Statistic::Median) && get(Statistic::Median) <= max);
            assert!(min <= get(Statistic::Mean) && get(Statistic::Mean) <= max);
        }
    }

    #[test]
    fn test_ordering_invariants_on_decimal_values() {
        let band = array![
            [12.3f32, 12.3, 0.1],
            [0.1, 0.1, 0.1],
            [12.3, 0.1, 27.65]
        ];
        let g = Grid::from_band(band, GeoTransform::new(0.0, 3.0, 1.0, -1.0), Crs::Epsg(32719), None).unwrap();
        let set = zones(vec![
            rect(0.0, 0.0, 3.0, 3.0),
            rect(0.0, 2.0, 2.0, 3.0),
            rect(0.0, 1.0, 3.0, 2.0),
            rect(1.0, 0.0, 3.0, 1.0),
        ]);

        let result = aggregate_grid(&set, &g, &ZonalOptions::default()).unwrap();
        assert_ordered(&result);
        assert_eq!(result.value(ZoneId(1), Statistic::Mean), Some(f64::from(12.3f32)));
        assert_eq!(result.value(ZoneId(2), Statistic::Mean), Some(f64::from(0.1f32)));
    }

    #[test]
    fn test_constant_zone_statistics_are_equal() {
        let g = Grid::from_band(
            ndarray::Array2::from_elem((4, 4), 0.1f64),
            GeoTransform::new(0.0, 4.0, 1.0, -1.0),
            Crs::Epsg(32719),
            None,
        )
        .unwrap();
        let set = zones(vec![rect(0.0, 0.0, 4.0, 4.0), rect(1.0, 1.0, 2.0, 4.0)]);

        let result = aggregate_grid(&set, &g, &ZonalOptions::default()).unwrap();
        assert_ordered(&result);
        for zone in [ZoneId(0), ZoneId(1)] {
            for stat in [Statistic::Min, Statistic::Max, Statistic::Mean, Statistic::Median] {
                assert_eq!(result.value(zone, stat), Some(0.1));
            }
        }
    }

    #[test]
    fn test_uncovered_cells_excluded() {
        let coverage = array![[true, true, false], [true, true, false], [false, false, false]];
        let g = Grid::from_band(
            array![[255u8, 255, 255], [7, 255, 255], [255, 255, 255]],
            GeoTransform::new(0.0, 3.0, 1.0, -1.0),
            Crs::Epsg(32719),
            None,
        )
        .unwrap()
        .with_coverage(coverage)
        .unwrap();
        let set = zones(vec![rect(0.0, 0.0, 3.0, 3.0), rect(2.0, 0.0, 3.0, 3.0)]);
        let options = ZonalOptions {
            stats: vec![Statistic::Count, Statistic::Min, Statistic::Max],
            all_touched: false,
        };

        let result = aggregate_grid(&set, &g, &options).unwrap();
        assert_eq!(result.value(ZoneId(0), Statistic::Count), Some(4.0));
        assert_eq!(result.value(ZoneId(0), Statistic::Min), Some(7.0));
        assert_eq!(result.value(ZoneId(0), Statistic::Max), Some(255.0));
        assert_eq!(result.missing_zones(), vec![ZoneId(1)]);
    }

    #[test]
    fn test_no_statistic_is_error() {
        let set = zones(vec![rect(0.0, 0.0, 3.0, 3.0)]);
        let options = ZonalOptions {
            stats: vec![],
            all_touched: false,
        };
        assert!(matches!(
            aggregate_grid(&set, &grid(), &options),
            Err(ZonalError::Aggregation { .. })
        ));
    }

    #[test]
    fn test_aggregate_any() {
        let set = zones(vec![rect(0.0, 0.0, 3.0, 3.0)]);
        let any = AnyGrid::from(grid());
        let result = aggregate_any(&set, &any, &ZonalOptions::default()).unwrap();
        assert_eq!(result.value(ZoneId(0), Statistic::Mean), Some(5.0));
    }
}
