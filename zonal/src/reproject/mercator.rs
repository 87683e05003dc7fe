//! Projection Web Mercator (EPSG:3857)
//!
//! Modèle sphérique de rayon égal au demi-grand axe WGS84.

use super::ellipsoid::Wgs84;
use super::Geographic;

/// Latitude au-delà de laquelle la projection sort du carré Web Mercator
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Convertit des coordonnées géographiques vers Web Mercator
pub fn geographic_to_web_mercator(geo: Geographic) -> (f64, f64) {
    let r = Wgs84::A;
    let max_lat = MAX_LATITUDE.to_radians();
    let lat = geo.lat.clamp(-max_lat, max_lat);

    let x = r * geo.lon;
    let y = r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

    (x, y)
}

/// Convertit Web Mercator vers des coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let r = Wgs84::A;

    let lon = x / r;
    let lat = 2.0 * (y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    Geographic::new(lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_santiago_to_web_mercator() {
        // Santiago : -70.65°E, -33.45°N
        let (x, y) = geographic_to_web_mercator(Geographic::from_degrees(-70.65, -33.45));

        assert!((x - (-7_864_722.0)).abs() < 1.0, "x={}", x);
        assert!((y - (-3_955_187.0)).abs() < 1.0, "y={}", y);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = geographic_to_web_mercator(Geographic::from_degrees(2.35, 48.85));
        let (lon, lat) = web_mercator_to_geographic(x, y).to_degrees();

        assert!((lon - 2.35).abs() < 1e-9, "lon={}", lon);
        assert!((lat - 48.85).abs() < 1e-9, "lat={}", lat);
    }
}
