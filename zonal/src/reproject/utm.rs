//! Projection UTM (Universal Transverse Mercator) sur WGS84
//!
//! EPSG:326xx (hémisphère nord) et EPSG:327xx (hémisphère sud).

use super::ellipsoid::Wgs84;
use super::Geographic;

/// Facteur d'échelle sur le méridien central
const K0: f64 = 0.9996;

const FALSE_EASTING: f64 = 500_000.0;

/// False northing de l'hémisphère sud
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Zone et hémisphère d'un code EPSG UTM : `Some((zone, south))`
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    match epsg {
        32601..=32660 => Some((epsg - 32600, false)),
        32701..=32760 => Some((epsg - 32700, true)),
        _ => None,
    }
}

/// Longitude du méridien central (radians)
fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Convertit des coordonnées géographiques WGS84 vers UTM
pub fn geographic_to_utm(geo: Geographic, zone: u32, south: bool) -> (f64, f64) {
    let (a, e2, ep2) = (Wgs84::A, Wgs84::E2, Wgs84::EP2);
    let lat = geo.lat;

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = ep2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (geo.lon - central_meridian(zone));

    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

    let northing = if south {
        northing + FALSE_NORTHING_SOUTH
    } else {
        northing
    };

    (easting, northing)
}

/// Arc de méridien de l'équateur à `lat` (radians)
fn meridional_arc(lat: f64) -> f64 {
    let e2 = Wgs84::E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    Wgs84::A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// Convertit UTM vers des coordonnées géographiques WGS84
pub fn utm_to_geographic(x: f64, y: f64, zone: u32, south: bool) -> Geographic {
    let (a, e2, ep2) = (Wgs84::A, Wgs84::E2, Wgs84::EP2);

    let x = x - FALSE_EASTING;
    let y = if south { y - FALSE_NORTHING_SOUTH } else { y };

    // Latitude du pied de la verticale
    let m = y / K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                    - 252.0 * ep2
                    - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Geographic::new(lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        assert!((a - b).abs() < tol, "{}: {} vs {}", msg, a, b);
    }

    #[test]
    fn test_parse_utm_epsg() {
        assert_eq!(parse_utm_epsg(32630), Some((30, false)));
        assert_eq!(parse_utm_epsg(32719), Some((19, true)));
        assert_eq!(parse_utm_epsg(32600), None);
        assert_eq!(parse_utm_epsg(4326), None);
    }

    // Madrid (-3.7037, 40.4168) → UTM 30N : (440298.94, 4474257.31)
    #[test]
    fn test_madrid_forward() {
        let (e, n) = geographic_to_utm(Geographic::from_degrees(-3.7037, 40.4168), 30, false);
        assert_close(e, 440_298.94, 1.0, "easting");
        assert_close(n, 4_474_257.31, 1.0, "northing");
    }

    // Buenos Aires (-58.3816, -34.6037) → UTM 21S : (373317.50, 6170036.17)
    #[test]
    fn test_buenos_aires_forward() {
        let (e, n) = geographic_to_utm(Geographic::from_degrees(-58.3816, -34.6037), 21, true);
        assert_close(e, 373_317.50, 1.0, "easting");
        assert_close(n, 6_170_036.17, 1.0, "northing");
    }

    #[test]
    fn test_inverse_buenos_aires() {
        let (lon, lat) = utm_to_geographic(373_317.50, 6_170_036.17, 21, true).to_degrees();
        assert_close(lon, -58.3816, 1e-5, "lon");
        assert_close(lat, -34.6037, 1e-5, "lat");
    }

    #[test]
    fn test_roundtrip_santiago() {
        let geo = Geographic::from_degrees(-70.65, -33.45);
        let (e, n) = geographic_to_utm(geo, 19, true);
        let (lon, lat) = utm_to_geographic(e, n, 19, true).to_degrees();

        assert_close(lon, -70.65, 1e-7, "lon");
        assert_close(lat, -33.45, 1e-7, "lat");
    }
}
