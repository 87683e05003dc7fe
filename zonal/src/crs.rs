//! Identifiants de systèmes de coordonnées

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ZonalError;

/// Système de coordonnées de référence.
///
/// Les codes EPSG sont la forme normale ; toute autre définition (chaîne
/// PROJ, WKT) est conservée telle quelle et n'est exploitable qu'avec la
/// feature `proj`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Code EPSG
    Epsg(u32),
    /// Définition libre transmise à PROJ
    Definition(String),
}

impl Crs {
    /// WGS84 géographique (EPSG:4326)
    pub const WGS84: Crs = Crs::Epsg(4326);

    /// Code EPSG si connu
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Definition(_) => None,
        }
    }

    /// Vérifie si le CRS est géographique (degrés)
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Epsg(4326 | 4258 | 4269 | 4674))
    }

    /// Chaîne comprise par PROJ (`EPSG:XXXX` ou la définition brute)
    pub fn to_proj_string(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("EPSG:{}", code),
            Crs::Definition(def) => def.clone(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Definition(def) => f.write_str(def),
        }
    }
}

impl FromStr for Crs {
    type Err = ZonalError;

    /// Accepte `EPSG:32719`, `epsg:32719`, `32719`,
    /// `urn:ogc:def:crs:EPSG::32719` et `http://www.opengis.net/def/crs/EPSG/0/32719`.
    /// `CRS84` est traité comme EPSG:4326 (ordre lon/lat).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ZonalError::InvalidCrs("empty CRS identifier".to_string()));
        }

        if trimmed.ends_with("CRS84") {
            return Ok(Crs::WGS84);
        }

        let upper = trimmed.to_ascii_uppercase();
        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            Some(rest)
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            upper.rsplit(':').next()
        } else if upper.contains("/DEF/CRS/EPSG/") {
            upper.rsplit('/').next()
        } else if upper.chars().all(|c| c.is_ascii_digit()) {
            Some(upper.as_str())
        } else {
            None
        };

        match code {
            Some(code) => code
                .parse::<u32>()
                .map(Crs::Epsg)
                .map_err(|_| ZonalError::InvalidCrs(trimmed.to_string())),
            // Chaîne PROJ ou WKT
            None if trimmed.starts_with('+') || trimmed.contains('[') => {
                Ok(Crs::Definition(trimmed.to_string()))
            }
            None => Err(ZonalError::InvalidCrs(trimmed.to_string())),
        }
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
