//! Types d'erreurs pour le crate zonal

use std::path::PathBuf;

use thiserror::Error;

use crate::crs::Crs;
use crate::types::{Bounds, ZoneId};

/// Cause brute remontée par une primitive externe (PROJ, décodeur TIFF, ...)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Erreurs pouvant survenir pendant un calcul de statistiques zonales.
///
/// Toutes ces erreurs sont fatales pour le run : il n'y a ni mode de succès
/// partiel ni retry.
#[derive(Debug, Error)]
pub enum ZonalError {
    /// Un fichier raster ou vecteur requis n'existe pas
    #[error("Missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    /// La source vecteur ne contient aucune zone
    #[error("Vector source {} contains no polygon zone", .0.display())]
    EmptyVector(PathBuf),

    /// Les emprises raster et zones ne se recouvrent pas, même après tolérance
    #[error(
        "Zones {zones} and raster {raster} do not overlap (tolerance {tolerance}): \
         check the study area and the CRS of both inputs"
    )]
    Overlap {
        zones: Bounds,
        raster: Bounds,
        tolerance: f64,
    },

    /// La transformation de coordonnées sous-jacente a échoué
    #[error("Reprojection {from} → {to} failed: {source}")]
    Reprojection {
        from: Crs,
        to: Crs,
        #[source]
        source: BoxError,
    },

    /// Le calcul zonal a échoué pour une raison autre qu'une zone vide
    #[error("Aggregation failed{}: {reason}", .zone.map(|z| format!(" for zone {z}")).unwrap_or_default())]
    Aggregation {
        zone: Option<ZoneId>,
        reason: String,
    },

    /// Deux tables de statistiques ne correspondent pas 1:1
    #[error("Statistics tables are misaligned: {0}")]
    Misalignment(String),

    /// Identifiant de système de coordonnées non reconnu
    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    /// Nom de statistique non reconnu
    #[error("Invalid statistic: {0}")]
    InvalidStatistic(String),

    /// Erreur de lecture d'un fichier d'entrée
    #[error("Parse error in {file}: {reason}")]
    Parse { file: String, reason: String },

    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZonalError {
    /// Crée une erreur de lecture avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur d'agrégation, éventuellement rattachée à une zone
    pub fn aggregation(zone: Option<ZoneId>, reason: impl Into<String>) -> Self {
        Self::Aggregation {
            zone,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de désalignement entre tables
    pub fn misalignment(reason: impl Into<String>) -> Self {
        Self::Misalignment(reason.into())
    }

    /// Crée une erreur de reprojection en conservant la cause d'origine
    pub fn reprojection(from: &Crs, to: &Crs, source: impl Into<BoxError>) -> Self {
        Self::Reprojection {
            from: from.clone(),
            to: to.clone(),
            source: source.into(),
        }
    }
}

/// Alias de résultat du crate
pub type Result<T> = std::result::Result<T, ZonalError>;
