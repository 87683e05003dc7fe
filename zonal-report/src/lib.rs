//! # zonal-report
//!
//! Rapport de statistiques zonales de rasters climatiques.
//!
//! ## Features
//!
//! - Configuration JSON surchargeable par l'environnement et la CLI
//! - Une ou deux périodes ; deux périodes ajoutent une section de différences
//! - Export XLSX (une feuille par section) ou JSON
//! - Rapport d'exécution (console ou JSON)
//!
//! ## Usage CLI
//!
//! ```bash
//! # Calcul complet
//! zonal-report run --config run.json
//!
//! # Surcharges
//! zonal-report run --config run.json --target-crs EPSG:32719 --output stats.xlsx
//!
//! # Vérification à blanc (CRS, recouvrement)
//! zonal-report check --config run.json
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;

pub use config::RunConfig;
pub use report::{RunReport, RunStatus};
