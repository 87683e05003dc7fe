//! Writers du rapport (XLSX, JSON)
//!
//! Le fichier est d'abord écrit à côté de la cible puis renommé : une erreur
//! d'écriture ne laisse jamais de fichier partiel à l'emplacement demandé.

pub mod json;
pub mod xlsx;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zonal::Report;

use crate::config::SheetStyle;

pub use json::JsonWriter;
pub use xlsx::XlsxWriter;

/// Format de sortie, déduit de l'extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Écrit un rapport assemblé dans un fichier
pub trait ReportWriter {
    /// Nom du format (pour les logs)
    fn name(&self) -> &'static str;

    /// Écrit le rapport dans `path` (fichier temporaire puis renommage)
    fn write(&self, report: &Report, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        if let Err(e) = self.write_to(report, &tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move report to {}", path.display()))
    }

    /// Écriture effective dans un chemin donné
    fn write_to(&self, report: &Report, path: &Path) -> Result<()>;
}

/// Choisit le writer selon l'extension du fichier de sortie
pub fn writer_for_path(path: &Path, style: &SheetStyle) -> Result<Box<dyn ReportWriter>> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Xlsx) => Ok(Box::new(XlsxWriter::new(style.clone()))),
        Some(OutputFormat::Json) => Ok(Box::new(JsonWriter::default())),
        None => anyhow::bail!(
            "Unsupported output extension: {} (use .xlsx or .json)",
            path.display()
        ),
    }
}

/// Chemin temporaire dans le même dossier (renommage atomique), même extension
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{}.partial", name))
}
