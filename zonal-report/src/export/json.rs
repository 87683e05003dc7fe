//! Export du rapport en JSON
//!
//! Une section = `{ "name", "columns", "rows" }`, chaque ligne étant un objet
//! colonne -> valeur dans l'ordre des colonnes ; valeurs manquantes à `null`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use zonal::{Report, ReportSection};

use super::ReportWriter;

#[derive(Debug, Clone)]
pub struct JsonWriter {
    pub pretty: bool,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Représentation JSON d'une section
pub fn section_to_json(section: &ReportSection) -> Result<Value> {
    let columns: Vec<&str> = section.columns.iter().map(|c| c.name.as_str()).collect();

    let rows = section
        .rows
        .iter()
        .map(|row| -> Result<Value> {
            let mut object = Map::with_capacity(columns.len());
            for (name, cell) in columns.iter().zip(row) {
                object.insert((*name).to_string(), serde_json::to_value(cell)?);
            }
            Ok(Value::Object(object))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "name": section.name,
        "columns": columns,
        "rows": rows,
    }))
}

/// Représentation JSON d'un rapport complet
pub fn report_to_json(report: &Report) -> Result<Value> {
    let sections = report
        .sections
        .iter()
        .map(section_to_json)
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({ "sections": sections }))
}

impl ReportWriter for JsonWriter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write_to(&self, report: &Report, path: &Path) -> Result<()> {
        let value = report_to_json(report)?;

        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, &value)?;
        } else {
            serde_json::to_writer(&mut writer, &value)?;
        }
        writer.flush()?;

        Ok(())
    }
}
