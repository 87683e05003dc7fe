//! Export du rapport en classeur XLSX
//!
//! Une feuille par section : en-tête (gras, figé), colonnes de largeur fixe,
//! statistiques au format numérique configuré, valeurs manquantes laissées vides.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;
use zonal::table::ColumnKind;
use zonal::{Cell, Report, ReportSection};

use super::ReportWriter;
use crate::config::SheetStyle;

/// Longueur maximale d'un nom de feuille Excel
const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Default)]
pub struct XlsxWriter {
    style: SheetStyle,
}

impl XlsxWriter {
    pub fn new(style: SheetStyle) -> Self {
        Self { style }
    }

    fn number_format(&self) -> Format {
        let format = match self.style.stat_decimals {
            0 => "0".to_string(),
            n => format!("0.{}", "0".repeat(n as usize)),
        };
        Format::new().set_num_format(format)
    }

    fn write_section(&self, sheet: &mut Worksheet, section: &ReportSection) -> Result<()> {
        let header = if self.style.header_bold {
            Format::new().set_bold()
        } else {
            Format::new()
        };
        let number = self.number_format();

        for (col, column) in section.columns.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(0, col, &column.name, &header)?;
            sheet.set_column_width(col, self.style.column_width)?;
        }

        for (r, row) in section.rows.iter().enumerate() {
            let r = r as u32 + 1;
            for (c, (cell, column)) in row.iter().zip(&section.columns).enumerate() {
                let c = c as u16;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                    Cell::Integer(i) => {
                        sheet.write_number(r, c, *i as f64)?;
                    }
                    Cell::Number(v) if column.kind == ColumnKind::Statistic => {
                        sheet.write_number_with_format(r, c, *v, &number)?;
                    }
                    Cell::Number(v) => {
                        sheet.write_number(r, c, *v)?;
                    }
                    Cell::Bool(b) => {
                        sheet.write_boolean(r, c, *b)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        if self.style.freeze_header {
            sheet.set_freeze_panes(1, 0)?;
        }

        Ok(())
    }
}

impl ReportWriter for XlsxWriter {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn write_to(&self, report: &Report, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let mut used = HashSet::new();

        for section in &report.sections {
            let name = unique_sheet_name(&section.name, &mut used);
            debug!(section = %section.name, sheet = %name, rows = section.rows.len(), "Writing sheet");

            let sheet = workbook.add_worksheet();
            sheet.set_name(&name)?;
            self.write_section(sheet, section)?;
        }

        workbook
            .save(path)
            .with_context(|| format!("Failed to write workbook: {}", path.display()))?;
        Ok(())
    }
}

/// Nom de feuille valide : caractères interdits remplacés, 31 caractères au plus
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();

    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    if truncated.is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

/// Nom de feuille unique dans le classeur (comparaison insensible à la casse)
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonal::table::Column;

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("1981/2010"), "1981_2010");
        assert_eq!(sanitize_sheet_name("a[b]:c*?\\"), "a_b__c___");
        assert_eq!(sanitize_sheet_name("''"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).chars().count(), 31);
    }

    #[test]
    fn test_unique_sheet_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Period", &mut used), "Period");
        assert_eq!(unique_sheet_name("period", &mut used), "period (2)");
        assert_eq!(unique_sheet_name("Period", &mut used), "Period (3)");

        let long = "y".repeat(40);
        let first = unique_sheet_name(&long, &mut used);
        let second = unique_sheet_name(&long, &mut used);
        assert_eq!(first.chars().count(), 31);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn test_write_workbook() {
        let report = Report {
            sections: vec![ReportSection {
                name: "2041/2070".to_string(),
                columns: vec![
                    Column {
                        name: "name".to_string(),
                        kind: ColumnKind::Identity,
                    },
                    Column {
                        name: "mean".to_string(),
                        kind: ColumnKind::Statistic,
                    },
                ],
                rows: vec![
                    vec![Cell::Text("Maipo".into()), Cell::Number(12.345)],
                    vec![Cell::Text("Talagante".into()), Cell::Empty],
                ],
            }],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        XlsxWriter::default().write(&report, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // Archive ZIP
        assert_eq!(&bytes[..2], b"PK");
    }
}
