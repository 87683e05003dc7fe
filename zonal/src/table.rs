//! Assemblage des tables du rapport
//!
//! Chaque table de statistiques devient une section : colonnes d'identification
//! (attributs des zones) d'abord, puis une colonne par statistique, dans le même
//! ordre pour toutes les sections.

use serde::Serialize;

use crate::error::{Result, ZonalError};
use crate::fingerprint::{self, zone_set_fingerprint};
use crate::stats::ZoneStatistics;
use crate::types::{AttributeValue, ZoneSet};

/// Nom de la colonne d'identifiant optionnelle
pub const ZONE_ID_COLUMN: &str = "zone_id";

/// Valeur d'une cellule du rapport
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    /// Valeur manquante
    Empty,
}

impl From<&AttributeValue> for Cell {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Text(s) => Cell::Text(s.clone()),
            AttributeValue::Integer(i) => Cell::Integer(*i),
            AttributeValue::Float(f) => Cell::Number(*f),
            AttributeValue::Bool(b) => Cell::Bool(*b),
            AttributeValue::Null => Cell::Empty,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// Rôle d'une colonne
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    ZoneId,
    Identity,
    Statistic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Une section du rapport (une feuille de classeur)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportSection {
    /// Index d'une colonne par nom
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cellule (ligne, nom de colonne)
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }
}

/// Ensemble ordonné de sections prêt pour l'écriture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, name: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Options d'assemblage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyOptions {
    /// Colonnes d'identification ; `None` = tous les attributs, dans l'ordre du fichier
    pub identity_fields: Option<Vec<String>>,
    /// Ajoute une colonne `zone_id` en tête
    pub include_zone_id: bool,
}

fn identity_fields<'a>(zone_set: &'a ZoneSet, options: &'a AssemblyOptions) -> Result<&'a [String]> {
    match &options.identity_fields {
        None => Ok(&zone_set.fields),
        Some(fields) => {
            if let Some(unknown) = fields.iter().find(|f| !zone_set.fields.contains(*f)) {
                return Err(ZonalError::misalignment(format!(
                    "identity field '{}' is not an attribute of the zones (available: {})",
                    unknown,
                    zone_set.fields.join(", ")
                )));
            }
            Ok(fields)
        }
    }
}

/// Joint une table de statistiques aux attributs des zones
pub fn assemble_section(
    name: &str,
    zone_set: &ZoneSet,
    table: &ZoneStatistics,
    options: &AssemblyOptions,
) -> Result<ReportSection> {
    if table.fingerprint != zone_set_fingerprint(zone_set) {
        return Err(ZonalError::misalignment(format!(
            "section '{}' was not computed from this zone set (fingerprint {})",
            name,
            fingerprint::to_hex(&table.fingerprint)
        )));
    }

    let fields = identity_fields(zone_set, options)?;

    let mut columns = Vec::with_capacity(fields.len() + table.stats.len() + 1);
    if options.include_zone_id {
        columns.push(Column {
            name: ZONE_ID_COLUMN.to_string(),
            kind: ColumnKind::ZoneId,
        });
    }
    columns.extend(fields.iter().map(|f| Column {
        name: f.clone(),
        kind: ColumnKind::Identity,
    }));
    columns.extend(table.stats.iter().map(|s| Column {
        name: s.to_string(),
        kind: ColumnKind::Statistic,
    }));

    // Les lignes JSON sont indexées par nom de colonne
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].iter().any(|c| c.name == column.name) {
            return Err(ZonalError::misalignment(format!(
                "section '{}' has two columns named '{}': exclude that attribute from the identity fields",
                name, column.name
            )));
        }
    }

    let rows = table
        .records
        .iter()
        .map(|record| {
            let zone = zone_set.get(record.zone).ok_or_else(|| {
                ZonalError::misalignment(format!("zone {} is not in the zone set", record.zone))
            })?;

            let mut row = Vec::with_capacity(columns.len());
            if options.include_zone_id {
                row.push(Cell::Integer(zone.id.0 as i64));
            }
            row.extend(fields.iter().map(|f| Cell::from(zone.attribute(f))));
            row.extend(record.values.iter().map(|v| Cell::from(*v)));
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ReportSection {
        name: name.to_string(),
        columns,
        rows,
    })
}

/// Assemble une section par table, dans l'ordre donné
pub fn assemble(
    zone_set: &ZoneSet,
    tables: &[(&str, &ZoneStatistics)],
    options: &AssemblyOptions,
) -> Result<Report> {
    let sections = tables
        .iter()
        .map(|(name, table)| assemble_section(name, zone_set, table, options))
        .collect::<Result<Vec<_>>>()?;
    Ok(Report { sections })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::stats::{Statistic, ZoneRecord};
    use crate::types::ZoneId;
    use geo::{polygon, MultiPolygon};
    use std::collections::HashMap;

    fn zone_set() -> ZoneSet {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        let zone = |name: &str, code: i64| {
            let mut attrs = HashMap::new();
            attrs.insert("name".to_string(), AttributeValue::Text(name.to_string()));
            attrs.insert("code".to_string(), AttributeValue::Integer(code));
            (square.clone(), attrs)
        };
        ZoneSet::new(
            vec![zone("Maipo", 13), zone("Cachapoal", 6)],
            vec!["name".to_string(), "code".to_string()],
            Crs::Epsg(32719),
        )
    }

    fn table(zone_set: &ZoneSet) -> ZoneStatistics {
        ZoneStatistics {
            stats: vec![Statistic::Mean, Statistic::Max],
            records: vec![
                ZoneRecord {
                    zone: ZoneId(0),
                    values: vec![Some(1.5), Some(3.0)],
                },
                ZoneRecord {
                    zone: ZoneId(1),
                    values: vec![None, None],
                },
            ],
            fingerprint: zone_set_fingerprint(zone_set),
        }
    }

    #[test]
    fn test_identity_columns_first() {
        let set = zone_set();
        let section = assemble_section("2020", &set, &table(&set), &AssemblyOptions::default()).unwrap();

        let names: Vec<&str> = section.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "code", "mean", "max"]);
        assert_eq!(section.cell(0, "name"), Some(&Cell::Text("Maipo".to_string())));
        assert_eq!(section.cell(0, "mean"), Some(&Cell::Number(1.5)));
        assert_eq!(section.cell(1, "max"), Some(&Cell::Empty));
    }

    #[test]
    fn test_zone_id_and_selected_fields() {
        let set = zone_set();
        let options = AssemblyOptions {
            identity_fields: Some(vec!["code".to_string()]),
            include_zone_id: true,
        };
        let section = assemble_section("2020", &set, &table(&set), &options).unwrap();

        let names: Vec<&str> = section.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zone_id", "code", "mean", "max"]);
        assert_eq!(section.rows[1][0], Cell::Integer(1));
    }

    #[test]
    fn test_unknown_identity_field() {
        let set = zone_set();
        let options = AssemblyOptions {
            identity_fields: Some(vec!["region".to_string()]),
            include_zone_id: false,
        };
        assert!(assemble_section("2020", &set, &table(&set), &options).is_err());
    }

    #[test]
    fn test_foreign_table_rejected() {
        let set = zone_set();
        let mut foreign = table(&set);
        foreign.fingerprint = [0; 32];

        let err = assemble_section("2020", &set, &foreign, &AssemblyOptions::default()).unwrap_err();
        assert!(matches!(err, ZonalError::Misalignment(_)));
    }

    #[test]
    fn test_attribute_named_like_a_column_rejected() {
        let mut set = zone_set();
        set.fields.push("mean".to_string());
        set.fields.push(ZONE_ID_COLUMN.to_string());
        let stats = table(&set);

        let all_fields = AssemblyOptions {
            identity_fields: None,
            include_zone_id: true,
        };
        let err = assemble_section("2020", &set, &stats, &all_fields).unwrap_err();
        assert!(matches!(err, ZonalError::Misalignment(msg) if msg.contains("'zone_id'")));

        let only_mean = AssemblyOptions {
            identity_fields: Some(vec!["name".into(), "mean".into()]),
            include_zone_id: false,
        };
        let err = assemble_section("2020", &set, &stats, &only_mean).unwrap_err();
        assert!(matches!(err, ZonalError::Misalignment(msg) if msg.contains("'mean'")));

        // Sans la colonne zone_id, l'attribut homonyme est une colonne comme une autre
        let zone_id_attr = AssemblyOptions {
            identity_fields: Some(vec!["name".into(), ZONE_ID_COLUMN.into()]),
            include_zone_id: false,
        };
        assert!(assemble_section("2020", &set, &stats, &zone_id_attr).is_ok());
    }

    #[test]
    fn test_sections_keep_order() {
        let set = zone_set();
        let t = table(&set);
        let report = assemble(
            &set,
            &[("2000", &t), ("2020", &t), ("Differences", &t)],
            &AssemblyOptions::default(),
        )
        .unwrap();

        let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["2000", "2020", "Differences"]);
        assert!(report.section("Differences").is_some());
    }

    #[test]
    fn test_cells_serialize_as_json_scalars() {
        let json = serde_json::to_value(vec![
            Cell::Text("a".to_string()),
            Cell::Number(1.5),
            Cell::Empty,
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!(["a", 1.5, null]));
    }
}
