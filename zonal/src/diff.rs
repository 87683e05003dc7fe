//! Différence entre deux périodes

use tracing::info;

use crate::error::{Result, ZonalError};
use crate::fingerprint;
use crate::stats::{ZoneRecord, ZoneStatistics};

/// Calcule `later - earlier` pour chaque zone et chaque statistique.
///
/// Les deux tables doivent provenir du même `ZoneSet` (même empreinte), avec
/// les mêmes statistiques et les mêmes zones dans le même ordre. Une valeur
/// manquante d'un côté donne une différence manquante.
pub fn difference(earlier: &ZoneStatistics, later: &ZoneStatistics) -> Result<ZoneStatistics> {
    if earlier.fingerprint != later.fingerprint {
        return Err(ZonalError::misalignment(format!(
            "tables come from different zone sets ({} vs {})",
            fingerprint::to_hex(&earlier.fingerprint),
            fingerprint::to_hex(&later.fingerprint)
        )));
    }
    if earlier.len() != later.len() {
        return Err(ZonalError::misalignment(format!(
            "{} zones vs {} zones",
            earlier.len(),
            later.len()
        )));
    }
    if earlier.stats != later.stats {
        return Err(ZonalError::misalignment(format!(
            "statistic columns differ ({} vs {})",
            join_names(earlier),
            join_names(later)
        )));
    }

    let records = earlier
        .records
        .iter()
        .zip(&later.records)
        .map(|(a, b)| {
            if a.zone != b.zone {
                return Err(ZonalError::misalignment(format!(
                    "zone {} is paired with zone {}",
                    a.zone, b.zone
                )));
            }
            let values = a
                .values
                .iter()
                .zip(&b.values)
                .map(|(x, y)| Some((*y)? - (*x)?))
                .collect();
            Ok(ZoneRecord {
                zone: a.zone,
                values,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(zones = records.len(), "Period difference computed");

    Ok(ZoneStatistics {
        stats: earlier.stats.clone(),
        records,
        fingerprint: earlier.fingerprint,
    })
}

fn join_names(table: &ZoneStatistics) -> String {
    table
        .stats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
