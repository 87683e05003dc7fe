//! Statistiques zonales
//!
//! - [`mask`] : rastérisation des polygones en masques de cellules
//! - [`zonal`] : agrégation par zone
//! - [`Statistic`] / [`Summary`] : définition et calcul des statistiques

pub mod mask;
pub mod zonal;

pub use zonal::{aggregate_any, aggregate_grid, zonal_stats, ZonalOptions, ZoneRecord, ZoneStatistics};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ZonalError;

/// Statistique calculable sur les cellules d'une zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Statistic {
    Count,
    Min,
    Max,
    Mean,
    Sum,
    /// Écart-type de population (ddof = 0)
    Std,
    Median,
    Range,
    /// Percentile P (0 ≤ P ≤ 100), interpolation linéaire entre rangs
    Percentile(f64),
}

impl Statistic {
    /// Statistiques calculées par défaut
    pub fn default_set() -> Vec<Statistic> {
        vec![
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::Std,
            Statistic::Median,
        ]
    }

    /// Percentile validé
    pub fn percentile(p: f64) -> Result<Self, ZonalError> {
        if p.is_finite() && (0.0..=100.0).contains(&p) {
            Ok(Statistic::Percentile(p))
        } else {
            Err(ZonalError::InvalidStatistic(format!(
                "percentile {} is outside [0, 100]",
                p
            )))
        }
    }

    /// Parse une liste de noms
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Statistic>, ZonalError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Count => f.write_str("count"),
            Statistic::Min => f.write_str("min"),
            Statistic::Max => f.write_str("max"),
            Statistic::Mean => f.write_str("mean"),
            Statistic::Sum => f.write_str("sum"),
            Statistic::Std => f.write_str("std"),
            Statistic::Median => f.write_str("median"),
            Statistic::Range => f.write_str("range"),
            Statistic::Percentile(p) => write!(f, "percentile_{}", p),
        }
    }
}

impl FromStr for Statistic {
    type Err = ZonalError;

    /// Accepte `min`, `max`, `mean`, `std`, `median`, `count`, `sum`, `range`,
    /// `percentile_90` et sa forme courte `p90`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let stat = match name.as_str() {
            "count" => Statistic::Count,
            "min" => Statistic::Min,
            "max" => Statistic::Max,
            "mean" => Statistic::Mean,
            "sum" => Statistic::Sum,
            "std" | "stdev" | "std_dev" => Statistic::Std,
            "median" => Statistic::Median,
            "range" => Statistic::Range,
            other => {
                let raw = other
                    .strip_prefix("percentile_")
                    .or_else(|| other.strip_prefix('p'))
                    .ok_or_else(|| ZonalError::InvalidStatistic(s.to_string()))?;
                let p: f64 = raw
                    .parse()
                    .map_err(|_| ZonalError::InvalidStatistic(s.to_string()))?;
                Statistic::percentile(p)?
            }
        };
        Ok(stat)
    }
}

impl Serialize for Statistic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Statistic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Valeurs triées d'une zone, prêtes pour le calcul des statistiques
#[derive(Debug, Clone)]
pub struct Summary {
    sorted: Vec<f64>,
    sum: f64,
}

impl Summary {
    /// `None` si aucune valeur
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let sum = values.iter().sum();
        Some(Self {
            sorted: values,
            sum,
        })
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    /// Moyenne, bornée par [min, max] (l'arrondi de la somme peut en sortir)
    pub fn mean(&self) -> f64 {
        let n = self.count();
        (self.sum / n as f64).clamp(self.sorted[0], self.sorted[n - 1])
    }

    /// Écart-type de population
    pub fn std(&self) -> f64 {
        let mean = self.mean();
        let var = self
            .sorted
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.count() as f64;
        var.sqrt()
    }

    /// Percentile par interpolation linéaire entre rangs
    pub fn percentile(&self, p: f64) -> f64 {
        let n = self.count();
        let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        let (a, b) = (self.sorted[lo], self.sorted[hi]);
        a + (b - a) * (rank - lo as f64)
    }

    pub fn get(&self, stat: Statistic) -> f64 {
        let n = self.count();
        match stat {
            Statistic::Count => n as f64,
            Statistic::Min => self.sorted[0],
            Statistic::Max => self.sorted[n - 1],
            Statistic::Mean => self.mean(),
            Statistic::Sum => self.sum,
            Statistic::Std => self.std(),
            Statistic::Median => {
                if n % 2 == 0 {
                    (self.sorted[n / 2 - 1] + self.sorted[n / 2]) / 2.0
                } else {
                    self.sorted[n / 2]
                }
            }
            Statistic::Range => self.sorted[n - 1] - self.sorted[0],
            Statistic::Percentile(p) => self.percentile(p),
        }
    }
}

/// Calcule les statistiques demandées ; toutes manquantes si aucune valeur
pub fn compute(values: Vec<f64>, stats: &[Statistic]) -> Vec<Option<f64>> {
    match Summary::from_values(values) {
        Some(summary) => stats.iter().map(|&s| Some(summary.get(s))).collect(),
        None => vec![None; stats.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_names() {
        assert_eq!("min".parse::<Statistic>().unwrap(), Statistic::Min);
        assert_eq!("STD".parse::<Statistic>().unwrap(), Statistic::Std);
        assert_eq!(
            "percentile_90".parse::<Statistic>().unwrap(),
            Statistic::Percentile(90.0)
        );
        assert_eq!("p25".parse::<Statistic>().unwrap(), Statistic::Percentile(25.0));
        assert!("p120".parse::<Statistic>().is_err());
        assert!("mode".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for stat in [Statistic::Median, Statistic::Percentile(12.5), Statistic::Range] {
            assert_eq!(stat.to_string().parse::<Statistic>().unwrap(), stat);
        }
        assert_eq!(Statistic::Percentile(90.0).to_string(), "percentile_90");
    }

    #[test]
    fn test_compute_one_to_nine() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let stats = [
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::Median,
            Statistic::Count,
            Statistic::Sum,
            Statistic::Range,
        ];

        let result = compute(values, &stats);
        let expected = [1.0, 9.0, 5.0, 5.0, 9.0, 45.0, 8.0];
        for (got, want) in result.iter().zip(expected) {
            assert_relative_eq!(got.unwrap(), want);
        }
    }

    #[test]
    fn test_population_std() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = compute(values, &[Statistic::Std]);
        assert_relative_eq!(result[0].unwrap(), 2.0);
    }

    #[test]
    fn test_mean_stays_within_bounds() {
        let summary = Summary::from_values(vec![0.1; 3]).unwrap();
        assert_eq!(summary.get(Statistic::Mean), 0.1);
        assert_eq!(summary.get(Statistic::Std), 0.0);

        let summary = Summary::from_values(vec![12.3; 7]).unwrap();
        let mean = summary.get(Statistic::Mean);
        assert!(summary.get(Statistic::Min) <= mean && mean <= summary.get(Statistic::Max));
    }

    #[test]
    fn test_even_median_and_percentile() {
        let summary = Summary::from_values(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_relative_eq!(summary.get(Statistic::Median), 2.5);
        assert_relative_eq!(summary.percentile(0.0), 1.0);
        assert_relative_eq!(summary.percentile(100.0), 4.0);
        assert_relative_eq!(summary.percentile(50.0), 2.5);
        assert_relative_eq!(summary.percentile(90.0), 3.7, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_values_all_missing() {
        let result = compute(vec![], &Statistic::default_set());
        assert_eq!(result, vec![None; 5]);
    }
}
