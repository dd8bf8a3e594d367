//! Exploratory summary of a cleaned export

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use traffic_ingest::{IngestStats, ParsedTable};

/// Sectors listed in the summary
pub const TOP_SECTORS: usize = 5;

/// Traffic statistics of one sector
#[derive(Debug, Clone, PartialEq)]
pub struct SectorProfile {
    pub entity_id: String,
    pub observations: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Distribution of observation counts across all sectors
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationCounts {
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

impl ObservationCounts {
    fn from_profiles(profiles: &[SectorProfile]) -> Option<Self> {
        let counts = profiles.iter().map(|p| p.observations);
        Some(Self {
            mean: counts.clone().sum::<usize>() as f64 / profiles.len() as f64,
            min: counts.clone().min()?,
            max: counts.max()?,
        })
    }
}

/// Shape, coverage and cadence of a parsed table
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub sectors: usize,
    /// Observations per sector, `None` for an empty table
    pub observation_counts: Option<ObservationCounts>,
    /// Sectors with the most observations, ties by id
    pub top_sectors: Vec<SectorProfile>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// First sector in file order
    pub sample_sector: Option<String>,
    /// Day gaps between consecutive sorted dates of the sample sector
    pub cadence: BTreeMap<i64, usize>,
    pub stats: IngestStats,
}

impl DataSummary {
    /// Summarize a table
    pub fn from_table(table: &ParsedTable) -> Self {
        let mut by_sector: HashMap<&str, Vec<f64>> = HashMap::new();
        for point in &table.points {
            by_sector
                .entry(point.entity_id.as_str())
                .or_default()
                .push(point.traffic);
        }

        let mut profiles: Vec<SectorProfile> = by_sector
            .iter()
            .map(|(id, values)| SectorProfile {
                entity_id: id.to_string(),
                observations: values.len(),
                mean: values.iter().sum::<f64>() / values.len() as f64,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
            .collect();
        profiles.sort_by(|a, b| {
            b.observations
                .cmp(&a.observations)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        let sectors = profiles.len();
        let observation_counts = ObservationCounts::from_profiles(&profiles);
        profiles.truncate(TOP_SECTORS);

        let first_date = table.points.iter().map(|p| p.date).min();
        let last_date = table.points.iter().map(|p| p.date).max();

        let sample_sector = table.points.first().map(|p| p.entity_id.clone());
        let cadence = sample_sector
            .as_deref()
            .map(|id| cadence_of(table, id))
            .unwrap_or_default();

        Self {
            rows: table.points.len(),
            columns: table.columns.clone(),
            sectors,
            observation_counts,
            top_sectors: profiles,
            first_date,
            last_date,
            sample_sector,
            cadence,
            stats: table.stats.clone(),
        }
    }
}

fn cadence_of(table: &ParsedTable, entity_id: &str) -> BTreeMap<i64, usize> {
    let mut dates: Vec<NaiveDate> = table
        .points
        .iter()
        .filter(|p| p.entity_id == entity_id)
        .map(|p| p.date)
        .collect();
    dates.sort();

    let mut counts = BTreeMap::new();
    for pair in dates.windows(2) {
        *counts.entry((pair[1] - pair[0]).num_days()).or_insert(0) += 1;
    }
    counts
}

impl fmt::Display for DataSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows:    {}", self.rows)?;
        writeln!(f, "Columns: {}", self.columns.join(", "))?;
        writeln!(f, "Sectors: {}", self.sectors)?;
        if let Some(counts) = &self.observation_counts {
            writeln!(
                f,
                "Observations per sector: mean={:.2} min={} max={}",
                counts.mean, counts.min, counts.max
            )?;
        }
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "Dates:   {} to {}", first, last)?;
        }
        writeln!(
            f,
            "Dropped: {} rows ({} header repeats, {} empty sector, {} unknown month, {} bad date, {} bad traffic)",
            self.stats.dropped(),
            self.stats.header_repeats,
            self.stats.empty_sector,
            self.stats.unknown_month,
            self.stats.bad_date,
            self.stats.bad_traffic
        )?;

        writeln!(f)?;
        writeln!(f, "Top sectors:")?;
        for profile in &self.top_sectors {
            writeln!(
                f,
                "  {:<12} n={:<5} mean={:.2} min={:.2} max={:.2}",
                profile.entity_id, profile.observations, profile.mean, profile.min, profile.max
            )?;
        }

        if let Some(sample) = &self.sample_sector {
            writeln!(f)?;
            writeln!(f, "Cadence of {} (days between observations):", sample)?;
            for (gap, count) in &self.cadence {
                writeln!(f, "  {:>4}: {}", gap, count)?;
            }
        }
        Ok(())
    }
}
