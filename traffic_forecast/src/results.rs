//! Results artifact
//!
//! One row per scored sector, written as `entity_id,actual,predicted`.

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ENTITY_COLUMN: &str = "entity_id";
const ACTUAL_COLUMN: &str = "actual";
const PREDICTED_COLUMN: &str = "predicted";

/// Forecast scored against the held-out observation of one sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Sector identifier
    pub entity_id: String,
    /// Held-out traffic
    pub actual: f64,
    /// Median forecast
    pub predicted: f64,
}

impl PredictionResult {
    /// Signed error, `actual - predicted`
    pub fn error(&self) -> f64 {
        self.actual - self.predicted
    }
}

/// Results table backed by a DataFrame
#[derive(Debug, Clone)]
pub struct ResultsTable {
    df: DataFrame,
}

impl ResultsTable {
    /// Build a table from scored rows
    pub fn from_results(results: &[PredictionResult]) -> Result<Self> {
        let ids: Vec<&str> = results.iter().map(|r| r.entity_id.as_str()).collect();
        let actual: Vec<f64> = results.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = results.iter().map(|r| r.predicted).collect();

        let df = DataFrame::new(vec![
            Series::new(ENTITY_COLUMN, ids),
            Series::new(ACTUAL_COLUMN, actual),
            Series::new(PREDICTED_COLUMN, predicted),
        ])?;

        Ok(Self { df })
    }

    /// Load a table written by [`ResultsTable::write_csv`]
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // Sector ids such as "0042" must stay text
        let overrides = Schema::from_iter([Field::new(ENTITY_COLUMN, DataType::Utf8)]);
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .with_dtypes(Some(Arc::new(overrides)))
            .finish()?;

        for column in [ENTITY_COLUMN, ACTUAL_COLUMN, PREDICTED_COLUMN] {
            if df.column(column).is_err() {
                return Err(ForecastError::DataError(format!(
                    "Results file has no '{}' column",
                    column
                )));
            }
        }

        Ok(Self { df })
    }

    /// Write the table as comma-separated text with a header row.
    ///
    /// Rows go to a sibling `.tmp` file that is renamed over `path` once
    /// complete, so an existing file is never left truncated.
    pub fn write_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let staging = staging_path(path);

        if let Err(e) = self.write_staged(&staging) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    fn write_staged(&mut self, staging: &Path) -> Result<()> {
        let mut file = File::create(staging)?;
        CsvWriter::new(&mut file)
            .has_header(true)
            .finish(&mut self.df)?;
        file.sync_all()?;
        Ok(())
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Convert back to rows, skipping rows with missing cells
    pub fn to_results(&self) -> Result<Vec<PredictionResult>> {
        let ids = self.df.column(ENTITY_COLUMN)?.cast(&DataType::Utf8)?;
        let actual = self.df.column(ACTUAL_COLUMN)?.cast(&DataType::Float64)?;
        let predicted = self.df.column(PREDICTED_COLUMN)?.cast(&DataType::Float64)?;

        let rows = ids
            .utf8()?
            .into_iter()
            .zip(actual.f64()?.into_iter())
            .zip(predicted.f64()?.into_iter())
            .filter_map(|((id, actual), predicted)| {
                Some(PredictionResult {
                    entity_id: id?.to_string(),
                    actual: actual?,
                    predicted: predicted?,
                })
            })
            .collect();

        Ok(rows)
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
