//! Context / ground-truth splitting
//!
//! The last grid point of every series is held out and scored against the
//! forecast made from everything before it.

use crate::data::{Series, SeriesPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// History handed to the forecasting oracle for one sector
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindow {
    /// Sector identifier
    pub entity_id: String,
    /// Every point of the series except the last
    pub points: Vec<SeriesPoint>,
}

impl ContextWindow {
    /// Get the dates as a vector
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Get the traffic values as a vector
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.traffic).collect()
    }

    /// Get the length of the window
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Held-out final observation of one sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthPoint {
    /// Sector identifier
    pub entity_id: String,
    /// Date of the last grid point
    pub date: NaiveDate,
    /// Traffic at that date
    pub traffic: f64,
}

/// Contexts and ground truth for every splittable series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitSet {
    /// Context windows, in series order
    pub contexts: Vec<ContextWindow>,
    /// Ground truth keyed by sector id
    pub ground_truth: BTreeMap<String, GroundTruthPoint>,
}

impl SplitSet {
    /// Number of sectors
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Check if there is nothing to forecast
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Split a series into its context and last point.
///
/// Returns `None` for series with fewer than two points, which leave no context.
pub fn split_series(series: &Series) -> Option<(ContextWindow, GroundTruthPoint)> {
    let (last, history) = series.points().split_last()?;
    if history.is_empty() {
        return None;
    }

    let context = ContextWindow {
        entity_id: series.entity_id().to_string(),
        points: history.to_vec(),
    };
    let truth = GroundTruthPoint {
        entity_id: series.entity_id().to_string(),
        date: last.date,
        traffic: last.traffic,
    };

    Some((context, truth))
}

/// Split every series
pub fn split_all(series: &[Series]) -> SplitSet {
    let mut set = SplitSet::default();
    for s in series {
        match split_series(s) {
            Some((context, truth)) => {
                set.ground_truth.insert(truth.entity_id.clone(), truth);
                set.contexts.push(context);
            }
            None => warn!(entity = s.entity_id(), points = s.len(), "series too short to split"),
        }
    }
    set
}
