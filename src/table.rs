//! Ranked table of models and their measurement state.
//!
//! The table is owned by the single consumer of measurement outcomes, so
//! every mutation here happens on one task and needs no locking.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::provider::Model;
use crate::stats::LatencyStats;

/// Stable row identifier; equals the model's position in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shown 1-based in the table
        write!(f, "{}", self.0 + 1)
    }
}

/// Measurement state of one row
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RowStatus {
    #[default]
    Unmeasured,
    Measuring,
    Measured {
        latency: Duration,
        samples: Vec<Duration>,
    },
    Failed(String),
}

impl RowStatus {
    /// Numeric latency, present only for measured rows
    pub fn latency(&self) -> Option<Duration> {
        match self {
            RowStatus::Measured { latency, .. } => Some(*latency),
            _ => None,
        }
    }

    /// Text for the latency column
    pub fn latency_cell(&self) -> String {
        match self {
            RowStatus::Unmeasured => String::new(),
            RowStatus::Measuring => "...".to_string(),
            RowStatus::Measured { latency, .. } => format!("{} ms", latency.as_millis()),
            RowStatus::Failed(_) => "err".to_string(),
        }
    }

    pub fn stats(&self) -> Option<LatencyStats> {
        match self {
            RowStatus::Measured { samples, .. } => LatencyStats::from_samples(samples),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: RowId,
    pub model: Model,
    pub status: RowStatus,
    /// Bumped on every dispatch; outcomes from older dispatches are stale
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Display order of rows; rows are addressed by [`RowId`], never by position
#[derive(Debug, Clone)]
pub struct RankedTable {
    rows: Vec<Row>,
    next_direction: SortDirection,
    sorted: Option<SortDirection>,
}

impl RankedTable {
    /// One unmeasured row per model, ids assigned by position
    pub fn new(models: Vec<Model>) -> Self {
        let rows = models
            .into_iter()
            .enumerate()
            .map(|(i, model)| Row {
                id: RowId(i),
                model,
                status: RowStatus::Unmeasured,
                generation: 0,
            })
            .collect();

        Self {
            rows,
            next_direction: SortDirection::Ascending,
            sorted: None,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|row| row.id).collect()
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Current display position of a row
    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Direction of the last sort, if any
    pub fn sort_direction(&self) -> Option<SortDirection> {
        self.sorted
    }

    fn set_status(&mut self, id: RowId, status: RowStatus) -> bool {
        match self.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.status = status;
                true
            }
            None => {
                tracing::debug!(row = %id, "Ignoring update for unknown row");
                false
            }
        }
    }

    /// Start a new dispatch for the row and return its generation
    pub fn mark_measuring(&mut self, id: RowId) -> Option<u64> {
        let row = self.rows.iter_mut().find(|row| row.id == id)?;
        row.generation += 1;
        row.status = RowStatus::Measuring;
        Some(row.generation)
    }

    /// True while `generation` is the row's pending dispatch
    pub fn is_pending(&self, id: RowId, generation: u64) -> bool {
        self.get(id)
            .is_some_and(|row| row.generation == generation && row.status == RowStatus::Measuring)
    }

    pub fn update_latency(&mut self, id: RowId, latency: Duration, samples: Vec<Duration>) -> bool {
        self.set_status(id, RowStatus::Measured { latency, samples })
    }

    pub fn set_error(&mut self, id: RowId, error: impl Into<String>) -> bool {
        self.set_status(id, RowStatus::Failed(error.into()))
    }

    /// Stable sort by latency, alternating direction on every call
    /// (ascending first). Rows without a latency always go last.
    pub fn sort_by_latency(&mut self) -> SortDirection {
        let direction = self.next_direction;

        self.rows.sort_by(|a, b| {
            match (a.status.latency(), b.status.latency()) {
                (Some(x), Some(y)) => match direction {
                    SortDirection::Ascending => x.cmp(&y),
                    SortDirection::Descending => y.cmp(&x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        self.next_direction = direction.flip();
        self.sorted = Some(direction);
        direction
    }
}
