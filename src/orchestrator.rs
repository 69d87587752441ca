//! Measurement orchestration.
//!
//! Each measurement is a spawned task that evaluates one model and posts a
//! single [`MeasurementOutcome`] to an unbounded channel. The receiving end
//! belongs to the UI loop, which applies outcomes to the [`RankedTable`] one
//! at a time via [`apply_outcome`]. Tasks never touch the table.
//!
//! Every dispatch carries the row generation handed out by
//! [`RankedTable::mark_measuring`]. An outcome whose generation is no longer
//! the row's pending one belongs to a replaced run and is dropped.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::evaluator::{Evaluation, Evaluator};
use crate::prompt::PromptSource;
use crate::provider::{Model, ProviderClient};
use crate::table::{RankedTable, RowId, RowStatus};

/// One model together with the client that serves it
#[derive(Clone)]
pub struct CatalogEntry {
    pub provider: Arc<dyn ProviderClient>,
    pub model: Model,
}

/// Read-only index from [`RowId`] to model, built once at startup
#[derive(Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Flatten every provider's filtered model list, keeping provider order
    pub fn from_providers(providers: &[Arc<dyn ProviderClient>], filter: &str) -> Self {
        let entries = providers
            .iter()
            .flat_map(|provider| {
                provider
                    .list_models(filter)
                    .into_iter()
                    .map(move |model| CatalogEntry {
                        provider: Arc::clone(provider),
                        model,
                    })
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, id: RowId) -> Option<&CatalogEntry> {
        self.entries.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn models(&self) -> Vec<Model> {
        self.entries.iter().map(|e| e.model.clone()).collect()
    }

    /// Fresh table with one unmeasured row per entry
    pub fn table(&self) -> RankedTable {
        RankedTable::new(self.models())
    }
}

/// Terminal message of one unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementOutcome {
    LatencyUpdated {
        row_id: RowId,
        generation: u64,
        evaluation: Evaluation,
    },
    LatencyError {
        row_id: RowId,
        generation: u64,
        error: String,
    },
}

impl MeasurementOutcome {
    pub fn row_id(&self) -> RowId {
        match self {
            MeasurementOutcome::LatencyUpdated { row_id, .. } => *row_id,
            MeasurementOutcome::LatencyError { row_id, .. } => *row_id,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            MeasurementOutcome::LatencyUpdated { generation, .. } => *generation,
            MeasurementOutcome::LatencyError { generation, .. } => *generation,
        }
    }
}

/// Apply one outcome to the table; the only place outcomes mutate rows.
/// Returns the updated row, or `None` when the outcome was stale.
pub fn apply_outcome(table: &mut RankedTable, outcome: MeasurementOutcome) -> Option<RowId> {
    let row_id = outcome.row_id();
    let generation = outcome.generation();
    if !table.is_pending(row_id, generation) {
        tracing::debug!(row = %row_id, generation, "Dropping outcome of a replaced measurement");
        return None;
    }

    match outcome {
        MeasurementOutcome::LatencyUpdated { evaluation, .. } => {
            table.update_latency(row_id, evaluation.latency, evaluation.samples);
        }
        MeasurementOutcome::LatencyError { error, .. } => {
            table.set_error(row_id, error);
        }
    }
    Some(row_id)
}

/// Schedules measurement tasks for catalog rows
pub struct MeasurementOrchestrator {
    catalog: Arc<Catalog>,
    prompts: Arc<dyn PromptSource>,
    sample_size: Option<usize>,
    seed: Option<u64>,
    outcomes: UnboundedSender<MeasurementOutcome>,
}

impl MeasurementOrchestrator {
    /// `sample_size` of `None` means one call per prompt
    pub fn new(
        catalog: Arc<Catalog>,
        prompts: Arc<dyn PromptSource>,
        sample_size: Option<usize>,
        outcomes: UnboundedSender<MeasurementOutcome>,
    ) -> Self {
        Self {
            catalog,
            prompts,
            sample_size,
            seed: None,
            outcomes,
        }
    }

    /// Seed random prompt sampling for every unit
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sample_size(&self) -> Option<usize> {
        self.sample_size
    }

    /// Mark the row measuring and spawn its unit of work
    pub fn measure_one(&self, table: &mut RankedTable, row_id: RowId) -> Option<JoinHandle<()>> {
        let entry = self.catalog.get(row_id)?;
        let generation = table.mark_measuring(row_id)?;

        tracing::info!(model = %entry.model.name, provider = %entry.model.provider, "Measuring latency");
        Some(self.spawn_unit(row_id, generation, entry))
    }

    /// Mark every idle row measuring, then spawn one unit per marked row.
    /// Rows with a measurement in flight keep it.
    pub fn measure_all(&self, table: &mut RankedTable) -> Vec<JoinHandle<()>> {
        let dispatches: Vec<(RowId, u64)> = (0..self.catalog.len())
            .map(RowId)
            .filter_map(|id| {
                if !table
                    .get(id)
                    .is_some_and(|row| row.status != RowStatus::Measuring)
                {
                    return None;
                }
                table.mark_measuring(id).map(|generation| (id, generation))
            })
            .collect();

        tracing::info!(
            models = dispatches.len(),
            in_flight = self.catalog.len() - dispatches.len(),
            "Measuring latency for all models"
        );

        dispatches
            .into_iter()
            .filter_map(|(id, generation)| {
                self.catalog
                    .get(id)
                    .map(|entry| self.spawn_unit(id, generation, entry))
            })
            .collect()
    }

    fn spawn_unit(&self, row_id: RowId, generation: u64, entry: &CatalogEntry) -> JoinHandle<()> {
        let provider = Arc::clone(&entry.provider);
        let model = entry.model.clone();
        let prompts = Arc::clone(&self.prompts);
        let sample_size = self.sample_size;
        let seed = self.seed;
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            let name = model.name.clone();
            let outcome = match run_evaluation(provider, model, prompts, sample_size, seed).await {
                Ok(evaluation) => {
                    tracing::info!(
                        model = %name,
                        latency_ms = evaluation.latency.as_millis() as u64,
                        "Measured latency"
                    );
                    MeasurementOutcome::LatencyUpdated {
                        row_id,
                        generation,
                        evaluation,
                    }
                }
                Err(error) => {
                    tracing::error!(model = %name, error = %error, "Latency measurement failed");
                    MeasurementOutcome::LatencyError {
                        row_id,
                        generation,
                        error,
                    }
                }
            };

            // The receiver is gone once the UI has quit
            if outcomes.send(outcome).is_err() {
                tracing::debug!(row = %row_id, "Outcome dropped, receiver closed");
            }
        })
    }
}

async fn run_evaluation(
    provider: Arc<dyn ProviderClient>,
    model: Model,
    prompts: Arc<dyn PromptSource>,
    sample_size: Option<usize>,
    seed: Option<u64>,
) -> Result<Evaluation, String> {
    let pool = prompts.prompts().await.map_err(|e| e.to_string())?;

    let mut evaluator = Evaluator::new(provider, model, pool);
    if let Some(n) = sample_size {
        evaluator = evaluator.with_sample_size(n);
    }
    if let Some(seed) = seed {
        evaluator = evaluator.with_seed(seed);
    }

    evaluator.evaluate().await.map_err(|e| e.to_string())
}
