use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::orchestrator::{apply_outcome, MeasurementOrchestrator, MeasurementOutcome};
use crate::table::{RankedTable, Row, SortDirection};

/// Log entry for the log panel
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: tracing::Level,
    pub message: String,
}

/// Shared ring buffer written by the log layer and read by the log panel
pub type LogBuffer = Arc<Mutex<VecDeque<LogEntry>>>;

/// TUI application state
pub struct App {
    /// Rows in display order
    pub table: RankedTable,
    /// Schedules measurements for rows
    pub orchestrator: MeasurementOrchestrator,
    /// Log buffer for display
    pub log_buffer: LogBuffer,
    /// Cursor position in the table
    pub selected: usize,
    /// Should quit flag
    pub should_quit: bool,
}

impl App {
    pub fn new(table: RankedTable, orchestrator: MeasurementOrchestrator, log_buffer: LogBuffer) -> Self {
        Self {
            table,
            orchestrator,
            log_buffer,
            selected: 0,
            should_quit: false,
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.table.rows().get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.table.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.table.len().saturating_sub(1);
    }

    pub fn measure_selected(&mut self) {
        if let Some(id) = self.selected_row().map(|row| row.id) {
            // Detached; the outcome arrives through the channel
            let _ = self.orchestrator.measure_one(&mut self.table, id);
        }
    }

    pub fn measure_all(&mut self) {
        let _ = self.orchestrator.measure_all(&mut self.table);
    }

    pub fn sort(&mut self) -> SortDirection {
        self.table.sort_by_latency()
    }

    pub fn apply(&mut self, outcome: MeasurementOutcome) {
        apply_outcome(&mut self.table, outcome);
    }

    /// Sampling mode label for the info panel
    pub fn sampling_label(&self) -> String {
        match self.orchestrator.sample_size() {
            Some(n) => format!("{} calls", n),
            None => "one per prompt".to_string(),
        }
    }

    /// Log entries, most recent first
    pub fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        match self.log_buffer.lock() {
            Ok(logs) => logs.iter().rev().take(limit).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}
