use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::widgets::TableState;
use ratatui::Frame;

use super::app::App;
use super::widgets;
use crate::table::SortDirection;

const INFO_PANEL_WIDTH: u16 = 42;
const LOG_PANEL_HEIGHT: u16 = 10;

pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(1),
            Constraint::Length(LOG_PANEL_HEIGHT),
        ])
        .split(size);

    render_main_row(frame, app, chunks[0]);
    frame.render_widget(widgets::render_help_line(), chunks[1]);
    render_log_panel(frame, app, chunks[2]);
}

fn render_main_row(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(INFO_PANEL_WIDTH)])
        .split(area);

    let title = match app.table.sort_direction() {
        Some(SortDirection::Ascending) => "Models (fastest first)",
        Some(SortDirection::Descending) => "Models (slowest first)",
        None => "Models",
    };

    let table = widgets::render_model_table(app.table.rows(), title);
    let mut state = TableState::default();
    if !app.table.is_empty() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(table, columns[0], &mut state);

    let info = widgets::render_info_panel(app.selected_row(), &app.sampling_label());
    frame.render_widget(info, columns[1]);
}

fn render_log_panel(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let entries = app.recent_logs(visible);
    frame.render_widget(widgets::render_log_panel(&entries), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Catalog, MeasurementOrchestrator};
    use crate::prompt::DefaultPrompts;
    use crate::provider::{ModelFamily, ModelVendor, ProviderKind};
    use crate::table::RowId;
    use crate::tui::log_layer::TuiLogLayer;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn test_app() -> App {
        use crate::provider::Model;
        let models = vec![
            Model::new("a", "Alpha", ProviderKind::Groq, ModelVendor::Meta, ModelFamily::Llama3),
            Model::new("b", "Beta", ProviderKind::Groq, ModelVendor::Google, ModelFamily::Gemma),
        ];
        let (tx, _rx) = mpsc::unbounded_channel();
        let orchestrator = MeasurementOrchestrator::new(
            Arc::new(Catalog::default()),
            Arc::new(DefaultPrompts::load()),
            None,
            tx,
        );
        App::new(crate::table::RankedTable::new(models), orchestrator, TuiLogLayer::buffer())
    }

    #[test]
    fn test_render_table_and_info() {
        let mut app = test_app();
        app.table.update_latency(RowId(0), Duration::from_millis(321), vec![Duration::from_millis(321)]);
        app.table.set_error(RowId(1), "HTTP 401: bad key");

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Latency"));
        assert!(text.contains("Alpha"));
        assert!(text.contains("321 ms"));
        assert!(text.contains("err"));
        assert!(text.contains("Llama 3"));
    }

    #[test]
    fn test_render_failed_row_info() {
        let mut app = test_app();
        app.table.set_error(RowId(1), "HTTP 401: bad key");
        app.selected = 1;

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();

        assert!(screen_text(&terminal).contains("HTTP 401: bad key"));
    }

    #[test]
    fn test_render_empty_table() {
        let mut app = test_app();
        app.table = crate::table::RankedTable::new(Vec::new());

        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();

        assert!(screen_text(&terminal).contains("No models available"));
    }
}
