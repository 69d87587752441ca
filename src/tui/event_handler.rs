use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::App;

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Enter => {
            app.measure_selected();
        }
        KeyCode::Char('A') => {
            app.measure_all();
        }
        KeyCode::Char('s') => {
            let direction = app.sort();
            tracing::debug!(?direction, "Sorted by latency");
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
        }
        KeyCode::Char('g') | KeyCode::Home => {
            app.select_first();
        }
        KeyCode::Char('G') | KeyCode::End => {
            app.select_last();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpClient;
    use crate::orchestrator::{Catalog, MeasurementOrchestrator};
    use crate::prompt::DefaultPrompts;
    use crate::provider::{Groq, ProviderClient};
    use crate::table::{RowId, RowStatus};
    use crate::tui::log_layer::TuiLogLayer;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn create_test_app() -> App {
        let http = HttpClient::new(2, 1).unwrap();
        // Unroutable base URL; requests fail without reaching the network
        let groq = Groq::with_base_url(http, Some("gsk-test".to_string()), "http://127.0.0.1:1")
            .unwrap();
        let groq: Arc<dyn ProviderClient> = Arc::new(groq);
        let catalog = Arc::new(Catalog::from_providers(&[groq], "llama 3."));
        let table = catalog.table();
        let (tx, _rx) = mpsc::unbounded_channel();
        let orchestrator =
            MeasurementOrchestrator::new(catalog, Arc::new(DefaultPrompts::load()), None, tx);

        App::new(table, orchestrator, TuiLogLayer::buffer())
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_quit_key() {
        let mut app = create_test_app();
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char('q'));

        assert!(app.should_quit);
    }

    #[test]
    fn test_escape_key() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c() {
        let mut app = create_test_app();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        handle_key_event(&mut app, key);
        assert!(app.should_quit);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut app = create_test_app();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        handle_key_event(&mut app, key);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_navigation() {
        let mut app = create_test_app();
        let last = app.table.len() - 1;
        assert!(last >= 2);
        assert_eq!(app.selected, 0);

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected, 2);

        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected, 1);

        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.selected, last);

        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected, last);

        press(&mut app, KeyCode::Home);
        assert_eq!(app.selected, 0);

        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_sort_key_toggles() {
        let mut app = create_test_app();
        app.table.update_latency(RowId(0), std::time::Duration::from_millis(500), vec![]);
        app.table.update_latency(RowId(1), std::time::Duration::from_millis(100), vec![]);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.table.rows()[0].id, RowId(1));

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.table.rows()[0].id, RowId(0));
    }

    #[tokio::test]
    async fn test_enter_marks_selected_row_measuring() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.table.get(RowId(1)).unwrap().status, RowStatus::Measuring);
        assert_eq!(app.table.get(RowId(0)).unwrap().status, RowStatus::Unmeasured);
    }

    #[tokio::test]
    async fn test_measure_all_key() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('A'));

        assert!(app
            .table
            .rows()
            .iter()
            .all(|row| row.status == RowStatus::Measuring));
    }

    #[tokio::test]
    async fn test_repeated_measure_all_key_does_not_redispatch() {
        let mut app = create_test_app();
        press(&mut app, KeyCode::Char('A'));
        press(&mut app, KeyCode::Char('A'));

        assert!(app.table.rows().iter().all(|row| row.generation == 1));
    }
}
