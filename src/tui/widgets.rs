use ratatui::layout::Constraint;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row as TableRow, Table, Wrap};

use super::app::LogEntry;
use crate::table::{Row, RowStatus};

pub const HELP_TEXT: &str =
    "enter measure · A measure all · s sort · j/k move · g/G top/bottom · q quit";

fn latency_style(status: &RowStatus) -> Style {
    match status {
        RowStatus::Unmeasured => Style::default(),
        RowStatus::Measuring => Style::default().fg(Color::Yellow),
        RowStatus::Measured { .. } => Style::default().fg(Color::Green),
        RowStatus::Failed(_) => Style::default().fg(Color::Red),
    }
}

pub fn render_model_table(rows: &[Row], title: &str) -> Table<'static> {
    let header = TableRow::new(vec!["ID", "Name", "Provider", "Vendor", "Latency"])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let body: Vec<TableRow> = rows
        .iter()
        .map(|row| {
            TableRow::new(vec![
                Cell::from(row.id.to_string()),
                Cell::from(row.model.name.clone()),
                Cell::from(row.model.provider.to_string()),
                Cell::from(row.model.vendor.to_string()),
                Cell::from(row.status.latency_cell()).style(latency_style(&row.status)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(24),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .row_highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ")
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::Gray)),
        Span::raw(value),
    ])
}

fn ms(d: std::time::Duration) -> String {
    format!("{:.1} ms", d.as_secs_f64() * 1000.0)
}

pub fn render_info_panel(row: Option<&Row>, sampling: &str) -> Paragraph<'static> {
    let mut text = Vec::new();

    match row {
        None => text.push(Line::from("No models available")),
        Some(row) => {
            text.push(field("Name", row.model.name.clone()));
            text.push(field("Model ID", row.model.id.clone()));
            text.push(field("Family", row.model.family.to_string()));
            text.push(field("Provider", row.model.provider.to_string()));
            text.push(field("Vendor", row.model.vendor.to_string()));
            text.push(field("Samples", sampling.to_string()));
            text.push(Line::from(""));

            match &row.status {
                RowStatus::Unmeasured => {
                    text.push(Line::from("Press enter to measure"));
                }
                RowStatus::Measuring => {
                    text.push(Line::styled("Measuring...", Style::default().fg(Color::Yellow)));
                }
                RowStatus::Measured { latency, .. } => {
                    text.push(field("Latency", ms(*latency)));
                    if let Some(stats) = row.status.stats() {
                        text.push(field("Calls", stats.count.to_string()));
                        text.push(field("Min", ms(stats.min)));
                        text.push(field("Max", ms(stats.max)));
                        text.push(field("Jitter", ms(stats.jitter)));
                        text.push(field("p50", ms(stats.p50)));
                        text.push(field("p95", ms(stats.p95)));
                    }
                }
                RowStatus::Failed(error) => {
                    text.push(Line::styled("Error", Style::default().fg(Color::Red)));
                    text.push(Line::from(error.clone()));
                }
            }
        }
    }

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Info"))
        .wrap(Wrap { trim: true })
}

pub fn render_help_line() -> Paragraph<'static> {
    Paragraph::new(Line::styled(HELP_TEXT, Style::default().fg(Color::DarkGray)))
}

pub fn render_log_panel(logs: &[LogEntry]) -> List<'static> {
    let items: Vec<ListItem> = logs
        .iter()
        .map(|entry| {
            let level_color = match entry.level {
                tracing::Level::ERROR => Color::Red,
                tracing::Level::WARN => Color::Yellow,
                tracing::Level::INFO => Color::Green,
                tracing::Level::DEBUG => Color::Blue,
                tracing::Level::TRACE => Color::Gray,
            };

            let content = Line::from(vec![
                Span::styled(
                    format!("[{}] ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:5} ", entry.level),
                    Style::default()
                        .fg(level_color)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(entry.message.clone()),
            ]);

            ListItem::new(content)
        })
        .collect();

    List::new(items).block(Block::default().borders(Borders::ALL).title("Logs"))
}
