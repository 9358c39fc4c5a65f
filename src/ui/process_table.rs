use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};

use crate::app::App;
use crate::format::{format_bytes, truncate_unicode};
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let snapshot = &app.snapshot;
    let title = format!(
        " Processes: {} | Threads: {} | Sort: {} {} ",
        snapshot.total_processes,
        snapshot.total_threads,
        app.sort_mode.label(),
        if app.sort_descending() { '\u{2193}' } else { '\u{2191}' }
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(title)
        .title_style(Style::default().fg(theme.title).add_modifier(Modifier::BOLD));

    if app.is_waiting() {
        let waiting = Paragraph::new("Waiting for first sample\u{2026}")
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.text_dim))
            .block(block);
        frame.render_widget(waiting, area);
        return;
    }

    let rows = app.visible_processes().into_iter().map(|p| {
        Row::new([
            Cell::from(p.pid.to_string()),
            Cell::from(truncate_unicode(&p.name, 24)),
            Cell::from(p.user.clone().unwrap_or_default()),
            Cell::from(format!("{:.1}", p.cpu_percent))
                .style(Style::default().fg(theme.heat(f64::from(p.cpu_percent)))),
            Cell::from(format_bytes(p.memory_bytes)),
            Cell::from(p.thread_count.map(|t| t.to_string()).unwrap_or_default()),
            Cell::from(p.status.clone()),
        ])
        .style(Style::default().fg(theme.text))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(["PID", "Name", "User", "CPU%", "Memory", "Threads", "Status"]).style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(block);
    frame.render_widget(table, area);
}
