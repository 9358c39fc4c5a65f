use std::time::SystemTime;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut spans = Vec::new();
    spans.extend(pill_spans("q", "Quit", theme));
    spans.extend(pill_spans("s", app.sort_mode.label(), theme));
    spans.extend(pill_spans("w", "Window", theme));
    spans.extend(pill_spans("/", "Filter", theme));
    spans.extend(pill_spans("?", "Help", theme));
    if app.filter_editing {
        spans.push(Span::styled(
            format!("  /{}_", app.filter),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ));
    } else if !app.filter.is_empty() {
        spans.push(Span::styled(
            format!("  filter: {}", app.filter),
            Style::default().fg(theme.title),
        ));
    }
    if !app.is_waiting() {
        let age = app.snapshot.age_at(SystemTime::now());
        spans.push(Span::styled(
            format!("  sampled {:.1}s ago", age.as_secs_f64()),
            Style::default().fg(theme.text_dim),
        ));
    }
    if !app.snapshot.cpu.brand.is_empty() {
        spans.push(Span::styled(
            format!("  {}", app.snapshot.cpu.brand.trim()),
            Style::default().fg(theme.text_dim),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.statusbar_bg)),
        area,
    );
}

fn pill_spans<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Vec<Span<'a>> {
    vec![
        Span::raw(" "),
        Span::styled(
            format!(" {key} "),
            Style::default()
                .fg(theme.key_fg)
                .bg(theme.key_bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {desc}"), Style::default().fg(theme.text)),
    ]
}
