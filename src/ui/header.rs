use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Sparkline};

use crate::app::App;
use crate::format::{format_bytes, format_uptime};
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let [cpu_area, mem_area, swap_area, spark_area] = Layout::horizontal([
        Constraint::Percentage(22),
        Constraint::Percentage(22),
        Constraint::Percentage(22),
        Constraint::Percentage(34),
    ])
    .areas(area);

    let snapshot = &app.snapshot;
    let cpu = f64::from(snapshot.cpu.usage_percent);
    render_gauge(
        frame,
        cpu_area,
        " CPU ",
        cpu,
        format!("{cpu:.1}% of {} cores", snapshot.cpu.logical_cores),
        theme,
    );

    let memory = &snapshot.memory;
    let peak = app.memory_history.iter().max().copied().unwrap_or(0) as f64 / 100.0;
    render_gauge(
        frame,
        mem_area,
        &format!(" Memory (peak {peak:.0}%) "),
        memory.load_percent(),
        format!(
            "{} / {}",
            format_bytes(memory.used),
            format_bytes(memory.total)
        ),
        theme,
    );
    render_gauge(
        frame,
        swap_area,
        " Swap ",
        memory.swap_percent(),
        format!(
            "{} / {}",
            format_bytes(memory.swap_used),
            format_bytes(memory.swap_total)
        ),
        theme,
    );

    render_cpu_sparkline(frame, spark_area, app, theme);
}

fn titled_block<'a>(title: String, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_gauge(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    percent: f64,
    label: String,
    theme: &Theme,
) {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(titled_block(title.to_string(), theme))
        .gauge_style(Style::default().fg(theme.heat(percent)))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, area);
}

fn render_cpu_sparkline(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let title = format!(
        " CPU last {}s | up {} ",
        app.history_window.as_secs(),
        format_uptime(app.snapshot.uptime_seconds)
    );
    // keep the newest samples that fit inside the borders
    let width = area.width.saturating_sub(2) as usize;
    let start = app.cpu_history.len().saturating_sub(width);
    let data: Vec<u64> = app.cpu_history[start..].to_vec();

    let sparkline = Sparkline::default()
        .block(titled_block(title, theme))
        .data(&data)
        .max(10_000)
        .style(Style::default().fg(theme.sparkline));
    frame.render_widget(sparkline, area);
}
