use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Row, Table};

use crate::format::{format_bytes, format_rate, truncate_unicode};
use crate::metrics::snapshot::Snapshot;
use crate::ui::theme::Theme;

pub fn render(frame: &mut Frame, area: Rect, snapshot: &Snapshot, theme: &Theme) {
    let [net_area, disk_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    render_networks(frame, net_area, snapshot, theme);
    render_disks(frame, disk_area, snapshot, theme);
}

fn block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(title)
        .title_style(Style::default().fg(theme.title).add_modifier(Modifier::BOLD))
}

fn header_row<'a>(labels: [&'a str; 4], theme: &Theme) -> Row<'a> {
    Row::new(labels).style(
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD),
    )
}

fn render_networks(frame: &mut Frame, area: Rect, snapshot: &Snapshot, theme: &Theme) {
    let rows = snapshot.networks.iter().map(|n| {
        Row::new([
            Cell::from(truncate_unicode(&n.interface, 14)),
            Cell::from(format_rate(n.receive_rate_bps)),
            Cell::from(format_rate(n.send_rate_bps)),
            Cell::from(format_bytes(n.bytes_received + n.bytes_sent)),
        ])
        .style(Style::default().fg(theme.text))
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(header_row(["Interface", "Rx", "Tx", "Total"], theme))
    .block(block(" Network ", theme));
    frame.render_widget(table, area);
}

fn render_disks(frame: &mut Frame, area: Rect, snapshot: &Snapshot, theme: &Theme) {
    let rows = snapshot.disks.iter().map(|d| {
        let usage = d.usage_percent();
        Row::new([
            Cell::from(truncate_unicode(&d.mount_point, 14)),
            Cell::from(format!("{usage:.0}%")).style(Style::default().fg(theme.heat(usage))),
            Cell::from(format_rate(d.read_rate_bps)),
            Cell::from(format_rate(d.write_rate_bps)),
        ])
        .style(Style::default().fg(theme.text))
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header_row(["Mount", "Used", "Read", "Write"], theme))
    .block(block(" Disks ", theme));
    frame.render_widget(table, area);
}
