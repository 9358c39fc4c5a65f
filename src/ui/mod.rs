pub mod devices;
pub mod header;
pub mod help;
pub mod process_table;
pub mod statusbar;
pub mod theme;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::app::App;
use crate::ui::theme::Theme;

pub fn draw(frame: &mut Frame, app: &App) {
    let theme = Theme::default();
    let [header_area, devices_area, process_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(4),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    header::render(frame, header_area, app, &theme);
    devices::render(frame, devices_area, &app.snapshot, &theme);
    process_table::render(frame, process_area, app, &theme);
    statusbar::render(frame, status_area, app, &theme);

    // Help overlay last so it sits on top
    if app.show_help {
        help::render(frame, frame.area(), &app.help_entries(), &theme);
    }
}

#[cfg(test)]
mod tests;
