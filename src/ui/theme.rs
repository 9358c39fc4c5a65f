use ratatui::style::Color;

/// Fixed dark palette for the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub text_dim: Color,
    pub accent: Color,
    pub gauge_low: Color,
    pub gauge_mid: Color,
    pub gauge_high: Color,
    pub sparkline: Color,
    pub statusbar_bg: Color,
    pub key_fg: Color,
    pub key_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            border: Color::Rgb(88, 91, 112),
            title: Color::Rgb(205, 214, 244),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            accent: Color::Rgb(203, 166, 247),
            gauge_low: Color::Rgb(45, 90, 39),
            gauge_mid: Color::Rgb(181, 137, 10),
            gauge_high: Color::Rgb(161, 46, 46),
            sparkline: Color::Rgb(137, 180, 250),
            statusbar_bg: Color::Rgb(24, 24, 37),
            key_fg: Color::Rgb(17, 17, 27),
            key_bg: Color::Rgb(137, 180, 250),
        }
    }
}

impl Theme {
    /// Heat color for a utilisation percentage.
    pub fn heat(&self, percent: f64) -> Color {
        if percent >= 85.0 {
            self.gauge_high
        } else if percent >= 60.0 {
            self.gauge_mid
        } else {
            self.gauge_low
        }
    }
}
