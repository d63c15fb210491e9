use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Color = Color::Rgb(146, 131, 116);
pub const ACCENT: Color = Color::Rgb(131, 165, 152);
pub const OK: Color = Color::Rgb(184, 187, 38);
pub const WARN: Color = Color::Rgb(250, 189, 47);
pub const CRITICAL: Color = Color::Rgb(254, 128, 25);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub mod icons {
    pub const ONLINE: &str = "*";
    pub const OFFLINE: &str = "!";
    pub const SLOT: &str = "■";
    pub const UP: &str = "↑";
    pub const DOWN: &str = "↓";
}

/// Colour for a score; lower is better, missing means the server is down.
pub fn score_color(score: Option<i32>) -> Color {
    match score {
        None => CRITICAL,
        Some(score) if score < 300 => OK,
        Some(score) if score < 1000 => WARN,
        Some(_) => CRITICAL,
    }
}

pub fn slot_color(failed: bool) -> Color {
    if failed {
        CRITICAL
    } else {
        OK
    }
}
