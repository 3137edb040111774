//! Color constants for the terminal board.

use ratatui::style::Color;

use crate::fields::Status;

/// Used for work waiting on review
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for work sent back for revision
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for approved work
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Used for completed work not yet submitted
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Pending => Color::Gray,
        Status::InProgress => Color::Blue,
        Status::Completed => DARK_PURPLE,
        Status::Submitted => GOLD,
        Status::Approved => DARK_GREEN,
        Status::Resubmit => DARK_RED,
    }
}

/// Readable text color on top of `bg`.
pub fn text_on(bg: Color) -> Color {
    match bg {
        GOLD | Color::Gray => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
