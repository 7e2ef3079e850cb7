// SPDX-License-Identifier: MIT
use ratatui::style::{Color, Modifier, Style};

use crate::session::Cell;

pub struct Theme {
    pub brightness_low: Style,
    pub brightness_mid: Style,
    pub brightness_high: Style,
    pub cell_changed: Style,
    pub cell_no_change: Style,
    pub cell_dropped: Style,
    pub source_lost: Style,
    pub border_normal: Style,
    pub border_selected: Style,
    pub title: Style,
    pub status_bar: Style,
    pub recording_indicator: Style,
    pub sensing_indicator: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            brightness_low: Style::default().fg(Color::DarkGray),
            brightness_mid: Style::default().fg(Color::Yellow),
            brightness_high: Style::default().fg(Color::White),
            cell_changed: Style::default().fg(Color::Magenta),
            cell_no_change: Style::default().fg(Color::Green),
            cell_dropped: Style::default().fg(Color::DarkGray),
            source_lost: Style::default().fg(Color::Red),
            border_normal: Style::default().fg(Color::White),
            border_selected: Style::default().fg(Color::Cyan),
            title: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            status_bar: Style::default().fg(Color::Black).bg(Color::White),
            recording_indicator: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            sensing_indicator: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        }
    }
}

impl Theme {
    #[must_use]
    pub fn cell(&self, cell: Cell) -> Style {
        match cell {
            Cell::Changed => self.cell_changed,
            Cell::NoChange => self.cell_no_change,
            Cell::Dropped => self.cell_dropped,
        }
    }

    #[must_use]
    pub fn brightness(&self, level: f64) -> Style {
        if level >= 170.0 {
            self.brightness_high
        } else if level >= 85.0 {
            self.brightness_mid
        } else {
            self.brightness_low
        }
    }
}

pub const BLOCK_CHARS: [char; 10] = [
    ' ', '\u{2581}', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}',
    '\u{2587}', '\u{2588}',
];
pub const BLOCK_FULL: char = '\u{2588}';
pub const DROPPED_MARK: char = '\u{00B7}';
pub const SELECTED_MARKER: [char; 2] = ['\u{2610}', '\u{2611}'];
pub const COLLAPSED_MARKER: [char; 2] = ['\u{25BC}', '\u{25BA}'];
