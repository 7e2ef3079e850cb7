// SPDX-License-Identifier: MIT
use num_format::{Locale, ToFormattedString};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::session::{CameraStatus, Cell};
use crate::tui::theme::{BLOCK_CHARS, BLOCK_FULL, Theme};

const MAX_LEVEL: f64 = 255.0;
const LABEL_WIDTH: usize = 6;

/// Horizontal bar for a brightness level on the 0..=255 scale.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn build_bar(level: f64, bar_width: usize) -> String {
    if bar_width == 0 {
        return String::new();
    }
    let fraction = (level / MAX_LEVEL).clamp(0.0, 1.0);
    let filled = fraction * bar_width as f64;
    let full_pips = filled.floor() as usize;
    let remainder = ((filled - filled.floor()) * (BLOCK_CHARS.len() - 1) as f64) as usize;

    let mut bar = String::with_capacity(bar_width * 3);
    for i in 0..bar_width {
        if i < full_pips {
            bar.push(BLOCK_FULL);
        } else if i == full_pips {
            bar.push(BLOCK_CHARS[remainder]);
        } else {
            bar.push(' ');
        }
    }
    bar
}

fn camera_line<'a>(camera: &CameraStatus, theme: &Theme, bar_width: usize) -> Line<'a> {
    let label = format!("{:<LABEL_WIDTH$}", format!("Cam{}", camera.index + 1));
    let frames = camera.frames_acquired.to_formatted_string(&Locale::en);

    if !camera.alive {
        return Line::from(vec![
            Span::styled(label, theme.title),
            Span::styled(format!("lost after {frames} frames"), theme.source_lost),
        ]);
    }

    let Some(level) = camera.brightness else {
        return Line::from(vec![
            Span::styled(label, theme.title),
            Span::raw(format!("waiting for {}...", camera.description)),
        ]);
    };

    let mut spans = vec![
        Span::styled(label, theme.title),
        Span::styled(build_bar(level, bar_width), theme.brightness(level)),
        Span::raw(format!(" {level:>6.1}  frames: {frames:>9}")),
    ];
    if let Some((width, height)) = camera.frame_size {
        spans.push(Span::raw(format!("  {width}x{height}")));
    }
    if let Some(baseline) = camera.baseline {
        spans.push(Span::raw(format!(
            "  base {baseline:>5.1} ({} samples)",
            camera.window_samples
        )));
    }
    if camera.recording {
        spans.push(Span::styled("  REC", theme.recording_indicator));
    }
    if let Some(cell) = camera.last_cell {
        spans.push(Span::raw("  last: "));
        spans.push(Span::styled(cell.as_str(), theme.cell(cell)));
    }
    Line::from(spans)
}

pub fn render(frame: &mut ratatui::Frame, area: Rect, cameras: &[CameraStatus], theme: &Theme) {
    if area.height < 1 || area.width < 20 {
        return;
    }

    if cameras.is_empty() {
        frame.render_widget(Paragraph::new("No cameras"), area);
        return;
    }

    // room for the label and counters
    let bar_width = (area.width as usize).saturating_sub(LABEL_WIDTH + 40).clamp(4, 40);
    let mut lines: Vec<Line<'_>> = cameras
        .iter()
        .map(|c| camera_line(c, theme, bar_width))
        .collect();

    let changed = cameras
        .iter()
        .filter(|c| c.last_cell == Some(Cell::Changed))
        .count();
    lines.push(Line::from(format!(
        "{changed} of {} cameras changed in the last window",
        cameras.len()
    )));

    frame.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_scales_to_full_range() {
        assert_eq!(build_bar(0.0, 4), "    ");
        assert_eq!(build_bar(255.0, 4), "\u{2588}\u{2588}\u{2588}\u{2588}");
        assert_eq!(build_bar(400.0, 2), "\u{2588}\u{2588}");
    }

    #[test]
    fn bar_has_partial_pip() {
        // half of one pip on a single-pip bar
        let bar = build_bar(127.5, 1);
        assert_eq!(bar.chars().count(), 1);
        assert_eq!(bar.chars().next(), Some(BLOCK_CHARS[4]));
    }

    #[test]
    fn bar_of_zero_width_is_empty() {
        assert!(build_bar(100.0, 0).is_empty());
    }
}
