// SPDX-License-Identifier: MIT
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::session::{SessionState, SessionStatus};
use crate::tui::theme::Theme;

pub fn render(frame: &mut ratatui::Frame, area: Rect, status: &SessionStatus, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let version = env!("CARGO_PKG_VERSION");
    let state_style = match status.state {
        SessionState::RecordingOnly => theme.recording_indicator,
        SessionState::SensingActive => theme.sensing_indicator,
        SessionState::Idle | SessionState::Terminated => theme.status_bar,
    };

    let mut text = format!(
        " | cameras: {} | rows: {} ({} this session)",
        status.cameras.iter().filter(|c| c.alive).count(),
        status.rows_written,
        status.total_rows,
    );
    if let Some(elapsed) = status.sensing_elapsed {
        text.push_str(&format!(" | {:.1}s", elapsed.as_secs_f64()));
    }
    if let Some(ref path) = status.time_series {
        text.push_str(&format!(" | {}", path.display()));
    }

    let prefix = format!("camsense v{version} ");
    let label = format!("[{}]", status.state.label());
    let used = prefix.chars().count() + label.chars().count();
    let width = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(prefix, theme.status_bar),
        Span::styled(label, state_style),
        Span::styled(format!("{text:<width$}"), theme.status_bar),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Key hints shown on the last line.
pub fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: SessionState, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let hints = match state {
        SessionState::Idle => " r: start recording | q: quit",
        SessionState::RecordingOnly => " l: start sensing | q: stop",
        SessionState::SensingActive => " q: stop",
        SessionState::Terminated => " session ended",
    };
    let line = Line::from(Span::styled(
        format!("{hints:<width$}", width = area.width as usize),
        theme.status_bar,
    ));
    frame.render_widget(Paragraph::new(line), area);
}
