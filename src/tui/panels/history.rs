// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::session::{Cell, Record};
use crate::tui::theme::{BLOCK_FULL, DROPPED_MARK, Theme};

const LABEL_WIDTH: u16 = 6;

/// One row per camera column, one character per window, newest on the right.
struct HistoryWidget<'a> {
    records: &'a VecDeque<Record>,
    columns: &'a [usize],
    theme: &'a Theme,
}

impl Widget for HistoryWidget<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || area.width <= LABEL_WIDTH {
            return;
        }

        let legend_height: u16 = 1;
        let chart_height = area.height.saturating_sub(legend_height);
        let rows = (chart_height as usize).min(self.columns.len());
        let chart_width = (area.width - LABEL_WIDTH) as usize;
        let shown = chart_width.min(self.records.len());

        for (row, source) in self.columns.iter().take(rows).enumerate() {
            let y = area.y + row as u16;
            buf.set_string(
                area.x,
                y,
                format!("Cam{}", source + 1),
                self.theme.title,
            );

            for j in 0..shown {
                let record = &self.records[self.records.len() - 1 - j];
                let Some(&cell) = record.cells.get(row) else {
                    continue;
                };
                let x = area.x + area.width - 1 - j as u16;
                let mark = if cell == Cell::Dropped {
                    DROPPED_MARK
                } else {
                    BLOCK_FULL
                };
                buf[(x, y)].set_char(mark).set_style(self.theme.cell(cell));
            }
        }

        let legend_y = area.y + chart_height;
        if legend_y < area.y + area.height {
            let legend_area = Rect::new(area.x, legend_y, area.width, 1);
            let latest = self
                .records
                .back()
                .map_or_else(String::new, |r| format!("window {}  ", r.window_index));
            let legend = Line::from(vec![
                Span::raw(latest),
                Span::styled("\u{25A0} Change", self.theme.cell_changed),
                Span::raw("  "),
                Span::styled("\u{25A0} No change", self.theme.cell_no_change),
                Span::raw("  "),
                Span::styled(format!("{DROPPED_MARK} Lost"), self.theme.cell_dropped),
            ]);
            Paragraph::new(legend).render(legend_area, buf);
        }
    }
}

pub fn render(
    frame: &mut ratatui::Frame,
    area: Rect,
    records: &VecDeque<Record>,
    columns: &[usize],
    theme: &Theme,
) {
    if area.height < 2 || area.width < 2 {
        return;
    }

    if records.is_empty() {
        let paragraph = Paragraph::new("Press l to start sensing");
        frame.render_widget(paragraph, area);
        return;
    }

    let widget = HistoryWidget {
        records,
        columns,
        theme,
    };
    frame.render_widget(widget, area);
}
