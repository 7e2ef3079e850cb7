// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::input::Action;
use super::layout::{PanelKind, PanelState, build_layout};
use super::panels::{header, history, sources};
use super::theme::{COLLAPSED_MARKER, SELECTED_MARKER, Theme};
use crate::session::{Record, SessionStatus};

const HISTORY_CAPACITY: usize = 200;

pub struct App {
    pub panels: Vec<PanelState>,
    pub selected_panel: usize,
    pub status: Option<SessionStatus>,
    pub history: VecDeque<Record>,
    /// Camera indices of the current time-series columns.
    pub columns: Vec<usize>,
    pub should_quit: bool,
    pub theme: Theme,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        let panels = vec![
            PanelState::new(PanelKind::Cameras, "Cameras", 5),
            PanelState::new(PanelKind::History, "Change history", 6),
        ];

        Self {
            panels,
            selected_panel: 0,
            status: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            columns: Vec::new(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub fn update_status(&mut self, status: SessionStatus) {
        self.status = Some(status);
    }

    /// Starts a fresh history for a new time series.
    pub fn begin_run(&mut self, columns: Vec<usize>) {
        self.history.clear();
        self.columns = columns;
    }

    pub fn push_records(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            if self.history.len() >= HISTORY_CAPACITY {
                self.history.pop_front();
            }
            self.history.push_back(record);
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Stop => self.should_quit = true,
            Action::PanelUp => {
                if self.selected_panel > 0 {
                    self.selected_panel -= 1;
                }
            }
            Action::PanelDown => {
                if self.selected_panel + 1 < self.panels.len() {
                    self.selected_panel += 1;
                }
            }
            Action::ToggleCollapse => {
                if let Some(panel) = self.panels.get_mut(self.selected_panel) {
                    panel.collapsed = !panel.collapsed;
                }
            }
            Action::StartRecording | Action::StartSensing | Action::None => {}
        }
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        let outer = frame.area();
        if outer.height < 3 || outer.width < 5 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(outer);

        let Some(ref status) = self.status else {
            frame.render_widget(Paragraph::new("Opening cameras..."), vertical[1]);
            return;
        };

        header::render(frame, vertical[0], status, &self.theme);
        header::render_footer(frame, vertical[2], status.state, &self.theme);

        let areas = build_layout(&self.panels, vertical[1]);

        for (i, (panel, area)) in self.panels.iter().zip(areas.iter()).enumerate() {
            let is_selected = i == self.selected_panel;

            let sel_mark = SELECTED_MARKER[usize::from(is_selected)];
            let col_mark = COLLAPSED_MARKER[usize::from(panel.collapsed)];
            let title = format!("{sel_mark} {col_mark} {}", panel.name);

            let border_style = if is_selected {
                self.theme.border_selected
            } else {
                self.theme.border_normal
            };

            let block = Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style)
                .title_style(self.theme.title);

            let inner = block.inner(*area);
            frame.render_widget(block, *area);
            if panel.collapsed || inner.width < 2 || inner.height < 1 {
                continue;
            }

            match panel.kind {
                PanelKind::Cameras => sources::render(frame, inner, &status.cameras, &self.theme),
                PanelKind::History => {
                    history::render(frame, inner, &self.history, &self.columns, &self.theme);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Cell;

    #[test]
    fn panel_navigation_is_bounded() {
        let mut app = App::new();
        app.handle_action(Action::PanelUp);
        assert_eq!(app.selected_panel, 0);
        app.handle_action(Action::PanelDown);
        app.handle_action(Action::PanelDown);
        assert_eq!(app.selected_panel, 1);

        app.handle_action(Action::ToggleCollapse);
        assert!(app.panels[1].collapsed);
        assert!(!app.should_quit);

        app.handle_action(Action::Stop);
        assert!(app.should_quit);
    }

    #[test]
    fn history_is_capped_and_reset_per_run() {
        let mut app = App::new();
        app.begin_run(vec![0]);
        app.push_records((0..250).map(|i| Record {
            window_index: i,
            cells: vec![Cell::NoChange],
        }));
        assert_eq!(app.history.len(), HISTORY_CAPACITY);
        assert_eq!(app.history.front().map(|r| r.window_index), Some(50));

        app.begin_run(vec![0, 1]);
        assert!(app.history.is_empty());
        assert_eq!(app.columns, vec![0, 1]);
    }
}
