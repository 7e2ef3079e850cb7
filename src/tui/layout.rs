// SPDX-License-Identifier: MIT
use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    Cameras,
    History,
}

pub struct PanelState {
    pub kind: PanelKind,
    pub name: &'static str,
    pub collapsed: bool,
    pub min_height: u16,
}

impl PanelState {
    #[must_use]
    pub fn new(kind: PanelKind, name: &'static str, min_height: u16) -> Self {
        Self {
            kind,
            name,
            collapsed: false,
            min_height,
        }
    }
}

/// Splits `area` vertically; collapsed panels keep only their border.
pub fn build_layout(panels: &[PanelState], area: Rect) -> Vec<Rect> {
    let constraints: Vec<Constraint> = panels
        .iter()
        .map(|p| {
            if p.collapsed {
                Constraint::Length(2)
            } else {
                Constraint::Min(p.min_height)
            }
        })
        .collect();

    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area)
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapsed_panel_shrinks_to_border() {
        let mut panels = vec![
            PanelState::new(PanelKind::Cameras, "Cameras", 6),
            PanelState::new(PanelKind::History, "History", 8),
        ];
        panels[0].collapsed = true;

        let areas = build_layout(&panels, Rect::new(0, 0, 80, 30));
        assert_eq!(areas[0].height, 2);
        assert_eq!(areas[1].height, 28);
    }
}
