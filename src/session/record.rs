// SPDX-License-Identifier: MIT
use std::fmt;

use crate::sampler::detect::Classification;

/// One column entry of a time-series row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Changed,
    NoChange,
    /// The camera died earlier in the session; its column is kept.
    Dropped,
}

impl Cell {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "C",
            Self::NoChange => "NC",
            Self::Dropped => "ND",
        }
    }
}

impl From<Classification> for Cell {
    fn from(value: Classification) -> Self {
        match value {
            Classification::Changed => Self::Changed,
            Classification::NoChange => Self::NoChange,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single emitted row: the window index and one cell per camera column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub window_index: u64,
    pub cells: Vec<Cell>,
}

impl Record {
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        let mut line = self.window_index.to_string();
        for cell in &self.cells {
            line.push(',');
            line.push_str(cell.as_str());
        }
        line
    }
}

/// `time,Cam1,Cam2,...` for the given zero-based camera indices.
#[must_use]
pub fn header_columns(sources: &[usize]) -> Vec<String> {
    std::iter::once("time".to_string())
        .chain(sources.iter().map(|i| format!("Cam{}", i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_cameras_from_one() {
        assert_eq!(header_columns(&[0]), vec!["time", "Cam1"]);
        assert_eq!(header_columns(&[0, 1]), vec!["time", "Cam1", "Cam2"]);
        assert_eq!(header_columns(&[0, 2]), vec!["time", "Cam1", "Cam3"]);
    }

    #[test]
    fn record_csv_line() {
        let record = Record {
            window_index: 7,
            cells: vec![Cell::Changed, Cell::NoChange, Cell::Dropped],
        };
        assert_eq!(record.to_csv_line(), "7,C,NC,ND");
    }
}
