// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::TimeSeriesSink;
use crate::error::SinkError;
use crate::session::record::Record;

/// Comma-delimited time-series file. Every row is flushed as it is written so
/// a crash never leaves a half-written row behind a buffer.
pub struct CsvSink {
    out: Option<BufWriter<File>>,
    path: PathBuf,
}

impl CsvSink {
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self {
            out: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        let out = self.out.as_mut().ok_or(SinkError::Closed)?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl TimeSeriesSink for CsvSink {
    fn write_header(&mut self, columns: &[String]) -> Result<(), SinkError> {
        self.write_line(&columns.join(","))
    }

    fn write_record(&mut self, record: &Record) -> Result<(), SinkError> {
        self.write_line(&record.to_csv_line())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
            debug!(path = %self.path.display(), "time series closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::record::{Cell, header_columns};

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LightLog1.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.write_header(&header_columns(&[0, 1])).unwrap();
        sink.write_record(&Record {
            window_index: 0,
            cells: vec![Cell::NoChange, Cell::NoChange],
        })
        .unwrap();
        // visible before finish
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "time,Cam1,Cam2\n0,NC,NC\n"
        );
        sink.write_record(&Record {
            window_index: 1,
            cells: vec![Cell::Changed, Cell::Dropped],
        })
        .unwrap();
        sink.finish().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "time,Cam1,Cam2\n0,NC,NC\n1,C,ND\n"
        );
        assert!(matches!(
            sink.write_header(&header_columns(&[0])),
            Err(SinkError::Closed)
        ));
    }
}
