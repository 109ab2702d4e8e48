//! Four-column text tables of binned counts.
//!
//! Layout: `log10en  log10en_bsize  nevents  exposure`, whitespace separated,
//! one bin per row. The second column is the full log bin size. Lines
//! starting with `#` and blank lines are skipped; extra trailing columns are
//! ignored.
use std::{fs, path::Path};

use crate::{
    dataset::data::Dataset,
    spectrum::errors::{SpecError, SpecResult},
    utils::format_c_exp,
};

/// Columns read from a table, with the bin size still at full width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableColumns {
    pub log10en: Vec<f64>,
    pub bin_size: Vec<f64>,
    pub nevents: Vec<f64>,
    pub exposure: Vec<f64>,
}

/// Parse table text into columns.
///
/// # Errors
/// `SpecError::MalformedTableRow` (1-based line number) for a row with
/// fewer than four fields or a field that is not a number.
pub fn parse_table(text: &str) -> SpecResult<TableColumns> {
    let mut cols = TableColumns::default();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().take(4).collect();
        if fields.len() < 4 {
            return Err(SpecError::MalformedTableRow {
                line: lineno + 1,
                reason: "expected 4 columns",
            });
        }
        let mut row = [0.0; 4];
        for (slot, field) in row.iter_mut().zip(&fields) {
            *slot = field.parse::<f64>().map_err(|_| SpecError::MalformedTableRow {
                line: lineno + 1,
                reason: "field is not a number",
            })?;
        }
        cols.log10en.push(row[0]);
        cols.bin_size.push(row[1]);
        cols.nevents.push(row[2]);
        cols.exposure.push(row[3]);
    }
    Ok(cols)
}

impl Dataset {
    /// Read a dataset from a four-column table file.
    ///
    /// # Errors
    /// `SpecError::Io` when the file cannot be read, plus the errors of
    /// [`parse_table`] and [`Dataset::new`].
    pub fn from_table_file(name: &str, title: &str, path: impl AsRef<Path>) -> SpecResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SpecError::Io {
            path: path.display().to_string(),
            text: e.to_string(),
        })?;
        let cols = parse_table(&text)?;
        log::debug!("read {} bins for dataset '{name}' from {}", cols.log10en.len(), path.display());
        Dataset::from_bin_sizes(name, title, cols.log10en, cols.bin_size, cols.nevents, cols.exposure)
    }

    /// The dataset rendered as a four-column table with a header line.
    pub fn to_table_string(&self) -> String {
        let mut out = format!(
            "{} {:>12} {:>13} {:>15}\n",
            "#log10en", "log10en_bsize", "nevents", "exposure"
        );
        for i in 0..self.len() {
            out.push_str(&format!(
                "{:6.2} {:11.2} {:>19} {:>15}\n",
                self.log10en()[i],
                2.0 * self.half_widths()[i],
                format_c_exp(self.nevents()[i], 5),
                format_c_exp(self.exposure()[i], 5),
            ));
        }
        out
    }

    /// Write [`Dataset::to_table_string`] to `path`.
    ///
    /// # Errors
    /// `SpecError::Io` when the file cannot be written.
    pub fn to_table_file(&self, path: impl AsRef<Path>) -> SpecResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_table_string()).map_err(|e| SpecError::Io {
            path: path.display().to_string(),
            text: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Comment and blank-line handling, malformed rows.
    // - The writer's column layout and reading its output back.
    // - I/O failures surfacing as `SpecError::Io`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Comments and blanks are skipped; short and non-numeric rows fail.
    //
    // Given
    // -----
    // - A header, a blank line and two rows; then a 3-field row and a
    //   non-numeric field.
    //
    // Expect
    // ------
    // - Two rows parsed; `MalformedTableRow` at lines 2 and 1.
    fn parse_skips_comments_and_rejects_bad_rows() {
        // Arrange
        let text = "# header\n\n18.55 0.1 120 1.0e3\n18.65 0.1 80 1.0e3 extra\n";

        // Act
        let cols = parse_table(text).unwrap();

        // Assert
        assert_eq!(cols.log10en, vec![18.55, 18.65]);
        assert_eq!(cols.nevents, vec![120.0, 80.0]);
        assert_eq!(
            parse_table("# h\n18.5 0.1 3\n").unwrap_err(),
            SpecError::MalformedTableRow { line: 2, reason: "expected 4 columns" }
        );
        assert!(matches!(
            parse_table("18.5 0.1 x 1\n"),
            Err(SpecError::MalformedTableRow { line: 1, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The writer doubles half-widths and the reader halves them back.
    //
    // Given
    // -----
    // - Two bins with half-width 0.05 written to a temporary file.
    //
    // Expect
    // ------
    // - Header line as documented; bin-size column prints 0.10; reading the
    //   file reproduces centers, half-widths and counts.
    fn write_then_read_file() {
        let ds = Dataset::new(
            "w",
            "",
            vec![19.05, 19.15],
            vec![0.05, 0.05],
            vec![12.0, 0.0],
            vec![2.5e3, 2.5e3],
        )
        .unwrap();
        let text = ds.to_table_string();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#log10en log10en_bsize       nevents        exposure"));
        assert_eq!(lines.next(), Some(" 19.05        0.10         1.20000e+01     2.50000e+03"));

        let path = std::env::temp_dir().join(format!("specfit_table_{}.txt", std::process::id()));
        ds.to_table_file(&path).unwrap();
        let back = Dataset::from_table_file("w", "", &path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.log10en(), ds.log10en());
        assert_relative_eq!(back.half_widths()[1], 0.05, epsilon = 1e-12);
        assert_eq!(back.nevents(), ds.nevents());
        assert_eq!(back.exposure(), ds.exposure());
    }

    #[test]
    // Purpose
    // -------
    // A missing file is reported with its path.
    //
    // Given
    // -----
    // - A path that does not exist.
    //
    // Expect
    // ------
    // - `SpecError::Io` naming the path.
    fn missing_file_is_io_error() {
        let err = Dataset::from_table_file("m", "", "/nonexistent/specfit/none.txt").unwrap_err();
        match err {
            SpecError::Io { path, .. } => assert!(path.ends_with("none.txt")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
