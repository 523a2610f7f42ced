use std::path::Path;

use crate::data::{RaceRow, RaceTable, TimePoint};
use crate::error::{ReelError, ReelResult};

/// Column names of the three required CSV fields.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CsvColumns {
    #[serde(default = "default_time_col")]
    pub time: String,
    #[serde(default = "default_label_col")]
    pub label: String,
    #[serde(default = "default_value_col")]
    pub value: String,
}

fn default_time_col() -> String {
    "Time".to_owned()
}

fn default_label_col() -> String {
    "Location".to_owned()
}

fn default_value_col() -> String {
    "Value".to_owned()
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            time: default_time_col(),
            label: default_label_col(),
            value: default_value_col(),
        }
    }
}

/// Load a race table from a headered CSV file.
///
/// Rows with an empty label or an unparsable value are skipped with a
/// warning; a file that yields zero usable rows is an input error.
pub fn load_csv(path: impl AsRef<Path>, columns: &CsvColumns) -> ReelResult<RaceTable> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "loading race data");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ReelError::input(format!("cannot read {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| ReelError::input(format!("cannot read CSV header: {e}")))?
        .clone();

    let col_index = |name: &str| -> ReelResult<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ReelError::input(format!(
                "column \"{name}\" not found; available columns: {}",
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
    };

    let time_idx = col_index(&columns.time)?;
    let label_idx = col_index(&columns.label)?;
    let value_idx = col_index(&columns.value)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, "skipping malformed CSV record: {e}");
                skipped += 1;
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let label = field(label_idx);
        if label.is_empty() {
            tracing::warn!(line, "skipping row with empty label");
            skipped += 1;
            continue;
        }
        let value = match field(value_idx).parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                tracing::warn!(line, label, "skipping row with unusable value");
                skipped += 1;
                continue;
            }
        };

        rows.push(RaceRow {
            time: TimePoint::parse(field(time_idx)),
            label: label.to_owned(),
            value,
        });
    }

    if rows.is_empty() {
        return Err(ReelError::input(format!(
            "{} contains no usable rows",
            path.display()
        )));
    }

    let table = RaceTable::from_rows(rows);
    tracing::info!(
        rows = table.len(),
        times = table.times().len(),
        skipped,
        "race data loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::path::PathBuf::from("target").join("csv_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_rows_and_skips_bad_ones() {
        let path = write_csv(
            "basic.csv",
            "Time,Location,Value\n\
             2000,China,1200.50\n\
             2000,,9.0\n\
             2000,India,not-a-number\n\
             2001,China,1210.00\n",
        );
        let table = load_csv(&path, &CsvColumns::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.times(),
            &[TimePoint::Int(2000), TimePoint::Int(2001)]
        );
    }

    #[test]
    fn custom_column_names() {
        let path = write_csv(
            "custom.csv",
            "dt,country,pop\n2020,A,1.0\n2021,B,2.0\n",
        );
        let cols = CsvColumns {
            time: "dt".into(),
            label: "country".into(),
            value: "pop".into(),
        };
        let table = load_csv(&path, &cols).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn missing_column_is_input_error() {
        let path = write_csv("missing.csv", "Time,Location\n2000,A\n");
        let err = load_csv(&path, &CsvColumns::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("input error"), "{msg}");
        assert!(msg.contains("Value"), "{msg}");
    }

    #[test]
    fn empty_file_is_input_error() {
        let path = write_csv("empty.csv", "Time,Location,Value\n");
        assert!(load_csv(&path, &CsvColumns::default()).is_err());
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = load_csv("target/csv_tests/definitely-missing.csv", &CsvColumns::default())
            .unwrap_err();
        assert!(matches!(err, ReelError::Input(_)));
    }
}
