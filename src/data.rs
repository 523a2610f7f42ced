use std::collections::HashMap;
use std::fmt;

pub mod csv;

/// One value of the time column.
///
/// Integer-looking cells compare numerically so `2000` and `"2000"` are the
/// same frame; everything else compares as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(untagged)]
pub enum TimePoint {
    Int(i64),
    Text(String),
}

impl TimePoint {
    /// Parse a raw cell. Never fails: non-integer input becomes `Text`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(trimmed.to_owned()),
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> serde::Deserialize<'de> for TimePoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i64),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Int(n) => Self::Int(n),
            Repr::Text(s) => Self::parse(&s),
        })
    }
}

/// One observation: an entity's metric value at one time point.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RaceRow {
    pub time: TimePoint,
    pub label: String,
    pub value: f64,
}

/// One ranked entry of a selected frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceEntry {
    pub label: String,
    pub value: f64,
}

/// The full data set, indexed by time point.
///
/// Distinct time values keep the order of their first appearance in the row
/// stream; that order is the frame order of the race.
#[derive(Clone, Debug, Default)]
pub struct RaceTable {
    rows: Vec<RaceRow>,
    distinct_times: Vec<TimePoint>,
    by_time: HashMap<TimePoint, Vec<usize>>,
}

impl RaceTable {
    /// Build a table from rows. Rows with a non-finite value are dropped.
    pub fn from_rows(rows: Vec<RaceRow>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.push(row);
        }
        table
    }

    fn push(&mut self, row: RaceRow) {
        if !row.value.is_finite() {
            tracing::warn!(label = %row.label, time = %row.time, "dropping row with non-finite value");
            return;
        }
        let idx = self.rows.len();
        match self.by_time.get_mut(&row.time) {
            Some(indices) => indices.push(idx),
            None => {
                self.distinct_times.push(row.time.clone());
                self.by_time.insert(row.time.clone(), vec![idx]);
            }
        }
        self.rows.push(row);
    }

    /// Distinct time values in first-appearance order.
    pub fn times(&self) -> &[TimePoint] {
        &self.distinct_times
    }

    /// Rows whose time value exactly equals `time`, in row order.
    pub fn rows_at<'a>(&'a self, time: &TimePoint) -> impl Iterator<Item = &'a RaceRow> {
        self.by_time
            .get(time)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(time: i64, label: &str, value: f64) -> RaceRow {
        RaceRow {
            time: TimePoint::Int(time),
            label: label.to_owned(),
            value,
        }
    }

    #[test]
    fn time_point_parses_ints_and_text() {
        assert_eq!(TimePoint::parse("2000"), TimePoint::Int(2000));
        assert_eq!(TimePoint::parse(" -3 "), TimePoint::Int(-3));
        assert_eq!(TimePoint::parse("Q1 2020"), TimePoint::Text("Q1 2020".into()));
        assert_eq!(TimePoint::parse("2000.5"), TimePoint::Text("2000.5".into()));
    }

    #[test]
    fn time_point_display_round_trips() {
        assert_eq!(TimePoint::Int(2000).to_string(), "2000");
        assert_eq!(TimePoint::Text("Q1".into()).to_string(), "Q1");
    }

    #[test]
    fn distinct_times_keep_first_appearance_order() {
        let table = RaceTable::from_rows(vec![
            row(2001, "a", 1.0),
            row(2000, "a", 2.0),
            row(2001, "b", 3.0),
            row(2002, "a", 4.0),
            row(2000, "b", 5.0),
        ]);
        assert_eq!(
            table.times(),
            &[
                TimePoint::Int(2001),
                TimePoint::Int(2000),
                TimePoint::Int(2002)
            ]
        );
    }

    #[test]
    fn rows_at_filters_exactly_and_keeps_row_order() {
        let table = RaceTable::from_rows(vec![
            row(2000, "a", 1.0),
            row(2001, "b", 2.0),
            row(2000, "c", 3.0),
        ]);
        let labels: Vec<&str> = table
            .rows_at(&TimePoint::Int(2000))
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(labels, ["a", "c"]);
        assert_eq!(table.rows_at(&TimePoint::Int(1999)).count(), 0);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let table = RaceTable::from_rows(vec![
            row(2000, "a", f64::NAN),
            row(2000, "b", f64::INFINITY),
            row(2000, "c", 1.0),
        ]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn time_point_deserializes_from_json_number_or_string() {
        let t: TimePoint = serde_json::from_value(serde_json::json!(2000)).unwrap();
        assert_eq!(t, TimePoint::Int(2000));
        let t: TimePoint = serde_json::from_value(serde_json::json!("2000")).unwrap();
        assert_eq!(t, TimePoint::Int(2000));
        let t: TimePoint = serde_json::from_value(serde_json::json!("Q1")).unwrap();
        assert_eq!(t, TimePoint::Text("Q1".into()));
    }
}
