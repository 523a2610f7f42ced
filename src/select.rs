use crate::data::{RaceEntry, RaceTable, TimePoint};

/// Select the top `n` entries for one frame.
///
/// Only rows whose time value exactly equals `time` participate; there is no
/// interpolation or nearest-match. The sort is stable and descending by
/// value, so equal values keep the table's row order. Fewer than `n` rows,
/// or a time value absent from the table, yield a shorter (possibly empty)
/// selection.
pub fn select_top_n(table: &RaceTable, time: &TimePoint, n: usize) -> Vec<RaceEntry> {
    let mut entries: Vec<RaceEntry> = table
        .rows_at(time)
        .map(|row| RaceEntry {
            label: row.label.clone(),
            value: row.value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries.truncate(n);
    entries
}
