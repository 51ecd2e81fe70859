//! Suggestion tree walking: rows into an ordered list of correction groups.

use crate::core::types::{CorrectionGroup, Row, Side};

/// Extract correction groups in application order.
///
/// Only `"column"` rows are visited. Within each row child, every `left`
/// entry comes before every `right` entry, each side in list order.
pub fn correction_groups(rows: &[Row]) -> Vec<CorrectionGroup> {
    let mut groups = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if !row.carries_edits() {
            continue;
        }
        for (group_index, group) in row.groups.iter().enumerate() {
            for (side, entries) in [(Side::Left, &group.left), (Side::Right, &group.right)] {
                groups.extend(entries.iter().map(|entry| CorrectionGroup {
                    row: row_index,
                    group: group_index,
                    side,
                    segments: entry.segments().to_vec(),
                }));
            }
        }
    }
    groups
}
