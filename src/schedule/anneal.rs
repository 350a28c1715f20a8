//! Power annealer (spec §5): stagger move start times within a shared
//! power-supply group so that spin-up current draw doesn't stack.

use std::collections::HashMap;

use log::debug;

use crate::calibration::PositionerId;
use crate::move_table::MoveTable;

/// Spread each table's start within its supply group evenly across
/// `[0, anneal_time)` seconds, by inserting a leading prepause-only row.
///
/// Positioners with no entry in `supply_groups` are left untouched: they
/// are assumed to be on a dedicated supply and cannot contend for current
/// with anyone else.
pub fn anneal(
    tables: &mut HashMap<PositionerId, MoveTable>,
    supply_groups: &HashMap<PositionerId, String>,
    anneal_time: f64,
) {
    if anneal_time <= 0.0 {
        return;
    }

    let mut groups: HashMap<&str, Vec<PositionerId>> = HashMap::new();
    for (id, group) in supply_groups {
        if tables.contains_key(id) {
            groups.entry(group.as_str()).or_default().push(id.clone());
        }
    }

    for (group, mut ids) in groups {
        if ids.len() < 2 {
            continue;
        }
        ids.sort();
        let step = anneal_time / ids.len() as f64;
        debug!(
            "annealing {} positioners on supply group {} over {}s",
            ids.len(),
            group,
            anneal_time
        );
        for (i, id) in ids.iter().enumerate() {
            let offset = step * i as f64;
            if offset <= 0.0 {
                continue;
            }
            if let Some(table) = tables.get_mut(id) {
                stagger_start(table, offset);
            }
        }
    }
}

fn stagger_start(table: &mut MoveTable, offset: f64) {
    if table.is_empty() {
        table.insert_new_row(0);
    }
    let current = table.rows()[0].prepause;
    table.set_prepause(0, current + offset);
}
