//! Scheduling statistics: counts of collisions found and resolved, by tactic.

use std::collections::HashMap;

use crate::schedule::Tactic;

/// Accumulates counters across one or more scheduling cycles, for logging
/// and offline performance review (spec §5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsRecorder {
    collisions_found: u64,
    collisions_resolved: u64,
    tactic_uses: HashMap<String, u64>,
}

impl StatsRecorder {
    /// A recorder with all counters at zero.
    pub fn new() -> Self {
        StatsRecorder::default()
    }

    /// Record one detected collision.
    pub fn record_collision_found(&mut self) {
        self.collisions_found += 1;
    }

    /// Record one collision resolved by the given tactic.
    pub fn record_resolved(&mut self, tactic: Tactic) {
        self.collisions_resolved += 1;
        *self
            .tactic_uses
            .entry(format!("{:?}", tactic))
            .or_insert(0) += 1;
    }

    /// Total collisions detected since this recorder was created.
    pub fn collisions_found(&self) -> u64 {
        self.collisions_found
    }

    /// Total collisions resolved since this recorder was created.
    pub fn collisions_resolved(&self) -> u64 {
        self.collisions_resolved
    }

    /// Number of times a given tactic resolved a collision.
    pub fn tactic_uses(&self, tactic: Tactic) -> u64 {
        self.tactic_uses
            .get(&format!("{:?}", tactic))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_tactic() {
        let mut stats = StatsRecorder::new();
        stats.record_collision_found();
        stats.record_collision_found();
        stats.record_resolved(Tactic::RetractSmall);
        stats.record_resolved(Tactic::RetractSmall);
        stats.record_resolved(Tactic::Freeze);

        assert_eq!(stats.collisions_found(), 2);
        assert_eq!(stats.collisions_resolved(), 3);
        assert_eq!(stats.tactic_uses(Tactic::RetractSmall), 2);
        assert_eq!(stats.tactic_uses(Tactic::Freeze), 1);
        assert_eq!(stats.tactic_uses(Tactic::RotateCcwLarge), 0);
    }
}
