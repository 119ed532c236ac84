//! Telemetry records for departing symbionts.

use symbiosis_types::{ExitRecord, ExitStatus};

use crate::symbiont::Symbiont;

/// Keep a clock only if it was ever set.
fn finite(time: f64) -> Option<f64> {
    time.is_finite().then_some(time)
}

impl Symbiont {
    /// Build the exit record for a symbiont leaving at `exit_time`.
    ///
    /// Call before recording the exit event so `last_event_*` still names
    /// the event that preceded the exit.
    pub fn exit_record(&self, status: ExitStatus, exit_time: f64) -> ExitRecord {
        let lineage = self.lineage();
        let clocks = self.clocks();
        let history = self.history();
        ExitRecord {
            id: self.id(),
            how_arrived: lineage.how_arrived,
            parent: lineage.parent,
            agent_zero: lineage.agent_zero,
            clade: self.clade(),
            mitotic_cost_rate: self.mitotic_cost_rate(),
            production_rate: self.production_rate(),
            arrival_time: self.arrival_time(),
            exit_time,
            exit_status: status,
            last_event_time: self.prev_event_time(),
            last_event_kind: self.prev_event_kind(),
            residence_time: exit_time - self.arrival_time(),
            bank_on_arrival: self.bank_on_arrival(),
            bank_on_exit: self.bank(),
            divisions: self.divisions(),
            escape_time: finite(clocks.escape),
            digestion_time: finite(clocks.digestion),
            denouement_time: finite(clocks.denouement),
            still_in_residence: status == ExitStatus::StillInResidence,
            cells: history.cells.clone(),
            visit_times: history.visit_times.clone(),
            cell_demands: history.cell_demands.clone(),
            g0_durations: history.g0_durations.clone(),
            g1sg2m_durations: history.g1sg2m_durations.clone(),
        }
    }
}
