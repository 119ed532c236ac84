//! Event handlers: growth, division, exit, and pool arrival.
//!
//! Each handler runs at the popped event's time, follows the occupancy
//! discipline described in [`crate::simulation`], and returns an
//! [`EventReport`] describing what happened.

use symbiosis_agents::{MilestoneCheck, Symbiont};
use symbiosis_types::{
    AgentId, CellCoord, CladeId, DivisionOutcome, EventKind, ExitRecord, ExitStatus, Stream,
};
use symbiosis_world::Vacancy;
use tracing::{debug, warn};

use crate::simulation::{Simulation, SimulationError};

/// What a handled event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventReport {
    /// A symbiont finished growing and entered the division phase (or ran
    /// short on the way).
    EndOfG0 {
        /// The symbiont.
        agent: AgentId,
        /// Whether the division milestone is reachable.
        check: MilestoneCheck,
    },
    /// A symbiont divided.
    Division(Box<DivisionReport>),
    /// A symbiont left the sponge.
    Exit(Box<ExitRecord>),
    /// A pool arrival was handled.
    Arrival(ArrivalReport),
}

impl EventReport {
    /// Exit records produced by this event.
    pub fn departures(&self) -> impl Iterator<Item = &ExitRecord> {
        let record = match self {
            Self::Exit(record) => Some(record.as_ref()),
            Self::Division(report) => report.departed.as_ref(),
            Self::EndOfG0 { .. } | Self::Arrival(_) => None,
        };
        record.into_iter()
    }
}

/// Result of one division.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionReport {
    /// The dividing symbiont.
    pub parent: AgentId,
    /// The new symbiont.
    pub child: AgentId,
    /// Which branch of the outcome tree was taken.
    pub outcome: DivisionOutcome,
    /// Record of whichever of the pair left, if one did.
    pub departed: Option<ExitRecord>,
}

/// Result of one pool arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalReport {
    /// A symbiont took up residence.
    Placed {
        /// The new resident.
        agent: AgentId,
        /// Its host cell.
        cell: CellCoord,
    },
    /// The sponge was at maximum occupancy.
    SpongeFull,
    /// The newcomer had no affinity for the sponge.
    NoAffinity {
        /// Clade of the newcomer.
        clade: CladeId,
    },
    /// No cell could take the newcomer.
    NoRoom {
        /// Clade of the newcomer.
        clade: CladeId,
    },
}

/// Where the pair ends up after the outcome tree is resolved.
#[derive(Debug, Clone, Copy)]
struct DivisionPlan {
    outcome: DivisionOutcome,
    child_cell: Option<CellCoord>,
    parent_cell: Option<CellCoord>,
}

impl Simulation {
    /// End of growth: commit, draw the division phase, and schedule it.
    pub(crate) fn on_end_g0(&mut self, id: AgentId) -> Result<EventReport, SimulationError> {
        let now = self.now;
        let coord = self.host_cell(id)?;
        self.commit_cell(coord, now)?;
        let count = self.grid.cell(coord)?.occupant_count();

        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownAgent(id))?;
        agent.clear_clock(EventKind::EndG0);
        agent.record_event(now, EventKind::EndG0);
        let (clade, streams) = self.context.clade_and_streams(agent.clade())?;
        let deadline = agent.draw_end_g1sg2m(clade, now, streams)?;
        let check = agent.schedule_milestone(EventKind::EndG1sg2m, deadline, count, clade, streams)?;

        self.sync_schedule(id)?;
        self.refresh_cell_cache(coord)?;
        Ok(EventReport::EndOfG0 { agent: id, check })
    }

    /// Division: resolve the outcome tree, settle occupancy, and schedule
    /// whichever of the pair remain.
    pub(crate) fn on_end_g1sg2m(&mut self, id: AgentId) -> Result<EventReport, SimulationError> {
        let origin = self.host_cell(id)?;
        let clade_id = self.resident(id)?.clade();
        let vacancy = self
            .grid
            .find_open_cell_near(origin, clade_id, self.context.streams_mut())?;
        self.divide(id, vacancy)
    }

    /// Settle a division of `id` given where room for the offspring was found.
    fn divide(&mut self, id: AgentId, vacancy: Vacancy) -> Result<EventReport, SimulationError> {
        let now = self.now;
        let origin = self.host_cell(id)?;
        let clade_id = self.resident(id)?.clade();
        self.commit_cell(origin, now)?;
        {
            let parent = self.resident_mut(id)?;
            parent.clear_clock(EventKind::EndG1sg2m);
            parent.record_division();
        }

        let child_id = self
            .context
            .allocate_agent_id()
            .ok_or(SimulationError::IdsExhausted)?;
        let plan = self.plan_division(origin, clade_id, vacancy)?;
        debug!(
            parent = %id,
            child = %child_id,
            cell = %origin,
            outcome = ?plan.outcome,
            "Symbiont divides"
        );

        for cell in [plan.child_cell, plan.parent_cell].into_iter().flatten() {
            if cell != origin {
                self.commit_cell(cell, now)?;
            }
        }

        let child_site = plan.child_cell.map(|cell| self.site(cell)).transpose()?;
        let child = {
            let (clade, streams) = self.context.clade_and_streams(clade_id)?;
            let parent = self
                .agents
                .get_mut(&id)
                .ok_or(SimulationError::UnknownAgent(id))?;
            Symbiont::child_of(parent, child_id, clade, child_site, now, streams)?
        };

        let status = plan.outcome.exit_status();
        let mut departed = None;
        let mut changed = Vec::with_capacity(2);

        // The parent leaves its slot before the child takes it.
        if plan.parent_cell != Some(origin) {
            self.grid.remove_occupant(origin, id)?;
            changed.push(origin);
        }
        if plan.parent_cell.is_none() {
            self.unschedule(id)?;
            let mut parent = self
                .agents
                .remove(&id)
                .ok_or(SimulationError::UnknownAgent(id))?;
            departed = status.map(|status| parent.exit_record(status, now));
            parent.leave_cell();
        }

        match plan.child_cell {
            Some(cell) => {
                self.grid.add_occupant(cell, child_id, clade_id)?;
                self.agents.insert(child_id, child);
                changed.push(cell);
            }
            None => departed = status.map(|status| child.exit_record(status, now)),
        }

        if let Some(cell) = plan.parent_cell.filter(|cell| *cell != origin) {
            self.grid.add_occupant(cell, id, clade_id)?;
            let demand = self.grid.cell(cell)?.demand();
            self.resident_mut(id)?.enter_cell(cell, demand, now);
            changed.push(cell);
        }

        let mut fresh = Vec::with_capacity(2);
        if plan.child_cell.is_some() {
            self.schedule_new_resident(child_id)?;
            fresh.push(child_id);
        }
        if let Some(cell) = plan.parent_cell {
            self.schedule_next_growth(id, cell)?;
            fresh.push(id);
        }

        changed.sort_unstable();
        changed.dedup();
        for cell in &changed {
            self.reproject_cell(*cell, &fresh)?;
        }
        let mut touched = changed;
        touched.push(origin);
        touched.sort_unstable();
        touched.dedup();
        for cell in touched {
            self.refresh_cell_cache(cell)?;
        }

        Ok(EventReport::Division(Box::new(DivisionReport {
            parent: id,
            child: child_id,
            outcome: plan.outcome,
            departed,
        })))
    }

    /// Walk the outcome tree for a division at `origin`.
    fn plan_division(
        &mut self,
        origin: CellCoord,
        clade_id: CladeId,
        vacancy: Vacancy,
    ) -> Result<DivisionPlan, SimulationError> {
        let clade = self.context.clade(clade_id)?;
        let eviction_prob = clade.parent_eviction_prob;
        let affinity_prob = clade.division_affinity_prob;

        let plan = match vacancy {
            Vacancy::Cell(cell) if cell == origin => DivisionPlan {
                outcome: DivisionOutcome::BothStay,
                child_cell: Some(origin),
                parent_cell: Some(origin),
            },
            Vacancy::Cell(open) => {
                let parent_leaves = self.coin(Stream::Eviction, eviction_prob)?;
                let mover_stays = self.coin(Stream::DivisionAffinity, affinity_prob)?;
                match (parent_leaves, mover_stays) {
                    (true, true) => DivisionPlan {
                        outcome: DivisionOutcome::BothStay,
                        child_cell: Some(origin),
                        parent_cell: Some(open),
                    },
                    (true, false) => DivisionPlan {
                        outcome: DivisionOutcome::ParentNoAffinity,
                        child_cell: Some(origin),
                        parent_cell: None,
                    },
                    (false, true) => DivisionPlan {
                        outcome: DivisionOutcome::BothStay,
                        child_cell: Some(open),
                        parent_cell: Some(origin),
                    },
                    (false, false) => DivisionPlan {
                        outcome: DivisionOutcome::ChildNoAffinity,
                        child_cell: None,
                        parent_cell: Some(origin),
                    },
                }
            }
            Vacancy::OutsideGrid => {
                if self.coin(Stream::Eviction, eviction_prob)? {
                    DivisionPlan {
                        outcome: DivisionOutcome::ParentInfectsOutside,
                        child_cell: Some(origin),
                        parent_cell: None,
                    }
                } else {
                    DivisionPlan {
                        outcome: DivisionOutcome::ChildInfectsOutside,
                        child_cell: None,
                        parent_cell: Some(origin),
                    }
                }
            }
            Vacancy::Unavailable => {
                if self.coin(Stream::Eviction, eviction_prob)? {
                    DivisionPlan {
                        outcome: DivisionOutcome::ParentEvicted,
                        child_cell: Some(origin),
                        parent_cell: None,
                    }
                } else {
                    DivisionPlan {
                        outcome: DivisionOutcome::ChildEvicted,
                        child_cell: None,
                        parent_cell: Some(origin),
                    }
                }
            }
        };
        Ok(plan)
    }

    /// Put a parent that stays in the sponge back into growth.
    fn schedule_next_growth(&mut self, id: AgentId, cell: CellCoord) -> Result<(), SimulationError> {
        let now = self.now;
        let count = self.grid.cell(cell)?.occupant_count();
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownAgent(id))?;
        agent.record_event(now, EventKind::EndG1sg2m);
        let (clade, streams) = self.context.clade_and_streams(agent.clade())?;
        let deadline = agent.draw_end_g0(clade, now, streams)?;
        agent.schedule_milestone(EventKind::EndG0, deadline, count, clade, streams)?;
        self.sync_schedule(id)
    }

    /// Digestion: the host takes the symbiont and its whole bank.
    pub(crate) fn on_digestion(&mut self, id: AgentId) -> Result<EventReport, SimulationError> {
        self.on_exit(id, EventKind::Digestion)
    }

    /// Escape: the symbiont flees ahead of digestion, losing its bank.
    pub(crate) fn on_escape(&mut self, id: AgentId) -> Result<EventReport, SimulationError> {
        self.on_exit(id, EventKind::Escape)
    }

    /// Denouement: the symbiont leaves on its own, keeping its bank.
    pub(crate) fn on_denouement(&mut self, id: AgentId) -> Result<EventReport, SimulationError> {
        self.on_exit(id, EventKind::Denouement)
    }

    /// Shared exit path: the symbiont leaves and its cellmates are
    /// re-projected with one fewer sharer.
    ///
    /// After an escape the record carries both `escape_time` (when it left)
    /// and `digestion_time` (the crossing it fled).
    fn on_exit(
        &mut self,
        id: AgentId,
        kind: EventKind,
    ) -> Result<EventReport, SimulationError> {
        let now = self.now;
        let coord = self.host_cell(id)?;
        self.commit_cell(coord, now)?;

        let mut agent = self
            .agents
            .remove(&id)
            .ok_or(SimulationError::UnknownAgent(id))?;
        let phase = agent.phase();
        let status = ExitStatus::for_exit(kind, phase).ok_or(SimulationError::PhaseMismatch {
            phase: Some(phase),
            kind,
        })?;
        if kind.is_shortfall() {
            agent.zero_bank();
        }
        let record = agent.exit_record(status, now);
        agent.leave_cell();
        self.grid.remove_occupant(coord, id)?;
        debug!(
            agent = %id,
            cell = %coord,
            status = ?status,
            bank = record.bank_on_exit,
            "Symbiont exits"
        );

        self.reproject_cell(coord, &[])?;
        self.refresh_cell_cache(coord)?;
        Ok(EventReport::Exit(Box::new(record)))
    }

    /// Pool arrival: schedule the next one, then try to seat the newcomer.
    pub(crate) fn on_arrival(&mut self) -> Result<EventReport, SimulationError> {
        self.schedule_arrival()?;

        if self.grid.population() >= self.grid.max_occupancy() {
            warn!(
                time = self.now,
                population = self.grid.population(),
                "Arrival rejected, sponge is full"
            );
            return Ok(EventReport::Arrival(ArrivalReport::SpongeFull));
        }

        let u = self.context.streams_mut().random(Stream::Clade)?;
        let clade = self.context.clades().select(u);
        let affinity = self.context.clade(clade)?.arrival_affinity_prob;
        if !self.coin(Stream::ArrivalAffinity, affinity)? {
            return Ok(EventReport::Arrival(ArrivalReport::NoAffinity { clade }));
        }

        let Some(cell) = self
            .grid
            .find_open_cell_global(clade, self.context.streams_mut())?
        else {
            debug!(time = self.now, clade = %clade, "No open cell for arrival");
            return Ok(EventReport::Arrival(ArrivalReport::NoRoom { clade }));
        };
        let agent = self.place_symbiont(clade, cell)?;
        Ok(EventReport::Arrival(ArrivalReport::Placed { agent, cell }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use symbiosis_agents::{CladeConfig, CladeTable, MutationConfig};
    use symbiosis_types::{GridDimensions, Phase, Topology};
    use symbiosis_world::Grid;

    use super::*;
    use crate::context::SimulationContext;

    const EPS: f64 = 1e-9;

    /// A clade that never runs short, with deterministic phase lengths.
    fn thriving() -> CladeConfig {
        CladeConfig {
            proportion: 1.0,
            photosynthetic_production_rate: 10.0,
            ppr_fuzz: 0.0,
            mitotic_cost_rate: 0.0,
            mcr_fuzz: 0.0,
            avg_residence_time: 1.0e6,
            residence_fuzz: 0.0,
            g0_length: 1.0,
            g0_fuzz: 0.0,
            g1sg2m_length: 0.25,
            g1sg2m_fuzz: 0.0,
            mutation: MutationConfig::disabled(),
            ..CladeConfig::default()
        }
    }

    fn simulation(dims: GridDimensions, capacity: u32, clade: CladeConfig) -> Simulation {
        let table = CladeTable::new(vec![clade]).unwrap();
        let context = SimulationContext::new(table, 7);
        let grid = Grid::uniform(dims, Topology::Square, capacity, 1.0).unwrap();
        Simulation::from_parts(context, grid, None)
    }

    fn single_cell(clade: CladeConfig) -> Simulation {
        simulation(GridDimensions::new(1, 1, 1), 1, clade)
    }

    /// Run the growth phase of `id` and return its scheduled division time.
    fn grow(sim: &mut Simulation, id: AgentId) -> f64 {
        let report = sim.handle_next().unwrap().unwrap();
        assert!(matches!(report, EventReport::EndOfG0 { agent, check: MilestoneCheck::Reached } if agent == id));
        assert_eq!(sim.agent(id).unwrap().phase(), Phase::G1sg2m);
        let (time, kind) = sim.scheduled_event(id).unwrap();
        assert_eq!(kind, EventKind::EndG1sg2m);
        time
    }

    fn divide(sim: &mut Simulation) -> DivisionReport {
        match sim.handle_next().unwrap().unwrap() {
            EventReport::Division(report) => *report,
            other => panic!("expected a division, got {other:?}"),
        }
    }

    /// Pop the division of `parent` and settle it as if `vacancy` were found.
    fn divide_into(sim: &mut Simulation, parent: AgentId, vacancy: Vacancy) -> DivisionReport {
        let (time, kind) = sim.scheduled_event(parent).unwrap();
        assert_eq!(kind, EventKind::EndG1sg2m);
        let event = sim.calendar.pop_next().unwrap();
        assert_eq!(event.agent, Some(parent));
        sim.scheduled.remove(&parent);
        sim.now = time;
        match sim.divide(parent, vacancy).unwrap() {
            EventReport::Division(report) => *report,
            other => panic!("expected a division, got {other:?}"),
        }
    }

    /// A parent on the edge of a two-cell strip, its neighbor still empty.
    fn edge_of_strip(eviction: f64, affinity: f64) -> (Simulation, AgentId) {
        let mut sim = simulation(
            GridDimensions::new(1, 1, 2),
            1,
            CladeConfig {
                parent_eviction_prob: eviction,
                division_affinity_prob: affinity,
                ..thriving()
            },
        );
        let parent = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        grow(&mut sim, parent);
        (sim, parent)
    }

    #[test]
    fn new_resident_has_exactly_one_event() {
        let mut sim = single_cell(thriving());
        let id = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();

        assert_eq!(sim.calendar().pending(), 1);
        let (time, kind) = sim.scheduled_event(id).unwrap();
        assert_eq!(kind, EventKind::EndG0);
        assert!((time - 1.0).abs() < EPS);
        assert!((sim.grid().cell(CellCoord::new(0, 0, 0)).unwrap().next_event_time() - 1.0).abs() < EPS);
    }

    #[test]
    fn full_cell_rejects_placement() {
        let mut sim = single_cell(thriving());
        sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        assert!(matches!(
            sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)),
            Err(SimulationError::World { .. })
        ));
        assert_eq!(sim.population(), 1);
    }

    #[test]
    fn eviction_with_no_room_removes_the_parent() {
        let mut sim = single_cell(CladeConfig {
            parent_eviction_prob: 1.0,
            ..thriving()
        });
        let parent = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        let division_time = grow(&mut sim, parent);

        let report = divide(&mut sim);
        assert_eq!(report.parent, parent);
        assert_eq!(report.outcome, DivisionOutcome::ParentEvicted);
        let departed = report.departed.unwrap();
        assert_eq!(departed.id, parent);
        assert_eq!(departed.exit_status, ExitStatus::ParentEvicted);
        assert_eq!(departed.last_event_kind, EventKind::EndG0);
        assert!((departed.exit_time - division_time).abs() < EPS);

        assert!(sim.agent(parent).is_none());
        let child = sim.agent(report.child).unwrap();
        assert_eq!(child.cell(), Some(CellCoord::new(0, 0, 0)));
        assert_eq!(child.lineage().parent, Some(parent));
        assert_eq!(sim.population(), 1);
        assert_eq!(sim.calendar().pending(), 1);
        assert_eq!(sim.scheduled_event(report.child).unwrap().1, EventKind::EndG0);
    }

    #[test]
    fn eviction_with_no_room_discards_the_child_and_halves_the_bank() {
        let mut sim = single_cell(CladeConfig {
            parent_eviction_prob: 0.0,
            ..thriving()
        });
        let parent = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        let division_time = grow(&mut sim, parent);
        let bank_at_division = sim
            .agent(parent)
            .unwrap()
            .project_to(division_time, 1)
            .bank_end;

        let report = divide(&mut sim);
        assert_eq!(report.outcome, DivisionOutcome::ChildEvicted);
        let departed = report.departed.unwrap();
        assert_eq!(departed.id, report.child);
        assert_eq!(departed.exit_status, ExitStatus::ChildEvicted);

        let survivor = sim.agent(parent).unwrap();
        assert_eq!(survivor.divisions(), 1);
        assert_eq!(survivor.phase(), Phase::G0);
        assert!((survivor.bank() + departed.bank_on_exit - bank_at_division).abs() < EPS);
        assert!((survivor.bank() - bank_at_division / 2.0).abs() < EPS);
        assert!(sim.agent(report.child).is_none());

        let (time, kind) = sim.scheduled_event(parent).unwrap();
        assert_eq!(kind, EventKind::EndG0);
        assert!((time - (division_time + 1.0)).abs() < EPS);
    }

    #[test]
    fn relocating_parent_moves_to_a_neighbor() {
        let centre = CellCoord::new(0, 1, 1);
        let mut sim = simulation(
            GridDimensions::new(1, 3, 3),
            1,
            CladeConfig {
                parent_eviction_prob: 1.0,
                division_affinity_prob: 1.0,
                ..thriving()
            },
        );
        let parent = sim.place_symbiont(CladeId(0), centre).unwrap();
        grow(&mut sim, parent);

        let report = divide(&mut sim);
        assert_eq!(report.outcome, DivisionOutcome::BothStay);
        assert!(report.departed.is_none());

        let moved = sim.agent(parent).unwrap();
        let new_home = moved.cell().unwrap();
        assert_ne!(new_home, centre);
        assert_eq!(moved.history().cells, vec![centre, new_home]);
        assert_eq!(sim.agent(report.child).unwrap().cell(), Some(centre));
        assert!(sim.grid().cell(new_home).unwrap().contains(parent));
        assert!(!sim.grid().cell(centre).unwrap().contains(parent));
        assert_eq!(sim.calendar().pending(), 2);
    }

    #[test]
    fn staying_parent_without_affinity_loses_the_child() {
        let centre = CellCoord::new(0, 1, 1);
        let mut sim = simulation(
            GridDimensions::new(1, 3, 3),
            1,
            CladeConfig {
                parent_eviction_prob: 0.0,
                division_affinity_prob: 0.0,
                ..thriving()
            },
        );
        let parent = sim.place_symbiont(CladeId(0), centre).unwrap();
        grow(&mut sim, parent);

        let report = divide(&mut sim);
        assert_eq!(report.outcome, DivisionOutcome::ChildNoAffinity);
        assert_eq!(report.departed.unwrap().exit_status, ExitStatus::ChildNoAffinity);
        assert_eq!(sim.population(), 1);
        assert_eq!(sim.agent(parent).unwrap().cell(), Some(centre));
    }

    #[test]
    fn evicted_parent_infects_outside() {
        let home = CellCoord::new(0, 0, 0);
        let (mut sim, parent) = edge_of_strip(1.0, 1.0);

        let report = divide_into(&mut sim, parent, Vacancy::OutsideGrid);
        assert_eq!(report.outcome, DivisionOutcome::ParentInfectsOutside);
        let departed = report.departed.unwrap();
        assert_eq!(departed.id, parent);
        assert_eq!(departed.exit_status, ExitStatus::ParentInfectsOutside);
        assert_eq!(departed.divisions, 1);

        assert!(sim.agent(parent).is_none());
        assert_eq!(sim.agent(report.child).unwrap().cell(), Some(home));
        assert!(sim.grid().cell(CellCoord::new(0, 0, 1)).unwrap().is_empty());
        assert_eq!(sim.population(), 1);
        assert_eq!(sim.calendar().pending(), 1);
        assert_eq!(sim.scheduled_event(report.child).unwrap().1, EventKind::EndG0);
    }

    #[test]
    fn child_infects_outside_when_the_parent_stays() {
        let home = CellCoord::new(0, 0, 0);
        let (mut sim, parent) = edge_of_strip(0.0, 1.0);

        let report = divide_into(&mut sim, parent, Vacancy::OutsideGrid);
        assert_eq!(report.outcome, DivisionOutcome::ChildInfectsOutside);
        let departed = report.departed.unwrap();
        assert_eq!(departed.id, report.child);
        assert_eq!(departed.exit_status, ExitStatus::ChildInfectsOutside);
        assert_eq!(departed.parent, Some(parent));

        assert!(sim.agent(report.child).is_none());
        let survivor = sim.agent(parent).unwrap();
        assert_eq!(survivor.cell(), Some(home));
        assert_eq!(survivor.phase(), Phase::G0);
        assert!(sim.grid().cell(CellCoord::new(0, 0, 1)).unwrap().is_empty());
        assert_eq!(sim.calendar().pending(), 1);
        assert_eq!(sim.scheduled_event(parent).unwrap().1, EventKind::EndG0);
    }

    #[test]
    fn relocating_parent_without_affinity_is_lost() {
        let home = CellCoord::new(0, 0, 0);
        let open = CellCoord::new(0, 0, 1);
        let (mut sim, parent) = edge_of_strip(1.0, 0.0);

        let report = divide_into(&mut sim, parent, Vacancy::Cell(open));
        assert_eq!(report.outcome, DivisionOutcome::ParentNoAffinity);
        let departed = report.departed.unwrap();
        assert_eq!(departed.id, parent);
        assert_eq!(departed.exit_status, ExitStatus::ParentNoAffinity);

        assert!(sim.agent(parent).is_none());
        assert_eq!(sim.agent(report.child).unwrap().cell(), Some(home));
        assert!(sim.grid().cell(home).unwrap().contains(report.child));
        assert!(sim.grid().cell(open).unwrap().is_empty());
        assert_eq!(sim.population(), 1);
        assert_eq!(sim.calendar().pending(), 1);
        assert_eq!(sim.scheduled_event(report.child).unwrap().1, EventKind::EndG0);
    }

    #[test]
    fn room_at_home_keeps_both() {
        let home = CellCoord::new(0, 0, 0);
        let mut sim = simulation(GridDimensions::new(1, 1, 1), 2, thriving());
        let parent = sim.place_symbiont(CladeId(0), home).unwrap();
        grow(&mut sim, parent);

        let report = divide(&mut sim);
        assert_eq!(report.outcome, DivisionOutcome::BothStay);
        assert_eq!(sim.grid().cell(home).unwrap().occupant_count(), 2);
        assert_eq!(sim.agent(report.child).unwrap().lineage().agent_zero, parent);
    }

    #[test]
    fn denouement_exits_with_bank_intact() {
        let mut sim = single_cell(CladeConfig {
            avg_residence_time: 0.5,
            ..thriving()
        });
        let id = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        let expected_bank = sim.agent(id).unwrap().project_to(0.5, 1).bank_end;

        let report = sim.handle_next().unwrap().unwrap();
        let EventReport::Exit(record) = report else {
            panic!("expected an exit");
        };
        assert_eq!(record.exit_status, ExitStatus::DenouementInG0);
        assert!((record.bank_on_exit - expected_bank).abs() < EPS);
        assert_eq!(sim.population(), 0);
        assert!(sim.grid().cell(CellCoord::new(0, 0, 0)).unwrap().is_empty());
        assert!(sim.calendar().is_empty());
    }

    #[test]
    fn starving_symbiont_is_digested_with_an_empty_bank() {
        let mut sim = single_cell(CladeConfig {
            photosynthetic_production_rate: 0.0,
            g0_escape_prob: 0.0,
            g0_length: 100.0,
            ..thriving()
        });
        let id = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        let bank = sim.agent(id).unwrap().bank();
        let (time, kind) = sim.scheduled_event(id).unwrap();
        assert_eq!(kind, EventKind::Digestion);
        assert!((time - bank).abs() < EPS);

        let EventReport::Exit(record) = sim.handle_next().unwrap().unwrap() else {
            panic!("expected an exit");
        };
        assert_eq!(record.exit_status, ExitStatus::DigestionInG0);
        assert_eq!(record.bank_on_exit, 0.0);
    }

    #[test]
    fn escaping_symbiont_records_both_shortfall_times() {
        let mut sim = single_cell(CladeConfig {
            photosynthetic_production_rate: 0.0,
            g0_escape_prob: 1.0,
            g0_length: 100.0,
            ..thriving()
        });
        let id = sim.place_symbiont(CladeId(0), CellCoord::new(0, 0, 0)).unwrap();
        let crossing = sim.agent(id).unwrap().bank();
        assert_eq!(sim.scheduled_event(id).unwrap().1, EventKind::Escape);

        let EventReport::Exit(record) = sim.handle_next().unwrap().unwrap() else {
            panic!("expected an exit");
        };
        assert_eq!(record.exit_status, ExitStatus::EscapeInG0);
        assert_eq!(record.escape_time, Some(record.exit_time));
        assert!((record.digestion_time.unwrap() - crossing).abs() < EPS);
        assert!(record.exit_time <= crossing);
        assert_eq!(record.bank_on_exit, 0.0);
    }

    #[test]
    fn arrival_rescues_a_starving_cellmate() {
        let home = CellCoord::new(0, 0, 0);
        // Alone the symbiont loses 0.25 a day; sharing the demand it gains 0.25.
        let mut sim = simulation(
            GridDimensions::new(1, 1, 1),
            2,
            CladeConfig {
                photosynthetic_production_rate: 0.75,
                g0_escape_prob: 0.0,
                g0_length: 40.0,
                initial_surplus_shape: 40.0,
                initial_surplus_scale: 0.1,
                ..thriving()
            },
        );
        let first = sim.place_symbiont(CladeId(0), home).unwrap();
        let (doomed_at, kind) = sim.scheduled_event(first).unwrap();
        assert_eq!(kind, EventKind::Digestion);
        assert!(doomed_at < 40.0);

        let second = sim.place_symbiont(CladeId(0), home).unwrap();
        let (time, kind) = sim.scheduled_event(first).unwrap();
        assert_eq!(kind, EventKind::EndG0);
        assert!((time - 40.0).abs() < EPS);
        let rescued = sim.agent(first).unwrap();
        assert!(rescued.clocks().digestion.is_infinite());
        assert!(rescued.clocks().escape.is_infinite());
        assert!(rescued.project_to(40.0, 2).bank_end > 0.0);

        assert_eq!(sim.scheduled_event(second).unwrap().1, EventKind::EndG0);
        assert_eq!(sim.calendar().pending(), 2);
        assert!((sim.grid().cell(home).unwrap().next_event_time() - 40.0).abs() < EPS);

        // The rescued symbiont reaches the end of its growth phase.
        let report = sim.handle_next().unwrap().unwrap();
        assert!(matches!(report, EventReport::EndOfG0 { .. }));
        assert!((sim.now() - 40.0).abs() < EPS);
    }

    #[test]
    fn departure_tightens_the_cellmate_milestone() {
        let home = CellCoord::new(0, 0, 0);
        // Production covers half the cell demand but not all of it.
        let mut sim = simulation(
            GridDimensions::new(1, 1, 1),
            2,
            CladeConfig {
                photosynthetic_production_rate: 0.75,
                g0_escape_prob: 0.0,
                g0_length: 40.0,
                initial_surplus_shape: 40.0,
                initial_surplus_scale: 0.1,
                ..thriving()
            },
        );
        let first = sim.place_symbiont(CladeId(0), home).unwrap();
        assert_eq!(sim.scheduled_event(first).unwrap().1, EventKind::Digestion);

        let second = sim.place_symbiont(CladeId(0), home).unwrap();
        assert_eq!(sim.scheduled_event(second).unwrap().1, EventKind::EndG0);
        assert_eq!(sim.scheduled_event(first).unwrap().1, EventKind::EndG0);

        sim.unschedule(first).unwrap();
        let EventReport::Exit(record) = sim.on_escape(first).unwrap() else {
            panic!("expected an exit");
        };
        assert_eq!(record.exit_status, ExitStatus::EscapeInG0);

        let (time, kind) = sim.scheduled_event(second).unwrap();
        assert_eq!(kind, EventKind::Digestion);
        let bank = sim.agent(second).unwrap().bank();
        assert!((time - bank / 0.25).abs() < 1e-6);
        assert_eq!(sim.calendar().pending(), 1);
        assert!((sim.grid().cell(home).unwrap().next_event_time() - time).abs() < EPS);
    }
}
