//! The symbiont: economic state, life-cycle clocks, lineage, and history.
//!
//! A [`Symbiont`] is created either from the external pool
//! ([`Symbiont::from_pool`]) or as the child of a division
//! ([`Symbiont::child_of`]). It carries five life-cycle clocks; the earliest
//! one is its next milestone. Phase is never stored: it follows from the
//! kind of the last event the symbiont saw (see [`Phase::from_prev_kind`]).
//!
//! The bank is only ever materialized by [`Symbiont::commit`]. Between
//! commits it is a linear function of time given by the symbiont's
//! [`Budget`].

use symbiosis_types::{AgentId, CellCoord, CladeId, EventKind, HowArrived, Phase, Stream};
use symbiosis_world::RandomStreams;
use tracing::debug;

use crate::config::CladeConfig;
use crate::error::AgentError;
use crate::mutation::divfuzz;
use crate::projector::{self, BANK_TOLERANCE, Budget, Projection, Shortfall};

/// Where a new symbiont is hosted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Host cell.
    pub coord: CellCoord,
    /// Demand of the host cell.
    pub demand: f64,
    /// Rows in the lattice, for the production gradient.
    pub rows: u32,
}

/// The five life-cycle clocks. Unset clocks are `+inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeClocks {
    /// End of the growth phase.
    pub end_g0: f64,
    /// End of the division phase.
    pub end_g1sg2m: f64,
    /// Escape after a photosynthate shortfall.
    pub escape: f64,
    /// Digestion after a photosynthate shortfall.
    pub digestion: f64,
    /// End of residence.
    pub denouement: f64,
    /// Phase milestone put on hold by a pending shortfall.
    pub suspended: Option<(f64, EventKind)>,
}

impl LifeClocks {
    /// All clocks unset.
    pub const UNSET: Self = Self {
        end_g0: f64::INFINITY,
        end_g1sg2m: f64::INFINITY,
        escape: f64::INFINITY,
        digestion: f64::INFINITY,
        denouement: f64::INFINITY,
        suspended: None,
    };

    /// The earliest finite clock and its kind.
    ///
    /// Candidates are visited in the order end-G0, end-G1SG2M, escape,
    /// digestion, denouement; a later one wins only if strictly earlier.
    pub fn next(&self) -> Option<(f64, EventKind)> {
        let candidates = [
            (self.end_g1sg2m, EventKind::EndG1sg2m),
            (self.escape, EventKind::Escape),
            (self.digestion, EventKind::Digestion),
            (self.denouement, EventKind::Denouement),
        ];
        let mut best = (self.end_g0, EventKind::EndG0);
        for candidate in candidates {
            if candidate.0 < best.0 {
                best = candidate;
            }
        }
        best.0.is_finite().then_some(best)
    }

    /// Value of the clock for `kind`; `+inf` for kinds without a clock.
    pub const fn get(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::EndG0 => self.end_g0,
            EventKind::EndG1sg2m => self.end_g1sg2m,
            EventKind::Escape => self.escape,
            EventKind::Digestion => self.digestion,
            EventKind::Denouement => self.denouement,
            EventKind::Arrival | EventKind::Cancelled => f64::INFINITY,
        }
    }

    /// Set the clock for `kind`. Kinds without a clock are ignored.
    pub const fn set(&mut self, kind: EventKind, time: f64) {
        match kind {
            EventKind::EndG0 => self.end_g0 = time,
            EventKind::EndG1sg2m => self.end_g1sg2m = time,
            EventKind::Escape => self.escape = time,
            EventKind::Digestion => self.digestion = time,
            EventKind::Denouement => self.denouement = time,
            EventKind::Arrival | EventKind::Cancelled => {}
        }
    }

    /// Unset the clock for `kind`.
    pub const fn clear(&mut self, kind: EventKind) {
        self.set(kind, f64::INFINITY);
    }

    /// Record a shortfall: digestion at the crossing, plus escape if drawn.
    pub const fn apply_shortfall(&mut self, shortfall: &Shortfall) {
        self.digestion = shortfall.digestion;
        if let Some(escape) = shortfall.escape {
            self.escape = escape;
        }
    }

    /// Unset the phase clock for `kind` and remember its deadline.
    pub const fn suspend(&mut self, kind: EventKind, deadline: f64) {
        self.clear(kind);
        self.suspended = Some((deadline, kind));
    }

    /// Drop a pending shortfall and put the suspended phase clock back.
    /// Returns the restored milestone, if one was suspended.
    pub const fn resume(&mut self) -> Option<(f64, EventKind)> {
        let Some((deadline, kind)) = self.suspended else {
            return None;
        };
        self.escape = f64::INFINITY;
        self.digestion = f64::INFINITY;
        self.suspended = None;
        self.set(kind, deadline);
        Some((deadline, kind))
    }
}

impl Default for LifeClocks {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Parentage of a symbiont.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lineage {
    /// Parent, or `None` for pool arrivals.
    pub parent: Option<AgentId>,
    /// The pool arrival at the root of this symbiont's line.
    pub agent_zero: AgentId,
    /// How the symbiont entered the sponge.
    pub how_arrived: HowArrived,
}

/// Cells visited and phase durations drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    /// Host cells in visiting order.
    pub cells: Vec<CellCoord>,
    /// Time each cell was entered.
    pub visit_times: Vec<f64>,
    /// Demand of each visited cell.
    pub cell_demands: Vec<f64>,
    /// Every growth phase length drawn.
    pub g0_durations: Vec<f64>,
    /// Every division phase length drawn.
    pub g1sg2m_durations: Vec<f64>,
}

/// A symbiotic alga living in, or passing through, the sponge.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbiont {
    id: AgentId,
    clade: CladeId,
    cell: Option<CellCoord>,
    cell_demand: f64,
    production_rate: f64,
    mitotic_cost_rate: f64,
    bank: f64,
    bank_updated_at: f64,
    last_bank_change: f64,
    lineage: Lineage,
    arrival_time: f64,
    bank_on_arrival: f64,
    clocks: LifeClocks,
    prev_event_time: f64,
    prev_event_kind: EventKind,
    history: History,
    divisions: u32,
}

/// Outcome of projecting a symbiont to a phase deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MilestoneCheck {
    /// The bank lasts; the phase clock was set.
    Reached,
    /// The bank runs out first; digestion (and maybe escape) were set.
    Shortfall(Shortfall),
}

impl Symbiont {
    /// Create a symbiont arriving from the pool into `site` at `time`.
    ///
    /// Mitotic cost and production rates are fuzzed around the clade means,
    /// production adjusted for the host row. The starting bank is a gamma
    /// draw capped at `max_initial_surplus`.
    pub fn from_pool(
        id: AgentId,
        clade_id: CladeId,
        clade: &CladeConfig,
        site: Site,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<Self, AgentError> {
        let mitotic_cost_rate =
            streams.fuzz(clade.mitotic_cost_rate, clade.mcr_fuzz, Stream::MitoticCostRate)?;
        let base_rate =
            clade.row_adjusted_rate(clade.photosynthetic_production_rate, site.coord.row, site.rows);
        let production_rate = streams.fuzz(base_rate, clade.ppr_fuzz, Stream::Photoprod)?;
        let max_surplus = clade.max_initial_surplus;
        let bank = streams.gamma_until(
            clade.initial_surplus_shape,
            clade.initial_surplus_scale,
            Stream::Photosynthate,
            |x| x <= max_surplus,
        )?;

        let mut symbiont = Self::blank(
            id,
            clade_id,
            Lineage {
                parent: None,
                agent_zero: id,
                how_arrived: HowArrived::Pool,
            },
            time,
        );
        symbiont.production_rate = production_rate;
        symbiont.mitotic_cost_rate = mitotic_cost_rate;
        symbiont.bank = bank;
        symbiont.bank_on_arrival = bank;
        symbiont.enter_cell(site.coord, site.demand, time);

        debug!(
            agent = %id,
            clade = %clade_id,
            cell = %site.coord,
            bank,
            production_rate,
            mitotic_cost_rate,
            "Symbiont arrived from pool"
        );
        Ok(symbiont)
    }

    /// Create the child of `parent` at `time`.
    ///
    /// The parent's committed bank is halved; the half passes through a
    /// mutation and becomes the child's bank, and the parent keeps the
    /// rest. The mitotic cost rate mutates from the parent's. A hosted child
    /// (`site` is `Some`) also gets a production rate row-adjusted for its
    /// own cell and mutated; an unhosted child keeps the parent's rate.
    /// The parent's bank must have been committed to `time`.
    pub fn child_of(
        parent: &mut Self,
        id: AgentId,
        clade: &CladeConfig,
        site: Option<Site>,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<Self, AgentError> {
        let mutation = &clade.mutation;

        let mitotic_cost_rate = divfuzz(
            parent.mitotic_cost_rate,
            mutation,
            Stream::MitoticCostRateMutation,
            streams,
        )?
        .apply_to_cost(parent.mitotic_cost_rate);

        let half = parent.bank / 2.0;
        let child_bank = divfuzz(half, mutation, Stream::PhotosynthateMutation, streams)?
            .apply_to_yield(half);
        parent.last_bank_change = -child_bank;
        parent.bank -= child_bank;

        let production_rate = match site {
            Some(site) => {
                let rate =
                    clade.row_adjusted_rate(parent.production_rate, site.coord.row, site.rows);
                divfuzz(rate, mutation, Stream::PhotoprodMutation, streams)?.apply_to_yield(rate)
            }
            None => parent.production_rate,
        };

        let mut child = Self::blank(
            id,
            parent.clade,
            Lineage {
                parent: Some(parent.id),
                agent_zero: parent.lineage.agent_zero,
                how_arrived: HowArrived::Division,
            },
            time,
        );
        child.production_rate = production_rate;
        child.mitotic_cost_rate = mitotic_cost_rate;
        child.bank = child_bank;
        child.bank_on_arrival = child_bank;
        if let Some(site) = site {
            child.enter_cell(site.coord, site.demand, time);
        }
        Ok(child)
    }

    fn blank(id: AgentId, clade: CladeId, lineage: Lineage, time: f64) -> Self {
        Self {
            id,
            clade,
            cell: None,
            cell_demand: 0.0,
            production_rate: 0.0,
            mitotic_cost_rate: 0.0,
            bank: 0.0,
            bank_updated_at: time,
            last_bank_change: 0.0,
            lineage,
            arrival_time: time,
            bank_on_arrival: 0.0,
            clocks: LifeClocks::UNSET,
            prev_event_time: time,
            prev_event_kind: EventKind::Arrival,
            history: History::default(),
            divisions: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Clade.
    pub const fn clade(&self) -> CladeId {
        self.clade
    }

    /// Host cell, if any.
    pub const fn cell(&self) -> Option<CellCoord> {
        self.cell
    }

    /// Demand of the current host cell (`0.0` when unhosted).
    pub const fn cell_demand(&self) -> f64 {
        self.cell_demand
    }

    /// Photosynthate produced per day.
    pub const fn production_rate(&self) -> f64 {
        self.production_rate
    }

    /// Photosynthate spent per day in G1SG2M.
    pub const fn mitotic_cost_rate(&self) -> f64 {
        self.mitotic_cost_rate
    }

    /// Bank as of the last commit.
    pub const fn bank(&self) -> f64 {
        self.bank
    }

    /// Time of the last commit.
    pub const fn bank_updated_at(&self) -> f64 {
        self.bank_updated_at
    }

    /// Bank change made by the last commit or division.
    pub const fn last_bank_change(&self) -> f64 {
        self.last_bank_change
    }

    /// Parentage.
    pub const fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// Time the symbiont entered the sponge.
    pub const fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    /// Bank when the symbiont entered the sponge.
    pub const fn bank_on_arrival(&self) -> f64 {
        self.bank_on_arrival
    }

    /// Life-cycle clocks.
    pub const fn clocks(&self) -> &LifeClocks {
        &self.clocks
    }

    /// Time of the last event seen.
    pub const fn prev_event_time(&self) -> f64 {
        self.prev_event_time
    }

    /// Kind of the last event seen.
    pub const fn prev_event_kind(&self) -> EventKind {
        self.prev_event_kind
    }

    /// Visit and phase history.
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Number of divisions completed.
    pub const fn divisions(&self) -> u32 {
        self.divisions
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        Phase::from_prev_kind(self.prev_event_kind)
    }

    /// Earliest pending milestone.
    pub fn next_milestone(&self) -> Option<(f64, EventKind)> {
        self.clocks.next()
    }

    // -----------------------------------------------------------------------
    // State changes
    // -----------------------------------------------------------------------

    /// Note that the symbiont has seen an event.
    pub const fn record_event(&mut self, time: f64, kind: EventKind) {
        self.prev_event_time = time;
        self.prev_event_kind = kind;
    }

    /// Count a completed division.
    pub const fn record_division(&mut self) {
        self.divisions = self.divisions.saturating_add(1);
    }

    /// Move into `coord` at `time`, appending to the visit history.
    pub fn enter_cell(&mut self, coord: CellCoord, demand: f64, time: f64) {
        self.cell = Some(coord);
        self.cell_demand = demand;
        self.history.cells.push(coord);
        self.history.visit_times.push(time);
        self.history.cell_demands.push(demand);
    }

    /// Leave the current host cell, returning it.
    pub const fn leave_cell(&mut self) -> Option<CellCoord> {
        self.cell_demand = 0.0;
        self.cell.take()
    }

    /// Empty the bank (digestion and escape take everything).
    pub const fn zero_bank(&mut self) {
        self.last_bank_change = -self.bank;
        self.bank = 0.0;
    }

    /// Unset the clock for `kind`.
    pub const fn clear_clock(&mut self, kind: EventKind) {
        self.clocks.clear(kind);
    }

    // -----------------------------------------------------------------------
    // Photosynthate accounting
    // -----------------------------------------------------------------------

    /// Current economic state with `occupants` sharing the cell.
    pub const fn budget(&self, occupants: u32) -> Budget {
        Budget {
            bank: self.bank,
            production_rate: self.production_rate,
            mitotic_cost_rate: self.mitotic_cost_rate,
            cell_demand: self.cell_demand,
            occupants,
            phase: self.phase(),
        }
    }

    /// Extrapolate the bank from the last commit to `time`.
    pub fn project_to(&self, time: f64, occupants: u32) -> Projection {
        projector::project(&self.budget(occupants), self.bank_updated_at, time)
    }

    /// Materialize the bank at `time` with `occupants` sharing the cell.
    ///
    /// Rounding below zero within [`BANK_TOLERANCE`] is clamped to zero.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NegativeBank`] if the bank would go further
    /// below zero, which means a shortfall was missed.
    pub fn commit(&mut self, time: f64, occupants: u32) -> Result<(), AgentError> {
        let projection = self.project_to(time, occupants);
        let mut bank = projection.bank_end;
        if bank < 0.0 {
            if bank < -BANK_TOLERANCE {
                return Err(AgentError::NegativeBank {
                    agent: self.id,
                    bank,
                    time,
                });
            }
            bank = 0.0;
        }
        self.last_bank_change = bank - self.bank;
        self.bank = bank;
        self.bank_updated_at = time;
        Ok(())
    }

    /// Draw the residence time and set the denouement clock.
    pub fn draw_denouement(
        &mut self,
        clade: &CladeConfig,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<f64, AgentError> {
        let residence = streams.fuzz(
            clade.avg_residence_time,
            clade.residence_fuzz,
            Stream::TimeDenouement,
        )?;
        let denouement = time + residence;
        self.clocks.denouement = denouement;
        Ok(denouement)
    }

    /// Draw a growth phase length and return its deadline.
    pub fn draw_end_g0(
        &mut self,
        clade: &CladeConfig,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<f64, AgentError> {
        let duration = streams.fuzz(clade.g0_length, clade.g0_fuzz, Stream::EndG0)?;
        self.history.g0_durations.push(duration);
        Ok(time + duration)
    }

    /// Draw a division phase length and return its deadline.
    pub fn draw_end_g1sg2m(
        &mut self,
        clade: &CladeConfig,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<f64, AgentError> {
        let duration = streams.fuzz(clade.g1sg2m_length, clade.g1sg2m_fuzz, Stream::EndG1sg2m)?;
        self.history.g1sg2m_durations.push(duration);
        Ok(time + duration)
    }

    /// Start residence at `time`: draw the denouement and the first growth
    /// phase, and return the end-G0 deadline for [`Self::schedule_milestone`].
    pub fn begin_residence(
        &mut self,
        clade: &CladeConfig,
        time: f64,
        streams: &mut RandomStreams,
    ) -> Result<f64, AgentError> {
        self.draw_denouement(clade, time, streams)?;
        self.draw_end_g0(clade, time, streams)
    }

    /// Project to a phase `deadline` and set the clock for `kind` if the
    /// bank lasts. Otherwise set digestion, and escape if the coin says so,
    /// leaving the phase clock unset.
    pub fn schedule_milestone(
        &mut self,
        kind: EventKind,
        deadline: f64,
        occupants: u32,
        clade: &CladeConfig,
        streams: &mut RandomStreams,
    ) -> Result<MilestoneCheck, AgentError> {
        let projection = self.project_to(deadline, occupants);
        match projection.crossing {
            None => {
                self.clocks.set(kind, deadline);
                self.clocks.suspended = None;
                Ok(MilestoneCheck::Reached)
            }
            Some(crossing) => {
                self.clocks.suspend(kind, deadline);
                let shortfall = projector::resolve_shortfall(
                    crossing,
                    self.bank_updated_at,
                    self.phase(),
                    clade,
                    streams,
                )?;
                self.clocks.apply_shortfall(&shortfall);
                debug!(
                    agent = %self.id,
                    milestone = %kind,
                    deadline,
                    crossing,
                    escape = ?shortfall.escape,
                    "Photosynthate runs out before milestone"
                );
                Ok(MilestoneCheck::Shortfall(shortfall))
            }
        }
    }

    /// Re-check the next milestone after the occupant count changed.
    ///
    /// A phase or denouement milestone that can no longer be reached gets a
    /// shortfall (the phase clock is suspended; denouement stays). A pending
    /// digestion or escape is cancelled when the bank now lasts to the
    /// suspended phase deadline, and otherwise only ever moved earlier.
    /// Returns whether any clock changed.
    pub fn reproject(
        &mut self,
        occupants: u32,
        clade: &CladeConfig,
        streams: &mut RandomStreams,
    ) -> Result<bool, AgentError> {
        let Some((time, kind)) = self.next_milestone() else {
            return Ok(false);
        };
        if matches!(kind, EventKind::Escape | EventKind::Digestion) && self.relieve(occupants) {
            return Ok(true);
        }
        let Some(crossing) = self.project_to(time, occupants).crossing else {
            return Ok(false);
        };

        match kind {
            EventKind::EndG0 | EventKind::EndG1sg2m | EventKind::Denouement => {
                if kind != EventKind::Denouement {
                    self.clocks.suspend(kind, time);
                }
                let shortfall = projector::resolve_shortfall(
                    crossing,
                    self.bank_updated_at,
                    self.phase(),
                    clade,
                    streams,
                )?;
                self.clocks.apply_shortfall(&shortfall);
                Ok(true)
            }
            EventKind::Escape | EventKind::Digestion => {
                if crossing >= time {
                    return Ok(false);
                }
                self.clocks.set(kind, crossing);
                self.clocks.digestion = self.clocks.digestion.min(crossing);
                Ok(true)
            }
            EventKind::Arrival | EventKind::Cancelled => Ok(false),
        }
    }

    /// Cancel a pending shortfall if the bank now lasts to the suspended
    /// phase deadline with `occupants` sharing the cell.
    fn relieve(&mut self, occupants: u32) -> bool {
        let Some((deadline, _)) = self.clocks.suspended else {
            return false;
        };
        if self.project_to(deadline, occupants).crossing.is_some() {
            return false;
        }
        let restored = self.clocks.resume();
        debug!(
            agent = %self.id,
            occupants,
            restored = ?restored,
            "Shortfall lifted by occupancy change"
        );
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::MutationConfig;

    const EPS: f64 = 1e-9;

    fn site(row: u32) -> Site {
        Site {
            coord: CellCoord::new(0, row, 0),
            demand: 1.0,
            rows: 10,
        }
    }

    fn steady_clade() -> CladeConfig {
        CladeConfig {
            mcr_fuzz: 0.0,
            ppr_fuzz: 0.0,
            g0_fuzz: 0.0,
            g1sg2m_fuzz: 0.0,
            residence_fuzz: 0.0,
            photosynthetic_reduction: 1.0,
            mutation: MutationConfig::disabled(),
            ..CladeConfig::default()
        }
    }

    fn pool_symbiont(streams: &mut RandomStreams) -> Symbiont {
        Symbiont::from_pool(
            AgentId(1),
            CladeId(0),
            &steady_clade(),
            site(0),
            0.0,
            streams,
        )
        .unwrap()
    }

    #[test]
    fn pool_arrival_starts_in_g0_with_history() {
        let mut streams = RandomStreams::new(1);
        let s = pool_symbiont(&mut streams);
        assert_eq!(s.phase(), Phase::G0);
        assert_eq!(s.lineage().how_arrived, HowArrived::Pool);
        assert_eq!(s.lineage().agent_zero, AgentId(1));
        assert_eq!(s.history().cells, vec![CellCoord::new(0, 0, 0)]);
        assert!((s.production_rate() - 1.15).abs() < EPS);
        assert!((s.mitotic_cost_rate() - 24.0).abs() < EPS);
        assert!(s.bank() >= 0.0 && s.bank() <= 5.0);
        assert_eq!(s.bank_on_arrival(), s.bank());
        assert!(s.next_milestone().is_none());
    }

    #[test]
    fn clock_priority_breaks_ties_in_fixed_order() {
        let mut clocks = LifeClocks::UNSET;
        clocks.denouement = 5.0;
        clocks.digestion = 5.0;
        clocks.escape = 5.0;
        assert_eq!(clocks.next(), Some((5.0, EventKind::Escape)));
        clocks.end_g0 = 5.0;
        assert_eq!(clocks.next(), Some((5.0, EventKind::EndG0)));
        clocks.denouement = 1.0;
        assert_eq!(clocks.next(), Some((1.0, EventKind::Denouement)));
        assert_eq!(LifeClocks::UNSET.next(), None);
    }

    #[test]
    fn phase_follows_last_event() {
        let mut streams = RandomStreams::new(2);
        let mut s = pool_symbiont(&mut streams);
        s.record_event(1.0, EventKind::EndG0);
        assert_eq!(s.phase(), Phase::G1sg2m);
        s.record_event(1.1, EventKind::EndG1sg2m);
        assert_eq!(s.phase(), Phase::G0);
    }

    #[test]
    fn begin_residence_reaches_end_g0_with_healthy_budget() {
        let mut streams = RandomStreams::new(3);
        let clade = steady_clade();
        let mut s = pool_symbiont(&mut streams);
        let deadline = s.begin_residence(&clade, 0.0, &mut streams).unwrap();
        assert!((deadline - 1.0).abs() < EPS);
        let check = s
            .schedule_milestone(EventKind::EndG0, deadline, 1, &clade, &mut streams)
            .unwrap();
        assert_eq!(check, MilestoneCheck::Reached);
        assert_eq!(s.next_milestone(), Some((deadline, EventKind::EndG0)));
        assert!((s.clocks().denouement - 30.0).abs() < EPS);
        assert_eq!(s.history().g0_durations.len(), 1);
    }

    #[test]
    fn shortfall_leaves_phase_clock_unset() {
        let mut streams = RandomStreams::new(4);
        let clade = CladeConfig {
            g1sg2m_escape_prob: 0.0,
            ..steady_clade()
        };
        let mut s = pool_symbiont(&mut streams);
        s.record_event(0.0, EventKind::EndG0);
        // 24/day of mitotic cost drains any starting bank within a day.
        let check = s
            .schedule_milestone(EventKind::EndG1sg2m, 1.0, 1, &clade, &mut streams)
            .unwrap();
        assert!(matches!(check, MilestoneCheck::Shortfall(_)));
        assert!(s.clocks().end_g1sg2m.is_infinite());
        let (time, kind) = s.next_milestone().unwrap();
        assert_eq!(kind, EventKind::Digestion);
        assert!(time < 1.0);
    }

    #[test]
    fn commit_materializes_linear_bank() {
        let mut streams = RandomStreams::new(5);
        let mut s = pool_symbiont(&mut streams);
        let start = s.bank();
        s.commit(2.0, 1).unwrap();
        assert!((s.bank() - (start + 2.0 * (1.15 - 1.0))).abs() < EPS);
        assert_eq!(s.bank_updated_at(), 2.0);
        assert!((s.last_bank_change() - 0.3).abs() < EPS);
    }

    #[test]
    fn commit_past_crossing_is_an_error() {
        let mut streams = RandomStreams::new(6);
        let mut s = pool_symbiont(&mut streams);
        s.record_event(0.0, EventKind::EndG0);
        let r = s.commit(10.0, 1);
        assert!(matches!(r, Err(AgentError::NegativeBank { .. })));
    }

    #[test]
    fn division_conserves_bank_without_mutation() {
        let mut streams = RandomStreams::new(7);
        let clade = steady_clade();
        let mut parent = pool_symbiont(&mut streams);
        let before = parent.bank();
        let child = Symbiont::child_of(
            &mut parent,
            AgentId(2),
            &clade,
            Some(site(0)),
            0.0,
            &mut streams,
        )
        .unwrap();
        assert!((parent.bank() + child.bank() - before).abs() < EPS);
        assert!((child.bank() - before / 2.0).abs() < EPS);
        assert_eq!(child.lineage().parent, Some(AgentId(1)));
        assert_eq!(child.lineage().agent_zero, AgentId(1));
        assert_eq!(child.lineage().how_arrived, HowArrived::Division);
        assert_eq!(child.mitotic_cost_rate(), parent.mitotic_cost_rate());
        assert_eq!(child.phase(), Phase::G0);
    }

    #[test]
    fn division_conserves_bank_under_mutation() {
        let mut streams = RandomStreams::new(8);
        let clade = CladeConfig {
            mutation: MutationConfig {
                phenotypic_mutation_prob: 1.0,
                ..MutationConfig::default()
            },
            ..steady_clade()
        };
        for n in 0..50 {
            let mut parent = pool_symbiont(&mut streams);
            let before = parent.bank();
            let child = Symbiont::child_of(
                &mut parent,
                AgentId(100 + n),
                &clade,
                Some(site(3)),
                0.0,
                &mut streams,
            )
            .unwrap();
            assert!((parent.bank() + child.bank() - before).abs() < EPS);
            // Beneficial mutation adds at most 10% of the half.
            assert!(child.bank() <= before * 0.55 + EPS);
            assert!(parent.bank() >= -EPS);
        }
    }

    #[test]
    fn unhosted_child_keeps_parent_rate_and_has_no_history() {
        let mut streams = RandomStreams::new(9);
        let clade = steady_clade();
        let mut parent = pool_symbiont(&mut streams);
        let child =
            Symbiont::child_of(&mut parent, AgentId(2), &clade, None, 0.5, &mut streams).unwrap();
        assert_eq!(child.cell(), None);
        assert_eq!(child.production_rate(), parent.production_rate());
        assert!(child.history().cells.is_empty());
        assert!(child.history().g0_durations.is_empty());
        assert!(child.next_milestone().is_none());
    }

    #[test]
    fn crowding_turns_end_g0_into_shortfall() {
        let mut streams = RandomStreams::new(10);
        let clade = CladeConfig {
            g0_escape_prob: 0.0,
            ..steady_clade()
        };
        let mut s = pool_symbiont(&mut streams);
        s.bank = 2.0;
        s.clocks.end_g0 = 1000.0;
        // Alone, production 1.15 covers demand 1.0; with a co-occupant of a
        // heavy cell it does not.
        s.cell_demand = 10.0;
        assert!(s.reproject(2, &clade, &mut streams).unwrap());
        assert!(s.clocks().end_g0.is_infinite());
        assert_eq!(s.next_milestone().unwrap().1, EventKind::Digestion);
    }

    #[test]
    fn reprojection_only_tightens_digestion() {
        let mut streams = RandomStreams::new(11);
        let clade = steady_clade();
        let mut s = pool_symbiont(&mut streams);
        s.bank = 2.0;
        s.cell_demand = 10.0;
        s.clocks.digestion = 0.01;
        // Crossing lies beyond the pending digestion: nothing moves.
        assert!(!s.reproject(1, &clade, &mut streams).unwrap());
        assert_eq!(s.clocks().digestion, 0.01);

        s.clocks.digestion = 1000.0;
        assert!(s.reproject(1, &clade, &mut streams).unwrap());
        let (time, kind) = s.next_milestone().unwrap();
        assert_eq!(kind, EventKind::Digestion);
        assert!(time < 1000.0);
    }

    #[test]
    fn sharing_the_cell_lifts_a_shortfall() {
        let mut streams = RandomStreams::new(12);
        let clade = CladeConfig {
            g0_escape_prob: 1.0,
            ..steady_clade()
        };
        let mut s = pool_symbiont(&mut streams);
        s.bank = 0.5;
        s.cell_demand = 2.0;
        // Alone: 1.15 - 2.0 drains the bank well before day 10.
        let check = s
            .schedule_milestone(EventKind::EndG0, 10.0, 1, &clade, &mut streams)
            .unwrap();
        assert!(matches!(check, MilestoneCheck::Shortfall(_)));
        assert_eq!(s.clocks().suspended, Some((10.0, EventKind::EndG0)));
        assert_eq!(s.next_milestone().unwrap().1, EventKind::Escape);

        // Three sharers: 1.15 - 2.0 / 3 keeps the bank positive.
        assert!(s.reproject(3, &clade, &mut streams).unwrap());
        assert_eq!(s.next_milestone(), Some((10.0, EventKind::EndG0)));
        assert!(s.clocks().escape.is_infinite());
        assert!(s.clocks().digestion.is_infinite());
        assert_eq!(s.clocks().suspended, None);

        // Back to one occupant: the shortfall returns and suspends again.
        assert!(s.reproject(1, &clade, &mut streams).unwrap());
        assert!(s.clocks().end_g0.is_infinite());
        assert_eq!(s.clocks().suspended, Some((10.0, EventKind::EndG0)));
    }

    #[test]
    fn crowding_that_still_starves_only_tightens() {
        let mut streams = RandomStreams::new(13);
        let clade = CladeConfig {
            g0_escape_prob: 0.0,
            ..steady_clade()
        };
        let mut s = pool_symbiont(&mut streams);
        s.bank = 0.5;
        s.cell_demand = 6.0;
        s.schedule_milestone(EventKind::EndG0, 10.0, 1, &clade, &mut streams)
            .unwrap();
        let (before, _) = s.next_milestone().unwrap();
        // Two sharers still leave 1.15 - 3.0 per day: digestion stays.
        assert!(!s.reproject(2, &clade, &mut streams).unwrap());
        assert_eq!(s.next_milestone(), Some((before, EventKind::Digestion)));
        assert_eq!(s.clocks().suspended, Some((10.0, EventKind::EndG0)));
    }
}
