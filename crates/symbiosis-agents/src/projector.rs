//! Photosynthate feasibility projection.
//!
//! A symbiont's bank changes linearly between events: it gains its
//! production rate, pays an equal share of its host cell's demand, and pays
//! the mitotic cost while dividing. [`project`] extrapolates the bank over
//! an interval and reports the time it would cross zero. When it does,
//! [`resolve_shortfall`] flips the clade's escape coin to decide how the
//! symbiont leaves.
//!
//! Projection never draws random numbers. Only shortfall resolution does.

use symbiosis_types::{Phase, Stream};
use symbiosis_world::RandomStreams;

use crate::config::CladeConfig;
use crate::error::AgentError;

/// Committed banks may dip this far below zero from rounding.
pub const BANK_TOLERANCE: f64 = 1e-9;

/// Economic state needed to extrapolate a bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    /// Bank at the start of the interval.
    pub bank: f64,
    /// Photosynthate produced per day.
    pub production_rate: f64,
    /// Photosynthate spent per day in G1SG2M.
    pub mitotic_cost_rate: f64,
    /// Total demand of the host cell per day.
    pub cell_demand: f64,
    /// Occupants sharing the demand, including this symbiont.
    pub occupants: u32,
    /// Phase during the interval.
    pub phase: Phase,
}

/// Result of extrapolating a [`Budget`] over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Bank at the end of the interval.
    pub bank_end: f64,
    /// Photosynthate produced.
    pub produced: f64,
    /// Share of cell demand paid.
    pub demanded: f64,
    /// Mitotic cost paid.
    pub expended: f64,
    /// Time the bank reaches zero, if it ends negative.
    pub crossing: Option<f64>,
}

impl Projection {
    /// Whether the bank runs out within the interval.
    pub const fn is_shortfall(&self) -> bool {
        self.crossing.is_some()
    }
}

/// Extrapolate `budget` from `t0` to `t1`.
///
/// The crossing time is interpolated linearly and clamped into
/// `[t0, t1]`. An empty interval or an already-empty bank crosses at `t0`.
pub fn project(budget: &Budget, t0: f64, t1: f64) -> Projection {
    let dt = t1 - t0;
    let sharers = f64::from(budget.occupants.max(1));

    let produced = budget.production_rate * dt;
    let demanded = dt * budget.cell_demand / sharers;
    let expended = match budget.phase {
        Phase::G0 => 0.0,
        Phase::G1sg2m => dt * budget.mitotic_cost_rate,
    };
    let bank_end = budget.bank + produced - demanded - expended;

    let crossing = (bank_end < 0.0).then(|| {
        if dt <= 0.0 || budget.bank <= 0.0 {
            return t0;
        }
        let slope = (bank_end - budget.bank) / dt;
        (t0 - budget.bank / slope).clamp(t0, t1)
    });

    Projection {
        bank_end,
        produced,
        demanded,
        expended,
        crossing,
    }
}

/// How a symbiont that runs out of photosynthate will leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortfall {
    /// Digestion time: always the crossing.
    pub digestion: f64,
    /// Escape time, drawn before the crossing, if the escape coin came up.
    pub escape: Option<f64>,
}

/// Decide between digestion and escape for a crossing at `crossing`.
///
/// # Errors
///
/// Returns [`AgentError::Stream`] if a draw fails.
pub fn resolve_shortfall(
    crossing: f64,
    t0: f64,
    phase: Phase,
    clade: &CladeConfig,
    streams: &mut RandomStreams,
) -> Result<Shortfall, AgentError> {
    let (coin, timing, escape_prob) = match phase {
        Phase::G0 => (
            Stream::DigestionVsEscapeG0,
            Stream::TimeG0Escape,
            clade.g0_escape_prob,
        ),
        Phase::G1sg2m => (
            Stream::DigestionVsEscapeG1sg2m,
            Stream::TimeG1sg2mEscape,
            clade.g1sg2m_escape_prob,
        ),
    };

    let escape = if streams.random(coin)? < escape_prob {
        Some(streams.uniform(t0, crossing.max(t0), timing)?)
    } else {
        None
    };

    Ok(Shortfall {
        digestion: crossing,
        escape,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn budget(bank: f64, production_rate: f64, cell_demand: f64, occupants: u32) -> Budget {
        Budget {
            bank,
            production_rate,
            mitotic_cost_rate: 24.0,
            cell_demand,
            occupants,
            phase: Phase::G0,
        }
    }

    #[test]
    fn balanced_budget_keeps_bank() {
        let p = project(&budget(5.0, 1.0, 1.0, 1), 0.0, 10.0);
        assert!((p.bank_end - 5.0).abs() < EPS);
        assert!(!p.is_shortfall());
    }

    #[test]
    fn deficit_crosses_at_interpolated_time() {
        // Net -0.5/day from a bank of 2.0 runs out after four days.
        let p = project(&budget(2.0, 0.5, 1.0, 1), 3.0, 13.0);
        assert!((p.bank_end + 3.0).abs() < EPS);
        assert!((p.crossing.unwrap() - 7.0).abs() < EPS);
    }

    #[test]
    fn demand_is_shared_between_occupants() {
        let p = project(&budget(5.0, 0.0, 2.0, 2), 0.0, 1.0);
        assert!((p.demanded - 1.0).abs() < EPS);
        assert!((p.bank_end - 4.0).abs() < EPS);
    }

    #[test]
    fn mitotic_cost_only_in_division_phase() {
        let mut b = budget(5.0, 1.0, 1.0, 1);
        let g0 = project(&b, 0.0, 0.1);
        assert_eq!(g0.expended, 0.0);
        b.phase = Phase::G1sg2m;
        let g1 = project(&b, 0.0, 0.1);
        assert!((g1.expended - 2.4).abs() < EPS);
        assert!(g1.bank_end < g0.bank_end);
    }

    #[test]
    fn fewer_sharers_never_raise_the_bank() {
        let mut last = f64::NEG_INFINITY;
        for n in 1..=5 {
            let p = project(&budget(1.0, 0.8, 3.0, n), 0.0, 2.0);
            assert!(p.bank_end >= last);
            last = p.bank_end;
        }
    }

    #[test]
    fn longer_interval_never_raises_a_declining_bank() {
        let b = budget(3.0, 0.5, 1.0, 1);
        let mut last = f64::INFINITY;
        for step in 0..20 {
            let p = project(&b, 0.0, f64::from(step) * 0.5);
            assert!(p.bank_end <= last);
            last = p.bank_end;
        }
    }

    #[test]
    fn empty_interval_with_negative_bank_crosses_immediately() {
        let p = project(&budget(-1.0, 0.0, 1.0, 1), 2.0, 2.0);
        assert_eq!(p.crossing, Some(2.0));
    }

    #[test]
    fn certain_escape_happens_before_crossing() {
        let mut streams = RandomStreams::new(17);
        let clade = CladeConfig {
            g0_escape_prob: 1.0,
            ..CladeConfig::default()
        };
        for _ in 0..50 {
            let s = resolve_shortfall(4.0, 1.0, Phase::G0, &clade, &mut streams).unwrap();
            assert_eq!(s.digestion, 4.0);
            let escape = s.escape.unwrap();
            assert!((1.0..4.0).contains(&escape));
        }
    }

    #[test]
    fn impossible_escape_means_digestion() {
        let mut streams = RandomStreams::new(17);
        let clade = CladeConfig {
            g1sg2m_escape_prob: 0.0,
            ..CladeConfig::default()
        };
        let s = resolve_shortfall(4.0, 1.0, Phase::G1sg2m, &clade, &mut streams).unwrap();
        assert_eq!(s.escape, None);
        assert_eq!(s.digestion, 4.0);
    }
}
