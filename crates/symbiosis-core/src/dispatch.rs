//! Event-to-handler dispatch table.
//!
//! Every popped event is routed by the owning symbiont's phase (derived from
//! its last event) and the event kind. Arrivals have no owner. Any other
//! combination means the calendar and the symbiont disagree, and the run
//! stops.

use symbiosis_types::{EventKind, Phase};

use crate::simulation::SimulationError;

/// The handler an event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// End of the growth phase.
    EndOfG0,
    /// End of the division phase.
    Division,
    /// Forced removal after the bank ran out.
    Digestion,
    /// Escape ahead of digestion.
    Escape,
    /// Voluntary exit at the end of residence.
    Denouement,
    /// Pool arrival.
    Arrival,
}

/// Route an event of `kind` owned by a symbiont in `phase` (`None` for
/// events without an owner).
///
/// # Errors
///
/// Returns [`SimulationError::PhaseMismatch`] for combinations no handler
/// accepts, including every cancelled event.
pub const fn dispatch(phase: Option<Phase>, kind: EventKind) -> Result<Handler, SimulationError> {
    match (phase, kind) {
        (Some(Phase::G0), EventKind::EndG0) => Ok(Handler::EndOfG0),
        (Some(Phase::G1sg2m), EventKind::EndG1sg2m) => Ok(Handler::Division),
        (Some(_), EventKind::Digestion) => Ok(Handler::Digestion),
        (Some(_), EventKind::Escape) => Ok(Handler::Escape),
        (Some(_), EventKind::Denouement) => Ok(Handler::Denouement),
        (None, EventKind::Arrival) => Ok(Handler::Arrival),
        (
            Some(Phase::G0),
            EventKind::EndG1sg2m | EventKind::Arrival | EventKind::Cancelled,
        )
        | (
            Some(Phase::G1sg2m),
            EventKind::EndG0 | EventKind::Arrival | EventKind::Cancelled,
        )
        | (
            None,
            EventKind::EndG0
            | EventKind::EndG1sg2m
            | EventKind::Digestion
            | EventKind::Escape
            | EventKind::Denouement
            | EventKind::Cancelled,
        ) => Err(SimulationError::PhaseMismatch { phase, kind }),
    }
}
