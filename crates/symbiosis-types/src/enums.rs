//! Enumeration types for the Symbiosis simulation.
//!
//! Event kinds, random stream identifiers, grid topology and placement
//! options, and the outcome/exit vocabularies written to telemetry.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Kind of a calendar event.
///
/// Declaration order is the tie-break priority among events scheduled at
/// the same time: escape first, the cancellation sentinel last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The symbiont leaves its host cell before being digested.
    Escape,
    /// The host cell digests a symbiont that ran out of photosynthate.
    Digestion,
    /// End of the growth phase; the division phase begins.
    EndG0,
    /// End of the division phase; the symbiont divides.
    EndG1sg2m,
    /// The residence clock expired and the symbiont leaves voluntarily.
    Denouement,
    /// A symbiont arrives from the external pool.
    Arrival,
    /// A lazily cancelled event still resident in the calendar heap.
    Cancelled,
}

impl EventKind {
    /// Priority among simultaneous events (lower runs first).
    pub const fn rank(self) -> u8 {
        match self {
            Self::Escape => 0,
            Self::Digestion => 1,
            Self::EndG0 => 2,
            Self::EndG1sg2m => 3,
            Self::Denouement => 4,
            Self::Arrival => 5,
            Self::Cancelled => 6,
        }
    }

    /// Whether this kind removes the symbiont from the simulation.
    pub const fn is_exit(self) -> bool {
        matches!(self, Self::Escape | Self::Digestion | Self::Denouement)
    }

    /// Whether this kind is a resource shortfall milestone.
    pub const fn is_shortfall(self) -> bool {
        matches!(self, Self::Escape | Self::Digestion)
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Escape => "ESCAPE",
            Self::Digestion => "DIGESTION",
            Self::EndG0 => "END_G0",
            Self::EndG1sg2m => "END_G1SG2M",
            Self::Denouement => "DENOUEMENT",
            Self::Arrival => "ARRIVAL",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Random streams
// ---------------------------------------------------------------------------

/// Stochastic component of the model, each drawing from its own stream.
///
/// Keeping the components on separate streams means that a change in how
/// often one component draws does not shift the variates seen by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stream {
    /// Reserved for mitotic class assignment.
    MitoticClass,
    /// Length of the growth phase.
    EndG0,
    /// Length of the division phase.
    EndG1sg2m,
    /// Escape time within a G0 shortfall window.
    TimeG0Escape,
    /// Escape time within a G1SG2M shortfall window.
    TimeG1sg2mEscape,
    /// Residence time until denouement.
    TimeDenouement,
    /// Shuffling of neighbors during the open cell search.
    CheckForOpenCell,
    /// Digestion versus escape coin in G0.
    DigestionVsEscapeG0,
    /// Digestion versus escape coin in G1SG2M.
    DigestionVsEscapeG1sg2m,
    /// Parent versus child eviction coin at division.
    Eviction,
    /// Per-cell photosynthate demand.
    HostCellDemand,
    /// Time between pool arrivals.
    Arrivals,
    /// Clade of a pool arrival.
    Clade,
    /// Arrival affinity coin.
    ArrivalAffinity,
    /// Cell choice for arrivals and initial placement.
    OpenCellOnArrival,
    /// Whether a boundary division lands outside the modeled grid.
    InfectCellOutside,
    /// Initial photosynthate surplus.
    Photosynthate,
    /// Photosynthetic production rate.
    Photoprod,
    /// Mitotic cost rate.
    MitoticCostRate,
    /// Mutation of the bank handed to a child.
    PhotosynthateMutation,
    /// Mutation of a child's production rate.
    PhotoprodMutation,
    /// Mutation of a child's mitotic cost rate.
    MitoticCostRateMutation,
    /// Division affinity coin.
    DivisionAffinity,
}

impl Stream {
    /// Number of distinct streams.
    pub const COUNT: usize = 23;

    /// Every stream, in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::MitoticClass,
        Self::EndG0,
        Self::EndG1sg2m,
        Self::TimeG0Escape,
        Self::TimeG1sg2mEscape,
        Self::TimeDenouement,
        Self::CheckForOpenCell,
        Self::DigestionVsEscapeG0,
        Self::DigestionVsEscapeG1sg2m,
        Self::Eviction,
        Self::HostCellDemand,
        Self::Arrivals,
        Self::Clade,
        Self::ArrivalAffinity,
        Self::OpenCellOnArrival,
        Self::InfectCellOutside,
        Self::Photosynthate,
        Self::Photoprod,
        Self::MitoticCostRate,
        Self::PhotosynthateMutation,
        Self::PhotoprodMutation,
        Self::MitoticCostRateMutation,
        Self::DivisionAffinity,
    ];

    /// Position of this stream in [`Stream::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Identifier used to select an independent generator sequence.
    pub const fn stream_id(self) -> u64 {
        self as u64
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Lattice shape of the sponge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Square cells with 8 lateral neighbors.
    #[default]
    Square,
    /// Offset-row hexagonal cells with 6 lateral neighbors.
    Hex,
}

/// Strategy for placing the initial symbionts at time zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Uniformly random open cells across the whole grid.
    #[default]
    Randomize,
    /// Each clade confined to a band of rows.
    Horizontal,
    /// Each clade confined to a band of columns.
    Vertical,
    /// Two clades in diagonally opposite quadrants.
    Quadrant,
}

// ---------------------------------------------------------------------------
// Life cycle
// ---------------------------------------------------------------------------

/// Cell-cycle phase of a symbiont.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Growth phase.
    G0,
    /// Combined synthesis and mitosis phase; pays the mitotic cost.
    G1sg2m,
}

impl Phase {
    /// Derive the phase from the kind of the last event a symbiont saw.
    ///
    /// Arrival and the end of division start a growth phase; the end of
    /// growth starts the division phase. Exit kinds are never the previous
    /// kind of a live symbiont and map to `G0`.
    pub const fn from_prev_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::EndG0 => Self::G1sg2m,
            EventKind::Arrival
            | EventKind::EndG1sg2m
            | EventKind::Escape
            | EventKind::Digestion
            | EventKind::Denouement
            | EventKind::Cancelled => Self::G0,
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::G0 => f.write_str("G0"),
            Self::G1sg2m => f.write_str("G1SG2M"),
        }
    }
}

/// How a symbiont entered the sponge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HowArrived {
    /// From the external pool.
    #[serde(rename = "ARRIVED_FROM_POOL")]
    Pool,
    /// As the child of a division.
    #[serde(rename = "ARRIVED_VIA_DIVISION")]
    Division,
}

/// Result of a division, naming which of parent or child (if any) left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivisionOutcome {
    /// Parent and child both remain in the grid.
    BothStay,
    /// The child landed in a cell outside the modeled grid.
    ChildInfectsOutside,
    /// No room anywhere nearby; the child was discarded.
    ChildEvicted,
    /// The child found a cell but failed the affinity check.
    ChildNoAffinity,
    /// The parent moved to a cell outside the modeled grid.
    ParentInfectsOutside,
    /// No room anywhere nearby; the parent was pushed out.
    ParentEvicted,
    /// The parent found a cell but failed the affinity check.
    ParentNoAffinity,
}

impl DivisionOutcome {
    /// Whether the parent leaves the simulation.
    pub const fn parent_removed(self) -> bool {
        matches!(
            self,
            Self::ParentInfectsOutside | Self::ParentEvicted | Self::ParentNoAffinity
        )
    }

    /// Whether the child never enters the grid.
    pub const fn child_removed(self) -> bool {
        matches!(
            self,
            Self::ChildInfectsOutside | Self::ChildEvicted | Self::ChildNoAffinity
        )
    }

    /// Exit status of whichever party left, if any.
    pub const fn exit_status(self) -> Option<ExitStatus> {
        match self {
            Self::BothStay => None,
            Self::ChildInfectsOutside => Some(ExitStatus::ChildInfectsOutside),
            Self::ChildEvicted => Some(ExitStatus::ChildEvicted),
            Self::ChildNoAffinity => Some(ExitStatus::ChildNoAffinity),
            Self::ParentInfectsOutside => Some(ExitStatus::ParentInfectsOutside),
            Self::ParentEvicted => Some(ExitStatus::ParentEvicted),
            Self::ParentNoAffinity => Some(ExitStatus::ParentNoAffinity),
        }
    }
}

/// Final status recorded for each symbiont that leaves (or outlives) a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitStatus {
    /// Child placed outside the grid at division.
    ChildInfectsOutside,
    /// Child evicted at division.
    ChildEvicted,
    /// Child failed division affinity.
    ChildNoAffinity,
    /// Parent moved outside the grid at division.
    ParentInfectsOutside,
    /// Parent evicted at division.
    ParentEvicted,
    /// Parent failed division affinity.
    ParentNoAffinity,
    /// Still resident when the horizon was reached.
    StillInResidence,
    /// Digested while growing.
    DigestionInG0,
    /// Digested while dividing.
    DigestionInG1sg2m,
    /// Escaped while growing.
    EscapeInG0,
    /// Escaped while dividing.
    EscapeInG1sg2m,
    /// Residence expired while growing.
    DenouementInG0,
    /// Residence expired while dividing.
    DenouementInG1sg2m,
}

impl ExitStatus {
    /// Status for an exit event of `kind` taken in `phase`.
    ///
    /// Returns `None` for kinds that are not exits.
    pub const fn for_exit(kind: EventKind, phase: Phase) -> Option<Self> {
        match (kind, phase) {
            (EventKind::Digestion, Phase::G0) => Some(Self::DigestionInG0),
            (EventKind::Digestion, Phase::G1sg2m) => Some(Self::DigestionInG1sg2m),
            (EventKind::Escape, Phase::G0) => Some(Self::EscapeInG0),
            (EventKind::Escape, Phase::G1sg2m) => Some(Self::EscapeInG1sg2m),
            (EventKind::Denouement, Phase::G0) => Some(Self::DenouementInG0),
            (EventKind::Denouement, Phase::G1sg2m) => Some(Self::DenouementInG1sg2m),
            _ => None,
        }
    }
}

/// Direction of a phenotypic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationType {
    /// Makes the trait worse for the symbiont.
    Deleterious,
    /// Makes the trait better for the symbiont.
    Beneficial,
    /// No mutation occurred.
    None,
}
