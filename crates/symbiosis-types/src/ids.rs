//! Type-safe identifier wrappers.
//!
//! Agents and clades are numbered per run: agent ids are handed out in
//! creation order by the simulation context, clade ids are positions in the
//! configured clade list. A [`RunId`] tags each run with a UUID v7 so that
//! output files from repeated runs can be told apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around an unsigned counter with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wrap a raw counter value.
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Return the inner counter value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }

            /// The identifier following this one, or `None` on overflow.
            pub const fn next(self) -> Option<Self> {
                match self.0.checked_add(1) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a symbiont, monotonic within one run.
    AgentId(u64)
}

define_id! {
    /// Identifier of a clade: its zero-based position in the clade table.
    CladeId(u32)
}

impl CladeId {
    /// Position of this clade in a per-clade table.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Unique identifier for a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new run identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_advance_and_stop_at_max() {
        let first = AgentId::new(1);
        assert_eq!(first.next(), Some(AgentId(2)));
        assert_eq!(AgentId(u64::MAX).next(), None);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&CladeId(3)).unwrap_or_default();
        assert_eq!(json, "3");
        assert_eq!(CladeId(3).index(), 3);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
