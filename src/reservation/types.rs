use serde::{Deserialize, Serialize};

use crate::models::TravelDirection;

/// Why a train could not extend its reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// The block is held by another train
    Block,
    /// The block's section is locked to the opposite direction
    SectionDirection,
    /// The interlocking node is being crossed by another train
    Junction,
}

impl BlockedReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BlockedReason::Block => "block",
            BlockedReason::SectionDirection => "section_direction",
            BlockedReason::Junction => "junction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocked {
    /// Path offset the train must stop before
    pub offset: f64,
    /// Block of the segment that could not be entered
    pub block_id: String,
    pub reason: BlockedReason,
    /// Block, section or node id that is contended
    pub resource_id: String,
    pub by_train: String,
}

/// Result of one reservation pass for a train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReservationOutcome {
    /// Path offset up to which the train holds everything it needs
    pub reserved_until: f64,
    pub blocked: Option<Blocked>,
}

impl ReservationOutcome {
    /// Furthest offset the train may travel to
    #[must_use]
    pub fn authority(&self) -> f64 {
        self.blocked.as_ref().map_or(self.reserved_until, |b| b.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Block,
    Section,
    Node,
}

/// One row of the ownership table shown by debug overlays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationListing {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub holders: Vec<String>,
    /// Locked direction, sections only
    pub direction: Option<TravelDirection>,
}
