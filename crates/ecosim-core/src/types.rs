//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an agent, unique within one simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out agent ids in increasing order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentIdAllocator {
    next: u64,
}

impl AgentIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue allocating after the given id
    pub fn starting_after(last: AgentId) -> Self {
        Self { next: last.0 + 1 }
    }

    pub fn allocate(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

/// Grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: i32,
    pub col: i32,
}

impl Location {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The species living on the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Prey,
    Predator,
    ApexPredator,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Prey, Species::Predator, Species::ApexPredator];

    /// Position of this species in `Species::ALL`
    pub fn index(self) -> usize {
        match self {
            Species::Prey => 0,
            Species::Predator => 1,
            Species::ApexPredator => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Prey => "prey",
            Species::Predator => "predator",
            Species::ApexPredator => "apex_predator",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an agent stopped living
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    OldAge,
    Starvation,
    Overcrowding,
    Eaten,
}

impl DeathCause {
    pub fn index(self) -> usize {
        match self {
            DeathCause::OldAge => 0,
            DeathCause::Starvation => 1,
            DeathCause::Overcrowding => 2,
            DeathCause::Eaten => 3,
        }
    }
}
