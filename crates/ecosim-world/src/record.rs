//! Captured simulation state for save/load collaborators.

use crate::agent::Agent;
use crate::field::Field;
use ecosim_core::{PopulationStats, Species};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry, current field and step counter taken together.
/// The encoding is left to whoever stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub step: u64,
    /// Agents in registry order
    pub agents: Vec<Agent>,
    pub field: Field,
}

impl Record {
    /// Live agents on the recorded field, per species
    pub fn stats(&self) -> PopulationStats {
        let species: HashMap<_, Species> = self
            .agents
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| (a.id(), a.species()))
            .collect();
        PopulationStats::tally(
            self.step,
            self.field.occupants().filter_map(|id| species.get(&id).copied()),
        )
    }
}
