//! Population counts and the policy deciding whether a run continues.

use crate::types::Species;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Live agents per species on one field snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    /// Step at which the snapshot was taken
    pub step: u64,
    counts: [usize; 3],
}

impl PopulationStats {
    pub fn new(step: u64) -> Self {
        Self {
            step,
            counts: [0; 3],
        }
    }

    /// Count one entry per live occupant
    pub fn tally(step: u64, occupants: impl IntoIterator<Item = Species>) -> Self {
        let mut stats = Self::new(step);
        for species in occupants {
            stats.record(species);
        }
        stats
    }

    pub fn record(&mut self, species: Species) {
        self.counts[species.index()] += 1;
    }

    pub fn count(&self, species: Species) -> usize {
        self.counts[species.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Number of species with at least one live agent
    pub fn species_present(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// Counts in `Species::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (Species, usize)> + '_ {
        Species::ALL.iter().map(move |&s| (s, self.count(s)))
    }
}

impl fmt::Display for PopulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}:", self.step)?;
        for (i, (species, count)) in self.iter().enumerate() {
            let sep = if i == 0 { "" } else { "," };
            write!(f, "{sep} {species} {count}")?;
        }
        Ok(())
    }
}

/// Decides from the latest counts whether a run keeps stepping
pub trait ViabilityPolicy: Send + Sync {
    fn is_viable(&self, stats: &PopulationStats) -> bool;
}

/// Built-in continuation rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViabilityRule {
    /// Never stop early
    Always,
    /// At least one agent of any species
    AnySpeciesAlive,
    /// At least two species still present
    #[default]
    MultipleSpecies,
    /// Every species still present
    AllSpecies,
    /// At least one predator or apex predator
    PredatorsAlive,
}

impl ViabilityPolicy for ViabilityRule {
    fn is_viable(&self, stats: &PopulationStats) -> bool {
        match self {
            ViabilityRule::Always => true,
            ViabilityRule::AnySpeciesAlive => stats.total() > 0,
            ViabilityRule::MultipleSpecies => stats.species_present() > 1,
            ViabilityRule::AllSpecies => stats.species_present() == Species::ALL.len(),
            ViabilityRule::PredatorsAlive => {
                stats.count(Species::Predator) + stats.count(Species::ApexPredator) > 0
            }
        }
    }
}

impl<F> ViabilityPolicy for F
where
    F: Fn(&PopulationStats) -> bool + Send + Sync,
{
    fn is_viable(&self, stats: &PopulationStats) -> bool {
        self(stats)
    }
}
