//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::stats::ViabilityRule;
use crate::types::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Grid width used when a non-positive width is requested
pub const DEFAULT_WIDTH: i32 = 80;
/// Grid height used when a non-positive height is requested
pub const DEFAULT_HEIGHT: i32 = 80;
/// Step budget of a "long" run
pub const DEFAULT_LONG_RUN: usize = 500;

/// What a hunting species eats and how much each victim is worth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diet {
    /// Initial and maximum food reserve
    pub food_ceiling: i32,
    /// Food reserve granted per victim species; the keys are the victim set
    pub food_values: BTreeMap<Species, i32>,
}

impl Diet {
    pub fn new(food_ceiling: i32, food_values: impl IntoIterator<Item = (Species, i32)>) -> Self {
        Self {
            food_ceiling,
            food_values: food_values.into_iter().collect(),
        }
    }

    pub fn eats(&self, species: Species) -> bool {
        self.food_values.contains_key(&species)
    }

    pub fn food_value(&self, species: Species) -> Option<i32> {
        self.food_values.get(&species).copied()
    }
}

/// Per-species life-cycle constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Age from which an agent may breed
    pub breeding_age: u32,
    /// Oldest age an agent survives
    pub max_age: u32,
    /// Chance of breeding in a step once old enough (0.0 to 1.0)
    pub breeding_probability: f64,
    /// Largest litter a single breeding produces
    pub max_litter_size: u32,
    /// Present for hunting species only
    #[serde(default)]
    pub diet: Option<Diet>,
}

impl SpeciesProfile {
    pub fn hunts(&self) -> bool {
        self.diet.is_some()
    }

    pub fn prey() -> Self {
        Self {
            breeding_age: 3,
            max_age: 30,
            breeding_probability: 0.6,
            max_litter_size: 5,
            diet: None,
        }
    }

    pub fn predator() -> Self {
        Self {
            breeding_age: 3,
            max_age: 50,
            breeding_probability: 0.21,
            max_litter_size: 11,
            diet: Some(Diet::new(6, [(Species::Prey, 6)])),
        }
    }

    pub fn apex_predator() -> Self {
        Self {
            breeding_age: 3,
            max_age: 100,
            breeding_probability: 0.05,
            max_litter_size: 10,
            diet: Some(Diet::new(6, [(Species::Prey, 6), (Species::Predator, 2)])),
        }
    }

    fn validate(&self, species: Species) -> Result<()> {
        if !(0.0..=1.0).contains(&self.breeding_probability) {
            return Err(Error::Validation(format!(
                "{species}: breeding probability {} outside [0, 1]",
                self.breeding_probability
            )));
        }
        if self.max_litter_size == 0 {
            return Err(Error::Validation(format!(
                "{species}: max litter size must be at least 1"
            )));
        }
        if let Some(diet) = &self.diet {
            if diet.food_ceiling <= 0 {
                return Err(Error::Validation(format!(
                    "{species}: food ceiling must be positive, got {}",
                    diet.food_ceiling
                )));
            }
            for (victim, value) in &diet.food_values {
                if *value <= 0 || *value > diet.food_ceiling {
                    return Err(Error::Validation(format!(
                        "{species}: food value {value} for {victim} outside 1..={}",
                        diet.food_ceiling
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Life-cycle constants for every species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesTable {
    pub prey: SpeciesProfile,
    pub predator: SpeciesProfile,
    pub apex_predator: SpeciesProfile,
}

impl SpeciesTable {
    pub fn profile(&self, species: Species) -> &SpeciesProfile {
        match species {
            Species::Prey => &self.prey,
            Species::Predator => &self.predator,
            Species::ApexPredator => &self.apex_predator,
        }
    }

    pub fn profile_mut(&mut self, species: Species) -> &mut SpeciesProfile {
        match species {
            Species::Prey => &mut self.prey,
            Species::Predator => &mut self.predator,
            Species::ApexPredator => &mut self.apex_predator,
        }
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        Self {
            prey: SpeciesProfile::prey(),
            predator: SpeciesProfile::predator(),
            apex_predator: SpeciesProfile::apex_predator(),
        }
    }
}

/// Per-cell chance of placing each species when the field is populated.
/// Trials run predator, prey, apex predator; the first success wins the cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationConfig {
    pub predator: f64,
    pub prey: f64,
    pub apex_predator: f64,
}

impl CreationConfig {
    /// Trial order used when populating a cell
    pub fn trials(&self) -> [(Species, f64); 3] {
        [
            (Species::Predator, self.predator),
            (Species::Prey, self.prey),
            (Species::ApexPredator, self.apex_predator),
        ]
    }
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            predator: 0.02,
            prey: 0.08,
            apex_predator: 0.1,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Width of the field
    pub width: i32,
    /// Height of the field
    pub height: i32,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Default step budget for a run
    pub max_steps: usize,
    /// Steps between population log lines
    pub log_interval: u64,
    pub creation: CreationConfig,
    pub species: SpeciesTable,
    /// When a run keeps stepping
    pub viability: ViabilityRule,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: 0,
            max_steps: DEFAULT_LONG_RUN,
            log_interval: 100,
            creation: CreationConfig::default(),
            species: SpeciesTable::default(),
            viability: ViabilityRule::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Replace non-positive grid dimensions with the defaults.
    /// Returns true if anything was changed.
    pub fn correct_dimensions(&mut self) -> bool {
        if self.width <= 0 || self.height <= 0 {
            tracing::warn!(
                width = self.width,
                height = self.height,
                default_width = DEFAULT_WIDTH,
                default_height = DEFAULT_HEIGHT,
                "The dimensions must be greater than zero, using default values"
            );
            self.width = DEFAULT_WIDTH;
            self.height = DEFAULT_HEIGHT;
            true
        } else {
            false
        }
    }

    /// Check everything except grid dimensions, which are corrected instead
    pub fn validate(&self) -> Result<()> {
        for species in Species::ALL {
            self.species.profile(species).validate(species)?;
        }
        for (species, chance) in self.creation.trials() {
            if !(0.0..=1.0).contains(&chance) {
                return Err(Error::Validation(format!(
                    "{species}: creation probability {chance} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}
