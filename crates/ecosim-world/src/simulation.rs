//! Stepping engine: owns the field buffers and the agent registry.

use crate::agent::{Agent, Census, StepContext};
use crate::field::{Field, FieldBuffers};
use crate::record::Record;
use ecosim_core::{
    AgentId, AgentIdAllocator, DeathCause, Error, Location, PopulationStats, Result,
    SimulationConfig, Species, ViabilityPolicy, DEFAULT_LONG_RUN,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, trace};

/// What happened during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u64,
    /// Registry size when the step began
    pub agents_at_start: usize,
    /// Registry size after deaths were removed and newborns added
    pub agents_at_end: usize,
    pub births: usize,
    deaths: [usize; 4],
}

impl StepReport {
    fn new(step: u64, agents_at_start: usize) -> Self {
        Self {
            step,
            agents_at_start,
            ..Default::default()
        }
    }

    pub fn deaths(&self, cause: DeathCause) -> usize {
        self.deaths[cause.index()]
    }

    pub fn total_deaths(&self) -> usize {
        self.deaths.iter().sum()
    }
}

pub struct Simulator {
    config: SimulationConfig,
    buffers: FieldBuffers,
    agents: HashMap<AgentId, Agent>,
    /// Registry order; agents act in this order
    order: Vec<AgentId>,
    rng: ChaCha8Rng,
    ids: AgentIdAllocator,
    step: u64,
    stats: PopulationStats,
    history: Vec<PopulationStats>,
    policy: Box<dyn ViabilityPolicy>,
}

impl Simulator {
    /// A freshly populated simulator with default species settings.
    /// Non-positive dimensions fall back to the defaults.
    pub fn new(width: i32, height: i32) -> Self {
        let mut config = SimulationConfig {
            width,
            height,
            ..Default::default()
        };
        config.correct_dimensions();
        Self::build(config)
    }

    pub fn with_config(mut config: SimulationConfig) -> Result<Self> {
        config.correct_dimensions();
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulationConfig) -> Self {
        let policy = Box::new(config.viability);
        let mut sim = Self {
            buffers: FieldBuffers::new(config.width, config.height),
            agents: HashMap::new(),
            order: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            ids: AgentIdAllocator::new(),
            step: 0,
            stats: PopulationStats::default(),
            history: Vec::new(),
            policy,
            config,
        };
        sim.reset();
        sim
    }

    /// Replace the continuation rule consulted by `run`
    pub fn with_policy(mut self, policy: impl ViabilityPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_field(&self) -> &Field {
        self.buffers.current()
    }

    pub fn current_stats(&self) -> &PopulationStats {
        &self.stats
    }

    /// Stats after every step since the last reset or restore, starting with step 0
    pub fn history(&self) -> &[PopulationStats] {
        &self.history
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Registered agents in acting order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.order.iter().filter_map(move |id| self.agents.get(id))
    }

    pub fn agent_count(&self) -> usize {
        self.order.len()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn is_viable(&self) -> bool {
        self.policy.is_viable(&self.stats)
    }

    /// Advance the world by one step
    pub fn step(&mut self) -> StepReport {
        self.step += 1;

        let roster = self.order.clone();
        let mut report = StepReport::new(self.step, roster.len());
        let mut newborns = Vec::new();

        let (current, next) = self.buffers.split();
        for &id in &roster {
            // Out of the map while acting, so the census only sees other agents
            let Some(mut agent) = self.agents.remove(&id) else {
                continue;
            };

            if agent.is_alive() {
                let profile = self.config.species.profile(agent.species());
                let mut ctx = StepContext {
                    current,
                    next: &mut *next,
                    newborns: &mut newborns,
                    ids: &mut self.ids,
                    rng: &mut self.rng,
                };
                let outcome = agent.act(profile, &mut ctx, &self.agents);

                // Kills land immediately so later hunters see the victim dead
                if let Some(victim) = outcome.eaten.and_then(|v| self.agents.get_mut(&v)) {
                    victim.mark_dead(DeathCause::Eaten);
                    trace!(
                        event = "predation",
                        step = self.step,
                        hunter = %id,
                        victim = %victim.id(),
                        victim_species = %victim.species(),
                        "Agent eaten"
                    );
                }
            }

            self.agents.insert(id, agent);
        }

        let mut survivors = Vec::with_capacity(roster.len() + newborns.len());
        for id in roster {
            let Some(agent) = self.agents.get(&id) else {
                continue;
            };
            match agent.cause_of_death() {
                None => survivors.push(id),
                Some(cause) => {
                    report.deaths[cause.index()] += 1;
                    trace!(
                        event = "agent_death",
                        step = self.step,
                        agent = %id,
                        species = %agent.species(),
                        age = agent.age(),
                        cause = ?cause,
                        "Agent died"
                    );
                    self.agents.remove(&id);
                }
            }
        }

        report.births = newborns.len();
        for child in newborns {
            survivors.push(child.id());
            self.agents.insert(child.id(), child);
        }
        self.order = survivors;
        report.agents_at_end = self.order.len();

        self.buffers.swap();
        self.recompute_stats();
        self.history.push(self.stats);

        debug!(
            event = "step_complete",
            step = self.step,
            births = report.births,
            deaths = report.total_deaths(),
            agents = report.agents_at_end,
            prey = self.stats.count(Species::Prey),
            predators = self.stats.count(Species::Predator),
            apex_predators = self.stats.count(Species::ApexPredator),
            "Step complete"
        );
        if self.config.log_interval > 0 && self.step % self.config.log_interval == 0 {
            self.emit_population_metrics();
        }

        report
    }

    /// Step while the viability policy holds, at most `max_steps` times.
    /// Returns the number of steps taken.
    #[instrument(skip(self), fields(start_step = self.step))]
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut taken = 0;
        while taken < max_steps && self.is_viable() {
            self.step();
            taken += 1;
        }

        info!(
            event = "run_summary",
            steps_taken = taken,
            final_step = self.step,
            stopped_early = taken < max_steps,
            agents = self.agent_count(),
            prey = self.stats.count(Species::Prey),
            predators = self.stats.count(Species::Predator),
            apex_predators = self.stats.count(Species::ApexPredator),
            "Run complete"
        );
        taken
    }

    pub fn run_long(&mut self) -> usize {
        self.run(DEFAULT_LONG_RUN)
    }

    /// Empty the world and populate it again from the creation probabilities
    pub fn reset(&mut self) {
        self.step = 0;
        self.agents.clear();
        self.order.clear();
        self.buffers.clear();
        self.ids = AgentIdAllocator::new();

        let trials = self.config.creation.trials();
        let locations: Vec<Location> = self.buffers.current().locations().collect();
        for location in locations {
            for (species, chance) in trials {
                if !self.rng.gen_bool(chance) {
                    continue;
                }
                let agent = Agent::with_random_age(
                    self.ids.allocate(),
                    species,
                    location,
                    self.config.species.profile(species),
                    &mut self.rng,
                );
                self.buffers.current_mut().put(Some(agent.id()), location);
                self.order.push(agent.id());
                self.agents.insert(agent.id(), agent);
                break;
            }
        }
        self.order.shuffle(&mut self.rng);

        self.recompute_stats();
        self.history = vec![self.stats];

        info!(
            event = "world_reset",
            width = self.config.width,
            height = self.config.height,
            agents = self.order.len(),
            prey = self.stats.count(Species::Prey),
            predators = self.stats.count(Species::Predator),
            apex_predators = self.stats.count(Species::ApexPredator),
            "World populated"
        );
    }

    /// Add a newborn agent of the given species to an empty cell of the current field
    pub fn spawn(&mut self, species: Species, location: Location) -> Result<AgentId> {
        let field = self.buffers.current();
        if !field.is_in_grid(location) {
            return Err(Error::InvalidState(format!(
                "location {location} outside {}x{} field",
                field.width(),
                field.height()
            )));
        }
        if let Some(occupant) = field.occupant_at(location) {
            if self.agents.live_species(occupant).is_some() {
                return Err(Error::InvalidState(format!(
                    "location {location} already holds agent {occupant}"
                )));
            }
        }

        let agent = Agent::new(
            self.ids.allocate(),
            species,
            location,
            self.config.species.profile(species),
        );
        let id = agent.id();
        self.buffers.current_mut().put(Some(id), location);
        self.order.push(id);
        self.agents.insert(id, agent);
        self.recompute_stats();
        Ok(id)
    }

    /// Remove every agent in the square of the given radius around `center`.
    /// Returns how many agents were removed.
    pub fn clear_region(&mut self, center: Location, radius: i32) -> usize {
        if radius < 0 {
            return 0;
        }
        let (width, height) = (self.buffers.current().width(), self.buffers.current().height());
        let rows = center.row.saturating_sub(radius).max(0)
            ..=center.row.saturating_add(radius).min(height - 1);
        let cols = center.col.saturating_sub(radius).max(0)
            ..=center.col.saturating_add(radius).min(width - 1);

        let mut removed = HashSet::new();
        for row in rows {
            for col in cols.clone() {
                let location = Location::new(row, col);
                if let Some(id) = self.buffers.current().occupant_at(location) {
                    if self.agents.remove(&id).is_some() {
                        removed.insert(id);
                    }
                }
                self.buffers.current_mut().put(None, location);
                self.buffers.next_mut().put(None, location);
            }
        }

        self.order.retain(|id| !removed.contains(id));
        self.recompute_stats();
        debug!(
            event = "region_cleared",
            row = center.row,
            col = center.col,
            radius,
            removed = removed.len(),
            "Region cleared"
        );
        removed.len()
    }

    /// Snapshot of the registry, current field and step counter
    pub fn capture(&self) -> Record {
        Record {
            step: self.step,
            agents: self.agents().cloned().collect(),
            field: self.buffers.current().clone(),
        }
    }

    /// Replace registry, current field and step counter in one go.
    /// Nothing changes if the record is rejected.
    pub fn restore(&mut self, record: Record) -> Result<()> {
        validate_field(&record.field)?;
        validate_agents(&record.agents, &record.field, &self.config)?;
        validate_placement(&record.field, record.agents.iter())?;
        let restored = record.stats();

        self.config.width = record.field.width();
        self.config.height = record.field.height();
        self.buffers.replace_current(record.field);
        self.install_agents(record.agents);
        self.step = record.step;

        self.recompute_stats();
        self.history = vec![self.stats];
        info!(
            event = "state_restored",
            step = self.step,
            agents = self.order.len(),
            on_field = restored.total(),
            "Simulation state restored"
        );
        Ok(())
    }

    /// Replace the registry; every agent must fit the current field
    pub fn replace_agents(&mut self, agents: Vec<Agent>) -> Result<()> {
        validate_agents(&agents, self.buffers.current(), &self.config)?;
        validate_placement(self.buffers.current(), agents.iter())?;
        self.install_agents(agents);
        self.recompute_stats();
        Ok(())
    }

    /// Replace the current field; registered agents must fit inside it
    pub fn replace_field(&mut self, field: Field) -> Result<()> {
        validate_field(&field)?;
        if let Some(agent) = self.agents().find(|a| !field.is_in_grid(a.location())) {
            return Err(Error::InvalidState(format!(
                "agent {} at {} lies outside the new field",
                agent.id(),
                agent.location()
            )));
        }
        validate_placement(&field, self.agents())?;
        self.config.width = field.width();
        self.config.height = field.height();
        self.buffers.replace_current(field);
        self.recompute_stats();
        Ok(())
    }

    pub fn set_step_count(&mut self, step: u64) {
        self.step = step;
        self.stats.step = step;
    }

    fn install_agents(&mut self, agents: Vec<Agent>) {
        let last_id = agents.iter().map(Agent::id).max();
        self.order = agents.iter().map(Agent::id).collect();
        self.agents = agents.into_iter().map(|a| (a.id(), a)).collect();
        self.ids = match last_id {
            Some(id) => AgentIdAllocator::starting_after(id),
            None => AgentIdAllocator::new(),
        };
    }

    fn recompute_stats(&mut self) {
        let agents = &self.agents;
        self.stats = PopulationStats::tally(
            self.step,
            self.buffers
                .current()
                .occupants()
                .filter_map(|id| agents.live_species(id)),
        );
    }

    fn emit_population_metrics(&self) {
        let ages: Vec<u32> = self.agents.values().map(Agent::age).collect();
        let avg_age = if ages.is_empty() {
            0.0
        } else {
            ages.iter().map(|&a| a as f64).sum::<f64>() / ages.len() as f64
        };

        info!(
            event = "population_metrics",
            step = self.step,
            agents = self.order.len(),
            on_field = self.stats.total(),
            prey = self.stats.count(Species::Prey),
            predators = self.stats.count(Species::Predator),
            apex_predators = self.stats.count(Species::ApexPredator),
            avg_age = format!("{:.1}", avg_age),
            viable = self.is_viable(),
            "Population metrics snapshot"
        );
    }
}

fn validate_field(field: &Field) -> Result<()> {
    if field.is_consistent() {
        Ok(())
    } else {
        Err(Error::InvalidState(format!(
            "field storage does not match its {}x{} dimensions",
            field.width(),
            field.height()
        )))
    }
}

/// Every live registered id on the field must sit in exactly one cell, the
/// one its agent records. Unregistered ids are left over from eaten agents.
fn validate_placement<'a>(field: &Field, agents: impl Iterator<Item = &'a Agent>) -> Result<()> {
    let locations: HashMap<AgentId, Location> = agents.map(|a| (a.id(), a.location())).collect();
    let mut placed = HashSet::new();
    for (location, id) in field.iter() {
        let Some(&expected) = locations.get(&id) else {
            continue;
        };
        if expected != location {
            return Err(Error::InvalidState(format!(
                "agent {id} is at {expected} but the field holds it at {location}"
            )));
        }
        if !placed.insert(id) {
            return Err(Error::InvalidState(format!("agent {id} occupies more than one cell")));
        }
    }
    Ok(())
}

fn validate_agents(agents: &[Agent], field: &Field, config: &SimulationConfig) -> Result<()> {
    let mut seen = HashSet::with_capacity(agents.len());
    for agent in agents {
        if !seen.insert(agent.id()) {
            return Err(Error::InvalidState(format!("duplicate agent id {}", agent.id())));
        }
        if !agent.is_alive() {
            return Err(Error::InvalidState(format!("agent {} is dead", agent.id())));
        }
        if !field.is_in_grid(agent.location()) {
            return Err(Error::InvalidState(format!(
                "agent {} at {} lies outside the {}x{} field",
                agent.id(),
                agent.location(),
                field.width(),
                field.height()
            )));
        }
        let profile = config.species.profile(agent.species());
        match (&profile.diet, agent.food_reserve()) {
            (None, None) => {}
            (Some(diet), Some(food)) if food <= diet.food_ceiling => {}
            _ => {
                return Err(Error::InvalidState(format!(
                    "agent {} has food reserve {:?} not valid for {}",
                    agent.id(),
                    agent.food_reserve(),
                    agent.species()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecosim_core::{CreationConfig, ViabilityRule};

    fn empty_config(width: i32, height: i32) -> SimulationConfig {
        SimulationConfig {
            width,
            height,
            seed: 42,
            creation: CreationConfig {
                predator: 0.0,
                prey: 0.0,
                apex_predator: 0.0,
            },
            viability: ViabilityRule::Always,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulator::new(30, 20);
        assert_eq!(sim.current_field().width(), 30);
        assert_eq!(sim.current_field().height(), 20);
        assert_eq!(sim.step_count(), 0);
        assert!(sim.agent_count() > 0);
        assert_eq!(sim.current_stats().total(), sim.agent_count());
        assert_eq!(sim.history().len(), 1);
    }

    #[test]
    fn test_invalid_dimensions_use_defaults() {
        let sim = Simulator::new(-3, 10);
        assert_eq!(sim.current_field().width(), 80);
        assert_eq!(sim.current_field().height(), 80);
    }

    #[test]
    fn test_with_config_rejects_bad_species() {
        let mut config = empty_config(5, 5);
        config.species.prey.max_litter_size = 0;
        assert!(Simulator::with_config(config).is_err());
    }

    #[test]
    fn test_reset_populates_one_agent_per_cell() {
        let mut config = empty_config(20, 20);
        config.creation = CreationConfig {
            predator: 0.3,
            prey: 0.3,
            apex_predator: 0.3,
        };
        let sim = Simulator::with_config(config).unwrap();

        assert_eq!(sim.current_field().occupied_count(), sim.agent_count());
        for agent in sim.agents() {
            assert_eq!(sim.current_field().occupant_at(agent.location()), Some(agent.id()));
        }
    }

    #[test]
    fn test_reset_first_trial_wins() {
        let mut config = empty_config(6, 6);
        config.creation = CreationConfig {
            predator: 1.0,
            prey: 1.0,
            apex_predator: 1.0,
        };
        let sim = Simulator::with_config(config).unwrap();
        assert_eq!(sim.current_stats().count(Species::Predator), 36);
        assert_eq!(sim.current_stats().count(Species::Prey), 0);
    }

    #[test]
    fn test_reset_clears_previous_state() {
        let mut sim = Simulator::new(15, 15);
        sim.run(5);
        sim.reset();
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.history().len(), 1);
        assert_eq!(sim.current_field().occupied_count(), sim.agent_count());
    }

    #[test]
    fn test_spawn_rejects_occupied_and_outside() {
        let mut sim = Simulator::with_config(empty_config(4, 4)).unwrap();
        let loc = Location::new(1, 1);
        sim.spawn(Species::Prey, loc).unwrap();
        assert!(sim.spawn(Species::Predator, loc).is_err());
        assert!(sim.spawn(Species::Prey, Location::new(4, 0)).is_err());
        assert_eq!(sim.current_stats().count(Species::Prey), 1);
    }

    #[test]
    fn test_step_advances_counter_and_history() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        sim.spawn(Species::Prey, Location::new(2, 2)).unwrap();
        let report = sim.step();
        assert_eq!(report.step, 1);
        assert_eq!(sim.step_count(), 1);
        assert_eq!(sim.history().len(), 2);
        assert_eq!(sim.current_stats().step, 1);
    }

    #[test]
    fn test_run_stops_when_not_viable() {
        let mut sim = Simulator::with_config(empty_config(5, 5))
            .unwrap()
            .with_policy(ViabilityRule::AnySpeciesAlive);
        assert_eq!(sim.run(10), 0);

        sim.spawn(Species::Prey, Location::new(0, 0)).unwrap();
        assert_eq!(sim.run(3), 3);
    }

    #[test]
    fn test_custom_policy() {
        let mut sim = Simulator::new(10, 10).with_policy(|s: &PopulationStats| s.step < 4);
        assert_eq!(sim.run(100), 4);
        assert_eq!(sim.step_count(), 4);
    }

    #[test]
    fn test_clear_region() {
        let mut sim = Simulator::with_config(empty_config(10, 10)).unwrap();
        sim.spawn(Species::Prey, Location::new(0, 0)).unwrap();
        sim.spawn(Species::Prey, Location::new(1, 1)).unwrap();
        let far = sim.spawn(Species::Predator, Location::new(8, 8)).unwrap();

        assert_eq!(sim.clear_region(Location::new(0, 0), 2), 2);
        assert_eq!(sim.agent_count(), 1);
        assert!(sim.agent(far).is_some());
        assert_eq!(sim.current_field().occupied_count(), 1);
        assert_eq!(sim.current_stats().count(Species::Prey), 0);
    }

    #[test]
    fn test_clear_region_with_huge_radius() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        sim.spawn(Species::Prey, Location::new(0, 0)).unwrap();
        sim.spawn(Species::Predator, Location::new(4, 4)).unwrap();

        assert_eq!(sim.clear_region(Location::new(2, 2), i32::MAX), 2);
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.current_field().occupied_count(), 0);

        sim.spawn(Species::Prey, Location::new(1, 1)).unwrap();
        assert_eq!(sim.clear_region(Location::new(1, 1), -1), 0);
        assert_eq!(sim.clear_region(Location::new(i32::MAX, i32::MAX), i32::MAX), 1);
    }

    #[test]
    fn test_capture_and_restore() {
        let mut sim = Simulator::new(12, 12);
        sim.run(3);
        let record = sim.capture();

        let mut other = Simulator::new(20, 20);
        other.restore(record.clone()).unwrap();
        assert_eq!(other.step_count(), 3);
        assert_eq!(other.current_field(), &record.field);
        assert_eq!(other.capture(), record);
        assert_eq!(other.current_stats().total(), sim.current_stats().total());
    }

    #[test]
    fn test_restore_rejects_agent_outside_field() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        let profile = sim.config().species.prey.clone();
        let record = Record {
            step: 9,
            agents: vec![Agent::new(AgentId(0), Species::Prey, Location::new(7, 7), &profile)],
            field: Field::new(5, 5),
        };
        assert!(sim.restore(record).is_err());
        assert_eq!(sim.step_count(), 0);
    }

    #[test]
    fn test_restore_rejects_duplicate_ids() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        let profile = sim.config().species.prey.clone();
        let agent = Agent::new(AgentId(3), Species::Prey, Location::new(1, 1), &profile);
        let record = Record {
            step: 0,
            agents: vec![agent.clone(), agent],
            field: Field::new(5, 5),
        };
        assert!(sim.restore(record).is_err());
    }

    #[test]
    fn test_restore_rejects_field_that_disagrees_with_registry() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        let profile = sim.config().species.prey.clone();
        let prey = Agent::new(AgentId(1), Species::Prey, Location::new(0, 0), &profile);

        let mut twice = Field::new(5, 5);
        twice.put(Some(AgentId(1)), Location::new(0, 0));
        twice.put(Some(AgentId(1)), Location::new(4, 4));
        let record = Record {
            step: 2,
            agents: vec![prey.clone()],
            field: twice,
        };
        assert!(sim.restore(record).is_err());

        let mut elsewhere = Field::new(5, 5);
        elsewhere.put(Some(AgentId(1)), Location::new(3, 3));
        let record = Record {
            step: 2,
            agents: vec![prey.clone()],
            field: elsewhere,
        };
        assert!(sim.restore(record).is_err());
        assert_eq!(sim.step_count(), 0);
        assert_eq!(sim.agent_count(), 0);

        // leftover ids of eaten agents are fine
        let mut field = Field::new(5, 5);
        field.put(Some(AgentId(1)), Location::new(0, 0));
        field.put(Some(AgentId(9)), Location::new(4, 4));
        sim.restore(Record {
            step: 2,
            agents: vec![prey],
            field,
        })
        .unwrap();
        assert_eq!(sim.current_stats().total(), 1);
    }

    #[test]
    fn test_replace_agents_rejects_misplaced_agent() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        let id = sim.spawn(Species::Prey, Location::new(2, 2)).unwrap();
        let profile = sim.config().species.prey.clone();
        let moved = Agent::new(id, Species::Prey, Location::new(0, 0), &profile);
        assert!(sim.replace_agents(vec![moved]).is_err());
        assert_eq!(sim.agent(id).unwrap().location(), Location::new(2, 2));
    }

    #[test]
    fn test_newborn_ids_continue_after_restore() {
        let mut config = empty_config(5, 5);
        config.species.prey.breeding_age = 0;
        config.species.prey.breeding_probability = 1.0;
        let mut sim = Simulator::with_config(config).unwrap();

        let profile = sim.config().species.prey.clone();
        let mut field = Field::new(5, 5);
        field.put(Some(AgentId(77)), Location::new(2, 2));
        sim.restore(Record {
            step: 0,
            agents: vec![Agent::new(AgentId(77), Species::Prey, Location::new(2, 2), &profile)],
            field,
        })
        .unwrap();

        let report = sim.step();
        assert!(report.births > 0);
        assert!(sim.agents().filter(|a| a.age() == 0).all(|a| a.id() > AgentId(77)));
    }

    #[test]
    fn test_replace_field_and_step_count() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        sim.replace_field(Field::new(8, 3)).unwrap();
        assert_eq!(sim.current_field().width(), 8);
        sim.set_step_count(40);
        assert_eq!(sim.step_count(), 40);
        assert_eq!(sim.step().step, 41);
    }

    #[test]
    fn test_replace_agents_rejects_bad_food_reserve() {
        let mut sim = Simulator::with_config(empty_config(5, 5)).unwrap();
        let profile = sim.config().species.predator.clone();
        let greedy = Agent::new(AgentId(1), Species::Predator, Location::new(0, 0), &profile)
            .with_food_reserve(50);
        assert!(sim.replace_agents(vec![greedy]).is_err());
    }
}
