//! Agent state and the per-step life cycle.

use crate::field::Field;
use ecosim_core::{
    AgentId, AgentIdAllocator, DeathCause, Diet, Location, Species, SpeciesProfile,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lookup of which agents are alive, and as what species
pub trait Census {
    fn live_species(&self, id: AgentId) -> Option<Species>;
}

impl Census for HashMap<AgentId, Agent> {
    fn live_species(&self, id: AgentId) -> Option<Species> {
        self.get(&id)
            .filter(|agent| agent.is_alive())
            .map(|agent| agent.species)
    }
}

/// Everything an agent touches while acting
pub struct StepContext<'a, R: Rng + ?Sized> {
    /// Field as it stood at the start of the step
    pub current: &'a Field,
    /// Field being built for the next step
    pub next: &'a mut Field,
    /// Agents born this step; they do not act until the next one
    pub newborns: &'a mut Vec<Agent>,
    pub ids: &'a mut AgentIdAllocator,
    pub rng: &'a mut R,
}

/// Effects of one `act` call that the simulator must apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActOutcome {
    /// Agent eaten by the actor; must be marked dead before anyone else acts
    pub eaten: Option<AgentId>,
    pub births: usize,
}

/// An animal on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    species: Species,
    age: u32,
    location: Location,
    food_reserve: Option<i32>,
    death: Option<DeathCause>,
}

struct Meal {
    location: Location,
    victim: AgentId,
    food_value: i32,
}

impl Agent {
    /// A newly born agent: age zero and, for hunters, a full food reserve
    pub fn new(id: AgentId, species: Species, location: Location, profile: &SpeciesProfile) -> Self {
        Self {
            id,
            species,
            age: 0,
            location,
            food_reserve: profile.diet.as_ref().map(|diet| diet.food_ceiling),
            death: None,
        }
    }

    /// An agent for a freshly populated field, with randomized age and food reserve
    pub fn with_random_age<R: Rng + ?Sized>(
        id: AgentId,
        species: Species,
        location: Location,
        profile: &SpeciesProfile,
        rng: &mut R,
    ) -> Self {
        let age = rng.gen_range(0..=profile.max_age);
        let food_reserve = profile
            .diet
            .as_ref()
            .map(|diet| rng.gen_range(0..=diet.food_ceiling));
        Self {
            id,
            species,
            age,
            location,
            food_reserve,
            death: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    /// Override the food reserve; ignored for species that do not hunt.
    /// The value is not checked against the diet here; `Simulator::restore`
    /// and `Simulator::replace_agents` reject reserves above the ceiling.
    pub fn with_food_reserve(mut self, food: i32) -> Self {
        if self.food_reserve.is_some() {
            self.food_reserve = Some(food);
        }
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn food_reserve(&self) -> Option<i32> {
        self.food_reserve
    }

    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn cause_of_death(&self) -> Option<DeathCause> {
        self.death
    }

    /// Record a death; an agent only dies once, later causes are ignored
    pub fn mark_dead(&mut self, cause: DeathCause) {
        if self.death.is_none() {
            self.death = Some(cause);
        }
    }

    /// Run one step of this agent's life: age, hunger, breeding, then moving or hunting.
    /// Writes go to `ctx.next` and `ctx.newborns` only.
    pub fn act<R, C>(
        &mut self,
        profile: &SpeciesProfile,
        ctx: &mut StepContext<'_, R>,
        census: &C,
    ) -> ActOutcome
    where
        R: Rng + ?Sized,
        C: Census + ?Sized,
    {
        let mut outcome = ActOutcome::default();
        if !self.is_alive() {
            return outcome;
        }

        self.age += 1;
        if self.age > profile.max_age {
            self.mark_dead(DeathCause::OldAge);
            return outcome;
        }

        if let Some(food) = self.food_reserve.as_mut() {
            *food -= 1;
            if *food <= 0 {
                self.mark_dead(DeathCause::Starvation);
                return outcome;
            }
        }

        outcome.births = self.breed(profile, ctx);

        let meal = profile
            .diet
            .as_ref()
            .and_then(|diet| self.find_food(diet, ctx.current, census));

        let destination = match meal {
            Some(meal) => {
                let ceiling = profile.diet.as_ref().map_or(meal.food_value, |d| d.food_ceiling);
                self.food_reserve = Some(meal.food_value.min(ceiling));
                outcome.eaten = Some(meal.victim);
                Some(meal.location)
            }
            None => ctx.next.free_adjacent_location(self.location, &mut *ctx.rng),
        };

        match destination {
            Some(location) => {
                self.location = location;
                ctx.next.put(Some(self.id), location);
            }
            None => self.mark_dead(DeathCause::Overcrowding),
        }

        outcome
    }

    fn breed<R: Rng + ?Sized>(&self, profile: &SpeciesProfile, ctx: &mut StepContext<'_, R>) -> usize {
        if self.age < profile.breeding_age || !ctx.rng.gen_bool(profile.breeding_probability) {
            return 0;
        }

        let litter = ctx.rng.gen_range(1..=profile.max_litter_size);
        let mut born = 0;
        for _ in 0..litter {
            let Some(location) = ctx.next.random_adjacent_location(self.location, &mut *ctx.rng)
            else {
                break;
            };
            let child = Agent {
                id: ctx.ids.allocate(),
                species: self.species,
                age: 0,
                location,
                food_reserve: self.food_reserve,
                death: None,
            };
            ctx.next.put(Some(child.id), location);
            ctx.newborns.push(child);
            born += 1;
        }
        born
    }

    /// First live neighbour on the current field that this diet covers
    fn find_food<C: Census + ?Sized>(&self, diet: &Diet, current: &Field, census: &C) -> Option<Meal> {
        current
            .adjacent_locations(self.location)
            .into_iter()
            .find_map(|location| {
                let victim = current.occupant_at(location)?;
                let species = census.live_species(victim)?;
                let food_value = diet.food_value(species)?;
                Some(Meal {
                    location,
                    victim,
                    food_value,
                })
            })
    }
}
