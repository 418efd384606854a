/*!

Population state: the entity arena plus every status-partitioned pool the event loop samples from.

Each entity is in exactly the pools its `(class, status)` pair calls for:

| status                    | pools                                                         |
|---------------------------|---------------------------------------------------------------|
| `Susceptible`             | `susceptible[k]`, `eligible[k]`, `eligible_total`             |
| `InfectedAsymptomatic`    | `asymptomatic[k]`, `infected`, `eligible[k]`, `eligible_total` |
| `InfectedSymptomatic`     | `symptomatic`, `infected`                                     |
| `Recovered`, `RecoveredViaVaccination` | `recovered`                                      |

All status changes go through [`PopulationData::transition`], which withdraws the entity from the
pools of its old status and enrolls it in the pools of the new one, so the table above cannot
drift out of sync branch by branch. A violation (double enrollment, withdrawal from a pool the
entity is not in, an illegal status change) is a bug and panics.

*/

use crate::{
    class::{ClassArray, NUM_CLASSES, PopulationClass},
    context::{Context, DataPlugin},
    entity::{Entity, EntityId, Status},
    error::SirvError,
    log::debug,
    parameters::ContextParametersExt,
    pool::EntityPool,
    random::{ContextRandomExt, RngId},
    simulation::HistoryData,
};

const NUM_STATUSES: usize = 5;

#[inline]
fn status_slot(status: Status) -> usize {
    match status {
        Status::Susceptible => 0,
        Status::InfectedAsymptomatic => 1,
        Status::InfectedSymptomatic => 2,
        Status::Recovered => 3,
        Status::RecoveredViaVaccination => 4,
    }
}

fn enroll(pool: &mut EntityPool, entity_id: EntityId, pool_name: &str) {
    assert!(
        pool.insert(entity_id),
        "{entity_id} is already in the {pool_name} pool"
    );
}

fn withdraw(pool: &mut EntityPool, entity_id: EntityId, pool_name: &str) {
    assert!(
        pool.remove(entity_id),
        "{entity_id} is missing from the {pool_name} pool"
    );
}

/// Names a pool that entities can be drawn from uniformly at random.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolKind {
    Susceptible(PopulationClass),
    /// The vaccination-eligible total across all classes.
    VaccinationEligible,
    /// Asymptomatic and symptomatic infected across all classes.
    Infected,
}

pub struct PopulationData {
    entities: Vec<Entity>,
    initial_sizes: ClassArray<usize>,
    susceptible: ClassArray<EntityPool>,
    asymptomatic: ClassArray<EntityPool>,
    symptomatic: EntityPool,
    eligible: ClassArray<EntityPool>,
    eligible_total: EntityPool,
    infected: EntityPool,
    // Terminal, so never shrinks. The natural/vaccination tag is the entity's status.
    recovered: Vec<EntityId>,
    status_counts: ClassArray<[usize; NUM_STATUSES]>,
}

impl DataPlugin for PopulationData {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| PopulationData::new([0; NUM_CLASSES]);
}

impl PopulationData {
    /// Creates `class_sizes[k]` susceptible entities of each class, class by class in index
    /// order, so that the entities of a class occupy a contiguous run of ids.
    #[must_use]
    pub fn new(class_sizes: ClassArray<usize>) -> Self {
        let total: usize = class_sizes.iter().sum();
        let mut population = PopulationData {
            entities: Vec::with_capacity(total),
            initial_sizes: class_sizes,
            susceptible: std::array::from_fn(|k| EntityPool::with_capacity(class_sizes[k])),
            asymptomatic: std::array::from_fn(|_| EntityPool::new()),
            symptomatic: EntityPool::new(),
            eligible: std::array::from_fn(|k| EntityPool::with_capacity(class_sizes[k])),
            eligible_total: EntityPool::with_capacity(total),
            infected: EntityPool::new(),
            recovered: Vec::new(),
            status_counts: [[0; NUM_STATUSES]; NUM_CLASSES],
        };

        for class in PopulationClass::ALL {
            for _ in 0..class_sizes[class.index()] {
                let entity_id = EntityId(population.entities.len());
                population.entities.push(Entity::new(class));
                population.attach(entity_id, class, Status::Susceptible);
                population.status_counts[class.index()][status_slot(Status::Susceptible)] += 1;
            }
        }

        population
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn entity(&self, entity_id: EntityId) -> &Entity {
        &self.entities[entity_id.0]
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| (EntityId(idx), entity))
    }

    /// The first entity created for `class`.
    #[must_use]
    pub fn first_of_class(&self, class: PopulationClass) -> Option<EntityId> {
        if self.initial_sizes[class.index()] == 0 {
            return None;
        }
        let offset: usize = self.initial_sizes[..class.index()].iter().sum();
        Some(EntityId(offset))
    }

    #[must_use]
    pub fn initial_size(&self, class: PopulationClass) -> usize {
        self.initial_sizes[class.index()]
    }

    #[must_use]
    pub fn pool(&self, kind: PoolKind) -> &EntityPool {
        match kind {
            PoolKind::Susceptible(class) => &self.susceptible[class.index()],
            PoolKind::VaccinationEligible => &self.eligible_total,
            PoolKind::Infected => &self.infected,
        }
    }

    #[must_use]
    pub fn susceptible_count(&self, class: PopulationClass) -> usize {
        self.susceptible[class.index()].len()
    }

    #[must_use]
    pub fn asymptomatic_count(&self, class: PopulationClass) -> usize {
        self.asymptomatic[class.index()].len()
    }

    #[must_use]
    pub fn symptomatic_count(&self) -> usize {
        self.symptomatic.len()
    }

    /// Size of the all-infected pool.
    #[must_use]
    pub fn infected_count(&self) -> usize {
        self.infected.len()
    }

    #[must_use]
    pub fn eligible_count(&self) -> usize {
        self.eligible_total.len()
    }

    #[must_use]
    pub fn eligible_count_in(&self, class: PopulationClass) -> usize {
        self.eligible[class.index()].len()
    }

    #[must_use]
    pub fn recovered_count(&self) -> usize {
        self.recovered.len()
    }

    /// Number of entities of `class` currently in `status`.
    #[must_use]
    pub fn status_count(&self, class: PopulationClass, status: Status) -> usize {
        self.status_counts[class.index()][status_slot(status)]
    }

    #[must_use]
    pub fn is_vaccination_eligible(&self, entity_id: EntityId) -> bool {
        self.eligible_total.contains(entity_id)
    }

    /// Initial size minus susceptible minus recovered (by either route): the members of `class`
    /// infected right now.
    #[must_use]
    pub fn class_infected(&self, class: PopulationClass) -> usize {
        self.initial_size(class)
            - self.susceptible_count(class)
            - self.status_count(class, Status::Recovered)
            - self.status_count(class, Status::RecoveredViaVaccination)
    }

    /// Members of `class` that have ever been infected. Vaccinating a susceptible removes it
    /// from the susceptible pool without infecting it, so those are excluded.
    #[must_use]
    pub fn class_ever_infected(&self, class: PopulationClass) -> usize {
        self.initial_size(class)
            - self.susceptible_count(class)
            - self.status_count(class, Status::RecoveredViaVaccination)
    }

    /// Moves `entity_id` to `next`, updating every pool and counter.
    pub fn transition(&mut self, entity_id: EntityId, next: Status) {
        let entity = &self.entities[entity_id.0];
        let (class, previous) = (entity.class(), entity.status());
        assert!(
            previous.can_transition_to(next),
            "{entity_id} cannot move from {previous:?} to {next:?}"
        );

        self.detach(entity_id, class, previous);
        self.entities[entity_id.0].status = next;
        self.attach(entity_id, class, next);

        let counts = &mut self.status_counts[class.index()];
        counts[status_slot(previous)] -= 1;
        counts[status_slot(next)] += 1;
    }

    fn attach(&mut self, entity_id: EntityId, class: PopulationClass, status: Status) {
        let k = class.index();
        match status {
            Status::Susceptible => enroll(&mut self.susceptible[k], entity_id, "susceptible"),
            Status::InfectedAsymptomatic => {
                enroll(&mut self.asymptomatic[k], entity_id, "asymptomatic");
                enroll(&mut self.infected, entity_id, "infected");
            }
            Status::InfectedSymptomatic => {
                enroll(&mut self.symptomatic, entity_id, "symptomatic");
                enroll(&mut self.infected, entity_id, "infected");
            }
            Status::Recovered | Status::RecoveredViaVaccination => self.recovered.push(entity_id),
        }
        if status.is_vaccination_eligible() {
            enroll(&mut self.eligible[k], entity_id, "class eligible");
            enroll(&mut self.eligible_total, entity_id, "eligible total");
        }
    }

    fn detach(&mut self, entity_id: EntityId, class: PopulationClass, status: Status) {
        let k = class.index();
        match status {
            Status::Susceptible => withdraw(&mut self.susceptible[k], entity_id, "susceptible"),
            Status::InfectedAsymptomatic => {
                withdraw(&mut self.asymptomatic[k], entity_id, "asymptomatic");
                withdraw(&mut self.infected, entity_id, "infected");
            }
            Status::InfectedSymptomatic => {
                withdraw(&mut self.symptomatic, entity_id, "symptomatic");
                withdraw(&mut self.infected, entity_id, "infected");
            }
            Status::Recovered | Status::RecoveredViaVaccination => {
                unreachable!("{entity_id} is recovered and cannot leave the recovered pool")
            }
        }
        if status.is_vaccination_eligible() {
            withdraw(&mut self.eligible[k], entity_id, "class eligible");
            withdraw(&mut self.eligible_total, entity_id, "eligible total");
        }
    }

    /// Full consistency check: pool membership against status, counters against pools, and
    /// per-class conservation. Linear in the population; the event loop only calls it in debug
    /// builds. Panics on the first violation.
    pub fn check_invariants(&self) {
        let mut counted: ClassArray<[usize; NUM_STATUSES]> = [[0; NUM_STATUSES]; NUM_CLASSES];

        for (entity_id, entity) in self.entities() {
            let k = entity.class().index();
            let status = entity.status();
            counted[k][status_slot(status)] += 1;

            let expected = [
                ("susceptible", status == Status::Susceptible, self.susceptible[k].contains(entity_id)),
                ("asymptomatic", status == Status::InfectedAsymptomatic, self.asymptomatic[k].contains(entity_id)),
                ("symptomatic", status == Status::InfectedSymptomatic, self.symptomatic.contains(entity_id)),
                ("infected", status.is_infected(), self.infected.contains(entity_id)),
                ("class eligible", status.is_vaccination_eligible(), self.eligible[k].contains(entity_id)),
                ("eligible total", status.is_vaccination_eligible(), self.eligible_total.contains(entity_id)),
            ];
            for (pool_name, should_be_member, is_member) in expected {
                assert_eq!(
                    should_be_member, is_member,
                    "{entity_id} with status {status:?} has wrong membership in the {pool_name} pool"
                );
            }
        }

        assert_eq!(counted, self.status_counts, "status counters out of sync");

        for class in PopulationClass::ALL {
            let total: usize = self.status_counts[class.index()].iter().sum();
            assert_eq!(
                total,
                self.initial_size(class),
                "population of {class} not conserved"
            );
        }

        let recovered: usize = self
            .status_counts
            .iter()
            .map(|counts| counts[status_slot(Status::Recovered)] + counts[status_slot(Status::RecoveredViaVaccination)])
            .sum();
        assert_eq!(recovered, self.recovered.len(), "recovered pool out of sync");
    }
}

pub trait ContextPopulationExt {
    /// Builds the population described by the run parameters and infects (asymptomatically)
    /// the first entity of the seed class. Returns the seeded entity. Replaces any existing
    /// population, and with it the clock and the recorded history of the previous run.
    fn init_population(&mut self) -> Result<EntityId, SirvError>;

    fn get_population(&self) -> Option<&PopulationData>;

    /// Mutable access to the population, creating an empty one if none exists yet.
    fn get_population_mut(&mut self) -> &mut PopulationData;

    /// Draws a member of `pool` uniformly at random using the `R` stream, or `None` if the pool
    /// is empty.
    fn sample_entity<R: RngId>(&mut self, pool: PoolKind) -> Option<EntityId>
    where
        R::RngType: rand::Rng;

    fn transition_entity(&mut self, entity_id: EntityId, next: Status);
}

impl ContextPopulationExt for Context {
    fn init_population(&mut self) -> Result<EntityId, SirvError> {
        let parameters = self.get_parameters()?;
        let class_sizes = parameters.class_sizes;
        let seed_class = parameters.seed_infected_class;

        let mut population = PopulationData::new(class_sizes);
        let seed = population.first_of_class(seed_class).ok_or_else(|| {
            SirvError::InvalidConfig(format!("seed class {seed_class} has no members"))
        })?;
        population.transition(seed, Status::InfectedAsymptomatic);
        debug!(
            "created population of {} with sizes {class_sizes:?}; seeded {seed} in {seed_class}",
            population.entity_count()
        );

        *self.get_data_container_mut::<PopulationData>() = population;
        self.reset_time();
        self.remove_data_container::<HistoryData>();
        Ok(seed)
    }

    fn get_population(&self) -> Option<&PopulationData> {
        self.get_data_container::<PopulationData>()
    }

    fn get_population_mut(&mut self) -> &mut PopulationData {
        self.get_data_container_mut::<PopulationData>()
    }

    fn sample_entity<R: RngId>(&mut self, pool: PoolKind) -> Option<EntityId>
    where
        R::RngType: rand::Rng,
    {
        let size = self.get_population_mut().pool(pool).len();
        if size == 0 {
            return None;
        }
        let position = self.sample_range::<R, _, usize>(0..size);
        self.get_population_mut().pool(pool).get(position)
    }

    fn transition_entity(&mut self, entity_id: EntityId, next: Status) {
        self.get_population_mut().transition(entity_id, next);
    }
}
