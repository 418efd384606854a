/*!

The driver loop. Repeatedly computes hazards, draws the waiting time and the next event, applies
it and records a history entry, until the time horizon is reached, no event is possible any more,
or the event budget runs out.

```rust,no_run
use ixa_sirv::{Parameters, simulate};

let result = simulate(Parameters::default(), 42).unwrap();
println!("{} events, ended at t = {}", result.event_count, result.final_time);
```

*/

use rand_distr::Exp;
use serde::Serialize;

use crate::{
    class::{ClassArray, PopulationClass},
    context::{Context, DataPlugin},
    define_rng,
    entity::Status,
    error::SirvError,
    events::{AppliedEvent, ContextEventsExt, EventKind},
    log::{debug, info, warn},
    parameters::{ContextParametersExt, Parameters},
    population::ContextPopulationExt,
    random::ContextRandomExt,
    rates::ContextHazardsExt,
};

// The single stream behind every draw of a run: waiting times, event choice, entity choice and
// symptom outcome.
define_rng!(EventRng);

/// The state of the epidemic right after one event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryRecord {
    /// Simulation time of the event.
    pub time: f64,
    /// Size of the all-infected pool.
    pub total_infected: usize,
    /// Per class: initial size minus susceptible minus recovered, i.e. currently infected.
    pub class_infected: ClassArray<usize>,
    /// Per class: initial size minus susceptible minus vaccinated susceptibles. Never decreases.
    pub class_ever_infected: ClassArray<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The clock reached the time horizon.
    HorizonReached,
    /// The total hazard is zero, so no further event can occur.
    Absorbed,
    /// `max_events` events were applied without either of the above.
    EventBudgetExhausted,
}

/// Outcome of a single step of the loop.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Applied(AppliedEvent),
    Stopped(Termination),
}

/// Everything a consumer of a finished run gets to see.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub history: Vec<HistoryRecord>,
    /// Per class, entities in `Recovered`: natural recoveries and vaccinated undetected cases.
    pub recovered_natural: ClassArray<usize>,
    /// Per class, susceptibles moved to `RecoveredViaVaccination`.
    pub recovered_vaccinated: ClassArray<usize>,
    /// Per class, entities infected at any point of the run.
    pub ever_infected: ClassArray<usize>,
    /// Time of the last applied event (zero if none was applied).
    pub final_time: f64,
    pub event_count: u64,
    pub termination: Termination,
}

impl SimulationResult {
    #[must_use]
    pub fn total_ever_infected(&self) -> usize {
        self.ever_infected.iter().sum()
    }

    #[must_use]
    pub fn total_vaccinated(&self) -> usize {
        self.recovered_vaccinated.iter().sum()
    }

    /// Size of the infected pool after the last event, or `None` if no event happened.
    #[must_use]
    pub fn final_infected(&self) -> Option<usize> {
        self.history.last().map(|record| record.total_infected)
    }
}

pub(crate) struct HistoryData {
    records: Vec<HistoryRecord>,
}

impl DataPlugin for HistoryData {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| HistoryData { records: Vec::new() };
}

pub trait ContextSimulationExt {
    /// Appends a record of the current population to the history.
    fn record_history(&mut self);

    fn get_history(&self) -> &[HistoryRecord];

    /// Runs one iteration of the loop: either applies and records one event, or reports why the
    /// run is over. Requires parameters, a seeded random source and a population.
    fn step(&mut self) -> Result<StepOutcome, SirvError>;

    /// Steps until the run terminates and collects the result. Initializes the population from
    /// the parameters if none exists yet.
    fn run_simulation(&mut self) -> Result<SimulationResult, SirvError>;
}

impl ContextSimulationExt for Context {
    fn record_history(&mut self) {
        let time = self.get_current_time();
        let Some(population) = self.get_population() else {
            return;
        };

        let record = HistoryRecord {
            time,
            total_infected: population.infected_count(),
            class_infected: PopulationClass::ALL.map(|class| population.class_infected(class)),
            class_ever_infected: PopulationClass::ALL
                .map(|class| population.class_ever_infected(class)),
        };
        self.get_data_container_mut::<HistoryData>()
            .records
            .push(record);
    }

    fn get_history(&self) -> &[HistoryRecord] {
        self.get_data_container::<HistoryData>()
            .map(|history| history.records.as_slice())
            .unwrap_or(&[])
    }

    fn step(&mut self) -> Result<StepOutcome, SirvError> {
        if !self.is_random_initialized() {
            return Err(SirvError::RandomNotInitialized);
        }
        let parameters = self.get_parameters()?;
        let (time_horizon, max_events) = (parameters.time_horizon, parameters.max_events);

        if self.get_current_time() >= time_horizon {
            return Ok(StepOutcome::Stopped(Termination::HorizonReached));
        }

        let hazards = self.compute_hazards()?;
        if hazards.is_absorbing() {
            return Ok(StepOutcome::Stopped(Termination::Absorbed));
        }

        if self.get_history().len() as u64 >= max_events {
            return Ok(StepOutcome::Stopped(Termination::EventBudgetExhausted));
        }

        let total = hazards.total();
        let waiting_time = Exp::new(total).map_err(|error| {
            SirvError::InvalidConfig(format!("total hazard {total} is not a valid rate: {error}"))
        })?;
        let delta = self.sample_distr::<EventRng, f64>(waiting_time);
        self.advance_time(delta);

        let u = self.sample_range::<EventRng, _, f64>(0.0..1.0);
        let Some(event) = EventKind::select(&hazards, u) else {
            return Ok(StepOutcome::Stopped(Termination::Absorbed));
        };
        let applied = self.apply_event::<EventRng>(event)?;

        if cfg!(debug_assertions) {
            if let Some(population) = self.get_population() {
                population.check_invariants();
            }
        }
        self.record_history();

        Ok(StepOutcome::Applied(applied))
    }

    fn run_simulation(&mut self) -> Result<SimulationResult, SirvError> {
        if !self.is_random_initialized() {
            return Err(SirvError::RandomNotInitialized);
        }
        if self.get_population().is_none() {
            self.init_population()?;
        }
        let parameters = self.get_parameters()?;
        info!(
            "running SIRV simulation: {} entities, horizon {}, seed class {}",
            parameters.total_population(),
            parameters.time_horizon,
            parameters.seed_infected_class
        );

        let events_before = self.get_history().len();
        let termination = loop {
            match self.step()? {
                StepOutcome::Applied(_) => {}
                StepOutcome::Stopped(termination) => break termination,
            }
        };

        let result = collect_result(self, termination)?;
        match termination {
            Termination::EventBudgetExhausted => warn!(
                "event budget of {} exhausted at t = {}",
                result.event_count, result.final_time
            ),
            _ => debug!(
                "applied {} events this run",
                self.get_history().len() - events_before
            ),
        }
        info!(
            "simulation finished ({termination:?}) at t = {} after {} events; {} ever infected",
            result.final_time,
            result.event_count,
            result.total_ever_infected()
        );
        Ok(result)
    }
}

fn collect_result(context: &Context, termination: Termination) -> Result<SimulationResult, SirvError> {
    let population = context
        .get_population()
        .ok_or(SirvError::PopulationNotInitialized)?;
    let history = context.get_history().to_vec();

    Ok(SimulationResult {
        recovered_natural: PopulationClass::ALL
            .map(|class| population.status_count(class, Status::Recovered)),
        recovered_vaccinated: PopulationClass::ALL
            .map(|class| population.status_count(class, Status::RecoveredViaVaccination)),
        ever_infected: PopulationClass::ALL.map(|class| population.class_ever_infected(class)),
        final_time: context.get_current_time(),
        event_count: history.len() as u64,
        history,
        termination,
    })
}

/// Runs one complete simulation of `parameters` from `seed` in a fresh context.
pub fn simulate(parameters: Parameters, seed: u64) -> Result<SimulationResult, SirvError> {
    let mut context = Context::new();
    context.init_random(seed);
    context.set_parameters(parameters)?;
    context.init_population()?;
    context.run_simulation()
}
