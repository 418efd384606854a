//! A stochastic SIRV (susceptible, infected, recovered, vaccinated) epidemic simulator.
//!
//! The population is split into four fixed classes (medical workers, essential non-medical
//! workers, and high- and low-risk non-essential people). Infections spread through a symmetric
//! class contact matrix; medical workers are additionally exposed to symptomatic cases of every
//! class. Infected individuals are symptomatic with a per-class probability, recover at a constant
//! rate, and susceptible or undetected (asymptomatic) individuals are vaccinated in batches.
//!
//! The engine is an exact continuous-time Gillespie simulation. All state of a run lives in a
//! [`Context`]: parameters, population, recorded history and the random number stream, so runs
//! are reproducible from a seed and independent runs can execute in parallel.
//!
//! ```rust,no_run
//! use ixa_sirv::{Context, ContextParametersExt, ContextRandomExt, ContextSimulationExt, Parameters};
//!
//! let mut context = Context::new();
//! context.init_random(42);
//! context.set_parameters(Parameters::default()).unwrap();
//! let result = context.run_simulation().unwrap();
//! for record in &result.history {
//!     println!("{} {} {:?}", record.time, record.total_infected, record.class_infected);
//! }
//! ```

pub mod class;
pub mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod hashing;
pub mod log;
pub mod parameters;
pub mod pool;
pub mod population;
pub mod random;
pub mod rates;
pub mod simulation;

// All modules import `crate::TypeId` in case we want to change the underlying type of `TypeId`.
pub(crate) use std::any::TypeId;

#[inline(always)]
pub(crate) fn type_of<T: 'static>() -> TypeId {
    TypeId::of::<T>()
}

// Re-exported so `define_rng!` can name `$crate::rand` from downstream crates.
pub use rand;

pub use class::{ClassArray, NUM_CLASSES, PopulationClass};
pub use context::Context;
pub use entity::{Entity, EntityId, Status};
pub use error::SirvError;
pub use events::{AppliedEvent, ContextEventsExt, EventKind};
pub use parameters::{ContextParametersExt, ParameterFile, Parameters};
pub use population::{ContextPopulationExt, PoolKind, PopulationData};
pub use random::{ContextRandomExt, RngId};
pub use rates::{ContextHazardsExt, Hazards};
pub use simulation::{
    ContextSimulationExt, HistoryRecord, SimulationResult, StepOutcome, Termination, simulate,
};
