use std::fmt;

use crate::class::PopulationClass;

/// Handle to an individual in the population arena. Pools hold handles, never entities.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    #[must_use]
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Epidemiological status of an individual.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Susceptible,
    /// Infected without symptoms. Undetected, so still offered vaccination.
    InfectedAsymptomatic,
    /// Infected with symptoms. Never vaccination eligible.
    InfectedSymptomatic,
    Recovered,
    RecoveredViaVaccination,
}

impl Status {
    #[must_use]
    pub fn is_infected(self) -> bool {
        matches!(self, Status::InfectedAsymptomatic | Status::InfectedSymptomatic)
    }

    #[must_use]
    pub fn is_recovered(self) -> bool {
        matches!(self, Status::Recovered | Status::RecoveredViaVaccination)
    }

    #[must_use]
    pub fn is_vaccination_eligible(self) -> bool {
        matches!(self, Status::Susceptible | Status::InfectedAsymptomatic)
    }

    /// The per-individual state machine. Both recovered states are absorbing.
    #[must_use]
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        matches!(
            (self, next),
            (Susceptible, InfectedAsymptomatic)
                | (Susceptible, InfectedSymptomatic)
                | (Susceptible, RecoveredViaVaccination)
                | (InfectedAsymptomatic, Recovered)
                | (InfectedAsymptomatic, RecoveredViaVaccination)
                | (InfectedSymptomatic, Recovered)
        )
    }
}

/// One individual. `class` is fixed at construction; only `status` changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    class: PopulationClass,
    pub(crate) status: Status,
}

impl Entity {
    #[must_use]
    pub fn new(class: PopulationClass) -> Self {
        Entity {
            class,
            status: Status::Susceptible,
        }
    }

    #[must_use]
    #[inline]
    pub fn class(&self) -> PopulationClass {
        self.class
    }

    #[must_use]
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }
}
