/*!

Event selection and application, the heart of the stochastic simulation algorithm.

Given the hazards, [`EventKind::select`] maps a uniform variate to the event whose interval
contains it, and [`ContextEventsExt::apply_event`] carries the chosen event out on the population.
Every random draw is taken from the single stream `R` handed in by the caller.

*/

use rand::Rng;

use crate::{
    class::PopulationClass,
    context::Context,
    entity::{EntityId, Status},
    error::SirvError,
    log::trace,
    parameters::ContextParametersExt,
    population::{ContextPopulationExt, PoolKind},
    random::{ContextRandomExt, RngId},
    rates::Hazards,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A susceptible of the given class is infected.
    Infection(PopulationClass),
    /// A batch of eligible individuals is vaccinated.
    Vaccination,
    /// An infected individual recovers.
    Recovery,
}

impl EventKind {
    /// The order in which `[0, 1)` is partitioned. Must match `Hazards::in_selection_order`.
    pub const SELECTION_ORDER: [EventKind; 6] = [
        EventKind::Infection(PopulationClass::Medical),
        EventKind::Infection(PopulationClass::EssentialNonMedical),
        EventKind::Infection(PopulationClass::HighRisk),
        EventKind::Infection(PopulationClass::LowRisk),
        EventKind::Vaccination,
        EventKind::Recovery,
    ];

    /// Picks the event whose interval contains `u ∈ [0, 1)`. Intervals are sized by the
    /// hazards in selection order, so `u` selects event `i` when
    /// `Σ_{j<i} h_j ≤ u·total < Σ_{j≤i} h_j`.
    ///
    /// Events with zero hazard are never chosen, even if rounding puts `u·total` on their
    /// (empty) interval, and if rounding pushes `u·total` past the last boundary the last event
    /// with positive hazard is chosen. Returns `None` only when the total hazard is zero.
    #[must_use]
    pub fn select(hazards: &Hazards, u: f64) -> Option<EventKind> {
        let total = hazards.total();
        if total <= 0.0 || total.is_nan() {
            return None;
        }

        let target = u * total;
        let mut cumulative = 0.0;
        let mut last_possible = None;
        for (event, hazard) in Self::SELECTION_ORDER
            .into_iter()
            .zip(hazards.in_selection_order())
        {
            if hazard <= 0.0 {
                continue;
            }
            cumulative += hazard;
            last_possible = Some(event);
            if target < cumulative {
                return Some(event);
            }
        }

        last_possible
    }
}

/// What an applied event did, for logging and inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppliedEvent {
    Infection {
        entity_id: EntityId,
        class: PopulationClass,
        symptomatic: bool,
    },
    Vaccination {
        /// Susceptibles moved to `RecoveredViaVaccination`.
        immunized: Vec<EntityId>,
        /// Undetected asymptomatic cases moved to `Recovered`.
        removed: Vec<EntityId>,
    },
    Recovery {
        entity_id: EntityId,
    },
}

pub trait ContextEventsExt {
    /// Carries out `event`, drawing every random number from the `R` stream.
    ///
    /// Panics if the pool the event draws from is empty; the hazard of such an event is zero,
    /// so it can only be selected through a bug.
    fn apply_event<R: RngId>(&mut self, event: EventKind) -> Result<AppliedEvent, SirvError>
    where
        R::RngType: Rng;
}

fn draw_member<R: RngId>(context: &mut Context, pool: PoolKind, event: EventKind) -> EntityId
where
    R::RngType: Rng,
{
    context
        .sample_entity::<R>(pool)
        .unwrap_or_else(|| panic!("{event:?} selected but the {pool:?} pool is empty"))
}

impl ContextEventsExt for Context {
    fn apply_event<R: RngId>(&mut self, event: EventKind) -> Result<AppliedEvent, SirvError>
    where
        R::RngType: Rng,
    {
        let applied = match event {
            EventKind::Infection(class) => {
                let probability = self.get_parameters()?.symptomatic_probability[class.index()];
                let entity_id = draw_member::<R>(self, PoolKind::Susceptible(class), event);
                let symptomatic = self.sample_bool::<R>(probability);
                let next = if symptomatic {
                    Status::InfectedSymptomatic
                } else {
                    Status::InfectedAsymptomatic
                };
                self.transition_entity(entity_id, next);
                AppliedEvent::Infection {
                    entity_id,
                    class,
                    symptomatic,
                }
            }

            EventKind::Vaccination => {
                let batch_size = self.get_parameters()?.vaccination_batch_size;
                let eligible = self.get_population_mut().eligible_count();
                let doses = batch_size.min(eligible);

                let mut immunized = Vec::new();
                let mut removed = Vec::new();
                for _ in 0..doses {
                    let entity_id = draw_member::<R>(self, PoolKind::VaccinationEligible, event);
                    match self.get_population_mut().entity(entity_id).status() {
                        Status::Susceptible => {
                            self.transition_entity(entity_id, Status::RecoveredViaVaccination);
                            immunized.push(entity_id);
                        }
                        // An undetected case counts as a natural removal.
                        Status::InfectedAsymptomatic => {
                            self.transition_entity(entity_id, Status::Recovered);
                            removed.push(entity_id);
                        }
                        status => unreachable!("{entity_id} with status {status:?} was eligible"),
                    }
                }
                AppliedEvent::Vaccination { immunized, removed }
            }

            EventKind::Recovery => {
                let entity_id = draw_member::<R>(self, PoolKind::Infected, event);
                self.transition_entity(entity_id, Status::Recovered);
                AppliedEvent::Recovery { entity_id }
            }
        };

        trace!("t = {:.6}: {applied:?}", self.get_current_time());
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{define_rng, parameters::Parameters};
    use PopulationClass::*;

    define_rng!(EventTestRng);

    fn hazards(values: [f64; 6]) -> Hazards {
        let [c1, c2, c3, c4, vaccination, recovery] = values;
        Hazards {
            infection: [c1, c2, c3, c4],
            vaccination,
            recovery,
        }
    }

    fn context_with(parameters: Parameters) -> Context {
        let mut context = Context::new();
        context.init_random(8675309);
        context.set_parameters(parameters).unwrap();
        context.init_population().unwrap();
        context
    }

    #[test]
    fn select_partitions_in_order() {
        let h = hazards([1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(EventKind::select(&h, 0.0), Some(Infection(Medical)));
        assert_eq!(EventKind::select(&h, 0.124), Some(Infection(Medical)));
        assert_eq!(EventKind::select(&h, 0.125), Some(Infection(EssentialNonMedical)));
        assert_eq!(EventKind::select(&h, 0.3), Some(Infection(HighRisk)));
        assert_eq!(EventKind::select(&h, 0.45), Some(Infection(LowRisk)));
        assert_eq!(EventKind::select(&h, 0.5), Some(EventKind::Vaccination));
        assert_eq!(EventKind::select(&h, 0.74), Some(EventKind::Vaccination));
        assert_eq!(EventKind::select(&h, 0.75), Some(EventKind::Recovery));
        assert_eq!(EventKind::select(&h, 0.999_999), Some(EventKind::Recovery));
    }

    use EventKind::Infection;

    #[test]
    fn select_skips_empty_intervals() {
        let h = hazards([0.0, 3.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(EventKind::select(&h, 0.0), Some(Infection(EssentialNonMedical)));
        assert_eq!(EventKind::select(&h, 0.75), Some(EventKind::Recovery));
    }

    #[test]
    fn select_clamps_past_the_last_boundary() {
        // Recovery is impossible, so an out-of-range variate must fall back to vaccination.
        let h = hazards([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(EventKind::select(&h, 1.0), Some(EventKind::Vaccination));
        assert_eq!(EventKind::select(&h, 1.5), Some(EventKind::Vaccination));
    }

    #[test]
    fn select_nothing_when_absorbing() {
        assert_eq!(EventKind::select(&Hazards::default(), 0.3), None);
    }

    #[test]
    fn infection_is_symptomatic_with_certainty() {
        let mut parameters = Parameters::default();
        parameters.symptomatic_probability = [1.0; 4];
        let mut context = context_with(parameters);

        let applied = context
            .apply_event::<EventTestRng>(Infection(LowRisk))
            .unwrap();
        let AppliedEvent::Infection { entity_id, class, symptomatic } = applied else {
            panic!("expected an infection, got {applied:?}");
        };
        assert_eq!(class, LowRisk);
        assert!(symptomatic);

        let population = context.get_population().unwrap();
        assert_eq!(population.entity(entity_id).status(), Status::InfectedSymptomatic);
        assert!(!population.is_vaccination_eligible(entity_id));
        population.check_invariants();
    }

    #[test]
    fn infection_is_asymptomatic_with_certainty() {
        let mut parameters = Parameters::default();
        parameters.symptomatic_probability = [0.0; 4];
        let mut context = context_with(parameters);

        let applied = context.apply_event::<EventTestRng>(Infection(Medical)).unwrap();
        let AppliedEvent::Infection { entity_id, symptomatic, .. } = applied else {
            panic!("expected an infection, got {applied:?}");
        };
        assert!(!symptomatic);
        let population = context.get_population().unwrap();
        assert_eq!(population.asymptomatic_count(Medical), 1);
        assert!(population.is_vaccination_eligible(entity_id));
    }

    #[test]
    fn symptom_probability_is_taken_from_the_infected_class() {
        let mut parameters = Parameters::default();
        parameters.symptomatic_probability = [0.0, 1.0, 0.0, 1.0];
        let mut context = context_with(parameters);

        for class in PopulationClass::ALL {
            for _ in 0..5 {
                let applied = context.apply_event::<EventTestRng>(Infection(class)).unwrap();
                let AppliedEvent::Infection { class: infected_class, symptomatic, .. } = applied
                else {
                    panic!("expected an infection, got {applied:?}");
                };
                assert_eq!(infected_class, class);
                assert_eq!(symptomatic, class.index() % 2 == 1, "{class}");
            }
        }

        let population = context.get_population().unwrap();
        assert_eq!(population.symptomatic_count(), 10);
        assert_eq!(population.asymptomatic_count(Medical), 5);
        assert_eq!(population.asymptomatic_count(HighRisk), 5);
        // Only the seed stays undetected in C2.
        assert_eq!(population.asymptomatic_count(EssentialNonMedical), 1);
        assert_eq!(population.asymptomatic_count(LowRisk), 0);
        population.check_invariants();
    }

    #[test]
    fn vaccination_batch_is_clamped_to_the_eligible_pool() {
        let mut parameters = Parameters::default();
        parameters.class_sizes = [2, 2, 2, 2];
        parameters.vaccination_batch_size = 100;
        let mut context = context_with(parameters);

        let applied = context
            .apply_event::<EventTestRng>(EventKind::Vaccination)
            .unwrap();
        let AppliedEvent::Vaccination { immunized, removed } = applied else {
            panic!("expected a vaccination, got {applied:?}");
        };
        // Seven susceptibles plus the asymptomatic seed.
        assert_eq!(immunized.len(), 7);
        assert_eq!(removed.len(), 1);

        let population = context.get_population().unwrap();
        assert_eq!(population.eligible_count(), 0);
        assert_eq!(population.infected_count(), 0);
        // The vaccinated seed is credited as a natural recovery.
        let seed = population.first_of_class(EssentialNonMedical).unwrap();
        assert_eq!(population.entity(seed).status(), Status::Recovered);
        population.check_invariants();
    }

    #[test]
    fn vaccination_takes_exactly_one_batch() {
        let mut parameters = Parameters::default();
        parameters.vaccination_batch_size = 10;
        let mut context = context_with(parameters);
        let before = context.get_population().unwrap().eligible_count();

        context
            .apply_event::<EventTestRng>(EventKind::Vaccination)
            .unwrap();
        assert_eq!(context.get_population().unwrap().eligible_count(), before - 10);
    }

    #[test]
    fn recovery_removes_an_infected() {
        let mut context = context_with(Parameters::default());
        let applied = context
            .apply_event::<EventTestRng>(EventKind::Recovery)
            .unwrap();
        let population = context.get_population().unwrap();
        assert_eq!(
            applied,
            AppliedEvent::Recovery {
                entity_id: population.first_of_class(EssentialNonMedical).unwrap()
            }
        );
        assert_eq!(population.infected_count(), 0);
        assert_eq!(population.recovered_count(), 1);
    }

    #[test]
    #[should_panic(expected = "pool is empty")]
    fn recovery_with_no_infected_is_a_bug() {
        let mut context = context_with(Parameters::default());
        context
            .apply_event::<EventTestRng>(EventKind::Recovery)
            .unwrap();
        context
            .apply_event::<EventTestRng>(EventKind::Recovery)
            .unwrap();
    }
}
