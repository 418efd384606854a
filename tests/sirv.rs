use std::collections::HashSet;
use std::io::Write;

use ixa_sirv::{
    AppliedEvent, Context, ContextParametersExt, ContextPopulationExt, ContextRandomExt,
    ContextSimulationExt, EntityId, Parameters, PopulationClass, SirvError, Status, StepOutcome,
    Termination, simulate,
};

fn no_vaccination() -> Parameters {
    Parameters {
        vaccination_arrival_rate: 0.0,
        ..Parameters::default()
    }
}

fn context_for(parameters: Parameters, seed: u64) -> Context {
    let mut context = Context::new();
    context.init_random(seed);
    context.set_parameters(parameters).unwrap();
    context.init_population().unwrap();
    context
}

#[test]
fn population_is_conserved_at_every_step() {
    let parameters = Parameters {
        class_sizes: [6, 8, 4, 30],
        vaccination_batch_size: 3,
        vaccination_arrival_rate: 20.0,
        ..Parameters::default()
    };
    let sizes = parameters.class_sizes;
    let mut context = context_for(parameters, 17);

    while let StepOutcome::Applied(_) = context.step().unwrap() {
        let population = context.get_population().unwrap();
        for class in PopulationClass::ALL {
            let counted: usize = [
                Status::Susceptible,
                Status::InfectedAsymptomatic,
                Status::InfectedSymptomatic,
                Status::Recovered,
                Status::RecoveredViaVaccination,
            ]
            .into_iter()
            .map(|status| population.status_count(class, status))
            .sum();
            assert_eq!(counted, sizes[class.index()], "{class} not conserved");
        }
    }
}

#[test]
fn ever_infected_never_decreases() {
    for seed in [1, 2, 3] {
        let result = simulate(Parameters::default(), seed).unwrap();
        for pair in result.history.windows(2) {
            for k in 0..4 {
                assert!(
                    pair[0].class_ever_infected[k] <= pair[1].class_ever_infected[k],
                    "seed {seed}: class {k} went from {} to {}",
                    pair[0].class_ever_infected[k],
                    pair[1].class_ever_infected[k]
                );
            }
        }
    }
}

#[test]
fn class_infected_matches_total_infected() {
    let result = simulate(Parameters::default(), 8).unwrap();
    for record in &result.history {
        assert_eq!(record.class_infected.iter().sum::<usize>(), record.total_infected);
        for k in 0..4 {
            assert!(record.class_infected[k] <= record.class_ever_infected[k]);
        }
    }
}

#[test]
fn without_vaccination_the_epidemic_dies_out() {
    for seed in 0..5 {
        let result = simulate(no_vaccination(), seed).unwrap();
        assert_eq!(result.termination, Termination::Absorbed);
        assert_eq!(result.final_infected(), Some(0));
        assert_eq!(result.total_vaccinated(), 0);
        // Every infection ends in a recovery, and every event is one or the other.
        let infections = result.total_ever_infected() as u64;
        assert_eq!(result.event_count, 2 * infections - 1);
    }
}

#[test]
fn same_seed_same_run() {
    let first = simulate(Parameters::default(), 1234).unwrap();
    let second = simulate(Parameters::default(), 1234).unwrap();
    assert_eq!(first, second);

    let other = simulate(Parameters::default(), 4321).unwrap();
    assert_ne!(first.history, other.history);
}

#[test]
fn symptomatic_cases_are_never_eligible_again() {
    let mut context = context_for(Parameters::default(), 99);
    let mut symptomatic: HashSet<EntityId> = HashSet::new();

    while let StepOutcome::Applied(applied) = context.step().unwrap() {
        if let AppliedEvent::Infection {
            entity_id,
            symptomatic: true,
            ..
        } = applied
        {
            symptomatic.insert(entity_id);
        }
        if let AppliedEvent::Vaccination { immunized, removed } = &applied {
            assert!(immunized.iter().all(|id| !symptomatic.contains(id)));
            assert!(removed.iter().all(|id| !symptomatic.contains(id)));
        }

        let population = context.get_population().unwrap();
        for &entity_id in &symptomatic {
            assert!(!population.is_vaccination_eligible(entity_id));
        }
    }
    assert!(!symptomatic.is_empty());
}

#[test]
fn oversized_batch_empties_the_eligible_pool() {
    let parameters = Parameters {
        class_sizes: [3, 3, 3, 3],
        vaccination_batch_size: 1000,
        vaccination_arrival_rate: 1.0e6,
        ..Parameters::default()
    };
    let mut context = context_for(parameters, 5);

    loop {
        match context.step().unwrap() {
            StepOutcome::Applied(AppliedEvent::Vaccination { immunized, removed }) => {
                assert!(!immunized.is_empty() || !removed.is_empty());
                assert_eq!(context.get_population().unwrap().eligible_count(), 0);
                break;
            }
            StepOutcome::Applied(_) => {}
            StepOutcome::Stopped(termination) => panic!("stopped before vaccinating: {termination:?}"),
        }
    }
}

#[test]
fn one_per_class_scenario() {
    for seed in 0..20 {
        let parameters = Parameters {
            class_sizes: [1, 1, 1, 1],
            seed_infected_class: PopulationClass::EssentialNonMedical,
            vaccination_arrival_rate: 0.0,
            ..Parameters::default()
        };
        let result = simulate(parameters, seed).unwrap();

        assert_eq!(result.termination, Termination::Absorbed);
        assert!(result.total_ever_infected() >= 1);
        assert!(result.total_ever_infected() <= 4);
        assert_eq!(result.ever_infected[PopulationClass::EssentialNonMedical.index()], 1);
        for record in &result.history {
            assert!(record.total_infected <= 4);
        }
    }
}

#[test]
fn absorbed_population_adds_no_history() {
    let mut context = context_for(no_vaccination(), 3);
    let ids: Vec<EntityId> = context
        .get_population()
        .unwrap()
        .entities()
        .map(|(entity_id, _)| entity_id)
        .collect();
    for entity_id in ids {
        let next = match context.get_population().unwrap().entity(entity_id).status() {
            Status::Susceptible => Status::RecoveredViaVaccination,
            _ => Status::Recovered,
        };
        context.transition_entity(entity_id, next);
    }

    let result = context.run_simulation().unwrap();
    assert_eq!(result.termination, Termination::Absorbed);
    assert!(result.history.is_empty());
    assert_eq!(result.event_count, 0);
}

#[test]
fn invalid_parameters_never_start_a_run() {
    let mut parameters = Parameters::default();
    parameters.symptomatic_probability[0] = -0.2;
    assert!(matches!(
        simulate(parameters, 1),
        Err(SirvError::InvalidConfig(_))
    ));
}

#[test]
fn scenario_from_file() {
    let json = r#"{
        "time_horizon": 1000.0,
        "seed_infected_class": "C1",
        "contact_rates": [
            [0.5, 0.1, 0.1, 0.1],
            [0.1, 0.5, 0.1, 0.1],
            [0.1, 0.1, 0.5, 0.1],
            [0.1, 0.1, 0.1, 0.5]
        ],
        "symptomatic_medical_contact_rate": 0.2,
        "recovery_rate": 1.0,
        "class_sizes": {"C1": 5, "C2": 5, "C3": 5, "C4": 5},
        "symptomatic_probability": {"C1": 0.5, "C2": 0.5, "C3": 0.5, "C4": 0.5},
        "vaccination_arrival_rate": 2.0,
        "vaccination_batch_size": 2,
        "max_events": 10000
    }"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let parameters = Parameters::load(file.path()).unwrap();
    assert_eq!(parameters.max_events, 10_000);
    let result = simulate(parameters, 77).unwrap();
    assert_ne!(result.termination, Termination::EventBudgetExhausted);
    // The seed can only leave the infected pools by recovering, naturally or by vaccination.
    assert!(result.ever_infected[PopulationClass::Medical.index()] >= 1);
}
