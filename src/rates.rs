/*!

Instantaneous hazards of the competing event types. Every hazard is a product of pool sizes and
parameters, so computing them never scans the population.

*/

use crate::{
    class::{ClassArray, NUM_CLASSES, PopulationClass},
    context::Context,
    error::SirvError,
    parameters::{ContextParametersExt, Parameters},
    population::ContextPopulationExt,
    population::PopulationData,
};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Hazards {
    /// Infection hazard of each class.
    pub infection: ClassArray<f64>,
    pub vaccination: f64,
    pub recovery: f64,
}

impl Hazards {
    /// Computes the hazards for the current population:
    ///
    /// * infection of class `k`: `Σ_j contact[k][j]·|S_k|·|Ia_j|`, plus
    ///   `λ_s·|S_C1|·|Is|` for the medical class only;
    /// * recovery: `recovery_rate·|infected|`;
    /// * vaccination: `arrival_rate / batch_size` while anyone is eligible, otherwise zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(population: &PopulationData, parameters: &Parameters) -> Self {
        let asymptomatic: ClassArray<f64> =
            PopulationClass::ALL.map(|class| population.asymptomatic_count(class) as f64);
        let symptomatic = population.symptomatic_count() as f64;

        let mut infection = [0.0; NUM_CLASSES];
        for class in PopulationClass::ALL {
            let k = class.index();
            let susceptible = population.susceptible_count(class) as f64;

            let mut hazard: f64 = (0..NUM_CLASSES)
                .map(|j| parameters.contact_rates[k][j] * susceptible * asymptomatic[j])
                .sum();
            if class == PopulationClass::Medical {
                hazard += parameters.symptomatic_medical_contact_rate * susceptible * symptomatic;
            }
            infection[k] = hazard;
        }

        let infected: f64 = asymptomatic.iter().sum::<f64>() + symptomatic;
        let recovery = parameters.recovery_rate * infected;

        // A constant batch-arrival rate, independent of how many are eligible.
        let vaccination = if population.eligible_count() > 0 {
            parameters.vaccination_arrival_rate / parameters.vaccination_batch_size as f64
        } else {
            0.0
        };

        Hazards {
            infection,
            vaccination,
            recovery,
        }
    }

    /// The hazards in event-selection order: infection of C1..C4, vaccination, recovery.
    #[must_use]
    pub fn in_selection_order(&self) -> [f64; NUM_CLASSES + 2] {
        let [c1, c2, c3, c4] = self.infection;
        [c1, c2, c3, c4, self.vaccination, self.recovery]
    }

    /// Total hazard, summed in selection order so that it equals the last cumulative boundary
    /// used by event selection.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.in_selection_order().iter().sum()
    }

    /// No event can happen.
    #[must_use]
    pub fn is_absorbing(&self) -> bool {
        self.total() == 0.0
    }
}

pub trait ContextHazardsExt {
    /// Hazards of the current population under the run parameters.
    fn compute_hazards(&self) -> Result<Hazards, SirvError>;
}

impl ContextHazardsExt for Context {
    fn compute_hazards(&self) -> Result<Hazards, SirvError> {
        let parameters = self.get_parameters()?;
        let population = self
            .get_population()
            .ok_or(SirvError::PopulationNotInitialized)?;
        Ok(Hazards::compute(population, parameters))
    }
}
