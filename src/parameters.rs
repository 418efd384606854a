/*!

Run parameters.

[`Parameters`] is the validated, typed form the engine reads. [`ParameterFile`] is its JSON form,
with string class labels and a nested `Vec` contact matrix, so that a malformed file can be
reported field by field instead of failing inside serde with a type error. Both paths go through
[`Parameters::validate`].

*/

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    class::{ClassArray, NUM_CLASSES, PopulationClass},
    context::{Context, DataPlugin},
    error::SirvError,
    log::debug,
};

/// Default cap on applied events per run.
pub const DEFAULT_MAX_EVENTS: u64 = 100_000_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Simulation time horizon `T`.
    pub time_horizon: f64,
    /// Class of the single individual infected at time zero.
    pub seed_infected_class: PopulationClass,
    /// Symmetric contact-rate matrix; `contact_rates[k][j]` is the rate at which a susceptible of
    /// class `k` meets an asymptomatic infected of class `j`.
    pub contact_rates: ClassArray<ClassArray<f64>>,
    /// Contact rate between medical workers and symptomatic cases of any class.
    pub symptomatic_medical_contact_rate: f64,
    pub recovery_rate: f64,
    pub class_sizes: ClassArray<usize>,
    /// Probability that an infection of each class shows symptoms.
    pub symptomatic_probability: ClassArray<f64>,
    /// Rate of vaccination events. Zero disables vaccination.
    pub vaccination_arrival_rate: f64,
    /// Individuals vaccinated per vaccination event.
    pub vaccination_batch_size: usize,
    /// Hard cap on applied events.
    pub max_events: u64,
}

impl Default for Parameters {
    /// The reference scenario: a 323-person community with a small medical staff, an epidemic
    /// seeded in the essential workforce and aggressive batch vaccination.
    fn default() -> Self {
        const HIGH: f64 = 1.32;
        const LOW: f64 = 0.32;
        Parameters {
            time_horizon: 1.0e9,
            seed_infected_class: PopulationClass::EssentialNonMedical,
            contact_rates: [
                [HIGH, HIGH, LOW, LOW],
                [HIGH, HIGH, HIGH, HIGH],
                [LOW, HIGH, LOW, LOW],
                [LOW, HIGH, LOW, LOW],
            ],
            symptomatic_medical_contact_rate: 1.0,
            recovery_rate: 3.64,
            class_sizes: [16, 16, 16, 275],
            symptomatic_probability: [0.8, 0.65, 0.65, 0.60],
            vaccination_arrival_rate: 500.0,
            vaccination_batch_size: 50,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), SirvError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SirvError::InvalidConfig(format!(
            "{field} must be a finite non-negative number, got {value}"
        )))
    }
}

fn check_positive(field: &str, value: f64) -> Result<(), SirvError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SirvError::InvalidConfig(format!(
            "{field} must be a finite positive number, got {value}"
        )))
    }
}

fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 4.0 * f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

impl Parameters {
    /// Checks every field. A run never starts with parameters that fail this.
    pub fn validate(&self) -> Result<(), SirvError> {
        if self.time_horizon.is_nan() || self.time_horizon <= 0.0 {
            return Err(SirvError::InvalidConfig(format!(
                "time_horizon must be positive, got {}",
                self.time_horizon
            )));
        }

        for k in 0..NUM_CLASSES {
            for j in 0..NUM_CLASSES {
                let field = format!("contact_rates[{k}][{j}]");
                check_non_negative(&field, self.contact_rates[k][j])?;
                if !nearly_equal(self.contact_rates[k][j], self.contact_rates[j][k]) {
                    return Err(SirvError::InvalidConfig(format!(
                        "contact_rates must be symmetric: [{k}][{j}] = {} but [{j}][{k}] = {}",
                        self.contact_rates[k][j], self.contact_rates[j][k]
                    )));
                }
            }
        }

        check_non_negative(
            "symptomatic_medical_contact_rate",
            self.symptomatic_medical_contact_rate,
        )?;
        check_positive("recovery_rate", self.recovery_rate)?;
        check_non_negative("vaccination_arrival_rate", self.vaccination_arrival_rate)?;

        for class in PopulationClass::ALL {
            if self.class_sizes[class.index()] == 0 {
                return Err(SirvError::InvalidConfig(format!(
                    "class_sizes[{class}] must be positive"
                )));
            }
            let p = self.symptomatic_probability[class.index()];
            if !(0.0..=1.0).contains(&p) {
                return Err(SirvError::InvalidConfig(format!(
                    "symptomatic_probability[{class}] must lie in [0, 1], got {p}"
                )));
            }
        }

        if self.vaccination_batch_size == 0 {
            return Err("vaccination_batch_size must be positive".into());
        }
        if self.max_events == 0 {
            return Err("max_events must be positive".into());
        }

        Ok(())
    }

    #[must_use]
    pub fn class_size(&self, class: PopulationClass) -> usize {
        self.class_sizes[class.index()]
    }

    #[must_use]
    pub fn total_population(&self) -> usize {
        self.class_sizes.iter().sum()
    }

    /// Parses and validates parameters from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, SirvError> {
        let file: ParameterFile = serde_json::from_str(json)?;
        Parameters::try_from(file)
    }

    /// Reads, parses and validates a JSON parameter file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SirvError> {
        let path = path.as_ref();
        debug!("loading parameters from {}", path.display());
        let json = fs::read_to_string(path)?;
        Parameters::from_json_str(&json)
    }

    /// Serializes to the JSON file format.
    pub fn to_json_string(&self) -> Result<String, SirvError> {
        Ok(serde_json::to_string_pretty(&ParameterFile::from(self))?)
    }
}

/// The on-disk form of [`Parameters`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterFile {
    pub time_horizon: f64,
    pub seed_infected_class: String,
    pub contact_rates: Vec<Vec<f64>>,
    pub symptomatic_medical_contact_rate: f64,
    pub recovery_rate: f64,
    pub class_sizes: BTreeMap<String, i64>,
    pub symptomatic_probability: BTreeMap<String, f64>,
    pub vaccination_arrival_rate: f64,
    pub vaccination_batch_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_events: Option<u64>,
}

/// Converts a label-keyed map into a `ClassArray`, rejecting unknown and missing labels.
fn class_array<T: Copy>(
    field: &str,
    entries: &BTreeMap<String, T>,
) -> Result<ClassArray<T>, SirvError> {
    let mut values: ClassArray<Option<T>> = [None; NUM_CLASSES];
    for (label, value) in entries {
        let class: PopulationClass = label
            .parse()
            .map_err(|_| SirvError::InvalidConfig(format!("{field}: unknown class label {label:?}")))?;
        values[class.index()] = Some(*value);
    }

    let mut result: Vec<T> = Vec::with_capacity(NUM_CLASSES);
    for class in PopulationClass::ALL {
        let value = values[class.index()]
            .ok_or_else(|| SirvError::InvalidConfig(format!("{field}: missing entry for {class}")))?;
        result.push(value);
    }
    // The loop above pushed exactly `NUM_CLASSES` values.
    Ok(result.try_into().unwrap_or_else(|_| unreachable!()))
}

fn to_count(field: &str, value: i64) -> Result<usize, SirvError> {
    usize::try_from(value)
        .ok()
        .filter(|&count| count > 0)
        .ok_or_else(|| SirvError::InvalidConfig(format!("{field} must be positive, got {value}")))
}

impl TryFrom<ParameterFile> for Parameters {
    type Error = SirvError;

    fn try_from(file: ParameterFile) -> Result<Self, Self::Error> {
        let seed_infected_class: PopulationClass = file.seed_infected_class.parse()?;

        if file.contact_rates.len() != NUM_CLASSES
            || file.contact_rates.iter().any(|row| row.len() != NUM_CLASSES)
        {
            return Err(SirvError::InvalidConfig(format!(
                "contact_rates must be a {NUM_CLASSES}x{NUM_CLASSES} matrix"
            )));
        }
        let mut contact_rates = [[0.0; NUM_CLASSES]; NUM_CLASSES];
        for (k, row) in file.contact_rates.iter().enumerate() {
            contact_rates[k].copy_from_slice(row);
        }

        let raw_sizes = class_array("class_sizes", &file.class_sizes)?;
        let mut class_sizes = [0usize; NUM_CLASSES];
        for class in PopulationClass::ALL {
            class_sizes[class.index()] =
                to_count(&format!("class_sizes[{class}]"), raw_sizes[class.index()])?;
        }

        let parameters = Parameters {
            time_horizon: file.time_horizon,
            seed_infected_class,
            contact_rates,
            symptomatic_medical_contact_rate: file.symptomatic_medical_contact_rate,
            recovery_rate: file.recovery_rate,
            class_sizes,
            symptomatic_probability: class_array(
                "symptomatic_probability",
                &file.symptomatic_probability,
            )?,
            vaccination_arrival_rate: file.vaccination_arrival_rate,
            vaccination_batch_size: to_count("vaccination_batch_size", file.vaccination_batch_size)?,
            max_events: file.max_events.unwrap_or(DEFAULT_MAX_EVENTS),
        };
        parameters.validate()?;
        Ok(parameters)
    }
}

impl From<&Parameters> for ParameterFile {
    fn from(parameters: &Parameters) -> Self {
        let by_label = |values: &ClassArray<f64>| -> BTreeMap<String, f64> {
            PopulationClass::ALL
                .into_iter()
                .map(|class| (class.label().to_string(), values[class.index()]))
                .collect()
        };

        ParameterFile {
            time_horizon: parameters.time_horizon,
            seed_infected_class: parameters.seed_infected_class.label().to_string(),
            contact_rates: parameters.contact_rates.iter().map(|row| row.to_vec()).collect(),
            symptomatic_medical_contact_rate: parameters.symptomatic_medical_contact_rate,
            recovery_rate: parameters.recovery_rate,
            class_sizes: PopulationClass::ALL
                .into_iter()
                .map(|class| {
                    let size = i64::try_from(parameters.class_size(class)).unwrap_or(i64::MAX);
                    (class.label().to_string(), size)
                })
                .collect(),
            symptomatic_probability: by_label(&parameters.symptomatic_probability),
            vaccination_arrival_rate: parameters.vaccination_arrival_rate,
            vaccination_batch_size: i64::try_from(parameters.vaccination_batch_size)
                .unwrap_or(i64::MAX),
            max_events: Some(parameters.max_events),
        }
    }
}

struct ParametersPlugin {
    parameters: Option<Parameters>,
}

impl DataPlugin for ParametersPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| ParametersPlugin { parameters: None };
}

pub trait ContextParametersExt {
    /// Validates `parameters` and makes them the parameters of this run.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SirvError>;

    /// The parameters of this run, or `ParametersNotSet`.
    fn get_parameters(&self) -> Result<&Parameters, SirvError>;
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SirvError> {
        parameters.validate()?;
        self.get_data_container_mut::<ParametersPlugin>().parameters = Some(parameters);
        Ok(())
    }

    fn get_parameters(&self) -> Result<&Parameters, SirvError> {
        self.get_data_container::<ParametersPlugin>()
            .and_then(|plugin| plugin.parameters.as_ref())
            .ok_or(SirvError::ParametersNotSet)
    }
}
