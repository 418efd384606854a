/*!

The four fixed population classes. Per-class data is stored in a [`ClassArray`] indexed by
[`PopulationClass::index`], so every lookup is an array access and a missing class is a compile
error rather than a missing map key.

*/

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SirvError;

/// Number of population classes.
pub const NUM_CLASSES: usize = 4;

/// One value per population class, indexed by [`PopulationClass::index`].
pub type ClassArray<T> = [T; NUM_CLASSES];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PopulationClass {
    /// C1: medical workers. The only class exposed to symptomatic cases.
    #[serde(rename = "C1")]
    Medical,
    /// C2: essential non-medical workers.
    #[serde(rename = "C2")]
    EssentialNonMedical,
    /// C3: non-essential, high risk.
    #[serde(rename = "C3")]
    HighRisk,
    /// C4: non-essential, low risk.
    #[serde(rename = "C4")]
    LowRisk,
}

impl PopulationClass {
    /// All classes in index order. Event selection relies on this order.
    pub const ALL: ClassArray<PopulationClass> = [
        PopulationClass::Medical,
        PopulationClass::EssentialNonMedical,
        PopulationClass::HighRisk,
        PopulationClass::LowRisk,
    ];

    #[must_use]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The short label used in configuration files and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PopulationClass::Medical => "C1",
            PopulationClass::EssentialNonMedical => "C2",
            PopulationClass::HighRisk => "C3",
            PopulationClass::LowRisk => "C4",
        }
    }
}

impl fmt::Display for PopulationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PopulationClass {
    type Err = SirvError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.label() == label)
            .ok_or_else(|| SirvError::InvalidConfig(format!("unknown class label {label:?}")))
    }
}
