//! NEWS clinical risk categories.
//!
//! [`Risk`] fixes both the observation values written for a patient and how often they are
//! observed. [`RiskDistribution`] hands categories out to patients in a fixed order until the
//! configured counts run out.

use crate::GeneratorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    High,
    Medium,
    Low,
    #[serde(rename = "none")]
    NoRisk,
}

/// Values recorded on a completed NEWS observation.
///
/// Everything except `avpu_text` is written as an `eval` attribute, so booleans use the
/// loader's `True`/`False` spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservationValues {
    pub respiration_rate: &'static str,
    pub indirect_oxymetry_spo2: &'static str,
    pub oxygen_administration_flag: &'static str,
    pub body_temperature: &'static str,
    pub blood_pressure_systolic: &'static str,
    pub blood_pressure_diastolic: &'static str,
    pub pulse_rate: &'static str,
    pub avpu_text: &'static str,
}

impl ObservationValues {
    /// `(field name, eval expression)` pairs in the order they are written.
    pub fn eval_fields(&self) -> [(&'static str, &'static str); 7] {
        [
            ("respiration_rate", self.respiration_rate),
            ("indirect_oxymetry_spo2", self.indirect_oxymetry_spo2),
            ("oxygen_administration_flag", self.oxygen_administration_flag),
            ("body_temperature", self.body_temperature),
            ("blood_pressure_systolic", self.blood_pressure_systolic),
            ("blood_pressure_diastolic", self.blood_pressure_diastolic),
            ("pulse_rate", self.pulse_rate),
        ]
    }
}

const HIGH_VALUES: ObservationValues = ObservationValues {
    respiration_rate: "15",
    indirect_oxymetry_spo2: "94",
    oxygen_administration_flag: "True",
    body_temperature: "40.5",
    blood_pressure_systolic: "120",
    blood_pressure_diastolic: "80",
    pulse_rate: "65",
    avpu_text: "V",
};

const MEDIUM_VALUES: ObservationValues = ObservationValues {
    respiration_rate: "15",
    indirect_oxymetry_spo2: "95",
    oxygen_administration_flag: "False",
    body_temperature: "40.5",
    blood_pressure_systolic: "120",
    blood_pressure_diastolic: "80",
    pulse_rate: "65",
    avpu_text: "A",
};

const LOW_VALUES: ObservationValues = ObservationValues {
    respiration_rate: "15",
    indirect_oxymetry_spo2: "99",
    oxygen_administration_flag: "False",
    body_temperature: "40.5",
    blood_pressure_systolic: "120",
    blood_pressure_diastolic: "80",
    pulse_rate: "65",
    avpu_text: "A",
};

const NO_RISK_VALUES: ObservationValues = ObservationValues {
    respiration_rate: "15",
    indirect_oxymetry_spo2: "99",
    oxygen_administration_flag: "False",
    body_temperature: "37.5",
    blood_pressure_systolic: "120",
    blood_pressure_diastolic: "80",
    pulse_rate: "65",
    avpu_text: "A",
};

impl Risk {
    /// Allocation order.
    pub const ALL: [Risk; 4] = [Risk::High, Risk::Medium, Risk::Low, Risk::NoRisk];

    pub fn as_str(self) -> &'static str {
        match self {
            Risk::High => "high",
            Risk::Medium => "medium",
            Risk::Low => "low",
            Risk::NoRisk => "none",
        }
    }

    /// Minutes between observations.
    pub fn interval_minutes(self) -> i64 {
        match self {
            Risk::High => 30,
            Risk::Medium => 60,
            Risk::Low => 240,
            Risk::NoRisk => 720,
        }
    }

    pub fn values(self) -> &'static ObservationValues {
        match self {
            Risk::High => &HIGH_VALUES,
            Risk::Medium => &MEDIUM_VALUES,
            Risk::Low => &LOW_VALUES,
            Risk::NoRisk => &NO_RISK_VALUES,
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Risk {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Risk::ALL
            .into_iter()
            .find(|risk| risk.as_str() == s.trim())
            .ok_or_else(|| GeneratorError::UnknownRisk(s.to_string()))
    }
}

/// Remaining number of patients per risk category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskDistribution {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub none: u32,
}

impl RiskDistribution {
    pub fn new(high: u32, medium: u32, low: u32, none: u32) -> Self {
        Self {
            high,
            medium,
            low,
            none,
        }
    }

    pub fn remaining(&self, risk: Risk) -> u32 {
        match risk {
            Risk::High => self.high,
            Risk::Medium => self.medium,
            Risk::Low => self.low,
            Risk::NoRisk => self.none,
        }
    }

    fn remaining_mut(&mut self, risk: Risk) -> &mut u32 {
        match risk {
            Risk::High => &mut self.high,
            Risk::Medium => &mut self.medium,
            Risk::Low => &mut self.low,
            Risk::NoRisk => &mut self.none,
        }
    }

    pub fn total(&self) -> u64 {
        Risk::ALL
            .into_iter()
            .map(|risk| u64::from(self.remaining(risk)))
            .sum()
    }

    /// Takes one patient's worth from the first category with a remaining count.
    ///
    /// Returns `None` once every category is exhausted.
    pub fn allocate(&mut self) -> Option<Risk> {
        let risk = Risk::ALL
            .into_iter()
            .find(|risk| self.remaining(*risk) > 0)?;
        *self.remaining_mut(risk) -= 1;
        Some(risk)
    }
}

impl FromStr for RiskDistribution {
    type Err = GeneratorError;

    /// Parses `high=2,medium=1,low=0,none=4`; omitted categories are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut distribution = RiskDistribution::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, count) = part.split_once('=').ok_or_else(|| {
                GeneratorError::InvalidInput(format!("expected <risk>=<count>, got '{part}'"))
            })?;
            let risk: Risk = name.parse()?;
            let count: u32 = count.trim().parse().map_err(|_| {
                GeneratorError::InvalidInput(format!("invalid count for {risk}: '{count}'"))
            })?;
            *distribution.remaining_mut(risk) = count;
        }
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_in_category_order() {
        let mut distribution = RiskDistribution::new(1, 1, 0, 1);
        assert_eq!(distribution.allocate(), Some(Risk::High));
        assert_eq!(distribution.allocate(), Some(Risk::Medium));
        assert_eq!(distribution.allocate(), Some(Risk::NoRisk));
        assert_eq!(distribution.allocate(), None);
    }

    #[test]
    fn exhausted_distribution_signals_none() {
        let mut distribution = RiskDistribution::new(1, 0, 0, 0);
        assert_eq!(distribution.allocate(), Some(Risk::High));
        assert_eq!(distribution, RiskDistribution::new(0, 0, 0, 0));
        assert_eq!(distribution.allocate(), None);
        assert_eq!(distribution.total(), 0);
    }

    #[test]
    fn intervals_match_risk() {
        let intervals: Vec<i64> = Risk::ALL.iter().map(|r| r.interval_minutes()).collect();
        assert_eq!(intervals, vec![30, 60, 240, 720]);
    }

    #[test]
    fn value_table_differs_by_risk() {
        assert_eq!(Risk::High.values().indirect_oxymetry_spo2, "94");
        assert_eq!(Risk::High.values().avpu_text, "V");
        assert_eq!(Risk::Medium.values().oxygen_administration_flag, "False");
        assert_eq!(Risk::NoRisk.values().body_temperature, "37.5");
        assert_eq!(Risk::Low.values().eval_fields().len(), 7);
    }

    #[test]
    fn parses_risk_names() {
        assert_eq!("none".parse::<Risk>().expect("risk"), Risk::NoRisk);
        assert!(matches!(
            "critical".parse::<Risk>(),
            Err(GeneratorError::UnknownRisk(_))
        ));
    }

    #[test]
    fn parses_distribution_spec() {
        let distribution: RiskDistribution = "high=2, low=3".parse().expect("distribution");
        assert_eq!(distribution, RiskDistribution::new(2, 0, 3, 0));
        assert!("high".parse::<RiskDistribution>().is_err());
        assert!("high=x".parse::<RiskDistribution>().is_err());
    }

    #[test]
    fn deserializes_distribution_from_yaml() {
        let distribution: RiskDistribution =
            serde_yaml::from_str("high: 1\nnone: 5\n").expect("yaml");
        assert_eq!(distribution, RiskDistribution::new(1, 0, 0, 5));
    }
}
