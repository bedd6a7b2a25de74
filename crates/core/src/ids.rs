//! Typed XML ids for demo records.
//!
//! Every id a generator writes is a pure function of the record kind, the patient key and (for
//! repeated events such as NEWS observations) a sequence number. Building them through
//! [`RecordId`] keeps the string scheme in one place and lets tests and reference checks parse
//! ids back into their parts.

use crate::{GeneratorError, GeneratorResult};
use std::fmt;
use std::str::FromStr;

/// The numeric part of `nhc_demo_patient_<n>`, kept as written (leading zeros included).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientKey(String);

impl PatientKey {
    pub fn new(digits: impl Into<String>) -> GeneratorResult<Self> {
        let digits = digits.into();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GeneratorError::InvalidInput(format!(
                "patient key must be decimal digits, got '{digits}'"
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Admission code, zero padded to four digits (`DEMO0007`).
    pub fn admission_code(&self) -> String {
        format!("DEMO{:0>4}", self.0)
    }
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Patient,
    SpellActivity,
    AdtAdmitActivity,
    AdtAdmit,
    AdmissionActivity,
    Admission,
    AdmitMoveActivity,
    AdmitMove,
    PlacementActivity,
    Placement,
    PlacementMoveActivity,
    PlacementMove,
    NewsActivity,
    News,
}

impl RecordKind {
    pub const ALL: [RecordKind; 14] = [
        RecordKind::Patient,
        RecordKind::SpellActivity,
        RecordKind::AdtAdmitActivity,
        RecordKind::AdtAdmit,
        RecordKind::AdmissionActivity,
        RecordKind::Admission,
        RecordKind::AdmitMoveActivity,
        RecordKind::AdmitMove,
        RecordKind::PlacementActivity,
        RecordKind::Placement,
        RecordKind::PlacementMoveActivity,
        RecordKind::PlacementMove,
        RecordKind::NewsActivity,
        RecordKind::News,
    ];

    fn prefix(self) -> &'static str {
        match self {
            RecordKind::Patient => "nhc_demo_patient_",
            RecordKind::SpellActivity => "nhc_activity_demo_spell_",
            RecordKind::AdtAdmitActivity => "nhc_activity_demo_adt_admit_",
            RecordKind::AdtAdmit => "nhc_demo_adt_admit_",
            RecordKind::AdmissionActivity => "nhc_activity_demo_admission_",
            RecordKind::Admission => "nhc_demo_admission_",
            RecordKind::AdmitMoveActivity => "nhc_activity_demo_admit_move_",
            RecordKind::AdmitMove => "nhc_demo_admit_move_",
            RecordKind::PlacementActivity => "nhc_activity_demo_placement_",
            RecordKind::Placement => "nhc_demo_placement_",
            RecordKind::PlacementMoveActivity => "nhc_activity_demo_placement_move_",
            RecordKind::PlacementMove => "nhc_demo_placement_move_",
            RecordKind::NewsActivity => "nhc_activity_demo_news_",
            RecordKind::News => "nhc_demo_news_",
        }
    }

    fn is_sequenced(self) -> bool {
        matches!(self, RecordKind::NewsActivity | RecordKind::News)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordId {
    kind: RecordKind,
    patient: PatientKey,
    sequence: Option<u32>,
}

impl RecordId {
    /// Id of a record that occurs once per patient.
    ///
    /// Sequenced kinds get sequence 0.
    pub fn new(kind: RecordKind, patient: &PatientKey) -> Self {
        Self {
            kind,
            patient: patient.clone(),
            sequence: kind.is_sequenced().then_some(0),
        }
    }

    /// Id of the `sequence`-th occurrence of a repeated event.
    pub fn sequenced(kind: RecordKind, patient: &PatientKey, sequence: u32) -> Self {
        Self {
            kind,
            patient: patient.clone(),
            sequence: kind.is_sequenced().then_some(sequence),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn patient(&self) -> &PatientKey {
        &self.patient
    }

    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    /// The id qualified with the module that defines it (`nh_clinical.nhc_demo_patient_1`).
    pub fn qualified(&self, module: &str) -> String {
        format!("{module}.{self}")
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(sequence) => write!(f, "{}{}_{}", self.kind.prefix(), self.patient, sequence),
            None => write!(f, "{}{}", self.kind.prefix(), self.patient),
        }
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

impl FromStr for RecordId {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for kind in RecordKind::ALL {
            let Some(rest) = s.strip_prefix(kind.prefix()) else {
                continue;
            };

            if kind.is_sequenced() {
                let Some((patient, sequence)) = rest.split_once('_') else {
                    continue;
                };
                let (Ok(patient), Ok(sequence)) =
                    (PatientKey::new(patient), sequence.parse::<u32>())
                else {
                    continue;
                };
                return Ok(Self::sequenced(kind, &patient, sequence));
            }

            if let Ok(patient) = PatientKey::new(rest) {
                return Ok(Self::new(kind, &patient));
            }
        }

        Err(GeneratorError::InvalidInput(format!(
            "'{s}' is not a demo record id"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(digits: &str) -> PatientKey {
        PatientKey::new(digits).expect("valid key")
    }

    #[test]
    fn formats_ids_from_parts() {
        let patient = key("12");
        assert_eq!(
            RecordId::new(RecordKind::Patient, &patient).to_string(),
            "nhc_demo_patient_12"
        );
        assert_eq!(
            RecordId::new(RecordKind::AdmitMoveActivity, &patient).to_string(),
            "nhc_activity_demo_admit_move_12"
        );
        assert_eq!(
            RecordId::sequenced(RecordKind::NewsActivity, &patient, 3).to_string(),
            "nhc_activity_demo_news_12_3"
        );
    }

    #[test]
    fn ids_are_deterministic() {
        let a = RecordId::sequenced(RecordKind::News, &key("4"), 9);
        let b = RecordId::sequenced(RecordKind::News, &key("4"), 9);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn parses_every_kind_back() {
        let patient = key("0042");
        for kind in RecordKind::ALL {
            let id = RecordId::sequenced(kind, &patient, 5);
            let parsed: RecordId = id.to_string().parse().expect("parse id");
            assert_eq!(parsed, id, "kind {kind:?}");
        }
    }

    #[test]
    fn distinguishes_overlapping_prefixes() {
        let parsed: RecordId = "nhc_demo_placement_move_3".parse().expect("parse");
        assert_eq!(parsed.kind(), RecordKind::PlacementMove);
        let parsed: RecordId = "nhc_demo_placement_3".parse().expect("parse");
        assert_eq!(parsed.kind(), RecordKind::Placement);
    }

    #[test]
    fn rejects_foreign_ids() {
        assert!("nhc_def_conf_location_wa".parse::<RecordId>().is_err());
        assert!("nhc_demo_patient_x1".parse::<RecordId>().is_err());
    }

    #[test]
    fn keeps_leading_zeros_and_pads_code() {
        let patient = key("007");
        assert_eq!(
            RecordId::new(RecordKind::Patient, &patient).to_string(),
            "nhc_demo_patient_007"
        );
        assert_eq!(patient.admission_code(), "DEMO0007");
        assert_eq!(key("12345").admission_code(), "DEMO12345");
    }

    #[test]
    fn qualifies_with_module() {
        let id = RecordId::new(RecordKind::Patient, &key("1"));
        assert_eq!(id.qualified("nh_clinical"), "nh_clinical.nhc_demo_patient_1");
    }
}
