//! Patient roster reading.
//!
//! A roster is an existing demo data file whose records are patients:
//!
//! ```xml
//! <record model="nh.clinical.patient" id="nhc_demo_patient_1">
//!     <field name="current_location_id" ref="nhc_def_conf_location_wa_b1"/>
//!     <field name="patient_identifier">NHS0000001</field>
//!     <field name="other_identifier">HOSNUM0001</field>
//! </record>
//! ```
//!
//! Each record is reduced to a [`PatientRecord`]; generators never look at the roster XML again.

use crate::constants::{
    BED_MARKER, LOCATION_FIELD, OTHER_IDENTIFIER_FIELD, PATIENT_IDENTIFIER_FIELD,
    PATIENT_ID_PATTERN, WARD_PATTERN,
};
use crate::ids::{PatientKey, RecordId, RecordKind};
use crate::{GeneratorError, GeneratorResult};
use openerp::FixtureDocument;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PATIENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PATIENT_ID_PATTERN).expect("PATIENT_ID_PATTERN: invalid regex"));

static WARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(WARD_PATTERN).expect("WARD_PATTERN: invalid regex"));

/// Reduces a bed reference to the ward it belongs to.
///
/// `nhc_def_conf_location_wa_bed3` becomes `nhc_def_conf_location_wa`; a ward reference is
/// returned unchanged.
///
/// # Errors
///
/// Returns [`GeneratorError::LocationMismatch`] if the reference does not start with a ward.
pub fn remove_bed(location: &str) -> GeneratorResult<&str> {
    WARD_RE
        .captures(location)
        .and_then(|caps| caps.get(1))
        .map(|ward| ward.as_str())
        .ok_or_else(|| GeneratorError::LocationMismatch(location.to_string()))
}

/// Whether a location reference names a bed rather than a ward.
pub fn is_bed_location(location: &str) -> bool {
    let tail_start = location
        .char_indices()
        .rev()
        .nth(5)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    location[tail_start..].contains(BED_MARKER)
}

/// Extracts the patient key from a roster record id.
pub fn patient_key_from_id(record_id: &str) -> GeneratorResult<PatientKey> {
    let digits = PATIENT_ID_RE
        .captures(record_id)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| GeneratorError::PatientIdMismatch(record_id.to_string()))?;
    PatientKey::new(digits.as_str())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientRecord {
    key: PatientKey,
    location: String,
    patient_identifier: Option<String>,
    other_identifier: Option<String>,
}

impl PatientRecord {
    pub fn new(key: PatientKey, location: impl Into<String>) -> Self {
        Self {
            key,
            location: location.into(),
            patient_identifier: None,
            other_identifier: None,
        }
    }

    pub fn with_identifiers(
        mut self,
        patient_identifier: Option<String>,
        other_identifier: Option<String>,
    ) -> Self {
        self.patient_identifier = patient_identifier;
        self.other_identifier = other_identifier;
        self
    }

    pub fn key(&self) -> &PatientKey {
        &self.key
    }

    /// The roster record id, `nhc_demo_patient_<key>`.
    pub fn record_id(&self) -> RecordId {
        RecordId::new(RecordKind::Patient, &self.key)
    }

    /// Current location as written in the roster (ward or bed).
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn ward(&self) -> GeneratorResult<&str> {
        remove_bed(&self.location)
    }

    pub fn is_placed(&self) -> bool {
        is_bed_location(&self.location)
    }

    pub fn patient_identifier(&self) -> Option<&str> {
        self.patient_identifier.as_deref()
    }

    pub fn other_identifier(&self) -> Option<&str> {
        self.other_identifier.as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roster {
    patients: Vec<PatientRecord>,
}

impl Roster {
    pub fn new(patients: Vec<PatientRecord>) -> Self {
        Self { patients }
    }

    /// Parses roster XML text.
    pub fn parse(xml: &str) -> GeneratorResult<Self> {
        let document = FixtureDocument::parse(xml)?;
        Self::from_document(&document)
    }

    /// Reads a roster file from disk.
    pub fn read(path: &Path) -> GeneratorResult<Self> {
        let xml = std::fs::read_to_string(path).map_err(|source| GeneratorError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Reduces every record of a parsed data file to a [`PatientRecord`], in document order.
    pub fn from_document(document: &FixtureDocument) -> GeneratorResult<Self> {
        let patients = document
            .records()
            .map(|record| {
                let key = patient_key_from_id(&record.id)?;
                let location = record.get_ref(LOCATION_FIELD).ok_or_else(|| {
                    GeneratorError::MissingLocation {
                        record: record.id.clone(),
                        field: LOCATION_FIELD,
                    }
                })?;

                Ok(PatientRecord::new(key, location).with_identifiers(
                    record.get_text(PATIENT_IDENTIFIER_FIELD).map(str::to_string),
                    record.get_text(OTHER_IDENTIFIER_FIELD).map(str::to_string),
                ))
            })
            .collect::<GeneratorResult<Vec<_>>>()?;

        Ok(Self { patients })
    }

    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}
