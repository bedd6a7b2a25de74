//! Constants used throughout the eObs core crate.
//!
//! Model names and fixed references are shared by every generator so that the records they
//! emit agree with each other and with the base Open eObs module data.

/// Generic activity model wrapping every clinical event.
pub const ACTIVITY_MODEL: &str = "nh.activity";

pub const ADT_ADMIT_MODEL: &str = "nh.clinical.adt.patient.admit";

pub const ADMISSION_MODEL: &str = "nh.clinical.patient.admission";

pub const MOVE_MODEL: &str = "nh.clinical.patient.move";

pub const PLACEMENT_MODEL: &str = "nh.clinical.patient.placement";

/// NEWS (early warning score) observation model.
pub const NEWS_MODEL: &str = "nh.clinical.patient.observation.ews";

/// Point of service every demo admission is registered against.
pub const HOSPITAL_REF: &str = "nhc_def_conf_pos_hospital";

/// Roster field holding the patient's current ward or bed.
pub const LOCATION_FIELD: &str = "current_location_id";

pub const PATIENT_IDENTIFIER_FIELD: &str = "patient_identifier";

pub const OTHER_IDENTIFIER_FIELD: &str = "other_identifier";

/// Anchored pattern for roster record ids.
pub const PATIENT_ID_PATTERN: &str = r"^nhc_demo_patient_(\d+)";

/// Anchored pattern capturing the ward part of a location reference.
pub const WARD_PATTERN: &str = r"^(nhc_def_conf_location_w\w)";

/// Bed references carry `_b` within their last six characters.
pub const BED_MARKER: &str = "_b";

/// Module that owns the admission/placement records referenced by NEWS fixtures.
pub const DEFAULT_NEWS_MODULE: &str = "nh_clinical";

pub const ACTIVITY_COMPLETED: &str = "completed";

pub const ACTIVITY_SCHEDULED: &str = "scheduled";

/// Admission location code on ADT admit records.
pub const ADMIT_LOCATION_CODE: &str = "A";

/// Minutes after admission of the first NEWS observation.
pub const NEWS_FIRST_OBSERVATION_MINUTES: i64 = 0;

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Largest admission offset accepted, in days either side of now.
pub const MAX_OFFSET_DAYS: i64 = 36_500;

/// Roster file name inside each `ward_<x>/` directory.
pub const ROSTER_FILENAME: &str = "demo_patients.xml";

pub const ADMISSIONS_FILENAME: &str = "admissions.xml";

pub const PLACEMENTS_FILENAME: &str = "placements.xml";

pub const NEWS_FILENAME: &str = "news.xml";

/// Plan file read by the demo runner when no explicit path is configured.
pub const DEFAULT_PLAN_FILENAME: &str = "demo_plan.yaml";
