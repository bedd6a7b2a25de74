//! # eObs Core
//!
//! Demo data generation for Open eObs wards.
//!
//! This crate turns a ward roster (the patients and where they currently are) into the data
//! files the demo loader imports:
//! - admissions: ADT admit, admission and admit move per patient
//! - placements: bed placement and move for patients located in a bed
//! - NEWS observations: completed history plus the next scheduled observation, by clinical risk
//!
//! **No transport concerns**: talking to a running server belongs in `eobs-rpc`; argument
//! parsing and logging setup belong in the binaries.

pub mod admissions;
pub mod config;
pub mod constants;
pub mod demo;
pub mod error;
pub mod ids;
pub mod news;
pub mod placement;
mod records;
pub mod risk;
pub mod roster;
pub mod validation;

pub use admissions::generate_admissions;
pub use config::{DemoPlan, GeneratorConfig, OffsetSource, WardPlan};
pub use demo::{run_ward, WardFixtures};
pub use error::{GeneratorError, GeneratorResult};
pub use news::{generate_news, NewsPatient, WardStrategy};
pub use placement::generate_placements;
pub use risk::{Risk, RiskDistribution};
pub use roster::{PatientRecord, Roster};
