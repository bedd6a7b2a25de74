//! Input validation utilities.
//!
//! These checks run before a generator appends anything, so a bad input never leaves a
//! half-written document behind.

use crate::constants::MAX_OFFSET_DAYS;
use crate::risk::RiskDistribution;
use crate::{GeneratorError, GeneratorResult};

/// Validates that there is exactly one admission offset per roster patient.
///
/// Offsets are matched to patients by position, so any difference in length means the
/// caller's pairing is wrong.
pub fn validate_offsets(patient_count: usize, offsets: &[i64]) -> GeneratorResult<()> {
    if offsets.len() != patient_count {
        return Err(GeneratorError::OffsetCountMismatch {
            expected: patient_count,
            actual: offsets.len(),
        });
    }
    offsets.iter().try_for_each(|offset| validate_offset(*offset))
}

/// Validates that an admission offset lies within [`MAX_OFFSET_DAYS`] of now.
pub fn validate_offset(offset: i64) -> GeneratorResult<()> {
    if !(-MAX_OFFSET_DAYS..=MAX_OFFSET_DAYS).contains(&offset) {
        return Err(GeneratorError::InvalidInput(format!(
            "admission offset {offset} is outside +/-{MAX_OFFSET_DAYS} days"
        )));
    }
    Ok(())
}

/// Validates that a risk distribution can cover `patient_count` allocations.
pub fn validate_risk_capacity(
    distribution: &RiskDistribution,
    patient_count: usize,
) -> GeneratorResult<()> {
    let total = distribution.total();
    if total < patient_count as u64 {
        return Err(GeneratorError::InvalidInput(format!(
            "risk distribution covers {total} patients but {patient_count} need observations"
        )));
    }
    Ok(())
}

/// Validates an OpenERP module name used to qualify cross-module references.
pub fn validate_module_name(module: &str) -> GeneratorResult<()> {
    if module.trim().is_empty() {
        return Err(GeneratorError::InvalidInput(
            "module name cannot be empty".into(),
        ));
    }

    let ok = module
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_'));

    if !ok {
        return Err(GeneratorError::InvalidInput(format!(
            "module name '{module}' contains invalid characters (only alphanumeric and '_' allowed)"
        )));
    }

    Ok(())
}
