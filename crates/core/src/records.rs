//! Record shapes shared by the generators.

use crate::constants::ACTIVITY_MODEL;
use openerp::RecordBlock;

/// An `nh.activity` record for `patient`.
pub(crate) fn activity(id: impl Into<String>, patient: impl Into<String>) -> RecordBlock {
    RecordBlock::new(ACTIVITY_MODEL, id).reference("patient_id", patient)
}

/// Links an activity to the patient's spell as both parent and spell activity.
pub(crate) fn in_spell(record: RecordBlock, spell: &str) -> RecordBlock {
    record
        .reference("parent_id", spell)
        .reference("spell_activity_id", spell)
}

/// Activity state and the model of the record it wraps.
pub(crate) fn lifecycle(record: RecordBlock, state: &str, data_model: &str) -> RecordBlock {
    record.text("state", state).text("data_model", data_model)
}

/// Second write of an activity that points it at its domain record.
///
/// The domain record references the activity, so the activity is created first and patched
/// once the domain record exists.
pub(crate) fn data_ref_patch(
    activity_id: impl Into<String>,
    data_model: &str,
    data_id: impl Into<String>,
) -> RecordBlock {
    RecordBlock::new(ACTIVITY_MODEL, activity_id).data_ref("data_ref", data_model, data_id)
}
