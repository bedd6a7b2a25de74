//! Placement fixtures.
//!
//! Patients whose roster location is a bed get placed into it on the day of admission: a
//! placement created by the admission, followed by the move from the ward into the bed.
//! Patients still located on a ward are skipped.

use crate::config::GeneratorConfig;
use crate::constants::{ACTIVITY_COMPLETED, MOVE_MODEL, PLACEMENT_MODEL};
use crate::ids::{RecordId, RecordKind};
use crate::records::{activity, data_ref_patch, in_spell, lifecycle};
use crate::roster::{PatientRecord, Roster};
use crate::validation::validate_offsets;
use crate::GeneratorResult;
use openerp::{DateExpr, FieldValue, FixtureDocument, RecordBlock};

/// Generates the placement document for a roster.
///
/// Offsets are positional over the whole roster, unplaced patients included.
pub fn generate_placements(
    config: &GeneratorConfig,
    roster: &Roster,
    offsets: &[i64],
) -> GeneratorResult<FixtureDocument> {
    validate_offsets(roster.len(), offsets)?;

    let mut document = FixtureDocument::new();
    let mut placed = 0usize;
    for (patient, offset) in roster.patients().iter().zip(offsets) {
        if !patient.is_placed() {
            tracing::debug!(patient = %patient.key(), "not in a bed, skipping placement");
            continue;
        }
        let date = config.date(DateExpr::days(*offset).at_midnight());
        place_patient(&mut document, patient, date)?;
        placed += 1;
    }

    tracing::info!(patients = roster.len(), placed, "generated placements");
    Ok(document)
}

fn place_patient(
    document: &mut FixtureDocument,
    patient: &PatientRecord,
    date: FieldValue,
) -> GeneratorResult<()> {
    let key = patient.key();
    let ward = patient.ward()?;
    let bed = patient.location();
    let patient_ref = patient.record_id().to_string();
    let spell_ref = RecordId::new(RecordKind::SpellActivity, key).to_string();
    let id = |kind| RecordId::new(kind, key).to_string();

    let placement_activity = id(RecordKind::PlacementActivity);
    let placement = id(RecordKind::Placement);

    document.comment(format!("Placement data for patient {key}"));
    let record = activity(&placement_activity, &patient_ref)
        .reference("creator_id", id(RecordKind::AdmissionActivity));
    document.push(
        lifecycle(in_spell(record, &spell_ref), ACTIVITY_COMPLETED, PLACEMENT_MODEL)
            .reference("location_id", ward)
            .field("date_terminated", date.clone()),
    );
    document.push(
        RecordBlock::new(PLACEMENT_MODEL, &placement)
            .reference("activity_id", &placement_activity)
            .reference("patient_id", &patient_ref)
            .reference("suggested_location_id", ward)
            .reference("location_id", bed),
    );
    document.push(data_ref_patch(&placement_activity, PLACEMENT_MODEL, placement));

    let move_activity = id(RecordKind::PlacementMoveActivity);
    let movement = id(RecordKind::PlacementMove);

    document.comment(format!("Spell movement for patient {key}"));
    let record = activity(&move_activity, &patient_ref).reference("creator_id", &placement_activity);
    document.push(
        lifecycle(in_spell(record, &spell_ref), ACTIVITY_COMPLETED, MOVE_MODEL)
            .reference("location_id", ward)
            .field("date_terminated", date),
    );
    document.push(
        RecordBlock::new(MOVE_MODEL, &movement)
            .reference("activity_id", &move_activity)
            .reference("patient_id", &patient_ref)
            .reference("from_location_id", ward)
            .reference("location_id", bed),
    );
    document.push(data_ref_patch(move_activity, MOVE_MODEL, movement));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorError;

    const ROSTER: &str = r#"<openerp><data noupdate="1">
        <record model="nh.clinical.patient" id="nhc_demo_patient_1">
            <field name="current_location_id" ref="nhc_def_conf_location_wa_b1"/>
        </record>
        <record model="nh.clinical.patient" id="nhc_demo_patient_2">
            <field name="current_location_id" ref="nhc_def_conf_location_wa"/>
        </record>
        <record model="nh.clinical.patient" id="nhc_demo_patient_3">
            <field name="current_location_id" ref="nhc_def_conf_location_wa_b12"/>
        </record>
    </data></openerp>"#;

    fn generate(offsets: &[i64]) -> FixtureDocument {
        let roster = Roster::parse(ROSTER).expect("roster");
        generate_placements(&GeneratorConfig::default(), &roster, offsets).expect("generate")
    }

    #[test]
    fn only_bed_located_patients_are_placed() {
        let doc = generate(&[-1, -2, -3]);
        let comments: Vec<&str> = doc.comments().collect();
        assert_eq!(
            comments,
            vec![
                "Placement data for patient 1",
                "Spell movement for patient 1",
                "Placement data for patient 3",
                "Spell movement for patient 3",
            ]
        );
        assert!(!doc.records().any(|r| r.id.ends_with("_2")));
    }

    #[test]
    fn placement_moves_from_ward_to_bed() {
        let doc = generate(&[-1, -2, -3]);

        let placement = doc
            .records()
            .find(|r| r.id == "nhc_demo_placement_3")
            .expect("placement");
        assert_eq!(
            placement.get_ref("suggested_location_id"),
            Some("nhc_def_conf_location_wa")
        );
        assert_eq!(
            placement.get_ref("location_id"),
            Some("nhc_def_conf_location_wa_b12")
        );

        let movement = doc
            .records()
            .find(|r| r.id == "nhc_demo_placement_move_3")
            .expect("movement");
        assert_eq!(
            movement.get_ref("from_location_id"),
            Some("nhc_def_conf_location_wa")
        );
        assert_eq!(
            movement.get_ref("location_id"),
            Some("nhc_def_conf_location_wa_b12")
        );
    }

    #[test]
    fn activities_chain_from_admission() {
        let doc = generate(&[-1, -2, -3]);
        let placement = doc
            .records()
            .find(|r| r.id == "nhc_activity_demo_placement_1")
            .expect("placement activity");
        assert_eq!(
            placement.get_ref("creator_id"),
            Some("nhc_activity_demo_admission_1")
        );
        assert_eq!(placement.get_ref("location_id"), Some("nhc_def_conf_location_wa"));

        let movement = doc
            .records()
            .find(|r| r.id == "nhc_activity_demo_placement_move_1")
            .expect("move activity");
        assert_eq!(
            movement.get_ref("creator_id"),
            Some("nhc_activity_demo_placement_1")
        );
    }

    #[test]
    fn placement_dates_fall_at_midnight() {
        let doc = generate(&[-1, -2, -3]);
        let activity = doc
            .records()
            .find(|r| r.id == "nhc_activity_demo_placement_3")
            .expect("placement activity");
        assert_eq!(
            activity.get("date_terminated"),
            Some(&FieldValue::Eval(
                "(datetime.now() + timedelta(-3)).strftime('%Y-%m-%d 00:00:00')".into()
            ))
        );
    }

    #[test]
    fn offsets_cover_unplaced_patients_too() {
        let roster = Roster::parse(ROSTER).expect("roster");
        let err = generate_placements(&GeneratorConfig::default(), &roster, &[-1, -3])
            .expect_err("should reject");
        assert!(matches!(
            err,
            GeneratorError::OffsetCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn no_forward_references() {
        let doc = generate(&[-1, -2, -3]);
        assert!(doc.symbols().forward_references().is_empty());
    }
}
