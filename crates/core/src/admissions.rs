//! Admission fixtures.
//!
//! Every roster patient is admitted to the ward they currently occupy through three events, each
//! written as an activity, its domain record, and a patch linking the two:
//!
//! 1. the ADT admit message (`nh.clinical.adt.patient.admit`),
//! 2. the admission itself (`nh.clinical.patient.admission`), created by the ADT admit,
//! 3. the move into the ward (`nh.clinical.patient.move`), created by the admission.

use crate::config::GeneratorConfig;
use crate::constants::{
    ACTIVITY_COMPLETED, ADMISSION_MODEL, ADMIT_LOCATION_CODE, ADT_ADMIT_MODEL, HOSPITAL_REF,
    MOVE_MODEL,
};
use crate::ids::{RecordId, RecordKind};
use crate::records::{activity, data_ref_patch, in_spell, lifecycle};
use crate::roster::{PatientRecord, Roster};
use crate::validation::validate_offsets;
use crate::GeneratorResult;
use openerp::{DateExpr, FixtureDocument, RecordBlock};

/// Generates the admission document for a roster.
///
/// `offsets[i]` is the admission day offset of the `i`-th roster patient.
pub fn generate_admissions(
    config: &GeneratorConfig,
    roster: &Roster,
    offsets: &[i64],
) -> GeneratorResult<FixtureDocument> {
    AdmissionsGenerator::new(config).generate(roster, offsets)
}

pub struct AdmissionsGenerator<'a> {
    config: &'a GeneratorConfig,
    document: FixtureDocument,
}

/// Ids and references shared by all records of one patient.
struct Admission<'p> {
    patient: &'p PatientRecord,
    patient_ref: String,
    spell_ref: String,
    ward: &'p str,
    admitted: DateExpr,
}

impl<'p> Admission<'p> {
    fn id(&self, kind: RecordKind) -> String {
        RecordId::new(kind, self.patient.key()).to_string()
    }
}

impl<'a> AdmissionsGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            document: FixtureDocument::new(),
        }
    }

    pub fn generate(mut self, roster: &Roster, offsets: &[i64]) -> GeneratorResult<FixtureDocument> {
        validate_offsets(roster.len(), offsets)?;

        for (patient, offset) in roster.patients().iter().zip(offsets) {
            self.admit_patient(patient, *offset)?;
        }

        tracing::info!(patients = roster.len(), "generated admissions");
        Ok(self.document)
    }

    fn admit_patient(&mut self, patient: &PatientRecord, offset: i64) -> GeneratorResult<()> {
        let admission = Admission {
            patient,
            patient_ref: patient.record_id().to_string(),
            spell_ref: RecordId::new(RecordKind::SpellActivity, patient.key()).to_string(),
            ward: patient.ward()?,
            admitted: DateExpr::days(offset),
        };
        tracing::debug!(patient = %patient.key(), offset, "admitting patient");

        self.adt_admit(&admission);
        self.admission(&admission);
        self.admit_movement(&admission);
        Ok(())
    }

    fn adt_admit(&mut self, a: &Admission<'_>) {
        let key = a.patient.key();
        let activity_id = a.id(RecordKind::AdtAdmitActivity);
        let data_id = a.id(RecordKind::AdtAdmit);

        self.document
            .comment(format!("ADT Admit data for patient {key}"));

        let record = activity(&activity_id, &a.patient_ref).reference("parent_id", &a.spell_ref);
        self.document.push(
            lifecycle(record, ACTIVITY_COMPLETED, ADT_ADMIT_MODEL)
                .field("date_terminated", self.config.date(a.admitted)),
        );

        let mut admit = RecordBlock::new(ADT_ADMIT_MODEL, &data_id)
            .reference("activity_id", &activity_id)
            .reference("patient_id", &a.patient_ref)
            .reference("location_id", a.ward)
            .reference("pos_id", HOSPITAL_REF)
            .text("location", ADMIT_LOCATION_CODE)
            .text("code", key.admission_code())
            .field("start_date", self.config.date(a.admitted));
        if let Some(identifier) = a.patient.patient_identifier() {
            admit = admit.text("patient_identifier", identifier);
        }
        if let Some(identifier) = a.patient.other_identifier() {
            admit = admit.text("other_identifier", identifier);
        }
        self.document.push(admit);

        self.document
            .push(data_ref_patch(activity_id, ADT_ADMIT_MODEL, data_id));
    }

    fn admission(&mut self, a: &Admission<'_>) {
        let key = a.patient.key();
        let activity_id = a.id(RecordKind::AdmissionActivity);
        let data_id = a.id(RecordKind::Admission);

        self.document
            .comment(format!("Actual Admit data for patient {key}"));

        let record = activity(&activity_id, &a.patient_ref)
            .reference("creator_id", a.id(RecordKind::AdtAdmitActivity));
        self.document.push(
            lifecycle(in_spell(record, &a.spell_ref), ACTIVITY_COMPLETED, ADMISSION_MODEL)
                .reference("location_id", a.ward)
                .field("date_terminated", self.config.date(a.admitted)),
        );

        self.document.push(
            RecordBlock::new(ADMISSION_MODEL, &data_id)
                .reference("activity_id", &activity_id)
                .reference("patient_id", &a.patient_ref)
                .reference("location_id", a.ward)
                .reference("pos_id", HOSPITAL_REF)
                .text("code", key.admission_code())
                .field("start_date", self.config.date(a.admitted)),
        );

        self.document
            .push(data_ref_patch(activity_id, ADMISSION_MODEL, data_id));
    }

    fn admit_movement(&mut self, a: &Admission<'_>) {
        let activity_id = a.id(RecordKind::AdmitMoveActivity);
        let data_id = a.id(RecordKind::AdmitMove);

        self.document
            .comment(format!("Admit movement for patient {}", a.patient.key()));

        let record = activity(&activity_id, &a.patient_ref)
            .reference("creator_id", a.id(RecordKind::AdmissionActivity));
        self.document.push(
            lifecycle(in_spell(record, &a.spell_ref), ACTIVITY_COMPLETED, MOVE_MODEL)
                .field("date_terminated", self.config.date(a.admitted)),
        );

        self.document.push(
            RecordBlock::new(MOVE_MODEL, &data_id)
                .reference("activity_id", &activity_id)
                .reference("patient_id", &a.patient_ref)
                .reference("location_id", a.ward),
        );

        self.document
            .push(data_ref_patch(activity_id, MOVE_MODEL, data_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ACTIVITY_MODEL;
    use crate::GeneratorError;
    use chrono::NaiveDate;
    use openerp::{DateMode, FieldValue};

    const ROSTER: &str = r#"<openerp><data noupdate="1">
        <record model="nh.clinical.patient" id="nhc_demo_patient_1">
            <field name="current_location_id" ref="nhc_def_conf_location_wa_b1"/>
            <field name="patient_identifier">NHS0000001</field>
            <field name="other_identifier">HOSNUM0001</field>
        </record>
        <record model="nh.clinical.patient" id="nhc_demo_patient_2">
            <field name="current_location_id" ref="nhc_def_conf_location_wb"/>
        </record>
    </data></openerp>"#;

    fn roster() -> Roster {
        Roster::parse(ROSTER).expect("roster")
    }

    fn generate(offsets: &[i64]) -> FixtureDocument {
        generate_admissions(&GeneratorConfig::default(), &roster(), offsets).expect("generate")
    }

    #[test]
    fn emits_three_event_groups_per_patient() {
        let doc = generate(&[-1, -2]);

        let comments: Vec<&str> = doc.comments().collect();
        assert_eq!(
            comments,
            vec![
                "ADT Admit data for patient 1",
                "Actual Admit data for patient 1",
                "Admit movement for patient 1",
                "ADT Admit data for patient 2",
                "Actual Admit data for patient 2",
                "Admit movement for patient 2",
            ]
        );
        assert_eq!(doc.records().count(), 18);
    }

    #[test]
    fn record_ids_follow_event_order() {
        let doc = generate(&[-1, -2]);
        let ids: Vec<(&str, &str)> = doc
            .records()
            .take(9)
            .map(|r| (r.model.as_str(), r.id.as_str()))
            .collect();

        assert_eq!(
            ids,
            vec![
                (ACTIVITY_MODEL, "nhc_activity_demo_adt_admit_1"),
                (ADT_ADMIT_MODEL, "nhc_demo_adt_admit_1"),
                (ACTIVITY_MODEL, "nhc_activity_demo_adt_admit_1"),
                (ACTIVITY_MODEL, "nhc_activity_demo_admission_1"),
                (ADMISSION_MODEL, "nhc_demo_admission_1"),
                (ACTIVITY_MODEL, "nhc_activity_demo_admission_1"),
                (ACTIVITY_MODEL, "nhc_activity_demo_admit_move_1"),
                (MOVE_MODEL, "nhc_demo_admit_move_1"),
                (ACTIVITY_MODEL, "nhc_activity_demo_admit_move_1"),
            ]
        );
    }

    #[test]
    fn adt_admit_record_carries_ward_and_identifiers() {
        let doc = generate(&[-1, -2]);
        let admit = doc
            .records()
            .find(|r| r.id == "nhc_demo_adt_admit_1")
            .expect("adt admit record");

        assert_eq!(admit.get_ref("location_id"), Some("nhc_def_conf_location_wa"));
        assert_eq!(admit.get_ref("pos_id"), Some(HOSPITAL_REF));
        assert_eq!(admit.get_text("location"), Some("A"));
        assert_eq!(admit.get_text("code"), Some("DEMO0001"));
        assert_eq!(admit.get_text("patient_identifier"), Some("NHS0000001"));
        assert_eq!(admit.get_text("other_identifier"), Some("HOSNUM0001"));
        assert_eq!(
            admit.get("start_date"),
            Some(&FieldValue::Eval(
                "(datetime.now() + timedelta(-1)).strftime('%Y-%m-%d %H:%M:%S')".into()
            ))
        );
    }

    #[test]
    fn missing_identifiers_are_omitted() {
        let doc = generate(&[-1, -2]);
        let admit = doc
            .records()
            .find(|r| r.id == "nhc_demo_adt_admit_2")
            .expect("adt admit record");
        assert!(admit.get("patient_identifier").is_none());
        assert!(admit.get("other_identifier").is_none());
        assert_eq!(admit.get_ref("location_id"), Some("nhc_def_conf_location_wb"));
    }

    #[test]
    fn activities_chain_creators() {
        let doc = generate(&[-1, -2]);
        let admission = doc
            .records()
            .find(|r| r.id == "nhc_activity_demo_admission_2")
            .expect("admission activity");
        assert_eq!(
            admission.get_ref("creator_id"),
            Some("nhc_activity_demo_adt_admit_2")
        );
        assert_eq!(
            admission.get_ref("spell_activity_id"),
            Some("nhc_activity_demo_spell_2")
        );
        assert_eq!(
            admission.get("date_terminated"),
            Some(&FieldValue::Eval(
                "(datetime.now() + timedelta(-2)).strftime('%Y-%m-%d %H:%M:%S')".into()
            ))
        );

        let movement = doc
            .records()
            .find(|r| r.id == "nhc_activity_demo_admit_move_2")
            .expect("move activity");
        assert_eq!(
            movement.get_ref("creator_id"),
            Some("nhc_activity_demo_admission_2")
        );
    }

    #[test]
    fn patches_point_activities_at_domain_records() {
        let doc = generate(&[-1, -2]);
        let patch = doc
            .records()
            .filter(|r| r.id == "nhc_activity_demo_admit_move_1")
            .nth(1)
            .expect("patch record");
        assert_eq!(patch.fields.len(), 1);
        assert_eq!(
            patch.get("data_ref"),
            Some(&FieldValue::DataRef {
                model: MOVE_MODEL.into(),
                id: "nhc_demo_admit_move_1".into()
            })
        );
    }

    #[test]
    fn no_forward_references() {
        let doc = generate(&[-1, -2]);
        let symbols = doc.symbols();
        assert!(symbols.forward_references().is_empty());
        let unresolved = symbols.unresolved();
        assert!(unresolved.contains("nhc_demo_patient_1"));
        assert!(unresolved.contains("nhc_activity_demo_spell_2"));
        assert!(unresolved.contains(HOSPITAL_REF));
        assert!(!unresolved.iter().any(|id| id.contains("_b1")));
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let first = generate(&[-1, -2]).render().expect("render");
        let second = generate(&[-1, -2]).render().expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn absolute_mode_writes_literal_dates() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 10)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid datetime");
        let config = GeneratorConfig::new(DateMode::Absolute(now), "nh_clinical").expect("config");
        let doc = generate_admissions(&config, &roster(), &[-1, -2]).expect("generate");

        let admission = doc
            .records()
            .find(|r| r.id == "nhc_demo_admission_2")
            .expect("admission");
        assert_eq!(admission.get_text("start_date"), Some("2026-01-08 12:00:00"));
    }

    #[test]
    fn rejects_offset_count_mismatch() {
        let err = generate_admissions(&GeneratorConfig::default(), &roster(), &[-1])
            .expect_err("should reject");
        assert!(matches!(
            err,
            GeneratorError::OffsetCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn absolute_mode_rejects_offset_beyond_calendar_range() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid datetime");
        let config = GeneratorConfig::new(DateMode::Absolute(now), "nh_clinical").expect("config");
        let err = generate_admissions(&config, &roster(), &[-1, -200_000_000])
            .expect_err("should reject");
        assert!(matches!(err, GeneratorError::InvalidInput(_)));
    }

    #[test]
    fn rejects_patient_outside_a_ward() {
        let xml = r#"<openerp><data>
            <record model="nh.clinical.patient" id="nhc_demo_patient_9">
                <field name="current_location_id" ref="nhc_def_conf_location_theatre"/>
            </record>
        </data></openerp>"#;
        let roster = Roster::parse(xml).expect("roster");
        let err = generate_admissions(&GeneratorConfig::default(), &roster, &[-1])
            .expect_err("should reject");
        assert!(matches!(err, GeneratorError::LocationMismatch(_)));
    }
}
