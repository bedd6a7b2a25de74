//! NEWS observation fixtures.
//!
//! Each placed patient is given a clinical risk from the ward's [`RiskDistribution`]. From the
//! moment of admission onwards, observations are completed at the risk's interval up to the
//! present; one further observation is left scheduled at the next due time.
//!
//! NEWS fixtures are loaded by a different module from the one that owns the admission data,
//! so references to patients, spells and placements are module qualified.

use crate::config::GeneratorConfig;
use crate::constants::{
    ACTIVITY_COMPLETED, ACTIVITY_SCHEDULED, MINUTES_PER_DAY, NEWS_FIRST_OBSERVATION_MINUTES,
    NEWS_MODEL,
};
use crate::ids::{PatientKey, RecordId, RecordKind};
use crate::records::{activity, data_ref_patch, in_spell, lifecycle};
use crate::risk::{Risk, RiskDistribution};
use crate::roster::Roster;
use crate::validation::{validate_offset, validate_offsets, validate_risk_capacity};
use crate::{GeneratorError, GeneratorResult};
use openerp::{DateExpr, FixtureDocument, RecordBlock};

/// A placed patient due NEWS observations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewsPatient {
    pub key: PatientKey,
    /// Bed reference, local to the module that defines the locations.
    pub bed: String,
    /// Admission day offset (negative is in the past).
    pub admit_offset: i64,
}

impl NewsPatient {
    /// Whole days between admission and now.
    pub fn days_ago(&self) -> i64 {
        self.admit_offset.saturating_neg()
    }
}

/// The patients of one ward together with the risks still to hand out.
#[derive(Clone, Debug)]
pub struct WardStrategy {
    pub patients: Vec<NewsPatient>,
    pub risk_distribution: RiskDistribution,
}

impl WardStrategy {
    /// Builds a strategy from a roster and its positional admission offsets.
    ///
    /// Only bed-located patients are observed; the distribution must cover all of them.
    pub fn from_roster(
        roster: &Roster,
        offsets: &[i64],
        risk_distribution: RiskDistribution,
    ) -> GeneratorResult<Self> {
        validate_offsets(roster.len(), offsets)?;

        let patients: Vec<NewsPatient> = roster
            .patients()
            .iter()
            .zip(offsets)
            .filter(|(patient, _)| patient.is_placed())
            .map(|(patient, offset)| NewsPatient {
                key: patient.key().clone(),
                bed: patient.location().to_string(),
                admit_offset: *offset,
            })
            .collect();

        validate_risk_capacity(&risk_distribution, patients.len())?;

        Ok(Self {
            patients,
            risk_distribution,
        })
    }
}

/// Writes the observation history of every patient in a ward strategy.
pub struct NewsGenerator<'a> {
    config: &'a GeneratorConfig,
    document: FixtureDocument,
}

/// References shared by every observation of one patient.
struct PatientRefs {
    /// Unqualified, for comments.
    local_patient: String,
    patient: String,
    placement: String,
    spell: String,
    bed: String,
}

impl<'a> NewsGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            document: FixtureDocument::new(),
        }
    }

    /// Consumes the strategy's risk distribution as patients are processed.
    pub fn generate(mut self, strategy: &mut WardStrategy) -> GeneratorResult<FixtureDocument> {
        for patient in &strategy.patients {
            validate_offset(patient.admit_offset)?;
        }

        for patient in &strategy.patients {
            let risk = strategy.risk_distribution.allocate().ok_or_else(|| {
                GeneratorError::RiskExhausted(patient.key.to_string())
            })?;
            tracing::debug!(patient = %patient.key, %risk, "allocated risk");
            self.observe_patient(patient, risk);
        }

        tracing::info!(
            patients = strategy.patients.len(),
            records = self.document.records().count(),
            "generated NEWS observations"
        );
        Ok(self.document)
    }

    fn observe_patient(&mut self, patient: &NewsPatient, risk: Risk) {
        let module = self.config.news_module();
        let patient_id = RecordId::new(RecordKind::Patient, &patient.key);
        let refs = PatientRefs {
            local_patient: patient_id.to_string(),
            patient: patient_id.qualified(module),
            placement: RecordId::new(RecordKind::PlacementActivity, &patient.key).qualified(module),
            spell: RecordId::new(RecordKind::SpellActivity, &patient.key).qualified(module),
            bed: format!("{module}.{}", patient.bed),
        };

        let horizon = patient.days_ago();
        let mut minutes = NEWS_FIRST_OBSERVATION_MINUTES;
        let mut sequence = 0u32;
        while minutes / MINUTES_PER_DAY < horizon {
            self.observation(patient, &refs, sequence, minutes, Some(risk));
            sequence += 1;
            minutes += risk.interval_minutes();
        }
        self.observation(patient, &refs, sequence, minutes, None);
    }

    /// One observation group. `values` is `None` for the scheduled observation.
    fn observation(
        &mut self,
        patient: &NewsPatient,
        refs: &PatientRefs,
        sequence: u32,
        minutes: i64,
        values: Option<Risk>,
    ) {
        let activity_id = RecordId::sequenced(RecordKind::NewsActivity, &patient.key, sequence)
            .to_string();
        let data_id = RecordId::sequenced(RecordKind::News, &patient.key, sequence).to_string();
        let when = self
            .config
            .date(DateExpr::days(patient.admit_offset).plus_minutes(minutes));
        let state = if values.is_some() {
            ACTIVITY_COMPLETED
        } else {
            ACTIVITY_SCHEDULED
        };

        self.document
            .comment(format!("NEWS data for patient {}", refs.local_patient));

        let record = activity(&activity_id, &refs.patient).reference("creator_id", &refs.placement);
        let mut record = lifecycle(in_spell(record, &refs.spell), state, NEWS_MODEL)
            .reference("location_id", &refs.bed)
            .field("date_scheduled", when.clone());
        if values.is_some() {
            record = record.field("date_terminated", when);
        }
        self.document.push(record);

        let mut news = RecordBlock::new(NEWS_MODEL, &data_id)
            .reference("activity_id", &activity_id)
            .reference("patient_id", &refs.patient);
        if let Some(risk) = values {
            let observed = risk.values();
            for (name, value) in observed.eval_fields() {
                news = news.eval(name, value);
            }
            news = news.text("avpu_text", observed.avpu_text);
        }
        self.document.push(news);

        self.document
            .push(data_ref_patch(activity_id, NEWS_MODEL, data_id));
    }
}

/// Generates the NEWS document for a ward strategy.
pub fn generate_news(
    config: &GeneratorConfig,
    strategy: &mut WardStrategy,
) -> GeneratorResult<FixtureDocument> {
    NewsGenerator::new(config).generate(strategy)
}
