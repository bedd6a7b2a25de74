//! Per-ward demo data.
//!
//! A ward directory `ward_<x>/` holds the roster (`demo_patients.xml`). Generating the ward
//! writes the admission, placement and NEWS data files next to it.

use crate::admissions::generate_admissions;
use crate::config::{GeneratorConfig, WardPlan};
use crate::constants::{
    ADMISSIONS_FILENAME, HOSPITAL_REF, NEWS_FILENAME, PLACEMENTS_FILENAME, ROSTER_FILENAME,
};
use crate::ids::{RecordId, RecordKind};
use crate::news::{generate_news, WardStrategy};
use crate::placement::generate_placements;
use crate::risk::RiskDistribution;
use crate::roster::Roster;
use crate::{GeneratorError, GeneratorResult};
use openerp::{DanglingReference, FixtureDocument, SymbolTable};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding one ward's roster and generated files.
pub fn ward_dir(root: &Path, ward: &str) -> PathBuf {
    root.join(format!("ward_{ward}"))
}

/// The three data files generated for a ward.
#[derive(Clone, Debug)]
pub struct WardFixtures {
    pub admissions: FixtureDocument,
    pub placements: FixtureDocument,
    pub news: FixtureDocument,
}

impl WardFixtures {
    /// Generates all three documents from one roster and one set of admission offsets.
    pub fn generate(
        config: &GeneratorConfig,
        roster: &Roster,
        offsets: &[i64],
        risk: RiskDistribution,
    ) -> GeneratorResult<Self> {
        let admissions = generate_admissions(config, roster, offsets)?;
        let placements = generate_placements(config, roster, offsets)?;
        let mut strategy = WardStrategy::from_roster(roster, offsets, risk)?;
        let news = generate_news(config, &mut strategy)?;

        Ok(Self {
            admissions,
            placements,
            news,
        })
    }

    /// Writes `admissions.xml`, `placements.xml` and `news.xml` into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> GeneratorResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(GeneratorError::OutputDirCreation)?;

        let files = [
            (ADMISSIONS_FILENAME, &self.admissions),
            (PLACEMENTS_FILENAME, &self.placements),
            (NEWS_FILENAME, &self.news),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, document) in files {
            let path = dir.join(name);
            write_document(&path, document)?;
            written.push(path);
        }
        Ok(written)
    }

    /// References that resolve neither within the generated files nor to ids the roster and
    /// base module data are known to provide.
    ///
    /// NEWS references are checked with the `news_module.` qualifier removed.
    pub fn dangling_references(&self, roster: &Roster, news_module: &str) -> Vec<DanglingReference> {
        let external = external_ids(roster);
        let base =
            SymbolTable::from_records(self.admissions.records().chain(self.placements.records()));

        let mut dangling = base.dangling(|id| external.contains(id));

        let prefix = format!("{news_module}.");
        dangling.extend(self.news.symbols().dangling(|id| {
            id.strip_prefix(&prefix)
                .is_some_and(|local| base.is_defined(local) || external.contains(local))
        }));
        dangling
    }
}

/// Writes a rendered document to `path`.
pub fn write_document(path: &Path, document: &FixtureDocument) -> GeneratorResult<()> {
    let xml = document.render()?;
    fs::write(path, xml).map_err(|source| GeneratorError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "wrote data file");
    Ok(())
}

/// Ids defined outside the generated files: roster patients, their spells and locations, and
/// the hospital point of service.
fn external_ids(roster: &Roster) -> BTreeSet<String> {
    let mut ids = BTreeSet::from([HOSPITAL_REF.to_string()]);
    for patient in roster.patients() {
        ids.insert(patient.record_id().to_string());
        ids.insert(RecordId::new(RecordKind::SpellActivity, patient.key()).to_string());
        ids.insert(patient.location().to_string());
        if let Ok(ward) = patient.ward() {
            ids.insert(ward.to_string());
        }
    }
    ids
}

/// Reads a ward's roster, generates its data files and writes them into the ward directory.
pub fn run_ward(
    config: &GeneratorConfig,
    root: &Path,
    plan: &WardPlan,
) -> GeneratorResult<WardFixtures> {
    let dir = ward_dir(root, plan.ward.as_str());
    let roster = Roster::read(&dir.join(ROSTER_FILENAME))?;
    let offsets = plan.offsets.resolve(roster.len())?;

    tracing::info!(ward = %plan.ward, patients = roster.len(), "generating ward demo data");
    let fixtures = WardFixtures::generate(config, &roster, &offsets, plan.risk)?;

    for reference in fixtures.dangling_references(&roster, config.news_module()) {
        tracing::warn!(
            ward = %plan.ward,
            record = %reference.record_id,
            field = %reference.field,
            target = %reference.target,
            "unresolved reference"
        );
    }

    fixtures.write_to(&dir)?;
    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OffsetSource;
    use eobs_types::NonEmptyText;
    use tempfile::TempDir;

    const ROSTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<openerp>
    <data noupdate="1">
        <record model="nh.clinical.patient" id="nhc_demo_patient_1">
            <field name="current_location_id" ref="nhc_def_conf_location_wa_b1"/>
            <field name="patient_identifier">NHS0000001</field>
        </record>
        <record model="nh.clinical.patient" id="nhc_demo_patient_2">
            <field name="current_location_id" ref="nhc_def_conf_location_wa"/>
        </record>
        <record model="nh.clinical.patient" id="nhc_demo_patient_3">
            <field name="current_location_id" ref="nhc_def_conf_location_wa_b3"/>
        </record>
    </data>
</openerp>"#;

    fn roster() -> Roster {
        Roster::parse(ROSTER).expect("roster")
    }

    fn fixtures() -> WardFixtures {
        WardFixtures::generate(
            &GeneratorConfig::default(),
            &roster(),
            &[-1, -2, -1],
            RiskDistribution::new(1, 1, 0, 0),
        )
        .expect("generate")
    }

    #[test]
    fn generated_files_resolve_all_references() {
        let fixtures = fixtures();
        assert!(fixtures
            .dangling_references(&roster(), "nh_clinical")
            .is_empty());
    }

    #[test]
    fn unknown_module_prefix_is_reported() {
        let fixtures = fixtures();
        let dangling = fixtures.dangling_references(&roster(), "nh_eobs");
        assert!(!dangling.is_empty());
        assert!(dangling.iter().all(|r| r.target.starts_with("nh_clinical.")));
    }

    #[test]
    fn parsing_output_recovers_ids_and_patients() {
        let fixtures = fixtures();
        let xml = fixtures.admissions.render().expect("render");
        let parsed = FixtureDocument::parse(&xml).expect("parse");

        let original: Vec<&str> = fixtures.admissions.records().map(|r| r.id.as_str()).collect();
        let recovered: Vec<&str> = parsed.records().map(|r| r.id.as_str()).collect();
        assert_eq!(original, recovered);

        let patients: BTreeSet<&str> = parsed
            .records()
            .filter_map(|r| r.get_ref("patient_id"))
            .collect();
        assert_eq!(
            patients,
            BTreeSet::from(["nhc_demo_patient_1", "nhc_demo_patient_2", "nhc_demo_patient_3"])
        );
        assert_eq!(parsed, fixtures.admissions);
    }

    #[test]
    fn writes_three_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");

        let written = fixtures().write_to(&dir).expect("write");
        assert_eq!(written.len(), 3);
        for name in [ADMISSIONS_FILENAME, PLACEMENTS_FILENAME, NEWS_FILENAME] {
            let contents = fs::read_to_string(dir.join(name)).expect("read back");
            assert!(contents.starts_with("<?xml"));
            assert!(contents.contains("<openerp>"));
        }
    }

    #[test]
    fn runs_ward_from_plan() {
        let temp = TempDir::new().unwrap();
        let dir = ward_dir(temp.path(), "a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ROSTER_FILENAME), ROSTER).unwrap();

        let plan = WardPlan {
            ward: NonEmptyText::new("a").expect("ward"),
            offsets: OffsetSource::Random {
                choices: vec![-1, -2],
                seed: 3,
            },
            risk: RiskDistribution::new(0, 0, 1, 1),
        };
        let fixtures = run_ward(&GeneratorConfig::default(), temp.path(), &plan).expect("run");

        assert_eq!(fixtures.placements.comments().count(), 4);
        assert!(dir.join(NEWS_FILENAME).exists());

        let rerun = run_ward(&GeneratorConfig::default(), temp.path(), &plan).expect("rerun");
        assert_eq!(
            rerun.news.render().expect("render"),
            fixtures.news.render().expect("render")
        );
    }

    #[test]
    fn missing_roster_is_a_read_error() {
        let temp = TempDir::new().unwrap();
        let plan = WardPlan {
            ward: NonEmptyText::new("z").expect("ward"),
            offsets: OffsetSource::Fixed(vec![]),
            risk: RiskDistribution::default(),
        };
        let err = run_ward(&GeneratorConfig::default(), temp.path(), &plan).expect_err("no roster");
        assert!(matches!(err, GeneratorError::FileRead { .. }));
    }
}
