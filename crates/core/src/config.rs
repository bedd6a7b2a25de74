//! Generator configuration.
//!
//! Configuration is resolved once at startup (from CLI flags, environment or a plan file) and
//! then passed by reference into each generator. Generators never read the clock or the
//! environment themselves, so the same inputs always produce the same document.

use crate::constants::DEFAULT_NEWS_MODULE;
use crate::risk::RiskDistribution;
use crate::validation::validate_module_name;
use crate::{GeneratorError, GeneratorResult};
use chrono::NaiveDateTime;
use eobs_types::NonEmptyText;
use openerp::{DateExpr, DateMode, FieldValue};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    date_mode: DateMode,
    news_module: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            date_mode: DateMode::Eval,
            news_module: DEFAULT_NEWS_MODULE.to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Create a new `GeneratorConfig`.
    ///
    /// `news_module` qualifies the admission records referenced from NEWS fixtures, which are
    /// loaded by a different module than the one that defines them.
    pub fn new(date_mode: DateMode, news_module: impl Into<String>) -> GeneratorResult<Self> {
        let news_module = news_module.into();
        validate_module_name(&news_module)?;
        Ok(Self {
            date_mode,
            news_module,
        })
    }

    pub fn date_mode(&self) -> DateMode {
        self.date_mode
    }

    pub fn news_module(&self) -> &str {
        &self.news_module
    }

    /// Field value for a date, as an expression or a literal depending on the date mode.
    pub fn date(&self, expr: DateExpr) -> FieldValue {
        self.date_mode.field_value(expr)
    }
}

/// Where admission offsets come from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OffsetSource {
    /// One offset per patient, by position.
    Fixed(Vec<i64>),
    /// One offset per patient drawn from `choices` with a seeded generator.
    Random { choices: Vec<i64>, seed: u64 },
}

impl OffsetSource {
    /// Produces `count` offsets.
    ///
    /// A fixed list is returned as given; its length is checked against the roster by the
    /// generators.
    pub fn resolve(&self, count: usize) -> GeneratorResult<Vec<i64>> {
        match self {
            OffsetSource::Fixed(offsets) => Ok(offsets.clone()),
            OffsetSource::Random { choices, seed } => {
                if choices.is_empty() {
                    return Err(GeneratorError::InvalidInput(
                        "offset choices cannot be empty".into(),
                    ));
                }
                let mut rng = StdRng::seed_from_u64(*seed);
                Ok((0..count)
                    .filter_map(|_| choices.choose(&mut rng).copied())
                    .collect())
            }
        }
    }
}

/// Parses a comma-separated list of whole-day offsets (`-1,-2,-1`).
pub fn parse_offsets(input: &str) -> GeneratorResult<Vec<i64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| {
                GeneratorError::InvalidInput(format!("offset '{part}' is not a whole number of days"))
            })
        })
        .collect()
}

/// One ward's entry in a demo plan.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardPlan {
    /// Ward suffix; the roster lives in `ward_<ward>/`.
    pub ward: NonEmptyText,
    pub offsets: OffsetSource,
    #[serde(default)]
    pub risk: RiskDistribution,
}

/// The demo data plan read by the runner.
///
/// ```yaml
/// absolute_dates: false
/// wards:
///   - ward: a
///     offsets: { choices: [-1, -2], seed: 7 }
///     risk: { high: 2, medium: 3, low: 5, none: 10 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoPlan {
    #[serde(default)]
    pub absolute_dates: bool,
    #[serde(default)]
    pub news_module: Option<String>,
    pub wards: Vec<WardPlan>,
}

impl DemoPlan {
    pub fn from_yaml(yaml: &str) -> GeneratorResult<Self> {
        let plan: DemoPlan =
            serde_yaml::from_str(yaml).map_err(GeneratorError::YamlDeserialization)?;
        if plan.wards.is_empty() {
            return Err(GeneratorError::InvalidInput(
                "demo plan must list at least one ward".into(),
            ));
        }
        Ok(plan)
    }

    pub fn read(path: &Path) -> GeneratorResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| GeneratorError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Generator configuration for this plan; `now` is only used for absolute dates.
    pub fn generator_config(&self, now: NaiveDateTime) -> GeneratorResult<GeneratorConfig> {
        let date_mode = if self.absolute_dates {
            DateMode::Absolute(now)
        } else {
            DateMode::Eval
        };
        let module = self.news_module.as_deref().unwrap_or(DEFAULT_NEWS_MODULE);
        GeneratorConfig::new(date_mode, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_eval_dates() {
        let config = GeneratorConfig::default();
        assert_eq!(config.date_mode(), DateMode::Eval);
        assert_eq!(config.news_module(), "nh_clinical");
        assert!(matches!(
            config.date(DateExpr::days(-1)),
            FieldValue::Eval(_)
        ));
    }

    #[test]
    fn rejects_invalid_module() {
        assert!(GeneratorConfig::new(DateMode::Eval, "nh clinical").is_err());
    }

    #[test]
    fn parses_offset_list() {
        assert_eq!(parse_offsets("-1, -2,0").expect("offsets"), vec![-1, -2, 0]);
        assert!(parse_offsets("-1,yesterday").is_err());
    }

    #[test]
    fn random_offsets_are_reproducible() {
        let source = OffsetSource::Random {
            choices: vec![-1, -2],
            seed: 42,
        };
        let first = source.resolve(20).expect("offsets");
        let second = source.resolve(20).expect("offsets");
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
        assert!(first.iter().all(|o| *o == -1 || *o == -2));
    }

    #[test]
    fn random_offsets_need_choices() {
        let source = OffsetSource::Random {
            choices: vec![],
            seed: 1,
        };
        assert!(source.resolve(3).is_err());
    }

    #[test]
    fn parses_demo_plan() {
        let yaml = r#"
absolute_dates: true
wards:
  - ward: a
    offsets: [-1, -2]
    risk: { high: 1, none: 1 }
  - ward: b
    offsets: { choices: [-1, -3], seed: 7 }
"#;
        let plan = DemoPlan::from_yaml(yaml).expect("plan");
        assert!(plan.absolute_dates);
        assert_eq!(plan.wards.len(), 2);
        assert_eq!(plan.wards[0].ward.as_str(), "a");
        assert_eq!(plan.wards[0].offsets, OffsetSource::Fixed(vec![-1, -2]));
        assert_eq!(plan.wards[0].risk, RiskDistribution::new(1, 0, 0, 1));
        assert!(matches!(
            plan.wards[1].offsets,
            OffsetSource::Random { seed: 7, .. }
        ));
    }

    #[test]
    fn plan_selects_date_mode() {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("valid datetime");

        let plan = DemoPlan::from_yaml("wards: [{ ward: a, offsets: [-1] }]\n").expect("plan");
        let config = plan.generator_config(now).expect("config");
        assert_eq!(config.date_mode(), DateMode::Eval);

        let yaml = "absolute_dates: true\nnews_module: nh_eobs\nwards: [{ ward: a, offsets: [-1] }]\n";
        let config = DemoPlan::from_yaml(yaml)
            .and_then(|plan| plan.generator_config(now))
            .expect("config");
        assert_eq!(config.date_mode(), DateMode::Absolute(now));
        assert_eq!(config.news_module(), "nh_eobs");
    }

    #[test]
    fn rejects_plan_without_wards() {
        assert!(DemoPlan::from_yaml("wards: []\n").is_err());
        assert!(matches!(
            DemoPlan::from_yaml("wards: [{ ward: '', offsets: [] }]\n"),
            Err(GeneratorError::YamlDeserialization(_))
        ));
    }
}
