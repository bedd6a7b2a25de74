use anyhow::Context;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eobs_core::constants::DEFAULT_PLAN_FILENAME;
use eobs_core::{DemoPlan, run_ward};

/// Generates demo data for every ward listed in the demo plan.
///
/// For each ward `x` the roster `ward_x/demo_patients.xml` is read and `admissions.xml`,
/// `placements.xml` and `news.xml` are written next to it.
///
/// # Environment Variables
/// - `EOBS_WARDS_DIR`: Directory holding the `ward_<x>/` folders (default: current directory)
/// - `EOBS_PLAN`: Plan file (default: `<EOBS_WARDS_DIR>/demo_plan.yaml`)
/// - `RUST_LOG`: Extra log directives on top of `eobs_core=info`
///
/// # Returns
/// * `Ok(())` - If every ward was generated
/// * `Err(anyhow::Error)` - On the first ward that fails; files of earlier wards are kept
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eobs_demo_run=info".parse()?)
                .add_directive("eobs_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let wards_dir: PathBuf = std::env::var("EOBS_WARDS_DIR")
        .unwrap_or_else(|_| ".".into())
        .into();
    let plan_path: PathBuf = std::env::var("EOBS_PLAN")
        .map(PathBuf::from)
        .unwrap_or_else(|_| wards_dir.join(DEFAULT_PLAN_FILENAME));

    let plan = DemoPlan::read(&plan_path)
        .with_context(|| format!("reading demo plan {}", plan_path.display()))?;
    let config = plan.generator_config(chrono::Local::now().naive_local())?;

    tracing::info!(
        "++ Generating demo data for {} ward(s) under {}",
        plan.wards.len(),
        wards_dir.display()
    );

    for ward in &plan.wards {
        run_ward(&config, &wards_dir, ward).with_context(|| format!("ward {}", ward.ward))?;
    }

    tracing::info!("++ Demo data complete");
    Ok(())
}
