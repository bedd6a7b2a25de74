//! Post-install smoke checks.
//!
//! Each check is one RPC round trip and an assertion on the answer. Checks run in a fixed
//! order and every check runs even when an earlier one failed; checks that need a session
//! fail on their own when login did not succeed. The report is printed the way Python's
//! `unittest` text runner prints, since that is what operators of these servers read.

use crate::client::{server_version, ConnectionConfig, OpenErpClient};
use crate::value::domain_term;
use crate::RpcResult;
use std::fmt;

const PATIENT_MODEL: &str = "nh.clinical.patient";
const LOCATION_MODEL: &str = "nh.clinical.location";
const ACTIVITY_MODEL: &str = "nh.activity";
const NEWS_MODEL: &str = "nh.clinical.patient.observation.ews";

const SEPARATOR: &str =
    "----------------------------------------------------------------------";

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub failure: Option<String>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmokeReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }
}

impl fmt::Display for SmokeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.failure {
                None => writeln!(f, "{} ... ok", outcome.name)?,
                Some(reason) => writeln!(f, "{} ... FAIL: {reason}", outcome.name)?,
            }
        }
        writeln!(f, "{SEPARATOR}")?;
        writeln!(f, "Ran {} tests", self.outcomes.len())?;
        writeln!(f)?;
        if self.passed() {
            writeln!(f, "OK")
        } else {
            writeln!(f, "FAILED (failures={})", self.failures())
        }
    }
}

/// The smoke test suite for one database.
pub struct SmokeTest {
    config: ConnectionConfig,
}

impl SmokeTest {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> SmokeReport {
        let mut report = SmokeReport::default();

        report.record("test_server_version", || {
            let version = server_version(&self.config)?;
            ensure(!version.trim().is_empty(), "server reported an empty version")
        });

        let session = OpenErpClient::connect(self.config.clone());
        report.record("test_authentication", || match &session {
            Ok(client) => ensure(client.uid() > 0, "login returned no uid"),
            Err(e) => Ok(Err(e.to_string())),
        });

        let client = session.as_ref().ok();
        report.record("test_patients_exist", || {
            with_client(client, |c| {
                let count = c.model(PATIENT_MODEL).search_count(vec![])?;
                ensure(count > 0, "no patients found")
            })
        });
        report.record("test_wards_exist", || {
            with_client(client, |c| {
                let wards = c
                    .model(LOCATION_MODEL)
                    .search(vec![domain_term("usage", "=", "ward")])?;
                ensure(!wards.is_empty(), "no wards found")
            })
        });
        report.record("test_scheduled_news_exist", || {
            with_client(client, |c| {
                let count = c.model(ACTIVITY_MODEL).search_count(vec![
                    domain_term("data_model", "=", NEWS_MODEL),
                    domain_term("state", "=", "scheduled"),
                ])?;
                ensure(count > 0, "no scheduled NEWS observations found")
            })
        });

        report
    }
}

/// `Ok(Err(reason))` is an assertion failure; `Err` is an RPC error.
type CheckResult = RpcResult<Result<(), String>>;

fn ensure(condition: bool, reason: &str) -> CheckResult {
    Ok(if condition {
        Ok(())
    } else {
        Err(reason.to_string())
    })
}

fn with_client(
    client: Option<&OpenErpClient>,
    check: impl FnOnce(&OpenErpClient) -> CheckResult,
) -> CheckResult {
    match client {
        Some(client) => check(client),
        None => Ok(Err("not authenticated".to_string())),
    }
}

impl SmokeReport {
    fn record(&mut self, name: &'static str, check: impl FnOnce() -> CheckResult) {
        let failure = match check() {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason),
            Err(e) => Some(e.to_string()),
        };
        match &failure {
            None => tracing::debug!(check = name, "passed"),
            Some(reason) => tracing::warn!(check = name, %reason, "failed"),
        }
        self.outcomes.push(CheckOutcome { name, failure });
    }
}
