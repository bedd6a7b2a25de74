//! Commands exposed by the `nh.eobs.demo.loader` model.
//!
//! Ward codes and patient identifiers are passed through to the server unchanged; the loader
//! decides what they mean. Nothing is retried.

use crate::client::{ConnectionConfig, OpenErpClient};
use crate::value::Value;
use crate::RpcResult;
use eobs_types::NonEmptyText;

pub const DEMO_LOADER_MODEL: &str = "nh.eobs.demo.loader";

fn patient_list(patients: &[NonEmptyText]) -> Value {
    Value::Array(patients.iter().map(|p| Value::from(p.as_str())).collect())
}

/// Discharges `patients` from `ward`.
pub fn discharge_patients(
    client: &OpenErpClient,
    ward: &NonEmptyText,
    patients: &[NonEmptyText],
) -> RpcResult<Value> {
    tracing::info!(%ward, patients = patients.len(), "discharging patients");
    client.model(DEMO_LOADER_MODEL).execute(
        "discharge_patients",
        vec![Value::from(ward.as_str()), patient_list(patients)],
    )
}

/// Transfers `patients` from `from_ward` to `to_ward`.
pub fn transfer_patients(
    client: &OpenErpClient,
    from_ward: &NonEmptyText,
    to_ward: &NonEmptyText,
    patients: &[NonEmptyText],
) -> RpcResult<Value> {
    tracing::info!(%from_ward, %to_ward, patients = patients.len(), "transferring patients");
    client.model(DEMO_LOADER_MODEL).execute(
        "transfer_patients",
        vec![
            Value::from(from_ward.as_str()),
            Value::from(to_ward.as_str()),
            patient_list(patients),
        ],
    )
}

/// Discharges a set of patients from a ward and, when a target ward is given, transfers the
/// same patients from the discharge ward to it, over one connection.
#[derive(Debug, Clone)]
pub struct DischargeTransferCoordinator {
    pub discharge_ward: NonEmptyText,
    pub patients: Vec<NonEmptyText>,
    pub transfer_ward: Option<NonEmptyText>,
}

impl DischargeTransferCoordinator {
    pub fn new(discharge_ward: NonEmptyText, patients: Vec<NonEmptyText>) -> Self {
        Self {
            discharge_ward,
            patients,
            transfer_ward: None,
        }
    }

    pub fn with_transfer_ward(mut self, ward: NonEmptyText) -> Self {
        self.transfer_ward = Some(ward);
        self
    }

    /// Connects and runs the commands in order, stopping at the first failure.
    pub fn run(&self, config: ConnectionConfig) -> RpcResult<()> {
        let client = OpenErpClient::connect(config)?;
        self.run_with(&client)
    }

    pub fn run_with(&self, client: &OpenErpClient) -> RpcResult<()> {
        discharge_patients(client, &self.discharge_ward, &self.patients)?;
        if let Some(to_ward) = &self.transfer_ward {
            transfer_patients(client, &self.discharge_ward, to_ward, &self.patients)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{config, login_mock, response};
    use crate::RpcError;
    use mockito::{Matcher, Server};

    fn text(values: &[&str]) -> Vec<NonEmptyText> {
        values
            .iter()
            .map(|v| NonEmptyText::new(v).expect("text"))
            .collect()
    }

    fn ward(code: &str) -> NonEmptyText {
        NonEmptyText::new(code).expect("ward")
    }

    #[test]
    fn discharge_passes_arguments_through() {
        let mut server = Server::new();
        let _login = login_mock(&mut server, 1);
        let discharge = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("<string>nh.eobs.demo.loader</string>".into()),
                Matcher::Regex(
                    "<string>discharge_patients</string></value></param>\
                     <param><value><string>A</string></value></param>\
                     <param><value><array><data>\
                     <value><string>HOSNUM0001</string></value>\
                     <value><string>HOSNUM0002</string></value>\
                     </data></array></value></param>"
                        .into(),
                ),
            ]))
            .with_status(200)
            .with_body(response("<boolean>1</boolean>"))
            .expect(1)
            .create();

        let client = OpenErpClient::connect(config(&server)).expect("connect");
        let result = discharge_patients(&client, &ward("A"), &text(&["HOSNUM0001", "HOSNUM0002"]))
            .expect("discharge");
        assert_eq!(result, Value::Bool(true));
        discharge.assert();
    }

    #[test]
    fn coordinator_discharges_then_transfers() {
        let mut server = Server::new();
        let _login = login_mock(&mut server, 1);
        let discharge = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex("<string>discharge_patients</string>".into()))
            .with_status(200)
            .with_body(response("<boolean>1</boolean>"))
            .expect(1)
            .create();
        let transfer = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex(
                "<string>transfer_patients</string></value></param>\
                 <param><value><string>A</string></value></param>\
                 <param><value><string>B</string></value></param>"
                    .into(),
            ))
            .with_status(200)
            .with_body(response("<boolean>1</boolean>"))
            .expect(1)
            .create();

        DischargeTransferCoordinator::new(ward("A"), text(&["HOSNUM0001"]))
            .with_transfer_ward(ward("B"))
            .run(config(&server))
            .expect("run");

        discharge.assert();
        transfer.assert();
    }

    #[test]
    fn coordinator_without_target_only_discharges() {
        let mut server = Server::new();
        let _login = login_mock(&mut server, 1);
        let discharge = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex("<string>discharge_patients</string>".into()))
            .with_status(200)
            .with_body(response("<boolean>1</boolean>"))
            .expect(1)
            .create();
        let transfer = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex("<string>transfer_patients</string>".into()))
            .expect(0)
            .create();

        DischargeTransferCoordinator::new(ward("A"), text(&["HOSNUM0001"]))
            .run(config(&server))
            .expect("run");

        discharge.assert();
        transfer.assert();
    }

    #[test]
    fn failed_discharge_skips_transfer() {
        let mut server = Server::new();
        let _login = login_mock(&mut server, 1);
        let _discharge = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex("<string>discharge_patients</string>".into()))
            .with_status(502)
            .create();
        let transfer = server
            .mock("POST", "/xmlrpc/object")
            .match_body(Matcher::Regex("<string>transfer_patients</string>".into()))
            .expect(0)
            .create();

        let err = DischargeTransferCoordinator::new(ward("A"), text(&["HOSNUM0001"]))
            .with_transfer_ward(ward("B"))
            .run(config(&server))
            .expect_err("discharge fails");

        assert!(matches!(err, RpcError::Status { status: 502, .. }));
        transfer.assert();
    }
}
