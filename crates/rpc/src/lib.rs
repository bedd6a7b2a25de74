//! # eObs RPC
//!
//! XML-RPC access to a running Open eObs server.
//!
//! - [`codec`]: `methodCall` encoding and `methodResponse` decoding
//! - [`client`]: authenticated connection and per-model proxies
//! - [`demo_loader`]: discharge and transfer commands exposed by the demo loader module
//! - [`smoke`]: post-install checks against a live database

pub mod client;
pub mod codec;
pub mod demo_loader;
pub mod smoke;
pub mod value;

pub use client::{ConnectionConfig, ModelProxy, OpenErpClient};
pub use demo_loader::{discharge_patients, transfer_patients, DischargeTransferCoordinator};
pub use smoke::{CheckOutcome, SmokeReport, SmokeTest};
pub use value::Value;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Login failed. The password is never included.
    #[error("error connecting to {database} on {server} as {user}: {reason}")]
    Connection {
        server: String,
        database: String,
        user: String,
        reason: String,
    },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("malformed XML-RPC response: {0}")]
    Malformed(String),

    #[error("invalid connection settings: {0}")]
    InvalidConfig(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;
